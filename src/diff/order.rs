//! Dependency-aware ordering of create and drop batches.
//!
//! The fixed kind order already puts most dependencies before their
//! dependents; this pass corrects the remainder (user-authored
//! cross-references, triggers on dropped tables) with a stable
//! topological sort restricted to the entities actually being created or
//! dropped in this run. Alter and description operations keep their
//! kind-order positions — they neither add nor remove dependency edges.

use std::collections::{BTreeMap, BTreeSet};

use crate::diff::{Entity, Operation};
use crate::error::DependencyCycleError;

/// Reorder a kind-ordered operation list into dependency-safe order.
///
/// Creates are permuted among the positions creates already occupy so
/// that every dependency's create precedes its dependents'; drops are
/// permuted symmetrically so dependents drop first. The sort is stable:
/// unconstrained operations keep their relative kind order, making output
/// deterministic. A cycle in either batch is a fatal error.
pub fn order_operations(ops: Vec<Operation>) -> Result<Vec<Operation>, DependencyCycleError> {
    let create_slots: Vec<usize> = ops
        .iter()
        .enumerate()
        .filter(|(_, op)| matches!(op, Operation::Create(_)))
        .map(|(i, _)| i)
        .collect();
    let drop_slots: Vec<usize> = ops
        .iter()
        .enumerate()
        .filter(|(_, op)| matches!(op, Operation::Drop(_)))
        .map(|(i, _)| i)
        .collect();

    let creates: Vec<&Entity> = create_slots
        .iter()
        .map(|&i| match &ops[i] {
            Operation::Create(e) => e,
            _ => unreachable!(),
        })
        .collect();
    let drops: Vec<&Entity> = drop_slots
        .iter()
        .map(|&i| match &ops[i] {
            Operation::Drop(e) => e,
            _ => unreachable!(),
        })
        .collect();

    // Dependencies first for creates, dependents first for drops.
    let create_order = stable_topo(&creates, false)?;
    let drop_order = stable_topo(&drops, true)?;

    let mut result: Vec<Option<Operation>> = ops.into_iter().map(Some).collect();
    let mut reordered: Vec<Option<Operation>> = vec![None; result.len()];

    for (slot_pos, &src) in create_order.iter().enumerate() {
        reordered[create_slots[slot_pos]] = result[create_slots[src]].take();
    }
    for (slot_pos, &src) in drop_order.iter().enumerate() {
        reordered[drop_slots[slot_pos]] = result[drop_slots[src]].take();
    }
    for (i, op) in result.into_iter().enumerate() {
        if let Some(op) = op {
            reordered[i] = Some(op);
        }
    }

    Ok(reordered.into_iter().map(|op| op.expect("slot filled")).collect())
}

/// Stable Kahn's algorithm over one batch.
///
/// Returns the batch indices in emission order. With `dependents_first`
/// set (drops), an edge runs from each entity to its dependencies so the
/// entity itself surfaces first; otherwise (creates) the dependency
/// surfaces first. Among ready entities the smallest original index wins.
fn stable_topo(entities: &[&Entity], dependents_first: bool) -> Result<Vec<usize>, DependencyCycleError> {
    let index_of: BTreeMap<_, usize> = entities
        .iter()
        .enumerate()
        .map(|(i, e)| (e.id(), i))
        .collect();

    let n = entities.len();
    let mut successors: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut indegree: Vec<usize> = vec![0; n];

    for (i, entity) in entities.iter().enumerate() {
        for reference in entity.ordering_edges() {
            let Some(&j) = index_of.get(&reference) else {
                continue; // not part of this batch
            };
            if j == i {
                continue;
            }
            let (from, to) = if dependents_first { (i, j) } else { (j, i) };
            successors[from].push(to);
            indegree[to] += 1;
        }
    }

    let mut ready: BTreeSet<usize> = (0..n).filter(|&i| indegree[i] == 0).collect();
    let mut order = Vec::with_capacity(n);

    while let Some(&next) = ready.iter().next() {
        ready.remove(&next);
        order.push(next);
        for &succ in &successors[next] {
            indegree[succ] -= 1;
            if indegree[succ] == 0 {
                ready.insert(succ);
            }
        }
    }

    if order.len() != n {
        let mut stuck: Vec<_> = (0..n)
            .filter(|&i| indegree[i] > 0)
            .map(|i| entities[i].id())
            .collect();
        stuck.sort();
        return Err(DependencyCycleError { ids: stuck });
    }

    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        ColumnState, ConstraintDefinition, ConstraintState, SchemaState, TableState,
        TypeAttribute, TypeDefinition, TypeState,
    };

    fn table(schema: &str, name: &str) -> Entity {
        Entity::Table(TableState {
            schema: schema.to_string(),
            name: name.to_string(),
            columns: vec![],
            extensions: vec![],
            description: None,
        })
    }

    fn fk(table_name: &str, ref_table: &str) -> Entity {
        Entity::Constraint(ConstraintState {
            schema: "public".to_string(),
            table: table_name.to_string(),
            name: format!("{table_name}_{ref_table}_fkey"),
            definition: ConstraintDefinition::ForeignKey {
                columns: vec!["ref_id".to_string()],
                ref_schema: None,
                ref_table: ref_table.to_string(),
                ref_columns: vec!["id".to_string()],
            },
            description: None,
        })
    }

    #[test]
    fn test_create_dependency_precedes_dependent() {
        // Key order puts table "a" before schema-owning "s1"... build a
        // list where the schema create trails its table.
        let ops = vec![
            Operation::Create(table("s1", "a")),
            Operation::Create(Entity::Schema(SchemaState {
                name: "s1".to_string(),
                description: None,
            })),
        ];
        let ordered = order_operations(ops).unwrap();
        assert!(matches!(&ordered[0], Operation::Create(Entity::Schema(_))));
        assert!(matches!(&ordered[1], Operation::Create(Entity::Table(_))));
    }

    #[test]
    fn test_drop_dependent_precedes_dependency() {
        let ops = vec![
            Operation::Drop(Entity::Schema(SchemaState {
                name: "s1".to_string(),
                description: None,
            })),
            Operation::Drop(table("s1", "a")),
        ];
        let ordered = order_operations(ops).unwrap();
        assert!(matches!(&ordered[0], Operation::Drop(Entity::Table(_))));
        assert!(matches!(&ordered[1], Operation::Drop(Entity::Schema(_))));
    }

    #[test]
    fn test_alters_keep_position() {
        let column = ColumnState {
            schema: "public".to_string(),
            table: "t1".to_string(),
            name: "c1".to_string(),
            type_name: "integer".to_string(),
            not_null: false,
            default: None,
            description: None,
        };
        let mut altered = column.clone();
        altered.type_name = "bigint".to_string();

        let ops = vec![
            Operation::Create(table("public", "t2")),
            Operation::Alter {
                current: Entity::Column(column),
                target: Entity::Column(altered),
                changed: vec!["type"],
                disposition: crate::diff::AlterDisposition::InPlace,
            },
            Operation::Create(table("public", "t3")),
        ];
        let ordered = order_operations(ops.clone()).unwrap();
        assert_eq!(ordered, ops);
    }

    #[test]
    fn test_stable_when_unconstrained() {
        let ops = vec![
            Operation::Create(table("public", "b")),
            Operation::Create(table("public", "a")),
        ];
        let ordered = order_operations(ops.clone()).unwrap();
        // No edges between them: input order is preserved.
        assert_eq!(ordered, ops);
    }

    #[test]
    fn test_mutual_fks_are_not_a_cycle() {
        let ops = vec![
            Operation::Create(table("public", "a")),
            Operation::Create(table("public", "b")),
            Operation::Create(fk("a", "b")),
            Operation::Create(fk("b", "a")),
        ];
        // Constraints depend on tables; tables carry no edge back to the
        // constraints, so mutual foreign keys still order fine.
        assert!(order_operations(ops).is_ok());
    }

    #[test]
    fn test_cycle_detected() {
        // Two composite types whose attributes reference each other.
        let composite = |name: &str, other: &str| {
            Entity::Type(TypeState {
                schema: "public".to_string(),
                name: name.to_string(),
                definition: TypeDefinition::Composite {
                    attributes: vec![TypeAttribute {
                        name: "inner".to_string(),
                        type_name: other.to_string(),
                    }],
                },
                description: None,
            })
        };
        let ops = vec![
            Operation::Create(composite("pair", "point")),
            Operation::Create(composite("point", "pair")),
        ];
        let err = order_operations(ops).unwrap_err();
        assert_eq!(err.ids.len(), 2);
    }
}
