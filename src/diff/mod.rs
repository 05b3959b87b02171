//! Structural diff engine.
//!
//! Compares the per-kind dictionaries of two models and produces
//! [`Operation`]s: creates, drops, alters (with the specific changed
//! attributes and an alter-vs-recreate disposition), and description
//! changes. Kinds are processed in the fixed [`EntityKind`] order;
//! description operations are collected into a trailing comments phase.

pub mod order;

use std::collections::BTreeSet;

use strum::IntoEnumIterator;

use crate::error::StructuralDiffError;
use crate::model::{
    ColumnState, ConstraintState, DatabaseModel, Dictionary, EntityKind, FunctionState,
    IndexState, LanguageState, ObjectId, SchemaObject, SchemaState, SequenceState, TableState,
    TriggerState, TypeState,
};

/// A schema object of any kind, as carried by an [`Operation`].
#[derive(Debug, Clone, PartialEq)]
pub enum Entity {
    Schema(SchemaState),
    Language(LanguageState),
    Type(TypeState),
    Sequence(SequenceState),
    Table(TableState),
    Column(ColumnState),
    Constraint(ConstraintState),
    Index(IndexState),
    Function(FunctionState),
    Trigger(TriggerState),
}

impl Entity {
    pub fn kind(&self) -> EntityKind {
        match self {
            Entity::Schema(_) => EntityKind::Schema,
            Entity::Language(_) => EntityKind::Language,
            Entity::Type(_) => EntityKind::Type,
            Entity::Sequence(_) => EntityKind::Sequence,
            Entity::Table(_) => EntityKind::Table,
            Entity::Column(_) => EntityKind::Column,
            Entity::Constraint(_) => EntityKind::Constraint,
            Entity::Index(_) => EntityKind::Index,
            Entity::Function(_) => EntityKind::Function,
            Entity::Trigger(_) => EntityKind::Trigger,
        }
    }

    pub fn id(&self) -> ObjectId {
        match self {
            Entity::Schema(s) => s.id(),
            Entity::Language(l) => l.id(),
            Entity::Type(t) => t.id(),
            Entity::Sequence(s) => s.id(),
            Entity::Table(t) => t.id(),
            Entity::Column(c) => c.id(),
            Entity::Constraint(c) => c.id(),
            Entity::Index(i) => i.id(),
            Entity::Function(f) => f.id(),
            Entity::Trigger(t) => t.id(),
        }
    }

    /// Edges for the topological sort (hard references plus soft type
    /// references).
    pub fn ordering_edges(&self) -> Vec<ObjectId> {
        match self {
            Entity::Schema(s) => s.ordering_edges(),
            Entity::Language(l) => l.ordering_edges(),
            Entity::Type(t) => t.ordering_edges(),
            Entity::Sequence(s) => s.ordering_edges(),
            Entity::Table(t) => t.ordering_edges(),
            Entity::Column(c) => c.ordering_edges(),
            Entity::Constraint(c) => c.ordering_edges(),
            Entity::Index(i) => i.ordering_edges(),
            Entity::Function(f) => f.ordering_edges(),
            Entity::Trigger(t) => t.ordering_edges(),
        }
    }
}

macro_rules! entity_from {
    ($state:ty, $variant:ident) => {
        impl From<$state> for Entity {
            fn from(state: $state) -> Self {
                Entity::$variant(state)
            }
        }
    };
}

entity_from!(SchemaState, Schema);
entity_from!(LanguageState, Language);
entity_from!(TypeState, Type);
entity_from!(SequenceState, Sequence);
entity_from!(TableState, Table);
entity_from!(ColumnState, Column);
entity_from!(ConstraintState, Constraint);
entity_from!(IndexState, Index);
entity_from!(FunctionState, Function);
entity_from!(TriggerState, Trigger);

/// How an alter is applied: a genuine in-place ALTER, or a drop of the
/// current entity immediately followed by a create of the target one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlterDisposition {
    InPlace,
    Recreate,
}

/// One pending change discovered by diffing two models.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    Create(Entity),
    Drop(Entity),
    Alter {
        current: Entity,
        target: Entity,
        changed: Vec<&'static str>,
        disposition: AlterDisposition,
    },
    SetDescription {
        entity: Entity,
        text: Option<String>,
    },
}

impl Operation {
    /// The entity this operation is about (the target side for alters).
    pub fn entity(&self) -> &Entity {
        match self {
            Operation::Create(e) | Operation::Drop(e) => e,
            Operation::Alter { target, .. } => target,
            Operation::SetDescription { entity, .. } => entity,
        }
    }
}

/// Decide the alter disposition for a structural change, or refuse when
/// the kind has neither an in-place path nor a recreate policy.
fn disposition(
    current: &Entity,
    target: &Entity,
    changed: &[&'static str],
) -> Result<AlterDisposition, StructuralDiffError> {
    match (current, target) {
        // Columns alter via ALTER TABLE ... ALTER COLUMN, sequences via
        // ALTER SEQUENCE. Schemas and tables have no alterable attributes,
        // so the arm is never reached with a non-empty change set.
        (Entity::Column(_), _)
        | (Entity::Sequence(_), _)
        | (Entity::Schema(_), _)
        | (Entity::Table(_), _) => Ok(AlterDisposition::InPlace),

        // A return-type change needs DROP + CREATE; everything else goes
        // through CREATE OR REPLACE.
        (Entity::Function(_), _) => {
            if changed.contains(&"returns") {
                Ok(AlterDisposition::Recreate)
            } else {
                Ok(AlterDisposition::InPlace)
            }
        }

        // No ALTER TRIGGER for timing/events, no ALTER on constraint or
        // index shape, no way to flip a language's trust in place.
        (Entity::Trigger(_), _)
        | (Entity::Index(_), _)
        | (Entity::Constraint(_), _)
        | (Entity::Language(_), _) => Ok(AlterDisposition::Recreate),

        // Appending enum labels is the one type change PostgreSQL can
        // apply in place. Recreating a type under dependent columns would
        // be destructive, so anything else has no policy.
        (Entity::Type(c), Entity::Type(t)) => {
            if c.is_label_append(t) {
                Ok(AlterDisposition::InPlace)
            } else {
                Err(StructuralDiffError {
                    id: c.id(),
                    attributes: changed.to_vec(),
                })
            }
        }
        (Entity::Type(c), _) => Err(StructuralDiffError {
            id: c.id(),
            attributes: changed.to_vec(),
        }),
    }
}

/// Diff one kind's dictionaries.
///
/// Target keys are visited in key order (creates and alters), then current
/// keys absent from target (drops). `skip_create`/`skip_drop` implement
/// containment folding: a folded operation is covered by its owner's
/// statement and emits nothing itself — except descriptions, which always
/// need their own COMMENT statement.
fn diff_kind<T>(
    current: &Dictionary<T>,
    target: &Dictionary<T>,
    skip_create: impl Fn(&T) -> bool,
    skip_drop: impl Fn(&T) -> bool,
    structural: &mut Vec<Operation>,
    comments: &mut Vec<Operation>,
) -> Result<(), StructuralDiffError>
where
    T: SchemaObject + Into<Entity>,
{
    for target_entity in target.iter() {
        let id = target_entity.id();
        match current.get(&id) {
            None => {
                if !skip_create(target_entity) {
                    structural.push(Operation::Create(target_entity.clone().into()));
                }
                if let Some(text) = target_entity.description() {
                    comments.push(Operation::SetDescription {
                        entity: target_entity.clone().into(),
                        text: Some(text.to_string()),
                    });
                }
            }
            Some(current_entity) => {
                let changed = current_entity.changed_attributes(target_entity);
                if !changed.is_empty() {
                    let current_e: Entity = current_entity.clone().into();
                    let target_e: Entity = target_entity.clone().into();
                    let disposition = disposition(&current_e, &target_e, &changed)?;
                    structural.push(Operation::Alter {
                        current: current_e,
                        target: target_e,
                        changed,
                        disposition,
                    });
                }
                if current_entity.description() != target_entity.description() {
                    comments.push(Operation::SetDescription {
                        entity: target_entity.clone().into(),
                        text: target_entity.description().map(str::to_string),
                    });
                }
            }
        }
    }

    for current_entity in current.iter() {
        if !target.contains(&current_entity.id()) && !skip_drop(current_entity) {
            structural.push(Operation::Drop(current_entity.clone().into()));
        }
    }

    Ok(())
}

/// Diff two whole models in the fixed kind order, appending all
/// description changes as a trailing comments phase.
///
/// The returned list is kind-ordered but not yet dependency-ordered; run
/// it through [`order::order_operations`] before emission.
pub fn diff_models(
    current: &DatabaseModel,
    target: &DatabaseModel,
) -> Result<Vec<Operation>, StructuralDiffError> {
    // Tables created or dropped in this run, for containment folding.
    let tables_created: BTreeSet<ObjectId> = target
        .tables
        .keys()
        .filter(|id| !current.tables.contains(id))
        .cloned()
        .collect();
    let tables_dropped: BTreeSet<ObjectId> = current
        .tables
        .keys()
        .filter(|id| !target.tables.contains(id))
        .cloned()
        .collect();

    let owner = |schema: &str, table: &str| ObjectId::new(EntityKind::Table, [schema, table]);

    fn no_skip<T>(_: &T) -> bool {
        false
    }

    let mut structural = Vec::new();
    let mut comments = Vec::new();

    for kind in EntityKind::iter() {
        match kind {
            EntityKind::Language => diff_kind(
                &current.languages,
                &target.languages,
                no_skip,
                no_skip,
                &mut structural,
                &mut comments,
            )?,
            EntityKind::Schema => diff_kind(
                &current.schemas,
                &target.schemas,
                no_skip,
                no_skip,
                &mut structural,
                &mut comments,
            )?,
            EntityKind::Type => diff_kind(
                &current.types,
                &target.types,
                no_skip,
                no_skip,
                &mut structural,
                &mut comments,
            )?,
            EntityKind::Sequence => diff_kind(
                &current.sequences,
                &target.sequences,
                no_skip,
                no_skip,
                &mut structural,
                &mut comments,
            )?,
            EntityKind::Table => diff_kind(
                &current.tables,
                &target.tables,
                no_skip,
                no_skip,
                &mut structural,
                &mut comments,
            )?,
            // New columns of a new table ride inside CREATE TABLE; columns
            // of a dropped table vanish with DROP TABLE.
            EntityKind::Column => diff_kind(
                &current.columns,
                &target.columns,
                |c: &ColumnState| tables_created.contains(&owner(&c.schema, &c.table)),
                |c: &ColumnState| tables_dropped.contains(&owner(&c.schema, &c.table)),
                &mut structural,
                &mut comments,
            )?,
            // Constraints and indexes are created by their own statements
            // even on new tables, but DROP TABLE takes them down with it.
            EntityKind::Constraint => diff_kind(
                &current.constraints,
                &target.constraints,
                no_skip,
                |c: &ConstraintState| tables_dropped.contains(&owner(&c.schema, &c.table)),
                &mut structural,
                &mut comments,
            )?,
            EntityKind::Index => diff_kind(
                &current.indexes,
                &target.indexes,
                no_skip,
                |i: &IndexState| tables_dropped.contains(&owner(&i.schema, &i.table)),
                &mut structural,
                &mut comments,
            )?,
            EntityKind::Function => diff_kind(
                &current.functions,
                &target.functions,
                no_skip,
                no_skip,
                &mut structural,
                &mut comments,
            )?,
            // Trigger drops are NOT folded into a table drop: the explicit
            // DROP TRIGGER precedes the DROP TABLE after ordering.
            EntityKind::Trigger => diff_kind(
                &current.triggers,
                &target.triggers,
                no_skip,
                no_skip,
                &mut structural,
                &mut comments,
            )?,
        }
    }

    structural.extend(comments);
    Ok(structural)
}
