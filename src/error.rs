//! Error taxonomy for a reconciliation run.
//!
//! Three families: configuration errors (bad input models or extension
//! templates, raised before any statement is emitted), structural diff
//! errors (an attribute change with no alter path), and dependency cycle
//! errors (the create/drop batch cannot be ordered). All are fatal to the
//! run; nothing is retried and no partial statement list is returned.

use thiserror::Error;

use crate::model::ObjectId;

/// Top-level error for `Reconciler::reconcile`.
///
/// Wraps the three error families so callers can match on the class of
/// failure without losing the specific cause.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    StructuralDiff(#[from] StructuralDiffError),

    #[error(transparent)]
    DependencyCycle(#[from] DependencyCycleError),
}

/// Invalid input: the models or the extension catalog cannot be used as
/// given. Raised during model construction, extension expansion, or
/// reference validation — always before diffing starts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("duplicate object: {0}")]
    DuplicateObject(ObjectId),

    #[error("malformed identity (empty key component) for {0:?}")]
    MalformedIdentity(ObjectId),

    #[error("unknown extension '{name}' referenced by {table}")]
    UnknownExtension { name: String, table: ObjectId },

    #[error("extension '{extension}' references undefined {template_kind} template '{name}'")]
    MissingTemplate {
        extension: String,
        template_kind: &'static str,
        name: String,
    },

    #[error("unresolved reference from {from} to {to}")]
    UnresolvedReference { from: ObjectId, to: ObjectId },

    #[error("conflicting redefinition of {0}")]
    ConflictingRedefinition(ObjectId),

    #[error("malformed procedure reference '{procedure}' on {owner}")]
    MalformedProcedure { procedure: String, owner: ObjectId },
}

/// A requested attribute change has no valid in-place alter and no
/// drop-and-recreate policy for its kind.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot alter {id}: no supported path for changing {}", .attributes.join(", "))]
pub struct StructuralDiffError {
    pub id: ObjectId,
    pub attributes: Vec<&'static str>,
}

/// The topological sort could not order a create or drop batch.
///
/// The fixed kind-processing order makes cycles impossible among generated
/// objects, but user-authored cross-references can still produce one. The
/// engine refuses to guess a resolution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("dependency cycle among: {}", format_ids(.ids))]
pub struct DependencyCycleError {
    pub ids: Vec<ObjectId>,
}

fn format_ids(ids: &[ObjectId]) -> String {
    ids.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::EntityKind;

    #[test]
    fn test_cycle_error_lists_all_members() {
        let err = DependencyCycleError {
            ids: vec![
                ObjectId::new(EntityKind::Table, ["public", "a"]),
                ObjectId::new(EntityKind::Table, ["public", "b"]),
            ],
        };
        assert_eq!(
            err.to_string(),
            "dependency cycle among: table public.a, table public.b"
        );
    }

    #[test]
    fn test_structural_diff_error_names_attributes() {
        let err = StructuralDiffError {
            id: ObjectId::new(EntityKind::Type, ["public", "mood"]),
            attributes: vec!["labels"],
        };
        assert_eq!(
            err.to_string(),
            "cannot alter type public.mood: no supported path for changing labels"
        );
    }
}
