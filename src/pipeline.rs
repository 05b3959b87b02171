//! Reconciliation pipeline.
//!
//! The [`Reconciler`] struct encapsulates one run: expand extensions into
//! the target model, validate its references, diff the two models in kind
//! order, correct the ordering topologically, and render statements. It
//! owns the extension catalog and options so that main and tests share
//! the exact same sequence.

use crate::diff::{self, order};
use crate::emit::StatementEmitter;
use crate::error::ReconcileError;
use crate::extend::{self, templates::ExtensionCatalog};
use crate::model::DatabaseModel;

/// Options for a reconciliation run.
#[derive(Debug, Clone)]
pub struct ReconcileOptions {
    /// Schema whose objects render unqualified (the head of the search
    /// path on the executing connection).
    pub default_schema: String,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            default_schema: "public".to_string(),
        }
    }
}

/// One-shot reconciliation engine.
///
/// `current` is read-only throughout; `target` is taken by value because
/// extension expansion mutates it and both models are discarded when the
/// run ends.
pub struct Reconciler {
    catalog: ExtensionCatalog,
    options: ReconcileOptions,
}

impl Reconciler {
    pub fn new(catalog: ExtensionCatalog, options: ReconcileOptions) -> Self {
        Self { catalog, options }
    }

    /// Produce the ordered statement list that transforms `current` into
    /// `target`. Empty when the models already match.
    ///
    /// Statements are intended to be executed verbatim, in order, inside
    /// one transaction; the ordering guarantee is what makes a single
    /// transaction safe.
    pub fn reconcile(
        &self,
        current: &DatabaseModel,
        mut target: DatabaseModel,
    ) -> Result<Vec<String>, ReconcileError> {
        extend::apply_all(&self.catalog, current, &mut target)?;
        target.validate_references()?;

        let operations = diff::diff_models(current, &target)?;
        let operations = order::order_operations(operations)?;

        let emitter = StatementEmitter::new(self.options.default_schema.clone());
        Ok(operations
            .iter()
            .flat_map(|op| emitter.render(op))
            .collect())
    }
}

impl Default for Reconciler {
    fn default() -> Self {
        Self::new(ExtensionCatalog::built_in(), ReconcileOptions::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::builder::ModelBuilder;

    #[test]
    fn test_reconcile_identical_is_empty() {
        let make = || {
            ModelBuilder::new()
                .schema("public")
                .table("public", "t1", |t| {
                    t.column("c1", "integer", true).pk("t1_pkey", &["c1"]);
                })
                .build()
        };
        let statements = Reconciler::default().reconcile(&make(), make()).unwrap();
        assert!(statements.is_empty());
    }

    #[test]
    fn test_reconcile_validates_after_expansion() {
        // A trigger whose function exists nowhere survives expansion (it
        // carries no extension reference), so validation must reject it.
        let current = ModelBuilder::new().schema("public").build();
        let target = ModelBuilder::new()
            .schema("public")
            .table("public", "t1", |t| {
                t.column("c1", "integer", true).trigger("tr1", |tr| {
                    tr.procedure("missing()");
                });
            })
            .build();

        let err = Reconciler::default()
            .reconcile(&current, target)
            .unwrap_err();
        assert!(matches!(err, ReconcileError::Configuration(_)));
    }
}
