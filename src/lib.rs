//! pg-schema-diff: Declarative schema reconciliation for PostgreSQL
//!
//! This library compares a declared target schema model against a live
//! schema snapshot and produces the ordered DDL statement list that
//! transforms the live schema into the declared one. Before diffing,
//! extension templates (audit-column policies and their generated
//! triggers/functions) are expanded into the target model.

pub mod config;
pub mod diff;
pub mod emit;
pub mod error;
pub mod extend;
pub mod model;
pub mod pipeline;

// Re-export commonly used types
pub use config::Config;
pub use diff::{Entity, Operation};
pub use error::{ConfigurationError, DependencyCycleError, ReconcileError, StructuralDiffError};
pub use extend::templates::ExtensionCatalog;
pub use model::{DatabaseModel, EntityKind, ObjectId};
pub use pipeline::{ReconcileOptions, Reconciler};
