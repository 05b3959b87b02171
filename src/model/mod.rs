//! The schema object model: entity types, identity keys, and the keyed
//! collections that make up a [`DatabaseModel`].

pub mod builder;
pub mod database;
pub mod ident;
pub mod types;

pub use database::{DatabaseModel, Dictionary, ModelError, ModelFile};
pub use ident::{EntityKind, ObjectId, base_type_name, split_procedure};
pub use types::*;
