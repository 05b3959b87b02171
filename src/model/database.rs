//! Keyed entity collections and the whole-model container.
//!
//! A [`Dictionary`] is one kind's collection, mapping identity key to
//! entity in key order (stable output falls out of the ordering). The
//! [`DatabaseModel`] holds one dictionary per kind plus the invariants
//! that tie them together: duplicate keys are rejected at insert, table
//! columns are mirrored into the column dictionary, and every hard
//! dependency reference must resolve before a diff may run.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::ConfigurationError;
use crate::model::ident::{EntityKind, ObjectId};
use crate::model::types::*;

/// One kind's keyed collection. Iteration is in identity-key order.
#[derive(Debug, Clone, PartialEq)]
pub struct Dictionary<T: SchemaObject> {
    items: BTreeMap<ObjectId, T>,
}

impl<T: SchemaObject> Default for Dictionary<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: SchemaObject> Dictionary<T> {
    pub fn new() -> Self {
        Self {
            items: BTreeMap::new(),
        }
    }

    /// Insert an entity, rejecting malformed and duplicate identity keys.
    pub fn insert(&mut self, entity: T) -> Result<(), ConfigurationError> {
        let id = entity.id();
        if !id.is_well_formed() {
            return Err(ConfigurationError::MalformedIdentity(id));
        }
        if self.items.contains_key(&id) {
            return Err(ConfigurationError::DuplicateObject(id));
        }
        self.items.insert(id, entity);
        Ok(())
    }

    pub fn get(&self, id: &ObjectId) -> Option<&T> {
        self.items.get(id)
    }

    pub fn get_mut(&mut self, id: &ObjectId) -> Option<&mut T> {
        self.items.get_mut(id)
    }

    pub fn contains(&self, id: &ObjectId) -> bool {
        self.items.contains_key(id)
    }

    /// Entities in identity-key order.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.values()
    }

    pub fn keys(&self) -> impl Iterator<Item = &ObjectId> {
        self.items.keys()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Both reconciliation inputs are a `DatabaseModel`: `current` built from
/// the live catalogs, `target` from the declarative specification. Only
/// `target` is ever mutated (by the extension engine), and only between
/// construction and diffing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DatabaseModel {
    pub schemas: Dictionary<SchemaState>,
    pub languages: Dictionary<LanguageState>,
    pub types: Dictionary<TypeState>,
    pub sequences: Dictionary<SequenceState>,
    pub tables: Dictionary<TableState>,
    pub columns: Dictionary<ColumnState>,
    pub constraints: Dictionary<ConstraintState>,
    pub indexes: Dictionary<IndexState>,
    pub functions: Dictionary<FunctionState>,
    pub triggers: Dictionary<TriggerState>,
}

impl DatabaseModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a table and mirror its columns into the column dictionary.
    ///
    /// The embedded columns' owner fields are overwritten from the table so
    /// model files do not have to repeat them. A duplicate column name
    /// within the table surfaces as a duplicate-key error here.
    pub fn insert_table(&mut self, mut table: TableState) -> Result<(), ConfigurationError> {
        for col in &mut table.columns {
            col.schema = table.schema.clone();
            col.table = table.name.clone();
        }
        for col in &table.columns {
            self.columns.insert(col.clone())?;
        }
        self.tables.insert(table)
    }

    /// Merge a column produced by extension expansion: insert it into the
    /// column dictionary and append it to the owning table's rendered
    /// column list.
    pub(crate) fn merge_column(&mut self, column: ColumnState) -> Result<(), ConfigurationError> {
        let table_id = ObjectId::new(EntityKind::Table, [&column.schema, &column.table]);
        self.columns.insert(column.clone())?;
        if let Some(table) = self.tables.get_mut(&table_id) {
            table.columns.push(column);
        }
        Ok(())
    }

    /// True when any dictionary holds an entity with this identity.
    pub fn contains_id(&self, id: &ObjectId) -> bool {
        match id.kind {
            EntityKind::Language => self.languages.contains(id),
            EntityKind::Schema => self.schemas.contains(id),
            EntityKind::Type => self.types.contains(id),
            EntityKind::Sequence => self.sequences.contains(id),
            EntityKind::Table => self.tables.contains(id),
            EntityKind::Column => self.columns.contains(id),
            EntityKind::Constraint => self.constraints.contains(id),
            EntityKind::Index => self.indexes.contains(id),
            EntityKind::Function => self.functions.contains(id),
            EntityKind::Trigger => self.triggers.contains(id),
        }
    }

    /// Check that every hard dependency reference resolves within this
    /// model. Run on the target model after extension expansion; an
    /// unresolved reference is a configuration error, never a silent skip.
    pub fn validate_references(&self) -> Result<(), ConfigurationError> {
        fn check<T: SchemaObject>(
            dict: &Dictionary<T>,
            model: &DatabaseModel,
        ) -> Result<(), ConfigurationError> {
            for entity in dict.iter() {
                for reference in entity.depends_on() {
                    if !model.contains_id(&reference) {
                        return Err(ConfigurationError::UnresolvedReference {
                            from: entity.id(),
                            to: reference,
                        });
                    }
                }
            }
            Ok(())
        }

        check(&self.languages, self)?;
        check(&self.schemas, self)?;
        check(&self.types, self)?;
        check(&self.sequences, self)?;
        check(&self.tables, self)?;
        check(&self.columns, self)?;
        check(&self.constraints, self)?;
        check(&self.indexes, self)?;
        check(&self.functions, self)?;
        check(&self.triggers, self)?;

        // Triggers with a procedure reference that cannot even be parsed
        // never produced a function edge above; catch them here.
        for trigger in self.triggers.iter() {
            if trigger.procedure_reference().is_none() {
                return Err(ConfigurationError::MalformedProcedure {
                    procedure: trigger.procedure.clone(),
                    owner: trigger.id(),
                });
            }
        }
        Ok(())
    }

    /// Load a model from a JSON file (a live-catalog snapshot or a parsed
    /// declarative specification — both use the same on-disk shape).
    pub fn from_json_file(path: &Path) -> Result<Self, ModelError> {
        let contents = std::fs::read_to_string(path)?;
        let file: ModelFile = serde_json::from_str(&contents)?;
        Ok(Self::try_from(file)?)
    }
}

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("IO error reading model file: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error(transparent)]
    Invalid(#[from] ConfigurationError),
}

/// On-disk shape of a model file. Entities carry their own identity
/// fields, so each kind is a flat list; columns ride inside their table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelFile {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub schemas: Vec<SchemaState>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub languages: Vec<LanguageState>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub types: Vec<TypeState>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sequences: Vec<SequenceState>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tables: Vec<TableState>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub constraints: Vec<ConstraintState>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub indexes: Vec<IndexState>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub functions: Vec<FunctionState>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub triggers: Vec<TriggerState>,
}

impl TryFrom<ModelFile> for DatabaseModel {
    type Error = ConfigurationError;

    fn try_from(file: ModelFile) -> Result<Self, Self::Error> {
        let mut model = DatabaseModel::new();
        for schema in file.schemas {
            model.schemas.insert(schema)?;
        }
        for language in file.languages {
            model.languages.insert(language)?;
        }
        for ty in file.types {
            model.types.insert(ty)?;
        }
        for sequence in file.sequences {
            model.sequences.insert(sequence)?;
        }
        for table in file.tables {
            model.insert_table(table)?;
        }
        for constraint in file.constraints {
            model.constraints.insert(constraint)?;
        }
        for index in file.indexes {
            model.indexes.insert(index)?;
        }
        for function in file.functions {
            model.functions.insert(function)?;
        }
        for trigger in file.triggers {
            model.triggers.insert(trigger)?;
        }
        Ok(model)
    }
}

impl From<&DatabaseModel> for ModelFile {
    fn from(model: &DatabaseModel) -> Self {
        Self {
            schemas: model.schemas.iter().cloned().collect(),
            languages: model.languages.iter().cloned().collect(),
            types: model.types.iter().cloned().collect(),
            sequences: model.sequences.iter().cloned().collect(),
            tables: model.tables.iter().cloned().collect(),
            constraints: model.constraints.iter().cloned().collect(),
            indexes: model.indexes.iter().cloned().collect(),
            functions: model.functions.iter().cloned().collect(),
            triggers: model.triggers.iter().cloned().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::builder::ModelBuilder;

    #[test]
    fn test_duplicate_key_rejected() {
        let mut dict: Dictionary<SchemaState> = Dictionary::new();
        dict.insert(SchemaState {
            name: "public".to_string(),
            description: None,
        })
        .unwrap();
        let err = dict
            .insert(SchemaState {
                name: "public".to_string(),
                description: Some("again".to_string()),
            })
            .unwrap_err();
        assert!(matches!(err, ConfigurationError::DuplicateObject(_)));
    }

    #[test]
    fn test_empty_identity_component_rejected() {
        let mut dict: Dictionary<SchemaState> = Dictionary::new();
        let err = dict
            .insert(SchemaState {
                name: String::new(),
                description: None,
            })
            .unwrap_err();
        assert!(matches!(err, ConfigurationError::MalformedIdentity(_)));
    }

    #[test]
    fn test_insert_table_mirrors_columns() {
        let model = ModelBuilder::new()
            .schema("public")
            .table("public", "t1", |t| {
                t.column("c1", "integer", true).column("c2", "text", true);
            })
            .build();

        assert_eq!(model.columns.len(), 2);
        let id = ObjectId::new(EntityKind::Column, ["public", "t1", "c1"]);
        let col = model.columns.get(&id).unwrap();
        assert_eq!(col.table, "t1");
        assert_eq!(col.schema, "public");
    }

    #[test]
    fn test_duplicate_column_in_table_rejected() {
        let mut model = DatabaseModel::new();
        let table = TableState {
            schema: "public".to_string(),
            name: "t1".to_string(),
            columns: vec![
                ColumnState {
                    schema: String::new(),
                    table: String::new(),
                    name: "c1".to_string(),
                    type_name: "integer".to_string(),
                    not_null: false,
                    default: None,
                    description: None,
                },
                ColumnState {
                    schema: String::new(),
                    table: String::new(),
                    name: "c1".to_string(),
                    type_name: "text".to_string(),
                    not_null: false,
                    default: None,
                    description: None,
                },
            ],
            extensions: vec![],
            description: None,
        };
        assert!(matches!(
            model.insert_table(table),
            Err(ConfigurationError::DuplicateObject(_))
        ));
    }

    #[test]
    fn test_validate_references_missing_table() {
        let mut model = ModelBuilder::new().schema("public").build();
        model
            .triggers
            .insert(TriggerState {
                schema: "public".to_string(),
                table: "t1".to_string(),
                name: "tr1".to_string(),
                timing: TriggerTiming::Before,
                events: vec![TriggerEvent::Insert],
                columns: vec![],
                level: Some(TriggerLevel::Row),
                condition: None,
                procedure: "f1()".to_string(),
                description: None,
            })
            .unwrap();

        let err = model.validate_references().unwrap_err();
        assert!(matches!(
            err,
            ConfigurationError::UnresolvedReference { .. }
        ));
    }

    #[test]
    fn test_validate_references_malformed_procedure() {
        let mut model = ModelBuilder::new()
            .schema("public")
            .table("public", "t1", |t| {
                t.column("c1", "integer", true);
            })
            .build();
        model
            .triggers
            .insert(TriggerState {
                schema: "public".to_string(),
                table: "t1".to_string(),
                name: "tr1".to_string(),
                timing: TriggerTiming::Before,
                events: vec![TriggerEvent::Insert],
                columns: vec![],
                level: Some(TriggerLevel::Row),
                condition: None,
                procedure: "not a call".to_string(),
                description: None,
            })
            .unwrap();

        let err = model.validate_references().unwrap_err();
        assert!(matches!(err, ConfigurationError::MalformedProcedure { .. }));
    }

    #[test]
    fn test_model_file_round_trip() {
        let model = ModelBuilder::new()
            .schema("public")
            .language("plpgsql")
            .table("public", "t1", |t| {
                t.column("c1", "integer", false)
                    .pk("t1_pkey", &["c1"])
                    .index("t1_c1_idx", &["c1"], false);
            })
            .function(
                "public",
                "f1",
                "",
                "trigger",
                "plpgsql",
                "BEGIN RETURN NEW; END",
            )
            .build();

        let file = ModelFile::from(&model);
        let json = serde_json::to_string_pretty(&file).unwrap();
        let parsed: ModelFile = serde_json::from_str(&json).unwrap();
        let rebuilt = DatabaseModel::try_from(parsed).unwrap();
        assert_eq!(model, rebuilt);
    }
}
