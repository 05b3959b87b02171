//! Test harness for building database models.
//!
//! A fluent API for constructing `DatabaseModel` state in tests, so test
//! cases read as schema declarations rather than struct literals.
//!
//! # Example
//!
//! ```rust
//! use pg_schema_diff::model::builder::ModelBuilder;
//!
//! let model = ModelBuilder::new()
//!     .schema("public")
//!     .table("public", "orders", |t| {
//!         t.column("id", "integer", false)
//!             .column("status", "text", true)
//!             .pk("orders_pkey", &["id"])
//!             .index("idx_status", &["status"], false);
//!     })
//!     .build();
//! ```

use crate::model::database::DatabaseModel;
use crate::model::types::*;

/// Builder for constructing a DatabaseModel in tests.
///
/// Panics on duplicate identities — a mistake in test setup, not a
/// runtime condition.
pub struct ModelBuilder {
    model: DatabaseModel,
    pending: Vec<Pending>,
}

enum Pending {
    Constraint(ConstraintState),
    Index(IndexState),
    Trigger(TriggerState),
}

impl ModelBuilder {
    pub fn new() -> Self {
        Self {
            model: DatabaseModel::new(),
            pending: Vec::new(),
        }
    }

    pub fn schema(mut self, name: &str) -> Self {
        self.model
            .schemas
            .insert(SchemaState {
                name: name.to_string(),
                description: None,
            })
            .expect("duplicate schema in ModelBuilder");
        self
    }

    pub fn language(mut self, name: &str) -> Self {
        self.model
            .languages
            .insert(LanguageState {
                name: name.to_string(),
                trusted: true,
                description: None,
            })
            .expect("duplicate language in ModelBuilder");
        self
    }

    pub fn enum_type(mut self, schema: &str, name: &str, labels: &[&str]) -> Self {
        self.model
            .types
            .insert(TypeState {
                schema: schema.to_string(),
                name: name.to_string(),
                definition: TypeDefinition::Enum {
                    labels: labels.iter().map(|s| s.to_string()).collect(),
                },
                description: None,
            })
            .expect("duplicate type in ModelBuilder");
        self
    }

    pub fn sequence(mut self, schema: &str, name: &str) -> Self {
        self.model
            .sequences
            .insert(SequenceState {
                schema: schema.to_string(),
                name: name.to_string(),
                start: 1,
                increment: 1,
                min_value: None,
                max_value: None,
                cache: None,
                description: None,
            })
            .expect("duplicate sequence in ModelBuilder");
        self
    }

    pub fn function(
        mut self,
        schema: &str,
        name: &str,
        arguments: &str,
        returns: &str,
        language: &str,
        source: &str,
    ) -> Self {
        self.model
            .functions
            .insert(FunctionState {
                schema: schema.to_string(),
                name: name.to_string(),
                arguments: arguments.to_string(),
                returns: returns.to_string(),
                language: language.to_string(),
                source: source.to_string(),
                volatility: None,
                description: None,
            })
            .expect("duplicate function in ModelBuilder");
        self
    }

    /// Add a table. The closure receives a [`TableBuilder`] to configure
    /// columns, constraints, indexes, and triggers.
    pub fn table(mut self, schema: &str, name: &str, f: impl FnOnce(&mut TableBuilder)) -> Self {
        let mut builder = TableBuilder::new(schema, name);
        f(&mut builder);
        let (table, attached) = builder.build();
        self.model
            .insert_table(table)
            .expect("duplicate table or column in ModelBuilder");
        self.pending.extend(attached);
        self
    }

    pub fn build(mut self) -> DatabaseModel {
        for item in self.pending.drain(..) {
            match item {
                Pending::Constraint(c) => self
                    .model
                    .constraints
                    .insert(c)
                    .expect("duplicate constraint in ModelBuilder"),
                Pending::Index(i) => self
                    .model
                    .indexes
                    .insert(i)
                    .expect("duplicate index in ModelBuilder"),
                Pending::Trigger(t) => self
                    .model
                    .triggers
                    .insert(t)
                    .expect("duplicate trigger in ModelBuilder"),
            }
        }
        self.model
    }
}

impl Default for ModelBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for one table and the objects attached to it.
pub struct TableBuilder {
    table: TableState,
    attached: Vec<Pending>,
}

impl TableBuilder {
    fn new(schema: &str, name: &str) -> Self {
        Self {
            table: TableState {
                schema: schema.to_string(),
                name: name.to_string(),
                columns: vec![],
                extensions: vec![],
                description: None,
            },
            attached: vec![],
        }
    }

    /// Add a column without a default value.
    pub fn column(&mut self, name: &str, type_name: &str, nullable: bool) -> &mut Self {
        self.table.columns.push(ColumnState {
            schema: String::new(),
            table: String::new(),
            name: name.to_string(),
            type_name: type_name.to_string(),
            not_null: !nullable,
            default: None,
            description: None,
        });
        self
    }

    /// Add a column with a default value expression.
    pub fn column_with_default(
        &mut self,
        name: &str,
        type_name: &str,
        nullable: bool,
        default: &str,
    ) -> &mut Self {
        self.table.columns.push(ColumnState {
            schema: String::new(),
            table: String::new(),
            name: name.to_string(),
            type_name: type_name.to_string(),
            not_null: !nullable,
            default: Some(default.to_string()),
            description: None,
        });
        self
    }

    /// Set the description of the most recently added column.
    pub fn column_description(&mut self, text: &str) -> &mut Self {
        if let Some(col) = self.table.columns.last_mut() {
            col.description = Some(text.to_string());
        }
        self
    }

    pub fn description(&mut self, text: &str) -> &mut Self {
        self.table.description = Some(text.to_string());
        self
    }

    /// Reference an extension template by name (expanded before diffing).
    pub fn extension(&mut self, name: &str) -> &mut Self {
        self.table.extensions.push(name.to_string());
        self
    }

    pub fn pk(&mut self, name: &str, columns: &[&str]) -> &mut Self {
        self.constraint(
            name,
            ConstraintDefinition::PrimaryKey {
                columns: columns.iter().map(|s| s.to_string()).collect(),
            },
        )
    }

    pub fn fk(
        &mut self,
        name: &str,
        columns: &[&str],
        ref_table: &str,
        ref_columns: &[&str],
    ) -> &mut Self {
        self.constraint(
            name,
            ConstraintDefinition::ForeignKey {
                columns: columns.iter().map(|s| s.to_string()).collect(),
                ref_schema: None,
                ref_table: ref_table.to_string(),
                ref_columns: ref_columns.iter().map(|s| s.to_string()).collect(),
            },
        )
    }

    pub fn unique(&mut self, name: &str, columns: &[&str]) -> &mut Self {
        self.constraint(
            name,
            ConstraintDefinition::Unique {
                columns: columns.iter().map(|s| s.to_string()).collect(),
            },
        )
    }

    pub fn check(&mut self, name: &str, expression: &str) -> &mut Self {
        self.constraint(
            name,
            ConstraintDefinition::Check {
                expression: expression.to_string(),
            },
        )
    }

    fn constraint(&mut self, name: &str, definition: ConstraintDefinition) -> &mut Self {
        self.attached.push(Pending::Constraint(ConstraintState {
            schema: self.table.schema.clone(),
            table: self.table.name.clone(),
            name: name.to_string(),
            definition,
            description: None,
        }));
        self
    }

    pub fn index(&mut self, name: &str, columns: &[&str], unique: bool) -> &mut Self {
        self.attached.push(Pending::Index(IndexState {
            schema: self.table.schema.clone(),
            table: self.table.name.clone(),
            name: name.to_string(),
            columns: columns.iter().map(|s| s.to_string()).collect(),
            unique,
            predicate: None,
            description: None,
        }));
        self
    }

    /// Add a trigger. The closure receives a [`TriggerBuilder`]; the
    /// procedure reference must be set.
    pub fn trigger(&mut self, name: &str, f: impl FnOnce(&mut TriggerBuilder)) -> &mut Self {
        let mut builder = TriggerBuilder::new(&self.table.schema, &self.table.name, name);
        f(&mut builder);
        self.attached.push(Pending::Trigger(builder.build()));
        self
    }

    fn build(self) -> (TableState, Vec<Pending>) {
        (self.table, self.attached)
    }
}

/// Builder for a trigger attached to a table.
pub struct TriggerBuilder {
    state: TriggerState,
}

impl TriggerBuilder {
    fn new(schema: &str, table: &str, name: &str) -> Self {
        Self {
            state: TriggerState {
                schema: schema.to_string(),
                table: table.to_string(),
                name: name.to_string(),
                timing: TriggerTiming::Before,
                events: vec![TriggerEvent::Insert],
                columns: vec![],
                level: None,
                condition: None,
                procedure: String::new(),
                description: None,
            },
        }
    }

    pub fn timing(&mut self, timing: TriggerTiming) -> &mut Self {
        self.state.timing = timing;
        self
    }

    pub fn events(&mut self, events: &[TriggerEvent]) -> &mut Self {
        self.state.events = events.to_vec();
        self
    }

    pub fn update_of(&mut self, columns: &[&str]) -> &mut Self {
        self.state.columns = columns.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn level(&mut self, level: TriggerLevel) -> &mut Self {
        self.state.level = Some(level);
        self
    }

    pub fn when(&mut self, condition: &str) -> &mut Self {
        self.state.condition = Some(condition.to_string());
        self
    }

    pub fn procedure(&mut self, procedure: &str) -> &mut Self {
        self.state.procedure = procedure.to_string();
        self
    }

    pub fn description(&mut self, text: &str) -> &mut Self {
        self.state.description = Some(text.to_string());
        self
    }

    fn build(self) -> TriggerState {
        assert!(
            !self.state.procedure.is_empty(),
            "trigger '{}' needs a procedure",
            self.state.name
        );
        self.state
    }
}
