//! Statement emitter.
//!
//! Renders one [`Operation`] into literal DDL text. Purely a function of
//! the operation, the entity's attributes, and the configured default
//! schema — no model-wide state. Names in the default schema render
//! unqualified (`t1`), everything else schema-qualified (`s1.t1`).

use std::fmt::Write;

use crate::diff::{AlterDisposition, Entity, Operation};
use crate::model::{
    ColumnState, ConstraintDefinition, ConstraintState, FunctionState, IndexState, SequenceState,
    TableState, TriggerEvent, TriggerLevel, TriggerState, TypeDefinition, TypeState, Volatility,
};

pub struct StatementEmitter {
    default_schema: String,
}

impl StatementEmitter {
    pub fn new(default_schema: impl Into<String>) -> Self {
        Self {
            default_schema: default_schema.into(),
        }
    }

    /// Render one operation into its statement(s). In-place column alters
    /// produce one ALTER TABLE per changed attribute; recreates produce
    /// the drop immediately followed by the create.
    pub fn render(&self, op: &Operation) -> Vec<String> {
        match op {
            Operation::Create(entity) => vec![self.create(entity)],
            Operation::Drop(entity) => vec![self.drop(entity)],
            Operation::Alter {
                current,
                target,
                changed,
                disposition,
            } => match disposition {
                AlterDisposition::Recreate => vec![self.drop(current), self.create(target)],
                AlterDisposition::InPlace => self.alter_in_place(current, target, changed),
            },
            Operation::SetDescription { entity, text } => {
                vec![self.comment(entity, text.as_deref())]
            }
        }
    }

    fn qualify(&self, schema: &str, name: &str) -> String {
        if schema == self.default_schema {
            name.to_string()
        } else {
            format!("{schema}.{name}")
        }
    }

    // -- creates ------------------------------------------------------------

    fn create(&self, entity: &Entity) -> String {
        match entity {
            Entity::Schema(s) => format!("CREATE SCHEMA {}", s.name),
            Entity::Language(l) => {
                if l.trusted {
                    format!("CREATE TRUSTED LANGUAGE {}", l.name)
                } else {
                    format!("CREATE LANGUAGE {}", l.name)
                }
            }
            Entity::Type(t) => self.create_type(t),
            Entity::Sequence(s) => self.create_sequence(s),
            Entity::Table(t) => self.create_table(t),
            Entity::Column(c) => format!(
                "ALTER TABLE {} ADD COLUMN {}",
                self.qualify(&c.schema, &c.table),
                column_def(c)
            ),
            Entity::Constraint(c) => format!(
                "ALTER TABLE {} ADD CONSTRAINT {} {}",
                self.qualify(&c.schema, &c.table),
                c.name,
                self.constraint_def(c)
            ),
            Entity::Index(i) => self.create_index(i),
            Entity::Function(f) => self.create_function(f, false),
            Entity::Trigger(t) => self.create_trigger(t),
        }
    }

    fn create_table(&self, table: &TableState) -> String {
        let columns: Vec<String> = table.columns.iter().map(column_def).collect();
        format!(
            "CREATE TABLE {} ({})",
            self.qualify(&table.schema, &table.name),
            columns.join(", ")
        )
    }

    fn create_type(&self, ty: &TypeState) -> String {
        let name = self.qualify(&ty.schema, &ty.name);
        match &ty.definition {
            TypeDefinition::Enum { labels } => {
                let labels: Vec<String> = labels.iter().map(|l| quote_literal(l)).collect();
                format!("CREATE TYPE {} AS ENUM ({})", name, labels.join(", "))
            }
            TypeDefinition::Composite { attributes } => {
                let attrs: Vec<String> = attributes
                    .iter()
                    .map(|a| format!("{} {}", a.name, a.type_name))
                    .collect();
                format!("CREATE TYPE {} AS ({})", name, attrs.join(", "))
            }
        }
    }

    fn create_sequence(&self, seq: &SequenceState) -> String {
        let mut stmt = format!(
            "CREATE SEQUENCE {} START WITH {} INCREMENT BY {}",
            self.qualify(&seq.schema, &seq.name),
            seq.start,
            seq.increment
        );
        if let Some(min) = seq.min_value {
            let _ = write!(stmt, " MINVALUE {min}");
        }
        if let Some(max) = seq.max_value {
            let _ = write!(stmt, " MAXVALUE {max}");
        }
        if let Some(cache) = seq.cache {
            let _ = write!(stmt, " CACHE {cache}");
        }
        stmt
    }

    fn create_index(&self, index: &IndexState) -> String {
        let unique = if index.unique { "UNIQUE " } else { "" };
        let mut stmt = format!(
            "CREATE {}INDEX {} ON {} ({})",
            unique,
            index.name,
            self.qualify(&index.schema, &index.table),
            index.columns.join(", ")
        );
        if let Some(pred) = &index.predicate {
            let _ = write!(stmt, " WHERE {pred}");
        }
        stmt
    }

    fn create_function(&self, f: &FunctionState, or_replace: bool) -> String {
        let create = if or_replace {
            "CREATE OR REPLACE FUNCTION"
        } else {
            "CREATE FUNCTION"
        };
        let mut stmt = format!(
            "{} {}({}) RETURNS {} LANGUAGE {} AS $_${}$_$",
            create,
            self.qualify(&f.schema, &f.name),
            f.arguments,
            f.returns,
            f.language,
            f.source
        );
        if let Some(volatility) = f.volatility {
            let keyword = match volatility {
                Volatility::Immutable => "IMMUTABLE",
                Volatility::Stable => "STABLE",
                Volatility::Volatile => "VOLATILE",
            };
            let _ = write!(stmt, " {keyword}");
        }
        stmt
    }

    /// CREATE TRIGGER name {BEFORE|AFTER} event [OR event ...] ON table
    /// [FOR EACH {ROW|STATEMENT}] [WHEN (condition)] EXECUTE PROCEDURE proc().
    ///
    /// Level defaults to STATEMENT and is forced to ROW when an UPDATE OF
    /// column list is present.
    fn create_trigger(&self, t: &TriggerState) -> String {
        let timing = match t.timing {
            crate::model::TriggerTiming::Before => "BEFORE",
            crate::model::TriggerTiming::After => "AFTER",
        };
        let events: Vec<String> = t
            .events
            .iter()
            .map(|event| match event {
                TriggerEvent::Insert => "INSERT".to_string(),
                TriggerEvent::Update if !t.columns.is_empty() => {
                    format!("UPDATE OF {}", t.columns.join(", "))
                }
                TriggerEvent::Update => "UPDATE".to_string(),
                TriggerEvent::Delete => "DELETE".to_string(),
                TriggerEvent::Truncate => "TRUNCATE".to_string(),
            })
            .collect();
        let level = if !t.columns.is_empty() {
            TriggerLevel::Row
        } else {
            t.level.unwrap_or(TriggerLevel::Statement)
        };
        let level = match level {
            TriggerLevel::Row => "ROW",
            TriggerLevel::Statement => "STATEMENT",
        };

        let mut stmt = format!(
            "CREATE TRIGGER {} {} {} ON {} FOR EACH {}",
            t.name,
            timing,
            events.join(" OR "),
            self.qualify(&t.schema, &t.table),
            level
        );
        if let Some(condition) = &t.condition {
            let _ = write!(stmt, " WHEN ({condition})");
        }
        let _ = write!(stmt, " EXECUTE PROCEDURE {}", t.procedure);
        stmt
    }

    // -- drops --------------------------------------------------------------

    fn drop(&self, entity: &Entity) -> String {
        match entity {
            Entity::Schema(s) => format!("DROP SCHEMA {}", s.name),
            Entity::Language(l) => format!("DROP LANGUAGE {}", l.name),
            Entity::Type(t) => format!("DROP TYPE {}", self.qualify(&t.schema, &t.name)),
            Entity::Sequence(s) => {
                format!("DROP SEQUENCE {}", self.qualify(&s.schema, &s.name))
            }
            Entity::Table(t) => format!("DROP TABLE {}", self.qualify(&t.schema, &t.name)),
            Entity::Column(c) => format!(
                "ALTER TABLE {} DROP COLUMN {}",
                self.qualify(&c.schema, &c.table),
                c.name
            ),
            Entity::Constraint(c) => format!(
                "ALTER TABLE {} DROP CONSTRAINT {}",
                self.qualify(&c.schema, &c.table),
                c.name
            ),
            Entity::Index(i) => format!("DROP INDEX {}", self.qualify(&i.schema, &i.name)),
            Entity::Function(f) => format!(
                "DROP FUNCTION {}({})",
                self.qualify(&f.schema, &f.name),
                f.arguments
            ),
            Entity::Trigger(t) => format!(
                "DROP TRIGGER {} ON {}",
                t.name,
                self.qualify(&t.schema, &t.table)
            ),
        }
    }

    // -- in-place alters ----------------------------------------------------

    fn alter_in_place(
        &self,
        current: &Entity,
        target: &Entity,
        changed: &[&'static str],
    ) -> Vec<String> {
        match (current, target) {
            (Entity::Column(_), Entity::Column(c)) => self.alter_column(c, changed),
            (Entity::Sequence(_), Entity::Sequence(s)) => vec![self.alter_sequence(s, changed)],
            (Entity::Function(_), Entity::Function(f)) => vec![self.create_function(f, true)],
            (Entity::Type(c), Entity::Type(t)) => self.alter_type_append(c, t),
            // Schemas and tables have no alterable attributes; the diff
            // never produces an in-place alter for the other kinds.
            _ => vec![],
        }
    }

    fn alter_column(&self, column: &ColumnState, changed: &[&'static str]) -> Vec<String> {
        let prefix = format!(
            "ALTER TABLE {} ALTER COLUMN {}",
            self.qualify(&column.schema, &column.table),
            column.name
        );
        let mut statements = Vec::new();
        for attribute in changed {
            match *attribute {
                "type" => statements.push(format!("{} TYPE {}", prefix, column.type_name)),
                "not_null" => {
                    if column.not_null {
                        statements.push(format!("{prefix} SET NOT NULL"));
                    } else {
                        statements.push(format!("{prefix} DROP NOT NULL"));
                    }
                }
                "default" => match &column.default {
                    Some(expr) => statements.push(format!("{prefix} SET DEFAULT {expr}")),
                    None => statements.push(format!("{prefix} DROP DEFAULT")),
                },
                _ => {}
            }
        }
        statements
    }

    fn alter_sequence(&self, seq: &SequenceState, changed: &[&'static str]) -> String {
        let mut stmt = format!("ALTER SEQUENCE {}", self.qualify(&seq.schema, &seq.name));
        for attribute in changed {
            match *attribute {
                "start" => {
                    let _ = write!(stmt, " RESTART WITH {}", seq.start);
                }
                "increment" => {
                    let _ = write!(stmt, " INCREMENT BY {}", seq.increment);
                }
                "min_value" => match seq.min_value {
                    Some(min) => {
                        let _ = write!(stmt, " MINVALUE {min}");
                    }
                    None => stmt.push_str(" NO MINVALUE"),
                },
                "max_value" => match seq.max_value {
                    Some(max) => {
                        let _ = write!(stmt, " MAXVALUE {max}");
                    }
                    None => stmt.push_str(" NO MAXVALUE"),
                },
                "cache" => {
                    let _ = write!(stmt, " CACHE {}", seq.cache.unwrap_or(1));
                }
                _ => {}
            }
        }
        stmt
    }

    fn alter_type_append(&self, current: &TypeState, target: &TypeState) -> Vec<String> {
        let (TypeDefinition::Enum { labels: old }, TypeDefinition::Enum { labels: new }) =
            (&current.definition, &target.definition)
        else {
            return vec![];
        };
        let name = self.qualify(&target.schema, &target.name);
        new[old.len()..]
            .iter()
            .map(|label| format!("ALTER TYPE {} ADD VALUE {}", name, quote_literal(label)))
            .collect()
    }

    // -- comments -----------------------------------------------------------

    fn comment(&self, entity: &Entity, text: Option<&str>) -> String {
        let object = match entity {
            Entity::Schema(s) => format!("SCHEMA {}", s.name),
            Entity::Language(l) => format!("LANGUAGE {}", l.name),
            Entity::Type(t) => format!("TYPE {}", self.qualify(&t.schema, &t.name)),
            Entity::Sequence(s) => format!("SEQUENCE {}", self.qualify(&s.schema, &s.name)),
            Entity::Table(t) => format!("TABLE {}", self.qualify(&t.schema, &t.name)),
            Entity::Column(c) => {
                format!("COLUMN {}.{}", self.qualify(&c.schema, &c.table), c.name)
            }
            Entity::Constraint(c) => format!(
                "CONSTRAINT {} ON {}",
                c.name,
                self.qualify(&c.schema, &c.table)
            ),
            Entity::Index(i) => format!("INDEX {}", self.qualify(&i.schema, &i.name)),
            Entity::Function(f) => {
                format!("FUNCTION {}({})", self.qualify(&f.schema, &f.name), f.arguments)
            }
            Entity::Trigger(t) => format!(
                "TRIGGER {} ON {}",
                t.name,
                self.qualify(&t.schema, &t.table)
            ),
        };
        match text {
            Some(text) => format!("COMMENT ON {} IS {}", object, quote_literal(text)),
            None => format!("COMMENT ON {object} IS NULL"),
        }
    }

    fn constraint_def(&self, constraint: &ConstraintState) -> String {
        match &constraint.definition {
            ConstraintDefinition::PrimaryKey { columns } => {
                format!("PRIMARY KEY ({})", columns.join(", "))
            }
            ConstraintDefinition::ForeignKey {
                columns,
                ref_schema,
                ref_table,
                ref_columns,
            } => {
                let ref_schema = ref_schema.as_deref().unwrap_or(&constraint.schema);
                format!(
                    "FOREIGN KEY ({}) REFERENCES {} ({})",
                    columns.join(", "),
                    self.qualify(ref_schema, ref_table),
                    ref_columns.join(", ")
                )
            }
            ConstraintDefinition::Unique { columns } => {
                format!("UNIQUE ({})", columns.join(", "))
            }
            ConstraintDefinition::Check { expression } => format!("CHECK ({expression})"),
        }
    }
}

fn column_def(column: &ColumnState) -> String {
    let mut def = format!("{} {}", column.name, column.type_name);
    if column.not_null {
        def.push_str(" NOT NULL");
    }
    if let Some(default) = &column.default {
        let _ = write!(def, " DEFAULT {default}");
    }
    def
}

/// Single-quote a literal, doubling embedded quotes.
fn quote_literal(text: &str) -> String {
    format!("'{}'", text.replace('\'', "''"))
}
