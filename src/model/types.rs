//! Schema entity types.
//!
//! One state struct per object kind, carrying the identity components,
//! the kind-specific attributes, and an optional description (comment).
//! Descriptions are diffed independently of structural attributes: the
//! [`SchemaObject::changed_attributes`] contract deliberately ignores them.

use serde::{Deserialize, Serialize};

use crate::model::ident::{EntityKind, ObjectId, base_type_name, split_procedure};

/// Common behavior of every entity state type.
///
/// `changed_attributes` lists the structural attributes that differ from
/// `target`; an empty list means the two are structurally equal (the basis
/// of alter-vs-noop decisions). `depends_on` returns hard references that
/// must resolve within the target model; `ordering_edges` adds soft
/// references that only influence create/drop ordering.
pub trait SchemaObject: Clone + PartialEq {
    const KIND: EntityKind;

    fn id(&self) -> ObjectId;

    fn description(&self) -> Option<&str>;

    fn depends_on(&self) -> Vec<ObjectId>;

    /// Edges used by the topological sort. Defaults to the hard references.
    fn ordering_edges(&self) -> Vec<ObjectId> {
        self.depends_on()
    }

    fn changed_attributes(&self, target: &Self) -> Vec<&'static str>;

    fn structurally_equal(&self, target: &Self) -> bool {
        self.changed_attributes(target).is_empty()
    }
}

fn schema_ref(schema: &str) -> ObjectId {
    ObjectId::new(EntityKind::Schema, [schema])
}

fn table_ref(schema: &str, table: &str) -> ObjectId {
    ObjectId::new(EntityKind::Table, [schema, table])
}

/// Procedural languages that are always available and never modeled as
/// entities (a function in one of these has no language dependency edge).
pub fn is_builtin_language(name: &str) -> bool {
    matches!(name, "sql" | "c" | "internal")
}

// ---------------------------------------------------------------------------
// Schemas and languages
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaState {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl SchemaObject for SchemaState {
    const KIND: EntityKind = EntityKind::Schema;

    fn id(&self) -> ObjectId {
        ObjectId::new(EntityKind::Schema, [self.name.as_str()])
    }

    fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    fn depends_on(&self) -> Vec<ObjectId> {
        vec![]
    }

    fn changed_attributes(&self, _target: &Self) -> Vec<&'static str> {
        // A schema's identity is its only structural attribute.
        vec![]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageState {
    pub name: String,
    #[serde(default = "default_true")]
    pub trusted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

fn default_true() -> bool {
    true
}

impl SchemaObject for LanguageState {
    const KIND: EntityKind = EntityKind::Language;

    fn id(&self) -> ObjectId {
        ObjectId::new(EntityKind::Language, [self.name.as_str()])
    }

    fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    fn depends_on(&self) -> Vec<ObjectId> {
        vec![]
    }

    fn changed_attributes(&self, target: &Self) -> Vec<&'static str> {
        let mut changed = Vec::new();
        if self.trusted != target.trusted {
            changed.push("trusted");
        }
        changed
    }
}

// ---------------------------------------------------------------------------
// Types and sequences
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TypeDefinition {
    Enum { labels: Vec<String> },
    Composite { attributes: Vec<TypeAttribute> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeAttribute {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeState {
    pub schema: String,
    pub name: String,
    pub definition: TypeDefinition,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl TypeState {
    /// True when `target` only appends enum labels to this type — the one
    /// type change PostgreSQL can apply in place.
    pub fn is_label_append(&self, target: &Self) -> bool {
        match (&self.definition, &target.definition) {
            (
                TypeDefinition::Enum { labels: current },
                TypeDefinition::Enum { labels: target },
            ) => target.len() > current.len() && target[..current.len()] == current[..],
            _ => false,
        }
    }
}

impl SchemaObject for TypeState {
    const KIND: EntityKind = EntityKind::Type;

    fn id(&self) -> ObjectId {
        ObjectId::new(EntityKind::Type, [&self.schema, &self.name])
    }

    fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    fn depends_on(&self) -> Vec<ObjectId> {
        vec![schema_ref(&self.schema)]
    }

    fn ordering_edges(&self) -> Vec<ObjectId> {
        let mut edges = self.depends_on();
        // A composite attribute may use another declared type; the edge is
        // soft (built-in attribute types resolve to nothing).
        if let TypeDefinition::Composite { attributes } = &self.definition {
            for attr in attributes {
                let (type_schema, base) = base_type_name(&attr.type_name);
                let schema = type_schema.unwrap_or_else(|| self.schema.clone());
                edges.push(ObjectId::new(EntityKind::Type, [schema, base]));
            }
        }
        edges
    }

    fn changed_attributes(&self, target: &Self) -> Vec<&'static str> {
        let mut changed = Vec::new();
        if self.definition != target.definition {
            changed.push(match target.definition {
                TypeDefinition::Enum { .. } => "labels",
                TypeDefinition::Composite { .. } => "attributes",
            });
        }
        changed
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceState {
    pub schema: String,
    pub name: String,
    #[serde(default = "default_one")]
    pub start: i64,
    #[serde(default = "default_one")]
    pub increment: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_value: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_value: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

fn default_one() -> i64 {
    1
}

impl SchemaObject for SequenceState {
    const KIND: EntityKind = EntityKind::Sequence;

    fn id(&self) -> ObjectId {
        ObjectId::new(EntityKind::Sequence, [&self.schema, &self.name])
    }

    fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    fn depends_on(&self) -> Vec<ObjectId> {
        vec![schema_ref(&self.schema)]
    }

    fn changed_attributes(&self, target: &Self) -> Vec<&'static str> {
        let mut changed = Vec::new();
        if self.start != target.start {
            changed.push("start");
        }
        if self.increment != target.increment {
            changed.push("increment");
        }
        if self.min_value != target.min_value {
            changed.push("min_value");
        }
        if self.max_value != target.max_value {
            changed.push("max_value");
        }
        if self.cache != target.cache {
            changed.push("cache");
        }
        changed
    }
}

// ---------------------------------------------------------------------------
// Tables and columns
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableState {
    pub schema: String,
    pub name: String,
    /// Columns in declaration order, used to render CREATE TABLE. The
    /// per-column diff runs over the model's column dictionary instead.
    #[serde(default)]
    pub columns: Vec<ColumnState>,
    /// Unexpanded extension references (target models only). Drained by
    /// the extension engine before diffing; never a structural attribute.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extensions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl SchemaObject for TableState {
    const KIND: EntityKind = EntityKind::Table;

    fn id(&self) -> ObjectId {
        ObjectId::new(EntityKind::Table, [&self.schema, &self.name])
    }

    fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    fn depends_on(&self) -> Vec<ObjectId> {
        vec![schema_ref(&self.schema)]
    }

    fn ordering_edges(&self) -> Vec<ObjectId> {
        let mut edges = self.depends_on();
        // Column types can pin a table's create after a type's create.
        for col in &self.columns {
            edges.push(col.type_reference());
        }
        edges
    }

    fn changed_attributes(&self, _target: &Self) -> Vec<&'static str> {
        // Tables have no alterable table-level attributes; columns,
        // constraints and indexes are diffed as their own kinds.
        vec![]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnState {
    #[serde(default)]
    pub schema: String,
    #[serde(default)]
    pub table: String,
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub not_null: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ColumnState {
    /// Candidate identity of the column's data type, resolved against the
    /// column's own schema when the type name is unqualified. Soft: only
    /// meaningful when a matching type entity exists in the same batch.
    pub fn type_reference(&self) -> ObjectId {
        let (type_schema, base) = base_type_name(&self.type_name);
        let schema = type_schema.unwrap_or_else(|| self.schema.clone());
        ObjectId::new(EntityKind::Type, [schema, base])
    }
}

impl SchemaObject for ColumnState {
    const KIND: EntityKind = EntityKind::Column;

    fn id(&self) -> ObjectId {
        ObjectId::new(EntityKind::Column, [&self.schema, &self.table, &self.name])
    }

    fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    fn depends_on(&self) -> Vec<ObjectId> {
        vec![schema_ref(&self.schema), table_ref(&self.schema, &self.table)]
    }

    fn ordering_edges(&self) -> Vec<ObjectId> {
        let mut edges = self.depends_on();
        edges.push(self.type_reference());
        edges
    }

    fn changed_attributes(&self, target: &Self) -> Vec<&'static str> {
        let mut changed = Vec::new();
        if self.type_name != target.type_name {
            changed.push("type");
        }
        if self.not_null != target.not_null {
            changed.push("not_null");
        }
        if self.default != target.default {
            changed.push("default");
        }
        changed
    }
}

// ---------------------------------------------------------------------------
// Constraints and indexes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConstraintDefinition {
    PrimaryKey {
        columns: Vec<String>,
    },
    ForeignKey {
        columns: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        ref_schema: Option<String>,
        ref_table: String,
        ref_columns: Vec<String>,
    },
    Unique {
        columns: Vec<String>,
    },
    Check {
        expression: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstraintState {
    pub schema: String,
    pub table: String,
    pub name: String,
    pub definition: ConstraintDefinition,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ConstraintState {
    /// The table a foreign key points at, with an unqualified reference
    /// resolving to the constraint's own schema.
    pub fn referenced_table(&self) -> Option<ObjectId> {
        match &self.definition {
            ConstraintDefinition::ForeignKey {
                ref_schema,
                ref_table,
                ..
            } => {
                let schema = ref_schema.as_deref().unwrap_or(&self.schema);
                Some(table_ref(schema, ref_table))
            }
            _ => None,
        }
    }

    /// Columns of the owning table this constraint is declared over.
    /// Dropping such a column implicitly drops the constraint, so the
    /// constraint must be ordered as a dependent of its columns. CHECK
    /// expressions are opaque and contribute nothing.
    fn local_columns(&self) -> &[String] {
        match &self.definition {
            ConstraintDefinition::PrimaryKey { columns }
            | ConstraintDefinition::ForeignKey { columns, .. }
            | ConstraintDefinition::Unique { columns } => columns,
            ConstraintDefinition::Check { .. } => &[],
        }
    }
}

impl SchemaObject for ConstraintState {
    const KIND: EntityKind = EntityKind::Constraint;

    fn id(&self) -> ObjectId {
        ObjectId::new(
            EntityKind::Constraint,
            [&self.schema, &self.table, &self.name],
        )
    }

    fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    fn depends_on(&self) -> Vec<ObjectId> {
        let mut refs = vec![schema_ref(&self.schema), table_ref(&self.schema, &self.table)];
        if let Some(referenced) = self.referenced_table() {
            refs.push(referenced);
        }
        for column in self.local_columns() {
            refs.push(ObjectId::new(
                EntityKind::Column,
                [&self.schema, &self.table, column],
            ));
        }
        refs
    }

    fn changed_attributes(&self, target: &Self) -> Vec<&'static str> {
        let mut changed = Vec::new();
        if self.definition != target.definition {
            changed.push("definition");
        }
        changed
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexState {
    pub schema: String,
    pub table: String,
    pub name: String,
    pub columns: Vec<String>,
    #[serde(default)]
    pub unique: bool,
    /// WHERE clause for partial indexes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub predicate: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl SchemaObject for IndexState {
    const KIND: EntityKind = EntityKind::Index;

    fn id(&self) -> ObjectId {
        ObjectId::new(EntityKind::Index, [&self.schema, &self.table, &self.name])
    }

    fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    fn depends_on(&self) -> Vec<ObjectId> {
        let mut refs = vec![schema_ref(&self.schema), table_ref(&self.schema, &self.table)];
        // Dropping an indexed column implicitly drops the index; the
        // index must be ordered as a dependent of its columns.
        for column in &self.columns {
            refs.push(ObjectId::new(
                EntityKind::Column,
                [&self.schema, &self.table, column],
            ));
        }
        refs
    }

    fn changed_attributes(&self, target: &Self) -> Vec<&'static str> {
        let mut changed = Vec::new();
        if self.columns != target.columns {
            changed.push("columns");
        }
        if self.unique != target.unique {
            changed.push("unique");
        }
        if self.predicate != target.predicate {
            changed.push("predicate");
        }
        changed
    }
}

// ---------------------------------------------------------------------------
// Functions and triggers
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Volatility {
    Immutable,
    Stable,
    Volatile,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionState {
    pub schema: String,
    pub name: String,
    /// Argument type list as written in the signature, e.g. `""` for `f()`
    /// or `"integer, text"`. Part of the identity key.
    #[serde(default)]
    pub arguments: String,
    pub returns: String,
    pub language: String,
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volatility: Option<Volatility>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl FunctionState {
    /// Schema-local signature, e.g. `f1(integer)`.
    pub fn signature(&self) -> String {
        format!("{}({})", self.name, self.arguments)
    }
}

impl SchemaObject for FunctionState {
    const KIND: EntityKind = EntityKind::Function;

    fn id(&self) -> ObjectId {
        ObjectId::new(
            EntityKind::Function,
            [&self.schema, &self.name, &self.arguments],
        )
    }

    fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    fn depends_on(&self) -> Vec<ObjectId> {
        let mut refs = vec![schema_ref(&self.schema)];
        if !is_builtin_language(&self.language) {
            refs.push(ObjectId::new(EntityKind::Language, [self.language.as_str()]));
        }
        refs
    }

    fn changed_attributes(&self, target: &Self) -> Vec<&'static str> {
        let mut changed = Vec::new();
        if self.returns != target.returns {
            changed.push("returns");
        }
        if self.language != target.language {
            changed.push("language");
        }
        if self.source != target.source {
            changed.push("source");
        }
        if self.volatility != target.volatility {
            changed.push("volatility");
        }
        changed
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerTiming {
    Before,
    After,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerEvent {
    Insert,
    Update,
    Delete,
    Truncate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerLevel {
    Row,
    Statement,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerState {
    pub schema: String,
    pub table: String,
    pub name: String,
    pub timing: TriggerTiming,
    pub events: Vec<TriggerEvent>,
    /// Column list for UPDATE OF. Forces row level when non-empty.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub columns: Vec<String>,
    /// FOR EACH level; statement when unspecified.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<TriggerLevel>,
    /// WHEN condition, stored as written (usually parenthesized).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    /// Procedure call reference, e.g. `f1()` or `s1.f1()`.
    pub procedure: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl TriggerState {
    /// Identity of the function this trigger executes, parsed from the
    /// procedure reference. `None` when the reference is malformed (caught
    /// separately by reference validation).
    pub fn procedure_reference(&self) -> Option<ObjectId> {
        split_procedure(&self.procedure, &self.schema)
            .map(|(schema, name, args)| ObjectId::new(EntityKind::Function, [schema, name, args]))
    }
}

impl SchemaObject for TriggerState {
    const KIND: EntityKind = EntityKind::Trigger;

    fn id(&self) -> ObjectId {
        ObjectId::new(EntityKind::Trigger, [&self.schema, &self.table, &self.name])
    }

    fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    fn depends_on(&self) -> Vec<ObjectId> {
        let mut refs = vec![schema_ref(&self.schema), table_ref(&self.schema, &self.table)];
        if let Some(function) = self.procedure_reference() {
            refs.push(function);
        }
        refs
    }

    fn changed_attributes(&self, target: &Self) -> Vec<&'static str> {
        let mut changed = Vec::new();
        if self.timing != target.timing {
            changed.push("timing");
        }
        if self.events != target.events {
            changed.push("events");
        }
        if self.columns != target.columns {
            changed.push("columns");
        }
        if self.level != target.level {
            changed.push("level");
        }
        if self.condition != target.condition {
            changed.push("condition");
        }
        if self.procedure != target.procedure {
            changed.push("procedure");
        }
        changed
    }
}
