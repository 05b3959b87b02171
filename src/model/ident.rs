//! Entity kinds and composite identity keys.
//!
//! Every schema object is addressed by an [`ObjectId`]: its kind plus an
//! ordered tuple of name components. The tuple shape is fixed per kind
//! (e.g. `(schema, table, column)` for a column, `(schema, name, args)`
//! for a function — argument signatures are part of function identity
//! because overloading is legal).

use std::fmt;

use strum_macros::EnumIter;

/// The fixed set of schema object kinds.
///
/// Declaration order is the cross-kind diff processing order: each kind's
/// diff runs after the kinds it usually depends on (for creates) and
/// before them (for drops, which are reversed later). Comments are a
/// final phase, not a kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, EnumIter)]
pub enum EntityKind {
    Language,
    Schema,
    Type,
    Sequence,
    Table,
    Column,
    Constraint,
    Index,
    Function,
    Trigger,
}

impl EntityKind {
    /// Zero-allocation string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Language => "language",
            EntityKind::Schema => "schema",
            EntityKind::Type => "type",
            EntityKind::Sequence => "sequence",
            EntityKind::Table => "table",
            EntityKind::Column => "column",
            EntityKind::Constraint => "constraint",
            EntityKind::Index => "index",
            EntityKind::Function => "function",
            EntityKind::Trigger => "trigger",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Composite identity key: kind + ordered name components.
///
/// Component layout per kind:
/// - schema, language: `(name)`
/// - table, sequence, type: `(schema, name)`
/// - column, constraint, index, trigger: `(schema, table, name)`
/// - function: `(schema, name, arguments)`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectId {
    pub kind: EntityKind,
    pub path: Vec<String>,
}

impl ObjectId {
    pub fn new<I, S>(kind: EntityKind, path: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            kind,
            path: path.into_iter().map(Into::into).collect(),
        }
    }

    /// The schema component, if this kind is schema-scoped.
    pub fn schema(&self) -> Option<&str> {
        match self.kind {
            EntityKind::Schema | EntityKind::Language => None,
            _ => self.path.first().map(String::as_str),
        }
    }

    /// Number of key components this kind's identity carries.
    pub fn expected_components(kind: EntityKind) -> usize {
        match kind {
            EntityKind::Schema | EntityKind::Language => 1,
            EntityKind::Table | EntityKind::Sequence | EntityKind::Type => 2,
            EntityKind::Column
            | EntityKind::Constraint
            | EntityKind::Index
            | EntityKind::Trigger
            | EntityKind::Function => 3,
        }
    }

    /// An identity is well-formed when it has the right arity and no empty
    /// component — except a function's argument list, which is legitimately
    /// empty for `f()`.
    pub fn is_well_formed(&self) -> bool {
        if self.path.len() != Self::expected_components(self.kind) {
            return false;
        }
        let required = match self.kind {
            EntityKind::Function => &self.path[..2],
            _ => &self.path[..],
        };
        required.iter().all(|component| !component.is_empty())
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let p = &self.path;
        match self.kind {
            EntityKind::Schema | EntityKind::Language => {
                write!(f, "{} {}", self.kind, p[0])
            }
            EntityKind::Table | EntityKind::Sequence | EntityKind::Type => {
                write!(f, "{} {}.{}", self.kind, p[0], p[1])
            }
            EntityKind::Column => write!(f, "column {}.{}.{}", p[0], p[1], p[2]),
            EntityKind::Constraint | EntityKind::Index | EntityKind::Trigger => {
                write!(f, "{} {} on {}.{}", self.kind, p[2], p[0], p[1])
            }
            EntityKind::Function => write!(f, "function {}.{}({})", p[0], p[1], p[2]),
        }
    }
}

/// Split a procedure call reference like `f1()` or `s1.f1(integer)` into
/// `(schema, name, arguments)`, resolving an unqualified name against the
/// given default schema (the referencing entity's own schema).
///
/// Returns `None` when the text does not have the `name(args)` shape.
pub fn split_procedure(procedure: &str, default_schema: &str) -> Option<(String, String, String)> {
    let open = procedure.find('(')?;
    if !procedure.ends_with(')') {
        return None;
    }
    let qualified = procedure[..open].trim();
    let arguments = procedure[open + 1..procedure.len() - 1].trim();
    if qualified.is_empty() {
        return None;
    }
    let (schema, name) = match qualified.split_once('.') {
        Some((s, n)) if !s.is_empty() && !n.is_empty() => (s.to_string(), n.to_string()),
        Some(_) => return None,
        None => (default_schema.to_string(), qualified.to_string()),
    };
    Some((schema, name, arguments.to_string()))
}

/// Reduce a column type to its bare type name for type-dependency probing:
/// strips modifiers and array brackets, and splits off an explicit schema
/// qualifier. `varchar(63)` → `(None, "varchar")`, `s1.mood[]` → `(Some("s1"), "mood")`.
pub fn base_type_name(type_name: &str) -> (Option<String>, String) {
    let mut base = type_name.trim();
    if let Some(open) = base.find('(') {
        base = base[..open].trim_end();
    }
    base = base.trim_end_matches("[]").trim_end();
    match base.split_once('.') {
        Some((schema, name)) if !schema.is_empty() && !name.is_empty() => {
            (Some(schema.to_string()), name.to_string())
        }
        _ => (None, base.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_kind_order_is_processing_order() {
        let kinds: Vec<EntityKind> = EntityKind::iter().collect();
        assert_eq!(
            kinds,
            vec![
                EntityKind::Language,
                EntityKind::Schema,
                EntityKind::Type,
                EntityKind::Sequence,
                EntityKind::Table,
                EntityKind::Column,
                EntityKind::Constraint,
                EntityKind::Index,
                EntityKind::Function,
                EntityKind::Trigger,
            ]
        );
    }

    #[test]
    fn test_object_id_display() {
        assert_eq!(
            ObjectId::new(EntityKind::Schema, ["public"]).to_string(),
            "schema public"
        );
        assert_eq!(
            ObjectId::new(EntityKind::Table, ["public", "t1"]).to_string(),
            "table public.t1"
        );
        assert_eq!(
            ObjectId::new(EntityKind::Trigger, ["public", "t1", "tr1"]).to_string(),
            "trigger tr1 on public.t1"
        );
        assert_eq!(
            ObjectId::new(EntityKind::Function, ["public", "f1", ""]).to_string(),
            "function public.f1()"
        );
    }

    #[test]
    fn test_object_id_ordering_is_path_order() {
        let a = ObjectId::new(EntityKind::Column, ["public", "t1", "c1"]);
        let b = ObjectId::new(EntityKind::Column, ["public", "t1", "c2"]);
        let c = ObjectId::new(EntityKind::Column, ["public", "t2", "c1"]);
        assert!(a < b);
        assert!(b < c);
    }

    #[test]
    fn test_well_formed_identity() {
        assert!(ObjectId::new(EntityKind::Table, ["public", "t1"]).is_well_formed());
        // Empty argument list is a legal function identity.
        assert!(ObjectId::new(EntityKind::Function, ["public", "f1", ""]).is_well_formed());
        assert!(!ObjectId::new(EntityKind::Function, ["public", "", ""]).is_well_formed());
        assert!(!ObjectId::new(EntityKind::Table, ["public", ""]).is_well_formed());
        assert!(!ObjectId::new(EntityKind::Table, ["public"]).is_well_formed());
    }

    #[test]
    fn test_split_procedure_unqualified() {
        assert_eq!(
            split_procedure("f1()", "public"),
            Some(("public".to_string(), "f1".to_string(), String::new()))
        );
    }

    #[test]
    fn test_split_procedure_qualified_with_args() {
        assert_eq!(
            split_procedure("s1.f1(integer, text)", "public"),
            Some((
                "s1".to_string(),
                "f1".to_string(),
                "integer, text".to_string()
            ))
        );
    }

    #[test]
    fn test_split_procedure_malformed() {
        assert_eq!(split_procedure("f1", "public"), None);
        assert_eq!(split_procedure("()", "public"), None);
        assert_eq!(split_procedure("f1(", "public"), None);
        assert_eq!(split_procedure(".f1()", "public"), None);
    }

    #[test]
    fn test_base_type_name() {
        assert_eq!(base_type_name("integer"), (None, "integer".to_string()));
        assert_eq!(base_type_name("varchar(63)"), (None, "varchar".to_string()));
        assert_eq!(
            base_type_name("s1.mood[]"),
            (Some("s1".to_string()), "mood".to_string())
        );
        assert_eq!(
            base_type_name("numeric(10, 2)"),
            (None, "numeric".to_string())
        );
    }
}
