//! Extension template catalog.
//!
//! An extension is a named, reusable recipe for derived schema objects: a
//! list of column-template references plus an optional list of
//! trigger-template references. Template definitions are fixed tagged
//! structures — unknown keys in a user-supplied catalog are rejected at
//! deserialization rather than accepted as arbitrary attributes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;
use crate::model::{EntityKind, ObjectId, TriggerEvent, TriggerLevel, TriggerTiming, split_procedure};

/// One named extension: which column and trigger templates it applies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExtensionDef {
    #[serde(default)]
    pub columns: Vec<String>,
    #[serde(default)]
    pub triggers: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ColumnTemplate {
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub not_null: bool,
    #[serde(default)]
    pub default: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TriggerTemplate {
    pub timing: TriggerTiming,
    pub events: Vec<TriggerEvent>,
    #[serde(default)]
    pub level: Option<TriggerLevel>,
    /// Procedure call reference, e.g. `audit_default()`. The base name
    /// must match a function template in the same catalog.
    pub procedure: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FunctionTemplate {
    pub returns: String,
    pub language: String,
    pub source: String,
}

/// The full template catalog an [`crate::extend`] run works from: either
/// the built-ins or a caller-supplied table loaded from configuration.
/// Read-only after construction and passed explicitly — never global.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionCatalog {
    #[serde(default)]
    pub extensions: BTreeMap<String, ExtensionDef>,
    #[serde(default)]
    pub columns: BTreeMap<String, ColumnTemplate>,
    #[serde(default)]
    pub triggers: BTreeMap<String, TriggerTemplate>,
    #[serde(default)]
    pub functions: BTreeMap<String, FunctionTemplate>,
}

impl ExtensionCatalog {
    /// The built-in audit-column policies.
    ///
    /// `default` adds `modified_by_user` and `modified_timestamp` with a
    /// BEFORE INSERT OR UPDATE row trigger refreshing both;
    /// `created_date_only` adds a single `created_date` column.
    pub fn built_in() -> Self {
        let mut catalog = Self::default();

        catalog.columns.insert(
            "modified_by_user".to_string(),
            ColumnTemplate {
                type_name: "character varying(63)".to_string(),
                not_null: true,
                default: Some("SESSION_USER".to_string()),
            },
        );
        catalog.columns.insert(
            "modified_timestamp".to_string(),
            ColumnTemplate {
                type_name: "timestamp with time zone".to_string(),
                not_null: true,
                default: Some("CURRENT_TIMESTAMP".to_string()),
            },
        );
        catalog.columns.insert(
            "created_date".to_string(),
            ColumnTemplate {
                type_name: "date".to_string(),
                not_null: true,
                default: Some("CURRENT_DATE".to_string()),
            },
        );

        catalog.triggers.insert(
            "audit_default".to_string(),
            TriggerTemplate {
                timing: TriggerTiming::Before,
                events: vec![TriggerEvent::Insert, TriggerEvent::Update],
                level: Some(TriggerLevel::Row),
                procedure: "audit_default()".to_string(),
            },
        );

        catalog.functions.insert(
            "audit_default".to_string(),
            FunctionTemplate {
                returns: "trigger".to_string(),
                language: "plpgsql".to_string(),
                source: "BEGIN NEW.modified_by_user = SESSION_USER; \
                         NEW.modified_timestamp = CURRENT_TIMESTAMP; RETURN NEW; END"
                    .to_string(),
            },
        );

        catalog.extensions.insert(
            "default".to_string(),
            ExtensionDef {
                columns: vec![
                    "modified_by_user".to_string(),
                    "modified_timestamp".to_string(),
                ],
                triggers: vec!["audit_default".to_string()],
            },
        );
        catalog.extensions.insert(
            "created_date_only".to_string(),
            ExtensionDef {
                columns: vec!["created_date".to_string()],
                triggers: vec![],
            },
        );

        catalog
    }

    pub fn get(&self, name: &str) -> Option<&ExtensionDef> {
        self.extensions.get(name)
    }

    /// Check internal consistency: every template an extension references
    /// must exist, and every trigger template's procedure must parse and
    /// name a defined function template.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        for (ext_name, ext) in &self.extensions {
            for col in &ext.columns {
                if !self.columns.contains_key(col) {
                    return Err(ConfigurationError::MissingTemplate {
                        extension: ext_name.clone(),
                        template_kind: "column",
                        name: col.clone(),
                    });
                }
            }
            for trg in &ext.triggers {
                if !self.triggers.contains_key(trg) {
                    return Err(ConfigurationError::MissingTemplate {
                        extension: ext_name.clone(),
                        template_kind: "trigger",
                        name: trg.clone(),
                    });
                }
            }
        }
        for (trg_name, template) in &self.triggers {
            let Some((_, function, _)) = split_procedure(&template.procedure, "public") else {
                return Err(ConfigurationError::MalformedProcedure {
                    procedure: template.procedure.clone(),
                    owner: ObjectId::new(EntityKind::Trigger, ["", "", trg_name.as_str()]),
                });
            };
            if !self.functions.contains_key(&function) {
                return Err(ConfigurationError::MissingTemplate {
                    extension: trg_name.clone(),
                    template_kind: "function",
                    name: function,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_built_in_catalog_is_valid() {
        let catalog = ExtensionCatalog::built_in();
        assert!(catalog.validate().is_ok());
        assert!(catalog.get("default").is_some());
        assert!(catalog.get("created_date_only").is_some());
    }

    #[test]
    fn test_missing_column_template_rejected() {
        let mut catalog = ExtensionCatalog::default();
        catalog.extensions.insert(
            "broken".to_string(),
            ExtensionDef {
                columns: vec!["nonexistent".to_string()],
                triggers: vec![],
            },
        );
        let err = catalog.validate().unwrap_err();
        assert!(matches!(
            err,
            ConfigurationError::MissingTemplate {
                template_kind: "column",
                ..
            }
        ));
    }

    #[test]
    fn test_trigger_template_without_function_rejected() {
        let mut catalog = ExtensionCatalog::default();
        catalog.triggers.insert(
            "orphan".to_string(),
            TriggerTemplate {
                timing: TriggerTiming::Before,
                events: vec![TriggerEvent::Insert],
                level: Some(TriggerLevel::Row),
                procedure: "missing_fn()".to_string(),
            },
        );
        let err = catalog.validate().unwrap_err();
        assert!(matches!(
            err,
            ConfigurationError::MissingTemplate {
                template_kind: "function",
                ..
            }
        ));
    }

    #[test]
    fn test_unknown_template_keys_rejected() {
        let toml = r#"
            type = "date"
            not_null = true
            surprise = "no"
        "#;
        assert!(toml::from_str::<ColumnTemplate>(toml).is_err());
    }
}
