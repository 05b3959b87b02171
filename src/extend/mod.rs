//! Extension application engine.
//!
//! Expands the extension references on target tables into concrete
//! column, trigger, function and language entities before the diff runs.
//! Only the target model is mutated; the current model is consulted to
//! decide whether a generated dependency already exists live. Generated
//! functions are deduplicated by (schema, signature) and languages by
//! name via an explicit registry — applying the same extension to N
//! tables yields one function, not N.

pub mod templates;

use std::collections::HashSet;

use crate::error::ConfigurationError;
use crate::model::{
    ColumnState, DatabaseModel, EntityKind, FunctionState, LanguageState, ObjectId, SchemaObject,
    TriggerState, is_builtin_language, split_procedure,
};
use templates::{ExtensionCatalog, TriggerTemplate};

/// Registry of entities already generated (or adopted) during this
/// expansion run. Queried before every instantiation.
#[derive(Debug, Default)]
struct ExpansionState {
    functions: HashSet<(String, String)>,
    languages: HashSet<String>,
}

/// Expand every extension reference in `target`, draining the references
/// as they are applied. Fails before any diff runs on an unknown
/// extension name or a conflicting redefinition.
pub fn apply_all(
    catalog: &ExtensionCatalog,
    current: &DatabaseModel,
    target: &mut DatabaseModel,
) -> Result<(), ConfigurationError> {
    let mut state = ExpansionState::default();

    let referencing: Vec<ObjectId> = target
        .tables
        .iter()
        .filter(|t| !t.extensions.is_empty())
        .map(|t| t.id())
        .collect();

    for table_id in referencing {
        let Some(table) = target.tables.get_mut(&table_id) else {
            continue;
        };
        let extensions = std::mem::take(&mut table.extensions);
        let (schema, name) = (table.schema.clone(), table.name.clone());

        for ext_name in extensions {
            let ext = catalog
                .get(&ext_name)
                .ok_or_else(|| ConfigurationError::UnknownExtension {
                    name: ext_name.clone(),
                    table: table_id.clone(),
                })?;

            for col_name in &ext.columns {
                let template = catalog.columns.get(col_name).ok_or_else(|| {
                    ConfigurationError::MissingTemplate {
                        extension: ext_name.clone(),
                        template_kind: "column",
                        name: col_name.clone(),
                    }
                })?;
                let column = ColumnState {
                    schema: schema.clone(),
                    table: name.clone(),
                    name: col_name.clone(),
                    type_name: template.type_name.clone(),
                    not_null: template.not_null,
                    default: template.default.clone(),
                    description: None,
                };
                merge_column(target, column)?;
            }

            for trg_name in &ext.triggers {
                let template = catalog.triggers.get(trg_name).ok_or_else(|| {
                    ConfigurationError::MissingTemplate {
                        extension: ext_name.clone(),
                        template_kind: "trigger",
                        name: trg_name.clone(),
                    }
                })?;
                let trigger = TriggerState {
                    schema: schema.clone(),
                    table: name.clone(),
                    name: trg_name.clone(),
                    timing: template.timing,
                    events: template.events.clone(),
                    columns: vec![],
                    level: template.level,
                    condition: None,
                    procedure: template.procedure.clone(),
                    description: None,
                };
                let trigger_id = trigger.id();
                merge_trigger(target, trigger)?;
                register_procedure(catalog, current, target, &mut state, template, &trigger_id)?;
            }
        }
    }

    Ok(())
}

/// Merge a generated column: an identical column already declared on the
/// table is fine (re-use); a conflicting one is a configuration error.
fn merge_column(target: &mut DatabaseModel, column: ColumnState) -> Result<(), ConfigurationError> {
    if let Some(existing) = target.columns.get(&column.id()) {
        if existing.structurally_equal(&column) {
            return Ok(());
        }
        return Err(ConfigurationError::ConflictingRedefinition(column.id()));
    }
    target.merge_column(column)
}

fn merge_trigger(
    target: &mut DatabaseModel,
    trigger: TriggerState,
) -> Result<(), ConfigurationError> {
    if let Some(existing) = target.triggers.get(&trigger.id()) {
        if existing.structurally_equal(&trigger) {
            return Ok(());
        }
        return Err(ConfigurationError::ConflictingRedefinition(trigger.id()));
    }
    target.triggers.insert(trigger)
}

/// Ensure the trigger template's function (and that function's language)
/// exists in the target model exactly once.
///
/// Resolution order per (schema, signature): already registered this run →
/// nothing to do; present live in `current` → adopt the live entity so the
/// diff sees it unchanged; declared in `target` already → re-use; otherwise
/// instantiate from the function template.
fn register_procedure(
    catalog: &ExtensionCatalog,
    current: &DatabaseModel,
    target: &mut DatabaseModel,
    state: &mut ExpansionState,
    template: &TriggerTemplate,
    trigger_id: &ObjectId,
) -> Result<(), ConfigurationError> {
    let table_schema = trigger_id.schema().unwrap_or_default();
    let Some((schema, function, arguments)) = split_procedure(&template.procedure, table_schema)
    else {
        return Err(ConfigurationError::MalformedProcedure {
            procedure: template.procedure.clone(),
            owner: trigger_id.clone(),
        });
    };

    let signature = format!("{function}({arguments})");
    if !state.functions.insert((schema.clone(), signature)) {
        return Ok(());
    }

    let function_id = ObjectId::new(
        EntityKind::Function,
        [schema.as_str(), function.as_str(), arguments.as_str()],
    );

    let language = if let Some(live) = current.functions.get(&function_id) {
        let language = live.language.clone();
        if !target.functions.contains(&function_id) {
            target.functions.insert(live.clone())?;
        }
        language
    } else if let Some(declared) = target.functions.get(&function_id) {
        declared.language.clone()
    } else {
        let template = catalog.functions.get(&function).ok_or_else(|| {
            ConfigurationError::MissingTemplate {
                extension: function.clone(),
                template_kind: "function",
                name: function.clone(),
            }
        })?;
        target.functions.insert(FunctionState {
            schema: schema.clone(),
            name: function.clone(),
            arguments,
            returns: template.returns.clone(),
            language: template.language.clone(),
            source: template.source.clone(),
            volatility: None,
            description: None,
        })?;
        template.language.clone()
    };

    register_language(current, target, state, &language)
}

/// Language dedup mirrors function dedup: register once, by name.
fn register_language(
    current: &DatabaseModel,
    target: &mut DatabaseModel,
    state: &mut ExpansionState,
    language: &str,
) -> Result<(), ConfigurationError> {
    if is_builtin_language(language) || !state.languages.insert(language.to_string()) {
        return Ok(());
    }
    let language_id = ObjectId::new(EntityKind::Language, [language]);
    if target.languages.contains(&language_id) {
        return Ok(());
    }
    if let Some(live) = current.languages.get(&language_id) {
        target.languages.insert(live.clone())?;
    } else {
        target.languages.insert(LanguageState {
            name: language.to_string(),
            trusted: true,
            description: None,
        })?;
    }
    Ok(())
}
