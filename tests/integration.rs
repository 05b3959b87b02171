//! Integration tests for the full reconciliation pipeline.
//!
//! Each scenario builds a current and a target model, reconciles them, and
//! asserts on the exact statement list — the output contract is literal
//! DDL text in a guaranteed order.

use pg_schema_diff::model::builder::ModelBuilder;
use pg_schema_diff::model::{TriggerEvent, TriggerLevel, TriggerTiming};
use pg_schema_diff::{ReconcileError, Reconciler};

const FUNC_SRC: &str = "BEGIN NEW.c3 := CURRENT_TIMESTAMP; RETURN NEW; END";

/// Base environment both sides share: the public schema and plpgsql, as
/// found on any live database.
fn base() -> ModelBuilder {
    ModelBuilder::new().schema("public").language("plpgsql")
}

fn with_trigger_table(builder: ModelBuilder, description: Option<&str>) -> ModelBuilder {
    builder
        .function("public", "f1", "", "trigger", "plpgsql", FUNC_SRC)
        .table("public", "t1", |t| {
            t.column("c1", "integer", true)
                .column("c2", "text", true)
                .column("c3", "timestamp with time zone", true)
                .trigger("tr1", |tr| {
                    tr.timing(TriggerTiming::Before)
                        .events(&[TriggerEvent::Insert, TriggerEvent::Update])
                        .level(TriggerLevel::Row)
                        .procedure("f1()");
                    if let Some(text) = description {
                        tr.description(text);
                    }
                });
        })
}

#[test]
fn test_create_table_function_and_trigger_in_order() {
    let current = base().build();
    let target = with_trigger_table(base(), None).build();

    let statements = Reconciler::default().reconcile(&current, target).unwrap();
    assert_eq!(
        statements,
        vec![
            "CREATE TABLE t1 (c1 integer, c2 text, c3 timestamp with time zone)",
            format!("CREATE FUNCTION f1() RETURNS trigger LANGUAGE plpgsql AS $_${FUNC_SRC}$_$")
                .as_str(),
            "CREATE TRIGGER tr1 BEFORE INSERT OR UPDATE ON t1 FOR EACH ROW EXECUTE PROCEDURE f1()",
        ]
    );
}

#[test]
fn test_drop_trigger_only() {
    let current = with_trigger_table(base(), None).build();
    // Target keeps the table and function but drops the trigger.
    let target = base()
        .function("public", "f1", "", "trigger", "plpgsql", FUNC_SRC)
        .table("public", "t1", |t| {
            t.column("c1", "integer", true)
                .column("c2", "text", true)
                .column("c3", "timestamp with time zone", true);
        })
        .build();

    let statements = Reconciler::default().reconcile(&current, target).unwrap();
    assert_eq!(statements, vec!["DROP TRIGGER tr1 ON t1"]);
}

#[test]
fn test_drop_trigger_before_dropped_table() {
    let current = with_trigger_table(base(), None).build();
    let target = base()
        .function("public", "f1", "", "trigger", "plpgsql", FUNC_SRC)
        .build();

    let statements = Reconciler::default().reconcile(&current, target).unwrap();
    assert_eq!(statements, vec!["DROP TRIGGER tr1 ON t1", "DROP TABLE t1"]);
}

#[test]
fn test_comment_only_change_on_trigger() {
    let current = with_trigger_table(base(), None).build();
    let target = with_trigger_table(base(), Some("Test trigger tr1")).build();

    let statements = Reconciler::default().reconcile(&current, target).unwrap();
    assert_eq!(
        statements,
        vec!["COMMENT ON TRIGGER tr1 ON t1 IS 'Test trigger tr1'"]
    );
}

#[test]
fn test_drop_comment_sets_null() {
    let current = with_trigger_table(base(), Some("Test trigger tr1")).build();
    let target = with_trigger_table(base(), None).build();

    let statements = Reconciler::default().reconcile(&current, target).unwrap();
    assert_eq!(statements, vec!["COMMENT ON TRIGGER tr1 ON t1 IS NULL"]);
}

#[test]
fn test_trigger_with_comment_trails_create() {
    let current = base().build();
    let target = with_trigger_table(base(), Some("Test trigger tr1")).build();

    let statements = Reconciler::default().reconcile(&current, target).unwrap();
    assert_eq!(statements.len(), 4);
    assert_eq!(
        statements[3],
        "COMMENT ON TRIGGER tr1 ON t1 IS 'Test trigger tr1'"
    );
}

#[test]
fn test_trigger_event_change_drops_and_recreates() {
    let make = |events: &[TriggerEvent]| {
        base()
            .function("public", "f1", "", "trigger", "plpgsql", FUNC_SRC)
            .table("public", "t1", |t| {
                t.column("c1", "integer", true).trigger("tr1", |tr| {
                    tr.events(events).level(TriggerLevel::Row).procedure("f1()");
                });
            })
            .build()
    };
    let current = make(&[TriggerEvent::Insert, TriggerEvent::Update]);
    let target = make(&[TriggerEvent::Insert]);

    let statements = Reconciler::default().reconcile(&current, target).unwrap();
    assert_eq!(
        statements,
        vec![
            "DROP TRIGGER tr1 ON t1",
            "CREATE TRIGGER tr1 BEFORE INSERT ON t1 FOR EACH ROW EXECUTE PROCEDURE f1()",
        ]
    );
}

#[test]
fn test_extension_applied_to_many_tables_generates_one_function() {
    let current = base().build();
    let mut builder = base();
    for name in ["t1", "t2", "t3"] {
        builder = builder.table("public", name, |t| {
            t.column("id", "integer", false).extension("default");
        });
    }
    let target = builder.build();

    let statements = Reconciler::default().reconcile(&current, target).unwrap();

    let function_creates = statements
        .iter()
        .filter(|s| s.starts_with("CREATE FUNCTION"))
        .count();
    assert_eq!(function_creates, 1, "one function for three tables");

    let trigger_indices: Vec<usize> = statements
        .iter()
        .enumerate()
        .filter(|(_, s)| s.starts_with("CREATE TRIGGER"))
        .map(|(i, _)| i)
        .collect();
    assert_eq!(trigger_indices.len(), 3);

    // Every trigger create must come after the function create.
    let function_index = statements
        .iter()
        .position(|s| s.starts_with("CREATE FUNCTION"))
        .unwrap();
    for index in trigger_indices {
        assert!(index > function_index, "trigger at {index} precedes its function");
    }

    insta::assert_snapshot!(statements.join(";\n"), @r###"
    CREATE TABLE t1 (id integer NOT NULL, modified_by_user character varying(63) NOT NULL DEFAULT SESSION_USER, modified_timestamp timestamp with time zone NOT NULL DEFAULT CURRENT_TIMESTAMP);
    CREATE TABLE t2 (id integer NOT NULL, modified_by_user character varying(63) NOT NULL DEFAULT SESSION_USER, modified_timestamp timestamp with time zone NOT NULL DEFAULT CURRENT_TIMESTAMP);
    CREATE TABLE t3 (id integer NOT NULL, modified_by_user character varying(63) NOT NULL DEFAULT SESSION_USER, modified_timestamp timestamp with time zone NOT NULL DEFAULT CURRENT_TIMESTAMP);
    CREATE FUNCTION audit_default() RETURNS trigger LANGUAGE plpgsql AS $_$BEGIN NEW.modified_by_user = SESSION_USER; NEW.modified_timestamp = CURRENT_TIMESTAMP; RETURN NEW; END$_$;
    CREATE TRIGGER audit_default BEFORE INSERT OR UPDATE ON t1 FOR EACH ROW EXECUTE PROCEDURE audit_default();
    CREATE TRIGGER audit_default BEFORE INSERT OR UPDATE ON t2 FOR EACH ROW EXECUTE PROCEDURE audit_default();
    CREATE TRIGGER audit_default BEFORE INSERT OR UPDATE ON t3 FOR EACH ROW EXECUTE PROCEDURE audit_default()
    "###);
}

#[test]
fn test_extension_columns_on_existing_table_are_added() {
    let current = base()
        .table("public", "t1", |t| {
            t.column("id", "integer", false);
        })
        .build();
    let target = base()
        .table("public", "t1", |t| {
            t.column("id", "integer", false).extension("created_date_only");
        })
        .build();

    let statements = Reconciler::default().reconcile(&current, target).unwrap();
    assert_eq!(
        statements,
        vec!["ALTER TABLE t1 ADD COLUMN created_date date NOT NULL DEFAULT CURRENT_DATE"]
    );
}

#[test]
fn test_new_schema_precedes_its_table() {
    let current = base().build();
    let target = base()
        .schema("s1")
        .table("s1", "t1", |t| {
            t.column("c1", "integer", true);
        })
        .build();

    let statements = Reconciler::default().reconcile(&current, target).unwrap();
    assert_eq!(
        statements,
        vec![
            "CREATE SCHEMA s1",
            "CREATE TABLE s1.t1 (c1 integer)",
        ]
    );
}

#[test]
fn test_constraints_and_indexes_follow_new_table() {
    let current = base().build();
    let target = base()
        .table("public", "customers", |t| {
            t.column("id", "integer", false).pk("customers_pkey", &["id"]);
        })
        .table("public", "orders", |t| {
            t.column("id", "integer", false)
                .column("customer_id", "integer", false)
                .column("status", "text", true)
                .pk("orders_pkey", &["id"])
                .fk(
                    "orders_customer_id_fkey",
                    &["customer_id"],
                    "customers",
                    &["id"],
                )
                .index("idx_orders_status", &["status"], false);
        })
        .build();

    let statements = Reconciler::default().reconcile(&current, target).unwrap();
    assert_eq!(
        statements,
        vec![
            "CREATE TABLE customers (id integer NOT NULL)",
            "CREATE TABLE orders (id integer NOT NULL, customer_id integer NOT NULL, status text)",
            "ALTER TABLE customers ADD CONSTRAINT customers_pkey PRIMARY KEY (id)",
            "ALTER TABLE orders ADD CONSTRAINT orders_customer_id_fkey FOREIGN KEY (customer_id) REFERENCES customers (id)",
            "ALTER TABLE orders ADD CONSTRAINT orders_pkey PRIMARY KEY (id)",
            "CREATE INDEX idx_orders_status ON orders (status)",
        ]
    );
}

#[test]
fn test_constraint_drops_before_its_column() {
    let current = base()
        .table("public", "t1", |t| {
            t.column("c1", "integer", true)
                .column("c2", "text", true)
                .unique("t1_c2_key", &["c2"]);
        })
        .build();
    let target = base()
        .table("public", "t1", |t| {
            t.column("c1", "integer", true);
        })
        .build();

    // Dropping c2 implicitly drops the constraint, so the explicit
    // constraint drop must come first.
    let statements = Reconciler::default().reconcile(&current, target).unwrap();
    assert_eq!(
        statements,
        vec![
            "ALTER TABLE t1 DROP CONSTRAINT t1_c2_key",
            "ALTER TABLE t1 DROP COLUMN c2",
        ]
    );
}

#[test]
fn test_column_alter_statements() {
    let current = base()
        .table("public", "t1", |t| {
            t.column("c1", "integer", true);
        })
        .build();
    let target = base()
        .table("public", "t1", |t| {
            t.column_with_default("c1", "bigint", false, "0");
        })
        .build();

    let statements = Reconciler::default().reconcile(&current, target).unwrap();
    assert_eq!(
        statements,
        vec![
            "ALTER TABLE t1 ALTER COLUMN c1 TYPE bigint",
            "ALTER TABLE t1 ALTER COLUMN c1 SET NOT NULL",
            "ALTER TABLE t1 ALTER COLUMN c1 SET DEFAULT 0",
        ]
    );
}

#[test]
fn test_unresolved_reference_is_configuration_error() {
    let current = base().build();
    // Trigger references a function that is in neither model.
    let target = base()
        .table("public", "t1", |t| {
            t.column("c1", "integer", true).trigger("tr1", |tr| {
                tr.procedure("ghost()");
            });
        })
        .build();

    let err = Reconciler::default().reconcile(&current, target).unwrap_err();
    assert!(matches!(err, ReconcileError::Configuration(_)));
    assert!(err.to_string().contains("ghost"));
}

#[test]
fn test_enum_shape_change_is_structural_error() {
    let current = base().enum_type("public", "mood", &["sad", "ok"]).build();
    let target = base().enum_type("public", "mood", &["ok"]).build();

    let err = Reconciler::default().reconcile(&current, target).unwrap_err();
    assert!(matches!(err, ReconcileError::StructuralDiff(_)));
    assert!(err.to_string().contains("mood"));
}
