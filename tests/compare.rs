mod common;
use common::*;

const USERS: &str = "\"public\".\"users\"";

fn joined(statements: &[String]) -> String {
    statements.concat()
}

#[test]
fn identical_snapshots_produce_no_script() {
    let mut users = table(&[
        ("\"id\"", column("integer", false)),
        ("\"email\"", column("text", true)),
    ]);
    users.privileges.insert("app".to_string(), full_privileges());
    users.indexes.insert(
        "\"public\".\"users_email_idx\"".to_string(),
        Index {
            definition: "CREATE INDEX users_email_idx ON public.users USING btree (email)"
                .to_string(),
        },
    );
    let mut snapshot = users_snapshot(users);
    snapshot.sequences.insert(
        "\"public\".\"users_id_seq\"".to_string(),
        sequence("users_id_seq", Some("\"public\".\"users\".\"id\"")),
    );

    let options = CompareOptions::default().drop_missing_tables().drop_missing_views();
    assert!(compare_snapshots(&snapshot, &snapshot, &options).is_empty());
}

#[test]
fn nullable_change_is_a_single_alter() {
    let source = users_snapshot(table(&[("\"id\"", column("integer", false))]));
    let target = users_snapshot(table(&[("\"id\"", column("integer", true))]));

    let statements = compare_snapshots(&source, &target, &CompareOptions::default());
    let script = joined(&statements);

    assert_eq!(script.matches("SET NOT NULL").count(), 1);
    assert!(script.contains("ALTER COLUMN \"id\" SET NOT NULL"));
    assert!(!script.contains("DROP COLUMN"));
    assert!(!script.contains("ADD COLUMN"));
}

/// Uses `abs(age)`: a plain `CHECK ((age > 0))` is invisible to the column heuristic.
#[test]
fn data_type_change_drops_dependent_constraint_first() {
    let constraint = Constraint {
        definition: "CHECK ((abs(age) > 0))".to_string(),
    };

    let mut source_users = table(&[("\"age\"", column("bigint", true))]);
    source_users
        .constraints
        .insert("\"users_age_check\"".to_string(), constraint.clone());
    let mut target_users = table(&[("\"age\"", column("integer", true))]);
    target_users
        .constraints
        .insert("\"users_age_check\"".to_string(), constraint);

    let statements = compare_snapshots(
        &users_snapshot(source_users),
        &users_snapshot(target_users),
        &CompareOptions::default(),
    );
    let script = joined(&statements);

    let drop = script
        .find("DROP CONSTRAINT \"users_age_check\"")
        .expect("constraint dropped");
    let alter = script
        .find("SET DATA TYPE bigint")
        .expect("column altered");
    let add = script
        .find("ADD CONSTRAINT \"users_age_check\" CHECK ((abs(age) > 0))")
        .expect("constraint re-added");

    assert!(drop < alter);
    assert!(alter < add);
    assert_eq!(script.matches("DROP CONSTRAINT").count(), 1);
}

#[test]
fn owned_sequence_under_new_name_is_renamed() {
    let owned_by = "\"public\".\"t\".\"id\"";
    let mut source = SchemaSnapshot::new();
    let mut renamed = sequence("s_new", Some(owned_by));
    renamed.increment = 5;
    source
        .sequences
        .insert("\"public\".\"s_new\"".to_string(), renamed);

    let mut target = SchemaSnapshot::new();
    target.sequences.insert(
        "\"public\".\"s_old\"".to_string(),
        sequence("s_old", Some(owned_by)),
    );

    let statements = compare_snapshots(&source, &target, &CompareOptions::default());
    let script = joined(&statements);

    assert_eq!(script.matches("RENAME TO").count(), 1);
    assert!(script.contains("ALTER SEQUENCE \"public\".\"s_old\" RENAME TO \"s_new\";"));
    assert!(script.contains("INCREMENT BY 5"));
    assert!(!script.contains("CREATE SEQUENCE"));
}

#[test]
fn disabled_grants_emit_no_privilege_statements() {
    let mut source_users = table(&[("\"id\"", column("integer", false))]);
    source_users.privileges.insert("app".to_string(), full_privileges());
    source_users.owner = "app".to_string();

    let mut source = users_snapshot(source_users.clone());
    source.tables.insert("\"public\".\"orders\"".to_string(), source_users);
    let mut view_privileges = BTreeMap::new();
    view_privileges.insert("reporting".to_string(), full_privileges());
    source.views.insert(
        "\"public\".\"active_users\"".to_string(),
        View {
            owner: "app".to_string(),
            definition: "SELECT id FROM users".to_string(),
            privileges: view_privileges,
            dependencies: Vec::new(),
        },
    );
    let mut seq = sequence("orders_seq", None);
    seq.owner = "app".to_string();
    source
        .sequences
        .insert("\"public\".\"orders_seq\"".to_string(), seq);

    let target = users_snapshot(table(&[("\"id\"", column("integer", false))]));

    let statements =
        compare_snapshots(&source, &target, &CompareOptions::default().without_grants());
    assert!(!statements.is_empty());
    for fragment in &statements {
        assert!(!fragment.contains("GRANT"), "{fragment}");
        assert!(!fragment.contains("REVOKE"), "{fragment}");
        assert!(!fragment.contains("OWNER TO"), "{fragment}");
    }
}

#[test]
fn missing_table_is_created_between_markers() {
    let mut source = SchemaSnapshot::new();
    source.tables.insert(
        "\"public\".\"t1\"".to_string(),
        table(&[("\"id\"", column("integer", false))]),
    );
    let target = SchemaSnapshot::new();

    let statements = compare_snapshots(&source, &target, &CompareOptions::default());

    assert_eq!(statements.len(), 3);
    assert_eq!(statements[0], "\n--- BEGIN CREATE TABLE \"public\".\"t1\" ---\n");
    assert!(statements[1].contains("CREATE TABLE \"public\".\"t1\" ("));
    assert!(statements[1].contains("\"id\" integer NOT NULL"));
    assert_eq!(statements[2], "\n--- END CREATE TABLE \"public\".\"t1\" ---\n");
}

#[test]
fn idempotent_create_table_uses_if_not_exists() {
    let mut source = SchemaSnapshot::new();
    source.tables.insert(
        "\"public\".\"t1\"".to_string(),
        table(&[("\"id\"", column("integer", false))]),
    );

    let statements = compare_snapshots(
        &source,
        &SchemaSnapshot::new(),
        &CompareOptions::default().idempotent(),
    );

    assert!(joined(&statements).contains("CREATE TABLE IF NOT EXISTS \"public\".\"t1\" ("));
}

#[test]
fn dropped_column_carries_data_loss_hint() {
    let source = users_snapshot(table(&[("\"id\"", column("integer", false))]));
    let target = users_snapshot(table(&[
        ("\"id\"", column("integer", false)),
        ("\"nickname\"", column("text", true)),
    ]));

    let script = joined(&compare_snapshots(&source, &target, &CompareOptions::default()));

    assert!(script.contains("DROP COLUMN \"nickname\""));
    assert!(script.contains("--WARN"));
    assert!(script.contains(&format!("--- BEGIN ALTER TABLE {USERS} ---")));
}

#[test]
fn snapshots_survive_json_round_trip() {
    let mut users = table(&[("\"id\"", column("integer", false))]);
    users.columns["\"id\""].identity = Some(IdentityKind::Always);
    let snapshot = users_snapshot(users);

    let json = serde_json::to_string(&snapshot).unwrap();
    let restored: SchemaSnapshot = serde_json::from_str(&json).unwrap();

    assert_eq!(restored, snapshot);
    assert_eq!(restored.fingerprint(), snapshot.fingerprint());
}
