use dearsql_db::{ConnectionDescriptor, DatabaseKind, create};

fn seeded_database(dir: &std::path::Path) -> String {
    let path = dir.join("app.db");
    let conn = rusqlite::Connection::open(&path).expect("open fixture");
    conn.execute_batch(
        "CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT NOT NULL);
         INSERT INTO users (name) VALUES ('ada'), ('grace'), ('linus');",
    )
    .expect("seed fixture");
    path.to_string_lossy().into_owned()
}

#[tokio::test(flavor = "current_thread")]
async fn embedded_source_end_to_end() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = seeded_database(dir.path());

    let mut source =
        create(&ConnectionDescriptor::sqlite("app", &path)).expect("valid");
    assert_eq!(source.kind(), DatabaseKind::Sqlite);
    assert_eq!(source.connection_identity(), path);

    assert!(source.connect().await);
    source.refresh_tables().await;
    assert!(source.tables_loaded());

    let tables = source.tables();
    assert_eq!(tables.len(), 1);
    assert_eq!(tables[0].name, "users");
    assert_eq!(tables[0].columns.len(), 2);
    assert_eq!(tables[0].columns[0].name, "id");
    assert!(tables[0].columns[0].is_primary_key);
    assert!(tables[0].columns[0].is_not_null);
    assert_eq!(tables[0].columns[1].name, "name");
    assert!(!tables[0].columns[1].is_primary_key);
    assert!(tables[0].columns[1].is_not_null);

    assert_eq!(source.row_count("users").await, 3);
    assert_eq!(source.column_names("users").await, vec!["id", "name"]);

    let first = source.table_data("users", 2, 0).await;
    assert_eq!(
        first,
        vec![
            vec!["1".to_string(), "ada".to_string()],
            vec!["2".to_string(), "grace".to_string()],
        ]
    );
    let second = source.table_data("users", 2, 2).await;
    assert_eq!(second, vec![vec!["3".to_string(), "linus".to_string()]]);

    let output = source
        .execute_query("SELECT name FROM users WHERE id = 1")
        .await;
    assert_eq!(output, "name\n----------\nada\n");

    let output = source
        .execute_query("DELETE FROM users WHERE id = 3")
        .await;
    assert_eq!(output, "Query executed successfully. Rows affected: 1");
    assert_eq!(source.row_count("users").await, 2);

    source.disconnect();
    assert!(!source.is_connected());
    assert_eq!(source.tables().len(), 1);
}

#[tokio::test(flavor = "current_thread")]
async fn refresh_picks_up_new_tables() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = seeded_database(dir.path());
    let mut source =
        create(&ConnectionDescriptor::sqlite("app", &path)).expect("valid");

    source.refresh_tables().await;
    assert_eq!(source.tables().len(), 1);

    source
        .execute_query("CREATE TABLE audit (at TEXT, what TEXT)")
        .await;
    source.refresh_tables().await;

    let names: Vec<&str> =
        source.tables().iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["audit", "users"]);
}
