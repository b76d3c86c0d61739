use orma_core::{
    driver::{
        operation::{QuerySql, Transaction},
        Driver, Rows,
    },
    stmt::{Type, Value},
};
use orma_driver_sqlite::Sqlite;

fn sql(sql: &str, params: Vec<Value>, ret: Option<Vec<Type>>) -> QuerySql {
    QuerySql {
        sql: sql.to_string(),
        params,
        ret,
    }
}

#[tokio::test]
async fn in_memory_database_is_shared_between_connections() {
    let driver = Sqlite::new("sqlite::memory:").unwrap();

    let mut first = driver.connect().await.unwrap();
    first
        .exec(sql("CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT);", vec![], None).into())
        .await
        .unwrap();

    let response = first
        .exec(
            sql(
                "INSERT INTO users (id, name) VALUES (?1, ?2);",
                vec![Value::I64(1), Value::from("Alice")],
                None,
            )
            .into(),
        )
        .await
        .unwrap();
    assert_eq!(response.rows.affected(), 1);
    drop(first);

    let mut second = driver.connect().await.unwrap();
    let response = second
        .exec(
            sql(
                "SELECT id, name FROM users WHERE id = ?1;",
                vec![Value::I64(1)],
                Some(vec![Type::I64, Type::String]),
            )
            .into(),
        )
        .await
        .unwrap();

    let rows = response.rows.into_values().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].fields, vec![Value::I64(1), Value::from("Alice")]);
}

#[tokio::test]
async fn separate_drivers_do_not_share_data() {
    let a = Sqlite::in_memory().unwrap();
    let b = Sqlite::in_memory().unwrap();

    let mut conn = a.connect().await.unwrap();
    conn.exec(sql("CREATE TABLE t (x INTEGER);", vec![], None).into())
        .await
        .unwrap();

    let mut conn = b.connect().await.unwrap();
    let err = conn
        .exec(sql("SELECT x FROM t;", vec![], Some(vec![Type::I64])).into())
        .await
        .unwrap_err();
    assert!(err.is_driver_operation_failed());
}

#[tokio::test]
async fn rollback_discards_writes() {
    let driver = Sqlite::in_memory().unwrap();
    let mut conn = driver.connect().await.unwrap();

    conn.exec(sql("CREATE TABLE t (x INTEGER);", vec![], None).into())
        .await
        .unwrap();

    conn.exec(Transaction::Start.into()).await.unwrap();
    conn.exec(sql("INSERT INTO t (x) VALUES (?1);", vec![Value::I64(1)], None).into())
        .await
        .unwrap();
    conn.exec(Transaction::Rollback.into()).await.unwrap();

    let response = conn
        .exec(sql("SELECT x FROM t;", vec![], Some(vec![Type::I64])).into())
        .await
        .unwrap();
    assert!(matches!(response.rows, Rows::Values(rows) if rows.is_empty()));
}

#[test]
fn rejects_foreign_scheme() {
    let err = Sqlite::new("postgresql://localhost/db").unwrap_err();
    assert!(err.to_string().contains("sqlite"), "{err}");
}
