use orma_core::{
    driver::operation::Transaction,
    sql::{
        Assignment, ColumnReference, ColumnValueBinding, DeleteStatement, Expectation,
        Expression, JdbcParameter, JdbcParameterBindings, ParameterBinder, Predicate,
        TableDelete, TableInsert, TableMutation, TableReference, TableUpdate,
        UpdateStatement,
    },
    sqm::SqmParameter,
    stmt::{Type, Value},
    Result,
};
use orma_sql::Serializer;
use pretty_assertions::assert_eq;

fn binding(column: &str, value: impl Into<Value>, ty: Type) -> ColumnValueBinding {
    ColumnValueBinding::new(column, JdbcParameter::value(value, ty))
}

#[test]
fn insert_with_generated_identifier() {
    let insert = TableMutation::Insert(TableInsert {
        table_name: "issues".to_string(),
        values: vec![
            binding("title", "Crash", Type::String),
            binding("reporter_id", 1_i64, Type::I64),
        ],
        returning: Some(ColumnReference {
            qualifier: None,
            column: "id".to_string(),
            ty: Type::I64,
        }),
        expectation: Expectation::RowCount(1),
    });

    let sqlite = Serializer::sqlite().serialize_table_mutation(&insert);
    assert_eq!(
        sqlite.sql,
        "INSERT INTO issues (title, reporter_id) VALUES (?1, ?2) RETURNING id;"
    );
    assert_eq!(sqlite.returning, Some(Type::I64));
    assert_eq!(sqlite.expectation, Expectation::RowCount(1));
    assert_eq!(sqlite.table_name, "issues");

    let mysql = Serializer::mysql().serialize_table_mutation(&insert);
    assert_eq!(
        mysql.sql,
        "INSERT INTO issues (title, reporter_id) VALUES (?, ?);"
    );
}

#[test]
fn insert_without_columns() {
    let insert = TableMutation::Insert(TableInsert {
        table_name: "tags".to_string(),
        values: vec![],
        returning: None,
        expectation: Expectation::RowCount(1),
    });

    assert_eq!(
        Serializer::postgresql().serialize_table_mutation(&insert).sql,
        "INSERT INTO tags DEFAULT VALUES;"
    );
    assert_eq!(
        Serializer::mysql().serialize_table_mutation(&insert).sql,
        "INSERT INTO tags () VALUES ();"
    );
}

#[test]
fn versioned_update() {
    let update = TableMutation::Update(TableUpdate {
        table_name: "issues".to_string(),
        values: vec![
            binding("title", "Renamed", Type::String),
            binding("version", 2_i32, Type::I32),
        ],
        restrictions: vec![
            binding("id", 7_i64, Type::I64),
            binding("version", 1_i32, Type::I32),
        ],
        expectation: Expectation::RowCount(1),
    });

    let jdbc = Serializer::postgresql().serialize_table_mutation(&update);
    assert_eq!(
        jdbc.sql,
        "UPDATE issues SET title = $1, version = $2 WHERE id = $3 AND version = $4;"
    );
    assert_eq!(jdbc.binders.len(), 4);
    assert_eq!(jdbc.returning, None);
}

#[test]
fn delete_with_null_restriction() {
    let delete = TableMutation::Delete(TableDelete {
        table_name: "issue_tags".to_string(),
        restrictions: vec![
            binding("issue_id", 7_i64, Type::I64),
            binding("position", Value::Null, Type::I32),
        ],
        expectation: Expectation::None,
    });

    let jdbc = Serializer::sqlite().serialize_table_mutation(&delete);
    assert_eq!(
        jdbc.sql,
        "DELETE FROM issue_tags WHERE issue_id = ?1 AND position IS NULL;"
    );
    assert_eq!(jdbc.binders.len(), 1);
}

#[test]
fn update_statement() {
    let stmt = UpdateStatement {
        target: TableReference::new("issues", "i1_0"),
        assignments: vec![Assignment {
            column: ColumnReference {
                qualifier: None,
                column: "title".to_string(),
                ty: Type::String,
            },
            value: JdbcParameter::value("x", Type::String).into(),
        }],
        restriction: Some(Predicate::eq(
            Expression::column(None, "id", Type::I64),
            JdbcParameter::value(1_i64, Type::I64),
        )),
    };

    let jdbc = Serializer::sqlite().serialize_update(&stmt);
    assert_eq!(jdbc.sql, "UPDATE issues SET title = ?1 WHERE id = ?2;");
    assert_eq!(jdbc.expectation, Expectation::None);
}

#[test]
fn delete_statement_without_restriction() {
    let stmt = DeleteStatement {
        target: TableReference::new("issues", "i1_0"),
        restriction: None,
    };

    assert_eq!(
        Serializer::mysql().serialize_delete(&stmt).sql,
        "DELETE FROM issues;"
    );
}

struct Fixed(Value);

impl JdbcParameterBindings for Fixed {
    fn resolve(&self, parameter: &JdbcParameter) -> Result<Value> {
        assert!(matches!(parameter.binder, ParameterBinder::Query { .. }));
        Ok(self.0.clone())
    }
}

#[test]
fn bind_resolves_query_parameters() {
    let id = SqmParameter::named("id");
    let stmt = DeleteStatement {
        target: TableReference::new("issues", "i1_0"),
        restriction: Some(Predicate::and(
            Predicate::eq(
                Expression::column(None, "id", Type::I64),
                JdbcParameter::query(&id, None, Type::I64),
            ),
            Predicate::eq(
                Expression::column(None, "open", Type::Bool),
                JdbcParameter::value(true, Type::Bool),
            ),
        )),
    };

    let jdbc = Serializer::sqlite().serialize_delete(&stmt);
    let query = jdbc.bind(&Fixed(Value::I64(9))).unwrap();

    assert_eq!(query.params, vec![Value::I64(9), Value::Bool(true)]);
    assert_eq!(query.ret, None);
}

#[test]
fn transaction_statements() {
    assert_eq!(
        Serializer::mysql().serialize_transaction(Transaction::Start),
        "START TRANSACTION"
    );
    assert_eq!(
        Serializer::sqlite().serialize_transaction(Transaction::Start),
        "BEGIN"
    );
    assert_eq!(
        Serializer::postgresql().serialize_transaction(Transaction::Rollback),
        "ROLLBACK"
    );
}
