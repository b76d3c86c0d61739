use orma_core::{
    schema::NavigablePath,
    sql::{
        Expression, JdbcParameter, Predicate, QuerySpec, SelectStatement, SortSpecification,
        TableGroup, TableGroupJoin, TableReference,
    },
    sqm::SqmParameter,
    stmt::{Direction, JoinType, LockMode, NullPrecedence, Type},
};
use orma_sql::Serializer;
use pretty_assertions::assert_eq;
use std::sync::Arc;

fn issue_group() -> TableGroup {
    let path = Arc::new(NavigablePath::root("Issue", Some("i")));
    TableGroup::new(path, TableReference::new("issues", "i1_0"))
}

fn issue_query() -> QuerySpec {
    let mut query = QuerySpec::new(true);
    query.from_clause.add_root(issue_group());
    query
        .select_clause
        .add_selection(Expression::column(Some("i1_0"), "id", Type::I64));
    query
        .select_clause
        .add_selection(Expression::column(Some("i1_0"), "title", Type::String));
    query
}

#[test]
fn select_by_id() {
    let id = SqmParameter::named("id");
    let mut query = issue_query();
    query
        .set_where_clause_restrictions(Predicate::eq(
            Expression::column(Some("i1_0"), "id", Type::I64),
            JdbcParameter::query(&id, None, Type::I64),
        ))
        .unwrap();

    let select = Serializer::sqlite().serialize_select(&SelectStatement::new(query));

    assert_eq!(
        select.sql,
        "SELECT i1_0.id, i1_0.title FROM issues i1_0 WHERE i1_0.id = ?1;"
    );
    assert_eq!(select.binders.len(), 1);
    assert_eq!(select.values_mapping, vec![Type::I64, Type::String]);
    assert_eq!(
        select.affected_table_names.iter().collect::<Vec<_>>(),
        vec!["issues"]
    );
}

#[test]
fn placeholders_follow_flavor() {
    let mut query = issue_query();
    query.add_restriction(Predicate::eq(
        Expression::column(Some("i1_0"), "title", Type::String),
        JdbcParameter::value("a", Type::String),
    ));
    query.add_restriction(Predicate::eq(
        Expression::column(Some("i1_0"), "id", Type::I64),
        JdbcParameter::value(1_i64, Type::I64),
    ));
    let stmt = SelectStatement::new(query);

    let where_clause = |sql: String| sql.split(" WHERE ").nth(1).unwrap().to_string();

    assert_eq!(
        where_clause(Serializer::sqlite().serialize_select(&stmt).sql),
        "i1_0.title = ?1 AND i1_0.id = ?2;"
    );
    assert_eq!(
        where_clause(Serializer::postgresql().serialize_select(&stmt).sql),
        "i1_0.title = $1 AND i1_0.id = $2;"
    );
    assert_eq!(
        where_clause(Serializer::mysql().serialize_select(&stmt).sql),
        "i1_0.title = ? AND i1_0.id = ?;"
    );
}

#[test]
fn join_renders_group_joins_in_order() {
    let mut root = issue_group();
    let reporter = Arc::new(root.path.append("reporter", None));
    let mut users = TableGroup::new(reporter, TableReference::new("users", "r1_0"));
    users.add_table_join(orma_core::sql::TableReferenceJoin {
        join_type: JoinType::Left,
        reference: TableReference::new("user_details", "r1_1"),
        predicate: Predicate::eq(
            Expression::column(Some("r1_0"), "id", Type::I64),
            Expression::column(Some("r1_1"), "user_id", Type::I64),
        ),
    });
    root.add_group_join(TableGroupJoin {
        join_type: JoinType::Inner,
        group: users,
        predicate: Predicate::eq(
            Expression::column(Some("r1_0"), "id", Type::I64),
            Expression::column(Some("i1_0"), "reporter_id", Type::I64),
        ),
    });

    let mut query = QuerySpec::new(true);
    query.from_clause.add_root(root);
    query
        .select_clause
        .add_selection(Expression::column(Some("r1_0"), "name", Type::String));

    let select = Serializer::sqlite().serialize_select(&SelectStatement::new(query));

    assert_eq!(
        select.sql,
        "SELECT r1_0.name FROM issues i1_0 \
         INNER JOIN users r1_0 ON r1_0.id = i1_0.reporter_id \
         LEFT JOIN user_details r1_1 ON r1_0.id = r1_1.user_id;"
    );
    assert_eq!(
        select.affected_table_names.iter().collect::<Vec<_>>(),
        vec!["issues", "users", "user_details"]
    );
}

#[test]
fn nested_junctions_are_parenthesized() {
    let title = || Expression::column(Some("i1_0"), "title", Type::String);
    let mut query = issue_query();
    query.add_restriction(Predicate::or(
        Predicate::eq(title(), JdbcParameter::value("a", Type::String)),
        Predicate::is_null(title()),
    ));
    query.add_restriction(Predicate::not(Predicate::eq(
        Expression::column(Some("i1_0"), "id", Type::I64),
        JdbcParameter::value(3_i64, Type::I64),
    )));

    let select = Serializer::postgresql().serialize_select(&SelectStatement::new(query));

    assert_eq!(
        select.sql,
        "SELECT i1_0.id, i1_0.title FROM issues i1_0 \
         WHERE (i1_0.title = $1 OR i1_0.title IS NULL) AND NOT (i1_0.id = $2);"
    );
}

#[test]
fn empty_in_list_matches_nothing() {
    let mut query = issue_query();
    query.add_restriction(Predicate::InList(orma_core::sql::InList {
        expr: Expression::column(Some("i1_0"), "id", Type::I64),
        list: vec![],
        negated: false,
    }));

    let select = Serializer::sqlite().serialize_select(&SelectStatement::new(query));
    assert!(select.sql.ends_with("WHERE 1 = 0;"), "{}", select.sql);
    assert!(select.binders.is_empty());
}

#[test]
fn paging_ordering_and_locking() {
    let mut query = issue_query();
    let mut sort = SortSpecification::new(
        Expression::column(Some("i1_0"), "title", Type::String),
        Direction::Desc,
    );
    sort.nulls = Some(NullPrecedence::Last);
    query.add_sort_specification(sort);
    query
        .set_limit(JdbcParameter::value(10_i64, Type::I64).into())
        .unwrap();
    query
        .set_offset(JdbcParameter::value(20_i64, Type::I64).into())
        .unwrap();
    query.lock_mode = LockMode::PessimisticWrite;
    let stmt = SelectStatement::new(query);

    assert_eq!(
        Serializer::postgresql().serialize_select(&stmt).sql,
        "SELECT i1_0.id, i1_0.title FROM issues i1_0 \
         ORDER BY i1_0.title DESC NULLS LAST LIMIT $1 OFFSET $2 FOR UPDATE;"
    );

    // SQLite has no row locks
    assert_eq!(
        Serializer::sqlite().serialize_select(&stmt).sql,
        "SELECT i1_0.id, i1_0.title FROM issues i1_0 \
         ORDER BY i1_0.title DESC NULLS LAST LIMIT ?1 OFFSET ?2;"
    );

    assert_eq!(
        Serializer::mysql().serialize_select(&stmt).sql,
        "SELECT i1_0.id, i1_0.title FROM issues i1_0 \
         ORDER BY i1_0.title IS NULL, i1_0.title DESC LIMIT ? OFFSET ? FOR UPDATE;"
    );
}

#[test]
fn offset_without_limit() {
    let mut query = issue_query();
    query
        .set_offset(JdbcParameter::value(5_i64, Type::I64).into())
        .unwrap();
    let stmt = SelectStatement::new(query);

    assert!(Serializer::sqlite()
        .serialize_select(&stmt)
        .sql
        .ends_with(" LIMIT -1 OFFSET ?1;"));
    assert!(Serializer::postgresql()
        .serialize_select(&stmt)
        .sql
        .ends_with("i1_0 OFFSET $1;"));
}

#[test]
fn literals_and_quoting() {
    let path = Arc::new(NavigablePath::root("Order", None));
    let mut query = QuerySpec::new(true);
    query
        .from_clause
        .add_root(TableGroup::new(path, TableReference::new("order", "o1_0")));
    query
        .select_clause
        .add_selection(Expression::column(Some("o1_0"), "Total", Type::I64));
    query.add_restriction(Predicate::eq(
        Expression::column(Some("o1_0"), "note", Type::String),
        Expression::Literal("it's".into()),
    ));
    query.add_restriction(Predicate::BooleanExpr(Expression::column(
        Some("o1_0"),
        "paid",
        Type::Bool,
    )));
    let stmt = SelectStatement::new(query);

    assert_eq!(
        Serializer::sqlite().serialize_select(&stmt).sql,
        r#"SELECT o1_0."Total" FROM "order" o1_0 WHERE o1_0.note = 'it''s' AND o1_0.paid;"#
    );
    assert_eq!(
        Serializer::mysql().serialize_select(&stmt).sql,
        "SELECT o1_0.`Total` FROM `order` o1_0 WHERE o1_0.note = 'it''s' AND o1_0.paid;"
    );
}

#[test]
fn rendering_is_deterministic() {
    let build = || {
        let mut query = issue_query();
        query.add_restriction(Predicate::eq(
            Expression::column(Some("i1_0"), "id", Type::I64),
            JdbcParameter::query(&SqmParameter::named("id"), None, Type::I64),
        ));
        SelectStatement::new(query)
    };

    let serializer = Serializer::postgresql();
    assert_eq!(
        serializer.serialize_select(&build()).sql,
        serializer.serialize_select(&build()).sql
    );
}
