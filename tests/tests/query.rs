//! HQL queries: parameters, fetch joins, result shapes, and bulk updates.

use tests::prelude::*;
use tests::*;

use pretty_assertions::assert_eq;

use orma::Instance;
use std::time::Duration;

async fn list_entities(test: &mut DbTest) {
    let factory = test.setup_db(issue_tracker()).await;
    let mut session = factory.open_session().await.unwrap();
    let seed = seed(&mut session).await;

    let results = session
        .create_query("select i from Issue i where i.priority >= :min order by i.priority desc")
        .unwrap()
        .set_parameter("min", 2)
        .unwrap()
        .list()
        .await
        .unwrap();

    let keys: Vec<_> = results
        .iter()
        .map(|result| result.as_entity().unwrap().clone())
        .collect();
    assert_eq!(keys, [seed.issues[0].clone(), seed.issues[2].clone()]);
}

async fn query_fetch_join_avoids_second_select(test: &mut DbTest) {
    let factory = test.setup_db(issue_tracker()).await;
    let mut session = factory.open_session().await.unwrap();
    seed(&mut session).await;
    let mut log = test.log();
    log.clear();

    // Without a fetch join, reporters are read by one more select
    session
        .create_query("select i from Issue i")
        .unwrap()
        .list()
        .await
        .unwrap();
    assert_eq!(log.selects(), 2);

    session.clear();
    log.clear();

    session
        .create_query("select i from Issue i join fetch i.reporter")
        .unwrap()
        .list()
        .await
        .unwrap();
    assert_eq!(log.selects(), 1);
}

async fn collection_fetch_join_returns_distinct_roots(test: &mut DbTest) {
    let factory = test.setup_db(issue_tracker()).await;
    let mut session = factory.open_session().await.unwrap();
    let seed = seed(&mut session).await;

    let results = session
        .create_query("select i from Issue i join fetch i.labels where i.id = 1")
        .unwrap()
        .list()
        .await
        .unwrap();

    // Two label rows, one issue
    assert_eq!(results.len(), 1);

    let issue = &seed.issues[0];
    let view = session.entity(issue).unwrap();
    assert!(view.is_collection_initialized("labels").unwrap());
    assert_eq!(view.collection("labels").unwrap().len(), 2);
}

async fn scalar_and_tuple_results(test: &mut DbTest) {
    let factory = test.setup_db(issue_tracker()).await;
    let mut session = factory.open_session().await.unwrap();
    seed(&mut session).await;

    let count = session
        .create_query("select count(*) from Issue i where i.priority > 1")
        .unwrap()
        .single_result()
        .await
        .unwrap()
        .into_scalar()
        .unwrap();
    assert_eq!(count.as_i64(), Some(2));

    let rows = session
        .create_query("select i.title, i.priority from Issue i order by i.id")
        .unwrap()
        .list()
        .await
        .unwrap();

    let rows: Vec<_> = rows
        .iter()
        .map(|row| {
            let tuple = row.as_tuple().unwrap();
            (
                tuple[0].as_scalar().unwrap().clone(),
                tuple[1].as_scalar().unwrap().clone(),
            )
        })
        .collect();

    assert_eq!(
        rows,
        [
            (Value::from("Crash on start"), Value::I64(3)),
            (Value::from("Slow search"), Value::I64(1)),
            (Value::from("Typo in docs"), Value::I64(2)),
        ]
    );
}

async fn dynamic_instantiation(test: &mut DbTest) {
    let factory = test.setup_db(issue_tracker()).await;
    let mut session = factory.open_session().await.unwrap();
    seed(&mut session).await;

    let results = session
        .create_query("select new Summary(i.title, i.priority) from Issue i order by i.priority")
        .unwrap()
        .list()
        .await
        .unwrap();

    let summaries: Vec<Summary> = results
        .iter()
        .map(|result| {
            let instance: &Instance = result.as_instance().unwrap();
            assert_eq!(instance.type_name(), "Summary");
            instance.downcast_ref::<Summary>().unwrap().clone()
        })
        .collect();

    assert_eq!(
        summaries,
        [
            Summary {
                title: "Slow search".into(),
                priority: 1
            },
            Summary {
                title: "Typo in docs".into(),
                priority: 2
            },
            Summary {
                title: "Crash on start".into(),
                priority: 3
            },
        ]
    );

    // Aliased arguments are matched to parameters by name
    let result = session
        .create_query("select new Summary(i.priority as priority, i.title as title) from Issue i where i.id = 2")
        .unwrap()
        .single_result()
        .await
        .unwrap();
    let summary = result.as_instance().unwrap().downcast_ref::<Summary>().unwrap();
    assert_eq!(summary.title, "Slow search");
    assert_eq!(summary.priority, 1);
}

async fn map_instantiation(test: &mut DbTest) {
    let factory = test.setup_db(issue_tracker()).await;
    let mut session = factory.open_session().await.unwrap();
    seed(&mut session).await;

    let result = session
        .create_query("select new map(i.title as title, i.priority) from Issue i where i.id = 3")
        .unwrap()
        .single_result()
        .await
        .unwrap();

    let map = result.as_map().unwrap();
    let keys: Vec<_> = map.keys().map(String::as_str).collect();
    assert_eq!(keys, ["title", "1"]);
    assert_eq!(map["title"].as_scalar(), Some(&Value::from("Typo in docs")));
}

async fn unknown_instantiation_target(test: &mut DbTest) {
    let factory = test.setup_db(issue_tracker()).await;
    let mut session = factory.open_session().await.unwrap();

    let mut query = session
        .create_query("select new Report(i.title) from Issue i")
        .unwrap();
    let err = assert_err!(query.list().await);
    assert!(err.to_string().contains("Report"), "{err}");
}

async fn unique_result_cardinality(test: &mut DbTest) {
    let factory = test.setup_db(issue_tracker()).await;
    let mut session = factory.open_session().await.unwrap();
    seed(&mut session).await;

    let none = session
        .create_query("select i from Issue i where i.id = 99")
        .unwrap()
        .unique_result()
        .await
        .unwrap();
    assert!(none.is_none());

    let mut query = session.create_query("select i from Issue i where i.id = 99").unwrap();
    let err = assert_err!(query.single_result().await);
    assert!(err.is_record_not_found(), "{err}");

    let mut query = session.create_query("select i from Issue i").unwrap();
    let err = assert_err!(query.unique_result().await);
    assert!(err.is_too_many_records(), "{err}");
}

async fn parameter_errors(test: &mut DbTest) {
    let factory = test.setup_db(issue_tracker()).await;
    let mut session = factory.open_session().await.unwrap();

    let mut query = session
        .create_query("select i from Issue i where i.id = :id")
        .unwrap();

    // Unknown parameter
    let err = assert_err!(query.set_parameter("key", 1));
    assert!(err.is_invalid_statement(), "{err}");

    // A list for a single-valued parameter
    let err = assert_err!(query.set_parameter_list("id", [1, 2]));
    assert!(err.is_invalid_statement(), "{err}");

    // Executing with an unbound parameter
    let err = assert_err!(query.list().await);
    assert!(err.to_string().contains(":id"), "{err}");
}

async fn in_list_parameter(test: &mut DbTest) {
    let factory = test.setup_db(issue_tracker()).await;
    let mut session = factory.open_session().await.unwrap();
    let seed = seed(&mut session).await;

    let results = session
        .create_query("select i from Issue i where i.id in (:ids) order by i.id")
        .unwrap()
        .set_parameter_list("ids", [3, 1])
        .unwrap()
        .list()
        .await
        .unwrap();

    let keys: Vec<_> = results
        .iter()
        .map(|result| result.as_entity().unwrap().clone())
        .collect();
    assert_eq!(keys, [seed.issues[0].clone(), seed.issues[2].clone()]);
}

async fn paging(test: &mut DbTest) {
    let factory = test.setup_db(issue_tracker()).await;
    let mut session = factory.open_session().await.unwrap();
    let seed = seed(&mut session).await;

    let results = session
        .create_query("select i from Issue i order by i.id")
        .unwrap()
        .set_first_result(1)
        .set_max_results(1)
        .list()
        .await
        .unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].as_entity(), Some(&seed.issues[1]));
}

async fn positional_parameters(test: &mut DbTest) {
    let factory = test.setup_db(issue_tracker()).await;
    let mut session = factory.open_session().await.unwrap();
    let seed = seed(&mut session).await;

    let results = session
        .create_query("select i from Issue i where i.priority > ?1 order by i.id")
        .unwrap()
        .set_positional(1, 1)
        .unwrap()
        .set_lock_mode(LockMode::PessimisticWrite)
        .set_timeout(Duration::from_secs(5))
        .list()
        .await
        .unwrap();

    let keys: Vec<_> = results
        .iter()
        .map(|result| result.as_entity().unwrap().clone())
        .collect();
    assert_eq!(keys, [seed.issues[0].clone(), seed.issues[2].clone()]);

    let mut query = session
        .create_query("select i from Issue i where i.priority > ?1")
        .unwrap();
    let err = assert_err!(query.set_positional(2, 1));
    assert!(err.is_invalid_statement(), "{err}");
}

async fn path_through_association(test: &mut DbTest) {
    let factory = test.setup_db(issue_tracker()).await;
    let mut session = factory.open_session().await.unwrap();
    seed(&mut session).await;

    let titles = session
        .create_query("select i.title from Issue i where i.reporter.name = :name order by i.id")
        .unwrap()
        .set_parameter("name", "alice")
        .unwrap()
        .list()
        .await
        .unwrap();

    let titles: Vec<_> = titles
        .into_iter()
        .map(|title| title.into_scalar().unwrap())
        .collect();
    assert_eq!(titles, [Value::from("Crash on start"), Value::from("Slow search")]);
}

async fn duplicate_alias_is_rejected(test: &mut DbTest) {
    let factory = test.setup_db(issue_tracker()).await;
    let mut session = factory.open_session().await.unwrap();

    let err = assert_err!(session.create_query("select i from Issue i, User i"));
    assert!(err.is_invalid_statement(), "{err}");
}

async fn sql_is_deterministic(test: &mut DbTest) {
    let factory = test.setup_db(issue_tracker()).await;
    let mut session = factory.open_session().await.unwrap();
    seed(&mut session).await;
    let mut log = test.log();

    let hql = "select i.title from Issue i join i.reporter r where r.name = :name";

    for _ in 0..2 {
        log.clear();
        session
            .create_query(hql)
            .unwrap()
            .set_parameter("name", "bob")
            .unwrap()
            .list()
            .await
            .unwrap();
    }
    let second = log.sql();

    // Fresh sessions translate the same statement to the same SQL
    let mut other = factory.open_session().await.unwrap();
    log.clear();
    other
        .create_query(hql)
        .unwrap()
        .set_parameter("name", "bob")
        .unwrap()
        .list()
        .await
        .unwrap();

    assert_eq!(log.sql(), second);
}

async fn interpreted_statements_are_copies(test: &mut DbTest) {
    let factory = test.setup_db(issue_tracker()).await;

    let hql = "select i from Issue i where i.id = :id";
    let first = factory.interpret_hql(hql).unwrap();
    let second = factory.interpret_hql(hql).unwrap();

    assert_eq!(first, second);

    // Each copy has its own parameters
    let (a, b) = (first.parameters(), second.parameters());
    assert_eq!(a.len(), 1);
    assert!(!std::sync::Arc::ptr_eq(&a[0], &b[0]));

    // Selection queries copy the statement again
    let mut session = factory.open_session().await.unwrap();
    let query = session.create_selection_query(&first).unwrap();
    assert!(!std::sync::Arc::ptr_eq(
        &query.statement().parameters()[0],
        &a[0]
    ));
}

async fn bulk_update_and_delete(test: &mut DbTest) {
    let factory = test.setup_db(issue_tracker()).await;
    let mut session = factory.open_session().await.unwrap();
    seed(&mut session).await;

    let updated = session
        .create_query("update Issue i set i.priority = i.priority + 10 where i.priority >= :min")
        .unwrap()
        .set_parameter("min", 2)
        .unwrap()
        .execute_update()
        .await
        .unwrap();
    assert_eq!(updated, 2);

    let max = session
        .create_query("select max(i.priority) from Issue i")
        .unwrap()
        .single_result()
        .await
        .unwrap()
        .into_scalar()
        .unwrap();
    assert_eq!(max.as_i64(), Some(13));

    let deleted = session
        .execute_update("delete from Comment c where c.id = 11")
        .await
        .unwrap();
    assert_eq!(deleted, 1);

    // Selects cannot run as updates, and updates cannot be listed
    let mut query = session.create_query("select i from Issue i").unwrap();
    assert_err!(query.execute_update().await);

    let mut query = session.create_query("delete from Issue i").unwrap();
    assert_err!(query.list().await);
}

async fn auto_flush_before_query(test: &mut DbTest) {
    let factory = test.setup_db(issue_tracker()).await;
    let mut session = factory.open_session().await.unwrap();
    seed(&mut session).await;

    let issue = session.find("Issue", 2).await.unwrap().unwrap();
    session.set(&issue, "priority", 5).await.unwrap();

    let mut log = test.log();
    log.clear();

    let result = session
        .create_query("select i.priority from Issue i where i.id = 2")
        .unwrap()
        .single_result()
        .await
        .unwrap();
    assert_eq!(result.into_scalar().unwrap(), Value::I64(5));

    assert!(log.pop_sql().starts_with("UPDATE"));
    assert!(log.pop_sql().starts_with("SELECT"));

    // Queries over other tables do not flush
    session.set(&issue, "priority", 6).await.unwrap();
    log.clear();
    session
        .create_query("select u from User u")
        .unwrap()
        .list()
        .await
        .unwrap();
    assert_eq!(log.updates(), 0);
}

async fn strict_compliance(test: &mut DbTest) {
    let mut builder = issue_tracker();
    builder.strict_compliance(true);

    let factory = test.setup_db(builder).await;
    let mut session = factory.open_session().await.unwrap();

    assert_err!(session.create_query("from Issue"));
    assert_err!(session.create_query("select i from Issue i limit 1"));
    assert!(session.create_query("select i from Issue i").is_ok());
}

tests!(
    list_entities,
    query_fetch_join_avoids_second_select,
    collection_fetch_join_returns_distinct_roots,
    scalar_and_tuple_results,
    dynamic_instantiation,
    map_instantiation,
    unknown_instantiation_target,
    unique_result_cardinality,
    parameter_errors,
    in_list_parameter,
    paging,
    positional_parameters,
    path_through_association,
    duplicate_alias_is_rejected,
    sql_is_deterministic,
    interpreted_statements_are_copies,
    bulk_update_and_delete,
    auto_flush_before_query,
    strict_compliance,
);
