//! Loading entities by identifier: join fetches, proxies, collections, and
//! batched multi-id loads.

use tests::prelude::*;
use tests::*;

use pretty_assertions::assert_eq;

async fn find_joins_reporter(test: &mut DbTest) {
    let factory = test.setup_db(issue_tracker()).await;
    let mut session = factory.open_session().await.unwrap();
    let seed = seed(&mut session).await;
    let mut log = test.log();
    log.clear();

    let issue = session.find("Issue", 1).await.unwrap().unwrap();

    // The reporter is joined into the issue's select; the assignee is not
    assert_eq!(log.selects(), 1);
    let sql = log.pop_sql();
    assert!(sql.contains(" JOIN "), "{sql}");
    assert!(sql.contains("users"), "{sql}");
    assert_eq!(sql.matches(" JOIN ").count(), 1, "{sql}");
    assert!(session.is_initialized(&seed.alice));

    let view = session.entity(&issue).unwrap();
    assert_eq!(view.get("title").unwrap(), &Value::from("Crash on start"));
    assert_eq!(view.get("priority").unwrap(), &Value::I64(3));
    assert_eq!(view.get("open").unwrap(), &Value::Bool(true));
    assert_eq!(view.reference("reporter").unwrap(), Some(&seed.alice));
    assert_eq!(view.version(), Some(0));

    let reporter = session.entity(&seed.alice).unwrap();
    assert_eq!(reporter.get("name").unwrap(), &Value::from("alice"));
}

async fn delayed_reference_is_a_proxy(test: &mut DbTest) {
    let factory = test.setup_db(issue_tracker()).await;
    let mut session = factory.open_session().await.unwrap();
    let seed = seed(&mut session).await;
    let mut log = test.log();
    log.clear();

    let issue = session.find("Issue", 1).await.unwrap().unwrap();
    assert_eq!(log.selects(), 1);

    let assignee = session
        .entity(&issue)
        .unwrap()
        .reference("assignee")
        .unwrap()
        .cloned()
        .unwrap();
    assert_eq!(assignee, seed.bob);
    assert!(session.contains(&assignee));
    assert!(!session.is_initialized(&assignee));

    session.initialize(&assignee).await.unwrap();
    assert_eq!(log.selects(), 2);

    let view = session.entity(&assignee).unwrap();
    assert_eq!(view.get("name").unwrap(), &Value::from("bob"));

    // Initialized proxies are not read again
    session.initialize(&assignee).await.unwrap();
    assert_eq!(log.selects(), 2);
}

async fn managed_entity_is_not_reloaded(test: &mut DbTest) {
    let factory = test.setup_db(issue_tracker()).await;
    let mut session = factory.open_session().await.unwrap();
    seed(&mut session).await;
    let mut log = test.log();
    log.clear();

    let first = session.find("Issue", 2).await.unwrap().unwrap();
    let second = session.find("Issue", 2_i64).await.unwrap().unwrap();

    assert_eq!(first, second);
    assert_eq!(log.selects(), 1);
}

async fn missing_entity(test: &mut DbTest) {
    let factory = test.setup_db(issue_tracker()).await;
    let mut session = factory.open_session().await.unwrap();
    seed(&mut session).await;

    assert!(session.find("Issue", 99).await.unwrap().is_none());

    let err = assert_err!(session.find_strict("Issue", 99).await);
    assert!(err.is_record_not_found(), "{err}");

    let err = assert_err!(session.find("Milestone", 1).await);
    assert!(err.to_string().contains("Milestone"), "{err}");
}

async fn element_collection_loads_on_demand(test: &mut DbTest) {
    let factory = test.setup_db(issue_tracker()).await;
    let mut session = factory.open_session().await.unwrap();
    seed(&mut session).await;
    let mut log = test.log();
    log.clear();

    let issue = session.find("Issue", 1).await.unwrap().unwrap();
    assert!(!session
        .entity(&issue)
        .unwrap()
        .is_collection_initialized("labels")
        .unwrap());

    session.initialize_collection(&issue, "labels").await.unwrap();
    assert_eq!(log.selects(), 2);

    let view = session.entity(&issue).unwrap();
    let mut labels: Vec<_> = view
        .collection("labels")
        .unwrap()
        .iter()
        .map(|element| element.as_value().unwrap().clone())
        .collect();
    labels.sort_by(|a, b| a.as_str().cmp(&b.as_str()));
    assert_eq!(labels, [Value::from("bug"), Value::from("ui")]);

    // Loading again is a no-op
    session.initialize_collection(&issue, "labels").await.unwrap();
    assert_eq!(log.selects(), 2);
}

async fn one_to_many_list_keeps_order(test: &mut DbTest) {
    let factory = test.setup_db(issue_tracker()).await;
    let mut session = factory.open_session().await.unwrap();
    let seed = seed(&mut session).await;

    let issue = session.find("Issue", 1).await.unwrap().unwrap();
    session
        .initialize_collection(&issue, "comments")
        .await
        .unwrap();

    let comments: Vec<_> = session
        .entity(&issue)
        .unwrap()
        .collection("comments")
        .unwrap()
        .iter()
        .map(|element| element.as_entity().unwrap().clone())
        .collect();
    assert_eq!(comments, seed.comments);

    // Elements are hydrated by the collection select
    let first = session.entity(&seed.comments[0]).unwrap();
    assert_eq!(first.get("body").unwrap(), &Value::from("Also on Linux"));

    // An issue without comments has an empty, initialized list
    let other = session.find("Issue", 2).await.unwrap().unwrap();
    session
        .initialize_collection(&other, "comments")
        .await
        .unwrap();
    let view = session.entity(&other).unwrap();
    assert!(view.is_collection_initialized("comments").unwrap());
    assert!(view.collection("comments").unwrap().is_empty());
}

async fn initialize_collection_rejects_basic_attribute(test: &mut DbTest) {
    let factory = test.setup_db(issue_tracker()).await;
    let mut session = factory.open_session().await.unwrap();
    seed(&mut session).await;

    let issue = session.find("Issue", 1).await.unwrap().unwrap();
    let err = assert_err!(session.initialize_collection(&issue, "title").await);
    assert!(err.is_invalid_statement(), "{err}");
}

async fn get_reference_defers_the_read(test: &mut DbTest) {
    let factory = test.setup_db(issue_tracker()).await;
    let mut session = factory.open_session().await.unwrap();
    seed(&mut session).await;
    let mut log = test.log();
    log.clear();

    let user = session.get_reference("User", 2).unwrap();
    assert!(log.is_empty());
    assert!(!session.is_initialized(&user));
    assert!(session.entity(&user).is_err());

    session.initialize(&user).await.unwrap();
    assert_eq!(log.selects(), 1);
    assert!(session.is_initialized(&user));

    // A reference to a missing row fails when initialized
    let missing = session.get_reference("User", 42).unwrap();
    let err = assert_err!(session.initialize(&missing).await);
    assert!(err.is_record_not_found(), "{err}");
}

async fn find_multiple_is_aligned_with_ids(test: &mut DbTest) {
    let factory = test.setup_db(issue_tracker()).await;
    let mut session = factory.open_session().await.unwrap();
    let seed = seed(&mut session).await;
    let mut log = test.log();
    log.clear();

    let found = session
        .find_multiple("User", [2, 9, 1, 2])
        .await
        .unwrap();

    assert_eq!(
        found,
        [
            Some(seed.bob.clone()),
            None,
            Some(seed.alice.clone()),
            Some(seed.bob.clone())
        ]
    );

    // Repeated identifiers are read once, in one select
    assert_eq!(log.selects(), 1);

    // Managed entities are skipped
    log.clear();
    let found = session.find_multiple("User", [1, 2]).await.unwrap();
    assert_eq!(found, [Some(seed.alice), Some(seed.bob)]);
    assert!(log.is_empty());
}

async fn find_multiple_in_batches(test: &mut DbTest) {
    let mut builder = issue_tracker();
    builder.multi_load_batch_size(2);

    let factory = test.setup_db(builder).await;
    let mut session = factory.open_session().await.unwrap();
    seed(&mut session).await;
    let mut log = test.log();
    log.clear();

    let found = session.find_multiple("Issue", [1, 2, 3]).await.unwrap();
    assert!(found.iter().all(Option::is_some));

    // Reporters are joined and assignees stay proxies
    assert_eq!(log.selects(), 2);
}

tests!(
    find_joins_reporter,
    delayed_reference_is_a_proxy,
    managed_entity_is_not_reloaded,
    missing_entity,
    element_collection_loads_on_demand,
    one_to_many_list_keeps_order,
    initialize_collection_rejects_basic_attribute,
    get_reference_defers_the_read,
    find_multiple_is_aligned_with_ids,
    find_multiple_in_batches,
);
