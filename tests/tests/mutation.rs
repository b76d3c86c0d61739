//! Inserts, dirty-checked updates, optimistic locking, and removal.

use tests::prelude::*;
use tests::*;

use pretty_assertions::assert_eq;

async fn persist_writes_collections(test: &mut DbTest) {
    let factory = test.setup_db(issue_tracker()).await;
    let mut session = factory.open_session().await.unwrap();

    let alice = session
        .persist(Entity::new("User").id(1).set("name", "alice"))
        .await
        .unwrap();
    let comment = session
        .persist(Entity::new("Comment").id(10).set("body", "Also on Linux"))
        .await
        .unwrap();

    let mut log = test.log();
    log.clear();

    let issue = session
        .persist(
            Entity::new("Issue")
                .id(1)
                .set("title", "Crash on start")
                .set("priority", 3)
                .set("open", true)
                .reference("reporter", &alice)
                .elements(
                    "labels",
                    vec![Element::Value("bug".into()), Element::Value("ui".into())],
                )
                .elements("comments", vec![Element::Entity(comment.clone())]),
        )
        .await
        .unwrap();

    // The issue row, one row per label, and the comment's key
    assert_eq!(log.inserts(), 3);
    assert_eq!(log.updates(), 1);
    assert!(log.sql()[0].starts_with("INSERT INTO"));

    let view = session.entity(&issue).unwrap();
    assert_eq!(view.version(), Some(0));
    assert!(view.is_collection_initialized("labels").unwrap());

    // Read back from a fresh session
    let mut other = factory.open_session().await.unwrap();
    let issue = other.find("Issue", 1).await.unwrap().unwrap();
    other.initialize_collection(&issue, "comments").await.unwrap();

    let view = other.entity(&issue).unwrap();
    assert_eq!(view.get("open").unwrap(), &Value::Bool(true));
    assert_eq!(view.collection("comments").unwrap(), [Element::Entity(comment)]);
}

async fn persist_validates_values(test: &mut DbTest) {
    let factory = test.setup_db(issue_tracker()).await;
    let mut session = factory.open_session().await.unwrap();
    let alice = session
        .persist(Entity::new("User").id(1).set("name", "alice"))
        .await
        .unwrap();

    // Assigned identifiers are required
    let err = assert_err!(session.persist(Entity::new("User").set("name", "bob")).await);
    assert!(err.is_invalid_statement(), "{err}");

    // A managed identifier cannot be persisted again
    let err = assert_err!(
        session
            .persist(Entity::new("User").id(1).set("name", "carol"))
            .await
    );
    assert!(err.is_invalid_statement(), "{err}");

    // `title` is not nullable
    let err = assert_err!(
        session
            .persist(Entity::new("Issue").id(1).reference("reporter", &alice))
            .await
    );
    assert!(err.to_string().contains("not nullable"), "{err}");

    // References must target the mapped entity
    let comment = session
        .persist(Entity::new("Comment").id(10).set("body", "hi"))
        .await
        .unwrap();
    let err = assert_err!(
        session
            .persist(
                Entity::new("Issue")
                    .id(1)
                    .set("title", "Crash")
                    .reference("reporter", &comment)
            )
            .await
    );
    assert!(err.is_invalid_statement(), "{err}");

    let err = assert_err!(
        session
            .persist(Entity::new("User").id(3).set("email", "x@example.com"))
            .await
    );
    assert!(err.to_string().contains("email"), "{err}");
}

async fn flush_writes_changed_columns(test: &mut DbTest) {
    let factory = test.setup_db(issue_tracker()).await;
    let mut session = factory.open_session().await.unwrap();
    seed(&mut session).await;

    let issue = session.find("Issue", 2).await.unwrap().unwrap();
    let mut log = test.log();
    log.clear();

    // Nothing changed, nothing written
    session.flush().await.unwrap();
    assert!(log.is_empty());

    session.set(&issue, "title", "Slow search results").await.unwrap();
    session.flush().await.unwrap();

    assert_eq!(log.updates(), 1);
    let sql = log.pop_sql();
    assert!(sql.contains("title"), "{sql}");
    assert!(!sql.contains("priority"), "{sql}");

    let view = session.entity(&issue).unwrap();
    assert_eq!(view.version(), Some(1));

    // The change is visible to other sessions
    let mut other = factory.open_session().await.unwrap();
    let reloaded = other.find("Issue", 2).await.unwrap().unwrap();
    let view = other.entity(&reloaded).unwrap();
    assert_eq!(view.get("title").unwrap(), &Value::from("Slow search results"));
    assert_eq!(view.version(), Some(1));
}

async fn update_flushes_one_entity(test: &mut DbTest) {
    let factory = test.setup_db(issue_tracker()).await;
    let mut session = factory.open_session().await.unwrap();
    let seed = seed(&mut session).await;

    let first = session.find("Issue", 1).await.unwrap().unwrap();
    let second = session.find("Issue", 3).await.unwrap().unwrap();
    session.set(&first, "priority", 5).await.unwrap();
    session.set(&second, "priority", 4).await.unwrap();

    let mut log = test.log();
    log.clear();

    session.update(&first).await.unwrap();
    assert_eq!(log.updates(), 1);

    session.set_reference(&second, "reporter", Some(&seed.alice)).await.unwrap();
    session.flush().await.unwrap();
    assert_eq!(log.updates(), 2);

    let view = session.entity(&second).unwrap();
    assert_eq!(view.reference("reporter").unwrap(), Some(&seed.alice));

    // Nullable references can be cleared; required values cannot
    session.set_reference(&first, "assignee", None).await.unwrap();
    let err = assert_err!(session.set(&first, "title", Value::Null).await);
    assert!(err.is_invalid_statement(), "{err}");
}

async fn stale_version_is_rejected(test: &mut DbTest) {
    let factory = test.setup_db(issue_tracker()).await;
    let mut session = factory.open_session().await.unwrap();
    seed(&mut session).await;

    let mut first = factory.open_session().await.unwrap();
    let mut second = factory.open_session().await.unwrap();

    let issue = first.find("Issue", 2).await.unwrap().unwrap();
    let stale = second.find("Issue", 2).await.unwrap().unwrap();

    first.set(&issue, "priority", 2).await.unwrap();
    first.flush().await.unwrap();

    second.set(&stale, "priority", 3).await.unwrap();
    let err = assert_err!(second.flush().await);
    assert!(err.is_condition_failed(), "{err}");
    assert!(err.to_string().contains("another transaction"), "{err}");
}

async fn set_collection_rewrites_elements(test: &mut DbTest) {
    let factory = test.setup_db(issue_tracker()).await;
    let mut session = factory.open_session().await.unwrap();
    seed(&mut session).await;

    let issue = session.find("Issue", 3).await.unwrap().unwrap();
    let mut log = test.log();
    log.clear();

    session
        .set_collection(
            &issue,
            "labels",
            vec![Element::Value("docs".into()), Element::Value("help".into())],
        )
        .await
        .unwrap();
    session.flush().await.unwrap();

    // The version bump, then the element rows are replaced
    assert_eq!(log.updates(), 1);
    assert_eq!(log.deletes(), 1);
    assert_eq!(log.inserts(), 2);

    session.clear();
    let issue = session.find("Issue", 3).await.unwrap().unwrap();
    session.initialize_collection(&issue, "labels").await.unwrap();
    assert_eq!(session.entity(&issue).unwrap().collection("labels").unwrap().len(), 2);

    // Elements must match the collection's element type
    let err = assert_err!(
        session
            .set_collection(&issue, "labels", vec![Element::Value(Value::Null)])
            .await
    );
    assert!(err.is_invalid_statement(), "{err}");
}

async fn reorder_list(test: &mut DbTest) {
    let factory = test.setup_db(issue_tracker()).await;
    let mut session = factory.open_session().await.unwrap();
    let seed = seed(&mut session).await;

    let issue = session.find("Issue", 1).await.unwrap().unwrap();
    session.initialize_collection(&issue, "comments").await.unwrap();

    let reversed: Vec<_> = seed.comments.iter().rev().cloned().map(Element::Entity).collect();
    session
        .set_collection(&issue, "comments", reversed.clone())
        .await
        .unwrap();
    session.flush().await.unwrap();

    session.clear();
    let issue = session.find("Issue", 1).await.unwrap().unwrap();
    session.initialize_collection(&issue, "comments").await.unwrap();
    assert_eq!(
        session.entity(&issue).unwrap().collection("comments").unwrap(),
        reversed
    );
}

async fn secondary_table_rows_follow_values(test: &mut DbTest) {
    let factory = test.setup_db(issue_tracker()).await;
    let mut session = factory.open_session().await.unwrap();
    let mut log = test.log();

    let documented = session
        .persist(
            Entity::new("Project")
                .set("name", "orma")
                .set("description", "Object/relational mapping"),
        )
        .await
        .unwrap();
    assert_eq!(log.inserts(), 2);

    log.clear();
    let bare = session
        .persist(Entity::new("Project").set("name", "scratch"))
        .await
        .unwrap();

    // The optional row is skipped while every column is null
    assert_eq!(log.inserts(), 1);
    assert_ne!(documented, bare);
    assert!(bare.id.as_i64().is_some());

    // Assigning a value inserts the row
    log.clear();
    session.set(&bare, "description", "Experiments").await.unwrap();
    session.flush().await.unwrap();
    assert_eq!(log.inserts(), 1);
    assert!(log.pop_sql().contains("project_details"));

    // Clearing every value deletes it
    session.set(&documented, "description", Value::Null).await.unwrap();
    session.flush().await.unwrap();
    assert_eq!(log.deletes(), 1);

    session.clear();
    let reloaded = session.find("Project", bare.id.clone()).await.unwrap().unwrap();
    assert_eq!(
        session.entity(&reloaded).unwrap().get("description").unwrap(),
        &Value::from("Experiments")
    );

    // Identifiers are generated by the database
    let err = assert_err!(
        session
            .persist(Entity::new("Project").id(7).set("name", "assigned"))
            .await
    );
    assert!(err.is_invalid_statement(), "{err}");
}

async fn remove_entity(test: &mut DbTest) {
    let factory = test.setup_db(issue_tracker()).await;
    let mut session = factory.open_session().await.unwrap();
    let seed = seed(&mut session).await;

    let mut log = test.log();
    log.clear();

    // Removing an unloaded entity reads it first
    session.remove(&seed.issues[0]).await.unwrap();
    assert_eq!(log.selects(), 1);

    // Labels are deleted and comments detached before the issue row
    let sql = log.sql();
    assert!(sql[1].starts_with("DELETE"), "{sql:?}");
    assert!(sql[2].starts_with("UPDATE"), "{sql:?}");
    assert!(sql[3].starts_with("DELETE"), "{sql:?}");
    assert!(!session.contains(&seed.issues[0]));

    assert!(session.find("Issue", 1).await.unwrap().is_none());

    // Detached comments remain
    let comment = session.find("Comment", 10).await.unwrap();
    assert_eq!(comment, Some(seed.comments[0].clone()));

    let err = assert_err!(session.remove(&seed.issues[0]).await);
    assert!(err.is_record_not_found(), "{err}");
}

async fn remove_secondary_rows(test: &mut DbTest) {
    let factory = test.setup_db(issue_tracker()).await;
    let mut session = factory.open_session().await.unwrap();

    let project = session
        .persist(Entity::new("Project").set("name", "scratch"))
        .await
        .unwrap();

    let mut log = test.log();
    log.clear();

    // The optional row may be missing
    session.remove(&project).await.unwrap();
    assert_eq!(log.deletes(), 2);
}

tests!(
    persist_writes_collections,
    persist_validates_values,
    flush_writes_changed_columns,
    update_flushes_one_entity,
    stale_version_is_rejected,
    set_collection_rewrites_elements,
    reorder_list,
    secondary_table_rows_follow_values,
    remove_entity,
    remove_secondary_rows,
);
