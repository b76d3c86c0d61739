//! Session lifecycle: transactions, tenants, eviction, and locking reads.

use tests::prelude::*;
use tests::*;

use pretty_assertions::assert_eq;

use orma::driver::operation::Transaction;

async fn commit_flushes_pending_changes(test: &mut DbTest) {
    let factory = test.setup_db(issue_tracker()).await;
    let mut session = factory.open_session().await.unwrap();
    seed(&mut session).await;

    let issue = session.find("Issue", 3).await.unwrap().unwrap();
    let mut log = test.log();
    log.clear();

    session.begin().await.unwrap();
    session.set(&issue, "priority", 1).await.unwrap();
    session.commit().await.unwrap();

    assert_eq!(log.transactions(), [Transaction::Start, Transaction::Commit]);
    assert_eq!(log.updates(), 1);

    let mut other = factory.open_session().await.unwrap();
    let issue = other.find("Issue", 3).await.unwrap().unwrap();
    assert_eq!(
        other.entity(&issue).unwrap().get("priority").unwrap(),
        &Value::I64(1)
    );
}

async fn rollback_discards_changes(test: &mut DbTest) {
    let factory = test.setup_db(issue_tracker()).await;
    let mut session = factory.open_session().await.unwrap();

    session.begin().await.unwrap();
    let user = session
        .persist(Entity::new("User").id(1).set("name", "alice"))
        .await
        .unwrap();
    assert!(session.contains(&user));

    session.rollback().await.unwrap();

    // The context no longer matches the database and is cleared
    assert!(!session.contains(&user));
    assert!(session.find("User", 1).await.unwrap().is_none());

    let log = test.log();
    assert_eq!(log.transactions(), [Transaction::Start, Transaction::Rollback]);
}

async fn evict_and_clear(test: &mut DbTest) {
    let factory = test.setup_db(issue_tracker()).await;
    let mut session = factory.open_session().await.unwrap();
    let seed = seed(&mut session).await;

    let issue = session.find("Issue", 2).await.unwrap().unwrap();
    assert!(session.contains(&issue));
    assert!(session.contains(&seed.alice));

    // Unflushed changes of evicted entities are lost
    session.set(&issue, "title", "Renamed").await.unwrap();
    session.evict(&issue);
    assert!(!session.contains(&issue));
    assert!(session.entity(&issue).is_err());

    let mut log = test.log();
    log.clear();
    session.flush().await.unwrap();
    assert!(log.is_empty());

    let issue = session.find("Issue", 2).await.unwrap().unwrap();
    assert_eq!(
        session.entity(&issue).unwrap().get("title").unwrap(),
        &Value::from("Slow search")
    );

    session.clear();
    assert!(!session.contains(&issue));
    assert!(!session.contains(&seed.alice));
}

async fn locking_find_reads_again(test: &mut DbTest) {
    let factory = test.setup_db(issue_tracker()).await;
    let mut session = factory.open_session().await.unwrap();
    seed(&mut session).await;

    session.find("User", 1).await.unwrap().unwrap();
    let mut log = test.log();
    log.clear();

    let options = LoadOptions {
        lock_mode: LockMode::PessimisticWrite,
        ..LoadOptions::default()
    };
    let user = session
        .find_with_options("User", 1, &options)
        .await
        .unwrap();
    assert!(user.is_some());

    // Managed entities are read again to take the lock. SQLite has no row
    // locks, so the select is plain.
    assert_eq!(log.selects(), 1);
    let sql = log.pop_sql();
    assert!(!sql.contains("FOR UPDATE"), "{sql}");
}

async fn tenant_partitions_rows(test: &mut DbTest) {
    let factory = test.setup_db(issue_tracker()).await;

    let mut acme = factory.open_session_with_tenant("acme").await.unwrap();
    assert_eq!(acme.tenant(), Some("acme"));

    acme.persist(Entity::new("Note").id(1).set("body", "acme only"))
        .await
        .unwrap();

    let mut globex = factory.open_session_with_tenant("globex").await.unwrap();
    assert!(globex.find("Note", 1).await.unwrap().is_none());

    let notes = globex
        .create_query("select n from Note n")
        .unwrap()
        .list()
        .await
        .unwrap();
    assert!(notes.is_empty());

    let mut acme = factory.open_session_with_tenant("acme").await.unwrap();
    let note = acme.find("Note", 1).await.unwrap().unwrap();
    assert_eq!(
        acme.entity(&note).unwrap().get("body").unwrap(),
        &Value::from("acme only")
    );

    // Bulk statements are restricted to the tenant too
    let updated = globex
        .execute_update("update Note n set n.body = 'changed'")
        .await
        .unwrap();
    assert_eq!(updated, 0);
}

async fn tenant_is_required(test: &mut DbTest) {
    let factory = test.setup_db(issue_tracker()).await;
    let mut session = factory.open_session().await.unwrap();
    assert_eq!(session.tenant(), None);

    let err = assert_err!(
        session
            .persist(Entity::new("Note").id(1).set("body", "orphan"))
            .await
    );
    assert!(err.to_string().contains("multi-tenant"), "{err}");

    let err = assert_err!(session.find("Note", 1).await);
    assert!(err.is_invalid_statement(), "{err}");

    // Entities without a tenant column are unaffected
    session
        .persist(Entity::new("User").id(1).set("name", "alice"))
        .await
        .unwrap();
}

async fn sessions_do_not_share_state(test: &mut DbTest) {
    let factory = test.setup_db(issue_tracker()).await;
    let mut first = factory.open_session().await.unwrap();
    let seed = seed(&mut first).await;

    let issue = first.find("Issue", 1).await.unwrap().unwrap();
    let second = factory.open_session().await.unwrap();

    assert!(first.contains(&issue));
    assert!(!second.contains(&issue));
    assert!(!second.contains(&seed.alice));
}

tests!(
    commit_flushes_pending_changes,
    rollback_discards_changes,
    evict_and_clear,
    locking_find_reads_again,
    tenant_partitions_rows,
    tenant_is_required,
    sessions_do_not_share_state,
);

#[cfg(feature = "sqlite")]
#[tokio::test]
async fn connect_by_url() {
    let factory = issue_tracker().connect("sqlite::memory:").await.unwrap();
    factory.create_schema().await.unwrap();

    let mut session = factory.open_session().await.unwrap();
    let user = session
        .persist(Entity::new("User").id(1).set("name", "alice"))
        .await
        .unwrap();

    let mut other = factory.open_session().await.unwrap();
    assert_eq!(other.find("User", 1).await.unwrap(), Some(user));

    let err = assert_err!(issue_tracker().connect("mysql://localhost/orma").await);
    assert!(err.to_string().contains("unsupported database"), "{err}");
}
