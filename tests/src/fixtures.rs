use orma::{
    schema::FetchStyle,
    session_factory::Builder,
    stmt::{Type, Value},
    Element, Entity, EntityKey, Session, SessionFactory,
};

/// Target of `select new Summary(...)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub title: String,
    pub priority: i64,
}

/// A small issue tracker.
///
/// `Issue.reporter` is joined into the issue's select; `Issue.assignee` is a
/// proxy loaded by a separate select on first access. Both collections load
/// on demand. `Project` spans an optional secondary table and `Note` is
/// partitioned by tenant.
pub fn issue_tracker() -> Builder {
    let mut builder = SessionFactory::builder();

    builder
        .entity("User", |e| {
            e.table("users")
                .id("id", Type::I64)
                .basic("name", Type::String);
        })
        .entity("Comment", |e| {
            e.id("id", Type::I64).basic("body", Type::String);
        })
        .entity("Issue", |e| {
            e.id("id", Type::I64)
                .version("version")
                .basic_with("title", Type::String, |b| {
                    b.nullable(false);
                })
                .basic("priority", Type::I64)
                .basic_with("open", Type::Bool, |b| {
                    b.converter("yes_no");
                })
                .many_to_one("reporter", "User", |_| {})
                .many_to_one("assignee", "User", |a| {
                    a.fetch(FetchStyle::Select).lazy();
                })
                .element_collection("labels", Type::String, |p| {
                    p.set();
                })
                .one_to_many("comments", "Comment", |p| {
                    p.list_index("position");
                });
        })
        .entity("Project", |e| {
            e.id("id", Type::I64)
                .generated_identity()
                .secondary_table("project_details", Some("project_id"))
                .optional()
                .basic("name", Type::String)
                .basic_with("description", Type::String, |b| {
                    b.table("project_details");
                });
        })
        .entity("Note", |e| {
            e.id("id", Type::I64)
                .tenant_column("tenant")
                .basic("body", Type::String);
        })
        .instantiator(
            "Summary",
            &[("title", Type::String), ("priority", Type::I64)],
            |mut args: Vec<Value>| {
                let priority = args.pop().unwrap_or_default().into_i64()?;
                let title = args.pop().unwrap_or_default().into_string()?;
                Ok(Summary { title, priority })
            },
        );

    builder
}

/// Keys of the rows [`seed`] persists.
#[derive(Debug)]
pub struct Seed {
    pub alice: EntityKey,
    pub bob: EntityKey,
    pub issues: Vec<EntityKey>,
    pub comments: Vec<EntityKey>,
}

/// Persists two users, three issues and two comments, then clears the
/// session so later reads hit the database.
///
/// | id | title          | priority | open | reporter | assignee | labels  |
/// |----|----------------|----------|------|----------|----------|---------|
/// | 1  | Crash on start | 3        | yes  | alice    | bob      | bug, ui |
/// | 2  | Slow search    | 1        | no   | alice    |          |         |
/// | 3  | Typo in docs   | 2        | yes  | bob      |          | docs    |
///
/// Issue 1 holds comments 10 and 11, in that order.
pub async fn seed(session: &mut Session) -> Seed {
    let alice = session
        .persist(Entity::new("User").id(1).set("name", "alice"))
        .await
        .unwrap();
    let bob = session
        .persist(Entity::new("User").id(2).set("name", "bob"))
        .await
        .unwrap();

    let mut comments = vec![];
    for (id, body) in [(10_i64, "Also on Linux"), (11, "Fixed in main")] {
        comments.push(
            session
                .persist(Entity::new("Comment").id(id).set("body", body))
                .await
                .unwrap(),
        );
    }

    let label = |label: &str| Element::Value(Value::from(label));

    let issues = vec![
        Entity::new("Issue")
            .id(1)
            .set("title", "Crash on start")
            .set("priority", 3)
            .set("open", true)
            .reference("reporter", &alice)
            .reference("assignee", &bob)
            .elements("labels", vec![label("bug"), label("ui")])
            .elements(
                "comments",
                comments.iter().cloned().map(Element::Entity).collect(),
            ),
        Entity::new("Issue")
            .id(2)
            .set("title", "Slow search")
            .set("priority", 1)
            .set("open", false)
            .reference("reporter", &alice),
        Entity::new("Issue")
            .id(3)
            .set("title", "Typo in docs")
            .set("priority", 2)
            .set("open", true)
            .reference("reporter", &bob)
            .elements("labels", vec![label("docs")]),
    ];

    let mut keys = vec![];
    for issue in issues {
        keys.push(session.persist(issue).await.unwrap());
    }

    session.clear();

    Seed {
        alice,
        bob,
        issues: keys,
        comments,
    }
}
