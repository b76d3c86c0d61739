use orma_core::{
    schema::{Metamodel, TypeConfiguration},
    stmt::Type,
};
use orma_sql::Serializer;
use pretty_assertions::assert_eq;

fn metamodel() -> Metamodel {
    let mut builder = Metamodel::builder();
    builder
        .entity("User", |e| {
            e.table("users")
                .id("id", Type::I64)
                .generated_identity()
                .basic_with("name", Type::String, |b| {
                    b.nullable(false);
                })
                .basic("score", Type::F64);
        })
        .entity("Issue", |e| {
            e.table("issues")
                .id("id", Type::I64)
                .basic("title", Type::String)
                .element_collection("labels", Type::String, |p| {
                    p.table("issue_labels").set();
                });
        });

    builder.build(&TypeConfiguration::new()).unwrap()
}

#[test]
fn identity_key_is_declared_inline() {
    let metamodel = metamodel();
    let users = metamodel.table_by_name("users").unwrap();

    assert_eq!(
        Serializer::sqlite().serialize_create_table(users),
        "CREATE TABLE IF NOT EXISTS users (id INTEGER PRIMARY KEY AUTOINCREMENT, \
         name TEXT NOT NULL, score REAL);"
    );
    assert_eq!(
        Serializer::postgresql().serialize_create_table(users),
        "CREATE TABLE IF NOT EXISTS users (id BIGINT GENERATED BY DEFAULT AS IDENTITY PRIMARY KEY, \
         name TEXT NOT NULL, score DOUBLE PRECISION);"
    );
}

#[test]
fn assigned_key_uses_table_constraint() {
    let metamodel = metamodel();
    let issues = metamodel.table_by_name("issues").unwrap();

    assert_eq!(
        Serializer::sqlite().serialize_create_table(issues),
        "CREATE TABLE IF NOT EXISTS issues (id INTEGER NOT NULL, title TEXT, PRIMARY KEY (id));"
    );
}

#[test]
fn collection_table_keys_on_owner_and_element() {
    let metamodel = metamodel();
    let labels = metamodel.table_by_name("issue_labels").unwrap();

    assert_eq!(
        Serializer::mysql().serialize_create_table(labels),
        "CREATE TABLE IF NOT EXISTS issue_labels (issue_id BIGINT NOT NULL, \
         labels VARCHAR(255) NOT NULL, PRIMARY KEY (issue_id, labels));"
    );
}
