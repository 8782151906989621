use std::sync::Arc;
use topica::{
    error::{ConstraintErrorKind, ErrorOrigin},
    prelude::*,
};
use tracing_subscriber::EnvFilter;

const SCHEMA: &str = r#"{
    "types": [
        {
            "id": "person",
            "defaultView": "info",
            "fields": [ { "id": "name" } ],
            "views": [ { "id": "info", "fields": ["name"] } ]
        },
        {
            "id": "book",
            "defaultView": "info",
            "fields": [
                { "id": "title" },
                { "id": "isbn",
                  "extra": { "unique": { "resolve":
                      { "type": "query", "topicType": "book", "field": "isbn", "key": ":value" } } } },
                { "id": "tags" },
                { "id": "author",
                  "kind": { "dataType": "reference", "valueTypes": ["person"] } }
            ],
            "views": [
                { "id": "info", "fields": ["title", "isbn", "tags", "author"] },
                { "id": "card", "fields": ["title"] }
            ],
            "extra": { "contextRules": [
                { "class": "constant", "value": false,
                  "flags": ["addableFieldValue"], "appliesTo": ["tags"] }
            ] }
        }
    ]
}"#;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn open(schema_json: &str, config: &EngineConfig) -> Result<(Session, Arc<MemoryGraph>), Error> {
    init_tracing();

    let schema = Arc::new(Schema::from_json_str(schema_json)?);
    let graph = Arc::new(MemoryGraph::new(Arc::clone(&schema)));
    graph.insert(
        Topic::new("ada".into(), "person").with_values("name", vec![Value::from("Ada")]),
    )?;

    let builder = Engine::builder(schema, Arc::clone(&graph) as _)
        .query_backend(Arc::clone(&graph) as _);
    let session = Session::open(builder, config)?;

    Ok((session, graph))
}

fn session() -> (Session, Arc<MemoryGraph>) {
    open(SCHEMA, &EngineConfig::default()).expect("session should open")
}

fn new_book(session: &Session, isbn: &str) -> Arc<Topic> {
    let submission = TopicSubmission::new("book")
        .with_field("title", vec![SubmittedValue::primitive("Notes")])
        .with_field("isbn", vec![SubmittedValue::primitive(isbn)])
        .with_field("author", vec![SubmittedValue::reference("ada")]);

    session.submit(&submission).expect("book should be stored")
}

#[test]
fn submitted_topics_are_created_and_readable() {
    let (session, graph) = session();
    let book = new_book(&session, "978-0");

    assert!(!book.id().is_new());
    assert_eq!(graph.len().expect("graph len"), 2);

    let author = session
        .field_values(book.id().as_str(), "author", 0, 0)
        .expect("author values");
    let ids: Vec<_> = author
        .values
        .iter()
        .filter_map(Value::as_topic)
        .map(|t| t.id().as_str())
        .collect();
    assert_eq!(ids, ["ada"]);

    let flags = session
        .flags(book.id().as_str(), Some("card"))
        .expect("flags should evaluate");
    assert!(!flags.read_only_type);
    assert_eq!(flags.fields.len(), 1);
    assert_eq!(flags.fields[0].field_id, "title");
}

#[test]
fn rule_handlers_from_the_schema_refuse_writes() {
    let (session, _) = session();
    let book = new_book(&session, "978-1");

    let err = session
        .add_field_values(
            book.id().as_str(),
            "tags",
            &[SubmittedValue::primitive("draft")],
            None,
        )
        .expect_err("tags are not addable");

    assert_eq!(
        err.kind,
        ErrorKind::Constraint(ConstraintErrorKind::NotAddable)
    );
    assert_eq!(err.origin, ErrorOrigin::Edit);
}

#[test]
fn uniqueness_is_checked_against_stored_topics() {
    let (session, _) = session();
    new_book(&session, "978-2");
    let marker = TopicId::new_marker("book");

    let taken = TopicSubmission::new("book")
        .with_field("isbn", vec![SubmittedValue::primitive("978-2")]);
    let free = TopicSubmission::new("book")
        .with_field("isbn", vec![SubmittedValue::primitive("978-3")]);

    assert!(!session.validate_unique(marker.as_str(), "isbn", &taken).expect("check"));
    assert!(session.validate_unique(marker.as_str(), "isbn", &free).expect("check"));
}

#[test]
fn read_only_config_locks_every_type() {
    let config = EngineConfig::from_toml_str("read_only = true").expect("config should parse");
    let (session, _) = open(SCHEMA, &config).expect("session should open");

    let flags = session.flags("ada", None).expect("flags should evaluate");

    assert!(flags.read_only_type);
    assert!(flags.fields.iter().all(|f| f.read_only));
}

#[test]
fn missing_topics_and_bad_rules_surface_as_public_kinds() {
    let (session, _) = session();
    let err = session.flags("ghost", None).expect_err("ghost has no rules");
    assert_eq!(err.kind, ErrorKind::NotFound);

    let broken = SCHEMA.replace("\"constant\"", "\"nonesuch\"");
    let err = open(&broken, &EngineConfig::default()).expect_err("unknown handler");
    assert_eq!(err.kind, ErrorKind::Config);
    assert_eq!(err.origin, ErrorOrigin::Rules);
}

#[test]
fn deleting_a_topic_removes_it() {
    let (session, graph) = session();
    let book = new_book(&session, "978-4");

    session
        .delete_topic(book.id().as_str())
        .expect("delete should succeed");

    assert_eq!(graph.len().expect("graph len"), 1);
}
