use super::*;
use crate::{
    context::Context,
    engine::Engine,
    error::{ConstraintError, ErrorClass},
    graph::{GraphAccessor, memory::MemoryGraph},
    model::{FieldModel, TypeModel},
    obs::CountingSink,
    rules::RuleEngine,
    test_support::{builder_for, fixture_schema, id, person_type, schema_with},
    value::{Topic, Value},
};
use serde_json::json;
use std::sync::Arc;

struct Fixture {
    session: EditSession,
    graph: Arc<MemoryGraph>,
    sink: Arc<CountingSink>,
}

impl Fixture {
    fn new() -> Self {
        Self::with_types(Vec::new())
    }

    fn with_types(types: Vec<TypeModel>) -> Self {
        let sink = Arc::new(CountingSink::new());
        let (builder, graph) = builder_for(schema_with(types));
        let engine = builder
            .sink(Arc::clone(&sink) as _)
            .build()
            .expect("engine should build");

        Self {
            session: EditSession::new(engine),
            graph,
            sink,
        }
    }

    fn engine(&self) -> &Arc<Engine> {
        self.session.engine()
    }

    fn rules(&self, topic_id: &str) -> RuleEngine {
        self.session
            .rules(&id(topic_id), None)
            .expect("rules should build")
    }

    fn field(rules: &RuleEngine, field_id: &str) -> FieldModel {
        rules
            .ty()
            .field_by_id(field_id)
            .expect("field should exist")
            .clone()
    }

    fn topic(&self, topic_id: &str) -> Arc<Topic> {
        self.engine()
            .graph()
            .topic_by_id(&id(topic_id))
            .expect("read should succeed")
            .expect("topic should exist")
    }
}

fn with_rules(ty: TypeModel, rules: serde_json::Value) -> TypeModel {
    ty.with_extra(json!({ "contextRules": rules }))
}

fn text(values: &[Value]) -> Vec<&str> {
    values.iter().filter_map(Value::as_text).collect()
}

#[test]
fn adding_present_values_is_a_no_op() {
    let fx = Fixture::new();
    let rules = fx.rules("ada");
    let tags = Fixture::field(&rules, "tags");
    let submitted = [SubmittedValue::primitive("art"), SubmittedValue::primitive("math")];

    let context = fx
        .session
        .add_field_values(&rules, &tags, &submitted, None)
        .expect("add should succeed");
    let rules = RuleEngine::new(context).expect("rules");
    fx.session
        .add_field_values(&rules, &tags, &submitted, None)
        .expect("second add should succeed");

    assert_eq!(text(fx.topic("ada").values("tags")), ["math", "art"]);
    assert_eq!(fx.sink.report().change_sets_saved, 2);
}

#[test]
fn add_at_index_inserts_in_place() {
    let fx = Fixture::new();
    let rules = fx.rules("ada");
    let tags = Fixture::field(&rules, "tags");

    fx.session
        .add_field_values(&rules, &tags, &[SubmittedValue::primitive("logic")], Some(0))
        .expect("add should succeed");

    assert_eq!(text(fx.topic("ada").values("tags")), ["logic", "math"]);
}

#[test]
fn non_addable_values_are_rejected() {
    let person = with_rules(
        person_type(),
        json!({ "class": "constant", "value": false, "flags": ["addableFieldValue"] }),
    );
    let fx = Fixture::with_types(vec![person]);
    let rules = fx.rules("ada");
    let tags = Fixture::field(&rules, "tags");

    let err = fx
        .session
        .add_field_values(&rules, &tags, &[SubmittedValue::primitive("art")], None)
        .expect_err("add should be rejected");

    assert_eq!(err.class, ErrorClass::Constraint);
    assert!(matches!(
        err.constraint(),
        Some(ConstraintError::NotAddable { field, value }) if field == "tags" && value == "art"
    ));
    assert_eq!(text(fx.topic("ada").values("tags")), ["math"], "nothing stored");
    assert_eq!(fx.sink.report().constraints_rejected, 1);
}

#[test]
fn removing_values_checks_removability() {
    let fx = Fixture::new();
    let rules = fx.rules("ada");
    let tags = Fixture::field(&rules, "tags");

    fx.session
        .remove_field_values(&rules, &tags, &[SubmittedValue::primitive("math")])
        .expect("remove should succeed");
    assert!(fx.topic("ada").values("tags").is_empty());

    let person = with_rules(
        person_type(),
        json!({ "class": "constant", "value": false, "flags": ["removableFieldValue"] }),
    );
    let fx = Fixture::with_types(vec![person]);
    let rules = fx.rules("ada");
    let err = fx
        .session
        .remove_field_values(&rules, &tags, &[SubmittedValue::primitive("math")])
        .expect_err("remove should be rejected");

    assert!(matches!(
        err.constraint(),
        Some(ConstraintError::NotRemovable { .. })
    ));
}

#[test]
fn reference_values_must_match_value_types() {
    let fx = Fixture::new();
    let rules = fx.rules("acme");
    let employees = Fixture::field(&rules, "employees");

    let err = fx
        .session
        .add_field_values(&rules, &employees, &[SubmittedValue::reference("acme")], None)
        .expect_err("a company is not a person");

    assert!(matches!(
        err.constraint(),
        Some(ConstraintError::InvalidValueType { value_type, .. }) if value_type == "company"
    ));
}

#[test]
fn references_are_added_by_id() {
    let fx = Fixture::new();
    let rules = fx.rules("acme");
    let employees = Fixture::field(&rules, "employees");

    fx.session
        .add_field_values(
            &rules,
            &employees,
            &[SubmittedValue::reference("grace"), SubmittedValue::reference("ghost")],
            None,
        )
        .expect("add should succeed");

    let ids: Vec<_> = fx
        .topic("acme")
        .values("employees")
        .iter()
        .filter_map(Value::as_topic)
        .map(|t| t.id().to_string())
        .collect();
    assert_eq!(ids, ["ada", "brian", "grace"], "unknown ids are skipped");
}

#[test]
fn embedded_references_are_saved_with_the_owner() {
    let fx = Fixture::new();
    let rules = fx.rules("acme");
    let employees = Fixture::field(&rules, "employees");
    let embedded = TopicSubmission::new("person")
        .with_field("name", vec![SubmittedValue::primitive("Zed")]);

    fx.session
        .add_field_values(&rules, &employees, &[SubmittedValue::Embedded(embedded)], None)
        .expect("add should succeed");

    let acme = fx.topic("acme");
    let zed = acme
        .values("employees")
        .iter()
        .filter_map(Value::as_topic)
        .find(|t| t.values("name") == [Value::from("Zed")])
        .expect("zed should be employed");
    assert!(fx.graph.topic_by_id(zed.id()).expect("read").is_some());
    assert_eq!(fx.sink.report().change_sets_saved, 1);
}

#[test]
fn failed_updates_leave_embedded_topics_unsaved() {
    let fx = Fixture::new();
    let rules = fx.rules("acme");
    let orphan = || {
        SubmittedValue::Embedded(
            TopicSubmission::new("person")
                .with_field("name", vec![SubmittedValue::primitive("Orphan")]),
        )
    };

    let unknown_field = TopicSubmission::new("company")
        .with_id("acme")
        .with_field("employees", vec![orphan()])
        .with_field("nope", vec![SubmittedValue::primitive("x")]);
    let mut changes = fx.engine().change_set();
    fx.session
        .update_topic(&rules, &unknown_field, &mut changes)
        .expect_err("unknown field");

    let wrong_type = TopicSubmission::new("company")
        .with_id("acme")
        .with_field("employees", vec![orphan(), SubmittedValue::reference("acme")]);
    let mut changes = fx.engine().change_set();
    let err = fx
        .session
        .update_topic(&rules, &wrong_type, &mut changes)
        .expect_err("a company is not a person");
    assert!(matches!(
        err.constraint(),
        Some(ConstraintError::InvalidValueType { .. })
    ));

    assert_eq!(fx.graph.len().expect("len"), 4, "no orphan was stored");
    assert_eq!(fx.sink.report().change_sets_saved, 0);
}

#[test]
fn new_topics_are_created_on_update() {
    let fx = Fixture::new();
    let rules = fx.rules("_person");
    let submission = TopicSubmission::new("person")
        .with_field("name", vec![SubmittedValue::primitive("Zoe")])
        .with_field("employer", vec![SubmittedValue::reference("acme")]);

    let context = fx
        .session
        .update_topic_view(&rules, &submission)
        .expect("update should succeed");

    assert!(!context.is_new_topic());
    let zoe = context.topic().expect("stored topic");
    assert_eq!(zoe.values("name"), [Value::from("Zoe")]);
    assert_eq!(fx.graph.len().expect("len"), 5);
}

#[test]
fn read_only_fields_are_left_alone() {
    let person = with_rules(
        person_type(),
        json!({
            "class": "constant",
            "value": true,
            "flags": ["readOnlyField"],
            "appliesTo": ["name"]
        }),
    );
    let fx = Fixture::with_types(vec![person]);
    let rules = fx.rules("ada");
    let submission = TopicSubmission::new("person")
        .with_id("ada")
        .with_field("name", vec![SubmittedValue::primitive("Someone")])
        .with_field("tags", vec![SubmittedValue::primitive("poetry")]);

    let mut changes = fx.engine().change_set();
    fx.session
        .update_topic(&rules, &submission, &mut changes)
        .expect("update should succeed");

    let ada = fx.topic("ada");
    assert_eq!(ada.values("name"), [Value::from("Ada")]);
    assert_eq!(text(ada.values("tags")), ["poetry"]);
}

#[test]
fn inline_types_cannot_be_updated_field_by_field() {
    let fx = Fixture::new();
    let ada_rules = fx.rules("ada");
    let address = Fixture::field(&ada_rules, "address");
    let home = Arc::clone(fx.topic("ada").values("address")[0].as_topic().expect("home"));

    let sub = ada_rules
        .context()
        .sub_context_for_topic(&address, home)
        .expect("sub-context should build");
    let rules = RuleEngine::new(sub).expect("rules");

    let err = fx
        .session
        .update_field_values(
            &rules,
            &FieldSubmission::new("city", vec![SubmittedValue::primitive("Paris")]),
        )
        .expect_err("inline update should fail");
    assert_eq!(err.class, ErrorClass::Usage);
}

#[test]
fn inline_edits_propagate_to_the_owner() {
    let fx = Fixture::new();
    let ada_rules = fx.rules("ada");
    let address = Fixture::field(&ada_rules, "address");
    let home = Arc::clone(fx.topic("ada").values("address")[0].as_topic().expect("home"));
    let sub = ada_rules
        .context()
        .sub_context_for_topic(&address, home)
        .expect("sub-context should build");
    let rules = RuleEngine::new(sub).expect("rules");

    let submission = TopicSubmission::new("address")
        .with_id("home")
        .with_field("city", vec![SubmittedValue::primitive("Paris")]);
    let context = fx
        .session
        .update_topic_view(&rules, &submission)
        .expect("update should succeed");

    let stored = fx.topic("ada");
    let home = stored.values("address")[0].as_topic().expect("home");
    assert_eq!(text(home.values("city")), ["Paris"]);
    assert_eq!(text(home.values("street")), ["12 St James's Sq"], "merged with stored copy");

    let returned = context.topic().expect("topic");
    assert_eq!(returned.as_ref(), home.as_ref());
    let parent = context.parent_context().expect("parent");
    assert_eq!(parent.topic().map(|t| t.as_ref()), Some(stored.as_ref()));
    assert_eq!(fx.sink.report().change_sets_saved, 1, "one save at the owner");
}

#[test]
fn nested_inline_edits_save_once_at_the_root() {
    let fx = Fixture::new();
    let ada_rules = fx.rules("ada");
    let address = Fixture::field(&ada_rules, "address");
    let home = Arc::clone(fx.topic("ada").values("address")[0].as_topic().expect("home"));
    let home_ctx = ada_rules
        .context()
        .sub_context_for_topic(&address, home)
        .expect("sub-context should build");
    let home_rules = RuleEngine::new(home_ctx).expect("rules");
    let geo = Fixture::field(&home_rules, "geo");

    let point = TopicSubmission::new("geo")
        .with_field("lat", vec![SubmittedValue::primitive("51")]);
    fx.session
        .add_field_values(&home_rules, &geo, &[SubmittedValue::Embedded(point)], None)
        .expect("add should succeed");

    let stored = fx.topic("ada");
    let home = stored.values("address")[0].as_topic().expect("home");
    let geos = home.values("geo");
    assert_eq!(geos.len(), 1);
    assert_eq!(
        text(geos[0].as_topic().expect("geo").values("lat")),
        ["51"]
    );
    assert_eq!(text(home.values("city")), ["London"]);
    assert_eq!(fx.sink.report().change_sets_saved, 1);
}

#[test]
fn new_inline_values_are_appended() {
    let fx = Fixture::new();
    let rules = fx.rules("ada");
    let address = Fixture::field(&rules, "address");
    let work = TopicSubmission::new("address")
        .with_field("street", vec![SubmittedValue::primitive("Works Rd")]);

    fx.session
        .add_field_values(&rules, &address, &[SubmittedValue::Embedded(work)], None)
        .expect("add should succeed");

    let stored = fx.topic("ada");
    let addresses = stored.values("address");
    assert_eq!(addresses.len(), 2);
    assert_eq!(addresses[0].as_topic().map(|t| t.id().as_str()), Some("home"));
}

#[test]
fn non_inline_types_are_rejected_for_inline_fields() {
    let fx = Fixture::new();
    let rules = fx.rules("ada");
    let address = Fixture::field(&rules, "address");

    let err = fx
        .session
        .add_field_values(
            &rules,
            &address,
            &[SubmittedValue::Embedded(TopicSubmission::new("person"))],
            None,
        )
        .expect_err("person is not inline");

    assert!(matches!(
        err.constraint(),
        Some(ConstraintError::NotInlineType { type_id }) if type_id == "person"
    ));
}

#[test]
fn unknown_inline_ids_are_not_found() {
    let fx = Fixture::new();
    let ada = fx.topic("ada");
    let address = fixture_schema()
        .try_type("person")
        .expect("person")
        .field_by_id("address")
        .expect("address")
        .clone();

    let err = EditSession::find_inline_topic_by_id(&ada, &address, "nowhere")
        .expect_err("no such inline topic");
    assert!(err.is_not_found());
}

#[test]
fn deleting_a_topic_drops_references_to_it() {
    let fx = Fixture::new();
    let rules = fx.rules("brian");

    fx.session.delete_topic(&rules).expect("delete should succeed");

    assert!(fx.graph.topic_by_id(&id("brian")).expect("read").is_none());
    let acme = fx.topic("acme");
    let rules = fx.rules("acme");
    let employees = Fixture::field(&rules, "employees");
    let values = fx
        .engine()
        .graph()
        .values(&acme, &employees)
        .expect("values should read");
    assert_eq!(values.len(), 1);
}

#[test]
fn writes_need_a_stored_topic() {
    let fx = Fixture::new();
    let rules = fx.rules("_person");
    let tags = Fixture::field(&rules, "tags");

    let err = fx
        .session
        .add_field_values(&rules, &tags, &[SubmittedValue::primitive("x")], None)
        .expect_err("new topics have nothing to add to");
    assert_eq!(err.class, ErrorClass::Usage);
}

#[test]
fn uniqueness_is_checked_through_a_resolve_block() {
    let mut person = person_type();
    for field in &mut person.fields {
        if field.id == "name" {
            field.extra = Some(json!({
                "unique": {
                    "resolve": {
                        "type": "query",
                        "topicType": "person",
                        "field": "name",
                        "key": ":value"
                    }
                }
            }));
        }
    }
    let fx = Fixture::with_types(vec![person]);
    let rules = fx.rules("_person");
    let name = Fixture::field(&rules, "name");
    let tags = Fixture::field(&rules, "tags");
    let context: &Context = rules.context();

    let taken = TopicSubmission::new("person")
        .with_field("name", vec![SubmittedValue::primitive("Ada")]);
    let free = TopicSubmission::new("person")
        .with_field("name", vec![SubmittedValue::primitive("Zoe")]);

    assert!(!fx.session.validate_unique(context, &name, &taken).expect("check"));
    assert!(fx.session.validate_unique(context, &name, &free).expect("check"));
    assert!(fx.session.validate_unique(context, &tags, &taken).expect("no config"));
}

#[test]
fn uniqueness_checks_see_the_other_submitted_fields() {
    let mut person = person_type();
    for field in &mut person.fields {
        if field.id == "tags" {
            field.extra = Some(json!({
                "unique": {
                    "resolve": {
                        "type": "query",
                        "topicType": "person",
                        "field": "name",
                        "key": ":submitted.name"
                    }
                }
            }));
        }
    }
    let fx = Fixture::with_types(vec![person]);
    let rules = fx.rules("_person");
    let tags = Fixture::field(&rules, "tags");
    let submission = |name: &str| {
        TopicSubmission::new("person")
            .with_field("name", vec![SubmittedValue::primitive(name)])
            .with_field("tags", vec![SubmittedValue::primitive("art")])
    };

    let context = rules.context();
    assert!(!fx.session.validate_unique(context, &tags, &submission("Ada")).expect("check"));
    assert!(fx.session.validate_unique(context, &tags, &submission("Zoe")).expect("check"));
}

#[test]
fn submissions_deserialize_from_json() {
    let submission: TopicSubmission = serde_json::from_value(json!({
        "topicId": "ada",
        "typeId": "person",
        "fields": [
            { "id": "name", "values": [{ "primitive": "Ada" }] },
            { "id": "employer", "values": [{ "reference": { "id": "acme" } }] },
            {
                "id": "address",
                "values": [{ "embedded": { "typeId": "address", "fields": [] } }]
            }
        ]
    }))
    .expect("submission should deserialize");

    assert_eq!(submission.topic_id.as_deref(), Some("ada"));
    assert_eq!(submission.fields.len(), 3);
    assert_eq!(
        submission.fields[1].values[0],
        SubmittedValue::reference("acme")
    );
    assert_eq!(submission.fields[0].raw_values(), [Value::from("Ada")]);
    assert_eq!(
        submission.raw_values().get("employer"),
        Some(&vec![Value::from("acme")])
    );
}
