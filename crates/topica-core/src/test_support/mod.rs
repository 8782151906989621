//! Shared fixtures: a small people/companies schema and a seeded graph.

use crate::{
    engine::{Engine, EngineBuilder},
    graph::memory::MemoryGraph,
    model::{FieldFlags, FieldModel, Schema, TypeModel, ViewModel},
    value::{Topic, TopicId, Value},
};
use std::sync::Arc;

pub(crate) const LOG_COUNT: i64 = 250;

pub(crate) fn inline_flags() -> FieldFlags {
    FieldFlags {
        inline: true,
        ..FieldFlags::default()
    }
}

pub(crate) fn person_type() -> TypeModel {
    TypeModel::new("person", "info")
        .with_field(FieldModel::new("name"))
        .with_field(FieldModel::new("tags"))
        .with_field(FieldModel::reference("employer", &["company"]).with_cardinality(0, Some(1)))
        .with_field(FieldModel::reference("address", &["address"]).with_flags(inline_flags()))
        .with_view(ViewModel::new("compact", &["name"]))
}

pub(crate) fn company_type() -> TypeModel {
    TypeModel::new("company", "info")
        .with_field(FieldModel::new("name"))
        .with_field(FieldModel::reference("employees", &["person"]).with_value_view("compact"))
        .with_field(FieldModel::new("logs").with_flags(FieldFlags {
            pageable: true,
            ..FieldFlags::default()
        }))
}

pub(crate) fn address_type() -> TypeModel {
    TypeModel::new("address", "info")
        .inline()
        .with_field(FieldModel::new("street"))
        .with_field(FieldModel::new("city"))
        .with_field(FieldModel::reference("geo", &["geo"]).with_flags(inline_flags()))
}

pub(crate) fn geo_type() -> TypeModel {
    TypeModel::new("geo", "info")
        .inline()
        .with_field(FieldModel::new("lat"))
        .with_field(FieldModel::new("lng"))
}

pub(crate) fn schema_with(extra: impl IntoIterator<Item = TypeModel>) -> Arc<Schema> {
    let mut types = vec![person_type(), company_type(), address_type(), geo_type()];
    for ty in extra {
        types.retain(|t| t.id != ty.id);
        types.push(ty);
    }

    Arc::new(Schema::from_types(types).expect("fixture schema should validate"))
}

pub(crate) fn fixture_schema() -> Arc<Schema> {
    schema_with([])
}

pub(crate) fn address(id: &str, street: &str, city: &str) -> Topic {
    Topic::new_inline(id.into(), "address")
        .with_values("street", vec![Value::from(street)])
        .with_values("city", vec![Value::from(city)])
}

/// Seed `graph` with ada, brian, grace and acme.
///
/// ada works at acme and has an inline address; acme employs ada and brian
/// and carries [`LOG_COUNT`] log entries.
pub(crate) fn seed(graph: &MemoryGraph) {
    let acme_ref = Arc::new(Topic::new("acme".into(), "company"));
    let ada = graph
        .insert(
            Topic::new("ada".into(), "person")
                .with_name("Ada")
                .with_values("name", vec![Value::from("Ada")])
                .with_values("tags", vec![Value::from("math")])
                .with_values("employer", vec![Value::Topic(acme_ref)])
                .with_values(
                    "address",
                    vec![Value::from(address("home", "12 St James's Sq", "London"))],
                ),
        )
        .expect("seed ada");
    let brian = graph
        .insert(
            Topic::new("brian".into(), "person")
                .with_name("Brian")
                .with_values("name", vec![Value::from("Brian")]),
        )
        .expect("seed brian");
    graph
        .insert(Topic::new("grace".into(), "person").with_name("Grace"))
        .expect("seed grace");
    graph
        .insert(
            Topic::new("acme".into(), "company")
                .with_name("Acme")
                .with_values("name", vec![Value::from("Acme")])
                .with_values("employees", vec![Value::Topic(ada), Value::Topic(brian)])
                .with_values("logs", (0..LOG_COUNT).map(Value::Int).collect()),
        )
        .expect("seed acme");
}

pub(crate) fn graph_for(schema: &Arc<Schema>) -> Arc<MemoryGraph> {
    let graph = Arc::new(MemoryGraph::new(Arc::clone(schema)));
    seed(&graph);

    graph
}

pub(crate) fn fixture_graph() -> Arc<MemoryGraph> {
    graph_for(&fixture_schema())
}

/// Builder over a freshly seeded graph for `schema`; the graph doubles as
/// the query backend.
pub(crate) fn builder_for(schema: Arc<Schema>) -> (EngineBuilder, Arc<MemoryGraph>) {
    let graph = graph_for(&schema);
    let builder = Engine::builder(schema, Arc::clone(&graph) as _)
        .query_backend(Arc::clone(&graph) as _);

    (builder, graph)
}

pub(crate) fn fixture_engine() -> Arc<Engine> {
    builder_for(fixture_schema())
        .0
        .build()
        .expect("fixture engine should build")
}

pub(crate) fn id(raw: &str) -> TopicId {
    TopicId::from(raw)
}
