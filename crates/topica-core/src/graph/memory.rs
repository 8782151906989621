//! In-memory graph backend.
//!
//! Reference [`GraphAccessor`] used by tests and embedded hosts. Reference
//! values are re-read by id on access, so a stored snapshot of a referenced
//! topic never goes stale, and references to deleted topics disappear.

use crate::{
    error::InternalError,
    graph::{Change, ChangeKind, GraphAccessor, GraphError},
    model::{FieldModel, Schema},
    resolve::{QueryBackend, QueryRequest},
    value::{Topic, TopicId, Value, ValueKey},
};
use serde_json::Value as JsonValue;
use std::{
    cmp::Ordering,
    collections::{BTreeMap, HashSet},
    sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard},
};
use tracing::{debug, warn};

type TopicMap = BTreeMap<TopicId, Arc<Topic>>;

///
/// MemoryGraph
///

#[derive(Debug)]
pub struct MemoryGraph {
    schema: Arc<Schema>,
    topics: RwLock<TopicMap>,
}

impl MemoryGraph {
    #[must_use]
    pub fn new(schema: Arc<Schema>) -> Self {
        Self {
            schema,
            topics: RwLock::new(BTreeMap::new()),
        }
    }

    /// Seed a top-level topic, replacing any topic with the same id.
    pub fn insert(&self, topic: Topic) -> Result<Arc<Topic>, InternalError> {
        if topic.is_inline() {
            return Err(GraphError::InlineTopic(topic.id().to_string()).into());
        }
        let topic = Arc::new(topic);
        self.write()?.insert(topic.id().clone(), Arc::clone(&topic));

        Ok(topic)
    }

    pub fn len(&self) -> Result<usize, InternalError> {
        Ok(self.read()?.len())
    }

    pub fn is_empty(&self) -> Result<bool, InternalError> {
        Ok(self.read()?.is_empty())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, TopicMap>, InternalError> {
        self.topics.read().map_err(|_| GraphError::Poisoned.into())
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, TopicMap>, InternalError> {
        self.topics.write().map_err(|_| GraphError::Poisoned.into())
    }

    // Re-read a persisted reference; inline topics and scalars pass through.
    fn refresh(topics: &TopicMap, value: &Value) -> Option<Value> {
        match value {
            Value::Topic(topic) if !topic.is_inline() => {
                topics.get(topic.id()).cloned().map(Value::Topic)
            }
            other => Some(other.clone()),
        }
    }

    fn storage_id<'a>(&'a self, type_id: &str, field_id: &'a str) -> &'a str {
        self.schema
            .type_by_id(type_id)
            .and_then(|ty| ty.field_by_id(field_id))
            .map_or(field_id, FieldModel::actual_id)
    }

    fn validate(topics: &TopicMap, changes: &[Change]) -> Result<(), InternalError> {
        for change in changes {
            let id = change.topic.id();
            if change.topic.is_inline() {
                return Err(GraphError::InlineTopic(id.to_string()).into());
            }
            match change.kind {
                ChangeKind::Create if topics.contains_key(id) => {
                    return Err(GraphError::DuplicateTopic(id.to_string()).into());
                }
                ChangeKind::Update | ChangeKind::Delete if !topics.contains_key(id) => {
                    return Err(GraphError::TopicNotFound(id.to_string()).into());
                }
                _ => {}
            }
        }

        Ok(())
    }
}

impl GraphAccessor for MemoryGraph {
    fn topic_by_id(&self, id: &TopicId) -> Result<Option<Arc<Topic>>, InternalError> {
        Ok(self.read()?.get(id).cloned())
    }

    fn values(&self, topic: &Topic, field: &FieldModel) -> Result<Vec<Value>, InternalError> {
        let topics = self.read()?;

        Ok(topic
            .values(field.actual_id())
            .iter()
            .filter_map(|value| Self::refresh(&topics, value))
            .collect())
    }

    fn available_field_values(
        &self,
        _topic: Option<&Topic>,
        field: &FieldModel,
        query: Option<&str>,
    ) -> Result<Vec<Arc<Topic>>, InternalError> {
        if !field.flags.addable || field.value_types().is_empty() {
            return Ok(Vec::new());
        }
        let needle = query.map(str::to_lowercase);
        let topics = self.read()?;

        let mut result: Vec<Arc<Topic>> = topics
            .values()
            .filter(|t| field.value_types().iter().any(|vt| vt == t.type_id()))
            .filter(|t| {
                needle.as_deref().is_none_or(|n| {
                    t.name().is_some_and(|name| name.to_lowercase().contains(n))
                })
            })
            .cloned()
            .collect();
        result.sort_by(|a, b| match (a.name(), b.name()) {
            (Some(x), Some(y)) => x.cmp(y),
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        });

        Ok(result)
    }

    fn commit(&self, changes: Vec<Change>) -> Result<Vec<Arc<Topic>>, InternalError> {
        let mut topics = self.write()?;
        Self::validate(&topics, &changes)?;

        let mut stored = Vec::with_capacity(changes.len());
        for change in changes {
            let id = change.topic.id().clone();
            let topic = Arc::new(change.topic);
            match change.kind {
                ChangeKind::Create | ChangeKind::Update => {
                    topics.insert(id, Arc::clone(&topic));
                }
                ChangeKind::Delete => {
                    topics.remove(&id);
                }
            }
            stored.push(topic);
        }
        debug!(changes = stored.len(), "memory graph commit applied");

        Ok(stored)
    }
}

///
/// Query backend
///
/// Config shape: `{"type": "query", "topicType": <typeId>, "field": <fieldId>,
/// "key": <string | [string]>}`. Keys starting with `:` are variables;
/// matching topics have any key among their `field` values.
///

impl QueryBackend for MemoryGraph {
    fn query(&self, request: &QueryRequest<'_>) -> Result<Vec<Value>, InternalError> {
        let config = request.config;
        let (Some(topic_type), Some(field_id)) = (
            config.get("topicType").and_then(JsonValue::as_str),
            config.get("field").and_then(JsonValue::as_str),
        ) else {
            warn!(config = %config, "query resolve item needs 'topicType' and 'field'");
            return Ok(Vec::new());
        };

        let key_nodes: Vec<&str> = match config.get("key") {
            Some(JsonValue::String(key)) => vec![key.as_str()],
            Some(JsonValue::Array(keys)) => keys.iter().filter_map(JsonValue::as_str).collect(),
            _ => {
                warn!(config = %config, "query resolve item has no 'key'");
                return Ok(Vec::new());
            }
        };

        let mut keys = HashSet::new();
        let objects: Vec<Option<&Value>> = if request.objects.is_empty() {
            vec![None]
        } else {
            request.objects.iter().map(Some).collect()
        };
        for object in objects {
            for key in &key_nodes {
                if key.starts_with(':') {
                    keys.extend(request.variables.values(object, key).iter().map(Value::key));
                } else {
                    keys.insert(ValueKey::Text((*key).to_string()));
                }
            }
        }
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let storage_id = self.storage_id(topic_type, field_id);
        let topics = self.read()?;

        Ok(topics
            .values()
            .filter(|t| t.type_id() == topic_type)
            .filter(|t| t.values(storage_id).iter().any(|v| keys.contains(&v.key())))
            .map(|t| Value::Topic(Arc::clone(t)))
            .collect())
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        graph::ChangeSet,
        test_support::{fixture_graph, fixture_schema},
    };

    #[test]
    fn references_are_reread_on_access() {
        let graph = fixture_graph();
        let schema = fixture_schema();
        let company = schema.try_type("company").expect("company type");
        let employees = company.field_by_id("employees").expect("employees field");

        let acme = graph
            .topic_by_id(&"acme".into())
            .expect("read should succeed")
            .expect("acme should exist");
        graph
            .insert(Topic::new("ada".into(), "person").with_name("Ada Lovelace"))
            .expect("reseed should succeed");

        let values = graph.values(&acme, employees).expect("values should read");
        let ada = values
            .iter()
            .filter_map(Value::as_topic)
            .find(|t| t.id().as_str() == "ada")
            .expect("ada should still be referenced");

        assert_eq!(ada.name(), Some("Ada Lovelace"));
    }

    #[test]
    fn failed_batch_leaves_graph_untouched() {
        let graph = fixture_graph();
        let schema = fixture_schema();
        let person = schema.try_type("person").expect("person type");
        let name = person.field_by_id("name").expect("name field");

        let ada = graph
            .topic_by_id(&"ada".into())
            .expect("read should succeed")
            .expect("ada should exist");
        let ghost = Topic::new("ghost".into(), "person");

        let graph: Arc<dyn GraphAccessor> = graph;
        let mut changes = ChangeSet::new(Arc::clone(&graph));
        let ok = changes.update_topic(&ada, person).expect("update should queue");
        changes
            .set_values(ok, name, vec![Value::from("Changed")])
            .expect("set should queue");
        changes
            .update_topic(&ghost, person)
            .expect("update should queue");

        let err = changes.save().expect_err("missing topic should fail the batch");
        assert!(err.is_not_found());

        let ada = graph
            .topic_by_id(&"ada".into())
            .expect("read should succeed")
            .expect("ada should exist");
        assert_eq!(ada.values("name"), [Value::from("Ada")]);
        assert_eq!(
            graph.topics_by_ids(&["ada".into(), "ghost".into()]).expect("read").len(),
            1
        );
    }

    #[test]
    fn available_values_are_sorted_by_name() {
        let graph = fixture_graph();
        let schema = fixture_schema();
        let company = schema.try_type("company").expect("company type");
        let employees = company.field_by_id("employees").expect("employees field");

        let names: Vec<_> = graph
            .available_field_values(None, employees, None)
            .expect("available values should read")
            .iter()
            .map(|t| t.name().unwrap_or_default().to_string())
            .collect();

        assert_eq!(names, ["Ada", "Brian", "Grace"]);

        let filtered = graph
            .available_field_values(None, employees, Some("gr"))
            .expect("available values should read");
        assert_eq!(filtered.len(), 1);
    }
}
