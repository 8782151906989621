use crate::{NEW_TOPIC_ID_PREFIX, value::Value};
use derive_more::{Display, From};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use ulid::Ulid;

///
/// TopicId
///
/// Stable external id of a persisted topic, the new-topic marker
/// (`_<typeId>`), or the field-scoped id of an inline topic.
///

#[derive(
    Clone, Debug, Deserialize, Display, Eq, From, Hash, Ord, PartialEq, PartialOrd, Serialize,
)]
#[serde(transparent)]
pub struct TopicId(String);

impl TopicId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Build the new-topic marker for a type.
    #[must_use]
    pub fn new_marker(type_id: &str) -> Self {
        Self(format!("{NEW_TOPIC_ID_PREFIX}{type_id}"))
    }

    /// Mint a fresh id for a created or inline topic.
    #[must_use]
    pub fn generate() -> Self {
        Self(Ulid::new().to_string().to_lowercase())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True if this id is a new-topic marker.
    #[must_use]
    pub fn is_new(&self) -> bool {
        self.0.starts_with(NEW_TOPIC_ID_PREFIX)
    }

    /// Type id encoded in a new-topic marker.
    #[must_use]
    pub fn new_type_id(&self) -> Option<&str> {
        self.0.strip_prefix(NEW_TOPIC_ID_PREFIX)
    }
}

impl From<&str> for TopicId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

///
/// Topic
///
/// An instance of a schema type. Field values are keyed by the field's
/// actual (storage) id.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Topic {
    id: TopicId,
    type_id: String,
    name: Option<String>,
    inline: bool,
    fields: BTreeMap<String, Vec<Value>>,
}

impl Topic {
    /// Create a persisted (top-level) topic with no field values.
    pub fn new(id: TopicId, type_id: impl Into<String>) -> Self {
        Self {
            id,
            type_id: type_id.into(),
            name: None,
            inline: false,
            fields: BTreeMap::new(),
        }
    }

    /// Create an inline topic; it only exists inside an owner's field.
    pub fn new_inline(id: TopicId, type_id: impl Into<String>) -> Self {
        Self {
            inline: true,
            ..Self::new(id, type_id)
        }
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_values(mut self, field_id: impl Into<String>, values: Vec<Value>) -> Self {
        self.fields.insert(field_id.into(), values);
        self
    }

    #[must_use]
    pub(crate) fn with_id(mut self, id: TopicId) -> Self {
        self.id = id;
        self
    }

    #[must_use]
    pub const fn id(&self) -> &TopicId {
        &self.id
    }

    #[must_use]
    pub fn type_id(&self) -> &str {
        &self.type_id
    }

    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    #[must_use]
    pub const fn is_inline(&self) -> bool {
        self.inline
    }

    /// True if the field is present, even with an empty value list.
    #[must_use]
    pub fn has_value(&self, field_id: &str) -> bool {
        self.fields.contains_key(field_id)
    }

    /// Stored values of a field; empty when the field is absent.
    #[must_use]
    pub fn values(&self, field_id: &str) -> &[Value] {
        self.fields.get(field_id).map_or(&[], Vec::as_slice)
    }

    pub fn set_values(&mut self, field_id: impl Into<String>, values: Vec<Value>) {
        self.fields.insert(field_id.into(), values);
    }

    pub fn remove_field(&mut self, field_id: &str) -> Option<Vec<Value>> {
        self.fields.remove(field_id)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &[Value])> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }
}

///
/// TESTS
///
