use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

///
/// TopicSubmission
///
/// A topic as posted back by the presentation layer: the fields of one
/// view with their submitted values. `topic_id` is absent for new topics.
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicSubmission {
    #[serde(default)]
    pub topic_id: Option<String>,

    pub type_id: String,

    #[serde(default)]
    pub view_id: Option<String>,

    #[serde(default)]
    pub fields: Vec<FieldSubmission>,
}

impl TopicSubmission {
    pub fn new(type_id: impl Into<String>) -> Self {
        Self {
            type_id: type_id.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_id(mut self, topic_id: impl Into<String>) -> Self {
        self.topic_id = Some(topic_id.into());
        self
    }

    #[must_use]
    pub fn with_view(mut self, view_id: impl Into<String>) -> Self {
        self.view_id = Some(view_id.into());
        self
    }

    #[must_use]
    pub fn with_field(mut self, field_id: impl Into<String>, values: Vec<SubmittedValue>) -> Self {
        self.fields.push(FieldSubmission {
            id: field_id.into(),
            values,
        });
        self
    }

    #[must_use]
    pub fn field(&self, field_id: &str) -> Option<&FieldSubmission> {
        self.fields.iter().find(|f| f.id == field_id)
    }

    /// Raw values of every submitted field by field id, as seen by the
    /// `:submitted.<fieldId>` variables.
    #[must_use]
    pub fn raw_values(&self) -> BTreeMap<String, Vec<Value>> {
        self.fields
            .iter()
            .map(|f| (f.id.clone(), f.raw_values()))
            .collect()
    }
}

///
/// FieldSubmission
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct FieldSubmission {
    pub id: String,

    #[serde(default)]
    pub values: Vec<SubmittedValue>,
}

impl FieldSubmission {
    pub fn new(id: impl Into<String>, values: Vec<SubmittedValue>) -> Self {
        Self {
            id: id.into(),
            values,
        }
    }

    /// The raw submitted values, as seen by the `:value` variable.
    #[must_use]
    pub fn raw_values(&self) -> Vec<Value> {
        self.values.iter().filter_map(SubmittedValue::raw).collect()
    }
}

///
/// SubmittedValue
///
/// One submitted value: a primitive, a reference to a topic by id (with an
/// optional type for inline references), or an embedded topic edited in
/// place.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SubmittedValue {
    Primitive(String),

    #[serde(rename_all = "camelCase")]
    Reference {
        id: String,

        #[serde(default)]
        type_id: Option<String>,
    },

    Embedded(TopicSubmission),
}

impl SubmittedValue {
    pub fn primitive(value: impl Into<String>) -> Self {
        Self::Primitive(value.into())
    }

    pub fn reference(id: impl Into<String>) -> Self {
        Self::Reference {
            id: id.into(),
            type_id: None,
        }
    }

    #[must_use]
    pub fn raw(&self) -> Option<Value> {
        match self {
            Self::Primitive(value) | Self::Reference { id: value, .. } => {
                Some(Value::Text(value.clone()))
            }
            Self::Embedded(topic) => topic.topic_id.clone().map(Value::Text),
        }
    }
}
