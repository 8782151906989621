use crate::{context::Context, model::FieldModel, value::Value};
use std::{collections::BTreeMap, sync::Arc};
use tracing::debug;

const PARENT_FIELD_PREFIX: &str = ":parent.";
const SUBMITTED_PREFIX: &str = ":submitted.";

///
/// VariableResolver
///
/// Capability handed to resolvers so configuration can reference ambient
/// values without knowing the caller's shape.
///

pub trait VariableResolver {
    fn values(&self, object: Option<&Value>, name: &str) -> Vec<Value>;
}

///
/// ContextVariableResolver
///
/// Variables available from a context:
/// `:id`, `:topic`, `:parent`, `:parent.<fieldId>`, and bare field ids read
/// from the object topic.
///

pub struct ContextVariableResolver<'a> {
    context: &'a Context,
}

impl<'a> ContextVariableResolver<'a> {
    #[must_use]
    pub const fn new(context: &'a Context) -> Self {
        Self { context }
    }

    fn parent_field_values(&self, field_id: &str) -> Vec<Value> {
        let Some(parent) = self.context.parent_context() else {
            return Vec::new();
        };
        let (Some(topic), Some(field)) = (parent.topic(), parent.field_by_id(field_id)) else {
            return Vec::new();
        };

        topic.values(field.actual_id()).to_vec()
    }

    fn object_field_values(&self, object: Option<&Value>, field_id: &str) -> Vec<Value> {
        let topic = match object {
            Some(value) => value.as_topic(),
            None => self.context.topic(),
        };
        let Some(topic) = topic else {
            return Vec::new();
        };

        let storage_id = self
            .context
            .engine()
            .schema()
            .type_by_id(topic.type_id())
            .and_then(|ty| ty.field_by_id(field_id))
            .map_or(field_id, FieldModel::actual_id);

        topic.values(storage_id).to_vec()
    }
}

impl VariableResolver for ContextVariableResolver<'_> {
    fn values(&self, object: Option<&Value>, name: &str) -> Vec<Value> {
        match name {
            ":id" => match object {
                Some(value) => value
                    .as_topic()
                    .map(|t| vec![Value::Text(t.id().to_string())])
                    .unwrap_or_default(),
                None => vec![Value::Text(self.context.topic_id().to_string())],
            },
            ":topic" => match object {
                Some(value) => vec![value.clone()],
                None => self.context.objects(),
            },
            ":parent" => self
                .context
                .parent_context()
                .and_then(Context::topic)
                .map(|t| vec![Value::Topic(Arc::clone(t))])
                .unwrap_or_default(),
            _ => {
                if let Some(field_id) = name.strip_prefix(PARENT_FIELD_PREFIX) {
                    self.parent_field_values(field_id)
                } else if name.starts_with(':') {
                    debug!(variable = name, "unknown context variable");
                    Vec::new()
                } else {
                    self.object_field_values(object, name)
                }
            }
        }
    }
}

///
/// SubmittedVariableResolver
///
/// Layers submitted form data over another resolver:
/// `:value` is the field's submitted values, `:value-if-new` the same but
/// only for new topics, and `:submitted.<fieldId>` any other submitted
/// field.
///

pub struct SubmittedVariableResolver<'a> {
    inner: &'a dyn VariableResolver,
    is_new_topic: bool,
    value: &'a [Value],
    submitted: &'a BTreeMap<String, Vec<Value>>,
}

impl<'a> SubmittedVariableResolver<'a> {
    #[must_use]
    pub const fn new(
        inner: &'a dyn VariableResolver,
        is_new_topic: bool,
        value: &'a [Value],
        submitted: &'a BTreeMap<String, Vec<Value>>,
    ) -> Self {
        Self {
            inner,
            is_new_topic,
            value,
            submitted,
        }
    }
}

impl VariableResolver for SubmittedVariableResolver<'_> {
    fn values(&self, object: Option<&Value>, name: &str) -> Vec<Value> {
        match name {
            ":value" => self.value.to_vec(),
            ":value-if-new" if self.is_new_topic => self.value.to_vec(),
            ":value-if-new" => Vec::new(),
            _ => match name.strip_prefix(SUBMITTED_PREFIX) {
                Some(field_id) => self.submitted.get(field_id).cloned().unwrap_or_default(),
                None => self.inner.values(object, name),
            },
        }
    }
}
