//! Built-in rule handlers.

use crate::{
    context::Context,
    error::InternalError,
    rules::{FlagQuery, RuleEngine, RuleHandler},
    resolve::{
        ContextVariableResolver, ResolveConfig, ResolveRequest, Resolver, SubmittedVariableResolver,
    },
    value::Value,
};
use serde_json::Value as JsonValue;
use std::{collections::BTreeMap, sync::Arc};
use tracing::warn;

pub(crate) const CONSTANT: &str = "constant";
pub(crate) const HAS_FIELD_VALUES: &str = "hasFieldValues";
pub(crate) const IF_RESOLVES: &str = "ifResolves";

fn negate(config: &JsonValue) -> bool {
    config
        .get("negate")
        .and_then(JsonValue::as_bool)
        .unwrap_or(false)
}

///
/// ConstantHandler
///
/// Fixed answer; combine with `flags` / `appliesTo` to pin selected flags.
///

#[derive(Clone, Copy, Debug)]
pub struct ConstantHandler {
    value: bool,
}

impl RuleHandler for ConstantHandler {
    fn evaluate(&self, _: &FlagQuery<'_>, _: &RuleEngine) -> Option<bool> {
        Some(self.value)
    }
}

pub(crate) fn constant(config: &JsonValue) -> Result<Arc<dyn RuleHandler>, String> {
    let value = config
        .get("value")
        .and_then(JsonValue::as_bool)
        .ok_or("'value' must be a boolean")?;

    Ok(Arc::new(ConstantHandler { value }))
}

///
/// HasFieldValuesHandler
///
/// True when the targeted topic has values in any of the listed fields
/// (or any field at all when none are listed). New topics never do.
///
/// The target is the queried field value when the question is about a
/// reference value, the topics behind `field` when one is configured, and
/// otherwise the context topic itself. Referenced topics are entered
/// through the field's value view.
///

#[derive(Clone, Debug)]
pub struct HasFieldValuesHandler {
    field: Option<String>,
    fields: Vec<String>,
    negate: bool,
}

impl HasFieldValuesHandler {
    fn targets(
        &self,
        query: &FlagQuery<'_>,
        context: &Context,
    ) -> Result<Vec<Context>, InternalError> {
        if let FlagQuery::FieldValue(_, field, value) = query {
            return match value {
                Value::Topic(topic) => Ok(vec![
                    context.sub_context_for_value_view(field, Arc::clone(topic))?,
                ]),
                _ => Ok(Vec::new()),
            };
        }

        let Some(field_id) = &self.field else {
            return Ok(vec![context.clone()]);
        };
        let field = context.try_field(field_id)?;
        let Some(topic) = context.topic() else {
            return Ok(Vec::new());
        };

        context
            .engine()
            .graph()
            .values(topic, field)?
            .iter()
            .filter_map(Value::as_topic)
            .map(|t| context.sub_context_for_value_view(field, Arc::clone(t)))
            .collect()
    }

    fn has_values(&self, context: &Context) -> Result<bool, InternalError> {
        let (Some(topic), Some(ty)) = (context.topic(), context.ty()) else {
            return Ok(false);
        };
        let graph = context.engine().graph();

        if self.fields.is_empty() {
            for field in &ty.fields {
                if !graph.values(topic, field)?.is_empty() {
                    return Ok(true);
                }
            }
            return Ok(false);
        }

        for field_id in &self.fields {
            let Some(field) = ty.field_by_id(field_id) else {
                warn!(type_id = %ty.id, field = %field_id, "hasFieldValues names unknown field");
                continue;
            };
            if !graph.values(topic, field)?.is_empty() {
                return Ok(true);
            }
        }

        Ok(false)
    }

    fn found(&self, query: &FlagQuery<'_>, context: &Context) -> Result<bool, InternalError> {
        for target in self.targets(query, context)? {
            if self.has_values(&target)? {
                return Ok(true);
            }
        }

        Ok(false)
    }
}

impl RuleHandler for HasFieldValuesHandler {
    fn evaluate(&self, query: &FlagQuery<'_>, rules: &RuleEngine) -> Option<bool> {
        let context = rules.context();
        if context.is_new_topic() {
            return Some(self.negate);
        }

        match self.found(query, context) {
            Ok(found) => Some(found != self.negate),
            Err(err) => {
                warn!(flag = query.key(), error = %err, "hasFieldValues gave no answer");
                None
            }
        }
    }
}

pub(crate) fn has_field_values(config: &JsonValue) -> Result<Arc<dyn RuleHandler>, String> {
    let field = match config.get("field") {
        None => None,
        Some(node) => Some(node.as_str().ok_or("'field' must be a string")?.to_string()),
    };
    let fields = match config.get("fields") {
        None => Vec::new(),
        Some(node) => node
            .as_array()
            .and_then(|items| {
                items
                    .iter()
                    .map(|item| item.as_str().map(ToString::to_string))
                    .collect::<Option<Vec<_>>>()
            })
            .ok_or("'fields' must be an array of strings")?,
    };

    Ok(Arc::new(HasFieldValuesHandler {
        field,
        fields,
        negate: negate(config),
    }))
}

///
/// IfResolvesHandler
///
/// True when the configured `resolve` block yields any value for the
/// context topic. For field-value questions `:value` is the queried value.
///

#[derive(Clone, Debug)]
pub struct IfResolvesHandler {
    resolve: ResolveConfig,
    negate: bool,
}

impl RuleHandler for IfResolvesHandler {
    fn evaluate(&self, query: &FlagQuery<'_>, rules: &RuleEngine) -> Option<bool> {
        let context = rules.context();
        let objects = context.objects();
        let value: Vec<Value> = query.value().cloned().into_iter().collect();
        let submitted = BTreeMap::new();
        let inner = ContextVariableResolver::new(context);
        let variables =
            SubmittedVariableResolver::new(&inner, context.is_new_topic(), &value, &submitted);
        let field = query.field();
        let request = ResolveRequest {
            objects: &objects,
            field,
            is_reference: field.is_some_and(|f| f.is_reference()),
            paging: None,
            variables: &variables,
        };

        match self.resolve.resolve(context.engine(), &request) {
            Ok(values) => Some(!values.is_empty() != self.negate),
            Err(err) => {
                warn!(flag = query.key(), error = %err, "ifResolves gave no answer");
                None
            }
        }
    }
}

pub(crate) fn if_resolves(config: &JsonValue) -> Result<Arc<dyn RuleHandler>, String> {
    let node = config.get("resolve").ok_or("'resolve' is required")?;
    let resolve = ResolveConfig::from_json(node);
    if let ResolveConfig::Unresolvable(reason) = &resolve {
        return Err(format!("'resolve' is malformed: {reason}"));
    }

    Ok(Arc::new(IfResolvesHandler {
        resolve,
        negate: negate(config),
    }))
}
