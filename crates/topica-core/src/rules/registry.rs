use crate::{
    error::{ErrorClass, ErrorOrigin, InternalError},
    model::{Schema, TypeModel},
    rules::{BoundHandler, FLAG_KEYS, HandlerChain, RuleHandler, builtin},
};
use serde_json::Value as JsonValue;
use std::{collections::BTreeMap, fmt, sync::Arc};
use thiserror::Error as ThisError;
use tracing::debug;

const CONTEXT_RULES: &str = "contextRules";

///
/// HandlerRegistryError
///

#[remain::sorted]
#[derive(Debug, ThisError)]
pub enum HandlerRegistryError {
    #[error("rule handler '{0}' already registered")]
    AlreadyRegistered(String),

    #[error("invalid rule handler config on type '{type_id}': {reason}")]
    InvalidConfig { type_id: String, reason: String },

    #[error("type '{type_id}' scopes a handler to unknown flag '{flag}'")]
    UnknownFlag { type_id: String, flag: String },

    #[error("type '{type_id}' names unknown rule handler '{name}'")]
    UnknownHandler { type_id: String, name: String },
}

impl HandlerRegistryError {
    pub(crate) const fn class(&self) -> ErrorClass {
        match self {
            Self::AlreadyRegistered(_) => ErrorClass::InvariantViolation,
            Self::InvalidConfig { .. } | Self::UnknownFlag { .. } | Self::UnknownHandler { .. } => {
                ErrorClass::Unsupported
            }
        }
    }
}

impl From<HandlerRegistryError> for InternalError {
    fn from(err: HandlerRegistryError) -> Self {
        Self::new(err.class(), ErrorOrigin::Rules, err.to_string())
    }
}

/// Builds a handler from its configuration entry; `Err` carries the reason.
pub type HandlerFactory = dyn Fn(&JsonValue) -> Result<Arc<dyn RuleHandler>, String> + Send + Sync;

///
/// HandlerRegistry
///
/// Handler names to factories. Types opt in through a `contextRules`
/// entry (or array of entries) in their extra block:
///
/// `{ "class": "<name>", "flags": [..], "appliesTo": [..], ..config }`
///

#[derive(Default)]
pub struct HandlerRegistry {
    factories: BTreeMap<String, Arc<HandlerFactory>>,
}

impl HandlerRegistry {
    /// Empty registry; schemas naming any handler will fail to bind.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with `constant`, `hasFieldValues` and `ifResolves`.
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.insert(builtin::CONSTANT, builtin::constant);
        registry.insert(builtin::HAS_FIELD_VALUES, builtin::has_field_values);
        registry.insert(builtin::IF_RESOLVES, builtin::if_resolves);

        registry
    }

    pub fn register<F>(&mut self, name: &str, factory: F) -> Result<(), InternalError>
    where
        F: Fn(&JsonValue) -> Result<Arc<dyn RuleHandler>, String> + Send + Sync + 'static,
    {
        if self.factories.contains_key(name) {
            return Err(HandlerRegistryError::AlreadyRegistered(name.to_string()).into());
        }
        self.insert(name, factory);

        Ok(())
    }

    fn insert<F>(&mut self, name: &str, factory: F)
    where
        F: Fn(&JsonValue) -> Result<Arc<dyn RuleHandler>, String> + Send + Sync + 'static,
    {
        self.factories.insert(name.to_string(), Arc::new(factory));
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Bind the handler chain of every type in `schema`.
    pub fn bind(&self, schema: &Schema) -> Result<RuleBindings, InternalError> {
        let mut chains = BTreeMap::new();

        for ty in schema.types() {
            let chain = self.bind_type(ty)?;
            if !chain.is_empty() {
                debug!(type_id = %ty.id, handlers = chain.len(), "bound rule handlers");
                chains.insert(ty.id.clone(), chain);
            }
        }

        Ok(RuleBindings { chains })
    }

    fn bind_type(&self, ty: &TypeModel) -> Result<HandlerChain, HandlerRegistryError> {
        let mut chain = HandlerChain::pass_through();

        let entries = match ty.extra_node(CONTEXT_RULES) {
            None | Some(JsonValue::Null) => return Ok(chain),
            Some(JsonValue::Array(items)) => items.iter().collect(),
            Some(entry @ JsonValue::Object(_)) => vec![entry],
            Some(_) => {
                return Err(invalid(ty, "contextRules must be an object or an array"));
            }
        };

        for entry in entries {
            chain.push(self.bind_entry(ty, entry)?);
        }

        Ok(chain)
    }

    fn bind_entry(
        &self,
        ty: &TypeModel,
        entry: &JsonValue,
    ) -> Result<BoundHandler, HandlerRegistryError> {
        let name = entry
            .get("class")
            .and_then(JsonValue::as_str)
            .ok_or_else(|| invalid(ty, "handler entry has no 'class'"))?;
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| HandlerRegistryError::UnknownHandler {
                type_id: ty.id.clone(),
                name: name.to_string(),
            })?;
        let handler = factory(entry).map_err(|reason| invalid(ty, &format!("{name}: {reason}")))?;

        let mut bound = BoundHandler::new(name, handler);
        if let Some(flags) = string_list(ty, entry, "flags")? {
            if let Some(flag) = flags.iter().find(|f| !FLAG_KEYS.contains(&f.as_str())) {
                return Err(HandlerRegistryError::UnknownFlag {
                    type_id: ty.id.clone(),
                    flag: flag.clone(),
                });
            }
            bound = bound.for_flags(flags);
        }
        if let Some(field_ids) = string_list(ty, entry, "appliesTo")? {
            bound = bound.applies_to(field_ids);
        }

        Ok(bound)
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.factories.keys()).finish()
    }
}

fn invalid(ty: &TypeModel, reason: &str) -> HandlerRegistryError {
    HandlerRegistryError::InvalidConfig {
        type_id: ty.id.clone(),
        reason: reason.to_string(),
    }
}

fn string_list(
    ty: &TypeModel,
    entry: &JsonValue,
    key: &str,
) -> Result<Option<Vec<String>>, HandlerRegistryError> {
    let Some(node) = entry.get(key) else {
        return Ok(None);
    };

    node.as_array()
        .and_then(|items| {
            items
                .iter()
                .map(|item| item.as_str().map(ToString::to_string))
                .collect::<Option<Vec<_>>>()
        })
        .map(Some)
        .ok_or_else(|| invalid(ty, &format!("'{key}' must be an array of strings")))
}

///
/// RuleBindings
///
/// Handler chains per type id, frozen at engine build.
///

#[derive(Clone, Debug, Default)]
pub struct RuleBindings {
    chains: BTreeMap<String, HandlerChain>,
}

impl RuleBindings {
    /// Chain bound to `type_id`; pass-through when nothing is configured.
    #[must_use]
    pub fn chain(&self, type_id: &str) -> HandlerChain {
        self.chains.get(type_id).cloned().unwrap_or_default()
    }

    /// Number of types with at least one handler.
    #[must_use]
    pub fn len(&self) -> usize {
        self.chains.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }
}
