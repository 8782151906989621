use crate::rules::{FlagQuery, RuleEngine};
use std::{collections::BTreeSet, fmt, sync::Arc};

///
/// RuleHandler
///
/// Answers a flag query with `Some(bool)` or defers with `None`.
///

pub trait RuleHandler: Send + Sync {
    fn evaluate(&self, query: &FlagQuery<'_>, rules: &RuleEngine) -> Option<bool>;
}

///
/// PassThrough
///
/// Never has an opinion; every flag falls back to schema and defaults.
///

#[derive(Clone, Copy, Debug, Default)]
pub struct PassThrough;

impl RuleHandler for PassThrough {
    fn evaluate(&self, _: &FlagQuery<'_>, _: &RuleEngine) -> Option<bool> {
        None
    }
}

///
/// BoundHandler
///
/// A handler plus the scope it was configured for: an optional set of
/// flag keys, and an optional set of field ids (`appliesTo`).
///

pub struct BoundHandler {
    name: String,
    flags: Option<BTreeSet<String>>,
    applies_to: Option<BTreeSet<String>>,
    handler: Arc<dyn RuleHandler>,
}

impl BoundHandler {
    #[must_use]
    pub fn new(name: impl Into<String>, handler: Arc<dyn RuleHandler>) -> Self {
        Self {
            name: name.into(),
            flags: None,
            applies_to: None,
            handler,
        }
    }

    #[must_use]
    pub fn for_flags(mut self, flags: impl IntoIterator<Item = String>) -> Self {
        self.flags = Some(flags.into_iter().collect());
        self
    }

    #[must_use]
    pub fn applies_to(mut self, field_ids: impl IntoIterator<Item = String>) -> Self {
        self.applies_to = Some(field_ids.into_iter().collect());
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    fn matches(&self, query: &FlagQuery<'_>) -> bool {
        let flag_ok = self
            .flags
            .as_ref()
            .is_none_or(|flags| flags.contains(query.key()));
        let field_ok = self.applies_to.as_ref().is_none_or(|ids| {
            query
                .field()
                .is_some_and(|field| ids.contains(field.id.as_str()))
        });

        flag_ok && field_ok
    }
}

impl fmt::Debug for BoundHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundHandler")
            .field("name", &self.name)
            .field("flags", &self.flags)
            .field("applies_to", &self.applies_to)
            .finish_non_exhaustive()
    }
}

///
/// HandlerChain
///
/// Ordered handlers; the first in-scope handler with an opinion answers.
/// An empty chain behaves as [`PassThrough`].
///

#[derive(Clone, Debug, Default)]
pub struct HandlerChain {
    handlers: Vec<Arc<BoundHandler>>,
}

impl HandlerChain {
    #[must_use]
    pub fn pass_through() -> Self {
        Self::default()
    }

    pub fn push(&mut self, handler: BoundHandler) {
        self.handlers.push(Arc::new(handler));
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    #[must_use]
    pub fn evaluate(&self, query: &FlagQuery<'_>, rules: &RuleEngine) -> Option<bool> {
        if self.handlers.is_empty() {
            return PassThrough.evaluate(query, rules);
        }

        self.handlers
            .iter()
            .filter(|bound| bound.matches(query))
            .find_map(|bound| bound.handler.evaluate(query, rules))
    }
}
