use crate::{
    DEFAULT_PAGE_LIMIT,
    error::InternalError,
    graph::{ChangeSet, GraphAccessor},
    model::Schema,
    obs::{EngineEvent, EventSink, NoopSink},
    resolve::{FunctionRegistry, QueryBackend},
    rules::{Attributes, HandlerChain, HandlerRegistry, RuleBindings},
};
use std::{fmt, sync::Arc};
use tracing::debug;

///
/// EngineOptions
///
/// Per-deployment switches threaded into every context.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct EngineOptions {
    /// Limit applied to paged reads that ask for a non-positive limit.
    pub default_page_limit: usize,

    /// Global read-only mode; every type answers `is_read_only_type`.
    pub read_only: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            default_page_limit: DEFAULT_PAGE_LIMIT,
            read_only: false,
        }
    }
}

///
/// Engine
///
/// Shared, read-only wiring for one schema: the graph accessor, rule
/// handler bindings, resolver functions and options. Contexts hold an
/// `Arc<Engine>`; nothing here is mutated after [`EngineBuilder::build`].
///

pub struct Engine {
    schema: Arc<Schema>,
    graph: Arc<dyn GraphAccessor>,
    bindings: RuleBindings,
    functions: FunctionRegistry,
    query: Option<Arc<dyn QueryBackend>>,
    attributes: Attributes,
    options: EngineOptions,
    sink: Arc<dyn EventSink>,
}

impl Engine {
    #[must_use]
    pub fn builder(schema: Arc<Schema>, graph: Arc<dyn GraphAccessor>) -> EngineBuilder {
        EngineBuilder::new(schema, graph)
    }

    #[must_use]
    pub const fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    #[must_use]
    pub const fn graph(&self) -> &Arc<dyn GraphAccessor> {
        &self.graph
    }

    #[must_use]
    pub const fn options(&self) -> &EngineOptions {
        &self.options
    }

    #[must_use]
    pub const fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    #[must_use]
    pub const fn functions(&self) -> &FunctionRegistry {
        &self.functions
    }

    #[must_use]
    pub fn query_backend(&self) -> Option<&dyn QueryBackend> {
        self.query.as_deref()
    }

    /// Handler chain bound to a type; pass-through when none is configured.
    #[must_use]
    pub fn handler_chain(&self, type_id: &str) -> HandlerChain {
        self.bindings.chain(type_id)
    }

    /// Open a change set against this engine's graph.
    #[must_use]
    pub fn change_set(&self) -> ChangeSet {
        ChangeSet::new(Arc::clone(&self.graph))
    }

    pub fn record(&self, event: EngineEvent) {
        self.sink.record(&event);
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("types", &self.schema.types().count())
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

///
/// EngineBuilder
///

pub struct EngineBuilder {
    schema: Arc<Schema>,
    graph: Arc<dyn GraphAccessor>,
    handlers: HandlerRegistry,
    functions: FunctionRegistry,
    query: Option<Arc<dyn QueryBackend>>,
    attributes: Attributes,
    options: EngineOptions,
    sink: Option<Arc<dyn EventSink>>,
}

impl EngineBuilder {
    /// Start a builder with the built-in rule handlers registered.
    #[must_use]
    pub fn new(schema: Arc<Schema>, graph: Arc<dyn GraphAccessor>) -> Self {
        Self {
            schema,
            graph,
            handlers: HandlerRegistry::with_builtins(),
            functions: FunctionRegistry::new(),
            query: None,
            attributes: Attributes::new(),
            options: EngineOptions::default(),
            sink: None,
        }
    }

    #[must_use]
    pub fn handlers(mut self, handlers: HandlerRegistry) -> Self {
        self.handlers = handlers;
        self
    }

    #[must_use]
    pub fn functions(mut self, functions: FunctionRegistry) -> Self {
        self.functions = functions;
        self
    }

    #[must_use]
    pub fn query_backend(mut self, backend: Arc<dyn QueryBackend>) -> Self {
        self.query = Some(backend);
        self
    }

    #[must_use]
    pub fn attributes(mut self, attributes: Attributes) -> Self {
        self.attributes = attributes;
        self
    }

    #[must_use]
    pub const fn options(mut self, options: EngineOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub fn sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Bind every type's configured rule handlers and freeze the engine.
    ///
    /// Unknown handler names and malformed handler entries fail here, not
    /// at request time.
    pub fn build(self) -> Result<Arc<Engine>, InternalError> {
        let bindings = self.handlers.bind(&self.schema)?;
        debug!(
            types = self.schema.types().count(),
            bound = bindings.len(),
            "engine built"
        );

        Ok(Arc::new(Engine {
            schema: self.schema,
            graph: self.graph,
            bindings,
            functions: self.functions,
            query: self.query,
            attributes: self.attributes,
            options: self.options,
            sink: self.sink.unwrap_or_else(|| Arc::new(NoopSink)),
        }))
    }
}
