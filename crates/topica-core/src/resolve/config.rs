use crate::{
    engine::Engine,
    error::InternalError,
    resolve::{
        CoalesceResolver, QueryResolver, ResolveRequest, Resolver, TraverseResolver, fallback,
        function::FunctionResolver,
    },
    value::PagedValues,
};
use serde_json::Value as JsonValue;

///
/// ResolveConfig
///
/// Parsed form of a `resolve` block. A JSON array is a chain: each step's
/// result is the next step's object set. Malformed nodes parse to
/// `Unresolvable` rather than failing.
///

#[derive(Clone, Debug, PartialEq)]
pub enum ResolveConfig {
    Chain(Vec<Self>),
    Coalesce(Vec<Self>),
    Function { class: String, config: JsonValue },
    Query(JsonValue),
    Traverse(Vec<String>),
    Unresolvable(&'static str),
}

impl ResolveConfig {
    #[must_use]
    pub fn from_json(node: &JsonValue) -> Self {
        if let JsonValue::Array(steps) = node {
            return Self::Chain(steps.iter().map(Self::from_json).collect());
        }

        let Some(kind) = node.get("type").and_then(JsonValue::as_str) else {
            return Self::Unresolvable("resolve item has no type");
        };

        match kind {
            "traverse" => match node.get("path").and_then(JsonValue::as_array) {
                Some(path) => Self::Traverse(
                    path.iter()
                        .filter_map(JsonValue::as_str)
                        .map(ToString::to_string)
                        .collect(),
                ),
                None => Self::Unresolvable("traverse item has no path array"),
            },
            "function" => match node.get("class").and_then(JsonValue::as_str) {
                Some(class) => Self::Function {
                    class: class.to_string(),
                    config: node.clone(),
                },
                None => Self::Unresolvable("function item has no class"),
            },
            "coalesce" => match node.get("resolve").and_then(JsonValue::as_array) {
                Some(items) => Self::Coalesce(items.iter().map(Self::from_json).collect()),
                None => Self::Unresolvable("coalesce item has no resolve array"),
            },
            "query" => Self::Query(node.clone()),
            _ => Self::Unresolvable("unknown resolve type"),
        }
    }

    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Chain(_) => "chain",
            Self::Coalesce(_) => "coalesce",
            Self::Function { .. } => "function",
            Self::Query(_) => "query",
            Self::Traverse(_) => "traverse",
            Self::Unresolvable(_) => "unresolvable",
        }
    }

    fn resolve_chain(
        steps: &[Self],
        engine: &Engine,
        request: &ResolveRequest<'_>,
    ) -> Result<PagedValues, InternalError> {
        let Some((last, init)) = steps.split_last() else {
            return Ok(PagedValues::empty());
        };

        let mut objects = request.objects.to_vec();
        for step in init {
            objects = step
                .resolve(engine, &request.with_objects(&objects, None))?
                .into_values();
        }

        last.resolve(engine, &request.with_objects(&objects, request.paging))
    }
}

impl Resolver for ResolveConfig {
    fn resolve(
        &self,
        engine: &Engine,
        request: &ResolveRequest<'_>,
    ) -> Result<PagedValues, InternalError> {
        match self {
            Self::Chain(steps) => Self::resolve_chain(steps, engine, request),
            Self::Coalesce(items) => CoalesceResolver::new(items).resolve(engine, request),
            Self::Function { class, config } => {
                FunctionResolver::new(class, config).resolve(engine, request)
            }
            Self::Query(config) => QueryResolver::new(config).resolve(engine, request),
            Self::Traverse(path) => TraverseResolver::new(path).resolve(engine, request),
            Self::Unresolvable(reason) => Ok(fallback(engine, request, *reason)),
        }
    }
}
