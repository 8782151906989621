use crate::{
    engine::Engine,
    error::InternalError,
    model::FieldModel,
    resolve::{ResolveRequest, Resolver, VariableResolver, fallback, page},
    value::{PagedValues, Value},
};
use serde_json::Value as JsonValue;

///
/// QueryRequest
///

pub struct QueryRequest<'a> {
    pub config: &'a JsonValue,
    pub objects: &'a [Value],
    pub field: Option<&'a FieldModel>,
    pub variables: &'a dyn VariableResolver,
}

///
/// QueryBackend
///
/// Backend-specific lookup facility behind `{"type": "query"}` items.
/// The config block is passed through untouched.
///

pub trait QueryBackend: Send + Sync {
    fn query(&self, request: &QueryRequest<'_>) -> Result<Vec<Value>, InternalError>;
}

///
/// QueryResolver
///

pub struct QueryResolver<'a> {
    config: &'a JsonValue,
}

impl<'a> QueryResolver<'a> {
    #[must_use]
    pub const fn new(config: &'a JsonValue) -> Self {
        Self { config }
    }
}

impl Resolver for QueryResolver<'_> {
    fn resolve(
        &self,
        engine: &Engine,
        request: &ResolveRequest<'_>,
    ) -> Result<PagedValues, InternalError> {
        let Some(backend) = engine.query_backend() else {
            return Ok(fallback(engine, request, "no query backend"));
        };

        let values = backend.query(&QueryRequest {
            config: self.config,
            objects: request.objects,
            field: request.field,
            variables: request.variables,
        })?;

        Ok(page(values, request.paging))
    }
}
