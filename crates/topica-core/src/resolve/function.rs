use crate::{
    engine::Engine,
    error::InternalError,
    model::FieldModel,
    resolve::{ResolveError, ResolveRequest, Resolver, VariableResolver, fallback, page},
    value::{PagedValues, Paging, Value},
};
use serde_json::Value as JsonValue;
use std::{collections::BTreeMap, fmt, sync::Arc};
use tracing::warn;

///
/// FunctionRequest
///
/// Everything a registered function sees: variables, its raw config
/// block, the current objects, the field and the page window.
///

pub struct FunctionRequest<'a> {
    pub engine: &'a Engine,
    pub variables: &'a dyn VariableResolver,
    pub config: &'a JsonValue,
    pub objects: &'a [Value],
    pub field: Option<&'a FieldModel>,
    pub is_reference: bool,
    pub paging: Option<Paging>,
}

///
/// ResolverFunction
///

pub trait ResolverFunction: Send + Sync {
    fn execute(&self, request: &FunctionRequest<'_>) -> Result<Vec<Value>, InternalError>;
}

impl<F> ResolverFunction for F
where
    F: Fn(&FunctionRequest<'_>) -> Result<Vec<Value>, InternalError> + Send + Sync,
{
    fn execute(&self, request: &FunctionRequest<'_>) -> Result<Vec<Value>, InternalError> {
        self(request)
    }
}

///
/// FunctionRegistry
///
/// Name to function map consulted by `{"type": "function", "class": ...}`.
///

#[derive(Clone, Default)]
pub struct FunctionRegistry {
    functions: BTreeMap<String, Arc<dyn ResolverFunction>>,
}

impl FunctionRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        name: impl Into<String>,
        function: impl ResolverFunction + 'static,
    ) -> Result<(), InternalError> {
        let name = name.into();
        if self.functions.contains_key(&name) {
            return Err(ResolveError::FunctionAlreadyRegistered(name).into());
        }
        self.functions.insert(name, Arc::new(function));

        Ok(())
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<dyn ResolverFunction>> {
        self.functions.get(name)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }
}

impl fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.functions.keys()).finish()
    }
}

///
/// FunctionResolver
///

pub(crate) struct FunctionResolver<'a> {
    class: &'a str,
    config: &'a JsonValue,
}

impl<'a> FunctionResolver<'a> {
    pub(crate) const fn new(class: &'a str, config: &'a JsonValue) -> Self {
        Self { class, config }
    }
}

impl Resolver for FunctionResolver<'_> {
    fn resolve(
        &self,
        engine: &Engine,
        request: &ResolveRequest<'_>,
    ) -> Result<PagedValues, InternalError> {
        let Some(function) = engine.functions().get(self.class) else {
            return Ok(fallback(engine, request, "unknown resolver function"));
        };

        let call = FunctionRequest {
            engine,
            variables: request.variables,
            config: self.config,
            objects: request.objects,
            field: request.field,
            is_reference: request.is_reference,
            paging: request.paging,
        };

        match function.execute(&call) {
            Ok(values) => Ok(page(values, request.paging)),
            Err(err) => {
                warn!(class = self.class, error = %err, "resolver function failed");
                Ok(fallback(engine, request, "resolver function failed"))
            }
        }
    }
}
