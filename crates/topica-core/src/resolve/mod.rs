//! Value resolvers.
//!
//! A field whose extra block carries `resolve` is computed on demand
//! instead of read from storage. Every strategy shares the [`Resolver`]
//! contract; [`ResolveConfig`] parses the declarative block and dispatches.
//!
//! Configuration anomalies (missing keys, unknown kinds, unknown functions)
//! never fail a request: they log a warning and resolve to nothing.

mod coalesce;
mod config;
mod function;
mod query;
mod traverse;
mod variables;

pub use coalesce::CoalesceResolver;
pub use config::ResolveConfig;
pub use function::{FunctionRegistry, FunctionRequest, ResolverFunction};
pub use query::{QueryBackend, QueryRequest, QueryResolver};
pub use traverse::TraverseResolver;
pub use variables::{ContextVariableResolver, SubmittedVariableResolver, VariableResolver};

use crate::{
    engine::Engine,
    error::{ErrorClass, ErrorOrigin, InternalError},
    model::FieldModel,
    obs::EngineEvent,
    value::{PagedValues, Paging, Value},
};
use thiserror::Error as ThisError;
use tracing::warn;

///
/// ResolveError
///

#[remain::sorted]
#[derive(Debug, ThisError)]
pub enum ResolveError {
    #[error("resolver function '{0}' already registered")]
    FunctionAlreadyRegistered(String),
}

impl ResolveError {
    pub(crate) const fn class(&self) -> ErrorClass {
        match self {
            Self::FunctionAlreadyRegistered(_) => ErrorClass::InvariantViolation,
        }
    }
}

impl From<ResolveError> for InternalError {
    fn from(err: ResolveError) -> Self {
        Self::new(err.class(), ErrorOrigin::Resolve, err.to_string())
    }
}

///
/// ResolveRequest
///
/// Inputs shared by every strategy: the starting objects, the field being
/// resolved (absent for type-level rule queries), an optional page window
/// and the variable capability.
///

#[derive(Clone, Copy)]
pub struct ResolveRequest<'a> {
    pub objects: &'a [Value],
    pub field: Option<&'a FieldModel>,
    pub is_reference: bool,
    pub paging: Option<Paging>,
    pub variables: &'a dyn VariableResolver,
}

impl<'a> ResolveRequest<'a> {
    /// Same request over another object set and window.
    #[must_use]
    pub fn with_objects<'b>(&self, objects: &'b [Value], paging: Option<Paging>) -> ResolveRequest<'b>
    where
        'a: 'b,
    {
        ResolveRequest {
            objects,
            field: self.field,
            is_reference: self.is_reference,
            paging,
            variables: self.variables,
        }
    }

    fn field_id(&self) -> &str {
        self.field.map_or("", |f| f.id.as_str())
    }
}

///
/// Resolver
///

pub trait Resolver {
    fn resolve(
        &self,
        engine: &Engine,
        request: &ResolveRequest<'_>,
    ) -> Result<PagedValues, InternalError>;
}

/// Apply an optional window to a complete result.
fn page(values: Vec<Value>, paging: Option<Paging>) -> PagedValues {
    match paging {
        Some(paging) => PagedValues::page(&values, paging),
        None => PagedValues::unpaged(values),
    }
}

/// Log and report a degraded resolution; always empty.
fn fallback(engine: &Engine, request: &ResolveRequest<'_>, reason: &'static str) -> PagedValues {
    let field = request.field_id();
    warn!(field = field, reason = reason, "resolve fell back to empty result");
    engine.record(EngineEvent::ResolverFallback {
        field: field.to_string(),
        reason,
    });

    PagedValues::empty()
}

///
/// TESTS
///
