use crate::{
    engine::Engine,
    error::InternalError,
    resolve::{ResolveConfig, ResolveRequest, Resolver},
    value::PagedValues,
};

///
/// CoalesceResolver
///
/// Tries each nested configuration in order; the first non-empty result
/// wins. All empty (or none configured) yields an empty result with a
/// total of zero.
///

pub struct CoalesceResolver<'a> {
    items: &'a [ResolveConfig],
}

impl<'a> CoalesceResolver<'a> {
    #[must_use]
    pub const fn new(items: &'a [ResolveConfig]) -> Self {
        Self { items }
    }
}

impl Resolver for CoalesceResolver<'_> {
    fn resolve(
        &self,
        engine: &Engine,
        request: &ResolveRequest<'_>,
    ) -> Result<PagedValues, InternalError> {
        for item in self.items {
            let result = item.resolve(engine, request)?;
            if !result.is_empty() {
                return Ok(result);
            }
        }

        Ok(PagedValues::empty())
    }
}
