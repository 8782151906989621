use crate::{
    engine::Engine,
    error::InternalError,
    obs::EngineEvent,
    resolve::{ResolveRequest, Resolver, page},
    value::{PagedValues, Value, dedup_values},
};
use std::collections::HashSet;
use tracing::warn;

///
/// TraverseResolver
///
/// Follows a path of field ids hop by hop across the whole frontier.
/// Each hop's result is a set; first-seen order is kept so output is
/// stable. Objects without the hop's field are skipped with a warning.
///

pub struct TraverseResolver<'a> {
    path: &'a [String],
}

impl<'a> TraverseResolver<'a> {
    #[must_use]
    pub const fn new(path: &'a [String]) -> Self {
        Self { path }
    }

    fn hop(
        engine: &Engine,
        frontier: &[Value],
        field_id: &str,
    ) -> Result<Vec<Value>, InternalError> {
        let mut seen = HashSet::new();
        let mut next = Vec::new();

        for object in frontier {
            let field = object.as_topic().and_then(|topic| {
                engine
                    .schema()
                    .type_by_id(topic.type_id())
                    .and_then(|ty| ty.field_by_id(field_id))
                    .map(|field| (topic, field))
            });

            let Some((topic, field)) = field else {
                warn!(object = %object, field = field_id, "object does not have traversed field");
                engine.record(EngineEvent::TraverseMiss {
                    field: field_id.to_string(),
                });
                continue;
            };

            for value in engine.graph().values(topic, field)? {
                if seen.insert(value.key()) {
                    next.push(value);
                }
            }
        }

        Ok(next)
    }
}

impl Resolver for TraverseResolver<'_> {
    fn resolve(
        &self,
        engine: &Engine,
        request: &ResolveRequest<'_>,
    ) -> Result<PagedValues, InternalError> {
        let mut frontier = dedup_values(request.objects.iter().cloned());
        for field_id in self.path {
            frontier = Self::hop(engine, &frontier, field_id)?;
        }

        Ok(page(frontier, request.paging))
    }
}
