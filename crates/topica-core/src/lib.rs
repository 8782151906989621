//! Core engine for Topica: schema model, topic values, contexts, rule
//! evaluation, value resolvers, inline merge and the edit write path.
#![warn(unreachable_pub)]

// public exports are one module level down
pub mod context;
pub mod edit;
pub mod engine;
pub mod error;
pub mod graph;
pub mod merge;
pub mod model;
pub mod obs;
pub mod resolve;
pub mod rules;
pub mod value;

// test
#[cfg(test)]
pub(crate) mod test_support;

///
/// CONSTANTS
///

/// Prefix marking a topic id as a not-yet-created topic.
///
/// A new-topic id is this prefix followed by the type id, e.g. `_person`.
pub const NEW_TOPIC_ID_PREFIX: &str = "_";

/// Page size used when a paged read asks for a non-positive limit.
pub const DEFAULT_PAGE_LIMIT: usize = 100;

///
/// Prelude
///
/// Prelude contains only domain vocabulary.
/// No errors, registries, or graph backends are re-exported here.
///

pub mod prelude {
    pub use crate::{
        context::Context,
        model::{FieldModel, Schema, TypeModel, ViewModel},
        rules::RuleEngine,
        value::{PagedValues, Paging, Topic, TopicId, Value},
    };
}
