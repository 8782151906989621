//! Graph accessor boundary.
//!
//! Storage backends implement [`GraphAccessor`]; the engine never touches
//! persistence any other way. Writes go through a [`ChangeSet`] so a batch
//! is committed as a unit.

mod change;
mod inline;
pub mod memory;

pub use change::{Change, ChangeKind, ChangeSet, UpdateId};
pub(crate) use change::{add_missing, remove_matching};
pub use inline::InlineTopicBuilder;

use crate::{
    error::{ErrorClass, ErrorOrigin, InternalError},
    model::FieldModel,
    value::{PagedValues, Paging, Topic, TopicId, Value},
};
use std::sync::Arc;
use thiserror::Error as ThisError;

///
/// GraphError
///

#[remain::sorted]
#[derive(Debug, ThisError)]
pub enum GraphError {
    #[error("change set already saved")]
    AlreadySaved,

    #[error("update {0} targets a deleted topic")]
    DeletedUpdate(usize),

    #[error("topic '{0}' already exists")]
    DuplicateTopic(String),

    #[error("inline topic '{0}' cannot be stored directly")]
    InlineTopic(String),

    #[error("change set has not been saved")]
    NotSaved,

    #[error("graph lock poisoned")]
    Poisoned,

    #[error("topic '{0}' not found")]
    TopicNotFound(String),

    #[error("unknown update handle {0}")]
    UnknownUpdate(usize),
}

impl GraphError {
    pub(crate) const fn class(&self) -> ErrorClass {
        match self {
            Self::DuplicateTopic(_) => ErrorClass::Conflict,
            Self::InlineTopic(_) | Self::AlreadySaved | Self::DeletedUpdate(_) => ErrorClass::Usage,
            Self::Poisoned => ErrorClass::Internal,
            Self::TopicNotFound(_) => ErrorClass::NotFound,
            Self::NotSaved | Self::UnknownUpdate(_) => ErrorClass::InvariantViolation,
        }
    }
}

impl From<GraphError> for InternalError {
    fn from(err: GraphError) -> Self {
        Self::new(err.class(), ErrorOrigin::Graph, err.to_string())
    }
}

///
/// GraphAccessor
///
/// Read and commit access to persisted topics. Calls may block; the engine
/// invokes them sequentially.
///

pub trait GraphAccessor: Send + Sync {
    fn topic_by_id(&self, id: &TopicId) -> Result<Option<Arc<Topic>>, InternalError>;

    /// Fetch several topics; ids that do not resolve are omitted.
    fn topics_by_ids(&self, ids: &[TopicId]) -> Result<Vec<Arc<Topic>>, InternalError> {
        let mut topics = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(topic) = self.topic_by_id(id)? {
                topics.push(topic);
            }
        }

        Ok(topics)
    }

    /// Raw stored values of a field, before any resolution.
    fn values(&self, topic: &Topic, field: &FieldModel) -> Result<Vec<Value>, InternalError> {
        Ok(topic.values(field.actual_id()).to_vec())
    }

    fn paged_values(
        &self,
        topic: &Topic,
        field: &FieldModel,
        paging: Paging,
    ) -> Result<PagedValues, InternalError> {
        let values = self.values(topic, field)?;

        Ok(PagedValues::page(&values, paging))
    }

    /// Candidate topics a reference field may be given, optionally filtered
    /// by a name query.
    fn available_field_values(
        &self,
        topic: Option<&Topic>,
        field: &FieldModel,
        query: Option<&str>,
    ) -> Result<Vec<Arc<Topic>>, InternalError>;

    /// Apply a batch atomically; returns the stored topics in change order.
    fn commit(&self, changes: Vec<Change>) -> Result<Vec<Arc<Topic>>, InternalError>;
}
