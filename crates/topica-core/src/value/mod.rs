mod paging;
mod topic;

pub use paging::{PagedValues, Paging};
pub use topic::{Topic, TopicId};

use derive_more::From;
use std::{fmt, sync::Arc};

///
/// Value
///
/// One entry of a topic field. Primitive fields hold scalars; reference
/// fields hold topics, either persisted references or inline topics that
/// only exist inside their owner.
///

#[derive(Clone, Debug, Eq, From, PartialEq)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Text(String),
    Topic(Arc<Topic>),
}

impl Value {
    /// Identity of this value for set semantics.
    ///
    /// Topics compare by id, so a refreshed copy of a topic is the same
    /// value as the stale one it replaces.
    #[must_use]
    pub fn key(&self) -> ValueKey {
        match self {
            Self::Bool(v) => ValueKey::Bool(*v),
            Self::Int(v) => ValueKey::Int(*v),
            Self::Text(v) => ValueKey::Text(v.clone()),
            Self::Topic(t) => ValueKey::Topic(t.id().clone()),
        }
    }

    #[must_use]
    pub const fn as_topic(&self) -> Option<&Arc<Topic>> {
        match self {
            Self::Topic(t) => Some(t),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub const fn is_topic(&self) -> bool {
        matches!(self, Self::Topic(_))
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<Topic> for Value {
    fn from(topic: Topic) -> Self {
        Self::Topic(Arc::new(topic))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Text(v) => write!(f, "{v}"),
            Self::Topic(t) => write!(f, "{}", t.id()),
        }
    }
}

///
/// ValueKey
///
/// Hashable identity of a [`Value`].
///

#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum ValueKey {
    Bool(bool),
    Int(i64),
    Text(String),
    Topic(TopicId),
}

/// Remove duplicate values by identity, keeping first occurrences in order.
#[must_use]
pub fn dedup_values(values: impl IntoIterator<Item = Value>) -> Vec<Value> {
    let mut seen = std::collections::HashSet::new();

    values
        .into_iter()
        .filter(|value| seen.insert(value.key()))
        .collect()
}

///
/// TESTS
///
