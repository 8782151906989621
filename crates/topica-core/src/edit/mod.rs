//! Write path.
//!
//! Turns submitted field data into stored values: builds inline topics,
//! updates embedded references, enforces addable/removable and value-type
//! constraints, and propagates inline edits up to the persisted owner.

mod session;
mod submission;

pub use session::EditSession;
pub use submission::{FieldSubmission, SubmittedValue, TopicSubmission};

use crate::error::{ErrorClass, ErrorOrigin, InternalError};
use thiserror::Error as ThisError;

///
/// EditError
///

#[remain::sorted]
#[derive(Debug, ThisError)]
pub enum EditError {
    #[error("inline topic '{topic_id}' not found in field '{field}'")]
    InlineTopicNotFound { field: String, topic_id: String },

    #[error("inline type '{0}' cannot be updated this way")]
    InlineUpdate(String),

    #[error("inline topic of type '{0}' has no owning context")]
    InlineWithoutOwner(String),

    #[error("topic '{0}' has not been stored yet")]
    NotStored(String),
}

impl EditError {
    pub(crate) const fn class(&self) -> ErrorClass {
        match self {
            Self::InlineTopicNotFound { .. } => ErrorClass::NotFound,
            Self::InlineUpdate(_) | Self::InlineWithoutOwner(_) | Self::NotStored(_) => {
                ErrorClass::Usage
            }
        }
    }
}

impl From<EditError> for InternalError {
    fn from(err: EditError) -> Self {
        Self::new(err.class(), ErrorOrigin::Edit, err.to_string())
    }
}

///
/// ExtractOptions
///
/// Switches for turning submitted values into stored values.
///

#[allow(clippy::struct_excessive_bools)]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ExtractOptions {
    /// Save embedded (non-inline) topics and use the saved result.
    pub resolve_embedded: bool,

    /// Keep stored inline topics the submission does not mention.
    pub include_existing: bool,

    /// Drop values the rules say are not storable.
    pub filter_non_storable: bool,

    /// Reject reference values whose type the field does not accept.
    pub validate_value_types: bool,
}

impl ExtractOptions {
    /// Used when adding values and when updating whole fields.
    pub const UPDATE: Self = Self {
        resolve_embedded: true,
        include_existing: false,
        filter_non_storable: true,
        validate_value_types: true,
    };

    /// Used when removing values; nothing is filtered, the removable check
    /// complains instead.
    pub const REMOVE: Self = Self {
        resolve_embedded: false,
        include_existing: false,
        filter_non_storable: false,
        validate_value_types: false,
    };
}

///
/// TESTS
///

#[cfg(test)]
mod tests;
