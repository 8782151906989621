use crate::merge::MergeError;
use std::fmt;
use thiserror::Error as ThisError;

///
/// InternalError
///
/// Structured runtime error with a stable internal classification.
/// Not a stable API; intended for internal use and may change without notice.
///

#[derive(Debug, ThisError)]
#[error("{message}")]
pub struct InternalError {
    pub class: ErrorClass,
    pub origin: ErrorOrigin,
    pub message: String,

    /// Optional structured error detail.
    /// Constraint and merge failures always carry one.
    pub detail: Option<ErrorDetail>,
}

impl InternalError {
    /// Construct an InternalError without structured detail.
    pub fn new(class: ErrorClass, origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self {
            class,
            origin,
            message: message.into(),
            detail: None,
        }
    }

    /// Construct a graph-origin internal error.
    pub fn graph_internal(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Internal, ErrorOrigin::Graph, message)
    }

    /// Construct a graph-origin not-found error.
    pub fn graph_not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::NotFound, ErrorOrigin::Graph, message)
    }

    /// Return the constraint detail, if this error is a constraint violation.
    #[must_use]
    pub const fn constraint(&self) -> Option<&ConstraintError> {
        match &self.detail {
            Some(ErrorDetail::Constraint(err)) => Some(err),
            _ => None,
        }
    }

    /// Return the merge detail, if this error came from the merge engine.
    #[must_use]
    pub const fn merge(&self) -> Option<&MergeError> {
        match &self.detail {
            Some(ErrorDetail::Merge(err)) => Some(err),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.class == ErrorClass::NotFound
    }

    #[must_use]
    pub fn display_with_class(&self) -> String {
        format!("{}:{}: {}", self.origin, self.class, self.message)
    }
}

///
/// ErrorDetail
///
/// Structured, origin-specific error detail carried by [`InternalError`].
///

#[derive(Debug, ThisError)]
pub enum ErrorDetail {
    #[error("{0}")]
    Constraint(ConstraintError),

    #[error("{0}")]
    Merge(MergeError),
}

///
/// ConstraintError
///
/// Named write-path rejections. Each variant maps to one user-visible
/// message in the presentation layer, so they are never folded together.
///

#[remain::sorted]
#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum ConstraintError {
    #[error("value '{value}' of type '{value_type}' is not valid for field '{field}'")]
    InvalidValueType {
        field: String,
        value: String,
        value_type: String,
    },

    #[error("value '{value}' cannot be added to field '{field}'")]
    NotAddable { field: String, value: String },

    #[error("type '{type_id}' is not an inline type")]
    NotInlineType { type_id: String },

    #[error("value '{value}' cannot be removed from field '{field}'")]
    NotRemovable { field: String, value: String },
}

impl From<ConstraintError> for InternalError {
    fn from(err: ConstraintError) -> Self {
        Self {
            class: ErrorClass::Constraint,
            origin: ErrorOrigin::Edit,
            message: err.to_string(),
            detail: Some(ErrorDetail::Constraint(err)),
        }
    }
}

///
/// ErrorClass
/// Internal error taxonomy for runtime classification.
/// Not a stable API; may change without notice.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorClass {
    Conflict,
    Constraint,
    Internal,
    InvariantViolation,
    NotFound,
    Unsupported,
    Usage,
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Conflict => "conflict",
            Self::Constraint => "constraint",
            Self::Internal => "internal",
            Self::InvariantViolation => "invariant_violation",
            Self::NotFound => "not_found",
            Self::Unsupported => "unsupported",
            Self::Usage => "usage",
        };
        write!(f, "{label}")
    }
}

///
/// ErrorOrigin
/// Internal origin taxonomy for runtime classification.
/// Not a stable API; may change without notice.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorOrigin {
    Context,
    Edit,
    Graph,
    Merge,
    Resolve,
    Rules,
    Schema,
}

impl fmt::Display for ErrorOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Context => "context",
            Self::Edit => "edit",
            Self::Graph => "graph",
            Self::Merge => "merge",
            Self::Resolve => "resolve",
            Self::Rules => "rules",
            Self::Schema => "schema",
        };
        write!(f, "{label}")
    }
}

///
/// TESTS
///
