use crate::config::ConfigError;
use derive_more::Display;
use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;
use topica_core::error::{
    ConstraintError, ErrorClass, ErrorOrigin as CoreErrorOrigin, InternalError,
};

///
/// Error
/// Public error type with a stable kind + origin taxonomy.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize, ThisError)]
#[error("{message}")]
pub struct Error {
    pub kind: ErrorKind,
    pub origin: ErrorOrigin,
    pub message: String,
}

impl Error {
    pub fn new(kind: ErrorKind, origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self {
            kind,
            origin,
            message: message.into(),
        }
    }

    #[must_use]
    pub const fn is_constraint(&self) -> bool {
        matches!(self.kind, ErrorKind::Constraint(_))
    }
}

impl From<InternalError> for Error {
    fn from(err: InternalError) -> Self {
        let kind = match (err.class, err.constraint()) {
            (_, Some(constraint)) => ErrorKind::Constraint(constraint.into()),
            (ErrorClass::NotFound, _) => ErrorKind::NotFound,
            (ErrorClass::Usage | ErrorClass::Conflict, _) => ErrorKind::Usage,
            (ErrorClass::Unsupported, _) => ErrorKind::Config,
            (ErrorClass::Constraint | ErrorClass::Internal | ErrorClass::InvariantViolation, _) => {
                ErrorKind::Internal
            }
        };

        Self::new(kind, err.origin.into(), err.message)
    }
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        Self::new(ErrorKind::Config, ErrorOrigin::Config, err.to_string())
    }
}

///
/// ErrorKind
/// Public error taxonomy for callers and the presentation layer.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum ErrorKind {
    /// A write was refused by the rules or the schema.
    Constraint(ConstraintErrorKind),

    /// The caller asked for something that cannot be done this way.
    Usage,

    /// Topic, type, view or field does not exist.
    NotFound,

    /// Engine configuration or schema-bound rule configuration is invalid.
    Config,

    /// The caller cannot remediate this.
    Internal,
}

///
/// ConstraintErrorKind
///

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum ConstraintErrorKind {
    InvalidValueType,
    NotAddable,
    NotInlineType,
    NotRemovable,
}

impl From<&ConstraintError> for ConstraintErrorKind {
    fn from(err: &ConstraintError) -> Self {
        match err {
            ConstraintError::InvalidValueType { .. } => Self::InvalidValueType,
            ConstraintError::NotAddable { .. } => Self::NotAddable,
            ConstraintError::NotInlineType { .. } => Self::NotInlineType,
            ConstraintError::NotRemovable { .. } => Self::NotRemovable,
        }
    }
}

///
/// ErrorOrigin
/// Public origin taxonomy.
///

#[derive(Clone, Copy, Debug, Deserialize, Display, Eq, PartialEq, Serialize)]
pub enum ErrorOrigin {
    Config,
    Context,
    Edit,
    Graph,
    Merge,
    Resolve,
    Rules,
    Schema,
}

impl From<CoreErrorOrigin> for ErrorOrigin {
    fn from(origin: CoreErrorOrigin) -> Self {
        match origin {
            CoreErrorOrigin::Context => Self::Context,
            CoreErrorOrigin::Edit => Self::Edit,
            CoreErrorOrigin::Graph => Self::Graph,
            CoreErrorOrigin::Merge => Self::Merge,
            CoreErrorOrigin::Resolve => Self::Resolve,
            CoreErrorOrigin::Rules => Self::Rules,
            CoreErrorOrigin::Schema => Self::Schema,
        }
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constraint_detail_becomes_the_kind() {
        let err: Error = InternalError::from(ConstraintError::NotRemovable {
            field: "tags".to_string(),
            value: "math".to_string(),
        })
        .into();

        assert_eq!(
            err.kind,
            ErrorKind::Constraint(ConstraintErrorKind::NotRemovable)
        );
        assert_eq!(err.origin, ErrorOrigin::Edit);
        assert!(err.is_constraint());
    }

    #[test]
    fn classes_map_to_public_kinds() {
        let cases = [
            (ErrorClass::NotFound, ErrorKind::NotFound),
            (ErrorClass::Usage, ErrorKind::Usage),
            (ErrorClass::Unsupported, ErrorKind::Config),
            (ErrorClass::InvariantViolation, ErrorKind::Internal),
            (ErrorClass::Internal, ErrorKind::Internal),
        ];

        for (class, kind) in cases {
            let err: Error = InternalError::new(class, CoreErrorOrigin::Rules, "x").into();
            assert_eq!(err.kind, kind, "{class}");
            assert_eq!(err.origin, ErrorOrigin::Rules);
        }
    }

    #[test]
    fn errors_serialize_for_the_presentation_layer() {
        let err = Error::new(
            ErrorKind::Constraint(ConstraintErrorKind::NotAddable),
            ErrorOrigin::Edit,
            "value 'red' cannot be added to field 'tags'",
        );

        let json = serde_json::to_value(&err).expect("error should serialize");
        assert_eq!(json["kind"]["Constraint"], "NotAddable");
        assert_eq!(json["origin"], "Edit");
        assert_eq!(err.origin.to_string(), "Edit");
    }
}
