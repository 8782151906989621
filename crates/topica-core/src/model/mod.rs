//! Schema model: type, field and view descriptors.
//!
//! Descriptors are immutable once a [`Schema`] is built and are shared
//! read-only across requests.

mod field;
mod schema;
mod types;
mod view;

pub use field::{FieldFlags, FieldKind, FieldModel};
pub use schema::{Schema, SchemaError};
pub use types::TypeModel;
pub use view::{ViewKind, ViewModel};

const fn default_true() -> bool {
    true
}
