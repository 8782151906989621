//! Context rules.
//!
//! Flags (read-only, hidden, addable, ...) are answered per context by a
//! [`RuleEngine`]. Types may bind a chain of [`RuleHandler`]s in their
//! `contextRules` configuration; handlers without an opinion defer to the
//! schema's static flags and then to fixed defaults.

mod attributes;
mod builtin;
mod engine;
mod flags;
mod handler;
mod registry;

pub use attributes::Attributes;
pub use builtin::{ConstantHandler, HasFieldValuesHandler, IfResolvesHandler};
pub use engine::RuleEngine;
pub use flags::{
    ContextFlags, FLAG_KEYS, FieldFlag, FieldFlagSet, FieldValueFlag, FlagQuery, TypeFlag,
    ViewFlag,
};
pub use handler::{BoundHandler, HandlerChain, PassThrough, RuleHandler};
pub use registry::{HandlerFactory, HandlerRegistry, HandlerRegistryError, RuleBindings};

///
/// TESTS
///
