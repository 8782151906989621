//! ## Crate layout
//! - `config`: TOML engine settings and their validation.
//! - `core`: the engine itself (schema model, contexts, rules, resolvers,
//!   inline merge and the edit write path).
//! - `error`: the public error taxonomy.
//! - `session`: facade session converting core errors into [`Error`].
//!
//! The `prelude` module carries the vocabulary a host needs to open a
//! session and submit edits.

pub use topica_core as core;

pub mod config;
pub mod error;
pub mod session;

pub use config::EngineConfig;
pub use error::Error;
pub use session::Session;

//
// Consts
//

/// Workspace version re-export for downstream tooling/tests.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

///
/// Prelude
///

pub mod prelude {
    pub use crate::{
        config::EngineConfig,
        core::{
            context::Context,
            edit::{FieldSubmission, SubmittedValue, TopicSubmission},
            engine::Engine,
            graph::{GraphAccessor, memory::MemoryGraph},
            model::{FieldModel, Schema, TypeModel, ViewModel},
            rules::{ContextFlags, RuleEngine},
            value::{PagedValues, Topic, TopicId, Value},
        },
        error::{Error, ErrorKind},
        session::Session,
    };
}
