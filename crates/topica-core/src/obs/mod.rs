//! Observability: engine events and sink abstractions.
//!
//! Engine logic reports through [`EventSink`] only; hosts decide whether
//! events are counted, exported or dropped.

mod sink;

pub use sink::{CountingSink, EngineEvent, EventReport, EventSink, NoopSink};
