use std::sync::{Mutex, PoisonError};

///
/// EngineEvent
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum EngineEvent {
    ChangeSetSaved { changes: usize },
    ConstraintRejected { field: String },
    ResolverFallback { field: String, reason: &'static str },
    TraverseMiss { field: String },
}

///
/// EventSink
///

pub trait EventSink: Send + Sync {
    fn record(&self, event: &EngineEvent);
}

///
/// NoopSink
///

#[derive(Debug, Default)]
pub struct NoopSink;

impl EventSink for NoopSink {
    fn record(&self, _: &EngineEvent) {}
}

///
/// EventReport
///
/// Point-in-time event counters.
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct EventReport {
    pub change_sets_saved: u64,
    pub changes_saved: u64,
    pub constraints_rejected: u64,
    pub resolver_fallbacks: u64,
    pub traverse_misses: u64,
}

///
/// CountingSink
///
/// Sink that aggregates events into an [`EventReport`].
///

#[derive(Debug, Default)]
pub struct CountingSink {
    report: Mutex<EventReport>,
}

impl CountingSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn report(&self) -> EventReport {
        *self.report.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn reset(&self) {
        *self.report.lock().unwrap_or_else(PoisonError::into_inner) = EventReport::default();
    }
}

impl EventSink for CountingSink {
    fn record(&self, event: &EngineEvent) {
        let mut report = self.report.lock().unwrap_or_else(PoisonError::into_inner);

        match event {
            EngineEvent::ChangeSetSaved { changes } => {
                report.change_sets_saved += 1;
                report.changes_saved += *changes as u64;
            }
            EngineEvent::ConstraintRejected { .. } => report.constraints_rejected += 1,
            EngineEvent::ResolverFallback { .. } => report.resolver_fallbacks += 1,
            EngineEvent::TraverseMiss { .. } => report.traverse_misses += 1,
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
    fn counting_sink_aggregates_and_resets() {
        let sink = CountingSink::new();
        sink.record(&EngineEvent::ChangeSetSaved { changes: 3 });
        sink.record(&EngineEvent::ChangeSetSaved { changes: 2 });
        sink.record(&EngineEvent::TraverseMiss {
            field: "f1".to_string(),
        });

        let report = sink.report();
        assert_eq!(report.change_sets_saved, 2);
        assert_eq!(report.changes_saved, 5);
        assert_eq!(report.traverse_misses, 1);

        sink.reset();
        assert_eq!(sink.report(), EventReport::default());
    }
}
