//! # Trace Data Model
//!
//! Traces captured over one load window and the per-run record persisted
//! to the output files.

use serde::{Deserialize, Serialize};

/// One group of gap events attributed to a single interrupt kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventGroup {
    pub kind: i64,
    /// `(offset_ns, duration_ns)` pairs relative to capture start.
    pub gaps: Vec<(u64, u64)>,
}

/// Output of the kernel event-tracing strategy: the tracer's header line
/// followed by per-kind gap groups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventTrace {
    pub summary: String,
    pub groups: Vec<EventGroup>,
}

/// A captured time series or event list for one load window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data")]
pub enum Trace {
    /// Millisecond-indexed samples (counter and in-page strategies).
    Samples(Vec<i64>),
    /// Interrupt gap events (kernel tracer strategy).
    Events(EventTrace),
}

impl Trace {
    /// The sentinel marking a capture that failed outright.
    pub fn invalid() -> Self {
        Trace::Samples(vec![-1])
    }

    pub fn is_invalid(&self) -> bool {
        matches!(self, Trace::Samples(samples) if samples.len() == 1 && samples[0] == -1)
    }

    /// Number of samples or event groups in the trace.
    pub fn len(&self) -> usize {
        match self {
            Trace::Samples(samples) => samples.len(),
            Trace::Events(events) => events.groups.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One persisted unit of output: a trace paired with the target it was
/// captured against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub trace: Trace,
    pub target: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinel_is_invalid() {
        assert!(Trace::invalid().is_invalid());
        assert!(!Trace::Samples(vec![-1, -1]).is_invalid());
        assert!(!Trace::Samples(vec![42]).is_invalid());
        assert!(
            !Trace::Events(EventTrace {
                summary: "98.21".to_string(),
                groups: Vec::new(),
            })
            .is_invalid()
        );
    }

    #[test]
    fn record_round_trips_through_json() {
        let record = RunRecord {
            trace: Trace::Samples(vec![-1, 1200, 1187]),
            target: "https://example.com".to_string(),
        };
        let line = serde_json::to_string(&record).expect("serialize");
        let parsed: RunRecord = serde_json::from_str(&line).expect("deserialize");
        assert_eq!(parsed, record);
    }
}
