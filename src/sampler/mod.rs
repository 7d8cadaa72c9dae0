//! # Sampling Engine
//!
//! Interchangeable strategies producing a trace of system activity over one
//! load window. A strategy never fails loudly: a capture that cannot
//! complete yields the invalid-trace sentinel, which the orchestrator treats
//! as session-fatal for the current target.

pub mod counter;
pub mod page;
pub mod tracer;

use std::time::Duration;

use crate::trace::Trace;

pub use counter::CounterSampler;
pub use page::{PageMode, PageSampler};
pub use tracer::TracerSampler;

/// A sampling strategy. `capture` runs on a dedicated thread concurrently
/// with the navigation it measures, so implementations must be shareable
/// across threads.
pub trait Sampler: Send + Sync {
    fn capture(&self, window: Duration) -> Trace;
}
