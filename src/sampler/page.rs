//! In-page instrumentation strategy: the hosted attacker page accumulates
//! samples client-side via its `collectTrace(mode)` primitive and exposes
//! them through a global `traces` list. The engine triggers collection,
//! sleeps out the window, then polls for the result.

use std::time::{Duration, Instant};

use serde_json::Value;
use tracing::warn;

use crate::driver::{Browser, DriverError, NavStatus, WebDriverSession};
use crate::trace::Trace;

use super::Sampler;

/// How long to keep polling `traces` after the window has elapsed before
/// declaring the capture invalid.
const POLL_DEADLINE: Duration = Duration::from_secs(30);
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Collection sub-mode passed to the page's instrumentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageMode {
    /// Ordinary timing collection.
    Ours,
    /// Timing collection with the randomized-timer countermeasure active.
    OursCountermeasure,
    /// Cache-probing collection.
    Cache,
}

impl PageMode {
    pub fn tag(&self) -> &'static str {
        match self {
            PageMode::Ours => "ours",
            PageMode::OursCountermeasure => "ours_cm",
            PageMode::Cache => "cache",
        }
    }
}

pub struct PageSampler {
    session: WebDriverSession,
    mode: PageMode,
}

impl PageSampler {
    /// Load the attacker page in `session` and arm its instrumentation for
    /// windows of `window` length.
    pub fn new(
        mut session: WebDriverSession,
        attacker_url: &str,
        mode: PageMode,
        window: Duration,
    ) -> Result<Self, DriverError> {
        match session.navigate(attacker_url)? {
            NavStatus::Loaded => {}
            NavStatus::TimedOut => {
                return Err(DriverError::Protocol(format!(
                    "attacker page at {attacker_url} timed out while loading"
                )));
            }
        }
        session.execute(&format!("window.trace_length = {}", window.as_millis()))?;
        session.execute("window.using_automation_script = true")?;
        Ok(Self { session, mode })
    }

    /// Tear down the hosting browser session.
    pub fn quit(mut self) {
        self.session.quit();
    }

    fn poll_traces(&self) -> Option<Vec<i64>> {
        let deadline = Instant::now() + POLL_DEADLINE;
        while Instant::now() < deadline {
            let traces = match self.session.execute("return traces;") {
                Ok(value) => value,
                Err(err) => {
                    warn!("polling traces failed: {err}");
                    return None;
                }
            };
            if let Some(first) = traces.as_array().and_then(|list| list.first()) {
                return decode_samples(first);
            }
            std::thread::sleep(POLL_INTERVAL);
        }
        warn!("attacker page produced no trace before the poll deadline");
        None
    }
}

fn decode_samples(value: &Value) -> Option<Vec<i64>> {
    serde_json::from_value(value.clone()).ok()
}

impl Sampler for PageSampler {
    fn capture(&self, window: Duration) -> Trace {
        let script = format!("window.collectTrace(\"{}\")", self.mode.tag());
        if let Err(err) = self.session.execute(&script) {
            warn!("collectTrace invocation failed: {err}");
            return Trace::invalid();
        }

        std::thread::sleep(window);

        match self.poll_traces() {
            Some(samples) => Trace::Samples(samples),
            None => Trace::invalid(),
        }
    }
}
