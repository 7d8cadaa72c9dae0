#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use biggerfish::driver::{Browser, DriverError, NavStatus};
use biggerfish::sampler::Sampler;
use biggerfish::trace::Trace;

/// Shared call log so a test can inspect a browser handed to another thread.
#[derive(Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<String>>>);

impl CallLog {
    pub fn record(&self, call: impl Into<String>) {
        self.0.lock().unwrap().push(call.into());
    }

    pub fn calls(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn count_of(&self, call: &str) -> usize {
        self.calls().iter().filter(|c| c.as_str() == call).count()
    }
}

/// Scriptable browser double that records every capability call.
pub struct FakeBrowser {
    pub log: CallLog,
    /// Navigations to this URL fail with a session-fatal error.
    pub poison_url: Option<String>,
}

impl FakeBrowser {
    pub fn new() -> Self {
        Self {
            log: CallLog::default(),
            poison_url: None,
        }
    }
}

impl Browser for FakeBrowser {
    fn navigate(&mut self, url: &str) -> Result<NavStatus, DriverError> {
        self.log.record(format!("navigate {url}"));
        if self.poison_url.as_deref() == Some(url) {
            return Err(DriverError::SessionInvalidated);
        }
        Ok(NavStatus::Loaded)
    }

    fn set_load_timeout(&mut self, seconds: u64) -> Result<(), DriverError> {
        self.log.record(format!("set-timeout {seconds}"));
        Ok(())
    }

    fn new_tab(&mut self) {
        self.log.record("new-tab");
    }

    fn restart(&mut self) -> Result<(), DriverError> {
        self.log.record("restart");
        Ok(())
    }

    fn quit(&mut self) {
        self.log.record("quit");
    }
}

/// Sampler double returning either a fixed trace or the invalid sentinel.
pub struct FixedSampler {
    pub invalid: bool,
}

impl Sampler for FixedSampler {
    fn capture(&self, _window: Duration) -> Trace {
        if self.invalid {
            Trace::invalid()
        } else {
            Trace::Samples(vec![1, 2, 3])
        }
    }
}
