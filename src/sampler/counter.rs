//! Active counter strategy: a coarse CPU-contention proxy needing no
//! cooperation from the browser. Each ~5 ms slot spins a tight counting
//! loop; the count reached is the sample for that slot's elapsed-millisecond
//! offset. Page-load work on the same cores depresses the counts.

use std::time::Duration;

use crate::timer::Clock;
use crate::trace::Trace;

use super::Sampler;

pub struct CounterSampler {
    clock: Clock,
    slot_width_ms: u64,
}

impl CounterSampler {
    pub fn new(clock: Clock, slot_width_ms: u64) -> Self {
        Self {
            clock,
            slot_width_ms: slot_width_ms.max(1),
        }
    }
}

impl Sampler for CounterSampler {
    fn capture(&self, window: Duration) -> Trace {
        let window_ms = window.as_millis() as usize;
        // Slots that never get filled keep -1; a fully failed capture is the
        // single-element sentinel, which a one-slot buffer can never be
        // mistaken for since window_ms >= 1000 in practice.
        let mut samples = vec![-1i64; window_ms];
        let slot_width = self.slot_width_ms as f64;
        let start_ms = self.clock.now_seconds() * 1000.0;

        loop {
            let slot_start = self.clock.now_seconds() * 1000.0;
            let idx = (slot_start - start_ms).floor() as i64;
            if idx < 0 {
                // A clamped clock can read behind the recorded start.
                continue;
            }
            if idx as usize >= samples.len() {
                break;
            }

            let mut count = 0i64;
            while self.clock.now_seconds() * 1000.0 - slot_start < slot_width {
                count += 1;
            }
            samples[idx as usize] = count;
        }

        Trace::Samples(samples)
    }
}
