//! # Clamped Timer
//!
//! Clock sources for the counter sampling strategy. The default clock reads
//! the system time at full precision; the clamped clock rounds reads down to
//! a configured resolution and optionally applies Chrome's per-tick jitter,
//! so collected traces reflect what an in-browser attacker would observe.

use std::time::{SystemTime, UNIX_EPOCH};

const C1: u64 = 0xFF51_AFD7_ED55_8CCD;
const C2: u64 = 0xC4CE_B9FE_1A85_EC53;

const MANTISSA_MASK: u64 = 0x000F_FFFF_FFFF_FFFF;
const EXPONENT_BITS: u64 = 0x3FF0_0000_0000_0000;

const JITTER_SECRET: u64 = 0x7CAD_93BF_4A12_0ED1;

/// Time source used by the counter strategy.
#[derive(Debug, Clone, Copy)]
pub enum Clock {
    /// Full-precision system time.
    System,
    /// System time clamped to `resolution` seconds, with optional jitter.
    Clamped { resolution: f64, jitter: bool },
}

impl Clock {
    /// Seconds since the Unix epoch under this clock's resolution policy.
    pub fn now_seconds(&self) -> f64 {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs_f64();
        match *self {
            Clock::System => now,
            Clock::Clamped { resolution, jitter } => clamp_time_resolution(now, resolution, jitter),
        }
    }
}

fn murmur_hash_3(mut value: u64) -> u64 {
    value ^= value >> 33;
    value = value.wrapping_mul(C1);
    value ^= value >> 33;
    value = value.wrapping_mul(C2);
    value ^= value >> 33;
    value
}

/// Map a hash to a uniform double in `[0, 1)`.
fn to_double(value: u64) -> f64 {
    let random = (value & MANTISSA_MASK) | EXPONENT_BITS;
    f64::from_bits(random) - 1.0
}

fn threshold_for(clamped_time: f64, resolution: f64) -> f64 {
    let time_hash = murmur_hash_3(clamped_time.to_bits() ^ JITTER_SECRET);
    clamped_time + resolution * to_double(time_hash)
}

/// Clamp `time_seconds` to the given resolution. With jitter enabled, the
/// tick boundary is moved by a deterministic per-tick offset so a caller
/// cannot recover sub-resolution timing by averaging over edges.
pub fn clamp_time_resolution(time_seconds: f64, resolution: f64, jitter: bool) -> f64 {
    let clamped_time = (time_seconds / resolution).floor() * resolution;

    if jitter {
        let tick_threshold = threshold_for(clamped_time, resolution);
        if time_seconds >= tick_threshold {
            return clamped_time + resolution;
        }
    }

    clamped_time
}
