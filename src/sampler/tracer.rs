//! Kernel event-tracing strategy: shells out to the privileged tracer for
//! the window duration and parses its line-oriented stdout into a header
//! line plus `(kind, [(offset, duration)...])` groups.

use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;

use tracing::warn;

use crate::trace::{EventGroup, EventTrace, Trace};

use super::Sampler;

pub struct TracerSampler {
    binary: PathBuf,
    ns_threshold: u64,
}

impl TracerSampler {
    pub fn new(binary: PathBuf, ns_threshold: u64) -> Self {
        Self {
            binary,
            ns_threshold,
        }
    }
}

impl Sampler for TracerSampler {
    fn capture(&self, window: Duration) -> Trace {
        // The tracer attaches kernel probes, so it runs under sudo.
        let output = Command::new("sudo")
            .arg(&self.binary)
            .arg(format!("--timeout={}", window.as_millis()))
            .arg(format!("--ns-threshold={}", self.ns_threshold))
            .output();

        let output = match output {
            Ok(output) => output,
            Err(err) => {
                warn!("tracer {} failed to start: {err}", self.binary.display());
                return Trace::invalid();
            }
        };

        if !output.status.success() {
            warn!("tracer exited with {}", output.status);
            return Trace::invalid();
        }

        let stdout = match std::str::from_utf8(&output.stdout) {
            Ok(stdout) => stdout,
            Err(_) => {
                warn!("tracer produced non-UTF-8 output");
                return Trace::invalid();
            }
        };

        match parse_tracer_output(stdout) {
            Some(events) => Trace::Events(events),
            None => Trace::invalid(),
        }
    }
}

/// Parse tracer stdout: a header line, then one line per interrupt kind
/// holding the kind id followed by flattened `(offset, duration)` pairs.
pub fn parse_tracer_output(stdout: &str) -> Option<EventTrace> {
    let mut lines = stdout.lines();
    let summary = lines.next()?.trim().to_string();

    let mut groups = Vec::new();
    for line in lines {
        if line.trim().is_empty() {
            continue;
        }
        let mut fields = line.split_whitespace();
        let kind = fields.next()?.parse::<i64>().ok()?;
        let values: Vec<u64> = fields.map(|v| v.parse::<u64>().ok()).collect::<Option<_>>()?;
        if values.len() % 2 != 0 {
            return None;
        }
        let gaps = values.chunks_exact(2).map(|pair| (pair[0], pair[1])).collect();
        groups.push(EventGroup { kind, gaps });
    }

    Some(EventTrace { summary, groups })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_header_and_groups() {
        let stdout = "97.50\n1 1000 250 2000 300\n101 1500 600\n";
        let events = parse_tracer_output(stdout).expect("parse");
        assert_eq!(events.summary, "97.50");
        assert_eq!(events.groups.len(), 2);
        assert_eq!(events.groups[0].kind, 1);
        assert_eq!(events.groups[0].gaps, vec![(1000, 250), (2000, 300)]);
        assert_eq!(events.groups[1].kind, 101);
        assert_eq!(events.groups[1].gaps, vec![(1500, 600)]);
    }

    #[test]
    fn header_only_output_is_valid() {
        let events = parse_tracer_output("100.00\n").expect("parse");
        assert_eq!(events.summary, "100.00");
        assert!(events.groups.is_empty());
    }

    #[test]
    fn empty_output_is_rejected() {
        assert!(parse_tracer_output("").is_none());
    }

    #[test]
    fn odd_pair_count_is_rejected() {
        assert!(parse_tracer_output("99.0\n1 1000 250 2000\n").is_none());
    }

    #[test]
    fn garbage_fields_are_rejected() {
        assert!(parse_tracer_output("99.0\n1 abc def\n").is_none());
    }
}
