//! # Collection Orchestrator
//!
//! Drives the batch: for each target, runs the sampler on a dedicated
//! thread while the calling thread issues the navigation, joins the pair
//! through a single-slot handoff channel, and appends the run record to the
//! target's output file. Targets are processed strictly sequentially; the
//! driver and its browser session are not safe for concurrent navigation.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossbeam_channel::bounded;
use tracing::{info, warn};

use crate::driver::{Browser, DriverError, NavStatus};
use crate::notify::{ProgressReporter, ProgressSnapshot};
use crate::sampler::Sampler;
use crate::store::{self, TargetStore};
use crate::trace::{RunRecord, Trace};

#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub out_dir: PathBuf,
    /// Run quota per target; the on-disk record count never exceeds it.
    pub runs_per_target: usize,
    /// Capture window length.
    pub window: Duration,
    /// Open-world mode: one navigation-and-capture per target, always
    /// persisted, no priming run.
    pub single_shot: bool,
    /// Stop a single-shot batch once this many traces are collected.
    pub single_shot_cap: Option<u64>,
}

/// How one target's batch ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetOutcome {
    /// All requested runs persisted.
    Completed,
    /// Output file already held the full quota; nothing attempted.
    Skipped,
    /// Session-fatal failure or invalid capture; output file closed early
    /// and the batch moved on to the next target.
    Aborted,
    /// Cancellation was requested mid-target; the open file was flushed.
    Cancelled,
}

#[derive(Debug, Clone, Default)]
pub struct BatchStats {
    pub targets_completed: u64,
    pub targets_skipped: u64,
    pub targets_aborted: u64,
    pub traces_collected: u64,
    pub cancelled: bool,
}

enum RunFailure {
    /// Systemic failure (dead session, lost connectivity); stop this
    /// target rather than silently miscounting.
    Fatal(DriverError),
    /// The sampler returned the invalid-trace sentinel.
    CaptureInvalid,
}

pub struct Collector<'a, B: Browser, S: Sampler + ?Sized> {
    driver: &'a mut B,
    sampler: &'a S,
    opts: BatchOptions,
    cancel: &'a AtomicBool,
    progress: Option<&'a dyn ProgressReporter>,
    total_traces: u64,
    traces_collected: u64,
    started: Instant,
}

impl<'a, B: Browser, S: Sampler + ?Sized> Collector<'a, B, S> {
    pub fn new(
        driver: &'a mut B,
        sampler: &'a S,
        opts: BatchOptions,
        cancel: &'a AtomicBool,
        progress: Option<&'a dyn ProgressReporter>,
    ) -> Self {
        Self {
            driver,
            sampler,
            opts,
            cancel,
            progress,
            total_traces: 0,
            traces_collected: 0,
            started: Instant::now(),
        }
    }

    /// Run the whole batch. Targets whose output files already hold the
    /// full quota are skipped; a session-fatal target is abandoned and the
    /// batch continues; cancellation drains gracefully.
    pub fn run(&mut self, targets: &[String]) -> Result<BatchStats> {
        let runs = if self.opts.single_shot {
            1
        } else {
            self.opts.runs_per_target
        };
        self.total_traces = (runs * targets.len()) as u64;
        self.started = Instant::now();

        let mut stats = BatchStats::default();

        for target in targets {
            if self.cancel.load(Ordering::Relaxed) {
                info!("cancellation requested; wrapping up");
                stats.cancelled = true;
                break;
            }

            let existing = store::count_records(&self.opts.out_dir, target)
                .with_context(|| format!("counting existing records for {target}"))?;
            if existing >= runs {
                info!("skipping {target}: output already holds {existing} records");
                stats.targets_skipped += 1;
                continue;
            }

            match self.run_target(target, existing)? {
                TargetOutcome::Completed => stats.targets_completed += 1,
                TargetOutcome::Aborted => stats.targets_aborted += 1,
                TargetOutcome::Cancelled => {
                    stats.cancelled = true;
                    break;
                }
                TargetOutcome::Skipped => unreachable!("skip is decided before running"),
            }

            if self.opts.single_shot {
                if let Some(cap) = self.opts.single_shot_cap {
                    if self.traces_collected >= cap {
                        info!("single-shot cap of {cap} traces reached; stopping");
                        break;
                    }
                }
            }
        }

        stats.traces_collected = self.traces_collected;
        self.driver.quit();

        info!(
            "batch finished completed={} skipped={} aborted={} traces={} cancelled={}",
            stats.targets_completed,
            stats.targets_skipped,
            stats.targets_aborted,
            stats.traces_collected,
            stats.cancelled
        );
        Ok(stats)
    }

    /// Collect the remaining runs for one target. The first iteration is a
    /// priming run that warms caches and is not persisted, except in
    /// single-shot mode where the single run always is.
    fn run_target(&mut self, target: &str, existing: usize) -> Result<TargetOutcome> {
        if let Err(err) = self.driver.restart() {
            warn!("aborting {target}: browser restart failed: {err}");
            return Ok(TargetOutcome::Aborted);
        }
        if let Err(err) = self.driver.set_load_timeout(self.opts.window.as_secs()) {
            warn!("aborting {target}: setting load timeout failed: {err}");
            return Ok(TargetOutcome::Aborted);
        }

        let mut store = TargetStore::open(&self.opts.out_dir, target)
            .with_context(|| format!("opening output file for {target}"))?;

        let iterations = if self.opts.single_shot {
            1
        } else {
            // One extra run primes the cache before the measured ones.
            self.opts.runs_per_target - existing + 1
        };

        info!(
            "collecting target={target} existing={existing} iterations={iterations} out={}",
            store.path().display()
        );

        for run_index in 0..iterations {
            if self.cancel.load(Ordering::Relaxed) {
                return Ok(TargetOutcome::Cancelled);
            }

            self.driver.new_tab();

            let trace = match self.record_run(target) {
                Ok(trace) => trace,
                Err(RunFailure::Fatal(err)) => {
                    warn!("aborting {target}: {err}");
                    return Ok(TargetOutcome::Aborted);
                }
                Err(RunFailure::CaptureInvalid) => {
                    warn!("aborting {target}: capture returned the invalid sentinel");
                    return Ok(TargetOutcome::Aborted);
                }
            };

            if self.opts.single_shot || run_index > 0 {
                store
                    .append(&RunRecord {
                        trace,
                        target: target.to_string(),
                    })
                    .with_context(|| format!("appending record for {target}"))?;
                self.traces_collected += 1;
                self.report_progress();
            }
        }

        Ok(TargetOutcome::Completed)
    }

    /// One navigation-and-capture pair. The capture thread starts first and
    /// owns the sampler for the window; the calling thread navigates, sleeps
    /// out any remainder of the window, then blocks on the handoff channel.
    fn record_run(&mut self, target: &str) -> Result<Trace, RunFailure> {
        let (tx, rx) = bounded::<Trace>(1);
        let sampler = self.sampler;
        let window = self.opts.window;

        let trace = std::thread::scope(|scope| {
            scope.spawn(move || {
                // Capacity-1 channel: the send cannot block even if the
                // navigating side bailed out before receiving.
                let _ = tx.send(sampler.capture(window));
            });

            let started = Instant::now();
            match self.driver.navigate(target) {
                // A load cut short by the page-load timeout is the expected
                // outcome when the window is shorter than the full load.
                Ok(NavStatus::Loaded) | Ok(NavStatus::TimedOut) => {}
                Err(err) => return Err(RunFailure::Fatal(err)),
            }

            let elapsed = started.elapsed();
            if elapsed < window {
                std::thread::sleep(window - elapsed);
            }

            rx.recv().map_err(|_| RunFailure::CaptureInvalid)
        })?;

        if trace.is_invalid() {
            return Err(RunFailure::CaptureInvalid);
        }
        Ok(trace)
    }

    fn report_progress(&self) {
        if let Some(progress) = self.progress {
            let completion_pct = if self.total_traces > 0 {
                self.traces_collected as f64 / self.total_traces as f64 * 100.0
            } else {
                0.0
            };
            progress.on_progress(&ProgressSnapshot {
                traces_collected: self.traces_collected,
                total_traces: self.total_traces,
                completion_pct,
                elapsed_seconds: self.started.elapsed().as_secs_f64(),
            });
        }
    }
}
