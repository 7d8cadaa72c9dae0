use std::path::PathBuf;

use anyhow::{Result, bail};
use clap::{Parser, ValueEnum};

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrowserArg {
    Chrome,
    ChromeHeadless,
    Firefox,
    Safari,
    Edge,
    Tor,
    Links,
    Remote,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyArg {
    /// Busy-loop counting slots on the collector host.
    Counter,
    /// In-page instrumentation hosted by the attacker page.
    Page,
    /// Privileged kernel event tracer.
    Tracer,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageModeArg {
    Ours,
    OursCm,
    Cache,
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Collect browser CPU side-channel traces")]
pub struct CliOptions {
    /// Browser backend driving the victim page loads
    #[arg(long, value_enum, default_value_t = BrowserArg::Chrome)]
    pub browser: BrowserArg,

    /// Sampling strategy recording activity during each load
    #[arg(long, value_enum, default_value_t = StrategyArg::Counter)]
    pub strategy: StrategyArg,

    /// Measured runs per target (a priming run is added on top)
    #[arg(long, default_value_t = 100)]
    pub num_runs: usize,

    /// Length of each recorded trace, in seconds
    #[arg(long, default_value_t = 15)]
    pub trace_length: u64,

    /// Comma-separated target domains
    #[arg(long)]
    pub targets: Option<String>,

    /// CSV file with a `domain` column to load targets from
    #[arg(long)]
    pub targets_csv: Option<PathBuf>,

    /// Use only the first N targets of the CSV
    #[arg(long)]
    pub targets_limit: Option<usize>,

    /// Open-world mode: one persisted run per target, no priming
    #[arg(long)]
    pub open_world: bool,

    /// Output directory for per-target record files
    #[arg(short, long, default_value = "data")]
    pub out_dir: PathBuf,

    /// Remove the output directory before collecting
    #[arg(long)]
    pub overwrite: bool,

    /// Receiver host, required with --browser remote
    #[arg(long)]
    pub receiver_host: Option<String>,

    /// Receiver port (defaults from config)
    #[arg(long)]
    pub receiver_port: Option<u16>,

    /// WebDriver endpoint override (defaults from config)
    #[arg(long)]
    pub webdriver_url: Option<String>,

    /// Attacker page URL override for the page strategy
    #[arg(long)]
    pub attacker_url: Option<String>,

    /// Collection sub-mode for the page strategy
    #[arg(long, value_enum, default_value_t = PageModeArg::Ours)]
    pub page_mode: PageModeArg,

    /// Clamp the counter strategy's timer to this resolution, in seconds
    #[arg(long)]
    pub timer_resolution: Option<f64>,

    /// Apply per-tick jitter on top of the clamped timer
    #[arg(long)]
    pub enable_timer_jitter: bool,

    /// Kernel tracer binary override (defaults from config)
    #[arg(long)]
    pub tracer_path: Option<PathBuf>,

    /// Minimum gap duration the tracer records, in nanoseconds
    #[arg(long)]
    pub ns_threshold: Option<u64>,

    /// Fraction of progress between notifications (0 disables)
    #[arg(long)]
    pub notify_interval: Option<f64>,

    /// Optional path to config file (YAML)
    #[arg(long)]
    pub config_path: Option<PathBuf>,
}

pub fn parse() -> CliOptions {
    CliOptions::parse()
}

/// Reject conflicting option combinations before any browser or session is
/// created.
pub fn validate(opts: &CliOptions) -> Result<()> {
    if opts.enable_timer_jitter && opts.timer_resolution.is_none() {
        bail!("--enable-timer-jitter requires --timer-resolution");
    }
    if opts.timer_resolution.is_some() && opts.strategy != StrategyArg::Counter {
        bail!("--timer-resolution only applies to the counter strategy");
    }
    if opts.browser == BrowserArg::Remote && opts.receiver_host.is_none() {
        bail!("--browser remote requires --receiver-host");
    }
    if opts.strategy == StrategyArg::Page
        && matches!(opts.browser, BrowserArg::Links | BrowserArg::Remote)
    {
        bail!("the page strategy needs an automated browser hosting the attacker page");
    }
    if opts.open_world && opts.num_runs != 1 {
        bail!("--open-world requires --num-runs 1");
    }
    if opts.num_runs == 0 {
        bail!("--num-runs must be at least 1");
    }
    if opts.targets.is_none() && opts.targets_csv.is_none() {
        bail!("give targets with --targets or --targets-csv");
    }
    if opts.targets.is_some() && opts.targets_csv.is_some() {
        bail!("--targets and --targets-csv are mutually exclusive");
    }
    if opts.page_mode == PageModeArg::OursCm && opts.strategy != StrategyArg::Page {
        bail!("--page-mode ours-cm requires --strategy page");
    }
    Ok(())
}
