use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{info, warn};

use biggerfish::cli::{self, BrowserArg, CliOptions, PageModeArg, StrategyArg};
use biggerfish::collector::{BatchOptions, Collector};
use biggerfish::config::{self, LoadedConfig};
use biggerfish::driver::{self, Backend, Driver, DriverOptions, WebDriverSession};
use biggerfish::notify::{LogNotifier, ProgressReporter, ThresholdReporter};
use biggerfish::sampler::{CounterSampler, PageMode, PageSampler, Sampler, TracerSampler};
use biggerfish::timer::Clock;
use biggerfish::{logging, pageserver, targets};

fn main() {
    logging::init_logging();

    if let Err(err) = run() {
        tracing::error!("{err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let opts = cli::parse();
    cli::validate(&opts)?;

    let loaded = config::load_config(opts.config_path.as_deref())?;
    info!(
        "run_id={} config_hash={}",
        loaded.config.run_id, loaded.config_hash
    );

    if opts.overwrite && opts.out_dir.exists() {
        info!("overwriting output directory {}", opts.out_dir.display());
        std::fs::remove_dir_all(&opts.out_dir)
            .with_context(|| format!("removing {}", opts.out_dir.display()))?;
    }
    std::fs::create_dir_all(&opts.out_dir)
        .with_context(|| format!("creating {}", opts.out_dir.display()))?;

    let targets = load_targets(&opts)?;
    info!("loaded {} targets", targets.len());

    let cancel = Arc::new(AtomicBool::new(false));
    {
        let cancel = Arc::clone(&cancel);
        ctrlc::set_handler(move || {
            cancel.store(true, Ordering::Relaxed);
        })
        .context("installing interrupt handler")?;
    }

    let window = Duration::from_secs(opts.trace_length);
    let webdriver_url = opts
        .webdriver_url
        .clone()
        .unwrap_or_else(|| loaded.config.webdriver_url.clone());

    let mut driver = driver::build_driver(&DriverOptions {
        backend: backend_for(opts.browser),
        webdriver_url: webdriver_url.clone(),
        receiver_addr: receiver_addr(&opts, &loaded),
    })?;

    let notify_interval = opts.notify_interval.unwrap_or(loaded.config.notify_interval);
    let reporter = ThresholdReporter::new(notify_interval, Box::new(LogNotifier));

    let batch = BatchOptions {
        out_dir: opts.out_dir.clone(),
        runs_per_target: opts.num_runs,
        window,
        single_shot: opts.open_world,
        single_shot_cap: opts.open_world.then_some(loaded.config.open_world_cap),
    };

    let stats = match opts.strategy {
        StrategyArg::Counter => {
            let clock = match opts.timer_resolution {
                Some(resolution) => Clock::Clamped {
                    resolution,
                    jitter: opts.enable_timer_jitter,
                },
                None => Clock::System,
            };
            let sampler = CounterSampler::new(clock, loaded.config.slot_width_ms);
            run_batch(&mut driver, &sampler, batch, &cancel, &reporter, &targets)?
        }
        StrategyArg::Page => {
            let attacker_url = match &opts.attacker_url {
                Some(url) => url.clone(),
                None => {
                    let server = pageserver::spawn(
                        PathBuf::from(&loaded.config.page_root),
                        loaded.config.page_server_port,
                    )?;
                    format!("http://{}/", server.addr)
                }
            };
            let session = WebDriverSession::new(&webdriver_url, backend_for(opts.browser))?;
            let sampler =
                PageSampler::new(session, &attacker_url, page_mode(opts.page_mode), window)?;
            let stats = run_batch(&mut driver, &sampler, batch, &cancel, &reporter, &targets)?;
            sampler.quit();
            stats
        }
        StrategyArg::Tracer => {
            let binary = opts
                .tracer_path
                .clone()
                .unwrap_or_else(|| PathBuf::from(&loaded.config.tracer_path));
            let threshold = opts
                .ns_threshold
                .unwrap_or(loaded.config.tracer_ns_threshold);
            let sampler = TracerSampler::new(binary, threshold);
            run_batch(&mut driver, &sampler, batch, &cancel, &reporter, &targets)?
        }
    };

    if stats.cancelled {
        warn!("collection was interrupted; rerun with the same output directory to resume");
    }
    Ok(())
}

fn run_batch<S: Sampler>(
    driver: &mut Driver,
    sampler: &S,
    batch: BatchOptions,
    cancel: &AtomicBool,
    reporter: &dyn ProgressReporter,
    targets: &[String],
) -> Result<biggerfish::collector::BatchStats> {
    Collector::new(driver, sampler, batch, cancel, Some(reporter)).run(targets)
}

fn load_targets(opts: &CliOptions) -> Result<Vec<String>> {
    if let Some(list) = &opts.targets {
        targets::parse_list(list)
    } else if let Some(path) = &opts.targets_csv {
        targets::load_csv(path, opts.targets_limit)
    } else {
        unreachable!("validation requires a target source")
    }
}

fn receiver_addr(opts: &CliOptions, loaded: &LoadedConfig) -> Option<String> {
    opts.receiver_host.as_ref().map(|host| {
        let port = opts.receiver_port.unwrap_or(loaded.config.receiver_port);
        format!("{host}:{port}")
    })
}

fn backend_for(browser: BrowserArg) -> Backend {
    match browser {
        BrowserArg::Chrome => Backend::Chrome,
        BrowserArg::ChromeHeadless => Backend::ChromeHeadless,
        BrowserArg::Firefox => Backend::Firefox,
        BrowserArg::Safari => Backend::Safari,
        BrowserArg::Edge => Backend::Edge,
        BrowserArg::Tor => Backend::Tor,
        BrowserArg::Links => Backend::Links,
        BrowserArg::Remote => Backend::Remote,
    }
}

fn page_mode(mode: PageModeArg) -> PageMode {
    match mode {
        PageModeArg::Ours => PageMode::Ours,
        PageModeArg::OursCm => PageMode::OursCountermeasure,
        PageModeArg::Cache => PageMode::Cache,
    }
}
