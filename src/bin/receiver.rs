//! Receiver binary: runs on the machine hosting the victim browser and lets
//! a collector on another host drive it over the line protocol.

use anyhow::Result;
use clap::{Parser, ValueEnum};
use tracing::info;

use biggerfish::driver::{Backend, Browser, WebDriverSession};
use biggerfish::{logging, protocol, receiver};

#[derive(ValueEnum, Debug, Clone, Copy)]
enum BrowserArg {
    Chrome,
    ChromeHeadless,
    Firefox,
    Safari,
    Edge,
    Tor,
}

impl BrowserArg {
    fn backend(self) -> Backend {
        match self {
            BrowserArg::Chrome => Backend::Chrome,
            BrowserArg::ChromeHeadless => Backend::ChromeHeadless,
            BrowserArg::Firefox => Backend::Firefox,
            BrowserArg::Safari => Backend::Safari,
            BrowserArg::Edge => Backend::Edge,
            BrowserArg::Tor => Backend::Tor,
        }
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Drive a local browser for a remote collector")]
struct ReceiverOptions {
    /// Port to listen on for the collector
    #[arg(long, default_value_t = protocol::DEFAULT_PORT)]
    port: u16,

    /// Local WebDriver endpoint
    #[arg(long, default_value = "http://localhost:9515")]
    webdriver_url: String,

    /// Browser to drive
    #[arg(long, value_enum, default_value_t = BrowserArg::Chrome)]
    browser: BrowserArg,

    /// Initial page-load timeout, in seconds
    #[arg(long, default_value_t = 15)]
    trace_length: u64,
}

fn main() {
    logging::init_logging();

    if let Err(err) = run() {
        tracing::error!("{err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let opts = ReceiverOptions::parse();

    let mut session = WebDriverSession::new(&opts.webdriver_url, opts.browser.backend())?;
    session.set_load_timeout(opts.trace_length)?;
    info!("browser session ready; load timeout {}s", opts.trace_length);

    receiver::run(opts.port, &mut session)
}
