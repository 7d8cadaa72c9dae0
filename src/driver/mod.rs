//! # Browser Drivers
//!
//! A uniform capability set over heterogeneous browser-control backends:
//! WebDriver automation sessions, address-bar-less external processes, and a
//! proxy to a receiver on another host. Backend selection is a one-time
//! configuration decision, so the variants live behind a tagged enum rather
//! than a registry.

pub mod automation;
pub mod external;
pub mod remote;

use thiserror::Error;

pub use automation::WebDriverSession;
pub use external::ExternalBrowser;
pub use remote::RemoteProxy;

#[derive(Debug, Error)]
pub enum DriverError {
    /// The automation session was invalidated (browser crashed or was
    /// closed underneath us). Aborts the current target's batch.
    #[error("browser session invalidated")]
    SessionInvalidated,
    #[error("webdriver transport error: {0}")]
    Transport(String),
    #[error("webdriver error: {error}: {message}")]
    Wire { error: String, message: String },
    #[error("unexpected webdriver response: {0}")]
    Protocol(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("connection to receiver at {addr} failed: {source}")]
    ReceiverConnect {
        addr: String,
        source: std::io::Error,
    },
}

/// How a navigation settled. A timed-out load is the expected outcome when
/// the capture window is shorter than the page's full load time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavStatus {
    Loaded,
    TimedOut,
}

/// Capability set every backend implements. Errors from `navigate` are
/// session-fatal; an expected load timeout is `Ok(NavStatus::TimedOut)`.
pub trait Browser {
    fn navigate(&mut self, url: &str) -> Result<NavStatus, DriverError>;
    fn set_load_timeout(&mut self, seconds: u64) -> Result<(), DriverError>;
    /// Navigate to a neutral location between runs so caching effects do not
    /// bleed across them. Best-effort; a no-op for backends without one.
    fn new_tab(&mut self);
    /// Discard browser state and start fresh for the next target.
    fn restart(&mut self) -> Result<(), DriverError>;
    /// Best-effort teardown. A browser that already crashed needs no
    /// graceful quit, so failures are swallowed.
    fn quit(&mut self);
}

/// Configured browser backend identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Chrome,
    ChromeHeadless,
    Firefox,
    Safari,
    Edge,
    Tor,
    Links,
    Remote,
}

impl Backend {
    /// Neutral URL loaded between runs; `None` for backends without an
    /// address bar.
    pub fn new_tab_url(&self) -> Option<&'static str> {
        match self {
            Backend::Chrome | Backend::ChromeHeadless => Some("chrome://new-tab-page"),
            Backend::Firefox => Some("about:home"),
            Backend::Safari => Some("favorites://"),
            Backend::Edge => Some("edge://newtab"),
            Backend::Tor => Some("about:blank"),
            Backend::Links => None,
            Backend::Remote => Some(crate::protocol::NEW_TAB_URL),
        }
    }

    pub fn is_automation(&self) -> bool {
        !matches!(self, Backend::Links | Backend::Remote)
    }
}

/// The configured driver variant.
pub enum Driver {
    Automation(WebDriverSession),
    External(ExternalBrowser),
    Remote(RemoteProxy),
}

/// What `build_driver` needs to construct any variant.
#[derive(Debug, Clone)]
pub struct DriverOptions {
    pub backend: Backend,
    pub webdriver_url: String,
    pub receiver_addr: Option<String>,
}

/// Map the configured backend to a driver variant. Construction of the
/// remote variant fails when the receiver cannot be reached.
pub fn build_driver(opts: &DriverOptions) -> Result<Driver, DriverError> {
    match opts.backend {
        Backend::Links => Ok(Driver::External(ExternalBrowser::new("links"))),
        Backend::Remote => {
            let addr = opts.receiver_addr.as_deref().unwrap_or_default();
            Ok(Driver::Remote(RemoteProxy::connect(addr)?))
        }
        backend => Ok(Driver::Automation(WebDriverSession::new(
            &opts.webdriver_url,
            backend,
        )?)),
    }
}

impl Browser for Driver {
    fn navigate(&mut self, url: &str) -> Result<NavStatus, DriverError> {
        match self {
            Driver::Automation(session) => session.navigate(url),
            Driver::External(browser) => browser.navigate(url),
            Driver::Remote(proxy) => proxy.navigate(url),
        }
    }

    fn set_load_timeout(&mut self, seconds: u64) -> Result<(), DriverError> {
        match self {
            Driver::Automation(session) => session.set_load_timeout(seconds),
            Driver::External(browser) => browser.set_load_timeout(seconds),
            Driver::Remote(proxy) => proxy.set_load_timeout(seconds),
        }
    }

    fn new_tab(&mut self) {
        match self {
            Driver::Automation(session) => session.new_tab(),
            Driver::External(browser) => browser.new_tab(),
            Driver::Remote(proxy) => proxy.new_tab(),
        }
    }

    fn restart(&mut self) -> Result<(), DriverError> {
        match self {
            Driver::Automation(session) => session.restart(),
            Driver::External(browser) => browser.restart(),
            Driver::Remote(proxy) => proxy.restart(),
        }
    }

    fn quit(&mut self) {
        match self {
            Driver::Automation(session) => session.quit(),
            Driver::External(browser) => browser.quit(),
            Driver::Remote(proxy) => proxy.quit(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_tab_urls_per_backend() {
        assert_eq!(Backend::Chrome.new_tab_url(), Some("chrome://new-tab-page"));
        assert_eq!(Backend::Firefox.new_tab_url(), Some("about:home"));
        assert_eq!(Backend::Links.new_tab_url(), None);
        assert_eq!(Backend::Remote.new_tab_url(), Some("biggerfish://new-tab"));
    }

    #[test]
    fn automation_classification() {
        assert!(Backend::Chrome.is_automation());
        assert!(Backend::Tor.is_automation());
        assert!(!Backend::Links.is_automation());
        assert!(!Backend::Remote.is_automation());
    }
}
