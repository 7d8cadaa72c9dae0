//! External-process driver for browsers without an automation layer or an
//! address bar (e.g. a text-mode terminal browser). Navigation kills any
//! previous instance, clears the terminal, and launches a fresh process
//! pointed at the target.

use std::io::Write;
use std::process::{Child, Command, Stdio};

use tracing::{debug, warn};

use super::{Browser, DriverError, NavStatus};

pub struct ExternalBrowser {
    binary: String,
    child: Option<Child>,
}

impl ExternalBrowser {
    pub fn new(binary: &str) -> Self {
        Self {
            binary: binary.to_string(),
            child: None,
        }
    }

    fn kill(&mut self) {
        if let Some(mut child) = self.child.take() {
            if let Err(err) = child.kill() {
                debug!("killing {} failed: {err}", self.binary);
            }
            let _ = child.wait();
        }
    }

    fn clear_terminal(&self) {
        let mut stdout = std::io::stdout();
        let _ = stdout.write_all(b"\x1b[2J\x1b[H");
        let _ = stdout.flush();
    }
}

impl Browser for ExternalBrowser {
    fn navigate(&mut self, url: &str) -> Result<NavStatus, DriverError> {
        self.kill();
        self.clear_terminal();
        let child = Command::new(&self.binary)
            .arg(url)
            .stdin(Stdio::null())
            .spawn()?;
        self.child = Some(child);
        // The process renders for as long as it lives; there is no load
        // completion signal to wait for.
        Ok(NavStatus::Loaded)
    }

    fn set_load_timeout(&mut self, _seconds: u64) -> Result<(), DriverError> {
        Ok(())
    }

    fn new_tab(&mut self) {
        // No address bar, no neutral page.
    }

    fn restart(&mut self) -> Result<(), DriverError> {
        self.kill();
        Ok(())
    }

    fn quit(&mut self) {
        self.kill();
    }
}

impl Drop for ExternalBrowser {
    fn drop(&mut self) {
        if self.child.is_some() {
            warn!("external browser still running at drop; killing it");
            self.kill();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn navigate_spawns_and_restart_kills() {
        // `sleep` stands in for the browser binary.
        let mut browser = ExternalBrowser::new("sleep");
        browser.navigate("30").expect("spawn");
        assert!(browser.child.is_some());
        browser.restart().expect("restart");
        assert!(browser.child.is_none());
    }

    #[test]
    fn missing_binary_is_an_error() {
        let mut browser = ExternalBrowser::new("definitely-not-a-browser-binary");
        assert!(browser.navigate("https://example.com").is_err());
    }
}
