//! # WebDriver Automation Sessions
//!
//! A minimal client for the W3C WebDriver wire protocol, enough to drive
//! page loads and run scripts in the hosted attacker page. A wire-level
//! `timeout` error is the expected outcome when the capture window is
//! shorter than the page's full load time; `invalid session id` means the
//! browser died underneath us and the session is fatal.

use std::time::Duration;

use serde_json::{Value, json};
use tracing::{debug, warn};

use super::{Backend, Browser, DriverError, NavStatus};

/// WebDriver error codes we classify specially.
const ERROR_TIMEOUT: &str = "timeout";
const ERROR_INVALID_SESSION: &str = "invalid session id";

pub struct WebDriverSession {
    client: reqwest::blocking::Client,
    endpoint: String,
    backend: Backend,
    session_id: String,
    load_timeout: Option<u64>,
}

/// A decoded WebDriver error body.
struct WireFault {
    error: String,
    message: String,
}

impl WebDriverSession {
    /// Create a new session against `endpoint` (e.g. a local chromedriver).
    pub fn new(endpoint: &str, backend: Backend) -> Result<Self, DriverError> {
        // Wire calls must be allowed to outlast any page-load timeout; the
        // browser-side timeout is the one that governs.
        let client = reqwest::blocking::Client::builder()
            .timeout(None::<Duration>)
            .build()
            .map_err(|err| DriverError::Transport(err.to_string()))?;

        let endpoint = endpoint.trim_end_matches('/').to_string();
        let body = json!({ "capabilities": { "alwaysMatch": capabilities(backend) } });
        let value = post(&client, &format!("{endpoint}/session"), &body)
            .map_err(fault_to_error)?;

        let session_id = value
            .get("sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| DriverError::Protocol("missing sessionId in session response".into()))?
            .to_string();

        debug!("webdriver session {session_id} started for {backend:?}");
        Ok(Self {
            client,
            endpoint,
            backend,
            session_id,
            load_timeout: None,
        })
    }

    fn session_url(&self, suffix: &str) -> String {
        format!("{}/session/{}{suffix}", self.endpoint, self.session_id)
    }

    /// Run a script synchronously in the current page and return its value.
    pub fn execute(&self, script: &str) -> Result<Value, DriverError> {
        let body = json!({ "script": script, "args": [] });
        post(&self.client, &self.session_url("/execute/sync"), &body).map_err(fault_to_error)
    }

    fn delete_session(&self) {
        let url = self.session_url("");
        if let Err(err) = self.client.delete(&url).send() {
            debug!("webdriver session delete failed: {err}");
        }
    }

    fn apply_load_timeout(&self) -> Result<(), DriverError> {
        if let Some(seconds) = self.load_timeout {
            let body = json!({ "pageLoad": seconds.saturating_mul(1000) });
            post(&self.client, &self.session_url("/timeouts"), &body).map_err(fault_to_error)?;
        }
        Ok(())
    }
}

impl Browser for WebDriverSession {
    fn navigate(&mut self, url: &str) -> Result<NavStatus, DriverError> {
        let body = json!({ "url": url });
        match post(&self.client, &self.session_url("/url"), &body) {
            Ok(_) => Ok(NavStatus::Loaded),
            Err(PostError::Fault(fault)) if fault.error == ERROR_TIMEOUT => {
                Ok(NavStatus::TimedOut)
            }
            Err(err) => Err(fault_to_error(err)),
        }
    }

    fn set_load_timeout(&mut self, seconds: u64) -> Result<(), DriverError> {
        self.load_timeout = Some(seconds);
        self.apply_load_timeout()
    }

    fn new_tab(&mut self) {
        if let Some(url) = self.backend.new_tab_url() {
            if let Err(err) = self.navigate(url) {
                debug!("neutral navigation failed: {err}");
            }
        }
    }

    fn restart(&mut self) -> Result<(), DriverError> {
        self.delete_session();
        let fresh = WebDriverSession::new(&self.endpoint, self.backend)?;
        self.session_id = fresh.session_id;
        self.apply_load_timeout()
    }

    fn quit(&mut self) {
        self.delete_session();
    }
}

enum PostError {
    Transport(String),
    Fault(WireFault),
    Protocol(String),
}

fn fault_to_error(err: PostError) -> DriverError {
    match err {
        PostError::Transport(message) => DriverError::Transport(message),
        PostError::Protocol(message) => DriverError::Protocol(message),
        PostError::Fault(fault) if fault.error == ERROR_INVALID_SESSION => {
            DriverError::SessionInvalidated
        }
        PostError::Fault(fault) => DriverError::Wire {
            error: fault.error,
            message: fault.message,
        },
    }
}

/// POST a command and return the `value` field of the response, or the
/// decoded wire fault on a non-success status.
fn post(client: &reqwest::blocking::Client, url: &str, body: &Value) -> Result<Value, PostError> {
    let response = client
        .post(url)
        .json(body)
        .send()
        .map_err(|err| PostError::Transport(err.to_string()))?;

    let status = response.status();
    let payload: Value = response
        .json()
        .map_err(|err| PostError::Protocol(format!("undecodable webdriver response: {err}")))?;
    let value = payload.get("value").cloned().unwrap_or(Value::Null);

    if status.is_success() {
        return Ok(value);
    }

    let error = value
        .get("error")
        .and_then(Value::as_str)
        .unwrap_or("unknown")
        .to_string();
    let message = value
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    if error == "unknown" {
        warn!("webdriver returned {status} without an error code");
    }
    Err(PostError::Fault(WireFault { error, message }))
}

fn capabilities(backend: Backend) -> Value {
    match backend {
        Backend::Chrome | Backend::ChromeHeadless => {
            let mut args = vec![
                "--disable-dev-shm-usage",
                "--ignore-ssl-errors",
                "--ignore-certificate-errors",
            ];
            if backend == Backend::ChromeHeadless {
                args.push("--headless=new");
            }
            json!({
                "browserName": "chrome",
                "goog:chromeOptions": { "args": args },
            })
        }
        Backend::Firefox | Backend::Tor => json!({ "browserName": "firefox" }),
        Backend::Safari => json!({ "browserName": "safari" }),
        Backend::Edge => json!({ "browserName": "MicrosoftEdge" }),
        // Links and Remote never reach the automation variant.
        Backend::Links | Backend::Remote => json!({}),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chrome_headless_capabilities_carry_headless_flag() {
        let caps = capabilities(Backend::ChromeHeadless);
        let args = caps["goog:chromeOptions"]["args"]
            .as_array()
            .expect("args");
        assert!(args.iter().any(|a| a == "--headless=new"));
    }

    #[test]
    fn chrome_capabilities_have_no_headless_flag() {
        let caps = capabilities(Backend::Chrome);
        let args = caps["goog:chromeOptions"]["args"]
            .as_array()
            .expect("args");
        assert!(!args.iter().any(|a| a == "--headless=new"));
    }

    #[test]
    fn timeout_fault_classifies_as_expected_timeout() {
        let err = PostError::Fault(WireFault {
            error: ERROR_INVALID_SESSION.to_string(),
            message: "gone".to_string(),
        });
        assert!(matches!(
            fault_to_error(err),
            DriverError::SessionInvalidated
        ));
    }
}
