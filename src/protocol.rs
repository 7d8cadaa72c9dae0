//! # Remote Control Protocol
//!
//! Line-oriented text protocol between the collector and a receiver process
//! driving a browser on another host. Each message is one UTF-8 line: either
//! a bare URL to navigate to, or a `biggerfish://` pseudo-URL carrying a
//! control action.

use thiserror::Error;

pub const SCHEME: &str = "biggerfish";

/// Default TCP port the receiver listens on.
pub const DEFAULT_PORT: u16 = 1234;

/// Pseudo-URL a collector sends in place of a navigation to request the
/// receiver browser's neutral new-tab page.
pub const NEW_TAB_URL: &str = "biggerfish://new-tab";

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("unknown control action: {0}")]
    UnknownAction(String),
    #[error("malformed control message: {0}")]
    Malformed(String),
}

/// A decoded protocol message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// Navigate the receiver's browser to this URL.
    Navigate(String),
    /// Discard and recreate the receiver's browser.
    Restart,
    /// Set the receiver browser's page-load timeout, in seconds.
    SetTimeout(u64),
    /// Navigate to the receiver browser's neutral new-tab location.
    NewTab,
}

impl Message {
    /// Parse one line (without its trailing newline).
    pub fn parse(line: &str) -> Result<Message, ProtocolError> {
        let Some(rest) = line.strip_prefix("biggerfish://") else {
            return Ok(Message::Navigate(line.to_string()));
        };

        let (action, path) = match rest.split_once('/') {
            Some((action, path)) => (action, Some(path)),
            None => (rest, None),
        };

        match (action, path) {
            ("restart", None) => Ok(Message::Restart),
            ("new-tab", None) => Ok(Message::NewTab),
            ("set-timeout", Some(value)) => {
                let seconds = value
                    .parse::<u64>()
                    .map_err(|_| ProtocolError::Malformed(line.to_string()))?;
                Ok(Message::SetTimeout(seconds))
            }
            ("set-timeout", None) => Err(ProtocolError::Malformed(line.to_string())),
            _ => Err(ProtocolError::UnknownAction(action.to_string())),
        }
    }

    /// Encode as one wire line, including the terminating newline.
    pub fn encode(&self) -> String {
        match self {
            Message::Navigate(url) => format!("{url}\n"),
            Message::Restart => format!("{SCHEME}://restart\n"),
            Message::SetTimeout(seconds) => format!("{SCHEME}://set-timeout/{seconds}\n"),
            Message::NewTab => format!("{SCHEME}://new-tab\n"),
        }
    }
}
