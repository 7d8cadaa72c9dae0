//! # Remote Receiver
//!
//! Server side of the remote control protocol: listens on a fixed port,
//! accepts exactly one collector connection, and drives its managed browser
//! from the line stream. Reads go through a buffered reader so a message
//! spanning two TCP reads is reassembled instead of split.

use std::io::BufRead;
use std::io::BufReader;
use std::net::{TcpListener, TcpStream};

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::driver::Browser;
use crate::protocol::Message;

/// Bind the receiver port and serve one collector connection to completion.
pub fn run<B: Browser>(port: u16, browser: &mut B) -> Result<()> {
    let listener = TcpListener::bind(("0.0.0.0", port))
        .with_context(|| format!("binding receiver port {port}"))?;
    info!("waiting for a collector connection on port {port}");

    let (stream, peer) = listener.accept().context("accepting collector connection")?;
    info!("collector connected from {peer}");

    serve_connection(stream, browser)
}

/// Process protocol lines until the collector closes the connection, then
/// tear the browser down.
pub fn serve_connection<B: Browser>(stream: TcpStream, browser: &mut B) -> Result<()> {
    let mut reader = BufReader::new(stream);
    let mut line = String::new();

    loop {
        line.clear();
        let read = reader.read_line(&mut line).context("reading from collector")?;
        if read == 0 {
            info!("collector disconnected; quitting browser");
            browser.quit();
            return Ok(());
        }

        let trimmed = line.trim_end_matches(['\n', '\r']);
        if trimmed.is_empty() {
            continue;
        }

        match Message::parse(trimmed) {
            Ok(Message::Navigate(url)) => {
                // Best-effort: the collector's capture window bounds the
                // run whether or not the load completes.
                if let Err(err) = browser.navigate(&url) {
                    debug!("navigation to {url} failed: {err}");
                }
            }
            Ok(Message::Restart) => {
                if let Err(err) = browser.restart() {
                    warn!("browser restart failed: {err}");
                }
            }
            Ok(Message::SetTimeout(seconds)) => {
                if let Err(err) = browser.set_load_timeout(seconds) {
                    warn!("setting load timeout failed: {err}");
                }
            }
            Ok(Message::NewTab) => browser.new_tab(),
            Err(err) => warn!("ignoring message: {err}"),
        }
    }
}
