//! # Attacker Page Server
//!
//! Serves the static attacker page directory over HTTP for the in-page
//! instrumentation strategy. Script assets are always served as
//! `text/javascript` so the browser will execute them as workers, whatever
//! the filesystem says. Runs on its own thread for the life of the process.

use std::net::SocketAddr;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::thread::JoinHandle;

use anyhow::{Context, Result};
use axum::Router;
use axum::extract::{Path as UrlPath, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use tracing::{error, info};

pub struct PageServer {
    pub addr: SocketAddr,
    _handle: JoinHandle<()>,
}

/// Start serving `root` on `port` (0 picks a free port). The server thread
/// is detached; it lives until the process exits.
pub fn spawn(root: PathBuf, port: u16) -> Result<PageServer> {
    let (addr_tx, addr_rx) = crossbeam_channel::bounded(1);

    let handle = std::thread::spawn(move || {
        let runtime = match tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime,
            Err(err) => {
                error!("page server runtime failed to start: {err}");
                return;
            }
        };

        runtime.block_on(async move {
            let app = Router::new()
                .route("/", get(index))
                .route("/{*path}", get(asset))
                .with_state(Arc::new(root));

            let listener = match tokio::net::TcpListener::bind(("127.0.0.1", port)).await {
                Ok(listener) => listener,
                Err(err) => {
                    error!("page server failed to bind port {port}: {err}");
                    return;
                }
            };
            if let Ok(addr) = listener.local_addr() {
                info!("serving attacker page on http://{addr}");
                let _ = addr_tx.send(addr);
            }
            if let Err(err) = axum::serve(listener, app).await {
                error!("page server stopped: {err}");
            }
        });
    });

    let addr = addr_rx
        .recv_timeout(std::time::Duration::from_secs(5))
        .context("page server did not come up")?;

    Ok(PageServer {
        addr,
        _handle: handle,
    })
}

async fn index(State(root): State<Arc<PathBuf>>) -> Response {
    serve_file(&root, "index.html")
}

async fn asset(State(root): State<Arc<PathBuf>>, UrlPath(path): UrlPath<String>) -> Response {
    serve_file(&root, &path)
}

fn serve_file(root: &Path, rel: &str) -> Response {
    let rel_path = Path::new(rel);
    // Keep requests inside the served directory.
    if rel_path
        .components()
        .any(|c| !matches!(c, Component::Normal(_)))
    {
        return StatusCode::NOT_FOUND.into_response();
    }

    let path = root.join(rel_path);
    match std::fs::read(&path) {
        Ok(bytes) => {
            let mime = content_type(&path);
            ([(header::CONTENT_TYPE, mime)], bytes).into_response()
        }
        Err(_) => StatusCode::NOT_FOUND.into_response(),
    }
}

fn content_type(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        // Forced so the browser runs the asset as a worker script.
        Some("js") => "text/javascript",
        Some("html") => "text/html; charset=utf-8",
        Some("css") => "text/css",
        Some("json") => "application/json",
        Some("wasm") => "application/wasm",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn script_assets_get_the_scripting_mime_type() {
        assert_eq!(content_type(Path::new("worker.js")), "text/javascript");
        assert_eq!(
            content_type(Path::new("index.html")),
            "text/html; charset=utf-8"
        );
        assert_eq!(
            content_type(Path::new("blob.bin")),
            "application/octet-stream"
        );
    }

    #[test]
    fn serves_files_and_fixes_worker_content_type() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("index.html"), b"<html></html>").expect("write");
        std::fs::write(dir.path().join("worker.js"), b"onmessage = () => {};").expect("write");

        let server = spawn(dir.path().to_path_buf(), 0).expect("spawn");
        let client = reqwest::blocking::Client::new();

        let response = client
            .get(format!("http://{}/worker.js", server.addr))
            .send()
            .expect("fetch worker");
        assert_eq!(response.status(), 200);
        assert_eq!(
            response
                .headers()
                .get(header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok()),
            Some("text/javascript")
        );

        let response = client
            .get(format!("http://{}/", server.addr))
            .send()
            .expect("fetch index");
        assert_eq!(response.status(), 200);

        let response = client
            .get(format!("http://{}/../etc/passwd", server.addr))
            .send()
            .expect("fetch traversal");
        assert_ne!(response.status(), 200);
    }
}
