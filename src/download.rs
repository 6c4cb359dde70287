//! Asset download worker (spec §4.J "Asset download", §5). The source
//! forks out-of-process workers polled by the main loop; the idiomatic
//! in-process equivalent is a `tokio::spawn` task per download guarded by
//! a semaphore, racing a timeout, reporting back over an mpsc channel the
//! main tick drains every iteration (see SPEC_FULL.md and DESIGN.md).

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::{Semaphore, mpsc};
use tracing::warn;

use crate::policy::limits;

pub struct DownloadRequest {
    pub queue_slot: u32,
    pub identity: String,
    pub url: String,
    pub name: String,
    pub dest: PathBuf,
}

pub struct DownloadResult {
    pub queue_slot: u32,
    pub identity: String,
    pub name: String,
    pub outcome: Result<(PathBuf, u64), String>,
}

pub struct DownloadWorkers {
    semaphore: Arc<Semaphore>,
    tx: mpsc::UnboundedSender<DownloadResult>,
    rx: mpsc::UnboundedReceiver<DownloadResult>,
}

impl DownloadWorkers {
    pub fn new() -> DownloadWorkers {
        let (tx, rx) = mpsc::unbounded_channel();
        DownloadWorkers { semaphore: Arc::new(Semaphore::new(limits::MAX_CONCURRENT_DOWNLOADS)), tx, rx }
    }

    pub fn spawn(&self, req: DownloadRequest) {
        let semaphore = self.semaphore.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let _permit = semaphore.acquire_owned().await.expect("semaphore never closed");
            let outcome = tokio::time::timeout(limits::DOWNLOAD_TIMEOUT, fetch(&req.url, &req.dest)).await;
            let outcome = match outcome {
                Ok(Ok(size)) => Ok((req.dest.clone(), size)),
                Ok(Err(msg)) => Err(msg),
                Err(_) => Err("download timed out".into()),
            };
            let _ = tx.send(DownloadResult {
                queue_slot: req.queue_slot,
                identity: req.identity,
                name: req.name,
                outcome,
            });
        });
    }

    /// Drains completed downloads without blocking; called every main
    /// loop tick (spec §5 "the main loop observes these via non-blocking
    /// wait").
    pub fn poll_completed(&mut self) -> Vec<DownloadResult> {
        let mut out = Vec::new();
        while let Ok(result) = self.rx.try_recv() {
            out.push(result);
        }
        out
    }
}

impl Default for DownloadWorkers {
    fn default() -> Self {
        DownloadWorkers::new()
    }
}

async fn fetch(url: &str, dest: &std::path::Path) -> Result<u64, String> {
    let response = reqwest::get(url).await.map_err(|e| format!("request failed: {e}"))?;
    if !response.status().is_success() {
        return Err(format!("server returned {}", response.status()));
    }
    if let Some(len) = response.content_length()
        && len > limits::MAX_ASSET_BYTES
    {
        return Err(format!("asset too large ({len} bytes, max {})", limits::MAX_ASSET_BYTES));
    }

    let bytes = response.bytes().await.map_err(|e| format!("reading response body: {e}"))?;
    if bytes.len() as u64 > limits::MAX_ASSET_BYTES {
        return Err(format!("asset too large ({} bytes, max {})", bytes.len(), limits::MAX_ASSET_BYTES));
    }
    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(|e| format!("creating asset directory: {e}"))?;
    }
    tokio::fs::write(dest, &bytes).await.map_err(|e| format!("writing asset file: {e}"))?;
    Ok(bytes.len() as u64)
}

/// Validates the add request's URL per spec §7 `ValidationError` rules:
/// scheme must be http/https, length ≤ 500, host must not be a
/// private-network address.
pub fn validate_url(url: &str) -> Result<(), String> {
    if url.len() > 500 {
        return Err("URL too long".into());
    }
    let parsed = url::Url::parse(url).map_err(|e| format!("invalid URL: {e}"))?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err("URL scheme must be http or https".into());
    }
    if let Some(host) = parsed.host_str() {
        if let Ok(ip) = host.parse::<std::net::IpAddr>() {
            if is_private(&ip) {
                return Err("URL host resolves to a private network address".into());
            }
        } else if host == "localhost" {
            return Err("URL host resolves to a private network address".into());
        }
    }
    Ok(())
}

fn is_private(ip: &std::net::IpAddr) -> bool {
    match ip {
        std::net::IpAddr::V4(v4) => {
            v4.is_private() || v4.is_loopback() || v4.is_link_local() || v4.is_unspecified()
        }
        std::net::IpAddr::V6(v6) => v6.is_loopback() || v6.is_unspecified(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_http_scheme() {
        assert!(validate_url("ftp://example.com/x.mp3").is_err());
    }

    #[test]
    fn rejects_private_host() {
        assert!(validate_url("http://127.0.0.1/x.mp3").is_err());
        assert!(validate_url("http://localhost/x.mp3").is_err());
    }

    #[test]
    fn accepts_plain_https_url() {
        assert!(validate_url("https://example.com/x.mp3").is_ok());
    }

    #[test]
    fn rejects_overlong_url() {
        let long = format!("https://example.com/{}", "a".repeat(500));
        assert!(validate_url(&long).is_err());
    }
}
