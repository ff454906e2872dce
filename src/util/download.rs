//! Source archive downloads into the shared cache.
//!
//! Archives are keyed by the file name of the final URL after redirects,
//! not by port, so two recipes naming the same file share one download.

use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use reqwest::blocking::Client;
use url::Url;

use crate::core::PortError;
use crate::util::fs::ensure_dir;
use crate::util::shell::{Shell, Status};

const CHUNK_SIZE: usize = 16 * 1024;

/// Blocking downloader with bounded per-URL retries.
#[derive(Debug, Clone)]
pub struct Downloader {
    client: Client,
    cache_dir: PathBuf,
    attempts: u32,
}

impl Downloader {
    pub fn new(cache_dir: impl Into<PathBuf>, attempts: u32) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("portbuild/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(30))
            .build()
            .context("failed to create HTTP client")?;

        Ok(Downloader {
            client,
            cache_dir: cache_dir.into(),
            attempts: attempts.max(1),
        })
    }

    /// Follow redirects with a HEAD request and return the final URL.
    ///
    /// Servers that refuse HEAD leave the URL as given.
    pub fn resolve(&self, url: &Url) -> Url {
        let original = url.clone();

        match self.client.head(original.clone()).send() {
            Ok(response) if response.status().is_success() => response.url().clone(),
            Ok(response) => {
                tracing::debug!("HEAD {} returned {}", url, response.status());
                original
            }
            Err(e) => {
                tracing::debug!("HEAD {} failed: {}", url, e);
                original
            }
        }
    }

    /// Fetch the first URL that succeeds, in order.
    pub fn fetch_any(&self, urls: &[String], shell: &Shell) -> Result<PathBuf> {
        let mut last_err = None;

        for url in urls {
            match self.fetch(url, shell) {
                Ok(path) => return Ok(path),
                Err(e) => {
                    shell.warn(format!("{:#}", e));
                    last_err = Some(e);
                }
            }
        }

        Err(last_err.unwrap_or_else(|| anyhow!("recipe declares no source URL")))
    }

    /// Download one URL into the cache, or reuse a cached file of the same name.
    pub fn fetch(&self, url: &str, shell: &Shell) -> Result<PathBuf> {
        let parsed = Url::parse(url).map_err(|e| PortError::DownloadFailed {
            url: url.to_string(),
            attempts: 0,
            reason: format!("invalid URL: {}", e),
        })?;
        let final_url = self.resolve(&parsed);
        let filename = archive_filename(&final_url).ok_or_else(|| PortError::DownloadFailed {
            url: url.to_string(),
            attempts: 0,
            reason: "URL does not name a file".to_string(),
        })?;
        let target = self.cache_dir.join(&filename);

        if target.exists() {
            shell.status(Status::Skipped, format!("{} (already downloaded)", filename));
            return Ok(target);
        }

        ensure_dir(&self.cache_dir)?;
        shell.status(Status::Downloading, final_url.as_str());

        let mut last_err = None;
        for attempt in 1..=self.attempts {
            match self.transfer(&final_url, &target, &filename, shell) {
                Ok(()) => {
                    tracing::info!("downloaded {} to {}", final_url, target.display());
                    return Ok(target);
                }
                Err(e) => {
                    tracing::warn!(
                        "download attempt {}/{} of {} failed: {:#}",
                        attempt,
                        self.attempts,
                        final_url,
                        e
                    );
                    last_err = Some(e);
                }
            }
        }

        Err(PortError::DownloadFailed {
            url: final_url.to_string(),
            attempts: self.attempts,
            reason: last_err
                .map(|e| format!("{:#}", e))
                .unwrap_or_else(|| "unknown error".to_string()),
        }
        .into())
    }

    /// One transfer into a temp file in the cache, renamed into place on success.
    fn transfer(&self, url: &Url, target: &Path, filename: &str, shell: &Shell) -> Result<()> {
        let mut response = self
            .client
            .get(url.clone())
            .send()
            .with_context(|| format!("failed to request {}", url))?;

        if !response.status().is_success() {
            bail!("HTTP {}", response.status());
        }

        let mut progress = shell.bytes_progress(filename, response.content_length());
        let mut tmp = tempfile::NamedTempFile::new_in(&self.cache_dir)
            .with_context(|| format!("failed to create temp file in {}", self.cache_dir.display()))?;

        let mut buffer = [0u8; CHUNK_SIZE];
        loop {
            let n = response
                .read(&mut buffer)
                .with_context(|| format!("failed to read response body from {}", url))?;
            if n == 0 {
                break;
            }
            tmp.write_all(&buffer[..n])
                .context("failed to write download to disk")?;
            progress.inc(n as u64);
        }
        progress.finish();

        tmp.persist(target)
            .with_context(|| format!("failed to move download into {}", target.display()))?;
        Ok(())
    }
}

/// Last non-empty path segment of a URL.
pub fn archive_filename(url: &Url) -> Option<String> {
    url.path_segments()?
        .filter(|s| !s.is_empty())
        .last()
        .map(str::to_string)
}
