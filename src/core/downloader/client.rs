use std::path::{Path, PathBuf};

use futures_util::stream::{self, StreamExt};
use reqwest::Client;
use sha1::{Digest, Sha1};
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::core::error::{InstallError, InstallResult};

/// A single file to download with optional SHA-1 for validation.
#[derive(Debug, Clone)]
pub struct DownloadEntry {
    pub url: String,
    pub dest: PathBuf,
    pub sha1: Option<String>,
    pub size: Option<u64>,
}

/// Streaming downloader shared by installers and the mod pipeline.
///
/// Bodies are streamed to `<dest>.part` and renamed onto `dest` only after
/// the last byte is flushed, so an interrupted download never leaves a
/// truncated file at the final path.
#[derive(Clone)]
pub struct Downloader {
    client: Client,
    /// Maximum number of parallel downloads in [`Downloader::download_batch`].
    concurrency: usize,
    /// Write buffer size; the file is written in chunks of this size.
    chunk_size: usize,
}

impl Downloader {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            concurrency: 8,
            chunk_size: 8192,
        }
    }

    pub fn with_concurrency(mut self, n: usize) -> Self {
        self.concurrency = n.max(1);
        self
    }

    pub fn with_chunk_size(mut self, n: usize) -> Self {
        self.chunk_size = n.max(512);
        self
    }

    // ── Single file download ────────────────────────────

    /// Download `url` to `dest`. Returns the number of bytes written.
    pub async fn download_to_file(
        &self,
        url: &str,
        dest: &Path,
        cancel: &CancellationToken,
    ) -> InstallResult<u64> {
        self.download_verified(url, dest, None, cancel).await
    }

    /// Same as [`Downloader::download_to_file`], rejecting the file when its
    /// SHA-1 does not match `sha1_expected`.
    pub async fn download_verified(
        &self,
        url: &str,
        dest: &Path,
        sha1_expected: Option<&str>,
        cancel: &CancellationToken,
    ) -> InstallResult<u64> {
        if cancel.is_cancelled() {
            return Err(InstallError::Cancelled);
        }

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| InstallError::io(parent, e))?;
        }

        let part = part_path(dest);
        let result = self.stream_to(url, &part, sha1_expected, cancel).await;

        let written = match result {
            Ok(written) => written,
            Err(e) => {
                let _ = tokio::fs::remove_file(&part).await;
                return Err(e);
            }
        };

        tokio::fs::rename(&part, dest)
            .await
            .map_err(|e| InstallError::io(dest, e))?;

        debug!("Downloaded: {} -> {:?} ({} bytes)", url, dest, written);
        Ok(written)
    }

    async fn stream_to(
        &self,
        url: &str,
        part: &Path,
        sha1_expected: Option<&str>,
        cancel: &CancellationToken,
    ) -> InstallResult<u64> {
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(InstallError::Network(format!(
                "download of {} failed: HTTP {}",
                url,
                status.as_u16()
            )));
        }

        let file = tokio::fs::File::create(part)
            .await
            .map_err(|e| InstallError::io(part, e))?;
        let mut writer = BufWriter::with_capacity(self.chunk_size, file);
        let mut hasher = Sha1::new();
        let mut written = 0u64;

        let mut body = response.bytes_stream();
        while let Some(chunk) = body.next().await {
            if cancel.is_cancelled() {
                return Err(InstallError::Cancelled);
            }
            let chunk = chunk?;
            hasher.update(&chunk);
            writer
                .write_all(&chunk)
                .await
                .map_err(|e| InstallError::io(part, e))?;
            written += chunk.len() as u64;
        }

        writer.flush().await.map_err(|e| InstallError::io(part, e))?;
        writer
            .into_inner()
            .sync_all()
            .await
            .map_err(|e| InstallError::io(part, e))?;

        if let Some(expected) = sha1_expected {
            let actual = hex::encode(hasher.finalize());
            if !actual.eq_ignore_ascii_case(expected) {
                return Err(InstallError::Sha1Mismatch {
                    path: part.to_path_buf(),
                    expected: expected.to_string(),
                    actual,
                });
            }
        }

        Ok(written)
    }

    // ── Batch concurrent downloads ──────────────────────

    /// Download many files concurrently using `buffer_unordered`.
    ///
    /// `on_finished` runs once per entry, success or not. Returns the
    /// entries that failed.
    pub async fn download_batch<F>(
        &self,
        entries: Vec<DownloadEntry>,
        cancel: &CancellationToken,
        on_finished: F,
    ) -> Vec<(DownloadEntry, InstallError)>
    where
        F: Fn(&DownloadEntry),
    {
        info!(
            "Starting batch download: {} files, concurrency={}",
            entries.len(),
            self.concurrency
        );

        let on_finished = &on_finished;
        let results: Vec<_> = stream::iter(entries)
            .map(|entry| async move {
                let result = self
                    .download_verified(&entry.url, &entry.dest, entry.sha1.as_deref(), cancel)
                    .await;
                on_finished(&entry);
                (entry, result)
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        results
            .into_iter()
            .filter_map(|(entry, result)| result.err().map(|e| (entry, e)))
            .collect()
    }
}

fn part_path(dest: &Path) -> PathBuf {
    let mut name = dest
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".part");
    dest.with_file_name(name)
}
