//! Download protocol state machine.
//!
//! ```text
//! Unstarted → RequestSent → MetadataFetched → Validated
//!                → ChunksDownloading → Finalized
//! ```
//!
//! `Failed` is reachable from any state. Any fetch or decrypt failure
//! aborts the download immediately — no skip-and-continue; partially
//! written output is not cleaned up.

use std::collections::HashMap;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use sft_core::types::{DownloadSession, FileRecord, FileStatus, TransferMetadata};
use sft_core::{SftError, SftResult};
use sft_crypto::{decode_secret, open_with_material};

use crate::api::ApiClient;
use crate::link::parse_link;
use crate::ProgressFn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadPhase {
    Unstarted,
    RequestSent,
    MetadataFetched,
    Validated,
    ChunksDownloading,
    Finalized,
    Failed,
}

/// A file known to the transfer, enriched with its download counts from the
/// validate step.
#[derive(Debug, Clone)]
pub struct FileEntry {
    pub record: FileRecord,
    pub download_count: u64,
    pub remaining_count: u64,
}

/// Everything learned from steps 1–4: session, decrypted metadata, and
/// per-file validation info. Enough to list files without fetching content.
#[derive(Debug)]
pub struct Listing {
    pub session: DownloadSession,
    pub description: String,
    pub files: Vec<FileEntry>,
}

pub struct Downloader<'a> {
    api: &'a ApiClient,
    phase: DownloadPhase,
}

impl<'a> Downloader<'a> {
    pub fn new(api: &'a ApiClient) -> Self {
        Self {
            api,
            phase: DownloadPhase::Unstarted,
        }
    }

    pub fn phase(&self) -> DownloadPhase {
        self.phase
    }

    fn advance(&mut self, next: DownloadPhase) {
        debug!(from = ?self.phase, to = ?next, "download phase");
        self.phase = next;
    }

    /// Steps 1–4: parse the link, request a session, fetch and open the
    /// metadata, validate the files.
    pub async fn fetch_listing(&mut self, link: &str) -> SftResult<Listing> {
        match self.drive_listing(link).await {
            Ok(listing) => Ok(listing),
            Err(e) => {
                self.advance(DownloadPhase::Failed);
                Err(e)
            }
        }
    }

    async fn drive_listing(&mut self, link: &str) -> SftResult<Listing> {
        let (transfer_id, secret) = parse_link(link)?;
        // Decode before any network call: a malformed secret is an input
        // error, not a protocol one.
        let material = decode_secret(&secret)?;

        let session = self.api.request_download(&transfer_id).await?;
        self.advance(DownloadPhase::RequestSent);

        let blob = self.api.fetch_metadata(&session).await?;
        let plaintext = open_with_material(&blob, &material)?;
        let metadata: TransferMetadata = serde_json::from_slice(&plaintext)
            .map_err(|e| SftError::Encoding(format!("metadata decode: {e}")))?;
        self.advance(DownloadPhase::MetadataFetched);
        info!(
            transfer_id = %transfer_id,
            files = metadata.files.len(),
            "metadata opened"
        );

        // One canonical id per file: its first chunk. Files without chunks
        // (zero-byte uploads) have nothing to validate.
        let ids: Vec<String> = metadata
            .files
            .iter()
            .filter_map(|f| f.chunks.first().map(|c| c.id.clone()))
            .collect();
        let statuses = if ids.is_empty() {
            Vec::new()
        } else {
            self.api.validate_files(&session, ids).await?
        };
        let files = correlate(&metadata.files, &statuses)?;
        self.advance(DownloadPhase::Validated);

        Ok(Listing {
            session,
            description: metadata.description,
            files,
        })
    }

    /// Steps 5–6: fetch, open, and append every chunk in stored order, then
    /// report the consumed chunk ids. Returns the written paths.
    pub async fn download_all(
        &mut self,
        listing: &Listing,
        out_dir: &Path,
        progress: Option<&ProgressFn>,
    ) -> SftResult<Vec<PathBuf>> {
        match self.drive_download(listing, out_dir, progress).await {
            Ok(written) => Ok(written),
            Err(e) => {
                self.advance(DownloadPhase::Failed);
                Err(e)
            }
        }
    }

    async fn drive_download(
        &mut self,
        listing: &Listing,
        out_dir: &Path,
        progress: Option<&ProgressFn>,
    ) -> SftResult<Vec<PathBuf>> {
        self.advance(DownloadPhase::ChunksDownloading);
        let total_chunks: u64 = listing
            .files
            .iter()
            .map(|e| e.record.chunks.len() as u64)
            .sum();

        let mut written = Vec::with_capacity(listing.files.len());
        let mut done_chunks = 0u64;
        for entry in &listing.files {
            let path = self
                .download_one_file(
                    &listing.session,
                    &entry.record,
                    out_dir,
                    &mut done_chunks,
                    total_chunks,
                    progress,
                )
                .await?;
            written.push(path);
        }

        // Finalize is informational only: report what was consumed, but
        // never fail a download that already succeeded.
        let consumed: Vec<String> = listing
            .files
            .iter()
            .flat_map(|e| e.record.chunks.iter().map(|c| c.id.clone()))
            .collect();
        match self.api.finalize_download(&listing.session, consumed).await {
            Ok(response) => {
                debug!(valid = response.transfer_is_valid, "download finalized")
            }
            Err(e) => warn!(error = %e, "finalize failed; download is already complete"),
        }
        self.advance(DownloadPhase::Finalized);
        Ok(written)
    }

    async fn download_one_file(
        &self,
        session: &DownloadSession,
        record: &FileRecord,
        out_dir: &Path,
        done_chunks: &mut u64,
        total_chunks: u64,
        progress: Option<&ProgressFn>,
    ) -> SftResult<PathBuf> {
        let target = unique_target_path(out_dir, &record.name)?;
        info!(
            name = %record.name,
            target = %target.display(),
            chunks = record.chunks.len(),
            "downloading file"
        );

        let mut out = File::create(&target)?;
        // Strictly in stored order: chunk ids carry no position, and a
        // reordered fetch would corrupt the file without any tamper signal.
        for chunk in &record.chunks {
            let ciphertext = self.api.fetch_chunk(session, &chunk.id).await?;
            let material = decode_secret(&chunk.secret)?;
            let plaintext = open_with_material(&ciphertext, &material)?;
            out.write_all(&plaintext)?;
            *done_chunks += 1;
            if let Some(callback) = progress {
                callback(*done_chunks, total_chunks, &record.name);
            }
        }
        out.flush()?;
        Ok(target)
    }
}

/// Correlate validate responses to files by first-chunk id — never by
/// response order, which the server does not guarantee.
///
/// Relies on first-chunk ids being unique across files; they are
/// server-assigned and the service has never been observed to reuse them,
/// but that guarantee is the server's, not ours.
pub fn correlate(files: &[FileRecord], statuses: &[FileStatus]) -> SftResult<Vec<FileEntry>> {
    let by_id: HashMap<&str, &FileStatus> =
        statuses.iter().map(|s| (s.id.as_str(), s)).collect();

    let mut entries = Vec::with_capacity(files.len());
    for file in files {
        match file.chunks.first() {
            Some(first) => {
                let status = by_id.get(first.id.as_str()).ok_or_else(|| {
                    SftError::Encoding(format!(
                        "validate response is missing file {}",
                        file.name
                    ))
                })?;
                entries.push(FileEntry {
                    record: file.clone(),
                    download_count: status.download_count,
                    remaining_count: status.remaining_count,
                });
            }
            // Zero-byte file: nothing was validated, nothing to count.
            None => entries.push(FileEntry {
                record: file.clone(),
                download_count: 0,
                remaining_count: 0,
            }),
        }
    }
    Ok(entries)
}

/// Pick a target path that does not clobber an existing file:
/// `name.ext`, `name_1.ext`, `name_2.ext`, ...
pub fn unique_target_path(dir: &Path, name: &str) -> SftResult<PathBuf> {
    // Use only the final component; metadata names are attacker-adjacent.
    let base = Path::new(name)
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| SftError::Input(format!("unusable file name in metadata: {name}")))?;

    let candidate = dir.join(base);
    if !candidate.exists() {
        return Ok(candidate);
    }

    let (stem, ext) = match base.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem.to_string(), format!(".{ext}")),
        _ => (base.to_string(), String::new()),
    };
    let mut counter = 1u32;
    loop {
        let candidate = dir.join(format!("{stem}_{counter}{ext}"));
        if !candidate.exists() {
            return Ok(candidate);
        }
        counter += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sft_core::types::ChunkRef;

    fn record(name: &str, chunk_ids: &[&str]) -> FileRecord {
        FileRecord {
            name: name.to_string(),
            size: 0,
            chunks: chunk_ids
                .iter()
                .map(|id| ChunkRef {
                    id: id.to_string(),
                    secret: "unused".to_string(),
                })
                .collect(),
            content_type: "application/octet-stream".to_string(),
        }
    }

    fn status(id: &str, download_count: u64, remaining: u64) -> FileStatus {
        FileStatus {
            id: id.to_string(),
            valid: true,
            download_count,
            remaining_count: remaining,
        }
    }

    #[test]
    fn correlates_by_id_not_by_order() {
        let files = vec![record("a", &["id-a", "id-a2"]), record("b", &["id-b"])];
        // Responses deliberately out of order.
        let statuses = vec![status("id-b", 5, 1), status("id-a", 2, 3)];

        let entries = correlate(&files, &statuses).unwrap();
        assert_eq!(entries[0].record.name, "a");
        assert_eq!(entries[0].download_count, 2);
        assert_eq!(entries[0].remaining_count, 3);
        assert_eq!(entries[1].record.name, "b");
        assert_eq!(entries[1].download_count, 5);
    }

    #[test]
    fn missing_response_is_an_encoding_error() {
        let files = vec![record("a", &["id-a"])];
        let result = correlate(&files, &[]);
        assert!(matches!(result, Err(SftError::Encoding(_))));
    }

    #[test]
    fn chunkless_file_gets_zero_counts() {
        let files = vec![record("empty", &[])];
        let entries = correlate(&files, &[]).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].remaining_count, 0);
    }

    #[tokio::test]
    async fn fetch_listing_with_malformed_link_moves_to_failed() {
        let config = sft_core::config::SftConfig::default();
        let api = ApiClient::new(&config).unwrap();
        let mut downloader = Downloader::new(&api);
        assert_eq!(downloader.phase(), DownloadPhase::Unstarted);

        // Rejected at link parsing, before any request is made.
        let result = downloader.fetch_listing("not a share link").await;
        assert!(matches!(result, Err(SftError::Input(_))));
        assert_eq!(downloader.phase(), DownloadPhase::Failed);
    }

    #[tokio::test]
    async fn fetch_listing_with_undecodable_secret_moves_to_failed() {
        let config = sft_core::config::SftConfig::default();
        let api = ApiClient::new(&config).unwrap();
        let mut downloader = Downloader::new(&api);

        // Parses as a link, but the fragment is not a valid secret; still
        // rejected before any request is made.
        let result = downloader
            .fetch_listing("https://filetransfer.kpn.com/download/9f8e7d#short")
            .await;
        assert!(matches!(result, Err(SftError::Input(_))));
        assert_eq!(downloader.phase(), DownloadPhase::Failed);
    }

    #[test]
    fn unique_target_path_avoids_collisions() {
        let dir = tempfile::tempdir().unwrap();
        let first = unique_target_path(dir.path(), "report.txt").unwrap();
        assert_eq!(first, dir.path().join("report.txt"));
        std::fs::write(&first, b"x").unwrap();

        let second = unique_target_path(dir.path(), "report.txt").unwrap();
        assert_eq!(second, dir.path().join("report_1.txt"));
        std::fs::write(&second, b"x").unwrap();

        let third = unique_target_path(dir.path(), "report.txt").unwrap();
        assert_eq!(third, dir.path().join("report_2.txt"));
    }

    #[test]
    fn unique_target_path_without_extension() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("README"), b"x").unwrap();
        let next = unique_target_path(dir.path(), "README").unwrap();
        assert_eq!(next, dir.path().join("README_1"));
    }

    #[test]
    fn unique_target_path_strips_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = unique_target_path(dir.path(), "../../etc/passwd").unwrap();
        assert_eq!(path, dir.path().join("passwd"));
    }
}
