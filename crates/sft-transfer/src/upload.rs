//! Upload protocol state machine.
//!
//! ```text
//! Unstarted → RequestSent → ChunksUploading → MetadataUploading → Done
//!                                  └──────────── Failed ────────────┘
//! ```
//!
//! `Failed` is reachable from any state on the first non-success response
//! or transport error, and aborts the whole operation. There is no
//! partial-upload resume: callers retry the entire transfer.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use sft_chunks::{chunk_count, FixedChunker, CHUNK_SIZE};
use sft_core::config::SftConfig;
use sft_core::types::{ChunkRef, FileRecord, TransferMetadata, UploadSession};
use sft_core::{SftError, SftResult};
use sft_crypto::{encode_secret, seal_with_fresh_material};

use crate::api::ApiClient;
use crate::content_type::{sniff_content_type, SNIFF_LEN};
use crate::link::compose_link;
use crate::wire::UploadParameters;
use crate::ProgressFn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadPhase {
    Unstarted,
    RequestSent,
    ChunksUploading,
    MetadataUploading,
    Done,
    Failed,
}

#[derive(Debug)]
pub struct UploadOutcome {
    /// The shareable link: `<service>/download/<transfer-id>#<secret>`
    pub link: String,
    pub transfer_id: String,
    pub files: Vec<FileRecord>,
    pub total_bytes: u64,
}

pub struct Uploader<'a> {
    api: &'a ApiClient,
    config: &'a SftConfig,
    phase: UploadPhase,
}

impl<'a> Uploader<'a> {
    pub fn new(api: &'a ApiClient, config: &'a SftConfig) -> Self {
        Self {
            api,
            config,
            phase: UploadPhase::Unstarted,
        }
    }

    pub fn phase(&self) -> UploadPhase {
        self.phase
    }

    fn advance(&mut self, next: UploadPhase) {
        debug!(from = ?self.phase, to = ?next, "upload phase");
        self.phase = next;
    }

    /// Encrypt and upload `paths`, returning the shareable link.
    pub async fn run(
        &mut self,
        paths: &[PathBuf],
        progress: Option<&ProgressFn>,
    ) -> SftResult<UploadOutcome> {
        match self.drive(paths, progress).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                self.advance(UploadPhase::Failed);
                Err(e)
            }
        }
    }

    async fn drive(
        &mut self,
        paths: &[PathBuf],
        progress: Option<&ProgressFn>,
    ) -> SftResult<UploadOutcome> {
        if paths.is_empty() {
            return Err(SftError::Input("no files to encrypt".to_string()));
        }

        // Server-advertised cap, fetched once per operation; conservative
        // fallback when unavailable.
        let max_size = self
            .api
            .upload_info()
            .await
            .unwrap_or(self.config.service.max_upload_size_fallback);
        let total_bytes = check_total_size(paths, max_size)?;
        let total_chunks: u64 = paths
            .iter()
            .map(|p| {
                std::fs::metadata(p)
                    .map(|m| chunk_count(m.len(), CHUNK_SIZE))
                    .unwrap_or(0)
            })
            .sum();

        let session = self
            .api
            .request_transfer(&UploadParameters {
                delete_after: self.config.service.delete_after.clone(),
                delete_after_count: self.config.service.delete_after_count.clone(),
            })
            .await?;
        self.advance(UploadPhase::RequestSent);
        info!(
            transfer_id = %session.transfer_id,
            files = paths.len(),
            total_bytes,
            "transfer created"
        );

        self.advance(UploadPhase::ChunksUploading);
        let mut records = Vec::with_capacity(paths.len());
        let mut done_chunks = 0u64;
        for path in paths {
            let record = self
                .upload_one_file(&session, path, &mut done_chunks, total_chunks, progress)
                .await?;
            records.push(record);
        }

        self.advance(UploadPhase::MetadataUploading);
        let metadata = TransferMetadata {
            description: String::new(),
            files: records.clone(),
        };
        let encoded = serde_json::to_vec(&metadata)
            .map_err(|e| SftError::Encoding(format!("metadata serialization: {e}")))?;
        // The metadata blob gets its own fresh key material; its encoded
        // secret is the only thing the link carries.
        let (ciphertext, material) = seal_with_fresh_material(&encoded)?;
        self.api.upload_metadata(&session, ciphertext).await?;

        let link = compose_link(
            &self.config.service.base_url,
            &session.transfer_id,
            &encode_secret(&material),
        );
        self.advance(UploadPhase::Done);
        info!(transfer_id = %session.transfer_id, "upload complete");
        Ok(UploadOutcome {
            link,
            transfer_id: session.transfer_id,
            files: records,
            total_bytes,
        })
    }

    /// Chunk, seal, and upload one file; records chunk ids in read order.
    async fn upload_one_file(
        &self,
        session: &UploadSession,
        path: &Path,
        done_chunks: &mut u64,
        total_chunks: u64,
        progress: Option<&ProgressFn>,
    ) -> SftResult<FileRecord> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                SftError::Input(format!("unusable file name: {}", path.display()))
            })?
            .to_string();
        let size = std::fs::metadata(path)?.len();
        let content_type = sniff_file(path)?;
        info!(name = %name, size, content_type = %content_type, "uploading file");

        let file = File::open(path)?;
        let mut chunks = Vec::new();
        for block in FixedChunker::new(file) {
            let block = block?;
            let (ciphertext, material) = seal_with_fresh_material(&block)?;
            let digest_hex = hex::encode(Sha256::digest(&ciphertext));
            let response = self.api.upload_chunk(session, ciphertext, digest_hex).await?;
            chunks.push(ChunkRef {
                id: response.created_transfer_file.id,
                secret: encode_secret(&material),
            });
            *done_chunks += 1;
            if let Some(callback) = progress {
                callback(*done_chunks, total_chunks, &name);
            }
        }
        if chunks.is_empty() {
            warn!(name = %name, "file is empty; it will be listed but has no content chunks");
        }

        Ok(FileRecord {
            name,
            size,
            chunks,
            content_type,
        })
    }
}

/// Stat every input and enforce the upload cap before anything is sent.
/// Returns the total byte count.
pub fn check_total_size(paths: &[PathBuf], max_size: u64) -> SftResult<u64> {
    let mut total = 0u64;
    for path in paths {
        let meta = std::fs::metadata(path)
            .map_err(|e| SftError::Input(format!("cannot read {}: {e}", path.display())))?;
        if !meta.is_file() {
            return Err(SftError::Input(format!(
                "{} is not a regular file",
                path.display()
            )));
        }
        total += meta.len();
    }
    if total > max_size {
        return Err(SftError::Input(format!(
            "total size {total} bytes exceeds the maximum upload size of {max_size} bytes"
        )));
    }
    Ok(total)
}

fn sniff_file(path: &Path) -> SftResult<String> {
    let mut file = File::open(path)?;
    let mut head = [0u8; SNIFF_LEN];
    let mut filled = 0;
    while filled < head.len() {
        match file.read(&mut head[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(sniff_content_type(&head[..filled]).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn total_size_cap_is_enforced_per_operation() {
        let dir = tempfile::tempdir().unwrap();
        let mut paths = Vec::new();
        for i in 0..3 {
            let path = dir.path().join(format!("f{i}"));
            std::fs::File::create(&path)
                .unwrap()
                .write_all(&[0u8; 100])
                .unwrap();
            paths.push(path);
        }

        assert_eq!(check_total_size(&paths, 300).unwrap(), 300);
        match check_total_size(&paths, 299) {
            Err(SftError::Input(message)) => assert!(message.contains("maximum upload size")),
            other => panic!("expected input error, got {other:?}"),
        }
    }

    #[test]
    fn missing_file_is_an_input_error() {
        let result = check_total_size(&[PathBuf::from("/nonexistent/sft-test")], u64::MAX);
        assert!(matches!(result, Err(SftError::Input(_))));
    }

    #[test]
    fn directories_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let result = check_total_size(&[dir.path().to_path_buf()], u64::MAX);
        assert!(matches!(result, Err(SftError::Input(_))));
    }

    #[tokio::test]
    async fn run_with_no_inputs_moves_to_failed() {
        let config = SftConfig::default();
        let api = ApiClient::new(&config).unwrap();
        let mut uploader = Uploader::new(&api, &config);
        assert_eq!(uploader.phase(), UploadPhase::Unstarted);

        // Rejected before any request is made.
        let result = uploader.run(&[], None).await;
        assert!(matches!(result, Err(SftError::Input(_))));
        assert_eq!(uploader.phase(), UploadPhase::Failed);
    }

    #[test]
    fn sniff_file_reads_leading_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("page.pdf");
        std::fs::File::create(&path)
            .unwrap()
            .write_all(b"%PDF-1.4 rest of document")
            .unwrap();
        assert_eq!(sniff_file(&path).unwrap(), "application/pdf");
    }
}
