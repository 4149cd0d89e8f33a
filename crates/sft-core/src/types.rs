//! Shared data model and service wire types.
//!
//! Field renames match the service's JSON contract exactly; the serialized
//! form of [`TransferMetadata`] is also what gets sealed and uploaded, so
//! these names are load-bearing, not cosmetic.

use serde::{Deserialize, Serialize};

/// One uploaded chunk: remote-assigned id + the chunk's encoded secret.
///
/// The id is opaque and carries no positional meaning; chunk order is
/// recorded only by position within [`FileRecord::chunks`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkRef {
    pub id: String,
    #[serde(rename = "encryptionRawSecret")]
    pub secret: String,
}

/// Per-file entry in the transfer metadata.
///
/// `chunks` is ordered by read position and must be preserved end to end:
/// reassembly concatenates opened chunks strictly in this order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub name: String,
    pub size: u64,
    pub chunks: Vec<ChunkRef>,
    #[serde(rename = "type")]
    pub content_type: String,
}

/// The transfer manifest: description plus ordered file records.
///
/// Serialized to JSON and sealed under its own fresh key material; the
/// shareable link encodes exactly that secret, so every chunk secret is
/// reachable only after this blob is opened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferMetadata {
    pub description: String,
    #[serde(rename = "filesMetadata")]
    pub files: Vec<FileRecord>,
}

/// Session handle returned by request-transfer, authorizing chunk and
/// metadata uploads. The management token is read-only after acquisition
/// and passed explicitly into every subsequent upload call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadSession {
    pub management_token: String,
    #[serde(rename = "id")]
    pub transfer_id: String,
    pub delete_after: String,
    pub delete_after_count: String,
}

/// Transfer details reported alongside a download session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferInfo {
    pub delete_after: String,
    pub created_at: String,
    pub expires_in: String,
    pub has_password: bool,
}

/// Session handle returned by request-download, authorizing metadata fetch,
/// validation, chunk fetch, and finalize calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadSession {
    pub download_token: String,
    pub transfer: TransferInfo,
}

/// Per-file status returned by the validate step, keyed by the file's
/// first chunk id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileStatus {
    pub id: String,
    pub valid: bool,
    pub download_count: u64,
    #[serde(rename = "remaining_downloads")]
    pub remaining_count: u64,
}
