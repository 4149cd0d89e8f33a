//! Request/response bodies for the service's structured endpoints.
//!
//! Session and file-status types shared with callers live in
//! `sft_core::types`; these are the endpoint-local envelopes around them.

use serde::{Deserialize, Serialize};

use sft_core::types::{FileStatus, UploadSession};

/// Body of request-transfer: retention parameters.
#[derive(Debug, Clone, Serialize)]
pub struct UploadParameters {
    pub delete_after: String,
    pub delete_after_count: String,
}

#[derive(Debug, Deserialize)]
pub struct UploadRequestResponse {
    pub created_transfer: UploadSession,
}

#[derive(Debug, Deserialize)]
pub struct UploadInfoResponse {
    pub max_upload_size_bytes: u64,
}

#[derive(Debug, Deserialize)]
pub struct CreatedTransferFile {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub struct TransferBudget {
    pub available_upload_size_in_bytes: u64,
}

#[derive(Debug, Deserialize)]
pub struct ChunkUploadResponse {
    pub created_transfer_file: CreatedTransferFile,
    pub transfer: TransferBudget,
}

#[derive(Debug, Serialize)]
pub struct DownloadRequest {
    pub transfer_id: String,
}

#[derive(Debug, Serialize)]
pub struct ValidateRequest {
    pub download_token: String,
    pub files: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct FinalizeRequest {
    pub files: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct FinalizeResponse {
    pub transfer_is_valid: bool,
    pub files: Vec<FileStatus>,
}
