//! HTTP client for the transfer service.
//!
//! One method per remote operation. Every call blocks (awaits) until its
//! response; success is any 2xx status, anything else becomes
//! [`SftError::Protocol`]. Only safely repeatable reads — upload-info,
//! fetch-metadata, fetch-chunk — are retried; side-effecting calls
//! (chunk/metadata upload, request-transfer, finalize) never are.

use std::time::Duration;

use reqwest::multipart::{Form, Part};
use tracing::{debug, warn};

use sft_core::config::SftConfig;
use sft_core::types::{DownloadSession, FileStatus, UploadSession};
use sft_core::{SftError, SftResult};

use crate::wire::{
    ChunkUploadResponse, DownloadRequest, FinalizeRequest, FinalizeResponse, UploadInfoResponse,
    UploadParameters, UploadRequestResponse, ValidateRequest,
};

const DOWNLOAD_TOKEN_HEADER: &str = "Download-Token";

pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    retries: u32,
}

impl ApiClient {
    pub fn new(config: &SftConfig) -> SftResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.http.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            base_url: config.service.base_url.trim_end_matches('/').to_string(),
            retries: config.http.retries,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// GET upload-info: the server-advertised maximum upload size.
    ///
    /// Returns `None` when the endpoint is unreachable or non-2xx after
    /// retries; callers fall back to a conservative cap.
    pub async fn upload_info(&self) -> Option<u64> {
        let mut attempt = 0;
        loop {
            match self.try_upload_info().await {
                Ok(size) => return Some(size),
                Err(e) if attempt < self.retries && is_retryable(&e) => {
                    attempt += 1;
                    warn!(attempt, error = %e, "upload-info retry");
                }
                Err(e) => {
                    warn!(error = %e, "upload-info unavailable, using fallback cap");
                    return None;
                }
            }
        }
    }

    async fn try_upload_info(&self) -> SftResult<u64> {
        let response = self
            .http
            .get(self.url("/api/v1/upload/info/"))
            .send()
            .await?;
        check_status("upload-info", &response)?;
        let info: UploadInfoResponse = response
            .json()
            .await
            .map_err(|e| SftError::Encoding(format!("upload-info response: {e}")))?;
        Ok(info.max_upload_size_bytes)
    }

    /// POST request-transfer: exchange retention parameters for an upload
    /// session (management token + transfer id). No payload is encrypted.
    pub async fn request_transfer(&self, params: &UploadParameters) -> SftResult<UploadSession> {
        let response = self
            .http
            .post(self.url("/api/v1/upload/request/"))
            .json(params)
            .send()
            .await?;
        check_status("request-transfer", &response)?;
        let body: UploadRequestResponse = response
            .json()
            .await
            .map_err(|e| SftError::Encoding(format!("request-transfer response: {e}")))?;
        Ok(body.created_transfer)
    }

    /// POST one sealed chunk: ciphertext as a multipart file part, plus the
    /// ciphertext digest (the server's integrity check, independent of the
    /// AEAD tag) and the management token as auxiliary fields.
    pub async fn upload_chunk(
        &self,
        session: &UploadSession,
        ciphertext: Vec<u8>,
        digest_hex: String,
    ) -> SftResult<ChunkUploadResponse> {
        let size = ciphertext.len();
        let form = Form::new()
            .part("file", blob_part(ciphertext)?)
            .text("encrypted_contents_hash", digest_hex)
            .text(
                "transfer_management_token",
                session.management_token.clone(),
            );
        let response = self
            .http
            .post(self.url("/api/v1/upload/file/"))
            .multipart(form)
            .send()
            .await?;
        check_status("upload-chunk", &response)?;
        let body: ChunkUploadResponse = response
            .json()
            .await
            .map_err(|e| SftError::Encoding(format!("upload-chunk response: {e}")))?;
        debug!(
            chunk_id = %body.created_transfer_file.id,
            bytes = size,
            remaining = body.transfer.available_upload_size_in_bytes,
            "chunk uploaded"
        );
        Ok(body)
    }

    /// PUT the sealed metadata blob under the same management token.
    pub async fn upload_metadata(
        &self,
        session: &UploadSession,
        ciphertext: Vec<u8>,
    ) -> SftResult<()> {
        let form = Form::new().part("file", blob_part(ciphertext)?).text(
            "transfer_management_token",
            session.management_token.clone(),
        );
        let response = self
            .http
            .put(self.url("/api/v1/upload/metadata/"))
            .multipart(form)
            .send()
            .await?;
        check_status("upload-metadata", &response)
    }

    /// POST request-download: exchange a transfer id for a download session.
    pub async fn request_download(&self, transfer_id: &str) -> SftResult<DownloadSession> {
        let response = self
            .http
            .post(self.url("/api/v1/download/request/"))
            .json(&DownloadRequest {
                transfer_id: transfer_id.to_string(),
            })
            .send()
            .await?;
        check_status("request-download", &response)?;
        response
            .json()
            .await
            .map_err(|e| SftError::Encoding(format!("request-download response: {e}")))
    }

    /// GET the sealed metadata blob. Safe to retry.
    pub async fn fetch_metadata(&self, session: &DownloadSession) -> SftResult<Vec<u8>> {
        self.get_bytes_with_retry("fetch-metadata", self.url("/api/v1/download/metadata/"), session)
            .await
    }

    /// GET one sealed chunk by its remote id. Safe to retry.
    pub async fn fetch_chunk(&self, session: &DownloadSession, chunk_id: &str) -> SftResult<Vec<u8>> {
        let url = self.url(&format!("/api/v1/download/file/{chunk_id}/"));
        self.get_bytes_with_retry("fetch-chunk", url, session).await
    }

    async fn get_bytes_with_retry(
        &self,
        op: &'static str,
        url: String,
        session: &DownloadSession,
    ) -> SftResult<Vec<u8>> {
        let mut attempt = 0;
        loop {
            match self.try_get_bytes(op, &url, session).await {
                Ok(bytes) => return Ok(bytes),
                Err(e) if attempt < self.retries && is_retryable(&e) => {
                    attempt += 1;
                    warn!(op, attempt, error = %e, "retrying fetch");
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn try_get_bytes(
        &self,
        op: &'static str,
        url: &str,
        session: &DownloadSession,
    ) -> SftResult<Vec<u8>> {
        let response = self
            .http
            .get(url)
            .header(DOWNLOAD_TOKEN_HEADER, &session.download_token)
            .send()
            .await?;
        check_status(op, &response)?;
        Ok(response.bytes().await?.to_vec())
    }

    /// POST validate-files: one canonical (first-chunk) id per file.
    /// Responses are keyed by id; their order is not guaranteed.
    pub async fn validate_files(
        &self,
        session: &DownloadSession,
        ids: Vec<String>,
    ) -> SftResult<Vec<FileStatus>> {
        let response = self
            .http
            .post(self.url("/api/v1/download/files/validate/"))
            .json(&ValidateRequest {
                download_token: session.download_token.clone(),
                files: ids,
            })
            .send()
            .await?;
        check_status("validate-files", &response)?;
        response
            .json()
            .await
            .map_err(|e| SftError::Encoding(format!("validate-files response: {e}")))
    }

    /// POST finalize-download: report the full list of consumed chunk ids.
    /// Informational only; the caller decides whether a failure matters.
    pub async fn finalize_download(
        &self,
        session: &DownloadSession,
        chunk_ids: Vec<String>,
    ) -> SftResult<FinalizeResponse> {
        let response = self
            .http
            .post(self.url("/api/v1/download/files/success/"))
            .header(DOWNLOAD_TOKEN_HEADER, &session.download_token)
            .json(&FinalizeRequest { files: chunk_ids })
            .send()
            .await?;
        check_status("finalize-download", &response)?;
        response
            .json()
            .await
            .map_err(|e| SftError::Encoding(format!("finalize-download response: {e}")))
    }
}

fn blob_part(ciphertext: Vec<u8>) -> SftResult<Part> {
    Part::bytes(ciphertext)
        .file_name("blob")
        .mime_str("application/octet-stream")
        .map_err(|e| SftError::Encoding(format!("building multipart body: {e}")))
}

fn check_status(op: &'static str, response: &reqwest::Response) -> SftResult<()> {
    let status = response.status();
    if status.is_success() {
        Ok(())
    } else {
        Err(SftError::protocol(op, status.as_u16()))
    }
}

fn is_retryable(error: &SftError) -> bool {
    match error {
        SftError::Transport(_) => true,
        SftError::Protocol { status, .. } => *status >= 500,
        _ => false,
    }
}
