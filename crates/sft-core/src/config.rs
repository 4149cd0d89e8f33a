use serde::{Deserialize, Serialize};

/// Top-level client configuration (loaded from sft.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SftConfig {
    pub service: ServiceConfig,
    pub http: HttpConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Base URL of the transfer service (no trailing slash)
    pub base_url: String,
    /// Retention period requested for new transfers (server syntax, e.g. "7d")
    pub delete_after: String,
    /// Download-count retention requested for new transfers (e.g. "2l")
    pub delete_after_count: String,
    /// Conservative cap used when the server's upload-info endpoint is
    /// unavailable (bytes)
    pub max_upload_size_fallback: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: "https://filetransfer.kpn.com".to_string(),
            delete_after: "7d".to_string(),
            delete_after_count: "2l".to_string(),
            max_upload_size_fallback: 4 * 1024 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
    /// Extra attempts for safely repeatable reads (upload-info,
    /// fetch-metadata, fetch-chunk). Side-effecting calls are never retried.
    pub retries: u32,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 120,
            retries: 2,
        }
    }
}
