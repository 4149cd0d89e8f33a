//! sft-transfer: the transfer service protocol
//!
//! [`ApiClient`] wraps the service's remote operations; [`upload::Uploader`]
//! and [`download::Downloader`] drive the two protocol state machines on top
//! of it. Everything is strictly sequential: one call at a time, each
//! awaited before the next step proceeds.

pub mod api;
pub mod content_type;
pub mod download;
pub mod link;
pub mod upload;
pub mod wire;

pub use api::ApiClient;
pub use download::{DownloadPhase, Downloader, FileEntry, Listing};
pub use link::{compose_link, parse_link};
pub use upload::{UploadOutcome, UploadPhase, Uploader};

/// Progress callback type (units_done, units_total, message)
pub type ProgressFn = Box<dyn Fn(u64, u64, &str) + Send + Sync>;
