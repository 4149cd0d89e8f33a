//! Content-type sniffing from a file's first bytes.
//!
//! The sniffed type is stored in the transfer metadata so receivers can
//! label files without trusting extensions. Covers the common signatures;
//! everything else falls back to text or octet-stream.

/// How many leading bytes the sniffer looks at
pub const SNIFF_LEN: usize = 512;

const SIGNATURES: &[(&[u8], &str)] = &[
    (b"\x89PNG\r\n\x1a\n", "image/png"),
    (b"\xff\xd8\xff", "image/jpeg"),
    (b"GIF87a", "image/gif"),
    (b"GIF89a", "image/gif"),
    (b"%PDF-", "application/pdf"),
    (b"PK\x03\x04", "application/zip"),
    (b"\x1f\x8b\x08", "application/x-gzip"),
    (b"7z\xbc\xaf\x27\x1c", "application/x-7z-compressed"),
    (b"OggS", "application/ogg"),
    (b"\x7fELF", "application/octet-stream"),
];

/// Sniff a content type from up to [`SNIFF_LEN`] leading bytes.
pub fn sniff_content_type(head: &[u8]) -> &'static str {
    for (magic, mime) in SIGNATURES {
        if head.starts_with(magic) {
            return mime;
        }
    }
    if looks_like_text(head) {
        "text/plain; charset=utf-8"
    } else {
        "application/octet-stream"
    }
}

fn looks_like_text(head: &[u8]) -> bool {
    head.iter().all(|&b| {
        b >= 0x20 || matches!(b, b'\t' | b'\n' | b'\r' | 0x0c | 0x1b)
    })
}
