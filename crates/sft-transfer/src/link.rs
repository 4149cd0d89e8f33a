//! Shareable links: `<service>/download/<transfer-id>#<secret>`
//!
//! The fragment is the encoded key material of the metadata blob — the one
//! secret from which everything else in the transfer is reachable. Parsing
//! is pure string work so malformed links fail before any network call.

use sft_core::{SftError, SftResult};

pub fn compose_link(base_url: &str, transfer_id: &str, secret: &str) -> String {
    format!(
        "{}/download/{}#{}",
        base_url.trim_end_matches('/'),
        transfer_id,
        secret
    )
}

/// Split a link into (transfer id, encoded secret).
pub fn parse_link(link: &str) -> SftResult<(String, String)> {
    let rest = link
        .split_once("/download/")
        .map(|(_, rest)| rest)
        .ok_or_else(|| {
            SftError::Input(format!(
                "link must look like <service>/download/<id>#<secret>, got: {link}"
            ))
        })?;
    let (transfer_id, secret) = rest
        .split_once('#')
        .ok_or_else(|| SftError::Input("link is missing its #<secret> fragment".to_string()))?;
    if transfer_id.is_empty() || secret.is_empty() {
        return Err(SftError::Input(
            "link has an empty transfer id or secret".to_string(),
        ));
    }
    Ok((transfer_id.to_string(), secret.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compose_parse_roundtrip() {
        let link = compose_link("https://filetransfer.kpn.com", "9f8e7d", "AAAA.");
        assert_eq!(link, "https://filetransfer.kpn.com/download/9f8e7d#AAAA.");
        let (id, secret) = parse_link(&link).unwrap();
        assert_eq!(id, "9f8e7d");
        assert_eq!(secret, "AAAA.");
    }

    #[test]
    fn trailing_slash_base_does_not_double() {
        let link = compose_link("https://filetransfer.kpn.com/", "id", "s");
        assert_eq!(link, "https://filetransfer.kpn.com/download/id#s");
    }

    #[test]
    fn rejects_links_without_download_path() {
        assert!(parse_link("https://filetransfer.kpn.com/upload/x#y").is_err());
        assert!(parse_link("not a link at all").is_err());
    }

    #[test]
    fn rejects_links_without_fragment() {
        let result = parse_link("https://filetransfer.kpn.com/download/9f8e7d");
        match result {
            Err(SftError::Input(message)) => assert!(message.contains("fragment")),
            other => panic!("expected input error, got {other:?}"),
        }
    }

    #[test]
    fn rejects_empty_parts() {
        assert!(parse_link("https://filetransfer.kpn.com/download/#secret").is_err());
        assert!(parse_link("https://filetransfer.kpn.com/download/id#").is_err());
    }
}
