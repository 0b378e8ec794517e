use anyhow::{bail, Context, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::github_payloads::GithubContentFile;

/// Decode a contents-API `content` field. GitHub wraps base64 at 60 columns,
/// so all ASCII whitespace is dropped before decoding.
pub fn decode_base64_content(raw: &str) -> Result<Vec<u8>> {
    let compact = raw
        .chars()
        .filter(|ch| !ch.is_ascii_whitespace())
        .collect::<String>();
    STANDARD
        .decode(compact.as_bytes())
        .context("invalid base64 file content")
}

pub fn encode_base64_content(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Decoded file text; invalid UTF-8 sequences are replaced rather than rejected.
pub fn decode_content_file(file: &GithubContentFile) -> Result<String> {
    let encoding = file
        .encoding
        .as_deref()
        .map(str::trim)
        .unwrap_or("base64");
    let Some(content) = file.content.as_deref() else {
        bail!(
            "github content response for '{}' has no inline content",
            file.path.as_deref().unwrap_or("unknown")
        );
    };
    match encoding {
        "base64" => {
            let bytes = decode_base64_content(content)?;
            Ok(String::from_utf8_lossy(&bytes).into_owned())
        }
        "utf-8" | "utf8" | "" => Ok(content.to_string()),
        other => bail!("unsupported github content encoding '{other}'"),
    }
}
