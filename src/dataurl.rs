//! Input normalization for media handed over as base64 "data URL" text.

use base64::{engine::general_purpose::STANDARD, Engine};

use crate::error::{CropResult, Error, MalformedKind};

/// Decodes the payload of a `data:<mime>;base64,<payload>` URL.
///
/// Data URLs are how the host application hands serialized media to the
/// pipeline; anything without a base64 payload is rejected.
pub fn decode_data_url(url: &str) -> CropResult<Vec<u8>> {
    let rest = url
        .strip_prefix("data:")
        .ok_or_else(|| Error::malformed(MalformedKind::DataUrl))?;
    let (meta, payload) = rest
        .split_once(',')
        .ok_or_else(|| Error::malformed(MalformedKind::DataUrl))?;
    if !meta.ends_with(";base64") {
        return Err(Error::malformed(MalformedKind::DataUrl));
    }
    STANDARD
        .decode(payload)
        .map_err(|_| Error::malformed(MalformedKind::DataUrl))
}

/// Heuristic GIF sniff for source descriptions (paths, URLs, MIME strings).
pub fn is_gif_source(src: &str) -> bool {
    let lower = src.to_ascii_lowercase();
    lower.contains(".gif") || lower.contains("image/gif")
}

/// Whether a byte buffer starts with the GIF signature.
pub fn looks_like_gif(data: &[u8]) -> bool {
    data.starts_with(b"GIF")
}
