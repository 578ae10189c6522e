use tracing::{info, warn};

use super::IngestError;
use crate::config::ImagingConfig;

const DATA_URL_SCHEME: &str = "data:";
const BASE64_PARAM: &str = "base64";

/// A syntactically valid, padded base64 body and the MIME type it declared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanedPayload {
    pub mime: String,
    pub base64: String,
}

/// Validate a `data:<mime>;base64,<body>` URL and repair its body.
///
/// Whitespace, control characters and anything outside `A-Z a-z 0-9 + / =`
/// are dropped, trailing padding is recomputed. This undoes damage from text
/// transport; it is not a security filter.
pub fn sanitize(payload: &str, config: &ImagingConfig) -> Result<CleanedPayload, IngestError> {
    let rest = payload
        .trim_start()
        .strip_prefix(DATA_URL_SCHEME)
        .ok_or_else(|| IngestError::Format("missing data URL prefix".into()))?;

    let (header, body) = rest
        .split_once(',')
        .ok_or_else(|| IngestError::Format("data URL has no payload separator".into()))?;

    let mut params = header.split(';').map(str::trim);
    let mime = params.next().unwrap_or_default().to_ascii_lowercase();
    if !params.any(|p| p.eq_ignore_ascii_case(BASE64_PARAM)) {
        return Err(IngestError::Format("data URL is not base64-encoded".into()));
    }
    if mime.is_empty() {
        return Err(IngestError::Format("data URL declares no MIME type".into()));
    }
    if !config.is_allowed(&mime) {
        return Err(IngestError::UnsupportedType(mime));
    }

    let mut whitespace = 0usize;
    let mut foreign = 0usize;
    let mut cleaned: String = body
        .chars()
        .filter(|c| {
            let keep = c.is_ascii_alphanumeric() || matches!(c, '+' | '/' | '=');
            if !keep {
                if c.is_whitespace() || c.is_control() {
                    whitespace += 1;
                } else {
                    foreign += 1;
                }
            }
            keep
        })
        .collect();

    if foreign > 0 {
        warn!(mime = %mime, foreign, "dropped characters outside the base64 alphabet");
    }

    let unpadded = cleaned.trim_end_matches('=').len();
    cleaned.truncate(unpadded);
    if cleaned.is_empty() {
        return Err(IngestError::Format("data URL payload is empty".into()));
    }
    if cleaned.contains('=') {
        return Err(IngestError::Format(
            "padding character inside base64 payload".into(),
        ));
    }
    let missing = (4 - cleaned.len() % 4) % 4;
    cleaned.extend(std::iter::repeat_n('=', missing));

    info!(
        mime = %mime,
        chars = cleaned.len(),
        whitespace,
        foreign,
        "data URL sanitized"
    );

    Ok(CleanedPayload {
        mime,
        base64: cleaned,
    })
}
