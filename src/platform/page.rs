//! Watch page parsing: player script URL and embedded player response

use crate::error::RyxError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;
use url::Url;

static PLAYER_URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""(?:PLAYER_JS_URL|jsUrl)"\s*:\s*"([^"]+)""#).unwrap());

static URL_SCHEME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-zA-Z][a-zA-Z0-9+.\-]*:").unwrap());

/// Tried in order; the first one is anchored on what follows the payload
static PLAYER_RESPONSE: Lazy<[Regex; 2]> = Lazy::new(|| {
    [
        Regex::new(
            r"ytInitialPlayerResponse\s*=\s*(\{.+?\})\s*;\s*(?:var\s+meta|</script|\n)",
        )
        .unwrap(),
        Regex::new(r"ytInitialPlayerResponse\s*=\s*(\{.+?\})\s*;").unwrap(),
    ]
});

/// Locate the versioned player script URL in the watch page.
///
/// Protocol-relative values get `https:`, other non-absolute values are
/// resolved against `origin`. `None` means ciphered formats cannot be
/// decrypted; it is not an error on its own.
pub fn extract_player_url(html: &str, origin: &Url) -> Option<Url> {
    let captured = PLAYER_URL.captures(html)?.get(1)?.as_str();
    let raw = captured.replace("\\/", "/");

    let resolved = if raw.starts_with("//") {
        Url::parse(&format!("https:{raw}"))
    } else if URL_SCHEME.is_match(&raw) {
        Url::parse(&raw)
    } else {
        origin.join(&raw)
    };

    match resolved {
        Ok(url) => {
            debug!("Resolved player script URL: {}", url);
            Some(url)
        }
        Err(e) => {
            debug!("Player script URL {:?} did not parse: {}", raw, e);
            None
        }
    }
}

/// The part of the player response the assembler reads
#[derive(Debug, Deserialize)]
pub struct PlayerResponse {
    #[serde(rename = "streamingData")]
    pub streaming_data: Option<StreamingData>,
}

#[derive(Debug, Deserialize)]
pub struct StreamingData {
    pub formats: Option<Vec<Value>>,
    #[serde(rename = "adaptiveFormats")]
    pub adaptive_formats: Option<Vec<Value>>,
}

impl PlayerResponse {
    /// Raw stream descriptors, formats first, then adaptive formats
    pub fn descriptors(&self) -> Result<Vec<&Value>, RyxError> {
        let streaming_data = self
            .streaming_data
            .as_ref()
            .ok_or_else(|| RyxError::PayloadUnparsable("missing streamingData".to_string()))?;

        if streaming_data.formats.is_none() && streaming_data.adaptive_formats.is_none() {
            return Err(RyxError::PayloadUnparsable(
                "streamingData has no formats".to_string(),
            ));
        }

        Ok(streaming_data
            .formats
            .iter()
            .flatten()
            .chain(streaming_data.adaptive_formats.iter().flatten())
            .collect())
    }
}

/// Locate and decode the `ytInitialPlayerResponse` object in the watch page
pub fn extract_player_response(html: &str) -> Result<PlayerResponse, RyxError> {
    let payload = PLAYER_RESPONSE
        .iter()
        .find_map(|pattern| pattern.captures(html).and_then(|caps| caps.get(1)))
        .ok_or_else(|| {
            RyxError::PayloadUnparsable("ytInitialPlayerResponse not found".to_string())
        })?;

    serde_json::from_str(payload.as_str())
        .map_err(|e| RyxError::PayloadUnparsable(format!("invalid player response JSON: {e}")))
}
