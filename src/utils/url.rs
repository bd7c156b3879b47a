//! URL utilities for extracting video IDs and building watch page URLs

use crate::error::RyxError;
use url::Url;

/// Length of a canonical video identifier
const VIDEO_ID_LEN: usize = 11;

/// Check if a string has the shape of a bare video ID
pub fn is_video_id(candidate: &str) -> bool {
    candidate.len() == VIDEO_ID_LEN
        && candidate
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

fn checked_id(id: &str) -> Result<String, RyxError> {
    if is_video_id(id) {
        Ok(id.to_string())
    } else {
        Err(RyxError::InvalidIdentifier(id.to_string()))
    }
}

/// Extract video ID from a bare ID or one of the supported URL formats
pub fn extract_video_id(input: &str) -> Result<String, RyxError> {
    let input = input.trim();
    if is_video_id(input) {
        return Ok(input.to_string());
    }

    let parsed = Url::parse(input).map_err(|_| RyxError::InvalidIdentifier(input.to_string()))?;

    match parsed.host_str() {
        Some("youtu.be") => checked_id(parsed.path().trim_start_matches('/')),
        Some("youtube.com") | Some("www.youtube.com") | Some("m.youtube.com") => {
            if parsed.path().starts_with("/watch") {
                parsed
                    .query_pairs()
                    .find(|(key, _)| key == "v")
                    .map(|(_, value)| value.to_string())
                    .ok_or_else(|| RyxError::InvalidIdentifier(input.to_string()))
                    .and_then(|id| checked_id(&id))
            } else if let Some(rest) = parsed.path().strip_prefix("/shorts/") {
                checked_id(rest.trim_end_matches('/'))
            } else {
                Err(RyxError::InvalidIdentifier(input.to_string()))
            }
        }
        _ => Err(RyxError::InvalidIdentifier(input.to_string())),
    }
}

/// Build the watch page URL for a video ID under the given origin
pub fn watch_url(origin: &Url, video_id: &str) -> Result<Url, RyxError> {
    let mut url = origin.join("watch")?;
    url.query_pairs_mut().append_pair("v", video_id);
    Ok(url)
}
