//! MIME type utilities for determining file extensions

/// Extensions decided by the full `type/subtype` essence
fn ext_from_essence(essence: &str) -> Option<&'static str> {
    match essence {
        "audio/mp4" => Some("m4a"),
        "audio/mpeg" => Some("mp3"),
        _ => None,
    }
}

/// Extensions decided by the subtype alone
fn ext_from_subtype(subtype: &str) -> Option<&'static str> {
    match subtype {
        "3gpp" => Some("3gp"),
        "smptett+xml" => Some("tt"),
        "ttaf+xml" => Some("dfxp"),
        "ttml+xml" => Some("ttml"),
        "x-flv" => Some("flv"),
        "x-mp4-fragmented" => Some("mp4"),
        "x-ms-sami" => Some("sami"),
        "x-ms-wmv" => Some("wmv"),
        "mpegurl" | "x-mpegurl" | "vnd.apple.mpegurl" => Some("m3u8"),
        "dash+xml" => Some("mpd"),
        "f4m+xml" | "hds+xml" => Some("f4m"),
        "vnd.ms-sstr+xml" => Some("ism"),
        "quicktime" => Some("mov"),
        "mp2t" => Some("ts"),
        "x-wav" => Some("wav"),
        _ => None,
    }
}

/// Strip parameters such as `; codecs="..."` from a MIME type
pub fn mime_essence(mime_type: &str) -> &str {
    mime_type.split(';').next().unwrap_or(mime_type).trim()
}

/// Get file extension from MIME type.
///
/// Unknown subtypes are returned as-is, so `video/webm` yields `webm`.
pub fn extension_from_mime(mime_type: &str) -> Option<String> {
    let essence = mime_essence(mime_type);
    if essence.is_empty() {
        return None;
    }

    if let Some(ext) = ext_from_essence(essence) {
        return Some(ext.to_string());
    }

    let subtype = essence.rsplit('/').next().unwrap_or(essence);
    if subtype.is_empty() {
        return None;
    }

    Some(
        ext_from_subtype(subtype)
            .map(str::to_string)
            .unwrap_or_else(|| subtype.to_string()),
    )
}

/// Check if MIME type is a video format
pub fn is_video_mime(mime_type: &str) -> bool {
    mime_essence(mime_type).starts_with("video/")
}

/// Check if MIME type is an audio format
pub fn is_audio_mime(mime_type: &str) -> bool {
    mime_essence(mime_type).starts_with("audio/")
}
