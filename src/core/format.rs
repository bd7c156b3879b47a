//! Resolved stream format record

use crate::utils::mime::{is_audio_mime, is_video_mime};
use serde::{Deserialize, Serialize};
use url::Url;

/// One playable stream variant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Format {
    /// File size in bytes (if known)
    pub filesize: Option<u64>,
    /// YouTube format ID (itag)
    pub itag: Option<u32>,
    /// Quality code (e.g., "hd720", "medium")
    pub quality: Option<String>,
    /// Quality label (e.g., "720p"), falling back to the quality code
    pub quality_label: Option<String>,
    /// Audio sample rate in Hz
    pub sample_rate: Option<u32>,
    /// Bitrate in kilobits per second
    pub bitrate: Option<f64>,
    /// Video width
    pub width: Option<u32>,
    /// Video height
    pub height: Option<u32>,
    /// Playable URL, with the deciphered signature attached when one was needed.
    ///
    /// Stored parsed, so a direct URL is WHATWG-normalised: host lowercased,
    /// default port dropped, unsafe query bytes percent-encoded. Stream URLs
    /// served by the platform are already in that form and come out unchanged.
    pub url: Url,
    /// File extension derived from the MIME type
    pub file_extension: Option<String>,
    /// MIME type
    pub mime_type: Option<String>,
}

impl Format {
    /// Create a format with only a URL known
    pub fn new(url: Url) -> Self {
        Self {
            filesize: None,
            itag: None,
            quality: None,
            quality_label: None,
            sample_rate: None,
            bitrate: None,
            width: None,
            height: None,
            url,
            file_extension: None,
            mime_type: None,
        }
    }

    /// Check if the stream carries video
    pub fn has_video(&self) -> bool {
        self.height.is_some() || self.mime_type.as_deref().is_some_and(is_video_mime)
    }

    /// Check if the stream carries audio
    pub fn has_audio(&self) -> bool {
        self.sample_rate.is_some() || self.mime_type.as_deref().is_some_and(is_audio_mime)
    }

    /// Check if format is audio-only
    pub fn is_audio_only(&self) -> bool {
        self.has_audio() && !self.has_video()
    }

    /// Get resolution string (e.g., "1920x1080")
    pub fn resolution(&self) -> Option<String> {
        match (self.width, self.height) {
            (Some(w), Some(h)) => Some(format!("{}x{}", w, h)),
            _ => None,
        }
    }

    /// Human-readable label: quality label, else resolution, else "audio"
    pub fn display_quality(&self) -> String {
        self.quality_label
            .clone()
            .or_else(|| self.resolution())
            .unwrap_or_else(|| {
                if self.has_audio() {
                    "audio".to_string()
                } else {
                    "unknown".to_string()
                }
            })
    }
}
