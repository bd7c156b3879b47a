//! Format assembly from raw stream descriptors

use crate::core::format::Format;
use crate::error::RyxError;
use crate::platform::cipher::{fingerprint, Cipher};
use crate::platform::engine::SignatureTransform;
use crate::platform::page::extract_player_url;
use crate::utils::cache::CacheKey;
use crate::utils::mime::extension_from_mime;
use crate::utils::query::{first_value, parse_query_string};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};
use url::Url;

/// Query parameter the deciphered signature is attached under when the
/// cipher blob does not name one
pub const DEFAULT_SIGNATURE_PARAM: &str = "signature";

/// What to do when a single ciphered descriptor cannot be deciphered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Abort the whole extraction on the first failure
    #[default]
    FailFast,
    /// Omit the descriptor and record the failure
    Collect,
}

/// A descriptor omitted under [`FailurePolicy::Collect`]
#[derive(Debug)]
pub struct DescriptorFailure {
    pub itag: Option<u32>,
    pub error: RyxError,
}

/// Output of one assembly pass
#[derive(Debug, Default)]
pub struct Assembly {
    pub formats: Vec<Format>,
    pub failures: Vec<DescriptorFailure>,
}

/// Turns raw descriptors into [`Format`]s for one watch page.
///
/// The player script URL is only looked up once a ciphered descriptor is
/// seen, and at most once per assembler. A transform that failed to build is
/// not attempted again by the same assembler.
pub struct FormatAssembler<'a> {
    cipher: &'a Cipher,
    page: &'a str,
    origin: &'a Url,
    policy: FailurePolicy,
    player_url: Option<Option<Url>>,
    missing_player_url: bool,
    failed_builds: HashMap<CacheKey, Arc<RyxError>>,
}

impl<'a> FormatAssembler<'a> {
    pub fn new(cipher: &'a Cipher, page: &'a str, origin: &'a Url) -> Self {
        Self {
            cipher,
            page,
            origin,
            policy: FailurePolicy::default(),
            player_url: None,
            missing_player_url: false,
            failed_builds: HashMap::new(),
        }
    }

    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Assemble formats in descriptor order, omitting unusable descriptors
    pub async fn assemble(mut self, descriptors: &[&Value]) -> Result<Assembly, RyxError> {
        let mut assembly = Assembly::default();

        for descriptor in descriptors {
            let itag = coerce_u32(descriptor.get("itag"));

            if let Some(reason) = exclusion_reason(descriptor) {
                debug!(?itag, reason, "Skipping descriptor");
                continue;
            }

            match self.resolve_url(descriptor).await {
                Ok(Some(url)) => assembly.formats.push(build_format(descriptor, url)),
                Ok(None) => {}
                Err(error) => match self.policy {
                    FailurePolicy::FailFast => return Err(error),
                    FailurePolicy::Collect => {
                        warn!(?itag, "Dropping descriptor: {}", error);
                        assembly.failures.push(DescriptorFailure { itag, error });
                    }
                },
            }
        }

        if assembly.formats.is_empty() && self.missing_player_url {
            return Err(RyxError::PlayerInfoUnobtainable(
                "ciphered formats need the player script, which the page does not reference"
                    .to_string(),
            ));
        }

        Ok(assembly)
    }

    /// Playable URL for a descriptor. `Ok(None)` means the descriptor is
    /// unusable and silently dropped.
    async fn resolve_url(&mut self, descriptor: &Value) -> Result<Option<Url>, RyxError> {
        if let Some(url) = descriptor
            .get("url")
            .and_then(Value::as_str)
            .and_then(|raw| Url::parse(raw).ok())
        {
            return Ok(Some(url));
        }

        let Some(blob) = descriptor.get("signatureCipher").and_then(Value::as_str) else {
            debug!("Descriptor has neither url nor signatureCipher");
            return Ok(None);
        };

        let parsed = parse_query_string(blob);
        let base = first_value(&parsed, "url").and_then(|raw| Url::parse(raw).ok());
        let (Some(mut url), Some(signature)) = (base, first_value(&parsed, "s")) else {
            debug!("Cipher blob lacks url or signature");
            return Ok(None);
        };
        let param = first_value(&parsed, "sp").unwrap_or(DEFAULT_SIGNATURE_PARAM);

        let Some(player_url) = self.player_url() else {
            self.missing_player_url = true;
            debug!("No player script URL, cannot decipher");
            return Ok(None);
        };

        let key = CacheKey::new(player_url.clone(), fingerprint(signature));
        if let Some(shared) = self.failed_builds.get(&key) {
            debug!(fingerprint = %key.fingerprint, "Transform already failed to build");
            return Err(RyxError::from_shared(shared.clone()));
        }

        debug!(fingerprint = %key.fingerprint, "Deciphering signature");
        let transform = match self.cipher.transform_for(&player_url, signature).await {
            Ok(transform) => transform,
            Err(error) => {
                let shared = Arc::new(error);
                self.failed_builds.insert(key, shared.clone());
                return Err(RyxError::from_shared(shared));
            }
        };
        let plain = transform.apply(signature).await?;
        url.query_pairs_mut().append_pair(param, &plain);

        Ok(Some(url))
    }

    fn player_url(&mut self) -> Option<Url> {
        let (page, origin) = (self.page, self.origin);
        self.player_url
            .get_or_insert_with(|| extract_player_url(page, origin))
            .clone()
    }
}

/// Live, DRM and on-the-fly streams are not directly playable
fn exclusion_reason(descriptor: &Value) -> Option<&'static str> {
    let present = |key: &str| descriptor.get(key).is_some_and(|v| !v.is_null());

    if present("targetDurationSec") {
        Some("live stream")
    } else if present("drmFamilies") {
        Some("DRM protected")
    } else if descriptor.get("type").and_then(Value::as_str) == Some("FORMAT_STREAM_TYPE_OTF") {
        Some("on-the-fly stream")
    } else {
        None
    }
}

fn build_format(descriptor: &Value, url: Url) -> Format {
    let text = |key: &str| descriptor.get(key).and_then(Value::as_str).map(str::to_string);

    let quality = text("quality");
    let mime_type = text("mimeType");
    let bitrate = coerce_f64(descriptor.get("averageBitrate"))
        .or_else(|| coerce_f64(descriptor.get("bitrate")))
        .map(|bps| bps / 1000.0);

    Format {
        filesize: coerce_u64(descriptor.get("contentLength")),
        itag: coerce_u32(descriptor.get("itag")),
        quality_label: text("qualityLabel").or_else(|| quality.clone()),
        quality,
        sample_rate: coerce_u32(descriptor.get("audioSampleRate")),
        bitrate,
        width: coerce_u32(descriptor.get("width")),
        height: coerce_u32(descriptor.get("height")),
        url,
        file_extension: mime_type.as_deref().and_then(extension_from_mime),
        mime_type,
    }
}

/// Integer from either a JSON number or a numeric string
fn coerce_u64(value: Option<&Value>) -> Option<u64> {
    match value? {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn coerce_u32(value: Option<&Value>) -> Option<u32> {
    coerce_u64(value).and_then(|v| u32::try_from(v).ok())
}

fn coerce_f64(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
