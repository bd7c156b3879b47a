//! Signature cipher deciphering for video platform
//!
//! Player scripts are minified and reshuffled on every deployment, so the
//! transform function is found heuristically: an ordered table of patterns is
//! tried against the script and the first one that matches names the
//! function. The script is then rewritten into a [`Sandbox`], compiled by a
//! [`ScriptEngine`] and cached by [`CacheKey`].

use crate::error::RyxError;
use crate::platform::client::Fetcher;
use crate::platform::engine::{CompiledTransform, ScriptEngine};
use crate::platform::sandbox::build_sandbox;
use crate::utils::cache::{CacheKey, TransformCache};
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use tracing::debug;
use url::Url;

/// Known call-site and definition shapes of the signature function, highest
/// precedence first. Each captures the function name in group 1.
pub const SIGNATURE_FUNCTION_PATTERNS: &[(&str, &str)] = &[
    (
        "set-encodeURIComponent",
        r"(?-u:\b)[cs]\s*&&\s*[adf]\.set\([^,]+\s*,\s*encodeURIComponent\s*\(\s*([a-zA-Z0-9$]+)\(",
    ),
    (
        "generic-set-encodeURIComponent",
        r"(?-u:\b)[a-zA-Z0-9]+\s*&&\s*[a-zA-Z0-9]+\.set\([^,]+\s*,\s*encodeURIComponent\s*\(\s*([a-zA-Z0-9$]+)\(",
    ),
    (
        "m-decodeURIComponent",
        r"(?-u:\b)m=([a-zA-Z0-9$]{2,})\(decodeURIComponent\(h\.s\)\)",
    ),
    (
        "c-decodeURIComponent",
        r"(?-u:\b)c&&\(c=([a-zA-Z0-9$]{2,})\(decodeURIComponent\(c\)\)",
    ),
    (
        "split-definition-with-helper",
        r#"(?:(?-u:\b)|[^a-zA-Z0-9$])([a-zA-Z0-9$]{2,})\s*=\s*function\(\s*a\s*\)\s*\{\s*a\s*=\s*a\.split\(\s*""\s*\)(?:;[a-zA-Z0-9$]{2}\.[a-zA-Z0-9$]{2}\(a,\d+\))?"#,
    ),
    (
        "split-definition",
        r#"([a-zA-Z0-9$]+)\s*=\s*function\(\s*a\s*\)\s*\{\s*a\s*=\s*a\.split\(\s*""\s*\)"#,
    ),
    (
        "quoted-signature-key",
        r#"(?:"signature"|'signature')\s*,\s*([a-zA-Z0-9$]+)\("#,
    ),
    ("sig-fallback", r"\.sig\|\|([a-zA-Z0-9$]+)\("),
    (
        "akamaized-set",
        r"yt\.akamaized\.net/\)\s*\|\|\s*.*?\s*[cs]\s*&&\s*[adf]\.set\([^,]+\s*,\s*(?:encodeURIComponent\s*\()?\s*([a-zA-Z0-9$]+)\(",
    ),
    (
        "set-direct",
        r"(?-u:\b)[cs]\s*&&\s*[adf]\.set\([^,]+\s*,\s*([a-zA-Z0-9$]+)\(",
    ),
    (
        "generic-set-direct",
        r"(?-u:\b)[a-zA-Z0-9]+\s*&&\s*[a-zA-Z0-9]+\.set\([^,]+\s*,\s*([a-zA-Z0-9$]+)\(",
    ),
    (
        "c-set-wrapped",
        r"(?-u:\b)c\s*&&\s*[a-zA-Z0-9]+\.set\([^,]+\s*,\s*\([^)]*\)\s*\(\s*([a-zA-Z0-9$]+)\(",
    ),
];

/// One compiled locator pattern
#[derive(Debug, Clone)]
pub struct PatternRule {
    pub label: &'static str,
    pub regex: Regex,
}

impl PatternRule {
    pub fn new(label: &'static str, pattern: &str) -> Result<Self, RyxError> {
        Ok(Self {
            label,
            regex: Regex::new(pattern)?,
        })
    }

    /// Name captured by this rule anywhere in `script`
    pub fn capture<'a>(&self, script: &'a str) -> Option<&'a str> {
        self.regex
            .captures(script)
            .and_then(|caps| caps.get(1))
            .map(|name| name.as_str())
    }
}

/// Default rule table built from [`SIGNATURE_FUNCTION_PATTERNS`]
pub static SIGNATURE_FUNCTION_RULES: Lazy<Vec<PatternRule>> = Lazy::new(|| {
    SIGNATURE_FUNCTION_PATTERNS
        .iter()
        .map(|&(label, pattern)| PatternRule::new(label, pattern).unwrap())
        .collect()
});

/// Name the signature transform function using the default rule table
pub fn locate_signature_function(player_js: &str) -> Result<String, RyxError> {
    locate_with(&SIGNATURE_FUNCTION_RULES, player_js)
}

/// Name the signature transform function with the first matching rule
pub fn locate_with(rules: &[PatternRule], player_js: &str) -> Result<String, RyxError> {
    for rule in rules {
        if let Some(name) = rule.capture(player_js) {
            debug!(rule = rule.label, "Found signature function: {}", name);
            return Ok(name.to_string());
        }
    }

    Err(RyxError::TransformLocationFailed(format!(
        "none of {} patterns matched the player script",
        rules.len()
    )))
}

/// Structural proxy for the player version: the lengths of the
/// `.`-separated segments of a signature, e.g. `abc.de.f` -> `3.2.1`
pub fn fingerprint(signature: &str) -> String {
    signature
        .split('.')
        .map(|segment| segment.chars().count().to_string())
        .collect::<Vec<_>>()
        .join(".")
}

/// Signature cipher decipherer
#[derive(Clone)]
pub struct Cipher {
    fetcher: Arc<dyn Fetcher>,
    engine: Arc<dyn ScriptEngine>,
    cache: TransformCache,
}

impl Cipher {
    /// Create a new cipher instance
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        engine: Arc<dyn ScriptEngine>,
        cache: TransformCache,
    ) -> Self {
        Self {
            fetcher,
            engine,
            cache,
        }
    }

    pub fn cache(&self) -> &TransformCache {
        &self.cache
    }

    /// Decipher `signature` with the transform of the player at `player_js_url`
    pub async fn decipher_signature(
        &self,
        player_js_url: &Url,
        signature: &str,
    ) -> Result<String, RyxError> {
        let transform = self.transform_for(player_js_url, signature).await?;
        transform.apply(signature).await
    }

    /// Cached transform for this player and signature shape, built on first use
    pub async fn transform_for(
        &self,
        player_js_url: &Url,
        signature: &str,
    ) -> Result<CompiledTransform, RyxError> {
        let key = CacheKey::new(player_js_url.clone(), fingerprint(signature));
        self.cache
            .get_or_build(key, self.build_transform(player_js_url))
            .await
    }

    async fn build_transform(&self, player_js_url: &Url) -> Result<CompiledTransform, RyxError> {
        let player_js = self.fetch_player_js(player_js_url).await?;
        let function_name = locate_signature_function(&player_js)?;
        let sandbox = build_sandbox(&player_js, &function_name)?;
        self.engine.compile(sandbox).await
    }

    /// Fetch player.js content
    pub async fn fetch_player_js(&self, player_js_url: &Url) -> Result<String, RyxError> {
        let content = self.fetcher.fetch_text(player_js_url.as_str()).await?;
        debug!(chars = content.len(), "Fetched player.js");
        Ok(content)
    }
}
