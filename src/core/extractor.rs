//! Main extractor implementation

use crate::core::format::Format;
use crate::error::RyxError;
use crate::platform::cipher::Cipher;
use crate::platform::client::{Fetcher, HttpClientConfig, HttpFetcher};
use crate::platform::engine::{DenoEngine, ScriptEngine};
use crate::platform::formats::{DescriptorFailure, FailurePolicy, FormatAssembler};
use crate::platform::page::extract_player_response;
use crate::utils::cache::TransformCache;
use crate::utils::url::{extract_video_id, watch_url};
use std::sync::Arc;
use tracing::{debug, info, warn};
use url::Url;

/// Site origin the watch page is requested from
pub const DEFAULT_ORIGIN: &str = "https://www.youtube.com/";

/// Main extractor configuration
#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    /// HTTP transport settings
    pub http: HttpClientConfig,
    /// Site origin for watch pages and relative player URLs
    pub origin: String,
    /// Maximum number of compiled transforms kept; `None` never evicts
    pub transform_cache_capacity: Option<u64>,
    /// Handling of per-descriptor decipher failures
    pub failure_policy: FailurePolicy,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            http: HttpClientConfig::default(),
            origin: DEFAULT_ORIGIN.to_string(),
            transform_cache_capacity: None,
            failure_policy: FailurePolicy::default(),
        }
    }
}

impl ExtractorConfig {
    pub fn with_http(mut self, http: HttpClientConfig) -> Self {
        self.http = http;
        self
    }

    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = origin.into();
        self
    }

    pub fn with_transform_cache_capacity(mut self, capacity: u64) -> Self {
        self.transform_cache_capacity = Some(capacity);
        self
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }
}

/// Result of one extraction
#[derive(Debug)]
pub struct Extraction {
    pub video_id: String,
    pub formats: Vec<Format>,
    /// Descriptors dropped under [`FailurePolicy::Collect`]
    pub failures: Vec<DescriptorFailure>,
}

/// Resolves video identifiers into playable formats.
///
/// Compiled transforms are cached in the shared [`Cipher`], so reusing one
/// extractor across videos avoids rebuilding the same player.
#[derive(Clone)]
pub struct Extractor {
    fetcher: Arc<dyn Fetcher>,
    cipher: Cipher,
    origin: Url,
    policy: FailurePolicy,
}

impl Extractor {
    /// Create an extractor with default configuration
    pub fn new() -> Result<Self, RyxError> {
        Self::with_config(ExtractorConfig::default())
    }

    /// Create an extractor backed by HTTP and the V8 sandbox
    pub fn with_config(config: ExtractorConfig) -> Result<Self, RyxError> {
        let fetcher = Arc::new(HttpFetcher::with_config(config.http.clone())?);
        Self::with_components(config, fetcher, Arc::new(DenoEngine::new()))
    }

    /// Create an extractor from explicit transport and engine
    pub fn with_components(
        config: ExtractorConfig,
        fetcher: Arc<dyn Fetcher>,
        engine: Arc<dyn ScriptEngine>,
    ) -> Result<Self, RyxError> {
        let origin = Url::parse(&config.origin)?;
        let cache = TransformCache::from_capacity(config.transform_cache_capacity);
        let cipher = Cipher::new(fetcher.clone(), engine, cache);

        Ok(Self {
            fetcher,
            cipher,
            origin,
            policy: config.failure_policy,
        })
    }

    /// Shared cipher and its transform cache
    pub fn cipher(&self) -> &Cipher {
        &self.cipher
    }

    pub fn origin(&self) -> &Url {
        &self.origin
    }

    /// Extract formats for a video id or watch URL
    pub async fn extract(&self, video: &str) -> Result<Extraction, RyxError> {
        let video_id = extract_video_id(video)?;
        info!("Extracting formats for video: {}", video_id);

        let page_url = watch_url(&self.origin, &video_id)?;
        let page = self.fetcher.fetch_text(page_url.as_str()).await?;
        debug!(chars = page.len(), "Fetched watch page");

        let response = extract_player_response(&page)?;
        let descriptors = response.descriptors()?;
        debug!("Found {} stream descriptors", descriptors.len());

        let assembly = FormatAssembler::new(&self.cipher, &page, &self.origin)
            .with_policy(self.policy)
            .assemble(&descriptors)
            .await?;

        if !assembly.failures.is_empty() {
            warn!(
                "{} descriptors could not be deciphered",
                assembly.failures.len()
            );
        }
        info!(
            "Resolved {} formats for video: {}",
            assembly.formats.len(),
            video_id
        );

        Ok(Extraction {
            video_id,
            formats: assembly.formats,
            failures: assembly.failures,
        })
    }

    /// Extract only the formats
    pub async fn formats(&self, video: &str) -> Result<Vec<Format>, RyxError> {
        Ok(self.extract(video).await?.formats)
    }
}
