//! Command line argument parsing

use crate::core::extractor::{ExtractorConfig, DEFAULT_ORIGIN};
use crate::platform::client::HttpClientConfig;
use crate::platform::formats::FailurePolicy;
use clap::Parser;
use std::time::Duration;

/// RYX - resolve a video into playable stream formats
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Video ID or watch URL
    pub video: String,

    /// Print formats as JSON
    #[arg(long)]
    pub json: bool,

    /// Only show the format with this itag
    #[arg(long, value_name = "ITAG")]
    pub itag: Option<u32>,

    /// Print format URLs only
    #[arg(short = 'g', long)]
    pub print_url: bool,

    /// HTTP timeout (e.g., 30s, 1m)
    #[arg(long, value_name = "DURATION", default_value = "30s")]
    pub timeout: humantime::Duration,

    /// Override User-Agent header
    #[arg(long, value_name = "USER_AGENT")]
    pub user_agent: Option<String>,

    /// Proxy URL (http/https/socks)
    #[arg(long, value_name = "URL")]
    pub proxy: Option<String>,

    /// Site origin for watch pages
    #[arg(long, value_name = "URL", default_value = DEFAULT_ORIGIN)]
    pub origin: String,

    /// Maximum number of compiled signature transforms to keep
    #[arg(long, value_name = "N")]
    pub cache_capacity: Option<u64>,

    /// Keep formats that resolved when others fail to decipher
    #[arg(long)]
    pub keep_going: bool,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Quiet output (only errors)
    #[arg(short, long)]
    pub quiet: bool,
}

impl Default for Args {
    fn default() -> Self {
        Self {
            video: String::new(),
            json: false,
            itag: None,
            print_url: false,
            timeout: Duration::from_secs(30).into(),
            user_agent: None,
            proxy: None,
            origin: DEFAULT_ORIGIN.to_string(),
            cache_capacity: None,
            keep_going: false,
            verbose: false,
            quiet: false,
        }
    }
}

impl Args {
    /// Get HTTP timeout as Duration
    pub fn timeout_duration(&self) -> Duration {
        self.timeout.into()
    }

    /// Get output verbosity level
    pub fn verbosity_level(&self) -> VerbosityLevel {
        if self.quiet {
            VerbosityLevel::Quiet
        } else if self.verbose {
            VerbosityLevel::Verbose
        } else {
            VerbosityLevel::Normal
        }
    }

    pub fn failure_policy(&self) -> FailurePolicy {
        if self.keep_going {
            FailurePolicy::Collect
        } else {
            FailurePolicy::FailFast
        }
    }

    /// Build extractor configuration from the flags
    pub fn extractor_config(&self) -> ExtractorConfig {
        let mut http = HttpClientConfig::default().with_timeout(self.timeout_duration());
        if let Some(user_agent) = &self.user_agent {
            http = http.with_user_agent(user_agent);
        }
        if let Some(proxy) = &self.proxy {
            http = http.with_proxy(proxy);
        }

        let mut config = ExtractorConfig::default()
            .with_http(http)
            .with_origin(&self.origin)
            .with_failure_policy(self.failure_policy());
        if let Some(capacity) = self.cache_capacity {
            config = config.with_transform_cache_capacity(capacity);
        }
        config
    }
}

/// Output verbosity level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerbosityLevel {
    /// Quiet (only errors)
    Quiet,
    /// Normal
    Normal,
    /// Verbose (debug info)
    Verbose,
}

impl VerbosityLevel {
    /// Default `tracing` filter when `RUST_LOG` is unset
    pub fn default_log_filter(&self) -> &'static str {
        match self {
            VerbosityLevel::Quiet => "error",
            VerbosityLevel::Normal => "warn",
            VerbosityLevel::Verbose => "ryx=debug,info",
        }
    }
}
