//! # ryx - video stream format resolver
//!
//! Resolves a video identifier into its playable stream formats, reversing
//! the per-deployment signature cipher that protects some stream URLs.
//!
//! ## Features
//!
//! - Watch page and embedded player response parsing
//! - Signature function location with an ordered pattern table
//! - Sandboxed execution of the player's transform in V8
//! - Compiled transforms cached per player and signature shape
//!
//! ## Example
//!
//! ```rust,no_run
//! use ryx::Extractor;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let extractor = Extractor::new()?;
//!
//!     for format in extractor.formats("dQw4w9WgXcQ").await? {
//!         println!("{:?} {}", format.itag, format.url);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod core;
pub mod error;
pub mod platform;
pub mod utils;

// Re-export main types
pub use crate::core::{Extraction, Extractor, ExtractorConfig, Format};
pub use error::RyxError;
pub use platform::{FailurePolicy, HttpClientConfig};

/// Result type alias for ryx operations
pub type Result<T> = std::result::Result<T, RyxError>;
