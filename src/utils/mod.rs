//! Utility functions for ryx

pub mod cache;
pub mod mime;
pub mod query;
pub mod url;

pub use cache::*;
pub use mime::*;
pub use query::*;
pub use self::url::*;
