//! Core functionality for ryx

pub mod extractor;
pub mod format;

pub use extractor::*;
pub use format::*;
