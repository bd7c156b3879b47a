//! Video platform page parsing and signature cipher reversal

pub mod cipher;
pub mod client;
pub mod engine;
pub mod formats;
pub mod page;
pub mod sandbox;

pub use cipher::*;
pub use client::*;
pub use engine::*;
pub use formats::*;
pub use page::*;
pub use sandbox::*;
