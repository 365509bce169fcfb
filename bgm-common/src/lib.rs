//! # BGM Creator Common Library
//!
//! Shared code for the BGM Creator client crates:
//! - Wire types for the media-processing service API
//! - Configuration loading and backend address resolution
//! - Common error type

pub mod api;
pub mod config;
pub mod error;

pub use error::{Error, Result};
