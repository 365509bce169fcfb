//! Test Helper Utilities
//!
//! Shared utilities for testing bgm-client

#![allow(dead_code)]

pub mod media;
pub mod scripted_backend;
pub mod stub_server;

// Re-export commonly used items
pub use media::{form_with_audio, write_test_image, write_test_wav};
pub use scripted_backend::{ScriptedBackend, SubmitHold};
pub use stub_server::{ReceivedSubmission, StubServer};
