//! Test Fixtures Module
//!
//! Programmatically generated audio and multipart request bodies shared by
//! the integration tests.

// Allow dead code in test fixtures - not every test binary uses every helper
#![allow(dead_code)]

pub mod audio_fixtures;
pub mod multipart;

pub use audio_fixtures::*;
pub use multipart::*;
