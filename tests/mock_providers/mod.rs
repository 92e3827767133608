//! Mock Provider Servers
//!
//! - `soniox_rest`: wiremock mounts for the file transcription REST API
//! - `soniox_realtime`: a tokio-tungstenite server standing in for the
//!   streaming endpoint

// Allow dead code in test infrastructure - not every test binary uses every helper
#![allow(dead_code)]

pub mod soniox_realtime;
pub mod soniox_rest;
