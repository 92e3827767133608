//! HTTP and WebSocket request handlers
//!
//! - `api` - Health check endpoint
//! - `transcribe` - Multipart file transcription
//! - `relay` - Realtime streaming relay WebSocket
//! - `remote` - Listing and deletion of provider-side files and jobs

pub mod api;
pub mod relay;
pub mod remote;
pub mod transcribe;

// Re-export commonly used handlers for convenient access
pub use relay::relay_handler;
pub use transcribe::transcribe_handler;
