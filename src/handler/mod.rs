//! Request handler module
//!
//! Responsible for request routing dispatch and the media, listing and upload endpoints.

pub mod listing;
pub mod media;
pub mod router;
pub mod upload;

// Re-export main entry point
pub use router::handle_request;
