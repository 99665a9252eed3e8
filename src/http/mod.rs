//! HTTP protocol layer module
//!
//! Range resolution, content types, and response building, decoupled from the
//! storage layout and routing.

pub mod mime;
pub mod partial;
pub mod range;
pub mod response;

// Re-export commonly used types
pub use partial::{Disposition, ResponseDescriptor};
pub use range::resolve;
pub use response::{
    apply_cors, build_405_response, build_error_response, build_json_response,
    build_options_response, empty_body, ResponseBody,
};
