//! Error types shared by the range, storage and handler layers.

use hyper::StatusCode;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MediaError {
    /// Resource exists but holds zero bytes, so no byte interval can be formed
    #[error("resource is empty")]
    EmptyResource,

    #[error("resource not found")]
    NotFound,

    /// Requested range lies outside the resource
    #[error("range not satisfiable for resource of {total_size} bytes")]
    RangeNotSatisfiable { total_size: u64 },

    #[error("directory unavailable '{}': {source}", path.display())]
    DirectoryUnavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Transfer ended before the promised byte count was delivered.
    /// Headers are already on the wire, so this is only ever logged.
    #[error("stream of '{name}' aborted after {sent}/{expected} bytes: {reason}")]
    StreamAborted {
        name: String,
        sent: u64,
        expected: u64,
        reason: String,
    },

    #[error("{0}")]
    BadUpload(String),

    #[error("payload exceeds limit of {limit} bytes")]
    PayloadTooLarge { limit: u64 },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl MediaError {
    /// HTTP status a client sees for this error
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::RangeNotSatisfiable { .. } | Self::EmptyResource => {
                StatusCode::RANGE_NOT_SATISFIABLE
            }
            Self::BadUpload(_) => StatusCode::BAD_REQUEST,
            Self::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::DirectoryUnavailable { .. } | Self::StreamAborted { .. } | Self::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Map an I/O failure on a named resource, folding "missing" into `NotFound`
    pub fn from_open(err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::NotFound {
            Self::NotFound
        } else {
            Self::Io(err)
        }
    }
}

impl From<multer::Error> for MediaError {
    fn from(err: multer::Error) -> Self {
        match err {
            multer::Error::StreamSizeExceeded { limit }
            | multer::Error::FieldSizeExceeded { limit, .. } => Self::PayloadTooLarge { limit },
            other => Self::BadUpload(other.to_string()),
        }
    }
}
