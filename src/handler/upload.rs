//! Multipart upload endpoint
//!
//! Accepts a `video` file field and stores it in the video collection under a
//! generated unique name. The body is streamed to disk, never buffered whole.

use crate::config::AppState;
use crate::error::MediaError;
use crate::http::{self, partial::encode_uri_component, ResponseBody};
use crate::logger;
use crate::storage::Collection;
use futures_util::TryStreamExt;
use http_body_util::BodyExt;
use hyper::body::{Body, Bytes};
use hyper::http::request::Parts;
use hyper::{Response, StatusCode};
use serde::Serialize;

/// Multipart field carrying the uploaded file
const UPLOAD_FIELD: &str = "video";

#[derive(Debug, Serialize)]
struct UploadResponse {
    message: &'static str,
    name: String,
    original_name: Option<String>,
    content_type: Option<String>,
    size_bytes: u64,
    url: String,
}

pub async fn handle_upload<B>(parts: &Parts, body: B, state: &AppState) -> Response<ResponseBody>
where
    B: Body<Data = Bytes> + Send + 'static,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>> + 'static,
{
    match try_upload(parts, body, state).await {
        Ok(response) => response,
        Err(err) => {
            match &err {
                MediaError::Io(_) => logger::log_error(&format!("Upload failed: {err}")),
                _ => logger::log_warning(&format!("Upload rejected: {err}")),
            }
            http::build_error_response(&err)
        }
    }
}

async fn try_upload<B>(
    parts: &Parts,
    body: B,
    state: &AppState,
) -> Result<Response<ResponseBody>, MediaError>
where
    B: Body<Data = Bytes> + Send + 'static,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>> + 'static,
{
    let limit = state.config.storage.max_upload_size;
    check_declared_size(parts, limit)?;

    let content_type = parts
        .headers
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| MediaError::BadUpload("Expected multipart/form-data body".to_string()))?;
    let boundary = multer::parse_boundary(content_type)
        .map_err(|_| MediaError::BadUpload("Expected multipart/form-data body".to_string()))?;

    let constraints =
        multer::Constraints::new().size_limit(multer::SizeLimit::new().whole_stream(limit));
    let mut multipart =
        multer::Multipart::with_constraints(body.into_data_stream(), boundary, constraints);

    // Fields other than the file are skipped unread
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let original_name = field.file_name().map(ToString::to_string);
        let field_type = field.content_type().map(ToString::to_string);

        let stored = state
            .storage
            .store_upload(original_name.as_deref(), field.map_err(MediaError::from))
            .await?;
        logger::log_upload_stored(&stored.name, stored.size_bytes);

        let response = UploadResponse {
            message: "Video uploaded successfully",
            url: format!(
                "{}{}",
                Collection::Videos.url_prefix(),
                encode_uri_component(&stored.name)
            ),
            name: stored.name,
            original_name,
            content_type: field_type,
            size_bytes: stored.size_bytes,
        };
        return Ok(http::build_json_response(StatusCode::CREATED, &response));
    }

    Err(MediaError::BadUpload("No video file received".to_string()))
}

/// Reject early when Content-Length already exceeds the limit
fn check_declared_size(parts: &Parts, limit: u64) -> Result<(), MediaError> {
    let declared = parts
        .headers
        .get("content-length")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok());

    match declared {
        Some(size) if size > limit => Err(MediaError::PayloadTooLarge { limit }),
        _ => Ok(()),
    }
}
