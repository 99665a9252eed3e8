//! Media delivery module
//!
//! Streams collection members with Range support, inline or as attachments.

use crate::config::AppState;
use crate::error::MediaError;
use crate::http::{self, mime, partial, Disposition, ResponseBody, ResponseDescriptor};
use crate::logger;
use crate::storage::Collection;
use hyper::header::HeaderValue;
use hyper::{HeaderMap, Response};
use std::path::Path;

/// How a collection member is handed to the client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Inline,
    Attachment,
}

/// Serve `raw_name` from `collection`, honouring the request's Range header
pub async fn serve_media(
    state: &AppState,
    collection: Collection,
    raw_name: &str,
    delivery: Delivery,
    headers: &HeaderMap,
    head_only: bool,
) -> Response<ResponseBody> {
    let range_header = headers.get("range").and_then(|v| v.to_str().ok());

    match try_serve(state, collection, raw_name, delivery, range_header, head_only).await {
        Ok(response) => response,
        Err(err) => {
            if matches!(err, MediaError::Io(_)) {
                logger::log_error(&format!("Failed to serve '{raw_name}': {err}"));
            }
            let mut response = http::build_error_response(&err);
            response
                .headers_mut()
                .insert("Accept-Ranges", HeaderValue::from_static("bytes"));
            response
        }
    }
}

async fn try_serve(
    state: &AppState,
    collection: Collection,
    raw_name: &str,
    delivery: Delivery,
    range_header: Option<&str>,
    head_only: bool,
) -> Result<Response<ResponseBody>, MediaError> {
    let source = state.storage.open(collection, raw_name).await?;

    let content_type =
        mime::content_type_for(Path::new(&source.name), collection.fallback_content_type());
    let disposition = match delivery {
        Delivery::Inline => Disposition::Inline,
        Delivery::Attachment => Disposition::Attachment(source.name.clone()),
    };

    let resolution = match http::resolve(range_header, source.total_size) {
        Ok(resolution) => resolution,
        // An empty file is still a valid full response; only a range into it fails
        Err(MediaError::EmptyResource) if range_header.is_none() => {
            return Ok(ResponseDescriptor::empty(content_type, &disposition)
                .into_response(http::empty_body()));
        }
        Err(err) => return Err(err),
    };

    partial::respond(
        source,
        resolution,
        content_type,
        &disposition,
        head_only,
        state.config.storage.stream_buffer_size,
    )
    .await
}
