//! HTTP response building module
//!
//! Builders for the fixed-size responses (errors, JSON, preflight). Streamed media
//! responses are built in [`super::partial`]; both share [`ResponseBody`].

use crate::error::MediaError;
use http_body_util::combinators::UnsyncBoxBody;
use http_body_util::{BodyExt, Empty, Full};
use hyper::body::Bytes;
use hyper::header::HeaderValue;
use hyper::{Response, StatusCode};
use serde::Serialize;
use std::io;

/// Body type of every response: either a buffered payload or a file stream
pub type ResponseBody = UnsyncBoxBody<Bytes, io::Error>;

pub fn full_body(data: impl Into<Bytes>) -> ResponseBody {
    Full::new(data.into())
        .map_err(|never| match never {})
        .boxed_unsync()
}

pub fn empty_body() -> ResponseBody {
    Empty::<Bytes>::new()
        .map_err(|never| match never {})
        .boxed_unsync()
}

/// Build JSON response
pub fn build_json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<ResponseBody> {
    let json = match serde_json::to_vec(body) {
        Ok(j) => j,
        Err(e) => {
            crate::logger::log_error(&format!("Failed to serialize response: {e}"));
            return Response::builder()
                .status(StatusCode::INTERNAL_SERVER_ERROR)
                .header("Content-Type", "application/json")
                .body(full_body(r#"{"error":"Internal server error"}"#))
                .unwrap_or_else(|_| Response::new(full_body("Error")));
        }
    };

    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .header("Content-Length", json.len())
        .body(full_body(json))
        .unwrap_or_else(|e| {
            log_build_error(status.as_str(), &e);
            Response::new(full_body("Error"))
        })
}

/// Build the client-facing response for a failed request
///
/// 416 additionally carries `Content-Range: bytes */{total_size}`.
pub fn build_error_response(err: &MediaError) -> Response<ResponseBody> {
    match err {
        MediaError::RangeNotSatisfiable { total_size } => build_416_response(*total_size),
        MediaError::EmptyResource => build_416_response(0),
        // Internal details stay in the error log
        MediaError::Io(_) | MediaError::DirectoryUnavailable { .. } | MediaError::StreamAborted { .. } => {
            build_json_response(
                err.status_code(),
                &serde_json::json!({ "error": "Internal server error" }),
            )
        }
        _ => build_json_response(
            err.status_code(),
            &serde_json::json!({ "error": err.to_string() }),
        ),
    }
}

/// Build 416 Range Not Satisfiable response
pub fn build_416_response(total_size: u64) -> Response<ResponseBody> {
    Response::builder()
        .status(StatusCode::RANGE_NOT_SATISFIABLE)
        .header("Content-Type", "text/plain")
        .header("Content-Range", format!("bytes */{total_size}"))
        .header("Accept-Ranges", "bytes")
        .body(full_body("Range Not Satisfiable"))
        .unwrap_or_else(|e| {
            log_build_error("416", &e);
            Response::new(full_body("Range Not Satisfiable"))
        })
}

/// Build 405 Method Not Allowed response
pub fn build_405_response() -> Response<ResponseBody> {
    Response::builder()
        .status(StatusCode::METHOD_NOT_ALLOWED)
        .header("Content-Type", "text/plain")
        .header("Allow", ALLOWED_METHODS)
        .body(full_body("405 Method Not Allowed"))
        .unwrap_or_else(|e| {
            log_build_error("405", &e);
            Response::new(full_body("405 Method Not Allowed"))
        })
}

/// Build OPTIONS response (preflight request)
pub fn build_options_response(enable_cors: bool) -> Response<ResponseBody> {
    let mut builder = Response::builder()
        .status(StatusCode::NO_CONTENT)
        .header("Allow", ALLOWED_METHODS);

    if enable_cors {
        builder = builder
            .header("Access-Control-Allow-Methods", ALLOWED_METHODS)
            .header("Access-Control-Allow-Headers", "Content-Type, Range")
            .header("Access-Control-Max-Age", "86400");
    }

    builder.body(empty_body()).unwrap_or_else(|e| {
        log_build_error("OPTIONS", &e);
        Response::new(empty_body())
    })
}

/// Attach CORS headers so the browser UI can read range metadata
pub fn apply_cors(response: &mut Response<ResponseBody>) {
    let headers = response.headers_mut();
    headers.insert("Access-Control-Allow-Origin", HeaderValue::from_static("*"));
    headers.insert(
        "Access-Control-Expose-Headers",
        HeaderValue::from_static(
            "Content-Range, Content-Length, Accept-Ranges, Content-Disposition",
        ),
    );
}

const ALLOWED_METHODS: &str = "GET, HEAD, POST, OPTIONS";

/// Log response build error
pub(crate) fn log_build_error(status: &str, error: &hyper::http::Error) {
    crate::logger::log_error(&format!("Failed to build {status} response: {error}"));
}
