//! Partial content responder
//!
//! Emits 200/206 responses for a resolved byte interval and streams exactly that
//! span from any seekable reader, in bounded chunks.

use super::range::Resolution;
use super::response::{log_build_error, ResponseBody};
use crate::error::MediaError;
use crate::logger;
use futures_util::StreamExt;
use http_body_util::{BodyExt, StreamBody};
use hyper::body::{Bytes, Frame};
use hyper::{Response, StatusCode};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use std::io::{self, SeekFrom};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncSeek, AsyncSeekExt};
use tokio_util::io::ReaderStream;

/// Default transfer chunk size
pub const DEFAULT_BUFFER_SIZE: usize = 64 * 1024;

/// Characters left alone by JavaScript's `encodeURIComponent`
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// How the client should treat the payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    /// Play/display in place (no Content-Disposition header)
    Inline,
    /// Save as a file with the given name
    Attachment(String),
}

impl Disposition {
    fn header_value(&self) -> Option<String> {
        match self {
            Self::Inline => None,
            Self::Attachment(name) => Some(format!(
                "attachment; filename=\"{}\"",
                encode_uri_component(name)
            )),
        }
    }
}

/// Percent-encode like JavaScript's `encodeURIComponent`
pub fn encode_uri_component(value: &str) -> String {
    utf8_percent_encode(value, URI_COMPONENT).to_string()
}

/// A readable resource of known length
pub struct RangeSource<R> {
    pub name: String,
    pub total_size: u64,
    pub reader: R,
}

/// Status and header set of a media response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseDescriptor {
    pub status: StatusCode,
    pub content_length: u64,
    pub content_type: &'static str,
    pub content_range: Option<String>,
    pub content_disposition: Option<String>,
}

impl ResponseDescriptor {
    pub fn new(
        resolution: Resolution,
        total_size: u64,
        content_type: &'static str,
        disposition: &Disposition,
    ) -> Self {
        let interval = resolution.interval();
        let (status, content_range) = match resolution {
            Resolution::Full(_) => (StatusCode::OK, None),
            Resolution::Partial(i) => (
                StatusCode::PARTIAL_CONTENT,
                Some(format!("bytes {}-{}/{total_size}", i.start, i.end)),
            ),
        };

        Self {
            status,
            content_length: interval.chunk_size(),
            content_type,
            content_range,
            content_disposition: disposition.header_value(),
        }
    }

    /// Descriptor for a zero-length resource requested without a Range header
    pub fn empty(content_type: &'static str, disposition: &Disposition) -> Self {
        Self {
            status: StatusCode::OK,
            content_length: 0,
            content_type,
            content_range: None,
            content_disposition: disposition.header_value(),
        }
    }

    /// Build the response around `body`
    pub fn into_response(self, body: ResponseBody) -> Response<ResponseBody> {
        let status = self.status;
        let mut builder = Response::builder()
            .status(status)
            .header("Content-Type", self.content_type)
            .header("Content-Length", self.content_length)
            .header("Accept-Ranges", "bytes");

        if let Some(range) = self.content_range {
            builder = builder.header("Content-Range", range);
        }
        if let Some(disposition) = self.content_disposition {
            builder = builder.header("Content-Disposition", disposition);
        }

        builder.body(body).unwrap_or_else(|e| {
            log_build_error(status.as_str(), &e);
            let mut fallback = Response::new(super::response::empty_body());
            *fallback.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
            fallback
        })
    }
}

/// Respond with the resolved span of `source`
///
/// Seeks to the interval start before any header is produced, so a failed seek is
/// still reportable as an ordinary error. Once the response is returned, failures
/// surface only as a truncated body plus a `StreamAborted` log line.
pub async fn respond<R>(
    source: RangeSource<R>,
    resolution: Resolution,
    content_type: &'static str,
    disposition: &Disposition,
    head_only: bool,
    buffer_size: usize,
) -> Result<Response<ResponseBody>, MediaError>
where
    R: AsyncRead + AsyncSeek + Unpin + Send + 'static,
{
    let descriptor = ResponseDescriptor::new(resolution, source.total_size, content_type, disposition);

    if head_only {
        return Ok(descriptor.into_response(super::response::empty_body()));
    }

    let interval = resolution.interval();
    let mut reader = source.reader;
    reader.seek(SeekFrom::Start(interval.start)).await?;

    if logger::debug_enabled() {
        logger::log_debug(&format!(
            "[Stream] {} bytes {}-{}/{} ({})",
            source.name,
            interval.start,
            interval.end,
            source.total_size,
            descriptor.status.as_u16()
        ));
    }

    let mut progress = TransferProgress::new(source.name, interval.chunk_size());
    let stream = ReaderStream::with_capacity(reader.take(interval.chunk_size()), buffer_size.max(1))
        .map(move |chunk| progress.record(chunk));

    Ok(descriptor.into_response(StreamBody::new(stream).boxed_unsync()))
}

/// Byte accounting for one transfer; reports an abort when dropped short
struct TransferProgress {
    name: String,
    expected: u64,
    sent: u64,
    failure: Option<String>,
}

impl TransferProgress {
    const fn new(name: String, expected: u64) -> Self {
        Self {
            name,
            expected,
            sent: 0,
            failure: None,
        }
    }

    fn record(&mut self, chunk: io::Result<Bytes>) -> io::Result<Frame<Bytes>> {
        match chunk {
            Ok(bytes) => {
                self.sent += u64::try_from(bytes.len()).unwrap_or(u64::MAX);
                Ok(Frame::data(bytes))
            }
            Err(e) => {
                self.failure = Some(e.to_string());
                Err(e)
            }
        }
    }

    fn abort_error(&self) -> Option<MediaError> {
        (self.sent < self.expected).then(|| MediaError::StreamAborted {
            name: self.name.clone(),
            sent: self.sent,
            expected: self.expected,
            reason: self
                .failure
                .clone()
                .unwrap_or_else(|| "client disconnected or resource truncated".to_string()),
        })
    }
}

impl Drop for TransferProgress {
    fn drop(&mut self) {
        if let Some(err) = self.abort_error() {
            logger::log_stream_aborted(&err);
        }
    }
}
