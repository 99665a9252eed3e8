//! MIME type lookup module
//!
//! Static extension to Content-Type table. Callers pick their own fallback:
//! streaming defaults to `video/mp4`, downloads to `application/octet-stream`.

use std::path::Path;

pub const STREAM_FALLBACK: &str = "video/mp4";
pub const DOWNLOAD_FALLBACK: &str = "application/octet-stream";

/// Look up the Content-Type for a (lowercase) file extension
pub fn lookup(extension: &str) -> Option<&'static str> {
    let content_type = match extension {
        // Text
        "html" | "htm" => "text/html; charset=utf-8",
        "css" => "text/css",
        "txt" | "md" => "text/plain; charset=utf-8",
        "csv" => "text/csv",
        "xml" => "application/xml",

        // JavaScript/WASM
        "js" | "mjs" => "application/javascript",
        "json" => "application/json",
        "wasm" => "application/wasm",

        // Images
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "ico" => "image/x-icon",
        "webp" => "image/webp",

        // Video
        "mp4" | "m4v" => "video/mp4",
        "webm" => "video/webm",
        "ogg" | "ogv" => "video/ogg",
        "mov" => "video/quicktime",
        "avi" => "video/x-msvideo",
        "mkv" => "video/x-matroska",

        // Audio
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "flac" => "audio/flac",
        "m4a" => "audio/mp4",

        // Documents and archives
        "pdf" => "application/pdf",
        "zip" => "application/zip",
        "gz" | "gzip" => "application/gzip",
        "tar" => "application/x-tar",
        "7z" => "application/x-7z-compressed",

        _ => return None,
    };
    Some(content_type)
}

/// Content-Type for a file path, `fallback` when the extension is unknown or missing
pub fn content_type_for(path: &Path, fallback: &'static str) -> &'static str {
    path.extension()
        .and_then(|e| e.to_str())
        .and_then(|e| lookup(&e.to_ascii_lowercase()))
        .unwrap_or(fallback)
}
