//! Media storage module
//!
//! Maps the two fixed collections onto configured directories, validates
//! client-supplied names, and opens read handles for streaming.

pub mod directory;
pub mod upload;

pub use directory::Entry;
pub use upload::StoredUpload;

use crate::config::StorageConfig;
use crate::error::MediaError;
use crate::http::mime;
use crate::http::partial::RangeSource;
use futures_util::Stream;
use hyper::body::Bytes;
use percent_encoding::percent_decode_str;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs::File;

/// The two served collections
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    /// Recorded/uploaded media, streamed inline
    Videos,
    /// Arbitrary files, delivered as attachments
    Downloads,
}

impl Collection {
    /// Content-Type used when the extension is not in the table
    pub const fn fallback_content_type(self) -> &'static str {
        match self {
            Self::Videos => mime::STREAM_FALLBACK,
            Self::Downloads => mime::DOWNLOAD_FALLBACK,
        }
    }

    /// API path prefix under which a collection member is fetched
    pub const fn url_prefix(self) -> &'static str {
        match self {
            Self::Videos => "/api/stream/",
            Self::Downloads => "/api/download/",
        }
    }
}

/// Filesystem-backed collections
#[derive(Debug, Clone)]
pub struct Storage {
    videos_dir: PathBuf,
    downloads_dir: PathBuf,
    video_extensions: Vec<String>,
}

impl Storage {
    pub fn new(config: &StorageConfig) -> Self {
        Self {
            videos_dir: PathBuf::from(&config.videos_dir),
            downloads_dir: PathBuf::from(&config.downloads_dir),
            video_extensions: config
                .video_extensions
                .iter()
                .map(|e| e.trim_start_matches('.').to_ascii_lowercase())
                .collect(),
        }
    }

    /// Create both collection directories if missing
    pub fn ensure_dirs(&self) -> io::Result<()> {
        std::fs::create_dir_all(&self.videos_dir)?;
        std::fs::create_dir_all(&self.downloads_dir)
    }

    pub fn dir(&self, collection: Collection) -> &Path {
        match collection {
            Collection::Videos => &self.videos_dir,
            Collection::Downloads => &self.downloads_dir,
        }
    }

    /// Open `raw_name` (still percent-encoded, as taken from the URL) for reading
    ///
    /// Anything that is not a regular file directly inside the collection
    /// directory, or is an upload still being written, is reported as `NotFound`.
    pub async fn open(
        &self,
        collection: Collection,
        raw_name: &str,
    ) -> Result<RangeSource<File>, MediaError> {
        let name = sanitize_name(raw_name)
            .filter(|n| !upload::is_temp_name(n))
            .ok_or(MediaError::NotFound)?;
        let path = self.dir(collection).join(&name);

        let file = File::open(&path).await.map_err(MediaError::from_open)?;
        let metadata = file.metadata().await?;
        if !metadata.is_file() {
            return Err(MediaError::NotFound);
        }

        Ok(RangeSource {
            name,
            total_size: metadata.len(),
            reader: file,
        })
    }

    /// List a collection; the video collection is filtered by extension
    pub async fn list(&self, collection: Collection) -> Result<Vec<Entry>, MediaError> {
        let filter = match collection {
            Collection::Videos => Some(self.video_extensions.as_slice()),
            Collection::Downloads => None,
        };
        directory::list(self.dir(collection), filter).await
    }

    /// Persist an uploaded file into the video collection
    pub async fn store_upload<S>(
        &self,
        original_name: Option<&str>,
        chunks: S,
    ) -> Result<StoredUpload, MediaError>
    where
        S: Stream<Item = Result<Bytes, MediaError>>,
    {
        upload::store(&self.videos_dir, original_name, chunks).await
    }
}

/// Decode and validate a single path segment naming a file
///
/// Rejects empty names, `.`/`..`, path separators and NUL, so the result can only
/// ever address a direct child of a collection directory.
pub fn sanitize_name(raw: &str) -> Option<String> {
    let decoded = percent_decode_str(raw).decode_utf8().ok()?;
    let name = decoded.as_ref();

    if name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\', '\0'])
    {
        return None;
    }

    Some(name.to_string())
}
