//! Upload persistence
//!
//! Uploaded media is written once and never modified: bytes land in a hidden
//! temporary file in the target directory and are published under a freshly
//! generated name with a hard link, which fails instead of replacing an existing
//! file. Readers therefore never see a file whose length is still changing.

use crate::error::MediaError;
use crate::logger;
use futures_util::{Stream, StreamExt};
use hyper::body::Bytes;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::AsyncWriteExt;

const DEFAULT_BASE: &str = "recording";
const DEFAULT_EXTENSION: &str = ".webm";
const MAX_PUBLISH_ATTEMPTS: u32 = 64;
/// Longest generated base in bytes, well under common 255-byte name limits
const MAX_BASE_LEN: usize = 128;

/// Name prefix and suffix of in-progress upload files
const TEMP_PREFIX: &str = ".upload-";
const TEMP_SUFFIX: &str = ".part";

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Result of a successful upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredUpload {
    pub name: String,
    pub size_bytes: u64,
}

/// Whether `name` is an upload still being written
pub fn is_temp_name(name: &str) -> bool {
    name.starts_with(TEMP_PREFIX) && name.ends_with(TEMP_SUFFIX)
}

/// Removes the temp file when the upload finishes, fails or is cancelled
struct TempFileGuard {
    path: PathBuf,
}

impl Drop for TempFileGuard {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => logger::log_warning(&format!(
                "Failed to remove upload temp file '{}': {e}",
                self.path.display()
            )),
        }
    }
}

/// Stream `chunks` into `dir` under a generated unique name
pub async fn store<S>(
    dir: &Path,
    original_name: Option<&str>,
    chunks: S,
) -> Result<StoredUpload, MediaError>
where
    S: Stream<Item = Result<Bytes, MediaError>>,
{
    let millis = chrono::Utc::now().timestamp_millis();
    let temp_path = dir.join(format!(
        "{TEMP_PREFIX}{millis}-{}-{}{TEMP_SUFFIX}",
        std::process::id(),
        TEMP_COUNTER.fetch_add(1, Ordering::Relaxed)
    ));

    let file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&temp_path)
        .await?;
    let guard = TempFileGuard { path: temp_path };

    let size_bytes = write_chunks(file, chunks).await?;
    let name = publish(dir, &guard.path, original_name, millis).await?;

    Ok(StoredUpload { name, size_bytes })
}

async fn write_chunks<S>(mut file: File, chunks: S) -> Result<u64, MediaError>
where
    S: Stream<Item = Result<Bytes, MediaError>>,
{
    let mut chunks = std::pin::pin!(chunks);
    let mut written = 0u64;

    while let Some(chunk) = chunks.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        written += u64::try_from(chunk.len()).unwrap_or(u64::MAX);
    }

    file.flush().await?;
    file.sync_all().await?;
    Ok(written)
}

/// Link the finished temp file under the first free generated name
async fn publish(
    dir: &Path,
    temp_path: &Path,
    original_name: Option<&str>,
    millis: i64,
) -> Result<String, MediaError> {
    for attempt in 0..MAX_PUBLISH_ATTEMPTS {
        let name = generate_name(original_name, millis, attempt);
        let target: PathBuf = dir.join(&name);

        match fs::hard_link(temp_path, &target).await {
            Ok(()) => return Ok(name),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {}
            Err(e) => return Err(e.into()),
        }
    }

    Err(MediaError::Io(io::Error::new(
        io::ErrorKind::AlreadyExists,
        "no free upload name available",
    )))
}

/// Build `<base>-<millis>[-<attempt>]<ext>` from the client-supplied file name
///
/// Whitespace runs become '-', directory parts, leading dots and control
/// characters are dropped, the base is cut to `MAX_BASE_LEN` bytes, a missing
/// base becomes "recording" and a missing extension ".webm".
pub fn generate_name(original_name: Option<&str>, millis: i64, attempt: u32) -> String {
    let file_name = original_name
        .map(|n| n.rsplit(['/', '\\']).next().unwrap_or(n))
        .unwrap_or_default();

    let (stem, extension) = match file_name.rfind('.') {
        Some(i) if i > 0 && is_safe_extension(&file_name[i + 1..]) => {
            (&file_name[..i], &file_name[i..])
        }
        _ => (file_name, DEFAULT_EXTENSION),
    };

    let cleaned: String = stem.chars().filter(|c| !c.is_control()).collect();
    let mut base = cleaned
        .trim_start_matches('.')
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-");
    truncate_at_char_boundary(&mut base, MAX_BASE_LEN);
    let base = if base.is_empty() { DEFAULT_BASE } else { &base };

    if attempt == 0 {
        format!("{base}-{millis}{extension}")
    } else {
        format!("{base}-{millis}-{attempt}{extension}")
    }
}

fn truncate_at_char_boundary(value: &mut String, max_len: usize) {
    if value.len() > max_len {
        let cut = (0..=max_len)
            .rev()
            .find(|&i| value.is_char_boundary(i))
            .unwrap_or(0);
        value.truncate(cut);
    }
}

fn is_safe_extension(ext: &str) -> bool {
    !ext.is_empty() && ext.len() <= 16 && ext.bytes().all(|b| b.is_ascii_alphanumeric())
}
