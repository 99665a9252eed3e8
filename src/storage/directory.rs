//! Directory listing

use crate::error::MediaError;
use crate::logger;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::Path;
use std::time::SystemTime;
use tokio::fs;

/// Metadata of one regular file in a collection
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Entry {
    pub name: String,
    pub size_bytes: u64,
    pub created_at: DateTime<Utc>,
}

/// List regular files directly inside `dir`, sorted by name
///
/// With `allowed_extensions`, only files whose (case-insensitive) extension is in
/// the list are kept. Entries that vanish or cannot be stat'ed mid-listing are
/// skipped; only an unreadable directory fails the whole call.
pub async fn list(
    dir: &Path,
    allowed_extensions: Option<&[String]>,
) -> Result<Vec<Entry>, MediaError> {
    let unavailable = |source| MediaError::DirectoryUnavailable {
        path: dir.to_path_buf(),
        source,
    };

    let mut read_dir = fs::read_dir(dir).await.map_err(unavailable)?;
    let mut entries = Vec::new();

    while let Some(dir_entry) = read_dir.next_entry().await.map_err(unavailable)? {
        let Ok(name) = dir_entry.file_name().into_string() else {
            continue;
        };

        if let Some(allowed) = allowed_extensions {
            if !has_allowed_extension(&name, allowed) {
                continue;
            }
        }

        // Follows symlinks, so a linked file is listed like a regular one
        let metadata = match fs::metadata(dir_entry.path()).await {
            Ok(m) if m.is_file() => m,
            Ok(_) => continue,
            Err(e) => {
                logger::log_debug(&format!("[List] Skipping '{name}': {e}"));
                continue;
            }
        };

        let created = metadata
            .created()
            .or_else(|_| metadata.modified())
            .unwrap_or(SystemTime::UNIX_EPOCH);

        entries.push(Entry {
            name,
            size_bytes: metadata.len(),
            created_at: DateTime::<Utc>::from(created),
        });
    }

    entries.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(entries)
}

fn has_allowed_extension(name: &str, allowed: &[String]) -> bool {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| allowed.iter().any(|a| a.eq_ignore_ascii_case(ext)))
}
