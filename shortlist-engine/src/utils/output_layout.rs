//! Output layout: `<output>/<genre dir>/<artist - title>.<ext>`

use crate::models::UNKNOWN_GENRE;
use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempPath;
use thiserror::Error;

const UNTITLED: &str = "Untitled";

/// Failure to move an accepted payload into the output layout
#[derive(Debug, Error)]
#[error("Failed to commit {destination}: {source}")]
pub struct CommitError {
    pub destination: PathBuf,
    #[source]
    pub source: io::Error,
}

/// Directory name for a genre: spaces become underscores
///
/// Names that would not stay one level below the output root (empty, `.`,
/// `..`) fall back to [`UNKNOWN_GENRE`].
pub fn genre_dir_name(genre: &str) -> String {
    path_component(genre, UNKNOWN_GENRE).replace(' ', "_")
}

/// File name for a track: `"artist - title.ext"`, or `"title.ext"` without artist
pub fn track_file_name(artist: &str, title: &str, extension: &str) -> String {
    let stem = if artist.trim().is_empty() {
        title.trim().to_string()
    } else {
        format!("{} - {}", artist.trim(), title.trim())
    };
    format!("{}.{}", path_component(&stem, UNTITLED), extension)
}

/// Final location of a committed track
pub fn destination(
    output_root: &Path,
    genre: &str,
    artist: &str,
    title: &str,
    extension: &str,
) -> PathBuf {
    output_root
        .join(genre_dir_name(genre))
        .join(track_file_name(artist, title, extension))
}

/// Single path component with separators replaced
fn path_component(name: &str, fallback: &str) -> String {
    let cleaned = name.trim().replace(['/', '\\'], "_");
    match cleaned.as_str() {
        "" | "." | ".." => fallback.to_string(),
        _ => cleaned,
    }
}

/// Move a transient payload to `destination`, replacing any existing file
///
/// Tries a rename first and falls back to copy-then-delete when the temp
/// file lives on another filesystem. On error the payload is dropped, which
/// deletes it.
pub fn commit(payload: TempPath, destination: &Path) -> Result<(), CommitError> {
    let fail = |source: io::Error| CommitError {
        destination: destination.to_path_buf(),
        source,
    };

    if let Some(parent) = destination.parent() {
        std::fs::create_dir_all(parent).map_err(fail)?;
    }

    match payload.persist(destination) {
        Ok(()) => Ok(()),
        Err(err) => {
            tracing::debug!(
                destination = %destination.display(),
                error = %err.error,
                "Rename failed, falling back to copy"
            );
            let payload = err.path;
            if let Err(e) = std::fs::copy(&payload, destination) {
                // Never leave a partial file behind in the output tree
                let _ = std::fs::remove_file(destination);
                return Err(fail(e));
            }
            if let Err(e) = payload.close() {
                tracing::warn!(error = %e, "Failed to delete transient file after copy");
            }
            Ok(())
        }
    }
}
