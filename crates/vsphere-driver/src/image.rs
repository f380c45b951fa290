//! Boot image acquisition.
//!
//! Images are streamed into a temporary file next to the destination and
//! renamed into place only once the whole body has been written, so a reader
//! of the destination path never observes a truncated image.

use crate::error::{DriverError, Result};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

/// Download `url` into `dir/file_name`.
///
/// The temporary file lives in `dir` so the final rename never crosses a
/// filesystem boundary. On any failure the temporary file is removed and an
/// existing file at the destination is left untouched.
///
/// # Errors
/// Returns [`DriverError::Download`] or [`DriverError::HttpStatus`] for
/// network failures and [`DriverError::Io`] for filesystem failures.
pub async fn fetch(dir: &Path, file_name: &str, url: &str) -> Result<PathBuf> {
    let start = std::time::Instant::now();
    tracing::debug!(url, dir = %dir.display(), file_name, "Fetching image");

    tokio::fs::create_dir_all(dir).await?;

    let download_error = |source| DriverError::Download {
        url: url.to_string(),
        source,
    };

    let mut response = reqwest::get(url).await.map_err(download_error)?;
    let status = response.status();
    if !status.is_success() {
        tracing::error!(url, status = status.as_u16(), "Image download rejected");
        return Err(DriverError::HttpStatus {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    let temp = tempfile::Builder::new()
        .prefix(&format!("{file_name}.tmp"))
        .tempfile_in(dir)?;
    // The TempPath removes the file when dropped on an error path.
    let (file, temp_path) = temp.into_parts();
    let mut file = tokio::fs::File::from_std(file);

    let mut written: u64 = 0;
    while let Some(chunk) = response.chunk().await.map_err(download_error)? {
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
        tracing::trace!(written, "Image chunk written");
    }
    file.flush().await?;
    drop(file);

    let destination = dir.join(file_name);
    temp_path.persist(&destination).map_err(|e| e.error)?;

    tracing::debug!(
        path = %destination.display(),
        bytes = written,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Image downloaded"
    );
    Ok(destination)
}
