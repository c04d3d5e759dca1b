//! Temp staging area
//!
//! Upload streams are written to a temp file because ffprobe and ffmpeg need a path.
//! A [`StagedFile`] deletes its file when dropped, on every exit path of the pipeline.

use std::io;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use futures::{Stream, TryStreamExt};
use tempfile::TempPath;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_util::io::StreamReader;
use tokio_util::sync::CancellationToken;

use crate::error::ProcessingError;

/// Directory staged uploads are created in
#[derive(Debug, Clone)]
pub struct StagingArea {
    dir: PathBuf,
}

/// An upload written to a uniquely named temp file.
///
/// Dropping it closes the handle and removes the file.
#[derive(Debug)]
pub struct StagedFile {
    // Declared before `path` so the handle is closed before the file is removed.
    _file: File,
    path: TempPath,
    size: u64,
}

impl StagedFile {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn size(&self) -> u64 {
        self.size
    }
}

impl StagingArea {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Copy `stream` into a new temp file.
    ///
    /// Fails with `TooLarge` as soon as more than `max_bytes` arrive; the partial file
    /// is removed before returning.
    #[tracing::instrument(skip(self, stream, cancel), fields(staging.dir = %self.dir.display()))]
    pub async fn stage<S, E>(
        &self,
        stream: S,
        max_bytes: usize,
        cancel: &CancellationToken,
    ) -> Result<StagedFile, ProcessingError>
    where
        S: Stream<Item = Result<Bytes, E>> + Send,
        E: std::error::Error + Send + Sync + 'static,
    {
        tokio::fs::create_dir_all(&self.dir).await?;

        let temp = tempfile::Builder::new()
            .prefix("vidpub-upload-")
            .suffix(".mp4")
            .tempfile_in(&self.dir)?;
        let (std_file, path) = temp.into_parts();
        let mut file = File::from_std(std_file);

        let reader = StreamReader::new(Box::pin(stream.map_err(io::Error::other)));
        // One byte past the limit is enough to tell an oversized upload apart.
        let mut limited = reader.take(max_bytes as u64 + 1);

        let copied = tokio::select! {
            copied = tokio::io::copy(&mut limited, &mut file) => copied?,
            _ = cancel.cancelled() => return Err(ProcessingError::Cancelled),
        };

        if copied > max_bytes as u64 {
            tracing::debug!(max_bytes, "Upload exceeded size limit while staging");
            return Err(ProcessingError::TooLarge { max: max_bytes });
        }

        file.flush().await?;

        tracing::debug!(path = %path.display(), size_bytes = copied, "Upload staged");

        Ok(StagedFile {
            _file: file,
            path,
            size: copied,
        })
    }
}
