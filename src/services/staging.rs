use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tracing::debug;

use crate::config::UploadConfig;

const COPY_BUFFER_SIZE: usize = 64 * 1024;

#[derive(Error, Debug)]
pub enum StagingError {
    #[error("file open for {} failed: {source}", path.display())]
    Open { path: PathBuf, source: io::Error },

    #[error("file i/o for {} failed: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },

    /// The incoming payload stream failed before it was fully staged.
    #[error("payload stream interrupted: {source}")]
    Stream { source: io::Error },
}

/// Bytes read back from a staged file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadBack {
    pub size: u64,
    pub content: Vec<u8>,
}

#[async_trait]
pub trait PayloadStore: Send + Sync {
    /// Write `data` to a fresh temp file and return its path.
    async fn stage_bytes(&self, data: &[u8]) -> Result<PathBuf, StagingError>;

    /// Drain `reader` into a fresh temp file and return its path.
    async fn stage_stream<'a>(
        &self,
        reader: Box<dyn AsyncRead + Unpin + Send + 'a>,
    ) -> Result<PathBuf, StagingError>;

    /// Read the whole file at `path`, sized by its metadata.
    async fn read_all(&self, path: &Path) -> Result<ReadBack, StagingError>;

    /// Directory new files are staged in.
    fn staging_dir(&self) -> &Path;
}

/// Stages payloads as named temp files that are kept on disk after the request.
pub struct TempFileStore {
    dir: PathBuf,
    prefix: String,
}

impl TempFileStore {
    pub fn new(dir: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            prefix: prefix.into(),
        }
    }

    pub fn from_config(config: &UploadConfig) -> Self {
        Self::new(config.temp_dir.clone(), config.temp_prefix.clone())
    }

    fn create_file(&self) -> Result<(tokio::fs::File, PathBuf), StagingError> {
        let named = tempfile::Builder::new()
            .prefix(&self.prefix)
            .tempfile_in(&self.dir)
            .map_err(|source| StagingError::Open {
                path: self.dir.clone(),
                source,
            })?;

        // Detach the path from the guard so the file survives the request.
        let (file, path) = named.keep().map_err(|e| StagingError::Open {
            path: e.file.path().to_path_buf(),
            source: e.error,
        })?;

        debug!("Allocated temp file {}", path.display());
        Ok((tokio::fs::File::from_std(file), path))
    }
}

#[async_trait]
impl PayloadStore for TempFileStore {
    async fn stage_bytes(&self, data: &[u8]) -> Result<PathBuf, StagingError> {
        let (mut file, path) = self.create_file()?;

        let written: io::Result<()> = async {
            file.write_all(data).await?;
            file.flush().await
        }
        .await;

        match written {
            Ok(()) => Ok(path),
            Err(source) => Err(StagingError::Io { path, source }),
        }
    }

    async fn stage_stream<'a>(
        &self,
        mut reader: Box<dyn AsyncRead + Unpin + Send + 'a>,
    ) -> Result<PathBuf, StagingError> {
        let (mut file, path) = self.create_file()?;
        let mut buffer = vec![0u8; COPY_BUFFER_SIZE];

        loop {
            let n = reader
                .read(&mut buffer)
                .await
                .map_err(|source| StagingError::Stream { source })?;
            if n == 0 {
                break;
            }
            if let Err(source) = file.write_all(&buffer[..n]).await {
                return Err(StagingError::Io { path, source });
            }
        }

        if let Err(source) = file.flush().await {
            return Err(StagingError::Io { path, source });
        }

        Ok(path)
    }

    async fn read_all(&self, path: &Path) -> Result<ReadBack, StagingError> {
        let open_error = |source| StagingError::Open {
            path: path.to_path_buf(),
            source,
        };
        let io_error = |source| StagingError::Io {
            path: path.to_path_buf(),
            source,
        };

        let size = tokio::fs::metadata(path).await.map_err(open_error)?.len();
        let file = tokio::fs::File::open(path).await.map_err(open_error)?;

        let mut content = Vec::with_capacity(usize::try_from(size).unwrap_or_default());
        file.take(size)
            .read_to_end(&mut content)
            .await
            .map_err(io_error)?;

        if content.len() as u64 != size {
            return Err(io_error(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("expected {} bytes, read {}", size, content.len()),
            )));
        }

        Ok(ReadBack { size, content })
    }

    fn staging_dir(&self) -> &Path {
        &self.dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_in(dir: &tempfile::TempDir) -> TempFileStore {
        TempFileStore::new(dir.path(), "latex")
    }

    #[tokio::test]
    async fn test_stage_bytes_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        let payload = b"\\documentclass{article}\n\x00\xff binary tail";

        let path = store.stage_bytes(payload).await.unwrap();
        let back = store.read_all(&path).await.unwrap();

        assert_eq!(back.size, payload.len() as u64);
        assert_eq!(back.content, payload);
    }

    #[tokio::test]
    async fn test_staged_file_is_kept_in_configured_dir() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        let path = store.stage_bytes(b"keep me").await.unwrap();

        assert!(path.starts_with(dir.path()));
        assert!(path.exists());
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("latex"));
    }

    #[tokio::test]
    async fn test_each_stage_gets_a_fresh_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        let first = store.stage_bytes(b"one").await.unwrap();
        let second = store.stage_bytes(b"two").await.unwrap();

        assert_ne!(first, second);
        assert_eq!(store.read_all(&first).await.unwrap().content, b"one");
        assert_eq!(store.read_all(&second).await.unwrap().content, b"two");
    }

    #[tokio::test]
    async fn test_empty_payload() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        let path = store.stage_bytes(b"").await.unwrap();
        let back = store.read_all(&path).await.unwrap();

        assert_eq!(back.size, 0);
        assert!(back.content.is_empty());
    }

    #[tokio::test]
    async fn test_stage_stream_larger_than_buffer() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        let payload: Vec<u8> = (0..COPY_BUFFER_SIZE * 3 + 17)
            .map(|i| (i % 251) as u8)
            .collect();

        let path = store
            .stage_stream(Box::new(std::io::Cursor::new(payload.clone())))
            .await
            .unwrap();
        let back = store.read_all(&path).await.unwrap();

        assert_eq!(back.size, payload.len() as u64);
        assert_eq!(back.content, payload);
    }

    #[tokio::test]
    async fn test_missing_staging_dir_is_open_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = TempFileStore::new(dir.path().join("does-not-exist"), "latex");

        let err = store.stage_bytes(b"data").await.unwrap_err();
        assert!(matches!(err, StagingError::Open { .. }));
    }

    #[tokio::test]
    async fn test_read_missing_file_is_open_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        let err = store.read_all(&dir.path().join("gone")).await.unwrap_err();
        assert!(matches!(err, StagingError::Open { .. }));
        assert!(err.to_string().starts_with("file open for"));
    }

    #[tokio::test]
    async fn test_stream_failure_is_reported_as_stream_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        let reader = failing_reader();

        let err = store.stage_stream(Box::new(reader)).await.unwrap_err();
        assert!(matches!(err, StagingError::Stream { .. }));
    }

    fn failing_reader() -> impl AsyncRead + Unpin + Send {
        let chunks: Vec<Result<bytes::Bytes, io::Error>> = vec![
            Ok(bytes::Bytes::from_static(b"partial")),
            Err(io::Error::new(io::ErrorKind::ConnectionReset, "client went away")),
        ];
        tokio_util::io::StreamReader::new(futures::stream::iter(chunks))
    }
}
