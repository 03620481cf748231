//! Pull-based sources of raw NDJSON bytes.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncReadExt};

use schemaport_core::{Error, Result};

const CHUNK_SIZE: usize = 64 * 1024;

/// A source of raw text chunks; `None` marks the end of the stream.
///
/// Chunks carry no alignment guarantee: a line may span several chunks.
#[async_trait]
pub trait ChunkSource: Send {
    async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>>;
}

/// Reads fixed-size chunks from any async reader (stdin, a file, a socket).
#[derive(Debug)]
pub struct ReaderSource<R> {
    reader: R,
    chunk_size: usize,
}

impl<R> ReaderSource<R> {
    pub fn new(reader: R) -> Self {
        Self::with_chunk_size(reader, CHUNK_SIZE)
    }

    pub fn with_chunk_size(reader: R, chunk_size: usize) -> Self {
        Self {
            reader,
            chunk_size: chunk_size.max(1),
        }
    }
}

#[async_trait]
impl<R> ChunkSource for ReaderSource<R>
where
    R: AsyncRead + Unpin + Send,
{
    async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>> {
        let mut buffer = vec![0u8; self.chunk_size];
        let read = self.reader.read(&mut buffer).await?;
        if read == 0 {
            return Ok(None);
        }
        buffer.truncate(read);
        Ok(Some(buffer))
    }
}

/// Streams several NDJSON files one after another.
///
/// A newline is injected after a file that does not end with one so the
/// last line of a file never merges with the first line of the next.
#[derive(Debug)]
pub struct FileListSource {
    pending: VecDeque<PathBuf>,
    current: Option<ReaderSource<File>>,
    last_byte: Option<u8>,
}

impl FileListSource {
    pub fn new(paths: impl IntoIterator<Item = PathBuf>) -> Self {
        Self {
            pending: paths.into_iter().collect(),
            current: None,
            last_byte: None,
        }
    }
}

#[async_trait]
impl ChunkSource for FileListSource {
    async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>> {
        loop {
            if let Some(current) = self.current.as_mut() {
                match current.next_chunk().await? {
                    Some(chunk) => {
                        self.last_byte = chunk.last().copied();
                        return Ok(Some(chunk));
                    }
                    None => {
                        self.current = None;
                        if self.last_byte.take().is_some_and(|byte| byte != b'\n') {
                            return Ok(Some(vec![b'\n']));
                        }
                    }
                }
            }

            let Some(path) = self.pending.pop_front() else {
                return Ok(None);
            };
            tracing::debug!(event = "record_file_opened", path = %path.display());
            let file = File::open(&path)
                .await
                .map_err(|err| Error::Io(format!("{}: {err}", path.display())))?;
            self.current = Some(ReaderSource::new(file));
        }
    }
}

/// In-memory chunks, mostly useful for tests and small inputs.
#[derive(Debug, Default)]
pub struct ChunkList {
    chunks: VecDeque<Vec<u8>>,
}

impl ChunkList {
    pub fn new<I, C>(chunks: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<Vec<u8>>,
    {
        Self {
            chunks: chunks.into_iter().map(Into::into).collect(),
        }
    }

    /// Number of chunks not yet pulled.
    pub fn remaining(&self) -> usize {
        self.chunks.len()
    }
}

#[async_trait]
impl ChunkSource for ChunkList {
    async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>> {
        Ok(self.chunks.pop_front())
    }
}

/// List the `*.ndjson` files of a dataset directory in name order.
pub async fn dataset_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .map_err(|err| Error::Io(format!("{}: {err}", dir.display())))?;

    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == "ndjson") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn temp_dir(label: &str) -> PathBuf {
        let mut dir = std::env::temp_dir();
        dir.push(format!("schemaport_source_{label}_{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&dir).expect("create temp dir");
        dir
    }

    async fn drain(source: &mut impl ChunkSource) -> Vec<u8> {
        let mut out = Vec::new();
        while let Some(chunk) = source.next_chunk().await.unwrap() {
            out.extend(chunk);
        }
        out
    }

    #[tokio::test]
    async fn reader_source_splits_into_chunks() {
        let mut source = ReaderSource::with_chunk_size(&b"abcdefg"[..], 3);
        assert_eq!(source.next_chunk().await.unwrap(), Some(b"abc".to_vec()));
        assert_eq!(source.next_chunk().await.unwrap(), Some(b"def".to_vec()));
        assert_eq!(source.next_chunk().await.unwrap(), Some(b"g".to_vec()));
        assert_eq!(source.next_chunk().await.unwrap(), None);
    }

    #[tokio::test]
    async fn file_list_separates_files_without_trailing_newline() {
        let dir = temp_dir("files");
        fs::write(dir.join("a.ndjson"), "{\"n\":1}").unwrap();
        fs::write(dir.join("b.ndjson"), "{\"n\":2}\n").unwrap();
        fs::write(dir.join("notes.txt"), "ignored").unwrap();

        let files = dataset_files(&dir).await.unwrap();
        assert_eq!(files.len(), 2);

        let mut source = FileListSource::new(files);
        let bytes = drain(&mut source).await;
        assert_eq!(bytes, b"{\"n\":1}\n{\"n\":2}\n".to_vec());
    }

    #[tokio::test]
    async fn missing_file_is_an_io_error() {
        let mut source = FileListSource::new(vec![PathBuf::from("/nonexistent/a.ndjson")]);
        let err = source.next_chunk().await.unwrap_err();
        assert!(matches!(err, Error::Io(ref message) if message.contains("a.ndjson")));
    }
}
