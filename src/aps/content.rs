//! Upload payloads, read one part at a time

use bytes::Bytes;
use std::path::PathBuf;
use tokio::fs::File;
use tokio::io::AsyncReadExt;

use super::Result;

/// Where upload content comes from
#[derive(Debug, Clone)]
pub enum ContentSource {
    /// A file on local disk, read part by part
    Path(PathBuf),
    Bytes(Bytes),
}

impl ContentSource {
    /// Payload size in bytes
    pub async fn size(&self) -> Result<u64> {
        match self {
            ContentSource::Path(path) => Ok(tokio::fs::metadata(path).await?.len()),
            ContentSource::Bytes(bytes) => Ok(bytes.len() as u64),
        }
    }

    /// Whole payload in memory
    pub async fn into_bytes(self) -> Result<Bytes> {
        match self {
            ContentSource::Path(path) => Ok(Bytes::from(tokio::fs::read(&path).await?)),
            ContentSource::Bytes(bytes) => Ok(bytes),
        }
    }

    /// Split the payload into parts of `part_size` bytes (the last may be shorter)
    pub async fn into_parts(self, part_size: usize) -> Result<PartReader> {
        let remaining = self.size().await?;
        let inner = match self {
            ContentSource::Path(path) => Inner::File(File::open(&path).await?),
            ContentSource::Bytes(bytes) => Inner::Memory(bytes),
        };
        Ok(PartReader {
            inner,
            part_size: part_size.max(1),
            remaining,
        })
    }
}

#[derive(Debug)]
enum Inner {
    File(File),
    Memory(Bytes),
}

/// Sequential reader handing out one upload part per call.
///
/// Only the current part is held in memory for file sources.
#[derive(Debug)]
pub struct PartReader {
    inner: Inner,
    part_size: usize,
    remaining: u64,
}

impl PartReader {
    /// Number of parts needed; an empty payload still takes one part
    pub fn part_count(&self) -> usize {
        (self.remaining.div_ceil(self.part_size as u64) as usize).max(1)
    }

    /// Next part, empty once the payload is exhausted
    pub async fn next_part(&mut self) -> Result<Bytes> {
        let want = self.remaining.min(self.part_size as u64) as usize;
        if want == 0 {
            return Ok(Bytes::new());
        }

        let part = match &mut self.inner {
            Inner::File(file) => {
                let mut buf = vec![0u8; want];
                file.read_exact(&mut buf).await?;
                Bytes::from(buf)
            }
            Inner::Memory(bytes) => bytes.split_to(want),
        };
        self.remaining -= want as u64;
        Ok(part)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_file_parts() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.rvt");
        std::fs::write(&path, b"abcdefg").unwrap();

        let source = ContentSource::Path(path);
        assert_eq!(source.size().await.unwrap(), 7);

        let mut parts = source.into_parts(3).await.unwrap();
        assert_eq!(parts.part_count(), 3);
        assert_eq!(&parts.next_part().await.unwrap()[..], b"abc");
        assert_eq!(&parts.next_part().await.unwrap()[..], b"def");
        assert_eq!(&parts.next_part().await.unwrap()[..], b"g");
        assert!(parts.next_part().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_memory_parts() {
        let source = ContentSource::Bytes(Bytes::from_static(b"abcd"));
        let mut parts = source.into_parts(2).await.unwrap();
        assert_eq!(parts.part_count(), 2);
        assert_eq!(&parts.next_part().await.unwrap()[..], b"ab");
        assert_eq!(&parts.next_part().await.unwrap()[..], b"cd");
    }

    #[tokio::test]
    async fn test_empty_payload_is_one_part() {
        let parts = ContentSource::Bytes(Bytes::new()).into_parts(5).await.unwrap();
        assert_eq!(parts.part_count(), 1);
    }

    #[tokio::test]
    async fn test_missing_file_fails() {
        let source = ContentSource::Path(PathBuf::from("/nonexistent/apsgate/model.rvt"));
        assert!(source.into_parts(5).await.is_err());
    }
}
