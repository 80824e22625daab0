//! 청크 페이로드 로더
//!
//! batch 모드는 전송 직전에 청크 하나씩 디스크에서 읽는다.

use std::io::SeekFrom;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tracing::debug;

use crate::chunk::Chunk;
use crate::{Error, Result};

/// 청크 메타데이터로 페이로드를 채우는 로더
///
/// 같은 버퍼로 반복 호출될 수 있다.
#[async_trait]
pub trait ChunkLoader: Send + Sync {
    /// `buf`에 페이로드를 채우고 채운 바이트 수 반환
    async fn load(&self, chunk: &Chunk, buf: &mut [u8]) -> Result<usize>;
}

/// 스냅샷 파일에서 청크 범위(`offset`, `chunk_size`)를 읽는 로더
#[derive(Debug, Clone, Default)]
pub struct FileChunkLoader;

impl FileChunkLoader {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ChunkLoader for FileChunkLoader {
    async fn load(&self, chunk: &Chunk, buf: &mut [u8]) -> Result<usize> {
        let header = &chunk.header;
        let len = header.chunk_size as usize;
        if len > buf.len() {
            return Err(Error::Load(format!(
                "청크 {} 크기 {} > 버퍼 {}",
                header.chunk_id,
                len,
                buf.len()
            )));
        }

        let offset = header.offset;
        let mut file = tokio::fs::File::open(&header.file_path).await?;
        file.seek(SeekFrom::Start(offset)).await?;

        let mut filled = 0;
        while filled < len {
            let n = file.read(&mut buf[filled..len]).await?;
            if n == 0 {
                return Err(Error::Load(format!(
                    "{}: offset {}에서 {} 바이트 부족",
                    header.file_path,
                    offset,
                    len - filled
                )));
            }
            filled += n;
        }

        debug!(
            "청크 로드: {} [{}..{})",
            header.file_path,
            offset,
            offset + len as u64
        );
        Ok(filled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::{split_snapshot, SnapshotDescriptor};

    #[tokio::test]
    async fn test_load_each_chunk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snap.bin");
        let data: Vec<u8> = (0..250u32).map(|v| v as u8).collect();
        tokio::fs::write(&path, &data).await.unwrap();

        let snapshot = SnapshotDescriptor::from_file(&path, 1, 1, 2, 10, 1).await.unwrap();
        let chunks = split_snapshot(&snapshot, 100);
        let loader = FileChunkLoader::new();

        let mut buf = vec![0u8; 100];
        let mut assembled = Vec::new();
        for chunk in &chunks {
            let n = loader.load(chunk, &mut buf).await.unwrap();
            assembled.extend_from_slice(&buf[..n]);
        }
        assert_eq!(assembled, data);
    }

    #[tokio::test]
    async fn test_load_uses_header_offset() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snap.bin");
        let data: Vec<u8> = (0..250u32).map(|v| v as u8).collect();
        tokio::fs::write(&path, &data).await.unwrap();

        // 로더의 버퍼 크기와 무관하게 분할 시 기록된 범위를 읽는다
        let snapshot = SnapshotDescriptor::from_file(&path, 1, 1, 2, 10, 1).await.unwrap();
        let chunks = split_snapshot(&snapshot, 60);
        let loader = FileChunkLoader::new();

        let mut buf = vec![0u8; 4096];
        let n = loader.load(&chunks[3], &mut buf).await.unwrap();
        assert_eq!(chunks[3].header.offset, 180);
        assert_eq!(&buf[..n], &data[180..240]);
    }

    #[tokio::test]
    async fn test_truncated_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snap.bin");
        tokio::fs::write(&path, vec![1u8; 150]).await.unwrap();

        let mut snapshot = SnapshotDescriptor::from_file(&path, 1, 1, 2, 10, 1).await.unwrap();
        snapshot.file_size = 200;
        let chunks = split_snapshot(&snapshot, 100);
        let loader = FileChunkLoader::new();

        let mut buf = vec![0u8; 100];
        assert_eq!(loader.load(&chunks[0], &mut buf).await.unwrap(), 100);
        assert!(matches!(
            loader.load(&chunks[1], &mut buf).await,
            Err(Error::Load(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_file_is_io_error() {
        let snapshot = SnapshotDescriptor {
            file_path: "/nonexistent/snapxfer/snap.bin".into(),
            file_size: 10,
            ..Default::default()
        };
        let chunks = split_snapshot(&snapshot, 100);
        let mut buf = vec![0u8; 100];
        assert!(matches!(
            FileChunkLoader::new().load(&chunks[0], &mut buf).await,
            Err(Error::Io(_))
        ));
    }
}
