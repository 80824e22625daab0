//! 저장된 스냅샷 분할
//!
//! 페이로드는 읽지 않고 청크 메타데이터만 만든다.

use std::path::Path;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::chunk::{Chunk, ChunkHeader, ChunkId};
use crate::Result;

/// 디스크에 저장된 스냅샷 정보
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotDescriptor {
    pub cluster_id: u64,
    pub from: u64,
    pub to: u64,
    pub index: u64,
    pub term: u64,
    pub file_path: String,
    pub file_size: u64,
}

impl SnapshotDescriptor {
    /// 파일 크기를 읽어 스냅샷 정보 생성
    pub async fn from_file(
        path: impl AsRef<Path>,
        cluster_id: u64,
        from: u64,
        to: u64,
        index: u64,
        term: u64,
    ) -> Result<Self> {
        let path = path.as_ref();
        let metadata = tokio::fs::metadata(path).await?;

        Ok(Self {
            cluster_id,
            from,
            to,
            index,
            term,
            file_path: path.to_string_lossy().into_owned(),
            file_size: metadata.len(),
        })
    }

    /// 청크 크기 기준 청크 수 (빈 파일도 청크 1개)
    pub fn chunk_count(&self, chunk_size: usize) -> u64 {
        self.file_size.div_ceil(chunk_size as u64).max(1)
    }
}

/// 스냅샷을 청크 메타데이터 목록으로 분할
///
/// 각 청크의 `chunk_size`는 로드할 바이트 수이며 `data`는 비어 있다.
pub fn split_snapshot(snapshot: &SnapshotDescriptor, chunk_size: usize) -> Vec<Chunk> {
    assert!(chunk_size > 0, "chunk_size must be positive");

    let count = snapshot.chunk_count(chunk_size);
    let chunk_size = chunk_size as u64;

    (0..count)
        .map(|idx| {
            let offset = idx * chunk_size;
            let len = snapshot.file_size.saturating_sub(offset).min(chunk_size);
            Chunk {
                header: ChunkHeader {
                    cluster_id: snapshot.cluster_id,
                    from: snapshot.from,
                    node_id: snapshot.to,
                    index: snapshot.index,
                    term: snapshot.term,
                    chunk_id: idx as ChunkId,
                    chunk_count: count,
                    chunk_size: len,
                    offset,
                    file_size: snapshot.file_size,
                    file_path: snapshot.file_path.clone(),
                    ..Default::default()
                },
                data: Bytes::new(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(file_size: u64) -> SnapshotDescriptor {
        SnapshotDescriptor {
            cluster_id: 1,
            from: 2,
            to: 3,
            index: 100,
            term: 5,
            file_path: "/tmp/snapshot.gbsnap".into(),
            file_size,
        }
    }

    #[test]
    fn test_split_covers_file() {
        let chunks = split_snapshot(&descriptor(250), 100);

        assert_eq!(chunks.len(), 3);
        let sizes: Vec<u64> = chunks.iter().map(|c| c.header.chunk_size).collect();
        assert_eq!(sizes, vec![100, 100, 50]);
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.header.chunk_id, i as u64);
            assert_eq!(chunk.header.chunk_count, 3);
            assert_eq!(chunk.header.node_id, 3);
            assert!(chunk.data.is_empty());
        }
        assert!(chunks[2].is_final());
    }

    #[test]
    fn test_split_empty_snapshot() {
        let chunks = split_snapshot(&descriptor(0), 100);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].header.chunk_size, 0);
        assert!(chunks[0].is_final());
    }

    #[test]
    fn test_chunk_count_huge_file() {
        let snapshot = descriptor(u64::MAX - 10);
        assert_eq!(snapshot.chunk_count(1), u64::MAX - 10);
        assert_eq!(snapshot.chunk_count(1 << 20), (u64::MAX >> 20) + 1);
    }

    #[tokio::test]
    async fn test_descriptor_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snap.bin");
        tokio::fs::write(&path, vec![7u8; 1234]).await.unwrap();

        let snapshot = SnapshotDescriptor::from_file(&path, 1, 2, 3, 10, 1).await.unwrap();
        assert_eq!(snapshot.file_size, 1234);
        assert_eq!(snapshot.chunk_count(1000), 2);
    }
}
