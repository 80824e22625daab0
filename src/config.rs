//! 전송 설정

use crate::{SNAPSHOT_CHUNK_SIZE, STREAMING_QUEUE_CAPACITY};

/// 전송 모드
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferMode {
    /// 이미 저장된 스냅샷, 한 번에 분할해서 큐에 넣음
    Batch,

    /// 실시간 생성기가 청크를 하나씩 넣음
    Streaming,
}

/// 스냅샷 전송 설정
#[derive(Debug, Clone)]
pub struct TransferConfig {
    /// 전송 모드
    pub mode: TransferMode,

    /// 스트리밍 모드 큐 크기
    /// batch 모드는 전체 청크 수를 사용하므로 무시됨
    pub streaming_queue_capacity: usize,

    /// 모든 청크에 기록되는 배포 ID
    pub deployment_id: u64,

    /// 청크 페이로드 크기 (바이트)
    pub chunk_size: usize,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            mode: TransferMode::Batch,
            streaming_queue_capacity: STREAMING_QUEUE_CAPACITY,
            deployment_id: 0,
            chunk_size: SNAPSHOT_CHUNK_SIZE,
        }
    }
}

impl TransferConfig {
    /// 새 설정 생성
    pub fn new() -> Self {
        Self::default()
    }

    /// 저장된 스냅샷 전송용 설정
    pub fn batch(deployment_id: u64) -> Self {
        Self {
            mode: TransferMode::Batch,
            deployment_id,
            ..Self::default()
        }
    }

    /// 실시간 스트리밍 전송용 설정
    pub fn streaming(deployment_id: u64) -> Self {
        Self {
            mode: TransferMode::Streaming,
            deployment_id,
            ..Self::default()
        }
    }

    pub fn is_streaming(&self) -> bool {
        self.mode == TransferMode::Streaming
    }

    /// 큐 크기 결정
    ///
    /// batch 모드는 전체 청크 수, streaming 모드는 고정 상수
    pub fn queue_capacity(&self, chunk_count: usize) -> usize {
        match self.mode {
            TransferMode::Batch => chunk_count,
            TransferMode::Streaming => self.streaming_queue_capacity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_capacity_by_mode() {
        let batch = TransferConfig::batch(7);
        assert_eq!(batch.queue_capacity(42), 42);

        let streaming = TransferConfig::streaming(7);
        assert_eq!(streaming.queue_capacity(42), STREAMING_QUEUE_CAPACITY);
        assert!(streaming.is_streaming());
    }
}
