//! 전송 통계

use std::time::{Duration, Instant};

use crate::chunk::Chunk;

/// 스냅샷 전송 하나의 통계
#[derive(Debug, Clone)]
pub struct TransferStats {
    /// 시작 시간
    pub start_time: Instant,

    /// 전송된 청크 수
    pub chunks_sent: u64,

    /// 전송된 페이로드 바이트
    pub bytes_sent: u64,

    /// 전송 전 훅이 건너뛴 청크 수
    pub chunks_skipped: u64,

    /// 마지막으로 전송된 청크 ID
    pub last_chunk_id: Option<u64>,
}

impl TransferStats {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            chunks_sent: 0,
            bytes_sent: 0,
            chunks_skipped: 0,
            last_chunk_id: None,
        }
    }

    /// 전송 성공 기록
    pub fn record_sent(&mut self, chunk: &Chunk) {
        self.chunks_sent += 1;
        self.bytes_sent += chunk.data.len() as u64;
        self.last_chunk_id = Some(chunk.header.chunk_id);
    }

    pub fn record_skipped(&mut self) {
        self.chunks_skipped += 1;
    }

    /// 경과 시간
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// 처리율 (bytes/sec)
    pub fn throughput(&self) -> f64 {
        let elapsed = self.elapsed().as_secs_f64();
        if elapsed == 0.0 {
            return 0.0;
        }
        self.bytes_sent as f64 / elapsed
    }

    /// 통계 요약 문자열
    pub fn summary(&self) -> String {
        format!(
            "Elapsed: {:.2}s | Chunks: {} (skipped {}) | Bytes: {} | Throughput: {:.2} MB/s",
            self.elapsed().as_secs_f64(),
            self.chunks_sent,
            self.chunks_skipped,
            self.bytes_sent,
            self.throughput() / 1_000_000.0,
        )
    }
}

impl Default for TransferStats {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;
    use crate::chunk::ChunkHeader;

    #[test]
    fn test_record() {
        let mut stats = TransferStats::new();
        let mut header = ChunkHeader::default();
        header.chunk_id = 3;
        stats.record_sent(&Chunk::new(header, Bytes::from_static(b"12345")));
        stats.record_skipped();

        assert_eq!(stats.chunks_sent, 1);
        assert_eq!(stats.bytes_sent, 5);
        assert_eq!(stats.chunks_skipped, 1);
        assert_eq!(stats.last_chunk_id, Some(3));
        assert!(stats.summary().contains("skipped 1"));
    }
}
