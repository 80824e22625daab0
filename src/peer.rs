//! 대상 노드 연결 인터페이스
//!
//! 주소 지정, 재연결, 전송 타임아웃은 구현체의 몫이다.

use async_trait::async_trait;

use crate::chunk::Chunk;
use crate::Result;

/// 하나의 대상으로 열린 스냅샷 연결
#[async_trait]
pub trait SnapshotConnection: Send {
    /// 청크 하나 전송
    async fn send_chunk(&mut self, chunk: &Chunk) -> Result<()>;

    /// 연결 닫기
    async fn close(&mut self);
}

/// 스냅샷 연결 생성기
#[async_trait]
pub trait ConnectionFactory: Send + Sync {
    async fn get_snapshot_connection(&self, addr: &str) -> Result<Box<dyn SnapshotConnection>>;
}
