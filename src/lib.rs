//! # snapxfer
//!
//! 멀티 그룹 Raft 엔진의 스냅샷 전송 연결
//!
//! ## 핵심 특징
//! - **청크 단위 전송**: 스냅샷을 고정 크기 청크로 나누어 순서대로 전송
//! - **두 가지 모드**: 저장된 스냅샷(batch)과 실시간 생성 스냅샷(streaming)
//! - **백프레셔**: 유한 큐 기반 흐름 제어
//! - **취소**: 공유 종료 신호와 연결별 실패 신호
//! - **청크 훅**: 전송 전 필터/변환, 전송 후 관찰

pub mod chunk;
pub mod config;
pub mod connection;
pub mod error;
pub mod generator;
pub mod hooks;
pub mod loader;
pub mod peer;
pub mod signal;
pub mod sink;
pub mod snapshot;
pub mod stats;
pub mod tcp;

#[cfg(test)]
mod testing;

pub use chunk::{Chunk, ChunkHeader, ChunkId};
pub use config::{TransferConfig, TransferMode};
pub use connection::{SendOutcome, SubmitOutcome, TransferConnection};
pub use error::{Error, Result};
pub use generator::stream_file;
pub use hooks::{ChunkHooks, PostSendHook, PreSendHook};
pub use loader::{ChunkLoader, FileChunkLoader};
pub use peer::{ConnectionFactory, SnapshotConnection};
pub use signal::Signal;
pub use sink::Sink;
pub use snapshot::{split_snapshot, SnapshotDescriptor};
pub use stats::TransferStats;
pub use tcp::{ReceivedSnapshot, SnapshotReceiver, TcpConnectionFactory, TcpSnapshotConnection};

/// 스트리밍 모드 큐 크기
pub const STREAMING_QUEUE_CAPACITY: usize = 16;

/// 기본 청크 페이로드 크기 (바이트)
pub const SNAPSHOT_CHUNK_SIZE: usize = 2 * 1024 * 1024; // 2MB

/// 생성기가 스트림을 포기했음을 나타내는 chunk_count 값
pub const POISON_CHUNK_COUNT: u64 = u64::MAX;

/// 스트리밍 전송의 마지막 청크를 나타내는 chunk_count 값
pub const LAST_CHUNK_COUNT: u64 = u64::MAX - 1;

/// 매직 넘버 (프레임 식별용)
pub const FRAME_MAGIC: u32 = 0x534E_4150; // "SNAP"
