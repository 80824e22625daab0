//! 에러 타입 정의

use thiserror::Error;

/// 스냅샷 전송 에러 타입
///
/// 로더/전송 실패는 감싸지 않고 그대로 전달된다.
#[derive(Error, Debug)]
pub enum Error {
    /// 외부 종료 신호 수신
    #[error("connection stopped")]
    Stopped,

    /// 생성기가 poison 청크로 스트림을 포기함
    #[error("stream snapshot failed")]
    StreamSnapshot,

    #[error("IO 에러: {0}")]
    Io(#[from] std::io::Error),

    #[error("직렬화 에러: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("유효하지 않은 매직 넘버: expected {expected:08X}, got {got:08X}")]
    InvalidMagicNumber { expected: u32, got: u32 },

    #[error("CRC 불일치: expected {expected:08X}, got {got:08X}")]
    CrcMismatch { expected: u32, got: u32 },

    #[error("청크 순서 오류: expected {expected}, got {got}")]
    ChunkOutOfOrder { expected: u64, got: u64 },

    #[error("예상하지 못한 청크: {0}")]
    UnexpectedChunk(String),

    #[error("청크 로드 실패: {0}")]
    Load(String),

    #[error("연결 종료")]
    ConnectionClosed,

    #[error("알 수 없는 에러: {0}")]
    Unknown(String),
}

/// Result 타입 별칭
pub type Result<T> = std::result::Result<T, Error>;
