//! 청크 훅
//!
//! 전송 시작 전에 한 번 설정하고, 소비 루프는 시작 시점의 스냅샷을 사용한다.

use std::fmt;
use std::sync::Arc;

use crate::chunk::Chunk;

/// 전송 전 훅: (변경된 청크, 전송 여부) 반환
pub type PreSendHook = Arc<dyn Fn(Chunk) -> (Chunk, bool) + Send + Sync>;

/// 전송 후 관찰자
pub type PostSendHook = Arc<dyn Fn(&Chunk) + Send + Sync>;

/// 연결에 설정된 훅 묶음
#[derive(Clone, Default)]
pub struct ChunkHooks {
    pub pre_send: Option<PreSendHook>,

    /// batch 모드에서만 호출된다
    pub post_send: Option<PostSendHook>,
}

impl ChunkHooks {
    /// 전송 전 훅 적용, 훅이 없으면 그대로 전송
    pub fn before_send(&self, chunk: Chunk) -> (Chunk, bool) {
        match &self.pre_send {
            Some(hook) => hook(chunk),
            None => (chunk, true),
        }
    }

    pub fn after_send(&self, chunk: &Chunk) {
        if let Some(hook) = &self.post_send {
            hook(chunk);
        }
    }
}

impl fmt::Debug for ChunkHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChunkHooks")
            .field("pre_send", &self.pre_send.is_some())
            .field("post_send", &self.post_send.is_some())
            .finish()
    }
}
