//! 실시간 스냅샷 생성기용 청크 Sink

use std::sync::Arc;

use crate::chunk::Chunk;
use crate::connection::{SubmitOutcome, TransferConnection};

/// 생성된 스냅샷 청크를 받는 Sink
///
/// 연결의 수명은 관리하지 않는다.
#[derive(Clone)]
pub struct Sink {
    conn: Arc<TransferConnection>,
}

impl Sink {
    pub(crate) fn new(conn: Arc<TransferConnection>) -> Self {
        Self { conn }
    }

    /// 청크 제출
    pub async fn receive(&self, chunk: Chunk) -> SubmitOutcome {
        self.conn.submit(chunk).await
    }

    /// 보내는 그룹 ID
    pub fn cluster_id(&self) -> u64 {
        self.conn.cluster_id()
    }

    /// 청크를 받아 처리할 노드 ID
    pub fn to_node_id(&self) -> u64 {
        self.conn.node_id()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{stream_chunk, streaming_connection, RecordingFactory};

    #[tokio::test]
    async fn test_identity_and_delegation() {
        let conn = Arc::new(streaming_connection(RecordingFactory::new()));
        let sink = conn.sink();

        assert_eq!(sink.cluster_id(), conn.cluster_id());
        assert_eq!(sink.to_node_id(), conn.node_id());
        assert_eq!(
            sink.receive(stream_chunk(0, 0, "a")).await,
            SubmitOutcome::Accepted
        );
    }
}
