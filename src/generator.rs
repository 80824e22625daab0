//! 파일 기반 스트리밍 생성기
//!
//! 파일을 순서대로 읽어 청크를 Sink에 넣는다. 실시간 생성 스냅샷과 같은 경로로 전송된다.

use bytes::Bytes;
use tokio::io::AsyncReadExt;
use tracing::{debug, error, warn};

use crate::chunk::{Chunk, ChunkHeader};
use crate::sink::Sink;
use crate::snapshot::SnapshotDescriptor;

/// 스냅샷 파일을 `chunk_size` 단위로 읽어 `sink`에 제출
///
/// 열기/읽기 실패나 `file_size`에 못 미치는 파일은 poison 청크로 끝낸다.
/// 제출이 거절되면 바로 중단.
pub async fn stream_file(sink: Sink, snapshot: SnapshotDescriptor, chunk_size: usize) {
    assert!(chunk_size > 0, "chunk_size must be positive");

    let mut file = match tokio::fs::File::open(&snapshot.file_path).await {
        Ok(file) => file,
        Err(e) => {
            error!("스냅샷 파일 열기 실패: {}", e);
            abort(&sink).await;
            return;
        }
    };

    let mut sent = 0u64;
    let mut chunk_id = 0u64;
    loop {
        let mut buf = vec![0u8; chunk_size];
        let mut filled = 0;
        while filled < chunk_size {
            match file.read(&mut buf[filled..]).await {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) => {
                    error!("스냅샷 읽기 실패: {}", e);
                    abort(&sink).await;
                    return;
                }
            }
        }
        buf.truncate(filled);
        sent += filled as u64;

        // EOF인데 기대 크기에 못 미침
        if filled < chunk_size && sent < snapshot.file_size {
            warn!(
                "스냅샷 파일 잘림: {} ({} / {} 바이트)",
                snapshot.file_path, sent, snapshot.file_size
            );
            abort(&sink).await;
            return;
        }

        let header = ChunkHeader {
            cluster_id: snapshot.cluster_id,
            from: snapshot.from,
            node_id: sink.to_node_id(),
            index: snapshot.index,
            term: snapshot.term,
            chunk_id,
            offset: sent - filled as u64,
            file_size: snapshot.file_size,
            ..Default::default()
        };
        let last = sent >= snapshot.file_size;
        let chunk = if last {
            Chunk::last(header, Bytes::from(buf))
        } else {
            Chunk::new(header, Bytes::from(buf))
        };

        let outcome = sink.receive(chunk).await;
        if !outcome.is_accepted() {
            warn!("생성 중단: {:?}", outcome);
            return;
        }
        if last {
            debug!("스냅샷 생성 완료: {} 청크", chunk_id + 1);
            return;
        }
        chunk_id += 1;
    }
}

async fn abort(sink: &Sink) {
    sink.receive(Chunk::poison(sink.cluster_id(), sink.to_node_id()))
        .await;
}
