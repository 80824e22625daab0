//! 테스트용 대상 연결/로더

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;

use crate::chunk::{Chunk, ChunkHeader};
use crate::config::TransferConfig;
use crate::connection::TransferConnection;
use crate::loader::ChunkLoader;
use crate::peer::{ConnectionFactory, SnapshotConnection};
use crate::signal::Signal;
use crate::snapshot::SnapshotDescriptor;
use crate::{Error, Result};

pub const TEST_CHUNK_SIZE: usize = 16;

#[derive(Default)]
struct Record {
    attempts: Mutex<Vec<u64>>,
    sent: Mutex<Vec<Chunk>>,
    closed: AtomicBool,
}

/// 전송된 청크를 기록하는 연결 생성기
#[derive(Clone)]
pub struct RecordingFactory {
    record: Arc<Record>,
    fail_at: Option<u64>,
}

impl RecordingFactory {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            record: Arc::new(Record::default()),
            fail_at: None,
        })
    }

    /// `chunk_id` 전송에서 실패
    pub fn failing_at(chunk_id: u64) -> Arc<Self> {
        Arc::new(Self {
            record: Arc::new(Record::default()),
            fail_at: Some(chunk_id),
        })
    }

    pub fn sent(&self) -> Vec<Chunk> {
        self.record.sent.lock().clone()
    }

    pub fn attempts(&self) -> Vec<u64> {
        self.record.attempts.lock().clone()
    }

    pub fn is_closed(&self) -> bool {
        self.record.closed.load(Ordering::SeqCst)
    }
}

struct RecordingConnection {
    record: Arc<Record>,
    fail_at: Option<u64>,
}

#[async_trait]
impl SnapshotConnection for RecordingConnection {
    async fn send_chunk(&mut self, chunk: &Chunk) -> Result<()> {
        self.record.attempts.lock().push(chunk.header.chunk_id);
        if self.fail_at == Some(chunk.header.chunk_id) {
            return Err(Error::ConnectionClosed);
        }
        self.record.sent.lock().push(chunk.clone());
        Ok(())
    }

    async fn close(&mut self) {
        self.record.closed.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl ConnectionFactory for RecordingFactory {
    async fn get_snapshot_connection(&self, _addr: &str) -> Result<Box<dyn SnapshotConnection>> {
        Ok(Box::new(RecordingConnection {
            record: self.record.clone(),
            fail_at: self.fail_at,
        }))
    }
}

/// 항상 연결에 실패하는 생성기
pub struct FailingFactory;

#[async_trait]
impl ConnectionFactory for FailingFactory {
    async fn get_snapshot_connection(&self, addr: &str) -> Result<Box<dyn SnapshotConnection>> {
        Err(Error::Io(std::io::Error::new(
            std::io::ErrorKind::ConnectionRefused,
            format!("refused: {}", addr),
        )))
    }
}

/// chunk_id별 고정 페이로드를 돌려주는 로더
pub struct ScriptedLoader {
    payloads: Vec<Bytes>,
    fail_at: Option<u64>,
    loads: Mutex<Vec<u64>>,
}

impl ScriptedLoader {
    pub fn new(payloads: &[&[u8]]) -> Arc<Self> {
        Arc::new(Self {
            payloads: payloads.iter().map(|p| Bytes::copy_from_slice(p)).collect(),
            fail_at: None,
            loads: Mutex::new(Vec::new()),
        })
    }

    pub fn failing_at(payloads: &[&[u8]], chunk_id: u64) -> Arc<Self> {
        Arc::new(Self {
            payloads: payloads.iter().map(|p| Bytes::copy_from_slice(p)).collect(),
            fail_at: Some(chunk_id),
            loads: Mutex::new(Vec::new()),
        })
    }

    pub fn loads(&self) -> Vec<u64> {
        self.loads.lock().clone()
    }
}

#[async_trait]
impl ChunkLoader for ScriptedLoader {
    async fn load(&self, chunk: &Chunk, buf: &mut [u8]) -> Result<usize> {
        let id = chunk.header.chunk_id;
        self.loads.lock().push(id);
        if self.fail_at == Some(id) {
            return Err(Error::Load(format!("chunk {} unreadable", id)));
        }
        let payload = self
            .payloads
            .get(id as usize)
            .ok_or_else(|| Error::Load(format!("no payload for chunk {}", id)))?;
        buf[..payload.len()].copy_from_slice(payload);
        Ok(payload.len())
    }
}

/// 버퍼보다 큰 길이를 돌려주는 잘못된 로더
pub struct OverreportingLoader;

#[async_trait]
impl ChunkLoader for OverreportingLoader {
    async fn load(&self, _chunk: &Chunk, buf: &mut [u8]) -> Result<usize> {
        Ok(buf.len() + 1)
    }
}

/// `chunk_count`개 청크로 나뉘는 스냅샷과 batch 연결
pub fn batch_connection(
    chunk_count: usize,
    factory: Arc<dyn ConnectionFactory>,
    loader: Arc<dyn ChunkLoader>,
) -> (TransferConnection, SnapshotDescriptor) {
    let config = TransferConfig {
        chunk_size: TEST_CHUNK_SIZE,
        ..TransferConfig::batch(42)
    };
    let snapshot = SnapshotDescriptor {
        cluster_id: 1,
        from: 1,
        to: 2,
        index: 100,
        term: 3,
        file_path: "snapshot.bin".into(),
        file_size: (chunk_count * TEST_CHUNK_SIZE) as u64,
    };
    let conn = TransferConnection::new(1, 2, config, chunk_count, factory, loader, Signal::new());
    (conn, snapshot)
}

pub fn streaming_connection(factory: Arc<dyn ConnectionFactory>) -> TransferConnection {
    TransferConnection::new(
        1,
        2,
        TransferConfig::streaming(42),
        0,
        factory,
        ScriptedLoader::new(&[]),
        Signal::new(),
    )
}

pub fn stream_chunk(chunk_id: u64, chunk_count: u64, data: &str) -> Chunk {
    Chunk::new(
        ChunkHeader {
            cluster_id: 1,
            from: 1,
            node_id: 2,
            chunk_id,
            chunk_count,
            ..Default::default()
        },
        Bytes::copy_from_slice(data.as_bytes()),
    )
}

pub fn payloads(chunks: &[Chunk]) -> Vec<String> {
    chunks
        .iter()
        .map(|c| String::from_utf8_lossy(&c.data).into_owned())
        .collect()
}
