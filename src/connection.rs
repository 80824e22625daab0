//! 스냅샷 전송 연결
//!
//! - 생산자 → 유한 큐 → 소비 루프 → (전송 전 훅) → 대상 연결 → (전송 후 훅)
//! - batch 모드: 큐 크기 = 전체 청크 수, 전송 직전 청크별 로드
//! - streaming 모드: 고정 크기 큐, 생성기가 Sink로 청크를 넣음
//!
//! 전송 하나당 연결 하나, 재사용하지 않는다.

use std::sync::Arc;

use bytes::Bytes;
use parking_lot::{Mutex, RwLock};
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, error, info, warn};

use crate::chunk::Chunk;
use crate::config::{TransferConfig, TransferMode};
use crate::hooks::{ChunkHooks, PostSendHook, PreSendHook};
use crate::loader::ChunkLoader;
use crate::peer::{ConnectionFactory, SnapshotConnection};
use crate::signal::Signal;
use crate::sink::Sink;
use crate::snapshot::{split_snapshot, SnapshotDescriptor};
use crate::stats::TransferStats;
use crate::{Error, Result};

/// 청크 제출 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// 큐에 들어감
    Accepted,

    /// 소비 루프가 이미 실패함, 생산 중단
    RejectedByFailure,

    /// 외부 종료 요청, 생산 중단
    RejectedByShutdown,
}

impl SubmitOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, SubmitOutcome::Accepted)
    }

    pub fn is_shutdown(&self) -> bool {
        matches!(self, SubmitOutcome::RejectedByShutdown)
    }
}

/// 청크 하나의 전송 결과
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// 전송됨 (훅이 바꾼 청크 포함)
    Sent(Chunk),

    /// 전송 전 훅이 건너뜀, 실패가 아님
    Skipped,
}

/// 대상 노드 하나로의 스냅샷 전송 연결
pub struct TransferConnection {
    /// 그룹 ID
    cluster_id: u64,

    /// 대상 노드 ID
    node_id: u64,

    /// 설정
    config: TransferConfig,

    /// 큐 크기
    capacity: usize,

    /// 대상 연결 생성기
    factory: Arc<dyn ConnectionFactory>,

    /// batch 모드 페이로드 로더
    loader: Arc<dyn ChunkLoader>,

    /// 큐 송신측 (생산자)
    tx: mpsc::Sender<Chunk>,

    /// 큐 수신측, 소비 루프가 시작할 때 가져감
    rx: Mutex<Option<mpsc::Receiver<Chunk>>>,

    /// 대상 연결 (connect 이후 존재)
    conn: tokio::sync::Mutex<Option<Box<dyn SnapshotConnection>>>,

    /// 전송 계층과 공유하는 종료 신호
    stopper: Signal,

    /// 소비 루프 실패 신호 (연결 전용)
    failed: Signal,

    /// 청크 훅
    hooks: RwLock<ChunkHooks>,

    /// 전송 통계
    stats: RwLock<TransferStats>,
}

impl TransferConnection {
    /// 새 전송 연결 생성
    ///
    /// `chunk_count`는 batch 모드의 큐 크기로 쓰이고 streaming 모드에서는 무시된다.
    /// 네트워크 자원은 열지 않는다.
    pub fn new(
        cluster_id: u64,
        node_id: u64,
        config: TransferConfig,
        chunk_count: usize,
        factory: Arc<dyn ConnectionFactory>,
        loader: Arc<dyn ChunkLoader>,
        stopper: Signal,
    ) -> Self {
        let capacity = config.queue_capacity(chunk_count);
        assert!(capacity > 0, "queue capacity must be positive");

        let (tx, rx) = mpsc::channel(capacity);

        Self {
            cluster_id,
            node_id,
            config,
            capacity,
            factory,
            loader,
            tx,
            rx: Mutex::new(Some(rx)),
            conn: tokio::sync::Mutex::new(None),
            stopper,
            failed: Signal::new(),
            hooks: RwLock::new(ChunkHooks::default()),
            stats: RwLock::new(TransferStats::new()),
        }
    }

    pub fn cluster_id(&self) -> u64 {
        self.cluster_id
    }

    pub fn node_id(&self) -> u64 {
        self.node_id
    }

    pub fn deployment_id(&self) -> u64 {
        self.config.deployment_id
    }

    pub fn mode(&self) -> TransferMode {
        self.config.mode
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// 통계 반환
    pub fn stats(&self) -> TransferStats {
        self.stats.read().clone()
    }

    /// 생성기용 Sink
    pub fn sink(self: &Arc<Self>) -> Sink {
        Sink::new(self.clone())
    }

    /// 전송 전 훅 설정 (process 시작 전에만 유효)
    pub fn set_pre_send_hook(&self, hook: PreSendHook) {
        self.warn_if_started("pre-send");
        self.hooks.write().pre_send = Some(hook);
    }

    /// 전송 후 관찰자 설정 (process 시작 전에만 유효, batch 모드에서만 호출됨)
    pub fn set_post_send_hook(&self, hook: PostSendHook) {
        self.warn_if_started("post-send");
        self.hooks.write().post_send = Some(hook);
    }

    fn warn_if_started(&self, name: &str) {
        if self.rx.lock().is_none() {
            warn!(
                "{} hook set after processing started, ignored for {}:{}",
                name, self.cluster_id, self.node_id
            );
        }
    }

    /// 대상 주소로 연결, 재시도는 호출자의 몫
    pub async fn connect(&self, addr: &str) -> Result<()> {
        match self.factory.get_snapshot_connection(addr).await {
            Ok(conn) => {
                *self.conn.lock().await = Some(conn);
                debug!("snapshot connection to {} established", addr);
                Ok(())
            }
            Err(e) => {
                error!("failed to get a connection to {}, {}", addr, e);
                Err(e)
            }
        }
    }

    /// 연결 닫기
    pub async fn close(&self) {
        if let Some(mut conn) = self.conn.lock().await.take() {
            conn.close().await;
        }
    }

    /// 청크 제출
    ///
    /// 큐가 가득 차 있고 종료/실패 신호가 없을 때만 대기한다.
    pub async fn submit(&self, chunk: Chunk) -> SubmitOutcome {
        tokio::select! {
            biased;
            _ = self.stopper.wait() => SubmitOutcome::RejectedByShutdown,
            _ = self.failed.wait() => SubmitOutcome::RejectedByFailure,
            res = self.tx.send(chunk) => match res {
                Ok(()) => SubmitOutcome::Accepted,
                // 소비 루프가 끝나 수신측이 사라짐
                Err(_) => SubmitOutcome::RejectedByFailure,
            },
        }
    }

    /// 저장된 스냅샷 전체를 분할해서 큐에 넣음
    ///
    /// 분할 결과가 큐 크기와 다르면 panic.
    pub fn submit_whole(&self, snapshot: &SnapshotDescriptor) {
        if self.config.mode != TransferMode::Batch {
            panic!("submit_whole called on a streaming connection");
        }

        let chunks = split_snapshot(snapshot, self.config.chunk_size);
        if chunks.len() != self.capacity {
            panic!(
                "cap of queue is {}, want {}",
                self.capacity,
                chunks.len()
            );
        }

        for chunk in chunks {
            match self.tx.try_send(chunk) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => panic!("batch queue overflow"),
                Err(TrySendError::Closed(_)) => {
                    warn!(
                        "snapshot queue to {}:{} already closed",
                        self.cluster_id, self.node_id
                    );
                    return;
                }
            }
        }
    }

    /// 소비 루프 실행
    ///
    /// 종료 신호면 `Error::Stopped`, poison 청크면 `Error::StreamSnapshot`,
    /// 로드/전송 실패는 그대로 반환. 마지막 청크 전송 후 `Ok(())`.
    pub async fn process(&self) -> Result<()> {
        let mut rx = match self.rx.lock().take() {
            Some(rx) => rx,
            None => panic!("process called more than once"),
        };

        let mut guard = self.conn.lock().await;
        let conn = match guard.as_mut() {
            Some(conn) => conn,
            None => panic!("trying to process on nil connection, not connected?"),
        };

        let hooks = self.hooks.read().clone();
        self.stats.write().start_time = std::time::Instant::now();

        let result = match self.config.mode {
            TransferMode::Streaming => self.stream_snapshot(&mut rx, &mut **conn, &hooks).await,
            TransferMode::Batch => {
                self.process_saved_snapshot(&mut rx, &mut **conn, &hooks)
                    .await
            }
        };

        match &result {
            Ok(()) => info!(
                "snapshot to {}:{} done, {}",
                self.cluster_id,
                self.node_id,
                self.stats.read().summary()
            ),
            Err(Error::Stopped) => {}
            Err(_) => self.failed.fire(),
        }

        result
    }

    async fn stream_snapshot(
        &self,
        rx: &mut mpsc::Receiver<Chunk>,
        conn: &mut dyn SnapshotConnection,
        hooks: &ChunkHooks,
    ) -> Result<()> {
        loop {
            tokio::select! {
                biased;
                _ = self.stopper.wait() => return Err(Error::Stopped),
                next = rx.recv() => {
                    let Some(mut chunk) = next else {
                        return Err(Error::ConnectionClosed);
                    };
                    chunk.header.deployment_id = self.config.deployment_id;
                    if chunk.is_poison() {
                        info!("poison chunk received");
                        return Err(Error::StreamSnapshot);
                    }

                    let last = chunk.is_last();
                    if let Err(e) = self.send_chunk(chunk, conn, hooks).await {
                        warn!(
                            "stream snapshot chunk to {}:{} failed, {}",
                            self.cluster_id, self.node_id, e
                        );
                        return Err(e);
                    }
                    if last {
                        return Ok(());
                    }
                }
            }
        }
    }

    async fn process_saved_snapshot(
        &self,
        rx: &mut mpsc::Receiver<Chunk>,
        conn: &mut dyn SnapshotConnection,
        hooks: &ChunkHooks,
    ) -> Result<()> {
        let mut chunks = Vec::with_capacity(self.capacity);
        loop {
            tokio::select! {
                biased;
                _ = self.stopper.wait() => return Err(Error::Stopped),
                next = rx.recv() => {
                    let Some(chunk) = next else {
                        return Err(Error::ConnectionClosed);
                    };
                    if chunks.is_empty() && chunk.header.chunk_id != 0 {
                        panic!("chunk alignment error");
                    }
                    let done = chunk.header.chunk_id + 1 == chunk.header.chunk_count;
                    chunks.push(chunk);
                    if done {
                        return self.send_chunks(chunks, conn, hooks).await;
                    }
                }
            }
        }
    }

    /// 청크를 순서대로 로드 후 전송 (batch 모드)
    async fn send_chunks(
        &self,
        chunks: Vec<Chunk>,
        conn: &mut dyn SnapshotConnection,
        hooks: &ChunkHooks,
    ) -> Result<()> {
        let mut buf = vec![0u8; self.config.chunk_size];

        for mut chunk in chunks {
            if self.stopper.is_fired() {
                return Err(Error::Stopped);
            }

            let n = match self.loader.load(&chunk, &mut buf).await {
                Ok(n) => n,
                Err(e) => {
                    error!("failed to read the snapshot chunk, {}", e);
                    return Err(e);
                }
            };
            if n > buf.len() {
                error!(
                    "loader reported {} bytes for chunk {}, buffer is {}",
                    n,
                    chunk.id(),
                    buf.len()
                );
                return Err(Error::Load(format!(
                    "chunk {} load length {} > buffer {}",
                    chunk.id(),
                    n,
                    buf.len()
                )));
            }
            chunk.set_data(Bytes::copy_from_slice(&buf[..n]));
            chunk.header.deployment_id = self.config.deployment_id;

            match self.send_chunk(chunk, conn, hooks).await {
                Ok(SendOutcome::Sent(sent)) => hooks.after_send(&sent),
                Ok(SendOutcome::Skipped) => {}
                Err(e) => {
                    debug!(
                        "snapshot to {}:{} failed, {}",
                        self.cluster_id, self.node_id, e
                    );
                    return Err(e);
                }
            }
        }

        Ok(())
    }

    /// 청크 하나 전송 (두 모드 공통)
    async fn send_chunk(
        &self,
        chunk: Chunk,
        conn: &mut dyn SnapshotConnection,
        hooks: &ChunkHooks,
    ) -> Result<SendOutcome> {
        let (chunk, should_send) = hooks.before_send(chunk);
        if !should_send {
            debug!("chunk {} skipped by pre-send hook", chunk.header.chunk_id);
            self.stats.write().record_skipped();
            return Ok(SendOutcome::Skipped);
        }

        conn.send_chunk(&chunk).await?;
        self.stats.write().record_sent(&chunk);
        Ok(SendOutcome::Sent(chunk))
    }
}
