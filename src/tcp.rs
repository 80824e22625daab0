//! TCP 기반 스냅샷 연결
//!
//! 프레임: `[magic u32 LE][len u32 LE][청크 바이트]`
//! 수신측은 청크 순서를 검증하고 페이로드를 파일에 기록한다.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, info, warn};

use crate::chunk::{Chunk, ChunkHeader};
use crate::peer::{ConnectionFactory, SnapshotConnection};
use crate::{Error, Result, FRAME_MAGIC, SNAPSHOT_CHUNK_SIZE};

/// 기본 최대 프레임 크기 (페이로드 + 헤더 여유분)
pub const DEFAULT_MAX_FRAME_SIZE: usize = SNAPSHOT_CHUNK_SIZE + 64 * 1024;

/// 청크 하나를 프레임으로 기록
pub async fn write_frame<W: AsyncWrite + Unpin>(writer: &mut W, chunk: &Chunk) -> Result<()> {
    let body = chunk.to_bytes()?;
    let body_len = u32::try_from(body.len()).map_err(|_| {
        Error::UnexpectedChunk(format!("프레임 크기 {} > 최대 {}", body.len(), u32::MAX))
    })?;

    let mut frame = Vec::with_capacity(8 + body.len());
    frame.extend_from_slice(&FRAME_MAGIC.to_le_bytes());
    frame.extend_from_slice(&body_len.to_le_bytes());
    frame.extend_from_slice(&body);

    writer.write_all(&frame).await?;
    writer.flush().await?;
    Ok(())
}

/// 프레임 하나 읽기, 스트림이 프레임 경계에서 끝나면 `None`
pub async fn read_frame<R: AsyncRead + Unpin>(
    reader: &mut R,
    max_frame_size: usize,
) -> Result<Option<Chunk>> {
    let magic = match reader.read_u32_le().await {
        Ok(magic) => magic,
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    if magic != FRAME_MAGIC {
        return Err(Error::InvalidMagicNumber {
            expected: FRAME_MAGIC,
            got: magic,
        });
    }

    let len = reader.read_u32_le().await? as usize;
    if len > max_frame_size {
        return Err(Error::UnexpectedChunk(format!(
            "프레임 크기 {} > 최대 {}",
            len, max_frame_size
        )));
    }

    let mut body = vec![0u8; len];
    reader.read_exact(&mut body).await?;
    Chunk::from_bytes(&body).map(Some)
}

/// TCP 스냅샷 연결 생성기
#[derive(Debug, Clone, Default)]
pub struct TcpConnectionFactory {
    /// 연결 타임아웃 (밀리초, 0이면 없음)
    pub connect_timeout_ms: u64,
}

impl TcpConnectionFactory {
    pub fn new(connect_timeout_ms: u64) -> Self {
        Self { connect_timeout_ms }
    }
}

#[async_trait]
impl ConnectionFactory for TcpConnectionFactory {
    async fn get_snapshot_connection(&self, addr: &str) -> Result<Box<dyn SnapshotConnection>> {
        let connect = TcpStream::connect(addr);
        let stream = if self.connect_timeout_ms > 0 {
            let timeout = std::time::Duration::from_millis(self.connect_timeout_ms);
            tokio::time::timeout(timeout, connect).await.map_err(|_| {
                Error::Io(std::io::Error::new(
                    std::io::ErrorKind::TimedOut,
                    format!("connect to {} timed out", addr),
                ))
            })??
        } else {
            connect.await?
        };
        stream.set_nodelay(true)?;

        Ok(Box::new(TcpSnapshotConnection { stream }))
    }
}

/// TCP 스냅샷 연결
pub struct TcpSnapshotConnection {
    stream: TcpStream,
}

impl TcpSnapshotConnection {
    pub fn new(stream: TcpStream) -> Self {
        Self { stream }
    }
}

#[async_trait]
impl SnapshotConnection for TcpSnapshotConnection {
    async fn send_chunk(&mut self, chunk: &Chunk) -> Result<()> {
        write_frame(&mut self.stream, chunk).await
    }

    async fn close(&mut self) {
        if let Err(e) = self.stream.shutdown().await {
            debug!("snapshot connection shutdown: {}", e);
        }
    }
}

/// 수신 완료된 스냅샷 요약
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedSnapshot {
    pub cluster_id: u64,
    pub from: u64,
    pub index: u64,
    pub term: u64,
    pub deployment_id: u64,
    pub chunks: u64,
    pub bytes: u64,
    pub path: PathBuf,
}

/// 수신측 청크 순서/식별 검증
#[derive(Debug, Default)]
struct ChunkTracker {
    first: Option<ChunkHeader>,
    next_id: u64,
}

impl ChunkTracker {
    fn check(&mut self, chunk: &Chunk) -> Result<()> {
        let header = &chunk.header;
        if header.chunk_id != self.next_id {
            return Err(Error::ChunkOutOfOrder {
                expected: self.next_id,
                got: header.chunk_id,
            });
        }

        match &self.first {
            None => self.first = Some(header.clone()),
            Some(first) => {
                if first.cluster_id != header.cluster_id
                    || first.from != header.from
                    || first.index != header.index
                    || first.deployment_id != header.deployment_id
                {
                    return Err(Error::UnexpectedChunk(format!(
                        "청크 {} 식별자 불일치: cluster {} from {} index {}",
                        header.chunk_id, header.cluster_id, header.from, header.index
                    )));
                }
            }
        }

        self.next_id += 1;
        Ok(())
    }
}

/// 스냅샷 수신기 (대상 노드측)
#[derive(Debug, Clone)]
pub struct SnapshotReceiver {
    out_path: PathBuf,
    max_frame_size: usize,
}

impl SnapshotReceiver {
    pub fn new(out_path: impl AsRef<Path>) -> Self {
        Self {
            out_path: out_path.as_ref().to_path_buf(),
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
        }
    }

    pub fn with_max_frame_size(mut self, max_frame_size: usize) -> Self {
        self.max_frame_size = max_frame_size;
        self
    }

    /// 스트림에서 스냅샷 하나를 받아 파일에 기록
    ///
    /// 실패하면 부분 파일을 지운다.
    pub async fn receive<R: AsyncRead + Unpin>(&self, reader: &mut R) -> Result<ReceivedSnapshot> {
        let result = self.receive_inner(reader).await;
        if let Err(e) = &result {
            warn!("snapshot receive failed: {}", e);
            let _ = tokio::fs::remove_file(&self.out_path).await;
        }
        result
    }

    async fn receive_inner<R: AsyncRead + Unpin>(&self, reader: &mut R) -> Result<ReceivedSnapshot> {
        let mut file = tokio::fs::File::create(&self.out_path).await?;
        let mut tracker = ChunkTracker::default();
        let mut bytes = 0u64;

        loop {
            let chunk = match read_frame(reader, self.max_frame_size).await? {
                Some(chunk) => chunk,
                None => return Err(Error::ConnectionClosed),
            };

            if chunk.is_poison() {
                info!("poison chunk received from {}", chunk.header.from);
                return Err(Error::StreamSnapshot);
            }

            tracker.check(&chunk)?;
            file.write_all(&chunk.data).await?;
            bytes += chunk.data.len() as u64;

            if chunk.is_final() {
                file.flush().await?;
                file.sync_all().await?;

                let header = chunk.header;
                info!(
                    "snapshot {} from {}:{} received, {} chunks, {} bytes",
                    header.index, header.cluster_id, header.from, tracker.next_id, bytes
                );
                return Ok(ReceivedSnapshot {
                    cluster_id: header.cluster_id,
                    from: header.from,
                    index: header.index,
                    term: header.term,
                    deployment_id: header.deployment_id,
                    chunks: tracker.next_id,
                    bytes,
                    path: self.out_path.clone(),
                });
            }
        }
    }
}
