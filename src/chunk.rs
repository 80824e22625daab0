//! 스냅샷 청크 정의
//!
//! - batch 모드: 스냅샷 분할로 메타데이터만 생성, 페이로드는 전송 직전 로드
//! - streaming 모드: 실시간 생성기가 페이로드를 채워서 넘김

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::{Error, Result, LAST_CHUNK_COUNT, POISON_CHUNK_COUNT};

/// 청크 ID (전송 내 0부터 시작하는 인덱스)
pub type ChunkId = u64;

/// 청크 헤더
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkHeader {
    /// 그룹(클러스터) ID
    pub cluster_id: u64,

    /// 보내는 노드 ID
    pub from: u64,

    /// 받는 노드 ID
    pub node_id: u64,

    /// 스냅샷 인덱스
    pub index: u64,

    /// 스냅샷 텀
    pub term: u64,

    /// 청크 ID
    pub chunk_id: ChunkId,

    /// 전체 청크 수, 또는 sentinel 값
    pub chunk_count: u64,

    /// 이 청크의 페이로드 길이
    pub chunk_size: u64,

    /// 스냅샷 파일 내 오프셋 (바이트)
    pub offset: u64,

    /// 스냅샷 파일 전체 크기
    pub file_size: u64,

    /// 스냅샷 파일 경로 (송신측 로컬 경로)
    pub file_path: String,

    /// 배포 ID, 전송 직전에 연결이 기록
    pub deployment_id: u64,

    /// CRC32 체크섬
    pub crc32: u32,
}

/// 청크 (전송 단위)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// 청크 헤더
    pub header: ChunkHeader,

    /// 실제 데이터
    pub data: Bytes,
}

impl Chunk {
    /// 페이로드가 있는 청크 생성
    pub fn new(header: ChunkHeader, data: Bytes) -> Self {
        let mut chunk = Self {
            header,
            data: Bytes::new(),
        };
        chunk.set_data(data);
        chunk
    }

    /// 생성기가 스트림을 포기할 때 보내는 청크
    pub fn poison(cluster_id: u64, node_id: u64) -> Self {
        Self {
            header: ChunkHeader {
                cluster_id,
                node_id,
                chunk_count: POISON_CHUNK_COUNT,
                ..Default::default()
            },
            data: Bytes::new(),
        }
    }

    /// 스트리밍 전송의 마지막 청크
    pub fn last(mut header: ChunkHeader, data: Bytes) -> Self {
        header.chunk_count = LAST_CHUNK_COUNT;
        Self::new(header, data)
    }

    /// 페이로드 교체 (길이/CRC 갱신)
    pub fn set_data(&mut self, data: Bytes) {
        self.header.chunk_size = data.len() as u64;
        self.header.crc32 = crc32fast::hash(&data);
        self.data = data;
    }

    pub fn id(&self) -> ChunkId {
        self.header.chunk_id
    }

    pub fn is_poison(&self) -> bool {
        self.header.chunk_count == POISON_CHUNK_COUNT
    }

    pub fn is_last(&self) -> bool {
        self.header.chunk_count == LAST_CHUNK_COUNT
    }

    /// 전송의 마지막 청크인지 (batch 인덱스 기준 또는 streaming sentinel)
    pub fn is_final(&self) -> bool {
        self.is_last() || self.header.chunk_id.checked_add(1) == Some(self.header.chunk_count)
    }

    /// 청크를 바이트로 직렬화
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let header_bytes = bincode::serialize(&self.header)?;
        let header_len = u16::try_from(header_bytes.len()).map_err(|_| {
            Error::UnexpectedChunk(format!(
                "헤더 크기 {} > 최대 {}",
                header_bytes.len(),
                u16::MAX
            ))
        })?;

        let mut buf = Vec::with_capacity(2 + header_bytes.len() + self.data.len());
        buf.extend_from_slice(&header_len.to_le_bytes());
        buf.extend_from_slice(&header_bytes);
        buf.extend_from_slice(&self.data);
        Ok(buf)
    }

    /// 바이트에서 청크 역직렬화 (CRC 검증 포함)
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < 2 {
            return Err(Error::UnexpectedChunk("헤더 길이 누락".into()));
        }

        let header_len = u16::from_le_bytes([bytes[0], bytes[1]]) as usize;
        if bytes.len() < 2 + header_len {
            return Err(Error::UnexpectedChunk(format!(
                "헤더 잘림: {} < {}",
                bytes.len(),
                2 + header_len
            )));
        }

        let header: ChunkHeader = bincode::deserialize(&bytes[2..2 + header_len])?;
        let data = Bytes::copy_from_slice(&bytes[2 + header_len..]);
        let chunk = Self { header, data };
        chunk.verify_crc()?;
        Ok(chunk)
    }

    /// CRC 검증
    pub fn verify_crc(&self) -> Result<()> {
        let got = crc32fast::hash(&self.data);
        if got != self.header.crc32 {
            return Err(Error::CrcMismatch {
                expected: self.header.crc32,
                got,
            });
        }
        Ok(())
    }
}
