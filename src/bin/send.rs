//! snapxfer 송신기 - 스냅샷 파일을 대상 노드로 전송
//!
//! 사용법:
//!   cargo run --release --bin snapxfer-send -- [OPTIONS]
//!
//! 예시:
//!   # 저장된 스냅샷 전송
//!   cargo run --release --bin snapxfer-send -- --addr 127.0.0.1:9100 --file snap.bin
//!
//!   # 실시간 생성 스냅샷처럼 스트리밍 전송
//!   cargo run --release --bin snapxfer-send -- -a 127.0.0.1:9100 -f snap.bin --stream

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use snapxfer::{
    stream_file, FileChunkLoader, Signal, SnapshotDescriptor, TcpConnectionFactory,
    TransferConfig, TransferConnection, TransferMode,
};

/// 송신기 설정
struct SendConfig {
    addr: String,
    file_path: PathBuf,
    cluster_id: u64,
    from: u64,
    to: u64,
    connect_timeout_ms: u64,
    config: TransferConfig,
}

impl Default for SendConfig {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:9100".into(),
            file_path: PathBuf::from("snapshot.bin"),
            cluster_id: 1,
            from: 1,
            to: 2,
            connect_timeout_ms: 5000,
            config: TransferConfig::default(),
        }
    }
}

fn parse_args() -> SendConfig {
    let args: Vec<String> = std::env::args().collect();
    let mut config = SendConfig::default();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--addr" | "-a" => {
                if i + 1 < args.len() {
                    config.addr = args[i + 1].clone();
                    i += 1;
                }
            }
            "--file" | "-f" => {
                if i + 1 < args.len() {
                    config.file_path = PathBuf::from(&args[i + 1]);
                    i += 1;
                }
            }
            "--cluster" => {
                if i + 1 < args.len() {
                    config.cluster_id = args[i + 1].parse().expect("유효한 숫자 필요");
                    i += 1;
                }
            }
            "--from" => {
                if i + 1 < args.len() {
                    config.from = args[i + 1].parse().expect("유효한 숫자 필요");
                    i += 1;
                }
            }
            "--to" => {
                if i + 1 < args.len() {
                    config.to = args[i + 1].parse().expect("유효한 숫자 필요");
                    i += 1;
                }
            }
            "--deployment" | "-d" => {
                if i + 1 < args.len() {
                    config.config.deployment_id = args[i + 1].parse().expect("유효한 숫자 필요");
                    i += 1;
                }
            }
            "--chunk-size" => {
                if i + 1 < args.len() {
                    config.config.chunk_size = args[i + 1].parse().expect("유효한 숫자 필요");
                    i += 1;
                }
            }
            "--queue" => {
                if i + 1 < args.len() {
                    config.config.streaming_queue_capacity =
                        args[i + 1].parse().expect("유효한 숫자 필요");
                    i += 1;
                }
            }
            "--timeout" => {
                if i + 1 < args.len() {
                    config.connect_timeout_ms = args[i + 1].parse().expect("유효한 숫자 필요");
                    i += 1;
                }
            }
            "--stream" | "-s" => {
                config.config.mode = TransferMode::Streaming;
            }
            "--help" | "-h" => {
                println!(
                    r#"snapxfer-send - 스냅샷 청크 송신기

사용법:
  cargo run --release --bin snapxfer-send -- [OPTIONS]

옵션:
  -a, --addr <ADDR>       대상 주소 (기본: 127.0.0.1:9100)
  -f, --file <PATH>       전송할 스냅샷 파일 (기본: snapshot.bin)
  -d, --deployment <ID>   배포 ID (기본: 0)
  -s, --stream            스트리밍 모드 (기본: batch)
  --cluster <ID>          그룹 ID (기본: 1)
  --from <ID>             보내는 노드 ID (기본: 1)
  --to <ID>               받는 노드 ID (기본: 2)
  --chunk-size <SIZE>     청크 크기 바이트 (기본: 2097152)
  --queue <N>             스트리밍 큐 크기 (기본: 16)
  --timeout <MS>          연결 타임아웃 (기본: 5000)
  -h, --help              이 도움말 출력
"#
                );
                std::process::exit(0);
            }
            _ => {}
        }
        i += 1;
    }

    config
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 로깅 설정
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let send_config = parse_args();
    let config = send_config.config.clone();

    let snapshot = SnapshotDescriptor::from_file(
        &send_config.file_path,
        send_config.cluster_id,
        send_config.from,
        send_config.to,
        0,
        0,
    )
    .await?;
    let chunk_count = snapshot.chunk_count(config.chunk_size) as usize;

    info!("snapxfer sender starting...");
    info!("Target: {} (node {})", send_config.addr, send_config.to);
    info!("Mode: {:?}", config.mode);
    info!("File: {:?} ({} bytes, {} chunks)", send_config.file_path, snapshot.file_size, chunk_count);

    let stopper = Signal::new();
    {
        let stopper = stopper.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Ctrl-C, stopping transfer");
                stopper.fire();
            }
        });
    }

    let conn = Arc::new(TransferConnection::new(
        send_config.cluster_id,
        send_config.to,
        config.clone(),
        chunk_count,
        Arc::new(TcpConnectionFactory::new(send_config.connect_timeout_ms)),
        Arc::new(FileChunkLoader::new()),
        stopper,
    ));
    conn.connect(&send_config.addr).await?;

    let generator = match config.mode {
        TransferMode::Batch => {
            conn.submit_whole(&snapshot);
            None
        }
        TransferMode::Streaming => Some(tokio::spawn(stream_file(
            conn.sink(),
            snapshot.clone(),
            config.chunk_size,
        ))),
    };

    let result = conn.process().await;
    conn.close().await;
    if let Some(generator) = generator {
        let _ = generator.await;
    }

    let stats = conn.stats();
    match result {
        Ok(()) => {
            info!("Transfer complete!");
            info!("  {}", stats.summary());
            Ok(())
        }
        Err(e) => {
            error!("Transfer failed: {}", e);
            Err(e.into())
        }
    }
}
