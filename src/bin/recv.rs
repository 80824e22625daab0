//! snapxfer 수신기 - 스냅샷 전송 하나를 받아 파일로 저장
//!
//! 사용법:
//!   cargo run --release --bin snapxfer-recv -- --bind 0.0.0.0:9100 --out recv.bin

use std::path::PathBuf;

use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use snapxfer::SnapshotReceiver;

/// 수신기 설정
struct RecvConfig {
    bind_addr: String,
    out_path: PathBuf,
    max_frame_size: Option<usize>,
}

impl Default for RecvConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:9100".into(),
            out_path: PathBuf::from("received.bin"),
            max_frame_size: None,
        }
    }
}

fn parse_args() -> RecvConfig {
    let args: Vec<String> = std::env::args().collect();
    let mut config = RecvConfig::default();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--bind" | "-b" => {
                if i + 1 < args.len() {
                    config.bind_addr = args[i + 1].clone();
                    i += 1;
                }
            }
            "--out" | "-o" => {
                if i + 1 < args.len() {
                    config.out_path = PathBuf::from(&args[i + 1]);
                    i += 1;
                }
            }
            "--max-frame" => {
                if i + 1 < args.len() {
                    config.max_frame_size = Some(args[i + 1].parse().expect("유효한 숫자 필요"));
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!(
                    r#"snapxfer-recv - 스냅샷 청크 수신기

사용법:
  cargo run --release --bin snapxfer-recv -- [OPTIONS]

옵션:
  -b, --bind <ADDR>       바인드 주소 (기본: 0.0.0.0:9100)
  -o, --out <PATH>        저장할 파일 경로 (기본: received.bin)
  --max-frame <SIZE>      최대 프레임 크기 바이트
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

    let recv_config = parse_args();

    let listener = TcpListener::bind(&recv_config.bind_addr).await?;
    info!("snapxfer receiver listening on {}", recv_config.bind_addr);

    let (mut stream, peer) = listener.accept().await?;
    info!("Snapshot connection from {}", peer);

    let mut receiver = SnapshotReceiver::new(&recv_config.out_path);
    if let Some(max_frame_size) = recv_config.max_frame_size {
        receiver = receiver.with_max_frame_size(max_frame_size);
    }

    match receiver.receive(&mut stream).await {
        Ok(snapshot) => {
            info!("Snapshot received!");
            info!("  Cluster: {}, from node {}", snapshot.cluster_id, snapshot.from);
            info!("  Deployment: {}", snapshot.deployment_id);
            info!("  Chunks: {}, Bytes: {}", snapshot.chunks, snapshot.bytes);
            info!("  Saved to: {:?}", snapshot.path);
            Ok(())
        }
        Err(e) => {
            error!("Snapshot receive failed: {}", e);
            Err(e.into())
        }
    }
}
