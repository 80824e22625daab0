//! 일회성 브로드캐스트 신호
//!
//! 한 번 켜지면 되돌릴 수 없고, 모든 대기자가 동시에 깨어난다.

use std::sync::Arc;

use tokio::sync::watch;

/// 일회성 신호 (복제하면 같은 신호를 공유)
#[derive(Debug, Clone)]
pub struct Signal {
    tx: Arc<watch::Sender<bool>>,
}

impl Signal {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// 신호 켜기 (중복 호출 무시)
    pub fn fire(&self) {
        self.tx.send_if_modified(|fired| {
            if *fired {
                false
            } else {
                *fired = true;
                true
            }
        });
    }

    pub fn is_fired(&self) -> bool {
        *self.tx.borrow()
    }

    /// 신호가 켜질 때까지 대기
    pub async fn wait(&self) {
        let mut rx = self.tx.subscribe();
        // 송신측을 self가 들고 있으므로 채널이 닫히지 않는다
        let _ = rx.wait_for(|fired| *fired).await;
    }
}

impl Default for Signal {
    fn default() -> Self {
        Self::new()
    }
}
