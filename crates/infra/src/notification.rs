//! # 通知送信
//!
//! 状態遷移後の通知をどこへ届けるかを抽象化する。
//! 配送手段（メール、チャット等）はこのサービスの外側にあり、
//! ここでは送信インターフェースとログ出力のみの実装を提供する。

use async_trait::async_trait;
use hrflow_domain::notification::{Notification, NotificationError};

/// 通知送信トレイト
#[async_trait]
pub trait NotificationSender: Send + Sync {
    /// 通知を送信する
    async fn send(&self, notification: &Notification) -> Result<(), NotificationError>;
}

/// Noop 通知送信（ログ出力のみ）
///
/// 配送先が未設定の環境で使用する。
#[derive(Debug, Clone, Default)]
pub struct NoopNotificationSender;

#[async_trait]
impl NotificationSender for NoopNotificationSender {
    async fn send(&self, notification: &Notification) -> Result<(), NotificationError> {
        tracing::info!(
            event_type = %notification.event_type(),
            entity_id = %notification.entity_id(),
            "Noop: 通知送信をスキップ"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use hrflow_domain::{
        approval::ApprovalOutcome,
        request::{RequestId, RequestRef, RequestType},
    };

    use super::*;

    #[tokio::test]
    async fn test_noopはエラーを返さない() {
        let sender = NoopNotificationSender;
        let notification = Notification::RequestDecided {
            request: RequestRef::new(RequestType::TimeOff, RequestId::new()),
            outcome: ApprovalOutcome::Approved,
        };

        let result = sender.send(&notification).await;
        assert!(result.is_ok());
    }
}
