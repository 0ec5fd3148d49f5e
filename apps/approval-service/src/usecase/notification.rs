//! # 通知ディスパッチャ
//!
//! 状態遷移のコミット後に通知を非同期で送る。
//!
//! - **fire-and-forget**: `dispatch()` は送信タスクを spawn して即座に戻る
//! - **失敗はログのみ**: 送信失敗は呼び出し元の操作結果に影響しない

use std::sync::Arc;

use hrflow_domain::notification::Notification;
use hrflow_infra::NotificationSender;
use hrflow_shared::{
    event_log::{error, event},
    log_business_event,
};

/// 通知ディスパッチャ
#[derive(Clone)]
pub struct NotificationDispatcher {
    sender: Arc<dyn NotificationSender>,
}

impl NotificationDispatcher {
    pub fn new(sender: Arc<dyn NotificationSender>) -> Self {
        Self { sender }
    }

    /// 通知をバックグラウンドで送信する
    pub fn dispatch(&self, notification: Notification) {
        let sender = self.sender.clone();
        tokio::spawn(async move {
            deliver(sender.as_ref(), &notification).await;
        });
    }
}

/// 通知を 1 件送信し、結果をビジネスイベントとして記録する
async fn deliver(sender: &dyn NotificationSender, notification: &Notification) {
    let event_type: &str = notification.event_type().into();
    let entity_id = notification.entity_id();

    match sender.send(notification).await {
        Ok(()) => {
            log_business_event!(
                event.category = event::category::NOTIFICATION,
                event.action = event::action::NOTIFICATION_SENT,
                event.entity_type = event::entity_type::NOTIFICATION,
                event.entity_id = %entity_id,
                event.result = event::result::SUCCESS,
                notification.event_type = event_type,
                "通知送信成功"
            );
        }
        Err(e) => {
            log_business_event!(
                event.category = event::category::NOTIFICATION,
                event.action = event::action::NOTIFICATION_FAILED,
                event.entity_type = event::entity_type::NOTIFICATION,
                event.entity_id = %entity_id,
                event.result = event::result::FAILURE,
                notification.event_type = event_type,
                error.category = error::category::EXTERNAL_SERVICE,
                error.kind = error::kind::NOTIFICATION_DELIVERY,
                error = %e,
                "通知送信失敗"
            );
        }
    }
}
