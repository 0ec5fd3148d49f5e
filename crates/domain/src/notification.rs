//! # 通知
//!
//! 状態遷移のコミット後に送信する通知イベントを定義する。
//!
//! ## 設計方針
//!
//! - **enum による通知イベント**: 遷移の種類ごとにバリアントを持つ
//! - **fire-and-forget**: 通知送信の失敗は遷移結果に影響しない
//!
//! 通知の配送手段（メール等）はこのモジュールの関心外。

use serde::Serialize;
use strum::IntoStaticStr;
use thiserror::Error;

use crate::{
    approval::ApprovalOutcome,
    correction::{CorrectionId, CorrectionStatus},
    request::RequestRef,
    user::{EmployeeId, UserId},
    value_objects::StepNumber,
};

/// 通知送信エラー
#[derive(Debug, Error)]
pub enum NotificationError {
    /// 配送に失敗
    #[error("通知の送信に失敗: {0}")]
    SendFailed(String),
}

/// 通知イベント種別
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, IntoStaticStr, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum NotificationEventType {
    /// 承認依頼: ステップが pending になったとき → 承認者に送信
    ApprovalRequested,
    /// 判断結果: 申請が承認・却下で終端になったとき → 申請者に送信
    RequestDecided,
    /// 勤怠修正の段階変化 → 申請者に送信
    CorrectionStageReached,
}

/// 通知イベント
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum Notification {
    /// 承認依頼
    ApprovalRequested {
        request:     RequestRef,
        step_number: StepNumber,
        approver:    UserId,
    },
    /// 申請の最終結果
    RequestDecided {
        request: RequestRef,
        outcome: ApprovalOutcome,
    },
    /// 勤怠修正申請の段階変化
    CorrectionStageReached {
        correction_id: CorrectionId,
        employee_id:   EmployeeId,
        status:        CorrectionStatus,
    },
}

impl Notification {
    pub fn event_type(&self) -> NotificationEventType {
        match self {
            Self::ApprovalRequested { .. } => NotificationEventType::ApprovalRequested,
            Self::RequestDecided { .. } => NotificationEventType::RequestDecided,
            Self::CorrectionStageReached { .. } => NotificationEventType::CorrectionStageReached,
        }
    }

    /// ログ出力用の対象エンティティ ID
    pub fn entity_id(&self) -> String {
        match self {
            Self::ApprovalRequested { request, .. } | Self::RequestDecided { request, .. } => {
                request.to_string()
            }
            Self::CorrectionStageReached { correction_id, .. } => correction_id.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::request::{RequestId, RequestType};

    #[test]
    fn test_承認依頼のjson表現() {
        let request_id = RequestId::new();
        let approver = UserId::new();
        let notification = Notification::ApprovalRequested {
            request:     RequestRef::new(RequestType::BusinessTrip, request_id.clone()),
            step_number: StepNumber::first(),
            approver:    approver.clone(),
        };

        let json = serde_json::to_value(&notification).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "event_type": "approval_requested",
                "request": {
                    "request_type": "business_trip",
                    "request_id": request_id.to_string(),
                },
                "step_number": 1,
                "approver": approver.to_string(),
            })
        );
    }

    #[test]
    fn test_イベント種別とエンティティid() {
        let correction_id = CorrectionId::new();
        let notification = Notification::CorrectionStageReached {
            correction_id: correction_id.clone(),
            employee_id:   EmployeeId::new(),
            status:        CorrectionStatus::PendingHr,
        };

        assert_eq!(
            notification.event_type(),
            NotificationEventType::CorrectionStageReached
        );
        assert_eq!(notification.entity_id(), correction_id.to_string());
    }
}
