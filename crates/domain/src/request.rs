//! # 申請と申請ステータス
//!
//! 承認エンジンが扱う申請種別と、承認結果を各申請のステータス語彙に
//! 変換する対応表を定義する。
//!
//! 申請本体（休暇・出張・貸付）のデータは外部が所有する。エンジンが書き込むのは
//! ステータスと承認に関するスタンプのみ。
//!
//! | 種別 | 申請中 | 承認 | 却下 |
//! |------|--------|------|------|
//! | `time_off` | `pending` | `approved` | `rejected` |
//! | `business_trip` | `submitted` | `hr_approved` | `rejected` |
//! | `loan` | 変更しない（`requested` のまま） | `approved` + 承認者・承認日時 | `rejected` |

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::IntoStaticStr;

use crate::{DomainError, user::UserId};

define_uuid_id! {
    /// 申請 ID
    ///
    /// 申請種別ごとに別テーブルで管理されるため、
    /// 一意に特定するには [`RequestRef`] を使う。
    pub struct RequestId;
}

/// 申請種別
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, IntoStaticStr, strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RequestType {
    /// 休暇申請
    TimeOff,
    /// 出張申請
    BusinessTrip,
    /// 貸付申請
    Loan,
}

impl std::str::FromStr for RequestType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "time_off" => Ok(Self::TimeOff),
            "business_trip" => Ok(Self::BusinessTrip),
            "loan" => Ok(Self::Loan),
            _ => Err(DomainError::Validation(format!("不正な申請種別: {}", s))),
        }
    }
}

/// 申請の参照（申請種別 + 申請 ID）
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Display)]
#[display("{request_type}:{request_id}")]
pub struct RequestRef {
    pub request_type: RequestType,
    pub request_id:   RequestId,
}

impl RequestRef {
    pub fn new(request_type: RequestType, request_id: RequestId) -> Self {
        Self {
            request_type,
            request_id,
        }
    }
}

/// 承認エンジンが申請に伝える結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestOutcome {
    /// 承認待ちに入った
    Submitted,
    /// 承認された（自動承認を含む）
    Approved {
        /// 承認者。自動承認で特定できない場合は `None`
        approved_by: Option<UserId>,
        at:          DateTime<Utc>,
    },
    /// 却下された
    Rejected {
        /// 却下理由（却下時のコメント）
        reason: Option<String>,
    },
}

/// 申請テーブルへ書き込むステータス更新
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestStatusUpdate {
    /// 書き込むステータス値
    pub status:           &'static str,
    /// 承認者スタンプ（貸付のみ）
    pub approved_by:      Option<UserId>,
    /// 承認日時スタンプ（貸付のみ）
    pub approved_at:      Option<DateTime<Utc>>,
    /// 却下理由
    pub rejection_reason: Option<String>,
}

impl RequestStatusUpdate {
    fn status_only(status: &'static str) -> Self {
        Self {
            status,
            approved_by: None,
            approved_at: None,
            rejection_reason: None,
        }
    }

    /// 申請種別 × 結果から書き込む内容を決める
    ///
    /// `None` は「申請には何も書き込まない」を表す（貸付の申請中など）。
    pub fn for_outcome(request_type: RequestType, outcome: RequestOutcome) -> Option<Self> {
        match (request_type, outcome) {
            (RequestType::TimeOff, RequestOutcome::Submitted) => {
                Some(Self::status_only("pending"))
            }
            (RequestType::BusinessTrip, RequestOutcome::Submitted) => {
                Some(Self::status_only("submitted"))
            }
            (RequestType::Loan, RequestOutcome::Submitted) => None,

            (RequestType::TimeOff, RequestOutcome::Approved { .. }) => {
                Some(Self::status_only("approved"))
            }
            (RequestType::BusinessTrip, RequestOutcome::Approved { .. }) => {
                Some(Self::status_only("hr_approved"))
            }
            (RequestType::Loan, RequestOutcome::Approved { approved_by, at }) => Some(Self {
                status: "approved",
                approved_by,
                approved_at: Some(at),
                rejection_reason: None,
            }),

            (_, RequestOutcome::Rejected { reason }) => Some(Self {
                rejection_reason: reason,
                ..Self::status_only("rejected")
            }),
        }
    }
}
