//! # 承認ステップ
//!
//! 申請ごとに生成される承認ステップの実体と、その状態遷移を管理する。
//!
//! ## 状態遷移
//!
//! ```text
//! queued ──activate──▶ pending ──approve──▶ approved
//!   │                     │
//!   │                     └──reject───▶ rejected
//!   └──cancel──▶ cancelled
//! ```
//!
//! 管理者オーバーライドでは `queued` から直接 `approved` にも遷移する。
//!
//! 遷移メソッドは遷移後の新しいインスタンスを返す。
//! 永続化は `status = 遷移前の値` を条件とした条件付き更新で行うため、
//! [`ApprovalStep::status`] の遷移前の値はリポジトリ側で期待値として使われる。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::IntoStaticStr;

use super::definition::{ApproverRole, ResolvedApprover};
use crate::{DomainError, request::RequestRef, user::UserId, value_objects::StepNumber};

define_uuid_id! {
    /// 承認ステップ ID
    pub struct ApprovalStepId;
}

/// 承認ステップステータス
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, IntoStaticStr, strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ApprovalStepStatus {
    /// 前のステップの完了待ち
    Queued,
    /// 承認者の判断待ち
    Pending,
    /// 承認済み
    Approved,
    /// 却下
    Rejected,
    /// 前のステップの却下により取消
    Cancelled,
}

impl ApprovalStepStatus {
    /// 終端状態か
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Approved | Self::Rejected | Self::Cancelled)
    }
}

impl std::str::FromStr for ApprovalStepStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queued" => Ok(Self::Queued),
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(DomainError::Validation(format!(
                "不正な承認ステップステータス: {}",
                s
            ))),
        }
    }
}

/// 承認者の判断
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, IntoStaticStr, strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ApprovalOutcome {
    Approved,
    Rejected,
}

/// 承認ステップエンティティ
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApprovalStep {
    id:               ApprovalStepId,
    request:          RequestRef,
    step_number:      StepNumber,
    approver_type:    ApproverRole,
    approver_user_id: UserId,
    status:           ApprovalStepStatus,
    acted_by:         Option<UserId>,
    acted_at:         Option<DateTime<Utc>>,
    comment:          Option<String>,
    created_at:       DateTime<Utc>,
    updated_at:       DateTime<Utc>,
}

/// 承認ステップの DB 復元パラメータ
pub struct ApprovalStepRecord {
    pub id:               ApprovalStepId,
    pub request:          RequestRef,
    pub step_number:      StepNumber,
    pub approver_type:    ApproverRole,
    pub approver_user_id: UserId,
    pub status:           ApprovalStepStatus,
    pub acted_by:         Option<UserId>,
    pub acted_at:         Option<DateTime<Utc>>,
    pub comment:          Option<String>,
    pub created_at:       DateTime<Utc>,
    pub updated_at:       DateTime<Utc>,
}

impl ApprovalStep {
    /// 解決済みの承認者からステップ列を組み立てる
    ///
    /// 先頭のステップが `pending`、残りは `queued` になる。
    /// `resolved` はステップ番号の昇順で渡すこと（解決できなかったステップは含めない）。
    pub fn build_chain(
        request: &RequestRef,
        resolved: Vec<(StepNumber, ResolvedApprover)>,
        now: DateTime<Utc>,
    ) -> Vec<Self> {
        resolved
            .into_iter()
            .enumerate()
            .map(|(index, (step_number, approver))| Self {
                id: ApprovalStepId::new(),
                request: request.clone(),
                step_number,
                approver_type: approver.approver_type,
                approver_user_id: approver.approver_user_id,
                status: if index == 0 {
                    ApprovalStepStatus::Pending
                } else {
                    ApprovalStepStatus::Queued
                },
                acted_by: None,
                acted_at: None,
                comment: None,
                created_at: now,
                updated_at: now,
            })
            .collect()
    }

    /// 既存のデータから復元する
    pub fn from_db(record: ApprovalStepRecord) -> Self {
        Self {
            id:               record.id,
            request:          record.request,
            step_number:      record.step_number,
            approver_type:    record.approver_type,
            approver_user_id: record.approver_user_id,
            status:           record.status,
            acted_by:         record.acted_by,
            acted_at:         record.acted_at,
            comment:          record.comment,
            created_at:       record.created_at,
            updated_at:       record.updated_at,
        }
    }

    // Getter メソッド

    pub fn id(&self) -> &ApprovalStepId {
        &self.id
    }

    pub fn request(&self) -> &RequestRef {
        &self.request
    }

    pub fn step_number(&self) -> StepNumber {
        self.step_number
    }

    pub fn approver_type(&self) -> ApproverRole {
        self.approver_type
    }

    pub fn approver_user_id(&self) -> &UserId {
        &self.approver_user_id
    }

    pub fn status(&self) -> ApprovalStepStatus {
        self.status
    }

    pub fn acted_by(&self) -> Option<&UserId> {
        self.acted_by.as_ref()
    }

    pub fn acted_at(&self) -> Option<DateTime<Utc>> {
        self.acted_at
    }

    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    // ビジネスロジックメソッド

    /// 承認者の判断を記録する
    ///
    /// # Errors
    ///
    /// - `DomainError::Conflict`: Pending 以外の状態で呼び出した場合
    pub fn decide(
        self,
        outcome: ApprovalOutcome,
        actor: UserId,
        comment: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        match outcome {
            ApprovalOutcome::Approved => self.approve(actor, comment, now),
            ApprovalOutcome::Rejected => self.reject(actor, comment, now),
        }
    }

    /// ステップを承認する
    ///
    /// # Errors
    ///
    /// - `DomainError::Conflict`: Pending 以外の状態で呼び出した場合
    pub fn approve(
        self,
        actor: UserId,
        comment: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        self.ensure_status(ApprovalStepStatus::Pending, "承認")?;
        Ok(self.acted(ApprovalStepStatus::Approved, actor, comment, now))
    }

    /// ステップを却下する
    ///
    /// # Errors
    ///
    /// - `DomainError::Conflict`: Pending 以外の状態で呼び出した場合
    pub fn reject(
        self,
        actor: UserId,
        comment: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        self.ensure_status(ApprovalStepStatus::Pending, "却下")?;
        Ok(self.acted(ApprovalStepStatus::Rejected, actor, comment, now))
    }

    /// 管理者オーバーライドで承認する
    ///
    /// Pending に加えて Queued のステップも直接承認できる。
    ///
    /// # Errors
    ///
    /// - `DomainError::Conflict`: 終端状態で呼び出した場合
    pub fn override_approve(
        self,
        admin: UserId,
        comment: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        if self.status.is_terminal() {
            return Err(self.already_decided("承認"));
        }
        Ok(self.acted(ApprovalStepStatus::Approved, admin, comment, now))
    }

    /// 待機中のステップを判断待ちにする
    ///
    /// # Errors
    ///
    /// - `DomainError::Conflict`: Queued 以外の状態で呼び出した場合
    pub fn activate(self, now: DateTime<Utc>) -> Result<Self, DomainError> {
        self.ensure_status(ApprovalStepStatus::Queued, "判断待ちへの移行")?;
        Ok(Self {
            status: ApprovalStepStatus::Pending,
            updated_at: now,
            ..self
        })
    }

    /// 待機中のステップを取り消す
    ///
    /// 前のステップが却下されたときに使用する。判断者は記録しない。
    ///
    /// # Errors
    ///
    /// - `DomainError::Conflict`: Queued 以外の状態で呼び出した場合
    pub fn cancel(self, now: DateTime<Utc>) -> Result<Self, DomainError> {
        self.ensure_status(ApprovalStepStatus::Queued, "取消")?;
        Ok(Self {
            status: ApprovalStepStatus::Cancelled,
            updated_at: now,
            ..self
        })
    }

    fn acted(
        self,
        status: ApprovalStepStatus,
        actor: UserId,
        comment: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            status,
            acted_by: Some(actor),
            acted_at: Some(now),
            comment,
            updated_at: now,
            ..self
        }
    }

    fn ensure_status(&self, expected: ApprovalStepStatus, action: &str) -> Result<(), DomainError> {
        if self.status != expected {
            return Err(self.already_decided(action));
        }
        Ok(())
    }

    fn already_decided(&self, action: &str) -> DomainError {
        DomainError::Conflict(format!(
            "ステップ {} は{}できない状態です（現在: {}）",
            self.step_number, action, self.status
        ))
    }
}
