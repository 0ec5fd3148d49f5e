//! ApprovalStepRepository: 承認ステップの永続化
//!
//! ステップの状態遷移はすべて条件付き更新で行う。
//! `(request_type, request_id, step_number, status = 期待値)` を WHERE 句に含め、
//! 更新行数が 0 なら別の操作が先に遷移させたとみなして
//! `InfraErrorKind::Conflict` を返す。

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hrflow_domain::{
    approval::{ApprovalStep, ApprovalStepId, ApprovalStepRecord, ApprovalStepStatus, ApproverRole},
    request::{RequestId, RequestRef, RequestType},
    user::UserId,
    value_objects::StepNumber,
};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{db::TxContext, error::InfraError};

/// ApprovalStepRepository トレイト
#[async_trait]
pub trait ApprovalStepRepository: Send + Sync {
    /// 申請のステップ列を一括で作成する
    async fn insert_all(&self, tx: &mut TxContext, steps: &[ApprovalStep])
    -> Result<(), InfraError>;

    /// 申請のステップ一覧をステップ番号の昇順で取得する
    async fn find_by_request(&self, request: &RequestRef) -> Result<Vec<ApprovalStep>, InfraError>;

    /// ステップを条件付きで遷移させる
    ///
    /// DB 上のステータスが `expected` の場合のみ更新する。
    /// 0 行だった場合は `InfraErrorKind::Conflict` を返す。
    async fn transition(
        &self,
        tx: &mut TxContext,
        step: &ApprovalStep,
        expected: ApprovalStepStatus,
    ) -> Result<(), InfraError>;

    /// 申請の待機中ステップをすべて取り消す
    ///
    /// 取り消したステップ数を返す。
    async fn cancel_queued(
        &self,
        tx: &mut TxContext,
        request: &RequestRef,
        now: DateTime<Utc>,
    ) -> Result<u64, InfraError>;
}

/// approval_steps テーブルの行
#[derive(sqlx::FromRow)]
struct ApprovalStepRow {
    id:               Uuid,
    request_type:     String,
    request_id:       Uuid,
    step_number:      i32,
    approver_type:    String,
    approver_user_id: Uuid,
    status:           String,
    acted_by:         Option<Uuid>,
    acted_at:         Option<DateTime<Utc>>,
    comment:          Option<String>,
    created_at:       DateTime<Utc>,
    updated_at:       DateTime<Utc>,
}

impl TryFrom<ApprovalStepRow> for ApprovalStep {
    type Error = InfraError;

    fn try_from(row: ApprovalStepRow) -> Result<Self, Self::Error> {
        let step_number = u32::try_from(row.step_number)
            .map_err(|e| InfraError::unexpected(format!("不正なステップ番号: {}", e)))
            .and_then(|n| StepNumber::new(n).map_err(|e| InfraError::unexpected(e.to_string())))?;

        Ok(ApprovalStep::from_db(ApprovalStepRecord {
            id: ApprovalStepId::from_uuid(row.id),
            request: RequestRef::new(
                row.request_type
                    .parse::<RequestType>()
                    .map_err(|e| InfraError::unexpected(e.to_string()))?,
                RequestId::from_uuid(row.request_id),
            ),
            step_number,
            approver_type: row
                .approver_type
                .parse::<ApproverRole>()
                .map_err(|e| InfraError::unexpected(e.to_string()))?,
            approver_user_id: UserId::from_uuid(row.approver_user_id),
            status: row
                .status
                .parse::<ApprovalStepStatus>()
                .map_err(|e| InfraError::unexpected(e.to_string()))?,
            acted_by: row.acted_by.map(UserId::from_uuid),
            acted_at: row.acted_at,
            comment: row.comment,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }))
    }
}

/// 競合エラーに載せるステップの識別子
fn step_key(step: &ApprovalStep) -> String {
    format!("{}#{}", step.request(), step.step_number())
}

/// PostgreSQL 実装
pub struct PostgresApprovalStepRepository {
    pool: PgPool,
}

impl PostgresApprovalStepRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ApprovalStepRepository for PostgresApprovalStepRepository {
    #[tracing::instrument(skip_all, level = "debug", fields(count = steps.len()))]
    async fn insert_all(
        &self,
        tx: &mut TxContext,
        steps: &[ApprovalStep],
    ) -> Result<(), InfraError> {
        for step in steps {
            let request_type: &str = step.request().request_type.into();
            let approver_type: &str = step.approver_type().into();
            let status: &str = step.status().into();
            sqlx::query(
                r#"
                INSERT INTO approval_steps (
                    id, request_type, request_id, step_number,
                    approver_type, approver_user_id, status,
                    acted_by, acted_at, comment,
                    created_at, updated_at
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
                "#,
            )
            .bind(step.id().as_uuid())
            .bind(request_type)
            .bind(step.request().request_id.as_uuid())
            .bind(step.step_number().as_i32())
            .bind(approver_type)
            .bind(step.approver_user_id().as_uuid())
            .bind(status)
            .bind(step.acted_by().map(|u| *u.as_uuid()))
            .bind(step.acted_at())
            .bind(step.comment())
            .bind(step.created_at())
            .bind(step.updated_at())
            .execute(tx.conn()?)
            .await?;
        }

        Ok(())
    }

    #[tracing::instrument(skip_all, level = "debug", fields(%request))]
    async fn find_by_request(&self, request: &RequestRef) -> Result<Vec<ApprovalStep>, InfraError> {
        let request_type: &str = request.request_type.into();
        let rows = sqlx::query_as::<_, ApprovalStepRow>(
            r#"
            SELECT
                id, request_type, request_id, step_number,
                approver_type, approver_user_id, status,
                acted_by, acted_at, comment,
                created_at, updated_at
            FROM approval_steps
            WHERE request_type = $1 AND request_id = $2
            ORDER BY step_number ASC
            "#,
        )
        .bind(request_type)
        .bind(request.request_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(ApprovalStep::try_from).collect()
    }

    #[tracing::instrument(
        skip_all,
        level = "debug",
        fields(request = %step.request(), step_number = %step.step_number(), %expected)
    )]
    async fn transition(
        &self,
        tx: &mut TxContext,
        step: &ApprovalStep,
        expected: ApprovalStepStatus,
    ) -> Result<(), InfraError> {
        let request_type: &str = step.request().request_type.into();
        let status: &str = step.status().into();
        let expected_str: &str = expected.into();
        let result = sqlx::query(
            r#"
            UPDATE approval_steps SET
                status = $1,
                acted_by = $2,
                acted_at = $3,
                comment = $4,
                updated_at = $5
            WHERE request_type = $6
              AND request_id = $7
              AND step_number = $8
              AND status = $9
            "#,
        )
        .bind(status)
        .bind(step.acted_by().map(|u| *u.as_uuid()))
        .bind(step.acted_at())
        .bind(step.comment())
        .bind(step.updated_at())
        .bind(request_type)
        .bind(step.request().request_id.as_uuid())
        .bind(step.step_number().as_i32())
        .bind(expected_str)
        .execute(tx.conn()?)
        .await?;

        if result.rows_affected() == 0 {
            return Err(InfraError::conflict("ApprovalStep", step_key(step)));
        }

        Ok(())
    }

    #[tracing::instrument(skip_all, level = "debug", fields(%request))]
    async fn cancel_queued(
        &self,
        tx: &mut TxContext,
        request: &RequestRef,
        now: DateTime<Utc>,
    ) -> Result<u64, InfraError> {
        let request_type: &str = request.request_type.into();
        let result = sqlx::query(
            r#"
            UPDATE approval_steps SET
                status = 'cancelled',
                updated_at = $1
            WHERE request_type = $2
              AND request_id = $3
              AND status = 'queued'
            "#,
        )
        .bind(now)
        .bind(request_type)
        .bind(request.request_id.as_uuid())
        .execute(tx.conn()?)
        .await?;

        Ok(result.rows_affected())
    }
}
