//! CorrectionRepository: 勤怠修正申請の永続化
//!
//! 段階の遷移は `status = 期待値` を条件とした条件付き更新で行う。
//! 人事承認時の勤怠記録への反映も同じトランザクションで行う。

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hrflow_domain::{
    correction::{
        AttendanceCorrection,
        AttendanceCorrectionRecord,
        AttendanceRecordId,
        CorrectedTimes,
        CorrectionId,
        CorrectionStatus,
    },
    user::{EmployeeId, UserId},
};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{db::TxContext, error::InfraError};

/// CorrectionRepository トレイト
#[async_trait]
pub trait CorrectionRepository: Send + Sync {
    /// ID で勤怠修正申請を取得する
    async fn find_by_id(&self, id: &CorrectionId)
    -> Result<Option<AttendanceCorrection>, InfraError>;

    /// 判断結果を条件付きで書き込む
    ///
    /// DB 上のステータスが `expected` の場合のみ更新する。
    /// 0 行だった場合は `InfraErrorKind::Conflict` を返す。
    async fn update_decision(
        &self,
        tx: &mut TxContext,
        correction: &AttendanceCorrection,
        expected: CorrectionStatus,
    ) -> Result<(), InfraError>;

    /// 修正後の出退勤時刻を勤怠記録に反映する
    ///
    /// `None` の時刻は元の値を維持する。
    async fn apply_to_attendance(
        &self,
        tx: &mut TxContext,
        times: &CorrectedTimes,
    ) -> Result<(), InfraError>;
}

/// attendance_corrections テーブルの行
#[derive(sqlx::FromRow)]
struct AttendanceCorrectionRow {
    id:                   Uuid,
    attendance_record_id: Uuid,
    employee_id:          Uuid,
    corrected_check_in:   Option<DateTime<Utc>>,
    corrected_check_out:  Option<DateTime<Utc>>,
    reason:               String,
    status:               String,
    manager_id:           Option<Uuid>,
    manager_notes:        Option<String>,
    manager_decided_at:   Option<DateTime<Utc>>,
    hr_id:                Option<Uuid>,
    hr_notes:             Option<String>,
    hr_decided_at:        Option<DateTime<Utc>>,
    created_at:           DateTime<Utc>,
    updated_at:           DateTime<Utc>,
}

impl TryFrom<AttendanceCorrectionRow> for AttendanceCorrection {
    type Error = InfraError;

    fn try_from(row: AttendanceCorrectionRow) -> Result<Self, Self::Error> {
        Ok(AttendanceCorrection::from_db(AttendanceCorrectionRecord {
            id:                   CorrectionId::from_uuid(row.id),
            attendance_record_id: AttendanceRecordId::from_uuid(row.attendance_record_id),
            employee_id:          EmployeeId::from_uuid(row.employee_id),
            corrected_check_in:   row.corrected_check_in,
            corrected_check_out:  row.corrected_check_out,
            reason:               row.reason,
            status:               row
                .status
                .parse::<CorrectionStatus>()
                .map_err(|e| InfraError::unexpected(e.to_string()))?,
            manager_id:           row.manager_id.map(UserId::from_uuid),
            manager_notes:        row.manager_notes,
            manager_decided_at:   row.manager_decided_at,
            hr_id:                row.hr_id.map(UserId::from_uuid),
            hr_notes:             row.hr_notes,
            hr_decided_at:        row.hr_decided_at,
            created_at:           row.created_at,
            updated_at:           row.updated_at,
        }))
    }
}

/// PostgreSQL 実装
pub struct PostgresCorrectionRepository {
    pool: PgPool,
}

impl PostgresCorrectionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CorrectionRepository for PostgresCorrectionRepository {
    #[tracing::instrument(skip_all, level = "debug", fields(%id))]
    async fn find_by_id(
        &self,
        id: &CorrectionId,
    ) -> Result<Option<AttendanceCorrection>, InfraError> {
        let row = sqlx::query_as::<_, AttendanceCorrectionRow>(
            r#"
            SELECT
                id, attendance_record_id, employee_id,
                corrected_check_in, corrected_check_out, reason, status,
                manager_id, manager_notes, manager_decided_at,
                hr_id, hr_notes, hr_decided_at,
                created_at, updated_at
            FROM attendance_corrections
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(AttendanceCorrection::try_from).transpose()
    }

    #[tracing::instrument(skip_all, level = "debug", fields(id = %correction.id(), %expected))]
    async fn update_decision(
        &self,
        tx: &mut TxContext,
        correction: &AttendanceCorrection,
        expected: CorrectionStatus,
    ) -> Result<(), InfraError> {
        let status: &str = correction.status().into();
        let expected_str: &str = expected.into();
        let result = sqlx::query(
            r#"
            UPDATE attendance_corrections SET
                status = $1,
                manager_id = $2,
                manager_notes = $3,
                manager_decided_at = $4,
                hr_id = $5,
                hr_notes = $6,
                hr_decided_at = $7,
                updated_at = $8
            WHERE id = $9 AND status = $10
            "#,
        )
        .bind(status)
        .bind(correction.manager_id().map(|u| *u.as_uuid()))
        .bind(correction.manager_notes())
        .bind(correction.manager_decided_at())
        .bind(correction.hr_id().map(|u| *u.as_uuid()))
        .bind(correction.hr_notes())
        .bind(correction.hr_decided_at())
        .bind(correction.updated_at())
        .bind(correction.id().as_uuid())
        .bind(expected_str)
        .execute(tx.conn()?)
        .await?;

        if result.rows_affected() == 0 {
            return Err(InfraError::conflict(
                "AttendanceCorrection",
                correction.id().to_string(),
            ));
        }

        Ok(())
    }

    #[tracing::instrument(skip_all, level = "debug", fields(record_id = %times.attendance_record_id))]
    async fn apply_to_attendance(
        &self,
        tx: &mut TxContext,
        times: &CorrectedTimes,
    ) -> Result<(), InfraError> {
        let result = sqlx::query(
            r#"
            UPDATE attendance_records SET
                check_in = COALESCE($1, check_in),
                check_out = COALESCE($2, check_out),
                updated_at = now()
            WHERE id = $3
            "#,
        )
        .bind(times.check_in)
        .bind(times.check_out)
        .bind(times.attendance_record_id.as_uuid())
        .execute(tx.conn()?)
        .await?;

        if result.rows_affected() == 0 {
            return Err(InfraError::unexpected(format!(
                "勤怠記録が見つかりません: {}",
                times.attendance_record_id
            )));
        }

        Ok(())
    }
}
