//! # 勤怠修正申請
//!
//! 勤怠記録の修正申請を、上長 → 人事の固定 2 段階で承認する。
//! ワークフロー定義には依存しない。
//!
//! ```text
//! pending_manager ──承認──▶ pending_hr ──承認──▶ approved
//!        │                      │
//!        └──却下──▶ rejected ◀──却下──┘
//! ```
//!
//! 人事承認時には修正後の出退勤時刻を元の勤怠記録に反映する。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::IntoStaticStr;

use crate::{
    DomainError,
    user::{EmployeeId, UserId},
};

define_uuid_id! {
    /// 勤怠修正申請 ID
    pub struct CorrectionId;
}

define_uuid_id! {
    /// 勤怠記録 ID
    pub struct AttendanceRecordId;
}

/// 勤怠修正申請ステータス
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, IntoStaticStr, strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CorrectionStatus {
    /// 上長の判断待ち
    PendingManager,
    /// 人事の判断待ち
    PendingHr,
    Approved,
    Rejected,
}

impl std::str::FromStr for CorrectionStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending_manager" => Ok(Self::PendingManager),
            "pending_hr" => Ok(Self::PendingHr),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            _ => Err(DomainError::Validation(format!(
                "不正な勤怠修正ステータス: {}",
                s
            ))),
        }
    }
}

/// 勤怠記録に反映する修正値
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrectedTimes {
    pub attendance_record_id: AttendanceRecordId,
    pub check_in:             Option<DateTime<Utc>>,
    pub check_out:            Option<DateTime<Utc>>,
}

/// 勤怠修正申請エンティティ
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttendanceCorrection {
    id:                   CorrectionId,
    attendance_record_id: AttendanceRecordId,
    employee_id:          EmployeeId,
    corrected_check_in:   Option<DateTime<Utc>>,
    corrected_check_out:  Option<DateTime<Utc>>,
    reason:               String,
    status:               CorrectionStatus,
    manager_id:           Option<UserId>,
    manager_notes:        Option<String>,
    manager_decided_at:   Option<DateTime<Utc>>,
    hr_id:                Option<UserId>,
    hr_notes:             Option<String>,
    hr_decided_at:        Option<DateTime<Utc>>,
    created_at:           DateTime<Utc>,
    updated_at:           DateTime<Utc>,
}

/// 勤怠修正申請の新規作成パラメータ
pub struct NewAttendanceCorrection {
    pub id:                   CorrectionId,
    pub attendance_record_id: AttendanceRecordId,
    pub employee_id:          EmployeeId,
    pub corrected_check_in:   Option<DateTime<Utc>>,
    pub corrected_check_out:  Option<DateTime<Utc>>,
    pub reason:               String,
    pub now:                  DateTime<Utc>,
}

/// 勤怠修正申請の DB 復元パラメータ
pub struct AttendanceCorrectionRecord {
    pub id:                   CorrectionId,
    pub attendance_record_id: AttendanceRecordId,
    pub employee_id:          EmployeeId,
    pub corrected_check_in:   Option<DateTime<Utc>>,
    pub corrected_check_out:  Option<DateTime<Utc>>,
    pub reason:               String,
    pub status:               CorrectionStatus,
    pub manager_id:           Option<UserId>,
    pub manager_notes:        Option<String>,
    pub manager_decided_at:   Option<DateTime<Utc>>,
    pub hr_id:                Option<UserId>,
    pub hr_notes:             Option<String>,
    pub hr_decided_at:        Option<DateTime<Utc>>,
    pub created_at:           DateTime<Utc>,
    pub updated_at:           DateTime<Utc>,
}

impl AttendanceCorrection {
    /// 上長の判断待ちとして作成する
    pub fn new(params: NewAttendanceCorrection) -> Self {
        Self {
            id:                   params.id,
            attendance_record_id: params.attendance_record_id,
            employee_id:          params.employee_id,
            corrected_check_in:   params.corrected_check_in,
            corrected_check_out:  params.corrected_check_out,
            reason:               params.reason,
            status:               CorrectionStatus::PendingManager,
            manager_id:           None,
            manager_notes:        None,
            manager_decided_at:   None,
            hr_id:                None,
            hr_notes:             None,
            hr_decided_at:        None,
            created_at:           params.now,
            updated_at:           params.now,
        }
    }

    /// 既存のデータから復元する
    pub fn from_db(record: AttendanceCorrectionRecord) -> Self {
        Self {
            id:                   record.id,
            attendance_record_id: record.attendance_record_id,
            employee_id:          record.employee_id,
            corrected_check_in:   record.corrected_check_in,
            corrected_check_out:  record.corrected_check_out,
            reason:               record.reason,
            status:               record.status,
            manager_id:           record.manager_id,
            manager_notes:        record.manager_notes,
            manager_decided_at:   record.manager_decided_at,
            hr_id:                record.hr_id,
            hr_notes:             record.hr_notes,
            hr_decided_at:        record.hr_decided_at,
            created_at:           record.created_at,
            updated_at:           record.updated_at,
        }
    }

    // Getter メソッド

    pub fn id(&self) -> &CorrectionId {
        &self.id
    }

    pub fn attendance_record_id(&self) -> &AttendanceRecordId {
        &self.attendance_record_id
    }

    pub fn employee_id(&self) -> &EmployeeId {
        &self.employee_id
    }

    pub fn corrected_check_in(&self) -> Option<DateTime<Utc>> {
        self.corrected_check_in
    }

    pub fn corrected_check_out(&self) -> Option<DateTime<Utc>> {
        self.corrected_check_out
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    pub fn status(&self) -> CorrectionStatus {
        self.status
    }

    pub fn manager_id(&self) -> Option<&UserId> {
        self.manager_id.as_ref()
    }

    pub fn manager_notes(&self) -> Option<&str> {
        self.manager_notes.as_deref()
    }

    pub fn manager_decided_at(&self) -> Option<DateTime<Utc>> {
        self.manager_decided_at
    }

    pub fn hr_id(&self) -> Option<&UserId> {
        self.hr_id.as_ref()
    }

    pub fn hr_notes(&self) -> Option<&str> {
        self.hr_notes.as_deref()
    }

    pub fn hr_decided_at(&self) -> Option<DateTime<Utc>> {
        self.hr_decided_at
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    // ビジネスロジックメソッド

    /// 上長の判断を記録する
    ///
    /// 承認なら人事の判断待ちへ、却下なら即座に終端となる。
    ///
    /// # Errors
    ///
    /// - `DomainError::Conflict`: 上長の判断待ち以外の状態で呼び出した場合
    pub fn manager_decide(
        self,
        manager: UserId,
        approved: bool,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        self.ensure_status(CorrectionStatus::PendingManager)?;
        Ok(Self {
            status: if approved {
                CorrectionStatus::PendingHr
            } else {
                CorrectionStatus::Rejected
            },
            manager_id: Some(manager),
            manager_notes: notes,
            manager_decided_at: Some(now),
            updated_at: now,
            ..self
        })
    }

    /// 人事の判断を記録する
    ///
    /// # Errors
    ///
    /// - `DomainError::Conflict`: 人事の判断待ち以外の状態で呼び出した場合
    pub fn hr_decide(
        self,
        hr: UserId,
        approved: bool,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        self.ensure_status(CorrectionStatus::PendingHr)?;
        Ok(Self {
            status: if approved {
                CorrectionStatus::Approved
            } else {
                CorrectionStatus::Rejected
            },
            hr_id: Some(hr),
            hr_notes: notes,
            hr_decided_at: Some(now),
            updated_at: now,
            ..self
        })
    }

    /// 勤怠記録に反映すべき修正値
    ///
    /// 最終承認済みの場合のみ `Some` を返す。
    pub fn corrected_times(&self) -> Option<CorrectedTimes> {
        (self.status == CorrectionStatus::Approved).then(|| CorrectedTimes {
            attendance_record_id: self.attendance_record_id.clone(),
            check_in:             self.corrected_check_in,
            check_out:            self.corrected_check_out,
        })
    }

    fn ensure_status(&self, expected: CorrectionStatus) -> Result<(), DomainError> {
        if self.status != expected {
            return Err(DomainError::Conflict(format!(
                "勤怠修正申請 {} は {} ではありません（現在: {}）",
                self.id, expected, self.status
            )));
        }
        Ok(())
    }
}
