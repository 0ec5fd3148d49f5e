//! テスト共通フィクスチャ
//!
//! DB を使用する統合テストで共通利用するシード投入ヘルパー。

// 各テストファイルが独立したクレートとしてコンパイルされるため、
// 使用しない関数に dead_code 警告が出る。モジュール全体で抑制する。
#![allow(dead_code)]

use chrono::{DateTime, Utc};
use hrflow_domain::{
    correction::{AttendanceRecordId, CorrectionId},
    request::{RequestId, RequestRef, RequestType},
    user::{DirectoryRole, EmployeeId, UserId},
};
use sqlx::PgPool;

pub fn test_now() -> DateTime<Utc> {
    DateTime::from_timestamp(1_700_000_000, 0).unwrap()
}

/// ユーザーを作成する
pub async fn insert_user(pool: &PgPool, name: &str) -> UserId {
    let user_id = UserId::new();
    sqlx::query("INSERT INTO users (id, email, name) VALUES ($1, $2, $3)")
        .bind(user_id.as_uuid())
        .bind(format!("{}@example.com", user_id))
        .bind(name)
        .execute(pool)
        .await
        .unwrap();
    user_id
}

/// 従業員を作成する
pub async fn insert_employee(
    pool: &PgPool,
    user_id: Option<&UserId>,
    manager_id: Option<&EmployeeId>,
) -> EmployeeId {
    let employee_id = EmployeeId::new();
    sqlx::query("INSERT INTO employees (id, user_id, manager_id, name) VALUES ($1, $2, $3, $4)")
        .bind(employee_id.as_uuid())
        .bind(user_id.map(|u| *u.as_uuid()))
        .bind(manager_id.map(|m| *m.as_uuid()))
        .bind("テスト従業員")
        .execute(pool)
        .await
        .unwrap();
    employee_id
}

pub async fn grant_role(pool: &PgPool, user_id: &UserId, role: DirectoryRole) {
    let role: &str = role.into();
    sqlx::query("INSERT INTO user_roles (user_id, role) VALUES ($1, $2)")
        .bind(user_id.as_uuid())
        .bind(role)
        .execute(pool)
        .await
        .unwrap();
}

/// 申請を作成する
pub async fn insert_request(
    pool: &PgPool,
    request_type: RequestType,
    employee_id: &EmployeeId,
) -> RequestRef {
    let request_id = RequestId::new();
    let sql = match request_type {
        RequestType::TimeOff => {
            "INSERT INTO leave_requests (id, employee_id, start_date, end_date) \
             VALUES ($1, $2, CURRENT_DATE, CURRENT_DATE)"
        }
        RequestType::BusinessTrip => {
            "INSERT INTO business_trips (id, employee_id, destination) VALUES ($1, $2, '大阪')"
        }
        RequestType::Loan => "INSERT INTO loans (id, employee_id, amount) VALUES ($1, $2, 100000)",
    };
    sqlx::query(sql)
        .bind(request_id.as_uuid())
        .bind(employee_id.as_uuid())
        .execute(pool)
        .await
        .unwrap();
    RequestRef::new(request_type, request_id)
}

/// 勤怠記録と修正申請を作成する
pub async fn insert_correction(
    pool: &PgPool,
    employee_id: &EmployeeId,
    corrected_check_in: DateTime<Utc>,
) -> (AttendanceRecordId, CorrectionId) {
    let record_id = AttendanceRecordId::new();
    sqlx::query(
        "INSERT INTO attendance_records (id, employee_id, work_date, check_in) \
         VALUES ($1, $2, CURRENT_DATE, NULL)",
    )
    .bind(record_id.as_uuid())
    .bind(employee_id.as_uuid())
    .execute(pool)
    .await
    .unwrap();

    let correction_id = CorrectionId::new();
    sqlx::query(
        "INSERT INTO attendance_corrections \
         (id, attendance_record_id, employee_id, corrected_check_in, reason) \
         VALUES ($1, $2, $3, $4, '打刻漏れ')",
    )
    .bind(correction_id.as_uuid())
    .bind(record_id.as_uuid())
    .bind(employee_id.as_uuid())
    .bind(corrected_check_in)
    .execute(pool)
    .await
    .unwrap();

    (record_id, correction_id)
}
