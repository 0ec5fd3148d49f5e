//! # 勤怠修正 API ハンドラ
//!
//! 上長・人事の 2 段階判断を受け付ける内部 API。

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use hrflow_domain::{
    correction::{AttendanceCorrection, CorrectionId},
    user::UserId,
};
use hrflow_shared::ApiResponse;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::CoreError,
    usecase::{CorrectionDecisionInput, CorrectionUseCaseImpl},
};

/// 勤怠修正ハンドラの State
pub struct CorrectionHandlerState {
    pub usecase: CorrectionUseCaseImpl,
}

/// 上長・人事の判断リクエスト
#[derive(Debug, Deserialize)]
pub struct CorrectionDecisionRequest {
    /// 判断するユーザー ID (内部 API 用)
    pub decider_id: Uuid,
    pub approved:   bool,
    pub notes:      Option<String>,
}

impl CorrectionDecisionRequest {
    fn into_input(self) -> CorrectionDecisionInput {
        CorrectionDecisionInput {
            decider:  UserId::from_uuid(self.decider_id),
            approved: self.approved,
            notes:    self.notes,
        }
    }
}

/// 勤怠修正申請 DTO
#[derive(Debug, Serialize)]
pub struct CorrectionDto {
    pub id:                   Uuid,
    pub attendance_record_id: Uuid,
    pub employee_id:          Uuid,
    pub status:               &'static str,
    pub corrected_check_in:   Option<DateTime<Utc>>,
    pub corrected_check_out:  Option<DateTime<Utc>>,
    pub reason:               String,
    pub manager_id:           Option<Uuid>,
    pub manager_notes:        Option<String>,
    pub manager_decided_at:   Option<DateTime<Utc>>,
    pub hr_id:                Option<Uuid>,
    pub hr_notes:             Option<String>,
    pub hr_decided_at:        Option<DateTime<Utc>>,
}

impl From<&AttendanceCorrection> for CorrectionDto {
    fn from(c: &AttendanceCorrection) -> Self {
        Self {
            id:                   *c.id().as_uuid(),
            attendance_record_id: *c.attendance_record_id().as_uuid(),
            employee_id:          *c.employee_id().as_uuid(),
            status:               c.status().into(),
            corrected_check_in:   c.corrected_check_in(),
            corrected_check_out:  c.corrected_check_out(),
            reason:               c.reason().to_string(),
            manager_id:           c.manager_id().map(|u| *u.as_uuid()),
            manager_notes:        c.manager_notes().map(str::to_string),
            manager_decided_at:   c.manager_decided_at(),
            hr_id:                c.hr_id().map(|u| *u.as_uuid()),
            hr_notes:             c.hr_notes().map(str::to_string),
            hr_decided_at:        c.hr_decided_at(),
        }
    }
}

/// 上長の判断を記録する
///
/// ## エンドポイント
/// POST /internal/corrections/{id}/manager-decision
pub async fn manager_decision(
    State(state): State<Arc<CorrectionHandlerState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<CorrectionDecisionRequest>,
) -> Result<Response, CoreError> {
    let correction = state
        .usecase
        .manager_decide(CorrectionId::from_uuid(id), req.into_input())
        .await?;

    let response = ApiResponse::new(CorrectionDto::from(&correction));
    Ok((StatusCode::OK, Json(response)).into_response())
}

/// 人事の判断を記録する
///
/// ## エンドポイント
/// POST /internal/corrections/{id}/hr-decision
///
/// 承認時は勤怠記録へ修正後の時刻が反映される。
pub async fn hr_decision(
    State(state): State<Arc<CorrectionHandlerState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<CorrectionDecisionRequest>,
) -> Result<Response, CoreError> {
    let correction = state
        .usecase
        .hr_decide(CorrectionId::from_uuid(id), req.into_input())
        .await?;

    let response = ApiResponse::new(CorrectionDto::from(&correction));
    Ok((StatusCode::OK, Json(response)).into_response())
}
