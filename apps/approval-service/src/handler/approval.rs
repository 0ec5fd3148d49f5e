//! # 承認ワークフロー API ハンドラ
//!
//! 申請サービスから呼び出される内部 API。
//! 申請の特定はパスの `{request_type}/{request_id}` で行う。

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use hrflow_domain::{
    approval::{ApprovalOutcome, ApprovalState, ApprovalStep},
    request::{RequestId, RequestRef, RequestType},
    user::{EmployeeId, UserId},
    value_objects::StepNumber,
};
use hrflow_shared::ApiResponse;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::CoreError,
    usecase::{
        AdminDecideInput,
        ApprovalProgress,
        ApprovalUseCaseImpl,
        DecideInput,
        InitiateOutcome,
    },
};

/// 承認ハンドラの State
pub struct ApprovalHandlerState {
    pub usecase: ApprovalUseCaseImpl,
}

/// 承認フロー開始リクエスト
#[derive(Debug, Deserialize)]
pub struct InitiateRequest {
    /// 申請者の従業員 ID
    pub employee_id: Uuid,
}

/// 承認者による判断リクエスト
#[derive(Debug, Deserialize)]
pub struct DecideRequest {
    /// 判断するユーザー ID (内部 API 用)
    pub actor_id:    Uuid,
    pub outcome:     ApprovalOutcome,
    /// コメント（任意）
    pub comment:     Option<String>,
    /// 判断対象のステップ番号（省略時は現在の pending ステップ）
    #[serde(default)]
    pub step_number: Option<StepNumber>,
}

/// 管理者オーバーライドリクエスト
#[derive(Debug, Deserialize)]
pub struct AdminDecideRequest {
    /// HR / 管理者ロールを持つユーザー ID (内部 API 用)
    pub actor_id: Uuid,
    pub outcome:  ApprovalOutcome,
    pub comment:  Option<String>,
}

/// 承認ステップ DTO
#[derive(Debug, Serialize)]
pub struct ApprovalStepDto {
    pub id:               Uuid,
    pub step_number:      u32,
    pub approver_type:    &'static str,
    pub approver_user_id: Uuid,
    pub status:           &'static str,
    pub acted_by:         Option<Uuid>,
    pub acted_at:         Option<DateTime<Utc>>,
    pub comment:          Option<String>,
}

impl From<&ApprovalStep> for ApprovalStepDto {
    fn from(step: &ApprovalStep) -> Self {
        Self {
            id:               *step.id().as_uuid(),
            step_number:      step.step_number().as_u32(),
            approver_type:    step.approver_type().into(),
            approver_user_id: *step.approver_user_id().as_uuid(),
            status:           step.status().into(),
            acted_by:         step.acted_by().map(|u| *u.as_uuid()),
            acted_at:         step.acted_at(),
            comment:          step.comment().map(str::to_string),
        }
    }
}

/// 承認状況 DTO
///
/// `state` は `no_approval` / `awaiting_step` / `approved` / `rejected`。
/// `awaiting_step` のときのみ `step_number` を含む。
#[derive(Debug, Serialize)]
pub struct ApprovalProgressDto {
    #[serde(flatten)]
    pub state: ApprovalState,
    pub steps: Vec<ApprovalStepDto>,
}

impl From<&ApprovalProgress> for ApprovalProgressDto {
    fn from(progress: &ApprovalProgress) -> Self {
        Self {
            state: progress.state,
            steps: progress.steps.iter().map(ApprovalStepDto::from).collect(),
        }
    }
}

/// 承認フロー開始の結果 DTO
#[derive(Debug, Serialize)]
pub struct InitiateDto {
    pub auto_approved: bool,
    pub steps:         Vec<ApprovalStepDto>,
}

impl From<&InitiateOutcome> for InitiateDto {
    fn from(outcome: &InitiateOutcome) -> Self {
        Self {
            auto_approved: outcome.auto_approved,
            steps:         outcome.steps.iter().map(ApprovalStepDto::from).collect(),
        }
    }
}

/// パスパラメータから申請の参照を組み立てる
fn request_ref(request_type: &str, request_id: Uuid) -> Result<RequestRef, CoreError> {
    let request_type: RequestType = request_type.parse()?;
    Ok(RequestRef::new(request_type, RequestId::from_uuid(request_id)))
}

/// 申請の承認フローを開始する
///
/// ## エンドポイント
/// POST /internal/approvals/{request_type}/{request_id}/initiate
///
/// ## 処理フロー
/// 1. パスパラメータから申請を特定
/// 2. ユースケースを呼び出し
/// 3. 201 Created + 作成したステップを返す（自動承認時は空）
pub async fn initiate(
    State(state): State<Arc<ApprovalHandlerState>>,
    Path((request_type, request_id)): Path<(String, Uuid)>,
    Json(req): Json<InitiateRequest>,
) -> Result<Response, CoreError> {
    let request = request_ref(&request_type, request_id)?;
    let employee_id = EmployeeId::from_uuid(req.employee_id);

    let outcome = state.usecase.initiate(request, employee_id).await?;

    let response = ApiResponse::new(InitiateDto::from(&outcome));
    Ok((StatusCode::CREATED, Json(response)).into_response())
}

/// 申請の承認ステップ一覧を取得する
///
/// ## エンドポイント
/// GET /internal/approvals/{request_type}/{request_id}/steps
pub async fn list_steps(
    State(state): State<Arc<ApprovalHandlerState>>,
    Path((request_type, request_id)): Path<(String, Uuid)>,
) -> Result<Response, CoreError> {
    let request = request_ref(&request_type, request_id)?;

    let progress = state.usecase.steps_for(&request).await?;

    let response = ApiResponse::new(ApprovalProgressDto::from(&progress));
    Ok((StatusCode::OK, Json(response)).into_response())
}

/// 現在の承認ステップを判断する
///
/// ## エンドポイント
/// POST /internal/approvals/{request_type}/{request_id}/decide
///
/// ## 処理フロー
/// 1. パスパラメータから申請を特定
/// 2. リクエストをパース
/// 3. ユースケースを呼び出し
/// 4. 200 OK + 判断後の承認状況を返す
pub async fn decide(
    State(state): State<Arc<ApprovalHandlerState>>,
    Path((request_type, request_id)): Path<(String, Uuid)>,
    Json(req): Json<DecideRequest>,
) -> Result<Response, CoreError> {
    let request = request_ref(&request_type, request_id)?;
    let input = DecideInput {
        actor:       UserId::from_uuid(req.actor_id),
        outcome:     req.outcome,
        comment:     req.comment,
        step_number: req.step_number,
    };

    let progress = state.usecase.decide(request, input).await?;

    let response = ApiResponse::new(ApprovalProgressDto::from(&progress));
    Ok((StatusCode::OK, Json(response)).into_response())
}

/// HR / 管理者が残りのステップをまとめて判断する
///
/// ## エンドポイント
/// POST /internal/approvals/{request_type}/{request_id}/admin-decide
pub async fn admin_decide(
    State(state): State<Arc<ApprovalHandlerState>>,
    Path((request_type, request_id)): Path<(String, Uuid)>,
    Json(req): Json<AdminDecideRequest>,
) -> Result<Response, CoreError> {
    let request = request_ref(&request_type, request_id)?;
    let input = AdminDecideInput {
        actor:   UserId::from_uuid(req.actor_id),
        outcome: req.outcome,
        comment: req.comment,
    };

    let progress = state.usecase.admin_decide(request, input).await?;

    let response = ApiResponse::new(ApprovalProgressDto::from(&progress));
    Ok((StatusCode::OK, Json(response)).into_response())
}
