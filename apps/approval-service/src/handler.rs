//! # HTTP リクエストハンドラ
//!
//! axum のルートに対応するハンドラ関数を定義する。
//!
//! ## 設計方針
//!
//! - 各ハンドラはサブモジュールに配置
//! - 親モジュール（この `handler.rs`）で re-export し、フラットな API を提供
//! - ハンドラは薄く保ち、判断はユースケース層に委譲

pub mod approval;
pub mod correction;
pub mod health;

use std::sync::Arc;

pub use approval::{
    ApprovalHandlerState,
    admin_decide,
    decide,
    initiate,
    list_steps,
};
use axum::{
    Router,
    routing::{get, post},
};
pub use correction::{CorrectionHandlerState, hr_decision, manager_decision};
pub use health::health_check;
use hrflow_shared::observability::{MakeRequestUuidV7, make_request_span};
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

/// ルーターを構築する
///
/// すべてのリクエストに `X-Request-Id` を付与し、リクエストスパンに載せる。
pub fn router(
    approval_state: Arc<ApprovalHandlerState>,
    correction_state: Arc<CorrectionHandlerState>,
) -> Router {
    let approvals = Router::new()
        .route(
            "/internal/approvals/{request_type}/{request_id}/initiate",
            post(initiate),
        )
        .route(
            "/internal/approvals/{request_type}/{request_id}/steps",
            get(list_steps),
        )
        .route(
            "/internal/approvals/{request_type}/{request_id}/decide",
            post(decide),
        )
        .route(
            "/internal/approvals/{request_type}/{request_id}/admin-decide",
            post(admin_decide),
        )
        .with_state(approval_state);

    let corrections = Router::new()
        .route(
            "/internal/corrections/{id}/manager-decision",
            post(manager_decision),
        )
        .route(
            "/internal/corrections/{id}/hr-decision",
            post(hr_decision),
        )
        .with_state(correction_state);

    Router::new()
        .route("/health", get(health_check))
        .merge(approvals)
        .merge(corrections)
        // 下に書いたものが外側
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http().make_span_with(make_request_span))
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV7))
}
