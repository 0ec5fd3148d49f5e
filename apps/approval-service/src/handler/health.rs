//! # ヘルスチェックハンドラ
//!
//! Approval Service の稼働状態を確認するためのエンドポイント。
//!
//! ```text
//! GET /health
//! ```

use axum::Json;
use hrflow_shared::HealthResponse;

/// ヘルスチェックエンドポイント
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse::healthy(env!("CARGO_PKG_VERSION")))
}
