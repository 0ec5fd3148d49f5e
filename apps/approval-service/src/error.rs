//! # Approval Service エラー定義
//!
//! Approval Service 固有のエラーと、HTTP レスポンスへの変換を定義する。

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use hrflow_domain::DomainError;
use hrflow_infra::{InfraError, InfraErrorKind};
use serde::Serialize;
use thiserror::Error;

/// エラーレスポンス（RFC 7807 Problem Details）
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    #[serde(rename = "type")]
    pub error_type: String,
    pub title:      String,
    pub status:     u16,
    pub detail:     String,
}

/// Approval Service で発生するエラー
#[derive(Debug, Error)]
pub enum CoreError {
    /// リソースが見つからない
    #[error("リソースが見つかりません: {0}")]
    NotFound(String),

    /// 不正なリクエスト
    #[error("不正なリクエスト: {0}")]
    BadRequest(String),

    /// 権限不足
    #[error("権限がありません: {0}")]
    Forbidden(String),

    /// 競合（条件付き更新の失敗、判断済みのステップ）
    #[error("競合が発生しました: {0}")]
    Conflict(String),

    /// ワークフロー定義の設定誤り
    #[error("ワークフロー定義が不正です: {0}")]
    Configuration(String),

    /// データベースエラー
    #[error("データベースエラー: {0}")]
    Database(InfraError),

    /// 内部エラー
    #[error("内部エラー: {0}")]
    Internal(String),
}

impl From<InfraError> for CoreError {
    fn from(e: InfraError) -> Self {
        if let Some((entity, id)) = e.as_conflict() {
            return CoreError::Conflict(format!(
                "{entity} ({id}) は既に更新されています。最新の情報を取得してください。"
            ));
        }
        if let InfraErrorKind::InvalidDefinition(msg) = e.kind() {
            return CoreError::Configuration(msg.clone());
        }
        CoreError::Database(e)
    }
}

impl From<DomainError> for CoreError {
    fn from(e: DomainError) -> Self {
        match e {
            DomainError::Validation(msg) => CoreError::BadRequest(msg),
            DomainError::Configuration(msg) => CoreError::Configuration(msg),
            e @ DomainError::NotFound { .. } => CoreError::NotFound(e.to_string()),
            DomainError::Conflict(msg) => CoreError::Conflict(msg),
            DomainError::Forbidden(msg) => CoreError::Forbidden(msg),
        }
    }
}

impl IntoResponse for CoreError {
    fn into_response(self) -> Response {
        let (status, error_type, title, detail) = match &self {
            CoreError::NotFound(msg) => (
                StatusCode::NOT_FOUND,
                "https://hrflow.example.com/errors/not-found",
                "Not Found",
                msg.clone(),
            ),
            CoreError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                "https://hrflow.example.com/errors/bad-request",
                "Bad Request",
                msg.clone(),
            ),
            CoreError::Forbidden(msg) => (
                StatusCode::FORBIDDEN,
                "https://hrflow.example.com/errors/forbidden",
                "Forbidden",
                msg.clone(),
            ),
            CoreError::Conflict(msg) => (
                StatusCode::CONFLICT,
                "https://hrflow.example.com/errors/conflict",
                "Conflict",
                msg.clone(),
            ),
            CoreError::Configuration(msg) => {
                tracing::error!("ワークフロー定義エラー: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "https://hrflow.example.com/errors/configuration",
                    "Workflow Configuration Error",
                    msg.clone(),
                )
            }
            CoreError::Database(e) => {
                tracing::error!(span_trace = %e.span_trace(), "データベースエラー: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "https://hrflow.example.com/errors/internal-error",
                    "Internal Server Error",
                    "内部エラーが発生しました".to_string(),
                )
            }
            CoreError::Internal(msg) => {
                tracing::error!("内部エラー: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "https://hrflow.example.com/errors/internal-error",
                    "Internal Server Error",
                    "内部エラーが発生しました".to_string(),
                )
            }
        };

        (
            status,
            Json(ErrorResponse {
                error_type: error_type.to_string(),
                title: title.to_string(),
                status: status.as_u16(),
                detail,
            }),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn test_条件付き更新の競合はconflictになる() {
        let error = CoreError::from(InfraError::conflict("ApprovalStep", "loan:1#2"));

        assert!(matches!(error, CoreError::Conflict(msg) if msg.contains("loan:1#2")));
    }

    #[test]
    fn test_不正な定義はconfigurationになる() {
        let error = CoreError::from(InfraError::invalid_definition("steps が空です"));

        assert!(matches!(error, CoreError::Configuration(msg) if msg == "steps が空です"));
    }

    #[test]
    fn test_その他のインフラエラーはdatabaseになる() {
        let error = CoreError::from(InfraError::unexpected("接続断"));

        assert!(matches!(error, CoreError::Database(_)));
    }

    #[rstest]
    #[case(CoreError::NotFound("x".into()), StatusCode::NOT_FOUND)]
    #[case(CoreError::BadRequest("x".into()), StatusCode::BAD_REQUEST)]
    #[case(CoreError::Forbidden("x".into()), StatusCode::FORBIDDEN)]
    #[case(CoreError::Conflict("x".into()), StatusCode::CONFLICT)]
    #[case(CoreError::Configuration("x".into()), StatusCode::INTERNAL_SERVER_ERROR)]
    #[case(CoreError::Internal("x".into()), StatusCode::INTERNAL_SERVER_ERROR)]
    fn test_エラーごとのステータスコード(#[case] error: CoreError, #[case] expected: StatusCode) {
        assert_eq!(error.into_response().status(), expected);
    }

    #[rstest]
    #[case(DomainError::Validation("x".into()), "BadRequest")]
    #[case(DomainError::Configuration("x".into()), "Configuration")]
    #[case(DomainError::NotFound { entity_type: "ApprovalStep", id: "1".into() }, "NotFound")]
    #[case(DomainError::Conflict("x".into()), "Conflict")]
    #[case(DomainError::Forbidden("x".into()), "Forbidden")]
    fn test_ドメインエラーの変換(#[case] error: DomainError, #[case] expected: &str) {
        let converted = CoreError::from(error);
        let variant = match converted {
            CoreError::NotFound(_) => "NotFound",
            CoreError::BadRequest(_) => "BadRequest",
            CoreError::Forbidden(_) => "Forbidden",
            CoreError::Conflict(_) => "Conflict",
            CoreError::Configuration(_) => "Configuration",
            CoreError::Database(_) => "Database",
            CoreError::Internal(_) => "Internal",
        };
        assert_eq!(variant, expected);
    }
}
