//! WorkflowDefinitionRepository: ワークフロー定義の読み込み
//!
//! 定義は管理者が事前に設定するため、エンジンからは読み取りのみ行う。
//! 読み込み時にドメインの検証を通し、不正な定義はこの時点でエラーにする。

use async_trait::async_trait;
use hrflow_domain::{
    approval::{NewWorkflowDefinition, StepConfig, WorkflowDefinition},
    request::RequestType,
    user::UserId,
};
use serde_json::Value as JsonValue;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::InfraError;

/// WorkflowDefinitionRepository トレイト
#[async_trait]
pub trait WorkflowDefinitionRepository: Send + Sync {
    /// 申請種別の定義を取得する
    ///
    /// 定義が登録されていない場合は `None`。
    ///
    /// # Errors
    ///
    /// 保存済みの定義が不正な場合は `InfraErrorKind::InvalidDefinition`。
    async fn find_by_request_type(
        &self,
        request_type: RequestType,
    ) -> Result<Option<WorkflowDefinition>, InfraError>;
}

/// workflow_definitions テーブルの行
#[derive(sqlx::FromRow)]
struct WorkflowDefinitionRow {
    request_type:           String,
    is_active:              bool,
    steps:                  JsonValue,
    default_hr_approver_id: Option<Uuid>,
}

impl TryFrom<WorkflowDefinitionRow> for WorkflowDefinition {
    type Error = InfraError;

    fn try_from(row: WorkflowDefinitionRow) -> Result<Self, Self::Error> {
        let request_type = row
            .request_type
            .parse::<RequestType>()
            .map_err(|e| InfraError::unexpected(e.to_string()))?;
        let steps = StepConfig::list_from_json(row.steps)
            .map_err(|e| InfraError::invalid_definition(e.to_string()))?;

        WorkflowDefinition::new(NewWorkflowDefinition {
            request_type,
            is_active: row.is_active,
            steps,
            default_hr_approver_id: row.default_hr_approver_id.map(UserId::from_uuid),
        })
        .map_err(|e| InfraError::invalid_definition(e.to_string()))
    }
}

/// PostgreSQL 実装
pub struct PostgresWorkflowDefinitionRepository {
    pool: PgPool,
}

impl PostgresWorkflowDefinitionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl WorkflowDefinitionRepository for PostgresWorkflowDefinitionRepository {
    #[tracing::instrument(skip_all, level = "debug", fields(%request_type))]
    async fn find_by_request_type(
        &self,
        request_type: RequestType,
    ) -> Result<Option<WorkflowDefinition>, InfraError> {
        let request_type_str: &str = request_type.into();
        let row = sqlx::query_as::<_, WorkflowDefinitionRow>(
            r#"
            SELECT request_type, is_active, steps, default_hr_approver_id
            FROM workflow_definitions
            WHERE request_type = $1
            "#,
        )
        .bind(request_type_str)
        .fetch_optional(&self.pool)
        .await?;

        row.map(WorkflowDefinition::try_from).transpose()
    }
}
