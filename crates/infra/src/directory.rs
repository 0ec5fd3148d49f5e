//! # ディレクトリサービス
//!
//! 従業員・上長・ロール保持者を参照する読み取り専用のサービス。
//! 承認者の解決と、管理者オーバーライドの権限確認に使う。

use async_trait::async_trait;
use hrflow_domain::user::{DirectoryRole, EmployeeId, UserId};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::InfraError;

/// ディレクトリサービストレイト
#[async_trait]
pub trait DirectoryService: Send + Sync {
    /// 従業員に紐づくユーザー ID を取得する
    async fn user_id_for_employee(
        &self,
        employee_id: &EmployeeId,
    ) -> Result<Option<UserId>, InfraError>;

    /// 従業員の上長の従業員 ID を取得する
    async fn manager_id_for_employee(
        &self,
        employee_id: &EmployeeId,
    ) -> Result<Option<EmployeeId>, InfraError>;

    /// 指定ロールのいずれかを持つユーザーを 1 人取得する
    ///
    /// `roles` の並び順を優先度として扱う。
    async fn find_holder_of_role(
        &self,
        roles: &[DirectoryRole],
    ) -> Result<Option<UserId>, InfraError>;

    /// ユーザーが指定ロールのいずれかを持つか
    async fn has_any_role(
        &self,
        user_id: &UserId,
        roles: &[DirectoryRole],
    ) -> Result<bool, InfraError>;
}

fn role_names(roles: &[DirectoryRole]) -> Vec<String> {
    roles
        .iter()
        .map(|r| {
            let s: &str = r.into();
            s.to_string()
        })
        .collect()
}

/// PostgreSQL 実装
pub struct PostgresDirectoryService {
    pool: PgPool,
}

impl PostgresDirectoryService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DirectoryService for PostgresDirectoryService {
    #[tracing::instrument(skip_all, level = "debug", fields(%employee_id))]
    async fn user_id_for_employee(
        &self,
        employee_id: &EmployeeId,
    ) -> Result<Option<UserId>, InfraError> {
        let user_id = sqlx::query_scalar::<_, Option<Uuid>>(
            "SELECT user_id FROM employees WHERE id = $1",
        )
        .bind(employee_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        Ok(user_id.flatten().map(UserId::from_uuid))
    }

    #[tracing::instrument(skip_all, level = "debug", fields(%employee_id))]
    async fn manager_id_for_employee(
        &self,
        employee_id: &EmployeeId,
    ) -> Result<Option<EmployeeId>, InfraError> {
        let manager_id = sqlx::query_scalar::<_, Option<Uuid>>(
            "SELECT manager_id FROM employees WHERE id = $1",
        )
        .bind(employee_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        Ok(manager_id.flatten().map(EmployeeId::from_uuid))
    }

    #[tracing::instrument(skip_all, level = "debug", fields(roles = ?roles))]
    async fn find_holder_of_role(
        &self,
        roles: &[DirectoryRole],
    ) -> Result<Option<UserId>, InfraError> {
        let user_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT user_id
            FROM user_roles
            WHERE role = ANY($1)
            ORDER BY array_position($1::text[], role), created_at, user_id
            LIMIT 1
            "#,
        )
        .bind(role_names(roles))
        .fetch_optional(&self.pool)
        .await?;

        Ok(user_id.map(UserId::from_uuid))
    }

    #[tracing::instrument(skip_all, level = "debug", fields(%user_id))]
    async fn has_any_role(
        &self,
        user_id: &UserId,
        roles: &[DirectoryRole],
    ) -> Result<bool, InfraError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM user_roles WHERE user_id = $1 AND role = ANY($2))",
        )
        .bind(user_id.as_uuid())
        .bind(role_names(roles))
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }
}
