//! RequestStatusRepository: 申請ステータスの書き込み
//!
//! 申請本体は申請種別ごとに別テーブルにある。
//! 承認エンジンが書き込むのはステータス列と承認スタンプ・却下理由のみ。

use async_trait::async_trait;
use hrflow_domain::request::{RequestRef, RequestStatusUpdate, RequestType};
use sqlx::PgPool;

use crate::{db::TxContext, error::InfraError};

/// RequestStatusRepository トレイト
#[async_trait]
pub trait RequestStatusRepository: Send + Sync {
    /// 申請のステータスを更新する
    ///
    /// 対象の申請が存在しない場合は `false` を返す。
    async fn apply(
        &self,
        tx: &mut TxContext,
        request: &RequestRef,
        update: &RequestStatusUpdate,
    ) -> Result<bool, InfraError>;

    /// 申請の現在のステータスを取得する
    async fn find_status(&self, request: &RequestRef) -> Result<Option<String>, InfraError>;
}

/// 申請種別ごとのテーブル名
fn table_name(request_type: RequestType) -> &'static str {
    match request_type {
        RequestType::TimeOff => "leave_requests",
        RequestType::BusinessTrip => "business_trips",
        RequestType::Loan => "loans",
    }
}

/// PostgreSQL 実装
pub struct PostgresRequestStatusRepository {
    pool: PgPool,
}

impl PostgresRequestStatusRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RequestStatusRepository for PostgresRequestStatusRepository {
    #[tracing::instrument(skip_all, level = "debug", fields(%request, status = update.status))]
    async fn apply(
        &self,
        tx: &mut TxContext,
        request: &RequestRef,
        update: &RequestStatusUpdate,
    ) -> Result<bool, InfraError> {
        let result = match request.request_type {
            RequestType::Loan => {
                sqlx::query(
                    r#"
                    UPDATE loans SET
                        status = $1,
                        rejection_reason = COALESCE($2, rejection_reason),
                        approved_by = COALESCE($3, approved_by),
                        approved_at = COALESCE($4, approved_at),
                        updated_at = now()
                    WHERE id = $5
                    "#,
                )
                .bind(update.status)
                .bind(update.rejection_reason.as_deref())
                .bind(update.approved_by.as_ref().map(|u| *u.as_uuid()))
                .bind(update.approved_at)
                .bind(request.request_id.as_uuid())
                .execute(tx.conn()?)
                .await?
            }
            request_type @ (RequestType::TimeOff | RequestType::BusinessTrip) => {
                let sql = format!(
                    r#"
                    UPDATE {} SET
                        status = $1,
                        rejection_reason = COALESCE($2, rejection_reason),
                        updated_at = now()
                    WHERE id = $3
                    "#,
                    table_name(request_type)
                );
                sqlx::query(&sql)
                    .bind(update.status)
                    .bind(update.rejection_reason.as_deref())
                    .bind(request.request_id.as_uuid())
                    .execute(tx.conn()?)
                    .await?
            }
        };

        Ok(result.rows_affected() > 0)
    }

    #[tracing::instrument(skip_all, level = "debug", fields(%request))]
    async fn find_status(&self, request: &RequestRef) -> Result<Option<String>, InfraError> {
        let sql = format!(
            "SELECT status FROM {} WHERE id = $1",
            table_name(request.request_type)
        );
        let status = sqlx::query_scalar::<_, String>(&sql)
            .bind(request.request_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        Ok(status)
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(RequestType::TimeOff, "leave_requests")]
    #[case(RequestType::BusinessTrip, "business_trips")]
    #[case(RequestType::Loan, "loans")]
    fn test_申請種別ごとのテーブル名(#[case] request_type: RequestType, #[case] expected: &str) {
        assert_eq!(table_name(request_type), expected);
    }
}
