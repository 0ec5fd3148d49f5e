//! ユースケース層の共通ヘルパー
//!
//! トランザクションの開始・コミットや、リポジトリ呼び出し結果の変換など、
//! 複数のユースケースで繰り返されるパターンを共通化する。

use hrflow_infra::{
    InfraError,
    db::{TransactionManager, TxContext},
};

use crate::error::CoreError;

/// トランザクションを開始する
pub(crate) async fn begin_tx(tx_manager: &dyn TransactionManager) -> Result<TxContext, CoreError> {
    tx_manager
        .begin()
        .await
        .map_err(|e| CoreError::Internal(format!("トランザクション開始に失敗: {}", e)))
}

/// トランザクションをコミットする
pub(crate) async fn commit_tx(tx: TxContext) -> Result<(), CoreError> {
    tx.commit()
        .await
        .map_err(|e| CoreError::Internal(format!("トランザクションコミットに失敗: {}", e)))
}

/// リポジトリの `Result<Option<T>, InfraError>` を `Result<T, CoreError>` に変換する
///
/// ```ignore
/// let correction = self.deps.correction_repo.find_by_id(&id).await
///     .or_not_found("勤怠修正申請")?;
/// ```
pub(crate) trait FindResultExt<T> {
    /// `None` の場合は `CoreError::NotFound`、`InfraError` の場合はその変換結果を返す
    fn or_not_found(self, entity_name: &str) -> Result<T, CoreError>;
}

impl<T> FindResultExt<T> for Result<Option<T>, InfraError> {
    fn or_not_found(self, entity_name: &str) -> Result<T, CoreError> {
        self?.ok_or_else(|| CoreError::NotFound(format!("{}が見つかりません", entity_name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_or_not_found_ok_some_は値を返す() {
        let result: Result<Option<i32>, InfraError> = Ok(Some(42));

        assert_eq!(result.or_not_found("テスト").unwrap(), 42);
    }

    #[test]
    fn test_or_not_found_ok_none_はnotfoundエラーを返す() {
        let result: Result<Option<i32>, InfraError> = Ok(None);

        let error = result.or_not_found("勤怠修正申請").unwrap_err();

        assert!(matches!(error, CoreError::NotFound(msg) if msg == "勤怠修正申請が見つかりません"));
    }

    #[test]
    fn test_or_not_found_errはインフラエラーを変換する() {
        let result: Result<Option<i32>, InfraError> = Err(InfraError::unexpected("接続断"));

        assert!(matches!(
            result.or_not_found("テスト"),
            Err(CoreError::Database(_))
        ));
    }
}
