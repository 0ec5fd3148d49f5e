//! # ドメイン層エラー定義
//!
//! ビジネスルール違反やドメイン固有の例外状態を表現するエラー型。
//!
//! ## エラーの種類と HTTP ステータスの対応
//!
//! | エラー種別 | HTTP ステータス | 用途 |
//! |-----------|----------------|------|
//! | `Validation` | 400 Bad Request | 入力値の検証失敗 |
//! | `Configuration` | 500 Internal Server Error | ワークフロー定義の不整合 |
//! | `NotFound` | 404 Not Found | 対象が存在しない |
//! | `Conflict` | 409 Conflict | 既に処理済み・段階の不一致 |
//! | `Forbidden` | 403 Forbidden | 権限不足 |
//!
//! ## 使用例
//!
//! ```rust
//! use hrflow_domain::DomainError;
//!
//! fn validate_comment(comment: &str) -> Result<(), DomainError> {
//!     if comment.len() > 2000 {
//!         return Err(DomainError::Validation("コメントが長すぎます".to_string()));
//!     }
//!     Ok(())
//! }
//! ```

use thiserror::Error;

/// ドメイン層で発生するエラー
#[derive(Debug, Error)]
pub enum DomainError {
    /// バリデーションエラー
    ///
    /// 入力値がビジネスルールに違反している場合に使用する。
    #[error("バリデーションエラー: {0}")]
    Validation(String),

    /// 設定エラー
    ///
    /// ワークフロー定義そのものが不正な場合に使用する。
    /// 定義の読み込み時に検出し、遷移処理の途中では発生させない。
    ///
    /// # 例
    ///
    /// - ステップ番号が 1 から始まらない、または昇順でない
    /// - `specific_user` ステップにユーザー ID がない
    #[error("ワークフロー定義が不正です: {0}")]
    Configuration(String),

    /// エンティティが見つからない
    #[error("{entity_type} が見つかりません: {id}")]
    NotFound {
        /// エンティティの種類（"ApprovalStep", "AttendanceCorrection" など）
        entity_type: &'static str,
        /// 検索に使用した識別子
        id:          String,
    },

    /// 競合エラー
    ///
    /// 対象が既に別の操作で処理済みの場合に使用する。
    /// クライアントは最新の状態を取得し直す必要がある。
    #[error("競合が発生しました: {0}")]
    Conflict(String),

    /// 権限エラー
    ///
    /// 認証（Authentication）ではなく認可（Authorization）の失敗を表す。
    #[error("権限がありません: {0}")]
    Forbidden(String),
}
