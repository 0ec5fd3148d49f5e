//! # HRFlow インフラ層
//!
//! 外部システムとの接続・通信を担当する。
//!
//! ## 責務
//!
//! - **データベース接続**: PostgreSQL への接続プール、マイグレーション、トランザクション
//! - **リポジトリ実装**: ワークフロー定義、承認ステップ、申請ステータス、勤怠修正
//! - **ディレクトリサービス**: 従業員・上長・ロール保持者の参照
//! - **通知送信**: 遷移後の通知の送信インターフェース
//!
//! ## 依存関係
//!
//! ```text
//! approval-service → infra → domain
//!                      ↘
//!                       shared
//! ```
//!
//! ## モジュール構成
//!
//! - [`db`] - PostgreSQL 接続管理とトランザクション
//! - [`directory`] - ディレクトリサービス
//! - [`error`] - インフラ層エラー定義
//! - [`notification`] - 通知送信
//! - [`repository`] - リポジトリ実装
//! - `mock` - テスト用インメモリ実装（`test-utils` feature）

pub mod db;
pub mod directory;
pub mod error;
#[cfg(any(test, feature = "test-utils"))]
pub mod mock;
pub mod notification;
pub mod repository;

pub use directory::{DirectoryService, PostgresDirectoryService};
pub use error::{InfraError, InfraErrorKind};
pub use notification::{NoopNotificationSender, NotificationSender};
