//! # HRFlow ドメイン層
//!
//! 承認ワークフローエンジンの中核となるドメインモデルを定義する。
//!
//! ## 設計方針
//!
//! - **エンティティ**: 一意の識別子を持つオブジェクト（例: ApprovalStep, AttendanceCorrection）
//! - **値オブジェクト**: 識別子を持たない不変オブジェクト（例: StepNumber, RequestRef）
//! - **状態遷移**: 遷移メソッドは新しいインスタンスを返し、不正な遷移はエラーにする
//! - **ドメインエラー**: ビジネスルール違反を表現するエラー型
//!
//! ## 依存関係の方向
//!
//! ```text
//! approval-service → infra → domain
//! ```
//!
//! ドメイン層はインフラ層（DB、ディレクトリ、通知）には一切依存しない。
//!
//! ## モジュール構成
//!
//! - [`approval`] - 承認ワークフロー定義、承認ステップ、承認状態
//! - [`correction`] - 勤怠修正の 2 段階承認
//! - [`request`] - 申請種別と申請ステータスの対応表
//! - [`notification`] - 遷移後に送信する通知イベント
//! - [`user`] - ユーザー・従業員の識別子とロール
//! - [`value_objects`] - 共通値オブジェクト
//! - [`clock`] - 時刻プロバイダ
//! - [`error`] - ドメインエラー

#[macro_use]
mod macros;

pub mod approval;
pub mod clock;
pub mod correction;
pub mod error;
pub mod notification;
pub mod request;
pub mod user;
pub mod value_objects;

pub use error::DomainError;
