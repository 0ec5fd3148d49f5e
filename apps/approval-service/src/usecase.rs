//! # ユースケース層
//!
//! 承認ワークフローエンジンのビジネスロジックを実装する。
//!
//! ## 設計方針
//!
//! - **依存性注入**: リポジトリ・ディレクトリ・時刻は `Arc<dyn Trait>` で受け取る
//! - **ハンドラは薄く**: 入力の変換とレスポンスの組み立てのみを行い、判断はここに置く
//! - **単一トランザクション**: ステップと申請ステータスの書き込みは 1 つの `TxContext` にまとめる
//! - **通知は後回し**: コミット後に [`NotificationDispatcher`] へ渡し、結果を待たない

pub mod approval;
pub mod correction;
mod helpers;
pub mod notification;

pub use approval::{
    AdminDecideInput,
    ApprovalProgress,
    ApprovalUseCaseDeps,
    ApprovalUseCaseImpl,
    ApproverResolver,
    DecideInput,
    InitiateOutcome,
    ResolverConfig,
};
pub use correction::{CorrectionDecisionInput, CorrectionUseCaseDeps, CorrectionUseCaseImpl};
pub use notification::NotificationDispatcher;
