//! # リポジトリ実装
//!
//! ## 設計方針
//!
//! - **トレイトによる抽象化**: ユースケース層はトレイト経由で利用し、モックに差し替え可能
//! - **書き込みは TxContext 必須**: ステップと申請ステータスを同一トランザクションで更新する
//! - **条件付き更新**: 状態遷移は `status = 期待値` を WHERE 句に含める

pub mod approval_step_repository;
pub mod correction_repository;
pub mod request_status_repository;
pub mod workflow_definition_repository;

pub use approval_step_repository::{ApprovalStepRepository, PostgresApprovalStepRepository};
pub use correction_repository::{CorrectionRepository, PostgresCorrectionRepository};
pub use request_status_repository::{PostgresRequestStatusRepository, RequestStatusRepository};
pub use workflow_definition_repository::{
    PostgresWorkflowDefinitionRepository,
    WorkflowDefinitionRepository,
};
