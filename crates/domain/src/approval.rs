//! # 承認ワークフロー
//!
//! 申請種別ごとのワークフロー定義と、申請ごとに生成される承認ステップを管理する。
//!
//! ## 概念モデル
//!
//! - **WorkflowDefinition**: 申請種別ごとの承認ステップ構成（管理者が事前に設定）
//! - **StepConfig**: 定義内の 1 ステップ（承認者ロールとフォールバック）
//! - **ApprovalStep**: 申請ごとに生成される承認ステップの実体
//! - **ApprovalState**: ステップ群から導出される申請の承認状態
//!
//! ## 使用例
//!
//! ```rust
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use hrflow_domain::{
//!     approval::{ApproverFallback, ApproverRole, NewWorkflowDefinition, StepConfig, WorkflowDefinition},
//!     request::RequestType,
//!     value_objects::StepNumber,
//! };
//!
//! let definition = WorkflowDefinition::new(NewWorkflowDefinition {
//!     request_type:           RequestType::TimeOff,
//!     is_active:              true,
//!     steps:                  vec![
//!         StepConfig::role(StepNumber::new(1)?, ApproverRole::Manager, Some(ApproverFallback::Hr)),
//!         StepConfig::role(StepNumber::new(2)?, ApproverRole::Hr, None),
//!     ],
//!     default_hr_approver_id: None,
//! })?;
//! assert!(definition.requires_approval());
//! # Ok(())
//! # }
//! ```

mod definition;
mod state;
mod step;

pub use definition::*;
pub use state::*;
pub use step::*;
