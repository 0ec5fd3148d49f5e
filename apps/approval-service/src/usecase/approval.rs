//! # 承認ワークフローユースケース
//!
//! 申請の承認フロー開始、承認者による判断、管理者オーバーライドを実装する。
//!
//! ## 処理の流れ
//!
//! ```text
//! initiate ──→ ステップ生成（pending 1 つ + queued）──→ decide / admin_decide
//!    │                                                    │
//!    └─ 定義が無効・全ステップ解決不可 → 自動承認            └─ 終端 → 申請ステータスを同期
//! ```
//!
//! すべての遷移は「読み取ったステータス」を条件とした条件付き更新で書き込む。
//! 同じステップに対する並行操作は一方だけが成功し、他方は `CoreError::Conflict` になる。

mod admin;
mod decide;
mod initiate;
mod resolver;

use std::sync::Arc;

use hrflow_domain::{
    approval::{ApprovalOutcome, ApprovalState, ApprovalStep},
    clock::Clock,
    request::RequestRef,
    user::UserId,
    value_objects::StepNumber,
};
use hrflow_infra::{
    DirectoryService,
    db::TransactionManager,
    repository::{ApprovalStepRepository, RequestStatusRepository, WorkflowDefinitionRepository},
};
pub use resolver::{ApproverResolver, ResolverConfig};

use crate::{error::CoreError, usecase::notification::NotificationDispatcher};

/// 承認者による判断の入力
#[derive(Debug, Clone)]
pub struct DecideInput {
    /// 判断するユーザー
    pub actor:       UserId,
    /// 承認 / 却下
    pub outcome:     ApprovalOutcome,
    /// コメント（却下時は申請の却下理由になる）
    pub comment:     Option<String>,
    /// 判断対象のステップ番号（省略時は現在の pending ステップ）
    pub step_number: Option<StepNumber>,
}

/// 管理者オーバーライドの入力
#[derive(Debug, Clone)]
pub struct AdminDecideInput {
    /// HR / 管理者ロールを持つユーザー
    pub actor:   UserId,
    pub outcome: ApprovalOutcome,
    pub comment: Option<String>,
}

/// 承認フロー開始の結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitiateOutcome {
    /// ステップを作らずに承認済みにしたか
    pub auto_approved: bool,
    /// 作成したステップ（自動承認時は空）
    pub steps:         Vec<ApprovalStep>,
}

/// 申請の承認状況
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApprovalProgress {
    pub state: ApprovalState,
    pub steps: Vec<ApprovalStep>,
}

impl ApprovalProgress {
    fn from_steps(steps: Vec<ApprovalStep>) -> Self {
        Self {
            state: ApprovalState::derive(&steps),
            steps,
        }
    }
}

/// 承認ワークフローユースケースの依存コンポーネント
pub struct ApprovalUseCaseDeps {
    pub definition_repo: Arc<dyn WorkflowDefinitionRepository>,
    pub step_repo:       Arc<dyn ApprovalStepRepository>,
    pub status_repo:     Arc<dyn RequestStatusRepository>,
    pub directory:       Arc<dyn DirectoryService>,
    pub tx_manager:      Arc<dyn TransactionManager>,
    pub clock:           Arc<dyn Clock>,
    pub notifier:        NotificationDispatcher,
    pub resolver_config: ResolverConfig,
}

/// 承認ワークフローユースケース実装
pub struct ApprovalUseCaseImpl {
    deps:     ApprovalUseCaseDeps,
    resolver: ApproverResolver,
}

impl ApprovalUseCaseImpl {
    pub fn new(deps: ApprovalUseCaseDeps) -> Self {
        let resolver = ApproverResolver::new(deps.directory.clone(), deps.resolver_config.clone());
        Self { deps, resolver }
    }

    /// 申請の承認ステップをステップ番号順に取得する
    pub async fn steps_for(&self, request: &RequestRef) -> Result<ApprovalProgress, CoreError> {
        let steps = self.deps.step_repo.find_by_request(request).await?;
        Ok(ApprovalProgress::from_steps(steps))
    }
}
