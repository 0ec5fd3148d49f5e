//! # 承認者の解決
//!
//! ステップ構成のロール（上長 / 人事 / 特定ユーザー）を具体的なユーザーに変換する。
//!
//! ## 解決規則
//!
//! | ロール | 解決方法 | 解決できない場合 |
//! |--------|----------|------------------|
//! | `manager` | 申請者の上長 → 上長のユーザー | `fallback = hr` なら人事として解決、なければ解決不可 |
//! | `hr` | 定義の既定人事承認者 → HR / Admin ロール保持者 | 解決不可 |
//! | `specific_user` | 設定されたユーザー | （定義の検証で保証される） |
//!
//! ディレクトリ参照のエラーは線形バックオフでリトライし、
//! それでも失敗した場合は「見つからなかった」として扱う。
//! 解決不可はエラーではなく [`Resolution::Unresolvable`] で表し、呼び出し側がステップをスキップする。

use std::{future::Future, sync::Arc, time::Duration};

use hrflow_domain::{
    approval::{ApproverFallback, ApproverRole, Resolution, StepConfig, WorkflowDefinition},
    user::{DirectoryRole, EmployeeId, UserId},
};
use hrflow_infra::{DirectoryService, InfraError};
use hrflow_shared::event_log::error;

/// ディレクトリ参照のリトライ設定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverConfig {
    /// 1 回の参照あたりの最大試行回数（1 以上）
    pub max_attempts:  u32,
    /// リトライ間隔の基準値。n 回目の失敗後に `retry_backoff * n` 待つ
    pub retry_backoff: Duration,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            max_attempts:  3,
            retry_backoff: Duration::from_millis(50),
        }
    }
}

/// 承認者リゾルバ
#[derive(Clone)]
pub struct ApproverResolver {
    directory: Arc<dyn DirectoryService>,
    config:    ResolverConfig,
}

impl ApproverResolver {
    pub fn new(directory: Arc<dyn DirectoryService>, config: ResolverConfig) -> Self {
        Self { directory, config }
    }

    /// ステップの承認者を解決する
    pub async fn resolve(
        &self,
        employee_id: &EmployeeId,
        step: &StepConfig,
        definition: &WorkflowDefinition,
    ) -> Resolution {
        match step.approver {
            ApproverRole::Manager => {
                if let Some(manager_user) = self.manager_user_of(employee_id).await {
                    return Resolution::resolved(ApproverRole::Manager, manager_user);
                }
                match step.fallback {
                    Some(ApproverFallback::Hr) => {
                        tracing::debug!(step = %step.step, "上長を解決できないため人事にフォールバック");
                        self.resolve_hr(definition).await
                    }
                    None => Resolution::Unresolvable,
                }
            }
            ApproverRole::Hr => self.resolve_hr(definition).await,
            ApproverRole::SpecificUser => match &step.specific_user_id {
                Some(user_id) => Resolution::resolved(ApproverRole::SpecificUser, user_id.clone()),
                None => Resolution::Unresolvable,
            },
        }
    }

    /// 従業員に紐づくユーザーを取得する
    pub async fn user_of(&self, employee_id: &EmployeeId) -> Option<UserId> {
        self.lookup("user_id_for_employee", || {
            self.directory.user_id_for_employee(employee_id)
        })
        .await
    }

    async fn manager_user_of(&self, employee_id: &EmployeeId) -> Option<UserId> {
        let manager = self
            .lookup("manager_id_for_employee", || {
                self.directory.manager_id_for_employee(employee_id)
            })
            .await?;
        self.user_of(&manager).await
    }

    async fn resolve_hr(&self, definition: &WorkflowDefinition) -> Resolution {
        if let Some(user_id) = definition.default_hr_approver_id() {
            return Resolution::resolved(ApproverRole::Hr, user_id.clone());
        }
        match self
            .lookup("find_holder_of_role", || {
                self.directory.find_holder_of_role(&DirectoryRole::HR_OR_ADMIN)
            })
            .await
        {
            Some(user_id) => Resolution::resolved(ApproverRole::Hr, user_id),
            None => Resolution::Unresolvable,
        }
    }

    /// ディレクトリ参照をリトライ付きで実行する
    ///
    /// 全試行が失敗した場合は `None`（見つからない）を返す。
    async fn lookup<T, F, Fut>(&self, operation: &'static str, mut call: F) -> Option<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Option<T>, InfraError>>,
    {
        let max_attempts = self.config.max_attempts.max(1);
        for attempt in 1..=max_attempts {
            match call().await {
                Ok(found) => return found,
                Err(e) if attempt < max_attempts => {
                    tracing::debug!(operation, attempt, error = %e, "ディレクトリ参照をリトライ");
                    tokio::time::sleep(self.config.retry_backoff * attempt).await;
                }
                Err(e) => {
                    tracing::warn!(
                        error.category = error::category::EXTERNAL_SERVICE,
                        error.kind = error::kind::DIRECTORY_LOOKUP,
                        operation,
                        attempts = max_attempts,
                        error = %e,
                        "ディレクトリ参照に失敗したため未解決として扱う"
                    );
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use hrflow_domain::{
        approval::{NewWorkflowDefinition, ResolvedApprover},
        request::RequestType,
    };
    use hrflow_infra::mock::MockDirectoryService;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::usecase::approval::test_helpers::step;

    fn definition(steps: Vec<StepConfig>, default_hr: Option<UserId>) -> WorkflowDefinition {
        WorkflowDefinition::new(NewWorkflowDefinition {
            request_type: RequestType::TimeOff,
            is_active: true,
            steps,
            default_hr_approver_id: default_hr,
        })
        .unwrap()
    }

    fn resolver(directory: &MockDirectoryService) -> ApproverResolver {
        ApproverResolver::new(
            Arc::new(directory.clone()),
            ResolverConfig {
                max_attempts:  3,
                retry_backoff: Duration::ZERO,
            },
        )
    }

    /// 申請者と、ユーザー付きの上長を登録する
    fn with_manager(directory: &MockDirectoryService) -> (EmployeeId, UserId) {
        let employee = EmployeeId::new();
        let manager = EmployeeId::new();
        let manager_user = UserId::new();
        directory.add_employee(manager.clone(), Some(manager_user.clone()), None);
        directory.add_employee(employee.clone(), Some(UserId::new()), Some(manager));
        (employee, manager_user)
    }

    fn resolved(role: ApproverRole, user: UserId) -> Resolution {
        Resolution::Resolved(ResolvedApprover {
            approver_type:    role,
            approver_user_id: user,
        })
    }

    #[tokio::test]
    async fn test_上長ステップは上長のユーザーに解決される() {
        let directory = MockDirectoryService::new();
        let (employee, manager_user) = with_manager(&directory);
        let config = StepConfig::role(step(1), ApproverRole::Manager, None);
        let def = definition(vec![config.clone()], None);

        let result = resolver(&directory).resolve(&employee, &config, &def).await;

        assert_eq!(result, resolved(ApproverRole::Manager, manager_user));
    }

    #[tokio::test]
    async fn test_上長がいない場合フォールバックなしは解決不可() {
        let directory = MockDirectoryService::new();
        let employee = EmployeeId::new();
        directory.add_employee(employee.clone(), Some(UserId::new()), None);
        let config = StepConfig::role(step(1), ApproverRole::Manager, None);
        let def = definition(vec![config.clone()], None);

        let result = resolver(&directory).resolve(&employee, &config, &def).await;

        assert_eq!(result, Resolution::Unresolvable);
    }

    #[tokio::test]
    async fn test_上長にユーザーがない場合は人事にフォールバックし種別はhrになる() {
        let directory = MockDirectoryService::new();
        let employee = EmployeeId::new();
        let manager = EmployeeId::new();
        directory.add_employee(manager.clone(), None, None);
        directory.add_employee(employee.clone(), None, Some(manager));
        let hr_user = UserId::new();
        directory.grant_role(hr_user.clone(), DirectoryRole::Hr);
        let config = StepConfig::role(step(1), ApproverRole::Manager, Some(ApproverFallback::Hr));
        let def = definition(vec![config.clone()], None);

        let result = resolver(&directory).resolve(&employee, &config, &def).await;

        assert_eq!(result, resolved(ApproverRole::Hr, hr_user));
    }

    #[tokio::test]
    async fn test_人事ステップは既定の人事承認者を優先する() {
        let directory = MockDirectoryService::new();
        directory.grant_role(UserId::new(), DirectoryRole::Hr);
        let default_hr = UserId::new();
        let config = StepConfig::role(step(1), ApproverRole::Hr, None);
        let def = definition(vec![config.clone()], Some(default_hr.clone()));

        let result = resolver(&directory)
            .resolve(&EmployeeId::new(), &config, &def)
            .await;

        assert_eq!(result, resolved(ApproverRole::Hr, default_hr));
        assert_eq!(directory.lookup_count(), 0);
    }

    #[tokio::test]
    async fn test_人事ロールがいなければ管理者ロールを使う() {
        let directory = MockDirectoryService::new();
        let admin = UserId::new();
        directory.grant_role(admin.clone(), DirectoryRole::Admin);
        let config = StepConfig::role(step(1), ApproverRole::Hr, None);
        let def = definition(vec![config.clone()], None);

        let result = resolver(&directory)
            .resolve(&EmployeeId::new(), &config, &def)
            .await;

        assert_eq!(result, resolved(ApproverRole::Hr, admin));
    }

    #[tokio::test]
    async fn test_ロール保持者がいなければ人事ステップは解決不可() {
        let directory = MockDirectoryService::new();
        let config = StepConfig::role(step(1), ApproverRole::Hr, None);
        let def = definition(vec![config.clone()], None);

        let result = resolver(&directory)
            .resolve(&EmployeeId::new(), &config, &def)
            .await;

        assert_eq!(result, Resolution::Unresolvable);
    }

    #[tokio::test]
    async fn test_特定ユーザーステップは設定値をそのまま使う() {
        let directory = MockDirectoryService::new();
        let user = UserId::new();
        let config = StepConfig::specific_user(step(1), user.clone());
        let def = definition(vec![config.clone()], None);

        let result = resolver(&directory)
            .resolve(&EmployeeId::new(), &config, &def)
            .await;

        assert_eq!(result, resolved(ApproverRole::SpecificUser, user));
        assert_eq!(directory.lookup_count(), 0);
    }

    #[tokio::test]
    async fn test_一時的な参照エラーはリトライで回復する() {
        let directory = MockDirectoryService::new();
        let (employee, manager_user) = with_manager(&directory);
        directory.fail_next(2);
        let config = StepConfig::role(step(1), ApproverRole::Manager, None);
        let def = definition(vec![config.clone()], None);

        let result = resolver(&directory).resolve(&employee, &config, &def).await;

        assert_eq!(result, resolved(ApproverRole::Manager, manager_user));
        // manager_id の参照 3 回（2 回失敗）+ user_id の参照 1 回
        assert_eq!(directory.lookup_count(), 4);
    }

    #[tokio::test]
    async fn test_参照エラーが続く場合は解決不可として扱う() {
        let directory = MockDirectoryService::new();
        let (employee, _) = with_manager(&directory);
        directory.fail_next(10);
        let config = StepConfig::role(step(1), ApproverRole::Manager, None);
        let def = definition(vec![config.clone()], None);

        let result = resolver(&directory).resolve(&employee, &config, &def).await;

        assert_eq!(result, Resolution::Unresolvable);
        assert_eq!(directory.lookup_count(), 3);
    }
}
