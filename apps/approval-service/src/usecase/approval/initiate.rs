//! 承認フローの開始

use hrflow_domain::{
    approval::{ApprovalOutcome, ApprovalStep, Resolution, ResolvedApprover, WorkflowDefinition},
    notification::Notification,
    request::{RequestOutcome, RequestRef, RequestStatusUpdate, RequestType},
    user::EmployeeId,
    value_objects::StepNumber,
};
use hrflow_infra::db::TxContext;
use hrflow_shared::{event_log::event, log_business_event};

use super::{ApprovalUseCaseImpl, InitiateOutcome};
use crate::{
    error::CoreError,
    usecase::helpers::{begin_tx, commit_tx},
};

impl ApprovalUseCaseImpl {
    /// 申請の承認フローを開始する
    ///
    /// ## 処理フロー
    ///
    /// 1. 既にステップがある申請は開始できない
    /// 2. 申請種別のワークフロー定義を読み込む（未設定・無効・ステップなし → 自動承認）
    /// 3. ステップ番号順に承認者を解決し、解決できないステップはスキップ、直前と同じ承認者のステップはまとめる
    /// 4. 解決できたステップが 0 件 → 自動承認
    /// 5. ステップと申請の「申請中」ステータスを単一トランザクションで書き込む
    /// 6. 先頭ステップの承認者に通知
    ///
    /// ## エラー
    ///
    /// - 既にステップがある場合は `Conflict`
    /// - 保存済みの定義が不正な場合は `Configuration`
    /// - 申請が存在しない場合は `NotFound`
    pub async fn initiate(
        &self,
        request: RequestRef,
        employee_id: EmployeeId,
    ) -> Result<InitiateOutcome, CoreError> {
        // 1. 二重開始の防止
        let existing = self.deps.step_repo.find_by_request(&request).await?;
        if !existing.is_empty() {
            return Err(CoreError::Conflict(format!(
                "申請 {} の承認フローは既に開始されています",
                request
            )));
        }

        // 2. ワークフロー定義
        let definition = self
            .deps
            .definition_repo
            .find_by_request_type(request.request_type)
            .await?;
        let Some(definition) = definition else {
            tracing::info!(%request, "ワークフロー定義が未設定のため自動承認");
            return self.auto_approve(&request, &employee_id).await;
        };
        if !definition.requires_approval() {
            return self.auto_approve(&request, &employee_id).await;
        }

        // 3. 承認者の解決
        let resolved = self.resolve_steps(&request, &employee_id, &definition).await;

        // 4. 全ステップ解決不可
        if resolved.is_empty() {
            tracing::info!(%request, "承認者を 1 人も解決できないため自動承認");
            return self.auto_approve(&request, &employee_id).await;
        }

        // 5. 書き込み
        let now = self.deps.clock.now();
        let steps = ApprovalStep::build_chain(&request, resolved, now);

        let submitted =
            RequestStatusUpdate::for_outcome(request.request_type, RequestOutcome::Submitted);
        // ステータスを書き換えない種別は行の存在だけ確かめる
        if submitted.is_none() {
            self.ensure_request_exists(&request).await?;
        }

        let mut tx = begin_tx(self.deps.tx_manager.as_ref()).await?;
        self.deps.step_repo.insert_all(&mut tx, &steps).await?;
        if let Some(update) = &submitted {
            self.write_status(&mut tx, &request, update).await?;
        }
        commit_tx(tx).await?;

        log_business_event!(
            event.category = event::category::APPROVAL,
            event.action = event::action::APPROVAL_INITIATED,
            event.entity_type = event::entity_type::APPROVAL_REQUEST,
            event.entity_id = %request,
            event.result = event::result::SUCCESS,
            step_count = steps.len(),
            "承認フロー開始"
        );

        // 6. 通知
        if let Some(first) = steps.first() {
            self.deps.notifier.dispatch(Notification::ApprovalRequested {
                request:     request.clone(),
                step_number: first.step_number(),
                approver:    first.approver_user_id().clone(),
            });
        }

        Ok(InitiateOutcome {
            auto_approved: false,
            steps,
        })
    }

    async fn resolve_steps(
        &self,
        request: &RequestRef,
        employee_id: &EmployeeId,
        definition: &WorkflowDefinition,
    ) -> Vec<(StepNumber, ResolvedApprover)> {
        let mut resolved: Vec<(StepNumber, ResolvedApprover)> =
            Vec::with_capacity(definition.steps().len());
        for config in definition.steps() {
            match self.resolver.resolve(employee_id, config, definition).await {
                // 直前のステップと同じ承認者なら 1 つにまとめる（フォールバック先の人事と後続の人事など）
                Resolution::Resolved(approver)
                    if resolved
                        .last()
                        .is_some_and(|(_, prev)| prev.approver_user_id == approver.approver_user_id) =>
                {
                    tracing::info!(
                        %request,
                        step = %config.step,
                        "直前のステップと同じ承認者のためステップをまとめる"
                    );
                }
                Resolution::Resolved(approver) => resolved.push((config.step, approver)),
                Resolution::Unresolvable => {
                    tracing::info!(
                        %request,
                        step = %config.step,
                        approver = %config.approver,
                        "承認者を解決できないためステップをスキップ"
                    );
                }
            }
        }
        resolved
    }

    /// ステップを作らずに申請を承認済みにする
    ///
    /// ローンは承認者として申請者本人のユーザーを記録する（解決できなければ空）。
    async fn auto_approve(
        &self,
        request: &RequestRef,
        employee_id: &EmployeeId,
    ) -> Result<InitiateOutcome, CoreError> {
        let now = self.deps.clock.now();
        let approved_by = match request.request_type {
            RequestType::Loan => self.resolver.user_of(employee_id).await,
            _ => None,
        };
        let outcome = RequestOutcome::Approved {
            approved_by,
            at: now,
        };

        let mut tx = begin_tx(self.deps.tx_manager.as_ref()).await?;
        if let Some(update) = RequestStatusUpdate::for_outcome(request.request_type, outcome) {
            self.write_status(&mut tx, request, &update).await?;
        }
        commit_tx(tx).await?;

        log_business_event!(
            event.category = event::category::APPROVAL,
            event.action = event::action::APPROVAL_AUTO_APPROVED,
            event.entity_type = event::entity_type::APPROVAL_REQUEST,
            event.entity_id = %request,
            event.result = event::result::SUCCESS,
            "承認不要のため自動承認"
        );

        self.deps.notifier.dispatch(Notification::RequestDecided {
            request: request.clone(),
            outcome: ApprovalOutcome::Approved,
        });

        Ok(InitiateOutcome {
            auto_approved: true,
            steps:         Vec::new(),
        })
    }

    /// 申請ステータスを書き込む。対象の行がなければ `NotFound`
    pub(super) async fn write_status(
        &self,
        tx: &mut TxContext,
        request: &RequestRef,
        update: &RequestStatusUpdate,
    ) -> Result<(), CoreError> {
        let applied = self.deps.status_repo.apply(tx, request, update).await?;
        if !applied {
            return Err(CoreError::NotFound(format!("申請 {} が見つかりません", request)));
        }
        Ok(())
    }

    async fn ensure_request_exists(&self, request: &RequestRef) -> Result<(), CoreError> {
        match self.deps.status_repo.find_status(request).await? {
            Some(_) => Ok(()),
            None => Err(CoreError::NotFound(format!("申請 {} が見つかりません", request))),
        }
    }
}
