//! 管理者オーバーライド

use hrflow_domain::{
    approval::{ApprovalOutcome, ApprovalStep, ApprovalStepStatus},
    notification::Notification,
    request::{RequestOutcome, RequestRef, RequestStatusUpdate},
    user::DirectoryRole,
};
use hrflow_shared::{event_log::event, log_business_event};

use super::{AdminDecideInput, ApprovalProgress, ApprovalUseCaseImpl};
use crate::{
    error::CoreError,
    usecase::helpers::{begin_tx, commit_tx},
};

impl ApprovalUseCaseImpl {
    /// HR / 管理者が残りのステップをまとめて判断する
    ///
    /// - 承認: pending と queued のステップをすべて承認済みにする（判断者は管理者）
    /// - 却下: pending は却下、queued は取り消し
    ///
    /// 各ステップの書き込みは読み取ったステータスを条件とし、1 件でも 0 行なら
    /// `Conflict` でトランザクション全体をロールバックする。
    pub async fn admin_decide(
        &self,
        request: RequestRef,
        input: AdminDecideInput,
    ) -> Result<ApprovalProgress, CoreError> {
        // 1. 権限チェック
        let permitted = self
            .deps
            .directory
            .has_any_role(&input.actor, &DirectoryRole::HR_OR_ADMIN)
            .await?;
        if !permitted {
            return Err(CoreError::Forbidden(
                "管理者オーバーライドには HR または管理者ロールが必要です".to_string(),
            ));
        }

        // 2. 未判断のステップ
        let steps = self.deps.step_repo.find_by_request(&request).await?;
        let open: Vec<&ApprovalStep> = steps.iter().filter(|s| !s.status().is_terminal()).collect();
        if open.is_empty() {
            return Err(CoreError::NotFound(format!(
                "申請 {} に判断待ちのステップがありません",
                request
            )));
        }

        // 3. 書き込み
        let now = self.deps.clock.now();
        let mut tx = begin_tx(self.deps.tx_manager.as_ref()).await?;
        for step in open {
            let expected = step.status();
            let overridden = match (input.outcome, expected) {
                (ApprovalOutcome::Approved, _) => {
                    step.clone()
                        .override_approve(input.actor.clone(), input.comment.clone(), now)?
                }
                (ApprovalOutcome::Rejected, ApprovalStepStatus::Pending) => {
                    step.clone()
                        .reject(input.actor.clone(), input.comment.clone(), now)?
                }
                (ApprovalOutcome::Rejected, _) => step.clone().cancel(now)?,
            };
            self.deps
                .step_repo
                .transition(&mut tx, &overridden, expected)
                .await?;
        }

        let outcome = match input.outcome {
            ApprovalOutcome::Approved => RequestOutcome::Approved {
                approved_by: Some(input.actor.clone()),
                at:          now,
            },
            ApprovalOutcome::Rejected => RequestOutcome::Rejected {
                reason: input.comment.clone(),
            },
        };
        if let Some(update) = RequestStatusUpdate::for_outcome(request.request_type, outcome) {
            self.write_status(&mut tx, &request, &update).await?;
        }
        commit_tx(tx).await?;

        log_business_event!(
            event.category = event::category::APPROVAL,
            event.action = event::action::APPROVAL_OVERRIDDEN,
            event.entity_type = event::entity_type::APPROVAL_REQUEST,
            event.entity_id = %request,
            event.actor_id = %input.actor,
            event.result = event::result::SUCCESS,
            outcome = %input.outcome,
            "管理者オーバーライド"
        );

        self.deps.notifier.dispatch(Notification::RequestDecided {
            request: request.clone(),
            outcome: input.outcome,
        });

        self.steps_for(&request).await
    }
}

#[cfg(test)]
mod tests {
    use hrflow_domain::{
        approval::{ApprovalState, verify_sequence},
        request::RequestType,
        user::UserId,
    };
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::usecase::{
        DecideInput,
        approval::test_helpers::{Fixture, Org, test_now},
    };

    fn statuses(steps: &[ApprovalStep]) -> Vec<ApprovalStepStatus> {
        steps.iter().map(ApprovalStep::status).collect()
    }

    async fn started(fx: &Fixture, request_type: RequestType, status: &str) -> (Org, RequestRef) {
        let org = fx.org();
        fx.define_manager_then_hr(request_type);
        let request = fx.new_request(request_type, status);
        fx.sut()
            .initiate(request.clone(), org.employee.clone())
            .await
            .unwrap();
        (org, request)
    }

    fn admin_input(actor: &UserId, outcome: ApprovalOutcome) -> AdminDecideInput {
        AdminDecideInput {
            actor: actor.clone(),
            outcome,
            comment: Some("管理者判断".to_string()),
        }
    }

    #[tokio::test]
    async fn test_オーバーライド承認は残りのステップをすべて承認する() {
        // Arrange
        let fx = Fixture::new();
        let (org, request) = started(&fx, RequestType::TimeOff, "draft").await;

        // Act
        let progress = fx
            .sut()
            .admin_decide(
                request.clone(),
                admin_input(&org.hr_user, ApprovalOutcome::Approved),
            )
            .await
            .unwrap();

        // Assert
        assert_eq!(
            statuses(&progress.steps),
            vec![ApprovalStepStatus::Approved, ApprovalStepStatus::Approved]
        );
        assert!(
            progress
                .steps
                .iter()
                .all(|s| s.acted_by() == Some(&org.hr_user))
        );
        assert_eq!(progress.state, ApprovalState::Approved);
        assert_eq!(fx.statuses.status_of(&request).as_deref(), Some("approved"));
    }

    #[tokio::test]
    async fn test_オーバーライド却下はpendingを却下しqueuedを取り消す() {
        let fx = Fixture::new();
        let (org, request) = started(&fx, RequestType::BusinessTrip, "draft").await;

        let progress = fx
            .sut()
            .admin_decide(
                request.clone(),
                admin_input(&org.hr_user, ApprovalOutcome::Rejected),
            )
            .await
            .unwrap();

        assert_eq!(
            statuses(&progress.steps),
            vec![ApprovalStepStatus::Rejected, ApprovalStepStatus::Cancelled]
        );
        assert!(verify_sequence(&progress.steps).is_ok());
        let row = fx.statuses.row_of(&request).unwrap();
        assert_eq!(row.status, "rejected");
        assert_eq!(row.rejection_reason.as_deref(), Some("管理者判断"));
    }

    #[tokio::test]
    async fn test_ローンのオーバーライド承認は管理者を承認者として記録する() {
        let fx = Fixture::new();
        let (_, request) = started(&fx, RequestType::Loan, "requested").await;
        let admin = UserId::new();
        fx.directory.grant_role(admin.clone(), DirectoryRole::Admin);

        fx.sut()
            .admin_decide(request.clone(), admin_input(&admin, ApprovalOutcome::Approved))
            .await
            .unwrap();

        let row = fx.statuses.row_of(&request).unwrap();
        assert_eq!(row.status, "approved");
        assert_eq!(row.approved_by, Some(admin));
        assert_eq!(row.approved_at, Some(test_now()));
    }

    #[tokio::test]
    async fn test_ロールのないユーザーはforbidden() {
        let fx = Fixture::new();
        let (org, request) = started(&fx, RequestType::TimeOff, "draft").await;
        let before = fx.steps.steps_of(&request);

        let result = fx
            .sut()
            .admin_decide(
                request.clone(),
                admin_input(&org.manager_user, ApprovalOutcome::Approved),
            )
            .await;

        assert!(matches!(result, Err(CoreError::Forbidden(_))));
        assert_eq!(fx.steps.steps_of(&request), before);
    }

    #[tokio::test]
    async fn test_終端済みの申請はnotfound() {
        let fx = Fixture::new();
        let (org, request) = started(&fx, RequestType::TimeOff, "draft").await;
        let sut = fx.sut();
        sut.admin_decide(
            request.clone(),
            admin_input(&org.hr_user, ApprovalOutcome::Rejected),
        )
        .await
        .unwrap();

        let result = sut
            .admin_decide(request, admin_input(&org.hr_user, ApprovalOutcome::Approved))
            .await;

        assert!(matches!(result, Err(CoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_承認者の判断と並行したオーバーライドは一方だけが成功する() {
        let fx = Fixture::new();
        let (org, request) = started(&fx, RequestType::TimeOff, "draft").await;
        let sut = fx.sut();

        let (decided, overridden) = tokio::join!(
            sut.decide(
                request.clone(),
                DecideInput {
                    actor:       org.manager_user.clone(),
                    outcome:     ApprovalOutcome::Approved,
                    comment:     None,
                    step_number: None,
                },
            ),
            sut.admin_decide(
                request.clone(),
                admin_input(&org.hr_user, ApprovalOutcome::Rejected)
            )
        );

        let conflicts = [&decided, &overridden]
            .iter()
            .filter(|r| matches!(r, Err(CoreError::Conflict(_))))
            .count();
        assert_eq!(conflicts, 1);
        assert!(decided.is_ok() || overridden.is_ok());
        assert!(verify_sequence(&fx.steps.steps_of(&request)).is_ok());
    }
}
