//! 承認者によるステップの判断

use hrflow_domain::{
    approval::{ApprovalOutcome, ApprovalStep, ApprovalStepStatus},
    notification::Notification,
    request::{RequestOutcome, RequestRef, RequestStatusUpdate},
    value_objects::StepNumber,
};
use hrflow_shared::{event_log::event, log_business_event};

use super::{ApprovalProgress, ApprovalUseCaseImpl, DecideInput};
use crate::{
    error::CoreError,
    usecase::helpers::{begin_tx, commit_tx},
};

impl ApprovalUseCaseImpl {
    /// 現在の pending ステップを承認または却下する
    ///
    /// ## 処理フロー
    ///
    /// 1. 申請のステップを読み取り、pending のステップを特定
    /// 2. 権限チェック（ステップの承認者のみ判断できる）
    /// 3. 単一トランザクションで以下を書き込む
    ///    - pending → approved / rejected（`status = 'pending'` を条件とした更新）
    ///    - 承認: 次の queued ステップを pending に昇格。なければ申請を承認済みに
    ///    - 却下: 残りの queued ステップを取り消し、申請を却下（コメントを却下理由にする）
    /// 4. コミット後に通知
    ///
    /// ## エラー
    ///
    /// - pending のステップがない場合は `NotFound`
    /// - 指定したステップが判断済みの場合、または並行操作に負けた場合は `Conflict`
    /// - 承認者以外が判断した場合は `Forbidden`
    pub async fn decide(
        &self,
        request: RequestRef,
        input: DecideInput,
    ) -> Result<ApprovalProgress, CoreError> {
        // 1. pending ステップの特定
        let steps = self.deps.step_repo.find_by_request(&request).await?;
        let pending = find_pending(&request, &steps, input.step_number)?;

        // 2. 権限チェック
        if pending.approver_user_id() != &input.actor {
            return Err(CoreError::Forbidden(format!(
                "ステップ {} を判断する権限がありません",
                pending.step_number()
            )));
        }

        let now = self.deps.clock.now();
        let step_number = pending.step_number();
        let decided = pending.clone().decide(
            input.outcome,
            input.actor.clone(),
            input.comment.clone(),
            now,
        )?;

        // 3. 書き込み
        let mut tx = begin_tx(self.deps.tx_manager.as_ref()).await?;
        self.deps
            .step_repo
            .transition(&mut tx, &decided, ApprovalStepStatus::Pending)
            .await?;

        let notification = match input.outcome {
            ApprovalOutcome::Approved => {
                let next = steps
                    .iter()
                    .filter(|s| {
                        s.status() == ApprovalStepStatus::Queued && s.step_number() > step_number
                    })
                    .min_by_key(|s| s.step_number());

                if let Some(next) = next {
                    let activated = next.clone().activate(now)?;
                    self.deps
                        .step_repo
                        .transition(&mut tx, &activated, ApprovalStepStatus::Queued)
                        .await?;
                    Notification::ApprovalRequested {
                        request:     request.clone(),
                        step_number: activated.step_number(),
                        approver:    activated.approver_user_id().clone(),
                    }
                } else {
                    let outcome = RequestOutcome::Approved {
                        approved_by: Some(input.actor.clone()),
                        at:          now,
                    };
                    if let Some(update) =
                        RequestStatusUpdate::for_outcome(request.request_type, outcome)
                    {
                        self.write_status(&mut tx, &request, &update).await?;
                    }
                    Notification::RequestDecided {
                        request: request.clone(),
                        outcome: ApprovalOutcome::Approved,
                    }
                }
            }
            ApprovalOutcome::Rejected => {
                let cancelled = self
                    .deps
                    .step_repo
                    .cancel_queued(&mut tx, &request, now)
                    .await?;
                tracing::debug!(%request, cancelled, "後続ステップを取り消し");

                let outcome = RequestOutcome::Rejected {
                    reason: input.comment.clone(),
                };
                if let Some(update) = RequestStatusUpdate::for_outcome(request.request_type, outcome)
                {
                    self.write_status(&mut tx, &request, &update).await?;
                }
                Notification::RequestDecided {
                    request: request.clone(),
                    outcome: ApprovalOutcome::Rejected,
                }
            }
        };

        commit_tx(tx).await?;

        let action = match input.outcome {
            ApprovalOutcome::Approved => event::action::STEP_APPROVED,
            ApprovalOutcome::Rejected => event::action::STEP_REJECTED,
        };
        log_business_event!(
            event.category = event::category::APPROVAL,
            event.action = action,
            event.entity_type = event::entity_type::APPROVAL_STEP,
            event.entity_id = %decided.id(),
            event.actor_id = %input.actor,
            event.result = event::result::SUCCESS,
            request = %request,
            step_number = step_number.as_u32(),
            "承認ステップ判断"
        );

        // 4. 通知
        self.deps.notifier.dispatch(notification);

        self.steps_for(&request).await
    }
}

/// 判断対象の pending ステップを探す
///
/// ステップ番号が指定され、それが pending でない場合は
/// 既に判断済み（`Conflict`）か存在しない（`NotFound`）のどちらか。
fn find_pending<'a>(
    request: &RequestRef,
    steps: &'a [ApprovalStep],
    step_number: Option<StepNumber>,
) -> Result<&'a ApprovalStep, CoreError> {
    let pending = steps
        .iter()
        .find(|s| s.status() == ApprovalStepStatus::Pending);

    match (pending, step_number) {
        (Some(pending), None) => Ok(pending),
        (Some(pending), Some(n)) if pending.step_number() == n => Ok(pending),
        (_, Some(n)) => match steps.iter().find(|s| s.step_number() == n) {
            Some(step) => Err(CoreError::Conflict(format!(
                "ステップ {} は判断待ちではありません（現在: {}）",
                n,
                step.status()
            ))),
            None => Err(CoreError::NotFound(format!(
                "申請 {} にステップ {} はありません",
                request, n
            ))),
        },
        (None, None) => Err(CoreError::NotFound(format!(
            "申請 {} に判断待ちのステップがありません",
            request
        ))),
    }
}

#[cfg(test)]
mod tests {
    use hrflow_domain::{
        approval::{ApprovalState, StepConfig, verify_sequence},
        request::RequestType,
        user::{EmployeeId, UserId},
    };
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::usecase::approval::test_helpers::{Fixture, Org, step, test_now};

    fn approve(actor: &UserId) -> DecideInput {
        DecideInput {
            actor:       actor.clone(),
            outcome:     ApprovalOutcome::Approved,
            comment:     Some("問題ありません".to_string()),
            step_number: None,
        }
    }

    fn reject(actor: &UserId, reason: &str) -> DecideInput {
        DecideInput {
            actor:       actor.clone(),
            outcome:     ApprovalOutcome::Rejected,
            comment:     Some(reason.to_string()),
            step_number: None,
        }
    }

    fn statuses(steps: &[ApprovalStep]) -> Vec<ApprovalStepStatus> {
        steps.iter().map(ApprovalStep::status).collect()
    }

    /// 上長 → 人事の 2 段階承認を開始済みの申請
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

    /// 3 段階（すべて特定ユーザー）を開始済みの申請
    async fn started_three_steps(fx: &Fixture) -> (Vec<UserId>, RequestRef) {
        let approvers = vec![UserId::new(), UserId::new(), UserId::new()];
        fx.define(
            RequestType::TimeOff,
            true,
            approvers
                .iter()
                .enumerate()
                .map(|(i, u)| StepConfig::specific_user(step(i as u32 + 1), u.clone()))
                .collect(),
        );
        let request = fx.new_request(RequestType::TimeOff, "draft");
        fx.sut()
            .initiate(request.clone(), EmployeeId::new())
            .await
            .unwrap();
        (approvers, request)
    }

    #[tokio::test]
    async fn test_2段階承認の一連の流れ() {
        // Arrange
        let fx = Fixture::new();
        let (org, request) = started(&fx, RequestType::TimeOff, "draft").await;
        let sut = fx.sut();

        // Act: 上長が承認
        let progress = sut
            .decide(request.clone(), approve(&org.manager_user))
            .await
            .unwrap();

        // Assert: step 2 が pending に昇格、申請は申請中のまま
        assert_eq!(
            statuses(&progress.steps),
            vec![ApprovalStepStatus::Approved, ApprovalStepStatus::Pending]
        );
        assert_eq!(progress.state, ApprovalState::AwaitingStep(step(2)));
        assert_eq!(progress.steps[0].acted_by(), Some(&org.manager_user));
        assert_eq!(progress.steps[0].acted_at(), Some(test_now()));
        assert!(verify_sequence(&progress.steps).is_ok());
        assert_eq!(fx.statuses.status_of(&request).as_deref(), Some("pending"));

        // Act: 人事が承認
        let progress = sut
            .decide(request.clone(), approve(&org.hr_user))
            .await
            .unwrap();

        // Assert: 申請は承認済み
        assert_eq!(
            statuses(&progress.steps),
            vec![ApprovalStepStatus::Approved, ApprovalStepStatus::Approved]
        );
        assert_eq!(progress.state, ApprovalState::Approved);
        assert_eq!(fx.statuses.status_of(&request).as_deref(), Some("approved"));
    }

    #[tokio::test]
    async fn test_承認のたびに次の承認者と申請者へ通知する() {
        let fx = Fixture::new();
        let (org, request) = started(&fx, RequestType::TimeOff, "draft").await;
        let sut = fx.sut();

        sut.decide(request.clone(), approve(&org.manager_user))
            .await
            .unwrap();
        sut.decide(request.clone(), approve(&org.hr_user))
            .await
            .unwrap();

        let sent = fx.sent_notifications(3).await;
        assert_eq!(sent.len(), 3);
        assert!(sent.contains(&Notification::ApprovalRequested {
            request:     request.clone(),
            step_number: step(2),
            approver:    org.hr_user.clone(),
        }));
        assert!(sent.contains(&Notification::RequestDecided {
            request,
            outcome: ApprovalOutcome::Approved,
        }));
    }

    #[tokio::test]
    async fn test_出張の最終承認はhr_approvedになる() {
        let fx = Fixture::new();
        let (org, request) = started(&fx, RequestType::BusinessTrip, "draft").await;
        let sut = fx.sut();

        sut.decide(request.clone(), approve(&org.manager_user))
            .await
            .unwrap();
        sut.decide(request.clone(), approve(&org.hr_user))
            .await
            .unwrap();

        assert_eq!(fx.statuses.status_of(&request).as_deref(), Some("hr_approved"));
    }

    #[tokio::test]
    async fn test_ローンの最終承認は最終承認者と日時を記録する() {
        let fx = Fixture::new();
        let (org, request) = started(&fx, RequestType::Loan, "requested").await;
        let sut = fx.sut();

        sut.decide(request.clone(), approve(&org.manager_user))
            .await
            .unwrap();
        assert_eq!(fx.statuses.status_of(&request).as_deref(), Some("requested"));

        sut.decide(request.clone(), approve(&org.hr_user))
            .await
            .unwrap();

        let row = fx.statuses.row_of(&request).unwrap();
        assert_eq!(row.status, "approved");
        assert_eq!(row.approved_by, Some(org.hr_user));
        assert_eq!(row.approved_at, Some(test_now()));
    }

    #[tokio::test]
    async fn test_却下すると後続ステップが取り消され申請が却下される() {
        // Arrange
        let fx = Fixture::new();
        let (approvers, request) = started_three_steps(&fx).await;

        // Act
        let progress = fx
            .sut()
            .decide(request.clone(), reject(&approvers[0], "期間が長すぎます"))
            .await
            .unwrap();

        // Assert
        assert_eq!(
            statuses(&progress.steps),
            vec![
                ApprovalStepStatus::Rejected,
                ApprovalStepStatus::Cancelled,
                ApprovalStepStatus::Cancelled,
            ]
        );
        assert_eq!(progress.state, ApprovalState::Rejected);
        assert!(progress.steps[1..].iter().all(|s| s.acted_by().is_none()));
        let row = fx.statuses.row_of(&request).unwrap();
        assert_eq!(row.status, "rejected");
        assert_eq!(row.rejection_reason.as_deref(), Some("期間が長すぎます"));
        assert!(verify_sequence(&progress.steps).is_ok());
    }

    #[tokio::test]
    async fn test_途中のステップで却下しても承認済みのステップは変わらない() {
        let fx = Fixture::new();
        let (approvers, request) = started_three_steps(&fx).await;
        let sut = fx.sut();
        sut.decide(request.clone(), approve(&approvers[0]))
            .await
            .unwrap();

        let progress = sut
            .decide(request.clone(), reject(&approvers[1], "予算超過"))
            .await
            .unwrap();

        assert_eq!(
            statuses(&progress.steps),
            vec![
                ApprovalStepStatus::Approved,
                ApprovalStepStatus::Rejected,
                ApprovalStepStatus::Cancelled,
            ]
        );
    }

    #[tokio::test]
    async fn test_承認者以外の判断はforbiddenで何も変わらない() {
        let fx = Fixture::new();
        let (org, request) = started(&fx, RequestType::TimeOff, "draft").await;
        let before = fx.steps.steps_of(&request);

        let result = fx
            .sut()
            .decide(request.clone(), approve(&org.hr_user))
            .await;

        assert!(matches!(result, Err(CoreError::Forbidden(_))));
        assert_eq!(fx.steps.steps_of(&request), before);
    }

    #[tokio::test]
    async fn test_判断待ちのステップがなければnotfound() {
        let fx = Fixture::new();
        let request = fx.new_request(RequestType::TimeOff, "pending");

        let result = fx.sut().decide(request, approve(&UserId::new())).await;

        assert!(matches!(result, Err(CoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_判断済みのステップを指定するとconflict() {
        let fx = Fixture::new();
        let (org, request) = started(&fx, RequestType::TimeOff, "draft").await;
        let sut = fx.sut();
        sut.decide(request.clone(), approve(&org.manager_user))
            .await
            .unwrap();

        let result = sut
            .decide(
                request,
                DecideInput {
                    step_number: Some(step(1)),
                    ..approve(&org.manager_user)
                },
            )
            .await;

        assert!(matches!(result, Err(CoreError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_存在しないステップを指定するとnotfound() {
        let fx = Fixture::new();
        let (org, request) = started(&fx, RequestType::TimeOff, "draft").await;

        let result = fx
            .sut()
            .decide(
                request,
                DecideInput {
                    step_number: Some(step(9)),
                    ..approve(&org.manager_user)
                },
            )
            .await;

        assert!(matches!(result, Err(CoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_終端後の再判断はnotfound() {
        let fx = Fixture::new();
        let (approvers, request) = started_three_steps(&fx).await;
        let sut = fx.sut();
        sut.decide(request.clone(), reject(&approvers[0], "不要"))
            .await
            .unwrap();

        let result = sut.decide(request, approve(&approvers[0])).await;

        assert!(matches!(result, Err(CoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_同じステップへの並行判断は一方だけが成功する() {
        // Arrange
        let fx = Fixture::new();
        let (org, request) = started(&fx, RequestType::TimeOff, "draft").await;
        let sut = fx.sut();

        // Act: 承認と却下を同時に実行
        let (approved, rejected) = tokio::join!(
            sut.decide(request.clone(), approve(&org.manager_user)),
            sut.decide(request.clone(), reject(&org.manager_user, "重複"))
        );

        // Assert: ちょうど一方が Conflict
        let steps = fx.steps.steps_of(&request);
        match (approved, rejected) {
            (Ok(_), Err(CoreError::Conflict(_))) => {
                assert_eq!(
                    statuses(&steps),
                    vec![ApprovalStepStatus::Approved, ApprovalStepStatus::Pending]
                );
                assert_eq!(fx.statuses.status_of(&request).as_deref(), Some("pending"));
            }
            (Err(CoreError::Conflict(_)), Ok(_)) => {
                assert_eq!(
                    statuses(&steps),
                    vec![ApprovalStepStatus::Rejected, ApprovalStepStatus::Cancelled]
                );
                assert_eq!(fx.statuses.status_of(&request).as_deref(), Some("rejected"));
            }
            other => panic!("一方だけが成功するはず: {:?}", other),
        }
        assert!(verify_sequence(&steps).is_ok());
    }

    #[tokio::test]
    async fn test_並行する二重承認でも次のステップは一度だけ昇格する() {
        let fx = Fixture::new();
        let (org, request) = started(&fx, RequestType::TimeOff, "draft").await;
        let sut = fx.sut();

        let (first, second) = tokio::join!(
            sut.decide(request.clone(), approve(&org.manager_user)),
            sut.decide(request.clone(), approve(&org.manager_user))
        );

        assert_eq!(
            [first.is_ok(), second.is_ok()]
                .iter()
                .filter(|ok| **ok)
                .count(),
            1
        );
        let steps = fx.steps.steps_of(&request);
        assert_eq!(
            statuses(&steps),
            vec![ApprovalStepStatus::Approved, ApprovalStepStatus::Pending]
        );
        assert_eq!(fx.sent_notifications(2).await.len(), 2);
    }

    #[tokio::test]
    async fn test_通知の送信失敗は判断結果に影響しない() {
        let fx = Fixture::with_failing_sender();
        let (org, request) = started(&fx, RequestType::TimeOff, "draft").await;

        let result = fx
            .sut()
            .decide(request.clone(), approve(&org.manager_user))
            .await;

        assert!(result.is_ok());
        assert!(fx.sent_notifications(1).await.is_empty());
    }
}
