//! # 勤怠修正ユースケース
//!
//! 上長 → 人事の固定 2 段階で勤怠修正申請を判断する。
//! ワークフロー定義を使わず、段階は [`CorrectionStatus`](hrflow_domain::correction::CorrectionStatus) そのもので表す。
//!
//! ```text
//! pending_manager ──上長承認──→ pending_hr ──人事承認──→ approved（勤怠記録に反映）
//!        │                          │
//!        └──上長却下──→ rejected ←──┘ 人事却下
//! ```

use std::sync::Arc;

use hrflow_domain::{
    clock::Clock,
    correction::{AttendanceCorrection, CorrectionId},
    notification::Notification,
    user::UserId,
};
use hrflow_infra::{db::TransactionManager, repository::CorrectionRepository};
use hrflow_shared::{event_log::event, log_business_event};

use crate::{
    error::CoreError,
    usecase::{
        helpers::{FindResultExt, begin_tx, commit_tx},
        notification::NotificationDispatcher,
    },
};

/// 上長・人事の判断の入力
#[derive(Debug, Clone)]
pub struct CorrectionDecisionInput {
    pub decider:  UserId,
    pub approved: bool,
    pub notes:    Option<String>,
}

/// 勤怠修正ユースケースの依存コンポーネント
pub struct CorrectionUseCaseDeps {
    pub correction_repo: Arc<dyn CorrectionRepository>,
    pub tx_manager:      Arc<dyn TransactionManager>,
    pub clock:           Arc<dyn Clock>,
    pub notifier:        NotificationDispatcher,
}

/// 判断する段階
#[derive(Debug, Clone, Copy)]
enum Stage {
    Manager,
    Hr,
}

/// 勤怠修正ユースケース実装
pub struct CorrectionUseCaseImpl {
    deps: CorrectionUseCaseDeps,
}

impl CorrectionUseCaseImpl {
    pub fn new(deps: CorrectionUseCaseDeps) -> Self {
        Self { deps }
    }

    /// 上長の判断を記録する
    ///
    /// 承認なら人事の判断待ちへ進み、却下なら終端となる。
    pub async fn manager_decide(
        &self,
        id: CorrectionId,
        input: CorrectionDecisionInput,
    ) -> Result<AttendanceCorrection, CoreError> {
        self.decide(id, input, Stage::Manager).await
    }

    /// 人事の判断を記録する
    ///
    /// 承認なら修正後の出退勤時刻を同じトランザクションで勤怠記録に反映する。
    pub async fn hr_decide(
        &self,
        id: CorrectionId,
        input: CorrectionDecisionInput,
    ) -> Result<AttendanceCorrection, CoreError> {
        self.decide(id, input, Stage::Hr).await
    }

    /// 段階ごとの判断の共通フロー
    ///
    /// 1. 申請を取得（なければ `NotFound`）
    /// 2. ドメインの遷移を適用（段階が違えば `Conflict`）
    /// 3. 読み取ったステータスを条件に書き込み（0 行なら `Conflict`）
    /// 4. 人事承認なら勤怠記録に反映
    /// 5. コミット後に申請者へ通知
    async fn decide(
        &self,
        id: CorrectionId,
        input: CorrectionDecisionInput,
        stage: Stage,
    ) -> Result<AttendanceCorrection, CoreError> {
        let correction = self
            .deps
            .correction_repo
            .find_by_id(&id)
            .await
            .or_not_found("勤怠修正申請")?;

        let now = self.deps.clock.now();
        let expected = correction.status();
        let decided = match stage {
            Stage::Manager => {
                correction.manager_decide(input.decider.clone(), input.approved, input.notes, now)?
            }
            Stage::Hr => {
                correction.hr_decide(input.decider.clone(), input.approved, input.notes, now)?
            }
        };

        let mut tx = begin_tx(self.deps.tx_manager.as_ref()).await?;
        self.deps
            .correction_repo
            .update_decision(&mut tx, &decided, expected)
            .await?;
        if let Some(times) = decided.corrected_times() {
            self.deps
                .correction_repo
                .apply_to_attendance(&mut tx, &times)
                .await?;
        }
        commit_tx(tx).await?;

        let action = match stage {
            Stage::Manager => event::action::CORRECTION_MANAGER_DECIDED,
            Stage::Hr => event::action::CORRECTION_HR_DECIDED,
        };
        log_business_event!(
            event.category = event::category::CORRECTION,
            event.action = action,
            event.entity_type = event::entity_type::ATTENDANCE_CORRECTION,
            event.entity_id = %decided.id(),
            event.actor_id = %input.decider,
            event.result = event::result::SUCCESS,
            status = %decided.status(),
            "勤怠修正申請の判断"
        );

        self.deps
            .notifier
            .dispatch(Notification::CorrectionStageReached {
                correction_id: decided.id().clone(),
                employee_id:   decided.employee_id().clone(),
                status:        decided.status(),
            });

        Ok(decided)
    }
}
