//! # テスト用モック
//!
//! ユースケーステストで使用するインメモリ実装。
//! `test-utils` feature を有効にすることで、他クレートからも利用可能。
//!
//! ```toml
//! [dev-dependencies]
//! hrflow-infra = { workspace = true, features = ["test-utils"] }
//! ```
//!
//! 読み取りメソッドはスナップショットを取った後に一度 `yield_now` する。
//! `tokio::join!` で並行実行した操作同士の読み取りが交互に行われるため、
//! 条件付き更新による競合検出をテストで再現できる。
//!
//! 書き込みは即座に反映され、トランザクションのロールバックは再現しない。

use std::{
    collections::HashMap,
    sync::{
        Arc,
        Mutex,
        atomic::{AtomicU32, Ordering},
    },
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hrflow_domain::{
    approval::{ApprovalStep, ApprovalStepStatus, WorkflowDefinition},
    correction::{AttendanceCorrection, CorrectedTimes, CorrectionId, CorrectionStatus},
    notification::{Notification, NotificationError},
    request::{RequestRef, RequestStatusUpdate, RequestType},
    user::{DirectoryRole, EmployeeId, UserId},
};

use crate::{
    db::{TransactionManager, TxContext},
    directory::DirectoryService,
    error::InfraError,
    notification::NotificationSender,
    repository::{
        ApprovalStepRepository,
        CorrectionRepository,
        RequestStatusRepository,
        WorkflowDefinitionRepository,
    },
};

// ===== MockTransactionManager =====

#[derive(Clone, Default)]
pub struct MockTransactionManager;

#[async_trait]
impl TransactionManager for MockTransactionManager {
    async fn begin(&self) -> Result<TxContext, InfraError> {
        Ok(TxContext::mock())
    }
}

// ===== MockWorkflowDefinitionRepository =====

#[derive(Clone, Default)]
pub struct MockWorkflowDefinitionRepository {
    definitions: Arc<Mutex<Vec<WorkflowDefinition>>>,
    invalid:     Arc<Mutex<HashMap<RequestType, String>>>,
}

impl MockWorkflowDefinitionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_definition(&self, definition: WorkflowDefinition) {
        self.definitions.lock().unwrap().push(definition);
    }

    /// 指定した申請種別の定義を「保存済みだが不正」として扱う
    pub fn mark_invalid(&self, request_type: RequestType, reason: impl Into<String>) {
        self.invalid
            .lock()
            .unwrap()
            .insert(request_type, reason.into());
    }
}

#[async_trait]
impl WorkflowDefinitionRepository for MockWorkflowDefinitionRepository {
    async fn find_by_request_type(
        &self,
        request_type: RequestType,
    ) -> Result<Option<WorkflowDefinition>, InfraError> {
        if let Some(reason) = self.invalid.lock().unwrap().get(&request_type) {
            return Err(InfraError::invalid_definition(reason.clone()));
        }
        Ok(self
            .definitions
            .lock()
            .unwrap()
            .iter()
            .find(|d| d.request_type() == request_type)
            .cloned())
    }
}

// ===== MockApprovalStepRepository =====

#[derive(Clone, Default)]
pub struct MockApprovalStepRepository {
    steps: Arc<Mutex<Vec<ApprovalStep>>>,
}

impl MockApprovalStepRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// 申請のステップをステップ番号順に取得する（検証用）
    pub fn steps_of(&self, request: &RequestRef) -> Vec<ApprovalStep> {
        let mut steps: Vec<_> = self
            .steps
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.request() == request)
            .cloned()
            .collect();
        steps.sort_by_key(ApprovalStep::step_number);
        steps
    }
}

#[async_trait]
impl ApprovalStepRepository for MockApprovalStepRepository {
    async fn insert_all(
        &self,
        _tx: &mut TxContext,
        steps: &[ApprovalStep],
    ) -> Result<(), InfraError> {
        let mut stored = self.steps.lock().unwrap();
        for step in steps {
            if stored
                .iter()
                .any(|s| s.request() == step.request() && s.step_number() == step.step_number())
            {
                return Err(InfraError::unexpected(format!(
                    "ステップが重複しています: {}#{}",
                    step.request(),
                    step.step_number()
                )));
            }
        }
        stored.extend(steps.iter().cloned());
        Ok(())
    }

    async fn find_by_request(&self, request: &RequestRef) -> Result<Vec<ApprovalStep>, InfraError> {
        let snapshot = self.steps_of(request);
        tokio::task::yield_now().await;
        Ok(snapshot)
    }

    async fn transition(
        &self,
        _tx: &mut TxContext,
        step: &ApprovalStep,
        expected: ApprovalStepStatus,
    ) -> Result<(), InfraError> {
        let mut stored = self.steps.lock().unwrap();
        let conflict = || {
            InfraError::conflict(
                "ApprovalStep",
                format!("{}#{}", step.request(), step.step_number()),
            )
        };

        // 部分ユニークインデックス（pending は 1 申請に 1 つ）と同じ制約
        if step.status() == ApprovalStepStatus::Pending
            && stored.iter().any(|s| {
                s.request() == step.request()
                    && s.step_number() != step.step_number()
                    && s.status() == ApprovalStepStatus::Pending
            })
        {
            return Err(InfraError::unexpected("pending のステップが重複します"));
        }

        let target = stored
            .iter_mut()
            .find(|s| {
                s.request() == step.request()
                    && s.step_number() == step.step_number()
                    && s.status() == expected
            })
            .ok_or_else(conflict)?;
        *target = step.clone();
        Ok(())
    }

    async fn cancel_queued(
        &self,
        _tx: &mut TxContext,
        request: &RequestRef,
        now: DateTime<Utc>,
    ) -> Result<u64, InfraError> {
        let mut stored = self.steps.lock().unwrap();
        let mut count = 0;
        for step in stored.iter_mut() {
            if step.request() == request && step.status() == ApprovalStepStatus::Queued {
                *step = step
                    .clone()
                    .cancel(now)
                    .map_err(|e| InfraError::unexpected(e.to_string()))?;
                count += 1;
            }
        }
        Ok(count)
    }
}

// ===== MockRequestStatusRepository =====

/// モック上の申請行
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockRequestRow {
    pub status:           String,
    pub approved_by:      Option<UserId>,
    pub approved_at:      Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
}

#[derive(Clone, Default)]
pub struct MockRequestStatusRepository {
    rows:    Arc<Mutex<HashMap<RequestRef, MockRequestRow>>>,
    updates: Arc<Mutex<Vec<(RequestRef, RequestStatusUpdate)>>>,
}

impl MockRequestStatusRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// 申請を初期ステータスで登録する
    pub fn add_request(&self, request: RequestRef, status: &str) {
        self.rows.lock().unwrap().insert(
            request,
            MockRequestRow {
                status:           status.to_string(),
                approved_by:      None,
                approved_at:      None,
                rejection_reason: None,
            },
        );
    }

    pub fn row_of(&self, request: &RequestRef) -> Option<MockRequestRow> {
        self.rows.lock().unwrap().get(request).cloned()
    }

    pub fn status_of(&self, request: &RequestRef) -> Option<String> {
        self.row_of(request).map(|r| r.status)
    }

    /// 書き込まれた更新の履歴
    pub fn updates_of(&self, request: &RequestRef) -> Vec<RequestStatusUpdate> {
        self.updates
            .lock()
            .unwrap()
            .iter()
            .filter(|(r, _)| r == request)
            .map(|(_, u)| u.clone())
            .collect()
    }
}

#[async_trait]
impl RequestStatusRepository for MockRequestStatusRepository {
    async fn apply(
        &self,
        _tx: &mut TxContext,
        request: &RequestRef,
        update: &RequestStatusUpdate,
    ) -> Result<bool, InfraError> {
        let mut rows = self.rows.lock().unwrap();
        let Some(row) = rows.get_mut(request) else {
            return Ok(false);
        };
        row.status = update.status.to_string();
        if update.approved_by.is_some() {
            row.approved_by.clone_from(&update.approved_by);
        }
        if update.approved_at.is_some() {
            row.approved_at = update.approved_at;
        }
        if update.rejection_reason.is_some() {
            row.rejection_reason.clone_from(&update.rejection_reason);
        }
        self.updates
            .lock()
            .unwrap()
            .push((request.clone(), update.clone()));
        Ok(true)
    }

    async fn find_status(&self, request: &RequestRef) -> Result<Option<String>, InfraError> {
        Ok(self.status_of(request))
    }
}

// ===== MockCorrectionRepository =====

#[derive(Clone, Default)]
pub struct MockCorrectionRepository {
    corrections: Arc<Mutex<Vec<AttendanceCorrection>>>,
    applied:     Arc<Mutex<Vec<CorrectedTimes>>>,
}

impl MockCorrectionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_correction(&self, correction: AttendanceCorrection) {
        self.corrections.lock().unwrap().push(correction);
    }

    pub fn get(&self, id: &CorrectionId) -> Option<AttendanceCorrection> {
        self.corrections
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.id() == id)
            .cloned()
    }

    /// 勤怠記録に反映された修正値の履歴
    pub fn applied(&self) -> Vec<CorrectedTimes> {
        self.applied.lock().unwrap().clone()
    }
}

#[async_trait]
impl CorrectionRepository for MockCorrectionRepository {
    async fn find_by_id(
        &self,
        id: &CorrectionId,
    ) -> Result<Option<AttendanceCorrection>, InfraError> {
        let snapshot = self.get(id);
        tokio::task::yield_now().await;
        Ok(snapshot)
    }

    async fn update_decision(
        &self,
        _tx: &mut TxContext,
        correction: &AttendanceCorrection,
        expected: CorrectionStatus,
    ) -> Result<(), InfraError> {
        let mut stored = self.corrections.lock().unwrap();
        let target = stored
            .iter_mut()
            .find(|c| c.id() == correction.id() && c.status() == expected)
            .ok_or_else(|| {
                InfraError::conflict("AttendanceCorrection", correction.id().to_string())
            })?;
        *target = correction.clone();
        Ok(())
    }

    async fn apply_to_attendance(
        &self,
        _tx: &mut TxContext,
        times: &CorrectedTimes,
    ) -> Result<(), InfraError> {
        self.applied.lock().unwrap().push(times.clone());
        Ok(())
    }
}

// ===== MockDirectoryService =====

#[derive(Clone, Default)]
struct MockEmployee {
    user_id:    Option<UserId>,
    manager_id: Option<EmployeeId>,
}

#[derive(Clone, Default)]
pub struct MockDirectoryService {
    employees:     Arc<Mutex<HashMap<EmployeeId, MockEmployee>>>,
    roles:         Arc<Mutex<Vec<(UserId, DirectoryRole)>>>,
    failures_left: Arc<AtomicU32>,
    lookups:       Arc<AtomicU32>,
}

impl MockDirectoryService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_employee(
        &self,
        employee_id: EmployeeId,
        user_id: Option<UserId>,
        manager_id: Option<EmployeeId>,
    ) {
        self.employees.lock().unwrap().insert(
            employee_id,
            MockEmployee {
                user_id,
                manager_id,
            },
        );
    }

    pub fn grant_role(&self, user_id: UserId, role: DirectoryRole) {
        self.roles.lock().unwrap().push((user_id, role));
    }

    /// 次の `count` 回の参照を失敗させる
    pub fn fail_next(&self, count: u32) {
        self.failures_left.store(count, Ordering::SeqCst);
    }

    /// 参照が呼ばれた回数（失敗を含む）
    pub fn lookup_count(&self) -> u32 {
        self.lookups.load(Ordering::SeqCst)
    }

    fn record_lookup(&self) -> Result<(), InfraError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        let failing = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(InfraError::unexpected("ディレクトリに接続できません"));
        }
        Ok(())
    }

    fn employee(&self, employee_id: &EmployeeId) -> Option<MockEmployee> {
        self.employees.lock().unwrap().get(employee_id).cloned()
    }
}

#[async_trait]
impl DirectoryService for MockDirectoryService {
    async fn user_id_for_employee(
        &self,
        employee_id: &EmployeeId,
    ) -> Result<Option<UserId>, InfraError> {
        self.record_lookup()?;
        Ok(self.employee(employee_id).and_then(|e| e.user_id))
    }

    async fn manager_id_for_employee(
        &self,
        employee_id: &EmployeeId,
    ) -> Result<Option<EmployeeId>, InfraError> {
        self.record_lookup()?;
        Ok(self.employee(employee_id).and_then(|e| e.manager_id))
    }

    async fn find_holder_of_role(
        &self,
        roles: &[DirectoryRole],
    ) -> Result<Option<UserId>, InfraError> {
        self.record_lookup()?;
        let granted = self.roles.lock().unwrap();
        Ok(roles.iter().find_map(|role| {
            granted
                .iter()
                .find(|(_, r)| r == role)
                .map(|(user_id, _)| user_id.clone())
        }))
    }

    async fn has_any_role(
        &self,
        user_id: &UserId,
        roles: &[DirectoryRole],
    ) -> Result<bool, InfraError> {
        self.record_lookup()?;
        Ok(self
            .roles
            .lock()
            .unwrap()
            .iter()
            .any(|(u, r)| u == user_id && roles.contains(r)))
    }
}

// ===== MockNotificationSender =====

#[derive(Clone, Default)]
pub struct MockNotificationSender {
    sent:    Arc<Mutex<Vec<Notification>>>,
    failing: bool,
}

impl MockNotificationSender {
    pub fn new() -> Self {
        Self::default()
    }

    /// 常に送信に失敗する送信者
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotificationSender for MockNotificationSender {
    async fn send(&self, notification: &Notification) -> Result<(), NotificationError> {
        if self.failing {
            return Err(NotificationError::SendFailed(
                "配送先に接続できません".to_string(),
            ));
        }
        self.sent.lock().unwrap().push(notification.clone());
        Ok(())
    }
}
