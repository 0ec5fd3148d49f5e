//! # 承認状態
//!
//! 申請の承認状態は保存せず、承認ステップ群から導出する。

use serde::Serialize;

use super::step::{ApprovalStep, ApprovalStepStatus};
use crate::{DomainError, value_objects::StepNumber};

/// 申請の承認状態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "step_number", rename_all = "snake_case")]
pub enum ApprovalState {
    /// 承認ステップなし（自動承認済み）
    NoApproval,
    /// 指定ステップの判断待ち
    AwaitingStep(StepNumber),
    Approved,
    Rejected,
}

impl ApprovalState {
    /// ステップ群から承認状態を導出する
    ///
    /// ステップ群は [`verify_sequence`] の不変条件を満たしている前提。
    pub fn derive(steps: &[ApprovalStep]) -> Self {
        if steps.is_empty() {
            return Self::NoApproval;
        }
        if steps
            .iter()
            .any(|s| s.status() == ApprovalStepStatus::Rejected)
        {
            return Self::Rejected;
        }
        match steps
            .iter()
            .find(|s| s.status() == ApprovalStepStatus::Pending)
        {
            Some(pending) => Self::AwaitingStep(pending.step_number()),
            None => Self::Approved,
        }
    }
}

/// ステップ群が順序の不変条件を満たしているか検証する
///
/// - `pending` は高々 1 つ
/// - `pending` より前のステップはすべて `approved`
/// - `pending` より後のステップはすべて `queued`
/// - `pending` がない場合、`queued` は残っていない
///
/// # Errors
///
/// - `DomainError::Conflict`: 不変条件を満たさない場合
pub fn verify_sequence(steps: &[ApprovalStep]) -> Result<(), DomainError> {
    let mut ordered: Vec<&ApprovalStep> = steps.iter().collect();
    ordered.sort_by_key(|s| s.step_number());

    let broken = |reason: &str| DomainError::Conflict(format!("承認ステップの順序が不正です: {}", reason));

    let pending: Vec<usize> = ordered
        .iter()
        .enumerate()
        .filter(|(_, s)| s.status() == ApprovalStepStatus::Pending)
        .map(|(i, _)| i)
        .collect();

    match pending.as_slice() {
        [] => {
            if ordered
                .iter()
                .any(|s| s.status() == ApprovalStepStatus::Queued)
            {
                return Err(broken("判断待ちがないのに待機中のステップがあります"));
            }
        }
        [index] => {
            let (before, after) = ordered.split_at(*index);
            if before
                .iter()
                .any(|s| s.status() != ApprovalStepStatus::Approved)
            {
                return Err(broken("判断待ちより前に承認済みでないステップがあります"));
            }
            if after[1..]
                .iter()
                .any(|s| s.status() != ApprovalStepStatus::Queued)
            {
                return Err(broken("判断待ちより後に待機中でないステップがあります"));
            }
        }
        _ => return Err(broken("判断待ちのステップが複数あります")),
    }
    Ok(())
}
