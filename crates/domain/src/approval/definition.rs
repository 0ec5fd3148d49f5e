//! # ワークフロー定義と承認者ロール
//!
//! 申請種別ごとの承認ステップ構成を表現する。
//! 定義は管理者が事前に設定し、エンジンからは読み取り専用。
//!
//! 定義の整合性は [`WorkflowDefinition::new`] で検証する。
//! 不正な定義は読み込み時点で `DomainError::Configuration` になり、
//! 承認処理の途中で発覚することはない。

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use strum::IntoStaticStr;

use crate::{DomainError, request::RequestType, user::UserId, value_objects::StepNumber};

/// 承認者ロール
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, IntoStaticStr, strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ApproverRole {
    /// 申請者の上長
    Manager,
    /// 人事担当者
    Hr,
    /// 定義で指定されたユーザー
    SpecificUser,
}

impl std::str::FromStr for ApproverRole {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "manager" => Ok(Self::Manager),
            "hr" => Ok(Self::Hr),
            "specific_user" => Ok(Self::SpecificUser),
            _ => Err(DomainError::Validation(format!("不正な承認者ロール: {}", s))),
        }
    }
}

/// 上長が解決できない場合のフォールバック先
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApproverFallback {
    Hr,
}

/// ワークフロー定義内の 1 ステップ
///
/// DB には定義の `steps` 列に JSON 配列として格納される。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepConfig {
    pub step:             StepNumber,
    pub approver:         ApproverRole,
    #[serde(default)]
    pub fallback:         Option<ApproverFallback>,
    #[serde(default)]
    pub specific_user_id: Option<UserId>,
}

impl StepConfig {
    /// ロール指定のステップを作成する
    pub fn role(
        step: StepNumber,
        approver: ApproverRole,
        fallback: Option<ApproverFallback>,
    ) -> Self {
        Self {
            step,
            approver,
            fallback,
            specific_user_id: None,
        }
    }

    /// 特定ユーザー指定のステップを作成する
    pub fn specific_user(step: StepNumber, user_id: UserId) -> Self {
        Self {
            step,
            approver: ApproverRole::SpecificUser,
            fallback: None,
            specific_user_id: Some(user_id),
        }
    }

    /// 保存済みの JSON 配列からステップ構成を復元する
    ///
    /// # Errors
    ///
    /// - `DomainError::Configuration`: JSON の形式が不正な場合
    pub fn list_from_json(value: JsonValue) -> Result<Vec<Self>, DomainError> {
        serde_json::from_value(value)
            .map_err(|e| DomainError::Configuration(format!("ステップ構成を解析できません: {}", e)))
    }
}

/// ワークフロー定義
///
/// 申請種別ごとに 1 つ存在する。
///
/// # 不変条件
///
/// - ステップ番号は 1 から始まり、厳密に昇順
/// - `specific_user` ステップは必ずユーザー ID を持つ
/// - フォールバックは `manager` ステップにのみ設定できる
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowDefinition {
    request_type:           RequestType,
    is_active:              bool,
    steps:                  Vec<StepConfig>,
    default_hr_approver_id: Option<UserId>,
}

/// ワークフロー定義の作成パラメータ
pub struct NewWorkflowDefinition {
    pub request_type:           RequestType,
    pub is_active:              bool,
    pub steps:                  Vec<StepConfig>,
    pub default_hr_approver_id: Option<UserId>,
}

impl WorkflowDefinition {
    /// 定義を検証して作成する
    ///
    /// # Errors
    ///
    /// - `DomainError::Configuration`: 不変条件を満たさない場合
    pub fn new(params: NewWorkflowDefinition) -> Result<Self, DomainError> {
        let mut previous: Option<StepNumber> = None;
        for config in &params.steps {
            match previous {
                None if config.step != StepNumber::first() => {
                    return Err(DomainError::Configuration(format!(
                        "{} のステップ番号は 1 から始まる必要があります（先頭: {}）",
                        params.request_type, config.step
                    )));
                }
                Some(prev) if config.step <= prev => {
                    return Err(DomainError::Configuration(format!(
                        "{} のステップ番号が昇順ではありません（{} の後に {}）",
                        params.request_type, prev, config.step
                    )));
                }
                _ => {}
            }
            previous = Some(config.step);

            if config.approver == ApproverRole::SpecificUser && config.specific_user_id.is_none() {
                return Err(DomainError::Configuration(format!(
                    "{} のステップ {} は specific_user ですがユーザー ID が未設定です",
                    params.request_type, config.step
                )));
            }
            if config.fallback.is_some() && config.approver != ApproverRole::Manager {
                return Err(DomainError::Configuration(format!(
                    "{} のステップ {} にフォールバックを設定できるのは manager のみです",
                    params.request_type, config.step
                )));
            }
        }

        Ok(Self {
            request_type:           params.request_type,
            is_active:              params.is_active,
            steps:                  params.steps,
            default_hr_approver_id: params.default_hr_approver_id,
        })
    }

    pub fn request_type(&self) -> RequestType {
        self.request_type
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    /// ステップ番号の昇順に並んだステップ構成
    pub fn steps(&self) -> &[StepConfig] {
        &self.steps
    }

    pub fn default_hr_approver_id(&self) -> Option<&UserId> {
        self.default_hr_approver_id.as_ref()
    }

    /// 承認ステップの生成が必要か
    ///
    /// 無効化されている、またはステップが空の場合は自動承認となる。
    pub fn requires_approval(&self) -> bool {
        self.is_active && !self.steps.is_empty()
    }
}

/// 解決済みの承認者
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedApprover {
    /// フォールバック適用後の実効ロール
    pub approver_type:    ApproverRole,
    pub approver_user_id: UserId,
}

/// 承認者解決の結果
///
/// 解決できないことはエラーではなく、ステップをスキップする通常の結果として扱う。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Resolved(ResolvedApprover),
    Unresolvable,
}

impl Resolution {
    pub fn resolved(approver_type: ApproverRole, approver_user_id: UserId) -> Self {
        Self::Resolved(ResolvedApprover {
            approver_type,
            approver_user_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use serde_json::json;

    use super::*;

    fn step(n: u32) -> StepNumber {
        StepNumber::new(n).unwrap()
    }

    fn definition(steps: Vec<StepConfig>) -> Result<WorkflowDefinition, DomainError> {
        WorkflowDefinition::new(NewWorkflowDefinition {
            request_type: RequestType::Loan,
            is_active: true,
            steps,
            default_hr_approver_id: None,
        })
    }

    #[test]
    fn test_正しい定義は作成できる() {
        let steps = vec![
            StepConfig::role(step(1), ApproverRole::Manager, Some(ApproverFallback::Hr)),
            StepConfig::role(step(2), ApproverRole::Hr, None),
            StepConfig::specific_user(step(4), UserId::new()),
        ];

        let sut = definition(steps.clone()).unwrap();

        assert_eq!(sut.steps(), steps.as_slice());
        assert!(sut.requires_approval());
    }

    #[rstest]
    #[case(vec![2])]
    #[case(vec![1, 1])]
    #[case(vec![1, 3, 2])]
    fn test_ステップ番号が1始まりの昇順でない定義は設定エラー(#[case] numbers: Vec<u32>) {
        let steps = numbers
            .into_iter()
            .map(|n| StepConfig::role(step(n), ApproverRole::Hr, None))
            .collect();

        assert!(matches!(definition(steps), Err(DomainError::Configuration(_))));
    }

    #[test]
    fn test_ユーザーidのないspecific_userステップは設定エラー() {
        let steps = vec![StepConfig {
            step:             step(1),
            approver:         ApproverRole::SpecificUser,
            fallback:         None,
            specific_user_id: None,
        }];

        assert!(matches!(definition(steps), Err(DomainError::Configuration(_))));
    }

    #[test]
    fn test_manager以外のフォールバックは設定エラー() {
        let steps = vec![StepConfig::role(
            step(1),
            ApproverRole::Hr,
            Some(ApproverFallback::Hr),
        )];

        assert!(matches!(definition(steps), Err(DomainError::Configuration(_))));
    }

    #[rstest]
    #[case(true, vec![], false)]
    #[case(false, vec![StepConfig::role(StepNumber::first(), ApproverRole::Hr, None)], false)]
    #[case(true, vec![StepConfig::role(StepNumber::first(), ApproverRole::Hr, None)], true)]
    fn test_承認要否は有効フラグとステップ有無で決まる(
        #[case] is_active: bool,
        #[case] steps: Vec<StepConfig>,
        #[case] expected: bool,
    ) {
        let sut = WorkflowDefinition::new(NewWorkflowDefinition {
            request_type: RequestType::TimeOff,
            is_active,
            steps,
            default_hr_approver_id: None,
        })
        .unwrap();

        assert_eq!(sut.requires_approval(), expected);
    }

    #[test]
    fn test_jsonからステップ構成を復元できる() {
        let user_id = UserId::new();
        let value = json!([
            { "step": 1, "approver": "manager", "fallback": "hr" },
            { "step": 2, "approver": "specific_user", "specific_user_id": user_id.to_string() },
        ]);

        let steps = StepConfig::list_from_json(value).unwrap();

        assert_eq!(
            steps,
            vec![
                StepConfig::role(step(1), ApproverRole::Manager, Some(ApproverFallback::Hr)),
                StepConfig::specific_user(step(2), user_id),
            ]
        );
    }

    #[rstest]
    #[case(json!({ "step": 1 }))]
    #[case(json!([{ "step": 0, "approver": "hr" }]))]
    #[case(json!([{ "step": 1, "approver": "director" }]))]
    fn test_不正なjsonは設定エラー(#[case] value: JsonValue) {
        assert!(matches!(
            StepConfig::list_from_json(value),
            Err(DomainError::Configuration(_))
        ));
    }
}
