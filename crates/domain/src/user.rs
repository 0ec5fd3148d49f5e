//! # ユーザーと従業員
//!
//! ディレクトリサービスが管理する識別子とロールを定義する。
//!
//! - [`EmployeeId`]: 人事上の従業員レコード
//! - [`UserId`]: ログイン可能なユーザー（承認者として割り当てられる単位）
//!
//! 従業員はユーザーに紐づかないこともある（例: アカウント未発行の上長）。
//! その場合、上長は承認者として解決できない。

use serde::{Deserialize, Serialize};
use strum::IntoStaticStr;

use crate::DomainError;

define_uuid_id! {
    /// ユーザー ID
    pub struct UserId;
}

define_uuid_id! {
    /// 従業員 ID
    pub struct EmployeeId;
}

/// ディレクトリ上のロール
///
/// 承認者解決で参照するロールのみを扱う。
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, IntoStaticStr, strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DirectoryRole {
    /// 人事担当者
    Hr,
    /// システム管理者
    Admin,
}

impl DirectoryRole {
    /// HR ステップの承認者・管理者オーバーライドの実行者となれるロール
    pub const HR_OR_ADMIN: [DirectoryRole; 2] = [DirectoryRole::Hr, DirectoryRole::Admin];
}

impl std::str::FromStr for DirectoryRole {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hr" => Ok(Self::Hr),
            "admin" => Ok(Self::Admin),
            _ => Err(DomainError::Validation(format!("不正なロール: {}", s))),
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(DirectoryRole::Hr, "hr")]
    #[case(DirectoryRole::Admin, "admin")]
    fn test_ロールの文字列表現(#[case] role: DirectoryRole, #[case] expected: &str) {
        let s: &str = role.into();
        assert_eq!(s, expected);
        assert_eq!(expected.parse::<DirectoryRole>().unwrap(), role);
    }

    #[test]
    fn test_不明なロールはバリデーションエラー() {
        assert!(matches!(
            "manager".parse::<DirectoryRole>(),
            Err(DomainError::Validation(_))
        ));
    }
}
