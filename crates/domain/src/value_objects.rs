//! # 共通値オブジェクト
//!
//! | 型 | ラップ対象 | 用途 |
//! |---|-----------|------|
//! | [`StepNumber`] | `u32` | 承認ステップの位置（1 始まり） |

use serde::{Deserialize, Serialize};

use crate::DomainError;

/// 承認ステップ番号（値オブジェクト）
///
/// ワークフロー定義内のステップの位置を表す。
///
/// # 不変条件
///
/// - 1 以上
///
/// ```rust
/// use hrflow_domain::value_objects::StepNumber;
///
/// let first = StepNumber::first();
/// assert_eq!(first.as_u32(), 1);
/// assert!(StepNumber::new(0).is_err());
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
    derive_more::Display,
)]
#[serde(try_from = "u32", into = "u32")]
#[display("{_0}")]
pub struct StepNumber(u32);

impl StepNumber {
    /// 最初のステップ番号（1）
    pub fn first() -> Self {
        Self(1)
    }

    /// 指定した値からステップ番号を作成する
    ///
    /// # Errors
    ///
    /// - `DomainError::Validation`: 0 を指定した場合
    pub fn new(value: u32) -> Result<Self, DomainError> {
        if value == 0 {
            return Err(DomainError::Validation(
                "ステップ番号は 1 以上である必要があります".to_string(),
            ));
        }
        Ok(Self(value))
    }

    pub fn as_u32(&self) -> u32 {
        self.0
    }

    /// DB 保存用に i32 へ変換する
    pub fn as_i32(&self) -> i32 {
        self.0 as i32
    }
}

impl TryFrom<u32> for StepNumber {
    type Error = DomainError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<StepNumber> for u32 {
    fn from(value: StepNumber) -> Self {
        value.0
    }
}
