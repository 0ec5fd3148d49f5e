//! # Approval Service ライブラリ
//!
//! 承認ワークフローエンジンのユースケースと HTTP ハンドラを公開する。
//! バイナリ（`main.rs`）と統合テストの両方から利用する。

pub mod config;
pub mod error;
pub mod handler;
pub mod usecase;
