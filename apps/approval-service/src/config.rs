//! # Approval Service 設定
//!
//! 環境変数からサーバー設定を読み込む。

use std::{env, time::Duration};

use thiserror::Error;

use crate::usecase::ResolverConfig;

/// 設定読み込みエラー
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// 必須の環境変数が未設定
    #[error("環境変数 {0} が設定されていません")]
    Missing(&'static str),

    /// 値を解釈できない
    #[error("環境変数 {name} の値が不正です: {value}")]
    Invalid { name: &'static str, value: String },
}

/// Approval Service サーバーの設定
#[derive(Debug, Clone)]
pub struct ApprovalServiceConfig {
    /// バインドアドレス
    pub host:         String,
    /// ポート番号
    pub port:         u16,
    /// データベース接続 URL
    pub database_url: String,
    /// 承認者解決時のディレクトリ参照リトライ設定
    pub resolver:     ResolverConfig,
}

impl ApprovalServiceConfig {
    /// 環境変数から設定を読み込む
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = ResolverConfig::default();

        let host = lookup("APPROVAL_HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = parse_required(&lookup, "APPROVAL_PORT")?;
        let database_url = lookup("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;
        let max_attempts =
            parse_optional(&lookup, "DIRECTORY_MAX_ATTEMPTS")?.unwrap_or(defaults.max_attempts);
        let retry_backoff = parse_optional(&lookup, "DIRECTORY_RETRY_BACKOFF_MS")?
            .map_or(defaults.retry_backoff, Duration::from_millis);

        if max_attempts == 0 {
            return Err(ConfigError::Invalid {
                name:  "DIRECTORY_MAX_ATTEMPTS",
                value: max_attempts.to_string(),
            });
        }

        Ok(Self {
            host,
            port,
            database_url,
            resolver: ResolverConfig {
                max_attempts,
                retry_backoff,
            },
        })
    }
}

fn parse_required<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<T, ConfigError> {
    parse_optional(lookup, name)?.ok_or(ConfigError::Missing(name))
}

fn parse_optional<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<Option<T>, ConfigError> {
    lookup(name)
        .map(|value| {
            value
                .parse::<T>()
                .map_err(|_| ConfigError::Invalid { name, value })
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use pretty_assertions::assert_eq;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<ApprovalServiceConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ApprovalServiceConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_必須項目のみでデフォルト値が使われる() {
        let config = load(&[
            ("APPROVAL_PORT", "3100"),
            ("DATABASE_URL", "postgres://localhost/hrflow"),
        ])
        .unwrap();

        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3100);
        assert_eq!(config.database_url, "postgres://localhost/hrflow");
        assert_eq!(config.resolver.max_attempts, 3);
        assert_eq!(config.resolver.retry_backoff, Duration::from_millis(50));
    }

    #[test]
    fn test_リトライ設定を上書きできる() {
        let config = load(&[
            ("APPROVAL_HOST", "127.0.0.1"),
            ("APPROVAL_PORT", "3100"),
            ("DATABASE_URL", "postgres://localhost/hrflow"),
            ("DIRECTORY_MAX_ATTEMPTS", "5"),
            ("DIRECTORY_RETRY_BACKOFF_MS", "10"),
        ])
        .unwrap();

        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.resolver.max_attempts, 5);
        assert_eq!(config.resolver.retry_backoff, Duration::from_millis(10));
    }

    #[test]
    fn test_ポート未設定はエラー() {
        let result = load(&[("DATABASE_URL", "postgres://localhost/hrflow")]);

        assert_eq!(result.unwrap_err(), ConfigError::Missing("APPROVAL_PORT"));
    }

    #[test]
    fn test_数値でないポートはエラー() {
        let result = load(&[
            ("APPROVAL_PORT", "http"),
            ("DATABASE_URL", "postgres://localhost/hrflow"),
        ]);

        assert_eq!(
            result.unwrap_err(),
            ConfigError::Invalid {
                name:  "APPROVAL_PORT",
                value: "http".to_string(),
            }
        );
    }

    #[test]
    fn test_リトライ回数0はエラー() {
        let result = load(&[
            ("APPROVAL_PORT", "3100"),
            ("DATABASE_URL", "postgres://localhost/hrflow"),
            ("DIRECTORY_MAX_ATTEMPTS", "0"),
        ]);

        assert!(matches!(
            result,
            Err(ConfigError::Invalid {
                name: "DIRECTORY_MAX_ATTEMPTS",
                ..
            })
        ));
    }
}
