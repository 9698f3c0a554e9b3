use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Token metadata stays cached for thirty minutes unless the operator says otherwise.
pub const DEFAULT_TOKEN_CONFIG_TTL_SECS: u64 = 30 * 60;

#[derive(Debug, thiserror::Error)]
pub enum GlobalConfigError {
    #[error("invalid global config field {field}: {reason}")]
    InvalidField {
        field: &'static str,
        reason: String,
    },
}

/// Final, merged process configuration.
///
/// Merge order: CLI > ENV > defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalConfig {
    /// Optional outbound proxy applied to every provider call.
    pub proxy: Option<String>,
    /// Credential store DSN. Without one, stored user credentials live in memory.
    pub dsn: Option<String>,
    pub token_config_ttl_secs: u64,
    /// Whether to redact sensitive fields in emitted events.
    pub event_redact_sensitive: bool,
}

impl GlobalConfig {
    pub fn token_config_ttl(&self) -> Duration {
        Duration::from_secs(self.token_config_ttl_secs)
    }
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            proxy: None,
            dsn: None,
            token_config_ttl_secs: DEFAULT_TOKEN_CONFIG_TTL_SECS,
            event_redact_sensitive: true,
        }
    }
}

/// Optional layer used for merging global config.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GlobalConfigPatch {
    pub proxy: Option<String>,
    pub dsn: Option<String>,
    pub token_config_ttl_secs: Option<u64>,
    pub event_redact_sensitive: Option<bool>,
}

impl GlobalConfigPatch {
    /// Values present in `other` win.
    pub fn overlay(&mut self, other: GlobalConfigPatch) {
        if other.proxy.is_some() {
            self.proxy = other.proxy;
        }
        if other.dsn.is_some() {
            self.dsn = other.dsn;
        }
        if other.token_config_ttl_secs.is_some() {
            self.token_config_ttl_secs = other.token_config_ttl_secs;
        }
        if other.event_redact_sensitive.is_some() {
            self.event_redact_sensitive = other.event_redact_sensitive;
        }
    }

    pub fn into_config(self) -> Result<GlobalConfig, GlobalConfigError> {
        let ttl = self
            .token_config_ttl_secs
            .unwrap_or(DEFAULT_TOKEN_CONFIG_TTL_SECS);
        if ttl == 0 {
            return Err(GlobalConfigError::InvalidField {
                field: "token_config_ttl_secs",
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(GlobalConfig {
            proxy: non_empty(self.proxy),
            dsn: non_empty(self.dsn),
            token_config_ttl_secs: ttl,
            event_redact_sensitive: self.event_redact_sensitive.unwrap_or(true),
        })
    }
}

impl From<GlobalConfig> for GlobalConfigPatch {
    fn from(value: GlobalConfig) -> Self {
        Self {
            proxy: value.proxy,
            dsn: value.dsn,
            token_config_ttl_secs: Some(value.token_config_ttl_secs),
            event_redact_sensitive: Some(value.event_redact_sensitive),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_layer_wins_over_env_layer() {
        let mut merged = GlobalConfigPatch {
            proxy: Some("http://env-proxy:8080".to_string()),
            token_config_ttl_secs: Some(60),
            ..Default::default()
        };
        merged.overlay(GlobalConfigPatch {
            proxy: Some("http://cli-proxy:8080".to_string()),
            ..Default::default()
        });
        let config = merged.into_config().unwrap();
        assert_eq!(config.proxy.as_deref(), Some("http://cli-proxy:8080"));
        assert_eq!(config.token_config_ttl_secs, 60);
        assert!(config.event_redact_sensitive);
    }

    #[test]
    fn blank_values_collapse_to_none() {
        let config = GlobalConfigPatch {
            proxy: Some("   ".to_string()),
            dsn: Some(String::new()),
            ..Default::default()
        }
        .into_config()
        .unwrap();
        assert_eq!(config.proxy, None);
        assert_eq!(config.dsn, None);
        assert_eq!(config.token_config_ttl_secs, DEFAULT_TOKEN_CONFIG_TTL_SECS);
    }

    #[test]
    fn zero_ttl_is_rejected() {
        let err = GlobalConfigPatch {
            token_config_ttl_secs: Some(0),
            ..Default::default()
        }
        .into_config()
        .unwrap_err();
        assert!(err.to_string().contains("token_config_ttl_secs"));
    }

    #[test]
    fn config_round_trips_through_patch() {
        let config = GlobalConfig {
            proxy: Some("socks5h://127.0.0.1:1080".to_string()),
            dsn: Some("sqlite::memory:".to_string()),
            token_config_ttl_secs: 120,
            event_redact_sensitive: false,
        };
        let back = GlobalConfigPatch::from(config.clone()).into_config().unwrap();
        assert_eq!(back, config);
        let json = serde_json::to_value(&back).unwrap();
        assert_eq!(json["token_config_ttl_secs"], 120);
    }
}
