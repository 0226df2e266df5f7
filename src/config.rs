use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::errors::{LoanError, Result};
use crate::types::LoanStatus;

/// tracker configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// status given to loans whose terms do not name one
    pub default_status: LoanStatus,
    /// auto-settlement flag used by the entry points that do not take one
    pub auto_settle_past_due: bool,
    pub limits: OriginationLimits,
}

/// optional upper bounds checked on top of the base loan validation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct OriginationLimits {
    pub max_principal: Option<Money>,
    pub max_term_months: Option<u32>,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            default_status: LoanStatus::Active,
            auto_settle_past_due: false,
            limits: OriginationLimits::default(),
        }
    }
}

impl TrackerConfig {
    /// configuration for importing historical loans: past installments count as paid
    pub fn backfill() -> Self {
        Self {
            auto_settle_past_due: true,
            ..Self::default()
        }
    }

    pub fn with_limits(mut self, limits: OriginationLimits) -> Self {
        self.limits = limits;
        self
    }

    /// parse from a JSON document; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| LoanError::InvalidConfiguration {
            message: e.to_string(),
        })
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|e| LoanError::InvalidConfiguration {
            message: format!("cannot read {}: {e}", path.display()),
        })?;
        Self::from_json(&json)
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TrackerConfig::default();
        assert_eq!(config.default_status, LoanStatus::Active);
        assert!(!config.auto_settle_past_due);
        assert_eq!(config.limits, OriginationLimits::default());
        assert!(TrackerConfig::backfill().auto_settle_past_due);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config = TrackerConfig::from_json(
            r#"{ "auto_settle_past_due": true, "limits": { "max_term_months": 120 } }"#,
        )
        .unwrap();
        assert!(config.auto_settle_past_due);
        assert_eq!(config.default_status, LoanStatus::Active);
        assert_eq!(config.limits.max_term_months, Some(120));
        assert_eq!(config.limits.max_principal, None);
    }

    #[test]
    fn test_money_limits_parse_from_strings() {
        let config = TrackerConfig::from_json(
            r#"{ "default_status": "refinanced", "limits": { "max_principal": "250000.00" } }"#,
        )
        .unwrap();
        assert_eq!(config.default_status, LoanStatus::Refinanced);
        assert_eq!(config.limits.max_principal, Some(Money::from_major(250_000)));
    }

    #[test]
    fn test_json_round_trip() {
        let config = TrackerConfig::backfill().with_limits(OriginationLimits {
            max_principal: Some(Money::from_major(75_000)),
            max_term_months: Some(84),
        });
        assert_eq!(TrackerConfig::from_json(&config.to_json()).unwrap(), config);
    }

    #[test]
    fn test_bad_json_is_configuration_error() {
        let err = TrackerConfig::from_json("{ not json").unwrap_err();
        assert!(matches!(err, LoanError::InvalidConfiguration { .. }));
    }

    #[test]
    fn test_missing_file() {
        let err = TrackerConfig::from_json_file("/definitely/not/here.json").unwrap_err();
        assert!(err.to_string().contains("cannot read"));
    }
}
