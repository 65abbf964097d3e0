//! Configuration types.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;

/// Default backend location when `COACH_API_BASE_URL` is unset.
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000";

/// Coach client configuration.
#[derive(Debug, Clone)]
pub struct CoachConfig {
    /// Base URL of the coaching backend (no trailing slash).
    pub api_base_url: String,
    /// Name sent as `user_name` with the plan-init request.
    pub user_name: String,
    /// Optional device identifier attached to every backend request.
    pub device_id: Option<String>,
    /// Delay between entering chat and asking follow-up question 1.
    pub followup_delay: Duration,
    /// Timeout applied to each backend request.
    pub request_timeout: Duration,
    /// Google Static Maps key. Maps render as a placeholder without it.
    pub maps_api_key: Option<SecretString>,
    /// Directory for rolling log files (stderr only when unset).
    pub log_dir: Option<PathBuf>,
}

impl Default for CoachConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            user_name: "사용자".to_string(),
            device_id: None,
            followup_delay: Duration::from_secs(5),
            request_timeout: Duration::from_secs(30),
            maps_api_key: None,
            log_dir: None,
        }
    }
}

impl CoachConfig {
    /// Build config from environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let non_empty = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let api_base_url = match non_empty("COACH_API_BASE_URL") {
            Some(url) => normalize_base_url(&url)?,
            None => defaults.api_base_url,
        };

        let followup_delay = match non_empty("COACH_FOLLOWUP_DELAY_SECS") {
            Some(raw) => Duration::from_secs(parse_secs("COACH_FOLLOWUP_DELAY_SECS", &raw)?),
            None => defaults.followup_delay,
        };

        let request_timeout = match non_empty("COACH_REQUEST_TIMEOUT_SECS") {
            Some(raw) => {
                let secs = parse_secs("COACH_REQUEST_TIMEOUT_SECS", &raw)?;
                if secs == 0 {
                    return Err(ConfigError::InvalidValue {
                        key: "COACH_REQUEST_TIMEOUT_SECS".into(),
                        message: "must be at least 1 second".into(),
                    });
                }
                Duration::from_secs(secs)
            }
            None => defaults.request_timeout,
        };

        Ok(Self {
            api_base_url,
            user_name: non_empty("COACH_USER_NAME").unwrap_or(defaults.user_name),
            device_id: non_empty("COACH_DEVICE_ID"),
            followup_delay,
            request_timeout,
            maps_api_key: non_empty("GOOGLE_MAPS_API_KEY").map(SecretString::from),
            log_dir: non_empty("COACH_LOG_DIR").map(PathBuf::from),
        })
    }
}

fn normalize_base_url(raw: &str) -> Result<String, ConfigError> {
    let url = reqwest::Url::parse(raw).map_err(|e| ConfigError::InvalidValue {
        key: "COACH_API_BASE_URL".into(),
        message: e.to_string(),
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidValue {
            key: "COACH_API_BASE_URL".into(),
            message: format!("unsupported scheme '{}'", url.scheme()),
        });
    }
    Ok(raw.trim_end_matches('/').to_string())
}

fn parse_secs(key: &str, raw: &str) -> Result<u64, ConfigError> {
    raw.parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        message: format!("'{raw}' is not a whole number of seconds"),
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use secrecy::ExposeSecret;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_nothing_set() {
        let config = CoachConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
        assert_eq!(config.followup_delay, Duration::from_secs(5));
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert!(config.device_id.is_none());
        assert!(config.maps_api_key.is_none());
        assert!(config.log_dir.is_none());
    }

    #[test]
    fn reads_overrides() {
        let config = CoachConfig::from_lookup(lookup(&[
            ("COACH_API_BASE_URL", "https://coach.example.com/"),
            ("COACH_USER_NAME", "Jin"),
            ("COACH_DEVICE_ID", "device-1"),
            ("COACH_FOLLOWUP_DELAY_SECS", "0"),
            ("COACH_REQUEST_TIMEOUT_SECS", "10"),
            ("GOOGLE_MAPS_API_KEY", "maps-key"),
        ]))
        .unwrap();

        assert_eq!(config.api_base_url, "https://coach.example.com");
        assert_eq!(config.user_name, "Jin");
        assert_eq!(config.device_id.as_deref(), Some("device-1"));
        assert_eq!(config.followup_delay, Duration::ZERO);
        assert_eq!(config.request_timeout, Duration::from_secs(10));
        assert_eq!(config.maps_api_key.unwrap().expose_secret(), "maps-key");
    }

    #[test]
    fn blank_values_fall_back_to_defaults() {
        let config =
            CoachConfig::from_lookup(lookup(&[("COACH_DEVICE_ID", "  "), ("COACH_USER_NAME", "")]))
                .unwrap();
        assert!(config.device_id.is_none());
        assert_eq!(config.user_name, "사용자");
    }

    #[test]
    fn rejects_invalid_values() {
        assert!(CoachConfig::from_lookup(lookup(&[("COACH_API_BASE_URL", "not a url")])).is_err());
        assert!(CoachConfig::from_lookup(lookup(&[("COACH_API_BASE_URL", "ftp://host")])).is_err());
        assert!(CoachConfig::from_lookup(lookup(&[("COACH_FOLLOWUP_DELAY_SECS", "soon")])).is_err());
        assert!(CoachConfig::from_lookup(lookup(&[("COACH_REQUEST_TIMEOUT_SECS", "0")])).is_err());
    }
}
