use std::{env, fmt, time::Duration};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::{errors::ConfigError, model::StatsCategory};

pub const DEFAULT_PERIOD_SECS: u64 = 30;
pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: &str = "2379";
pub const DEFAULT_CONFIG_PATH: &str = "etcdbeat.yml";
pub const CONFIG_PATH_ENV: &str = "ETCDBEAT_CONFIG";

/// Top level shape of the config file. Everything the beat reads lives under `input`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigSettings {
    #[serde(default)]
    pub input: RawConfig,
}

impl ConfigSettings {
    pub fn load_from_file(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_owned(),
            reason: e.to_string(),
        })?;
        Self::from_yaml_str(path, &content)
    }

    pub fn from_yaml_str(path: &str, content: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(content).map_err(|e| ConfigError::Parse {
            path: path.to_owned(),
            reason: e.to_string(),
        })
    }
}

/// Config values as read from the file, before defaults and validation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawConfig {
    pub period: Option<u64>,
    pub port: Option<String>,
    pub host: Option<String>,
    pub timeout_ms: Option<u64>,
    #[serde(default)]
    pub authentication: RawAuthentication,
    #[serde(default)]
    pub statistics: RawStatistics,
}

#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawAuthentication {
    pub enable: Option<bool>,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl fmt::Debug for RawAuthentication {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawAuthentication")
            .field("enable", &self.enable)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .finish()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawStatistics {
    pub leader: Option<bool>,
    #[serde(rename = "self")]
    pub self_node: Option<bool>,
    pub store: Option<bool>,
}

#[derive(Clone, PartialEq, Eq)]
pub struct Authentication {
    pub enable: bool,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl fmt::Debug for Authentication {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Authentication")
            .field("enable", &self.enable)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatisticsToggles {
    pub leader: bool,
    pub self_node: bool,
    pub store: bool,
}

impl StatisticsToggles {
    pub fn is_enabled(&self, category: StatsCategory) -> bool {
        match category {
            StatsCategory::Leader => self.leader,
            StatsCategory::SelfNode => self.self_node,
            StatsCategory::Store => self.store,
        }
    }
}

/// Configuration after defaults are applied and required fields are checked.
/// Built once before the poll loop starts and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConfig {
    pub period: Duration,
    pub host: String,
    pub port: String,
    pub timeout: Option<Duration>,
    pub authentication: Authentication,
    pub statistics: StatisticsToggles,
}

impl ResolvedConfig {
    /// Applies defaults for `period`, `host` and `port` and validates the required toggles.
    /// Every missing required field is reported in a single error.
    pub fn resolve(raw: &RawConfig) -> Result<Self, ConfigError> {
        let period_secs = raw.period.unwrap_or(DEFAULT_PERIOD_SECS);
        if period_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "period".to_owned(),
                reason: "must be greater than zero".to_owned(),
            });
        }

        let mut missing = vec![];
        let mut required = |name: &str, value: Option<bool>| {
            if value.is_none() {
                missing.push(name.to_owned());
            }
            value.unwrap_or_default()
        };

        let auth_enable = required("authentication.enable", raw.authentication.enable);
        let leader = required("statistics.leader", raw.statistics.leader);
        let self_node = required("statistics.self", raw.statistics.self_node);
        let store = required("statistics.store", raw.statistics.store);

        if !missing.is_empty() {
            return Err(ConfigError::MissingFields(missing));
        }

        let config = Self {
            period: Duration::from_secs(period_secs),
            host: raw.host.clone().unwrap_or_else(|| DEFAULT_HOST.to_owned()),
            port: raw.port.clone().unwrap_or_else(|| DEFAULT_PORT.to_owned()),
            timeout: raw.timeout_ms.map(Duration::from_millis),
            authentication: Authentication {
                enable: auth_enable,
                username: raw.authentication.username.clone(),
                password: raw.authentication.password.clone(),
            },
            statistics: StatisticsToggles { leader, self_node, store },
        };

        debug!("Leader Statistic Enable = {}", config.statistics.leader);
        debug!("Self Statistic Enable = {}", config.statistics.self_node);
        debug!("Store Statistic Enable = {}", config.statistics.store);
        debug!("Host {} Port {} Period {:?}", config.host, config.port, config.period);

        Ok(config)
    }

    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

/// Config file location: explicit argument first, then `ETCDBEAT_CONFIG`, then `etcdbeat.yml`.
pub fn config_path(cli_arg: Option<String>) -> String {
    cli_arg
        .or_else(|| env::var(CONFIG_PATH_ENV).ok())
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn complete_raw() -> RawConfig {
        RawConfig {
            period: Some(10),
            port: Some("4001".to_owned()),
            host: Some("etcd-1".to_owned()),
            timeout_ms: None,
            authentication: RawAuthentication {
                enable: Some(false),
                username: None,
                password: None,
            },
            statistics: RawStatistics {
                leader: Some(true),
                self_node: Some(false),
                store: Some(true),
            },
        }
    }

    #[test]
    fn parses_yaml_file_shape() {
        let yaml = r#"
input:
  period: 1
  host: "localhost"
  port: "2379"
  authentication:
    enable: true
    username: "root"
    password: "secret"
  statistics:
    leader: true
    self: false
    store: true
"#;
        let settings = ConfigSettings::from_yaml_str("etcdbeat.yml", yaml).unwrap();
        let input = settings.input;
        assert_eq!(input.period, Some(1));
        assert_eq!(input.host.as_deref(), Some("localhost"));
        assert_eq!(input.port.as_deref(), Some("2379"));
        assert_eq!(input.authentication.enable, Some(true));
        assert_eq!(input.authentication.username.as_deref(), Some("root"));
        assert_eq!(input.statistics.self_node, Some(false));
    }

    #[test]
    fn invalid_yaml_is_a_parse_error() {
        let result = ConfigSettings::from_yaml_str("bad.yml", "input: [unclosed");
        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn unreadable_file_is_a_read_error() {
        let result = ConfigSettings::load_from_file("/definitely/not/here/etcdbeat.yml");
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }

    #[test]
    fn resolve_keeps_configured_values() {
        let config = ResolvedConfig::resolve(&complete_raw()).unwrap();
        assert_eq!(config.period, Duration::from_secs(10));
        assert_eq!(config.host, "etcd-1");
        assert_eq!(config.port, "4001");
        assert_eq!(config.base_url(), "http://etcd-1:4001");
        assert!(!config.authentication.enable);
        assert!(config.statistics.is_enabled(StatsCategory::Leader));
        assert!(!config.statistics.is_enabled(StatsCategory::SelfNode));
        assert!(config.statistics.is_enabled(StatsCategory::Store));
    }

    #[test]
    fn resolve_applies_defaults() {
        let raw = RawConfig {
            period: None,
            port: None,
            host: None,
            timeout_ms: None,
            ..complete_raw()
        };
        let config = ResolvedConfig::resolve(&raw).unwrap();
        assert_eq!(config.period, Duration::from_secs(DEFAULT_PERIOD_SECS));
        assert_eq!(config.port, "2379");
        assert_eq!(config.timeout, None);
    }

    // The absent-host fallback assigns "localhost" to the host and leaves the port at its default.
    // Older etcdbeat builds wrote "localhost" into the port instead; this behaviour is intentionally corrected.
    #[test]
    fn absent_host_falls_back_to_localhost_host_not_port() {
        let raw = RawConfig { host: None, ..complete_raw() };
        let config = ResolvedConfig::resolve(&raw).unwrap();
        assert_eq!(config.host, "localhost");
        assert_eq!(config.port, "4001");
    }

    #[test]
    fn resolve_lists_every_missing_required_field() {
        let raw = RawConfig {
            authentication: RawAuthentication::default(),
            statistics: RawStatistics {
                leader: Some(true),
                self_node: None,
                store: None,
            },
            ..complete_raw()
        };
        let error = ResolvedConfig::resolve(&raw).unwrap_err();
        assert_eq!(
            error,
            ConfigError::MissingFields(vec![
                "authentication.enable".to_owned(),
                "statistics.self".to_owned(),
                "statistics.store".to_owned(),
            ])
        );
    }

    #[test]
    fn zero_period_is_rejected() {
        let raw = RawConfig { period: Some(0), ..complete_raw() };
        assert!(matches!(ResolvedConfig::resolve(&raw), Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn debug_output_masks_password() {
        let raw = RawConfig {
            authentication: RawAuthentication {
                enable: Some(true),
                username: Some("root".to_owned()),
                password: Some("hunter2".to_owned()),
            },
            ..complete_raw()
        };
        let config = ResolvedConfig::resolve(&raw).unwrap();
        assert!(!format!("{:?}", raw).contains("hunter2"));
        assert!(!format!("{:?}", config).contains("hunter2"));
    }

    #[test]
    #[serial]
    fn config_path_precedence() {
        env::remove_var(CONFIG_PATH_ENV);
        assert_eq!(config_path(None), DEFAULT_CONFIG_PATH);

        env::set_var(CONFIG_PATH_ENV, "/etc/etcdbeat/etcdbeat.yml");
        assert_eq!(config_path(None), "/etc/etcdbeat/etcdbeat.yml");
        assert_eq!(config_path(Some("local.yml".to_owned())), "local.yml");

        env::remove_var(CONFIG_PATH_ENV);
    }
}
