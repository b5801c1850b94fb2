//! Live Data Settings
//!
//! Configuration for the monitor and the feed simulator, loaded from
//! environment variables.

use std::time::Duration;

use reqwest::Url;

use crate::application::services::{DashboardConfig, LiveSyncConfig};
use crate::domain::connection::ReconnectConfig;
use crate::domain::streaming::default_channels;

/// Push endpoint path, relative to the origin.
pub const PUSH_PATH: &str = "/api/market-data/ws";
/// Market snapshot endpoint path.
pub const MARKET_DATA_PATH: &str = "/api/market-data/live";
/// Personalized insights endpoint path.
pub const INSIGHTS_PATH: &str = "/api/insights/personalized";

// =============================================================================
// Endpoints
// =============================================================================

/// URLs derived from the dashboard origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    /// `ws://` or `wss://` push endpoint.
    pub push_url: String,
    /// Market snapshot endpoint.
    pub market_data_url: String,
    /// Personalized insights endpoint.
    pub insights_url: String,
}

impl Endpoints {
    /// Derive endpoints from an `http(s)://host[:port]` origin.
    ///
    /// The push scheme follows the origin: `https` pages get `wss`.
    ///
    /// # Errors
    ///
    /// Returns an error if the origin is not an absolute http(s) URL with a host.
    pub fn from_origin(origin: &str) -> Result<Self, ConfigError> {
        let invalid = |reason: &str| ConfigError::InvalidOrigin {
            origin: origin.to_string(),
            reason: reason.to_string(),
        };

        let base = Url::parse(origin.trim()).map_err(|e| invalid(&e.to_string()))?;

        let push_scheme = match base.scheme() {
            "http" => "ws",
            "https" => "wss",
            other => return Err(invalid(&format!("unsupported scheme {other}"))),
        };
        if base.host_str().is_none() {
            return Err(invalid("missing host"));
        }

        let join = |path: &str| base.join(path).map_err(|e| invalid(&e.to_string()));

        let mut push = join(PUSH_PATH)?;
        push.set_scheme(push_scheme)
            .map_err(|()| invalid("cannot derive push scheme"))?;

        Ok(Self {
            push_url: push.to_string(),
            market_data_url: join(MARKET_DATA_PATH)?.to_string(),
            insights_url: join(INSIGHTS_PATH)?.to_string(),
        })
    }
}

// =============================================================================
// Monitor Settings
// =============================================================================

/// Status server settings.
#[derive(Debug, Clone)]
pub struct ServerSettings {
    /// Status HTTP port.
    pub health_port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self { health_port: 8083 }
    }
}

/// Configuration for the `live-data-sync` monitor.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Derived endpoint URLs.
    pub endpoints: Endpoints,
    /// User the insights are requested for.
    pub user_id: Option<String>,
    /// Channels subscribed on open.
    pub channels: Vec<String>,
    /// Polling interval while push is down.
    pub poll_interval: Duration,
    /// Push reconnect backoff.
    pub reconnect: ReconnectConfig,
    /// Whether to attempt push at all.
    pub push_enabled: bool,
    /// Status server settings.
    pub server: ServerSettings,
}

impl SyncConfig {
    /// Create configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if `LIVE_DATA_ORIGIN` is missing, empty, or invalid,
    /// or if `LIVE_DATA_POLL_INTERVAL_SECS` is zero.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns an error if `LIVE_DATA_ORIGIN` is missing, empty, or invalid,
    /// or if `LIVE_DATA_POLL_INTERVAL_SECS` is zero.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let origin = lookup("LIVE_DATA_ORIGIN")
            .ok_or_else(|| ConfigError::MissingEnvVar("LIVE_DATA_ORIGIN".to_string()))?;
        if origin.trim().is_empty() {
            return Err(ConfigError::EmptyValue("LIVE_DATA_ORIGIN".to_string()));
        }
        let endpoints = Endpoints::from_origin(&origin)?;

        let user_id = lookup("LIVE_DATA_USER_ID")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());

        let channels = lookup("LIVE_DATA_CHANNELS")
            .map(|v| parse_list(&v))
            .filter(|list| !list.is_empty())
            .unwrap_or_else(default_channels);

        let defaults = ReconnectConfig::default();
        let reconnect = ReconnectConfig {
            initial_delay: parse_duration_secs(
                &lookup,
                "LIVE_DATA_RECONNECT_BASE_SECS",
                defaults.initial_delay,
            ),
            multiplier: defaults.multiplier,
            max_attempts: parse_u32(
                &lookup,
                "LIVE_DATA_MAX_RECONNECT_ATTEMPTS",
                defaults.max_attempts,
            ),
        };

        let poll_interval = parse_duration_secs(
            &lookup,
            "LIVE_DATA_POLL_INTERVAL_SECS",
            DashboardConfig::DEFAULT_POLL_INTERVAL,
        );
        if poll_interval.is_zero() {
            return Err(ConfigError::InvalidValue {
                key: "LIVE_DATA_POLL_INTERVAL_SECS".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        Ok(Self {
            endpoints,
            user_id,
            channels,
            poll_interval,
            reconnect,
            push_enabled: parse_bool(&lookup, "LIVE_DATA_PUSH_ENABLED", true),
            server: ServerSettings {
                health_port: parse_u16(
                    &lookup,
                    "LIVE_DATA_HEALTH_PORT",
                    ServerSettings::default().health_port,
                ),
            },
        })
    }

    /// Push session configuration.
    #[must_use]
    pub fn live_sync_config(&self) -> LiveSyncConfig {
        LiveSyncConfig {
            url: self.endpoints.push_url.clone(),
            channels: self.channels.clone(),
            reconnect: self.reconnect.clone(),
        }
    }

    /// Dashboard configuration.
    #[must_use]
    pub fn dashboard_config(&self) -> DashboardConfig {
        DashboardConfig {
            user_id: self.user_id.clone(),
            poll_interval: self.poll_interval,
            push_enabled: self.push_enabled,
            ..DashboardConfig::default()
        }
    }
}

// =============================================================================
// Simulator Settings
// =============================================================================

/// Configuration for the `feed-simulator` binary.
#[derive(Debug, Clone)]
pub struct SimulatorConfig {
    /// Listen port.
    pub port: u16,
    /// Interval between pushes on each open socket.
    pub push_interval: Duration,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            push_interval: Duration::from_secs(5),
        }
    }
}

impl SimulatorConfig {
    /// Create configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create configuration from an arbitrary key lookup.
    #[must_use]
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            port: parse_u16(&lookup, "FEED_SIMULATOR_PORT", defaults.port),
            push_interval: parse_duration_millis(
                &lookup,
                "FEED_SIMULATOR_PUSH_INTERVAL_MS",
                defaults.push_interval,
            ),
        }
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Required environment variable is missing.
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    /// Environment variable has empty value.
    #[error("environment variable {0} cannot be empty")]
    EmptyValue(String),
    /// Origin is not a usable http(s) URL.
    #[error("invalid origin {origin:?}: {reason}")]
    InvalidOrigin {
        /// The configured origin.
        origin: String,
        /// Why it was rejected.
        reason: String,
    },
    /// Value parsed but is out of range.
    #[error("invalid value for {key}: {reason}")]
    InvalidValue {
        /// The environment variable.
        key: String,
        /// Why it was rejected.
        reason: String,
    },
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn parse_u16<F: Fn(&str) -> Option<String>>(lookup: &F, key: &str, default: u16) -> u16 {
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn parse_u32<F: Fn(&str) -> Option<String>>(lookup: &F, key: &str, default: u32) -> u32 {
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn parse_bool<F: Fn(&str) -> Option<String>>(lookup: &F, key: &str, default: bool) -> bool {
    lookup(key).map_or(default, |v| match v.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => true,
        "false" | "0" | "no" | "off" => false,
        _ => default,
    })
}

fn parse_duration_secs<F: Fn(&str) -> Option<String>>(
    lookup: &F,
    key: &str,
    default: Duration,
) -> Duration {
    lookup(key)
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map_or(default, Duration::from_secs)
}

fn parse_duration_millis<F: Fn(&str) -> Option<String>>(
    lookup: &F,
    key: &str,
    default: Duration,
) -> Duration {
    lookup(key)
        .and_then(|v| v.trim().parse::<u64>().ok())
        .filter(|&millis| millis > 0)
        .map_or(default, Duration::from_millis)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use test_case::test_case;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test_case("http://localhost:3000", "ws://localhost:3000/api/market-data/ws")]
    #[test_case("https://app.example.com", "wss://app.example.com/api/market-data/ws")]
    #[test_case("https://app.example.com/some/page", "wss://app.example.com/api/market-data/ws")]
    fn push_url_follows_origin_scheme(origin: &str, expected: &str) {
        let endpoints = Endpoints::from_origin(origin).unwrap();
        assert_eq!(endpoints.push_url, expected);
    }

    #[test]
    fn http_endpoints_share_origin() {
        let endpoints = Endpoints::from_origin("https://app.example.com:8443").unwrap();
        assert_eq!(
            endpoints.market_data_url,
            "https://app.example.com:8443/api/market-data/live"
        );
        assert_eq!(
            endpoints.insights_url,
            "https://app.example.com:8443/api/insights/personalized"
        );
    }

    #[test_case("ftp://example.com")]
    #[test_case("not a url")]
    #[test_case("/relative/path")]
    fn rejects_bad_origins(origin: &str) {
        assert!(matches!(
            Endpoints::from_origin(origin),
            Err(ConfigError::InvalidOrigin { .. })
        ));
    }

    #[test]
    fn origin_is_required() {
        assert!(matches!(
            SyncConfig::from_lookup(env(&[])),
            Err(ConfigError::MissingEnvVar(_))
        ));
        assert!(matches!(
            SyncConfig::from_lookup(env(&[("LIVE_DATA_ORIGIN", "  ")])),
            Err(ConfigError::EmptyValue(_))
        ));
    }

    #[test]
    fn defaults_apply() {
        let config =
            SyncConfig::from_lookup(env(&[("LIVE_DATA_ORIGIN", "http://localhost:3000")]))
                .unwrap();

        assert_eq!(config.user_id, None);
        assert_eq!(config.channels, ["market-data", "insights", "trends"]);
        assert_eq!(config.poll_interval, Duration::from_secs(30));
        assert_eq!(config.reconnect.initial_delay, Duration::from_secs(2));
        assert_eq!(config.reconnect.max_attempts, 5);
        assert!(config.push_enabled);
        assert_eq!(config.server.health_port, 8083);
    }

    #[test]
    fn overrides_apply() {
        let config = SyncConfig::from_lookup(env(&[
            ("LIVE_DATA_ORIGIN", "https://dash.example.com"),
            ("LIVE_DATA_USER_ID", "user-7"),
            ("LIVE_DATA_CHANNELS", "market-data, insights,"),
            ("LIVE_DATA_POLL_INTERVAL_SECS", "10"),
            ("LIVE_DATA_RECONNECT_BASE_SECS", "1"),
            ("LIVE_DATA_MAX_RECONNECT_ATTEMPTS", "3"),
            ("LIVE_DATA_PUSH_ENABLED", "false"),
            ("LIVE_DATA_HEALTH_PORT", "9000"),
        ]))
        .unwrap();

        assert_eq!(config.user_id.as_deref(), Some("user-7"));
        assert_eq!(config.channels, ["market-data", "insights"]);

        let sync = config.live_sync_config();
        assert_eq!(sync.url, "wss://dash.example.com/api/market-data/ws");
        assert_eq!(sync.reconnect.initial_delay, Duration::from_secs(1));
        assert_eq!(sync.reconnect.max_attempts, 3);

        let dashboard = config.dashboard_config();
        assert_eq!(dashboard.poll_interval, Duration::from_secs(10));
        assert!(!dashboard.push_enabled);
        assert_eq!(dashboard.user_id.as_deref(), Some("user-7"));
        assert_eq!(config.server.health_port, 9000);
    }

    #[test]
    fn unparseable_values_fall_back() {
        let config = SyncConfig::from_lookup(env(&[
            ("LIVE_DATA_ORIGIN", "http://localhost"),
            ("LIVE_DATA_POLL_INTERVAL_SECS", "soon"),
            ("LIVE_DATA_PUSH_ENABLED", "maybe"),
            ("LIVE_DATA_CHANNELS", " , "),
        ]))
        .unwrap();

        assert_eq!(config.poll_interval, Duration::from_secs(30));
        assert!(config.push_enabled);
        assert_eq!(config.channels.len(), 3);
    }

    #[test]
    fn zero_poll_interval_is_rejected() {
        let result = SyncConfig::from_lookup(env(&[
            ("LIVE_DATA_ORIGIN", "http://localhost:3000"),
            ("LIVE_DATA_POLL_INTERVAL_SECS", "0"),
        ]));

        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue { ref key, .. }) if key == "LIVE_DATA_POLL_INTERVAL_SECS"
        ));
    }

    #[test]
    fn simulator_settings() {
        let defaults = SimulatorConfig::from_lookup(env(&[]));
        assert_eq!(defaults.port, 3000);
        assert_eq!(defaults.push_interval, Duration::from_secs(5));

        let custom = SimulatorConfig::from_lookup(env(&[
            ("FEED_SIMULATOR_PORT", "4000"),
            ("FEED_SIMULATOR_PUSH_INTERVAL_MS", "250"),
        ]));
        assert_eq!(custom.port, 4000);
        assert_eq!(custom.push_interval, Duration::from_millis(250));

        let zero = SimulatorConfig::from_lookup(env(&[("FEED_SIMULATOR_PUSH_INTERVAL_MS", "0")]));
        assert_eq!(zero.push_interval, Duration::from_secs(5));
    }
}
