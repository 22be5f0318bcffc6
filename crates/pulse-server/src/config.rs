//! Server configuration.

use std::time::Duration;

use chrono::NaiveDate;
use pulse_settings::PulseSettings;

/// Configuration for the pulse HTTP server.
#[derive(Clone)]
pub struct ServerConfig {
    /// Host to bind (default `"127.0.0.1"`).
    pub host: String,
    /// Port to bind (default `0` for auto-assign).
    pub port: u16,
    /// Bearer secret for the cron trigger. Unset disables the trigger.
    pub cron_secret: Option<String>,
    /// Password for the manual refresh trigger. Unset disables the trigger.
    pub admin_token: Option<String>,
    /// Default start of the dashboard window.
    pub data_start: NaiveDate,
    /// How long a dashboard response stays cached.
    pub cache_ttl: Duration,
}

impl ServerConfig {
    /// Derive server configuration from loaded settings.
    pub fn from_settings(settings: &PulseSettings) -> Self {
        Self {
            host: settings.server.host.clone(),
            port: settings.server.port,
            cron_secret: settings.auth.cron_secret.clone(),
            admin_token: settings.auth.admin_token.clone(),
            data_start: settings.dashboard.data_start,
            cache_ttl: Duration::from_secs(settings.dashboard.cache_ttl_secs),
        }
    }

    /// `host:port` bind address.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 0,
            cron_secret: None,
            admin_token: None,
            data_start: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or_default(),
            cache_ttl: Duration::from_secs(4 * 60 * 60),
        }
    }
}

impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redact = |s: &Option<String>| s.as_ref().map(|_| "<redacted>");
        f.debug_struct("ServerConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("cron_secret", &redact(&self.cron_secret))
            .field("admin_token", &redact(&self.admin_token))
            .field("data_start", &self.data_start)
            .field("cache_ttl", &self.cache_ttl)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.host, "127.0.0.1");
        assert_eq!(cfg.port, 0);
        assert_eq!(cfg.cache_ttl, Duration::from_secs(14_400));
        assert_eq!(cfg.data_start, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
    }

    #[test]
    fn from_settings_copies_auth_and_dashboard() {
        let mut settings = PulseSettings::default();
        settings.server.port = 8080;
        settings.auth.cron_secret = Some("cron".into());
        settings.dashboard.cache_ttl_secs = 60;

        let cfg = ServerConfig::from_settings(&settings);
        assert_eq!(cfg.bind_addr(), "127.0.0.1:8080");
        assert_eq!(cfg.cron_secret.as_deref(), Some("cron"));
        assert!(cfg.admin_token.is_none());
        assert_eq!(cfg.cache_ttl, Duration::from_secs(60));
    }

    #[test]
    fn debug_redacts_secrets() {
        let cfg = ServerConfig {
            cron_secret: Some("hunter2".into()),
            admin_token: Some("swordfish".into()),
            ..ServerConfig::default()
        };
        let dbg = format!("{cfg:?}");
        assert!(!dbg.contains("hunter2"));
        assert!(!dbg.contains("swordfish"));
        assert!(dbg.contains("<redacted>"));
    }
}
