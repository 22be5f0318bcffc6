//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`PulseSettings::default()`]
//! 2. If the settings file exists, deep-merge its values over the defaults
//! 3. Apply environment variable overrides (highest priority)
//! 4. [`PulseSettings::validate`]
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use crate::errors::{Result, SettingsError};
use crate::types::{FreshnessBasis, PulseSettings};

/// Resolve the pulse home directory (`~/.pulse`).
pub fn pulse_home() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".pulse")
}

/// Resolve the path to the settings file (`~/.pulse/settings.json`).
pub fn settings_path() -> PathBuf {
    pulse_home().join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<PulseSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// If the file does not exist, returns defaults (plus env overrides). If
/// the file contains invalid JSON, returns an error.
pub fn load_settings_from_path(path: &Path) -> Result<PulseSettings> {
    let mut settings = load_file_over_defaults(path)?;
    apply_env_overrides(&mut settings, |name| std::env::var(name).ok());
    settings.validate();
    if settings.github.author_email.trim().is_empty() {
        return Err(SettingsError::InvalidValue(
            "github.authorEmail must not be empty".into(),
        ));
    }
    Ok(settings)
}

/// Defaults with the settings file deep-merged on top. No env lookups.
pub fn load_file_over_defaults(path: &Path) -> Result<PulseSettings> {
    let defaults = serde_json::to_value(PulseSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    Ok(serde_json::from_value(merged)?)
}

/// Recursive deep merge of two JSON values.
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = if let Some(target_val) = target_map.remove(&key) {
                    deep_merge(target_val, source_val)
                } else {
                    source_val
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply environment overrides read through `lookup`.
///
/// `lookup` is `std::env::var` in production and a map in tests. Empty
/// values are treated as unset; unparseable values are ignored with a warning.
pub fn apply_env_overrides<F>(settings: &mut PulseSettings, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let string = |name: &str| lookup(name).filter(|v| !v.is_empty());

    // ── Secrets ─────────────────────────────────────────────────────
    if let Some(v) = string("GITHUB_TOKEN") {
        settings.github.token = Some(v);
    }
    if let Some(v) = string("CRON_SECRET") {
        settings.auth.cron_secret = Some(v);
    }
    if let Some(v) = string("ADMIN_TOKEN") {
        settings.auth.admin_token = Some(v);
    }

    // ── GitHub ──────────────────────────────────────────────────────
    if let Some(v) = string("PULSE_AUTHOR_EMAIL") {
        settings.github.author_email = v;
    }
    if let Some(v) = string("PULSE_GITHUB_API_URL") {
        settings.github.api_base_url = v.trim_end_matches('/').to_string();
    }

    // ── Server / store ──────────────────────────────────────────────
    if let Some(v) = string("PULSE_HOST") {
        settings.server.host = v;
    }
    if let Some(v) = string("PULSE_PORT") {
        match parse_u16_range(&v, 1, 65535) {
            Some(port) => settings.server.port = port,
            None => {
                tracing::warn!(key = "PULSE_PORT", value = %v, "invalid port env var, ignoring");
            }
        }
    }
    if let Some(v) = string("PULSE_DB_PATH") {
        settings.store.db_path = v;
    }

    // ── Sync ────────────────────────────────────────────────────────
    if let Some(v) = string("PULSE_SCHEDULE_ENABLED") {
        match parse_bool(&v) {
            Some(b) => settings.sync.schedule.enabled = b,
            None => {
                tracing::warn!(key = "PULSE_SCHEDULE_ENABLED", value = %v, "invalid boolean env var, ignoring");
            }
        }
    }
    if let Some(v) = string("PULSE_FRESHNESS_BASIS") {
        match serde_json::from_value::<FreshnessBasis>(Value::String(v.clone())) {
            Ok(basis) => settings.sync.freshness_basis = basis,
            Err(_) => {
                tracing::warn!(key = "PULSE_FRESHNESS_BASIS", value = %v, "unknown freshness basis, ignoring");
            }
        }
    }

    // ── Logging ─────────────────────────────────────────────────────
    if let Some(v) = string("PULSE_LOG_LEVEL") {
        settings.logging.level = v;
    }
    if let Some(v) = string("PULSE_LOG_JSON") {
        match parse_bool(&v) {
            Some(b) => settings.logging.json = b,
            None => {
                tracing::warn!(key = "PULSE_LOG_JSON", value = %v, "invalid boolean env var, ignoring");
            }
        }
    }
}

// ── Pure parsing functions ──────────────────────────────────────────────────

/// Parse a string as a boolean.
///
/// Accepts (case-insensitive): `true`/`1`/`yes`/`on` or `false`/`0`/`no`/`off`.
pub fn parse_bool(val: &str) -> Option<bool> {
    match val.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse a string as a `u16` within a range.
pub fn parse_u16_range(val: &str, min: u16, max: u16) -> Option<u16> {
    let n: u16 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    // ── deep_merge ──────────────────────────────────────────────────

    #[test]
    fn merge_nested_override() {
        let target = serde_json::json!({"server": {"port": 3000, "host": "localhost"}});
        let source = serde_json::json!({"server": {"port": 9090}});
        let merged = deep_merge(target, source);
        assert_eq!(merged["server"]["port"], 9090);
        assert_eq!(merged["server"]["host"], "localhost");
    }

    #[test]
    fn merge_null_preserves_target() {
        let target = serde_json::json!({"a": 1, "b": 2});
        let source = serde_json::json!({"a": null});
        let merged = deep_merge(target, source);
        assert_eq!(merged["a"], 1);
        assert_eq!(merged["b"], 2);
    }

    #[test]
    fn merge_array_replace() {
        let target = serde_json::json!({"items": [1, 2, 3]});
        let source = serde_json::json!({"items": [4]});
        assert_eq!(deep_merge(target, source)["items"], serde_json::json!([4]));
    }

    // ── file layer ──────────────────────────────────────────────────

    #[test]
    fn missing_file_returns_defaults() {
        let settings = load_file_over_defaults(Path::new("/nonexistent/settings.json")).unwrap();
        assert_eq!(settings.server.port, 3000);
    }

    #[test]
    fn partial_file_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(
            &path,
            r#"{"server": {"port": 8088}, "sync": {"schedule": {"hourUtc": 5}}}"#,
        )
        .unwrap();

        let settings = load_file_over_defaults(&path).unwrap();
        assert_eq!(settings.server.port, 8088);
        assert_eq!(settings.server.host, "127.0.0.1");
        assert_eq!(settings.sync.schedule.hour_utc, 5);
        assert!(settings.sync.schedule.run_on_startup);
    }

    #[test]
    fn invalid_json_returns_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "not json").unwrap();
        let err = load_file_over_defaults(&path).unwrap_err();
        assert!(matches!(err, SettingsError::Json(_)));
    }

    // ── env layer ───────────────────────────────────────────────────

    #[test]
    fn env_supplies_secrets() {
        let mut s = PulseSettings::default();
        apply_env_overrides(
            &mut s,
            env(&[
                ("GITHUB_TOKEN", "ghp_x"),
                ("CRON_SECRET", "cron"),
                ("ADMIN_TOKEN", "admin"),
            ]),
        );
        assert_eq!(s.github.token.as_deref(), Some("ghp_x"));
        assert_eq!(s.auth.cron_secret.as_deref(), Some("cron"));
        assert_eq!(s.auth.admin_token.as_deref(), Some("admin"));
    }

    #[test]
    fn empty_env_values_are_unset() {
        let mut s = PulseSettings::default();
        apply_env_overrides(&mut s, env(&[("CRON_SECRET", "")]));
        assert!(s.auth.cron_secret.is_none());
    }

    #[test]
    fn invalid_port_is_ignored() {
        let mut s = PulseSettings::default();
        apply_env_overrides(&mut s, env(&[("PULSE_PORT", "99999")]));
        assert_eq!(s.server.port, 3000);
        apply_env_overrides(&mut s, env(&[("PULSE_PORT", "8081")]));
        assert_eq!(s.server.port, 8081);
    }

    #[test]
    fn api_url_trailing_slash_trimmed() {
        let mut s = PulseSettings::default();
        apply_env_overrides(&mut s, env(&[("PULSE_GITHUB_API_URL", "http://127.0.0.1:9/")]));
        assert_eq!(s.github.api_base_url, "http://127.0.0.1:9");
    }

    #[test]
    fn freshness_basis_from_env() {
        let mut s = PulseSettings::default();
        apply_env_overrides(&mut s, env(&[("PULSE_FRESHNESS_BASIS", "syncCursor")]));
        assert_eq!(s.sync.freshness_basis, FreshnessBasis::SyncCursor);
        apply_env_overrides(&mut s, env(&[("PULSE_FRESHNESS_BASIS", "bogus")]));
        assert_eq!(s.sync.freshness_basis, FreshnessBasis::SyncCursor);
    }

    #[test]
    fn schedule_toggle_from_env() {
        let mut s = PulseSettings::default();
        apply_env_overrides(&mut s, env(&[("PULSE_SCHEDULE_ENABLED", "off")]));
        assert!(!s.sync.schedule.enabled);
    }

    #[derive(Clone, Default)]
    struct Captured(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn invalid_log_json_is_ignored_with_warning() {
        let logs = Captured::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();

        let mut s = PulseSettings::default();
        tracing::subscriber::with_default(subscriber, || {
            apply_env_overrides(&mut s, env(&[("PULSE_LOG_JSON", "maybe")]));
        });

        assert!(!s.logging.json);
        let output = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
        assert!(output.contains("WARN"));
        assert!(output.contains("PULSE_LOG_JSON"));
    }

    // ── parsing ─────────────────────────────────────────────────────

    #[test]
    fn parse_bool_variants() {
        assert_eq!(parse_bool("YES"), Some(true));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn parse_u16_bounds() {
        assert_eq!(parse_u16_range("1", 1, 10), Some(1));
        assert_eq!(parse_u16_range("0", 1, 10), None);
        assert_eq!(parse_u16_range("abc", 1, 10), None);
    }
}
