//! Configuration file loading against real files.

use std::fs;
use std::path::Path;

use serde_json::json;
use solar_quote_mcp::config::{load_config, Config};
use solar_quote_mcp::error::ConfigError;
use solar_quote_mcp::estimate::Country;
use solar_quote_mcp::services::http::HttpBackend;
use tempfile::tempdir;

fn write_config(dir: &Path, value: &serde_json::Value) -> std::path::PathBuf {
    let path = dir.join("config.json");
    fs::write(&path, serde_json::to_string_pretty(value).unwrap()).unwrap();
    path
}

#[test]
fn example_config_is_valid() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("config/example-config.json");
    let config = load_config(Some(&path)).unwrap();
    assert_eq!(config.country, Country::Switzerland);
    assert_eq!(config.logging.level, "warn");

    let settings = config.session_settings();
    assert!((settings.layout.gap_m - 0.05).abs() < f64::EPSILON);
    assert_eq!(settings.lifetime_years, 25);
    assert!(HttpBackend::from_config(&config.services).is_ok());
}

#[test]
fn overrides_flow_into_session_settings() {
    let dir = tempdir().unwrap();
    let path = write_config(
        dir.path(),
        &json!({
            "country": "DE",
            "layout": { "panel_gap_m": 0.1, "phase_search": false },
            "tariffs": { "electricity": 0.42 },
            "consumption": { "annual_kwh": 3200.0, "lifetime_years": 30 }
        }),
    );
    let config = load_config(Some(&path)).unwrap();
    let settings = config.session_settings();

    assert_eq!(settings.profile.country, Country::Germany);
    assert_eq!(settings.profile.currency, "EUR");
    assert!((settings.profile.tariffs.electricity - 0.42).abs() < f64::EPSILON);
    assert!(!settings.layout.phase_search);
    assert!((settings.layout.gap_m - 0.1).abs() < f64::EPSILON);
    assert!((settings.default_consumption_kwh - 3200.0).abs() < f64::EPSILON);
    assert_eq!(settings.lifetime_years, 30);
}

#[test]
fn unknown_keys_are_rejected() {
    let dir = tempdir().unwrap();
    let path = write_config(dir.path(), &json!({ "layout": { "panel_spacing": 0.1 } }));
    assert!(matches!(
        load_config(Some(&path)),
        Err(ConfigError::ParseError { .. })
    ));
}

#[test]
fn invalid_values_are_rejected() {
    let dir = tempdir().unwrap();
    for (value, key) in [
        (json!({ "layout": { "panel_gap_m": -0.5 } }), "layout.panel_gap_m"),
        (json!({ "tariffs": { "feed_in": -0.01 } }), "tariffs.feed_in"),
        (json!({ "consumption": { "lifetime_years": 0 } }), "consumption.lifetime_years"),
        (json!({ "services": { "base_url": "ftp://example.com" } }), "services.base_url"),
        (json!({ "logging": { "level": "loud" } }), "logging.level"),
    ] {
        let path = write_config(dir.path(), &value);
        let err = load_config(Some(&path)).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError { .. }), "{value}");
        assert_eq!(err.key(), Some(key), "{value}");
        assert!(err.to_string().contains(key), "{err}");
    }
}

#[test]
fn empty_object_gives_defaults() {
    let dir = tempdir().unwrap();
    let path = write_config(dir.path(), &json!({}));
    let config = load_config(Some(&path)).unwrap();
    let defaults = Config::default();
    assert_eq!(config.country, defaults.country);
    assert_eq!(config.session_settings(), defaults.session_settings());
}
