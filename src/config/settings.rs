//! Configuration structures for deserialisation.
//!
//! These structures map directly to the JSON configuration file format.

use serde::Deserialize;

use crate::error::ConfigError;
use crate::estimate::{Country, DEFAULT_LIFETIME_YEARS};
use crate::layout::{LayoutOptions, DEFAULT_PANEL_GAP_M};
use crate::wizard::drawing::DEFAULT_AUTO_CLOSE_M;
use crate::wizard::session::{SessionSettings, DEFAULT_CONSUMPTION_KWH};

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Root configuration structure.
///
/// This is the top-level structure that matches the JSON config file.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Optional JSON schema reference (ignored during parsing).
    #[serde(rename = "$schema", default)]
    _schema: Option<String>,

    /// Optional comment field (ignored during parsing).
    #[serde(rename = "_comment", default)]
    _comment: Option<String>,

    /// Market used for pricing, subsidies and the equipment catalog.
    #[serde(default)]
    pub country: Country,

    /// Panel layout settings.
    #[serde(default)]
    pub layout: LayoutConfig,

    /// Tariff overrides.
    #[serde(default)]
    pub tariffs: TariffConfig,

    /// Consumption and projection defaults.
    #[serde(default)]
    pub consumption: ConsumptionConfig,

    /// Backend service settings.
    #[serde(default)]
    pub services: ServicesConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any validation checks fail.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let layout = &self.layout;
        if !(layout.panel_gap_m.is_finite() && layout.panel_gap_m >= 0.0) {
            return Err(invalid(
                "layout.panel_gap_m",
                format!("must be a non-negative number, got {}", layout.panel_gap_m),
            ));
        }
        if !(layout.auto_close_distance_m.is_finite() && layout.auto_close_distance_m > 0.0) {
            return Err(invalid(
                "layout.auto_close_distance_m",
                format!("must be positive, got {}", layout.auto_close_distance_m),
            ));
        }
        if !(layout.coarse_step_deg.is_finite() && layout.coarse_step_deg > 0.0) {
            return Err(invalid(
                "layout.coarse_step_deg",
                format!("must be positive, got {}", layout.coarse_step_deg),
            ));
        }
        if !(layout.refine_window_deg.is_finite() && layout.refine_window_deg >= 0.0) {
            return Err(invalid(
                "layout.refine_window_deg",
                format!("must be non-negative, got {}", layout.refine_window_deg),
            ));
        }

        for (key, value) in [
            ("tariffs.electricity", self.tariffs.electricity),
            ("tariffs.feed_in", self.tariffs.feed_in),
        ] {
            if let Some(v) = value {
                if !(v.is_finite() && v >= 0.0) {
                    return Err(invalid(key, format!("must be non-negative, got {v}")));
                }
            }
        }

        let consumption = &self.consumption;
        if !(consumption.annual_kwh.is_finite() && consumption.annual_kwh > 0.0) {
            return Err(invalid(
                "consumption.annual_kwh",
                format!("must be positive, got {}", consumption.annual_kwh),
            ));
        }
        if consumption.lifetime_years == 0 {
            return Err(invalid("consumption.lifetime_years", "must be at least 1"));
        }

        if let Some(ref url) = self.services.base_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(invalid(
                    "services.base_url",
                    format!("must start with http:// or https://, got '{url}'"),
                ));
            }
        }
        if self.services.timeout_secs == 0 {
            return Err(invalid("services.timeout_secs", "must be at least 1"));
        }

        if !LOG_LEVELS.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(invalid(
                "logging.level",
                format!(
                    "unknown level '{}', expected one of: {}",
                    self.logging.level,
                    LOG_LEVELS.join(", ")
                ),
            ));
        }
        Ok(())
    }

    /// Session settings derived from this configuration.
    #[must_use]
    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            profile: self
                .country
                .profile()
                .with_tariffs(self.tariffs.electricity, self.tariffs.feed_in),
            layout: self.layout.options(),
            auto_close_m: self.layout.auto_close_distance_m,
            default_consumption_kwh: self.consumption.annual_kwh,
            lifetime_years: self.consumption.lifetime_years,
        }
    }
}

fn invalid(key: &'static str, message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        key,
        message: message.into(),
    }
}

/// Panel layout configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LayoutConfig {
    /// Gap between neighbouring panels in metres.
    #[serde(default = "default_panel_gap")]
    pub panel_gap_m: f64,

    /// Distance to the first vertex that closes a drawn polygon, in metres.
    #[serde(default = "default_auto_close")]
    pub auto_close_distance_m: f64,

    /// Step of the coarse rotation sweep in degrees.
    #[serde(default = "default_coarse_step")]
    pub coarse_step_deg: f64,

    /// Half-width of the 1° refinement around the best coarse angle.
    #[serde(default = "default_refine_window")]
    pub refine_window_deg: f64,

    /// Try half-step grid offsets and keep the best fit.
    #[serde(default = "default_true")]
    pub phase_search: bool,
}

impl LayoutConfig {
    /// Layout options for the engine.
    #[must_use]
    pub const fn options(&self) -> LayoutOptions {
        LayoutOptions {
            gap_m: self.panel_gap_m,
            phase_search: self.phase_search,
            coarse_step_deg: self.coarse_step_deg,
            refine_window_deg: self.refine_window_deg,
        }
    }
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            panel_gap_m: default_panel_gap(),
            auto_close_distance_m: default_auto_close(),
            coarse_step_deg: default_coarse_step(),
            refine_window_deg: default_refine_window(),
            phase_search: default_true(),
        }
    }
}

const fn default_panel_gap() -> f64 {
    DEFAULT_PANEL_GAP_M
}

const fn default_auto_close() -> f64 {
    DEFAULT_AUTO_CLOSE_M
}

const fn default_coarse_step() -> f64 {
    5.0
}

const fn default_refine_window() -> f64 {
    5.0
}

const fn default_true() -> bool {
    true
}

/// Tariff overrides. Unset values keep the country default.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TariffConfig {
    /// Grid electricity price per kWh.
    #[serde(default)]
    pub electricity: Option<f64>,

    /// Feed-in remuneration per kWh.
    #[serde(default)]
    pub feed_in: Option<f64>,
}

/// Consumption and projection defaults.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConsumptionConfig {
    /// Household consumption preset in kWh per year.
    #[serde(default = "default_annual_kwh")]
    pub annual_kwh: f64,

    /// Length of the cash-flow projection in years.
    #[serde(default = "default_lifetime")]
    pub lifetime_years: u32,
}

impl Default for ConsumptionConfig {
    fn default() -> Self {
        Self {
            annual_kwh: default_annual_kwh(),
            lifetime_years: default_lifetime(),
        }
    }
}

const fn default_annual_kwh() -> f64 {
    DEFAULT_CONSUMPTION_KWH
}

const fn default_lifetime() -> u32 {
    DEFAULT_LIFETIME_YEARS
}

/// Backend service configuration.
///
/// The MCP binary only serves the offline tools; it validates this section
/// but never connects. Library users pass it to
/// [`HttpBackend::from_config`](crate::services::http::HttpBackend::from_config)
/// when driving a [`QuoteFlow`](crate::wizard::QuoteFlow) against the real
/// services.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServicesConfig {
    /// Base URL of the quoting backend.
    #[serde(default)]
    pub base_url: Option<String>,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for ServicesConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_secs: default_timeout(),
        }
    }
}

const fn default_timeout() -> u64 {
    30
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_minimal_config() {
        let json = r"{}";
        let config: Config = serde_json::from_str(json).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.country, Country::Switzerland);
    }

    #[test]
    fn parse_full_config() {
        let json = r#"{
            "$schema": "https://json-schema.org/draft/2020-12/schema",
            "_comment": "Test config",
            "country": "DE",
            "layout": {
                "panel_gap_m": 0.02,
                "auto_close_distance_m": 3.0,
                "coarse_step_deg": 10.0,
                "refine_window_deg": 10.0,
                "phase_search": false
            },
            "tariffs": {
                "electricity": 0.4
            },
            "consumption": {
                "annual_kwh": 6000,
                "lifetime_years": 20
            },
            "services": {
                "base_url": "https://api.example.com/v1",
                "timeout_secs": 10
            },
            "logging": {
                "level": "debug"
            }
        }"#;

        let config: Config = serde_json::from_str(json).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.country, Country::Germany);
        assert!(!config.layout.phase_search);
        assert_eq!(config.consumption.lifetime_years, 20);
        assert_eq!(config.logging.level, "debug");

        let settings = config.session_settings();
        assert!((settings.profile.tariffs.electricity - 0.4).abs() < f64::EPSILON);
        assert!((settings.profile.tariffs.feed_in - 0.082).abs() < f64::EPSILON);
        assert!((settings.layout.gap_m - 0.02).abs() < f64::EPSILON);
        assert!((settings.auto_close_m - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn layout_config_defaults() {
        let config = LayoutConfig::default();
        assert!((config.panel_gap_m - DEFAULT_PANEL_GAP_M).abs() < f64::EPSILON);
        assert!((config.auto_close_distance_m - 5.0).abs() < f64::EPSILON);
        assert!(config.phase_search);
        assert_eq!(config.options(), LayoutOptions::default());
    }

    #[test]
    fn logging_config_defaults() {
        let config = LoggingConfig::default();
        assert_eq!(config.level, "warn");
    }

    #[test]
    fn reject_negative_gap() {
        let json = r#"{ "layout": { "panel_gap_m": -0.1 } }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn reject_zero_step() {
        let json = r#"{ "layout": { "coarse_step_deg": 0 } }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn reject_non_http_base_url() {
        let json = r#"{ "services": { "base_url": "ftp://example.com" } }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        let err = config.validate().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::ValidationError {
                key: "services.base_url",
                ..
            }
        ));
        assert!(err.to_string().contains("services.base_url"));
    }

    #[test]
    fn reject_unknown_log_level() {
        let json = r#"{ "logging": { "level": "loud" } }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn reject_unknown_country() {
        let json = r#"{ "country": "FR" }"#;
        let result: Result<Config, _> = serde_json::from_str(json);
        assert!(result.is_err());
    }

    #[test]
    fn reject_unknown_fields() {
        let json = r#"{
            "unknown_field": "value"
        }"#;

        let result: Result<Config, _> = serde_json::from_str(json);
        assert!(result.is_err());
    }
}
