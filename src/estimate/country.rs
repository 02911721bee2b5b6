//! Country-specific pricing, tax and subsidy tables.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Market the quote is prepared for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Country {
    /// Switzerland (CHF).
    #[default]
    #[serde(rename = "CH")]
    Switzerland,
    /// Germany (EUR).
    #[serde(rename = "DE")]
    Germany,
    /// Austria (EUR).
    #[serde(rename = "AT")]
    Austria,
}

impl Country {
    /// Parses a country from an ISO code or English name (case-insensitive).
    #[must_use]
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "CH" | "SWITZERLAND" => Some(Self::Switzerland),
            "DE" | "GERMANY" => Some(Self::Germany),
            "AT" | "AUSTRIA" => Some(Self::Austria),
            _ => None,
        }
    }

    /// ISO 3166 alpha-2 code, as used by the equipment catalog.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Switzerland => "CH",
            Self::Germany => "DE",
            Self::Austria => "AT",
        }
    }

    /// Returns the built-in profile for this country.
    #[must_use]
    pub const fn profile(self) -> CountryProfile {
        match self {
            Self::Switzerland => CountryProfile {
                country: self,
                currency: "CHF",
                install_rate_per_kwp: 900.0,
                vat_rate: 0.081,
                subsidy: SubsidyScheme::new(500.0, 360.0, 100.0),
                tariffs: Tariffs::new(0.30, 0.12),
            },
            Self::Germany => CountryProfile {
                country: self,
                currency: "EUR",
                install_rate_per_kwp: 1_100.0,
                // Zero rate for residential PV
                vat_rate: 0.0,
                subsidy: SubsidyScheme::new(0.0, 0.0, 0.0),
                tariffs: Tariffs::new(0.35, 0.082),
            },
            Self::Austria => CountryProfile {
                country: self,
                currency: "EUR",
                install_rate_per_kwp: 1_000.0,
                vat_rate: 0.0,
                subsidy: SubsidyScheme::new(0.0, 160.0, 10.0),
                tariffs: Tariffs::new(0.28, 0.10),
            },
        }
    }
}

impl fmt::Display for Country {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// One-off subsidy: `base + min(kWp, cap) · per_kw`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SubsidyScheme {
    /// Fixed contribution.
    pub base: f64,
    /// Contribution per installed kWp.
    pub per_kw: f64,
    /// kWp above which no further per-kW contribution is paid.
    pub cap_kwp: f64,
}

impl SubsidyScheme {
    /// Creates a subsidy scheme.
    #[must_use]
    pub const fn new(base: f64, per_kw: f64, cap_kwp: f64) -> Self {
        Self {
            base,
            per_kw,
            cap_kwp,
        }
    }

    /// Subsidy for a system of `kwp`. Zero for an empty system.
    #[must_use]
    pub fn amount(&self, kwp: f64) -> f64 {
        if kwp <= 0.0 {
            return 0.0;
        }
        kwp.min(self.cap_kwp).mul_add(self.per_kw, self.base)
    }
}

/// Electricity prices per kWh.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tariffs {
    /// Price paid for grid electricity.
    pub electricity: f64,
    /// Price received for exported electricity.
    pub feed_in: f64,
}

impl Tariffs {
    /// Creates a tariff pair.
    #[must_use]
    pub const fn new(electricity: f64, feed_in: f64) -> Self {
        Self {
            electricity,
            feed_in,
        }
    }
}

/// Pricing constants for one market.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CountryProfile {
    /// Market.
    pub country: Country,
    /// ISO 4217 currency code.
    pub currency: &'static str,
    /// Installation cost per kWp before the roof multiplier.
    pub install_rate_per_kwp: f64,
    /// VAT rate applied to the investment when applicable.
    pub vat_rate: f64,
    /// Subsidy scheme.
    pub subsidy: SubsidyScheme,
    /// Default tariffs.
    pub tariffs: Tariffs,
}

impl CountryProfile {
    /// Returns the profile with tariffs replaced where an override is given.
    #[must_use]
    pub fn with_tariffs(mut self, electricity: Option<f64>, feed_in: Option<f64>) -> Self {
        if let Some(value) = electricity {
            self.tariffs.electricity = value;
        }
        if let Some(value) = feed_in {
            self.tariffs.feed_in = value;
        }
        self
    }
}

/// Roof covering; scales the installation cost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoofMaterial {
    /// Clay or concrete tiles.
    #[default]
    Tile,
    /// Natural slate.
    Slate,
    /// Standing-seam or trapezoidal metal.
    Metal,
    /// Fibre-cement corrugated sheets.
    FiberCement,
    /// Flat roof with ballasted mounting.
    Flat,
}

impl RoofMaterial {
    /// Installation cost multiplier.
    #[must_use]
    pub const fn multiplier(self) -> f64 {
        match self {
            Self::Tile => 1.0,
            Self::Slate => 1.25,
            Self::Metal => 0.9,
            Self::FiberCement => 1.15,
            Self::Flat => 1.1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_country() {
        assert_eq!(Country::from_str_loose("ch"), Some(Country::Switzerland));
        assert_eq!(Country::from_str_loose(" Germany "), Some(Country::Germany));
        assert_eq!(Country::from_str_loose("AT"), Some(Country::Austria));
        assert_eq!(Country::from_str_loose("FR"), None);
    }

    #[test]
    fn swiss_subsidy_for_ten_kwp() {
        let subsidy = Country::Switzerland.profile().subsidy;
        assert!((subsidy.amount(10.0) - 4_100.0).abs() < 1e-9);
        assert!(subsidy.amount(0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn subsidy_is_capped() {
        let subsidy = Country::Austria.profile().subsidy;
        assert!((subsidy.amount(25.0) - subsidy.amount(10.0)).abs() < 1e-9);
    }

    #[test]
    fn tariff_override() {
        let profile = Country::Switzerland.profile().with_tariffs(Some(0.25), None);
        assert!((profile.tariffs.electricity - 0.25).abs() < f64::EPSILON);
        assert!((profile.tariffs.feed_in - 0.12).abs() < f64::EPSILON);
    }

    #[test]
    fn serde_uses_iso_codes() {
        assert_eq!(serde_json::to_string(&Country::Germany).unwrap(), "\"DE\"");
        let c: Country = serde_json::from_str("\"AT\"").unwrap();
        assert_eq!(c, Country::Austria);
    }
}
