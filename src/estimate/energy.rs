//! Production, self-consumption and investment arithmetic.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::equipment::{InverterSpec, PanelSpec};
use crate::estimate::country::{CountryProfile, RoofMaterial, SubsidyScheme, Tariffs};

/// Share of production used on site without any extra loads.
pub const BASE_SELF_CONSUMPTION: f64 = 0.25;

/// Bonus when a heat pump heats domestic hot water.
pub const HEAT_PUMP_HOT_WATER_BONUS: f64 = 0.05;

/// Bonus when a heat pump heats the building.
pub const HEAT_PUMP_HEATING_BONUS: f64 = 0.10;

/// Bonus per EV charging station.
pub const EV_STATION_BONUS: f64 = 0.05;

/// Grid emissions displaced per kWh produced (kg CO₂).
pub const GRID_DISPLACEMENT_KG_PER_KWH: f64 = 0.4;

/// Installed DC power in kWp.
#[must_use]
#[allow(clippy::cast_precision_loss)] // panel counts are small
pub fn system_size_kwp(power_watts: f64, count: usize) -> f64 {
    power_watts * count as f64 / 1000.0
}

/// Production share of one roof segment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SegmentProduction {
    /// Annual yield if every fitting panel were installed (kWh).
    pub yield_kwh: f64,
    /// Panels actually placed on the segment.
    pub used: usize,
    /// Maximum panels that fit on the segment.
    pub max: usize,
}

impl SegmentProduction {
    /// Yield scaled by `used / max`; zero when nothing fits.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn production_kwh(&self) -> f64 {
        if self.max == 0 {
            return 0.0;
        }
        let used = self.used.min(self.max);
        self.yield_kwh * used as f64 / self.max as f64
    }
}

/// Total annual production over the used segments (kWh).
#[must_use]
pub fn annual_production(segments: &[SegmentProduction]) -> f64 {
    segments.iter().map(SegmentProduction::production_kwh).sum()
}

/// Household loads that shift consumption towards daylight hours.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsumptionProfile {
    /// Annual electricity consumption (kWh).
    pub annual_kwh: f64,
    /// Heat pump used for hot water.
    #[serde(default)]
    pub heat_pump_hot_water: bool,
    /// Heat pump used for space heating.
    #[serde(default)]
    pub heat_pump_heating: bool,
    /// Number of EV charging stations.
    #[serde(default)]
    pub ev_stations: u32,
}

impl ConsumptionProfile {
    /// A profile with no extra loads.
    #[must_use]
    pub const fn basic(annual_kwh: f64) -> Self {
        Self {
            annual_kwh,
            heat_pump_hot_water: false,
            heat_pump_heating: false,
            ev_stations: 0,
        }
    }
}

/// Expected share of production consumed on site.
#[must_use]
pub fn self_consumption_rate(profile: &ConsumptionProfile) -> f64 {
    let mut rate = BASE_SELF_CONSUMPTION;
    if profile.heat_pump_hot_water {
        rate += HEAT_PUMP_HOT_WATER_BONUS;
    }
    if profile.heat_pump_heating {
        rate += HEAT_PUMP_HEATING_BONUS;
    }
    rate + f64::from(profile.ev_stations) * EV_STATION_BONUS
}

/// Where the produced and consumed energy goes (kWh/yr).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnergySplit {
    /// Total production.
    pub production: f64,
    /// Produced and used on site.
    pub self_consumed: f64,
    /// Exported to the grid.
    pub feed_in: f64,
    /// Still bought from the grid.
    pub grid_purchase: f64,
}

impl EnergySplit {
    /// Splits production using the self-consumption rate.
    ///
    /// Self consumption is bounded by both production and consumption, so a
    /// rate above 1 never produces negative feed-in.
    #[must_use]
    pub fn compute(production: f64, rate: f64, consumption: f64) -> Self {
        let production = production.max(0.0);
        let consumption = consumption.max(0.0);
        let self_consumed = (production * rate.clamp(0.0, 1.0)).min(consumption);
        Self {
            production,
            self_consumed,
            feed_in: production - self_consumed,
            grid_purchase: consumption - self_consumed,
        }
    }

    /// Annual savings and revenue at the given tariffs.
    #[must_use]
    pub fn annual_yield(&self, tariffs: Tariffs) -> f64 {
        self.self_consumed
            .mul_add(tariffs.electricity, self.feed_in * tariffs.feed_in)
    }
}

/// Up-front cost breakdown before tax and subsidies.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Investment {
    /// Panel hardware.
    pub panels: f64,
    /// Inverter hardware.
    pub inverter: f64,
    /// Labour and mounting.
    pub installation: f64,
}

impl Investment {
    /// Prices a system of `count` panels.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn compute(
        panel: &PanelSpec,
        count: usize,
        inverter: Option<&InverterSpec>,
        profile: &CountryProfile,
        material: RoofMaterial,
    ) -> Self {
        let kwp = system_size_kwp(panel.power_watts, count);
        Self {
            panels: panel.price * count as f64,
            // No inverter without panels
            inverter: if count == 0 {
                0.0
            } else {
                inverter.map_or(0.0, |i| i.price)
            },
            installation: kwp * profile.install_rate_per_kwp * material.multiplier(),
        }
    }

    /// Sum of all components.
    #[must_use]
    pub fn total(&self) -> f64 {
        self.panels + self.inverter + self.installation
    }
}

/// Subsidy for a system of `kwp` under `scheme`.
#[must_use]
pub fn subsidies(kwp: f64, scheme: &SubsidyScheme) -> f64 {
    scheme.amount(kwp)
}

/// Investment after VAT (if any) minus subsidies.
#[must_use]
pub fn net_investment(investment: f64, vat_rate: Option<f64>, subsidies: f64) -> f64 {
    investment * (1.0 + vat_rate.unwrap_or(0.0)) - subsidies
}

/// Simple payback period.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "years", rename_all = "snake_case")]
pub enum Payback {
    /// Years until the net investment is recovered.
    Years(f64),
    /// The system never pays back (no positive yield).
    NotApplicable,
}

impl Payback {
    /// Computes `net / yield`, or `NotApplicable` when the yield is not positive.
    #[must_use]
    pub fn compute(net_investment: f64, annual_yield: f64) -> Self {
        if annual_yield.is_nan() || annual_yield <= 0.0 || !net_investment.is_finite() {
            return Self::NotApplicable;
        }
        Self::Years(net_investment.max(0.0) / annual_yield)
    }

    /// Payback years, if defined.
    #[must_use]
    pub const fn years(self) -> Option<f64> {
        match self {
            Self::Years(y) => Some(y),
            Self::NotApplicable => None,
        }
    }
}

impl fmt::Display for Payback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Years(y) => write!(f, "{y:.1}"),
            Self::NotApplicable => f.write_str("N/A"),
        }
    }
}

/// CO₂ avoided per year (kg).
#[must_use]
pub fn co2_savings_kg(production_kwh: f64) -> f64 {
    production_kwh.max(0.0) * GRID_DISPLACEMENT_KG_PER_KWH
}
