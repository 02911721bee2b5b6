//! Equipment catalog entries: solar panels and inverters.

use serde::{Deserialize, Serialize};

use crate::geometry::GeometryError;
use crate::layout::PanelFootprint;

/// A solar panel model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PanelSpec {
    /// Catalog identifier.
    pub id: String,

    /// Nameplate power (W).
    pub power_watts: f64,

    /// Physical width (m).
    pub width_m: f64,

    /// Physical height (m).
    pub height_m: f64,

    /// Module efficiency (%).
    pub efficiency_percent: f64,

    /// Unit price in the catalog currency.
    pub price: f64,

    /// Manufacturer name.
    pub manufacturer: String,
}

impl PanelSpec {
    /// Returns the footprint used by the layout engine.
    ///
    /// # Errors
    ///
    /// Returns an error if either dimension is not positive and finite.
    pub fn footprint(&self) -> Result<PanelFootprint, GeometryError> {
        PanelFootprint::new(self.width_m, self.height_m)
    }

    /// Panel area (m²).
    #[must_use]
    pub fn area_m2(&self) -> f64 {
        self.width_m * self.height_m
    }
}

/// An inverter model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InverterSpec {
    /// Catalog identifier.
    pub id: String,

    /// Rated AC power (kW).
    pub power_kw: f64,

    /// Conversion efficiency (%).
    pub efficiency_percent: f64,

    /// Unit price in the catalog currency.
    pub price: f64,

    /// Manufacturer name.
    pub manufacturer: String,
}
