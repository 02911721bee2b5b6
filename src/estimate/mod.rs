//! Yield and financial estimator.
//!
//! Every function here is pure: the same inputs always give the same
//! outputs, with no I/O and no hidden state. Degenerate inputs (zero panels,
//! zero yield) produce zero values or [`Payback::NotApplicable`] instead of
//! errors or non-finite numbers.
//!
//! # Modules
//!
//! - [`country`] - Per-market prices, VAT, subsidies and tariffs
//! - [`energy`] - Production, self consumption, investment, payback
//! - [`projection`] - 25-year cash flow and CSV export
//! - [`sizing`] - DC/AC ratio and inverter recommendation

pub mod country;
pub mod energy;
pub mod projection;
pub mod sizing;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::equipment::{InverterSpec, PanelSpec};

pub use country::{Country, CountryProfile, RoofMaterial, SubsidyScheme, Tariffs};
pub use energy::{
    annual_production, co2_savings_kg, net_investment, self_consumption_rate, subsidies,
    system_size_kwp, ConsumptionProfile, EnergySplit, Investment, Payback, SegmentProduction,
};
pub use projection::{
    project_cash_flow, CashFlowProjection, ProjectionInputs, YearProjection, ANNUAL_DEGRADATION,
    DEFAULT_LIFETIME_YEARS,
};
pub use sizing::{dc_ac_ratio, is_optimal, recommend_inverter};

/// Errors from exporting estimates.
#[derive(Debug, Error)]
pub enum EstimateError {
    /// CSV serialisation failed.
    #[error("CSV export failed: {0}")]
    Csv(#[from] csv::Error),

    /// Writing the export buffer failed.
    #[error("I/O error during export: {0}")]
    Io(#[from] std::io::Error),

    /// The export buffer was not valid UTF-8.
    #[error("export is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Everything needed to price one system.
#[derive(Debug, Clone, PartialEq)]
pub struct QuoteInputs {
    /// Country profile with tariffs already resolved.
    pub profile: CountryProfile,
    /// Chosen panel model.
    pub panel: PanelSpec,
    /// Number of panels to install.
    pub panel_count: usize,
    /// Chosen inverter, if any.
    pub inverter: Option<InverterSpec>,
    /// Per-segment production shares.
    pub segments: Vec<SegmentProduction>,
    /// Household consumption.
    pub consumption: ConsumptionProfile,
    /// Roof covering.
    pub roof_material: RoofMaterial,
    /// Whether VAT is charged on the investment.
    pub apply_vat: bool,
    /// Projection length.
    pub lifetime_years: u32,
}

/// Full financial picture of one quote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteEstimate {
    /// ISO 4217 currency of all money values.
    pub currency: String,
    /// Installed DC power.
    pub system_size_kwp: f64,
    /// Self-consumption rate used.
    pub self_consumption_rate: f64,
    /// Energy flows in the first year.
    pub energy: EnergySplit,
    /// Cost breakdown.
    pub investment: Investment,
    /// Gross investment including VAT where applicable.
    pub gross_investment: f64,
    /// Subsidy total.
    pub subsidies: f64,
    /// Gross investment minus subsidies.
    pub net_investment: f64,
    /// First-year savings and revenue.
    pub annual_yield: f64,
    /// Simple payback period.
    pub payback: Payback,
    /// Avoided emissions per year (kg CO₂).
    pub co2_savings_kg: f64,
    /// DC/AC ratio of the chosen inverter.
    pub dc_ac_ratio: Option<f64>,
    /// Lifetime cash-flow projection.
    pub projection: CashFlowProjection,
}

impl QuoteEstimate {
    /// Computes the estimate.
    #[must_use]
    pub fn compute(inputs: &QuoteInputs) -> Self {
        let kwp = system_size_kwp(inputs.panel.power_watts, inputs.panel_count);
        let production = annual_production(&inputs.segments);
        let rate = self_consumption_rate(&inputs.consumption);
        let energy = EnergySplit::compute(production, rate, inputs.consumption.annual_kwh);

        let investment = Investment::compute(
            &inputs.panel,
            inputs.panel_count,
            inputs.inverter.as_ref(),
            &inputs.profile,
            inputs.roof_material,
        );
        let vat = inputs.apply_vat.then_some(inputs.profile.vat_rate);
        let subsidies = subsidies(kwp, &inputs.profile.subsidy);
        let gross_investment = net_investment(investment.total(), vat, 0.0);
        let net = gross_investment - subsidies;

        let annual_yield = energy.annual_yield(inputs.profile.tariffs);
        let projection = project_cash_flow(&ProjectionInputs {
            net_investment: net,
            first_year_production_kwh: production,
            first_year_yield: annual_yield,
            lifetime_years: inputs.lifetime_years,
            degradation: ANNUAL_DEGRADATION,
        });

        let estimate = Self {
            currency: inputs.profile.currency.to_string(),
            system_size_kwp: kwp,
            self_consumption_rate: rate,
            energy,
            investment,
            gross_investment,
            subsidies,
            net_investment: net,
            annual_yield,
            payback: Payback::compute(net, annual_yield),
            co2_savings_kg: co2_savings_kg(production),
            dc_ac_ratio: inputs
                .inverter
                .as_ref()
                .and_then(|inv| dc_ac_ratio(kwp, inv.power_kw)),
            projection,
        };

        tracing::debug!(
            kwp = estimate.system_size_kwp,
            production = estimate.energy.production,
            payback = %estimate.payback,
            "Computed quote estimate"
        );
        estimate
    }
}
