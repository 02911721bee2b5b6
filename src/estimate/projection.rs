//! Multi-year cash-flow projection and CSV export.

use serde::{Deserialize, Serialize};

use crate::estimate::EstimateError;

/// Default system lifetime (years).
pub const DEFAULT_LIFETIME_YEARS: u32 = 25;

/// Annual production loss from panel ageing.
pub const ANNUAL_DEGRADATION: f64 = 0.005;

/// Inputs for [`project_cash_flow`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectionInputs {
    /// Investment after VAT and subsidies.
    pub net_investment: f64,
    /// Production in the first year (kWh).
    pub first_year_production_kwh: f64,
    /// Savings and revenue in the first year.
    pub first_year_yield: f64,
    /// Years to project.
    pub lifetime_years: u32,
    /// Fractional production loss per year.
    pub degradation: f64,
}

/// One projected year.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YearProjection {
    /// Year number, starting at 1.
    pub year: u32,
    /// Production this year (kWh).
    pub production_kwh: f64,
    /// Savings and revenue this year.
    pub annual_yield: f64,
    /// Nominal cumulative cash flow at the end of the year.
    pub cumulative_cash_flow: f64,
}

/// Year-by-year cash flow over the system lifetime.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CashFlowProjection {
    /// Projected years in order.
    pub years: Vec<YearProjection>,
    /// First year whose cumulative cash flow is non-negative.
    pub break_even_year: Option<u32>,
}

/// Projects undiscounted cash flow with linear-compounded degradation.
///
/// The cumulative flow starts at `-net_investment`; year `n` earns the first
/// year's yield scaled by `(1 - degradation)^(n-1)`.
#[must_use]
pub fn project_cash_flow(inputs: &ProjectionInputs) -> CashFlowProjection {
    let retain = 1.0 - inputs.degradation.clamp(0.0, 1.0);
    let mut factor = 1.0;
    let mut cumulative = -inputs.net_investment;
    let mut break_even_year = None;
    let mut years = Vec::with_capacity(inputs.lifetime_years as usize);

    for year in 1..=inputs.lifetime_years {
        let annual_yield = inputs.first_year_yield * factor;
        cumulative += annual_yield;
        if break_even_year.is_none() && cumulative >= 0.0 {
            break_even_year = Some(year);
        }
        years.push(YearProjection {
            year,
            production_kwh: inputs.first_year_production_kwh * factor,
            annual_yield,
            cumulative_cash_flow: cumulative,
        });
        factor *= retain;
    }

    CashFlowProjection {
        years,
        break_even_year,
    }
}

impl CashFlowProjection {
    /// Cumulative cash flow at the end of the projection.
    #[must_use]
    pub fn final_cash_flow(&self) -> f64 {
        self.years.last().map_or(0.0, |y| y.cumulative_cash_flow)
    }

    /// Renders the projection as CSV with a header row.
    ///
    /// # Errors
    ///
    /// Returns an error if a record cannot be serialised.
    pub fn to_csv(&self) -> Result<String, EstimateError> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        for year in &self.years {
            writer.serialize(year)?;
        }
        writer.flush()?;
        let bytes = writer
            .into_inner()
            .map_err(|e| EstimateError::Io(e.into_error()))?;
        Ok(String::from_utf8(bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scenario() -> ProjectionInputs {
        ProjectionInputs {
            net_investment: 13_900.0,
            first_year_production_kwh: 9_500.0,
            first_year_yield: 1_510.5,
            lifetime_years: DEFAULT_LIFETIME_YEARS,
            degradation: ANNUAL_DEGRADATION,
        }
    }

    #[test]
    fn break_even_in_year_ten() {
        // Nine degraded years earn about 13 326, ten about 14 770
        let projection = project_cash_flow(&scenario());
        assert_eq!(projection.years.len(), 25);
        assert_eq!(projection.break_even_year, Some(10));
        assert!(projection.years[8].cumulative_cash_flow < 0.0);
        assert!(projection.years[9].cumulative_cash_flow >= 0.0);
    }

    #[test]
    fn production_degrades() {
        let projection = project_cash_flow(&scenario());
        let first = projection.years[0].production_kwh;
        let second = projection.years[1].production_kwh;
        assert!((first - 9_500.0).abs() < 1e-9);
        assert!((second - 9_452.5).abs() < 1e-9);
        assert!(projection
            .years
            .windows(2)
            .all(|w| w[1].annual_yield < w[0].annual_yield));
    }

    #[test]
    fn no_yield_never_breaks_even() {
        let projection = project_cash_flow(&ProjectionInputs {
            first_year_yield: 0.0,
            ..scenario()
        });
        assert_eq!(projection.break_even_year, None);
        assert!((projection.final_cash_flow() + 13_900.0).abs() < 1e-9);
    }

    #[test]
    fn zero_lifetime_is_empty() {
        let projection = project_cash_flow(&ProjectionInputs {
            lifetime_years: 0,
            ..scenario()
        });
        assert!(projection.years.is_empty());
        assert!(projection.final_cash_flow().abs() < f64::EPSILON);
    }

    #[test]
    fn csv_has_header_and_rows() {
        let csv = project_cash_flow(&scenario()).to_csv().unwrap();
        let mut lines = csv.lines();
        assert_eq!(
            lines.next(),
            Some("year,productionKwh,annualYield,cumulativeCashFlow")
        );
        assert_eq!(lines.count(), 25);
        assert!(csv.contains("\n1,9500.0,1510.5,"));
    }
}
