//! Inverter sizing by DC/AC ratio.

use std::ops::RangeInclusive;

use crate::equipment::InverterSpec;

/// DC/AC ratios considered optimal.
pub const OPTIMAL_DC_AC: RangeInclusive<f64> = 1.2..=1.5;

/// Ratio targeted when no catalog entry is optimal.
pub const TARGET_DC_AC: f64 = 1.3;

/// Panel DC power over inverter AC power; `None` if the inverter has no rating.
#[must_use]
pub fn dc_ac_ratio(dc_kwp: f64, ac_kw: f64) -> Option<f64> {
    if ac_kw > 0.0 && dc_kwp.is_finite() {
        Some(dc_kwp / ac_kw)
    } else {
        None
    }
}

/// Returns `true` if the ratio lies in the optimal band.
#[must_use]
pub fn is_optimal(ratio: f64) -> bool {
    OPTIMAL_DC_AC.contains(&ratio)
}

/// Picks an inverter for `dc_kwp`.
///
/// Among inverters with an optimal ratio the cheapest wins. If none is
/// optimal, the one whose ratio is closest to [`TARGET_DC_AC`] is chosen.
#[must_use]
pub fn recommend_inverter(dc_kwp: f64, catalog: &[InverterSpec]) -> Option<&InverterSpec> {
    if dc_kwp <= 0.0 {
        return None;
    }
    let rated = || {
        catalog
            .iter()
            .filter_map(|inv| dc_ac_ratio(dc_kwp, inv.power_kw).map(|r| (inv, r)))
    };

    rated()
        .filter(|&(_, r)| is_optimal(r))
        .min_by(|a, b| a.0.price.total_cmp(&b.0.price))
        .or_else(|| {
            rated().min_by(|a, b| {
                (a.1 - TARGET_DC_AC)
                    .abs()
                    .total_cmp(&(b.1 - TARGET_DC_AC).abs())
            })
        })
        .map(|(inv, _)| inv)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inverter(id: &str, power_kw: f64, price: f64) -> InverterSpec {
        InverterSpec {
            id: id.to_string(),
            power_kw,
            efficiency_percent: 97.5,
            price,
            manufacturer: "Fronius".to_string(),
        }
    }

    #[test]
    fn ratio_guards_zero_rating() {
        assert_eq!(dc_ac_ratio(10.0, 0.0), None);
        assert!((dc_ac_ratio(10.0, 8.0).unwrap() - 1.25).abs() < 1e-12);
    }

    #[test]
    fn optimal_band_is_inclusive() {
        assert!(is_optimal(1.2));
        assert!(is_optimal(1.5));
        assert!(!is_optimal(1.1));
        assert!(!is_optimal(1.6));
    }

    #[test]
    fn cheapest_optimal_inverter_wins() {
        let catalog = [
            inverter("big", 10.0, 1_400.0),
            inverter("mid", 8.0, 1_600.0),
            inverter("small", 7.0, 1_200.0),
        ];
        // 10 kWp: mid = 1.25, small = 1.43 (both optimal), big = 1.0
        assert_eq!(recommend_inverter(10.0, &catalog).unwrap().id, "small");
    }

    #[test]
    fn falls_back_to_closest_ratio() {
        let catalog = [inverter("a", 3.0, 500.0), inverter("b", 12.0, 900.0)];
        // 10 kWp: a = 3.33, b = 0.83
        assert_eq!(recommend_inverter(10.0, &catalog).unwrap().id, "b");
    }

    #[test]
    fn empty_system_gets_no_inverter() {
        let catalog = [inverter("a", 5.0, 500.0)];
        assert!(recommend_inverter(0.0, &catalog).is_none());
        assert!(recommend_inverter(5.0, &[]).is_none());
    }
}
