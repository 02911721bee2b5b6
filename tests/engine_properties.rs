//! Boundary conditions and invariants of the geometry, layout and estimate
//! engines across many inputs.

use solar_quote_mcp::equipment::PanelSpec;
use solar_quote_mcp::estimate::{
    project_cash_flow, ConsumptionProfile, Country, EnergySplit, Payback, ProjectionInputs,
    QuoteEstimate, QuoteInputs, RoofMaterial, SegmentProduction,
};
use solar_quote_mcp::geometry::{
    area, contains_point, lv95_to_wgs84, perimeter, wgs84_to_lv95, GeoPoint, LocalFrame,
    PlanarPoint, Polygon, RestrictedArea,
};
use solar_quote_mcp::layout::{layout_segment, LayoutOptions, PanelFootprint};

const ORIGIN: GeoPoint = GeoPoint::new(46.95, 7.44);

fn planar_polygon(points: &[(f64, f64)]) -> Polygon {
    let f = LocalFrame::new(ORIGIN);
    Polygon::new(
        points
            .iter()
            .map(|&(x, y)| f.to_geo(PlanarPoint::new(x, y)))
            .collect(),
    )
}

fn rect(cx: f64, cy: f64, width: f64, height: f64) -> Polygon {
    let (hw, hh) = (width / 2.0, height / 2.0);
    planar_polygon(&[
        (cx - hw, cy - hh),
        (cx + hw, cy - hh),
        (cx + hw, cy + hh),
        (cx - hw, cy + hh),
    ])
}

// =============================================================================
// Coordinate Tests
// =============================================================================

#[test]
fn test_lv95_round_trip_across_switzerland() {
    for easting in (2_490_000..=2_830_000).step_by(34_000) {
        for northing in (1_080_000..=1_290_000).step_by(21_000) {
            let (e, n) = (f64::from(easting), f64::from(northing));
            let back = wgs84_to_lv95(lv95_to_wgs84(e, n));
            assert!((back.easting - e).abs() < 2.0, "{e} {n} -> {back:?}");
            assert!((back.northing - n).abs() < 2.0, "{e} {n} -> {back:?}");
        }
    }
}

#[test]
fn test_wgs84_results_stay_in_range() {
    let p = lv95_to_wgs84(2_600_000.0, 1_200_000.0);
    assert!((45.0..48.5).contains(&p.lat));
    assert!((5.5..11.0).contains(&p.lng));
}

// =============================================================================
// Polygon Metric Tests
// =============================================================================

#[test]
fn test_area_ignores_winding_and_start_vertex() {
    let corners = [(0.0, 0.0), (12.0, 0.0), (12.0, 7.0), (3.0, 9.0), (0.0, 6.0)];
    let base = area(&planar_polygon(&corners));
    for shift in 0..corners.len() {
        let mut rotated = corners.to_vec();
        rotated.rotate_left(shift);
        assert!((area(&planar_polygon(&rotated)) - base).abs() < 1e-3);
        rotated.reverse();
        assert!((area(&planar_polygon(&rotated)) - base).abs() < 1e-3);
    }
}

#[test]
fn test_metrics_scale_with_size() {
    for side in [1.0, 5.0, 25.0, 100.0] {
        let square = rect(0.0, 0.0, side, side);
        let a = area(&square);
        let p = perimeter(&square);
        assert!((a - side * side).abs() / (side * side) < 0.01, "area {a} for {side}");
        assert!((p - 4.0 * side).abs() / (4.0 * side) < 0.01, "perimeter {p} for {side}");
    }
}

#[test]
fn test_degenerate_polygons() {
    assert!(area(&Polygon::default()).abs() < f64::EPSILON);
    let two = planar_polygon(&[(0.0, 0.0), (10.0, 0.0)]);
    assert!(area(&two).abs() < f64::EPSILON);
    assert!(perimeter(&two).abs() < f64::EPSILON);
}

// =============================================================================
// Layout Tests
// =============================================================================

#[test]
fn test_placements_stay_inside_and_avoid_restrictions() {
    let roofs = [
        rect(0.0, 0.0, 8.0, 5.0),
        rect(0.0, 0.0, 15.0, 4.0),
        planar_polygon(&[(0.0, 0.0), (14.0, 0.0), (7.0, 8.0)]),
        planar_polygon(&[(0.0, 0.0), (10.0, 0.0), (10.0, 4.0), (4.0, 4.0), (4.0, 9.0), (0.0, 9.0)]),
    ];
    let restricted = [RestrictedArea::new(rect(2.0, 1.0, 1.0, 1.0))];
    let footprint = PanelFootprint::new(1.7, 1.0).unwrap();
    let options = LayoutOptions::default();

    for roof in &roofs {
        for rotation in [0.0, 17.0, 45.0, 90.0, 133.0] {
            let placements =
                layout_segment("roof", roof, footprint, rotation, &restricted, &options);
            #[allow(clippy::cast_precision_loss)]
            let covered = placements.len() as f64 * footprint.width_m * footprint.height_m;
            assert!(covered <= area(roof) + 1e-6, "overfilled at {rotation}°");

            for p in &placements {
                assert!(p.corners.iter().all(|c| contains_point(roof, *c)));
                assert!(!p
                    .corners
                    .iter()
                    .any(|c| contains_point(&restricted[0].polygon, *c)));
            }
            assert!(
                placements.windows(2).all(|w| w[0].distance_m <= w[1].distance_m),
                "placements sorted by distance to the centre"
            );
        }
    }
}

#[test]
fn test_panel_larger_than_roof() {
    let roof = rect(0.0, 0.0, 1.5, 0.8);
    let footprint = PanelFootprint::new(1.7, 1.0).unwrap();
    let placements = layout_segment("tiny", &roof, footprint, 0.0, &[], &LayoutOptions::default());
    assert!(placements.is_empty());
}

#[test]
fn test_invalid_footprints_are_rejected() {
    for (w, h) in [(0.0, 1.0), (1.0, -1.0), (f64::NAN, 1.0), (1.0, f64::INFINITY)] {
        assert!(PanelFootprint::new(w, h).is_err(), "{w} x {h}");
    }
}

// =============================================================================
// Estimate Tests
// =============================================================================

fn panel() -> PanelSpec {
    PanelSpec {
        id: "p400".to_string(),
        power_watts: 400.0,
        width_m: 1.7,
        height_m: 1.0,
        efficiency_percent: 21.5,
        price: 250.0,
        manufacturer: "Acme".to_string(),
    }
}

fn inputs(country: Country, count: usize, yield_kwh: f64) -> QuoteInputs {
    QuoteInputs {
        profile: country.profile(),
        panel: panel(),
        panel_count: count,
        inverter: None,
        segments: vec![SegmentProduction {
            yield_kwh,
            used: count,
            max: count.max(1),
        }],
        consumption: ConsumptionProfile::basic(4_500.0),
        roof_material: RoofMaterial::Tile,
        apply_vat: true,
        lifetime_years: 25,
    }
}

#[test]
fn test_estimate_is_finite_for_every_country() {
    for country in [Country::Switzerland, Country::Germany, Country::Austria] {
        for count in [0, 1, 10, 40] {
            let estimate = QuoteEstimate::compute(&inputs(country, count, 6_000.0));
            for value in [
                estimate.system_size_kwp,
                estimate.gross_investment,
                estimate.subsidies,
                estimate.net_investment,
                estimate.annual_yield,
                estimate.co2_savings_kg,
            ] {
                assert!(value.is_finite(), "{country:?} x {count}");
            }
            assert!(estimate.subsidies >= 0.0);
            assert_eq!(estimate.projection.years.len(), 25);
        }
    }
}

#[test]
fn test_zero_yield_never_pays_back() {
    let estimate = QuoteEstimate::compute(&inputs(Country::Germany, 10, 0.0));
    assert_eq!(estimate.payback, Payback::NotApplicable);
    assert_eq!(estimate.projection.break_even_year, None);
}

#[test]
fn test_energy_split_balances() {
    for (production, rate, consumption) in [
        (10_000.0, 0.3, 4_500.0),
        (2_000.0, 0.9, 8_000.0),
        (10_000.0, 1.4, 3_000.0),
        (0.0, 0.3, 4_500.0),
    ] {
        let split = EnergySplit::compute(production, rate, consumption);
        assert!((split.self_consumed + split.feed_in - split.production).abs() < 1e-9);
        assert!(split.self_consumed <= consumption + 1e-9);
        assert!(split.feed_in >= 0.0);
        assert!(split.grid_purchase >= 0.0);
    }
}

#[test]
fn test_break_even_matches_cumulative_sign() {
    let projection = project_cash_flow(&ProjectionInputs {
        net_investment: 12_000.0,
        first_year_production_kwh: 7_000.0,
        first_year_yield: 1_300.0,
        lifetime_years: 25,
        degradation: 0.005,
    });
    let year = projection.break_even_year.unwrap();
    for y in &projection.years {
        assert_eq!(y.cumulative_cash_flow >= 0.0, y.year >= year, "year {}", y.year);
    }
    assert!(projection
        .years
        .windows(2)
        .all(|w| w[1].annual_yield <= w[0].annual_yield));
}
