//! Session data, navigation and layout bookkeeping.

use serde::Serialize;

use crate::equipment::{InverterSpec, PanelSpec};
use crate::estimate::{
    ConsumptionProfile, Country, CountryProfile, QuoteEstimate, QuoteInputs, RoofMaterial,
    SegmentProduction, DEFAULT_LIFETIME_YEARS,
};
use crate::geometry::{
    area, centroid, overlaps_non_selected_segments, validate_for_save, Polygon, RestrictedArea,
};
use crate::layout::{layout_segments, LayoutOptions, LayoutResult, PanelSelection, RotationMode};
use crate::roof::{Building, RoofSegment};
use crate::services::{
    Catalog, ContractPayload, ContractRecord, Location, ReportPayload, SegmentUsage,
};
use crate::wizard::drawing::{DrawingState, DrawingTarget, DEFAULT_AUTO_CLOSE_M};
use crate::wizard::flow::{FlowConfig, FlowKind, Step};
use crate::wizard::operations::{OperationTracker, SessionError};
use crate::wizard::otp::{is_valid_code_format, OtpChallenge};
use crate::wizard::{Acknowledgments, Consents, FieldErrors, PersonalInfo, WizardError};

/// Annual yield assumed for hand-drawn roofs (kWh per m²).
pub const CUSTOM_ROOF_YIELD_KWH_PER_M2: f64 = 150.0;

/// Default annual household consumption (kWh).
pub const DEFAULT_CONSUMPTION_KWH: f64 = 4_500.0;

/// Inputs that stay fixed for the lifetime of a session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionSettings {
    /// Market, with tariffs resolved.
    pub profile: CountryProfile,
    /// Layout tuning.
    pub layout: LayoutOptions,
    /// Snap distance for closing drawn polygons (m).
    pub auto_close_m: f64,
    /// Consumption preset for a new session (kWh/yr).
    pub default_consumption_kwh: f64,
    /// Projection length (years).
    pub lifetime_years: u32,
}

impl SessionSettings {
    /// Defaults for `country`.
    #[must_use]
    pub fn for_country(country: Country) -> Self {
        Self {
            profile: country.profile(),
            layout: LayoutOptions::default(),
            auto_close_m: DEFAULT_AUTO_CLOSE_M,
            default_consumption_kwh: DEFAULT_CONSUMPTION_KWH,
            lifetime_years: DEFAULT_LIFETIME_YEARS,
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self::for_country(Country::default())
    }
}

/// Everything entered and derived during one quote.
///
/// The selected panel count never exceeds the layout maximum: every change
/// to segments, panel model, rotation or restricted areas recomputes the
/// layout and re-clamps the selection.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WizardSession {
    #[serde(skip)]
    settings: SessionSettings,
    #[serde(skip)]
    flow: FlowConfig,
    step_index: usize,

    /// Chosen address.
    pub address: Option<Location>,
    building: Option<Building>,
    /// Set when the building lookup found nothing.
    pub building_missing: bool,
    selected_segments: Vec<String>,
    restricted_areas: Vec<RestrictedArea>,
    /// Active drawing.
    pub drawing: DrawingState,
    custom_roofs: usize,

    catalog: Option<Catalog>,
    panel: Option<PanelSpec>,
    /// Chosen inverter.
    pub inverter: Option<InverterSpec>,
    rotation: RotationMode,
    layout: LayoutResult,
    selection: PanelSelection,

    /// Household consumption.
    pub consumption: ConsumptionProfile,
    /// Roof covering.
    pub roof_material: RoofMaterial,
    /// Whether VAT is charged.
    pub apply_vat: bool,

    /// Contact details.
    pub personal: PersonalInfo,
    /// Consents given.
    pub consents: Consents,
    /// Acknowledgments for signing.
    pub acknowledgments: Acknowledgments,
    /// Created contract.
    pub contract: Option<ContractRecord>,
    /// Outstanding signature code.
    pub signature: Option<OtpChallenge>,
    /// Signed contract PDF once signing completed.
    pub signed_pdf_url: Option<String>,

    #[serde(skip)]
    pub(crate) operations: OperationTracker,
    /// Last failed operation.
    pub error: Option<SessionError>,
}

impl WizardSession {
    /// Creates an empty session at the first step.
    #[must_use]
    pub fn new(kind: FlowKind, settings: SessionSettings) -> Self {
        Self {
            settings,
            flow: FlowConfig::for_kind(kind),
            step_index: 0,
            address: None,
            building: None,
            building_missing: false,
            selected_segments: Vec::new(),
            restricted_areas: Vec::new(),
            drawing: DrawingState::Idle,
            custom_roofs: 0,
            catalog: None,
            panel: None,
            inverter: None,
            rotation: RotationMode::default(),
            layout: LayoutResult::default(),
            selection: PanelSelection::default(),
            consumption: ConsumptionProfile::basic(settings.default_consumption_kwh),
            roof_material: RoofMaterial::default(),
            apply_vat: false,
            personal: PersonalInfo::default(),
            consents: Consents::empty(),
            acknowledgments: Acknowledgments::empty(),
            contract: None,
            signature: None,
            signed_pdf_url: None,
            operations: OperationTracker::new(),
            error: None,
        }
    }

    // Navigation

    /// Flow configuration.
    #[must_use]
    pub const fn flow(&self) -> FlowConfig {
        self.flow
    }

    /// Session settings.
    #[must_use]
    pub const fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    /// Zero-based index of the current step.
    #[must_use]
    pub const fn step_index(&self) -> usize {
        self.step_index
    }

    /// Current step.
    #[must_use]
    pub fn current_step(&self) -> Step {
        self.flow.step(self.step_index).unwrap_or(Step::Address)
    }

    /// Returns `true` on the terminal step.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.step_index == self.flow.terminal_index()
    }

    /// Validates the current step and advances.
    ///
    /// # Errors
    ///
    /// Returns [`WizardError::Validation`] with the failing fields, or
    /// [`WizardError::AtTerminalStep`] on the last step.
    pub fn next_step(&mut self) -> Result<Step, WizardError> {
        if self.is_complete() {
            return Err(WizardError::AtTerminalStep);
        }
        let step = self.current_step();
        let errors = self.validate_step(step);
        if !errors.is_empty() {
            return Err(WizardError::Validation { step, errors });
        }
        self.step_index += 1;
        let entered = self.current_step();
        tracing::info!(from = %step, to = %entered, "Advanced wizard step");
        Ok(entered)
    }

    /// Moves back one step; stays on the first step.
    pub fn prev_step(&mut self) -> Step {
        self.step_index = self.step_index.saturating_sub(1);
        self.current_step()
    }

    /// Jumps to `index` without validation.
    ///
    /// # Errors
    ///
    /// Returns [`WizardError::StepOutOfRange`] for an index past the end.
    pub fn go_to_step(&mut self, index: usize) -> Result<Step, WizardError> {
        if index >= self.flow.len() {
            return Err(WizardError::StepOutOfRange {
                index,
                len: self.flow.len(),
            });
        }
        self.step_index = index;
        Ok(self.current_step())
    }

    /// Records a completed signature and jumps to the terminal step.
    pub fn complete_signature(&mut self, signed_pdf_url: Option<String>) -> Step {
        self.signed_pdf_url = Some(signed_pdf_url.unwrap_or_default());
        self.signature = None;
        self.step_index = self.flow.terminal_index();
        tracing::info!("Signature completed");
        self.current_step()
    }

    /// Returns to the initial empty state.
    ///
    /// In-flight operations are invalidated, so their late results are
    /// dropped.
    pub fn reset(&mut self) {
        let mut operations = std::mem::take(&mut self.operations);
        operations.invalidate();
        *self = Self::new(self.flow.kind(), self.settings);
        self.operations = operations;
        tracing::info!("Session reset");
    }

    /// Field errors for `step` (empty when it may be left).
    #[must_use]
    pub fn validate_step(&self, step: Step) -> FieldErrors {
        let mut errors = FieldErrors::new();
        match step {
            Step::Address => {
                if self.address.is_none() {
                    errors.add("address", "Select an address from the search results");
                }
            }
            Step::Roof => {
                if self.selected_segments.is_empty() {
                    errors.add("segments", "Select at least one roof area");
                } else if self.panel.is_some() && self.layout.is_empty() {
                    errors.add("segments", "No panels fit on the selected roof areas");
                }
            }
            Step::Equipment => {
                if self.panel.is_none() {
                    errors.add("panel", "Choose a panel model");
                } else if self.selection.requested() == 0 {
                    errors.add("panelCount", "No panels fit on the selected roof areas");
                }
            }
            Step::Consumption => {
                let kwh = self.consumption.annual_kwh;
                if !(kwh.is_finite() && kwh > 0.0) {
                    errors.add("annualConsumption", "Enter your annual consumption");
                }
            }
            Step::PersonalInfo => errors = self.personal.validate(),
            Step::Consents => {
                if !self.consents.contains(Consents::REQUIRED) {
                    errors.add("consents", "Accept the terms and the privacy policy");
                }
                if !self.acknowledgments.is_all() {
                    errors.add("acknowledgments", "Confirm all acknowledgments");
                }
            }
            Step::Signature => {
                if self.signed_pdf_url.is_none() {
                    errors.add("otp", "Enter the code sent to your phone");
                }
            }
            Step::Estimate | Step::Confirmation | Step::Results => {}
        }
        errors
    }

    /// Chooses an address. A different address drops the loaded building
    /// together with its segment selection.
    pub fn set_address(&mut self, location: Location) {
        if self.address.as_ref() == Some(&location) {
            return;
        }
        tracing::info!(address = %location.label, "Address selected");
        self.address = Some(location);
        if self.building.take().is_some() {
            self.selected_segments.clear();
            self.recompute_layout();
        }
        self.building_missing = false;
    }

    // Roof and layout

    /// Loaded building.
    #[must_use]
    pub const fn building(&self) -> Option<&Building> {
        self.building.as_ref()
    }

    /// Stores a lookup result.
    ///
    /// A different building clears the segment selection; restricted areas
    /// are kept.
    pub fn set_building(&mut self, building: Option<Building>) {
        self.building_missing = building.is_none();
        if self.building != building {
            self.selected_segments.clear();
            self.building = building;
            self.recompute_layout();
        }
    }

    /// Ids of the selected segments, in selection order.
    #[must_use]
    pub fn selected_segments(&self) -> &[String] {
        &self.selected_segments
    }

    /// Selects or deselects a segment. Returns `true` if it is now selected.
    ///
    /// # Errors
    ///
    /// Returns [`WizardError::UnknownSegment`] if the id is not on the building.
    pub fn toggle_segment(&mut self, id: &str) -> Result<bool, WizardError> {
        if self.segment(id).is_none() {
            return Err(WizardError::UnknownSegment(id.to_string()));
        }
        let selected = if let Some(pos) = self.selected_segments.iter().position(|s| s == id) {
            self.selected_segments.remove(pos);
            false
        } else {
            self.selected_segments.push(id.to_string());
            true
        };
        self.recompute_layout();
        Ok(selected)
    }

    /// Restricted areas.
    #[must_use]
    pub fn restricted_areas(&self) -> &[RestrictedArea] {
        &self.restricted_areas
    }

    /// Adds a restricted area and returns its id.
    ///
    /// # Errors
    ///
    /// Returns [`WizardError::Geometry`] if the outline has too few points,
    /// crossing edges or no area. Nothing is stored in that case.
    pub fn add_restricted_area(&mut self, polygon: Polygon) -> Result<String, WizardError> {
        validate_for_save(&polygon)?;
        Ok(self.push_restricted_area(polygon))
    }

    fn push_restricted_area(&mut self, polygon: Polygon) -> String {
        let zone = RestrictedArea::new(polygon);
        let id = zone.id.clone();
        tracing::debug!(id = %id, area = zone.area_m2, "Added restricted area");
        self.restricted_areas.push(zone);
        self.recompute_layout();
        id
    }

    /// Removes a restricted area. Returns `true` if it existed.
    pub fn remove_restricted_area(&mut self, id: &str) -> bool {
        let before = self.restricted_areas.len();
        self.restricted_areas.retain(|z| z.id != id);
        let removed = self.restricted_areas.len() != before;
        if removed {
            self.recompute_layout();
        }
        removed
    }

    /// Restricted areas that overlap roof segments which are not selected.
    #[must_use]
    pub fn restriction_warnings(&self) -> Vec<&RestrictedArea> {
        let Some(building) = &self.building else {
            return Vec::new();
        };
        let others: Vec<&Polygon> = building
            .roof_segments
            .iter()
            .filter(|s| !self.selected_segments.contains(&s.id))
            .map(|s| &s.polygon)
            .collect();
        overlaps_non_selected_segments(&self.restricted_areas, &others)
    }

    /// Takes a committed drawing into the session.
    ///
    /// A restriction becomes a restricted area; a roof outline becomes a
    /// selected custom segment. Returns the new id. The outline was checked
    /// when the drawing was finished.
    pub fn commit_drawing(&mut self) -> Option<String> {
        let (target, polygon) = self.drawing.take_committed()?;
        Some(match target {
            DrawingTarget::Restriction => self.push_restricted_area(polygon),
            DrawingTarget::Roof => self.add_custom_roof(polygon),
        })
    }

    fn add_custom_roof(&mut self, polygon: Polygon) -> String {
        self.custom_roofs += 1;
        let id = format!("custom-{}", self.custom_roofs);
        let area_m2 = area(&polygon);
        let segment = RoofSegment {
            id: id.clone(),
            tilt_deg: 0.0,
            azimuth_deg: 180.0,
            area_m2,
            suitability: 3,
            electricity_yield_kwh: area_m2 * CUSTOM_ROOF_YIELD_KWH_PER_M2,
            polygon,
        };
        let building = self.building.get_or_insert_with(|| Building {
            center: centroid(&segment.polygon),
            roof_segments: Vec::new(),
        });
        building.roof_segments.push(segment);
        self.building_missing = false;
        self.selected_segments.push(id.clone());
        self.recompute_layout();
        id
    }

    fn segment(&self, id: &str) -> Option<&RoofSegment> {
        self.building.as_ref().and_then(|b| b.segment(id))
    }

    /// Current layout.
    #[must_use]
    pub const fn layout(&self) -> &LayoutResult {
        &self.layout
    }

    /// Current rotation policy.
    #[must_use]
    pub const fn rotation(&self) -> RotationMode {
        self.rotation
    }

    /// Changes the rotation policy.
    pub fn set_rotation(&mut self, rotation: RotationMode) {
        self.rotation = rotation;
        self.recompute_layout();
    }

    // Equipment

    /// Loaded catalog.
    #[must_use]
    pub const fn catalog(&self) -> Option<&Catalog> {
        self.catalog.as_ref()
    }

    /// Stores the catalog and preselects the first panel if none is chosen.
    pub fn set_catalog(&mut self, catalog: Catalog) {
        let first = catalog.panels.first().cloned();
        self.catalog = Some(catalog);
        if self.panel.is_none() {
            if let Some(panel) = first {
                if let Err(e) = self.set_panel(panel) {
                    tracing::warn!(error = %e, "Catalog panel has invalid dimensions");
                }
            }
        }
    }

    /// Chosen panel.
    #[must_use]
    pub const fn panel(&self) -> Option<&PanelSpec> {
        self.panel.as_ref()
    }

    /// Chooses a panel model; the count snaps to the new maximum.
    ///
    /// # Errors
    ///
    /// Returns an error if the panel dimensions are not positive.
    pub fn set_panel(&mut self, panel: PanelSpec) -> Result<(), WizardError> {
        panel.footprint()?;
        self.panel = Some(panel);
        let max = self.compute_layout();
        self.selection.change_panel_type(max);
        Ok(())
    }

    /// Panel count and maximum.
    #[must_use]
    pub const fn selection(&self) -> PanelSelection {
        self.selection
    }

    /// Requests a panel count; returns the count kept after clamping.
    pub fn set_panel_count(&mut self, count: usize) -> usize {
        self.selection.set_requested(count)
    }

    fn compute_layout(&mut self) -> usize {
        let footprint = self.panel.as_ref().and_then(|p| p.footprint().ok());
        self.layout = match (footprint, &self.building) {
            (Some(footprint), Some(building)) => {
                let segments: Vec<&RoofSegment> = self
                    .selected_segments
                    .iter()
                    .filter_map(|id| building.segment(id))
                    .collect();
                layout_segments(
                    &segments,
                    footprint,
                    self.rotation,
                    &self.restricted_areas,
                    &self.settings.layout,
                )
            }
            _ => LayoutResult::default(),
        };
        self.layout.max_count()
    }

    fn recompute_layout(&mut self) {
        let max = self.compute_layout();
        self.selection.update_max(max);
    }

    // Estimate and payloads

    /// Production share of each selected segment at the current count.
    #[must_use]
    pub fn segment_production(&self) -> Vec<SegmentProduction> {
        self.layout
            .usage(self.selection.requested())
            .into_iter()
            .filter_map(|(id, used, max)| {
                self.segment(id).map(|s| SegmentProduction {
                    yield_kwh: s.electricity_yield_kwh,
                    used,
                    max,
                })
            })
            .collect()
    }

    /// Estimator inputs, once a panel is chosen.
    #[must_use]
    pub fn quote_inputs(&self) -> Option<QuoteInputs> {
        let panel = self.panel.clone()?;
        Some(QuoteInputs {
            profile: self.settings.profile,
            panel,
            panel_count: self.selection.requested(),
            inverter: self.inverter.clone(),
            segments: self.segment_production(),
            consumption: self.consumption,
            roof_material: self.roof_material,
            apply_vat: self.apply_vat,
            lifetime_years: self.settings.lifetime_years,
        })
    }

    /// Current estimate, once a panel is chosen.
    #[must_use]
    pub fn estimate(&self) -> Option<QuoteEstimate> {
        self.quote_inputs().map(|inputs| QuoteEstimate::compute(&inputs))
    }

    /// Payload for contract creation.
    ///
    /// # Errors
    ///
    /// Returns a precondition error if address or panel is missing.
    pub fn contract_payload(&self) -> Result<ContractPayload, WizardError> {
        let address = self
            .address
            .clone()
            .ok_or_else(|| WizardError::precondition("no address selected"))?;
        let estimate = self
            .estimate()
            .ok_or_else(|| WizardError::precondition("no panel selected"))?;
        let panel_id = self.panel.as_ref().map(|p| p.id.clone()).unwrap_or_default();
        Ok(ContractPayload {
            customer: self.personal.clone(),
            address,
            country: self.settings.profile.country,
            panel_id,
            panel_count: self.selection.requested(),
            inverter_id: self.inverter.as_ref().map(|i| i.id.clone()),
            estimate,
        })
    }

    /// Payload for report generation, with an optional PNG map capture.
    ///
    /// # Errors
    ///
    /// Returns a precondition error if address or panel is missing, or an
    /// export error if the cash-flow CSV cannot be written.
    pub fn report_payload(&self, map_png: Option<&[u8]>) -> Result<ReportPayload, WizardError> {
        let address = self
            .address
            .clone()
            .ok_or_else(|| WizardError::precondition("no address selected"))?;
        let panel = self
            .panel
            .clone()
            .ok_or_else(|| WizardError::precondition("no panel selected"))?;
        let estimate = self
            .estimate()
            .ok_or_else(|| WizardError::precondition("no panel selected"))?;
        let cash_flow_csv = estimate.projection.to_csv()?;
        let segments = self
            .layout
            .usage(self.selection.requested())
            .into_iter()
            .map(|(id, used, max)| SegmentUsage {
                segment_id: id.to_string(),
                used,
                max,
            })
            .collect();

        let payload = ReportPayload {
            address,
            country: self.settings.profile.country,
            panel,
            panel_count: self.selection.requested(),
            inverter: self.inverter.clone(),
            segments,
            estimate,
            cash_flow_csv,
            map_image: None,
        };
        Ok(match map_png {
            Some(png) => payload.with_map_image(png),
            None => payload,
        })
    }

    /// Returns `true` if `code` could be submitted now.
    #[must_use]
    pub fn can_submit_code(&self, code: &str) -> bool {
        self.signature.is_some() && is_valid_code_format(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{GeoPoint, GeometryError, LocalFrame, PlanarPoint};
    use crate::wizard::drawing::PointOutcome;

    const ORIGIN: GeoPoint = GeoPoint::new(46.95, 7.44);

    fn rect(cx: f64, cy: f64, width: f64, height: f64) -> Polygon {
        let f = LocalFrame::new(ORIGIN);
        let (hw, hh) = (width / 2.0, height / 2.0);
        Polygon::new(vec![
            f.to_geo(PlanarPoint::new(cx - hw, cy - hh)),
            f.to_geo(PlanarPoint::new(cx + hw, cy - hh)),
            f.to_geo(PlanarPoint::new(cx + hw, cy + hh)),
            f.to_geo(PlanarPoint::new(cx - hw, cy + hh)),
        ])
    }

    fn segment(id: &str, polygon: Polygon) -> RoofSegment {
        RoofSegment {
            id: id.to_string(),
            area_m2: area(&polygon),
            polygon,
            tilt_deg: 30.0,
            azimuth_deg: 180.0,
            suitability: 1,
            electricity_yield_kwh: 6_000.0,
        }
    }

    fn building() -> Building {
        Building {
            center: ORIGIN,
            roof_segments: vec![
                segment("south", rect(0.0, 0.0, 8.0, 5.0)),
                segment("north", rect(0.0, 10.0, 12.0, 6.0)),
            ],
        }
    }

    fn panel(id: &str, width: f64, height: f64) -> PanelSpec {
        PanelSpec {
            id: id.to_string(),
            power_watts: 400.0,
            width_m: width,
            height_m: height,
            efficiency_percent: 21.0,
            price: 220.0,
            manufacturer: "Acme".to_string(),
        }
    }

    fn session() -> WizardSession {
        let mut s = WizardSession::new(FlowKind::Contract, SessionSettings::default());
        s.set_building(Some(building()));
        s
    }

    fn assert_clamped(s: &WizardSession) {
        let sel = s.selection();
        assert!(sel.requested() <= sel.max(), "{sel:?}");
        assert_eq!(sel.max(), s.layout().max_count());
    }

    #[test]
    fn next_step_blocked_by_validation() {
        let mut s = WizardSession::new(FlowKind::Contract, SessionSettings::default());
        let Err(WizardError::Validation { step, errors }) = s.next_step() else {
            panic!("expected validation error");
        };
        assert_eq!(step, Step::Address);
        assert!(errors.get("address").is_some());
        assert_eq!(s.current_step(), Step::Address);
    }

    #[test]
    fn back_and_go_to_are_unconditional() {
        let mut s = WizardSession::new(FlowKind::Report, SessionSettings::default());
        assert_eq!(s.prev_step(), Step::Address);
        assert_eq!(s.go_to_step(4).unwrap(), Step::Estimate);
        assert_eq!(s.prev_step(), Step::Consumption);
        assert!(matches!(
            s.go_to_step(7),
            Err(WizardError::StepOutOfRange { index: 7, len: 7 })
        ));
    }

    #[test]
    fn terminal_step_has_no_next() {
        let mut s = WizardSession::new(FlowKind::Contract, SessionSettings::default());
        s.go_to_step(s.flow().terminal_index()).unwrap();
        assert!(matches!(s.next_step(), Err(WizardError::AtTerminalStep)));
    }

    #[test]
    fn complete_signature_jumps_to_confirmation() {
        let mut s = WizardSession::new(FlowKind::Contract, SessionSettings::default());
        s.go_to_step(2).unwrap();
        let step = s.complete_signature(Some("https://files.invalid/x.pdf".to_string()));
        assert_eq!(step, Step::Confirmation);
        assert!(s.is_complete());
    }

    #[test]
    fn selecting_segments_grows_and_snaps_count() {
        let mut s = session();
        s.set_panel(panel("p", 1.7, 1.0)).unwrap();
        assert_eq!(s.selection().max(), 0);

        assert!(s.toggle_segment("south").unwrap());
        let south_only = s.selection().max();
        assert_eq!(south_only, 16);
        assert_eq!(s.selection().requested(), 16);

        s.set_panel_count(5);
        s.toggle_segment("north").unwrap();
        assert!(s.selection().max() > south_only);
        assert_eq!(s.selection().requested(), s.selection().max(), "snapped");
        assert_clamped(&s);
    }

    #[test]
    fn deselecting_clamps() {
        let mut s = session();
        s.set_panel(panel("p", 1.7, 1.0)).unwrap();
        s.toggle_segment("south").unwrap();
        s.toggle_segment("north").unwrap();
        s.toggle_segment("north").unwrap();
        assert_eq!(s.selection().requested(), 16);
        assert_clamped(&s);
    }

    #[test]
    fn unknown_segment_is_rejected() {
        let mut s = session();
        assert!(matches!(
            s.toggle_segment("east"),
            Err(WizardError::UnknownSegment(_))
        ));
    }

    #[test]
    fn panel_change_snaps_to_new_max() {
        let mut s = session();
        s.set_panel(panel("p", 1.7, 1.0)).unwrap();
        s.toggle_segment("south").unwrap();
        s.set_panel_count(3);
        s.set_panel(panel("small", 1.0, 1.0)).unwrap();
        assert_eq!(s.selection().requested(), s.selection().max());
        assert!(s.selection().max() > 16);
    }

    #[test]
    fn invalid_panel_is_rejected() {
        let mut s = session();
        assert!(matches!(
            s.set_panel(panel("bad", -1.0, 1.0)),
            Err(WizardError::Geometry(_))
        ));
        assert!(s.panel().is_none());
    }

    #[test]
    fn full_cover_restriction_blocks_roof_step() {
        let mut s = session();
        s.set_panel(panel("p", 1.7, 1.0)).unwrap();
        s.toggle_segment("south").unwrap();
        let id = s.add_restricted_area(rect(0.0, 0.0, 10.0, 7.0)).unwrap();
        assert_eq!(s.selection().max(), 0);
        assert_eq!(s.selection().requested(), 0);
        assert!(s.validate_step(Step::Roof).get("segments").is_some());
        assert!(s.validate_step(Step::Equipment).get("panelCount").is_some());

        assert!(s.remove_restricted_area(&id));
        assert_eq!(s.selection().max(), 16);
        assert!(!s.remove_restricted_area(&id));
    }

    #[test]
    fn clamp_invariant_over_edit_sequence() {
        let mut s = session();
        s.set_panel(panel("p", 1.7, 1.0)).unwrap();
        s.toggle_segment("north").unwrap();
        assert_clamped(&s);
        s.set_panel_count(7);
        let zone = s.add_restricted_area(rect(0.0, 10.0, 4.0, 3.0)).unwrap();
        assert_clamped(&s);
        s.toggle_segment("south").unwrap();
        assert_clamped(&s);
        s.set_panel(panel("wide", 2.2, 1.1)).unwrap();
        assert_clamped(&s);
        s.set_rotation(RotationMode::Fixed(33.0));
        assert_clamped(&s);
        s.remove_restricted_area(&zone);
        assert_clamped(&s);
        s.set_panel_count(1_000);
        assert_clamped(&s);
        s.toggle_segment("north").unwrap();
        assert_clamped(&s);
    }

    #[test]
    fn crossing_restriction_is_not_stored() {
        let mut s = session();
        s.set_panel(panel("p", 1.7, 1.0)).unwrap();
        s.toggle_segment("south").unwrap();
        let max = s.selection().max();

        let f = LocalFrame::new(ORIGIN);
        let bowtie = Polygon::new(
            [(0.0, 0.0), (20.0, 20.0), (20.0, 0.0), (0.0, 20.0)]
                .into_iter()
                .map(|(x, y)| f.to_geo(PlanarPoint::new(x, y)))
                .collect(),
        );
        assert!(matches!(
            s.add_restricted_area(bowtie),
            Err(WizardError::Geometry(GeometryError::SelfIntersecting))
        ));
        assert!(matches!(
            s.add_restricted_area(Polygon::new(Vec::new())),
            Err(WizardError::Geometry(GeometryError::TooFewPoints { count: 0 }))
        ));
        assert!(s.restricted_areas().is_empty());
        assert_eq!(s.selection().max(), max);
    }

    #[test]
    fn restriction_on_unselected_segment_warns() {
        let mut s = session();
        s.toggle_segment("south").unwrap();
        s.add_restricted_area(rect(0.0, 10.0, 2.0, 2.0)).unwrap();
        assert_eq!(s.restriction_warnings().len(), 1);
        s.toggle_segment("north").unwrap();
        assert!(s.restriction_warnings().is_empty());
    }

    #[test]
    fn drawn_restriction_is_committed() {
        let mut s = session();
        let f = LocalFrame::new(ORIGIN);
        s.drawing.start(DrawingTarget::Restriction);
        for (x, y) in [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
            s.drawing
                .add_point(f.to_geo(PlanarPoint::new(x, y)), 0.5)
                .unwrap();
        }
        s.drawing.finish().unwrap();
        let id = s.commit_drawing().unwrap();
        assert_eq!(s.restricted_areas()[0].id, id);
        assert!(s.commit_drawing().is_none());
    }

    #[test]
    fn drawn_roof_becomes_selected_segment() {
        let mut s = WizardSession::new(FlowKind::Report, SessionSettings::default());
        s.set_building(None);
        assert!(s.building_missing);
        let f = LocalFrame::new(ORIGIN);
        s.drawing.start(DrawingTarget::Roof);
        for (x, y) in [(0.0, 0.0), (8.0, 0.0), (8.0, 5.0), (0.0, 5.0)] {
            s.drawing
                .add_point(f.to_geo(PlanarPoint::new(x, y)), 1.0)
                .unwrap();
        }
        let outcome = s
            .drawing
            .add_point(f.to_geo(PlanarPoint::new(0.2, 0.2)), 1.0)
            .unwrap();
        assert!(matches!(outcome, PointOutcome::Closed(_)));
        let id = s.commit_drawing().unwrap();
        assert_eq!(id, "custom-1");
        assert_eq!(s.selected_segments(), ["custom-1".to_string()]);
        assert!(!s.building_missing);
        s.set_panel(panel("p", 1.7, 1.0)).unwrap();
        assert_eq!(s.selection().max(), 16);
    }

    #[test]
    fn reset_restores_initial_state_and_invalidates() {
        let mut s = session();
        s.toggle_segment("south").unwrap();
        s.go_to_step(3).unwrap();
        let ticket = s
            .operations
            .begin(crate::wizard::Operation::LoadCatalog)
            .unwrap();
        s.reset();
        assert_eq!(s.current_step(), Step::Address);
        assert!(s.building().is_none());
        assert!(s.selected_segments().is_empty());
        assert!(!s.operations.finish(ticket));
    }

    #[test]
    fn estimate_follows_selection() {
        let mut s = session();
        s.set_panel(panel("p", 1.7, 1.0)).unwrap();
        s.toggle_segment("south").unwrap();
        let full = s.estimate().unwrap();
        assert!((full.energy.production - 6_000.0).abs() < 1e-9);
        assert!((full.system_size_kwp - 6.4).abs() < 1e-9);

        s.set_panel_count(8);
        let half = s.estimate().unwrap();
        assert!((half.energy.production - 3_000.0).abs() < 1e-9);
    }

    #[test]
    fn report_payload_requires_address() {
        let mut s = session();
        s.set_panel(panel("p", 1.7, 1.0)).unwrap();
        assert!(matches!(
            s.report_payload(None),
            Err(WizardError::Precondition(_))
        ));
        s.address = Some(Location {
            label: "Bundesplatz 3, Bern".to_string(),
            position: ORIGIN,
            lv95: None,
        });
        s.toggle_segment("south").unwrap();
        let payload = s.report_payload(Some(&[1, 2, 3])).unwrap();
        assert_eq!(payload.panel_count, 16);
        assert!(payload
            .map_image
            .as_deref()
            .unwrap()
            .starts_with("data:image/png;base64,"));
        assert!(payload.cash_flow_csv.starts_with("year,"));
    }
}
