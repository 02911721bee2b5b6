//! In-memory service backend with failure injection.
//!
//! Used by the integration tests and for running the wizard without a
//! network. Every call is counted; a failure can be queued per call kind and
//! is returned exactly once.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{Duration, Utc};

use crate::equipment::{InverterSpec, PanelSpec};
use crate::estimate::Country;
use crate::geometry::{wgs84_to_lv95, GeoPoint, Lv95};
use crate::roof::Building;
use crate::services::{
    BuildingQuery, BuildingService, Catalog, ContractPayload, ContractRecord, ContractService,
    EquipmentCatalog, GeocodingService, Location, ReportFile, ReportPayload, ReportService,
    ServiceError, SignatureRequest, SignatureVerification,
};
use crate::wizard::Acknowledgments;

/// Code accepted by [`FakeBackend::verify_signature`].
pub const FAKE_OTP: &str = "123456";

/// How long fake signature codes stay valid.
pub const FAKE_OTP_VALIDITY_SECS: i64 = 300;

/// Kinds of calls the fake tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FakeCall {
    /// [`BuildingService::building`].
    Building,
    /// [`GeocodingService::search_address`].
    SearchAddress,
    /// [`GeocodingService::to_lv95`].
    ToLv95,
    /// [`EquipmentCatalog::solar_panels`].
    SolarPanels,
    /// [`EquipmentCatalog::inverters`].
    Inverters,
    /// [`ContractService::create_from_calculator`].
    CreateContract,
    /// [`ContractService::initiate_signature`].
    InitiateSignature,
    /// [`ContractService::verify_signature`].
    VerifySignature,
    /// [`ContractService::download_url`].
    DownloadUrl,
    /// [`ReportService::download_report`].
    DownloadReport,
}

#[derive(Debug, Default)]
struct State {
    calls: HashMap<FakeCall, usize>,
    failures: HashMap<FakeCall, ServiceError>,
    contracts: Vec<ContractPayload>,
    reports: Vec<ReportPayload>,
}

/// Scripted in-memory backend.
#[derive(Debug, Default)]
pub struct FakeBackend {
    building: Option<Building>,
    locations: Vec<Location>,
    catalog: Catalog,
    state: Mutex<State>,
}

impl FakeBackend {
    /// Creates an empty backend: no building, no addresses, empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the building returned for every query.
    #[must_use]
    pub fn with_building(mut self, building: Building) -> Self {
        self.building = Some(building);
        self
    }

    /// Adds an address search hit.
    #[must_use]
    pub fn with_location(mut self, label: &str, position: GeoPoint) -> Self {
        self.locations.push(Location {
            label: label.to_string(),
            position,
            lv95: Some(wgs84_to_lv95(position)),
        });
        self
    }

    /// Sets the equipment catalog (the same for every country).
    #[must_use]
    pub fn with_catalog(mut self, panels: Vec<PanelSpec>, inverters: Vec<InverterSpec>) -> Self {
        self.catalog = Catalog { panels, inverters };
        self
    }

    /// Makes the next call of `call` fail with `error`.
    pub fn fail_next(&self, call: FakeCall, error: ServiceError) {
        self.lock().failures.insert(call, error);
    }

    /// Number of times `call` was made, including failed attempts.
    #[must_use]
    pub fn calls(&self, call: FakeCall) -> usize {
        self.lock().calls.get(&call).copied().unwrap_or(0)
    }

    /// Contract payloads received so far.
    #[must_use]
    pub fn contracts(&self) -> Vec<ContractPayload> {
        self.lock().contracts.clone()
    }

    /// Report payloads received so far.
    #[must_use]
    pub fn reports(&self) -> Vec<ReportPayload> {
        self.lock().reports.clone()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Records a call and returns the queued failure, if any.
    fn enter(&self, call: FakeCall) -> Result<(), ServiceError> {
        let mut state = self.lock();
        *state.calls.entry(call).or_default() += 1;
        state.failures.remove(&call).map_or(Ok(()), Err)
    }
}

impl BuildingService for FakeBackend {
    async fn building(&self, _query: &BuildingQuery) -> Result<Option<Building>, ServiceError> {
        self.enter(FakeCall::Building)?;
        Ok(self.building.clone())
    }
}

impl GeocodingService for FakeBackend {
    async fn search_address(&self, text: &str) -> Result<Vec<Location>, ServiceError> {
        self.enter(FakeCall::SearchAddress)?;
        let needle = text.trim().to_lowercase();
        Ok(self
            .locations
            .iter()
            .filter(|l| l.label.to_lowercase().contains(&needle))
            .cloned()
            .collect())
    }

    async fn to_lv95(&self, point: GeoPoint) -> Result<Lv95, ServiceError> {
        self.enter(FakeCall::ToLv95)?;
        Ok(wgs84_to_lv95(point))
    }
}

impl EquipmentCatalog for FakeBackend {
    async fn solar_panels(&self, _country: Country) -> Result<Vec<PanelSpec>, ServiceError> {
        self.enter(FakeCall::SolarPanels)?;
        Ok(self.catalog.panels.clone())
    }

    async fn inverters(&self, _country: Country) -> Result<Vec<InverterSpec>, ServiceError> {
        self.enter(FakeCall::Inverters)?;
        Ok(self.catalog.inverters.clone())
    }
}

impl ContractService for FakeBackend {
    async fn create_from_calculator(
        &self,
        payload: &ContractPayload,
    ) -> Result<ContractRecord, ServiceError> {
        self.enter(FakeCall::CreateContract)?;
        let mut state = self.lock();
        state.contracts.push(payload.clone());
        let n = state.contracts.len();
        Ok(ContractRecord {
            user_id: format!("user-{n}"),
            project_id: format!("project-{n}"),
            contract_id: format!("contract-{n}"),
            contract_number: format!("SQ-{n:05}"),
            pdf_url: format!("https://files.invalid/contract-{n}.pdf"),
        })
    }

    async fn initiate_signature(
        &self,
        contract_id: &str,
        _acknowledgments: Acknowledgments,
    ) -> Result<SignatureRequest, ServiceError> {
        self.enter(FakeCall::InitiateSignature)?;
        Ok(SignatureRequest {
            signature_request_id: format!("sig-{contract_id}"),
            masked_phone: "+41 ** *** ** 67".to_string(),
            expires_at: Utc::now() + Duration::seconds(FAKE_OTP_VALIDITY_SECS),
        })
    }

    async fn verify_signature(
        &self,
        contract_id: &str,
        otp: &str,
    ) -> Result<SignatureVerification, ServiceError> {
        self.enter(FakeCall::VerifySignature)?;
        let success = otp == FAKE_OTP;
        Ok(SignatureVerification {
            success,
            signed_pdf_url: success.then(|| format!("https://files.invalid/{contract_id}-signed.pdf")),
        })
    }

    async fn download_url(&self, contract_id: &str, signed: bool) -> Result<String, ServiceError> {
        self.enter(FakeCall::DownloadUrl)?;
        let suffix = if signed { "-signed" } else { "" };
        Ok(format!("https://files.invalid/{contract_id}{suffix}.pdf"))
    }
}

impl ReportService for FakeBackend {
    async fn download_report(&self, payload: &ReportPayload) -> Result<ReportFile, ServiceError> {
        self.enter(FakeCall::DownloadReport)?;
        self.lock().reports.push(payload.clone());
        Ok(ReportFile {
            file_name: "solar-report.pdf".to_string(),
            bytes: b"%PDF-1.7\n".to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn queued_failure_is_returned_once() {
        let fake = FakeBackend::new();
        fake.fail_next(FakeCall::SolarPanels, ServiceError::Timeout);
        assert_eq!(
            fake.solar_panels(Country::Switzerland).await,
            Err(ServiceError::Timeout)
        );
        assert!(fake.solar_panels(Country::Switzerland).await.is_ok());
        assert_eq!(fake.calls(FakeCall::SolarPanels), 2);
    }

    #[tokio::test]
    async fn search_filters_by_label() {
        let fake = FakeBackend::new()
            .with_location("Bundesplatz 3, Bern", GeoPoint::new(46.9466, 7.444))
            .with_location("Bahnhofstrasse 1, Zürich", GeoPoint::new(47.3769, 8.5417));
        let hits = fake.search_address("bern").await.unwrap();
        assert_eq!(hits.len(), 1);
        assert!(hits[0].lv95.is_some());
    }

    #[tokio::test]
    async fn otp_verification() {
        let fake = FakeBackend::new();
        let ok = fake.verify_signature("c1", FAKE_OTP).await.unwrap();
        assert!(ok.success && ok.signed_pdf_url.is_some());
        let bad = fake.verify_signature("c1", "000000").await.unwrap();
        assert!(!bad.success);
    }

    #[test]
    fn no_building_by_default() {
        let fake = FakeBackend::new();
        let query = BuildingQuery::Address {
            text: "nowhere".to_string(),
        };
        let result = tokio_test::block_on(fake.building(&query)).unwrap();
        assert!(result.is_none());
        assert_eq!(fake.calls(FakeCall::Building), 1);
    }
}
