//! External service contracts.
//!
//! The quoting engine consumes five remote services: building data,
//! geocoding, the equipment catalog, contracts and signatures, and report
//! generation. Each is a trait so the wizard can run against the real
//! [`http::HttpBackend`] or the in-memory [`fake::FakeBackend`].
//!
//! Traits return `impl Future + Send` so they can be used generically
//! without boxing.
//!
//! These services are a library surface. The MCP server exposes only the
//! offline geometry, layout and estimate tools, so nothing in the binary
//! constructs a backend.

pub mod dto;
pub mod fake;
pub mod http;

use std::future::Future;

use base64::Engine as _;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::equipment::{InverterSpec, PanelSpec};
use crate::estimate::{Country, QuoteEstimate};
use crate::geometry::{GeoPoint, Lv95};
use crate::roof::Building;
use crate::wizard::{Acknowledgments, PersonalInfo};

/// Errors raised by service calls.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    /// The request could not be sent or the connection failed.
    #[error("network error: {message}")]
    Network {
        /// Transport error description.
        message: String,
    },

    /// The request took longer than the configured timeout.
    #[error("request timed out")]
    Timeout,

    /// The server answered with a non-success status.
    #[error("service returned HTTP {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body or reason phrase.
        message: String,
    },

    /// The response body did not match the expected shape.
    #[error("invalid response: {message}")]
    Decode {
        /// Decoder error description.
        message: String,
    },

    /// The server rejected the request on business grounds.
    #[error("request rejected: {message}")]
    Rejected {
        /// Reason given by the server.
        message: String,
    },

    /// The service is not configured.
    #[error("service not configured: {message}")]
    NotConfigured {
        /// What is missing.
        message: String,
    },
}

impl ServiceError {
    /// Creates a decode error.
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// Creates a rejection.
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected {
            message: message.into(),
        }
    }

    /// Returns `true` for transient failures (network, timeout, 5xx, 429).
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        match self {
            Self::Network { .. } | Self::Timeout => true,
            Self::Status { status, .. } => *status >= 500 || *status == 429,
            Self::Decode { .. } | Self::Rejected { .. } | Self::NotConfigured { .. } => false,
        }
    }
}

/// A geocoded address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    /// Display label.
    pub label: String,
    /// WGS84 position.
    pub position: GeoPoint,
    /// Swiss grid position, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lv95: Option<Lv95>,
}

/// How a building is looked up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BuildingQuery {
    /// By Swiss grid coordinate.
    Lv95 {
        /// Coordinate of a point on the building.
        position: Lv95,
    },
    /// By free-text address.
    Address {
        /// Address text.
        text: String,
    },
}

/// Panels and inverters available in one market.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    /// Panel models.
    pub panels: Vec<PanelSpec>,
    /// Inverter models.
    pub inverters: Vec<InverterSpec>,
}

/// Data sent when creating a contract from the calculator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractPayload {
    /// Customer details.
    pub customer: PersonalInfo,
    /// Installation address.
    pub address: Location,
    /// Market.
    pub country: Country,
    /// Chosen panel id.
    pub panel_id: String,
    /// Number of panels.
    pub panel_count: usize,
    /// Chosen inverter id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inverter_id: Option<String>,
    /// Financial estimate shown to the customer.
    pub estimate: QuoteEstimate,
}

/// A created contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractRecord {
    /// Customer account id.
    pub user_id: String,
    /// Project id.
    pub project_id: String,
    /// Contract id used by the signature endpoints.
    pub contract_id: String,
    /// Human-readable contract number.
    pub contract_number: String,
    /// Unsigned contract PDF.
    pub pdf_url: String,
}

/// A started signature: a code was sent to the customer's phone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureRequest {
    /// Request id.
    pub signature_request_id: String,
    /// Phone number with most digits hidden.
    pub masked_phone: String,
    /// Server-side expiry of the code.
    pub expires_at: DateTime<Utc>,
}

/// Outcome of submitting a signature code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureVerification {
    /// Whether the code was accepted.
    pub success: bool,
    /// Signed contract PDF, on success.
    #[serde(default)]
    pub signed_pdf_url: Option<String>,
}

/// Snapshot of a finished quote sent to the report service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportPayload {
    /// Installation address.
    pub address: Location,
    /// Market.
    pub country: Country,
    /// Panel model.
    pub panel: PanelSpec,
    /// Number of panels.
    pub panel_count: usize,
    /// Inverter model.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inverter: Option<InverterSpec>,
    /// `(segment id, used, max)` per selected segment.
    pub segments: Vec<SegmentUsage>,
    /// Financial estimate.
    pub estimate: QuoteEstimate,
    /// Cash-flow projection as CSV.
    pub cash_flow_csv: String,
    /// Captured map as a `data:image/png;base64,...` URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub map_image: Option<String>,
}

impl ReportPayload {
    /// Attaches a PNG map capture as a data URL.
    #[must_use]
    pub fn with_map_image(mut self, png: &[u8]) -> Self {
        self.map_image = Some(png_data_url(png));
        self
    }
}

/// Panel usage on one roof segment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentUsage {
    /// Segment id.
    pub segment_id: String,
    /// Panels placed.
    pub used: usize,
    /// Panels that fit.
    pub max: usize,
}

/// A generated report file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportFile {
    /// Suggested file name.
    pub file_name: String,
    /// File content.
    pub bytes: Vec<u8>,
}

/// Encodes PNG bytes as a data URL.
#[must_use]
pub fn png_data_url(png: &[u8]) -> String {
    format!(
        "data:image/png;base64,{}",
        base64::engine::general_purpose::STANDARD.encode(png)
    )
}

/// Building and roof data.
pub trait BuildingService {
    /// Looks up a building. `Ok(None)` means no building was found.
    fn building(
        &self,
        query: &BuildingQuery,
    ) -> impl Future<Output = Result<Option<Building>, ServiceError>> + Send;
}

/// Address search and coordinate conversion.
pub trait GeocodingService {
    /// Searches for addresses matching `text`.
    fn search_address(
        &self,
        text: &str,
    ) -> impl Future<Output = Result<Vec<Location>, ServiceError>> + Send;

    /// Converts a WGS84 point to LV95.
    fn to_lv95(&self, point: GeoPoint) -> impl Future<Output = Result<Lv95, ServiceError>> + Send;
}

/// Equipment catalog for one market.
pub trait EquipmentCatalog {
    /// Panel models sold in `country`.
    fn solar_panels(
        &self,
        country: Country,
    ) -> impl Future<Output = Result<Vec<PanelSpec>, ServiceError>> + Send;

    /// Inverter models sold in `country`.
    fn inverters(
        &self,
        country: Country,
    ) -> impl Future<Output = Result<Vec<InverterSpec>, ServiceError>> + Send;
}

/// Contract creation and electronic signature.
pub trait ContractService {
    /// Creates customer, project and contract in one call.
    fn create_from_calculator(
        &self,
        payload: &ContractPayload,
    ) -> impl Future<Output = Result<ContractRecord, ServiceError>> + Send;

    /// Sends a one-time code to the customer.
    fn initiate_signature(
        &self,
        contract_id: &str,
        acknowledgments: Acknowledgments,
    ) -> impl Future<Output = Result<SignatureRequest, ServiceError>> + Send;

    /// Submits the one-time code.
    fn verify_signature(
        &self,
        contract_id: &str,
        otp: &str,
    ) -> impl Future<Output = Result<SignatureVerification, ServiceError>> + Send;

    /// Returns a download URL for the contract PDF.
    fn download_url(
        &self,
        contract_id: &str,
        signed: bool,
    ) -> impl Future<Output = Result<String, ServiceError>> + Send;
}

/// Report generation.
pub trait ReportService {
    /// Renders the report for a finished quote.
    fn download_report(
        &self,
        payload: &ReportPayload,
    ) -> impl Future<Output = Result<ReportFile, ServiceError>> + Send;
}

/// All services the wizard needs.
pub trait Backend:
    BuildingService + GeocodingService + EquipmentCatalog + ContractService + ReportService
{
}

impl<T> Backend for T where
    T: BuildingService + GeocodingService + EquipmentCatalog + ContractService + ReportService
{
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_errors() {
        assert!(ServiceError::Timeout.is_transient());
        assert!(ServiceError::Status {
            status: 503,
            message: String::new()
        }
        .is_transient());
        assert!(!ServiceError::Status {
            status: 404,
            message: String::new()
        }
        .is_transient());
        assert!(!ServiceError::rejected("no").is_transient());
    }

    #[test]
    fn data_url_prefix() {
        let url = png_data_url(&[0x89, b'P', b'N', b'G']);
        assert_eq!(url, "data:image/png;base64,iVBORw==");
    }

    #[test]
    fn building_query_json() {
        let q = BuildingQuery::Lv95 {
            position: Lv95::new(2_600_000.0, 1_200_000.0),
        };
        let json = serde_json::to_value(&q).unwrap();
        assert_eq!(json["kind"], "lv95");
        assert_eq!(json["position"]["easting"], 2_600_000.0);
    }
}
