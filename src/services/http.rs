//! `reqwest` implementation of the service traits.

use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::ServicesConfig;
use crate::equipment::{InverterSpec, PanelSpec};
use crate::estimate::Country;
use crate::geometry::{GeoPoint, Lv95};
use crate::roof::Building;
use crate::services::dto::{
    BuildingDto, DownloadUrlDto, InverterDto, LocationDto, Lv95Dto, PanelDto,
};
use crate::services::{
    BuildingQuery, BuildingService, ContractPayload, ContractRecord, ContractService,
    EquipmentCatalog, GeocodingService, Location, ReportFile, ReportPayload, ReportService,
    ServiceError, SignatureRequest, SignatureVerification,
};
use crate::wizard::Acknowledgments;

/// User agent sent with every request.
const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Longest error body kept in [`ServiceError::Status`].
const MAX_ERROR_BODY: usize = 512;

/// HTTP client for the quoting backend.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: String,
}

impl HttpBackend {
    /// Creates a client for `base_url` with a per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is not http(s) or the client cannot be
    /// built.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ServiceError> {
        let base_url = base_url.trim_end_matches('/');
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ServiceError::NotConfigured {
                message: format!("base URL must start with http:// or https://, got '{base_url}'"),
            });
        }
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(map_reqwest_error)?;
        Ok(Self {
            client,
            base_url: base_url.to_string(),
        })
    }

    /// Creates a client from the `services` config section.
    ///
    /// # Errors
    ///
    /// Returns an error if no base URL is configured or it is invalid.
    pub fn from_config(config: &ServicesConfig) -> Result<Self, ServiceError> {
        let base_url = config
            .base_url
            .as_deref()
            .ok_or_else(|| ServiceError::NotConfigured {
                message: "services.base_url is not set".to_string(),
            })?;
        Self::new(base_url, Duration::from_secs(config.timeout_secs))
    }

    /// Base URL without a trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ServiceError> {
        let request = self.client.get(self.url(path)).query(query);
        decode(send(request).await?).await
    }

    async fn post_json<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ServiceError> {
        let request = self.client.post(self.url(path)).json(body);
        decode(send(request).await?).await
    }
}

async fn send(request: RequestBuilder) -> Result<Response, ServiceError> {
    let response = request.send().await.map_err(map_reqwest_error)?;
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    tracing::warn!(status = status.as_u16(), "Service call failed");
    Err(ServiceError::Status {
        status: status.as_u16(),
        message: truncate_body(&body, status.canonical_reason().unwrap_or("error")),
    })
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ServiceError> {
    response.json::<T>().await.map_err(map_reqwest_error)
}

fn map_reqwest_error(error: reqwest::Error) -> ServiceError {
    if error.is_timeout() {
        ServiceError::Timeout
    } else if error.is_decode() {
        ServiceError::decode(error.to_string())
    } else {
        ServiceError::Network {
            message: error.to_string(),
        }
    }
}

/// Keeps error bodies short; falls back to the reason phrase when empty.
fn truncate_body(body: &str, reason: &str) -> String {
    let body = body.trim();
    if body.is_empty() {
        return reason.to_string();
    }
    match body.char_indices().nth(MAX_ERROR_BODY) {
        Some((cut, _)) => format!("{}...", &body[..cut]),
        None => body.to_string(),
    }
}

impl BuildingService for HttpBackend {
    async fn building(&self, query: &BuildingQuery) -> Result<Option<Building>, ServiceError> {
        let params = match query {
            BuildingQuery::Lv95 { position } => vec![
                ("x", position.easting.to_string()),
                ("y", position.northing.to_string()),
            ],
            BuildingQuery::Address { text } => vec![("address", text.clone())],
        };
        tracing::info!(?query, "Fetching building data");
        match self.get_json::<BuildingDto>("buildings", &params).await {
            Ok(dto) => Building::try_from(dto).map(Some),
            Err(ServiceError::Status { status: 404, .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

impl GeocodingService for HttpBackend {
    async fn search_address(&self, text: &str) -> Result<Vec<Location>, ServiceError> {
        let hits: Vec<LocationDto> = self
            .get_json("geocode/search", &[("text", text.to_string())])
            .await?;
        Ok(hits.into_iter().map(Location::from).collect())
    }

    async fn to_lv95(&self, point: GeoPoint) -> Result<Lv95, ServiceError> {
        let dto: Lv95Dto = self
            .get_json(
                "geocode/lv95",
                &[("lat", point.lat.to_string()), ("lon", point.lng.to_string())],
            )
            .await?;
        Ok(dto.into())
    }
}

impl EquipmentCatalog for HttpBackend {
    async fn solar_panels(&self, country: Country) -> Result<Vec<PanelSpec>, ServiceError> {
        let panels: Vec<PanelDto> = self
            .get_json("equipment/solar-panels", &[("country", country.code().to_string())])
            .await?;
        Ok(panels.into_iter().map(PanelSpec::from).collect())
    }

    async fn inverters(&self, country: Country) -> Result<Vec<InverterSpec>, ServiceError> {
        let inverters: Vec<InverterDto> = self
            .get_json("equipment/inverters", &[("country", country.code().to_string())])
            .await?;
        Ok(inverters.into_iter().map(InverterSpec::from).collect())
    }
}

impl ContractService for HttpBackend {
    async fn create_from_calculator(
        &self,
        payload: &ContractPayload,
    ) -> Result<ContractRecord, ServiceError> {
        tracing::info!(panels = payload.panel_count, "Creating contract");
        self.post_json("contracts/from-calculator", payload).await
    }

    async fn initiate_signature(
        &self,
        contract_id: &str,
        acknowledgments: Acknowledgments,
    ) -> Result<SignatureRequest, ServiceError> {
        let body = serde_json::json!({ "acknowledgments": acknowledgments });
        self.post_json(&format!("contracts/{contract_id}/signature"), &body)
            .await
    }

    async fn verify_signature(
        &self,
        contract_id: &str,
        otp: &str,
    ) -> Result<SignatureVerification, ServiceError> {
        let body = serde_json::json!({ "otp": otp });
        self.post_json(&format!("contracts/{contract_id}/signature/verify"), &body)
            .await
    }

    async fn download_url(&self, contract_id: &str, signed: bool) -> Result<String, ServiceError> {
        let dto: DownloadUrlDto = self
            .get_json(
                &format!("contracts/{contract_id}/download"),
                &[("signed", signed.to_string())],
            )
            .await?;
        Ok(dto.url)
    }
}

impl ReportService for HttpBackend {
    async fn download_report(&self, payload: &ReportPayload) -> Result<ReportFile, ServiceError> {
        let request = self.client.post(self.url("reports/sonnendach")).json(payload);
        let response = send(request).await?;
        let bytes = response.bytes().await.map_err(map_reqwest_error)?;
        Ok(ReportFile {
            file_name: format!("solar-report-{}.pdf", payload.country.code().to_lowercase()),
            bytes: bytes.to_vec(),
        })
    }
}
