//! Wire formats of the remote services and their mapping into domain types.
//!
//! Mapping is mostly renaming. Roof segments are checked on the way in: the
//! suitability class must be in range and the outline must be a simple ring
//! with an area, since layout and report code rely on both.

use serde::{Deserialize, Serialize};

use crate::equipment::{InverterSpec, PanelSpec};
use crate::geometry::{validate_for_save, GeoPoint, Lv95, Polygon};
use crate::roof::{Building, RoofSegment, SUITABILITY_RANGE};
use crate::services::{Location, ServiceError};

/// Panel as listed by `/equipment/solar-panels`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PanelDto {
    /// Catalog id.
    pub id: String,
    /// Nameplate power (W).
    pub power: f64,
    /// Width (m).
    pub width: f64,
    /// Height (m).
    pub height: f64,
    /// Efficiency (%).
    pub efficiency: f64,
    /// Unit price.
    pub price: f64,
    /// Manufacturer.
    #[serde(default)]
    pub manufacturer: String,
}

impl From<PanelDto> for PanelSpec {
    fn from(dto: PanelDto) -> Self {
        Self {
            id: dto.id,
            power_watts: dto.power,
            width_m: dto.width,
            height_m: dto.height,
            efficiency_percent: dto.efficiency,
            price: dto.price,
            manufacturer: dto.manufacturer,
        }
    }
}

/// Inverter as listed by `/equipment/inverters`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InverterDto {
    /// Catalog id.
    pub id: String,
    /// Rated AC power (kW).
    pub power: f64,
    /// Efficiency (%).
    pub efficiency: f64,
    /// Unit price.
    pub price: f64,
    /// Manufacturer.
    #[serde(default)]
    pub manufacturer: String,
}

impl From<InverterDto> for InverterSpec {
    fn from(dto: InverterDto) -> Self {
        Self {
            id: dto.id,
            power_kw: dto.power,
            efficiency_percent: dto.efficiency,
            price: dto.price,
            manufacturer: dto.manufacturer,
        }
    }
}

/// A `{lat, lon}` pair as sent by the building service.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLonDto {
    /// Latitude.
    pub lat: f64,
    /// Longitude.
    pub lon: f64,
}

impl From<LatLonDto> for GeoPoint {
    fn from(dto: LatLonDto) -> Self {
        Self::new(dto.lat, dto.lon)
    }
}

/// Roof segment as sent by the building service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoofSegmentDto {
    /// Segment id.
    pub id: String,
    /// Outline.
    pub coordinates: Vec<LatLonDto>,
    /// Tilt (degrees).
    pub tilt: f64,
    /// Azimuth (degrees, 0 = north).
    pub azimuth: f64,
    /// Area (m²).
    pub area: f64,
    /// Suitability class.
    pub suitability: u8,
    /// Annual yield if fully covered (kWh).
    pub electricity_yield: f64,
}

impl TryFrom<RoofSegmentDto> for RoofSegment {
    type Error = ServiceError;

    fn try_from(dto: RoofSegmentDto) -> Result<Self, Self::Error> {
        if !SUITABILITY_RANGE.contains(&dto.suitability) {
            return Err(ServiceError::decode(format!(
                "roof segment {} has suitability {} outside 1..=5",
                dto.id, dto.suitability
            )));
        }
        let polygon = Polygon::new(dto.coordinates.into_iter().map(GeoPoint::from).collect());
        validate_for_save(&polygon).map_err(|e| {
            ServiceError::decode(format!("roof segment {} has an invalid outline: {e}", dto.id))
        })?;
        Ok(Self {
            id: dto.id,
            polygon,
            tilt_deg: dto.tilt,
            azimuth_deg: dto.azimuth,
            area_m2: dto.area,
            suitability: dto.suitability,
            electricity_yield_kwh: dto.electricity_yield,
        })
    }
}

/// Building as sent by the building service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildingDto {
    /// Map centre.
    pub center: LatLonDto,
    /// Roof facets.
    pub roof_segments: Vec<RoofSegmentDto>,
}

impl TryFrom<BuildingDto> for Building {
    type Error = ServiceError;

    fn try_from(dto: BuildingDto) -> Result<Self, Self::Error> {
        let roof_segments = dto
            .roof_segments
            .into_iter()
            .map(RoofSegment::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            center: dto.center.into(),
            roof_segments,
        })
    }
}

/// Address search hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationDto {
    /// Display label.
    pub label: String,
    /// Latitude.
    pub lat: f64,
    /// Longitude.
    pub lon: f64,
    /// LV95 easting, when supplied.
    #[serde(default)]
    pub x: Option<f64>,
    /// LV95 northing, when supplied.
    #[serde(default)]
    pub y: Option<f64>,
}

impl From<LocationDto> for Location {
    fn from(dto: LocationDto) -> Self {
        Self {
            label: dto.label,
            position: GeoPoint::new(dto.lat, dto.lon),
            lv95: dto.x.zip(dto.y).map(|(e, n)| Lv95::new(e, n)),
        }
    }
}

/// `{x, y}` answer of the LV95 conversion endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Lv95Dto {
    /// Easting.
    pub x: f64,
    /// Northing.
    pub y: f64,
}

impl From<Lv95Dto> for Lv95 {
    fn from(dto: Lv95Dto) -> Self {
        Self::new(dto.x, dto.y)
    }
}

/// `{url}` answer of the download endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadUrlDto {
    /// Download URL.
    pub url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn building_from_wire_json() {
        let json = r#"{
            "center": {"lat": 46.95, "lon": 7.44},
            "roofSegments": [{
                "id": "seg-1",
                "coordinates": [
                    {"lat": 46.95, "lon": 7.44},
                    {"lat": 46.9501, "lon": 7.44},
                    {"lat": 46.9501, "lon": 7.4401},
                    {"lat": 46.95, "lon": 7.44}
                ],
                "tilt": 30.0,
                "azimuth": 180.0,
                "area": 40.0,
                "suitability": 2,
                "electricityYield": 6200.0
            }]
        }"#;
        let dto: BuildingDto = serde_json::from_str(json).unwrap();
        let building = Building::try_from(dto).unwrap();
        assert_eq!(building.roof_segments.len(), 1);
        let seg = &building.roof_segments[0];
        assert_eq!(seg.polygon.len(), 3, "closing vertex is dropped");
        assert!((seg.electricity_yield_kwh - 6_200.0).abs() < f64::EPSILON);
    }

    #[test]
    fn rejects_out_of_range_suitability() {
        let dto = RoofSegmentDto {
            id: "bad".to_string(),
            coordinates: Vec::new(),
            tilt: 0.0,
            azimuth: 0.0,
            area: 0.0,
            suitability: 9,
            electricity_yield: 0.0,
        };
        assert!(matches!(
            RoofSegment::try_from(dto),
            Err(ServiceError::Decode { .. })
        ));
    }

    #[test]
    fn rejects_unusable_outlines() {
        let segment = |coordinates: Vec<(f64, f64)>| RoofSegmentDto {
            id: "seg".to_string(),
            coordinates: coordinates
                .into_iter()
                .map(|(lat, lon)| LatLonDto { lat, lon })
                .collect(),
            tilt: 30.0,
            azimuth: 180.0,
            area: 40.0,
            suitability: 2,
            electricity_yield: 5_000.0,
        };

        let bowtie = segment(vec![
            (46.95, 7.44),
            (46.9502, 7.4403),
            (46.95, 7.4403),
            (46.9502, 7.44),
        ]);
        let collinear = segment(vec![(46.95, 7.44), (46.9501, 7.44), (46.9502, 7.44)]);
        for dto in [bowtie, collinear, segment(Vec::new())] {
            let err = RoofSegment::try_from(dto).unwrap_err();
            assert!(matches!(err, ServiceError::Decode { .. }), "{err:?}");
            assert!(err.to_string().contains("seg"), "{err}");
        }
    }

    #[test]
    fn panel_mapping_renames_fields() {
        let dto: PanelDto = serde_json::from_str(
            r#"{"id":"p1","power":410,"width":1.72,"height":1.13,"efficiency":21.3,"price":199}"#,
        )
        .unwrap();
        let panel = PanelSpec::from(dto);
        assert!((panel.power_watts - 410.0).abs() < f64::EPSILON);
        assert!((panel.width_m - 1.72).abs() < f64::EPSILON);
        assert!(panel.manufacturer.is_empty());
    }

    #[test]
    fn location_with_and_without_lv95() {
        let with: LocationDto = serde_json::from_str(
            r#"{"label":"Bundesplatz 3, Bern","lat":46.9466,"lon":7.4440,"x":2600421.0,"y":1199611.0}"#,
        )
        .unwrap();
        assert!(Location::from(with).lv95.is_some());

        let without: LocationDto =
            serde_json::from_str(r#"{"label":"Bern","lat":46.95,"lon":7.44}"#).unwrap();
        assert!(Location::from(without).lv95.is_none());
    }
}
