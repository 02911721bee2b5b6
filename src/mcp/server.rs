//! MCP server exposing the quoting engine as tools.
//!
//! This module implements the MCP server lifecycle:
//!
//! 1. **Initialisation**: Capability negotiation and version agreement
//! 2. **Operation**: Handling tool calls and other requests
//! 3. **Shutdown**: End of input or SIGINT/SIGTERM
//!
//! All tools are stateless computations: coordinate conversion, polygon
//! metrics, panel layout, rotation search and the financial estimate.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::io::{AsyncBufRead, AsyncWrite};

use crate::equipment::{InverterSpec, PanelSpec};
use crate::estimate::{
    ConsumptionProfile, Country, QuoteEstimate, QuoteInputs, RoofMaterial, SegmentProduction,
};
use crate::geometry::{
    area, centroid, lv95_to_wgs84, perimeter, planar_area, self_intersects, validate_for_save,
    wgs84_to_lv95, GeoPoint, Lv95, Polygon, RestrictedArea,
};
use crate::layout::{
    layout_segments, longest_edge_rotation, optimize_rotation, LayoutOptions, PanelFootprint,
    PanelSelection, RotationMode,
};
use crate::mcp::protocol::{
    parse_message, ErrorCode, IncomingMessage, JsonRpcError, JsonRpcErrorData,
    JsonRpcNotification, JsonRpcRequest, JsonRpcResponse, RequestId, ToolCallParams,
    ToolCallResult, ToolDefinition, MCP_PROTOCOL_VERSION, SERVER_NAME,
};
use crate::mcp::transport::{LineTransport, StdioTransport};
use crate::roof::RoofSegment;
use crate::wizard::SessionSettings;

/// Server state in the MCP lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    /// Waiting for initialize request.
    AwaitingInit,
    /// Initialize received, waiting for initialized notification.
    Initialising,
    /// Ready for normal operation.
    Running,
    /// Shutdown in progress.
    ShuttingDown,
}

/// Client information received during initialisation.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientInfo {
    /// Client name.
    pub name: String,
    /// Client version.
    #[serde(default)]
    pub version: Option<String>,
}

/// Parameters for the initialize request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeParams {
    /// Protocol version requested by client.
    pub protocol_version: String,
    /// Client capabilities.
    #[serde(default)]
    pub capabilities: Value,
    /// Client information.
    #[serde(default)]
    pub client_info: Option<ClientInfo>,
}

/// Panel dimensions as tool input.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(deny_unknown_fields)]
struct PanelArg {
    width_m: f64,
    height_m: f64,
}

impl PanelArg {
    fn footprint(self) -> Result<PanelFootprint, String> {
        PanelFootprint::new(self.width_m, self.height_m).map_err(|e| e.to_string())
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SegmentArg {
    id: String,
    points: Vec<GeoPoint>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct LayoutArgs {
    segments: Vec<SegmentArg>,
    panel: PanelArg,
    #[serde(default)]
    rotation: RotationMode,
    #[serde(default)]
    restricted_areas: Vec<Vec<GeoPoint>>,
    #[serde(default)]
    panel_gap_m: Option<f64>,
    #[serde(default)]
    requested_count: Option<usize>,
    #[serde(default)]
    include_placements: bool,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RotationArgs {
    points: Vec<GeoPoint>,
    panel: PanelArg,
    #[serde(default)]
    restricted_areas: Vec<Vec<GeoPoint>>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct EstimateArgs {
    #[serde(default)]
    country: Option<String>,
    panel: PanelSpec,
    panel_count: usize,
    #[serde(default)]
    inverter: Option<InverterSpec>,
    segments: Vec<SegmentProduction>,
    #[serde(default)]
    consumption: Option<ConsumptionProfile>,
    #[serde(default)]
    roof_material: RoofMaterial,
    #[serde(default)]
    apply_vat: bool,
    #[serde(default)]
    electricity_tariff: Option<f64>,
    #[serde(default)]
    feed_in_tariff: Option<f64>,
    #[serde(default)]
    lifetime_years: Option<u32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SegmentSummary<'a> {
    segment_id: &'a str,
    rotation_deg: f64,
    max_count: usize,
    used: usize,
    truncated: bool,
}

/// The MCP server.
pub struct McpServer<R, W> {
    /// Current server state.
    state: ServerState,
    /// The transport layer.
    transport: LineTransport<R, W>,
    /// Negotiated protocol version (set after initialisation).
    protocol_version: Option<String>,
    /// Defaults for tool arguments the client leaves out.
    settings: SessionSettings,
}

impl McpServer<tokio::io::BufReader<tokio::io::Stdin>, tokio::io::Stdout> {
    /// Creates a server on stdin and stdout.
    #[must_use]
    pub fn stdio(settings: SessionSettings) -> Self {
        Self::new(StdioTransport::stdio(), settings)
    }
}

impl<R, W> McpServer<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    /// Creates a server on `transport`.
    pub const fn new(transport: LineTransport<R, W>, settings: SessionSettings) -> Self {
        Self {
            state: ServerState::AwaitingInit,
            transport,
            protocol_version: None,
            settings,
        }
    }

    /// Returns the current server state.
    #[must_use]
    pub const fn state(&self) -> ServerState {
        self.state
    }

    /// Negotiated protocol version.
    #[must_use]
    pub fn protocol_version(&self) -> Option<&str> {
        self.protocol_version.as_deref()
    }

    /// Returns the transport, consuming the server.
    pub fn into_transport(self) -> LineTransport<R, W> {
        self.transport
    }

    /// Runs until end of input, SIGINT or SIGTERM.
    ///
    /// # Errors
    ///
    /// Returns an error if transport I/O fails.
    #[cfg(unix)]
    pub async fn run(&mut self) -> std::io::Result<()> {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigint = signal(SignalKind::interrupt())?;
        let mut sigterm = signal(SignalKind::terminate())?;

        loop {
            tokio::select! {
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT, initiating graceful shutdown");
                    self.state = ServerState::ShuttingDown;
                    return Ok(());
                }

                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM, initiating graceful shutdown");
                    self.state = ServerState::ShuttingDown;
                    return Ok(());
                }

                line = self.transport.read_line() => {
                    if self.handle_input(line?).await? {
                        return Ok(());
                    }
                }
            }
        }
    }

    /// Runs until end of input or Ctrl+C.
    ///
    /// # Errors
    ///
    /// Returns an error if transport I/O fails.
    #[cfg(windows)]
    pub async fn run(&mut self) -> std::io::Result<()> {
        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);

        loop {
            tokio::select! {
                _ = &mut ctrl_c => {
                    tracing::info!("Received Ctrl+C, initiating graceful shutdown");
                    self.state = ServerState::ShuttingDown;
                    return Ok(());
                }

                line = self.transport.read_line() => {
                    if self.handle_input(line?).await? {
                        return Ok(());
                    }
                }
            }
        }
    }

    /// Runs until end of input, without signal handling.
    ///
    /// # Errors
    ///
    /// Returns an error if transport I/O fails.
    pub async fn serve(&mut self) -> std::io::Result<()> {
        loop {
            let line = self.transport.read_line().await?;
            if self.handle_input(line).await? {
                return Ok(());
            }
        }
    }

    /// Handles one read result. Returns `true` when the server should stop.
    async fn handle_input(&mut self, line: Option<String>) -> std::io::Result<bool> {
        let Some(line) = line else {
            tracing::info!("Input closed");
            self.state = ServerState::ShuttingDown;
            return Ok(true);
        };
        if line.trim().is_empty() {
            return Ok(false);
        }
        if let Some(reply) = self.respond(&line) {
            self.transport.write_line(&reply).await?;
        }
        Ok(self.state == ServerState::ShuttingDown)
    }

    /// Processes one message line and returns the serialised reply, if any.
    pub fn respond(&mut self, line: &str) -> Option<String> {
        let reply = match parse_message(line) {
            Ok(IncomingMessage::Request(req)) => match self.handle_request(&req) {
                Ok(resp) => serde_json::to_string(&resp),
                Err(error) => serde_json::to_string(&error),
            },
            Ok(IncomingMessage::Notification(notif)) => {
                self.handle_notification(&notif);
                return None;
            }
            Err(error) => serde_json::to_string(&error),
        };
        match reply {
            Ok(json) => Some(json),
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialise reply");
                None
            }
        }
    }

    fn handle_request(&mut self, req: &JsonRpcRequest) -> Result<JsonRpcResponse, JsonRpcError> {
        tracing::debug!(method = %req.method, id = %req.id, "Request");
        match req.method.as_str() {
            "initialize" => self.handle_initialize(req),
            "tools/list" => self.handle_tools_list(req),
            "tools/call" => self.handle_tools_call(req),
            "ping" => Ok(JsonRpcResponse::success(req.id.clone(), json!({}))),
            _ => Err(JsonRpcError::method_not_found(req.id.clone(), &req.method)),
        }
    }

    fn handle_notification(&mut self, notif: &JsonRpcNotification) {
        if notif.method == "notifications/initialized" && self.state == ServerState::Initialising {
            tracing::info!("Client initialised");
            self.state = ServerState::Running;
        }
    }

    fn handle_initialize(&mut self, req: &JsonRpcRequest) -> Result<JsonRpcResponse, JsonRpcError> {
        if self.state != ServerState::AwaitingInit {
            return Err(JsonRpcError::invalid_request(
                Some(req.id.clone()),
                "Server already initialised",
            ));
        }

        let params: InitializeParams = req.parse_params("initialize")?;
        if let Some(client) = &params.client_info {
            tracing::info!(
                client = %client.name,
                requested = %params.protocol_version,
                "Initialising"
            );
        }

        self.protocol_version = Some(MCP_PROTOCOL_VERSION.to_string());
        self.state = ServerState::Initialising;

        Ok(JsonRpcResponse::success(
            req.id.clone(),
            json!({
                "protocolVersion": MCP_PROTOCOL_VERSION,
                "capabilities": { "tools": {} },
                "serverInfo": {
                    "name": SERVER_NAME,
                    "version": env!("CARGO_PKG_VERSION"),
                },
            }),
        ))
    }

    fn handle_tools_list(&self, req: &JsonRpcRequest) -> Result<JsonRpcResponse, JsonRpcError> {
        self.require_running(&req.id)?;
        Ok(JsonRpcResponse::success(
            req.id.clone(),
            json!({ "tools": tool_definitions() }),
        ))
    }

    fn handle_tools_call(&self, req: &JsonRpcRequest) -> Result<JsonRpcResponse, JsonRpcError> {
        self.require_running(&req.id)?;
        let params: ToolCallParams = req.parse_params("tool call")?;
        let result = self.call_tool(&params.name, &params.arguments);
        let value = serde_json::to_value(&result).map_err(|e| {
            tracing::error!(error = %e, "Failed to serialise tool call result");
            JsonRpcError::internal_error(req.id.clone(), "failed to serialise result")
        })?;
        Ok(JsonRpcResponse::success(req.id.clone(), value))
    }

    fn require_running(&self, id: &RequestId) -> Result<(), JsonRpcError> {
        if self.state != ServerState::Running {
            return Err(JsonRpcError::new(
                Some(id.clone()),
                JsonRpcErrorData::with_message(ErrorCode::InvalidRequest, "Server not initialised"),
            ));
        }
        Ok(())
    }

    /// Dispatches a tool call by name.
    pub fn call_tool(&self, name: &str, arguments: &Value) -> ToolCallResult {
        tracing::info!(tool = name, "Tool call");
        match name {
            "lv95_to_wgs84" => Self::call_lv95_to_wgs84(arguments),
            "wgs84_to_lv95" => Self::call_wgs84_to_lv95(arguments),
            "polygon_metrics" => Self::call_polygon_metrics(arguments),
            "compute_layout" => self.call_compute_layout(arguments),
            "optimize_rotation" => self.call_optimize_rotation(arguments),
            "estimate_quote" => self.call_estimate_quote(arguments),
            "export_cash_flow_csv" => self.call_export_cash_flow_csv(arguments),
            _ => ToolCallResult::error(format!("Unknown tool: {name}")),
        }
    }

    fn call_lv95_to_wgs84(arguments: &Value) -> ToolCallResult {
        let (Some(easting), Some(northing)) = (
            arguments.get("easting").and_then(Value::as_f64),
            arguments.get("northing").and_then(Value::as_f64),
        ) else {
            return ToolCallResult::error("Missing required parameters: easting, northing");
        };
        let point = lv95_to_wgs84(easting, northing);
        ToolCallResult::json(&json!({ "lat": point.lat, "lng": point.lng }))
    }

    fn call_wgs84_to_lv95(arguments: &Value) -> ToolCallResult {
        let (Some(lat), Some(lng)) = (
            arguments.get("lat").and_then(Value::as_f64),
            arguments.get("lng").and_then(Value::as_f64),
        ) else {
            return ToolCallResult::error("Missing required parameters: lat, lng");
        };
        let lv95 = wgs84_to_lv95(GeoPoint::new(lat, lng));
        ToolCallResult::json(&json!({ "easting": lv95.easting, "northing": lv95.northing }))
    }

    fn call_polygon_metrics(arguments: &Value) -> ToolCallResult {
        let polygon = if let Some(points) = arguments.get("points") {
            match serde_json::from_value::<Vec<GeoPoint>>(points.clone()) {
                Ok(points) => Polygon::new(points),
                Err(e) => return ToolCallResult::error(format!("Invalid points: {e}")),
            }
        } else if let Some(points) = arguments.get("lv95_points") {
            match serde_json::from_value::<Vec<Lv95>>(points.clone()) {
                Ok(points) => Polygon::from_lv95(&points),
                Err(e) => return ToolCallResult::error(format!("Invalid lv95_points: {e}")),
            }
        } else {
            return ToolCallResult::error("Missing required parameter: points or lv95_points");
        };

        let centre = (!polygon.is_empty()).then(|| centroid(&polygon));
        let save_error = validate_for_save(&polygon).err().map(|e| e.to_string());
        ToolCallResult::json(&json!({
            "pointCount": polygon.len(),
            "areaM2": area(&polygon),
            "planarAreaM2": planar_area(&polygon),
            "perimeterM": perimeter(&polygon),
            "centroid": centre,
            "selfIntersecting": self_intersects(&polygon),
            "validForSave": save_error.is_none(),
            "saveError": save_error,
        }))
    }

    fn layout_options(&self, gap_m: Option<f64>) -> Result<LayoutOptions, String> {
        let mut options = self.settings.layout;
        if let Some(gap) = gap_m {
            if !(gap.is_finite() && gap >= 0.0) {
                return Err(format!("panel_gap_m must be non-negative, got {gap}"));
            }
            options.gap_m = gap;
        }
        Ok(options)
    }

    fn call_compute_layout(&self, arguments: &Value) -> ToolCallResult {
        let args: LayoutArgs = match serde_json::from_value(arguments.clone()) {
            Ok(args) => args,
            Err(e) => return ToolCallResult::error(format!("Invalid arguments: {e}")),
        };
        let footprint = match args.panel.footprint() {
            Ok(f) => f,
            Err(e) => return ToolCallResult::error(e),
        };
        let options = match self.layout_options(args.panel_gap_m) {
            Ok(o) => o,
            Err(e) => return ToolCallResult::error(e),
        };

        let segments = match roof_segments(args.segments) {
            Ok(segments) => segments,
            Err(e) => return ToolCallResult::error(e),
        };
        let refs: Vec<&RoofSegment> = segments.iter().collect();
        let restricted = match restricted_areas(args.restricted_areas) {
            Ok(restricted) => restricted,
            Err(e) => return ToolCallResult::error(e),
        };

        let result = layout_segments(&refs, footprint, args.rotation, &restricted, &options);
        let mut selection = PanelSelection::at_max(result.max_count());
        if let Some(count) = args.requested_count {
            selection.set_requested(count);
        }

        let usage = result.usage(selection.requested());
        let summaries: Vec<SegmentSummary<'_>> = result
            .segments
            .iter()
            .zip(&usage)
            .map(|(seg, &(_, used, max))| SegmentSummary {
                segment_id: &seg.segment_id,
                rotation_deg: seg.rotation_deg,
                max_count: max,
                used,
                truncated: seg.truncated,
            })
            .collect();

        let mut body = json!({
            "maxCount": selection.max(),
            "panelCount": selection.requested(),
            "segments": summaries,
        });
        if args.include_placements {
            body["placements"] = json!(result.active(selection.requested()));
        }
        ToolCallResult::json(&body)
    }

    fn call_optimize_rotation(&self, arguments: &Value) -> ToolCallResult {
        let args: RotationArgs = match serde_json::from_value(arguments.clone()) {
            Ok(args) => args,
            Err(e) => return ToolCallResult::error(format!("Invalid arguments: {e}")),
        };
        let footprint = match args.panel.footprint() {
            Ok(f) => f,
            Err(e) => return ToolCallResult::error(e),
        };
        let polygon = Polygon::new(args.points);
        if let Err(e) = validate_for_save(&polygon) {
            return ToolCallResult::error(format!("Invalid roof outline: {e}"));
        }
        let restricted = match restricted_areas(args.restricted_areas) {
            Ok(restricted) => restricted,
            Err(e) => return ToolCallResult::error(e),
        };
        let search = optimize_rotation(&polygon, footprint, &restricted, &self.settings.layout);
        ToolCallResult::json(&json!({
            "rotationDeg": search.rotation_deg,
            "count": search.count,
            "longestEdgeDeg": longest_edge_rotation(&polygon),
        }))
    }

    fn quote_estimate(&self, arguments: &Value) -> Result<QuoteEstimate, String> {
        let args: EstimateArgs =
            serde_json::from_value(arguments.clone()).map_err(|e| format!("Invalid arguments: {e}"))?;

        let profile = match args.country.as_deref() {
            Some(code) => Country::from_str_loose(code)
                .ok_or_else(|| format!("Unknown country '{code}'. Must be one of: CH, DE, AT"))?
                .profile(),
            None => self.settings.profile,
        };
        let inputs = QuoteInputs {
            profile: profile.with_tariffs(args.electricity_tariff, args.feed_in_tariff),
            panel: args.panel,
            panel_count: args.panel_count,
            inverter: args.inverter,
            segments: args.segments,
            consumption: args
                .consumption
                .unwrap_or_else(|| ConsumptionProfile::basic(self.settings.default_consumption_kwh)),
            roof_material: args.roof_material,
            apply_vat: args.apply_vat,
            lifetime_years: args.lifetime_years.unwrap_or(self.settings.lifetime_years),
        };
        Ok(QuoteEstimate::compute(&inputs))
    }

    fn call_estimate_quote(&self, arguments: &Value) -> ToolCallResult {
        match self.quote_estimate(arguments) {
            Ok(estimate) => match serde_json::to_value(&estimate) {
                Ok(value) => ToolCallResult::json(&value),
                Err(e) => ToolCallResult::error(format!("Failed to serialise estimate: {e}")),
            },
            Err(e) => ToolCallResult::error(e),
        }
    }

    fn call_export_cash_flow_csv(&self, arguments: &Value) -> ToolCallResult {
        let estimate = match self.quote_estimate(arguments) {
            Ok(estimate) => estimate,
            Err(e) => return ToolCallResult::error(e),
        };
        match estimate.projection.to_csv() {
            Ok(csv) => ToolCallResult::text(csv),
            Err(e) => ToolCallResult::error(format!("CSV export failed: {e}")),
        }
    }
}

/// Builds roof segments from tool arguments, rejecting rings that cannot be
/// saved.
fn roof_segments(args: Vec<SegmentArg>) -> Result<Vec<RoofSegment>, String> {
    args.into_iter()
        .map(|s| {
            let polygon = Polygon::new(s.points);
            validate_for_save(&polygon)
                .map_err(|e| format!("Invalid roof segment '{}': {e}", s.id))?;
            Ok(RoofSegment {
                id: s.id,
                area_m2: area(&polygon),
                polygon,
                tilt_deg: 0.0,
                azimuth_deg: 180.0,
                suitability: 1,
                electricity_yield_kwh: 0.0,
            })
        })
        .collect()
}

fn restricted_areas(rings: Vec<Vec<GeoPoint>>) -> Result<Vec<RestrictedArea>, String> {
    rings
        .into_iter()
        .enumerate()
        .map(|(index, points)| {
            let polygon = Polygon::new(points);
            validate_for_save(&polygon)
                .map_err(|e| format!("Invalid restricted area {index}: {e}"))?;
            Ok(RestrictedArea::new(polygon))
        })
        .collect()
}

fn point_list_schema(description: &str) -> Value {
    json!({
        "type": "array",
        "description": description,
        "items": {
            "type": "object",
            "properties": {
                "lat": { "type": "number" },
                "lng": { "type": "number" }
            },
            "required": ["lat", "lng"]
        }
    })
}

fn panel_schema() -> Value {
    json!({
        "type": "object",
        "description": "Panel dimensions in metres",
        "properties": {
            "width_m": { "type": "number" },
            "height_m": { "type": "number" }
        },
        "required": ["width_m", "height_m"]
    })
}

fn estimate_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "country": {
                "type": "string",
                "description": "CH, DE or AT (default from server config)"
            },
            "panel": {
                "type": "object",
                "description": "Panel model: id, power_watts, width_m, height_m, efficiency_percent, price, manufacturer"
            },
            "panel_count": { "type": "integer", "minimum": 0 },
            "inverter": {
                "type": "object",
                "description": "Optional inverter: id, power_kw, efficiency_percent, price, manufacturer"
            },
            "segments": {
                "type": "array",
                "description": "Per roof segment: yield_kwh at full coverage, used and max panel counts",
                "items": {
                    "type": "object",
                    "properties": {
                        "yield_kwh": { "type": "number" },
                        "used": { "type": "integer" },
                        "max": { "type": "integer" }
                    },
                    "required": ["yield_kwh", "used", "max"]
                }
            },
            "consumption": {
                "type": "object",
                "description": "annualKwh, heatPumpHotWater, heatPumpHeating, evStations"
            },
            "roof_material": {
                "type": "string",
                "enum": ["tile", "slate", "metal", "fiber_cement", "flat"]
            },
            "apply_vat": { "type": "boolean" },
            "electricity_tariff": { "type": "number" },
            "feed_in_tariff": { "type": "number" },
            "lifetime_years": { "type": "integer", "minimum": 1 }
        },
        "required": ["panel", "panel_count", "segments"]
    })
}

/// Returns the list of available tools.
#[must_use]
#[allow(clippy::too_many_lines)]
pub fn tool_definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: "lv95_to_wgs84",
            description: "Convert a Swiss LV95 coordinate (easting, northing in metres) to \
                          WGS84 latitude/longitude in degrees.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "easting": { "type": "number" },
                    "northing": { "type": "number" }
                },
                "required": ["easting", "northing"]
            }),
        },
        ToolDefinition {
            name: "wgs84_to_lv95",
            description: "Convert a WGS84 latitude/longitude to Swiss LV95 easting/northing.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "lat": { "type": "number" },
                    "lng": { "type": "number" }
                },
                "required": ["lat", "lng"]
            }),
        },
        ToolDefinition {
            name: "polygon_metrics",
            description: "Area (m²), perimeter (m), centroid and validity of a polygon given \
                          as WGS84 points or LV95 points. The ring is closed implicitly.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "points": point_list_schema("Polygon vertices in WGS84"),
                    "lv95_points": {
                        "type": "array",
                        "description": "Polygon vertices in LV95",
                        "items": {
                            "type": "object",
                            "properties": {
                                "easting": { "type": "number" },
                                "northing": { "type": "number" }
                            },
                            "required": ["easting", "northing"]
                        }
                    }
                }
            }),
        },
        ToolDefinition {
            name: "compute_layout",
            description: "Fit rotated panel rectangles onto roof segments, skipping panels \
                          that touch restricted areas. Returns the maximum count per segment \
                          and how a requested count is distributed (closest to each segment \
                          centre first). Self-intersecting outlines are rejected. Segments too \
                          large for the search grid are marked truncated.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "segments": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "id": { "type": "string" },
                                "points": point_list_schema("Segment outline")
                            },
                            "required": ["id", "points"]
                        }
                    },
                    "panel": panel_schema(),
                    "rotation": {
                        "type": "object",
                        "description": "{\"mode\": \"longest_edge\"}, {\"mode\": \"optimize\"} or {\"mode\": \"fixed\", \"degrees\": 30}"
                    },
                    "restricted_areas": {
                        "type": "array",
                        "items": point_list_schema("Restricted area outline")
                    },
                    "panel_gap_m": { "type": "number", "minimum": 0 },
                    "requested_count": { "type": "integer", "minimum": 0 },
                    "include_placements": { "type": "boolean" }
                },
                "required": ["segments", "panel"]
            }),
        },
        ToolDefinition {
            name: "optimize_rotation",
            description: "Search the grid rotation that fits the most panels on one polygon \
                          (coarse sweep, then 1° refinement).",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "points": point_list_schema("Roof outline"),
                    "panel": panel_schema(),
                    "restricted_areas": {
                        "type": "array",
                        "items": point_list_schema("Restricted area outline")
                    }
                },
                "required": ["points", "panel"]
            }),
        },
        ToolDefinition {
            name: "estimate_quote",
            description: "Yield and financial estimate: system size, self-consumption, \
                          investment, subsidies, annual yield, payback and a year-by-year \
                          cash-flow projection.",
            input_schema: estimate_schema(),
        },
        ToolDefinition {
            name: "export_cash_flow_csv",
            description: "Same inputs as estimate_quote; returns the cash-flow projection as CSV.",
            input_schema: estimate_schema(),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    type TestServer = McpServer<&'static [u8], Vec<u8>>;

    fn server() -> TestServer {
        let input: &'static [u8] = b"";
        McpServer::new(LineTransport::new(input, Vec::new()), SessionSettings::default())
    }

    fn running() -> TestServer {
        let mut s = server();
        s.respond(
            r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{"protocolVersion":"2024-11-05","capabilities":{}}}"#,
        )
        .unwrap();
        assert!(s
            .respond(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#)
            .is_none());
        s
    }

    fn tool_json(s: &TestServer, name: &str, args: Value) -> Value {
        let result = s.call_tool(name, &args);
        assert!(!result.is_error, "{result:?}");
        serde_json::from_str(result.first_text().unwrap()).unwrap()
    }

    #[test]
    fn server_initial_state() {
        assert_eq!(server().state(), ServerState::AwaitingInit);
    }

    #[test]
    fn lifecycle() {
        let s = running();
        assert_eq!(s.state(), ServerState::Running);
        assert_eq!(s.protocol_version(), Some(MCP_PROTOCOL_VERSION));
    }

    #[test]
    fn tools_list_requires_init() {
        let mut s = server();
        let reply = s
            .respond(r#"{"jsonrpc":"2.0","id":2,"method":"tools/list"}"#)
            .unwrap();
        assert!(reply.contains("Server not initialised"));
    }

    #[test]
    fn tool_definitions_valid() {
        let tools = tool_definitions();
        assert_eq!(tools.len(), 7);
        for tool in &tools {
            assert!(!tool.name.is_empty());
            assert!(tool.input_schema.is_object());
        }
    }

    #[test]
    fn unknown_tool_is_error_result() {
        let s = running();
        assert!(s.call_tool("nope", &json!({})).is_error);
    }

    #[test]
    fn coordinate_tools() {
        let s = running();
        let geo = tool_json(
            &s,
            "lv95_to_wgs84",
            json!({"easting": 2_600_000.0, "northing": 1_200_000.0}),
        );
        assert!((geo["lat"].as_f64().unwrap() - 46.951_08).abs() < 1e-3);
        assert!((geo["lng"].as_f64().unwrap() - 7.438_63).abs() < 1e-3);

        assert!(s.call_tool("wgs84_to_lv95", &json!({"lat": 46.9})).is_error);
    }

    #[test]
    fn layout_rejects_bad_panel() {
        let s = running();
        let result = s.call_tool(
            "compute_layout",
            &json!({
                "segments": [],
                "panel": {"width_m": 0.0, "height_m": 1.0}
            }),
        );
        assert!(result.is_error);
    }

    #[test]
    fn estimate_rejects_unknown_country() {
        let s = running();
        let result = s.call_tool(
            "estimate_quote",
            &json!({
                "country": "FR",
                "panel": {
                    "id": "p", "power_watts": 400.0, "width_m": 1.7, "height_m": 1.0,
                    "efficiency_percent": 21.0, "price": 200.0, "manufacturer": "Acme"
                },
                "panel_count": 10,
                "segments": []
            }),
        );
        assert!(result.is_error);
        assert!(result.first_text().unwrap().contains("Unknown country"));
    }
}
