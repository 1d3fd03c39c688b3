use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::Arc;
use tokio::sync::RwLock;

use rmcp::{
    ErrorData as McpError, RoleServer, ServerHandler,
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{
        CallToolResult, Content, Implementation, ListResourceTemplatesResult, ListResourcesResult,
        PaginatedRequestParams, ProtocolVersion, RawResource, RawResourceTemplate,
        ReadResourceRequestParams, ReadResourceResult, Resource, ResourceContents,
        ResourceTemplate, ServerCapabilities, ServerInfo,
    },
    schemars,
    service::RequestContext,
    tool, tool_handler, tool_router,
};

use crate::domain::booking::BookingRequest;
use crate::domain::dates::{format_iso_date, parse_iso_date_only};
use crate::domain::selection::{RangeSelection, SelectionState};
use crate::error::RentalError;
use crate::services::availability::AvailabilityService;
use crate::services::request_gate::RequestGate;

// ---------- Result Store ----------

/// Latest rendered results, exposed as MCP resources.
/// Keys are URIs like `rental://resource/12/availability`.
#[derive(Clone, Default)]
pub struct ResultStore {
    entries: Arc<RwLock<HashMap<String, ResultEntry>>>,
}

#[derive(Clone)]
struct ResultEntry {
    name: String,
    text: String,
}

impl ResultStore {
    async fn insert(&self, uri: impl Into<String>, name: impl Into<String>, text: String) {
        self.entries.write().await.insert(
            uri.into(),
            ResultEntry {
                name: name.into(),
                text,
            },
        );
    }

    async fn get(&self, uri: &str) -> Option<ResultEntry> {
        self.entries.read().await.get(uri).cloned()
    }

    async fn list(&self) -> Vec<(String, String)> {
        self.entries
            .read()
            .await
            .iter()
            .map(|(uri, entry)| (uri.clone(), entry.name.clone()))
            .collect()
    }
}

impl std::fmt::Debug for ResultStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultStore").finish()
    }
}

// ---------- Tool parameter types ----------

#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct AvailabilityToolParams {
    /// Resource ID (numeric or string)
    pub resource_id: String,
    /// First day of the window (YYYY-MM-DD)
    pub from: String,
    /// Last day of the window, inclusive (YYYY-MM-DD)
    pub to: String,
}

#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct AvailableResourcesToolParams {
    /// Candidate resource IDs. Duplicates are ignored.
    pub resource_ids: Vec<String>,
    /// First day of the window (YYYY-MM-DD)
    pub from: String,
    /// Last day of the window, inclusive (YYYY-MM-DD)
    pub to: String,
}

#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct SelectRangeToolParams {
    /// Resource ID
    pub resource_id: String,
    /// Day the user clicked (YYYY-MM-DD)
    pub clicked_day: String,
    /// Current selection start, if any (YYYY-MM-DD)
    pub start: Option<String>,
    /// Current selection end, exclusive, if any (YYYY-MM-DD)
    pub end: Option<String>,
}

#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct PriceQuoteToolParams {
    /// Resource ID
    pub resource_id: String,
    /// First day of the stay (YYYY-MM-DD)
    pub start: Option<String>,
    /// End of the stay, exclusive (YYYY-MM-DD)
    pub end: Option<String>,
}

#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct ValidateBookingToolParams {
    /// Resource ID
    pub resource_id: String,
    /// First day of the stay (YYYY-MM-DD)
    pub start_date: String,
    /// End of the stay, exclusive (YYYY-MM-DD)
    pub end_date: String,
    /// Units requested (default: 1)
    pub quantity: Option<u32>,
}

// ---------- Helpers ----------

fn availability_uri(resource_id: &str) -> String {
    format!("rental://resource/{}/availability", resource_id.trim())
}

fn quote_uri(resource_id: &str) -> String {
    format!("rental://resource/{}/quote", resource_id.trim())
}

fn superseded() -> CallToolResult {
    CallToolResult::error(vec![Content::text(
        "Superseded by a newer request for this resource; this result was discarded.",
    )])
}

/// Storage failures must never read as "no availability".
fn failure(resource_id: &str, e: &RentalError) -> CallToolResult {
    let text = if e.is_infrastructure() {
        format!(
            "Could not determine availability for resource '{}': {e}. \
             This does not mean the dates are taken; retry later.",
            resource_id.trim()
        )
    } else {
        e.to_string()
    };
    CallToolResult::error(vec![Content::text(text)])
}

fn parse_optional_day(raw: Option<&str>, field: &str) -> Result<Option<chrono::NaiveDate>, String> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => parse_iso_date_only(s)
            .map(Some)
            .ok_or_else(|| format!("Invalid {field} '{s}', expected YYYY-MM-DD.")),
    }
}

fn describe_selection(selection: RangeSelection) -> String {
    match selection.state() {
        SelectionState::Empty => "Selection cleared.".into(),
        SelectionState::StartOnly(start) => format!(
            "Start: {}\nEnd: (pick a departure day)",
            format_iso_date(start)
        ),
        SelectionState::Complete(start, end) => format!(
            "Start: {}\nEnd: {} (exclusive)",
            format_iso_date(start),
            format_iso_date(end)
        ),
    }
}

#[derive(Clone)]
pub struct RentalMcpServer {
    service: Arc<AvailabilityService>,
    tool_router: ToolRouter<Self>,
    results: ResultStore,
    gate: Arc<RequestGate>,
}

#[tool_router]
impl RentalMcpServer {
    pub fn new(service: Arc<AvailabilityService>) -> Self {
        Self {
            service,
            tool_router: Self::tool_router(),
            results: ResultStore::default(),
            gate: Arc::new(RequestGate::new()),
        }
    }

    /// Per-day availability of one resource over an inclusive window.
    #[tool(
        name = "rental_availability",
        description = "Per-day availability of one rental resource between two dates (inclusive). Returns booked days, unavailable (closed) days and remaining units per day. Invalid dates or an unknown resource give an empty result.",
        annotations(read_only_hint = true, open_world_hint = false)
    )]
    async fn rental_availability(
        &self,
        Parameters(params): Parameters<AvailabilityToolParams>,
    ) -> Result<CallToolResult, McpError> {
        let uri = availability_uri(&params.resource_id);
        let mut ticket = self.gate.issue(uri.clone());
        let outcome = ticket
            .run(
                self.service
                    .resource_availability(&params.resource_id, &params.from, &params.to),
            )
            .await;
        match outcome {
            None => Ok(superseded()),
            Some(Ok(view)) => {
                let text = view.to_string();
                if !view.is_empty() && ticket.is_current() {
                    let name = format!("Availability: {}", params.resource_id.trim());
                    self.results.insert(uri, name, text.clone()).await;
                }
                Ok(CallToolResult::success(vec![Content::text(text)]))
            }
            Some(Err(e)) => Ok(failure(&params.resource_id, &e)),
        }
    }

    /// Which of the given resources can take one more unit over the window.
    #[tool(
        name = "rental_available_resources",
        description = "Given a list of resource IDs and a date window (inclusive), return the IDs that have at least one unit free on every day. Resources with zero stock or unknown IDs are never returned.",
        annotations(read_only_hint = true, open_world_hint = false)
    )]
    async fn rental_available_resources(
        &self,
        Parameters(params): Parameters<AvailableResourcesToolParams>,
    ) -> Result<CallToolResult, McpError> {
        match self
            .service
            .available_resources(&params.resource_ids, &params.from, &params.to)
            .await
        {
            Ok(ids) => {
                let mut text = String::new();
                if ids.is_empty() {
                    text.push_str("No resources are available for the whole window.\n");
                } else {
                    let _ = writeln!(
                        text,
                        "{} of {} resource(s) available:",
                        ids.len(),
                        params.resource_ids.len()
                    );
                    for id in &ids {
                        let _ = writeln!(text, "- {id}");
                    }
                }
                Ok(CallToolResult::success(vec![Content::text(text)]))
            }
            Err(e) => Ok(failure(&params.resource_ids.join(","), &e)),
        }
    }

    /// Applies a calendar click to the current selection.
    #[tool(
        name = "rental_select_range",
        description = "Apply a calendar click to the current date selection of a resource. Pass the current start/end (if any) and the clicked day; returns the new selection, or reports that the click was rejected because it would cover unavailable days.",
        annotations(read_only_hint = true, open_world_hint = false)
    )]
    async fn rental_select_range(
        &self,
        Parameters(params): Parameters<SelectRangeToolParams>,
    ) -> Result<CallToolResult, McpError> {
        let bounds = parse_optional_day(params.start.as_deref(), "start")
            .and_then(|start| Ok((start, parse_optional_day(params.end.as_deref(), "end")?)));
        let current = match bounds {
            Ok((start, end)) => RangeSelection { start, end },
            Err(reason) => return Ok(CallToolResult::error(vec![Content::text(reason)])),
        };
        match self
            .service
            .select_range(&params.resource_id, &params.clicked_day, current)
            .await
        {
            Ok(Some(next)) => Ok(CallToolResult::success(vec![Content::text(
                describe_selection(next),
            )])),
            Ok(None) => Ok(CallToolResult::success(vec![Content::text(format!(
                "Click on {} rejected: the range would include unavailable days. Selection unchanged.\n{}",
                params.clicked_day.trim(),
                describe_selection(current)
            ))])),
            Err(e) => Ok(failure(&params.resource_id, &e)),
        }
    }

    /// Seasonal price breakdown for a stay.
    #[tool(
        name = "rental_price_quote",
        description = "Price a stay for a resource, split into seasonal segments. The end date is exclusive. Also reports the minimum stay that applies and whether the range meets it.",
        annotations(read_only_hint = true, open_world_hint = false)
    )]
    async fn rental_price_quote(
        &self,
        Parameters(params): Parameters<PriceQuoteToolParams>,
    ) -> Result<CallToolResult, McpError> {
        let uri = quote_uri(&params.resource_id);
        let mut ticket = self.gate.issue(uri.clone());
        let outcome = ticket
            .run(self.service.quote(
                &params.resource_id,
                params.start.as_deref(),
                params.end.as_deref(),
            ))
            .await;
        match outcome {
            None => Ok(superseded()),
            Some(Ok(quote)) => {
                let text = quote.to_string();
                if ticket.is_current() {
                    let name = format!("Quote: {}", params.resource_id.trim());
                    self.results.insert(uri, name, text.clone()).await;
                }
                Ok(CallToolResult::success(vec![Content::text(text)]))
            }
            Some(Err(e)) => Ok(failure(&params.resource_id, &e)),
        }
    }

    /// Pre-write check for a booking.
    #[tool(
        name = "rental_validate_booking",
        description = "Check whether a booking could be accepted right now: dates not in the past, minimum stay met, and enough units free on every occupied day (including the return day for overnight resources). Returns the price on success. Does not create the booking.",
        annotations(read_only_hint = true, open_world_hint = false)
    )]
    async fn rental_validate_booking(
        &self,
        Parameters(params): Parameters<ValidateBookingToolParams>,
    ) -> Result<CallToolResult, McpError> {
        let request = BookingRequest {
            resource_id: params.resource_id,
            start_date: params.start_date,
            end_date: params.end_date,
            quantity: params.quantity.unwrap_or(1),
        };
        match self.service.validate_booking(&request).await {
            Ok(quote) => Ok(CallToolResult::success(vec![Content::text(format!(
                "Booking can be accepted.\n{quote}"
            ))])),
            Err(e) => Ok(failure(&request.resource_id, &e)),
        }
    }
}

#[tool_handler]
impl ServerHandler for RentalMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .enable_resources()
                .build(),
            server_info: Implementation::from_build_env(),
            instructions: Some(
                "Availability engine for rental inventory (overnight and per-day resources).\n\
                 \n\
                 ## Tools\n\
                 - rental_availability: booked, closed and remaining units per day for one resource\n\
                 - rental_available_resources: which of many resources are free for a whole window\n\
                 - rental_select_range: apply a calendar click to a date selection\n\
                 - rental_price_quote: seasonal price breakdown and minimum stay for a range\n\
                 - rental_validate_booking: check a booking against capacity and minimum stay\n\
                 \n\
                 ## Dates\n\
                 All dates are YYYY-MM-DD UTC days. Availability windows include both ends; \
                 stays and selections use an exclusive end. Overnight resources also hold \
                 their unit on the return day.\n\
                 \n\
                 ## Resources\n\
                 The latest availability and quote per resource are exposed as MCP resources."
                    .into(),
            ),
        }
    }

    async fn list_resources(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListResourcesResult, McpError> {
        let entries = self.results.list().await;
        let resources: Vec<Resource> = entries
            .into_iter()
            .map(|(uri, name)| Resource {
                annotations: None,
                raw: RawResource {
                    uri,
                    name,
                    title: None,
                    description: None,
                    mime_type: Some("text/plain".into()),
                    size: None,
                    icons: None,
                    meta: None,
                },
            })
            .collect();
        Ok(ListResourcesResult {
            resources,
            next_cursor: None,
            meta: None,
        })
    }

    async fn list_resource_templates(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListResourceTemplatesResult, McpError> {
        let templates = vec![
            ResourceTemplate {
                annotations: None,
                raw: RawResourceTemplate {
                    uri_template: "rental://resource/{id}/availability".into(),
                    name: "Availability".into(),
                    title: Some("Per-day availability".into()),
                    description: Some(
                        "Latest window fetched via rental_availability".into(),
                    ),
                    mime_type: Some("text/plain".into()),
                    icons: None,
                },
            },
            ResourceTemplate {
                annotations: None,
                raw: RawResourceTemplate {
                    uri_template: "rental://resource/{id}/quote".into(),
                    name: "Price Quote".into(),
                    title: Some("Seasonal price quote".into()),
                    description: Some("Latest quote fetched via rental_price_quote".into()),
                    mime_type: Some("text/plain".into()),
                    icons: None,
                },
            },
        ];
        Ok(ListResourceTemplatesResult {
            resource_templates: templates,
            next_cursor: None,
            meta: None,
        })
    }

    async fn read_resource(
        &self,
        request: ReadResourceRequestParams,
        _context: RequestContext<RoleServer>,
    ) -> Result<ReadResourceResult, McpError> {
        match self.results.get(&request.uri).await {
            Some(entry) => Ok(ReadResourceResult {
                contents: vec![ResourceContents::text(entry.text, request.uri)],
            }),
            None => Err(McpError::resource_not_found(
                format!("resource not found: {}", request.uri),
                None,
            )),
        }
    }
}
