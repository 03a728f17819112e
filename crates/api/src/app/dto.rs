//! Request/response DTOs and JSON mapping helpers.
//!
//! Domain types that already carry the wire shape (work orders, drafts, withdrawals)
//! are used directly; only bodies without a domain counterpart live here.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use maintops_core::{DomainError, EventId, MaterialId, SiteId};
use maintops_events::{AuditRecord, Severity};
use maintops_infra::services::SiteKpi;
use maintops_workorders::{MaterialLine, WorkOrderFilter, WorkOrderStatus};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub login: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub ok: bool,
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct CreatedResponse {
    pub id: String,
}

impl CreatedResponse {
    pub fn new(id: impl ToString) -> Self {
        Self { id: id.to_string() }
    }
}

/// `{"results": [...]}` envelope used by list endpoints.
#[derive(Debug, Serialize)]
pub struct Results<T> {
    pub results: Vec<T>,
}

impl<T> From<Vec<T>> for Results<T> {
    fn from(results: Vec<T>) -> Self {
        Self { results }
    }
}

/// Query string of `GET /workorders`. Empty values mean "no filter".
#[derive(Debug, Default, Deserialize)]
pub struct WorkOrderQuery {
    #[serde(default)]
    pub site_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

impl WorkOrderQuery {
    pub fn into_filter(self) -> Result<WorkOrderFilter, DomainError> {
        let site_id = match self.site_id.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => Some(raw.parse::<SiteId>()?),
            _ => None,
        };
        let status = match self.status.as_deref() {
            Some(raw) if !raw.trim().is_empty() => Some(WorkOrderStatus::new(raw)),
            _ => None,
        };
        Ok(WorkOrderFilter { site_id, status })
    }
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct AssignRequest {
    pub assigned_team: String,
}

#[derive(Debug, Deserialize)]
pub struct MaterialsRequest {
    pub items: Vec<MaterialLine>,
}

#[derive(Debug, Deserialize)]
pub struct CommentRequest {
    pub text: String,
}

/// Body of reserve/consume/add.
#[derive(Debug, Deserialize)]
pub struct StockMoveRequest {
    pub site_id: SiteId,
    pub material_id: MaterialId,
    pub qty: f64,
}

#[derive(Debug, Deserialize)]
pub struct StockLevelsRequest {
    pub qty_on_hand: f64,
    pub reorder_point: f64,
}

#[derive(Debug, Deserialize)]
pub struct RoleRequest {
    pub name: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct EventsQuery {
    #[serde(default)]
    pub limit: Option<usize>,
}

/// One entry of the events feed.
#[derive(Debug, Serialize)]
pub struct EventOut {
    pub id: EventId,
    pub sequence: u64,
    #[serde(rename = "type")]
    pub event_type: String,
    pub text: String,
    pub severity: Severity,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<serde_json::Value>,
}

impl From<AuditRecord> for EventOut {
    fn from(record: AuditRecord) -> Self {
        Self {
            id: record.id,
            sequence: record.sequence,
            event_type: record.event_type,
            text: record.text,
            severity: record.severity,
            created_at: record.created_at,
            meta: record.meta,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct KpiResponse {
    pub sites: Vec<SiteKpi>,
}
