//! The work-order aggregate.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value as JsonValue, json};

use maintops_core::{
    Aggregate, AggregateRoot, CommentId, DomainError, EquipmentId, SiteId, UserId, WorkOrderId,
};
use maintops_events::{Event, Severity};

use crate::{
    MaterialLine, Priority, WorkOrderComment, WorkOrderMaterial, WorkOrderStatus, WorkOrderType,
};

/// Title used when a request does not provide one.
pub const DEFAULT_TITLE: &str = "Maintenance request";

/// Aggregate root: WorkOrder.
///
/// Material lines and comments are stored alongside but are not part of this state;
/// the aggregate emits events describing them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkOrder {
    pub id: WorkOrderId,
    pub site_id: SiteId,
    #[serde(rename = "type")]
    pub kind: WorkOrderType,
    pub status: WorkOrderStatus,
    pub priority: Priority,
    pub title: String,
    pub description: Option<String>,
    pub equipment_id: Option<EquipmentId>,
    pub planned_date: Option<NaiveDate>,
    pub assigned_team: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Input for opening a work order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewWorkOrder {
    pub site_id: SiteId,
    #[serde(rename = "type")]
    pub kind: WorkOrderType,
    #[serde(default)]
    pub status: Option<WorkOrderStatus>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub equipment_id: Option<EquipmentId>,
    #[serde(default)]
    pub planned_date: Option<NaiveDate>,
    #[serde(default)]
    pub assigned_team: Option<String>,
}

impl NewWorkOrder {
    pub fn new(site_id: SiteId, kind: WorkOrderType) -> Self {
        Self {
            site_id,
            kind,
            status: None,
            priority: Priority::default(),
            title: None,
            description: None,
            equipment_id: None,
            planned_date: None,
            assigned_team: None,
        }
    }
}

/// Partial update: only present fields are applied. A present field can set a value
/// but cannot clear an optional one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkOrderPatch {
    #[serde(default)]
    pub site_id: Option<SiteId>,
    #[serde(default, rename = "type")]
    pub kind: Option<WorkOrderType>,
    #[serde(default)]
    pub status: Option<WorkOrderStatus>,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub equipment_id: Option<EquipmentId>,
    #[serde(default)]
    pub planned_date: Option<NaiveDate>,
    #[serde(default)]
    pub assigned_team: Option<String>,
}

impl WorkOrderPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    fn apply_to(&self, wo: &mut WorkOrder) {
        if let Some(v) = self.site_id {
            wo.site_id = v;
        }
        if let Some(v) = self.kind {
            wo.kind = v;
        }
        if let Some(v) = &self.status {
            wo.status = v.clone();
        }
        if let Some(v) = self.priority {
            wo.priority = v;
        }
        if let Some(v) = &self.title {
            wo.title = v.clone();
        }
        if let Some(v) = &self.description {
            wo.description = Some(v.clone());
        }
        if let Some(v) = self.equipment_id {
            wo.equipment_id = Some(v);
        }
        if let Some(v) = self.planned_date {
            wo.planned_date = Some(v);
        }
        if let Some(v) = &self.assigned_team {
            wo.assigned_team = Some(v.clone());
        }
    }
}

/// Exact-match conjunction of optional filters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkOrderFilter {
    #[serde(default)]
    pub site_id: Option<SiteId>,
    #[serde(default)]
    pub status: Option<WorkOrderStatus>,
}

impl WorkOrderFilter {
    pub fn matches(&self, wo: &WorkOrder) -> bool {
        self.site_id.is_none_or(|s| s == wo.site_id)
            && self.status.as_ref().is_none_or(|s| *s == wo.status)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum WorkOrderCommand {
    Update {
        patch: WorkOrderPatch,
        occurred_at: DateTime<Utc>,
    },
    SetStatus {
        status: WorkOrderStatus,
        occurred_at: DateTime<Utc>,
    },
    Assign {
        team: String,
        occurred_at: DateTime<Utc>,
    },
    ReplaceMaterials {
        lines: Vec<MaterialLine>,
        occurred_at: DateTime<Utc>,
    },
    AddComment {
        comment_id: CommentId,
        author_id: UserId,
        text: String,
        occurred_at: DateTime<Utc>,
    },
    Delete {
        occurred_at: DateTime<Utc>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum WorkOrderEvent {
    Created {
        work_order: WorkOrder,
    },
    Updated {
        work_order_id: WorkOrderId,
        patch: WorkOrderPatch,
        occurred_at: DateTime<Utc>,
    },
    StatusChanged {
        work_order_id: WorkOrderId,
        status: WorkOrderStatus,
        occurred_at: DateTime<Utc>,
    },
    Assigned {
        work_order_id: WorkOrderId,
        team: String,
        occurred_at: DateTime<Utc>,
    },
    MaterialsReplaced {
        work_order_id: WorkOrderId,
        lines: Vec<WorkOrderMaterial>,
        occurred_at: DateTime<Utc>,
    },
    CommentAdded {
        comment: WorkOrderComment,
    },
    Deleted {
        work_order_id: WorkOrderId,
        occurred_at: DateTime<Utc>,
    },
}

impl WorkOrderEvent {
    pub fn work_order_id(&self) -> WorkOrderId {
        match self {
            WorkOrderEvent::Created { work_order } => work_order.id,
            WorkOrderEvent::CommentAdded { comment } => comment.work_order_id,
            WorkOrderEvent::Updated { work_order_id, .. }
            | WorkOrderEvent::StatusChanged { work_order_id, .. }
            | WorkOrderEvent::Assigned { work_order_id, .. }
            | WorkOrderEvent::MaterialsReplaced { work_order_id, .. }
            | WorkOrderEvent::Deleted { work_order_id, .. } => *work_order_id,
        }
    }
}

impl Event for WorkOrderEvent {
    fn event_type(&self) -> &'static str {
        match self {
            WorkOrderEvent::Created { .. } => "work_order",
            WorkOrderEvent::Updated { .. } => "work_order_updated",
            WorkOrderEvent::StatusChanged { .. } => "work_order_status",
            WorkOrderEvent::Assigned { .. } => "work_order_assign",
            WorkOrderEvent::MaterialsReplaced { .. } => "work_order_materials",
            WorkOrderEvent::CommentAdded { .. } => "work_order_comment",
            WorkOrderEvent::Deleted { .. } => "work_order_deleted",
        }
    }

    fn severity(&self) -> Severity {
        match self {
            WorkOrderEvent::Created { .. } => Severity::Warning,
            WorkOrderEvent::StatusChanged { status, .. } if status.is_completed() => {
                Severity::Success
            }
            WorkOrderEvent::Deleted { .. } => Severity::Danger,
            _ => Severity::Info,
        }
    }

    fn describe(&self) -> String {
        let id = self.work_order_id();
        match self {
            WorkOrderEvent::Created { .. } => format!("Work order #{id} created"),
            WorkOrderEvent::Updated { .. } => format!("Work order #{id} updated"),
            WorkOrderEvent::StatusChanged { status, .. } => {
                format!("Work order #{id} status -> {status}")
            }
            WorkOrderEvent::Assigned { team, .. } => {
                format!("Team {team} assigned to work order #{id}")
            }
            WorkOrderEvent::MaterialsReplaced { .. } => {
                format!("Materials of work order #{id} updated")
            }
            WorkOrderEvent::CommentAdded { .. } => format!("Comment on work order #{id}"),
            WorkOrderEvent::Deleted { .. } => format!("Work order #{id} deleted"),
        }
    }

    fn metadata(&self) -> Option<JsonValue> {
        let id = self.work_order_id().to_string();
        Some(match self {
            WorkOrderEvent::StatusChanged { status, .. } => {
                json!({ "work_order_id": id, "status": status.as_str() })
            }
            WorkOrderEvent::Assigned { team, .. } => json!({ "work_order_id": id, "team": team }),
            WorkOrderEvent::MaterialsReplaced { lines, .. } => {
                json!({ "work_order_id": id, "lines": lines.len() })
            }
            _ => json!({ "work_order_id": id }),
        })
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            WorkOrderEvent::Created { work_order } => work_order.created_at,
            WorkOrderEvent::CommentAdded { comment } => comment.created_at,
            WorkOrderEvent::Updated { occurred_at, .. }
            | WorkOrderEvent::StatusChanged { occurred_at, .. }
            | WorkOrderEvent::Assigned { occurred_at, .. }
            | WorkOrderEvent::MaterialsReplaced { occurred_at, .. }
            | WorkOrderEvent::Deleted { occurred_at, .. } => *occurred_at,
        }
    }
}

impl WorkOrder {
    /// Open a new work order. Status defaults to `new` and the title to
    /// [`DEFAULT_TITLE`] when absent. Given values are kept verbatim.
    pub fn open(
        id: WorkOrderId,
        input: NewWorkOrder,
        occurred_at: DateTime<Utc>,
    ) -> (Self, WorkOrderEvent) {
        let status = input.status.unwrap_or(WorkOrderStatus::NEW);
        let title = input.title.unwrap_or_else(|| DEFAULT_TITLE.to_string());

        let work_order = WorkOrder {
            id,
            site_id: input.site_id,
            kind: input.kind,
            status,
            priority: input.priority,
            title,
            description: input.description,
            equipment_id: input.equipment_id,
            planned_date: input.planned_date,
            assigned_team: input.assigned_team,
            created_at: occurred_at,
        };
        let event = WorkOrderEvent::Created {
            work_order: work_order.clone(),
        };
        (work_order, event)
    }
}

impl AggregateRoot for WorkOrder {
    type Id = WorkOrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl Aggregate for WorkOrder {
    type Command = WorkOrderCommand;
    type Event = WorkOrderEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            WorkOrderEvent::Created { work_order } => {
                *self = work_order.clone();
            }
            WorkOrderEvent::Updated { patch, .. } => patch.apply_to(self),
            WorkOrderEvent::StatusChanged { status, .. } => {
                self.status = status.clone();
            }
            WorkOrderEvent::Assigned { team, .. } => {
                self.assigned_team = Some(team.clone());
            }
            // Lines, comments and deletion live outside the header.
            WorkOrderEvent::MaterialsReplaced { .. }
            | WorkOrderEvent::CommentAdded { .. }
            | WorkOrderEvent::Deleted { .. } => {}
        }
    }

    fn handle(&self, command: &Self::Command) -> Result<Self::Event, Self::Error> {
        let work_order_id = self.id;
        match command {
            WorkOrderCommand::Update { patch, occurred_at } => Ok(WorkOrderEvent::Updated {
                work_order_id,
                patch: patch.clone(),
                occurred_at: *occurred_at,
            }),
            WorkOrderCommand::SetStatus {
                status,
                occurred_at,
            } => Ok(WorkOrderEvent::StatusChanged {
                work_order_id,
                status: status.clone(),
                occurred_at: *occurred_at,
            }),
            WorkOrderCommand::Assign { team, occurred_at } => Ok(WorkOrderEvent::Assigned {
                work_order_id,
                team: team.clone(),
                occurred_at: *occurred_at,
            }),
            WorkOrderCommand::ReplaceMaterials { lines, occurred_at } => {
                Ok(WorkOrderEvent::MaterialsReplaced {
                    work_order_id,
                    lines: lines
                        .iter()
                        .map(|l| WorkOrderMaterial::attach(work_order_id, l))
                        .collect(),
                    occurred_at: *occurred_at,
                })
            }
            WorkOrderCommand::AddComment {
                comment_id,
                author_id,
                text,
                occurred_at,
            } => {
                Ok(WorkOrderEvent::CommentAdded {
                    comment: WorkOrderComment {
                        id: *comment_id,
                        work_order_id,
                        author_id: *author_id,
                        text: text.clone(),
                        created_at: *occurred_at,
                    },
                })
            }
            WorkOrderCommand::Delete { occurred_at } => Ok(WorkOrderEvent::Deleted {
                work_order_id,
                occurred_at: *occurred_at,
            }),
        }
    }
}
