use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use maintops_core::{CommentId, MaterialId, MaterialLineId, UserId, WorkOrderId};

use crate::WorkOrder;

/// A material-usage line as submitted by clients. Quantities are taken verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialLine {
    pub material_id: MaterialId,
    #[serde(default)]
    pub qty_planned: f64,
    #[serde(default)]
    pub qty_fact: f64,
}

/// A stored material-usage line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkOrderMaterial {
    pub id: MaterialLineId,
    pub work_order_id: WorkOrderId,
    pub material_id: MaterialId,
    pub qty_planned: f64,
    pub qty_fact: f64,
}

impl WorkOrderMaterial {
    pub fn attach(work_order_id: WorkOrderId, line: &MaterialLine) -> Self {
        Self {
            id: MaterialLineId::new(),
            work_order_id,
            material_id: line.material_id,
            qty_planned: line.qty_planned,
            qty_fact: line.qty_fact,
        }
    }
}

/// Append-only free-text note on a work order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkOrderComment {
    pub id: CommentId,
    pub work_order_id: WorkOrderId,
    pub author_id: UserId,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

/// A work order with its material lines (storage order) and comments (oldest first).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkOrderDetail {
    #[serde(flatten)]
    pub work_order: WorkOrder,
    pub materials: Vec<WorkOrderMaterial>,
    pub comments: Vec<WorkOrderComment>,
}
