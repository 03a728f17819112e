use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::{debug, info};

use maintops_core::{Aggregate, CommentId, UserId, WorkOrderId};
use maintops_workorders::{
    MaterialLine, NewWorkOrder, WorkOrder, WorkOrderCommand, WorkOrderDetail, WorkOrderEvent,
    WorkOrderFilter, WorkOrderPatch, WorkOrderStatus,
};

use super::{ServiceError, ServiceResult};
use crate::audit_log::record;
use crate::store::{AuditLog, Stores, WorkOrderStore};

/// Work-order lifecycle: every accepted mutation persists the header (or its lines and
/// comments) and appends exactly one audit record.
///
/// Header writes store the whole row, so load, save and append run under one write
/// lock shared by clones. Concurrent status and assignment changes both stick.
#[derive(Clone)]
pub struct WorkOrderService {
    store: Arc<dyn WorkOrderStore>,
    audit: Arc<dyn AuditLog>,
    header_lock: Arc<Mutex<()>>,
}

impl WorkOrderService {
    pub fn new(stores: &Stores) -> Self {
        Self {
            store: stores.work_orders.clone(),
            audit: stores.audit.clone(),
            header_lock: Arc::new(Mutex::new(())),
        }
    }

    async fn load(&self, id: WorkOrderId) -> ServiceResult<WorkOrder> {
        self.store
            .get_work_order(id)
            .await?
            .ok_or(ServiceError::NotFound("work order"))
    }

    /// Decide, persist the header and record the event. The command is stamped once
    /// the lock is held.
    async fn mutate(
        &self,
        id: WorkOrderId,
        command: impl FnOnce(DateTime<Utc>) -> WorkOrderCommand,
    ) -> ServiceResult<()> {
        let _guard = self.header_lock.lock().await;
        let mut work_order = self.load(id).await?;
        let event = work_order.execute(&command(Utc::now()))?;
        self.store.save_work_order(&work_order).await?;
        record(self.audit.as_ref(), &event).await?;
        Ok(())
    }

    pub async fn create(&self, input: NewWorkOrder) -> ServiceResult<WorkOrderId> {
        let (work_order, event) = WorkOrder::open(WorkOrderId::new(), input, Utc::now());
        self.store.insert_work_order(&work_order).await?;
        record(self.audit.as_ref(), &event).await?;
        info!(
            work_order_id = %work_order.id,
            site_id = %work_order.site_id,
            priority = work_order.priority.as_str(),
            "work order created"
        );
        Ok(work_order.id)
    }

    pub async fn update(&self, id: WorkOrderId, patch: WorkOrderPatch) -> ServiceResult<()> {
        self.mutate(id, |occurred_at| WorkOrderCommand::Update { patch, occurred_at })
            .await?;
        info!(work_order_id = %id, "work order updated");
        Ok(())
    }

    /// Unconditional overwrite; any status string is accepted.
    pub async fn set_status(&self, id: WorkOrderId, status: WorkOrderStatus) -> ServiceResult<()> {
        let label = status.as_str().to_string();
        self.mutate(id, |occurred_at| WorkOrderCommand::SetStatus {
            status,
            occurred_at,
        })
        .await?;
        info!(work_order_id = %id, status = %label, "work order status changed");
        Ok(())
    }

    pub async fn assign(&self, id: WorkOrderId, team: String) -> ServiceResult<()> {
        self.mutate(id, |occurred_at| WorkOrderCommand::Assign { team, occurred_at })
            .await?;
        info!(work_order_id = %id, "work order assigned");
        Ok(())
    }

    /// Swap the full set of material lines. An empty list removes them all.
    pub async fn replace_materials(
        &self,
        id: WorkOrderId,
        lines: Vec<MaterialLine>,
    ) -> ServiceResult<()> {
        let work_order = self.load(id).await?;
        let event = work_order.handle(&WorkOrderCommand::ReplaceMaterials {
            lines,
            occurred_at: Utc::now(),
        })?;
        if let WorkOrderEvent::MaterialsReplaced { lines, .. } = &event {
            self.store.replace_materials(id, lines).await?;
            debug!(work_order_id = %id, lines = lines.len(), "material lines replaced");
        }
        record(self.audit.as_ref(), &event).await?;
        Ok(())
    }

    pub async fn add_comment(
        &self,
        id: WorkOrderId,
        author_id: UserId,
        text: String,
    ) -> ServiceResult<CommentId> {
        let work_order = self.load(id).await?;
        let comment_id = CommentId::new();
        let event = work_order.handle(&WorkOrderCommand::AddComment {
            comment_id,
            author_id,
            text,
            occurred_at: Utc::now(),
        })?;
        if let WorkOrderEvent::CommentAdded { comment } = &event {
            self.store.insert_comment(comment).await?;
        }
        record(self.audit.as_ref(), &event).await?;
        Ok(comment_id)
    }

    /// Hard delete. Unknown ids are a silent no-op and record nothing.
    pub async fn delete(&self, id: WorkOrderId) -> ServiceResult<()> {
        let Some(work_order) = self.store.get_work_order(id).await? else {
            return Ok(());
        };
        let event = work_order.handle(&WorkOrderCommand::Delete {
            occurred_at: Utc::now(),
        })?;
        if self.store.delete_work_order(id).await? {
            record(self.audit.as_ref(), &event).await?;
            info!(work_order_id = %id, "work order deleted");
        }
        Ok(())
    }

    pub async fn get(&self, id: WorkOrderId) -> ServiceResult<WorkOrderDetail> {
        let work_order = self.load(id).await?;
        let materials = self.store.materials(id).await?;
        let comments = self.store.comments(id).await?;
        Ok(WorkOrderDetail {
            work_order,
            materials,
            comments,
        })
    }

    pub async fn list(&self, filter: &WorkOrderFilter) -> ServiceResult<Vec<WorkOrder>> {
        Ok(self.store.list_work_orders(filter).await?)
    }
}
