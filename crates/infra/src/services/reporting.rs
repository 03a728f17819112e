//! Read-only aggregates over current state and the audit log.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;

use maintops_core::SiteId;
use maintops_events::AuditRecord;
use maintops_workorders::{Priority, WorkOrder, WorkOrderFilter, WorkOrderStatus};

use super::ServiceResult;
use crate::store::{AuditLog, CatalogStore, InventoryStore, Stores, WorkOrderStore};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusCount {
    pub status: WorkOrderStatus,
    pub count: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct InventoryBreakdown {
    pub ok: usize,
    pub low: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Dashboard {
    pub work_orders_total: usize,
    pub work_orders_by_status: Vec<StatusCount>,
    pub inventory: InventoryBreakdown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SiteKpi {
    pub site_id: SiteId,
    pub site_name: String,
    pub wo_total: usize,
    /// Done or closed.
    pub wo_done: usize,
    pub wo_high: usize,
}

#[derive(Clone)]
pub struct Reporting {
    work_orders: Arc<dyn WorkOrderStore>,
    inventory: Arc<dyn InventoryStore>,
    catalog: Arc<dyn CatalogStore>,
    audit: Arc<dyn AuditLog>,
}

fn count_by_status(work_orders: &[WorkOrder]) -> Vec<StatusCount> {
    let mut counts: BTreeMap<&WorkOrderStatus, usize> = BTreeMap::new();
    for wo in work_orders {
        *counts.entry(&wo.status).or_default() += 1;
    }
    counts
        .into_iter()
        .map(|(status, count)| StatusCount {
            status: status.clone(),
            count,
        })
        .collect()
}

impl Reporting {
    pub fn new(stores: &Stores) -> Self {
        Self {
            work_orders: stores.work_orders.clone(),
            inventory: stores.inventory.clone(),
            catalog: stores.catalog.clone(),
            audit: stores.audit.clone(),
        }
    }

    async fn all_work_orders(&self) -> ServiceResult<Vec<WorkOrder>> {
        Ok(self
            .work_orders
            .list_work_orders(&WorkOrderFilter::default())
            .await?)
    }

    /// Work-order counts per status, ordered by status.
    pub async fn work_orders_by_status(&self) -> ServiceResult<Vec<StatusCount>> {
        Ok(count_by_status(&self.all_work_orders().await?))
    }

    /// Stock records below (`low`) and at or above (`ok`) their reorder point.
    pub async fn inventory_breakdown(&self) -> ServiceResult<InventoryBreakdown> {
        let mut breakdown = InventoryBreakdown::default();
        for level in self.inventory.all_stock().await? {
            if level.is_low() {
                breakdown.low += 1;
            } else {
                breakdown.ok += 1;
            }
        }
        Ok(breakdown)
    }

    pub async fn dashboard(&self) -> ServiceResult<Dashboard> {
        let work_orders = self.all_work_orders().await?;
        Ok(Dashboard {
            work_orders_total: work_orders.len(),
            work_orders_by_status: count_by_status(&work_orders),
            inventory: self.inventory_breakdown().await?,
        })
    }

    /// One row per known site, zero counts included.
    pub async fn kpi(&self) -> ServiceResult<Vec<SiteKpi>> {
        let work_orders = self.all_work_orders().await?;
        let sites = self.catalog.list_sites().await?;
        Ok(sites
            .into_iter()
            .map(|site| {
                let mut kpi = SiteKpi {
                    site_id: site.id,
                    site_name: site.name,
                    wo_total: 0,
                    wo_done: 0,
                    wo_high: 0,
                };
                for wo in work_orders.iter().filter(|wo| wo.site_id == site.id) {
                    kpi.wo_total += 1;
                    if wo.status.is_completed() {
                        kpi.wo_done += 1;
                    }
                    if wo.priority == Priority::High {
                        kpi.wo_high += 1;
                    }
                }
                kpi
            })
            .collect())
    }

    /// Most recent audit records, newest first.
    pub async fn events(&self, limit: usize) -> ServiceResult<Vec<AuditRecord>> {
        Ok(self.audit.recent(limit).await?)
    }
}
