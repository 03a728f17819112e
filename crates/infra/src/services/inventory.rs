use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{info, warn};

use maintops_catalog::{Material, Site};
use maintops_core::{MaterialId, SiteId};
use maintops_inventory::{StockCommand, StockEvent, StockKey, StockLevel, Withdrawal};

use super::{ServiceError, ServiceResult};
use crate::audit_log::record;
use crate::store::{AuditLog, CatalogStore, InventoryStore, Stores};

/// One stock record of a site, joined with its material definition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SiteInventoryItem {
    pub material_id: MaterialId,
    pub material_name: Option<String>,
    pub unit: Option<String>,
    pub qty_on_hand: f64,
    pub reorder_point: f64,
    pub low: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SiteInventory {
    pub site_id: SiteId,
    pub items: Vec<SiteInventoryItem>,
}

/// A stock record joined with site and material names.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InventoryLine {
    pub site_id: SiteId,
    pub site_name: Option<String>,
    pub material_id: MaterialId,
    pub material_name: Option<String>,
    pub unit: Option<String>,
    pub qty_on_hand: f64,
    pub reorder_point: f64,
    pub low: bool,
}

/// Per-site stock ledger.
///
/// Read-modify-write cycles are serialized by a ledger-wide async mutex; the SQLite
/// store additionally runs each one in a transaction. Clones share the mutex.
/// Commands are stamped after the mutex is taken, so record times follow append order.
#[derive(Clone)]
pub struct InventoryLedger {
    stock: Arc<dyn InventoryStore>,
    catalog: Arc<dyn CatalogStore>,
    audit: Arc<dyn AuditLog>,
    write_lock: Arc<Mutex<()>>,
}

impl InventoryLedger {
    pub fn new(stores: &Stores) -> Self {
        Self {
            stock: stores.inventory.clone(),
            catalog: stores.catalog.clone(),
            audit: stores.audit.clone(),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    async fn apply(
        &self,
        key: StockKey,
        command: impl FnOnce(DateTime<Utc>) -> StockCommand,
    ) -> ServiceResult<(StockLevel, StockEvent)> {
        let _guard = self.write_lock.lock().await;
        let command = command(Utc::now());
        let (level, event) = self.stock.apply_stock_command(key, &command).await?;
        record(self.audit.as_ref(), &event).await?;
        Ok((level, event))
    }

    async fn withdraw(
        &self,
        key: StockKey,
        command: impl FnOnce(DateTime<Utc>) -> StockCommand,
    ) -> ServiceResult<Withdrawal> {
        let (_, event) = self.apply(key, command).await?;
        let withdrawal = event
            .withdrawal()
            .ok_or_else(|| ServiceError::Store("withdrawal event expected".to_string()))?;
        if withdrawal.clamped {
            warn!(
                site_id = %key.site_id,
                material_id = %key.material_id,
                shortfall = withdrawal.shortfall,
                "stock clamped at zero"
            );
        }
        Ok(withdrawal)
    }

    /// Deduct stock for planned work. Clamps at zero and reports the shortfall.
    pub async fn reserve(
        &self,
        site_id: SiteId,
        material_id: MaterialId,
        qty: f64,
    ) -> ServiceResult<Withdrawal> {
        self.withdraw(
            StockKey::new(site_id, material_id),
            |occurred_at| StockCommand::Reserve { qty, occurred_at },
        )
        .await
    }

    /// Deduct stock actually used. Clamps at zero and reports the shortfall.
    pub async fn consume(
        &self,
        site_id: SiteId,
        material_id: MaterialId,
        qty: f64,
    ) -> ServiceResult<Withdrawal> {
        self.withdraw(
            StockKey::new(site_id, material_id),
            |occurred_at| StockCommand::Consume { qty, occurred_at },
        )
        .await
    }

    pub async fn add(
        &self,
        site_id: SiteId,
        material_id: MaterialId,
        qty: f64,
    ) -> ServiceResult<StockLevel> {
        let (level, _) = self
            .apply(
                StockKey::new(site_id, material_id),
                |occurred_at| StockCommand::Add { qty, occurred_at },
            )
            .await?;
        info!(site_id = %site_id, material_id = %material_id, qty, "stock added");
        Ok(level)
    }

    pub async fn set_levels(
        &self,
        site_id: SiteId,
        material_id: MaterialId,
        qty_on_hand: f64,
        reorder_point: f64,
    ) -> ServiceResult<StockLevel> {
        let (level, _) = self
            .apply(
                StockKey::new(site_id, material_id),
                |occurred_at| StockCommand::SetLevels {
                    qty_on_hand,
                    reorder_point,
                    occurred_at,
                },
            )
            .await?;
        Ok(level)
    }

    /// All records of one site. `NotFound` when the site is unknown.
    pub async fn site_inventory(&self, site_id: SiteId) -> ServiceResult<SiteInventory> {
        if self.catalog.get_site(site_id).await?.is_none() {
            return Err(ServiceError::NotFound("site"));
        }
        let materials = self.material_index().await?;
        let items = self
            .stock
            .stock_for_site(site_id)
            .await?
            .into_iter()
            .map(|level| {
                let material = materials.get(&level.material_id());
                SiteInventoryItem {
                    material_id: level.material_id(),
                    material_name: material.map(|m| m.name.clone()),
                    unit: material.map(|m| m.unit.clone()),
                    qty_on_hand: level.qty_on_hand,
                    reorder_point: level.reorder_point,
                    low: level.is_low(),
                }
            })
            .collect();
        Ok(SiteInventory { site_id, items })
    }

    /// Every stock record across all sites.
    pub async fn list(&self) -> ServiceResult<Vec<InventoryLine>> {
        let materials = self.material_index().await?;
        let sites: HashMap<SiteId, Site> = self
            .catalog
            .list_sites()
            .await?
            .into_iter()
            .map(|s| (s.id, s))
            .collect();

        Ok(self
            .stock
            .all_stock()
            .await?
            .into_iter()
            .map(|level| {
                let material = materials.get(&level.material_id());
                InventoryLine {
                    site_id: level.site_id(),
                    site_name: sites.get(&level.site_id()).map(|s| s.name.clone()),
                    material_id: level.material_id(),
                    material_name: material.map(|m| m.name.clone()),
                    unit: material.map(|m| m.unit.clone()),
                    qty_on_hand: level.qty_on_hand,
                    reorder_point: level.reorder_point,
                    low: level.is_low(),
                }
            })
            .collect())
    }

    async fn material_index(&self) -> ServiceResult<HashMap<MaterialId, Material>> {
        Ok(self
            .catalog
            .list_materials()
            .await?
            .into_iter()
            .map(|m| (m.id, m))
            .collect())
    }
}
