//! In-memory stores for tests/dev. Not optimized for performance.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::RwLock;

use async_trait::async_trait;

use maintops_auth::{Role, RoleRecord, UserAccount};
use maintops_catalog::{Material, Site};
use maintops_core::{Aggregate, MaterialId, RoleId, SiteId, UserId, WorkOrderId};
use maintops_events::{AuditRecord, NewAuditRecord};
use maintops_inventory::{StockCommand, StockEvent, StockKey, StockLevel};
use maintops_workorders::{WorkOrder, WorkOrderComment, WorkOrderFilter, WorkOrderMaterial};

use super::{AuditLog, CatalogStore, InventoryStore, StoreError, UserStore, WorkOrderStore};

fn poisoned() -> StoreError {
    StoreError::backend("lock poisoned")
}

// Work orders

#[derive(Debug, Default)]
struct WorkOrderTables {
    next_seq: u64,
    /// Header plus insertion sequence (tie-breaker for equal timestamps).
    orders: HashMap<WorkOrderId, (u64, WorkOrder)>,
    materials: HashMap<WorkOrderId, Vec<WorkOrderMaterial>>,
    comments: HashMap<WorkOrderId, Vec<WorkOrderComment>>,
}

/// Work orders, their lines and comments behind a single lock, so material replacement
/// and cascading deletes are atomic.
#[derive(Debug, Default)]
pub struct InMemoryWorkOrderStore {
    tables: RwLock<WorkOrderTables>,
}

impl InMemoryWorkOrderStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WorkOrderStore for InMemoryWorkOrderStore {
    async fn insert_work_order(&self, work_order: &WorkOrder) -> Result<(), StoreError> {
        let mut t = self.tables.write().map_err(|_| poisoned())?;
        if t.orders.contains_key(&work_order.id) {
            return Err(StoreError::Conflict(format!(
                "work order {} already exists",
                work_order.id
            )));
        }
        t.next_seq += 1;
        let seq = t.next_seq;
        t.orders.insert(work_order.id, (seq, work_order.clone()));
        Ok(())
    }

    async fn get_work_order(&self, id: WorkOrderId) -> Result<Option<WorkOrder>, StoreError> {
        let t = self.tables.read().map_err(|_| poisoned())?;
        Ok(t.orders.get(&id).map(|(_, wo)| wo.clone()))
    }

    async fn save_work_order(&self, work_order: &WorkOrder) -> Result<(), StoreError> {
        let mut t = self.tables.write().map_err(|_| poisoned())?;
        match t.orders.get_mut(&work_order.id) {
            Some((_, slot)) => {
                *slot = work_order.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound("work order")),
        }
    }

    async fn delete_work_order(&self, id: WorkOrderId) -> Result<bool, StoreError> {
        let mut t = self.tables.write().map_err(|_| poisoned())?;
        let existed = t.orders.remove(&id).is_some();
        t.materials.remove(&id);
        t.comments.remove(&id);
        Ok(existed)
    }

    async fn list_work_orders(
        &self,
        filter: &WorkOrderFilter,
    ) -> Result<Vec<WorkOrder>, StoreError> {
        let t = self.tables.read().map_err(|_| poisoned())?;
        let mut rows: Vec<&(u64, WorkOrder)> =
            t.orders.values().filter(|(_, wo)| filter.matches(wo)).collect();
        rows.sort_by(|(sa, a), (sb, b)| b.created_at.cmp(&a.created_at).then(sb.cmp(sa)));
        Ok(rows.into_iter().map(|(_, wo)| wo.clone()).collect())
    }

    async fn replace_materials(
        &self,
        id: WorkOrderId,
        lines: &[WorkOrderMaterial],
    ) -> Result<(), StoreError> {
        let mut t = self.tables.write().map_err(|_| poisoned())?;
        if !t.orders.contains_key(&id) {
            return Err(StoreError::NotFound("work order"));
        }
        t.materials.insert(id, lines.to_vec());
        Ok(())
    }

    async fn materials(&self, id: WorkOrderId) -> Result<Vec<WorkOrderMaterial>, StoreError> {
        let t = self.tables.read().map_err(|_| poisoned())?;
        Ok(t.materials.get(&id).cloned().unwrap_or_default())
    }

    async fn insert_comment(&self, comment: &WorkOrderComment) -> Result<(), StoreError> {
        let mut t = self.tables.write().map_err(|_| poisoned())?;
        if !t.orders.contains_key(&comment.work_order_id) {
            return Err(StoreError::NotFound("work order"));
        }
        t.comments
            .entry(comment.work_order_id)
            .or_default()
            .push(comment.clone());
        Ok(())
    }

    async fn comments(&self, id: WorkOrderId) -> Result<Vec<WorkOrderComment>, StoreError> {
        let t = self.tables.read().map_err(|_| poisoned())?;
        let mut out = t.comments.get(&id).cloned().unwrap_or_default();
        // Stable: equal timestamps keep append order.
        out.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(out)
    }
}

// Inventory

#[derive(Debug, Default)]
pub struct InMemoryInventoryStore {
    levels: RwLock<BTreeMap<StockKey, StockLevel>>,
}

impl InMemoryInventoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl InventoryStore for InMemoryInventoryStore {
    async fn get_stock(&self, key: StockKey) -> Result<Option<StockLevel>, StoreError> {
        let levels = self.levels.read().map_err(|_| poisoned())?;
        Ok(levels.get(&key).cloned())
    }

    async fn apply_stock_command(
        &self,
        key: StockKey,
        command: &StockCommand,
    ) -> Result<(StockLevel, StockEvent), StoreError> {
        let mut levels = self.levels.write().map_err(|_| poisoned())?;
        let mut level = levels
            .get(&key)
            .cloned()
            .unwrap_or_else(|| StockLevel::empty(key));
        let event = level.execute(command)?;
        levels.insert(key, level.clone());
        Ok((level, event))
    }

    async fn stock_for_site(&self, site_id: SiteId) -> Result<Vec<StockLevel>, StoreError> {
        let levels = self.levels.read().map_err(|_| poisoned())?;
        Ok(levels
            .values()
            .filter(|l| l.site_id() == site_id)
            .cloned()
            .collect())
    }

    async fn all_stock(&self) -> Result<Vec<StockLevel>, StoreError> {
        let levels = self.levels.read().map_err(|_| poisoned())?;
        Ok(levels.values().cloned().collect())
    }
}

// Catalog

#[derive(Debug, Default)]
pub struct InMemoryCatalogStore {
    sites: RwLock<BTreeMap<SiteId, Site>>,
    materials: RwLock<BTreeMap<MaterialId, Material>>,
}

impl InMemoryCatalogStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CatalogStore for InMemoryCatalogStore {
    async fn upsert_site(&self, site: &Site) -> Result<(), StoreError> {
        let mut sites = self.sites.write().map_err(|_| poisoned())?;
        sites.insert(site.id, site.clone());
        Ok(())
    }

    async fn get_site(&self, id: SiteId) -> Result<Option<Site>, StoreError> {
        let sites = self.sites.read().map_err(|_| poisoned())?;
        Ok(sites.get(&id).cloned())
    }

    async fn list_sites(&self) -> Result<Vec<Site>, StoreError> {
        let sites = self.sites.read().map_err(|_| poisoned())?;
        Ok(sites.values().cloned().collect())
    }

    async fn delete_site(&self, id: SiteId) -> Result<bool, StoreError> {
        let mut sites = self.sites.write().map_err(|_| poisoned())?;
        Ok(sites.remove(&id).is_some())
    }

    async fn upsert_material(&self, material: &Material) -> Result<(), StoreError> {
        let mut materials = self.materials.write().map_err(|_| poisoned())?;
        materials.insert(material.id, material.clone());
        Ok(())
    }

    async fn get_material(&self, id: MaterialId) -> Result<Option<Material>, StoreError> {
        let materials = self.materials.read().map_err(|_| poisoned())?;
        Ok(materials.get(&id).cloned())
    }

    async fn list_materials(&self) -> Result<Vec<Material>, StoreError> {
        let materials = self.materials.read().map_err(|_| poisoned())?;
        Ok(materials.values().cloned().collect())
    }

    async fn delete_material(&self, id: MaterialId) -> Result<bool, StoreError> {
        let mut materials = self.materials.write().map_err(|_| poisoned())?;
        Ok(materials.remove(&id).is_some())
    }
}

// Users and roles

#[derive(Debug, Default)]
struct IdentityTables {
    users: BTreeMap<UserId, UserAccount>,
    roles: BTreeMap<RoleId, RoleRecord>,
    links: HashMap<UserId, Vec<RoleId>>,
}

impl IdentityTables {
    fn role_by_name(&self, name: &Role) -> Option<&RoleRecord> {
        self.roles.values().find(|r| &r.name == name)
    }
}

#[derive(Debug, Default)]
pub struct InMemoryUserStore {
    tables: RwLock<IdentityTables>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn insert_user(&self, user: &UserAccount) -> Result<(), StoreError> {
        let mut t = self.tables.write().map_err(|_| poisoned())?;
        if t.users.values().any(|u| u.login == user.login) {
            return Err(StoreError::Conflict(format!(
                "login '{}' already exists",
                user.login
            )));
        }
        t.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn update_user(&self, user: &UserAccount) -> Result<(), StoreError> {
        let mut t = self.tables.write().map_err(|_| poisoned())?;
        if t
            .users
            .values()
            .any(|u| u.login == user.login && u.id != user.id)
        {
            return Err(StoreError::Conflict(format!(
                "login '{}' already exists",
                user.login
            )));
        }
        match t.users.get_mut(&user.id) {
            Some(slot) => {
                *slot = user.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound("user")),
        }
    }

    async fn get_user(&self, id: UserId) -> Result<Option<UserAccount>, StoreError> {
        let t = self.tables.read().map_err(|_| poisoned())?;
        Ok(t.users.get(&id).cloned())
    }

    async fn find_user_by_login(&self, login: &str) -> Result<Option<UserAccount>, StoreError> {
        let t = self.tables.read().map_err(|_| poisoned())?;
        Ok(t.users.values().find(|u| u.login == login).cloned())
    }

    async fn list_users(&self) -> Result<Vec<UserAccount>, StoreError> {
        let t = self.tables.read().map_err(|_| poisoned())?;
        Ok(t.users.values().cloned().collect())
    }

    async fn delete_user(&self, id: UserId) -> Result<bool, StoreError> {
        let mut t = self.tables.write().map_err(|_| poisoned())?;
        t.links.remove(&id);
        Ok(t.users.remove(&id).is_some())
    }

    async fn count_users(&self) -> Result<usize, StoreError> {
        let t = self.tables.read().map_err(|_| poisoned())?;
        Ok(t.users.len())
    }

    async fn user_roles(&self, id: UserId) -> Result<Vec<Role>, StoreError> {
        let t = self.tables.read().map_err(|_| poisoned())?;
        Ok(t.links
            .get(&id)
            .map(|ids| {
                ids.iter()
                    .filter_map(|rid| t.roles.get(rid).map(|r| r.name.clone()))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn set_user_roles(&self, id: UserId, roles: &[Role]) -> Result<(), StoreError> {
        let mut t = self.tables.write().map_err(|_| poisoned())?;
        if !t.users.contains_key(&id) {
            return Err(StoreError::NotFound("user"));
        }
        let mut ids = Vec::with_capacity(roles.len());
        let mut seen = HashSet::new();
        for name in roles {
            let role_id = match t.role_by_name(name) {
                Some(r) => r.id,
                None => {
                    let record = RoleRecord::new(name.clone());
                    let rid = record.id;
                    t.roles.insert(rid, record);
                    rid
                }
            };
            if seen.insert(role_id) {
                ids.push(role_id);
            }
        }
        t.links.insert(id, ids);
        Ok(())
    }

    async fn insert_role(&self, role: &RoleRecord) -> Result<(), StoreError> {
        let mut t = self.tables.write().map_err(|_| poisoned())?;
        if t.role_by_name(&role.name).is_some() {
            return Err(StoreError::Conflict(format!(
                "role '{}' already exists",
                role.name
            )));
        }
        t.roles.insert(role.id, role.clone());
        Ok(())
    }

    async fn get_role(&self, id: RoleId) -> Result<Option<RoleRecord>, StoreError> {
        let t = self.tables.read().map_err(|_| poisoned())?;
        Ok(t.roles.get(&id).cloned())
    }

    async fn list_roles(&self) -> Result<Vec<RoleRecord>, StoreError> {
        let t = self.tables.read().map_err(|_| poisoned())?;
        Ok(t.roles.values().cloned().collect())
    }

    async fn rename_role(&self, id: RoleId, name: &Role) -> Result<(), StoreError> {
        let mut t = self.tables.write().map_err(|_| poisoned())?;
        if t.role_by_name(name).is_some_and(|r| r.id != id) {
            return Err(StoreError::Conflict(format!("role '{name}' already exists")));
        }
        match t.roles.get_mut(&id) {
            Some(record) => {
                record.name = name.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound("role")),
        }
    }

    async fn delete_role(&self, id: RoleId) -> Result<bool, StoreError> {
        let mut t = self.tables.write().map_err(|_| poisoned())?;
        for ids in t.links.values_mut() {
            ids.retain(|rid| *rid != id);
        }
        Ok(t.roles.remove(&id).is_some())
    }
}

// Audit

#[derive(Debug, Default)]
pub struct InMemoryAuditLog {
    records: RwLock<Vec<AuditRecord>>,
}

impl InMemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AuditLog for InMemoryAuditLog {
    async fn append(&self, record: NewAuditRecord) -> Result<AuditRecord, StoreError> {
        let mut records = self.records.write().map_err(|_| poisoned())?;
        let sequence = records.last().map(|r| r.sequence).unwrap_or(0) + 1;
        let committed = AuditRecord::committed(record, sequence);
        records.push(committed.clone());
        Ok(committed)
    }

    async fn recent(&self, limit: usize) -> Result<Vec<AuditRecord>, StoreError> {
        let records = self.records.read().map_err(|_| poisoned())?;
        let mut out: Vec<AuditRecord> = records.clone();
        out.sort_by(AuditRecord::newest_first);
        out.truncate(limit);
        Ok(out)
    }
}
