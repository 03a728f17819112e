//! Persistence contracts.
//!
//! Every store is available in two flavours: in-memory (tests/dev, see [`memory`]) and
//! SQLite (see [`crate::sqlite`]). Stores hold current state only; the audit trail is a
//! separate append-only log.

pub mod memory;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use maintops_auth::{Role, RoleRecord, UserAccount};
use maintops_catalog::{Material, Site};
use maintops_core::{DomainError, MaterialId, RoleId, SiteId, UserId, WorkOrderId};
use maintops_events::{AuditRecord, NewAuditRecord};
use maintops_inventory::{StockCommand, StockEvent, StockKey, StockLevel};
use maintops_workorders::{WorkOrder, WorkOrderComment, WorkOrderFilter, WorkOrderMaterial};

/// Store operation error.
///
/// These are infrastructure failures, except `Domain`, which carries a rule violation
/// detected while a store ran a decision inside its own transaction.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("storage backend failure: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }
}

#[async_trait]
pub trait WorkOrderStore: Send + Sync {
    async fn insert_work_order(&self, work_order: &WorkOrder) -> Result<(), StoreError>;

    async fn get_work_order(&self, id: WorkOrderId) -> Result<Option<WorkOrder>, StoreError>;

    /// Overwrite the header of an existing work order.
    async fn save_work_order(&self, work_order: &WorkOrder) -> Result<(), StoreError>;

    /// Hard delete, cascading to material lines and comments. `false` if absent.
    async fn delete_work_order(&self, id: WorkOrderId) -> Result<bool, StoreError>;

    /// Matching work orders, newest first.
    async fn list_work_orders(&self, filter: &WorkOrderFilter)
    -> Result<Vec<WorkOrder>, StoreError>;

    /// Atomically swap the full set of material lines.
    async fn replace_materials(
        &self,
        id: WorkOrderId,
        lines: &[WorkOrderMaterial],
    ) -> Result<(), StoreError>;

    /// Lines in storage order.
    async fn materials(&self, id: WorkOrderId) -> Result<Vec<WorkOrderMaterial>, StoreError>;

    async fn insert_comment(&self, comment: &WorkOrderComment) -> Result<(), StoreError>;

    /// Comments, oldest first.
    async fn comments(&self, id: WorkOrderId) -> Result<Vec<WorkOrderComment>, StoreError>;
}

#[async_trait]
pub trait InventoryStore: Send + Sync {
    async fn get_stock(&self, key: StockKey) -> Result<Option<StockLevel>, StoreError>;

    /// Load (or zero-initialise) the record, decide, apply and persist in one unit.
    async fn apply_stock_command(
        &self,
        key: StockKey,
        command: &StockCommand,
    ) -> Result<(StockLevel, StockEvent), StoreError>;

    async fn stock_for_site(&self, site_id: SiteId) -> Result<Vec<StockLevel>, StoreError>;

    async fn all_stock(&self) -> Result<Vec<StockLevel>, StoreError>;
}

#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn upsert_site(&self, site: &Site) -> Result<(), StoreError>;
    async fn get_site(&self, id: SiteId) -> Result<Option<Site>, StoreError>;
    async fn list_sites(&self) -> Result<Vec<Site>, StoreError>;
    async fn delete_site(&self, id: SiteId) -> Result<bool, StoreError>;

    async fn upsert_material(&self, material: &Material) -> Result<(), StoreError>;
    async fn get_material(&self, id: MaterialId) -> Result<Option<Material>, StoreError>;
    async fn list_materials(&self) -> Result<Vec<Material>, StoreError>;
    async fn delete_material(&self, id: MaterialId) -> Result<bool, StoreError>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// `Conflict` if the login is taken.
    async fn insert_user(&self, user: &UserAccount) -> Result<(), StoreError>;
    async fn update_user(&self, user: &UserAccount) -> Result<(), StoreError>;
    async fn get_user(&self, id: UserId) -> Result<Option<UserAccount>, StoreError>;
    async fn find_user_by_login(&self, login: &str) -> Result<Option<UserAccount>, StoreError>;
    async fn list_users(&self) -> Result<Vec<UserAccount>, StoreError>;
    /// Removes the account and its role links. `false` if absent.
    async fn delete_user(&self, id: UserId) -> Result<bool, StoreError>;
    async fn count_users(&self) -> Result<usize, StoreError>;

    async fn user_roles(&self, id: UserId) -> Result<Vec<Role>, StoreError>;
    /// Replace the user's role set, creating unknown role names on the fly.
    async fn set_user_roles(&self, id: UserId, roles: &[Role]) -> Result<(), StoreError>;

    /// `Conflict` if the name is taken.
    async fn insert_role(&self, role: &RoleRecord) -> Result<(), StoreError>;
    async fn get_role(&self, id: RoleId) -> Result<Option<RoleRecord>, StoreError>;
    async fn list_roles(&self) -> Result<Vec<RoleRecord>, StoreError>;
    async fn rename_role(&self, id: RoleId, name: &Role) -> Result<(), StoreError>;
    /// Removes the role and every assignment of it. `false` if absent.
    async fn delete_role(&self, id: RoleId) -> Result<bool, StoreError>;
}

/// Append-only audit trail.
#[async_trait]
pub trait AuditLog: Send + Sync {
    /// Append one record, assigning the next sequence number.
    async fn append(&self, record: NewAuditRecord) -> Result<AuditRecord, StoreError>;

    /// The `limit` most recent records, newest first.
    async fn recent(&self, limit: usize) -> Result<Vec<AuditRecord>, StoreError>;
}

/// The full set of stores a running service needs.
#[derive(Clone)]
pub struct Stores {
    pub work_orders: Arc<dyn WorkOrderStore>,
    pub inventory: Arc<dyn InventoryStore>,
    pub catalog: Arc<dyn CatalogStore>,
    pub users: Arc<dyn UserStore>,
    pub audit: Arc<dyn AuditLog>,
}

impl Stores {
    pub fn in_memory() -> Self {
        Self {
            work_orders: Arc::new(memory::InMemoryWorkOrderStore::new()),
            inventory: Arc::new(memory::InMemoryInventoryStore::new()),
            catalog: Arc::new(memory::InMemoryCatalogStore::new()),
            users: Arc::new(memory::InMemoryUserStore::new()),
            audit: Arc::new(memory::InMemoryAuditLog::new()),
        }
    }

    pub fn sqlite(store: crate::sqlite::SqliteStore) -> Self {
        let store = Arc::new(store);
        Self {
            work_orders: store.clone(),
            inventory: store.clone(),
            catalog: store.clone(),
            users: store.clone(),
            audit: store,
        }
    }

    /// Replace the audit log (e.g. with a publishing decorator).
    pub fn with_audit(mut self, audit: Arc<dyn AuditLog>) -> Self {
        self.audit = audit;
        self
    }
}
