//! Row types and their conversion into domain values.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row};
use uuid::Uuid;

use maintops_auth::{PasswordHash, Role, RoleRecord, UserAccount};
use maintops_catalog::{Material, MaterialDraft, Site};
use maintops_core::{
    CommentId, EquipmentId, EventId, MaterialId, MaterialLineId, RoleId, SiteId, UserId,
    WorkOrderId,
};
use maintops_events::{AuditRecord, Severity};
use maintops_inventory::{StockKey, StockLevel};
use maintops_workorders::{
    Priority, WorkOrder, WorkOrderComment, WorkOrderMaterial, WorkOrderStatus, WorkOrderType,
};

fn decode_err<E>(err: E) -> sqlx::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    sqlx::Error::Decode(Box::new(err))
}

pub(super) struct SiteRow(pub Site);

impl<'r> FromRow<'r, SqliteRow> for SiteRow {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let id: Uuid = row.try_get("id")?;
        Ok(SiteRow(Site::restore(
            SiteId::from_uuid(id),
            row.try_get("name")?,
            row.try_get("region")?,
        )))
    }
}

pub(super) struct MaterialRow(pub Material);

impl<'r> FromRow<'r, SqliteRow> for MaterialRow {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let id: Uuid = row.try_get("id")?;
        Ok(MaterialRow(Material::restore(
            MaterialId::from_uuid(id),
            MaterialDraft {
                name: row.try_get("name")?,
                unit: row.try_get("unit")?,
                description: row.try_get("description")?,
                reject_percent: row.try_get("reject_percent")?,
            },
        )))
    }
}

#[derive(Debug)]
pub(super) struct StockRow {
    site_id: Uuid,
    material_id: Uuid,
    qty_on_hand: f64,
    reorder_point: f64,
}

impl<'r> FromRow<'r, SqliteRow> for StockRow {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(StockRow {
            site_id: row.try_get("site_id")?,
            material_id: row.try_get("material_id")?,
            qty_on_hand: row.try_get("qty_on_hand")?,
            reorder_point: row.try_get("reorder_point")?,
        })
    }
}

impl From<StockRow> for StockLevel {
    fn from(row: StockRow) -> Self {
        StockLevel::restore(
            StockKey::new(
                SiteId::from_uuid(row.site_id),
                MaterialId::from_uuid(row.material_id),
            ),
            row.qty_on_hand,
            row.reorder_point,
        )
    }
}

pub(super) struct WorkOrderRow(pub WorkOrder);

impl<'r> FromRow<'r, SqliteRow> for WorkOrderRow {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let id: Uuid = row.try_get("id")?;
        let site_id: Uuid = row.try_get("site_id")?;
        let equipment_id: Option<Uuid> = row.try_get("equipment_id")?;
        let kind: String = row.try_get("kind")?;
        let status: String = row.try_get("status")?;
        let priority: String = row.try_get("priority")?;
        let planned_date: Option<NaiveDate> = row.try_get("planned_date")?;

        Ok(WorkOrderRow(WorkOrder {
            id: WorkOrderId::from_uuid(id),
            site_id: SiteId::from_uuid(site_id),
            kind: kind.parse::<WorkOrderType>().map_err(decode_err)?,
            status: WorkOrderStatus::new(status),
            priority: priority.parse::<Priority>().map_err(decode_err)?,
            title: row.try_get("title")?,
            description: row.try_get("description")?,
            equipment_id: equipment_id.map(EquipmentId::from_uuid),
            planned_date,
            assigned_team: row.try_get("assigned_team")?,
            created_at: row.try_get("created_at")?,
        }))
    }
}

#[derive(Debug)]
pub(super) struct MaterialLineRow {
    id: Uuid,
    work_order_id: Uuid,
    material_id: Uuid,
    qty_planned: f64,
    qty_fact: f64,
}

impl<'r> FromRow<'r, SqliteRow> for MaterialLineRow {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(MaterialLineRow {
            id: row.try_get("id")?,
            work_order_id: row.try_get("work_order_id")?,
            material_id: row.try_get("material_id")?,
            qty_planned: row.try_get("qty_planned")?,
            qty_fact: row.try_get("qty_fact")?,
        })
    }
}

impl From<MaterialLineRow> for WorkOrderMaterial {
    fn from(row: MaterialLineRow) -> Self {
        WorkOrderMaterial {
            id: MaterialLineId::from_uuid(row.id),
            work_order_id: WorkOrderId::from_uuid(row.work_order_id),
            material_id: MaterialId::from_uuid(row.material_id),
            qty_planned: row.qty_planned,
            qty_fact: row.qty_fact,
        }
    }
}

#[derive(Debug)]
pub(super) struct CommentRow {
    id: Uuid,
    work_order_id: Uuid,
    author_id: Uuid,
    text: String,
    created_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, SqliteRow> for CommentRow {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(CommentRow {
            id: row.try_get("id")?,
            work_order_id: row.try_get("work_order_id")?,
            author_id: row.try_get("author_id")?,
            text: row.try_get("text")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

impl From<CommentRow> for WorkOrderComment {
    fn from(row: CommentRow) -> Self {
        WorkOrderComment {
            id: CommentId::from_uuid(row.id),
            work_order_id: WorkOrderId::from_uuid(row.work_order_id),
            author_id: UserId::from_uuid(row.author_id),
            text: row.text,
            created_at: row.created_at,
        }
    }
}

pub(super) struct UserRow(pub UserAccount);

impl<'r> FromRow<'r, SqliteRow> for UserRow {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let id: Uuid = row.try_get("id")?;
        let encoded: String = row.try_get("password_hash")?;
        Ok(UserRow(UserAccount {
            id: UserId::from_uuid(id),
            login: row.try_get("login")?,
            email: row.try_get("email")?,
            password_hash: encoded.parse::<PasswordHash>().map_err(decode_err)?,
            blocked: row.try_get("blocked")?,
            created_at: row.try_get("created_at")?,
        }))
    }
}

pub(super) struct RoleRow(pub RoleRecord);

impl<'r> FromRow<'r, SqliteRow> for RoleRow {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let id: Uuid = row.try_get("id")?;
        let name: String = row.try_get("name")?;
        Ok(RoleRow(RoleRecord {
            id: RoleId::from_uuid(id),
            name: Role::parse(&name).map_err(decode_err)?,
        }))
    }
}

#[derive(Debug)]
pub(super) struct AuditRow {
    seq: i64,
    id: Uuid,
    event_type: String,
    text: String,
    severity: String,
    created_at: DateTime<Utc>,
    meta: Option<String>,
}

impl<'r> FromRow<'r, SqliteRow> for AuditRow {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(AuditRow {
            seq: row.try_get("seq")?,
            id: row.try_get("id")?,
            event_type: row.try_get("type")?,
            text: row.try_get("text")?,
            severity: row.try_get("severity")?,
            created_at: row.try_get("created_at")?,
            meta: row.try_get("meta")?,
        })
    }
}

impl TryFrom<AuditRow> for AuditRecord {
    type Error = sqlx::Error;

    fn try_from(row: AuditRow) -> Result<Self, Self::Error> {
        let meta = row
            .meta
            .as_deref()
            .map(serde_json::from_str)
            .transpose()
            .map_err(decode_err)?;
        Ok(AuditRecord {
            id: EventId::from_uuid(row.id),
            sequence: row.seq as u64,
            event_type: row.event_type,
            text: row.text,
            severity: row.severity.parse::<Severity>().map_err(decode_err)?,
            created_at: row.created_at,
            meta,
        })
    }
}
