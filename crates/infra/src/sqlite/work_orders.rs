use async_trait::async_trait;
use sqlx::FromRow;
use tracing::{Span, instrument};

use maintops_core::WorkOrderId;
use maintops_workorders::{WorkOrder, WorkOrderComment, WorkOrderFilter, WorkOrderMaterial};

use super::rows::{CommentRow, MaterialLineRow, WorkOrderRow};
use super::{SqliteStore, map_sqlx_error};
use crate::store::{StoreError, WorkOrderStore};

const SELECT_WORK_ORDER: &str = r#"
    SELECT id, site_id, kind, status, priority, title, description,
           equipment_id, planned_date, assigned_team, created_at
    FROM work_orders
"#;

impl SqliteStore {
    async fn work_order_exists(&self, id: WorkOrderId) -> Result<bool, StoreError> {
        let found: Option<i64> = sqlx::query_scalar("SELECT 1 FROM work_orders WHERE id = ?")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("work_order_exists", e))?;
        Ok(found.is_some())
    }
}

#[async_trait]
impl WorkOrderStore for SqliteStore {
    #[instrument(skip(self, work_order), fields(work_order_id = %work_order.id), err)]
    async fn insert_work_order(&self, work_order: &WorkOrder) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO work_orders (
                id, site_id, kind, status, priority, title, description,
                equipment_id, planned_date, assigned_team, created_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(work_order.id.as_uuid())
        .bind(work_order.site_id.as_uuid())
        .bind(work_order.kind.as_str())
        .bind(work_order.status.as_str())
        .bind(work_order.priority.as_str())
        .bind(&work_order.title)
        .bind(&work_order.description)
        .bind(work_order.equipment_id.map(uuid::Uuid::from))
        .bind(work_order.planned_date)
        .bind(&work_order.assigned_team)
        .bind(work_order.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_work_order", e))?;
        Ok(())
    }

    #[instrument(skip(self), fields(work_order_id = %id), err)]
    async fn get_work_order(&self, id: WorkOrderId) -> Result<Option<WorkOrder>, StoreError> {
        let row = sqlx::query(&format!("{SELECT_WORK_ORDER} WHERE id = ?"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_work_order", e))?;

        row.map(|r| WorkOrderRow::from_row(&r).map(|w| w.0))
            .transpose()
            .map_err(|e| map_sqlx_error("decode_work_order", e))
    }

    #[instrument(skip(self, work_order), fields(work_order_id = %work_order.id), err)]
    async fn save_work_order(&self, work_order: &WorkOrder) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE work_orders
            SET site_id = ?, kind = ?, status = ?, priority = ?, title = ?, description = ?,
                equipment_id = ?, planned_date = ?, assigned_team = ?
            WHERE id = ?
            "#,
        )
        .bind(work_order.site_id.as_uuid())
        .bind(work_order.kind.as_str())
        .bind(work_order.status.as_str())
        .bind(work_order.priority.as_str())
        .bind(&work_order.title)
        .bind(&work_order.description)
        .bind(work_order.equipment_id.map(uuid::Uuid::from))
        .bind(work_order.planned_date)
        .bind(&work_order.assigned_team)
        .bind(work_order.id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("save_work_order", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("work order"));
        }
        Ok(())
    }

    #[instrument(skip(self), fields(work_order_id = %id), err)]
    async fn delete_work_order(&self, id: WorkOrderId) -> Result<bool, StoreError> {
        // Lines and comments go with it through ON DELETE CASCADE.
        let result = sqlx::query("DELETE FROM work_orders WHERE id = ?")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_work_order", e))?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self), fields(count = tracing::field::Empty), err)]
    async fn list_work_orders(
        &self,
        filter: &WorkOrderFilter,
    ) -> Result<Vec<WorkOrder>, StoreError> {
        let sql = format!(
            "{SELECT_WORK_ORDER} WHERE (? IS NULL OR site_id = ?) AND (? IS NULL OR status = ?) \
             ORDER BY created_at DESC, rowid DESC"
        );
        let site = filter.site_id.map(uuid::Uuid::from);
        let status = filter.status.as_ref().map(|s| s.as_str().to_string());
        let rows = sqlx::query(&sql)
            .bind(site)
            .bind(site)
            .bind(status.clone())
            .bind(status)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_work_orders", e))?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let wo = WorkOrderRow::from_row(&row)
                .map_err(|e| map_sqlx_error("decode_work_order", e))?;
            out.push(wo.0);
        }
        Span::current().record("count", out.len());
        Ok(out)
    }

    #[instrument(skip(self, lines), fields(work_order_id = %id, lines = lines.len()), err)]
    async fn replace_materials(
        &self,
        id: WorkOrderId,
        lines: &[WorkOrderMaterial],
    ) -> Result<(), StoreError> {
        if !self.work_order_exists(id).await? {
            return Err(StoreError::NotFound("work order"));
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        sqlx::query("DELETE FROM work_order_materials WHERE work_order_id = ?")
            .bind(id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("clear_materials", e))?;

        for line in lines {
            sqlx::query(
                r#"
                INSERT INTO work_order_materials (id, work_order_id, material_id, qty_planned, qty_fact)
                VALUES (?, ?, ?, ?, ?)
                "#,
            )
            .bind(line.id.as_uuid())
            .bind(id.as_uuid())
            .bind(line.material_id.as_uuid())
            .bind(line.qty_planned)
            .bind(line.qty_fact)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("insert_material_line", e))?;
        }

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;
        Ok(())
    }

    #[instrument(skip(self), fields(work_order_id = %id), err)]
    async fn materials(&self, id: WorkOrderId) -> Result<Vec<WorkOrderMaterial>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, work_order_id, material_id, qty_planned, qty_fact
            FROM work_order_materials
            WHERE work_order_id = ?
            ORDER BY rowid ASC
            "#,
        )
        .bind(id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("materials", e))?;

        rows.iter()
            .map(|r| MaterialLineRow::from_row(r).map(Into::into))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| map_sqlx_error("decode_material_line", e))
    }

    #[instrument(skip(self, comment), fields(work_order_id = %comment.work_order_id), err)]
    async fn insert_comment(&self, comment: &WorkOrderComment) -> Result<(), StoreError> {
        if !self.work_order_exists(comment.work_order_id).await? {
            return Err(StoreError::NotFound("work order"));
        }
        sqlx::query(
            r#"
            INSERT INTO work_order_comments (id, work_order_id, author_id, text, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(comment.id.as_uuid())
        .bind(comment.work_order_id.as_uuid())
        .bind(comment.author_id.as_uuid())
        .bind(&comment.text)
        .bind(comment.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_comment", e))?;
        Ok(())
    }

    #[instrument(skip(self), fields(work_order_id = %id), err)]
    async fn comments(&self, id: WorkOrderId) -> Result<Vec<WorkOrderComment>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, work_order_id, author_id, text, created_at
            FROM work_order_comments
            WHERE work_order_id = ?
            ORDER BY created_at ASC, rowid ASC
            "#,
        )
        .bind(id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("comments", e))?;

        rows.iter()
            .map(|r| CommentRow::from_row(r).map(Into::into))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| map_sqlx_error("decode_comment", e))
    }
}
