use async_trait::async_trait;
use sqlx::FromRow;
use tracing::instrument;

use maintops_core::{Aggregate, SiteId};
use maintops_inventory::{StockCommand, StockEvent, StockKey, StockLevel};

use super::rows::StockRow;
use super::{SqliteStore, map_sqlx_error};
use crate::store::{InventoryStore, StoreError};

fn decode_levels(rows: Vec<sqlx::sqlite::SqliteRow>) -> Result<Vec<StockLevel>, StoreError> {
    rows.iter()
        .map(|r| StockRow::from_row(r).map(Into::into))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| map_sqlx_error("decode_stock", e))
}

#[async_trait]
impl InventoryStore for SqliteStore {
    #[instrument(skip(self), fields(site_id = %key.site_id, material_id = %key.material_id), err)]
    async fn get_stock(&self, key: StockKey) -> Result<Option<StockLevel>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT site_id, material_id, qty_on_hand, reorder_point
            FROM inventory
            WHERE site_id = ? AND material_id = ?
            "#,
        )
        .bind(key.site_id.as_uuid())
        .bind(key.material_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_stock", e))?;

        row.map(|r| StockRow::from_row(&r).map(Into::into))
            .transpose()
            .map_err(|e| map_sqlx_error("decode_stock", e))
    }

    #[instrument(
        skip(self, command),
        fields(site_id = %key.site_id, material_id = %key.material_id),
        err
    )]
    async fn apply_stock_command(
        &self,
        key: StockKey,
        command: &StockCommand,
    ) -> Result<(StockLevel, StockEvent), StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let row = sqlx::query(
            r#"
            SELECT site_id, material_id, qty_on_hand, reorder_point
            FROM inventory
            WHERE site_id = ? AND material_id = ?
            "#,
        )
        .bind(key.site_id.as_uuid())
        .bind(key.material_id.as_uuid())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("load_stock", e))?;

        let mut level: StockLevel = match row {
            Some(r) => StockRow::from_row(&r)
                .map_err(|e| map_sqlx_error("decode_stock", e))?
                .into(),
            None => StockLevel::empty(key),
        };

        // A rejected command drops the transaction, which rolls it back.
        let event = level.execute(command)?;

        sqlx::query(
            r#"
            INSERT INTO inventory (site_id, material_id, qty_on_hand, reorder_point)
            VALUES (?, ?, ?, ?)
            ON CONFLICT (site_id, material_id)
            DO UPDATE SET
                qty_on_hand = excluded.qty_on_hand,
                reorder_point = excluded.reorder_point
            "#,
        )
        .bind(key.site_id.as_uuid())
        .bind(key.material_id.as_uuid())
        .bind(level.qty_on_hand)
        .bind(level.reorder_point)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("save_stock", e))?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;
        Ok((level, event))
    }

    #[instrument(skip(self), fields(site_id = %site_id), err)]
    async fn stock_for_site(&self, site_id: SiteId) -> Result<Vec<StockLevel>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT site_id, material_id, qty_on_hand, reorder_point
            FROM inventory
            WHERE site_id = ?
            ORDER BY material_id ASC
            "#,
        )
        .bind(site_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("stock_for_site", e))?;
        decode_levels(rows)
    }

    #[instrument(skip(self), err)]
    async fn all_stock(&self) -> Result<Vec<StockLevel>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT site_id, material_id, qty_on_hand, reorder_point
            FROM inventory
            ORDER BY site_id ASC, material_id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("all_stock", e))?;
        decode_levels(rows)
    }
}
