use async_trait::async_trait;
use sqlx::FromRow;
use tracing::instrument;

use maintops_catalog::{Material, Site};
use maintops_core::{MaterialId, SiteId};

use super::rows::{MaterialRow, SiteRow};
use super::{SqliteStore, map_sqlx_error};
use crate::store::{CatalogStore, StoreError};

#[async_trait]
impl CatalogStore for SqliteStore {
    #[instrument(skip(self, site), fields(site_id = %site.id), err)]
    async fn upsert_site(&self, site: &Site) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO sites (id, name, region) VALUES (?, ?, ?)
            ON CONFLICT (id) DO UPDATE SET name = excluded.name, region = excluded.region
            "#,
        )
        .bind(site.id.as_uuid())
        .bind(&site.name)
        .bind(&site.region)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("upsert_site", e))?;
        Ok(())
    }

    #[instrument(skip(self), fields(site_id = %id), err)]
    async fn get_site(&self, id: SiteId) -> Result<Option<Site>, StoreError> {
        let row = sqlx::query("SELECT id, name, region FROM sites WHERE id = ?")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_site", e))?;
        row.map(|r| SiteRow::from_row(&r).map(|s| s.0))
            .transpose()
            .map_err(|e| map_sqlx_error("decode_site", e))
    }

    #[instrument(skip(self), err)]
    async fn list_sites(&self) -> Result<Vec<Site>, StoreError> {
        let rows = sqlx::query("SELECT id, name, region FROM sites ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_sites", e))?;
        rows.iter()
            .map(|r| SiteRow::from_row(r).map(|s| s.0))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| map_sqlx_error("decode_site", e))
    }

    #[instrument(skip(self), fields(site_id = %id), err)]
    async fn delete_site(&self, id: SiteId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM sites WHERE id = ?")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_site", e))?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, material), fields(material_id = %material.id), err)]
    async fn upsert_material(&self, material: &Material) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO materials (id, name, unit, description, reject_percent)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT (id) DO UPDATE SET
                name = excluded.name,
                unit = excluded.unit,
                description = excluded.description,
                reject_percent = excluded.reject_percent
            "#,
        )
        .bind(material.id.as_uuid())
        .bind(&material.name)
        .bind(&material.unit)
        .bind(&material.description)
        .bind(material.reject_percent)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("upsert_material", e))?;
        Ok(())
    }

    #[instrument(skip(self), fields(material_id = %id), err)]
    async fn get_material(&self, id: MaterialId) -> Result<Option<Material>, StoreError> {
        let row = sqlx::query(
            "SELECT id, name, unit, description, reject_percent FROM materials WHERE id = ?",
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_material", e))?;
        row.map(|r| MaterialRow::from_row(&r).map(|m| m.0))
            .transpose()
            .map_err(|e| map_sqlx_error("decode_material", e))
    }

    #[instrument(skip(self), err)]
    async fn list_materials(&self) -> Result<Vec<Material>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, name, unit, description, reject_percent FROM materials ORDER BY id ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_materials", e))?;
        rows.iter()
            .map(|r| MaterialRow::from_row(r).map(|m| m.0))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| map_sqlx_error("decode_material", e))
    }

    #[instrument(skip(self), fields(material_id = %id), err)]
    async fn delete_material(&self, id: MaterialId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM materials WHERE id = ?")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_material", e))?;
        Ok(result.rows_affected() > 0)
    }
}
