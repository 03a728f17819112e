use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use maintops_catalog::{
    Material, MaterialCommand, MaterialDraft, Site, SiteCommand, SiteDraft,
};
use maintops_core::{Aggregate, MaterialId, SiteId};

use super::{ServiceError, ServiceResult};
use crate::audit_log::record;
use crate::store::{AuditLog, CatalogStore, Stores};

pub const DEFAULT_SITE_PAGE_SIZE: usize = 50;
pub const DEFAULT_MATERIAL_PAGE_SIZE: usize = 200;

/// 1-based page request. Missing or zero values fall back to the first page and the
/// listing's default size.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct PageRequest {
    #[serde(default)]
    pub page: Option<usize>,
    #[serde(default)]
    pub page_size: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub page: usize,
    pub page_size: usize,
    pub total: usize,
    pub results: Vec<T>,
}

impl<T> Page<T> {
    fn slice(items: Vec<T>, request: PageRequest, default_size: usize) -> Self {
        let page = request.page.filter(|p| *p > 0).unwrap_or(1);
        let page_size = request.page_size.filter(|s| *s > 0).unwrap_or(default_size);
        let total = items.len();
        let results = items
            .into_iter()
            .skip((page - 1).saturating_mul(page_size))
            .take(page_size)
            .collect();
        Self {
            page,
            page_size,
            total,
            results,
        }
    }
}

/// Site and material reference data.
#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn CatalogStore>,
    audit: Arc<dyn AuditLog>,
}

impl CatalogService {
    pub fn new(stores: &Stores) -> Self {
        Self {
            store: stores.catalog.clone(),
            audit: stores.audit.clone(),
        }
    }

    async fn load_site(&self, id: SiteId) -> ServiceResult<Option<Site>> {
        Ok(self.store.get_site(id).await?)
    }

    pub async fn list_sites(&self, request: PageRequest) -> ServiceResult<Page<Site>> {
        let sites = self.store.list_sites().await?;
        Ok(Page::slice(sites, request, DEFAULT_SITE_PAGE_SIZE))
    }

    pub async fn get_site(&self, id: SiteId) -> ServiceResult<Site> {
        self.load_site(id).await?.ok_or(ServiceError::NotFound("site"))
    }

    pub async fn create_site(&self, draft: SiteDraft) -> ServiceResult<SiteId> {
        let mut site = Site::empty(SiteId::new());
        let event = site.execute(&SiteCommand::Create {
            draft,
            occurred_at: Utc::now(),
        })?;
        self.store.upsert_site(&site).await?;
        record(self.audit.as_ref(), &event).await?;
        info!(site_id = %site.id, name = %site.name, "site created");
        Ok(site.id)
    }

    pub async fn update_site(&self, id: SiteId, draft: SiteDraft) -> ServiceResult<()> {
        let mut site = self.load_site(id).await?.unwrap_or_else(|| Site::empty(id));
        let event = site.execute(&SiteCommand::Update {
            draft,
            occurred_at: Utc::now(),
        })?;
        self.store.upsert_site(&site).await?;
        record(self.audit.as_ref(), &event).await?;
        Ok(())
    }

    /// Idempotent. Stock records of the site are left in place.
    pub async fn delete_site(&self, id: SiteId) -> ServiceResult<()> {
        let Some(site) = self.load_site(id).await? else {
            return Ok(());
        };
        let event = site.handle(&SiteCommand::Delete {
            occurred_at: Utc::now(),
        })?;
        if self.store.delete_site(id).await? {
            record(self.audit.as_ref(), &event).await?;
            info!(site_id = %id, "site deleted");
        }
        Ok(())
    }

    async fn load_material(&self, id: MaterialId) -> ServiceResult<Option<Material>> {
        Ok(self.store.get_material(id).await?)
    }

    pub async fn list_materials(&self, request: PageRequest) -> ServiceResult<Page<Material>> {
        let materials = self.store.list_materials().await?;
        Ok(Page::slice(materials, request, DEFAULT_MATERIAL_PAGE_SIZE))
    }

    pub async fn get_material(&self, id: MaterialId) -> ServiceResult<Material> {
        self.load_material(id)
            .await?
            .ok_or(ServiceError::NotFound("material"))
    }

    pub async fn create_material(&self, draft: MaterialDraft) -> ServiceResult<MaterialId> {
        let mut material = Material::empty(MaterialId::new());
        let event = material.execute(&MaterialCommand::Create {
            draft,
            occurred_at: Utc::now(),
        })?;
        self.store.upsert_material(&material).await?;
        record(self.audit.as_ref(), &event).await?;
        info!(material_id = %material.id, name = %material.name, "material created");
        Ok(material.id)
    }

    pub async fn update_material(&self, id: MaterialId, draft: MaterialDraft) -> ServiceResult<()> {
        let mut material = self
            .load_material(id)
            .await?
            .unwrap_or_else(|| Material::empty(id));
        let event = material.execute(&MaterialCommand::Update {
            draft,
            occurred_at: Utc::now(),
        })?;
        self.store.upsert_material(&material).await?;
        record(self.audit.as_ref(), &event).await?;
        Ok(())
    }

    pub async fn delete_material(&self, id: MaterialId) -> ServiceResult<()> {
        let Some(material) = self.load_material(id).await? else {
            return Ok(());
        };
        let event = material.handle(&MaterialCommand::Delete {
            occurred_at: Utc::now(),
        })?;
        if self.store.delete_material(id).await? {
            record(self.audit.as_ref(), &event).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pages_are_one_based_and_fall_back_to_defaults() {
        let items: Vec<u32> = (0..7).collect();
        let page = Page::slice(
            items.clone(),
            PageRequest {
                page: Some(2),
                page_size: Some(3),
            },
            50,
        );
        assert_eq!(page.results, vec![3, 4, 5]);
        assert_eq!(page.total, 7);

        let page = Page::slice(items, PageRequest::default(), 5);
        assert_eq!(page.page, 1);
        assert_eq!(page.page_size, 5);
        assert_eq!(page.results.len(), 5);
    }

    #[test]
    fn pages_past_the_end_are_empty() {
        let page = Page::slice(vec![1, 2], PageRequest { page: Some(9), page_size: Some(2) }, 50);
        assert!(page.results.is_empty());
        assert_eq!(page.total, 2);
    }
}
