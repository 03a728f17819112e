//! First-start bootstrap.
//!
//! Seeding writes straight to the stores and records no audit events.

use anyhow::Context;
use chrono::{Duration, Utc};
use tracing::info;

use maintops_auth::{BUILTIN_ROLES, NewUser, Role, RoleRecord, UserAccount};
use maintops_catalog::{Material, MaterialDraft, Site};
use maintops_core::{MaterialId, SiteId, WorkOrderId};
use maintops_inventory::{StockCommand, StockKey};
use maintops_workorders::{NewWorkOrder, Priority, WorkOrder, WorkOrderStatus, WorkOrderType};

use crate::store::Stores;

pub const ADMIN_LOGIN: &str = "admin";
pub const ADMIN_EMAIL: &str = "admin@example.com";

#[derive(Debug, Clone)]
pub struct SeedOptions {
    pub admin_password: String,
    pub demo_data: bool,
}

/// What a bootstrap run actually created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub roles: usize,
    pub admin: bool,
    pub demo: bool,
}

/// Seed roles (if none exist), the admin account (if there are no users) and, when
/// asked, demo data (if there are no sites). Safe to run on every start.
pub async fn bootstrap(stores: &Stores, options: &SeedOptions) -> anyhow::Result<SeedReport> {
    let mut report = SeedReport::default();

    if stores.users.list_roles().await.context("listing roles")?.is_empty() {
        for name in BUILTIN_ROLES {
            stores
                .users
                .insert_role(&RoleRecord::new(Role::new(name)))
                .await
                .with_context(|| format!("seeding role {name}"))?;
            report.roles += 1;
        }
    }

    if stores.users.count_users().await.context("counting users")? == 0 {
        let input = NewUser {
            login: ADMIN_LOGIN.to_string(),
            password: options.admin_password.clone(),
            email: Some(ADMIN_EMAIL.to_string()),
            roles: vec![Role::ADMIN.to_string()],
        };
        let admin = UserAccount::register(&input, Utc::now()).context("building admin account")?;
        stores.users.insert_user(&admin).await.context("seeding admin user")?;
        stores
            .users
            .set_user_roles(admin.id, &[Role::ADMIN])
            .await
            .context("granting admin role")?;
        report.admin = true;
    }

    if options.demo_data && stores.catalog.list_sites().await.context("listing sites")?.is_empty() {
        seed_demo(stores).await.context("seeding demo data")?;
        report.demo = true;
    }

    info!(
        roles = report.roles,
        admin = report.admin,
        demo = report.demo,
        "bootstrap complete"
    );
    Ok(report)
}

async fn seed_demo(stores: &Stores) -> anyhow::Result<()> {
    let sites = [
        Site::restore(SiteId::new(), "Plant A".into(), "North".into()),
        Site::restore(SiteId::new(), "Plant B".into(), "South".into()),
    ];
    let materials = [
        Material::restore(
            MaterialId::new(),
            MaterialDraft {
                name: "Bearing 6206".into(),
                unit: "pcs".into(),
                description: None,
                reject_percent: 0.5,
            },
        ),
        Material::restore(
            MaterialId::new(),
            MaterialDraft {
                name: "Drive belt".into(),
                unit: "pcs".into(),
                description: None,
                reject_percent: 1.0,
            },
        ),
    ];

    for site in &sites {
        stores.catalog.upsert_site(site).await?;
    }
    for material in &materials {
        stores.catalog.upsert_material(material).await?;
    }

    let now = Utc::now();
    for site in &sites {
        for material in &materials {
            stores
                .inventory
                .apply_stock_command(
                    StockKey::new(site.id, material.id),
                    &StockCommand::SetLevels {
                        qty_on_hand: 50.0,
                        reorder_point: 10.0,
                        occurred_at: now,
                    },
                )
                .await?;
        }
    }

    let orders = [
        (
            &sites[0],
            WorkOrderType::Corrective,
            WorkOrderStatus::NEW,
            Priority::High,
            "Conveyor bearing noise",
        ),
        (
            &sites[0],
            WorkOrderType::Preventive,
            WorkOrderStatus::IN_PROGRESS,
            Priority::Normal,
            "Quarterly belt inspection",
        ),
        (
            &sites[1],
            WorkOrderType::Corrective,
            WorkOrderStatus::DONE,
            Priority::Normal,
            "Pump seal replacement",
        ),
    ];
    for (offset, (site, kind, status, priority, title)) in orders.into_iter().enumerate() {
        let mut input = NewWorkOrder::new(site.id, kind);
        input.status = Some(status);
        input.priority = priority;
        input.title = Some(title.to_string());
        // Distinct timestamps keep the demo list in a stable order.
        let created_at = now - Duration::minutes((3 - offset) as i64);
        let (work_order, _) = WorkOrder::open(WorkOrderId::new(), input, created_at);
        stores.work_orders.insert_work_order(&work_order).await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(demo: bool) -> SeedOptions {
        SeedOptions {
            admin_password: "s3cret".into(),
            demo_data: demo,
        }
    }

    #[tokio::test]
    async fn bootstrap_is_idempotent() {
        let stores = Stores::in_memory();
        let first = bootstrap(&stores, &options(true)).await.unwrap();
        assert_eq!(
            first,
            SeedReport {
                roles: 4,
                admin: true,
                demo: true
            }
        );

        let second = bootstrap(&stores, &options(true)).await.unwrap();
        assert_eq!(second, SeedReport::default());
        assert_eq!(stores.users.count_users().await.unwrap(), 1);
        assert_eq!(stores.catalog.list_sites().await.unwrap().len(), 2);
        assert!(stores.audit.recent(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn admin_gets_admin_role_and_configured_password() {
        let stores = Stores::in_memory();
        bootstrap(&stores, &options(false)).await.unwrap();

        let admin = stores.users.find_user_by_login(ADMIN_LOGIN).await.unwrap().unwrap();
        assert!(admin.accepts("s3cret"));
        assert_eq!(stores.users.user_roles(admin.id).await.unwrap(), vec![Role::ADMIN]);
        assert!(stores.catalog.list_sites().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn demo_data_has_stock_and_three_work_orders() {
        let stores = Stores::in_memory();
        bootstrap(&stores, &options(true)).await.unwrap();

        let stock = stores.inventory.all_stock().await.unwrap();
        assert_eq!(stock.len(), 4);
        assert!(stock.iter().all(|l| l.qty_on_hand == 50.0 && l.reorder_point == 10.0));

        let orders = stores
            .work_orders
            .list_work_orders(&Default::default())
            .await
            .unwrap();
        assert_eq!(orders.len(), 3);
        assert_eq!(orders[0].status, WorkOrderStatus::DONE);
    }
}
