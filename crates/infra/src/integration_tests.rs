//! Service-level tests across the full stack: services → stores → audit log.
//!
//! Every scenario runs against both the in-memory stores and an in-memory SQLite
//! database.
//!
//! Verifies:
//! - Each mutation appends exactly one audit record (no-op deletes append none)
//! - Stock never goes negative and shortfalls are reported, not raised
//! - Access checks hold inside the services, not only at the HTTP edge

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use maintops_auth::{Actor, InMemorySessionStore, NewUser, Role, UserPatch};
    use maintops_catalog::{MaterialDraft, SiteDraft};
    use maintops_core::{MaterialId, SiteId, UserId, WorkOrderId};
    use maintops_events::Severity;
    use maintops_workorders::{
        MaterialLine, NewWorkOrder, Priority, WorkOrderFilter, WorkOrderPatch, WorkOrderStatus,
        WorkOrderType,
    };

    use crate::seed::{SeedOptions, bootstrap};
    use crate::services::{
        AccessGate, Administration, CatalogService, InventoryLedger, Reporting, ServiceError,
        WorkOrderService,
    };
    use crate::sqlite::SqliteStore;
    use crate::store::Stores;

    struct Harness {
        stores: Stores,
        work_orders: WorkOrderService,
        ledger: InventoryLedger,
        catalog: CatalogService,
        gate: AccessGate,
        admin: Administration,
        reporting: Reporting,
        sessions: Arc<InMemorySessionStore>,
    }

    impl Harness {
        fn new(stores: Stores) -> Self {
            let sessions = Arc::new(InMemorySessionStore::new());
            let gate = AccessGate::new(&stores, sessions.clone());
            Self {
                work_orders: WorkOrderService::new(&stores),
                ledger: InventoryLedger::new(&stores),
                catalog: CatalogService::new(&stores),
                admin: Administration::new(&stores, gate.clone()),
                reporting: Reporting::new(&stores),
                gate,
                sessions,
                stores,
            }
        }

        async fn event_count(&self) -> usize {
            self.stores.audit.recent(10_000).await.unwrap().len()
        }

        async fn bootstrapped(&self) -> Actor {
            bootstrap(
                &self.stores,
                &SeedOptions {
                    admin_password: "admin-pw".into(),
                    demo_data: false,
                },
            )
            .await
            .unwrap();
            let token = self.gate.login("admin", "admin-pw").await.unwrap();
            self.gate.resolve(token.as_str()).await.unwrap()
        }

        async fn site(&self, name: &str) -> SiteId {
            self.catalog
                .create_site(SiteDraft {
                    name: name.into(),
                    region: "North".into(),
                })
                .await
                .unwrap()
        }

        async fn material(&self, name: &str) -> MaterialId {
            self.catalog
                .create_material(MaterialDraft {
                    name: name.into(),
                    unit: "pcs".into(),
                    description: None,
                    reject_percent: 0.0,
                })
                .await
                .unwrap()
        }
    }

    async fn harnesses() -> Vec<(&'static str, Harness)> {
        let sqlite = SqliteStore::connect("sqlite::memory:").await.unwrap();
        vec![
            ("memory", Harness::new(Stores::in_memory())),
            ("sqlite", Harness::new(Stores::sqlite(sqlite))),
        ]
    }

    fn high_priority(site_id: SiteId) -> NewWorkOrder {
        let mut input = NewWorkOrder::new(site_id, WorkOrderType::Corrective);
        input.priority = Priority::High;
        input
    }

    #[tokio::test]
    async fn completing_a_work_order_records_a_success_event() {
        for (backend, h) in harnesses().await {
            let site = h.site("Plant A").await;
            let id = h.work_orders.create(high_priority(site)).await.unwrap();
            h.work_orders
                .set_status(id, WorkOrderStatus::DONE)
                .await
                .unwrap();

            let detail = h.work_orders.get(id).await.unwrap();
            assert_eq!(detail.work_order.status, WorkOrderStatus::DONE, "{backend}");
            assert_eq!(detail.work_order.priority, Priority::High, "{backend}");

            let latest = &h.reporting.events(1).await.unwrap()[0];
            assert_eq!(latest.event_type, "work_order_status", "{backend}");
            assert_eq!(latest.severity, Severity::Success, "{backend}");
            assert!(latest.references(&id.to_string()), "{backend}");
        }
    }

    #[tokio::test]
    async fn any_status_string_is_accepted_and_overwritten() {
        for (backend, h) in harnesses().await {
            let site = h.site("Plant A").await;
            let id = h.work_orders.create(high_priority(site)).await.unwrap();
            let odd = WorkOrderStatus::new("waiting_for_parts");
            h.work_orders.set_status(id, odd.clone()).await.unwrap();
            assert_eq!(h.work_orders.get(id).await.unwrap().work_order.status, odd, "{backend}");

            h.work_orders
                .set_status(id, WorkOrderStatus::NEW)
                .await
                .unwrap();
            assert_eq!(
                h.work_orders.get(id).await.unwrap().work_order.status,
                WorkOrderStatus::NEW,
                "{backend}"
            );

            h.work_orders
                .set_status(id, WorkOrderStatus::new(""))
                .await
                .unwrap();
            assert_eq!(
                h.work_orders.get(id).await.unwrap().work_order.status.as_str(),
                "",
                "{backend}"
            );
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_status_and_assignment_both_stick() {
        for (backend, h) in harnesses().await {
            let site = h.site("Plant A").await;
            for round in 0..20 {
                let id = h.work_orders.create(high_priority(site)).await.unwrap();
                let (status, assign) = tokio::join!(
                    h.work_orders.set_status(id, WorkOrderStatus::DONE),
                    h.work_orders.assign(id, format!("Crew {round}")),
                );
                status.unwrap();
                assign.unwrap();

                let wo = h.work_orders.get(id).await.unwrap().work_order;
                assert_eq!(wo.status, WorkOrderStatus::DONE, "{backend} round {round}");
                assert_eq!(
                    wo.assigned_team.as_deref(),
                    Some(format!("Crew {round}").as_str()),
                    "{backend} round {round}"
                );
            }
        }
    }

    #[tokio::test]
    async fn every_mutation_appends_exactly_one_event() {
        for (backend, h) in harnesses().await {
            let site = h.site("Plant A").await;
            let material = h.material("Bearing").await;
            let base = h.event_count().await;
            assert_eq!(base, 2, "{backend}");

            let id = h.work_orders.create(high_priority(site)).await.unwrap();
            h.work_orders
                .update(
                    id,
                    WorkOrderPatch {
                        title: Some("Crusher failure".into()),
                        ..Default::default()
                    },
                )
                .await
                .unwrap();
            h.work_orders.assign(id, "Crew B".into()).await.unwrap();
            h.work_orders
                .replace_materials(
                    id,
                    vec![
                        MaterialLine {
                            material_id: material,
                            qty_planned: 2.0,
                            qty_fact: 0.0,
                        },
                        MaterialLine {
                            material_id: material,
                            qty_planned: 1.0,
                            qty_fact: 1.0,
                        },
                    ],
                )
                .await
                .unwrap();
            h.work_orders
                .add_comment(id, UserId::new(), "replaced bearing".into())
                .await
                .unwrap();
            h.ledger.add(site, material, 4.0).await.unwrap();
            h.ledger.reserve(site, material, 1.0).await.unwrap();
            h.ledger.consume(site, material, 1.0).await.unwrap();
            h.ledger.set_levels(site, material, 9.0, 3.0).await.unwrap();
            h.work_orders.delete(id).await.unwrap();

            assert_eq!(h.event_count().await, base + 10, "{backend}");
        }
    }

    #[tokio::test]
    async fn deleting_unknown_entities_is_a_silent_no_op() {
        for (backend, h) in harnesses().await {
            let before = h.event_count().await;
            h.work_orders.delete(WorkOrderId::new()).await.unwrap();
            h.catalog.delete_site(SiteId::new()).await.unwrap();
            h.catalog.delete_material(MaterialId::new()).await.unwrap();
            assert_eq!(h.event_count().await, before, "{backend}");
        }
    }

    #[tokio::test]
    async fn deleting_a_work_order_cascades_to_lines_and_comments() {
        for (backend, h) in harnesses().await {
            let site = h.site("Plant A").await;
            let id = h.work_orders.create(high_priority(site)).await.unwrap();
            h.work_orders
                .replace_materials(
                    id,
                    vec![MaterialLine {
                        material_id: MaterialId::new(),
                        qty_planned: 1.0,
                        qty_fact: 0.0,
                    }],
                )
                .await
                .unwrap();
            h.work_orders
                .add_comment(id, UserId::new(), "note".into())
                .await
                .unwrap();

            h.work_orders.delete(id).await.unwrap();

            assert!(
                matches!(h.work_orders.get(id).await, Err(ServiceError::NotFound(_))),
                "{backend}"
            );
            assert!(h.stores.work_orders.materials(id).await.unwrap().is_empty(), "{backend}");
            assert!(h.stores.work_orders.comments(id).await.unwrap().is_empty(), "{backend}");
            let latest = &h.reporting.events(1).await.unwrap()[0];
            assert_eq!(latest.event_type, "work_order_deleted", "{backend}");
            assert_eq!(latest.severity, Severity::Danger, "{backend}");
        }
    }

    #[tokio::test]
    async fn replacing_materials_keeps_only_the_latest_set() {
        for (backend, h) in harnesses().await {
            let site = h.site("Plant A").await;
            let id = h.work_orders.create(high_priority(site)).await.unwrap();
            let first = MaterialId::new();
            let second = MaterialId::new();

            let line = |material_id, qty_planned| MaterialLine {
                material_id,
                qty_planned,
                qty_fact: 0.0,
            };
            h.work_orders
                .replace_materials(id, vec![line(first, 1.0), line(first, 2.0)])
                .await
                .unwrap();
            h.work_orders
                .replace_materials(id, vec![line(second, -3.0)])
                .await
                .unwrap();

            let materials = h.work_orders.get(id).await.unwrap().materials;
            assert_eq!(materials.len(), 1, "{backend}");
            assert_eq!(materials[0].material_id, second, "{backend}");
            assert_eq!(materials[0].qty_planned, -3.0, "{backend}");

            h.work_orders.replace_materials(id, vec![]).await.unwrap();
            assert!(h.work_orders.get(id).await.unwrap().materials.is_empty(), "{backend}");
        }
    }

    #[tokio::test]
    async fn mutating_an_unknown_work_order_is_not_found() {
        for (backend, h) in harnesses().await {
            let missing = WorkOrderId::new();
            let before = h.event_count().await;
            assert!(
                matches!(
                    h.work_orders.set_status(missing, WorkOrderStatus::DONE).await,
                    Err(ServiceError::NotFound("work order"))
                ),
                "{backend}"
            );
            assert!(
                matches!(
                    h.work_orders.replace_materials(missing, vec![]).await,
                    Err(ServiceError::NotFound(_))
                ),
                "{backend}"
            );
            assert!(
                matches!(
                    h.work_orders
                        .add_comment(missing, UserId::new(), "hello".into())
                        .await,
                    Err(ServiceError::NotFound(_))
                ),
                "{backend}"
            );
            assert_eq!(h.event_count().await, before, "{backend}");
        }
    }

    #[tokio::test]
    async fn comments_are_oldest_first_and_kept_verbatim() {
        for (backend, h) in harnesses().await {
            let site = h.site("Plant A").await;
            let id = h.work_orders.create(high_priority(site)).await.unwrap();
            let author = UserId::new();
            h.work_orders
                .add_comment(id, author, "first".into())
                .await
                .unwrap();
            h.work_orders
                .add_comment(id, author, "second".into())
                .await
                .unwrap();

            let before = h.event_count().await;
            h.work_orders
                .add_comment(id, author, "  ".into())
                .await
                .unwrap();
            assert_eq!(h.event_count().await, before + 1, "{backend}");

            let texts: Vec<String> = h
                .work_orders
                .get(id)
                .await
                .unwrap()
                .comments
                .into_iter()
                .map(|c| c.text)
                .collect();
            assert_eq!(texts, vec!["first", "second", "  "], "{backend}");
        }
    }

    #[tokio::test]
    async fn list_is_newest_first_and_filters_by_exact_match() {
        for (backend, h) in harnesses().await {
            let a = h.site("Plant A").await;
            let b = h.site("Plant B").await;
            let first = h.work_orders.create(high_priority(a)).await.unwrap();
            let second = h.work_orders.create(high_priority(b)).await.unwrap();
            let third = h.work_orders.create(high_priority(a)).await.unwrap();
            h.work_orders
                .set_status(third, WorkOrderStatus::IN_PROGRESS)
                .await
                .unwrap();

            let all: Vec<WorkOrderId> = h
                .work_orders
                .list(&WorkOrderFilter::default())
                .await
                .unwrap()
                .into_iter()
                .map(|wo| wo.id)
                .collect();
            assert_eq!(all, vec![third, second, first], "{backend}");

            let at_a = h
                .work_orders
                .list(&WorkOrderFilter {
                    site_id: Some(a),
                    status: Some(WorkOrderStatus::NEW),
                })
                .await
                .unwrap();
            assert_eq!(at_a.len(), 1, "{backend}");
            assert_eq!(at_a[0].id, first, "{backend}");
        }
    }

    #[tokio::test]
    async fn consuming_past_zero_clamps_and_reports_shortfall() {
        for (backend, h) in harnesses().await {
            let site = h.site("Plant A").await;
            let material = h.material("Bearing").await;
            h.ledger.set_levels(site, material, 5.0, 10.0).await.unwrap();

            let w = h.ledger.consume(site, material, 8.0).await.unwrap();
            assert_eq!(w.qty_on_hand, 0.0, "{backend}");
            assert_eq!(w.deducted, 5.0, "{backend}");
            assert_eq!(w.shortfall, 3.0, "{backend}");
            assert!(w.clamped, "{backend}");

            let inventory = h.ledger.site_inventory(site).await.unwrap();
            assert_eq!(inventory.items.len(), 1, "{backend}");
            assert_eq!(inventory.items[0].qty_on_hand, 0.0, "{backend}");
            assert!(inventory.items[0].low, "{backend}");
            assert_eq!(inventory.items[0].material_name.as_deref(), Some("Bearing"), "{backend}");

            let latest = &h.reporting.events(1).await.unwrap()[0];
            assert_eq!(latest.event_type, "inventory_consume", "{backend}");
            assert_eq!(latest.severity, Severity::Warning, "{backend}");
        }
    }

    #[tokio::test]
    async fn first_mutation_creates_the_record_at_zero() {
        for (backend, h) in harnesses().await {
            let site = SiteId::new();
            let material = MaterialId::new();
            let w = h.ledger.reserve(site, material, 2.0).await.unwrap();
            assert_eq!(w.qty_on_hand, 0.0, "{backend}");
            assert_eq!(w.shortfall, 2.0, "{backend}");

            let level = h.ledger.add(site, material, 7.5).await.unwrap();
            assert_eq!(level.qty_on_hand, 7.5, "{backend}");
            assert_eq!(level.reorder_point, 0.0, "{backend}");
        }
    }

    #[tokio::test]
    async fn add_then_consume_restores_quantity() {
        for (backend, h) in harnesses().await {
            let site = SiteId::new();
            let material = MaterialId::new();
            h.ledger.set_levels(site, material, 12.0, 0.0).await.unwrap();
            h.ledger.add(site, material, 4.0).await.unwrap();
            let w = h.ledger.consume(site, material, 4.0).await.unwrap();
            assert_eq!(w.qty_on_hand, 12.0, "{backend}");
            assert!(!w.clamped, "{backend}");
        }
    }

    #[tokio::test]
    async fn invalid_quantities_are_rejected_without_an_event() {
        for (backend, h) in harnesses().await {
            let site = SiteId::new();
            let material = MaterialId::new();
            let before = h.event_count().await;
            assert!(
                matches!(
                    h.ledger.consume(site, material, -1.0).await,
                    Err(ServiceError::Validation(_))
                ),
                "{backend}"
            );
            assert!(
                matches!(
                    h.ledger.add(site, material, f64::NAN).await,
                    Err(ServiceError::Validation(_))
                ),
                "{backend}"
            );
            assert_eq!(h.event_count().await, before, "{backend}");
            assert!(h.stores.inventory.all_stock().await.unwrap().is_empty(), "{backend}");
        }
    }

    #[tokio::test]
    async fn site_inventory_of_unknown_site_is_not_found() {
        for (backend, h) in harnesses().await {
            assert!(
                matches!(
                    h.ledger.site_inventory(SiteId::new()).await,
                    Err(ServiceError::NotFound("site"))
                ),
                "{backend}"
            );
        }
    }

    #[tokio::test]
    async fn concurrent_consumes_never_go_negative() {
        for (backend, h) in harnesses().await {
            let site = SiteId::new();
            let material = MaterialId::new();
            h.ledger.set_levels(site, material, 10.0, 0.0).await.unwrap();

            let mut tasks = Vec::new();
            for _ in 0..8 {
                let ledger = h.ledger.clone();
                tasks.push(tokio::spawn(async move {
                    ledger.consume(site, material, 3.0).await
                }));
            }
            let mut deducted = 0.0;
            for task in tasks {
                deducted += task.await.unwrap().unwrap().deducted;
            }

            assert_eq!(deducted, 10.0, "{backend}");
            let inventory = h.ledger.list().await.unwrap();
            assert_eq!(inventory[0].qty_on_hand, 0.0, "{backend}");

            // Stamps are taken under the lock, so time order matches append order.
            let mut records = h.stores.audit.recent(20).await.unwrap();
            records.sort_by_key(|r| r.sequence);
            assert_eq!(records.len(), 9, "{backend}");
            assert!(
                records.windows(2).all(|w| w[0].created_at <= w[1].created_at),
                "{backend}"
            );
        }
    }

    #[tokio::test]
    async fn failed_logins_mint_no_session() {
        for (backend, h) in harnesses().await {
            let admin = h.bootstrapped().await;
            h.admin
                .create_user(
                    &admin,
                    NewUser {
                        login: "tech".into(),
                        password: "pw".into(),
                        email: None,
                        roles: vec!["maintainer".into()],
                    },
                )
                .await
                .unwrap();
            let sessions_before = h.sessions.len();

            assert!(
                matches!(h.gate.login("tech", "wrong").await, Err(ServiceError::Unauthorized)),
                "{backend}"
            );
            assert!(
                matches!(h.gate.login("nobody", "pw").await, Err(ServiceError::Unauthorized)),
                "{backend}"
            );
            // Logins match exactly.
            assert!(
                matches!(h.gate.login(" tech", "pw").await, Err(ServiceError::Unauthorized)),
                "{backend}"
            );
            assert!(
                matches!(h.gate.login("Tech", "pw").await, Err(ServiceError::Unauthorized)),
                "{backend}"
            );
            assert_eq!(h.sessions.len(), sessions_before, "{backend}");
            assert!(
                matches!(
                    h.gate.resolve("never-issued").await,
                    Err(ServiceError::Unauthorized)
                ),
                "{backend}"
            );
        }
    }

    #[tokio::test]
    async fn blocking_a_user_revokes_and_prevents_sessions() {
        for (backend, h) in harnesses().await {
            let admin = h.bootstrapped().await;
            let user_id = h
                .admin
                .create_user(
                    &admin,
                    NewUser {
                        login: "tech".into(),
                        password: "pw".into(),
                        email: None,
                        roles: vec![],
                    },
                )
                .await
                .unwrap();
            let token = h.gate.login("tech", "pw").await.unwrap();
            assert_eq!(h.gate.resolve(token.as_str()).await.unwrap().id, user_id, "{backend}");

            h.admin
                .update_user(
                    &admin,
                    user_id,
                    UserPatch {
                        blocked: Some(true),
                        ..Default::default()
                    },
                )
                .await
                .unwrap();

            assert!(
                matches!(h.gate.resolve(token.as_str()).await, Err(ServiceError::Unauthorized)),
                "{backend}"
            );
            assert!(
                matches!(h.gate.login("tech", "pw").await, Err(ServiceError::Unauthorized)),
                "{backend}"
            );
        }
    }

    #[tokio::test]
    async fn successful_login_records_an_auth_event_and_logout_is_idempotent() {
        for (backend, h) in harnesses().await {
            let admin = h.bootstrapped().await;
            let latest = &h.reporting.events(1).await.unwrap()[0];
            assert_eq!(latest.event_type, "auth_login", "{backend}");
            assert_eq!(latest.text, "Login: admin", "{backend}");
            assert!(latest.references(&admin.id.to_string()), "{backend}");

            let token = h.gate.login("admin", "admin-pw").await.unwrap();
            h.gate.logout(token.as_str()).unwrap();
            h.gate.logout(token.as_str()).unwrap();
            assert!(
                matches!(h.gate.resolve(token.as_str()).await, Err(ServiceError::Unauthorized)),
                "{backend}"
            );
        }
    }

    #[tokio::test]
    async fn administration_requires_the_admin_role() {
        for (backend, h) in harnesses().await {
            let admin = h.bootstrapped().await;
            h.admin
                .create_user(
                    &admin,
                    NewUser {
                        login: "planner".into(),
                        password: "pw".into(),
                        email: None,
                        roles: vec!["planner".into()],
                    },
                )
                .await
                .unwrap();
            let token = h.gate.login("planner", "pw").await.unwrap();
            let planner = h.gate.resolve(token.as_str()).await.unwrap();
            assert!(planner.has_role(&Role::new("planner")), "{backend}");

            assert!(
                matches!(h.admin.list_users(&planner).await, Err(ServiceError::Forbidden(_))),
                "{backend}"
            );
            assert!(
                matches!(
                    h.admin.create_role(&planner, "auditor").await,
                    Err(ServiceError::Forbidden(_))
                ),
                "{backend}"
            );

            // A forged actor claiming admin is still checked against stored roles.
            let mut forged = planner.clone();
            forged.roles.push(Role::ADMIN);
            assert!(
                matches!(h.admin.list_roles(&forged).await, Err(ServiceError::Forbidden(_))),
                "{backend}"
            );
        }
    }

    #[tokio::test]
    async fn duplicate_logins_and_role_names_conflict() {
        for (backend, h) in harnesses().await {
            let admin = h.bootstrapped().await;
            let dup = NewUser {
                login: "admin".into(),
                password: "x".into(),
                email: None,
                roles: vec![],
            };
            assert!(
                matches!(h.admin.create_user(&admin, dup).await, Err(ServiceError::Conflict(_))),
                "{backend}"
            );
            assert!(
                matches!(
                    h.admin.create_role(&admin, "planner").await,
                    Err(ServiceError::Conflict(_))
                ),
                "{backend}"
            );
            assert!(
                matches!(h.admin.create_role(&admin, "  ").await, Err(ServiceError::Validation(_))),
                "{backend}"
            );
        }
    }

    #[tokio::test]
    async fn user_roles_are_replaced_and_unknown_names_created() {
        for (backend, h) in harnesses().await {
            let admin = h.bootstrapped().await;
            let id = h
                .admin
                .create_user(
                    &admin,
                    NewUser {
                        login: "buyer".into(),
                        password: "pw".into(),
                        email: Some("buyer@example.com".into()),
                        roles: vec!["procurement".into(), "auditor".into(), "auditor".into()],
                    },
                )
                .await
                .unwrap();

            let view = h
                .admin
                .list_users(&admin)
                .await
                .unwrap()
                .into_iter()
                .find(|u| u.id == id)
                .unwrap();
            assert_eq!(
                view.roles,
                vec![Role::new("procurement"), Role::new("auditor")],
                "{backend}"
            );
            let names: Vec<String> = h
                .admin
                .list_roles(&admin)
                .await
                .unwrap()
                .into_iter()
                .map(|r| r.name.to_string())
                .collect();
            assert!(names.contains(&"auditor".to_string()), "{backend}");

            h.admin
                .update_user(
                    &admin,
                    id,
                    UserPatch {
                        roles: Some(vec!["planner".into()]),
                        ..Default::default()
                    },
                )
                .await
                .unwrap();
            assert_eq!(
                h.stores.users.user_roles(id).await.unwrap(),
                vec![Role::new("planner")],
                "{backend}"
            );
        }
    }

    #[tokio::test]
    async fn deleting_a_role_removes_its_assignments() {
        for (backend, h) in harnesses().await {
            let admin = h.bootstrapped().await;
            let role_id = h.admin.create_role(&admin, "auditor").await.unwrap();
            let user_id = h
                .admin
                .create_user(
                    &admin,
                    NewUser {
                        login: "aud".into(),
                        password: "pw".into(),
                        email: None,
                        roles: vec!["auditor".into()],
                    },
                )
                .await
                .unwrap();

            h.admin
                .rename_role(&admin, role_id, "inspector")
                .await
                .unwrap();
            assert_eq!(
                h.stores.users.user_roles(user_id).await.unwrap(),
                vec![Role::new("inspector")],
                "{backend}"
            );

            h.admin.delete_role(&admin, role_id).await.unwrap();
            assert!(h.stores.users.user_roles(user_id).await.unwrap().is_empty(), "{backend}");

            let before = h.event_count().await;
            h.admin.delete_role(&admin, role_id).await.unwrap();
            assert_eq!(h.event_count().await, before, "{backend}");
        }
    }

    #[tokio::test]
    async fn deleted_users_lose_their_sessions() {
        for (backend, h) in harnesses().await {
            let admin = h.bootstrapped().await;
            let id = h
                .admin
                .create_user(
                    &admin,
                    NewUser {
                        login: "temp".into(),
                        password: "pw".into(),
                        email: None,
                        roles: vec![],
                    },
                )
                .await
                .unwrap();
            let token = h.gate.login("temp", "pw").await.unwrap();
            h.admin.delete_user(&admin, id).await.unwrap();
            assert!(
                matches!(h.gate.resolve(token.as_str()).await, Err(ServiceError::Unauthorized)),
                "{backend}"
            );
        }
    }

    #[tokio::test]
    async fn catalog_updates_of_unknown_ids_are_not_found() {
        for (backend, h) in harnesses().await {
            assert!(
                matches!(
                    h.catalog
                        .update_site(
                            SiteId::new(),
                            SiteDraft {
                                name: "X".into(),
                                region: "Y".into()
                            }
                        )
                        .await,
                    Err(ServiceError::NotFound("site"))
                ),
                "{backend}"
            );

            let id = h.site("Plant A").await;
            h.catalog
                .update_site(
                    id,
                    SiteDraft {
                        name: "Plant A2".into(),
                        region: "East".into(),
                    },
                )
                .await
                .unwrap();
            let site = h.catalog.get_site(id).await.unwrap();
            assert_eq!(site.name, "Plant A2", "{backend}");
            assert_eq!(site.region, "East", "{backend}");
        }
    }

    #[tokio::test]
    async fn reports_count_statuses_stock_and_per_site_kpis() {
        for (backend, h) in harnesses().await {
            let a = h.site("Plant A").await;
            let b = h.site("Plant B").await;
            let material = h.material("Belt").await;

            let one = h.work_orders.create(high_priority(a)).await.unwrap();
            h.work_orders.create(high_priority(a)).await.unwrap();
            h.work_orders
                .create(NewWorkOrder::new(a, WorkOrderType::Preventive))
                .await
                .unwrap();
            h.work_orders
                .set_status(one, WorkOrderStatus::CLOSED)
                .await
                .unwrap();

            h.ledger.set_levels(a, material, 1.0, 5.0).await.unwrap();
            h.ledger.set_levels(b, material, 5.0, 5.0).await.unwrap();

            let dashboard = h.reporting.dashboard().await.unwrap();
            assert_eq!(dashboard.work_orders_total, 3, "{backend}");
            let statuses: Vec<(String, usize)> = dashboard
                .work_orders_by_status
                .iter()
                .map(|s| (s.status.to_string(), s.count))
                .collect();
            assert_eq!(
                statuses,
                vec![("closed".to_string(), 1), ("new".to_string(), 2)],
                "{backend}"
            );
            assert_eq!(dashboard.inventory.low, 1, "{backend}");
            assert_eq!(dashboard.inventory.ok, 1, "{backend}");

            let kpi = h.reporting.kpi().await.unwrap();
            let at_a = kpi.iter().find(|k| k.site_id == a).unwrap();
            assert_eq!((at_a.wo_total, at_a.wo_done, at_a.wo_high), (3, 1, 2), "{backend}");
            let at_b = kpi.iter().find(|k| k.site_id == b).unwrap();
            assert_eq!(at_b.wo_total, 0, "{backend}");
            assert_eq!(at_b.site_name, "Plant B", "{backend}");
        }
    }
}
