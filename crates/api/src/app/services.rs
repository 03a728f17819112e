//! Service wiring: stores, audit trail, event bus and the realtime bridge.

use std::convert::Infallible;
use std::sync::Arc;

use anyhow::Context;
use axum::response::sse::{Event as SseEvent, KeepAlive, Sse};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::{Stream, StreamExt};
use tracing::{info, warn};

use maintops_auth::{InMemorySessionStore, SessionStore};
use maintops_events::{AuditRecord, EventBus, InMemoryEventBus};
use maintops_infra::PublishingAuditLog;
use maintops_infra::seed::{SeedOptions, bootstrap};
use maintops_infra::services::{
    AccessGate, Administration, CatalogService, InventoryLedger, Reporting, WorkOrderService,
};
use maintops_infra::sqlite::SqliteStore;
use maintops_infra::store::Stores;

use crate::config::AppConfig;

/// Capacity of the realtime channel; slow SSE clients lose the oldest records.
const REALTIME_CAPACITY: usize = 256;

#[derive(Clone)]
pub struct AppServices {
    pub work_orders: WorkOrderService,
    pub inventory: InventoryLedger,
    pub catalog: CatalogService,
    pub access: AccessGate,
    pub admin: Administration,
    pub reporting: Reporting,
    pub events_limit: usize,
    realtime_tx: broadcast::Sender<AuditRecord>,
}

impl AppServices {
    /// Wire every service over `stores`. Appended audit records are published on an
    /// in-process bus and bridged onto a broadcast channel for SSE clients.
    pub fn wire(stores: Stores, sessions: Arc<dyn SessionStore>, events_limit: usize) -> Self {
        let bus: Arc<InMemoryEventBus<AuditRecord>> = Arc::new(InMemoryEventBus::new());
        let (realtime_tx, _realtime_rx) = broadcast::channel::<AuditRecord>(REALTIME_CAPACITY);

        // Background bridge: bus -> broadcast. Ends when the bus (owned by the audit log)
        // is dropped.
        {
            let sub = bus.subscribe();
            let realtime_tx = realtime_tx.clone();
            tokio::task::spawn_blocking(move || {
                while let Ok(record) = sub.recv() {
                    // No SSE client connected is not an error.
                    let _ = realtime_tx.send(record);
                }
            });
        }

        let audit = Arc::new(PublishingAuditLog::new(stores.audit.clone(), bus));
        let stores = stores.with_audit(audit);

        let access = AccessGate::new(&stores, sessions);
        Self {
            work_orders: WorkOrderService::new(&stores),
            inventory: InventoryLedger::new(&stores),
            catalog: CatalogService::new(&stores),
            admin: Administration::new(&stores, access.clone()),
            reporting: Reporting::new(&stores),
            access,
            events_limit,
            realtime_tx,
        }
    }

    /// Live feed of appended audit records as server-sent events.
    pub fn event_stream(&self) -> Sse<impl Stream<Item = Result<SseEvent, Infallible>> + use<>> {
        let stream = BroadcastStream::new(self.realtime_tx.subscribe()).filter_map(|msg| match msg {
            Ok(record) => SseEvent::default()
                .event(record.event_type.clone())
                .id(record.sequence.to_string())
                .json_data(&record)
                .ok()
                .map(Ok),
            Err(lagged) => {
                warn!(error = %lagged, "sse client lagging; records dropped");
                None
            }
        });
        Sse::new(stream).keep_alive(KeepAlive::default())
    }
}

/// Build the full service set from configuration: connect storage, seed on first start.
pub async fn build_services(config: &AppConfig) -> anyhow::Result<AppServices> {
    let stores = match &config.database_url {
        Some(url) => {
            let store = SqliteStore::connect(url)
                .await
                .with_context(|| format!("connecting to {url}"))?;
            Stores::sqlite(store)
        }
        None => {
            warn!("DATABASE_URL not set; using in-memory stores (data is lost on restart)");
            Stores::in_memory()
        }
    };

    let report = bootstrap(
        &stores,
        &SeedOptions {
            admin_password: config.admin_password.clone(),
            demo_data: config.seed_demo,
        },
    )
    .await
    .context("bootstrapping stores")?;
    info!(
        roles = report.roles,
        admin = report.admin,
        demo = report.demo,
        "bootstrap finished"
    );

    let sessions: Arc<dyn SessionStore> = match config.session_ttl_secs {
        Some(secs) => {
            let secs = i64::try_from(secs).context("MAINTOPS_SESSION_TTL_SECS out of range")?;
            Arc::new(InMemorySessionStore::with_ttl(chrono::Duration::seconds(secs)))
        }
        None => Arc::new(InMemorySessionStore::new()),
    };

    Ok(AppServices::wire(stores, sessions, config.events_limit))
}
