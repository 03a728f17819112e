//! Audit trail helpers: recording domain events and fanning appended records out.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use maintops_events::{AuditRecord, Event, EventBus, NewAuditRecord};

use crate::store::{AuditLog, StoreError};

/// Append one domain event to the audit log.
pub async fn record<E: Event>(log: &dyn AuditLog, event: &E) -> Result<AuditRecord, StoreError> {
    log.append(NewAuditRecord::from_event(event)).await
}

/// Audit log decorator that publishes every committed record on a bus.
///
/// The append is the source of truth: a failed publish is logged and swallowed.
pub struct PublishingAuditLog<B> {
    inner: Arc<dyn AuditLog>,
    bus: B,
}

impl<B> PublishingAuditLog<B>
where
    B: EventBus<AuditRecord>,
{
    pub fn new(inner: Arc<dyn AuditLog>, bus: B) -> Self {
        Self { inner, bus }
    }
}

#[async_trait]
impl<B> AuditLog for PublishingAuditLog<B>
where
    B: EventBus<AuditRecord>,
{
    async fn append(&self, record: NewAuditRecord) -> Result<AuditRecord, StoreError> {
        let committed = self.inner.append(record).await?;
        if let Err(err) = self.bus.publish(committed.clone()) {
            warn!(
                event_type = %committed.event_type,
                sequence = committed.sequence,
                error = %err,
                "failed to publish audit record"
            );
        }
        Ok(committed)
    }

    async fn recent(&self, limit: usize) -> Result<Vec<AuditRecord>, StoreError> {
        self.inner.recent(limit).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::InMemoryAuditLog;
    use chrono::Utc;
    use maintops_events::{InMemoryEventBus, Severity};
    use std::time::Duration;

    #[tokio::test]
    async fn appended_records_reach_subscribers() {
        let bus = Arc::new(InMemoryEventBus::<AuditRecord>::new());
        let sub = bus.subscribe();
        let log = PublishingAuditLog::new(Arc::new(InMemoryAuditLog::new()), bus.clone());

        let committed = log
            .append(NewAuditRecord::new("probe", "probe", Severity::Info, Utc::now()))
            .await
            .unwrap();

        let received = sub.recv_timeout(Duration::from_millis(100)).unwrap();
        assert_eq!(received, committed);
        assert_eq!(log.recent(10).await.unwrap(), vec![committed]);
    }

    #[tokio::test]
    async fn sequence_increases_per_append() {
        let log = InMemoryAuditLog::new();
        let at = Utc::now();
        let a = log
            .append(NewAuditRecord::new("a", "a", Severity::Info, at))
            .await
            .unwrap();
        let b = log
            .append(NewAuditRecord::new("b", "b", Severity::Info, at))
            .await
            .unwrap();
        assert!(b.sequence > a.sequence);

        let recent = log.recent(1).await.unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].event_type, "b");
    }
}
