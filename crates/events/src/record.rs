//! Audit records: the persisted form of events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use maintops_core::EventId;

use crate::event::{Event, Severity};

/// Number of records returned by the events feed when the caller gives no limit.
pub const DEFAULT_RECENT_LIMIT: usize = 40;

/// An audit record ready to be appended (not yet assigned a sequence number).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAuditRecord {
    pub id: EventId,
    pub event_type: String,
    pub text: String,
    pub severity: Severity,
    pub created_at: DateTime<Utc>,
    pub meta: Option<JsonValue>,
}

impl NewAuditRecord {
    pub fn new(
        event_type: impl Into<String>,
        text: impl Into<String>,
        severity: Severity,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: EventId::new(),
            event_type: event_type.into(),
            text: text.into(),
            severity,
            created_at,
            meta: None,
        }
    }

    pub fn with_meta(mut self, meta: JsonValue) -> Self {
        self.meta = Some(meta);
        self
    }

    /// Capture a typed domain event as an audit record.
    pub fn from_event<E: Event>(event: &E) -> Self {
        Self {
            id: EventId::new(),
            event_type: event.event_type().to_string(),
            text: event.describe(),
            severity: event.severity(),
            created_at: event.occurred_at(),
            meta: event.metadata(),
        }
    }
}

/// An appended audit record.
///
/// `sequence` is assigned by the log at append time and increases monotonically; it
/// orders records that share a creation timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub id: EventId,
    pub sequence: u64,
    pub event_type: String,
    pub text: String,
    pub severity: Severity,
    pub created_at: DateTime<Utc>,
    pub meta: Option<JsonValue>,
}

impl AuditRecord {
    pub fn committed(record: NewAuditRecord, sequence: u64) -> Self {
        Self {
            id: record.id,
            sequence,
            event_type: record.event_type,
            text: record.text,
            severity: record.severity,
            created_at: record.created_at,
            meta: record.meta,
        }
    }

    /// Whether any top-level metadata value equals `id` (e.g. a work order id).
    pub fn references(&self, id: &str) -> bool {
        match &self.meta {
            Some(JsonValue::Object(map)) => map.values().any(|v| v.as_str() == Some(id)),
            _ => false,
        }
    }

    /// Newest-first ordering used by the events feed.
    pub fn newest_first(a: &AuditRecord, b: &AuditRecord) -> core::cmp::Ordering {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| b.sequence.cmp(&a.sequence))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Clone)]
    struct Probe {
        at: DateTime<Utc>,
    }

    impl Event for Probe {
        fn event_type(&self) -> &'static str {
            "probe"
        }

        fn severity(&self) -> Severity {
            Severity::Warning
        }

        fn describe(&self) -> String {
            "probe fired".to_string()
        }

        fn metadata(&self) -> Option<JsonValue> {
            Some(json!({ "probe_id": "abc" }))
        }

        fn occurred_at(&self) -> DateTime<Utc> {
            self.at
        }
    }

    #[test]
    fn from_event_captures_every_field() {
        let at = Utc::now();
        let rec = NewAuditRecord::from_event(&Probe { at });
        assert_eq!(rec.event_type, "probe");
        assert_eq!(rec.text, "probe fired");
        assert_eq!(rec.severity, Severity::Warning);
        assert_eq!(rec.created_at, at);

        let committed = AuditRecord::committed(rec, 7);
        assert_eq!(committed.sequence, 7);
        assert!(committed.references("abc"));
        assert!(!committed.references("xyz"));
    }

    #[test]
    fn newest_first_breaks_timestamp_ties_by_sequence() {
        let at = Utc::now();
        let a = AuditRecord::committed(NewAuditRecord::new("a", "a", Severity::Info, at), 1);
        let b = AuditRecord::committed(NewAuditRecord::new("b", "b", Severity::Info, at), 2);
        let mut v = vec![a, b];
        v.sort_by(AuditRecord::newest_first);
        assert_eq!(v[0].event_type, "b");
    }
}
