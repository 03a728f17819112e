use async_trait::async_trait;
use sqlx::FromRow;
use tracing::instrument;

use maintops_events::{AuditRecord, NewAuditRecord};

use super::rows::AuditRow;
use super::{SqliteStore, map_sqlx_error};
use crate::store::{AuditLog, StoreError};

#[async_trait]
impl AuditLog for SqliteStore {
    #[instrument(skip(self, record), fields(event_type = %record.event_type), err)]
    async fn append(&self, record: NewAuditRecord) -> Result<AuditRecord, StoreError> {
        let meta = record
            .meta
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| StoreError::backend(format!("failed to encode event meta: {e}")))?;

        let result = sqlx::query(
            r#"
            INSERT INTO events (id, type, text, severity, created_at, meta)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(record.id.as_uuid())
        .bind(&record.event_type)
        .bind(&record.text)
        .bind(record.severity.as_str())
        .bind(record.created_at)
        .bind(meta)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("append_event", e))?;

        let sequence = result.last_insert_rowid() as u64;
        Ok(AuditRecord::committed(record, sequence))
    }

    #[instrument(skip(self), err)]
    async fn recent(&self, limit: usize) -> Result<Vec<AuditRecord>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT seq, id, type, text, severity, created_at, meta
            FROM events
            ORDER BY created_at DESC, seq DESC
            LIMIT ?
            "#,
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("recent_events", e))?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let record = AuditRow::from_row(&row)
                .and_then(AuditRecord::try_from)
                .map_err(|e| map_sqlx_error("decode_event", e))?;
            out.push(record);
        }
        Ok(out)
    }
}
