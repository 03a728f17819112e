use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Query, rejection::QueryRejection},
    response::sse::{Event as SseEvent, Sse},
    routing::get,
};
use tokio_stream::Stream;

use crate::app::dto::{EventOut, EventsQuery, Results};
use crate::app::errors::ApiResult;
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/events", get(recent_events))
        .route("/events/stream", get(stream_events))
}

/// GET /events?limit
///
/// Most recent audit records, newest first.
pub async fn recent_events(
    Extension(services): Extension<Arc<AppServices>>,
    query: Result<Query<EventsQuery>, QueryRejection>,
) -> ApiResult<Json<Results<EventOut>>> {
    let Query(query) = query?;
    let limit = query.limit.unwrap_or(services.events_limit);
    let records = services.reporting.events(limit).await?;
    Ok(Json(
        records.into_iter().map(EventOut::from).collect::<Vec<_>>().into(),
    ))
}

/// GET /events/stream
///
/// Records appended after the client connected, one SSE message each (event name is
/// the record type, data is the record JSON). Lossy under backpressure.
pub async fn stream_events(
    Extension(services): Extension<Arc<AppServices>>,
) -> Sse<impl Stream<Item = Result<SseEvent, Infallible>>> {
    services.event_stream()
}
