//! Push transports for progress streams.
//!
//! A session's events are delivered in order as either Server-Sent Events
//! (one `data:` frame per event) or newline-delimited JSON. Both bodies end
//! when the event stream ends, which is right after the terminal event.

use axum::body::Body;
use axum::http::header;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use futures_util::{Stream, StreamExt};
use r402x::event::ProgressEvent;
use serde::Deserialize;

use crate::constants::NDJSON_CONTENT_TYPE;

/// Wire format of a progress stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamFormat {
    /// `text/event-stream`.
    #[default]
    Sse,
    /// `application/x-ndjson`.
    Ndjson,
}

/// Query string selecting a [`StreamFormat`], e.g. `?format=ndjson`.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct FormatQuery {
    /// Requested format; SSE when absent.
    #[serde(default)]
    pub format: StreamFormat,
}

/// Wraps `events` as a Server-Sent Events response.
pub fn sse<S>(events: S) -> Sse<impl Stream<Item = Result<Event, axum::Error>>>
where
    S: Stream<Item = ProgressEvent> + Send + 'static,
{
    Sse::new(events.map(|event| Event::default().json_data(&event))).keep_alive(KeepAlive::default())
}

/// Wraps `events` as a newline-delimited JSON response.
pub fn ndjson<S>(events: S) -> Response
where
    S: Stream<Item = ProgressEvent> + Send + 'static,
{
    let lines = events.map(|event| {
        serde_json::to_vec(&event).map(|mut line| {
            line.push(b'\n');
            line
        })
    });
    (
        [(header::CONTENT_TYPE, NDJSON_CONTENT_TYPE)],
        Body::from_stream(lines),
    )
        .into_response()
}

/// Wraps `events` in the requested format.
pub fn respond<S>(format: StreamFormat, events: S) -> Response
where
    S: Stream<Item = ProgressEvent> + Send + 'static,
{
    match format {
        StreamFormat::Sse => sse(events).into_response(),
        StreamFormat::Ndjson => ndjson(events),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;
    use r402x::event::{EventKind, Step};
    use serde_json::json;

    fn trace() -> Vec<ProgressEvent> {
        vec![
            ProgressEvent::progress(Step::Generating, "Generating payment requirements and header"),
            ProgressEvent::progress(Step::Verifying, "Verifying payment with facilitator"),
            ProgressEvent::success("done", json!({ "transaction": { "txHash": "0x01" } })),
        ]
    }

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_ndjson_one_event_per_line_in_order() {
        let response = ndjson(stream::iter(trace()));
        assert_eq!(response.headers()[header::CONTENT_TYPE], NDJSON_CONTENT_TYPE);
        let text = body_text(response).await;
        let events: Vec<ProgressEvent> = text
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].step, Some(Step::Generating));
        assert_eq!(events[1].message, "Verifying payment with facilitator");
        assert_eq!(events[2].kind, EventKind::Success);
    }

    #[tokio::test]
    async fn test_sse_frames_carry_json_events() {
        let response = sse(stream::iter(trace())).into_response();
        assert_eq!(response.headers()[header::CONTENT_TYPE], "text/event-stream");
        let text = body_text(response).await;
        let frames: Vec<serde_json::Value> = text
            .split("\n\n")
            .filter_map(|frame| frame.strip_prefix("data:").map(str::trim))
            .map(|data| serde_json::from_str(data).unwrap())
            .collect();
        assert_eq!(frames.len(), 3);
        assert_eq!(frames[0]["type"], "progress");
        assert_eq!(frames[1]["step"], "verifying");
        assert_eq!(frames[2]["type"], "success");
        assert_eq!(frames[2]["data"]["transaction"]["txHash"], "0x01");
    }

    #[test]
    fn test_format_query_defaults_to_sse() {
        let query: FormatQuery = serde_json::from_value(json!({})).unwrap();
        assert_eq!(query.format, StreamFormat::Sse);
        let query: FormatQuery = serde_json::from_value(json!({ "format": "ndjson" })).unwrap();
        assert_eq!(query.format, StreamFormat::Ndjson);
    }
}
