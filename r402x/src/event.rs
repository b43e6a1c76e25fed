//! Progress events and event sinks.
//!
//! Pipelines report every state transition as a [`ProgressEvent`], emitted
//! *before* the corresponding work starts so that observers see "about to do
//! X" rather than only "X done". The event shape is the wire format of every
//! transport: a push stream writes one JSON object per event, an in-process
//! callback receives the same struct.
//!
//! # JSON Format
//!
//! ```json
//! { "type": "progress", "step": "commit", "message": "Calculating commitment", "timestamp": 1718000000000 }
//! ```

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;

use crate::timestamp::now_millis;

/// A pipeline state.
///
/// The settlement pipeline walks `discover → match → prepare → commit → sign
/// → submit → confirm`; the facilitator pipeline walks `generating →
/// verifying → settling`. Within a pipeline, steps only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Step {
    /// Fetching the service registry.
    Discover,
    /// Locating the requested service.
    Match,
    /// Validating the descriptor and assembling settlement parameters.
    Prepare,
    /// Obtaining the commitment from the router.
    Commit,
    /// Acquiring the transfer authorization signature.
    Sign,
    /// Submitting the settlement transaction.
    Submit,
    /// Waiting for the transaction to be mined.
    Confirm,
    /// Building requirements and the signed payment header.
    Generating,
    /// Asking the facilitator to verify the payment header.
    Verifying,
    /// Asking the facilitator to settle the payment.
    Settling,
}

impl Step {
    /// Wire name of the step.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Discover => "discover",
            Self::Match => "match",
            Self::Prepare => "prepare",
            Self::Commit => "commit",
            Self::Sign => "sign",
            Self::Submit => "submit",
            Self::Confirm => "confirm",
            Self::Generating => "generating",
            Self::Verifying => "verifying",
            Self::Settling => "settling",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of a progress event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    /// A state transition; more events follow.
    Progress,
    /// Terminal success.
    Success,
    /// Terminal failure.
    Error,
}

/// A single entry of a session's progress trace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEvent {
    /// Event kind.
    #[serde(rename = "type")]
    pub kind: EventKind,
    /// Pipeline step this event belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<Step>,
    /// Human-readable description.
    pub message: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: u64,
    /// Optional structured payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ProgressEvent {
    /// Creates a progress event for `step`.
    #[must_use]
    pub fn progress(step: Step, message: impl Into<String>) -> Self {
        Self {
            kind: EventKind::Progress,
            step: Some(step),
            message: message.into(),
            timestamp: now_millis(),
            data: None,
        }
    }

    /// Creates a terminal success event.
    #[must_use]
    pub fn success(message: impl Into<String>, data: Value) -> Self {
        Self {
            kind: EventKind::Success,
            step: None,
            message: message.into(),
            timestamp: now_millis(),
            data: Some(data),
        }
    }

    /// Creates a terminal error event raised while in `step`.
    #[must_use]
    pub fn error(step: Option<Step>, message: impl Into<String>, data: Value) -> Self {
        Self {
            kind: EventKind::Error,
            step,
            message: message.into(),
            timestamp: now_millis(),
            data: Some(data),
        }
    }

    /// Attaches structured data, consuming and returning `self`.
    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Returns `true` for success and error events.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self.kind, EventKind::Success | EventKind::Error)
    }
}

/// Receives progress events.
///
/// Emission is synchronous and must not block: sinks either hand the event
/// to a channel or call straight into in-process code.
pub trait EventSink: Send + Sync {
    /// Delivers one event.
    fn emit(&self, event: &ProgressEvent);
}

impl<T: EventSink + ?Sized> EventSink for Arc<T> {
    fn emit(&self, event: &ProgressEvent) {
        (**self).emit(event);
    }
}

impl<T: EventSink + ?Sized> EventSink for &T {
    fn emit(&self, event: &ProgressEvent) {
        (**self).emit(event);
    }
}

/// Direct-callback transport for in-process consumers.
pub struct CallbackSink<F>(F);

impl<F> CallbackSink<F>
where
    F: Fn(&ProgressEvent) + Send + Sync,
{
    /// Wraps a callback.
    pub const fn new(callback: F) -> Self {
        Self(callback)
    }
}

impl<F> fmt::Debug for CallbackSink<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackSink").finish_non_exhaustive()
    }
}

impl<F> EventSink for CallbackSink<F>
where
    F: Fn(&ProgressEvent) + Send + Sync,
{
    fn emit(&self, event: &ProgressEvent) {
        (self.0)(event);
    }
}

/// Channel transport feeding a push stream.
///
/// Events emitted after the receiver is dropped are discarded; a client that
/// disconnects does not abort a settlement already in flight.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<ProgressEvent>,
}

/// Creates a connected [`ChannelSink`] and receiver pair.
#[must_use]
pub fn channel() -> (ChannelSink, mpsc::UnboundedReceiver<ProgressEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (ChannelSink { tx }, rx)
}

impl EventSink for ChannelSink {
    fn emit(&self, event: &ProgressEvent) {
        if self.tx.send(event.clone()).is_err() {
            #[cfg(feature = "telemetry")]
            tracing::debug!(step = ?event.step, "progress receiver dropped; event discarded");
        }
    }
}

/// Fans each event out to several sinks, in registration order.
#[derive(Default, Clone)]
pub struct FanoutSink {
    sinks: Vec<Arc<dyn EventSink>>,
}

impl fmt::Debug for FanoutSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FanoutSink")
            .field("sinks", &self.sinks.len())
            .finish()
    }
}

impl FanoutSink {
    /// Creates an empty fan-out.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a sink, consuming and returning `self`.
    #[must_use]
    pub fn with(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sinks.push(sink);
        self
    }
}

impl EventSink for FanoutSink {
    fn emit(&self, event: &ProgressEvent) {
        for sink in &self.sinks {
            sink.emit(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_progress_event_wire_shape() {
        let event = ProgressEvent::progress(Step::Commit, "Calculating commitment");
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "progress");
        assert_eq!(json["step"], "commit");
        assert_eq!(json["message"], "Calculating commitment");
        assert!(json["timestamp"].is_u64());
        assert!(json.get("data").is_none());
    }

    #[test]
    fn test_terminal_events() {
        let ok = ProgressEvent::success("done", serde_json::json!({}));
        let err = ProgressEvent::error(Some(Step::Sign), "rejected", serde_json::json!({}));
        assert!(ok.is_terminal());
        assert!(err.is_terminal());
        assert!(!ProgressEvent::progress(Step::Discover, "x").is_terminal());
        assert_eq!(serde_json::to_value(&err).unwrap()["type"], "error");
    }

    #[test]
    fn test_callback_and_channel_receive_identical_events() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_by_callback = Arc::clone(&seen);
        let callback = CallbackSink::new(move |event: &ProgressEvent| {
            seen_by_callback.lock().unwrap().push(event.clone());
        });
        let (channel_sink, mut rx) = channel();
        let fanout = FanoutSink::new()
            .with(Arc::new(callback))
            .with(Arc::new(channel_sink));

        let event = ProgressEvent::progress(Step::Match, "Looking up service");
        fanout.emit(&event);

        assert_eq!(seen.lock().unwrap().as_slice(), &[event.clone()]);
        assert_eq!(rx.try_recv().unwrap(), event);
    }

    #[test]
    fn test_channel_sink_tolerates_dropped_receiver() {
        let (sink, rx) = channel();
        drop(rx);
        sink.emit(&ProgressEvent::progress(Step::Submit, "Submitting"));
    }
}
