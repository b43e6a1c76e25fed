//! Per-execution progress session.
//!
//! An [`ExecutionSession`] lives for exactly one attempt. It forwards every
//! event to its sink, keeps the ordered trace, and records the terminal
//! outcome. Once a terminal event has been emitted, further emissions are
//! dropped: a session ends exactly once and is never resumed.

use std::fmt;

use serde_json::{Value, json};

use crate::error::{ErrorCategory, ExecutionError};
use crate::event::{EventSink, ProgressEvent, Step};

/// Terminal outcome of a session.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionOutcome {
    /// The session succeeded with the given payload.
    Success(Value),
    /// The session failed.
    Error {
        /// Human-readable failure message.
        message: String,
        /// Machine-readable failure category.
        category: ErrorCategory,
        /// Step at which the failure happened.
        step: Option<Step>,
    },
}

/// Ordered progress trace of one execution attempt.
pub struct ExecutionSession<'a> {
    sink: &'a dyn EventSink,
    events: Vec<ProgressEvent>,
    current: Option<Step>,
    outcome: Option<SessionOutcome>,
}

impl fmt::Debug for ExecutionSession<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionSession")
            .field("events", &self.events.len())
            .field("current", &self.current)
            .field("outcome", &self.outcome)
            .finish_non_exhaustive()
    }
}

impl<'a> ExecutionSession<'a> {
    /// Starts a new session that reports to `sink`.
    #[must_use]
    pub fn new(sink: &'a dyn EventSink) -> Self {
        Self {
            sink,
            events: Vec::new(),
            current: None,
            outcome: None,
        }
    }

    /// Moves to `step` and announces it.
    ///
    /// Steps only move forward; announcing an earlier or equal step is a
    /// programming error.
    pub fn advance(&mut self, step: Step, message: impl Into<String>) {
        debug_assert!(
            self.current.is_none_or(|current| step > current),
            "session steps must move forward"
        );
        self.current = Some(step);
        self.record(ProgressEvent::progress(step, message));
    }

    /// Emits an additional progress event for the current step.
    pub fn note(&mut self, message: impl Into<String>, data: Option<Value>) {
        let Some(step) = self.current else {
            return;
        };
        let mut event = ProgressEvent::progress(step, message);
        event.data = data;
        self.record(event);
    }

    /// Ends the session successfully.
    pub fn succeed(&mut self, message: impl Into<String>, data: Value) {
        if self.is_finished() {
            return;
        }
        self.record(ProgressEvent::success(message, data.clone()));
        self.outcome = Some(SessionOutcome::Success(data));
    }

    /// Ends the session with `error`, attributing it to the current step.
    pub fn fail(&mut self, error: &ExecutionError) {
        if self.is_finished() {
            return;
        }
        let category = error.category();
        let message = error.to_string();
        let data = json!({
            "category": category,
            "step": self.current,
        });
        #[cfg(feature = "telemetry")]
        tracing::warn!(step = ?self.current, ?category, %message, "execution session failed");
        self.record(ProgressEvent::error(self.current, message.clone(), data));
        self.outcome = Some(SessionOutcome::Error {
            message,
            category,
            step: self.current,
        });
    }

    /// Returns the events emitted so far, in order.
    #[must_use]
    pub fn events(&self) -> &[ProgressEvent] {
        &self.events
    }

    /// Returns the step most recently announced.
    #[must_use]
    pub const fn current_step(&self) -> Option<Step> {
        self.current
    }

    /// Returns the terminal outcome, if the session has ended.
    #[must_use]
    pub const fn outcome(&self) -> Option<&SessionOutcome> {
        self.outcome.as_ref()
    }

    /// Returns `true` once a terminal event has been emitted.
    #[must_use]
    pub const fn is_finished(&self) -> bool {
        self.outcome.is_some()
    }

    fn record(&mut self, event: ProgressEvent) {
        if self.is_finished() {
            return;
        }
        self.sink.emit(&event);
        self.events.push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{EventKind, channel};

    #[test]
    fn test_session_records_ordered_trace() {
        let (sink, mut rx) = channel();
        let mut session = ExecutionSession::new(&sink);
        session.advance(Step::Discover, "Fetching services");
        session.advance(Step::Match, "Looking up service");
        session.succeed("Done", json!({ "ok": true }));

        let kinds: Vec<_> = session.events().iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![EventKind::Progress, EventKind::Progress, EventKind::Success]
        );
        assert_eq!(session.current_step(), Some(Step::Match));
        assert!(matches!(session.outcome(), Some(SessionOutcome::Success(_))));
        for expected in session.events() {
            assert_eq!(&rx.try_recv().unwrap(), expected);
        }
    }

    #[test]
    fn test_session_emits_single_terminal_event() {
        let (sink, _rx) = channel();
        let mut session = ExecutionSession::new(&sink);
        session.advance(Step::Sign, "Requesting signature");
        session.fail(&ExecutionError::UserRejected("declined".into()));
        session.succeed("late", json!({}));
        session.note("ignored", None);

        assert_eq!(session.events().len(), 2);
        let last = session.events().last().unwrap();
        assert_eq!(last.kind, EventKind::Error);
        assert_eq!(last.data.as_ref().unwrap()["category"], "user_rejected");
        assert_eq!(last.data.as_ref().unwrap()["step"], "sign");
        assert_eq!(
            session.outcome(),
            Some(&SessionOutcome::Error {
                message: "Signature request rejected: declined".into(),
                category: ErrorCategory::UserRejected,
                step: Some(Step::Sign),
            })
        );
    }
}
