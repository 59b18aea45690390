//! FIFO request queue for a single-threaded worker
//!
//! The worker answers requests strictly in the order it reads them, so the
//! response on the next stdout line belongs to the oldest request written to
//! it. At most one queue entry is in flight at a time; the next entry is only
//! handed out for writing once the current one is resolved, rejected, or
//! expired.
//!
//! An entry that expires while in flight is remembered as *abandoned*. Its
//! response may still arrive later, ahead of the next entry's response, and
//! must be discarded rather than delivered to the new head. When the worker
//! echoes `requestId`, the echo is used instead of position.
//!
//! Every entry leaves the queue exactly once: removal always happens before
//! its responder is consumed.

use super::protocol::{decode_line, DecodedLine, InferenceResponse};
use crate::error::{InferenceError, InferenceResult};
use std::collections::VecDeque;
use tokio::sync::oneshot;

/// Delivery side of a waiting caller
pub type Responder = oneshot::Sender<InferenceResult<InferenceResponse>>;

struct PendingRequest {
    request_id: String,
    line: String,
    responder: Responder,
    in_flight: bool,
}

impl PendingRequest {
    fn resolve(self, result: InferenceResult<InferenceResponse>) {
        // Caller may have stopped waiting
        let _ = self.responder.send(result);
    }
}

/// What happened to one stdout line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineOutcome {
    /// Response delivered to its caller
    Delivered { request_id: String },
    /// Caller received an error (worker-reported or unparsable line)
    Rejected { request_id: String },
    /// Response for an abandoned (timed out) or unknown request, dropped
    Discarded { request_id: Option<String> },
    /// Nothing was in flight to receive it
    Unsolicited,
}

/// Ordered queue of pending worker requests
#[derive(Default)]
pub struct RequestQueue {
    entries: VecDeque<PendingRequest>,
    abandoned: VecDeque<String>,
}

impl RequestQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of pending entries (waiting or in flight)
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of timed-out in-flight requests whose response has not arrived
    pub fn abandoned_len(&self) -> usize {
        self.abandoned.len()
    }

    /// Whether the head has been written to the worker
    pub fn head_in_flight(&self) -> bool {
        self.entries.front().is_some_and(|e| e.in_flight)
    }

    /// Append a request; it is dispatched once it reaches the head
    pub fn push(&mut self, request_id: String, line: String, responder: Responder) {
        self.entries.push_back(PendingRequest {
            request_id,
            line,
            responder,
            in_flight: false,
        });
    }

    /// Mark the head in flight and return `(request_id, line)` to write
    ///
    /// Returns `None` when the queue is empty or the head is already in flight.
    pub fn take_dispatch(&mut self) -> Option<(String, String)> {
        let head = self.entries.front_mut()?;
        if head.in_flight {
            return None;
        }
        head.in_flight = true;
        Some((head.request_id.clone(), head.line.clone()))
    }

    /// Route one stdout line to the request it answers
    pub fn route_line(&mut self, line: &str) -> LineOutcome {
        self.route(decode_line(line))
    }

    /// Route a stdout line that could not be read as text
    pub fn route_malformed(&mut self, reason: impl Into<String>) -> LineOutcome {
        self.route(Err(InferenceError::InvalidWorkerResponse(reason.into())))
    }

    fn route(&mut self, decoded: InferenceResult<DecodedLine>) -> LineOutcome {
        let decoded = match decoded {
            Ok(decoded) => decoded,
            Err(err) => {
                // Unparsable: blame the oldest outstanding write
                if let Some(request_id) = self.abandoned.pop_front() {
                    return LineOutcome::Discarded {
                        request_id: Some(request_id),
                    };
                }
                return match self.pop_in_flight() {
                    Some(entry) => {
                        let request_id = entry.request_id.clone();
                        entry.resolve(Err(err));
                        LineOutcome::Rejected { request_id }
                    }
                    None => LineOutcome::Unsolicited,
                };
            }
        };

        if let Some(echoed) = decoded.request_id {
            let head_matches = self
                .entries
                .front()
                .is_some_and(|e| e.in_flight && e.request_id == echoed);

            if head_matches {
                // Anything written before the head has been answered or lost
                self.abandoned.clear();
                return self.deliver_head(decoded.result);
            }

            if let Some(pos) = self.abandoned.iter().position(|id| *id == echoed) {
                self.abandoned.remove(pos);
            }
            return LineOutcome::Discarded {
                request_id: Some(echoed),
            };
        }

        if let Some(request_id) = self.abandoned.pop_front() {
            return LineOutcome::Discarded {
                request_id: Some(request_id),
            };
        }

        if self.head_in_flight() {
            self.deliver_head(decoded.result)
        } else {
            LineOutcome::Unsolicited
        }
    }

    /// Remove an entry that exceeded its timeout, wherever it is queued
    ///
    /// Returns `Some(was_in_flight)` if the entry was still pending, `None` if it
    /// had already left the queue.
    pub fn expire(&mut self, request_id: &str) -> Option<bool> {
        let pos = self
            .entries
            .iter()
            .position(|e| e.request_id == request_id)?;
        let entry = self.entries.remove(pos)?;
        if entry.in_flight {
            self.abandoned.push_back(entry.request_id.clone());
        }
        Some(entry.in_flight)
    }

    /// Reject one entry (e.g. its write failed)
    pub fn fail(&mut self, request_id: &str, err: InferenceError) -> bool {
        let Some(pos) = self
            .entries
            .iter()
            .position(|e| e.request_id == request_id)
        else {
            return false;
        };
        match self.entries.remove(pos) {
            Some(entry) => {
                entry.resolve(Err(err));
                true
            }
            None => false,
        }
    }

    /// Reject every pending entry; returns how many were rejected
    pub fn reject_all(&mut self, err: InferenceError) -> usize {
        self.abandoned.clear();
        let count = self.entries.len();
        for entry in self.entries.drain(..) {
            entry.resolve(Err(err.clone()));
        }
        count
    }

    fn pop_in_flight(&mut self) -> Option<PendingRequest> {
        if self.head_in_flight() {
            self.entries.pop_front()
        } else {
            None
        }
    }

    fn deliver_head(&mut self, result: InferenceResult<InferenceResponse>) -> LineOutcome {
        let Some(entry) = self.entries.pop_front() else {
            return LineOutcome::Unsolicited;
        };
        let request_id = entry.request_id.clone();
        let delivered = result.is_ok();
        entry.resolve(result);
        if delivered {
            LineOutcome::Delivered { request_id }
        } else {
            LineOutcome::Rejected { request_id }
        }
    }
}
