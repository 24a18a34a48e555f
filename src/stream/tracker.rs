use std::collections::HashMap;

use tracing::{debug, warn};

use crate::{
    data::TokenId,
    error::ServeError,
    request::Request,
    stream::{FinishReason, RequestStreamOutput},
};

#[derive(Debug)]
enum StreamState {
    Open { generated: Vec<TokenId> },
    Closed { finish_reason: FinishReason },
}

/// Full output of a request, assembled from its deltas in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedRequest {
    pub request_id: String,
    pub tokens: Vec<TokenId>,
    pub finish_reason: FinishReason,
}

#[derive(Debug, PartialEq, Eq)]
pub enum StreamProgress {
    Delta { new_tokens: usize, total_tokens: usize },
    Finished(CompletedRequest),
}

/// Consumer-side table of in-flight requests.
///
/// Correlates events by `request_id` and rejects anything that breaks the
/// stream contract: events for ids never registered, or events after the
/// terminal one.
///
/// Finished requests stay in the table as closed entries so late events can
/// be recognised. Call [`StreamTracker::release`] once the completed output
/// has been handed on, otherwise the table grows with every request served.
#[derive(Debug, Default)]
pub struct StreamTracker {
    entries: HashMap<String, StreamState>,
}

impl StreamTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, request: &Request) -> Result<(), ServeError> {
        let id = request.id();
        if let Some(StreamState::Open { .. }) = self.entries.get(id) {
            return Err(ServeError::InvalidArgument(format!(
                "request '{id}' is already in flight"
            )));
        }
        self.entries.insert(
            id.to_string(),
            StreamState::Open {
                generated: Vec::new(),
            },
        );
        Ok(())
    }

    pub fn observe(&mut self, output: &RequestStreamOutput) -> Result<StreamProgress, ServeError> {
        let id = output.request_id();
        let Some(state) = self.entries.get_mut(id) else {
            warn!(request_id = %id, "stream event for unknown request");
            return Err(ServeError::protocol(id, "event for unknown request"));
        };

        match state {
            StreamState::Closed { finish_reason } => {
                warn!(
                    request_id = %id,
                    %finish_reason,
                    "stream event after terminal event"
                );
                Err(ServeError::protocol(
                    id,
                    format!("event after terminal event ({finish_reason})"),
                ))
            }
            StreamState::Open { generated } => {
                generated.extend_from_slice(output.delta_tokens());
                let Some(finish_reason) = output.finish_reason() else {
                    return Ok(StreamProgress::Delta {
                        new_tokens: output.delta_tokens().len(),
                        total_tokens: generated.len(),
                    });
                };

                let tokens = std::mem::take(generated);
                *state = StreamState::Closed { finish_reason };
                debug!(
                    request_id = %id,
                    %finish_reason,
                    tokens = tokens.len(),
                    "request stream finished"
                );
                Ok(StreamProgress::Finished(CompletedRequest {
                    request_id: id.to_string(),
                    tokens,
                    finish_reason,
                }))
            }
        }
    }

    /// Drops an in-flight request. Later events for it are rejected as unknown.
    pub fn cancel(&mut self, request_id: &str) -> Option<Vec<TokenId>> {
        match self.entries.remove(request_id)? {
            StreamState::Open { generated } => Some(generated),
            closed @ StreamState::Closed { .. } => {
                self.entries.insert(request_id.to_string(), closed);
                None
            }
        }
    }

    /// Forgets a finished request so its id may be reused.
    pub fn release(&mut self, request_id: &str) -> bool {
        if let Some(StreamState::Closed { .. }) = self.entries.get(request_id) {
            self.entries.remove(request_id);
            return true;
        }
        false
    }

    pub fn is_closed(&self, request_id: &str) -> bool {
        matches!(self.entries.get(request_id), Some(StreamState::Closed { .. }))
    }

    pub fn in_flight(&self) -> usize {
        self.entries
            .values()
            .filter(|state| matches!(state, StreamState::Open { .. }))
            .count()
    }

    /// Open and closed entries still held.
    pub fn tracked(&self) -> usize {
        self.entries.len()
    }
}
