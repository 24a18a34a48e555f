use std::fmt;

use serde::{Deserialize, Serialize};

use crate::data::TokenId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FinishReason {
    /// A stop string or stop token was produced.
    Stop,
    /// `max_new_tokens` was reached.
    Length,
    Abort,
    Error,
}

impl fmt::Display for FinishReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FinishReason::Stop => "stop",
            FinishReason::Length => "length",
            FinishReason::Abort => "abort",
            FinishReason::Error => "error",
        };
        f.write_str(name)
    }
}

/// Tokens generated for one request since its previous event.
///
/// Events carry no sequence number; the delivery channel must keep them in
/// production order per `request_id`. Exactly the last event of a request
/// carries a `finish_reason`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestStreamOutput {
    request_id: String,
    delta_tokens: Vec<TokenId>,
    #[serde(default)]
    finish_reason: Option<FinishReason>,
}

impl RequestStreamOutput {
    pub fn new(
        request_id: impl Into<String>,
        delta_tokens: Vec<TokenId>,
        finish_reason: Option<FinishReason>,
    ) -> Self {
        Self {
            request_id: request_id.into(),
            delta_tokens,
            finish_reason,
        }
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn delta_tokens(&self) -> &[TokenId] {
        &self.delta_tokens
    }

    pub fn finish_reason(&self) -> Option<FinishReason> {
        self.finish_reason
    }

    pub fn is_finished(&self) -> bool {
        self.finish_reason.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finish_reason_presence_survives_the_wire() {
        let open = RequestStreamOutput::new("r1", vec![1, 2], None);
        let done = RequestStreamOutput::new("r1", Vec::new(), Some(FinishReason::Stop));

        let open_json = serde_json::to_value(&open).unwrap();
        let done_json = serde_json::to_value(&done).unwrap();
        assert!(open_json["finish_reason"].is_null());
        assert_eq!(done_json["finish_reason"], "stop");

        let parsed: RequestStreamOutput =
            serde_json::from_str(r#"{"request_id":"r1","delta_tokens":[3]}"#).unwrap();
        assert!(!parsed.is_finished());
        assert_eq!(parsed.delta_tokens(), &[3]);
    }

    #[test]
    fn display_matches_wire_names() {
        for reason in [
            FinishReason::Stop,
            FinishReason::Length,
            FinishReason::Abort,
            FinishReason::Error,
        ] {
            let wire = serde_json::to_value(reason).unwrap();
            assert_eq!(wire, reason.to_string());
        }
    }
}
