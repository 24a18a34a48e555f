//! The caller-issued generation job and its tokenization.
//!
//! A [`Request`] is never mutated after construction. Tokenization produces
//! a new value carrying the same id, so a request that failed on one node can
//! be handed to another and processed again from scratch.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    data::Data,
    error::ServeError,
    generation::GenerationConfig,
    tokenizer::Tokenizer,
};

#[derive(Debug, Clone)]
struct RequestInner {
    id: String,
    inputs: Vec<Data>,
    input_total_length: Option<usize>,
    generation_cfg: GenerationConfig,
}

/// Shared handle to an immutable generation request. Cloning is cheap.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(into = "RequestWire", try_from = "RequestWire")]
pub struct Request {
    inner: Arc<RequestInner>,
}

impl Request {
    pub fn new(
        id: impl Into<String>,
        inputs: Vec<Data>,
        generation_cfg: GenerationConfig,
    ) -> Result<Self, ServeError> {
        let id = id.into();
        if id.is_empty() {
            return Err(ServeError::InvalidArgument(
                "request id must not be empty".into(),
            ));
        }
        if inputs.is_empty() {
            return Err(ServeError::InvalidArgument(format!(
                "request '{id}' has no inputs"
            )));
        }

        let input_total_length = total_length(&inputs);
        Ok(Self {
            inner: Arc::new(RequestInner {
                id,
                inputs,
                input_total_length,
                generation_cfg,
            }),
        })
    }

    /// Returns a request with every text unit tokenized and the same id.
    ///
    /// Already tokenized units and embeddings pass through unchanged. Either
    /// every text unit is tokenized or the tokenizer error is returned; the
    /// input request stays valid in both cases. May block on the tokenizer.
    pub fn from_untokenized(
        request: &Request,
        tokenizer: &dyn Tokenizer,
    ) -> Result<Request, ServeError> {
        if request.is_tokenized() {
            return Ok(request.clone());
        }

        let inputs = request
            .inputs()
            .iter()
            .map(|data| match data {
                Data::Text(text) => tokenizer.encode(&text.text).map(Data::tokens),
                other => Ok(other.clone()),
            })
            .collect::<Result<Vec<_>, _>>()?;

        let input_total_length = total_length(&inputs);
        debug!(
            request_id = %request.id(),
            input_total_length = ?input_total_length,
            "tokenized request inputs"
        );

        Ok(Request {
            inner: Arc::new(RequestInner {
                id: request.inner.id.clone(),
                inputs,
                input_total_length,
                generation_cfg: request.inner.generation_cfg.clone(),
            }),
        })
    }

    pub fn id(&self) -> &str {
        &self.inner.id
    }

    pub fn inputs(&self) -> &[Data] {
        &self.inner.inputs
    }

    /// Total token length of all inputs, `None` while any input is raw text.
    pub fn input_total_length(&self) -> Option<usize> {
        self.inner.input_total_length
    }

    pub fn generation_cfg(&self) -> &GenerationConfig {
        &self.inner.generation_cfg
    }

    pub fn is_tokenized(&self) -> bool {
        self.inner.input_total_length.is_some()
    }
}

impl PartialEq for Request {
    fn eq(&self, other: &Self) -> bool {
        if Arc::ptr_eq(&self.inner, &other.inner) {
            return true;
        }
        self.inner.id == other.inner.id
            && self.inner.inputs == other.inner.inputs
            && self.inner.input_total_length == other.inner.input_total_length
            && self.inner.generation_cfg == other.inner.generation_cfg
    }
}

fn total_length(inputs: &[Data]) -> Option<usize> {
    inputs.iter().map(Data::token_len).sum()
}

#[derive(Serialize, Deserialize)]
struct RequestWire {
    id: String,
    inputs: Vec<Data>,
    #[serde(default, skip_deserializing)]
    input_total_length: Option<usize>,
    generation_cfg: GenerationConfig,
}

impl From<Request> for RequestWire {
    fn from(request: Request) -> Self {
        let inner = Arc::unwrap_or_clone(request.inner);
        RequestWire {
            id: inner.id,
            inputs: inner.inputs,
            input_total_length: inner.input_total_length,
            generation_cfg: inner.generation_cfg,
        }
    }
}

impl TryFrom<RequestWire> for Request {
    type Error = ServeError;

    fn try_from(wire: RequestWire) -> Result<Self, Self::Error> {
        Request::new(wire.id, wire.inputs, wire.generation_cfg)
    }
}
