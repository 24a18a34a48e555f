use serde::{Deserialize, Serialize};

use crate::error::ServeError;

pub type TokenId = u32;

/// One multi-modal input unit of a request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Data {
    Text(TextData),
    Tokens(TokenData),
    Embedding(EmbeddingData),
}

impl Data {
    pub fn text(text: impl Into<String>) -> Self {
        Data::Text(TextData::new(text))
    }

    pub fn tokens(token_ids: Vec<TokenId>) -> Self {
        Data::Tokens(TokenData::new(token_ids))
    }

    /// Equivalent model-context length, or `None` while the unit is raw text.
    pub fn token_len(&self) -> Option<usize> {
        match self {
            Data::Text(_) => None,
            Data::Tokens(tokens) => Some(tokens.len()),
            Data::Embedding(embedding) => Some(embedding.num_rows()),
        }
    }

    pub fn is_tokenized(&self) -> bool {
        !matches!(self, Data::Text(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextData {
    pub text: String,
}

impl TextData {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenData {
    pub token_ids: Vec<TokenId>,
}

impl TokenData {
    pub fn new(token_ids: Vec<TokenId>) -> Self {
        Self { token_ids }
    }

    pub fn len(&self) -> usize {
        self.token_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.token_ids.is_empty()
    }
}

/// Row-major embedding block; each row occupies one position of the model context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawEmbedding")]
pub struct EmbeddingData {
    hidden_size: usize,
    values: Vec<f32>,
}

#[derive(Deserialize)]
struct RawEmbedding {
    hidden_size: usize,
    values: Vec<f32>,
}

impl TryFrom<RawEmbedding> for EmbeddingData {
    type Error = ServeError;

    fn try_from(raw: RawEmbedding) -> Result<Self, Self::Error> {
        EmbeddingData::new(raw.values, raw.hidden_size)
    }
}

impl EmbeddingData {
    pub fn new(values: Vec<f32>, hidden_size: usize) -> Result<Self, ServeError> {
        if hidden_size == 0 {
            return Err(ServeError::InvalidArgument(
                "embedding hidden_size must be positive".into(),
            ));
        }
        if values.len() % hidden_size != 0 {
            return Err(ServeError::InvalidArgument(format!(
                "embedding of {} values is not a multiple of hidden_size {hidden_size}",
                values.len()
            )));
        }
        Ok(Self {
            hidden_size,
            values,
        })
    }

    pub fn hidden_size(&self) -> usize {
        self.hidden_size
    }

    pub fn num_rows(&self) -> usize {
        self.values.len() / self.hidden_size
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }
}
