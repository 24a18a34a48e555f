use std::sync::Arc;

use crate::{config::AppConfig, data::TokenId, error::ServeError};

/// Maps raw text to token ids. Implementations must be deterministic for a fixed state.
pub trait Tokenizer: Send + Sync {
    fn encode(&self, text: &str) -> Result<Vec<TokenId>, ServeError>;
}

/// One id per UTF-8 byte. Used when no tokenizer file is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct ByteTokenizer;

impl Tokenizer for ByteTokenizer {
    fn encode(&self, text: &str) -> Result<Vec<TokenId>, ServeError> {
        Ok(text.bytes().map(TokenId::from).collect())
    }
}

#[cfg(feature = "hf-tokenizer")]
pub struct HfTokenizer {
    inner: tokenizers::Tokenizer,
    add_special_tokens: bool,
}

#[cfg(feature = "hf-tokenizer")]
impl HfTokenizer {
    pub fn from_file(
        path: &std::path::Path,
        add_special_tokens: bool,
    ) -> Result<Self, ServeError> {
        if !path.exists() {
            return Err(ServeError::Other(format!(
                "tokenizer artifact missing: {}",
                path.display()
            )));
        }
        let inner = tokenizers::Tokenizer::from_file(path)
            .map_err(|e| ServeError::Tokenization(e.to_string()))?;
        Ok(Self {
            inner,
            add_special_tokens,
        })
    }
}

#[cfg(feature = "hf-tokenizer")]
impl Tokenizer for HfTokenizer {
    fn encode(&self, text: &str) -> Result<Vec<TokenId>, ServeError> {
        let encoding = self
            .inner
            .encode(text, self.add_special_tokens)
            .map_err(|e| ServeError::Tokenization(e.to_string()))?;
        Ok(encoding.get_ids().to_vec())
    }
}

pub fn load_tokenizer(config: &AppConfig) -> Result<Arc<dyn Tokenizer>, ServeError> {
    let Some(path) = config.tokenizer_path.as_ref() else {
        tracing::warn!("TOKENIZER_PATH not set, falling back to byte-level tokenizer");
        return Ok(Arc::new(ByteTokenizer));
    };

    #[cfg(feature = "hf-tokenizer")]
    {
        let tokenizer = HfTokenizer::from_file(path, config.add_special_tokens)?;
        tracing::info!(path = %path.display(), "loaded tokenizer");
        Ok(Arc::new(tokenizer))
    }
    #[cfg(not(feature = "hf-tokenizer"))]
    {
        Err(ServeError::Other(format!(
            "cannot load {}: built without the hf-tokenizer feature",
            path.display()
        )))
    }
}
