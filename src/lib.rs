pub mod config;
pub mod data;
pub mod error;
pub mod generation;
pub mod request;
pub mod server;
pub mod stream;
pub mod tokenizer;

pub use config::AppConfig;
pub use data::{Data, EmbeddingData, TextData, TokenData, TokenId};
pub use error::ServeError;
pub use generation::{GenerationConfig, GenerationOverrides};
pub use request::Request;
pub use server::{build_router, tokenize_request};
pub use stream::{
    CompletedRequest, FinishReason, OutputReceiver, OutputSender, RequestEmitter,
    RequestStreamOutput, StreamProgress, StreamTracker, output_channel,
};
pub use tokenizer::{ByteTokenizer, Tokenizer, load_tokenizer};
