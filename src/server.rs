use std::{sync::Arc, time::Duration};

use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use serde::Deserialize;
use tokio::task;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::{
    config::AppConfig,
    data::Data,
    error::ServeError,
    generation::GenerationOverrides,
    request::Request,
    tokenizer::Tokenizer,
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub tokenizer: Arc<dyn Tokenizer>,
}

#[derive(Debug, Deserialize)]
struct SubmitRequest {
    id: String,
    inputs: Vec<Data>,
    #[serde(default)]
    generation: GenerationOverrides,
}

pub fn build_router(config: Arc<AppConfig>, tokenizer: Arc<dyn Tokenizer>) -> Router {
    let state = AppState { config, tokenizer };

    Router::new()
        .route("/health", get(health))
        .route("/v1/requests", post(submit_request))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Tokenizes `request` on the blocking pool, giving up after `timeout`.
pub async fn tokenize_request(
    request: Request,
    tokenizer: Arc<dyn Tokenizer>,
    timeout: Duration,
) -> Result<Request, ServeError> {
    if request.is_tokenized() {
        return Ok(request);
    }

    let id = request.id().to_string();
    let handle =
        task::spawn_blocking(move || Request::from_untokenized(&request, tokenizer.as_ref()));

    tokio::time::timeout(timeout, handle)
        .await
        .map_err(|_| ServeError::Timeout(format!("tokenizing request '{id}'")))?
        .map_err(|err| ServeError::Other(format!("tokenizer task failed: {err}")))?
}

async fn health() -> &'static str {
    "ok"
}

async fn submit_request(
    State(state): State<AppState>,
    Json(body): Json<SubmitRequest>,
) -> Result<Json<Request>, ServeError> {
    let generation_cfg = body.generation.resolve(&state.config);
    let request = Request::new(body.id, body.inputs, generation_cfg)?;

    let request = tokenize_request(
        request,
        state.tokenizer.clone(),
        state.config.tokenize_timeout,
    )
    .await?;

    info!(
        request_id = %request.id(),
        inputs = request.inputs().len(),
        input_total_length = ?request.input_total_length(),
        "request admitted"
    );
    Ok(Json(request))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{data::TokenId, generation::GenerationConfig, tokenizer::ByteTokenizer};

    struct StalledTokenizer(Duration);

    impl Tokenizer for StalledTokenizer {
        fn encode(&self, text: &str) -> Result<Vec<TokenId>, ServeError> {
            std::thread::sleep(self.0);
            ByteTokenizer.encode(text)
        }
    }

    fn text_request(id: &str) -> Request {
        Request::new(id, vec![Data::text("hi")], GenerationConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn slow_tokenizer_hits_the_timeout() {
        let tokenizer = Arc::new(StalledTokenizer(Duration::from_millis(300)));
        let result =
            tokenize_request(text_request("r1"), tokenizer, Duration::from_millis(20)).await;

        match result {
            Err(ServeError::Timeout(message)) => assert!(message.contains("'r1'")),
            other => panic!("expected timeout, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn tokenizer_within_budget_completes() {
        let tokenizer = Arc::new(StalledTokenizer(Duration::from_millis(5)));
        let request = tokenize_request(text_request("r2"), tokenizer, Duration::from_secs(5))
            .await
            .unwrap();

        assert_eq!(request.id(), "r2");
        assert_eq!(request.inputs(), &[Data::tokens(vec![104, 105])]);
        assert_eq!(request.input_total_length(), Some(2));
    }
}
