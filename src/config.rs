use std::{
    env,
    net::{IpAddr, Ipv4Addr, SocketAddr},
    path::PathBuf,
    time::Duration,
};

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub listen_addr: SocketAddr,
    pub tokenizer_path: Option<PathBuf>,
    pub add_special_tokens: bool,
    pub max_new_tokens: usize,
    pub temperature: f64,
    pub top_k: usize,
    pub top_p: f64,
    pub repetition_penalty: f64,
    pub stream_channel_capacity: usize,
    pub tokenize_timeout: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 8080),
            tokenizer_path: None,
            add_special_tokens: false,
            max_new_tokens: 64,
            temperature: 0.8,
            top_k: 40,
            top_p: 0.95,
            repetition_penalty: 1.0,
            stream_channel_capacity: 64,
            tokenize_timeout: Duration::from_secs(30),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Self::default();

        let listen_addr = env::var("SERVER_ADDR")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.listen_addr);

        let tokenizer_path = env::var("TOKENIZER_PATH").ok().map(PathBuf::from);
        let add_special_tokens = env::var("ADD_SPECIAL_TOKENS")
            .ok()
            .map(|v| parse_bool(&v))
            .unwrap_or(defaults.add_special_tokens);

        let max_new_tokens = parse_var("MAX_NEW_TOKENS").unwrap_or(defaults.max_new_tokens);
        let temperature = parse_var("TEMPERATURE").unwrap_or(defaults.temperature);
        let top_k = parse_var("TOP_K").unwrap_or(defaults.top_k);
        let top_p = parse_var("TOP_P").unwrap_or(defaults.top_p);
        let repetition_penalty =
            parse_var("REPETITION_PENALTY").unwrap_or(defaults.repetition_penalty);

        let stream_channel_capacity = parse_var::<usize>("STREAM_CHANNEL_CAPACITY")
            .filter(|&cap| cap > 0)
            .unwrap_or(defaults.stream_channel_capacity);
        let tokenize_timeout = parse_var("TOKENIZE_TIMEOUT_SECS")
            .map(Duration::from_secs)
            .unwrap_or(defaults.tokenize_timeout);

        Ok(Self {
            listen_addr,
            tokenizer_path,
            add_special_tokens,
            max_new_tokens,
            temperature,
            top_k,
            top_p,
            repetition_penalty,
            stream_channel_capacity,
            tokenize_timeout,
        })
    }
}

fn parse_var<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.parse().ok())
}

fn parse_bool(raw: &str) -> bool {
    matches!(raw.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on")
}
