use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

pub const TESTNET_URL: &str = "https://testnet.binancefuture.com";

// Placeholder values shipped in .env templates.
const PLACEHOLDER_KEY: &str = "your_api_key_here";
const PLACEHOLDER_SECRET: &str = "your_secret_key_here";

#[derive(Clone, Serialize, Deserialize)]
pub struct Config {
    // Credentials
    pub api_key: String,
    pub api_secret: String,

    // Exchange
    pub base_url: String,
    pub recv_window_ms: u64,
    pub http_timeout_secs: u64,

    // Trading defaults
    pub default_symbol: String,
    pub default_quantity: f64,

    // Logging
    pub log_level: String,
    pub log_file: String,
    pub log_json: bool,

    // Terminal
    pub color: bool,
}

// Secrets stay out of `info!(?cfg)`.
impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("api_key", &mask(&self.api_key))
            .field("api_secret", &"***")
            .field("base_url", &self.base_url)
            .field("recv_window_ms", &self.recv_window_ms)
            .field("http_timeout_secs", &self.http_timeout_secs)
            .field("default_symbol", &self.default_symbol)
            .field("default_quantity", &self.default_quantity)
            .field("log_level", &self.log_level)
            .field("log_file", &self.log_file)
            .field("log_json", &self.log_json)
            .field("color", &self.color)
            .finish()
    }
}

fn mask(key: &str) -> String {
    let visible: String = key.chars().take(4).collect();
    format!("{visible}***")
}

fn env_bool(key: &str, default: bool) -> bool {
    match std::env::var(key).ok().map(|s| s.trim().to_lowercase()) {
        None => default,
        Some(v) if v.is_empty() => default,
        Some(v) if v == "1" || v == "true" || v == "yes" || v == "y" || v == "on" => true,
        Some(v) if v == "0" || v == "false" || v == "no" || v == "n" || v == "off" => false,
        Some(_) => default,
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|x| x.trim().parse().ok())
}

fn env_required(key: &str, placeholder: &str) -> Result<String> {
    match std::env::var(key).map(|v| v.trim().to_string()) {
        Ok(v) if !v.is_empty() && v != placeholder => Ok(v),
        _ => Err(anyhow!("{key} is required (set it in the environment or .env)")),
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        // Credentials
        let api_key = env_required("BINANCE_API_KEY", PLACEHOLDER_KEY)?;
        let api_secret = env_required("BINANCE_API_SECRET", PLACEHOLDER_SECRET)?;

        // Exchange
        let base_url = std::env::var("BINANCE_BASE_URL").unwrap_or_else(|_| TESTNET_URL.to_string());
        let recv_window_ms = env_parse::<u64>("BINANCE_RECV_WINDOW").unwrap_or(5000);
        let http_timeout_secs = env_parse::<u64>("HTTP_TIMEOUT_SECS").unwrap_or(10);
        // Binance rejects recvWindow above 60s.
        if recv_window_ms == 0 || recv_window_ms > 60_000 {
            return Err(anyhow!("BINANCE_RECV_WINDOW must be within 1..=60000 ms"));
        }
        if http_timeout_secs == 0 {
            return Err(anyhow!("HTTP_TIMEOUT_SECS cannot be 0"));
        }

        // Trading defaults
        let default_symbol = std::env::var("DEFAULT_SYMBOL").unwrap_or_else(|_| "BTCUSDT".to_string());
        let default_quantity = env_parse::<f64>("DEFAULT_QUANTITY").unwrap_or(0.001);
        if !(default_quantity.is_finite() && default_quantity > 0.0) {
            return Err(anyhow!("DEFAULT_QUANTITY must be positive"));
        }

        // Logging
        let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        let log_file = std::env::var("LOG_FILE").unwrap_or_else(|_| "logs/trading_bot.log".to_string());
        let log_json = env_bool("LOG_JSON", false);

        // Terminal
        let color = std::env::var_os("NO_COLOR").is_none() && env_bool("CLI_COLOR", true);

        Ok(Self {
            api_key,
            api_secret,
            base_url,
            recv_window_ms,
            http_timeout_secs,
            default_symbol,
            default_quantity,
            log_level,
            log_file,
            log_json,
            color,
        })
    }
}
