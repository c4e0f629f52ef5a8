use std::time::Duration;

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use sha2::Sha256;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::Config;
use crate::domain::{AssetBalance, OrderKind, OrderRequest, OrderResponse, Price, Symbol};

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Error)]
pub enum ExchangeError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("binance error {code}: {msg}")]
    Api { code: i64, msg: String },
    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("unknown symbol {0}")]
    UnknownSymbol(String),
    #[error("exchange returned an unusable price {0:?}")]
    InvalidPrice(String),
}

pub type ExchangeResult<T> = Result<T, ExchangeError>;

/// Exchange operations the CLI depends on.
#[async_trait]
pub trait Exchange: Send + Sync {
    /// Authenticated round-trip used as a connection test.
    async fn ping(&self) -> ExchangeResult<()>;
    async fn balances(&self) -> ExchangeResult<Vec<AssetBalance>>;
    async fn current_price(&self, symbol: &Symbol) -> ExchangeResult<Price>;
    async fn symbol_info(&self, symbol: &Symbol) -> ExchangeResult<SymbolInfo>;
    async fn place_order(&self, order: &OrderRequest) -> ExchangeResult<OrderResponse>;
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolInfo {
    pub symbol: String,
    pub status: String,
    pub base_asset: String,
    pub quote_asset: String,
    pub price_precision: u32,
    pub quantity_precision: u32,
}

#[derive(Debug, Deserialize)]
struct TickerPrice {
    price: String,
}

#[derive(Debug, Deserialize)]
struct AccountInfo {
    assets: Vec<AssetBalance>,
}

#[derive(Debug, Deserialize)]
struct ExchangeInfo {
    symbols: Vec<SymbolInfo>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    code: i64,
    msg: String,
}

/// HMAC-SHA256 signer for Binance `SIGNED` endpoints.
#[derive(Clone)]
pub struct Signer {
    api_key: String,
    api_secret: String,
}

impl Signer {
    pub fn new(api_key: impl Into<String>, api_secret: impl Into<String>) -> Self {
        Self { api_key: api_key.into(), api_secret: api_secret.into() }
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn signature(&self, payload: &str) -> String {
        // new_from_slice only fails for fixed-size keys; HMAC accepts any length.
        let mut mac = HmacSha256::new_from_slice(self.api_secret.as_bytes())
            .unwrap_or_else(|_| unreachable!("hmac accepts keys of any size"));
        mac.update(payload.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    /// Appends `recvWindow`, `timestamp` and `signature` to the query string.
    pub fn sign(&self, params: &[(&str, String)], recv_window: u64, timestamp_ms: i64) -> String {
        let mut qs = build_query_string(params);
        if !qs.is_empty() {
            qs.push('&');
        }
        qs.push_str(&format!("recvWindow={recv_window}&timestamp={timestamp_ms}"));
        let sig = self.signature(&qs);
        format!("{qs}&signature={sig}")
    }
}

pub fn build_query_string(params: &[(&str, String)]) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&")
}

/// Order parameters in the order Binance documents them.
pub fn order_params(order: &OrderRequest) -> Vec<(&'static str, String)> {
    let mut params = vec![
        ("symbol", order.symbol.to_string()),
        ("side", order.side.as_str().to_string()),
        ("type", order.kind.as_str().to_string()),
    ];
    if order.kind == OrderKind::Limit {
        params.push(("timeInForce", "GTC".to_string()));
    }
    params.push(("quantity", order.quantity.to_string()));
    if let Some(price) = order.price {
        params.push(("price", price.to_string()));
    }
    params
}

#[derive(Clone)]
pub struct BinanceClient {
    base_url: String,
    recv_window: u64,
    signer: Signer,
    http: Client,
}

impl BinanceClient {
    pub fn new(cfg: &Config) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(cfg.http_timeout_secs))
            .build()?;
        Ok(Self {
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            recv_window: cfg.recv_window_ms,
            signer: Signer::new(cfg.api_key.clone(), cfg.api_secret.clone()),
            http,
        })
    }

    fn signed(&self, builder: RequestBuilder) -> RequestBuilder {
        builder.header("X-MBX-APIKEY", self.signer.api_key())
    }

    fn signed_url(&self, path: &str, params: &[(&str, String)]) -> String {
        let timestamp = chrono::Utc::now().timestamp_millis();
        let qs = self.signer.sign(params, self.recv_window, timestamp);
        format!("{}{}?{}", self.base_url, path, qs)
    }

    async fn get_public<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> ExchangeResult<T> {
        let url = format!("{}{}", self.base_url, path);
        let resp = self.http.get(url).query(params).send().await?;
        decode(resp).await
    }

    async fn get_signed<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> ExchangeResult<T> {
        let url = self.signed_url(path, params);
        let resp = self.signed(self.http.get(url)).send().await?;
        decode(resp).await
    }

    async fn post_signed<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> ExchangeResult<T> {
        let url = self.signed_url(path, params);
        let resp = self.signed(self.http.post(url)).send().await?;
        decode(resp).await
    }
}

async fn decode<T: DeserializeOwned>(resp: Response) -> ExchangeResult<T> {
    let status = resp.status();
    let body = resp.text().await?;
    if !status.is_success() {
        return Err(api_error(status.as_u16(), body));
    }
    Ok(serde_json::from_str(&body)?)
}

fn api_error(status: u16, body: String) -> ExchangeError {
    match serde_json::from_str::<ApiErrorBody>(&body) {
        Ok(e) => ExchangeError::Api { code: e.code, msg: e.msg },
        Err(_) => ExchangeError::Status { status, body },
    }
}

fn parse_ticker(ticker: TickerPrice) -> ExchangeResult<Price> {
    ticker
        .price
        .parse::<f64>()
        .ok()
        .and_then(|v| Price::new(v).ok())
        .ok_or(ExchangeError::InvalidPrice(ticker.price))
}

#[async_trait]
impl Exchange for BinanceClient {
    async fn ping(&self) -> ExchangeResult<()> {
        let _: AccountInfo = self.get_signed("/fapi/v2/account", &[]).await?;
        info!("binance.ping ok");
        Ok(())
    }

    async fn balances(&self) -> ExchangeResult<Vec<AssetBalance>> {
        let account: AccountInfo = self.get_signed("/fapi/v2/account", &[]).await?;
        Ok(account.assets)
    }

    async fn current_price(&self, symbol: &Symbol) -> ExchangeResult<Price> {
        let ticker: TickerPrice = self
            .get_public("/fapi/v1/ticker/price", &[("symbol", symbol.to_string())])
            .await?;
        let price = parse_ticker(ticker)?;
        debug!(%symbol, %price, "binance.ticker");
        Ok(price)
    }

    async fn symbol_info(&self, symbol: &Symbol) -> ExchangeResult<SymbolInfo> {
        let info: ExchangeInfo = self.get_public("/fapi/v1/exchangeInfo", &[]).await?;
        info.symbols
            .into_iter()
            .find(|s| s.symbol == symbol.as_str())
            .ok_or_else(|| ExchangeError::UnknownSymbol(symbol.to_string()))
    }

    async fn place_order(&self, order: &OrderRequest) -> ExchangeResult<OrderResponse> {
        let params = order_params(order);
        debug!(?params, "binance.order.submit");
        self.post_signed("/fapi/v1/order", &params).await
    }
}
