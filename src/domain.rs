use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use thiserror::Error;

/// Rejections raised while turning operator text into domain values.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InputError {
    #[error("unknown side {0:?}, expected BUY or SELL")]
    UnknownSide(String),
    #[error("invalid symbol {0:?}, expected a USDT pair such as BTCUSDT")]
    InvalidSymbol(String),
    #[error("{what} must be a number, got {raw:?}")]
    NotANumber { what: &'static str, raw: String },
    #[error("{what} must be a positive finite number, got {value}")]
    NotPositive { what: &'static str, value: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn as_str(self) -> &'static str {
        match self {
            Side::Buy => "BUY",
            Side::Sell => "SELL",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Side {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "BUY" => Ok(Side::Buy),
            "SELL" => Ok(Side::Sell),
            _ => Err(InputError::UnknownSide(s.trim().to_string())),
        }
    }
}

fn checked_positive(what: &'static str, value: f64) -> Result<f64, InputError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(InputError::NotPositive { what, value })
    }
}

fn parse_positive(what: &'static str, raw: &str) -> Result<f64, InputError> {
    let value = raw
        .trim()
        .parse::<f64>()
        .map_err(|_| InputError::NotANumber { what, raw: raw.trim().to_string() })?;
    checked_positive(what, value)
}

/// Price in quote currency. Always finite and strictly positive.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Price(f64);

impl Price {
    pub fn new(value: f64) -> Result<Self, InputError> {
        checked_positive("price", value).map(Self)
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Price {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_positive("price", s).map(Self)
    }
}

/// Order size in base asset units. Always finite and strictly positive.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Quantity(f64);

impl Quantity {
    pub fn new(value: f64) -> Result<Self, InputError> {
        checked_positive("quantity", value).map(Self)
    }

    #[cfg(test)]
    pub fn value(self) -> f64 {
        self.0
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Quantity {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_positive("quantity", s).map(Self)
    }
}

/// Upper-cased USDT-margined trading pair, e.g. `BTCUSDT`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Symbol(String);

impl Symbol {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Symbol {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        // A bare "USDT" has no base asset.
        if upper.len() > "USDT".len()
            && upper.ends_with("USDT")
            && upper.chars().all(|c| c.is_ascii_alphanumeric())
        {
            Ok(Self(upper))
        } else {
            Err(InputError::InvalidSymbol(s.trim().to_string()))
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderKind {
    Market,
    Limit,
}

impl OrderKind {
    pub fn as_str(self) -> &'static str {
        match self {
            OrderKind::Market => "MARKET",
            OrderKind::Limit => "LIMIT",
        }
    }
}

/// Order about to be sent to the exchange. `price` is set for limit orders only.
#[derive(Debug, Clone)]
pub struct OrderRequest {
    pub symbol: Symbol,
    pub side: Side,
    pub kind: OrderKind,
    pub quantity: Quantity,
    pub price: Option<Price>,
}

impl OrderRequest {
    pub fn market(symbol: Symbol, side: Side, quantity: Quantity) -> Self {
        Self { symbol, side, kind: OrderKind::Market, quantity, price: None }
    }

    pub fn limit(symbol: Symbol, side: Side, quantity: Quantity, price: Price) -> Self {
        Self { symbol, side, kind: OrderKind::Limit, quantity, price: Some(price) }
    }
}

/// Order acknowledgement as returned by `POST /fapi/v1/order`.
///
/// Numeric fields stay as the exchange's decimal strings; they are only displayed.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OrderResponse {
    #[serde(rename = "orderId")]
    pub order_id: i64,
    pub symbol: String,
    pub side: String,
    #[serde(rename = "type")]
    pub order_type: String,
    pub status: String,
    #[serde(rename = "origQty")]
    pub orig_qty: String,
    #[serde(default)]
    pub price: Option<String>,
}

impl OrderResponse {
    /// Market orders come back with `"price": "0"`; treat that as absent.
    pub fn display_price(&self) -> Option<&str> {
        self.price
            .as_deref()
            .filter(|p| p.parse::<f64>().map(|v| v != 0.0).unwrap_or(true))
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AssetBalance {
    pub asset: String,
    #[serde(rename = "walletBalance")]
    pub wallet_balance: String,
}

impl AssetBalance {
    pub fn is_funded(&self) -> bool {
        self.wallet_balance.parse::<f64>().map(|v| v > 0.0).unwrap_or(false)
    }
}
