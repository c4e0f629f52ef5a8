use std::io::{BufRead, Write};
use std::str::FromStr;

use anyhow::{anyhow, Result};
use tracing::{error, info, warn};

use crate::binance::{Exchange, ExchangeError};
use crate::config::Config;
use crate::console::Console;
use crate::domain::{OrderRequest, OrderResponse, Price, Quantity, Side, Symbol};
use crate::input::Prompter;
use crate::pricing;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Test,
    Balance,
    Price,
    Limits,
    Market,
    Limit,
    Help,
    Quit,
}

impl FromStr for Command {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "test" => Ok(Command::Test),
            "balance" => Ok(Command::Balance),
            "price" => Ok(Command::Price),
            "limits" => Ok(Command::Limits),
            "market" => Ok(Command::Market),
            "limit" => Ok(Command::Limit),
            "help" => Ok(Command::Help),
            "quit" | "exit" | "q" => Ok(Command::Quit),
            other => Err(other.to_string()),
        }
    }
}

/// Prompt defaults taken from configuration.
#[derive(Debug, Clone)]
pub struct Defaults {
    pub symbol: String,
    pub quantity: String,
}

impl Defaults {
    pub fn from_config(cfg: &Config) -> Result<Self> {
        let symbol = Symbol::from_str(&cfg.default_symbol)?;
        let quantity = Quantity::new(cfg.default_quantity)?;
        Ok(Self { symbol: symbol.to_string(), quantity: quantity.to_string() })
    }
}

pub struct App<E, R, W> {
    exchange: E,
    input: Prompter<R>,
    console: Console<W>,
    defaults: Defaults,
}

impl<E, R, W> App<E, R, W>
where
    E: Exchange,
    R: BufRead,
    W: Write,
{
    pub fn new(exchange: E, input: Prompter<R>, console: Console<W>, defaults: Defaults) -> Self {
        Self { exchange, input, console, defaults }
    }

    pub async fn run(&mut self) -> Result<()> {
        self.console.banner()?;

        if !self.test_connection().await? {
            self.console
                .error("❌ Cannot connect to Binance API. Please check your credentials.")?;
            return Err(anyhow!("cannot connect to Binance API"));
        }

        self.console.menu()?;

        loop {
            self.console.line("")?;
            self.console.prompt("Enter command (help for menu)")?;
            let Some(raw) = self.input.read_line()? else {
                self.console.goodbye()?;
                break;
            };

            let command = match raw.parse::<Command>() {
                Ok(c) => c,
                Err(_) => {
                    self.console
                        .error("❌ Unknown command. Type 'help' for available commands.")?;
                    continue;
                }
            };
            info!(?command, "cli.command");

            match command {
                Command::Quit => {
                    self.console.goodbye()?;
                    break;
                }
                Command::Help => self.console.menu()?,
                Command::Test => {
                    self.test_connection().await?;
                }
                Command::Balance => self.show_balance().await?,
                Command::Price => self.show_price().await?,
                Command::Limits => self.show_price_limits().await?,
                Command::Market => self.market_order_flow().await?,
                Command::Limit => self.limit_order_flow().await?,
            }
        }
        Ok(())
    }

    pub async fn test_connection(&mut self) -> Result<bool> {
        match self.exchange.ping().await {
            Ok(()) => {
                info!("api connection test successful");
                self.console.success("✅ API connection successful!")?;
                Ok(true)
            }
            Err(e) => {
                error!(error = %e, "api connection failed");
                self.console.error(&format!("❌ API connection failed: {e}"))?;
                Ok(false)
            }
        }
    }

    async fn show_balance(&mut self) -> Result<()> {
        match self.exchange.balances().await {
            Ok(balances) => self.console.balances(&balances)?,
            Err(e) => {
                error!(error = %e, "failed to get balance");
                self.console.error(&format!("❌ Failed to get balance: {e}"))?;
            }
        }
        Ok(())
    }

    fn ask_symbol(&mut self) -> Result<Option<Symbol>> {
        let default = self.defaults.symbol.clone();
        self.input
            .ask(&mut self.console, "Enter symbol (e.g., BTCUSDT)", Some(default.as_str()))
    }

    fn ask_side(&mut self) -> Result<Option<Side>> {
        self.input.ask(&mut self.console, "Enter side (BUY/SELL)", None)
    }

    fn ask_quantity(&mut self) -> Result<Option<Quantity>> {
        let default = self.defaults.quantity.clone();
        self.input.ask(&mut self.console, "Enter quantity", Some(default.as_str()))
    }

    /// Looks up the market price, logging the failure for the caller to report.
    async fn current_price(&self, symbol: &Symbol) -> Option<Price> {
        match self.exchange.current_price(symbol).await {
            Ok(p) => Some(p),
            Err(e) => {
                error!(%symbol, error = %e, "failed to get current price");
                None
            }
        }
    }

    async fn show_price(&mut self) -> Result<()> {
        let Some(symbol) = self.ask_symbol()? else {
            return Ok(());
        };
        match self.current_price(&symbol).await {
            Some(price) => self
                .console
                .success(&format!("💰 {symbol} current price: ${price}"))?,
            None => self.console.error("❌ Could not get current price")?,
        }
        Ok(())
    }

    async fn show_price_limits(&mut self) -> Result<()> {
        let Some(symbol) = self.ask_symbol()? else {
            return Ok(());
        };
        let Some(current) = self.current_price(&symbol).await else {
            self.console.error("❌ Could not get current price")?;
            return Ok(());
        };

        let info = match self.exchange.symbol_info(&symbol).await {
            Ok(info) => Some(info),
            Err(e) => {
                warn!(%symbol, error = %e, "symbol info unavailable");
                None
            }
        };
        let report = pricing::limits(current);
        self.console
            .limits_report(symbol.as_str(), &report, info.as_ref())?;
        Ok(())
    }

    async fn market_order_flow(&mut self) -> Result<()> {
        self.console.heading("\n📊 Market Order")?;
        let Some(symbol) = self.ask_symbol()? else {
            return Ok(());
        };
        let Some(side) = self.ask_side()? else {
            return Ok(());
        };
        let Some(quantity) = self.ask_quantity()? else {
            return Ok(());
        };
        self.place_market_order(symbol, side, quantity).await?;
        Ok(())
    }

    async fn limit_order_flow(&mut self) -> Result<()> {
        self.console.heading("\n📊 Limit Order")?;
        let Some(symbol) = self.ask_symbol()? else {
            return Ok(());
        };

        let Some(current) = self.current_price(&symbol).await else {
            self.console.error("❌ Could not get current price")?;
            return Ok(());
        };
        self.console
            .success(&format!("💰 Current price: ${current}"))?;

        let Some(side) = self.ask_side()? else {
            return Ok(());
        };

        let suggestions = pricing::suggest(current, side);
        self.console
            .suggestions(&format!("Suggested {side} prices"), &suggestions)?;
        self.console.line("")?;

        let Some(quantity) = self.ask_quantity()? else {
            return Ok(());
        };
        let prompt = format!("Enter price (Current: ${current})");
        let Some(price) = self.input.ask::<Price, _>(&mut self.console, &prompt, None)? else {
            return Ok(());
        };

        self.place_limit_order(symbol, side, quantity, price).await?;
        Ok(())
    }

    pub async fn place_market_order(
        &mut self,
        symbol: Symbol,
        side: Side,
        quantity: Quantity,
    ) -> Result<Option<OrderResponse>> {
        self.console.order_placing(
            side,
            "market",
            &[
                ("Symbol", symbol.to_string()),
                ("Side", side.to_string()),
                ("Quantity", quantity.to_string()),
            ],
        )?;
        let order = OrderRequest::market(symbol, side, quantity);
        self.submit(order, "market").await
    }

    /// Validates `price` against a fresh market price before submitting.
    ///
    /// A rejected price is reported with suggestions and never reaches the exchange.
    pub async fn place_limit_order(
        &mut self,
        symbol: Symbol,
        side: Side,
        quantity: Quantity,
        price: Price,
    ) -> Result<Option<OrderResponse>> {
        let Some(current) = self.current_price(&symbol).await else {
            error!(%symbol, "price validation failed: no current price");
            self.console
                .error("❌ Price Validation Failed: Could not get current price")?;
            return Ok(None);
        };

        let verdict = pricing::validate(current, side, price);
        if !verdict.accepted {
            self.console
                .error(&format!("❌ Price Validation Failed: {}", verdict.reason))?;
            let suggestions = pricing::suggest(current, side);
            self.console
                .suggestions("Suggested reasonable prices", &suggestions)?;
            error!(%symbol, %side, %price, %current, reason = %verdict.reason, "price validation failed");
            return Ok(None);
        }

        self.console.order_placing(
            side,
            "limit",
            &[
                ("Symbol", symbol.to_string()),
                ("Side", side.to_string()),
                ("Quantity", quantity.to_string()),
                ("Price", price.to_string()),
            ],
        )?;
        let order = OrderRequest::limit(symbol, side, quantity, price);
        self.submit(order, "limit").await
    }

    async fn submit(&mut self, order: OrderRequest, kind: &str) -> Result<Option<OrderResponse>> {
        match self.exchange.place_order(&order).await {
            Ok(resp) => {
                info!(?resp, "{kind} order placed");
                self.console
                    .success(&format!("✅ {} order placed successfully!", capitalize(kind)))?;
                self.console.order_details(&resp)?;
                Ok(Some(resp))
            }
            Err(e @ ExchangeError::Api { .. }) => {
                error!(error = %e, ?order, "binance api error");
                self.console.error(&format!("❌ Binance API error: {e}"))?;
                Ok(None)
            }
            Err(e) => {
                error!(error = %e, ?order, "failed to place {kind} order");
                self.console
                    .error(&format!("❌ Failed to place {kind} order: {e}"))?;
                Ok(None)
            }
        }
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binance::{ExchangeResult, SymbolInfo};
    use crate::domain::{AssetBalance, OrderKind};
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct FakeExchange {
        online: bool,
        price: Option<f64>,
        reject_orders: bool,
        placed: Mutex<Vec<OrderRequest>>,
    }

    impl FakeExchange {
        fn at(price: f64) -> Self {
            Self { online: true, price: Some(price), reject_orders: false, placed: Mutex::new(vec![]) }
        }

        fn placed(&self) -> Vec<OrderRequest> {
            self.placed.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Exchange for FakeExchange {
        async fn ping(&self) -> ExchangeResult<()> {
            if self.online {
                Ok(())
            } else {
                Err(ExchangeError::Api { code: -2015, msg: "Invalid API-key".into() })
            }
        }

        async fn balances(&self) -> ExchangeResult<Vec<AssetBalance>> {
            Ok(vec![AssetBalance { asset: "USDT".into(), wallet_balance: "15000.0".into() }])
        }

        async fn current_price(&self, symbol: &Symbol) -> ExchangeResult<Price> {
            match self.price {
                Some(p) => Ok(Price::new(p).unwrap()),
                None => Err(ExchangeError::UnknownSymbol(symbol.to_string())),
            }
        }

        async fn symbol_info(&self, symbol: &Symbol) -> ExchangeResult<SymbolInfo> {
            Ok(SymbolInfo {
                symbol: symbol.to_string(),
                status: "TRADING".into(),
                base_asset: "BTC".into(),
                quote_asset: "USDT".into(),
                price_precision: 2,
                quantity_precision: 3,
            })
        }

        async fn place_order(&self, order: &OrderRequest) -> ExchangeResult<OrderResponse> {
            if self.reject_orders {
                return Err(ExchangeError::Api { code: -2019, msg: "Margin is insufficient.".into() });
            }
            self.placed.lock().unwrap().push(order.clone());
            Ok(OrderResponse {
                order_id: 42,
                symbol: order.symbol.to_string(),
                side: order.side.to_string(),
                order_type: order.kind.as_str().into(),
                status: "NEW".into(),
                orig_qty: order.quantity.to_string(),
                price: order.price.map(|p| p.to_string()),
            })
        }
    }

    fn app(exchange: FakeExchange, script: &str) -> App<FakeExchange, &[u8], Vec<u8>> {
        let defaults = Defaults { symbol: "BTCUSDT".into(), quantity: "0.001".into() };
        App::new(
            exchange,
            Prompter::new(script.as_bytes()),
            Console::new(Vec::new(), false),
            defaults,
        )
    }

    fn output<R>(app: &App<FakeExchange, R, Vec<u8>>) -> String {
        String::from_utf8(app.console.get_ref().clone()).unwrap()
    }

    #[test]
    fn command_parsing() {
        assert_eq!("LIMITS".parse::<Command>(), Ok(Command::Limits));
        assert_eq!(" q ".parse::<Command>(), Ok(Command::Quit));
        assert_eq!("exit".parse::<Command>(), Ok(Command::Quit));
        assert!("trade".parse::<Command>().is_err());
    }

    #[tokio::test]
    async fn rejected_limit_price_shows_suggestions_and_skips_exchange() {
        let mut app = app(FakeExchange::at(100.0), "btcusdt\nbuy\n0.01\n160\n");
        app.limit_order_flow().await.unwrap();

        assert!(app.exchange.placed().is_empty());
        let out = output(&app);
        assert!(out.contains("💰 Current price: $100"));
        assert!(out.contains("Suggested BUY prices"));
        assert!(out.contains(
            "❌ Price Validation Failed: BUY price $160 too high. Max allowed: $150.00"
        ));
        assert!(out.contains("Suggested reasonable prices"));
        assert!(out.contains("Conservative (10% below): $90.00"));
    }

    #[tokio::test]
    async fn accepted_limit_price_is_submitted() {
        let mut app = app(FakeExchange::at(100.0), "BTCUSDT\nSELL\n0.5\n105\n");
        app.limit_order_flow().await.unwrap();

        let placed = app.exchange.placed();
        assert_eq!(placed.len(), 1);
        assert_eq!(placed[0].kind, OrderKind::Limit);
        assert_eq!(placed[0].side, Side::Sell);
        assert_eq!(placed[0].price.map(Price::value), Some(105.0));
        assert_eq!(placed[0].quantity.value(), 0.5);

        let out = output(&app);
        assert!(out.contains("Aggressive (2% above): $102.00"));
        assert!(out.contains("✅ Limit order placed successfully!"));
        assert!(out.contains("Order ID: 42"));
        assert!(out.contains("Price: 105"));
    }

    #[tokio::test]
    async fn limit_flow_stops_without_current_price() {
        let exchange = FakeExchange { price: None, ..FakeExchange::at(1.0) };
        let mut app = app(exchange, "BTCUSDT\nBUY\n1\n10\n");
        app.limit_order_flow().await.unwrap();

        assert!(app.exchange.placed().is_empty());
        let out = output(&app);
        assert!(out.contains("❌ Could not get current price"));
        assert!(!out.contains("Enter side"));
    }

    #[tokio::test]
    async fn place_limit_order_reports_missing_price() {
        let exchange = FakeExchange { price: None, ..FakeExchange::at(1.0) };
        let mut app = app(exchange, "");
        let placed = app
            .place_limit_order(
                "BTCUSDT".parse().unwrap(),
                Side::Buy,
                Quantity::new(1.0).unwrap(),
                Price::new(10.0).unwrap(),
            )
            .await
            .unwrap();
        assert!(placed.is_none());
        assert!(output(&app).contains("Price Validation Failed: Could not get current price"));
    }

    #[tokio::test]
    async fn market_flow_uses_default_quantity() {
        let mut app = app(FakeExchange::at(100.0), "ethusdt\nbuy\n\n");
        app.market_order_flow().await.unwrap();

        let placed = app.exchange.placed();
        assert_eq!(placed.len(), 1);
        assert_eq!(placed[0].kind, OrderKind::Market);
        assert_eq!(placed[0].symbol.as_str(), "ETHUSDT");
        assert_eq!(placed[0].quantity.value(), 0.001);
        assert!(placed[0].price.is_none());
        assert!(output(&app).contains("✅ Market order placed successfully!"));
    }

    #[tokio::test]
    async fn exchange_rejection_is_reported_not_raised() {
        let exchange = FakeExchange { reject_orders: true, ..FakeExchange::at(100.0) };
        let mut app = app(exchange, "BTCUSDT\nBUY\n1\n");
        app.market_order_flow().await.unwrap();
        assert!(output(&app).contains("❌ Binance API error: binance error -2019: Margin is insufficient."));
    }

    #[tokio::test]
    async fn run_loop_dispatches_commands() {
        let script = "help\nfoo\nlimits\nBTCUSDT\nbalance\nprice\n\nquit\n";
        let mut app = app(FakeExchange::at(100.0), script);
        app.run().await.unwrap();

        let out = output(&app);
        assert!(out.contains("BINANCE TRADING BOT"));
        assert_eq!(out.matches("Available Commands").count(), 2);
        assert!(out.contains("❌ Unknown command. Type 'help' for available commands."));
        assert!(out.contains("Market: BTC/USDT (TRADING)"));
        assert!(out.contains("Maximum BUY price: $150.00"));
        assert!(out.contains("USDT: 15000.0"));
        assert!(out.contains("💰 BTCUSDT current price: $100"));
        assert!(out.contains("👋 Goodbye!"));
    }

    #[tokio::test]
    async fn quit_inside_prompt_returns_to_menu() {
        let mut app = app(FakeExchange::at(100.0), "limit\nquit\nq\n");
        app.run().await.unwrap();
        assert!(app.exchange.placed().is_empty());
        assert!(output(&app).contains("👋 Goodbye!"));
    }

    #[tokio::test]
    async fn end_of_input_exits_cleanly() {
        let mut app = app(FakeExchange::at(100.0), "test\n");
        app.run().await.unwrap();
        let out = output(&app);
        assert_eq!(out.matches("✅ API connection successful!").count(), 2);
        assert!(out.contains("👋 Goodbye!"));
    }

    #[tokio::test]
    async fn failed_connection_aborts_startup() {
        let exchange = FakeExchange { online: false, ..FakeExchange::at(100.0) };
        let mut app = app(exchange, "help\n");
        assert!(app.run().await.is_err());
        let out = output(&app);
        assert!(out.contains("❌ API connection failed: binance error -2015: Invalid API-key"));
        assert!(out.contains("Cannot connect to Binance API"));
        assert!(!out.contains("Available Commands"));
    }
}
