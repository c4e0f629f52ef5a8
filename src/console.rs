use std::io::{self, Write};

use crossterm::style::{style, Color, Stylize};

use crate::binance::SymbolInfo;
use crate::domain::{AssetBalance, OrderResponse, Side};
use crate::pricing::{PriceLimits, PriceSuggestion, LIMIT_TIPS};

const BANNER: &str = r#"
    ╔══════════════════════════════════════╗
    ║        BINANCE TRADING BOT           ║
    ║            Testnet Mode              ║
    ╚══════════════════════════════════════╝
"#;

const MENU: &str = r#"
    🔹 Available Commands:
    1. test      - Test API connection
    2. balance   - Show account balance
    3. price     - Get current price for symbol
    4. limits    - Show price limits for symbol
    5. market    - Place market order
    6. limit     - Place limit order
    7. help      - Show this menu
    8. quit      - Exit the bot
"#;

/// Operator-facing output. Colors are applied only when enabled.
pub struct Console<W> {
    out: W,
    color: bool,
}

impl<W: Write> Console<W> {
    pub fn new(out: W, color: bool) -> Self {
        Self { out, color }
    }

    #[cfg(test)]
    pub fn get_ref(&self) -> &W {
        &self.out
    }

    fn colored(&mut self, msg: &str, color: Color) -> io::Result<()> {
        if self.color {
            writeln!(self.out, "{}", style(msg).with(color))
        } else {
            writeln!(self.out, "{msg}")
        }
    }

    pub fn success(&mut self, msg: &str) -> io::Result<()> {
        self.colored(msg, Color::Green)
    }

    pub fn error(&mut self, msg: &str) -> io::Result<()> {
        self.colored(msg, Color::Red)
    }

    pub fn warn(&mut self, msg: &str) -> io::Result<()> {
        self.colored(msg, Color::Yellow)
    }

    pub fn heading(&mut self, msg: &str) -> io::Result<()> {
        self.colored(msg, Color::Cyan)
    }

    pub fn line(&mut self, msg: &str) -> io::Result<()> {
        writeln!(self.out, "{msg}")
    }

    /// Writes a prompt without a newline and flushes so it shows before input.
    pub fn prompt(&mut self, msg: &str) -> io::Result<()> {
        if self.color {
            write!(self.out, "{}: ", style(msg).with(Color::Cyan))?;
        } else {
            write!(self.out, "{msg}: ")?;
        }
        self.out.flush()
    }

    pub fn goodbye(&mut self) -> io::Result<()> {
        self.heading("👋 Goodbye!")
    }

    pub fn banner(&mut self) -> io::Result<()> {
        self.heading(BANNER)
    }

    pub fn menu(&mut self) -> io::Result<()> {
        self.warn(MENU)
    }

    pub fn suggestions(&mut self, title: &str, suggestions: &[PriceSuggestion]) -> io::Result<()> {
        self.warn(&format!("\n💡 {title}:"))?;
        for s in suggestions {
            self.line(&format!("  {}: ${:.2}", s.label, s.price))?;
        }
        Ok(())
    }

    pub fn balances(&mut self, balances: &[AssetBalance]) -> io::Result<()> {
        self.heading("\n💰 Account Balances:")?;
        let mut funded = balances.iter().filter(|b| b.is_funded()).peekable();
        if funded.peek().is_none() {
            return self.line("  (no funded assets)");
        }
        for b in funded {
            self.line(&format!("  {}: {}", b.asset, b.wallet_balance))?;
        }
        Ok(())
    }

    pub fn order_placing(
        &mut self,
        side: Side,
        kind: &str,
        lines: &[(&str, String)],
    ) -> io::Result<()> {
        self.warn(&format!("\n📊 Placing {side} {kind} order..."))?;
        for (k, v) in lines {
            self.line(&format!("{k}: {v}"))?;
        }
        Ok(())
    }

    pub fn order_details(&mut self, order: &OrderResponse) -> io::Result<()> {
        self.heading("\n📋 Order Details:")?;
        self.line(&format!("  Order ID: {}", order.order_id))?;
        self.line(&format!("  Symbol: {}", order.symbol))?;
        self.line(&format!("  Side: {}", order.side))?;
        self.line(&format!("  Type: {}", order.order_type))?;
        self.line(&format!("  Status: {}", order.status))?;
        self.line(&format!("  Quantity: {}", order.orig_qty))?;
        if let Some(price) = order.display_price() {
            self.line(&format!("  Price: {price}"))?;
        }
        Ok(())
    }

    pub fn limits_report(
        &mut self,
        symbol: &str,
        limits: &PriceLimits,
        info: Option<&SymbolInfo>,
    ) -> io::Result<()> {
        self.heading(&format!("\n📊 Price Limits for {symbol}:"))?;
        self.line(&format!("Current Price: ${}", limits.current))?;
        if let Some(info) = info {
            self.line(&format!(
                "Market: {}/{} ({}), price precision {}, quantity precision {}",
                info.base_asset,
                info.quote_asset,
                info.status,
                info.price_precision,
                info.quantity_precision
            ))?;
        }

        self.warn("\n🔹 BUY Order Limits:")?;
        self.line(&format!("  Maximum BUY price: ${:.2}", limits.max_buy))?;
        self.line(&format!(
            "  Reasonable range: ${:.2} - ${:.2}",
            limits.buy_range.0, limits.buy_range.1
        ))?;

        self.warn("\n🔹 SELL Order Limits:")?;
        self.line(&format!("  Minimum SELL price: ${:.2}", limits.min_sell))?;
        self.line(&format!(
            "  Reasonable range: ${:.2} - ${:.2}",
            limits.sell_range.0, limits.sell_range.1
        ))?;

        self.success("\n💡 Tips:")?;
        for tip in LIMIT_TIPS {
            self.line(&format!("  • {tip}"))?;
        }
        Ok(())
    }
}
