mod app;
mod binance;
mod config;
mod console;
mod domain;
mod input;
mod logger;
mod pricing;

use std::io;

use anyhow::Result;
use tracing::info;

use crate::app::{App, Defaults};
use crate::binance::BinanceClient;
use crate::console::Console;
use crate::input::Prompter;

#[tokio::main]
async fn main() -> Result<()> {
    // Load local .env if present
    let _ = dotenvy::dotenv();

    let cfg = config::Config::from_env()?;
    logger::init_tracing(&cfg)?;
    info!(?cfg, "boot");

    // Ctrl-C may land while the main task is blocked on stdin, so the exit
    // happens here rather than in the run loop.
    let color = cfg.color;
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupted");
            let mut console = Console::new(io::stdout(), color);
            let _ = console.line("").and_then(|_| console.goodbye());
            std::process::exit(0);
        }
    });

    let exchange = BinanceClient::new(&cfg)?;
    let defaults = Defaults::from_config(&cfg)?;
    let console = Console::new(io::stdout(), cfg.color);
    let input = Prompter::new(io::stdin().lock());

    let mut app = App::new(exchange, input, console, defaults);
    let res = app.run().await;
    if let Err(e) = &res {
        tracing::error!(error = %e, "exiting");
    }
    res
}
