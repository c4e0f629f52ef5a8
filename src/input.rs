use std::fmt::Display;
use std::io::{BufRead, Write};
use std::str::FromStr;

use anyhow::Result;

use crate::console::Console;

/// Line reader for interactive prompts.
pub struct Prompter<R> {
    reader: R,
}

impl<R: BufRead> Prompter<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }

    /// Next trimmed line, or `None` at end of input.
    ///
    /// Bytes that are not UTF-8 are replaced rather than failing the read, so a
    /// garbled answer is rejected by the parser and re-prompted.
    pub fn read_line(&mut self) -> Result<Option<String>> {
        let mut buf = Vec::new();
        if self.reader.read_until(b'\n', &mut buf)? == 0 {
            return Ok(None);
        }
        Ok(Some(String::from_utf8_lossy(&buf).trim().to_string()))
    }

    /// Prompts until the answer parses as `T`.
    ///
    /// Returns `None` when the operator types `quit` or input ends. An empty
    /// answer falls back to `default` when one is given.
    pub fn ask<T, W>(
        &mut self,
        console: &mut Console<W>,
        prompt: &str,
        default: Option<&str>,
    ) -> Result<Option<T>>
    where
        T: FromStr,
        T::Err: Display,
        W: Write,
    {
        let shown = match default {
            Some(d) => format!("{prompt} [{d}]"),
            None => prompt.to_string(),
        };
        loop {
            console.prompt(&shown)?;
            let Some(answer) = self.read_line()? else {
                return Ok(None);
            };
            if answer.eq_ignore_ascii_case("quit") {
                return Ok(None);
            }
            let raw = match (answer.is_empty(), default) {
                (true, Some(d)) => d,
                _ => answer.as_str(),
            };
            match raw.parse::<T>() {
                Ok(v) => return Ok(Some(v)),
                Err(e) => console.error(&format!("❌ Invalid input ({e}). Please try again."))?,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Price, Side, Symbol};

    fn console() -> Console<Vec<u8>> {
        Console::new(Vec::new(), false)
    }

    fn text(c: &Console<Vec<u8>>) -> String {
        String::from_utf8(c.get_ref().clone()).unwrap()
    }

    #[test]
    fn reprompts_until_valid() {
        let mut input = Prompter::new("hold\nsell\n".as_bytes());
        let mut out = console();
        let side: Option<Side> = input.ask(&mut out, "Enter side (BUY/SELL)", None).unwrap();
        assert_eq!(side, Some(Side::Sell));
        let shown = text(&out);
        assert_eq!(shown.matches("Enter side (BUY/SELL): ").count(), 2);
        assert!(shown.contains("Invalid input (unknown side \"hold\""));
    }

    #[test]
    fn non_utf8_answer_is_reprompted() {
        let mut input = Prompter::new(&b"\xff\xfe\nsell\n"[..]);
        let mut out = console();
        let side: Option<Side> = input.ask(&mut out, "Enter side (BUY/SELL)", None).unwrap();
        assert_eq!(side, Some(Side::Sell));
        assert_eq!(text(&out).matches("Invalid input").count(), 1);
    }

    #[test]
    fn quit_and_eof_cancel() {
        let mut out = console();
        let mut input = Prompter::new("QUIT\n".as_bytes());
        assert_eq!(input.ask::<Price, _>(&mut out, "Enter price", None).unwrap(), None);

        let mut input = Prompter::new("".as_bytes());
        assert_eq!(input.ask::<Price, _>(&mut out, "Enter price", None).unwrap(), None);
    }

    #[test]
    fn empty_answer_uses_default() {
        let mut out = console();
        let mut input = Prompter::new("\n".as_bytes());
        let sym: Option<Symbol> = input.ask(&mut out, "Enter symbol", Some("BTCUSDT")).unwrap();
        assert_eq!(sym.unwrap().as_str(), "BTCUSDT");
        assert!(text(&out).contains("Enter symbol [BTCUSDT]: "));
    }

    #[test]
    fn rejects_non_positive_price() {
        let mut out = console();
        let mut input = Prompter::new("-5\nabc\n12.5\n".as_bytes());
        let price: Option<Price> = input.ask(&mut out, "Enter price", None).unwrap();
        assert_eq!(price.unwrap().value(), 12.5);
        assert_eq!(text(&out).matches("Invalid input").count(), 2);
    }
}
