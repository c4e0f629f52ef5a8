use crate::domain::{Price, Side};

/// Widest accepted distance of a limit price from the market, as a fraction.
pub const MAX_DEVIATION: f64 = 0.5; // 0.5 => 50%

// Advisor tiers: (label stem, percent, multiplier).
const BUY_TIERS: [(&str, u32, f64); 3] = [
    ("Aggressive", 2, 0.98),
    ("Moderate", 5, 0.95),
    ("Conservative", 10, 0.90),
];
const SELL_TIERS: [(&str, u32, f64); 3] = [
    ("Aggressive", 2, 1.02),
    ("Moderate", 5, 1.05),
    ("Conservative", 10, 1.10),
];

// Display bands for the limits report. Independent of the advisor tiers.
const BUY_RANGE: (f64, f64) = (0.95, 1.05);
const SELL_RANGE: (f64, f64) = (1.05, 1.15);

pub const LIMIT_TIPS: [&str; 3] = [
    "BUY below current price to get a good deal",
    "SELL above current price to make profit",
    "Stay within 10% of current price for better execution",
];

#[derive(Debug, Clone, PartialEq)]
pub struct ValidationResult {
    pub accepted: bool,
    pub reason: String,
}

impl ValidationResult {
    fn accept() -> Self {
        Self { accepted: true, reason: "Price is valid".to_string() }
    }

    fn reject(reason: String) -> Self {
        Self { accepted: false, reason }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PriceSuggestion {
    pub label: String,
    pub price: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PriceLimits {
    pub current: f64,
    pub max_buy: f64,
    pub min_sell: f64,
    pub buy_range: (f64, f64),
    pub sell_range: (f64, f64),
}

/// Rounds to cents for display and suggestion output.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Checks a proposed limit price against the deviation band around `current`.
///
/// A price breaching the band is a normal negative result, not an error.
pub fn validate(current: Price, side: Side, proposed: Price) -> ValidationResult {
    let current = current.value();
    let proposed = proposed.value();

    match side {
        Side::Buy => {
            let max_allowed = current * (1.0 + MAX_DEVIATION);
            if proposed > max_allowed {
                return ValidationResult::reject(format!(
                    "BUY price ${proposed} too high. Max allowed: ${max_allowed:.2}"
                ));
            }
        }
        Side::Sell => {
            let min_allowed = current * (1.0 - MAX_DEVIATION);
            if proposed < min_allowed {
                return ValidationResult::reject(format!(
                    "SELL price ${proposed} too low. Min allowed: ${min_allowed:.2}"
                ));
            }
        }
    }

    ValidationResult::accept()
}

/// Suggested limit prices, closest to market first.
pub fn suggest(current: Price, side: Side) -> Vec<PriceSuggestion> {
    let (tiers, direction) = match side {
        Side::Buy => (&BUY_TIERS, "below"),
        Side::Sell => (&SELL_TIERS, "above"),
    };

    tiers
        .iter()
        .map(|(stem, pct, mult)| PriceSuggestion {
            label: format!("{stem} ({pct}% {direction})"),
            price: round2(current.value() * mult),
        })
        .collect()
}

pub fn limits(current: Price) -> PriceLimits {
    let c = current.value();
    PriceLimits {
        current: c,
        max_buy: round2(c * (1.0 + MAX_DEVIATION)),
        min_sell: round2(c * (1.0 - MAX_DEVIATION)),
        buy_range: (round2(c * BUY_RANGE.0), round2(c * BUY_RANGE.1)),
        sell_range: (round2(c * SELL_RANGE.0), round2(c * SELL_RANGE.1)),
    }
}
