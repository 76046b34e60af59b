use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use thiserror::Error;

/// Monetary amounts, quantities and rates are exact decimals.
/// Amounts are EUR; rounding to cents only happens for display.
pub type Amount = Decimal;

pub const CURRENCY: &str = "EUR";

/// Largest magnitude accepted from user input for an amount, quantity or rate.
pub const MAX_INPUT_MAGNITUDE: i64 = 1_000_000_000;

/// Round to cents, half away from zero.
pub fn round_cents(amount: Amount) -> Amount {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Format an amount as a human-readable currency string.
/// Example: 1234.5 -> "1234.50 €", -3 -> "-3.00 €"
pub fn format_amount(amount: Amount) -> String {
    format!("{:.2} €", round_cents(amount))
}

/// Format a quantity without trailing zeros.
/// Example: 2.50 -> "2.5", 3.00 -> "3"
pub fn format_quantity(quantity: Decimal) -> String {
    quantity.normalize().to_string()
}

/// Parse a decimal string strictly. Accepts "," as the decimal separator.
/// Example: "50" -> 50, "12,5" -> 12.5
pub fn parse_amount(input: &str) -> Result<Amount, ParseAmountError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(ParseAmountError::Empty);
    }

    let normalized = input.replace(',', ".");
    let amount = Decimal::from_str(&normalized)
        .map_err(|_| ParseAmountError::InvalidFormat(input.to_string()))?;
    if amount.abs() > Decimal::from(MAX_INPUT_MAGNITUDE) {
        return Err(ParseAmountError::OutOfRange(input.to_string()));
    }
    Ok(amount)
}

/// Parse form input permissively: anything that does not parse is zero.
pub fn coerce_amount(input: &str) -> Amount {
    parse_amount(input).unwrap_or(Decimal::ZERO)
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseAmountError {
    #[error("empty amount")]
    Empty,

    #[error("invalid amount format: {0}")]
    InvalidFormat(String),

    #[error("amount out of range: {0}")]
    OutOfRange(String),
}
