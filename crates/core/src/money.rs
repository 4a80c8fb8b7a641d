use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid amount: {0:?}")]
pub struct AmountParseError(pub String);

/// Signed currency amount. Spending is positive, payments and credits are negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(Decimal);

impl Money {
    /// Rounds to cents, halves away from zero as on printed statements.
    pub fn from_decimal(decimal: Decimal) -> Self {
        Money(decimal.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero))
    }

    pub fn from_cents(cents: i64) -> Self {
        Money(Decimal::new(cents, 2))
    }

    pub fn as_decimal(self) -> Decimal {
        self.0
    }

    /// `None` when the sum does not fit in a `Decimal`.
    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        self.0.checked_add(rhs.0).map(Money)
    }

    /// Apply a source's sign convention (`1` keeps the sign, `-1` flips it).
    pub fn checked_scaled(self, multiplier: i32) -> Option<Self> {
        self.0.checked_mul(Decimal::from(multiplier)).map(Money)
    }
}

impl FromStr for Money {
    type Err = AmountParseError;

    /// Accepts `$`, thousands separators, accounting parentheses, and a
    /// leading or trailing minus sign (`12.99-` is a refund on store receipts).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let (paren_negative, inner) = if trimmed.starts_with('(') && trimmed.ends_with(')') {
            (true, &trimmed[1..trimmed.len() - 1])
        } else {
            (false, trimmed)
        };
        let (trailing_negative, inner) = match inner.strip_suffix('-') {
            Some(rest) => (true, rest),
            None => (false, inner),
        };
        let cleaned = inner.replace([',', '$', ' '], "");
        if cleaned.is_empty() {
            return Err(AmountParseError(s.to_string()));
        }
        let mut dec =
            Decimal::from_str(&cleaned).map_err(|_| AmountParseError(s.to_string()))?;
        if paren_negative || trailing_negative {
            dec = -dec;
        }
        Ok(Money::from_decimal(dec))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_sign_negative() && !self.0.is_zero() {
            write!(f, "-${:.2}", self.0.abs())
        } else {
            write!(f, "${:.2}", self.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn money(s: &str) -> Money {
        s.parse().unwrap()
    }

    #[test]
    fn parse_plain() {
        assert_eq!(money("123.45"), Money::from_cents(12345));
    }

    #[test]
    fn parse_with_dollar_sign_and_commas() {
        assert_eq!(money("$1,234.56"), Money::from_cents(123456));
    }

    #[test]
    fn parse_negative() {
        assert_eq!(money("-50.00"), Money::from_cents(-5000));
    }

    #[test]
    fn parse_accounting_parens() {
        assert_eq!(money("(75.25)"), Money::from_cents(-7525));
    }

    #[test]
    fn parse_trailing_minus_is_refund() {
        assert_eq!(money("12.99-"), Money::from_cents(-1299));
    }

    #[test]
    fn parse_rounds_half_away_from_zero() {
        assert_eq!(money("1.005"), Money::from_cents(101));
        assert_eq!(money("2.675"), Money::from_cents(268));
        assert_eq!(money("-1.005"), Money::from_cents(-101));
        assert_eq!(money("1.004"), Money::from_cents(100));
        assert_eq!(money("1.005").as_decimal().scale(), 2);
    }

    #[test]
    fn parse_invalid() {
        assert!("not_a_number".parse::<Money>().is_err());
        assert!("".parse::<Money>().is_err());
        assert!("  $ ".parse::<Money>().is_err());
    }

    #[test]
    fn scaled_flips_sign() {
        assert_eq!(Money::from_cents(500).checked_scaled(-1), Some(Money::from_cents(-500)));
        assert_eq!(Money::from_cents(500).checked_scaled(1), Some(Money::from_cents(500)));
    }

    #[test]
    fn debit_plus_negative_credit_consolidates() {
        let debit = Money::from_cents(3250);
        let credit = Money::from_cents(-1000);
        assert_eq!(debit.checked_add(credit), Some(Money::from_cents(2250)));
    }

    #[test]
    fn overflow_is_none_not_panic() {
        let max = Money::from_decimal(Decimal::MAX);
        assert_eq!(max.checked_add(max), None);
        assert_eq!(max.checked_scaled(2), None);
        assert!(max.checked_scaled(-1).is_some());
    }

    #[test]
    fn display_formats_sign_before_currency() {
        assert_eq!(Money::from_cents(3250).to_string(), "$32.50");
        assert_eq!(Money::from_cents(-3250).to_string(), "-$32.50");
        assert_eq!(Money::default().to_string(), "$0.00");
    }
}
