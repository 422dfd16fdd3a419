use serde::{Deserialize, Serialize};

use crate::LedgerError;

/// Currency a group keeps its books in.
///
/// Every supported currency uses two minor units, so a [`Money`] value
/// is always a count of cents regardless of the group currency.
///
/// [`Money`]: crate::Money
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    #[default]
    Eur,
    Usd,
    Gbp,
    Chf,
    Pln,
    Sek,
}

impl Currency {
    /// ISO 4217 code.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Currency::Eur => "EUR",
            Currency::Usd => "USD",
            Currency::Gbp => "GBP",
            Currency::Chf => "CHF",
            Currency::Pln => "PLN",
            Currency::Sek => "SEK",
        }
    }

    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Currency::Eur => "€",
            Currency::Usd => "$",
            Currency::Gbp => "£",
            Currency::Chf => "CHF",
            Currency::Pln => "zł",
            Currency::Sek => "kr",
        }
    }
}

impl core::fmt::Display for Currency {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.code())
    }
}

impl TryFrom<&str> for Currency {
    type Error = LedgerError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_uppercase().as_str() {
            "EUR" => Ok(Currency::Eur),
            "USD" => Ok(Currency::Usd),
            "GBP" => Ok(Currency::Gbp),
            "CHF" => Ok(Currency::Chf),
            "PLN" => Ok(Currency::Pln),
            "SEK" => Ok(Currency::Sek),
            other => Err(LedgerError::UnsupportedCurrency(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_codes_case_insensitively() {
        assert_eq!(Currency::try_from(" usd "), Ok(Currency::Usd));
        assert_eq!(Currency::try_from("Pln"), Ok(Currency::Pln));
        assert_eq!(
            Currency::try_from("XYZ"),
            Err(LedgerError::UnsupportedCurrency("XYZ".to_string()))
        );
    }
}
