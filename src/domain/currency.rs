//! Supported currencies

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::DomainError;

/// Currency code of an account. Stored as its upper-case ISO code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Usd,
    Eur,
}

impl Currency {
    pub const ALL: [Currency; 2] = [Currency::Usd, Currency::Eur];

    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::Usd => "USD",
            Currency::Eur => "EUR",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Currency {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "USD" => Ok(Currency::Usd),
            "EUR" => Ok(Currency::Eur),
            other => Err(DomainError::InvalidCurrency(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_currency() {
        assert_eq!("USD".parse::<Currency>().unwrap(), Currency::Usd);
        assert_eq!("EUR".parse::<Currency>().unwrap(), Currency::Eur);
        assert_eq!(
            "usd".parse::<Currency>(),
            Err(DomainError::InvalidCurrency("usd".to_string()))
        );
    }

    #[test]
    fn test_currency_round_trips_through_str() {
        for currency in Currency::ALL {
            assert_eq!(currency.as_str().parse::<Currency>().unwrap(), currency);
        }
    }
}
