use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use bomledger_core::{DomainError, DomainResult, ensure_positive};

/// Currencies purchases may be recorded in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Cad,
    Usd,
}

impl Currency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::Cad => "CAD",
            Currency::Usd => "USD",
        }
    }
}

impl core::str::FromStr for Currency {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "CAD" => Ok(Currency::Cad),
            "USD" => Ok(Currency::Usd),
            other => Err(DomainError::validation(format!(
                "unsupported currency '{other}' (expected CAD or USD)"
            ))),
        }
    }
}

impl core::fmt::Display for Currency {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Purchase as entered by the operator, before validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPurchase {
    pub date: NaiveDate,
    pub buyer: String,
    pub item_name: String,
    pub quantity: i64,
    pub price: Decimal,
    pub currency: String,
    pub tax: Decimal,
    pub url: String,
}

/// An immutable materials acquisition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Purchase {
    pub date: NaiveDate,
    pub buyer: String,
    pub item_name: String,
    pub quantity: i64,
    pub price: Decimal,
    pub currency: Currency,
    pub tax: Decimal,
    pub url: String,
}

impl NewPurchase {
    pub fn validate(self) -> DomainResult<Purchase> {
        let currency = self.currency.parse::<Currency>()?;
        ensure_positive("quantity", self.quantity)?;

        if self.item_name.trim().is_empty() {
            return Err(DomainError::validation("item name cannot be empty"));
        }
        if self.price < Decimal::ZERO {
            return Err(DomainError::validation(format!(
                "price cannot be negative (got {})",
                self.price
            )));
        }
        if self.tax < Decimal::ZERO {
            return Err(DomainError::validation(format!(
                "tax cannot be negative (got {})",
                self.tax
            )));
        }

        Ok(Purchase {
            date: self.date,
            buyer: self.buyer,
            item_name: self.item_name,
            quantity: self.quantity,
            price: self.price,
            currency,
            tax: self.tax,
            url: self.url,
        })
    }
}
