//! Expense records and derived daily totals.

use anyhow::{Result, bail};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Food,
    Clothing,
    Transport,
    Beauty,
    Gifts,
    Culture,
    Other,
}

impl Category {
    pub const ALL: [Category; 7] = [
        Category::Food,
        Category::Clothing,
        Category::Transport,
        Category::Beauty,
        Category::Gifts,
        Category::Culture,
        Category::Other,
    ];
}

impl Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Category::Food => "Food",
                Category::Clothing => "Clothing",
                Category::Transport => "Transport",
                Category::Beauty => "Beauty",
                Category::Gifts => "Gifts",
                Category::Culture => "Culture",
                Category::Other => "Other",
            }
        )
    }
}

impl FromStr for Category {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.to_string().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                let names: Vec<String> = Category::ALL.iter().map(|c| c.to_string()).collect();
                anyhow::anyhow!("Invalid category: {} (expected one of {})", s, names.join(", "))
            })
    }
}

/// A single logged expense. `amount_krw` is fixed at creation time using the
/// rate resolved for `date` and is never recomputed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expense {
    pub id: String,
    pub date: NaiveDate,
    #[serde(rename = "amountUSD", with = "rust_decimal::serde::float")]
    pub amount_usd: Decimal,
    #[serde(rename = "amountKRW", with = "rust_decimal::serde::float")]
    pub amount_krw: Decimal,
    pub category: Category,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,
}

impl Expense {
    pub fn new(
        date: NaiveDate,
        amount_usd: Decimal,
        rate: Decimal,
        category: Category,
        memo: Option<&str>,
    ) -> Result<Self> {
        if amount_usd <= Decimal::ZERO {
            bail!("Amount must be greater than 0, got {}", amount_usd);
        }
        if rate <= Decimal::ZERO {
            bail!("Exchange rate must be greater than 0, got {}", rate);
        }
        let Some(amount_krw) = amount_usd.checked_mul(rate) else {
            bail!("Amount {} at rate {} is too large to convert", amount_usd, rate);
        };

        Ok(Self {
            id: new_expense_id(),
            date,
            amount_usd,
            amount_krw,
            category,
            memo: memo
                .map(str::trim)
                .filter(|m| !m.is_empty())
                .map(str::to_string),
        })
    }

    /// Both amounts must be positive for a stored record to be usable.
    pub fn is_valid(&self) -> bool {
        self.amount_usd > Decimal::ZERO && self.amount_krw > Decimal::ZERO
    }
}

/// Sum of all expenses recorded on one date. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyTotal {
    pub date: NaiveDate,
    #[serde(rename = "totalUSD", with = "rust_decimal::serde::float")]
    pub total_usd: Decimal,
    #[serde(rename = "totalKRW", with = "rust_decimal::serde::float")]
    pub total_krw: Decimal,
}

/// Generates an opaque expense id. UUIDv7 carries a millisecond timestamp
/// followed by random bits.
pub fn new_expense_id() -> String {
    format!("expense-{}", Uuid::now_v7().simple())
}
