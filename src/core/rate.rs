//! Exchange rate types and the remote rate abstraction.

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt::Display;

#[async_trait]
pub trait CurrencyRateProvider: Send + Sync {
    /// Returns the latest rate converting one unit of `from` into `to`.
    async fn get_rate(&self, from: &str, to: &str) -> Result<Decimal>;
}

/// A rate known to the local store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeRate {
    pub date: NaiveDate,
    pub rate: Decimal,
    pub is_manual: bool,
}

/// Where a resolved rate came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateSource {
    Manual,
    Cached,
    Fetched,
    Fallback,
}

impl Display for RateSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                RateSource::Manual => "manual",
                RateSource::Cached => "cached",
                RateSource::Fetched => "fetched",
                RateSource::Fallback => "fallback",
            }
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedRate {
    pub rate: Decimal,
    pub source: RateSource,
}

/// Outcome of a rate lookup. The resolver never prompts on its own; when the
/// remote source fails it hands the decision back to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RateResolution {
    Resolved(ResolvedRate),
    NeedsManualInput {
        date: NaiveDate,
        fallback: Decimal,
        reason: String,
    },
}

/// Parses a user supplied rate, in plain or scientific notation (`1.3e3`).
/// Only finite positive numbers are accepted.
pub fn parse_rate(input: &str) -> Option<Decimal> {
    let input = input.trim();
    input
        .parse::<Decimal>()
        .or_else(|_| Decimal::from_scientific(input))
        .ok()
        .filter(|rate| rate.is_sign_positive() && !rate.is_zero())
}
