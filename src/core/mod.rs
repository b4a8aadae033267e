//! Core business logic abstractions

pub mod cache;
pub mod config;
pub mod expense;
pub mod ledger;
pub mod log;
pub mod rate;
pub mod resolver;

// Re-export main types for cleaner imports
pub use expense::{Category, DailyTotal, Expense};
pub use ledger::{ExpenseRepository, ExpenseStore};
pub use rate::{CurrencyRateProvider, ExchangeRate, RateResolution, RateSource, ResolvedRate};
pub use resolver::RateResolver;
