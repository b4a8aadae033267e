//! Persistence and queries for expense records.
//!
//! All expenses live as a single JSON array under [`EXPENSES_KEY`]. Appends
//! go through [`ExpenseRepository::add`], which serialises the
//! read-modify-write so concurrent writers on the same store never lose
//! records.

use crate::core::cache::KeyValueCollection;
use crate::core::expense::{DailyTotal, Expense};
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

pub const EXPENSES_KEY: &str = "expenses-v1";

#[async_trait]
pub trait ExpenseRepository: Send + Sync {
    /// Returns all expenses in insertion order. Missing or corrupt data,
    /// including records with non-positive amounts, yields an empty list.
    async fn load(&self) -> Vec<Expense>;

    /// Replaces the whole collection.
    async fn save(&self, records: &[Expense]) -> Result<()>;

    /// Appends a single expense atomically.
    async fn add(&self, record: Expense) -> Result<()>;

    async fn by_date(&self, date: NaiveDate) -> Vec<Expense> {
        self.load()
            .await
            .into_iter()
            .filter(|e| e.date == date)
            .collect()
    }

    /// Per-day totals for the given month, ordered by date. Fails only when a
    /// sum exceeds the decimal range.
    async fn daily_totals(&self, year: i32, month: u32) -> Result<Vec<DailyTotal>> {
        aggregate_daily_totals(&self.load().await, year, month)
    }
}

/// Groups the expenses falling in `year`-`month` by exact date.
pub fn aggregate_daily_totals(
    expenses: &[Expense],
    year: i32,
    month: u32,
) -> Result<Vec<DailyTotal>> {
    let mut totals: BTreeMap<NaiveDate, DailyTotal> = BTreeMap::new();

    for expense in expenses
        .iter()
        .filter(|e| e.date.year() == year && e.date.month() == month)
    {
        let total = totals.entry(expense.date).or_insert_with(|| DailyTotal {
            date: expense.date,
            total_usd: Decimal::ZERO,
            total_krw: Decimal::ZERO,
        });
        total.total_usd = checked_sum(total.total_usd, expense.amount_usd, expense.date)?;
        total.total_krw = checked_sum(total.total_krw, expense.amount_krw, expense.date)?;
    }

    Ok(totals.into_values().collect())
}

fn checked_sum(total: Decimal, amount: Decimal, date: NaiveDate) -> Result<Decimal> {
    total
        .checked_add(amount)
        .ok_or_else(|| anyhow!("Total for {} is too large to compute", date))
}

pub struct ExpenseStore {
    collection: Arc<dyn KeyValueCollection>,
    append_lock: Mutex<()>,
}

impl ExpenseStore {
    pub fn new(collection: Arc<dyn KeyValueCollection>) -> Self {
        Self {
            collection,
            append_lock: Mutex::new(()),
        }
    }

    async fn write_all(&self, records: &[Expense]) -> Result<()> {
        let bytes = serde_json::to_vec(records).context("Failed to serialize expenses")?;
        self.collection
            .put(EXPENSES_KEY.as_bytes(), &bytes)
            .await
            .with_context(|| format!("Failed to save {} expenses", records.len()))
    }
}

#[async_trait]
impl ExpenseRepository for ExpenseStore {
    async fn load(&self) -> Vec<Expense> {
        let Some(bytes) = self.collection.get(EXPENSES_KEY.as_bytes()).await else {
            debug!("No stored expenses");
            return Vec::new();
        };

        match serde_json::from_slice::<Vec<Expense>>(&bytes) {
            Ok(expenses) if !expenses.iter().all(Expense::is_valid) => {
                warn!("Stored expenses contain non-positive amounts, treating as empty");
                Vec::new()
            }
            Ok(expenses) => {
                debug!("Loaded {} expenses", expenses.len());
                expenses
            }
            Err(e) => {
                warn!("Stored expenses are unreadable, treating as empty: {}", e);
                Vec::new()
            }
        }
    }

    async fn save(&self, records: &[Expense]) -> Result<()> {
        let _guard = self.append_lock.lock().await;
        self.write_all(records).await
    }

    async fn add(&self, record: Expense) -> Result<()> {
        let _guard = self.append_lock.lock().await;
        let mut expenses = self.load().await;
        debug!(id = %record.id, date = %record.date, "Appending expense");
        expenses.push(record);
        self.write_all(&expenses).await
    }
}
