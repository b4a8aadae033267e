pub mod cli;
pub mod core;
pub mod providers;
pub mod store;

use crate::cli::add::AddExpense;
use crate::core::cache::{Cache, Store};
use crate::core::config::AppConfig;
use crate::core::{ExpenseStore, RateResolver};
use crate::store::{KeyValueStore, LEDGER_COLLECTION};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, info};

pub enum AppCommand {
    Add(AddExpense),
    Day { date: NaiveDate },
    Month { year: i32, month: u32 },
    RateGet { date: NaiveDate },
    RateSet { date: NaiveDate, rate: Decimal },
    RateList,
}

/// Wires the store, the rate provider and the resolver from a config.
pub struct App {
    expenses: ExpenseStore,
    resolver: RateResolver,
}

impl App {
    pub fn new(config: &AppConfig) -> Result<Self> {
        let data_path = config.default_data_path()?;
        let store = KeyValueStore::open(&data_path)?;
        let collection = store
            .get_collection(LEDGER_COLLECTION, true, true)
            .with_context(|| format!("Failed to open ledger in {}", data_path.display()))?;

        let rate_cache = Arc::new(Cache::new());
        let provider = Arc::new(providers::ExchangeRateHostProvider::new(
            config.rate_base_url(),
            rate_cache,
        ));

        Ok(Self {
            expenses: ExpenseStore::new(Arc::clone(&collection)),
            resolver: RateResolver::new(collection, provider, config.fallback_rate),
        })
    }

    pub fn expenses(&self) -> &ExpenseStore {
        &self.expenses
    }

    pub fn resolver(&self) -> &RateResolver {
        &self.resolver
    }

    pub async fn execute(&self, command: AppCommand) -> Result<()> {
        match command {
            AppCommand::Add(request) => {
                cli::add::run(&self.resolver, &self.expenses, request).await?;
                Ok(())
            }
            AppCommand::Day { date } => cli::day::run(&self.expenses, date).await,
            AppCommand::Month { year, month } => {
                cli::month::run(&self.expenses, year, month).await
            }
            AppCommand::RateGet { date } => cli::rates::get(&self.resolver, date).await,
            AppCommand::RateSet { date, rate } => {
                cli::rates::set(&self.resolver, date, rate).await
            }
            AppCommand::RateList => cli::rates::list(&self.resolver).await,
        }
    }
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("wonspend starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    App::new(&config)?.execute(command).await
}
