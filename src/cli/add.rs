use super::ui;
use crate::core::{Category, Expense, ExpenseRepository, RateResolver, RateSource};
use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use console::Term;
use rust_decimal::Decimal;
use std::io::IsTerminal;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct AddExpense {
    pub date: NaiveDate,
    pub amount_usd: Decimal,
    pub category: Category,
    pub memo: Option<String>,
    /// Ask on the terminal for a manual rate when the rate source is down.
    pub interactive: bool,
}

/// Asks the user for a manual rate on the terminal. Returns `None` when the
/// user cancels, stdin is not a terminal, or the terminal fails.
pub fn prompt_manual_rate(date: NaiveDate, fallback: Decimal, reason: &str) -> Option<String> {
    prompt_if_attended(std::io::stdin().is_terminal(), date, fallback, reason)
}

fn prompt_if_attended(
    stdin_is_terminal: bool,
    date: NaiveDate,
    fallback: Decimal,
    reason: &str,
) -> Option<String> {
    if !stdin_is_terminal {
        debug!("stdin is not a terminal, skipping manual rate prompt");
        return None;
    }

    match read_manual_rate(&Term::stderr(), date, fallback, reason) {
        Ok(input) => Some(input),
        Err(e) => {
            warn!("Failed to read manual rate: {}", e);
            None
        }
    }
}

fn read_manual_rate(
    term: &Term,
    date: NaiveDate,
    fallback: Decimal,
    reason: &str,
) -> std::io::Result<String> {
    term.write_line(&ui::style_text(
        &format!("Failed to fetch exchange rate: {reason}"),
        ui::StyleType::Error,
    ))?;
    term.write_line(&format!(
        "Current fallback: {fallback} KRW per USD. Enter a manual rate for {date} (or leave empty to use fallback):"
    ))?;
    term.read_line()
}

pub async fn run(
    resolver: &RateResolver,
    store: &dyn ExpenseRepository,
    request: AddExpense,
) -> Result<Expense> {
    if request.amount_usd <= Decimal::ZERO {
        bail!("Please enter a valid amount greater than 0");
    }

    let pb = ui::new_spinner("Resolving exchange rate...");
    let interactive = request.interactive;
    let resolved = resolver
        .resolve_with(request.date, |date, fallback, reason| {
            pb.finish_and_clear();
            if interactive {
                prompt_manual_rate(date, fallback, reason)
            } else {
                None
            }
        })
        .await?;
    pb.finish_and_clear();

    if resolved.source == RateSource::Fallback {
        println!(
            "{}",
            ui::style_text(
                &format!("Using fallback rate {} KRW per USD", resolved.rate),
                ui::StyleType::Subtle
            )
        );
    }

    let expense = Expense::new(
        request.date,
        request.amount_usd,
        resolved.rate,
        request.category,
        request.memo.as_deref(),
    )?;
    store
        .add(expense.clone())
        .await
        .context("Failed to save expense. Storage might be full")?;
    info!(id = %expense.id, rate = %resolved.rate, source = %resolved.source, "Expense added");

    println!(
        "Expense added! {} = {}",
        ui::format_usd(expense.amount_usd),
        ui::style_text(&ui::format_krw(expense.amount_krw), ui::StyleType::TotalValue)
    );
    Ok(expense)
}
