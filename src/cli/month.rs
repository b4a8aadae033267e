use super::ui;
use crate::core::{DailyTotal, ExpenseRepository};
use anyhow::{Result, anyhow};
use chrono::{Datelike, Months, NaiveDate};
use comfy_table::{Cell, CellAlignment, Color};
use rust_decimal::Decimal;
use std::collections::HashMap;

const WEEKDAYS: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

/// Renders a month as a Sunday-first calendar with each day's KRW total.
pub fn display_month(year: i32, month: u32, totals: &[DailyTotal]) -> Result<String> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| anyhow!("Invalid month: {year}-{month:02}"))?;
    let days_in_month = first
        .checked_add_months(Months::new(1))
        .and_then(|next| next.pred_opt())
        .map_or(31, |last| last.day());

    let by_day: HashMap<u32, &DailyTotal> = totals.iter().map(|t| (t.date.day(), t)).collect();

    let mut table = ui::new_styled_table();
    table.set_header(WEEKDAYS.iter().map(|d| ui::header_cell(d)).collect::<Vec<_>>());

    let mut row: Vec<Cell> = (0..first.weekday().num_days_from_sunday())
        .map(|_| Cell::new(""))
        .collect();
    for day in 1..=days_in_month {
        let cell = match by_day.get(&day) {
            Some(total) => Cell::new(format!("{day}\n{}", ui::format_krw(total.total_krw)))
                .fg(Color::Green)
                .set_alignment(CellAlignment::Right),
            None => Cell::new(day.to_string()).set_alignment(CellAlignment::Right),
        };
        row.push(cell);
        if row.len() == 7 {
            table.add_row(std::mem::take(&mut row));
        }
    }
    if !row.is_empty() {
        table.add_row(row);
    }

    let total_usd = checked_total(totals.iter().map(|t| t.total_usd))
        .ok_or_else(|| anyhow!("USD total for {year}-{month:02} is too large to compute"))?;
    let total_krw = checked_total(totals.iter().map(|t| t.total_krw))
        .ok_or_else(|| anyhow!("KRW total for {year}-{month:02} is too large to compute"))?;

    let mut output = format!(
        "{}\n\n",
        ui::style_text(&first.format("%B %Y").to_string(), ui::StyleType::Title)
    );
    output.push_str(&table.to_string());
    output.push_str(&format!(
        "\n\n{}: {} / {} over {} day(s)",
        ui::style_text("Month Total", ui::StyleType::TotalLabel),
        ui::style_text(&ui::format_usd(total_usd), ui::StyleType::TotalValue),
        ui::style_text(&ui::format_krw(total_krw), ui::StyleType::TotalValue),
        totals.len()
    ));
    Ok(output)
}

fn checked_total(amounts: impl Iterator<Item = Decimal>) -> Option<Decimal> {
    amounts.fold(Some(Decimal::ZERO), |acc, amount| acc?.checked_add(amount))
}

pub async fn run(store: &dyn ExpenseRepository, year: i32, month: u32) -> Result<()> {
    let totals = store.daily_totals(year, month).await?;
    println!("{}", display_month(year, month, &totals)?);
    Ok(())
}
