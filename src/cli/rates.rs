use super::ui;
use crate::core::{ExchangeRate, RateResolution, RateResolver};
use anyhow::{Result, bail};
use chrono::NaiveDate;
use comfy_table::Cell;
use rust_decimal::Decimal;

pub fn display_rates(rates: &[ExchangeRate]) -> String {
    if rates.is_empty() {
        return ui::style_text("No stored exchange rates.", ui::StyleType::Subtle);
    }

    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Date"),
        ui::header_cell("KRW per USD"),
        ui::header_cell("Source"),
    ]);
    for rate in rates {
        table.add_row(vec![
            Cell::new(rate.date.to_string()),
            ui::amount_cell(rate.rate.to_string()),
            Cell::new(if rate.is_manual { "manual" } else { "cached" }),
        ]);
    }
    table.to_string()
}

/// Shows the rate that would be used for `date` without prompting.
pub async fn get(resolver: &RateResolver, date: NaiveDate) -> Result<()> {
    match resolver.rate_for(date).await {
        RateResolution::Resolved(resolved) => {
            println!(
                "{date}: {} KRW per USD ({})",
                ui::style_text(&resolved.rate.to_string(), ui::StyleType::TotalValue),
                resolved.source
            );
        }
        RateResolution::NeedsManualInput {
            fallback, reason, ..
        } => {
            println!(
                "{}",
                ui::style_text(
                    &format!("Could not fetch a rate for {date}: {reason}"),
                    ui::StyleType::Error
                )
            );
            println!("Fallback would be {fallback} KRW per USD. Use `rate set` to store one.");
        }
    }
    Ok(())
}

pub async fn set(resolver: &RateResolver, date: NaiveDate, rate: Decimal) -> Result<()> {
    if rate <= Decimal::ZERO {
        bail!("Rate must be greater than 0, got {}", rate);
    }
    resolver.set_manual_rate(date, rate).await?;
    println!("Manual rate for {date} set to {rate} KRW per USD");
    Ok(())
}

pub async fn list(resolver: &RateResolver) -> Result<()> {
    let rates = resolver.list_stored_rates().await?;
    println!("{}", display_rates(&rates));
    Ok(())
}
