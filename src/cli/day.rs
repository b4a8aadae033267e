use super::ui;
use crate::core::{Expense, ExpenseRepository};
use anyhow::{Result, anyhow};
use chrono::NaiveDate;
use comfy_table::Cell;
use rust_decimal::Decimal;

/// Renders every expense of one day with the day's totals.
pub fn display_day(date: NaiveDate, expenses: &[Expense]) -> Result<String> {
    let mut output = format!(
        "Expenses on {}\n\n",
        ui::style_text(&date.format("%Y-%m-%d (%a)").to_string(), ui::StyleType::Title)
    );

    if expenses.is_empty() {
        output.push_str(&ui::style_text(
            "No expenses recorded.",
            ui::StyleType::Subtle,
        ));
        return Ok(output);
    }

    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Category"),
        ui::header_cell("USD"),
        ui::header_cell("KRW"),
        ui::header_cell("Rate"),
        ui::header_cell("Memo"),
    ]);

    let mut total_usd = Decimal::ZERO;
    let mut total_krw = Decimal::ZERO;
    for expense in expenses {
        total_usd = total_usd
            .checked_add(expense.amount_usd)
            .ok_or_else(|| anyhow!("USD total for {date} is too large to compute"))?;
        total_krw = total_krw
            .checked_add(expense.amount_krw)
            .ok_or_else(|| anyhow!("KRW total for {date} is too large to compute"))?;
        let rate = expense
            .amount_krw
            .checked_div(expense.amount_usd)
            .map_or_else(|| "-".to_string(), |r| r.round_dp(2).normalize().to_string());
        table.add_row(vec![
            Cell::new(expense.category.to_string()),
            ui::amount_cell(ui::format_usd(expense.amount_usd)),
            ui::amount_cell(ui::format_krw(expense.amount_krw)),
            ui::amount_cell(rate),
            Cell::new(expense.memo.as_deref().unwrap_or("")),
        ]);
    }

    output.push_str(&table.to_string());
    output.push_str(&format!(
        "\n\n{}: {} / {}",
        ui::style_text("Total", ui::StyleType::TotalLabel),
        ui::style_text(&ui::format_usd(total_usd), ui::StyleType::TotalValue),
        ui::style_text(&ui::format_krw(total_krw), ui::StyleType::TotalValue)
    ));
    Ok(output)
}

pub async fn run(store: &dyn ExpenseRepository, date: NaiveDate) -> Result<()> {
    let expenses = store.by_date(date).await;
    println!("{}", display_day(date, &expenses)?);
    Ok(())
}
