use anyhow::Result;
use chrono::{Datelike, Local, NaiveDate};
use clap::{CommandFactory, Parser, Subcommand};
use rust_decimal::Decimal;
use std::path::Path;
use wonspend::cli::add::AddExpense;
use wonspend::core::Category;
use wonspend::core::log::init_logging;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable logging (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Log an expense in USD, converted to KRW at the day's rate
    Add {
        /// Amount in USD
        amount: Decimal,
        /// Expense date (YYYY-MM-DD), defaults to today
        #[arg(short, long)]
        date: Option<NaiveDate>,
        /// Food, Clothing, Transport, Beauty, Gifts, Culture or Other
        #[arg(short = 'k', long, default_value = "Food")]
        category: Category,
        /// Optional note
        #[arg(short, long)]
        memo: Option<String>,
        /// Use the fallback rate instead of prompting when the rate source is down
        #[arg(long)]
        no_prompt: bool,
    },
    /// List the expenses of one day
    Day {
        /// Date (YYYY-MM-DD), defaults to today
        date: Option<NaiveDate>,
    },
    /// Display a calendar of daily totals for a month
    Month {
        /// Year, defaults to the current year
        #[arg(short, long)]
        year: Option<i32>,
        /// Month (1-12), defaults to the current month
        #[arg(short, long, value_parser = clap::value_parser!(u32).range(1..=12))]
        month: Option<u32>,
    },
    /// Inspect or override exchange rates
    Rate {
        #[command(subcommand)]
        command: RateCommands,
    },
}

#[derive(Subcommand)]
enum RateCommands {
    /// Show the rate used for a date
    Get { date: Option<NaiveDate> },
    /// Store a manual rate for a date, taking precedence over any fetched rate
    Set { date: NaiveDate, rate: Decimal },
    /// List all stored rates
    List,
}

impl From<Commands> for wonspend::AppCommand {
    fn from(cmd: Commands) -> wonspend::AppCommand {
        let today = Local::now().date_naive();
        match cmd {
            Commands::Add {
                amount,
                date,
                category,
                memo,
                no_prompt,
            } => wonspend::AppCommand::Add(AddExpense {
                date: date.unwrap_or(today),
                amount_usd: amount,
                category,
                memo,
                interactive: !no_prompt,
            }),
            Commands::Day { date } => wonspend::AppCommand::Day {
                date: date.unwrap_or(today),
            },
            Commands::Month { year, month } => wonspend::AppCommand::Month {
                year: year.unwrap_or(today.year()),
                month: month.unwrap_or(today.month()),
            },
            Commands::Rate { command } => match command {
                RateCommands::Get { date } => wonspend::AppCommand::RateGet {
                    date: date.unwrap_or(today),
                },
                RateCommands::Set { date, rate } => wonspend::AppCommand::RateSet { date, rate },
                RateCommands::List => wonspend::AppCommand::RateList,
            },
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => {
            wonspend::cli::setup::run(cli.config_path.as_deref().map(Path::new)).map(|_| ())
        }
        Some(cmd) => wonspend::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
