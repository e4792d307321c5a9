//! CLI binary for smoke-testing the Outlay record store.
#![allow(
    clippy::exit,
    reason = "CLI binary uses process::exit for fatal errors"
)]

use std::io::{self, Write as _};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, Color, Table};
use indicatif::{ProgressBar, ProgressStyle};
use outlay_rs::client::RecordStoreBlockingClient;
use outlay_rs::ledger::ExpenseLedgerBlocking;
use outlay_rs::models::{
    Category, Expense, ExpenseFilter, ExpenseId, ExpensePatch, NaiveDate, NewExpense, Summary,
};
use outlay_rs::store::BlockingRecordStore;
use owo_colors::OwoColorize;

/// Environment variable name for the record store base URL.
const URL_ENV: &str = "OUTLAY_URL";

/// Environment variable name for the service API key.
const KEY_ENV: &str = "OUTLAY_API_KEY";

/// Environment variable name for the optional user bearer token.
const TOKEN_ENV: &str = "OUTLAY_TOKEN";

/// Outlay CLI — record and browse personal expenses.
#[derive(Debug, Parser)]
#[command(name = "outlay", version, about)]
struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
enum Command {
    /// List expenses, optionally filtered by category, date range, or
    /// description substring.
    List(FilterArgs),
    /// Record a new expense.
    Add(AddArgs),
    /// Update fields of an existing expense.
    Update(UpdateArgs),
    /// Delete an expense by id.
    Delete {
        /// Id of the expense to delete.
        id: String,
    },
    /// Show aggregate statistics for the (optionally filtered) list.
    Summary(FilterArgs),
}

/// Filter flags shared by `list` and `summary`.
#[derive(Debug, Args)]
struct FilterArgs {
    /// Filter by category (Food, Travel, Shopping, Other).
    #[arg(long, value_parser = parse_category)]
    category: Option<Category>,
    /// Start date (inclusive, YYYY-MM-DD).
    #[arg(long, value_parser = parse_date)]
    from: Option<NaiveDate>,
    /// End date (inclusive, YYYY-MM-DD).
    #[arg(long, value_parser = parse_date)]
    to: Option<NaiveDate>,
    /// Description substring (case-insensitive).
    #[arg(long)]
    search: Option<String>,
}

/// Arguments for the `add` subcommand.
#[derive(Debug, Args)]
struct AddArgs {
    /// Amount spent (non-negative).
    #[arg(long)]
    amount: f64,
    /// Category (Food, Travel, Shopping, Other).
    #[arg(long, value_parser = parse_category)]
    category: Category,
    /// Effective date (YYYY-MM-DD).
    #[arg(long, value_parser = parse_date)]
    date: NaiveDate,
    /// Free-text description.
    #[arg(long, default_value = "")]
    description: String,
}

/// Arguments for the `update` subcommand.
#[derive(Debug, Args)]
struct UpdateArgs {
    /// Id of the expense to update.
    id: String,
    /// Replacement amount.
    #[arg(long)]
    amount: Option<f64>,
    /// Replacement category.
    #[arg(long, value_parser = parse_category)]
    category: Option<Category>,
    /// Replacement effective date (YYYY-MM-DD).
    #[arg(long, value_parser = parse_date)]
    date: Option<NaiveDate>,
    /// Replacement description.
    #[arg(long)]
    description: Option<String>,
}

/// Parses a date string in `YYYY-MM-DD` format for clap.
fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|err| format!("{err}"))
}

/// Parses a category name for clap.
fn parse_category(s: &str) -> Result<Category, String> {
    s.parse::<Category>().map_err(|err| format!("{err}"))
}

/// Builds an [`ExpenseFilter`] from CLI flags.
fn build_filter(args: &FilterArgs) -> ExpenseFilter {
    let mut filter = ExpenseFilter::new();
    if let Some(category) = args.category {
        filter = filter.category(category);
    }
    if let Some(from) = args.from {
        filter = filter.from_date(from);
    }
    if let Some(to) = args.to {
        filter = filter.to_date(to);
    }
    if let Some(needle) = args.search.as_deref() {
        filter = filter.search(needle);
    }
    filter
}

/// Record store connection settings read from the environment.
#[derive(Debug)]
struct StoreConfig {
    /// Base URL of the record store.
    url: String,
    /// Service API key.
    api_key: String,
    /// Optional per-user bearer token.
    token: Option<String>,
}

/// Reads connection settings from the environment.
fn read_config() -> io::Result<Option<StoreConfig>> {
    let url = std::env::var(URL_ENV).ok().filter(|val| !val.is_empty());
    let api_key = std::env::var(KEY_ENV).ok().filter(|val| !val.is_empty());
    match url.zip(api_key) {
        Some((url, api_key)) => Ok(Some(StoreConfig {
            url,
            api_key,
            token: std::env::var(TOKEN_ENV).ok().filter(|val| !val.is_empty()),
        })),
        None => {
            let mut err = io::stderr().lock();
            writeln!(
                err,
                "{} {} and {} environment variables are not set",
                "error:".red().bold(),
                URL_ENV.bold(),
                KEY_ENV.bold()
            )?;
            writeln!(
                err,
                "  {} create a .env file with {}=<project url> and {}=<service key>",
                "hint:".cyan(),
                URL_ENV,
                KEY_ENV
            )?;
            Ok(None)
        }
    }
}

/// Runs the CLI, returning an appropriate exit code.
fn run() -> io::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let _dotenv = dotenvy::dotenv();

    let cli = Cli::parse();

    let Some(config) = read_config()? else {
        return Ok(ExitCode::FAILURE);
    };

    let mut builder = RecordStoreBlockingClient::builder()
        .base_url(config.url)
        .api_key(config.api_key);
    if let Some(token) = config.token {
        builder = builder.access_token(token);
    }
    let client = match builder.build() {
        Ok(client) => client,
        Err(err) => {
            writeln!(
                io::stderr().lock(),
                "{} failed to build client: {err}",
                "error:".red().bold()
            )?;
            return Ok(ExitCode::FAILURE);
        }
    };

    let ledger = ExpenseLedgerBlocking::new(client);
    dispatch(&ledger, cli.command)
}

/// Dispatches to the appropriate subcommand handler.
fn dispatch<S: BlockingRecordStore>(
    ledger: &ExpenseLedgerBlocking<S>,
    command: Command,
) -> io::Result<ExitCode> {
    match command {
        Command::List(args) => cmd_list(ledger, &args),
        Command::Add(args) => cmd_add(ledger, &args),
        Command::Update(args) => cmd_update(ledger, args),
        Command::Delete { id } => cmd_delete(ledger, &id),
        Command::Summary(args) => cmd_summary(ledger, &args),
    }
}

/// Executes the `list` subcommand: fetches and prints expenses.
fn cmd_list<S: BlockingRecordStore>(
    ledger: &ExpenseLedgerBlocking<S>,
    args: &FilterArgs,
) -> io::Result<ExitCode> {
    let spinner = make_spinner("Fetching expenses...");
    let result = ledger.fetch(&build_filter(args));
    spinner.finish_and_clear();

    match result {
        Ok(expenses) => {
            print_expenses_table(&expenses)?;
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            writeln!(
                io::stderr().lock(),
                "{} failed to fetch expenses: {err}",
                "error:".red().bold()
            )?;
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Executes the `add` subcommand: records a new expense.
fn cmd_add<S: BlockingRecordStore>(
    ledger: &ExpenseLedgerBlocking<S>,
    args: &AddArgs,
) -> io::Result<ExitCode> {
    let payload = match NewExpense::new(args.amount, args.category, &*args.description, args.date) {
        Ok(payload) => payload,
        Err(err) => {
            writeln!(io::stderr().lock(), "{} {err}", "error:".red().bold())?;
            return Ok(ExitCode::FAILURE);
        }
    };

    let spinner = make_spinner("Recording expense...");
    let result = ledger.add(payload);
    spinner.finish_and_clear();

    match result {
        Ok(created) => {
            let mut out = io::stdout().lock();
            writeln!(
                out,
                "{} {} {} on {}",
                "Recorded".green().bold(),
                format_args!("{:.2}", created.amount).bold(),
                created.category,
                created.date
            )?;
            writeln!(out, "  {} {}", "id:".dimmed(), created.id)?;
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            writeln!(
                io::stderr().lock(),
                "{} failed to record expense: {err}",
                "error:".red().bold()
            )?;
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Executes the `update` subcommand: patches an existing expense.
fn cmd_update<S: BlockingRecordStore>(
    ledger: &ExpenseLedgerBlocking<S>,
    args: UpdateArgs,
) -> io::Result<ExitCode> {
    let mut patch = ExpensePatch::new();
    if let Some(amount) = args.amount {
        patch = patch.amount(amount);
    }
    if let Some(category) = args.category {
        patch = patch.category(category);
    }
    if let Some(date) = args.date {
        patch = patch.date(date);
    }
    if let Some(description) = args.description {
        patch = patch.description(description);
    }

    let spinner = make_spinner("Updating expense...");
    let result = ledger.update(&ExpenseId::from(args.id.as_str()), patch);
    spinner.finish_and_clear();

    match result {
        Ok(updated) => {
            writeln!(
                io::stdout().lock(),
                "{} {} {} on {}",
                "Updated".green().bold(),
                format_args!("{:.2}", updated.amount).bold(),
                updated.category,
                updated.date
            )?;
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            writeln!(
                io::stderr().lock(),
                "{} failed to update expense: {err}",
                "error:".red().bold()
            )?;
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Executes the `delete` subcommand.
fn cmd_delete<S: BlockingRecordStore>(
    ledger: &ExpenseLedgerBlocking<S>,
    id: &str,
) -> io::Result<ExitCode> {
    let spinner = make_spinner("Deleting expense...");
    let result = ledger.delete(&ExpenseId::from(id));
    spinner.finish_and_clear();

    match result {
        Ok(()) => {
            writeln!(
                io::stdout().lock(),
                "{} expense {id}",
                "Deleted".green().bold()
            )?;
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            writeln!(
                io::stderr().lock(),
                "{} failed to delete expense: {err}",
                "error:".red().bold()
            )?;
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Executes the `summary` subcommand: fetches, then prints aggregates.
fn cmd_summary<S: BlockingRecordStore>(
    ledger: &ExpenseLedgerBlocking<S>,
    args: &FilterArgs,
) -> io::Result<ExitCode> {
    let spinner = make_spinner("Fetching expenses...");
    let result = ledger.fetch(&build_filter(args));
    spinner.finish_and_clear();

    if let Err(err) = result {
        writeln!(
            io::stderr().lock(),
            "{} failed to fetch expenses: {err}",
            "error:".red().bold()
        )?;
        return Ok(ExitCode::FAILURE);
    }

    match ledger.summary() {
        Ok(summary) => {
            print_summary(&summary)?;
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            writeln!(
                io::stderr().lock(),
                "{} failed to compute summary: {err}",
                "error:".red().bold()
            )?;
            Ok(ExitCode::FAILURE)
        }
    }
}

// ── Output formatting ────────────────────────────────────────────────

/// Prints expenses in a table.
fn print_expenses_table(expenses: &[Expense]) -> io::Result<()> {
    let mut out = io::stdout().lock();
    if expenses.is_empty() {
        writeln!(out, "{}", "No expenses found.".dimmed())?;
        return Ok(());
    }

    let mut table = Table::new();
    _ = table.load_preset(UTF8_FULL);
    _ = table.set_header(vec![
        Cell::new("Date").fg(Color::Cyan),
        Cell::new("Category").fg(Color::Cyan),
        Cell::new("Amount").fg(Color::Cyan),
        Cell::new("Description").fg(Color::Cyan),
        Cell::new("Id").fg(Color::Cyan),
    ]);

    for expense in expenses {
        _ = table.add_row(vec![
            Cell::new(expense.date.to_string()),
            Cell::new(expense.category.as_str()),
            Cell::new(format!("{:.2}", expense.amount)).fg(Color::Red),
            Cell::new(&expense.description),
            Cell::new(expense.id.as_inner()).fg(Color::DarkGrey),
        ]);
    }

    writeln!(
        out,
        "{} {}",
        "Expenses".green().bold(),
        format_args!("({})", expenses.len()).dimmed()
    )?;
    writeln!(out)?;
    writeln!(out, "{table}")?;
    Ok(())
}

/// Prints summary aggregates.
fn print_summary(summary: &Summary) -> io::Result<()> {
    let mut out = io::stdout().lock();
    if summary.count == 0 {
        writeln!(out, "{}", "No expenses to summarize.".dimmed())?;
        return Ok(());
    }

    writeln!(
        out,
        "{} total {} across {} expenses{}",
        "Summary".green().bold(),
        format_args!("{:.2}", summary.total).bold(),
        summary.count,
        summary
            .average()
            .map_or_else(String::new, |avg| format!(" (avg {avg:.2})"))
    )?;
    writeln!(out)?;

    let mut table = Table::new();
    _ = table.load_preset(UTF8_FULL);
    _ = table.set_header(vec![
        Cell::new("Category").fg(Color::Cyan),
        Cell::new("Subtotal").fg(Color::Cyan),
    ]);

    for (category, subtotal) in &summary.by_category {
        _ = table.add_row(vec![
            Cell::new(category.as_str()),
            Cell::new(format!("{subtotal:.2}")).fg(Color::Red),
        ]);
    }

    writeln!(out, "{table}")?;
    Ok(())
}

/// Creates a spinner with the given message.
fn make_spinner(message: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(message.to_owned());
    spinner.enable_steady_tick(core::time::Duration::from_millis(80));
    spinner
}

/// Entry point.
fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => {
            // Last-resort error output — if stderr itself failed, nothing
            // we can do.
            let _ignored = writeln!(io::stderr(), "fatal I/O error: {err}");
            ExitCode::FAILURE
        }
    }
}
