mod app;

use chrono::NaiveDate;
use clap::builder::BoolishValueParser;
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use color_eyre::Result;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "stockdash")]
#[command(about = "Inventory dashboard data from the command line")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/stockdash/config.yaml)
  #[arg(short, long, global = true)]
  config: Option<PathBuf>,

  /// Directory for log files (default: platform data dir)
  #[arg(long, global = true)]
  log_dir: Option<PathBuf>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
  /// List products, optionally filtered by name
  Products {
    #[arg(short, long)]
    search: Option<String>,
  },
  /// Create a product and show the refreshed list
  CreateProduct {
    #[arg(long)]
    name: String,
    #[arg(long)]
    price: f64,
    #[arg(long)]
    rating: Option<f64>,
  },
  /// Grouped counts for one of the chart pages
  Chart {
    #[arg(value_enum)]
    kind: ChartKind,
    /// Show only this status/method/type
    #[arg(long)]
    only: Option<String>,
    /// First day to include (YYYY-MM-DD); needs --end
    #[arg(long, requires = "end")]
    start: Option<NaiveDate>,
    /// Last day to include (YYYY-MM-DD); needs --start
    #[arg(long, requires = "start")]
    end: Option<NaiveDate>,
  },
  /// Sales totals per period
  Sales {
    #[arg(long, default_value = "weekly")]
    group_by: String,
  },
  /// Expense breakdown by category
  Expenses,
  /// Headline figures, fetched concurrently
  Dashboard,
  /// List notifications, or mark one read
  Notifications {
    #[arg(long)]
    read: Option<u64>,
  },
  /// Show or change persisted preferences
  Prefs {
    #[command(subcommand)]
    action: PrefsAction,
  },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum ChartKind {
  Orders,
  Payments,
  Transactions,
}

#[derive(Subcommand, Debug)]
pub enum PrefsAction {
  Show,
  /// KEY is one of sidebar-collapsed, dark-mode, notifications
  Set {
    key: String,
    #[arg(action = ArgAction::Set, value_parser = BoolishValueParser::new())]
    value: bool,
  },
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  let log_dir = args
    .log_dir
    .clone()
    .unwrap_or_else(stockdash::logging::default_log_dir);
  stockdash::logging::init(&log_dir);

  // Load configuration
  let config = stockdash::config::Config::load(args.config.as_deref())?;

  // Initialize and run the app
  let app = app::App::new(config).await?;
  app.run(args.command).await?;

  Ok(())
}
