//! Tripboard CLI
//!
//! Command-line front end for the dashboard pipeline:
//! - List the options of a filter under the current selection
//! - Load and print the charts
//! - Manage chart order and visibility
//! - Print the default configuration

use anyhow::{bail, Context};
use chrono::Local;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use tripboard::config::{generate_default_config, LoggingConfig};
use tripboard::filters::parse_date;
use tripboard::preferences::order_from_titles;
use tripboard::{
    ChartSeries, Config, Dashboard, DateRange, FilterKey, FilterOption, FilterSelection,
    OptionState, PreferenceStore, ReportingClient,
};

/// Default window when no dates are given
const DEFAULT_RANGE_DAYS: i64 = 7;

#[derive(Parser)]
#[command(name = "tripboard")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Trip performance dashboard for transit operators")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub filters: FilterArgs,

    /// Config file (default: search the usual locations)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Table, global = true)]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
}

/// Filter selection applied before running a command
#[derive(Args)]
pub struct FilterArgs {
    /// Agency id
    #[arg(long, global = true)]
    pub agency: Option<String>,
    /// Cluster id
    #[arg(long, global = true)]
    pub cluster: Option<String>,
    /// Sub-cluster
    #[arg(long, global = true)]
    pub sub_cluster: Option<String>,
    /// City name
    #[arg(long, global = true)]
    pub city: Option<String>,
    /// Line id
    #[arg(long, global = true)]
    pub route: Option<String>,
    /// Line type
    #[arg(long, global = true)]
    pub line_type: Option<String>,
    /// Line group id
    #[arg(long, global = true)]
    pub line_group: Option<String>,
    /// First day (YYYY-MM-DD)
    #[arg(long, global = true)]
    pub start: Option<String>,
    /// Last day (YYYY-MM-DD); defaults to the first day
    #[arg(long, global = true)]
    pub end: Option<String>,
}

impl FilterArgs {
    fn categorical(&self) -> [(FilterKey, Option<&String>); 7] {
        [
            (FilterKey::Agency, self.agency.as_ref()),
            (FilterKey::Cluster, self.cluster.as_ref()),
            (FilterKey::SubCluster, self.sub_cluster.as_ref()),
            (FilterKey::City, self.city.as_ref()),
            (FilterKey::RouteNumber, self.route.as_ref()),
            (FilterKey::LineType, self.line_type.as_ref()),
            (FilterKey::LineGroup, self.line_group.as_ref()),
        ]
    }

    fn date_range(&self) -> anyhow::Result<DateRange> {
        let start = self.start.as_deref().map(parse_date).transpose()?;
        let end = self.end.as_deref().map(parse_date).transpose()?;

        Ok(match (start, end) {
            (Some(start), Some(end)) => DateRange::new(start, end)?,
            (Some(start), None) => DateRange::single_day(start),
            (None, Some(end)) => DateRange::last_days(end, DEFAULT_RANGE_DAYS),
            (None, None) => DateRange::last_days(Local::now().date_naive(), DEFAULT_RANGE_DAYS),
        })
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// List the options of a filter
    Options {
        /// Filter name (agency, cluster, sub-cluster, city, route, line-type, line-group)
        filter: String,
    },

    /// Load the charts and print the visible ones in order
    Charts,

    /// Manage chart order and visibility
    Prefs {
        #[command(subcommand)]
        action: PrefsAction,
    },

    /// Print the default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
pub enum PrefsAction {
    /// Show saved order and hidden charts
    Show,
    /// Save a chart order; titles are ranked by position
    Order { titles: Vec<String> },
    /// Hide a chart
    Hide { title: String },
    /// Show a hidden chart again
    Unhide { title: String },
    /// Forget all chart preferences
    Clear,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_with_env(path)?,
        None => Config::load_default(),
    };
    init_logging(&config.logging);

    match cli.command {
        Commands::Options { ref filter } => {
            let key: FilterKey = filter.parse()?;
            let mut board = open_dashboard(&config, &cli.filters)?;

            board.load_options(key).await;
            if let Some(error) = board.filters().last_error() {
                bail!("Failed to load {} options: {}", key, error);
            }

            let options: &[FilterOption] = match board.filters().options(key) {
                Some(OptionState::Loaded(options)) => options.as_slice(),
                _ => &[],
            };

            match cli.format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(options)?),
                OutputFormat::Table => {
                    if let Some(notice) = board.filters().notice(key) {
                        println!("{}", notice);
                    } else if options.is_empty() {
                        println!("No options for {}.", key);
                    } else {
                        println!("{:<40} {}", "Label", "Value");
                        println!("{}", "-".repeat(60));
                        for option in options {
                            println!("{:<40} {}", option.label, option.value);
                        }
                    }
                }
            }
        }

        Commands::Charts => {
            let mut board = open_dashboard(&config, &cli.filters)?;
            board.refresh_charts().await;

            if let Some(error) = board.load_error() {
                bail!("{}", error);
            }

            let charts = board.visible_charts();
            match cli.format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&charts)?),
                OutputFormat::Table => {
                    if charts.is_empty() {
                        println!("No chart data for the selected filters.");
                    }
                    for chart in charts {
                        print_chart(chart);
                    }
                }
            }
        }

        Commands::Prefs { action } => {
            let mut prefs = PreferenceStore::open(&config.preferences.dir);
            match action {
                PrefsAction::Show => print_preferences(&prefs, cli.format)?,
                PrefsAction::Order { titles } => {
                    let count = titles.len();
                    prefs.set_order(order_from_titles(titles))?;
                    println!("Saved order of {} charts.", count);
                }
                PrefsAction::Hide { title } => {
                    let mut hidden = prefs.hidden().clone();
                    hidden.insert(title.clone());
                    prefs.set_hidden(hidden)?;
                    println!("Hidden: {}", title);
                }
                PrefsAction::Unhide { title } => {
                    let mut hidden = prefs.hidden().clone();
                    if !hidden.remove(&title) {
                        println!("Not hidden: {}", title);
                        return Ok(());
                    }
                    prefs.set_hidden(hidden)?;
                    println!("Visible: {}", title);
                }
                PrefsAction::Clear => {
                    prefs.clear()?;
                    println!("Chart preferences cleared.");
                }
            }
        }

        Commands::Config { output } => {
            let content = generate_default_config();
            match output {
                Some(path) => {
                    std::fs::write(&path, content)
                        .with_context(|| format!("Failed to write {:?}", path))?;
                    println!("Config written to {:?}", path);
                }
                None => print!("{}", content),
            }
        }
    }

    Ok(())
}

/// Logs go to stderr so command output stays machine-readable
fn init_logging(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("tripboard={}", config.level)));
    let registry = tracing_subscriber::registry().with(filter);

    if config.format == "json" {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn open_dashboard(config: &Config, args: &FilterArgs) -> anyhow::Result<Dashboard> {
    let client = ReportingClient::new(config.api.clone())
        .context("Failed to create reporting client")?;
    let selection = FilterSelection::new(args.date_range()?);

    let mut board = Dashboard::new(
        Arc::new(client),
        selection,
        PreferenceStore::open(&config.preferences.dir),
    )
    .with_dataset_timeout(Duration::from_secs(config.api.dataset_timeout_secs));

    // Hierarchy order, so a parent never clears a child set after it
    for (key, value) in args.categorical() {
        if let Some(value) = value {
            board.change_filter(key, value)?;
        }
    }

    Ok(board)
}

fn format_value(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{:.0}", value)
    } else {
        format!("{:.2}", value)
    }
}

fn print_chart(chart: &ChartSeries) {
    println!("{}", chart.title);
    println!("{}", "-".repeat(60));
    println!("{}", chart.table.header.join(" | "));
    for row in &chart.table.rows {
        let cells: Vec<String> = row.values.iter().map(|v| format_value(*v)).collect();
        println!("{} | {}", row.label, cells.join(" | "));
    }
    println!();
}

fn print_preferences(prefs: &PreferenceStore, format: OutputFormat) -> anyhow::Result<()> {
    let mut ranked: Vec<(&String, &usize)> = prefs.order().iter().collect();
    ranked.sort_by(|a, b| a.1.cmp(b.1).then_with(|| a.0.cmp(b.0)));

    match format {
        OutputFormat::Json => {
            let value = serde_json::json!({
                "order": prefs.order(),
                "hidden": prefs.hidden(),
            });
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
        OutputFormat::Table => {
            if ranked.is_empty() {
                println!("No saved chart order.");
            } else {
                println!("{:<6} {}", "Rank", "Chart");
                println!("{}", "-".repeat(40));
                for (title, rank) in ranked {
                    println!("{:<6} {}", rank, title);
                }
            }
            println!();
            if prefs.hidden().is_empty() {
                println!("No hidden charts.");
            } else {
                println!("Hidden:");
                for title in prefs.hidden() {
                    println!("  {}", title);
                }
            }
        }
    }

    Ok(())
}
