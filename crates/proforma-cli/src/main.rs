mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;

use commands::project::ProjectArgs;
use commands::sensitivity::SensitivityArgs;
use commands::share_price::SharePriceArgs;

/// Financial statement projection and DCF valuation
#[derive(Parser)]
#[command(
    name = "proforma",
    version,
    about = "Financial statement projection and DCF valuation",
    long_about = "Projects income statements and balance sheets from a base year and \
                  yearly assumptions, derives free cash flow to the firm, and values the \
                  company by DCF with decimal precision. Supports one- and two-variable \
                  sensitivity sweeps over the full projection."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// Project the statements and value the company
    Project(ProjectArgs),
    /// Sweep one or two assumptions and re-value at each point
    Sensitivity(SensitivityArgs),
    /// Bridge an enterprise value to a per-share equity value
    SharePrice(SharePriceArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Project(args) => commands::project::run_project(args),
        Commands::Sensitivity(args) => commands::sensitivity::run_sensitivity(args),
        Commands::SharePrice(args) => commands::share_price::run_share_price(args),
        Commands::Version => {
            println!("proforma {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            log::debug!("command failed: {e:?}");
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
