use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand, builder::styling};
use etl_node::{PipelineConfig, RunContext, cli};
use eyre::Result;
use owo_colors::OwoColorize;
use std::path::Path;

// CLI Styling
const STYLES: styling::Styles = styling::Styles::styled()
    .header(styling::AnsiColor::BrightWhite.on_default())
    .usage(styling::AnsiColor::BrightWhite.on_default())
    .literal(styling::AnsiColor::Green.on_default())
    .placeholder(styling::AnsiColor::Cyan.on_default());

/// ETL Node: stage a daily batch in object storage, load it into the warehouse, and aggregate it into the mart
#[derive(Parser)]
#[command(name = "etl-node", version, styles = STYLES)]
struct Cli {
    /// The dotenv file to source credentials from
    #[arg(short, long, global = true, default_value = ".env")]
    env: String,

    /// The pipeline configuration file
    #[arg(short, long, global = true, default_value = "pipeline.yml")]
    config: String,

    /// More verbose logging
    #[arg(long, global = true)]
    debug: bool,

    /// Command to execute
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default pipeline.yml and create the warehouse tables
    Init {
        /// Project directory
        #[arg(default_value = ".")]
        dir: String,
    },

    /// Run the pipeline once
    Run {
        /// Logical date to process (YYYY-MM-DD), defaults to today (UTC)
        #[arg(short, long)]
        date: Option<NaiveDate>,
    },

    /// Run the pipeline every day at 00:00 UTC for the day that just ended
    Schedule,

    /// Show the latest aggregates from the mart
    Report {
        /// Number of rows to show
        #[arg(short, long, default_value_t = 10)]
        limit: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();
    if Path::new(&args.env).exists() {
        dotenvy::from_filename(&args.env)?;
    }

    let log_level = match args.debug {
        true => "debug",
        false => "info",
    };
    let env = env_logger::Env::default().filter_or("LOG_LEVEL", log_level);
    env_logger::Builder::from_env(env)
        .format_timestamp_millis()
        .init();

    match args.command {
        Commands::Init { dir } => {
            log::info!("Initializing pipeline project in {}", dir.bright_black());
            cli::init_project(&dir).await?;
        }
        Commands::Run { date } => {
            let config = PipelineConfig::load(&args.config)?;
            let logical_date = date.unwrap_or_else(|| Utc::now().date_naive());
            log::info!(
                "Running pipeline for {} using {}",
                logical_date.cyan(),
                args.config.bright_black()
            );
            cli::run_once(&config, &RunContext::manual(logical_date)).await?;
        }
        Commands::Schedule => {
            let config = PipelineConfig::load(&args.config)?;
            cli::run_scheduled(&config).await?;
        }
        Commands::Report { limit } => {
            let config = PipelineConfig::load(&args.config)?;
            cli::report(&config, limit).await?;
        }
    }

    Ok(())
}
