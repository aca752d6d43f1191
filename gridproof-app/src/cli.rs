use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use gridproof_common::BrowserKind;

/// Drive the Sudoku app through the new-puzzle journey and capture the board.
#[derive(Parser, Debug)]
#[command(name = "gridproof")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Configuration file [default: ./gridproof.yaml when present]
    #[arg(short, long, global = true, env = "GRIDPROOF_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory for rolling log files
    #[arg(long, global = true)]
    pub log_dir: Option<PathBuf>,

    /// Debug logging, mirrored to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the verification flow against a live browser
    Run(RunArgs),
    /// Print the resolved step plan without opening a browser
    Plan(PlanArgs),
}

#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// Entry document of the app under test, path or URL [default: index.html]
    pub target: Option<String>,

    /// Screenshot destination
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// WebDriver endpoint (chromedriver, geckodriver)
    #[arg(long, env = "WEBDRIVER_URL")]
    pub webdriver_url: Option<String>,

    /// Browser behind the endpoint
    #[arg(long)]
    pub browser: Option<BrowserKind>,

    /// Run the browser without a window
    #[arg(long, conflicts_with = "headed")]
    pub headless: bool,

    /// Run the browser with a visible window
    #[arg(long)]
    pub headed: bool,

    /// Bound for finding each control
    #[arg(long, value_name = "MS")]
    pub element_timeout_ms: Option<u64>,

    /// Bound for the board to populate
    #[arg(long, value_name = "MS")]
    pub condition_timeout_ms: Option<u64>,

    /// Report format written to stdout
    #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
    pub report: ReportFormat,
}

#[derive(Args, Debug)]
pub struct PlanArgs {
    #[arg(long, value_enum, default_value_t = PlanFormat::Yaml)]
    pub format: PlanFormat,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum PlanFormat {
    #[default]
    Yaml,
    Json,
}
