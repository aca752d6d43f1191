use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};
use gridproof_common::observability::{LogConfig, init_logging};
use gridproof_config::{DEFAULT_CONFIG_FILE, GridproofConfig, GridproofConfigLoader};
use gridproof_drivers::{SessionOptions, WebDriverSession};
use gridproof_flow::{DocumentRef, FlowFailure, FlowPlan, FlowSettings, RunReport, VerificationFlow};
use tracing::{error, info};

use crate::cli::{Cli, PlanArgs, PlanFormat, ReportFormat, RunArgs};

/// Entry document used when neither the CLI nor the config names one.
pub const DEFAULT_TARGET: &str = "index.html";

const EXIT_FLOW_FAILED: u8 = 1;
const EXIT_SETUP_FAILED: u8 = 2;

/// User defaults, then the project file (required only when named explicitly).
pub fn load_config(path: Option<&Path>) -> Result<GridproofConfig> {
    let loader = GridproofConfigLoader::new().with_user_defaults();
    let loader = match path {
        Some(p) => loader.with_file(p),
        None => loader.with_optional_file(DEFAULT_CONFIG_FILE),
    };
    loader.load().context("loading configuration")
}

/// Fold command-line flags over the loaded configuration.
pub fn apply_overrides(cfg: &mut GridproofConfig, args: &RunArgs) -> Result<()> {
    if let Some(target) = &args.target {
        cfg.target = Some(target.clone());
    }
    if let Some(output) = &args.output {
        cfg.output = output.clone();
    }
    if let Some(url) = &args.webdriver_url {
        cfg.webdriver.url = url.clone();
    }
    if let Some(browser) = args.browser {
        cfg.webdriver.browser = browser;
    }
    if args.headless {
        cfg.webdriver.headless = true;
    }
    if args.headed {
        cfg.webdriver.headless = false;
    }
    if let Some(ms) = args.element_timeout_ms {
        cfg.timeouts.element_ms = ms;
    }
    if let Some(ms) = args.condition_timeout_ms {
        cfg.timeouts.condition_ms = ms;
    }
    cfg.validate()?;
    Ok(())
}

pub fn session_options(cfg: &GridproofConfig) -> SessionOptions {
    SessionOptions {
        browser: cfg.webdriver.browser,
        headless: cfg.webdriver.headless,
        window: (cfg.webdriver.window.width, cfg.webdriver.window.height),
        extra_args: cfg.webdriver.args.clone(),
    }
}

fn log_config(cfg: &GridproofConfig, cli: &Cli) -> LogConfig {
    let mut log = cfg.logging.to_log_config();
    if let Some(dir) = &cli.log_dir {
        log.log_dir = Some(dir.clone());
    }
    if cli.verbose {
        log.emit_stderr = true;
        log.default_filter = "debug".to_string();
    }
    log
}

enum Outcome {
    Passed(RunReport),
    Failed(FlowFailure),
}

/// `gridproof run`.
pub async fn run(cli: &Cli, args: &RunArgs) -> ExitCode {
    match execute(cli, args).await {
        Ok(Outcome::Passed(report)) => {
            print_report(&report, args.report);
            ExitCode::SUCCESS
        }
        Ok(Outcome::Failed(failure)) => {
            print_report(&failure.report, args.report);
            eprintln!(
                "verification failed at step {:?} ({}): {}",
                failure.step,
                failure.kind(),
                failure.source
            );
            ExitCode::from(EXIT_FLOW_FAILED)
        }
        Err(e) => {
            let message = format!("{e:#}");
            error!(target: "gridproof.flow", error = %message, "run aborted before the flow started");
            eprintln!("error: {message}");
            ExitCode::from(EXIT_SETUP_FAILED)
        }
    }
}

async fn execute(cli: &Cli, args: &RunArgs) -> Result<Outcome> {
    let mut cfg = load_config(cli.config.as_deref())?;
    apply_overrides(&mut cfg, args)?;

    let log_file = init_logging(log_config(&cfg, cli))?;
    info!(target: "gridproof.flow", log_file = %log_file.display(), "logging initialised");

    let plan = FlowPlan::from_config(&cfg.flow)?;
    let flow = VerificationFlow::new(plan, FlowSettings::from_config(&cfg))?;
    let target = cfg.target.as_deref().unwrap_or(DEFAULT_TARGET);
    let document = DocumentRef::parse(target)?;

    let session = WebDriverSession::connect(&cfg.webdriver.url, session_options(&cfg)).await?;
    Ok(match flow.run_and_close(&session, &document).await {
        Ok(report) => Outcome::Passed(report),
        Err(failure) => Outcome::Failed(failure),
    })
}

fn print_report(report: &RunReport, format: ReportFormat) {
    match format {
        ReportFormat::Text => print!("{}", report.render_text()),
        ReportFormat::Json => match report.to_json() {
            Ok(json) => println!("{json}"),
            Err(e) => eprintln!("could not encode report: {e}"),
        },
    }
}

/// `gridproof plan`.
pub fn print_plan(cli: &Cli, args: &PlanArgs) -> Result<()> {
    let cfg = load_config(cli.config.as_deref())?;
    let plan = FlowPlan::from_config(&cfg.flow)?;
    let rendered = match args.format {
        PlanFormat::Yaml => serde_yaml::to_string(&plan)?,
        PlanFormat::Json => serde_json::to_string_pretty(&plan)?,
    };
    println!("{rendered}");
    Ok(())
}
