use std::process::ExitCode;

use clap::Parser;
use cli::{Cli, Command};
mod cli;
mod runner;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match &cli.command {
        Command::Run(args) => runner::run(&cli, args).await,
        Command::Plan(args) => match runner::print_plan(&cli, args) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("error: {e:#}");
                ExitCode::from(2)
            }
        },
    }
}
