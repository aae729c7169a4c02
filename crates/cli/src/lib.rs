pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

use commands::customers::CustomerAction;

#[derive(Debug, Parser)]
#[command(
    name = "memberdesk",
    about = "Memberdesk operator CLI",
    long_about = "Apply migrations, inspect configuration and readiness, and manage customer records through the HTTP API.",
    after_help = "Examples:\n  memberdesk doctor --json\n  memberdesk customers list\n  memberdesk customers create --name Ada --date-of-birth 1990-01-01 --member-number 42 --interests math"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(
        about = "Inspect effective configuration values with source attribution"
    )]
    Config,
    #[command(about = "Validate config, database connectivity, and customer schema presence")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Call the customer API and print its response envelope")]
    Customers {
        #[command(subcommand)]
        action: CustomerAction,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => commands::doctor::run(json),
        Command::Customers { action } => commands::customers::run(action),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
