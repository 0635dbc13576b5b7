pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "apex",
    about = "Apex Health AI services operator CLI",
    long_about = "Inspect configuration, check model readiness, and exercise agent routing and chat turns in-process.",
    after_help = "Examples:\n  apex doctor --json\n  apex config\n  apex route \"why was my claim denied?\"\n  apex chat \"is 99213 right for this visit?\" --agent coding"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config and model credential readiness")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Show which agent a message would be routed to")]
    Route {
        #[arg(help = "Message text to classify")]
        message: String,
    },
    #[command(about = "Run a single chat turn in-process and print the turn result")]
    Chat {
        #[arg(help = "Message text to send")]
        message: String,
        #[arg(long, default_value = "cli-user", help = "User id used to derive the conversation key")]
        user_id: String,
        #[arg(long, help = "Force a specific agent instead of routing")]
        agent: Option<String>,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Config => commands::config::run(),
        Command::Doctor { json } => commands::doctor::run(json),
        Command::Route { message } => commands::route::run(&message),
        Command::Chat { message, user_id, agent } => {
            commands::chat::run(commands::chat::ChatArgs { message, user_id, agent })
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
