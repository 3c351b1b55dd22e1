pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "danswer",
    about = "DanswerBot operator CLI",
    long_about = "Apply migrations, check runtime readiness, and try the answer validity check.",
    after_help = "Examples:\n  danswer doctor --json\n  danswer migrate\n  \
                  danswer validate-answer --query \"Who owns billing?\" --answer \"Payments\""
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Validate config, Slack tokens, LLM settings and DB connectivity")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Ask the configured LLM whether an answer really answers a query")]
    ValidateAnswer {
        #[arg(long)]
        query: String,
        #[arg(long)]
        answer: String,
        #[arg(long, help = "Use the configured fast model")]
        fast: bool,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Doctor { json } => commands::doctor::run(json),
        Command::ValidateAnswer { query, answer, fast } => {
            commands::validate_answer::run(&query, &answer, fast)
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
