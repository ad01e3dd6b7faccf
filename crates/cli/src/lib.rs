pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "patron",
    about = "Patron customer directory operator CLI",
    long_about = "Apply storage migrations, load sample customers, inspect configuration, and issue tokens.",
    after_help = "Examples:\n  patron doctor --json\n  patron seed\n  patron token --verify 123.456.789-01"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations for the configured backend")]
    Migrate,
    #[command(about = "Insert the sample customers that are not stored yet")]
    Seed,
    #[command(about = "Inspect effective configuration values with source attribution and redaction")]
    Config,
    #[command(about = "Validate config and storage connectivity")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Issue a bearer token for the customer holding the given CPF")]
    Token {
        #[arg(
            default_value = "",
            help = "CPF exactly as stored on the customer record; blank selects the anonymous customer"
        )]
        cpf: String,
        #[arg(long, help = "Decode the issued token with the configured key before printing")]
        verify: bool,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Seed => commands::seed::run(),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => commands::doctor::run(json),
        Command::Token { cpf, verify } => commands::token::run(&cpf, verify),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
