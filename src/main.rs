//! printguard - pre-commit guard against debug print statements.

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use printguard::cli::check::Guard;
use printguard::cli::prompt::TerminalPrompt;
use printguard::cli::{self, Cli, Commands};
use printguard::config::ConfigStore;
use printguard::git::GitWorkspace;
use printguard::scanner::Scanner;
use printguard::Error;

#[tokio::main]
async fn main() -> ExitCode {
    // Logs go to stderr so a clean commit prints nothing on stdout
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("printguard=warn"));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let args = Cli::parse();

    match run(args).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(1)
        }
    }
}

async fn run(args: Cli) -> Result<u8, Error> {
    let cwd = std::env::current_dir()?;
    let workspace = GitWorkspace::new(&cwd);
    let store = ConfigStore::new(&cwd);
    let binary = std::env::current_exe()?;
    let mut prompt = TerminalPrompt;

    match args.command.unwrap_or(Commands::Check) {
        Commands::Check => {
            let scanner = Scanner::new(args.strict_scan);
            let decision = Guard::new(&workspace, &store, &mut prompt, scanner, &binary)
                .run()
                .await?;
            Ok(decision.exit_code())
        }
        Commands::Init => {
            cli::setup::run(&workspace, &store, &mut prompt, &binary).await?;
            Ok(0)
        }
        Commands::Install => {
            cli::setup::install_command(&workspace, &binary).await?;
            Ok(0)
        }
        Commands::Config { key, value } => {
            cli::config::run(&store, key.as_deref(), value.as_deref())?;
            Ok(0)
        }
    }
}
