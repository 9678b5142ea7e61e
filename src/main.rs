use std::io::{self, Write};

use clap::{CommandFactory, Parser};

use user_upload::cli::Cli;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    user_upload::init_logger();

    // No arguments at all: show usage instead of complaining about credentials.
    if std::env::args_os().len() <= 1 {
        Cli::command().print_help()?;
        return Ok(());
    }

    let config = match Cli::parse().into_config() {
        Ok(config) => config,
        Err(err) => {
            writeln!(io::stderr(), "error: {err}")?;
            std::process::exit(1);
        }
    };

    let stdin = io::stdin();
    if let Err(err) = user_upload::run(&config, stdin.lock(), io::stdout()).await {
        log::error!("{}", err);
        std::process::exit(1);
    }

    Ok(())
}
