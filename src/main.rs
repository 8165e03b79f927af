use std::process::ExitCode;

use clap::Parser;
use onelogin_aws::cli::Cli;
use tracing::{Level, subscriber};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.verbose) {
        eprintln!("Failed to initialize logging: {e}");
        return ExitCode::FAILURE;
    }

    if let Err(e) = cli.execute().await {
        eprintln!("Error: {e:#}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

fn verbosity_level(verbose: u8) -> Level {
    match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Logs go to stderr so they never mix with prompts or the summary on stdout.
fn init_logging(verbose: u8) -> anyhow::Result<()> {
    // RUST_LOG wins over -v
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(verbosity_level(verbose).to_string()));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(verbose >= 2)
        .with_file(verbose >= 3)
        .with_line_number(verbose >= 3)
        .compact()
        .finish();

    subscriber::set_global_default(subscriber)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_level() {
        assert_eq!(verbosity_level(0), Level::WARN);
        assert_eq!(verbosity_level(1), Level::INFO);
        assert_eq!(verbosity_level(2), Level::DEBUG);
        assert_eq!(verbosity_level(7), Level::TRACE);
    }
}
