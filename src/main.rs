mod capture;
mod config;
mod connection;
mod decode;
mod error;
mod log_entry;
mod log_sink;
mod shutdown;
mod timestamp;

use clap::Parser;
use log::{info, LevelFilter};
use simple_logger::SimpleLogger;
use std::io;
use std::process::ExitCode;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Parse command-line arguments
    let cli = config::Cli::parse();

    let level = if cli.verbose { LevelFilter::Debug } else { LevelFilter::Warn };
    if let Err(e) = SimpleLogger::new().with_level(level).env().init() {
        log_sink::announce(&mut io::stderr(), &format!("Failed to initialize logging: {}", e));
    }

    info!("Starting serial-logtap");

    // Load configuration
    let config = match config::load_config(&cli) {
        Ok(config) => config,
        Err(e) => return fail(config::into_capture_error(e)),
    };
    info!("Configuration loaded: {:?}", config);

    let cancellation = shutdown::Cancellation::new();
    cancellation.listen_for_signals();

    match capture::run(&config, &cancellation).await {
        Ok(summary) => {
            log_sink::announce(
                &mut io::stdout(),
                &format!(
                    "\nLog capture stopped by user ({} entries saved to {}).",
                    summary.entries,
                    config.log_file.display()
                ),
            );
            ExitCode::SUCCESS
        }
        Err(e) => fail(e),
    }
}

fn fail(err: error::CaptureError) -> ExitCode {
    log_sink::announce(&mut io::stderr(), &format!("Error: {}", err));
    ExitCode::from(err.exit_code())
}
