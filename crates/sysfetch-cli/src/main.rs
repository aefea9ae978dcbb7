use clap::Parser;
use sysfetch_core::logging;

mod cli;

use crate::cli::Cli;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize logging as early as possible.
    let to_file = cli.log_file;
    if to_file {
        if let Err(e) = logging::init_logging() {
            logging::init_logging_stderr();
            tracing::warn!("file logging unavailable ({:#}); logging to stderr", e);
        }
    } else {
        logging::init_logging_stderr();
    }

    if let Err(err) = cli.run().await {
        tracing::error!("{:#}", err);
        if to_file {
            eprintln!("sysfetch error: {:#}", err);
        }
        std::process::exit(1);
    }
}
