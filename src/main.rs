mod cli;
mod config;
mod downloader;
mod errors;
mod prompt;
mod publish;
mod settings;
mod utils;

use cli::Cli;
use errors::{EvRemixesError, Result};
use settings::Settings;
use utils::logger::Logger;

#[tokio::main]
async fn main() {
    // Parse command line arguments
    let cli = Cli::parse();

    if let Err(e) = Logger::init_with_verbosity(cli.verbose) {
        eprintln!("Failed to initialize logging: {}", e);
    }

    let result = run(cli).await;
    match &result {
        Ok(()) => {}
        Err(EvRemixesError::Cancelled) => println!("\nAborted."),
        Err(e) => {
            tracing::debug!("Fatal: {:?}", e);
            eprintln!("Error: {}", e);
        }
    }

    // exit directly: a pending stdin read would otherwise hold up runtime shutdown
    std::process::exit(exit_code(&result));
}

/// Failed tracks don't fail the run; only errors that end it early do
fn exit_code(result: &Result<()>) -> i32 {
    match result {
        Ok(()) => 0,
        Err(e) => e.exit_code(),
    }
}

async fn run(cli: Cli) -> Result<()> {
    let settings = Settings::load(cli.config.as_deref())?;
    if let Ok(path) = settings.config_path() {
        Logger::log_config_loaded(&path.display().to_string());
    }

    // Dropping the command future on Ctrl-C removes its work directory
    tokio::select! {
        result = cli.execute(settings) => result,
        _ = tokio::signal::ctrl_c() => Err(EvRemixesError::Cancelled),
    }
}
