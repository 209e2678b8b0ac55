use clap::Parser;

use spitrig_core::app;
use spitrig_core::cli::Cli;
use spitrig_core::telemetry;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let _log_guard = match telemetry::logging::init(&cli.logging.to_config()) {
        Ok(guard) => guard,
        Err(err) => {
            eprintln!("failed to initialize logging: {err}");
            std::process::exit(1);
        }
    };

    let config = cli.to_config();
    if let Err(err) = app::run(config).await {
        eprintln!("{err}");
        std::process::exit(1);
    }
}
