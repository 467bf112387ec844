//! printer-configurator command-line entry point

use clap::Parser;
use printer_configurator::{
    cli::{report_error, run_cli, ConfiguratorCli},
    config::ConfiguratorSettings,
    logging::{init_logging, LogConfig, LogLevel},
    Configurator,
};
use tracing::{debug, info, instrument};

#[tokio::main]
async fn main() {
    let cli = ConfiguratorCli::parse();

    let mut log_config = LogConfig::from_env();
    if cli.verbose {
        log_config.level = LogLevel::Debug;
    }
    if let Err(e) = init_logging(&log_config) {
        eprintln!("Failed to initialize logging: {}", e);
    }

    let code = run(cli).await;
    std::process::exit(code);
}

#[instrument(skip_all)]
async fn run(cli: ConfiguratorCli) -> i32 {
    info!("printer-configurator v{}", env!("CARGO_PKG_VERSION"));

    let configurator = match ConfiguratorSettings::load(cli.settings.as_deref())
        .and_then(Configurator::new)
    {
        Ok(configurator) => configurator,
        Err(e) => {
            report_error(&anyhow::Error::from(e), cli.json);
            return 1;
        }
    };
    debug!(
        "Using catalog {} and config directory {}",
        configurator.settings().configuration_path.display(),
        configurator.settings().klipper_config_path.display()
    );

    run_cli(cli, configurator).await
}
