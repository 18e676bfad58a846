//! Mutator validator entry point.

mod cli;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use cli::Cli;
use mutval::telemetry::init_telemetry;
use mutval::Pipeline;
use mutval_core::ValidatorConfig;
use std::process::ExitCode;
use tracing::info;

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("mutator-validator: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut config = match &cli.config {
        Some(path) => ValidatorConfig::from_file(path)
            .with_context(|| format!("usage: cannot read config {}", path.display()))?,
        None => ValidatorConfig::default(),
    };
    if let Some(format) = cli.log_format {
        config.logging.format = format.into();
    }
    init_telemetry(&config.logging)?;

    info!(group = %cli.group, module = %cli.module.display(), "Validating mutator group");
    let pipeline = Pipeline::new(config)
        .map_err(|e| anyhow!("{}: {}", e.stage(), e))?
        .with_emit_wasm(cli.emit_wasm);

    let stdout = std::io::stdout();
    let report = pipeline
        .run(&cli.group, &cli.module, &mut stdout.lock())
        .map_err(|e| anyhow!("{} stage failed: {}", e.stage(), e))?;

    info!(
        mutants = report.mutants,
        modules = report.modules_compiled,
        "All mutants applied, verified and compiled"
    );
    Ok(())
}
