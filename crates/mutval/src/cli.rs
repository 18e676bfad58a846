//! Command-line interface for the mutator validator.

use clap::{Parser, ValueEnum};
use mutval_core::LogFormat;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "mutator-validator")]
#[command(about = "Applies every mutation of a mutator group and checks the module still compiles", long_about = None)]
pub struct Cli {
    /// Mutator group (or single mutator id) to apply
    pub group: String,

    /// Serialized IR module (`.json` or bincode)
    pub module: PathBuf,

    /// JSON configuration file
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Write the lowered WebAssembly of the mutated module
    #[arg(long, value_name = "FILE")]
    pub emit_wasm: Option<PathBuf>,

    /// Overrides the configured log format
    #[arg(long, value_enum)]
    pub log_format: Option<LogFormatArg>,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Text,
    Json,
}

impl From<LogFormatArg> for LogFormat {
    fn from(arg: LogFormatArg) -> Self {
        match arg {
            LogFormatArg::Text => LogFormat::Text,
            LogFormatArg::Json => LogFormat::Json,
        }
    }
}
