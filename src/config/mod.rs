pub mod cli;
pub mod toml_config;

use crate::domain::model::OutputFormat;
use crate::domain::ports::ConfigProvider;
use crate::utils::error::Result;
use crate::utils::validation::{
    validate_path, validate_positive_number, validate_required_field, Validate,
};
#[cfg(feature = "cli")]
use clap::Parser;
use serde::{Deserialize, Serialize};

pub use toml_config::{TomlConfig, ToolConfig};

pub const DEFAULT_OUTPUT_PATH: &str = "imutant_results.tsv";
pub const DEFAULT_PROCESSES: usize = 1;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(Parser))]
#[cfg_attr(feature = "cli", command(name = "mutant-batch"))]
#[cfg_attr(
    feature = "cli",
    command(about = "Submit multiple mutations to I-Mutant 2.0 and merge the reports")
)]
pub struct CliConfig {
    /// Batch input file, one `|`-separated job per line
    #[cfg_attr(feature = "cli", arg(long))]
    pub input: Option<String>,

    /// Output file for the merged result table
    #[cfg_attr(feature = "cli", arg(long))]
    pub output: Option<String>,

    /// Number of I-Mutant processes to run in parallel
    #[cfg_attr(feature = "cli", arg(long))]
    pub processes: Option<usize>,

    /// Output format of the merged table
    #[cfg_attr(feature = "cli", arg(long, value_enum))]
    pub format: Option<OutputFormat>,

    /// TOML file with [batch] and [tool] settings
    #[cfg_attr(feature = "cli", arg(short, long))]
    pub config: Option<String>,

    /// Enable verbose output
    #[cfg_attr(feature = "cli", arg(short, long))]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[cfg_attr(feature = "cli", arg(long))]
    pub log_json: bool,
}

impl ConfigProvider for CliConfig {
    fn input_path(&self) -> &str {
        self.input.as_deref().unwrap_or("")
    }

    fn output_path(&self) -> &str {
        self.output.as_deref().unwrap_or(DEFAULT_OUTPUT_PATH)
    }

    fn processes(&self) -> usize {
        self.processes.unwrap_or(DEFAULT_PROCESSES)
    }

    fn output_format(&self) -> OutputFormat {
        self.format.unwrap_or_default()
    }
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        let input = validate_required_field("input", &self.input)?;
        validate_path("input", input)?;
        validate_path("output", self.output_path())?;
        validate_positive_number("processes", self.processes(), 1)?;
        Ok(())
    }
}

/// 驗證任何 ConfigProvider 的批次設定
pub fn validate_batch_settings<C: ConfigProvider>(config: &C) -> Result<()> {
    validate_path("batch.input", config.input_path())?;
    validate_path("batch.output", config.output_path())?;
    validate_positive_number("batch.processes", config.processes(), 1)
}
