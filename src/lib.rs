pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use config::{cli::LocalStorage, CliConfig, TomlConfig, ToolConfig};
pub use core::aggregator::ResultAggregator;
pub use core::engine::{BatchEngine, BatchSummary};
pub use core::scheduler::{BatchOutcome, Scheduler};
pub use domain::model::{AggregateKey, Job, JobState, Mode, ModeFamily, ResultRecord};
pub use utils::error::{BatchError, Result};
