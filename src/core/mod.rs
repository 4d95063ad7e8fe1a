pub mod aggregator;
pub mod batch;
pub mod command;
pub mod engine;
pub mod report;
pub mod report_parser;
pub mod scheduler;

pub use crate::domain::model::{Job, ResultRecord};
pub use crate::domain::ports::{ConfigProvider, Storage};
pub use crate::utils::error::Result;
