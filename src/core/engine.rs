use crate::config::ToolConfig;
use crate::core::batch::load_batch;
use crate::core::report;
use crate::core::scheduler::{BatchOutcome, Scheduler};
use crate::domain::model::JobState;
use crate::domain::ports::{ConfigProvider, Storage};
use crate::utils::error::Result;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

/// 一次批次的摘要
#[derive(Debug)]
pub struct BatchSummary {
    pub run_id: String,
    pub output_path: String,
    pub lines_rejected: usize,
    pub outcome: BatchOutcome,
    pub elapsed: Duration,
}

impl BatchSummary {
    pub fn jobs_loaded(&self) -> usize {
        self.outcome.jobs.len()
    }

    pub fn cancelled(&self) -> bool {
        self.outcome.cancelled
    }
}

/// 讀取批次檔 → 排程執行 → 寫出合併結果
pub struct BatchEngine<S: Storage, C: ConfigProvider> {
    storage: S,
    config: C,
    tool: ToolConfig,
    cancel: CancellationToken,
}

impl<S: Storage, C: ConfigProvider> BatchEngine<S, C> {
    pub fn new(storage: S, config: C, tool: ToolConfig) -> Self {
        Self {
            storage,
            config,
            tool,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub async fn run(&self) -> Result<BatchSummary> {
        let run_id = format!("batch_{}", chrono::Utc::now().format("%Y%m%d_%H%M%S"));
        let span = tracing::info_span!("batch", run_id = %run_id);
        self.execute(run_id).instrument(span).await
    }

    async fn execute(&self, run_id: String) -> Result<BatchSummary> {
        let started = Instant::now();

        // 載入批次
        tracing::info!("📁 Loading batch from: {}", self.config.input_path());
        let raw = self.storage.read_file(self.config.input_path()).await?;
        let batch = load_batch(&String::from_utf8_lossy(&raw));
        tracing::info!(
            "Loaded {} jobs ({} lines skipped)",
            batch.jobs.len(),
            batch.rejected.len()
        );

        if batch.jobs.is_empty() {
            tracing::warn!("⚠️ No valid jobs in batch; writing an empty report");
        }

        // 並行數不超過工作數
        let processes = self.config.processes().min(batch.jobs.len()).max(1);
        let scheduler = Scheduler::new(processes, self.tool.clone())?
            .with_cancellation(self.cancel.clone());
        let outcome = scheduler.run(batch.jobs).await;

        // 寫出結果
        let body = report::render(&outcome.results, self.config.output_format())?;
        self.storage
            .write_file(self.config.output_path(), &body)
            .await?;

        let elapsed = started.elapsed();
        tracing::info!(
            "📊 {} reaped, {} failed, {} cancelled, {} results in {:?} (peak {} processes)",
            outcome.count(JobState::Reaped),
            outcome.count(JobState::Failed),
            outcome.count(JobState::Cancelled),
            outcome.results.len(),
            elapsed,
            outcome.peak_running
        );

        Ok(BatchSummary {
            run_id,
            output_path: self.config.output_path().to_string(),
            lines_rejected: batch.rejected.len(),
            outcome,
            elapsed,
        })
    }
}
