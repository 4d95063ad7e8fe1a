use crate::config::ToolConfig;
use crate::core::aggregator::ResultAggregator;
use crate::core::command::ToolCommand;
use crate::core::report_parser::parse_report;
use crate::domain::model::{Job, JobReport, JobState};
use crate::utils::error::{BatchError, Result};
use crate::utils::validation::validate_positive_number;
use std::collections::{HashMap, VecDeque};
use std::io;
use std::process::ExitStatus;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Child;
use tokio::task::{Id, JoinSet};
use tokio_util::sync::CancellationToken;

/// 一次批次執行的結果，由呼叫端取得所有權
#[derive(Debug)]
pub struct BatchOutcome {
    pub results: ResultAggregator,
    pub jobs: Vec<JobReport>,
    /// 同時執行中的子程序數量峰值
    pub peak_running: usize,
    pub cancelled: bool,
}

impl BatchOutcome {
    pub fn count(&self, state: JobState) -> usize {
        self.jobs.iter().filter(|job| job.state == state).count()
    }
}

/// 子程序結束（或被取消）後由監督任務回傳
struct Completion {
    index: usize,
    exit: io::Result<ExitStatus>,
    stdout: String,
    stderr: String,
    cancelled: bool,
}

/// 固定上限的子程序池
///
/// 控制迴圈是單一擁有者：等待中的佇列、執行中的集合與結果表都只在 `run` 裡被修改。
/// 每個子程序由一個小任務負責讀完 stdout/stderr 並等待結束，迴圈只在
/// 「至少一個子程序結束」或「執行中集合為空」時醒來。
pub struct Scheduler {
    limit: usize,
    tool: ToolConfig,
    cancel: CancellationToken,
}

impl Scheduler {
    pub fn new(limit: usize, tool: ToolConfig) -> Result<Self> {
        validate_positive_number("processes", limit, 1)?;
        Ok(Self {
            limit,
            tool,
            cancel: CancellationToken::new(),
        })
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub async fn run(&self, jobs: Vec<Job>) -> BatchOutcome {
        let total = jobs.len();
        let mut queue: VecDeque<usize> = (0..total).collect();
        let mut reports: Vec<JobReport> = jobs.iter().map(JobReport::queued).collect();
        let mut results = ResultAggregator::new();
        let mut in_flight: JoinSet<Completion> = JoinSet::new();
        let mut tasks: HashMap<Id, usize> = HashMap::new();
        let mut peak_running = 0;
        let mut finished = 0;

        tracing::info!(
            "🚀 Running {} jobs with up to {} concurrent processes",
            total,
            self.limit
        );

        loop {
            // 補滿執行中的子程序
            while in_flight.len() < self.limit && !self.cancel.is_cancelled() {
                let Some(index) = queue.pop_front() else {
                    break;
                };
                let job = &jobs[index];
                let command = ToolCommand::for_job(job, &self.tool);

                match command.to_command().spawn() {
                    Ok(child) => {
                        tracing::debug!("▶️ Job {} ({}): {}", job.id, job.label(), command);
                        transition(&mut reports[index], JobState::Running);
                        let handle = in_flight.spawn(supervise(index, child, self.cancel.clone()));
                        tasks.insert(handle.id(), index);
                        peak_running = peak_running.max(in_flight.len());
                    }
                    Err(source) => {
                        let err = BatchError::LaunchError {
                            job: job.id,
                            source,
                        };
                        tracing::error!("❌ {} ({})", err, command);
                        reports[index].stderr = err.to_string();
                        transition(&mut reports[index], JobState::Failed);
                        finished += 1;
                    }
                }
            }

            // 等待任一子程序結束
            let Some(joined) = in_flight.join_next_with_id().await else {
                break;
            };

            match joined {
                Ok((id, completion)) => {
                    tasks.remove(&id);
                    reap(completion, &jobs, &mut reports, &mut results);
                }
                Err(join_error) => {
                    if let Some(index) = tasks.remove(&join_error.id()) {
                        tracing::error!(
                            "❌ Supervisor for job {} stopped: {}",
                            jobs[index].id,
                            join_error
                        );
                        reports[index].stderr = join_error.to_string();
                        transition(&mut reports[index], JobState::Failed);
                    }
                }
            }

            finished += 1;
            tracing::debug!("Progress: {}/{} jobs finished", finished, total);
        }

        // 全部完成後才觸發的取消不算數
        let cancelled = self.cancel.is_cancelled()
            && (!queue.is_empty() || reports.iter().any(|r| r.state == JobState::Cancelled));
        if cancelled {
            for index in queue {
                transition(&mut reports[index], JobState::Cancelled);
            }
            tracing::warn!(
                "🛑 Batch cancelled; returning {} merged results",
                results.len()
            );
        }

        BatchOutcome {
            results,
            jobs: reports,
            peak_running,
            cancelled,
        }
    }
}

fn transition(report: &mut JobReport, next: JobState) {
    if report.state.can_transition_to(next) {
        report.state = next;
    } else {
        tracing::error!(
            "Job {} cannot move from {:?} to {:?}",
            report.job_id,
            report.state,
            next
        );
    }
}

/// 收集輸出、解析並合併到結果表
fn reap(
    completion: Completion,
    jobs: &[Job],
    reports: &mut [JobReport],
    results: &mut ResultAggregator,
) {
    let job = &jobs[completion.index];
    let report = &mut reports[completion.index];

    if completion.cancelled {
        tracing::warn!("🛑 Job {} ({}) was killed", job.id, job.label());
        transition(report, JobState::Cancelled);
        return;
    }

    transition(report, JobState::Completed);

    match &completion.exit {
        Ok(status) => {
            report.exit_code = status.code();
            if !status.success() {
                tracing::warn!("⚠️ Job {} ({}) exited with {}", job.id, job.label(), status);
            }
        }
        Err(e) => tracing::warn!("⚠️ Job {} ({}): failed to wait: {}", job.id, job.label(), e),
    }

    for line in completion.stderr.lines().filter(|l| !l.trim().is_empty()) {
        tracing::warn!("Job {} stderr: {}", job.id, line);
    }

    let parsed = parse_report(&completion.stdout, &completion.stderr, job.mode);
    for warning in &parsed.warnings {
        tracing::warn!("⚠️ Job {} ({}): {}", job.id, job.label(), warning);
    }

    report.records_merged = results.merge_all(&parsed.records, job.mode);
    report.stderr = parsed.diagnostics;
    report.warnings = parsed.warnings;
    transition(report, JobState::Reaped);

    tracing::debug!(
        "✅ Job {} ({}) reaped, {} records merged",
        job.id,
        job.label(),
        report.records_merged
    );
}

async fn supervise(index: usize, mut child: Child, cancel: CancellationToken) -> Completion {
    let stdout = child.stdout.take();
    let stderr = child.stderr.take();

    let drained = tokio::select! {
        output = async { tokio::join!(read_pipe(stdout), read_pipe(stderr)) } => Some(output),
        _ = cancel.cancelled() => None,
    };

    match drained {
        Some((stdout, stderr)) => {
            let exit = child.wait().await;
            release(&mut child);
            Completion {
                index,
                exit,
                stdout,
                stderr,
                cancelled: false,
            }
        }
        None => {
            kill_process_group(&child);
            release(&mut child);
            let exit = child.wait().await;
            Completion {
                index,
                exit,
                stdout: String::new(),
                stderr: String::new(),
                cancelled: true,
            }
        }
    }
}

async fn read_pipe<R: AsyncRead + Unpin>(pipe: Option<R>) -> String {
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe {
        if let Err(e) = pipe.read_to_end(&mut buf).await {
            tracing::warn!("Failed to read child output: {}", e);
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

/// 對子程序所在的整個程序群組送出 SIGKILL；須在 `wait` 之前呼叫
#[cfg(unix)]
fn kill_process_group(child: &Child) {
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    if let Some(pid) = child.id() {
        if let Err(e) = killpg(Pid::from_raw(pid as i32), Signal::SIGKILL) {
            tracing::debug!("killpg {} failed: {}", pid, e);
        }
    }
}

#[cfg(not(unix))]
fn kill_process_group(_child: &Child) {}

/// 強制結束子程序；對已結束的程序不算錯誤
fn release(child: &mut Child) {
    match child.start_kill() {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::InvalidInput => {}
        Err(e) => tracing::debug!("kill on finished child: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{JobInput, Mode};
    use std::path::PathBuf;

    fn job(id: usize) -> Job {
        Job {
            id,
            mode: Mode::Seq,
            input: JobInput::Sequence {
                sequence: PathBuf::from("seq.txt"),
            },
            position: 23,
            new_residue: 'G',
            ph: None,
            temperature: None,
        }
    }

    #[test]
    fn test_zero_limit_is_rejected() {
        assert!(Scheduler::new(0, ToolConfig::default()).is_err());
        assert_eq!(Scheduler::new(3, ToolConfig::default()).unwrap().limit(), 3);
    }

    #[tokio::test]
    async fn test_empty_batch_finishes_immediately() {
        let scheduler = Scheduler::new(2, ToolConfig::default()).unwrap();
        let outcome = scheduler.run(Vec::new()).await;

        assert!(outcome.results.is_empty());
        assert!(outcome.jobs.is_empty());
        assert_eq!(outcome.peak_running, 0);
        assert!(!outcome.cancelled);
    }

    #[tokio::test]
    async fn test_launch_failure_marks_job_failed_and_continues() {
        let tool = ToolConfig::executable("/definitely/not/a/real/imutant");
        let scheduler = Scheduler::new(2, tool).unwrap();

        let outcome = scheduler.run(vec![job(1), job(2), job(3)]).await;

        assert_eq!(outcome.count(JobState::Failed), 3);
        assert_eq!(outcome.peak_running, 0);
        assert!(outcome.jobs[0].stderr.contains("Failed to launch job 1"));
    }

    #[tokio::test]
    async fn test_pre_cancelled_run_launches_nothing() {
        let scheduler = Scheduler::new(2, ToolConfig::executable("true")).unwrap();
        scheduler.cancellation_token().cancel();

        let outcome = scheduler.run(vec![job(1), job(2)]).await;

        assert!(outcome.cancelled);
        assert_eq!(outcome.count(JobState::Cancelled), 2);
        assert_eq!(outcome.peak_running, 0);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_nonzero_exit_is_reaped_not_fatal() {
        let scheduler = Scheduler::new(1, ToolConfig::executable("false")).unwrap();

        let outcome = scheduler.run(vec![job(1), job(2)]).await;

        assert_eq!(outcome.count(JobState::Reaped), 2);
        assert_eq!(outcome.jobs[0].exit_code, Some(1));
        assert!(outcome.results.is_empty());
    }
}
