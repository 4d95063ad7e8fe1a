use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// 未提供的欄位（例如 `-seqv` 模式下的穩定性描述）
pub const NOT_APPLICABLE: &str = "n/a";

/// I-Mutant 的四種分析模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mode {
    #[serde(rename = "-seq")]
    Seq,
    #[serde(rename = "-seqv")]
    SeqEnergy,
    #[serde(rename = "-pdb")]
    Pdb,
    #[serde(rename = "-pdbv")]
    PdbEnergy,
}

impl Mode {
    pub const FLAGS: [&'static str; 4] = ["-seq", "-seqv", "-pdb", "-pdbv"];

    pub fn from_flag(flag: &str) -> Option<Self> {
        match flag {
            "-seq" => Some(Mode::Seq),
            "-seqv" => Some(Mode::SeqEnergy),
            "-pdb" => Some(Mode::Pdb),
            "-pdbv" => Some(Mode::PdbEnergy),
            _ => None,
        }
    }

    pub fn flag(&self) -> &'static str {
        match self {
            Mode::Seq => "-seq",
            Mode::SeqEnergy => "-seqv",
            Mode::Pdb => "-pdb",
            Mode::PdbEnergy => "-pdbv",
        }
    }

    pub fn family(&self) -> ModeFamily {
        match self {
            Mode::Seq | Mode::SeqEnergy => ModeFamily::Seq,
            Mode::Pdb | Mode::PdbEnergy => ModeFamily::Pdb,
        }
    }

    /// 能量模式回報 ΔΔG 數值，而非穩定性描述與可信度
    pub fn is_energy_variant(&self) -> bool {
        matches!(self, Mode::SeqEnergy | Mode::PdbEnergy)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.flag())
    }
}

/// 分析基礎：序列或結構，與是否為能量模式無關
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModeFamily {
    Seq,
    Pdb,
}

impl ModeFamily {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModeFamily::Seq => "seq",
            ModeFamily::Pdb => "pdb",
        }
    }
}

impl fmt::Display for ModeFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobInput {
    Sequence {
        sequence: PathBuf,
    },
    Structure {
        pdb: PathBuf,
        dssp: PathBuf,
        chain: String,
    },
}

/// 一筆已驗證的突變分析請求
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    /// 批次檔中的行號（從 1 開始）
    pub id: usize,
    pub mode: Mode,
    pub input: JobInput,
    pub position: u32,
    pub new_residue: char,
    pub ph: Option<String>,
    /// 只有在 `ph` 存在時才可能有值
    pub temperature: Option<String>,
}

impl Job {
    pub fn label(&self) -> String {
        format!("{} {}{}", self.mode, self.position, self.new_residue)
    }
}

/// I-Mutant 報表中的一列
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub name: String,
    pub energy_change: String,
    pub description: String,
    pub reliability_index: String,
    pub ph: String,
    pub temperature: String,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AggregateKey {
    pub name: String,
    pub family: ModeFamily,
}

impl AggregateKey {
    pub fn new(name: impl Into<String>, family: ModeFamily) -> Self {
        Self {
            name: name.into(),
            family,
        }
    }
}

impl fmt::Display for AggregateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.family)
    }
}

/// 報表格式不符時的警告，不會中斷批次
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ParseWarning {
    MissingHeader,
    MalformedRow { line: usize, reason: String },
}

impl fmt::Display for ParseWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseWarning::MissingHeader => f.write_str("report header not found in output"),
            ParseWarning::MalformedRow { line, reason } => {
                write!(f, "output line {}: {}", line, reason)
            }
        }
    }
}

/// 工作在排程器中的狀態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum JobState {
    Queued,
    Running,
    Completed,
    Reaped,
    /// 無法啟動子程序
    Failed,
    /// 取消時被終止或從未啟動
    Cancelled,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Reaped | JobState::Failed | JobState::Cancelled)
    }

    pub fn can_transition_to(&self, next: JobState) -> bool {
        matches!(
            (self, next),
            (JobState::Queued, JobState::Running)
                | (JobState::Queued, JobState::Failed)
                | (JobState::Queued, JobState::Cancelled)
                | (JobState::Running, JobState::Completed)
                | (JobState::Running, JobState::Failed)
                | (JobState::Running, JobState::Cancelled)
                | (JobState::Completed, JobState::Reaped)
        )
    }
}

/// 單一工作的執行摘要
#[derive(Debug, Clone, Serialize)]
pub struct JobReport {
    pub job_id: usize,
    pub mode: Mode,
    pub state: JobState,
    pub exit_code: Option<i32>,
    pub stderr: String,
    pub warnings: Vec<ParseWarning>,
    pub records_merged: usize,
}

impl JobReport {
    pub fn queued(job: &Job) -> Self {
        Self {
            job_id: job.id,
            mode: job.mode,
            state: JobState::Queued,
            exit_code: None,
            stderr: String::new(),
            warnings: Vec::new(),
            records_merged: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Tsv,
    Json,
}
