use crate::domain::model::{Job, JobInput, Mode, ModeFamily};
use crate::utils::error::{BatchError, Result};
use crate::utils::validation::{is_integer, is_real, validate_existing_file};
use std::num::IntErrorKind;
use std::path::PathBuf;

const FIELD_SEPARATOR: char = '|';

/// 批次檔中的一行，尚未驗證
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRequest {
    pub line: usize,
    pub mode: Mode,
    pub sequence: Option<String>,
    pub pdb: Option<String>,
    pub dssp: Option<String>,
    pub chain: Option<String>,
    pub position: String,
    pub new_residue: String,
    pub ph: Option<String>,
    pub temperature: Option<String>,
}

impl JobRequest {
    /// 解析一行 `|` 分隔的參數
    ///
    /// `-seq|SEQ|POS|RES[|PH[|TEMP]]` 或 `-pdb|PDB|DSSP|CHAIN|POS|RES[|PH[|TEMP]]`，
    /// 能量模式 (`-seqv`, `-pdbv`) 格式相同。
    pub fn from_line(line: usize, text: &str) -> Result<Self> {
        let fields: Vec<&str> = text
            .trim_end_matches(['\r', '\n'])
            .split(FIELD_SEPARATOR)
            .map(str::trim)
            .collect();

        let mode = Mode::from_flag(fields[0]).ok_or_else(|| {
            BatchError::invalid_line(
                line,
                format!("first arg should be one of {}", Mode::FLAGS.join(", ")),
            )
        })?;

        // pH 與溫度是依位置接在必要欄位後面的
        let required = match mode.family() {
            ModeFamily::Seq => 4,
            ModeFamily::Pdb => 6,
        };
        if fields.len() < required {
            return Err(BatchError::invalid_line(
                line,
                "not enough parameters were provided",
            ));
        }
        if fields.len() > required + 2 {
            return Err(BatchError::invalid_line(
                line,
                format!(
                    "too many parameters: expected at most {}, got {}",
                    required + 2,
                    fields.len()
                ),
            ));
        }

        let optional = |index: usize| fields.get(index).map(|s| s.to_string());
        let (sequence, pdb, dssp, chain) = match mode.family() {
            ModeFamily::Seq => (optional(1), None, None, None),
            ModeFamily::Pdb => (None, optional(1), optional(2), optional(3)),
        };

        Ok(Self {
            line,
            mode,
            sequence,
            pdb,
            dssp,
            chain,
            position: fields[required - 2].to_string(),
            new_residue: fields[required - 1].to_string(),
            ph: optional(required),
            temperature: optional(required + 1),
        })
    }

    /// 驗證並轉換成可排程的 Job
    pub fn validate(self) -> Result<Job> {
        let line = self.line;
        let fail = |reason: String| BatchError::invalid_line(line, reason);

        let input = if self.mode.family() == ModeFamily::Seq {
            let sequence = resolve_input("sequence", self.sequence.as_deref())
                .map_err(|_| fail("sequence file does not exist".into()))?;
            JobInput::Sequence { sequence }
        } else {
            let pdb = resolve_input("pdb", self.pdb.as_deref())
                .map_err(|_| fail("PDB file does not exist".into()))?;
            let dssp = resolve_input("dssp", self.dssp.as_deref())
                .map_err(|_| fail("DSSP file does not exist".into()))?;
            let chain = self
                .chain
                .filter(|c| !c.is_empty())
                .ok_or_else(|| fail("chain cannot be empty".into()))?;
            JobInput::Structure { pdb, dssp, chain }
        };

        if !is_integer(&self.position) {
            return Err(fail("position must be an integer".into()));
        }
        let position = match self.position.parse::<u32>() {
            Ok(p) if p > 0 => p,
            Err(e) if *e.kind() == IntErrorKind::PosOverflow => {
                return Err(fail(format!(
                    "position '{}' is out of range (max {})",
                    self.position,
                    u32::MAX
                )))
            }
            _ => return Err(fail(format!("position '{}' must be positive", self.position))),
        };

        let mut residue_chars = self.new_residue.chars();
        let new_residue = match (residue_chars.next(), residue_chars.next()) {
            (Some(c), None) if c.is_ascii_alphabetic() => c,
            _ => {
                return Err(fail(format!(
                    "new residue '{}' must be a letter character",
                    self.new_residue
                )))
            }
        };

        if let Some(ph) = &self.ph {
            if !is_real(ph) {
                return Err(fail("PH must be a number".into()));
            }
        }
        if let Some(temperature) = &self.temperature {
            if !is_real(temperature) {
                return Err(fail("temperature must be a number".into()));
            }
        }

        Ok(Job {
            id: line,
            mode: self.mode,
            input,
            position,
            new_residue,
            ph: self.ph,
            temperature: self.temperature,
        })
    }
}

/// 確認輸入檔存在並轉成絕對路徑，子程序可能在 `tool.working_dir` 中執行
fn resolve_input(field: &str, path: Option<&str>) -> Result<PathBuf> {
    let path = path.unwrap_or_default();
    validate_existing_file(field, path)?;
    Ok(std::path::absolute(path)?)
}

/// 解析並驗證一行；空白行與 `#` 註解回傳 None
pub fn parse_job_line(line: usize, text: &str) -> Result<Option<Job>> {
    let trimmed = text.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(None);
    }
    JobRequest::from_line(line, text)?.validate().map(Some)
}

/// 載入整個批次檔的結果
#[derive(Debug, Default)]
pub struct LoadedBatch {
    pub jobs: Vec<Job>,
    pub rejected: Vec<BatchError>,
}

/// 逐行載入批次內容，格式錯誤的行只會被略過
pub fn load_batch(content: &str) -> LoadedBatch {
    let mut batch = LoadedBatch::default();

    for (index, text) in content.lines().enumerate() {
        let line = index + 1;
        match parse_job_line(line, text) {
            Ok(Some(job)) => batch.jobs.push(job),
            Ok(None) => {}
            Err(e) => {
                tracing::warn!("⚠️ Skipping batch line: {}", e);
                batch.rejected.push(e);
            }
        }
    }

    tracing::debug!(
        "Loaded {} jobs, rejected {} lines",
        batch.jobs.len(),
        batch.rejected.len()
    );
    batch
}
