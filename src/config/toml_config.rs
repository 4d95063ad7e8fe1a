use crate::config::{CliConfig, DEFAULT_OUTPUT_PATH, DEFAULT_PROCESSES};
use crate::domain::model::OutputFormat;
use crate::domain::ports::ConfigProvider;
use crate::utils::error::{BatchError, Result};
use crate::utils::validation::{validate_non_empty_string, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::OnceLock;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub batch: BatchSection,
    #[serde(default)]
    pub tool: ToolConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchSection {
    #[serde(default)]
    pub input: String,
    #[serde(default = "default_output")]
    pub output: String,
    #[serde(default = "default_processes")]
    pub processes: usize,
    #[serde(default)]
    pub format: OutputFormat,
}

impl Default for BatchSection {
    fn default() -> Self {
        Self {
            input: String::new(),
            output: default_output(),
            processes: default_processes(),
            format: OutputFormat::default(),
        }
    }
}

/// 外部 I-Mutant 程式的呼叫方式
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolConfig {
    #[serde(default = "default_program")]
    pub program: String,
    #[serde(default = "default_program_args")]
    pub program_args: Vec<String>,
    /// 為 None 時 `program` 本身就是 I-Mutant 執行檔
    #[serde(default = "default_script")]
    pub script: Option<String>,
    #[serde(default)]
    pub working_dir: Option<String>,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            program: default_program(),
            program_args: default_program_args(),
            script: default_script(),
            working_dir: None,
        }
    }
}

impl ToolConfig {
    /// 直接執行指定程式，不經過直譯器
    pub fn executable(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            program_args: Vec::new(),
            script: None,
            working_dir: None,
        }
    }
}

impl Validate for ToolConfig {
    fn validate(&self) -> Result<()> {
        validate_non_empty_string("tool.program", &self.program)?;

        if let Some(script) = &self.script {
            validate_non_empty_string("tool.script", script)?;
            if script.contains("${") {
                tracing::warn!(
                    "⚠️ tool.script still contains an unresolved variable: {}",
                    script
                );
            }
        }

        Ok(())
    }
}

fn default_output() -> String {
    DEFAULT_OUTPUT_PATH.to_string()
}

fn default_processes() -> usize {
    DEFAULT_PROCESSES
}

fn default_program() -> String {
    "python".to_string()
}

fn default_program_args() -> Vec<String> {
    vec!["-O".to_string()]
}

fn default_script() -> Option<String> {
    Some(substitute_env_vars("${IMUTANTHOME}/I-Mutant2.0.py"))
}

fn env_var_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\$\{([^}]+)\}").expect("static regex is valid"))
}

/// 替換環境變數 (例如 ${IMUTANTHOME})，未定義的變數保持原樣
pub fn substitute_env_vars(content: &str) -> String {
    env_var_pattern()
        .replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        })
        .into_owned()
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(BatchError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| BatchError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 應用命令列覆蓋設定
    pub fn apply_cli_overrides(&mut self, cli: &CliConfig) {
        if let Some(input) = &cli.input {
            self.batch.input = input.clone();
        }
        if let Some(output) = &cli.output {
            self.batch.output = output.clone();
        }
        if let Some(processes) = cli.processes {
            self.batch.processes = processes;
        }
        if let Some(format) = cli.format {
            self.batch.format = format;
        }
    }
}

impl ConfigProvider for TomlConfig {
    fn input_path(&self) -> &str {
        &self.batch.input
    }

    fn output_path(&self) -> &str {
        &self.batch.output
    }

    fn processes(&self) -> usize {
        self.batch.processes
    }

    fn output_format(&self) -> OutputFormat {
        self.batch.format
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        crate::config::validate_batch_settings(self)?;
        self.tool.validate()
    }
}
