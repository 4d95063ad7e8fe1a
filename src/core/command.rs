use crate::config::ToolConfig;
use crate::domain::model::{Job, JobInput};
use std::process::Stdio;

/// 外部程式的呼叫描述：程式名稱與有序的參數列表
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: Option<String>,
}

/// I-Mutant 的位置參數：模式旗標、輸入檔、位置、新殘基，再依序接 pH 與溫度
pub fn mode_arguments(job: &Job) -> Vec<String> {
    let mut args = vec![job.mode.flag().to_string()];

    match &job.input {
        JobInput::Sequence { sequence } => {
            args.push(sequence.display().to_string());
        }
        JobInput::Structure { pdb, dssp, chain } => {
            args.push(pdb.display().to_string());
            args.push(dssp.display().to_string());
            args.push(chain.clone());
        }
    }

    args.push(job.position.to_string());
    args.push(job.new_residue.to_string());

    // 溫度只有在 pH 存在時才有意義
    if let Some(ph) = &job.ph {
        args.push(ph.clone());
        if let Some(temperature) = &job.temperature {
            args.push(temperature.clone());
        }
    }

    args
}

impl ToolCommand {
    pub fn for_job(job: &Job, tool: &ToolConfig) -> Self {
        let mut args = tool.program_args.clone();
        if let Some(script) = &tool.script {
            args.push(script.clone());
        }
        args.extend(mode_arguments(job));

        Self {
            program: tool.program.clone(),
            args,
            working_dir: tool.working_dir.clone(),
        }
    }

    /// 建立子程序命令；stdout/stderr 以管線擷取
    pub fn to_command(&self) -> tokio::process::Command {
        let mut cmd = tokio::process::Command::new(&self.program);
        cmd.args(&self.args);

        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }

        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.kill_on_drop(true);

        // 自成一個程序群組，取消時連同工具啟動的子程序一起終止
        #[cfg(unix)]
        cmd.process_group(0);

        cmd
    }
}

impl std::fmt::Display for ToolCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}
