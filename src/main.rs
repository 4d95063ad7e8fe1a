use clap::Parser;
use mutant_batch::domain::ports::ConfigProvider;
use mutant_batch::utils::error::ErrorSeverity;
use mutant_batch::utils::{logger, validation::Validate};
use mutant_batch::{BatchEngine, BatchError, CliConfig, LocalStorage, TomlConfig, ToolConfig};
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    // 初始化日誌
    if cli.log_json {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("Starting mutant-batch");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    // Ctrl-C 時終止所有子程序，保留已合併的結果
    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("🛑 Interrupt received, stopping running jobs");
                cancel.cancel();
            }
        });
    }

    let exit_code = if let Some(path) = cli.config.clone() {
        tracing::info!("📁 Loading configuration from: {}", path);
        let mut config = match TomlConfig::from_file(&path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("❌ Failed to load config file '{}': {}", path, e);
                eprintln!("💡 Make sure the file exists and is valid TOML format");
                std::process::exit(1);
            }
        };

        // 應用命令列覆蓋設定
        config.apply_cli_overrides(&cli);
        let tool = config.tool.clone();
        run(config, tool, cancel).await
    } else {
        run(cli, ToolConfig::default(), cancel).await
    };

    if exit_code > 0 {
        std::process::exit(exit_code);
    }
    Ok(())
}

async fn run<C>(config: C, tool: ToolConfig, cancel: CancellationToken) -> i32
where
    C: ConfigProvider + Validate,
{
    // 驗證配置
    if let Err(e) = config.validate().and_then(|_| tool.validate()) {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e);
        return exit_code_for(&e);
    }

    let engine =
        BatchEngine::new(LocalStorage::new("."), config, tool).with_cancellation(cancel);

    match engine.run().await {
        Ok(summary) => {
            println!("{:?}", summary.elapsed);
            println!("📁 Output saved to: {}", summary.output_path);
            if summary.cancelled() {
                let e = BatchError::Cancelled;
                eprintln!("⚠️ {} ({})", e, e.recovery_suggestion());
                return exit_code_for(&e);
            }
            0
        }
        Err(e) => {
            tracing::error!("❌ Batch failed: {} (Severity: {:?})", e, e.severity());
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
            eprintln!("❌ {}", e);
            exit_code_for(&e)
        }
    }
}

/// 根據錯誤嚴重程度決定退出碼
fn exit_code_for(e: &BatchError) -> i32 {
    match e.severity() {
        ErrorSeverity::Low => 0,
        ErrorSeverity::Medium => 2,
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    }
}
