//! # Outreach CLI
//!
//! 命令行入口。
//!
//! 提供：
//! - 配置加载与验证
//! - 采集与派发编排
//! - 收件人之间的优雅关闭

mod cli;
mod commands;
mod error;
mod pipeline;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use cli::{Cli, Commands};
use commands::{run_collect, run_dispatch, run_full, run_ledger, run_validate};

#[tokio::main]
async fn main() -> Result<()> {
    // 如存在则加载 .env 文件
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    init_logging(&cli)?;

    info!(version = env!("CARGO_PKG_VERSION"), "Outreach CLI starting");

    let result = match &cli.command {
        Commands::Collect(args) => run_collect(args).await,
        Commands::Dispatch(args) => run_dispatch(args).await,
        Commands::Run(args) => run_full(args).await,
        Commands::Validate(args) => run_validate(args),
        Commands::Ledger(args) => run_ledger(args),
    };

    if let Err(ref e) = result {
        tracing::error!(error = %e, "Command failed");
    }

    result
}

/// 根据命令行选项初始化日志（及指标）
fn init_logging(cli: &Cli) -> Result<()> {
    let default_log_level = if cli.quiet {
        "warn"
    } else {
        match cli.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let log_format = match cli.log_format {
        cli::LogFormat::Json => observability::LogFormat::Json,
        cli::LogFormat::Pretty => observability::LogFormat::Pretty,
        cli::LogFormat::Compact => observability::LogFormat::Compact,
    };

    observability::init_with_config(observability::ObservabilityConfig {
        log_format,
        metrics_port: cli.metrics_port,
        default_log_level: default_log_level.to_string(),
    })
}
