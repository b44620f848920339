use anyhow::Result;
use clap::Parser;
use std::process;

mod commands;
mod modules;

#[derive(Parser, Debug)]
#[command(name = "rust-sweep")]
#[command(about = "Windows 残留清理命令行工具", long_about = None)]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: commands::Command,

    /// 详细输出模式
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // 解析命令行参数
    let cli = Cli::parse();

    // 初始化日志
    modules::common::logging::init_logging(cli.verbose);

    // 执行命令
    let result = match cli.command {
        commands::Command::Snapshot(cmd) => commands::snapshot::execute(cmd).await,
        commands::Command::Diff(cmd) => commands::diff::execute(cmd).await,
        commands::Command::Monitor(cmd) => commands::monitor::execute(cmd).await,
        commands::Command::Scan(cmd) => commands::scan::execute(cmd).await,
        commands::Command::Clean(cmd) => commands::clean::execute(cmd).await,
        commands::Command::Rules(cmd) => commands::rules::execute(cmd).await,
        commands::Command::Backup(cmd) => commands::backup::execute(cmd).await,
    };

    match result {
        Ok(_) => {}
        Err(e) => {
            if cli.verbose {
                tracing::error!("错误: {}", e);
            } else {
                eprintln!("错误: {}", e);
            }
            process::exit(1);
        }
    }

    Ok(())
}
