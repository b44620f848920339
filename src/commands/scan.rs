use crate::modules::common::config::SweeperConfig;
use crate::modules::common::events::EventLog;
use crate::modules::common::utils;
use crate::modules::diff::InstallRecordStore;
use crate::modules::scanner::{self, Fingerprint, FingerprintStore};
use crate::modules::snapshot::SnapshotScope;
use anyhow::Result;
use clap::Parser;

#[derive(Parser, Debug)]
pub struct ScanCommand {
    /// 程序名称 (优先查已保存指纹，查不到则按名称即兴构建)
    pub name: String,

    /// 发布者
    #[arg(long)]
    pub publisher: Option<String>,

    /// 已知安装目录 (可多次指定)
    #[arg(long)]
    pub install_path: Vec<String>,

    /// 产品标识 (如 MSI GUID)
    #[arg(long)]
    pub product_id: Option<String>,

    /// 保存本次指纹供以后使用
    #[arg(long)]
    pub save: bool,

    /// 以 JSON 输出结果
    #[arg(long)]
    pub json: bool,
}

pub async fn execute(cmd: ScanCommand) -> Result<()> {
    let store = FingerprintStore::open_default()?;

    let mut fingerprint = match store.find(&cmd.name)? {
        Some(saved) if cmd.publisher.is_none() && cmd.install_path.is_empty() => {
            println!("使用已保存指纹: {}\n", saved.name);
            saved
        }
        _ => Fingerprint::named(&cmd.name),
    };

    if let Some(publisher) = cmd.publisher {
        fingerprint.publisher = Some(publisher);
    }
    if !cmd.install_path.is_empty() {
        fingerprint.install_paths = cmd.install_path.clone();
    }
    if let Some(id) = cmd.product_id {
        fingerprint.product_id = Some(id);
    }

    // 有监控留痕时用推导出的指纹补全
    if let Some(record) = InstallRecordStore::open_default()?.find_for_program(&cmd.name)? {
        println!("参考安装记录 {} 缩小扫描范围", record.id);
        fingerprint.merge_missing(&record.fingerprint);
    }

    if cmd.save {
        store.save(&fingerprint)?;
    }

    let config = SweeperConfig::load();
    let scope = SnapshotScope::from_config(&config.monitor, &config.scan);

    println!("正在扫描残留...");
    let leftovers =
        scanner::scan_live(&fingerprint, &scope, &config.scan, &EventLog::disabled()).await?;

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&leftovers)?);
        return Ok(());
    }

    if leftovers.is_empty() {
        println!("未发现残留");
        return Ok(());
    }

    println!("找到 {} 个残留项:\n", leftovers.len());
    for leftover in &leftovers {
        let size = leftover
            .size
            .map(|s| format!(" ({})", utils::format_size(s)))
            .unwrap_or_default();
        let marker = if leftover.confidence >= config.scan.include_threshold {
            ' '
        } else {
            '?'
        };
        println!(
            "{} [{:4}] {:.2}  {}{}",
            marker, leftover.kind, leftover.confidence, leftover.locator, size
        );
    }
    println!("\n带 ? 的项低于清除阈值 {:.2}，默认不会进入清除计划", config.scan.include_threshold);

    Ok(())
}
