use crate::modules::common::config::SweeperConfig;
use crate::modules::common::events::EventLog;
use crate::modules::snapshot::{self, SnapshotScope, SnapshotStore};
use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
pub struct SnapshotCommand {
    /// 额外的文件根目录 (可多次指定，不指定则用默认监控范围)
    #[arg(long)]
    pub root: Vec<PathBuf>,

    /// 遍历深度上限
    #[arg(long)]
    pub max_depth: Option<usize>,

    /// 对小文件计算内容哈希
    #[arg(long)]
    pub hash: bool,

    /// 列出已保存的快照
    #[arg(long)]
    pub list: bool,

    /// 删除指定快照
    #[arg(long)]
    pub remove: Option<String>,
}

pub async fn execute(cmd: SnapshotCommand) -> Result<()> {
    let store = SnapshotStore::open_default()?;

    if cmd.list {
        let items = store.list()?;
        if items.is_empty() {
            println!("暂无快照");
            return Ok(());
        }
        println!("共 {} 个快照:\n", items.len());
        for (id, timestamp, entries) in items {
            println!("  {}  {}  {} 条记录", id, timestamp.format("%Y-%m-%d %H:%M:%S"), entries);
        }
        return Ok(());
    }

    if let Some(id) = cmd.remove {
        store.remove(&id)?;
        println!("快照已删除: {}", id);
        return Ok(());
    }

    let config = SweeperConfig::load();
    let mut scope = SnapshotScope::from_config(&config.monitor, &config.scan);
    if let Some(max_depth) = cmd.max_depth {
        scope.max_depth = max_depth;
    }
    for root in cmd.root {
        scope = scope.with_file_root(root);
    }
    scope.hash_files = cmd.hash || config.scan.hash_files;

    println!("正在采集快照...");
    let snapshot = snapshot::capture(&scope, &EventLog::disabled()).await?;

    if snapshot.partial {
        println!("部分子树无法访问 ({} 条警告):", snapshot.warnings.len());
        for warning in snapshot.warnings.iter().take(5) {
            println!("  {}", warning);
        }
    }

    let path = store.save(&snapshot)?;
    println!(
        "\n快照 {} 已保存: {} 条记录\n  文件: {}\n  注册表: {}\n  服务: {}\n  任务: {}\n  位置: {}",
        snapshot.id,
        snapshot.total_entries(),
        snapshot.files.len(),
        snapshot.registry.len(),
        snapshot.services.len(),
        snapshot.tasks.len(),
        path.display()
    );

    Ok(())
}
