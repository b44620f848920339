use crate::modules::diff;
use crate::modules::snapshot::SnapshotStore;
use anyhow::Result;
use clap::Parser;

#[derive(Parser, Debug)]
pub struct DiffCommand {
    /// 变更前的快照 ID
    pub before: String,

    /// 变更后的快照 ID
    pub after: String,

    /// 以 JSON 输出完整差异
    #[arg(long)]
    pub json: bool,
}

pub async fn execute(cmd: DiffCommand) -> Result<()> {
    let store = SnapshotStore::open_default()?;
    let before = store.load(&cmd.before)?;
    let after = store.load(&cmd.after)?;

    let changes = diff::diff(&before, &after);

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&changes)?);
        return Ok(());
    }

    if changes.is_empty() {
        println!("两个快照之间没有差异");
        return Ok(());
    }

    println!("快照 {} -> {}\n", cmd.before, cmd.after);
    print_domain("文件", changes.files.added.len(), changes.files.removed.len(), changes.files.modified.len());
    print_domain("注册表", changes.registry.added.len(), changes.registry.removed.len(), changes.registry.modified.len());
    print_domain("服务", changes.services.added.len(), changes.services.removed.len(), changes.services.modified.len());
    print_domain("任务", changes.tasks.added.len(), changes.tasks.removed.len(), changes.tasks.modified.len());

    println!("\n新增文件:");
    for entry in changes.files.added.iter().take(50) {
        println!("  + {}", entry.path);
    }
    for entry in changes.registry.added.iter().take(50) {
        match &entry.value_name {
            Some(value) => println!("  + {}\\{}", entry.full_key_path(), value),
            None => println!("  + {}", entry.full_key_path()),
        }
    }

    println!("\n共 {} 处变更", changes.total());
    Ok(())
}

fn print_domain(label: &str, added: usize, removed: usize, modified: usize) {
    println!("  {:6} 新增 {:5} 删除 {:5} 修改 {:5}", label, added, removed, modified);
}
