use crate::modules::backup::BackupVault;
use crate::modules::common::config::SweeperConfig;
use anyhow::Result;
use clap::Parser;

#[derive(Parser, Debug)]
pub struct BackupCommand {
    /// 操作: list / show / restore / purge
    pub action: String,

    /// 计划 ID (show/restore 时必填)
    pub plan_id: Option<String>,

    /// 只恢复指定步骤 (不指定则恢复整个计划)
    #[arg(long)]
    pub step: Option<String>,

    /// purge 的保留天数 (默认取配置)
    #[arg(long)]
    pub keep_days: Option<i64>,
}

pub async fn execute(cmd: BackupCommand) -> Result<()> {
    let config = SweeperConfig::load();
    let vault = match &config.backup.dir {
        Some(dir) => BackupVault::open(dir)?,
        None => BackupVault::open_default()?,
    };

    match cmd.action.as_str() {
        "list" => {
            let manifests = vault.list_plans()?;
            if manifests.is_empty() {
                println!("暂无备份");
                return Ok(());
            }
            println!("共 {} 个备份:\n", manifests.len());
            for manifest in manifests {
                println!(
                    "  {}  {}  {} 个条目",
                    manifest.plan_id,
                    manifest.created_at.format("%Y-%m-%d %H:%M:%S"),
                    manifest.entries.len()
                );
            }
        }
        "show" => {
            let plan_id = require_plan_id(cmd.plan_id)?;
            let manifest = vault.load_manifest(&plan_id)?;
            println!("计划 {} 的备份 ({} 个条目):\n", plan_id, manifest.entries.len());
            for entry in &manifest.entries {
                println!("  {}  {:?}  {}", entry.step_id, entry.kind, entry.original_locator);
            }
        }
        "restore" => {
            let plan_id = require_plan_id(cmd.plan_id)?;
            let manifest = vault.load_manifest(&plan_id)?;

            let step_ids: Vec<String> = match cmd.step {
                Some(step) => vec![step],
                None => manifest.entries.iter().map(|e| e.step_id.clone()).collect(),
            };

            let mut restored = 0;
            let mut conflicts = 0;
            for step_id in step_ids {
                match vault.restore_step(&plan_id, &step_id) {
                    Ok(()) => restored += 1,
                    Err(e) => {
                        conflicts += 1;
                        println!("  跳过 {}: {}", step_id, e);
                    }
                }
            }
            println!("\n恢复完成: {} 成功, {} 跳过", restored, conflicts);
        }
        "purge" => {
            let keep_days = cmd.keep_days.unwrap_or(config.backup.keep_days);
            let removed = vault.purge_older_than(keep_days)?;
            println!("已清理 {} 个超过 {} 天的备份", removed, keep_days);
        }
        other => anyhow::bail!("未知操作: {} (支持 list/show/restore/purge)", other),
    }

    Ok(())
}

fn require_plan_id(plan_id: Option<String>) -> Result<String> {
    plan_id.ok_or_else(|| anyhow::anyhow!("需要指定计划 ID"))
}
