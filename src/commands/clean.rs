use crate::modules::backup::BackupVault;
use crate::modules::common::config::SweeperConfig;
use crate::modules::common::events::EventLog;
use crate::modules::common::utils;
use crate::modules::diff::InstallRecordStore;
use crate::modules::remover::{
    self, CancelFlag, PlanStatus, PlanStore, StepStatus, SystemRunner,
};
use crate::modules::rules::RuleDatabase;
use crate::modules::scanner::{self, Fingerprint, FingerprintStore};
use crate::modules::snapshot::SnapshotScope;
use anyhow::Result;
use clap::Parser;
use std::sync::Arc;

#[derive(Parser, Debug)]
pub struct CleanCommand {
    /// 程序名称
    pub name: String,

    /// 确认删除 (不指定则预览计划)
    #[arg(long)]
    pub confirm: bool,

    /// 发布者
    #[arg(long)]
    pub publisher: Option<String>,

    /// 已知安装目录 (可多次指定)
    #[arg(long)]
    pub install_path: Vec<String>,

    /// 跳过备份 (不推荐)
    #[arg(long)]
    pub no_backup: bool,

    /// 续跑之前中断的计划
    #[arg(long)]
    pub resume: Option<String>,
}

pub async fn execute(cmd: CleanCommand) -> Result<()> {
    let config = SweeperConfig::load();
    let store = PlanStore::open_default()?;
    let events = EventLog::disabled();
    let cancel = CancelFlag::new();

    {
        let cancel = cancel.clone();
        ctrlc_handler(cancel);
    }

    let plan = match &cmd.resume {
        Some(id) => {
            let plan = store.load(id)?;
            println!("续跑计划 {} ({} 个步骤)\n", plan.id, plan.steps.len());
            plan
        }
        None => {
            let mut fingerprint = FingerprintStore::open_default()?
                .find(&cmd.name)?
                .unwrap_or_else(|| Fingerprint::named(&cmd.name));
            if let Some(publisher) = cmd.publisher.clone() {
                fingerprint.publisher = Some(publisher);
            }
            if !cmd.install_path.is_empty() {
                fingerprint.install_paths = cmd.install_path.clone();
            }
            if let Some(record) =
                InstallRecordStore::open_default()?.find_for_program(&cmd.name)?
            {
                println!("参考安装记录 {} 缩小扫描范围", record.id);
                fingerprint.merge_missing(&record.fingerprint);
            }

            println!("正在扫描残留...");
            let scope = SnapshotScope::from_config(&config.monitor, &config.scan);
            let leftovers =
                scanner::scan_live(&fingerprint, &scope, &config.scan, &events).await?;
            println!("找到 {} 个残留项", leftovers.len());

            let rule_db = RuleDatabase::open_default()?;
            let rule = rule_db.resolve(&fingerprint);
            if let Some(rule) = &rule {
                println!("命中顽固程序规则: {}", rule.name);
            }

            remover::build_plan(&fingerprint, &leftovers, rule.as_ref(), &config.scan)
        }
    };

    if plan.steps.is_empty() {
        println!("没有可执行的清除步骤");
        return Ok(());
    }

    if !cmd.confirm {
        println!("\n=== 预览模式 ===");
        println!("使用 --confirm 确认执行\n");
        for step in &plan.steps {
            let backup = if step.requires_backup { " [备份]" } else { "" };
            println!("  {}{}", step.action.describe(), backup);
        }
        println!("\n共 {} 个步骤", plan.steps.len());
        store.save(&plan)?;
        println!("计划已保存: {} (可用 --resume {} 续跑)", plan.id, plan.id);
        return Ok(());
    }

    let vault = if cmd.no_backup || !config.backup.enabled {
        None
    } else {
        Some(match &config.backup.dir {
            Some(dir) => BackupVault::open(dir)?,
            None => BackupVault::open_default()?,
        })
    };

    println!("\n=== 开始清除 ===\n");
    let (plan, report) = remover::execute_plan(
        plan,
        Arc::new(SystemRunner::new()),
        vault.as_ref().map(|v| v as &dyn remover::StepVault),
        &config.removal,
        Some(&store),
        &events,
        &cancel,
    )
    .await?;

    for step in &plan.steps {
        let detail = step
            .next_action
            .as_deref()
            .or(step.error.as_deref())
            .map(|s| format!(" - {}", s))
            .unwrap_or_default();
        println!("  [{}] {}{}", step.status, step.action.describe(), detail);
    }

    println!("\n--- 清除结束: {} ---", plan.status);
    println!("  成功: {}", report.succeeded);
    println!("  被占用: {}", report.failed_locked);
    println!("  失败: {}", report.failed_fatal);
    println!("  释放空间: {}", utils::format_size(report.bytes_freed));
    if report.reboot_required {
        println!("\n部分文件被占用，已登记重启后删除，请重启系统完成清理");
    }
    if report.cancelled {
        println!("\n已取消，剩余步骤可用 --resume {} 续跑", plan.id);
    }
    if plan.status == PlanStatus::Aborted {
        println!("\n备份目录不可用，未执行任何删除；检查磁盘空间后重试");
    }

    let failed = plan
        .steps
        .iter()
        .any(|s| matches!(s.status, StepStatus::FailedFatal));
    if failed && !report.cancelled {
        std::process::exit(2);
    }
    Ok(())
}

/// Ctrl+C 触发软取消，当前步骤执行完后停止
fn ctrlc_handler(cancel: CancelFlag) {
    let result = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            println!("\n收到中断信号，当前步骤完成后停止...");
            cancel.cancel();
        }
    });
    drop(result);
}
