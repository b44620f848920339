use crate::modules::common::config::SweeperConfig;
use crate::modules::common::events::EventLog;
use crate::modules::common::utils;
use crate::modules::diff::{self, InstallRecord, InstallRecordStore, MonitorSession, SessionStore};
use crate::modules::snapshot::{self, SnapshotScope, SnapshotStore};
use anyhow::Result;
use chrono::Utc;
use clap::Parser;

#[derive(Parser, Debug)]
pub struct MonitorCommand {
    /// 操作: begin / commit / list / abort
    pub action: String,

    /// 程序名称 (begin 时必填)
    pub program: Option<String>,
}

pub async fn execute(cmd: MonitorCommand) -> Result<()> {
    match cmd.action.as_str() {
        "begin" => begin(cmd.program).await,
        "commit" => commit().await,
        "list" => list(),
        "abort" => abort(),
        other => anyhow::bail!("未知操作: {} (支持 begin/commit/list/abort)", other),
    }
}

async fn begin(program: Option<String>) -> Result<()> {
    let program = program.ok_or_else(|| anyhow::anyhow!("begin 需要指定程序名称"))?;
    let sessions = SessionStore::open_default()?;

    if let Some(pending) = sessions.load()? {
        anyhow::bail!(
            "已有未提交的监控会话 ({}), 先执行 commit 或 abort",
            pending.program
        );
    }

    let config = SweeperConfig::load();
    let scope = SnapshotScope::from_config(&config.monitor, &config.scan);

    println!("正在采集安装前快照...");
    let before = snapshot::capture(&scope, &EventLog::disabled()).await?;
    SnapshotStore::open_default()?.save(&before)?;

    sessions.save(&MonitorSession {
        program: program.clone(),
        before_snapshot_id: before.id.clone(),
        started_at: Utc::now(),
    })?;

    println!("监控已开始: {}", program);
    println!("现在安装程序，完成后执行: rust-sweep monitor commit");
    Ok(())
}

async fn commit() -> Result<()> {
    let sessions = SessionStore::open_default()?;
    let session = sessions
        .load()?
        .ok_or_else(|| anyhow::anyhow!("没有进行中的监控会话，先执行 begin"))?;

    let config = SweeperConfig::load();
    let scope = SnapshotScope::from_config(&config.monitor, &config.scan);

    println!("正在采集安装后快照...");
    let snapshots = SnapshotStore::open_default()?;
    let after = snapshot::capture(&scope, &EventLog::disabled()).await?;
    snapshots.save(&after)?;

    let before = snapshots.load(&session.before_snapshot_id)?;
    let changes = diff::diff(&before, &after);

    let fingerprint = diff::derive_fingerprint(&session.program, &changes);
    let record = InstallRecord {
        id: utils::generate_id(),
        fingerprint,
        before_snapshot_id: before.id.clone(),
        after_snapshot_id: after.id.clone(),
        change_set: changes,
        created_at: Utc::now(),
    };
    InstallRecordStore::open_default()?.save(&record)?;
    sessions.clear()?;

    println!(
        "安装记录已保存: {} ({} 处变更)",
        record.id,
        record.change_set.total()
    );
    if !record.fingerprint.install_paths.is_empty() {
        println!("识别到安装目录: {}", record.fingerprint.install_paths.join(", "));
    }
    Ok(())
}

fn list() -> Result<()> {
    let records = InstallRecordStore::open_default()?.list()?;
    if records.is_empty() {
        println!("暂无安装记录");
        return Ok(());
    }
    println!("共 {} 条安装记录:\n", records.len());
    for (id, program, changes) in records {
        println!("  {}  {}  {} 处变更", id, program, changes);
    }
    Ok(())
}

fn abort() -> Result<()> {
    let sessions = SessionStore::open_default()?;
    match sessions.load()? {
        Some(session) => {
            sessions.clear()?;
            println!("已放弃监控会话: {}", session.program);
        }
        None => println!("没有进行中的监控会话"),
    }
    Ok(())
}
