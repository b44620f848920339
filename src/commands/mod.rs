pub mod backup;
pub mod clean;
pub mod diff;
pub mod monitor;
pub mod rules;
pub mod scan;
pub mod snapshot;

use clap::Subcommand;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// 采集系统快照
    Snapshot(snapshot::SnapshotCommand),

    /// 对比两个快照
    Diff(diff::DiffCommand),

    /// 监控安装过程 (begin/commit/list)
    Monitor(monitor::MonitorCommand),

    /// 扫描程序残留
    Scan(scan::ScanCommand),

    /// 清除程序残留
    Clean(clean::CleanCommand),

    /// 管理顽固程序规则库
    Rules(rules::RulesCommand),

    /// 管理备份
    Backup(backup::BackupCommand),
}
