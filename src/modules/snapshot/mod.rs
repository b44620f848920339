pub mod filesystem;
pub mod models;
pub mod registry;
pub mod services;
pub mod store;
pub mod tasks;

pub use models::{
    FileEntry, Hive, RegistryEntry, ServiceEntry, Snapshot, SnapshotScope, TaskEntry,
};
pub use store::SnapshotStore;

use crate::modules::common::error::SweeperError;
use crate::modules::common::events::EventLog;
use crate::modules::common::utils;
use chrono::Utc;
use tracing::info;

/// 按给定范围采集一次系统快照
///
/// 各域并行采集；无法访问的子树降级为警告并标记 partial
pub async fn capture(scope: &SnapshotScope, events: &EventLog) -> Result<Snapshot, SweeperError> {
    let id = utils::generate_id();
    info!("开始采集快照 {} ({} 个文件根)", id, scope.file_roots.len());
    events.emit("snapshot", "capture_start", &id, "开始");

    let mut file_handles = Vec::new();
    for root in &scope.file_roots {
        let root = root.clone();
        let max_depth = scope.max_depth;
        let hash_files = scope.hash_files;
        file_handles.push(tokio::task::spawn_blocking(move || {
            filesystem::collect_root(&root, max_depth, hash_files)
        }));
    }

    let mut registry_handles = Vec::new();
    for (hive, key_path) in &scope.registry_roots {
        let hive = *hive;
        let key_path = key_path.clone();
        let max_depth = scope.max_depth;
        registry_handles.push(tokio::task::spawn_blocking(move || {
            registry::collect_root(hive, &key_path, max_depth)
        }));
    }

    let services_handle = scope
        .include_services
        .then(|| tokio::task::spawn_blocking(services::collect));
    let tasks_handle = scope
        .include_tasks
        .then(|| tokio::task::spawn_blocking(tasks::collect));

    let mut files = Vec::new();
    let mut registry = Vec::new();
    let mut warnings = Vec::new();

    for handle in file_handles {
        let (entries, warns) = handle
            .await
            .map_err(|e| SweeperError::Other(format!("文件采集任务失败: {}", e)))?;
        files.extend(entries);
        warnings.extend(warns);
    }
    for handle in registry_handles {
        let (entries, warns) = handle
            .await
            .map_err(|e| SweeperError::Other(format!("注册表采集任务失败: {}", e)))?;
        registry.extend(entries);
        warnings.extend(warns);
    }

    let (service_entries, service_warnings) = match services_handle {
        Some(h) => h
            .await
            .map_err(|e| SweeperError::Other(format!("服务采集任务失败: {}", e)))?,
        None => (Vec::new(), Vec::new()),
    };
    let (task_entries, task_warnings) = match tasks_handle {
        Some(h) => h
            .await
            .map_err(|e| SweeperError::Other(format!("计划任务采集失败: {}", e)))?,
        None => (Vec::new(), Vec::new()),
    };
    warnings.extend(service_warnings);
    warnings.extend(task_warnings);

    let snapshot = Snapshot {
        id: id.clone(),
        timestamp: Utc::now(),
        partial: !warnings.is_empty(),
        warnings,
        files,
        registry,
        services: service_entries,
        tasks: task_entries,
    };

    info!(
        "快照 {} 采集完成: {} 条记录, {} 条警告",
        id,
        snapshot.total_entries(),
        snapshot.warnings.len()
    );
    events.emit("snapshot", "capture_done", &id, "完成");
    Ok(snapshot)
}
