use crate::modules::scanner::models::Fingerprint;
use crate::modules::snapshot::models::{FileEntry, RegistryEntry, ServiceEntry, TaskEntry};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 变更前后对
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Modified<T> {
    pub before: T,
    pub after: T,
}

/// 单个域的差异结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryDiff<T> {
    pub added: Vec<T>,
    pub removed: Vec<T>,
    pub modified: Vec<Modified<T>>,
}

impl<T> Default for EntryDiff<T> {
    fn default() -> Self {
        Self {
            added: Vec::new(),
            removed: Vec::new(),
            modified: Vec::new(),
        }
    }
}

impl<T> EntryDiff<T> {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.modified.is_empty()
    }

    pub fn total(&self) -> usize {
        self.added.len() + self.removed.len() + self.modified.len()
    }
}

/// 两个快照之间的完整差异
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeSet {
    pub from_snapshot_id: String,
    pub to_snapshot_id: String,
    pub files: EntryDiff<FileEntry>,
    pub registry: EntryDiff<RegistryEntry>,
    pub services: EntryDiff<ServiceEntry>,
    pub tasks: EntryDiff<TaskEntry>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
            && self.registry.is_empty()
            && self.services.is_empty()
            && self.tasks.is_empty()
    }

    pub fn total(&self) -> usize {
        self.files.total() + self.registry.total() + self.services.total() + self.tasks.total()
    }
}

/// 一次被监控安装的留痕记录
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstallRecord {
    pub id: String,
    /// 从留痕推导出的程序指纹，后续扫描/清除可直接复用
    pub fingerprint: Fingerprint,
    pub before_snapshot_id: String,
    pub after_snapshot_id: String,
    pub change_set: ChangeSet,
    pub created_at: DateTime<Utc>,
}

/// begin 与 commit 之间持久化的监控会话
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorSession {
    pub program: String,
    pub before_snapshot_id: String,
    pub started_at: DateTime<Utc>,
}
