use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 备份条目类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BackupKind {
    File,
    Directory,
    RegistryKey,
}

/// 单个步骤的备份记录
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupRecord {
    pub step_id: String,
    pub kind: BackupKind,
    /// 被备份对象的原始定位符
    pub original_locator: String,
    /// 金库内的相对存储路径
    pub storage_location: String,
    /// 文件备份的 SHA-256，目录与注册表为 None
    pub checksum: Option<String>,
    pub restorable: bool,
    pub created_at: DateTime<Utc>,
}

/// 一个计划的备份清单
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupManifest {
    pub plan_id: String,
    pub created_at: DateTime<Utc>,
    pub entries: Vec<BackupRecord>,
}

impl BackupManifest {
    pub fn new(plan_id: impl Into<String>) -> Self {
        Self {
            plan_id: plan_id.into(),
            created_at: Utc::now(),
            entries: Vec::new(),
        }
    }

    pub fn find(&self, step_id: &str) -> Option<&BackupRecord> {
        self.entries.iter().find(|e| e.step_id == step_id)
    }
}
