use super::models::Snapshot;
use crate::modules::common::error::SweeperError;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// 快照持久化目录，每个快照一个 JSON 文件
pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, SweeperError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// 默认位置：数据目录下 snapshots/
    pub fn open_default() -> Result<Self, SweeperError> {
        Self::open(crate::modules::common::config::data_dir().join("snapshots"))
    }

    pub fn path_for(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", id))
    }

    pub fn save(&self, snapshot: &Snapshot) -> Result<PathBuf, SweeperError> {
        let path = self.path_for(&snapshot.id);
        let json = serde_json::to_string_pretty(snapshot)?;
        std::fs::write(&path, json)?;
        info!("快照已保存: {} ({} 条记录)", path.display(), snapshot.total_entries());
        Ok(path)
    }

    pub fn load(&self, id: &str) -> Result<Snapshot, SweeperError> {
        let path = self.path_for(id);
        if !path.exists() {
            return Err(SweeperError::NotFound(format!("快照不存在: {}", id)));
        }
        let json = std::fs::read_to_string(&path)?;
        let snapshot = serde_json::from_str(&json)?;
        debug!("快照已加载: {}", id);
        Ok(snapshot)
    }

    /// 按时间倒序列出所有快照的 (id, 时间戳, 条目数)
    pub fn list(&self) -> Result<Vec<(String, chrono::DateTime<chrono::Utc>, usize)>, SweeperError> {
        let mut items = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().map(|e| e == "json").unwrap_or(false) {
                if let Ok(json) = std::fs::read_to_string(&path) {
                    if let Ok(snapshot) = serde_json::from_str::<Snapshot>(&json) {
                        let entries = snapshot.total_entries();
                        items.push((snapshot.id, snapshot.timestamp, entries));
                    }
                }
            }
        }
        items.sort_by(|a, b| b.1.cmp(&a.1));
        Ok(items)
    }

    pub fn remove(&self, id: &str) -> Result<(), SweeperError> {
        let path = self.path_for(id);
        if path.exists() {
            std::fs::remove_file(&path)?;
        }
        Ok(())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}
