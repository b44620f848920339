use super::models::{InstallRecord, MonitorSession};
use crate::modules::common::error::SweeperError;
use std::path::{Path, PathBuf};
use tracing::info;

/// 安装留痕记录的持久化目录
pub struct InstallRecordStore {
    dir: PathBuf,
}

impl InstallRecordStore {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, SweeperError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn open_default() -> Result<Self, SweeperError> {
        Self::open(crate::modules::common::config::data_dir().join("records"))
    }

    fn path_for(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", id))
    }

    pub fn save(&self, record: &InstallRecord) -> Result<PathBuf, SweeperError> {
        let path = self.path_for(&record.id);
        std::fs::write(&path, serde_json::to_string_pretty(record)?)?;
        info!("安装记录已保存: {} ({})", record.id, record.fingerprint.name);
        Ok(path)
    }

    pub fn load(&self, id: &str) -> Result<InstallRecord, SweeperError> {
        let path = self.path_for(id);
        if !path.exists() {
            return Err(SweeperError::NotFound(format!("安装记录不存在: {}", id)));
        }
        Ok(serde_json::from_str(&std::fs::read_to_string(&path)?)?)
    }

    /// 按时间倒序列出 (id, 程序名, 变更条数)
    pub fn list(&self) -> Result<Vec<(String, String, usize)>, SweeperError> {
        Ok(self
            .load_all()?
            .into_iter()
            .map(|r| (r.id, r.fingerprint.name, r.change_set.total()))
            .collect())
    }

    /// 按程序名查最近一条安装记录
    pub fn find_for_program(&self, name: &str) -> Result<Option<InstallRecord>, SweeperError> {
        Ok(self
            .load_all()?
            .into_iter()
            .find(|r| r.fingerprint.name.eq_ignore_ascii_case(name)))
    }

    fn load_all(&self) -> Result<Vec<InstallRecord>, SweeperError> {
        let mut records = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().map(|e| e == "json").unwrap_or(false) {
                if let Ok(json) = std::fs::read_to_string(&path) {
                    if let Ok(record) = serde_json::from_str::<InstallRecord>(&json) {
                        records.push(record);
                    }
                }
            }
        }
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }
}

/// begin/commit 之间挂起的监控会话，单文件存储
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, SweeperError> {
        std::fs::create_dir_all(dir.as_ref())?;
        Ok(Self {
            path: dir.as_ref().join("monitor_pending.json"),
        })
    }

    pub fn open_default() -> Result<Self, SweeperError> {
        Self::open(crate::modules::common::config::data_dir())
    }

    pub fn save(&self, session: &MonitorSession) -> Result<(), SweeperError> {
        std::fs::write(&self.path, serde_json::to_string_pretty(session)?)?;
        Ok(())
    }

    pub fn load(&self) -> Result<Option<MonitorSession>, SweeperError> {
        if !self.path.exists() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_str(&std::fs::read_to_string(
            &self.path,
        )?)?))
    }

    pub fn clear(&self) -> Result<(), SweeperError> {
        if self.path.exists() {
            std::fs::remove_file(&self.path)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::diff::models::ChangeSet;
    use crate::modules::scanner::models::Fingerprint;
    use chrono::Utc;
    use uuid::Uuid;

    fn record(name: &str) -> InstallRecord {
        InstallRecord {
            id: Uuid::new_v4().to_string(),
            fingerprint: Fingerprint::named(name),
            before_snapshot_id: "before".to_string(),
            after_snapshot_id: "after".to_string(),
            change_set: ChangeSet {
                from_snapshot_id: "before".to_string(),
                to_snapshot_id: "after".to_string(),
                files: Default::default(),
                registry: Default::default(),
                services: Default::default(),
                tasks: Default::default(),
            },
            created_at: Utc::now(),
        }
    }

    #[test]
    fn find_for_program_matches_by_fingerprint_name() {
        let dir = std::env::temp_dir().join(format!("sweep-rec-{}", Uuid::new_v4()));
        let store = InstallRecordStore::open(&dir).unwrap();

        let mut saved = record("DemoApp");
        saved.fingerprint.install_paths = vec![r"C:\Apps\Demo".to_string()];
        store.save(&saved).unwrap();
        store.save(&record("OtherApp")).unwrap();

        let found = store.find_for_program("demoapp").unwrap().unwrap();
        assert_eq!(found.id, saved.id);
        assert_eq!(found.fingerprint.install_paths, [r"C:\Apps\Demo".to_string()]);
        assert!(store.find_for_program("missing").unwrap().is_none());

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn session_round_trip_and_clear() {
        let dir = std::env::temp_dir().join(format!("sweep-sess-{}", Uuid::new_v4()));
        let store = SessionStore::open(&dir).unwrap();

        assert!(store.load().unwrap().is_none());

        let session = MonitorSession {
            program: "DemoApp".to_string(),
            before_snapshot_id: "snap-1".to_string(),
            started_at: Utc::now(),
        };
        store.save(&session).unwrap();

        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded.program, "DemoApp");
        assert_eq!(loaded.before_snapshot_id, "snap-1");

        store.clear().unwrap();
        assert!(store.load().unwrap().is_none());

        std::fs::remove_dir_all(&dir).ok();
    }
}
