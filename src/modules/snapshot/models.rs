use crate::modules::common::config::{MonitorConfig, ScanConfig};
use crate::modules::common::utils;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// 注册表根
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Hive {
    Hklm,
    Hkcu,
    Hkcr,
    Hku,
    Hkcc,
}

impl std::fmt::Display for Hive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Hive::Hklm => write!(f, "HKLM"),
            Hive::Hkcu => write!(f, "HKCU"),
            Hive::Hkcr => write!(f, "HKCR"),
            Hive::Hku => write!(f, "HKU"),
            Hive::Hkcc => write!(f, "HKCC"),
        }
    }
}

/// 解析完整注册表路径 (如 "HKLM\Software\Demo") 为 (根, 子路径)
pub fn parse_registry_path(path: &str) -> Option<(Hive, String)> {
    let path = path.trim();
    let (prefix, rest) = path.split_once('\\')?;

    let hive = match prefix.to_uppercase().as_str() {
        "HKLM" | "HKEY_LOCAL_MACHINE" => Hive::Hklm,
        "HKCU" | "HKEY_CURRENT_USER" => Hive::Hkcu,
        "HKCR" | "HKEY_CLASSES_ROOT" => Hive::Hkcr,
        "HKU" | "HKEY_USERS" => Hive::Hku,
        "HKCC" | "HKEY_CURRENT_CONFIG" => Hive::Hkcc,
        _ => return None,
    };

    Some((hive, rest.to_string()))
}

/// 文件系统条目 (文件或目录)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileEntry {
    pub path: String,
    pub is_dir: bool,
    pub size: Option<u64>,
    pub modified: Option<DateTime<Utc>>,
    pub content_hash: Option<String>,
}

impl FileEntry {
    /// 跨快照比较键
    pub fn key(&self) -> String {
        utils::normalize_path(&self.path)
    }
}

/// 注册表条目；`value_name` 为 None 时表示键本身
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistryEntry {
    pub hive: Hive,
    pub key_path: String,
    pub value_name: Option<String>,
    pub value_data: Option<String>,
    pub value_type: Option<String>,
}

impl RegistryEntry {
    pub fn key(&self) -> String {
        format!(
            "{}\\{}::{}",
            self.hive,
            self.key_path.to_lowercase(),
            self.value_name
                .as_deref()
                .map(|v| v.to_lowercase())
                .unwrap_or_default()
        )
    }

    /// 完整展示路径 (不含值名)
    pub fn full_key_path(&self) -> String {
        format!("{}\\{}", self.hive, self.key_path)
    }
}

/// 服务条目
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceEntry {
    pub name: String,
    pub display_name: String,
    pub start_type: String,
}

impl ServiceEntry {
    pub fn key(&self) -> String {
        self.name.to_lowercase()
    }
}

/// 计划任务条目
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskEntry {
    pub name: String,
    pub path: String,
}

impl TaskEntry {
    pub fn key(&self) -> String {
        self.path.to_lowercase()
    }
}

/// 某一时刻的系统状态快照；创建后不再修改
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    /// 存在无法访问的子树时为 true
    pub partial: bool,
    pub warnings: Vec<String>,
    pub files: Vec<FileEntry>,
    pub registry: Vec<RegistryEntry>,
    pub services: Vec<ServiceEntry>,
    pub tasks: Vec<TaskEntry>,
}

impl Snapshot {
    pub fn total_entries(&self) -> usize {
        self.files.len() + self.registry.len() + self.services.len() + self.tasks.len()
    }
}

/// 快照范围：限定要采集的域和根，控制成本
#[derive(Debug, Clone)]
pub struct SnapshotScope {
    pub file_roots: Vec<PathBuf>,
    pub registry_roots: Vec<(Hive, String)>,
    pub include_services: bool,
    pub include_tasks: bool,
    pub max_depth: usize,
    pub hash_files: bool,
}

impl SnapshotScope {
    /// 空范围，调用方逐项加入
    pub fn empty() -> Self {
        Self {
            file_roots: Vec::new(),
            registry_roots: Vec::new(),
            include_services: false,
            include_tasks: false,
            max_depth: 5,
            hash_files: false,
        }
    }

    /// 由配置构建监控范围：展开 %VAR%，解析不了的根丢弃
    pub fn from_config(monitor: &MonitorConfig, scan: &ScanConfig) -> Self {
        let file_roots = monitor
            .paths
            .iter()
            .map(|p| utils::expand_env_vars(p))
            .filter(|p| !p.contains('%') && !p.is_empty())
            .map(PathBuf::from)
            .collect();

        let registry_roots = monitor
            .registry_roots
            .iter()
            .filter_map(|p| parse_registry_path(p))
            .collect();

        Self {
            file_roots,
            registry_roots,
            include_services: true,
            include_tasks: true,
            max_depth: scan.max_depth,
            hash_files: scan.hash_files,
        }
    }

    /// 默认监控范围：程序目录、用户数据目录与常见注册表根
    pub fn default_monitor(max_depth: usize) -> Self {
        let mut scope = Self::from_config(&MonitorConfig::default(), &ScanConfig::default());
        scope.max_depth = max_depth;
        scope
    }

    pub fn with_file_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.file_roots.push(root.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_registry_path_accepts_short_and_long_prefixes() {
        assert_eq!(
            parse_registry_path(r"HKLM\Software\Demo"),
            Some((Hive::Hklm, "Software\\Demo".to_string()))
        );
        assert_eq!(
            parse_registry_path(r"HKEY_CURRENT_USER\Software"),
            Some((Hive::Hkcu, "Software".to_string()))
        );
        assert_eq!(parse_registry_path("NOPE\\x"), None);
    }

    #[test]
    fn registry_entry_key_is_case_insensitive() {
        let a = RegistryEntry {
            hive: Hive::Hklm,
            key_path: r"Software\Demo".to_string(),
            value_name: Some("InstallDir".to_string()),
            value_data: None,
            value_type: None,
        };
        let b = RegistryEntry {
            hive: Hive::Hklm,
            key_path: r"SOFTWARE\demo".to_string(),
            value_name: Some("installdir".to_string()),
            value_data: None,
            value_type: None,
        };
        assert_eq!(a.key(), b.key());
    }

    #[test]
    fn scope_from_config_drops_unresolved_roots() {
        std::env::set_var("SWEEP_SCOPE_TEST", "/tmp/scope");
        let monitor = MonitorConfig {
            paths: vec![
                "%SWEEP_SCOPE_TEST%".to_string(),
                "%SWEEP_SCOPE_NO_SUCH_VAR%".to_string(),
            ],
            registry_roots: vec![
                r"HKCU\Software".to_string(),
                "BOGUS".to_string(),
            ],
        };
        let scope = SnapshotScope::from_config(&monitor, &ScanConfig::default());
        assert_eq!(scope.file_roots, vec![PathBuf::from("/tmp/scope")]);
        assert_eq!(scope.registry_roots.len(), 1);
        std::env::remove_var("SWEEP_SCOPE_TEST");
    }

    #[test]
    fn file_entry_key_uses_normalized_path() {
        let entry = FileEntry {
            path: r"C:/Apps/Demo\".to_string(),
            is_dir: true,
            size: None,
            modified: None,
            content_hash: None,
        };
        assert_eq!(entry.key(), r"c:\apps\demo");
    }
}
