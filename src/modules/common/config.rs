//! 配置管理
//!
//! JSON 持久化配置，默认存放在本地数据目录下，各节提供保守默认值。

use crate::modules::common::error::SweeperError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SweeperConfig {
    pub scan: ScanConfig,
    pub removal: RemovalConfig,
    pub backup: BackupConfig,
    pub monitor: MonitorConfig,
}

/// 残留扫描配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// 文件系统/注册表遍历最大深度
    pub max_depth: usize,
    /// 自动编入清理计划的最低置信度
    pub include_threshold: f64,
    /// 搜索模式的最小长度，过短的模式误报太多
    pub min_pattern_len: usize,
    /// 快照时是否对小文件计算内容哈希
    pub hash_files: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            max_depth: 5,
            include_threshold: 0.5,
            min_pattern_len: 3,
            hash_files: false,
        }
    }
}

/// 移除执行配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemovalConfig {
    /// 锁定资源的最大尝试次数
    pub max_attempts: u32,
    /// 指数退避基础延迟 (毫秒)
    pub base_delay_ms: u64,
    /// 外部子进程步骤超时 (秒)
    pub subprocess_timeout_secs: u64,
    /// 是否允许无冲突步骤并发执行
    pub parallel: bool,
}

impl Default for RemovalConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 500,
            subprocess_timeout_secs: 600,
            parallel: false,
        }
    }
}

/// 备份配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackupConfig {
    pub enabled: bool,
    /// 备份保留天数
    pub keep_days: i64,
    /// 备份目录覆盖 (默认在数据目录下)
    pub dir: Option<String>,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            keep_days: 30,
            dir: None,
        }
    }
}

/// 安装监控配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// 监控的文件系统根 (支持 %VAR% 形式)
    pub paths: Vec<String>,
    /// 监控的注册表根 (如 "HKLM\\Software")
    pub registry_roots: Vec<String>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            paths: vec![
                "%ProgramFiles%".to_string(),
                "%ProgramFiles(x86)%".to_string(),
                "%APPDATA%".to_string(),
                "%LOCALAPPDATA%".to_string(),
                "%ProgramData%".to_string(),
            ],
            registry_roots: vec![
                r"HKLM\Software\Microsoft\Windows\CurrentVersion\Uninstall".to_string(),
                r"HKLM\Software\WOW6432Node\Microsoft\Windows\CurrentVersion\Uninstall".to_string(),
                r"HKCU\Software\Microsoft\Windows\CurrentVersion\Uninstall".to_string(),
                r"HKLM\Software".to_string(),
                r"HKCU\Software".to_string(),
            ],
        }
    }
}

/// 应用数据目录，可用环境变量覆盖 (测试用)
pub fn data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("RUST_SWEEP_DATA_DIR") {
        return PathBuf::from(dir);
    }
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("rust-sweep")
}

fn config_file() -> PathBuf {
    data_dir().join("config.json")
}

impl SweeperConfig {
    /// 从默认位置加载配置，缺失时返回默认值
    pub fn load() -> Self {
        Self::load_from(&config_file()).unwrap_or_default()
    }

    pub fn load_from(path: &Path) -> Result<Self, SweeperError> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| SweeperError::Serde(e.to_string()))
    }

    pub fn save(&self) -> Result<(), SweeperError> {
        self.save_to(&config_file())
    }

    pub fn save_to(&self, path: &Path) -> Result<(), SweeperError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| SweeperError::Serde(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = SweeperConfig::default();
        assert_eq!(config.scan.max_depth, 5);
        assert_eq!(config.scan.include_threshold, 0.5);
        assert_eq!(config.removal.max_attempts, 3);
        assert_eq!(config.removal.base_delay_ms, 500);
        assert_eq!(config.backup.keep_days, 30);
        assert!(!config.removal.parallel);
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = std::env::temp_dir().join(format!("rust-sweep-config-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.json");

        let mut config = SweeperConfig::default();
        config.removal.max_attempts = 7;
        config.save_to(&path).unwrap();

        let loaded = SweeperConfig::load_from(&path).unwrap();
        assert_eq!(loaded.removal.max_attempts, 7);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn partial_config_file_fills_defaults() {
        let parsed: SweeperConfig =
            serde_json::from_str(r#"{"removal": {"max_attempts": 9}}"#).unwrap();
        assert_eq!(parsed.removal.max_attempts, 9);
        assert_eq!(parsed.removal.base_delay_ms, 500);
        assert_eq!(parsed.scan.max_depth, 5);
    }
}
