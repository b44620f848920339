pub mod models;

pub use models::{MatchRule, StepTemplate, StubbornAppRule};

use crate::modules::common::error::SweeperError;
use crate::modules::common::utils;
use crate::modules::scanner::models::Fingerprint;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use tracing::{info, warn};

/// 顽固程序规则库，JSON 文件 + 内存索引
///
/// reload 整体换掉 Arc，读取方不受写入影响
pub struct RuleDatabase {
    path: PathBuf,
    index: RwLock<Arc<Vec<StubbornAppRule>>>,
}

impl RuleDatabase {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, SweeperError> {
        let path = path.into();
        let rules = Self::load_file(&path)?;
        info!("规则库已加载: {} 条规则", rules.len());
        Ok(Self {
            path,
            index: RwLock::new(Arc::new(rules)),
        })
    }

    pub fn open_default() -> Result<Self, SweeperError> {
        Self::open(crate::modules::common::config::data_dir().join("stubborn_rules.json"))
    }

    fn load_file(path: &Path) -> Result<Vec<StubbornAppRule>, SweeperError> {
        if !path.exists() {
            warn!("规则库文件不存在，使用空规则集: {}", path.display());
            return Ok(Vec::new());
        }
        let json = std::fs::read_to_string(path)?;
        serde_json::from_str(&json)
            .map_err(|e| SweeperError::RuleDatabase(format!("规则文件解析失败: {}", e)))
    }

    /// 重新读取规则文件并整体替换索引
    pub fn reload(&self) -> Result<usize, SweeperError> {
        let rules = Self::load_file(&self.path)?;
        let count = rules.len();
        if let Ok(mut index) = self.index.write() {
            *index = Arc::new(rules);
        }
        info!("规则库已重载: {} 条规则", count);
        Ok(count)
    }

    fn snapshot(&self) -> Arc<Vec<StubbornAppRule>> {
        self.index
            .read()
            .map(|guard| Arc::clone(&guard))
            .unwrap_or_else(|poisoned| Arc::clone(&poisoned.into_inner()))
    }

    /// 解析指纹命中的规则，按文件顺序取第一条
    pub fn resolve(&self, fingerprint: &Fingerprint) -> Option<StubbornAppRule> {
        self.snapshot()
            .iter()
            .find(|rule| rule.matches(fingerprint))
            .cloned()
    }

    pub fn all(&self) -> Vec<StubbornAppRule> {
        self.snapshot().as_ref().clone()
    }

    /// 按规则名模糊查找
    pub fn find(&self, name: &str) -> Option<StubbornAppRule> {
        let rules = self.snapshot();
        if let Some(exact) = rules.iter().find(|r| r.name.eq_ignore_ascii_case(name)) {
            return Some(exact.clone());
        }
        rules
            .iter()
            .map(|r| (utils::fuzzy_score(&r.name, name), r))
            .filter(|(score, _)| *score > 0)
            .max_by_key(|(score, _)| *score)
            .map(|(_, r)| r.clone())
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
