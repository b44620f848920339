use super::models::Fingerprint;
use crate::modules::common::error::SweeperError;
use crate::modules::common::utils;
use std::path::{Path, PathBuf};
use tracing::info;

/// 已保存指纹的 JSON 存储，单文件列表
pub struct FingerprintStore {
    path: PathBuf,
}

impl FingerprintStore {
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, SweeperError> {
        std::fs::create_dir_all(dir.as_ref())?;
        Ok(Self {
            path: dir.as_ref().join("fingerprints.json"),
        })
    }

    pub fn open_default() -> Result<Self, SweeperError> {
        Self::open(crate::modules::common::config::data_dir())
    }

    pub fn load_all(&self) -> Result<Vec<Fingerprint>, SweeperError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_str(&std::fs::read_to_string(&self.path)?)?)
    }

    /// 保存指纹，同名覆盖
    pub fn save(&self, fingerprint: &Fingerprint) -> Result<(), SweeperError> {
        let mut all = self.load_all()?;
        all.retain(|f| !f.name.eq_ignore_ascii_case(&fingerprint.name));
        all.push(fingerprint.clone());
        all.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        std::fs::write(&self.path, serde_json::to_string_pretty(&all)?)?;
        info!("指纹已保存: {}", fingerprint.name);
        Ok(())
    }

    /// 按名称查找，先精确后模糊
    pub fn find(&self, name: &str) -> Result<Option<Fingerprint>, SweeperError> {
        let all = self.load_all()?;
        if let Some(exact) = all.iter().find(|f| f.name.eq_ignore_ascii_case(name)) {
            return Ok(Some(exact.clone()));
        }

        let mut best: Option<(i64, &Fingerprint)> = None;
        for fp in &all {
            let score = utils::fuzzy_score(&fp.name, name);
            if score > 0 && best.map(|(s, _)| score > s).unwrap_or(true) {
                best = Some((score, fp));
            }
        }
        Ok(best.map(|(_, f)| f.clone()))
    }

    pub fn remove(&self, name: &str) -> Result<bool, SweeperError> {
        let mut all = self.load_all()?;
        let before = all.len();
        all.retain(|f| !f.name.eq_ignore_ascii_case(name));
        if all.len() == before {
            return Ok(false);
        }
        std::fs::write(&self.path, serde_json::to_string_pretty(&all)?)?;
        Ok(true)
    }
}
