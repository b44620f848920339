use super::models::Fingerprint;
use crate::modules::common::utils;

/// 安装路径精确命中
pub const CONFIDENCE_INSTALL_PATH: f64 = 0.95;
/// 产品标识命中
pub const CONFIDENCE_PRODUCT_ID: f64 = 0.95;
/// 名称子串命中
pub const CONFIDENCE_NAME: f64 = 0.6;
/// 仅发布者命中
pub const CONFIDENCE_PUBLISHER: f64 = 0.3;

/// 指纹派生出的匹配器，扫描前构建一次
pub struct FingerprintMatcher {
    /// 规范化后的名称模式
    name_patterns: Vec<String>,
    publisher_pattern: Option<String>,
    install_paths: Vec<String>,
    product_id: Option<String>,
}

impl FingerprintMatcher {
    pub fn build(fingerprint: &Fingerprint, min_pattern_len: usize) -> Self {
        let mut name_patterns = Vec::new();

        let raw = fingerprint.name.trim().to_lowercase();
        if raw.len() >= min_pattern_len {
            name_patterns.push(raw.clone());
        }
        // 去掉尾部版本号后再取一个模式，如 "demo app 2.1" -> "demo app"
        let stripped = utils::normalize_name(&fingerprint.name);
        if stripped.len() >= min_pattern_len && stripped != raw {
            name_patterns.push(stripped);
        }

        let publisher_pattern = fingerprint
            .publisher
            .as_deref()
            .map(|p| p.trim().to_lowercase())
            .filter(|p| p.len() >= min_pattern_len);

        let install_paths = fingerprint
            .install_paths
            .iter()
            .map(|p| utils::normalize_path(p))
            .filter(|p| !p.is_empty())
            .collect();

        let product_id = fingerprint
            .product_id
            .as_deref()
            .map(|id| id.trim().to_lowercase())
            .filter(|id| !id.is_empty());

        Self {
            name_patterns,
            publisher_pattern,
            install_paths,
            product_id,
        }
    }

    /// 路径类定位符打分；多种来源命中时取最高分
    pub fn score_path(&self, path: &str) -> f64 {
        let normalized = utils::normalize_path(path);
        let mut score: f64 = 0.0;

        for install in &self.install_paths {
            if normalized == *install || utils::path_is_under(&normalized, install) {
                score = score.max(CONFIDENCE_INSTALL_PATH);
            }
        }
        if self.name_patterns.iter().any(|p| normalized.contains(p.as_str())) {
            score = score.max(CONFIDENCE_NAME);
        }
        if let Some(publisher) = &self.publisher_pattern {
            if normalized.contains(publisher.as_str()) {
                score = score.max(CONFIDENCE_PUBLISHER);
            }
        }

        score
    }

    /// 注册表键路径 + 值数据打分
    pub fn score_registry(&self, key_path: &str, value_data: Option<&str>) -> f64 {
        let key_lower = key_path.to_lowercase();
        let mut score: f64 = 0.0;

        if let Some(id) = &self.product_id {
            if key_lower.contains(id.as_str()) {
                score = score.max(CONFIDENCE_PRODUCT_ID);
            }
        }
        if self.name_patterns.iter().any(|p| key_lower.contains(p.as_str())) {
            score = score.max(CONFIDENCE_NAME);
        }
        if let Some(publisher) = &self.publisher_pattern {
            if key_lower.contains(publisher.as_str()) {
                score = score.max(CONFIDENCE_PUBLISHER);
            }
        }

        // 值数据中出现安装路径或产品标识同样算强归属
        if let Some(data) = value_data {
            let data_norm = utils::normalize_path(data);
            for install in &self.install_paths {
                if data_norm.contains(install.as_str()) {
                    score = score.max(CONFIDENCE_INSTALL_PATH);
                }
            }
            if let Some(id) = &self.product_id {
                if data_norm.contains(id.as_str()) {
                    score = score.max(CONFIDENCE_PRODUCT_ID);
                }
            }
        }

        score
    }

    /// 服务/任务按名称与发布者打分
    pub fn score_name(&self, name: &str) -> f64 {
        let lower = name.to_lowercase();
        let mut score: f64 = 0.0;

        if self.name_patterns.iter().any(|p| lower.contains(p.as_str())) {
            score = score.max(CONFIDENCE_NAME);
        }
        if let Some(publisher) = &self.publisher_pattern {
            if lower.contains(publisher.as_str()) {
                score = score.max(CONFIDENCE_PUBLISHER);
            }
        }

        score
    }

    pub fn has_patterns(&self) -> bool {
        !self.name_patterns.is_empty()
            || self.publisher_pattern.is_some()
            || !self.install_paths.is_empty()
            || self.product_id.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn demo_fingerprint() -> Fingerprint {
        Fingerprint {
            name: "Demo App 2.1".to_string(),
            publisher: Some("Acme Corp".to_string()),
            install_paths: vec![r"C:\Program Files\Demo App".to_string()],
            product_id: Some("{ABCD-1234}".to_string()),
            uninstall_command: None,
            is_system_component: false,
        }
    }

    #[test]
    fn install_path_hit_beats_name_hit() {
        let matcher = FingerprintMatcher::build(&demo_fingerprint(), 3);
        let score = matcher.score_path(r"C:\Program Files\Demo App\bin\run.exe");
        assert_eq!(score, CONFIDENCE_INSTALL_PATH);
    }

    #[test]
    fn name_substring_scores_medium() {
        let matcher = FingerprintMatcher::build(&demo_fingerprint(), 3);
        let score = matcher.score_path(r"C:\Users\x\AppData\Roaming\Demo App\cache");
        assert_eq!(score, CONFIDENCE_NAME);
    }

    #[test]
    fn publisher_only_scores_low() {
        let matcher = FingerprintMatcher::build(&demo_fingerprint(), 3);
        let score = matcher.score_path(r"C:\ProgramData\Acme Corp\shared.log");
        assert_eq!(score, CONFIDENCE_PUBLISHER);
    }

    #[test]
    fn unrelated_path_scores_zero() {
        let matcher = FingerprintMatcher::build(&demo_fingerprint(), 3);
        assert_eq!(matcher.score_path(r"C:\Windows\System32\kernel32.dll"), 0.0);
    }

    #[test]
    fn product_id_in_registry_key_scores_high() {
        let matcher = FingerprintMatcher::build(&demo_fingerprint(), 3);
        let score = matcher.score_registry(
            r"Software\Microsoft\Windows\CurrentVersion\Uninstall\{abcd-1234}",
            None,
        );
        assert_eq!(score, CONFIDENCE_PRODUCT_ID);
    }

    #[test]
    fn install_path_in_value_data_scores_high() {
        let matcher = FingerprintMatcher::build(&demo_fingerprint(), 3);
        let score = matcher.score_registry(
            r"Software\Classes\Applications\run.exe",
            Some(r"C:\Program Files\Demo App\run.exe"),
        );
        assert_eq!(score, CONFIDENCE_INSTALL_PATH);
    }

    #[test]
    fn short_patterns_are_dropped() {
        let fp = Fingerprint::named("ab");
        let matcher = FingerprintMatcher::build(&fp, 3);
        assert!(!matcher.has_patterns());
        assert_eq!(matcher.score_path(r"C:\ab\file"), 0.0);
    }

    #[test]
    fn version_stripped_name_also_matches() {
        let matcher = FingerprintMatcher::build(&demo_fingerprint(), 3);
        // 目录名不带版本号
        let score = matcher.score_path(r"C:\ProgramData\demo app\settings.ini");
        assert_eq!(score, CONFIDENCE_NAME);
    }
}
