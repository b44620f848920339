use crate::modules::common::utils;
use crate::modules::remover::models::StepAction;
use crate::modules::scanner::models::Fingerprint;
use serde::{Deserialize, Serialize};

/// 规则匹配条件；规则内所有条件须同时满足
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MatchRule {
    NameContains { pattern: String },
    PublisherEquals { publisher: String },
    GuidEquals { guid: String },
}

impl MatchRule {
    pub fn matches(&self, fingerprint: &Fingerprint) -> bool {
        match self {
            MatchRule::NameContains { pattern } => fingerprint
                .name
                .to_lowercase()
                .contains(&pattern.to_lowercase()),
            MatchRule::PublisherEquals { publisher } => fingerprint
                .publisher
                .as_deref()
                .map(|p| p.eq_ignore_ascii_case(publisher))
                .unwrap_or(false),
            MatchRule::GuidEquals { guid } => fingerprint
                .product_id
                .as_deref()
                .map(|id| id.eq_ignore_ascii_case(guid))
                .unwrap_or(false),
        }
    }
}

/// 规则中的清除步骤模板，目标可含 %VAR% 环境变量
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepTemplate {
    #[serde(flatten)]
    pub action: StepAction,
    /// 不设置时按动作类型取默认值
    pub requires_backup: Option<bool>,
}

impl StepTemplate {
    /// 实例化：展开动作目标中的环境变量
    pub fn instantiate(&self) -> StepAction {
        match &self.action {
            StepAction::DeleteFile { path } => StepAction::DeleteFile {
                path: utils::expand_env_vars(path),
            },
            StepAction::DeleteDirectory { path } => StepAction::DeleteDirectory {
                path: utils::expand_env_vars(path),
            },
            StepAction::RunUninstaller { command } => StepAction::RunUninstaller {
                command: utils::expand_env_vars(command),
            },
            other => other.clone(),
        }
    }
}

/// 顽固程序规则：匹配条件 + 有序清除步骤
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StubbornAppRule {
    pub name: String,
    pub matchers: Vec<MatchRule>,
    pub steps: Vec<StepTemplate>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl StubbornAppRule {
    /// 所有条件都命中才算匹配；无条件的规则不匹配任何程序
    pub fn matches(&self, fingerprint: &Fingerprint) -> bool {
        !self.matchers.is_empty() && self.matchers.iter().all(|m| m.matches(fingerprint))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fingerprint() -> Fingerprint {
        Fingerprint {
            name: "Stubborn Guard 3.0".to_string(),
            publisher: Some("Sticky Soft".to_string()),
            install_paths: Vec::new(),
            product_id: Some("{1111-2222}".to_string()),
            uninstall_command: None,
            is_system_component: false,
        }
    }

    #[test]
    fn all_matchers_must_hit() {
        let rule = StubbornAppRule {
            name: "guard".to_string(),
            matchers: vec![
                MatchRule::NameContains {
                    pattern: "stubborn guard".to_string(),
                },
                MatchRule::PublisherEquals {
                    publisher: "sticky soft".to_string(),
                },
            ],
            steps: Vec::new(),
            notes: None,
        };
        assert!(rule.matches(&fingerprint()));

        let mut other = fingerprint();
        other.publisher = Some("Else".to_string());
        assert!(!rule.matches(&other));
    }

    #[test]
    fn empty_matchers_never_match() {
        let rule = StubbornAppRule {
            name: "broken".to_string(),
            matchers: Vec::new(),
            steps: Vec::new(),
            notes: None,
        };
        assert!(!rule.matches(&fingerprint()));
    }

    #[test]
    fn guid_match_is_case_insensitive() {
        let m = MatchRule::GuidEquals {
            guid: "{1111-2222}".to_string(),
        };
        assert!(m.matches(&fingerprint()));
    }

    #[test]
    fn instantiate_expands_env_vars() {
        std::env::set_var("SWEEP_RULE_TEST_DIR", r"C:\Data");
        let template = StepTemplate {
            action: StepAction::DeleteDirectory {
                path: r"%SWEEP_RULE_TEST_DIR%\guard".to_string(),
            },
            requires_backup: None,
        };
        match template.instantiate() {
            StepAction::DeleteDirectory { path } => assert_eq!(path, r"C:\Data\guard"),
            other => panic!("预期目录删除步骤: {:?}", other),
        }
    }
}
