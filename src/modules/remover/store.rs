use super::models::RemovalPlan;
use crate::modules::common::error::SweeperError;
use std::path::PathBuf;

/// 计划持久化目录，步骤状态随执行落盘，用于中断后续跑
pub struct PlanStore {
    dir: PathBuf,
}

impl PlanStore {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, SweeperError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn open_default() -> Result<Self, SweeperError> {
        Self::open(crate::modules::common::config::data_dir().join("plans"))
    }

    fn path_for(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", id))
    }

    pub fn save(&self, plan: &RemovalPlan) -> Result<(), SweeperError> {
        std::fs::write(self.path_for(&plan.id), serde_json::to_string_pretty(plan)?)?;
        Ok(())
    }

    pub fn load(&self, id: &str) -> Result<RemovalPlan, SweeperError> {
        let path = self.path_for(id);
        if !path.exists() {
            return Err(SweeperError::NotFound(format!("计划不存在: {}", id)));
        }
        Ok(serde_json::from_str(&std::fs::read_to_string(&path)?)?)
    }

    /// 按创建时间倒序列出 (id, 指纹名, 状态)
    pub fn list(&self) -> Result<Vec<RemovalPlan>, SweeperError> {
        let mut plans = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().map(|e| e == "json").unwrap_or(false) {
                if let Ok(json) = std::fs::read_to_string(&path) {
                    if let Ok(plan) = serde_json::from_str::<RemovalPlan>(&json) {
                        plans.push(plan);
                    }
                }
            }
        }
        plans.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(plans)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::remover::models::{RemovalStep, StepAction, StepStatus};
    use uuid::Uuid;

    #[test]
    fn plan_state_survives_round_trip() {
        let dir = std::env::temp_dir().join(format!("sweep-plan-{}", Uuid::new_v4()));
        let store = PlanStore::open(&dir).unwrap();

        let mut plan = RemovalPlan::new(
            "demo",
            vec![RemovalStep::new(
                StepAction::DeleteFile {
                    path: r"C:\x".to_string(),
                },
                true,
            )],
        );
        plan.steps[0].status = StepStatus::Attempting;
        plan.steps[0].attempts = 2;
        store.save(&plan).unwrap();

        let loaded = store.load(&plan.id).unwrap();
        assert_eq!(loaded.steps[0].status, StepStatus::Attempting);
        assert_eq!(loaded.steps[0].attempts, 2);

        std::fs::remove_dir_all(&dir).ok();
    }
}
