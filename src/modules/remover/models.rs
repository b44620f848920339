use crate::modules::common::error::ErrorClass;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// 单个清除动作
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum StepAction {
    KillProcess { image: String },
    StopService { name: String },
    DeleteService { name: String },
    DeleteTask { name: String },
    DeleteFile { path: String },
    DeleteDirectory { path: String },
    DeleteRegistryKey { path: String },
    DeleteRegistryValue { path: String },
    RunUninstaller { command: String },
}

impl StepAction {
    /// 动作目标的展示形式
    pub fn target(&self) -> &str {
        match self {
            StepAction::KillProcess { image } => image,
            StepAction::StopService { name } => name,
            StepAction::DeleteService { name } => name,
            StepAction::DeleteTask { name } => name,
            StepAction::DeleteFile { path } => path,
            StepAction::DeleteDirectory { path } => path,
            StepAction::DeleteRegistryKey { path } => path,
            StepAction::DeleteRegistryValue { path } => path,
            StepAction::RunUninstaller { command } => command,
        }
    }

    pub fn describe(&self) -> String {
        match self {
            StepAction::KillProcess { image } => format!("结束进程 {}", image),
            StepAction::StopService { name } => format!("停止服务 {}", name),
            StepAction::DeleteService { name } => format!("删除服务 {}", name),
            StepAction::DeleteTask { name } => format!("删除计划任务 {}", name),
            StepAction::DeleteFile { path } => format!("删除文件 {}", path),
            StepAction::DeleteDirectory { path } => format!("删除目录 {}", path),
            StepAction::DeleteRegistryKey { path } => format!("删除注册表键 {}", path),
            StepAction::DeleteRegistryValue { path } => format!("删除注册表值 {}", path),
            StepAction::RunUninstaller { command } => format!("执行卸载命令 {}", command),
        }
    }

    /// 默认是否需要先备份；服务与任务无法逆向恢复，默认不备份
    pub fn default_requires_backup(&self) -> bool {
        matches!(
            self,
            StepAction::DeleteFile { .. }
                | StepAction::DeleteDirectory { .. }
                | StepAction::DeleteRegistryKey { .. }
                | StepAction::DeleteRegistryValue { .. }
        )
    }

    /// 失败时是否可转为重启后删除
    pub fn supports_reboot_delete(&self) -> bool {
        matches!(
            self,
            StepAction::DeleteFile { .. } | StepAction::DeleteDirectory { .. }
        )
    }
}

/// 步骤状态机
///
/// Pending -> BackedUp -> Attempting -> {Succeeded, Retrying, FailedLocked, FailedFatal}
/// Retrying -> Attempting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepStatus {
    Pending,
    BackedUp,
    Attempting,
    Retrying,
    Succeeded,
    FailedLocked,
    FailedFatal,
}

impl StepStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            StepStatus::Succeeded | StepStatus::FailedLocked | StepStatus::FailedFatal
        )
    }
}

impl std::fmt::Display for StepStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            StepStatus::Pending => "等待",
            StepStatus::BackedUp => "已备份",
            StepStatus::Attempting => "执行中",
            StepStatus::Retrying => "重试中",
            StepStatus::Succeeded => "成功",
            StepStatus::FailedLocked => "被占用",
            StepStatus::FailedFatal => "失败",
        };
        write!(f, "{}", s)
    }
}

/// 计划中的一个清除步骤
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemovalStep {
    pub id: String,
    pub action: StepAction,
    pub requires_backup: bool,
    pub status: StepStatus,
    pub attempts: u32,
    /// 被占用且无法删除时置位，重启后由系统完成删除
    pub reboot_delete: bool,
    pub error_class: Option<ErrorClass>,
    pub error: Option<String>,
    /// 给用户的后续动作提示
    pub next_action: Option<String>,
    pub bytes_freed: u64,
}

impl RemovalStep {
    pub fn new(action: StepAction, requires_backup: bool) -> Self {
        Self {
            id: crate::modules::common::utils::generate_id(),
            action,
            requires_backup,
            status: StepStatus::Pending,
            attempts: 0,
            reboot_delete: false,
            error_class: None,
            error: None,
            next_action: None,
            bytes_freed: 0,
        }
    }
}

/// 计划整体状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlanStatus {
    Pending,
    Running,
    Completed,
    CompletedWithErrors,
    Aborted,
}

impl std::fmt::Display for PlanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PlanStatus::Pending => "待执行",
            PlanStatus::Running => "执行中",
            PlanStatus::Completed => "全部完成",
            PlanStatus::CompletedWithErrors => "部分完成",
            PlanStatus::Aborted => "已中止",
        };
        write!(f, "{}", s)
    }
}

/// 一次清除的完整计划
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemovalPlan {
    pub id: String,
    pub fingerprint_name: String,
    pub created_at: DateTime<Utc>,
    pub steps: Vec<RemovalStep>,
    pub status: PlanStatus,
}

impl RemovalPlan {
    pub fn new(fingerprint_name: impl Into<String>, steps: Vec<RemovalStep>) -> Self {
        Self {
            id: crate::modules::common::utils::generate_id(),
            fingerprint_name: fingerprint_name.into(),
            created_at: Utc::now(),
            steps,
            status: PlanStatus::Pending,
        }
    }
}

/// 执行结果汇总
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanReport {
    pub plan_id: String,
    pub status: PlanStatus,
    pub succeeded: usize,
    pub failed_locked: usize,
    pub failed_fatal: usize,
    pub skipped: usize,
    pub bytes_freed: u64,
    pub reboot_required: bool,
    pub cancelled: bool,
}

impl PlanReport {
    pub fn from_plan(plan: &RemovalPlan, cancelled: bool) -> Self {
        let mut report = Self {
            plan_id: plan.id.clone(),
            status: plan.status,
            succeeded: 0,
            failed_locked: 0,
            failed_fatal: 0,
            skipped: 0,
            bytes_freed: 0,
            reboot_required: false,
            cancelled,
        };
        for step in &plan.steps {
            match step.status {
                StepStatus::Succeeded => {
                    report.succeeded += 1;
                    report.bytes_freed += step.bytes_freed;
                }
                StepStatus::FailedLocked => report.failed_locked += 1,
                StepStatus::FailedFatal => report.failed_fatal += 1,
                _ => report.skipped += 1,
            }
            if step.reboot_delete {
                report.reboot_required = true;
            }
        }
        report
    }
}

/// 跨线程取消标志，步骤之间检查
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
