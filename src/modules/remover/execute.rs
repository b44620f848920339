use super::models::{
    CancelFlag, PlanReport, PlanStatus, RemovalPlan, RemovalStep, StepAction, StepStatus,
};
use super::store::PlanStore;
use crate::modules::common::config::RemovalConfig;
use crate::modules::common::error::{ErrorClass, SweeperError};
use crate::modules::common::events::EventLog;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// 对系统执行单个动作的接口；测试注入假实现
pub trait ActionRunner: Send + Sync {
    /// 目标当前是否存在
    fn exists(&self, action: &StepAction) -> bool;

    /// 执行动作，返回释放的字节数
    fn remove(&self, action: &StepAction, timeout: Duration) -> Result<u64, SweeperError>;

    /// 登记重启后删除
    fn schedule_reboot_delete(&self, path: &str) -> Result<(), SweeperError>;
}

/// 备份金库接口；执行器只关心可用性与按步骤存储
pub trait StepVault {
    fn available(&self) -> bool;

    fn store_for_step(&self, plan_id: &str, step: &RemovalStep) -> Result<(), SweeperError>;
}

/// 执行清除计划
///
/// 需要备份的步骤先全部备份；金库不可用时整个计划中止，不做任何破坏性操作。
/// 取消只在步骤间生效，已开始的步骤会执行完
pub async fn execute_plan(
    mut plan: RemovalPlan,
    runner: Arc<dyn ActionRunner>,
    vault: Option<&dyn StepVault>,
    config: &RemovalConfig,
    store: Option<&PlanStore>,
    events: &EventLog,
    cancel: &CancelFlag,
) -> Result<(RemovalPlan, PlanReport), SweeperError> {
    info!("开始执行计划 {} ({} 个步骤)", plan.id, plan.steps.len());
    plan.status = PlanStatus::Running;
    persist(store, &plan);

    // 崩溃恢复：上次停在执行中的步骤重新探测目标
    for step in plan.steps.iter_mut() {
        if step.status == StepStatus::Attempting {
            if runner.exists(&step.action) {
                step.status = if step.requires_backup {
                    StepStatus::BackedUp
                } else {
                    StepStatus::Pending
                };
            } else {
                step.status = StepStatus::Succeeded;
                events.emit("remover", "step_recovered", step.action.target(), "目标已消失");
            }
        }
    }

    // 备份阶段
    let needs_backup = plan
        .steps
        .iter()
        .any(|s| s.requires_backup && s.status == StepStatus::Pending);
    if needs_backup {
        let vault = match vault {
            Some(v) if v.available() => v,
            _ => {
                warn!("备份金库不可用，计划 {} 中止", plan.id);
                plan.status = PlanStatus::Aborted;
                persist(store, &plan);
                events.emit("remover", "plan_aborted", &plan.id, "备份金库不可用");
                let report = PlanReport::from_plan(&plan, false);
                return Ok((plan, report));
            }
        };

        let plan_id = plan.id.clone();
        for step in plan.steps.iter_mut() {
            if !step.requires_backup || step.status != StepStatus::Pending {
                continue;
            }
            // 目标已不存在的步骤无需备份，执行阶段直接判成功
            if !runner.exists(&step.action) {
                continue;
            }
            match vault.store_for_step(&plan_id, step) {
                Ok(()) => {
                    step.status = StepStatus::BackedUp;
                    events.emit("remover", "step_backed_up", step.action.target(), "已备份");
                }
                Err(e) => {
                    warn!("步骤备份失败，跳过破坏性操作: {}", e);
                    step.status = StepStatus::FailedFatal;
                    step.error_class = Some(ErrorClass::BackupFailure);
                    step.error = Some(e.to_string());
                    step.next_action = Some("备份失败，未执行删除；检查备份目录后重试".to_string());
                    events.emit("remover", "step_backup_failed", step.action.target(), "备份失败");
                }
            }
        }
        persist(store, &plan);
    }

    // 执行阶段：按冲突关系切分波次，波内可并发
    let mut cancelled = false;
    let mut pending: std::collections::VecDeque<Vec<RemovalStep>> =
        super::conflict::partition_into_waves(std::mem::take(&mut plan.steps)).into();
    let mut done: Vec<RemovalStep> = Vec::new();

    while let Some(wave) = pending.pop_front() {
        if cancel.is_cancelled() {
            if !cancelled {
                cancelled = true;
                info!("收到取消请求，剩余步骤不再执行");
                events.emit("remover", "plan_cancelled", &plan.id, "用户取消");
            }
            done.extend(wave);
            continue;
        }

        if config.parallel && wave.len() > 1 {
            let mut handles = Vec::new();
            for mut step in wave {
                let runner = Arc::clone(&runner);
                let config = config.clone();
                let events = events.clone();
                handles.push(tokio::spawn(async move {
                    if !step.status.is_terminal() {
                        execute_step(&mut step, &runner, &config, &events).await;
                    }
                    step
                }));
            }
            for handle in handles {
                done.push(handle.await.map_err(|e| {
                    SweeperError::Other(format!("执行任务失败: {}", e))
                })?);
            }
        } else {
            for mut step in wave {
                if !step.status.is_terminal() && !cancel.is_cancelled() {
                    execute_step(&mut step, &runner, config, events).await;
                }
                done.push(step);
            }
        }

        // 持久化必须带上未执行的波次，崩溃恢复才看得到完整计划
        let executed = done.len();
        plan.steps = done;
        plan.steps.extend(pending.iter().flatten().cloned());
        persist(store, &plan);
        plan.steps.truncate(executed);
        done = std::mem::take(&mut plan.steps);
    }
    plan.steps = done;

    plan.status = aggregate_status(&plan.steps, cancelled);
    persist(store, &plan);

    let report = PlanReport::from_plan(&plan, cancelled);
    info!(
        "计划 {} 执行结束: {} 成功 {} 被占用 {} 失败",
        plan.id, report.succeeded, report.failed_locked, report.failed_fatal
    );
    events.emit("remover", "plan_done", &plan.id, &plan.status.to_string());
    Ok((plan, report))
}

async fn execute_step(
    step: &mut RemovalStep,
    runner: &Arc<dyn ActionRunner>,
    config: &RemovalConfig,
    events: &EventLog,
) {
    let timeout = Duration::from_secs(config.subprocess_timeout_secs);

    loop {
        step.status = StepStatus::Attempting;
        step.attempts += 1;
        events.emit(
            "remover",
            "step_attempt",
            step.action.target(),
            &format!("第 {} 次", step.attempts),
        );

        // 真实执行器会调子进程阻塞等待，放到阻塞线程池里跑
        let result = {
            let runner = Arc::clone(runner);
            let action = step.action.clone();
            match tokio::task::spawn_blocking(move || runner.remove(&action, timeout)).await {
                Ok(r) => r,
                Err(e) => Err(SweeperError::Other(format!("执行线程异常: {}", e))),
            }
        };

        match result {
            Ok(bytes) => {
                step.status = StepStatus::Succeeded;
                step.bytes_freed = bytes;
                step.error = None;
                step.error_class = None;
                events.emit("remover", "step_done", step.action.target(), "成功");
                return;
            }
            Err(e) => {
                let class = e.class();
                match class {
                    // 目标不存在视为幂等成功
                    ErrorClass::NotFound => {
                        step.status = StepStatus::Succeeded;
                        events.emit("remover", "step_done", step.action.target(), "目标不存在");
                        return;
                    }
                    ErrorClass::AccessDenied | ErrorClass::ResourceBusy
                        if step.attempts < config.max_attempts =>
                    {
                        step.status = StepStatus::Retrying;
                        step.error_class = Some(class);
                        step.error = Some(e.to_string());
                        let delay = config.base_delay_ms * 2u64.pow(step.attempts - 1);
                        warn!(
                            "{} 失败 ({}), {}ms 后重试",
                            step.action.describe(),
                            class,
                            delay
                        );
                        events.emit("remover", "step_retry", step.action.target(), &class.to_string());
                        tokio::time::sleep(Duration::from_millis(delay)).await;
                    }
                    ErrorClass::AccessDenied | ErrorClass::ResourceBusy => {
                        step.status = StepStatus::FailedLocked;
                        step.error_class = Some(class);
                        step.error = Some(e.to_string());
                        // 文件/目录无论是共享冲突还是访问被拒，统一走重启后删除兜底
                        if step.action.supports_reboot_delete() {
                            match runner.schedule_reboot_delete(step.action.target()) {
                                Ok(()) => {
                                    step.reboot_delete = true;
                                    step.next_action = Some("需要重启后完成删除".to_string());
                                }
                                Err(e) => {
                                    step.next_action =
                                        Some(format!("登记重启删除失败: {}", e));
                                }
                            }
                        } else if class == ErrorClass::AccessDenied {
                            step.next_action = Some("请以管理员权限重新运行".to_string());
                        } else {
                            step.next_action = Some("目标被占用，结束相关进程后重试".to_string());
                        }
                        events.emit("remover", "step_failed", step.action.target(), &class.to_string());
                        return;
                    }
                    _ => {
                        step.status = StepStatus::FailedFatal;
                        step.error_class = Some(class);
                        step.error = Some(e.to_string());
                        events.emit("remover", "step_failed", step.action.target(), &class.to_string());
                        return;
                    }
                }
            }
        }
    }
}

fn aggregate_status(steps: &[RemovalStep], cancelled: bool) -> PlanStatus {
    let all_succeeded = steps
        .iter()
        .all(|s| s.status == StepStatus::Succeeded);
    if all_succeeded && !cancelled {
        PlanStatus::Completed
    } else {
        PlanStatus::CompletedWithErrors
    }
}

fn persist(store: Option<&PlanStore>, plan: &RemovalPlan) {
    if let Some(store) = store {
        if let Err(e) = store.save(plan) {
            warn!("计划状态保存失败: {}", e);
        }
    }
}
