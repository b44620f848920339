use super::models::{RemovalStep, StepAction};
use crate::modules::common::utils;

/// 并行执行前把步骤切分为无冲突的波次
///
/// 同一波内的步骤互不冲突，可并发执行；波次之间保持原有顺序。
/// 冲突判定：路径存在包含关系、注册表键存在前缀关系、同名服务/任务，
/// 进程结束与卸载命令视为全局步骤，独占一波
pub fn partition_into_waves(steps: Vec<RemovalStep>) -> Vec<Vec<RemovalStep>> {
    let mut waves: Vec<Vec<RemovalStep>> = Vec::new();

    for step in steps {
        let fits_last = !is_global(&step.action)
            && waves
                .last()
                .map(|wave| wave.iter().all(|w| !conflicts(&w.action, &step.action)))
                .unwrap_or(false);
        if fits_last {
            waves.last_mut().unwrap().push(step);
        } else {
            waves.push(vec![step]);
        }
    }

    waves
}

fn is_global(action: &StepAction) -> bool {
    matches!(
        action,
        StepAction::KillProcess { .. } | StepAction::RunUninstaller { .. }
    )
}

fn conflicts(a: &StepAction, b: &StepAction) -> bool {
    if is_global(a) || is_global(b) {
        return true;
    }

    match (path_of(a), path_of(b)) {
        (Some(pa), Some(pb)) => {
            let pa = utils::normalize_path(pa);
            let pb = utils::normalize_path(pb);
            return pa == pb || utils::path_is_under(&pa, &pb) || utils::path_is_under(&pb, &pa);
        }
        _ => {}
    }

    match (registry_of(a), registry_of(b)) {
        (Some(ra), Some(rb)) => {
            let ra = ra.to_lowercase();
            let rb = rb.to_lowercase();
            return ra == rb
                || ra.starts_with(&format!("{}\\", rb))
                || rb.starts_with(&format!("{}\\", ra));
        }
        _ => {}
    }

    match (service_of(a), service_of(b)) {
        (Some(sa), Some(sb)) => return sa.eq_ignore_ascii_case(sb),
        _ => {}
    }

    if let (StepAction::DeleteTask { name: ta }, StepAction::DeleteTask { name: tb }) = (a, b) {
        return ta.eq_ignore_ascii_case(tb);
    }

    false
}

fn path_of(action: &StepAction) -> Option<&str> {
    match action {
        StepAction::DeleteFile { path } | StepAction::DeleteDirectory { path } => Some(path),
        _ => None,
    }
}

fn registry_of(action: &StepAction) -> Option<&str> {
    match action {
        StepAction::DeleteRegistryKey { path } | StepAction::DeleteRegistryValue { path } => {
            Some(path)
        }
        _ => None,
    }
}

fn service_of(action: &StepAction) -> Option<&str> {
    match action {
        StepAction::StopService { name } | StepAction::DeleteService { name } => Some(name),
        _ => None,
    }
}
