use super::models::{RemovalPlan, RemovalStep, StepAction};
use super::safety;
use crate::modules::common::config::ScanConfig;
use crate::modules::common::utils;
use crate::modules::rules::StubbornAppRule;
use crate::modules::scanner::models::{Fingerprint, Leftover, LeftoverKind};
use tracing::{debug, info};

/// 由指纹、扫描结果和可选规则生成清除计划
///
/// 顺序：规则步骤 -> 厂商卸载命令 -> 任务 -> 服务(先停后删) -> 文件 -> 目录
/// -> 注册表值 -> 注册表键。
/// 低于阈值的残留项不进入计划；受保护位置在此再次过滤
pub fn build_plan(
    fingerprint: &Fingerprint,
    leftovers: &[Leftover],
    rule: Option<&StubbornAppRule>,
    config: &ScanConfig,
) -> RemovalPlan {
    let mut steps = Vec::new();

    if let Some(rule) = rule {
        info!("应用顽固程序规则: {} ({} 个步骤)", rule.name, rule.steps.len());
        for template in &rule.steps {
            let action = template.instantiate();
            if is_protected_action(&action) {
                debug!("规则步骤目标受保护，跳过: {}", action.target());
                continue;
            }
            let requires_backup = template
                .requires_backup
                .unwrap_or_else(|| action.default_requires_backup());
            steps.push(RemovalStep::new(action, requires_backup));
        }
    }

    // 指纹带卸载命令时先走厂商卸载，规则里已有卸载步骤则不重复
    if let Some(command) = &fingerprint.uninstall_command {
        let already_planned = steps
            .iter()
            .any(|s| matches!(s.action, StepAction::RunUninstaller { .. }));
        if !already_planned && !command.trim().is_empty() {
            steps.push(RemovalStep::new(
                StepAction::RunUninstaller {
                    command: utils::expand_env_vars(command),
                },
                false,
            ));
        }
    }

    let mut included: Vec<&Leftover> = leftovers
        .iter()
        .filter(|l| l.confidence >= config.include_threshold)
        .collect();
    included.sort_by(|a, b| {
        kind_order(a.kind)
            .cmp(&kind_order(b.kind))
            .then_with(|| a.locator.cmp(&b.locator))
    });

    // 已计划目录覆盖的子路径不再单列步骤
    let planned_dirs: Vec<String> = included
        .iter()
        .filter(|l| l.kind == LeftoverKind::Directory)
        .map(|l| utils::normalize_path(&l.locator))
        .collect();

    for leftover in included {
        if let Some(action) = leftover_action(leftover) {
            if is_protected_action(&action) {
                debug!("残留项受保护，跳过: {}", leftover.locator);
                continue;
            }
            if matches!(
                leftover.kind,
                LeftoverKind::File | LeftoverKind::Directory
            ) {
                let normalized = utils::normalize_path(&leftover.locator);
                if planned_dirs
                    .iter()
                    .any(|dir| utils::path_is_under(&normalized, dir))
                {
                    continue;
                }
            }
            let requires_backup = action.default_requires_backup();
            match &action {
                // 服务删除前插入停止步骤
                StepAction::DeleteService { name } => {
                    steps.push(RemovalStep::new(
                        StepAction::StopService { name: name.clone() },
                        false,
                    ));
                    steps.push(RemovalStep::new(action, requires_backup));
                }
                _ => steps.push(RemovalStep::new(action, requires_backup)),
            }
        }
    }

    info!(
        "清除计划已生成: {} 个步骤 (指纹 {})",
        steps.len(),
        fingerprint.name
    );
    RemovalPlan::new(fingerprint.name.as_str(), steps)
}

fn kind_order(kind: LeftoverKind) -> u8 {
    match kind {
        LeftoverKind::Task => 0,
        LeftoverKind::Service => 1,
        LeftoverKind::File => 2,
        LeftoverKind::Directory => 3,
        LeftoverKind::RegistryValue => 4,
        LeftoverKind::RegistryKey => 5,
    }
}

fn leftover_action(leftover: &Leftover) -> Option<StepAction> {
    let locator = leftover.locator.clone();
    Some(match leftover.kind {
        LeftoverKind::File => StepAction::DeleteFile { path: locator },
        LeftoverKind::Directory => StepAction::DeleteDirectory { path: locator },
        LeftoverKind::RegistryKey => StepAction::DeleteRegistryKey { path: locator },
        LeftoverKind::RegistryValue => StepAction::DeleteRegistryValue { path: locator },
        LeftoverKind::Service => StepAction::DeleteService { name: locator },
        LeftoverKind::Task => StepAction::DeleteTask { name: locator },
    })
}

fn is_protected_action(action: &StepAction) -> bool {
    match action {
        StepAction::DeleteFile { path } | StepAction::DeleteDirectory { path } => {
            safety::is_protected_path(path)
        }
        StepAction::DeleteRegistryKey { path } | StepAction::DeleteRegistryValue { path } => {
            safety::is_protected_registry(path)
        }
        StepAction::StopService { name } | StepAction::DeleteService { name } => {
            safety::is_protected_service(name)
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::rules::models::StepTemplate;

    fn leftover(kind: LeftoverKind, locator: &str, confidence: f64) -> Leftover {
        Leftover {
            kind,
            locator: locator.to_string(),
            confidence,
            source_fingerprint: "demo".to_string(),
            size: None,
        }
    }

    #[test]
    fn below_threshold_items_are_excluded() {
        let leftovers = vec![
            leftover(LeftoverKind::File, r"C:\Apps\Demo\a.txt", 0.95),
            leftover(LeftoverKind::File, r"C:\ProgramData\Acme\b.txt", 0.3),
        ];
        let plan = build_plan(
            &Fingerprint::named("demo"),
            &leftovers,
            None,
            &ScanConfig::default(),
        );
        assert_eq!(plan.steps.len(), 1);
        assert_eq!(plan.steps[0].action.target(), r"C:\Apps\Demo\a.txt");
    }

    #[test]
    fn ordering_follows_kind_precedence() {
        let leftovers = vec![
            leftover(LeftoverKind::RegistryKey, r"HKCU\Software\Demo", 0.9),
            leftover(LeftoverKind::Directory, r"C:\Apps\Demo", 0.9),
            leftover(LeftoverKind::Service, "DemoSvc", 0.9),
            leftover(LeftoverKind::Task, r"\Demo\Updater", 0.9),
        ];
        let plan = build_plan(
            &Fingerprint::named("demo"),
            &leftovers,
            None,
            &ScanConfig::default(),
        );
        let kinds: Vec<&StepAction> = plan.steps.iter().map(|s| &s.action).collect();

        assert!(matches!(kinds[0], StepAction::DeleteTask { .. }));
        assert!(matches!(kinds[1], StepAction::StopService { .. }));
        assert!(matches!(kinds[2], StepAction::DeleteService { .. }));
        assert!(matches!(kinds[3], StepAction::DeleteDirectory { .. }));
        assert!(matches!(kinds[4], StepAction::DeleteRegistryKey { .. }));
    }

    #[test]
    fn files_under_planned_directory_are_deduped() {
        let leftovers = vec![
            leftover(LeftoverKind::Directory, r"C:\Apps\Demo", 0.95),
            leftover(LeftoverKind::File, r"C:\Apps\Demo\bin\run.exe", 0.95),
            leftover(LeftoverKind::File, r"C:\Other\demo.log", 0.6),
        ];
        let plan = build_plan(
            &Fingerprint::named("demo"),
            &leftovers,
            None,
            &ScanConfig::default(),
        );
        assert_eq!(plan.steps.len(), 2);
        assert!(plan
            .steps
            .iter()
            .all(|s| s.action.target() != r"C:\Apps\Demo\bin\run.exe"));
    }

    #[test]
    fn protected_targets_never_enter_plan() {
        let leftovers = vec![
            leftover(LeftoverKind::File, r"C:\Windows\System32\demo.dll", 0.99),
            leftover(LeftoverKind::Service, "WinDefend", 0.99),
            leftover(
                LeftoverKind::RegistryKey,
                r"HKLM\SYSTEM\CurrentControlSet\Control\Lsa",
                0.99,
            ),
        ];
        let plan = build_plan(
            &Fingerprint::named("demo"),
            &leftovers,
            None,
            &ScanConfig::default(),
        );
        assert!(plan.steps.is_empty());
    }

    #[test]
    fn rule_steps_come_first() {
        let rule = StubbornAppRule {
            name: "guard".to_string(),
            matchers: Vec::new(),
            steps: vec![StepTemplate {
                action: StepAction::KillProcess {
                    image: "guard.exe".to_string(),
                },
                requires_backup: Some(false),
            }],
            notes: None,
        };
        let leftovers = vec![leftover(LeftoverKind::File, r"C:\Apps\Guard\g.dll", 0.95)];
        let plan = build_plan(
            &Fingerprint::named("guard"),
            &leftovers,
            Some(&rule),
            &ScanConfig::default(),
        );

        assert_eq!(plan.steps.len(), 2);
        assert!(matches!(plan.steps[0].action, StepAction::KillProcess { .. }));
        assert!(!plan.steps[0].requires_backup);
    }

    #[test]
    fn service_delete_gets_preceding_stop() {
        let leftovers = vec![leftover(LeftoverKind::Service, "DemoSvc", 0.9)];
        let plan = build_plan(
            &Fingerprint::named("demo"),
            &leftovers,
            None,
            &ScanConfig::default(),
        );
        assert_eq!(plan.steps.len(), 2);
        assert_eq!(
            plan.steps[0].action,
            StepAction::StopService {
                name: "DemoSvc".to_string()
            }
        );
        assert!(!plan.steps[0].requires_backup);
        assert!(!plan.steps[1].requires_backup);
    }

    #[test]
    fn uninstall_command_runs_before_leftover_steps() {
        let mut fingerprint = Fingerprint::named("demo");
        fingerprint.uninstall_command =
            Some(r"C:\Apps\Demo\unins000.exe /SILENT".to_string());
        let leftovers = vec![leftover(LeftoverKind::File, r"C:\Other\demo.log", 0.9)];
        let plan = build_plan(&fingerprint, &leftovers, None, &ScanConfig::default());

        assert_eq!(plan.steps.len(), 2);
        assert_eq!(
            plan.steps[0].action,
            StepAction::RunUninstaller {
                command: r"C:\Apps\Demo\unins000.exe /SILENT".to_string()
            }
        );
        assert!(!plan.steps[0].requires_backup);
    }

    #[test]
    fn rule_uninstall_step_is_not_duplicated() {
        let rule = StubbornAppRule {
            name: "demo".to_string(),
            matchers: Vec::new(),
            steps: vec![StepTemplate {
                action: StepAction::RunUninstaller {
                    command: r"C:\Apps\Demo\cleanup.exe".to_string(),
                },
                requires_backup: Some(false),
            }],
            notes: None,
        };
        let mut fingerprint = Fingerprint::named("demo");
        fingerprint.uninstall_command = Some(r"C:\Apps\Demo\unins000.exe".to_string());
        let plan = build_plan(&fingerprint, &[], Some(&rule), &ScanConfig::default());

        let uninstallers = plan
            .steps
            .iter()
            .filter(|s| matches!(s.action, StepAction::RunUninstaller { .. }))
            .count();
        assert_eq!(uninstallers, 1);
    }
}
