pub mod matcher;
pub mod models;
pub mod storage;

pub use matcher::FingerprintMatcher;
pub use models::{Fingerprint, Leftover, LeftoverKind};
pub use storage::FingerprintStore;

use crate::modules::common::config::ScanConfig;
use crate::modules::common::error::SweeperError;
use crate::modules::common::events::EventLog;
use crate::modules::remover::safety;
use crate::modules::snapshot::{self, models::Snapshot, SnapshotScope};
use tracing::{debug, info};

/// 在快照中扫描某指纹的残留项
///
/// 纯函数：不触碰系统，不修改输入。受保护位置在打分前丢弃
pub fn scan(fingerprint: &Fingerprint, snapshot: &Snapshot, config: &ScanConfig) -> Vec<Leftover> {
    let matcher = FingerprintMatcher::build(fingerprint, config.min_pattern_len);
    if !matcher.has_patterns() {
        debug!("指纹 {} 无可用模式，跳过扫描", fingerprint.name);
        return Vec::new();
    }

    let mut leftovers = Vec::new();

    for entry in &snapshot.files {
        if safety::is_protected_path(&entry.path) {
            continue;
        }
        let confidence = matcher.score_path(&entry.path);
        if confidence > 0.0 {
            leftovers.push(Leftover {
                kind: if entry.is_dir {
                    LeftoverKind::Directory
                } else {
                    LeftoverKind::File
                },
                locator: entry.path.clone(),
                confidence,
                source_fingerprint: fingerprint.name.clone(),
                size: entry.size,
            });
        }
    }

    for entry in &snapshot.registry {
        let full_key = entry.full_key_path();
        if safety::is_protected_registry(&full_key) {
            continue;
        }
        // 系统组件的卸载键属于正常登记，不算残留
        if fingerprint.is_system_component && safety::is_uninstall_key(&full_key) {
            continue;
        }
        let confidence =
            matcher.score_registry(&entry.key_path, entry.value_data.as_deref());
        if confidence > 0.0 {
            let (kind, locator) = match &entry.value_name {
                Some(value) => (
                    LeftoverKind::RegistryValue,
                    format!("{}\\{}", full_key, value),
                ),
                None => (LeftoverKind::RegistryKey, full_key),
            };
            leftovers.push(Leftover {
                kind,
                locator,
                confidence,
                source_fingerprint: fingerprint.name.clone(),
                size: None,
            });
        }
    }

    for entry in &snapshot.services {
        if safety::is_protected_service(&entry.name) {
            continue;
        }
        let confidence = matcher
            .score_name(&entry.name)
            .max(matcher.score_name(&entry.display_name));
        if confidence > 0.0 {
            leftovers.push(Leftover {
                kind: LeftoverKind::Service,
                locator: entry.name.clone(),
                confidence,
                source_fingerprint: fingerprint.name.clone(),
                size: None,
            });
        }
    }

    for entry in &snapshot.tasks {
        let confidence = matcher.score_name(&entry.path);
        if confidence > 0.0 {
            leftovers.push(Leftover {
                kind: LeftoverKind::Task,
                locator: entry.path.clone(),
                confidence,
                source_fingerprint: fingerprint.name.clone(),
                size: None,
            });
        }
    }

    leftovers.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.locator.cmp(&b.locator))
    });

    info!(
        "指纹 {} 扫描完成: {} 个残留项",
        fingerprint.name,
        leftovers.len()
    );
    leftovers
}

/// 现场扫描：先采集当前系统快照再扫描
pub async fn scan_live(
    fingerprint: &Fingerprint,
    scope: &SnapshotScope,
    config: &ScanConfig,
    events: &EventLog,
) -> Result<Vec<Leftover>, SweeperError> {
    let snapshot = snapshot::capture(scope, events).await?;
    Ok(scan(fingerprint, &snapshot, config))
}
