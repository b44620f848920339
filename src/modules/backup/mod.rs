pub mod models;

pub use models::{BackupKind, BackupManifest, BackupRecord};

use crate::modules::common::error::SweeperError;
use crate::modules::remover::execute::StepVault;
use crate::modules::remover::models::{RemovalStep, StepAction};
use chrono::Utc;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// 备份金库：破坏性步骤执行前把目标原样存入，支持逐步骤恢复
///
/// 目录布局: <root>/plan-<计划id>/manifest.json 与 steps/<步骤id>/
pub struct BackupVault {
    root: PathBuf,
}

impl BackupVault {
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, SweeperError> {
        let root = root.into();
        std::fs::create_dir_all(&root)
            .map_err(|e| SweeperError::VaultUnavailable(format!("无法创建备份目录: {}", e)))?;
        Ok(Self { root })
    }

    pub fn open_default() -> Result<Self, SweeperError> {
        Self::open(crate::modules::common::config::data_dir().join("backups"))
    }

    /// 金库可写性探测
    pub fn available(&self) -> bool {
        let probe = self.root.join(".probe");
        match std::fs::write(&probe, b"ok") {
            Ok(()) => {
                std::fs::remove_file(&probe).ok();
                true
            }
            Err(e) => {
                warn!("备份金库不可写: {}", e);
                false
            }
        }
    }

    fn plan_dir(&self, plan_id: &str) -> PathBuf {
        self.root.join(format!("plan-{}", plan_id))
    }

    fn manifest_path(&self, plan_id: &str) -> PathBuf {
        self.plan_dir(plan_id).join("manifest.json")
    }

    fn step_dir(&self, plan_id: &str, step_id: &str) -> PathBuf {
        self.plan_dir(plan_id).join("steps").join(step_id)
    }

    pub fn load_manifest(&self, plan_id: &str) -> Result<BackupManifest, SweeperError> {
        let path = self.manifest_path(plan_id);
        if !path.exists() {
            return Err(SweeperError::NotFound(format!(
                "没有计划 {} 的备份清单",
                plan_id
            )));
        }
        Ok(serde_json::from_str(&std::fs::read_to_string(&path)?)?)
    }

    fn append_record(&self, plan_id: &str, record: BackupRecord) -> Result<(), SweeperError> {
        let mut manifest = match self.load_manifest(plan_id) {
            Ok(m) => m,
            Err(SweeperError::NotFound(_)) => BackupManifest::new(plan_id),
            Err(e) => return Err(e),
        };
        manifest.entries.retain(|e| e.step_id != record.step_id);
        manifest.entries.push(record);
        std::fs::create_dir_all(self.plan_dir(plan_id))?;
        std::fs::write(
            self.manifest_path(plan_id),
            serde_json::to_string_pretty(&manifest)?,
        )?;
        Ok(())
    }

    /// 为一个步骤做备份；不需要备份的动作为无操作
    pub fn store_step(&self, plan_id: &str, step: &RemovalStep) -> Result<(), SweeperError> {
        let record = match &step.action {
            StepAction::DeleteFile { path } => self.store_file(plan_id, &step.id, path)?,
            StepAction::DeleteDirectory { path } => {
                self.store_directory(plan_id, &step.id, path)?
            }
            StepAction::DeleteRegistryKey { path } => {
                self.store_registry(plan_id, &step.id, path)?
            }
            StepAction::DeleteRegistryValue { path } => {
                // 值备份导出其所在键
                let parent = path.rsplit_once('\\').map(|(p, _)| p).unwrap_or(path);
                self.store_registry(plan_id, &step.id, parent)?
            }
            other => {
                debug!("动作无需备份: {}", other.describe());
                return Ok(());
            }
        };
        self.append_record(plan_id, record)
    }

    fn store_file(
        &self,
        plan_id: &str,
        step_id: &str,
        source: &str,
    ) -> Result<BackupRecord, SweeperError> {
        let dir = self.step_dir(plan_id, step_id);
        std::fs::create_dir_all(&dir)
            .map_err(|e| SweeperError::Backup(format!("无法创建备份子目录: {}", e)))?;

        let file_name = Path::new(source)
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "payload".to_string());
        let target = dir.join(&file_name);
        std::fs::copy(source, &target)
            .map_err(|e| SweeperError::Backup(format!("文件备份失败 {}: {}", source, e)))?;
        let checksum = sha256_file(&target)
            .map_err(|e| SweeperError::Backup(format!("备份校验失败: {}", e)))?;

        info!("已备份文件: {} -> {}", source, target.display());
        Ok(BackupRecord {
            step_id: step_id.to_string(),
            kind: BackupKind::File,
            original_locator: source.to_string(),
            storage_location: relative_to(&target, &self.root),
            checksum: Some(checksum),
            restorable: true,
            created_at: Utc::now(),
        })
    }

    fn store_directory(
        &self,
        plan_id: &str,
        step_id: &str,
        source: &str,
    ) -> Result<BackupRecord, SweeperError> {
        let dir = self.step_dir(plan_id, step_id).join("tree");
        copy_dir_recursive(Path::new(source), &dir)
            .map_err(|e| SweeperError::Backup(format!("目录备份失败 {}: {}", source, e)))?;

        info!("已备份目录: {} -> {}", source, dir.display());
        Ok(BackupRecord {
            step_id: step_id.to_string(),
            kind: BackupKind::Directory,
            original_locator: source.to_string(),
            storage_location: relative_to(&dir, &self.root),
            checksum: None,
            restorable: true,
            created_at: Utc::now(),
        })
    }

    #[cfg(windows)]
    fn store_registry(
        &self,
        plan_id: &str,
        step_id: &str,
        full_key: &str,
    ) -> Result<BackupRecord, SweeperError> {
        let dir = self.step_dir(plan_id, step_id);
        std::fs::create_dir_all(&dir)
            .map_err(|e| SweeperError::Backup(format!("无法创建备份子目录: {}", e)))?;
        let target = dir.join("export.reg");

        let out = std::process::Command::new("reg")
            .args(["export", full_key, target.to_string_lossy().as_ref(), "/y"])
            .output()
            .map_err(|e| SweeperError::Backup(format!("无法执行 reg export: {}", e)))?;
        if !out.status.success() {
            return Err(SweeperError::Backup(format!(
                "注册表导出失败 {}: {}",
                full_key,
                String::from_utf8_lossy(&out.stderr).trim()
            )));
        }

        info!("已备份注册表键: {} -> {}", full_key, target.display());
        Ok(BackupRecord {
            step_id: step_id.to_string(),
            kind: BackupKind::RegistryKey,
            original_locator: full_key.to_string(),
            storage_location: relative_to(&target, &self.root),
            checksum: None,
            restorable: true,
            created_at: Utc::now(),
        })
    }

    #[cfg(not(windows))]
    fn store_registry(
        &self,
        _plan_id: &str,
        _step_id: &str,
        full_key: &str,
    ) -> Result<BackupRecord, SweeperError> {
        Err(SweeperError::Backup(format!(
            "当前平台无法备份注册表: {}",
            full_key
        )))
    }

    /// 恢复一个步骤的备份；目标已被改动时拒绝覆盖
    pub fn restore_step(&self, plan_id: &str, step_id: &str) -> Result<(), SweeperError> {
        let manifest = self.load_manifest(plan_id)?;
        let record = manifest
            .find(step_id)
            .ok_or_else(|| SweeperError::NotFound(format!("步骤无备份记录: {}", step_id)))?;
        if !record.restorable {
            return Err(SweeperError::RestoreConflict(format!(
                "备份不可恢复: {}",
                record.original_locator
            )));
        }

        let stored = self.root.join(&record.storage_location);
        match record.kind {
            BackupKind::File => {
                let target = Path::new(&record.original_locator);
                if target.exists() {
                    let current = sha256_file(target)
                        .map_err(|e| SweeperError::Backup(format!("校验目标失败: {}", e)))?;
                    if Some(&current) != record.checksum.as_ref() {
                        return Err(SweeperError::RestoreConflict(format!(
                            "目标已被改动: {}",
                            record.original_locator
                        )));
                    }
                    // 内容一致，无需恢复
                    return Ok(());
                }
                if let Some(parent) = target.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                std::fs::copy(&stored, target)?;
            }
            BackupKind::Directory => {
                let target = Path::new(&record.original_locator);
                if target.exists() {
                    return Err(SweeperError::RestoreConflict(format!(
                        "目标目录已存在: {}",
                        record.original_locator
                    )));
                }
                copy_dir_recursive(&stored, target)?;
            }
            BackupKind::RegistryKey => {
                restore_registry(&stored, &record.original_locator)?;
            }
        }

        info!("已恢复: {}", record.original_locator);
        Ok(())
    }

    /// 列出金库中的所有备份清单
    pub fn list_plans(&self) -> Result<Vec<BackupManifest>, SweeperError> {
        let mut manifests = Vec::new();
        for entry in std::fs::read_dir(&self.root)? {
            let path = entry?.path();
            let manifest_path = path.join("manifest.json");
            if manifest_path.exists() {
                if let Ok(json) = std::fs::read_to_string(&manifest_path) {
                    if let Ok(manifest) = serde_json::from_str::<BackupManifest>(&json) {
                        manifests.push(manifest);
                    }
                }
            }
        }
        manifests.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(manifests)
    }

    /// 清理超过保留期的备份，返回删除的计划数
    pub fn purge_older_than(&self, keep_days: i64) -> Result<usize, SweeperError> {
        let cutoff = Utc::now() - chrono::Duration::days(keep_days);
        let mut removed = 0;
        for manifest in self.list_plans()? {
            if manifest.created_at < cutoff {
                let dir = self.plan_dir(&manifest.plan_id);
                std::fs::remove_dir_all(&dir)?;
                info!("已清理过期备份: {}", dir.display());
                removed += 1;
            }
        }
        Ok(removed)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl StepVault for BackupVault {
    fn available(&self) -> bool {
        BackupVault::available(self)
    }

    fn store_for_step(&self, plan_id: &str, step: &RemovalStep) -> Result<(), SweeperError> {
        self.store_step(plan_id, step)
    }
}

fn sha256_file(path: &Path) -> std::io::Result<String> {
    let mut file = std::fs::File::open(path)?;
    let mut hasher = Sha256::new();
    std::io::copy(&mut file, &mut hasher)?;
    Ok(format!("{:x}", hasher.finalize()))
}

fn copy_dir_recursive(source: &Path, target: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(target)?;
    for entry in std::fs::read_dir(source)? {
        let entry = entry?;
        let dest = target.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_dir_recursive(&entry.path(), &dest)?;
        } else {
            std::fs::copy(entry.path(), &dest)?;
        }
    }
    Ok(())
}

fn relative_to(path: &Path, root: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .to_string()
}

#[cfg(windows)]
fn restore_registry(stored: &Path, original: &str) -> Result<(), SweeperError> {
    if crate::modules::remover::actions::SystemRunner::new().exists(
        &StepAction::DeleteRegistryKey {
            path: original.to_string(),
        },
    ) {
        return Err(SweeperError::RestoreConflict(format!(
            "注册表键已存在: {}",
            original
        )));
    }
    let out = std::process::Command::new("reg")
        .args(["import", stored.to_string_lossy().as_ref()])
        .output()
        .map_err(|e| SweeperError::Backup(format!("无法执行 reg import: {}", e)))?;
    if !out.status.success() {
        return Err(SweeperError::Backup(format!(
            "注册表恢复失败 {}: {}",
            original,
            String::from_utf8_lossy(&out.stderr).trim()
        )));
    }
    Ok(())
}

#[cfg(not(windows))]
fn restore_registry(_stored: &Path, original: &str) -> Result<(), SweeperError> {
    Err(SweeperError::Unsupported(format!(
        "当前平台无法恢复注册表: {}",
        original
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::remover::models::RemovalStep;
    use uuid::Uuid;

    fn temp_vault() -> (BackupVault, PathBuf) {
        let root = std::env::temp_dir().join(format!("sweep-vault-{}", Uuid::new_v4()));
        (BackupVault::open(&root).unwrap(), root)
    }

    fn file_step(path: &Path) -> RemovalStep {
        RemovalStep::new(
            StepAction::DeleteFile {
                path: path.to_string_lossy().to_string(),
            },
            true,
        )
    }

    #[test]
    fn file_backup_restores_byte_exact() {
        let (vault, root) = temp_vault();
        let work = std::env::temp_dir().join(format!("sweep-work-{}", Uuid::new_v4()));
        std::fs::create_dir_all(&work).unwrap();
        let target = work.join("data.bin");
        std::fs::write(&target, b"\x00\x01payload\xff").unwrap();

        let step = file_step(&target);
        vault.store_step("plan-1", &step).unwrap();

        std::fs::remove_file(&target).unwrap();
        vault.restore_step("plan-1", &step.id).unwrap();

        assert_eq!(std::fs::read(&target).unwrap(), b"\x00\x01payload\xff");

        std::fs::remove_dir_all(&root).ok();
        std::fs::remove_dir_all(&work).ok();
    }

    #[test]
    fn restore_refuses_modified_target() {
        let (vault, root) = temp_vault();
        let work = std::env::temp_dir().join(format!("sweep-work-{}", Uuid::new_v4()));
        std::fs::create_dir_all(&work).unwrap();
        let target = work.join("data.txt");
        std::fs::write(&target, b"original").unwrap();

        let step = file_step(&target);
        vault.store_step("plan-1", &step).unwrap();

        // 目标被第三方改动
        std::fs::write(&target, b"tampered").unwrap();
        match vault.restore_step("plan-1", &step.id) {
            Err(SweeperError::RestoreConflict(_)) => {}
            other => panic!("预期恢复冲突: {:?}", other),
        }
        assert_eq!(std::fs::read(&target).unwrap(), b"tampered");

        std::fs::remove_dir_all(&root).ok();
        std::fs::remove_dir_all(&work).ok();
    }

    #[test]
    fn directory_backup_round_trips_tree() {
        let (vault, root) = temp_vault();
        let work = std::env::temp_dir().join(format!("sweep-work-{}", Uuid::new_v4()));
        let tree = work.join("app");
        std::fs::create_dir_all(tree.join("nested")).unwrap();
        std::fs::write(tree.join("a.txt"), b"aa").unwrap();
        std::fs::write(tree.join("nested").join("b.txt"), b"bb").unwrap();

        let step = RemovalStep::new(
            StepAction::DeleteDirectory {
                path: tree.to_string_lossy().to_string(),
            },
            true,
        );
        vault.store_step("plan-2", &step).unwrap();

        std::fs::remove_dir_all(&tree).unwrap();
        vault.restore_step("plan-2", &step.id).unwrap();

        assert_eq!(std::fs::read(tree.join("a.txt")).unwrap(), b"aa");
        assert_eq!(std::fs::read(tree.join("nested").join("b.txt")).unwrap(), b"bb");

        std::fs::remove_dir_all(&root).ok();
        std::fs::remove_dir_all(&work).ok();
    }

    #[test]
    fn non_destructive_actions_need_no_backup() {
        let (vault, root) = temp_vault();
        let step = RemovalStep::new(
            StepAction::StopService {
                name: "DemoSvc".to_string(),
            },
            false,
        );
        vault.store_step("plan-3", &step).unwrap();
        assert!(matches!(
            vault.load_manifest("plan-3"),
            Err(SweeperError::NotFound(_))
        ));
        std::fs::remove_dir_all(&root).ok();
    }

    #[test]
    fn purge_removes_only_expired_plans() {
        let (vault, root) = temp_vault();
        let work = std::env::temp_dir().join(format!("sweep-work-{}", Uuid::new_v4()));
        std::fs::create_dir_all(&work).unwrap();
        let target = work.join("f.txt");
        std::fs::write(&target, b"x").unwrap();

        let step = file_step(&target);
        vault.store_step("recent", &step).unwrap();
        vault.store_step("old", &step).unwrap();

        // 把 old 的清单时间拨回 40 天前
        let mut manifest = vault.load_manifest("old").unwrap();
        manifest.created_at = Utc::now() - chrono::Duration::days(40);
        std::fs::write(
            vault.manifest_path("old"),
            serde_json::to_string_pretty(&manifest).unwrap(),
        )
        .unwrap();

        assert_eq!(vault.purge_older_than(30).unwrap(), 1);
        assert!(vault.load_manifest("recent").is_ok());
        assert!(matches!(
            vault.load_manifest("old"),
            Err(SweeperError::NotFound(_))
        ));

        std::fs::remove_dir_all(&root).ok();
        std::fs::remove_dir_all(&work).ok();
    }
}
