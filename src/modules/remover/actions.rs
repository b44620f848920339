use super::execute::ActionRunner;
use super::models::StepAction;
use crate::modules::common::error::SweeperError;
use crate::modules::common::utils;
use std::path::Path;
use std::time::Duration;
use tracing::debug;
#[cfg(windows)]
use tracing::warn;

/// 真实系统执行器：文件、注册表、服务、任务与子进程
pub struct SystemRunner;

impl SystemRunner {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SystemRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl ActionRunner for SystemRunner {
    fn exists(&self, action: &StepAction) -> bool {
        match action {
            StepAction::DeleteFile { path } | StepAction::DeleteDirectory { path } => {
                Path::new(path).exists()
            }
            StepAction::DeleteRegistryKey { path }
            | StepAction::DeleteRegistryValue { path } => registry_exists(path),
            StepAction::StopService { name } | StepAction::DeleteService { name } => {
                service_exists(name)
            }
            StepAction::DeleteTask { name } => task_exists(name),
            StepAction::KillProcess { image } => process_exists(image),
            // 卸载命令总是尝试执行
            StepAction::RunUninstaller { .. } => true,
        }
    }

    fn remove(&self, action: &StepAction, timeout: Duration) -> Result<u64, SweeperError> {
        debug!("执行动作: {}", action.describe());
        match action {
            StepAction::DeleteFile { path } => delete_file(path),
            StepAction::DeleteDirectory { path } => delete_directory(path),
            StepAction::DeleteRegistryKey { path } => delete_registry_key(path).map(|_| 0),
            StepAction::DeleteRegistryValue { path } => delete_registry_value(path).map(|_| 0),
            StepAction::StopService { name } => stop_service(name).map(|_| 0),
            StepAction::DeleteService { name } => delete_service(name).map(|_| 0),
            StepAction::DeleteTask { name } => delete_task(name).map(|_| 0),
            StepAction::KillProcess { image } => kill_process(image).map(|_| 0),
            StepAction::RunUninstaller { command } => {
                run_uninstaller(command, timeout).map(|_| 0)
            }
        }
    }

    fn schedule_reboot_delete(&self, path: &str) -> Result<(), SweeperError> {
        super::reboot::schedule_delete(path)
    }
}

fn delete_file(path: &str) -> Result<u64, SweeperError> {
    let meta = std::fs::metadata(path)?;
    let size = meta.len();
    std::fs::remove_file(path)?;
    Ok(size)
}

fn delete_directory(path: &str) -> Result<u64, SweeperError> {
    let size = utils::calculate_dir_size(Path::new(path)).unwrap_or(0);
    std::fs::remove_dir_all(path)?;
    Ok(size)
}

#[cfg(windows)]
fn registry_exists(full_path: &str) -> bool {
    use crate::modules::snapshot::models::parse_registry_path;
    use winreg::enums::KEY_READ;
    use winreg::RegKey;

    // 先按键解释，失败则按 键\值 解释
    if let Some((hive, key_path)) = parse_registry_path(full_path) {
        let root = RegKey::predef(hive_to_hkey(hive));
        if root.open_subkey_with_flags(&key_path, KEY_READ).is_ok() {
            return true;
        }
        if let Some((parent, value)) = key_path.rsplit_once('\\') {
            if let Ok(key) = root.open_subkey_with_flags(parent, KEY_READ) {
                return key.get_raw_value(value).is_ok();
            }
        }
    }
    false
}

#[cfg(not(windows))]
fn registry_exists(_full_path: &str) -> bool {
    false
}

#[cfg(windows)]
fn hive_to_hkey(hive: crate::modules::snapshot::models::Hive) -> winreg::HKEY {
    use crate::modules::snapshot::models::Hive;
    use winreg::enums::*;
    match hive {
        Hive::Hklm => HKEY_LOCAL_MACHINE,
        Hive::Hkcu => HKEY_CURRENT_USER,
        Hive::Hkcr => HKEY_CLASSES_ROOT,
        Hive::Hku => HKEY_USERS,
        Hive::Hkcc => HKEY_CURRENT_CONFIG,
    }
}

#[cfg(windows)]
fn delete_registry_key(full_path: &str) -> Result<(), SweeperError> {
    use crate::modules::snapshot::models::parse_registry_path;
    use winreg::RegKey;

    let (hive, key_path) = parse_registry_path(full_path)
        .ok_or_else(|| SweeperError::Registry(format!("无效的注册表路径: {}", full_path)))?;
    let root = RegKey::predef(hive_to_hkey(hive));
    match root.delete_subkey_all(&key_path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(SweeperError::NotFound(format!("注册表键不存在: {}", full_path)))
        }
        Err(e) => Err(SweeperError::FileSystem(e)),
    }
}

#[cfg(not(windows))]
fn delete_registry_key(full_path: &str) -> Result<(), SweeperError> {
    Err(SweeperError::Unsupported(format!(
        "当前平台无注册表: {}",
        full_path
    )))
}

#[cfg(windows)]
fn delete_registry_value(full_path: &str) -> Result<(), SweeperError> {
    use crate::modules::snapshot::models::parse_registry_path;
    use winreg::enums::KEY_ALL_ACCESS;
    use winreg::RegKey;

    let (hive, key_path) = parse_registry_path(full_path)
        .ok_or_else(|| SweeperError::Registry(format!("无效的注册表路径: {}", full_path)))?;
    let (parent, value) = key_path
        .rsplit_once('\\')
        .ok_or_else(|| SweeperError::Registry(format!("缺少值名: {}", full_path)))?;

    let root = RegKey::predef(hive_to_hkey(hive));
    let key = match root.open_subkey_with_flags(parent, KEY_ALL_ACCESS) {
        Ok(k) => k,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(SweeperError::NotFound(format!("注册表键不存在: {}", parent)))
        }
        Err(e) => return Err(SweeperError::FileSystem(e)),
    };
    match key.delete_value(value) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(SweeperError::NotFound(format!("注册表值不存在: {}", full_path)))
        }
        Err(e) => Err(SweeperError::FileSystem(e)),
    }
}

#[cfg(not(windows))]
fn delete_registry_value(full_path: &str) -> Result<(), SweeperError> {
    Err(SweeperError::Unsupported(format!(
        "当前平台无注册表: {}",
        full_path
    )))
}

// sc.exe 错误码
#[cfg(windows)]
const SERVICE_DOES_NOT_EXIST: &str = "1060";
#[cfg(windows)]
const SERVICE_NOT_ACTIVE: &str = "1062";

#[cfg(windows)]
fn service_exists(name: &str) -> bool {
    std::process::Command::new("sc")
        .args(["query", name])
        .output()
        .map(|out| out.status.success())
        .unwrap_or(false)
}

#[cfg(not(windows))]
fn service_exists(_name: &str) -> bool {
    false
}

#[cfg(windows)]
fn stop_service(name: &str) -> Result<(), SweeperError> {
    let out = std::process::Command::new("sc")
        .args(["stop", name])
        .output()
        .map_err(|e| SweeperError::Service(format!("无法执行 sc: {}", e)))?;
    if out.status.success() {
        return Ok(());
    }
    let text = String::from_utf8_lossy(&out.stdout);
    if text.contains(SERVICE_DOES_NOT_EXIST) {
        return Err(SweeperError::NotFound(format!("服务不存在: {}", name)));
    }
    // 已停止的服务算成功
    if text.contains(SERVICE_NOT_ACTIVE) {
        return Ok(());
    }
    Err(SweeperError::Service(format!(
        "停止服务 {} 失败: {}",
        name,
        text.trim()
    )))
}

#[cfg(not(windows))]
fn stop_service(name: &str) -> Result<(), SweeperError> {
    Err(SweeperError::Unsupported(format!("当前平台无服务控制: {}", name)))
}

#[cfg(windows)]
fn delete_service(name: &str) -> Result<(), SweeperError> {
    let out = std::process::Command::new("sc")
        .args(["delete", name])
        .output()
        .map_err(|e| SweeperError::Service(format!("无法执行 sc: {}", e)))?;
    if out.status.success() {
        return Ok(());
    }
    let text = String::from_utf8_lossy(&out.stdout);
    if text.contains(SERVICE_DOES_NOT_EXIST) {
        return Err(SweeperError::NotFound(format!("服务不存在: {}", name)));
    }
    Err(SweeperError::Service(format!(
        "删除服务 {} 失败: {}",
        name,
        text.trim()
    )))
}

#[cfg(not(windows))]
fn delete_service(name: &str) -> Result<(), SweeperError> {
    Err(SweeperError::Unsupported(format!("当前平台无服务控制: {}", name)))
}

#[cfg(windows)]
fn task_exists(name: &str) -> bool {
    std::process::Command::new("schtasks")
        .args(["/query", "/tn", name])
        .output()
        .map(|out| out.status.success())
        .unwrap_or(false)
}

#[cfg(not(windows))]
fn task_exists(_name: &str) -> bool {
    false
}

#[cfg(windows)]
fn delete_task(name: &str) -> Result<(), SweeperError> {
    let out = std::process::Command::new("schtasks")
        .args(["/delete", "/tn", name, "/f"])
        .output()
        .map_err(|e| SweeperError::Task(format!("无法执行 schtasks: {}", e)))?;
    if out.status.success() {
        return Ok(());
    }
    let text = String::from_utf8_lossy(&out.stderr);
    if !task_exists(name) {
        return Err(SweeperError::NotFound(format!("计划任务不存在: {}", name)));
    }
    Err(SweeperError::Task(format!(
        "删除计划任务 {} 失败: {}",
        name,
        text.trim()
    )))
}

#[cfg(not(windows))]
fn delete_task(name: &str) -> Result<(), SweeperError> {
    Err(SweeperError::Unsupported(format!("当前平台无计划任务: {}", name)))
}

#[cfg(windows)]
fn process_exists(image: &str) -> bool {
    std::process::Command::new("tasklist")
        .args(["/FI", &format!("IMAGENAME eq {}", image), "/NH"])
        .output()
        .map(|out| {
            String::from_utf8_lossy(&out.stdout)
                .to_lowercase()
                .contains(&image.to_lowercase())
        })
        .unwrap_or(false)
}

#[cfg(not(windows))]
fn process_exists(_image: &str) -> bool {
    false
}

#[cfg(windows)]
fn kill_process(image: &str) -> Result<(), SweeperError> {
    let out = std::process::Command::new("taskkill")
        .args(["/IM", image, "/F", "/T"])
        .output()
        .map_err(|e| SweeperError::Other(format!("无法执行 taskkill: {}", e)))?;
    if out.status.success() {
        return Ok(());
    }
    // 128: 没有找到该进程
    if out.status.code() == Some(128) || !process_exists(image) {
        return Err(SweeperError::NotFound(format!("进程未运行: {}", image)));
    }
    Err(SweeperError::PermissionDenied(format!(
        "结束进程 {} 失败: {}",
        image,
        String::from_utf8_lossy(&out.stderr).trim()
    )))
}

#[cfg(not(windows))]
fn kill_process(image: &str) -> Result<(), SweeperError> {
    Err(SweeperError::Unsupported(format!("当前平台无进程控制: {}", image)))
}

/// 执行卸载命令，超时则强制结束子进程
#[cfg(windows)]
fn run_uninstaller(command: &str, timeout: Duration) -> Result<(), SweeperError> {
    let mut child = std::process::Command::new("cmd")
        .args(["/C", command])
        .spawn()
        .map_err(|e| SweeperError::Other(format!("无法启动卸载命令: {}", e)))?;

    let started = std::time::Instant::now();
    loop {
        match child.try_wait() {
            Ok(Some(status)) => {
                if status.success() {
                    return Ok(());
                }
                return Err(SweeperError::Other(format!(
                    "卸载命令退出码 {:?}: {}",
                    status.code(),
                    command
                )));
            }
            Ok(None) => {
                if started.elapsed() >= timeout {
                    warn!("卸载命令超时，强制结束: {}", command);
                    child.kill().ok();
                    child.wait().ok();
                    return Err(SweeperError::Timeout(format!("卸载命令超时: {}", command)));
                }
                std::thread::sleep(Duration::from_millis(200));
            }
            Err(e) => return Err(SweeperError::Other(format!("等待卸载命令失败: {}", e))),
        }
    }
}

#[cfg(not(windows))]
fn run_uninstaller(command: &str, _timeout: Duration) -> Result<(), SweeperError> {
    Err(SweeperError::Unsupported(format!(
        "当前平台无法执行卸载命令: {}",
        command
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn delete_file_returns_freed_bytes() {
        let path = std::env::temp_dir().join(format!("sweep-del-{}.txt", Uuid::new_v4()));
        std::fs::write(&path, b"12345").unwrap();

        let freed = delete_file(path.to_str().unwrap()).unwrap();
        assert_eq!(freed, 5);
        assert!(!path.exists());
    }

    #[test]
    fn delete_missing_file_classifies_not_found() {
        let path = std::env::temp_dir().join(format!("sweep-none-{}.txt", Uuid::new_v4()));
        let err = delete_file(path.to_str().unwrap()).unwrap_err();
        assert_eq!(err.class(), crate::modules::common::error::ErrorClass::NotFound);
    }

    #[test]
    fn delete_directory_is_recursive() {
        let dir = std::env::temp_dir().join(format!("sweep-deldir-{}", Uuid::new_v4()));
        std::fs::create_dir_all(dir.join("sub")).unwrap();
        std::fs::write(dir.join("sub").join("f.txt"), b"abcd").unwrap();

        let freed = delete_directory(dir.to_str().unwrap()).unwrap();
        assert_eq!(freed, 4);
        assert!(!dir.exists());
    }

    #[cfg(not(windows))]
    #[test]
    fn registry_delete_is_unsupported_off_windows() {
        let err = delete_registry_key(r"HKCU\Software\Demo").unwrap_err();
        assert!(matches!(err, SweeperError::Unsupported(_)));
    }
}
