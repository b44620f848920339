use crate::modules::common::error::SweeperError;

/// 向 PendingFileRenameOperations 追加一条重启删除记录
///
/// 值为 REG_MULTI_SZ，成对出现：源路径(\??\ 前缀)、空目标表示删除
#[cfg(windows)]
pub fn schedule_delete(path: &str) -> Result<(), SweeperError> {
    use winreg::enums::{HKEY_LOCAL_MACHINE, KEY_ALL_ACCESS};
    use winreg::RegKey;

    const SESSION_MANAGER: &str = r"SYSTEM\CurrentControlSet\Control\Session Manager";
    const VALUE_NAME: &str = "PendingFileRenameOperations";

    let hklm = RegKey::predef(HKEY_LOCAL_MACHINE);
    let key = hklm
        .open_subkey_with_flags(SESSION_MANAGER, KEY_ALL_ACCESS)
        .map_err(|e| SweeperError::Registry(format!("无法打开 Session Manager: {}", e)))?;

    let mut entries: Vec<String> = key.get_value(VALUE_NAME).unwrap_or_default();
    entries.push(format!(r"\??\{}", path));
    entries.push(String::new());

    key.set_value(VALUE_NAME, &entries)
        .map_err(|e| SweeperError::Registry(format!("无法写入重启删除记录: {}", e)))?;

    tracing::info!("已登记重启后删除: {}", path);
    Ok(())
}

#[cfg(not(windows))]
pub fn schedule_delete(path: &str) -> Result<(), SweeperError> {
    Err(SweeperError::Unsupported(format!(
        "当前平台无重启删除机制: {}",
        path
    )))
}
