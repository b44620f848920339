use crate::modules::common::utils;

/// 永不触碰的系统目录
const CRITICAL_PATHS: &[&str] = &[
    r"C:\Windows",
    r"C:\Windows\System32",
    r"C:\Windows\SysWOW64",
    r"C:\Windows\WinSxS",
    r"C:\Program Files\Common Files",
    r"C:\Program Files\Windows Defender",
    r"C:\Program Files (x86)\Common Files",
    r"C:\ProgramData\Microsoft\Windows Defender",
    r"C:\System Volume Information",
    r"C:\$Recycle.Bin",
    r"C:\Boot",
    r"C:\Recovery",
];

/// 永不触碰的注册表前缀
const CRITICAL_REGISTRY_PATHS: &[&str] = &[
    r"HKLM\SYSTEM\CurrentControlSet\Control",
    r"HKLM\SYSTEM\CurrentControlSet\Services\Tcpip",
    r"HKLM\SOFTWARE\Microsoft\Windows NT\CurrentVersion\Winlogon",
    r"HKLM\SOFTWARE\Microsoft\Windows\CurrentVersion\Run\SecurityHealth",
    r"HKLM\SOFTWARE\Microsoft\Windows Defender",
    r"HKLM\SAM",
    r"HKLM\SECURITY",
    r"HKLM\BCD00000000",
];

/// 永不停止或删除的服务
const PROTECTED_SERVICES: &[&str] = &[
    "winlogon", "csrss", "lsass", "services", "smss", "wininit", "rpcss",
    "dcomlaunch", "windefend", "wuauserv", "eventlog", "plugplay", "power",
    "schedule", "lanmanserver", "lanmanworkstation", "dhcp", "dnscache",
];

/// 卸载登记键的识别前缀
const UNINSTALL_KEY_MARKERS: &[&str] = &[
    r"\microsoft\windows\currentversion\uninstall",
    r"\wow6432node\microsoft\windows\currentversion\uninstall",
];

/// 路径是否落在保护名单内（含盘根与保护目录自身及其子项）
pub fn is_protected_path(path: &str) -> bool {
    let normalized = utils::normalize_path(path);
    if normalized.is_empty() {
        return true;
    }

    // 盘符根目录
    if normalized.len() <= 3 && normalized.ends_with(":\\") || normalized.len() == 2 && normalized.ends_with(':') {
        return true;
    }

    CRITICAL_PATHS.iter().any(|critical| {
        let critical = utils::normalize_path(critical);
        normalized == critical || utils::path_is_under(&normalized, &critical)
    })
}

/// 完整注册表路径 (含根前缀) 是否受保护
pub fn is_protected_registry(full_key_path: &str) -> bool {
    let lower = full_key_path.trim().trim_end_matches('\\').to_lowercase();
    if lower.is_empty() {
        return true;
    }

    // 根本身不可删
    if !lower.contains('\\') {
        return true;
    }

    CRITICAL_REGISTRY_PATHS.iter().any(|critical| {
        let critical = critical.to_lowercase();
        lower == critical || lower.starts_with(&format!("{}\\", critical))
    })
}

/// 服务是否在保护名单内
pub fn is_protected_service(name: &str) -> bool {
    let lower = name.to_lowercase();
    PROTECTED_SERVICES.iter().any(|s| *s == lower)
}

/// 是否为卸载登记键（或其子键/值）
pub fn is_uninstall_key(full_key_path: &str) -> bool {
    let lower = full_key_path.to_lowercase();
    UNINSTALL_KEY_MARKERS.iter().any(|m| lower.contains(m))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system32_and_children_are_protected() {
        assert!(is_protected_path(r"C:\Windows\System32"));
        assert!(is_protected_path(r"C:\Windows\System32\drivers\etc\hosts"));
        assert!(is_protected_path(r"c:/windows/system32"));
    }

    #[test]
    fn drive_roots_are_protected() {
        assert!(is_protected_path(r"C:\"));
        assert!(is_protected_path("D:"));
    }

    #[test]
    fn normal_program_dirs_are_not_protected() {
        assert!(!is_protected_path(r"C:\Program Files\Demo App"));
        assert!(!is_protected_path(r"C:\Users\x\AppData\Roaming\Demo"));
    }

    #[test]
    fn similar_prefix_does_not_count_as_child() {
        assert!(!is_protected_path(r"C:\Windows2\Demo"));
    }

    #[test]
    fn critical_registry_prefixes_are_protected() {
        assert!(is_protected_registry(
            r"HKLM\SYSTEM\CurrentControlSet\Control\Lsa"
        ));
        assert!(is_protected_registry(r"HKLM\SOFTWARE\Microsoft\Windows Defender"));
        assert!(!is_protected_registry(r"HKCU\Software\Demo App"));
    }

    #[test]
    fn hive_root_alone_is_protected() {
        assert!(is_protected_registry("HKLM"));
    }

    #[test]
    fn core_services_are_protected() {
        assert!(is_protected_service("WinDefend"));
        assert!(is_protected_service("lsass"));
        assert!(!is_protected_service("DemoAppSvc"));
    }

    #[test]
    fn uninstall_keys_are_recognized() {
        assert!(is_uninstall_key(
            r"HKLM\Software\Microsoft\Windows\CurrentVersion\Uninstall\{ABCD}"
        ));
        assert!(is_uninstall_key(
            r"HKLM\Software\WOW6432Node\Microsoft\Windows\CurrentVersion\Uninstall\Demo"
        ));
        assert!(!is_uninstall_key(r"HKCU\Software\Demo App"));
    }
}
