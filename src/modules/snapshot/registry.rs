use super::models::{Hive, RegistryEntry};

/// 广度优先枚举一个注册表根下的键与值
///
/// 无权限的子键记入 warnings，继续枚举其余部分
#[cfg(windows)]
pub fn collect_root(
    hive: Hive,
    root_path: &str,
    max_depth: usize,
) -> (Vec<RegistryEntry>, Vec<String>) {
    use std::collections::VecDeque;
    use winreg::enums::KEY_READ;
    use winreg::RegKey;

    let mut entries = Vec::new();
    let mut warnings = Vec::new();

    let hkey = RegKey::predef(hive_to_hkey(hive));
    if hkey.open_subkey_with_flags(root_path, KEY_READ).is_err() {
        warnings.push(format!("无法打开注册表根: {}\\{}", hive, root_path));
        return (entries, warnings);
    }

    let mut queue: VecDeque<(String, usize)> = VecDeque::new();
    queue.push_back((root_path.to_string(), 0));

    while let Some((key_path, depth)) = queue.pop_front() {
        let key = match hkey.open_subkey_with_flags(&key_path, KEY_READ) {
            Ok(k) => k,
            Err(e) => {
                warnings.push(format!("无法访问 {}\\{}: {}", hive, key_path, e));
                continue;
            }
        };

        entries.push(RegistryEntry {
            hive,
            key_path: key_path.clone(),
            value_name: None,
            value_data: None,
            value_type: None,
        });

        for value in key.enum_values().flatten() {
            let (name, data) = value;
            entries.push(RegistryEntry {
                hive,
                key_path: key_path.clone(),
                value_name: Some(name),
                value_data: Some(data.to_string()),
                value_type: Some(format!("{:?}", data.vtype)),
            });
        }

        if depth < max_depth {
            for sub in key.enum_keys().flatten() {
                queue.push_back((format!("{}\\{}", key_path, sub), depth + 1));
            }
        }
    }

    (entries, warnings)
}

#[cfg(windows)]
fn hive_to_hkey(hive: Hive) -> winreg::HKEY {
    use winreg::enums::*;
    match hive {
        Hive::Hklm => HKEY_LOCAL_MACHINE,
        Hive::Hkcu => HKEY_CURRENT_USER,
        Hive::Hkcr => HKEY_CLASSES_ROOT,
        Hive::Hku => HKEY_USERS,
        Hive::Hkcc => HKEY_CURRENT_CONFIG,
    }
}

/// 非 Windows 平台无注册表，返回空结果
#[cfg(not(windows))]
pub fn collect_root(
    _hive: Hive,
    _root_path: &str,
    _max_depth: usize,
) -> (Vec<RegistryEntry>, Vec<String>) {
    (Vec::new(), Vec::new())
}
