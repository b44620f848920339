pub mod models;
pub mod record;

pub use models::{ChangeSet, EntryDiff, InstallRecord, Modified, MonitorSession};
pub use record::{InstallRecordStore, SessionStore};

use crate::modules::common::utils;
use crate::modules::scanner::models::Fingerprint;
use crate::modules::snapshot::models::{
    FileEntry, RegistryEntry, ServiceEntry, Snapshot, TaskEntry,
};
use std::collections::HashMap;

/// 可跨快照对比的条目
pub trait DiffKey {
    /// 身份键，决定两条记录是否指同一对象
    fn diff_key(&self) -> String;
    /// 身份相同的两条记录属性是否一致
    fn same_attrs(&self, other: &Self) -> bool;
}

impl DiffKey for FileEntry {
    fn diff_key(&self) -> String {
        self.key()
    }

    fn same_attrs(&self, other: &Self) -> bool {
        self.is_dir == other.is_dir
            && self.size == other.size
            && self.modified == other.modified
            && self.content_hash == other.content_hash
    }
}

impl DiffKey for RegistryEntry {
    fn diff_key(&self) -> String {
        self.key()
    }

    fn same_attrs(&self, other: &Self) -> bool {
        self.value_data == other.value_data && self.value_type == other.value_type
    }
}

impl DiffKey for ServiceEntry {
    fn diff_key(&self) -> String {
        self.key()
    }

    fn same_attrs(&self, other: &Self) -> bool {
        self.display_name == other.display_name && self.start_type == other.start_type
    }
}

impl DiffKey for TaskEntry {
    fn diff_key(&self) -> String {
        self.key()
    }

    fn same_attrs(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

/// 对比单个域
fn diff_entries<T: DiffKey + Clone>(before: &[T], after: &[T]) -> EntryDiff<T> {
    let before_map: HashMap<String, &T> =
        before.iter().map(|e| (e.diff_key(), e)).collect();
    let after_map: HashMap<String, &T> = after.iter().map(|e| (e.diff_key(), e)).collect();

    let mut diff = EntryDiff::default();

    for entry in after {
        match before_map.get(&entry.diff_key()) {
            None => diff.added.push(entry.clone()),
            Some(old) if !old.same_attrs(entry) => diff.modified.push(Modified {
                before: (*old).clone(),
                after: entry.clone(),
            }),
            Some(_) => {}
        }
    }

    for entry in before {
        if !after_map.contains_key(&entry.diff_key()) {
            diff.removed.push(entry.clone());
        }
    }

    diff
}

/// 从安装留痕推导程序指纹
///
/// 新增目录中的顶层目录作为安装路径；新增卸载键的末段作为产品标识，
/// 其下的 UninstallString 值作为卸载命令
pub fn derive_fingerprint(program: &str, changes: &ChangeSet) -> Fingerprint {
    let mut fingerprint = Fingerprint::named(program);

    let added_dirs: Vec<String> = changes
        .files
        .added
        .iter()
        .filter(|f| f.is_dir)
        .map(|f| utils::normalize_path(&f.path))
        .collect();
    let mut roots: Vec<String> = added_dirs
        .iter()
        .filter(|dir| {
            !added_dirs
                .iter()
                .any(|other| other != *dir && utils::path_is_under(dir, other))
        })
        .cloned()
        .collect();
    roots.sort();
    roots.dedup();
    fingerprint.install_paths = roots;

    for entry in &changes.registry.added {
        let segments: Vec<&str> = entry.key_path.split('\\').collect();
        if segments.len() < 2 || !segments[segments.len() - 2].eq_ignore_ascii_case("uninstall") {
            continue;
        }
        let tail = segments[segments.len() - 1];
        if !tail.is_empty() && fingerprint.product_id.is_none() {
            fingerprint.product_id = Some(tail.to_string());
        }
        if fingerprint.uninstall_command.is_none() {
            if let (Some(name), Some(data)) = (&entry.value_name, &entry.value_data) {
                if name.eq_ignore_ascii_case("UninstallString") && !data.is_empty() {
                    fingerprint.uninstall_command = Some(data.clone());
                }
            }
        }
    }

    fingerprint
}

/// 计算两个快照之间的差异，输入快照不被修改
pub fn diff(before: &Snapshot, after: &Snapshot) -> ChangeSet {
    ChangeSet {
        from_snapshot_id: before.id.clone(),
        to_snapshot_id: after.id.clone(),
        files: diff_entries(&before.files, &after.files),
        registry: diff_entries(&before.registry, &after.registry),
        services: diff_entries(&before.services, &after.services),
        tasks: diff_entries(&before.tasks, &after.tasks),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn file(path: &str, size: u64) -> FileEntry {
        FileEntry {
            path: path.to_string(),
            is_dir: false,
            size: Some(size),
            modified: None,
            content_hash: None,
        }
    }

    fn snap(id: &str, files: Vec<FileEntry>) -> Snapshot {
        Snapshot {
            id: id.to_string(),
            timestamp: Utc::now(),
            partial: false,
            warnings: Vec::new(),
            files,
            registry: Vec::new(),
            services: Vec::new(),
            tasks: Vec::new(),
        }
    }

    #[test]
    fn detects_added_removed_and_modified() {
        let before = snap(
            "a",
            vec![file(r"C:\keep.txt", 1), file(r"C:\gone.txt", 2), file(r"C:\grow.txt", 3)],
        );
        let after = new_after();

        let changes = diff(&before, &after);
        assert_eq!(changes.files.added.len(), 1);
        assert!(changes.files.added[0].path.ends_with("new.txt"));
        assert_eq!(changes.files.removed.len(), 1);
        assert!(changes.files.removed[0].path.ends_with("gone.txt"));
        assert_eq!(changes.files.modified.len(), 1);
        assert_eq!(changes.files.modified[0].after.size, Some(30));
    }

    fn new_after() -> Snapshot {
        snap(
            "b",
            vec![file(r"C:\keep.txt", 1), file(r"C:\grow.txt", 30), file(r"C:\new.txt", 4)],
        )
    }

    #[test]
    fn identical_snapshots_diff_to_empty() {
        let files = vec![file(r"C:\a.txt", 1), file(r"C:\b.txt", 2)];
        let changes = diff(&snap("a", files.clone()), &snap("b", files));
        assert!(changes.is_empty());
    }

    #[test]
    fn diff_is_invertible() {
        let before = snap("a", vec![file(r"C:\old.txt", 1), file(r"C:\both.txt", 2)]);
        let after = snap("b", vec![file(r"C:\new.txt", 3), file(r"C:\both.txt", 2)]);

        let forward = diff(&before, &after);
        let backward = diff(&after, &before);

        assert_eq!(forward.files.added, backward.files.removed);
        assert_eq!(forward.files.removed, backward.files.added);
    }

    #[test]
    fn path_comparison_ignores_case_and_separators() {
        let before = snap("a", vec![file(r"C:\Apps\Demo\run.exe", 1)]);
        let after = snap("b", vec![file("c:/apps/demo/run.exe", 1)]);
        assert!(diff(&before, &after).is_empty());
    }

    #[test]
    fn derived_fingerprint_picks_roots_and_uninstall_key() {
        use crate::modules::snapshot::models::Hive;

        fn dir(path: &str) -> FileEntry {
            FileEntry {
                path: path.to_string(),
                is_dir: true,
                size: None,
                modified: None,
                content_hash: None,
            }
        }

        let mut changes = diff(
            &snap("a", Vec::new()),
            &snap("b", vec![dir(r"C:\Apps\Demo"), dir(r"C:\Apps\Demo\bin")]),
        );
        changes.registry.added.push(RegistryEntry {
            hive: Hive::Hkcu,
            key_path: r"Software\Microsoft\Windows\CurrentVersion\Uninstall\{DEMO-GUID}"
                .to_string(),
            value_name: Some("UninstallString".to_string()),
            value_data: Some(r"C:\Apps\Demo\unins000.exe".to_string()),
            value_type: Some("REG_SZ".to_string()),
        });

        let fingerprint = derive_fingerprint("DemoApp", &changes);
        assert_eq!(fingerprint.name, "DemoApp");
        // 子目录不单列，只保留顶层安装目录
        assert_eq!(fingerprint.install_paths, vec![r"c:\apps\demo".to_string()]);
        assert_eq!(fingerprint.product_id.as_deref(), Some("{DEMO-GUID}"));
        assert_eq!(
            fingerprint.uninstall_command.as_deref(),
            Some(r"C:\Apps\Demo\unins000.exe")
        );
    }
}
