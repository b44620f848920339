use serde::{Deserialize, Serialize};

/// 残留项类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LeftoverKind {
    File,
    Directory,
    RegistryKey,
    RegistryValue,
    Service,
    Task,
}

impl std::fmt::Display for LeftoverKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            LeftoverKind::File => "文件",
            LeftoverKind::Directory => "目录",
            LeftoverKind::RegistryKey => "注册表键",
            LeftoverKind::RegistryValue => "注册表值",
            LeftoverKind::Service => "服务",
            LeftoverKind::Task => "计划任务",
        };
        write!(f, "{}", s)
    }
}

/// 扫描发现的残留项
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Leftover {
    pub kind: LeftoverKind,
    /// 定位符：路径、`HIVE\键`、`HIVE\键\值名`、服务名或任务路径
    pub locator: String,
    /// 归属置信度 0.0..=1.0
    pub confidence: f64,
    /// 产生此项的指纹名称
    pub source_fingerprint: String,
    pub size: Option<u64>,
}

/// 待扫描程序的指纹
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Fingerprint {
    pub name: String,
    pub publisher: Option<String>,
    pub install_paths: Vec<String>,
    pub product_id: Option<String>,
    pub uninstall_command: Option<String>,
    /// 系统组件的卸载键不算残留
    pub is_system_component: bool,
}

impl Fingerprint {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// 用另一份指纹补全缺失字段，已有内容保持不变
    pub fn merge_missing(&mut self, other: &Fingerprint) {
        for path in &other.install_paths {
            if !self
                .install_paths
                .iter()
                .any(|p| p.eq_ignore_ascii_case(path))
            {
                self.install_paths.push(path.clone());
            }
        }
        if self.publisher.is_none() {
            self.publisher = other.publisher.clone();
        }
        if self.product_id.is_none() {
            self.product_id = other.product_id.clone();
        }
        if self.uninstall_command.is_none() {
            self.uninstall_command = other.uninstall_command.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_missing_keeps_existing_fields() {
        let mut base = Fingerprint::named("Demo");
        base.install_paths = vec![r"C:\Apps\Demo".to_string()];
        base.publisher = Some("Acme".to_string());

        let mut extra = Fingerprint::named("Demo");
        extra.install_paths = vec![r"c:\apps\demo".to_string(), r"C:\ProgramData\Demo".to_string()];
        extra.publisher = Some("Other".to_string());
        extra.product_id = Some("{GUID}".to_string());
        extra.uninstall_command = Some("unins000.exe".to_string());

        base.merge_missing(&extra);
        assert_eq!(
            base.install_paths,
            [r"C:\Apps\Demo".to_string(), r"C:\ProgramData\Demo".to_string()]
        );
        assert_eq!(base.publisher.as_deref(), Some("Acme"));
        assert_eq!(base.product_id.as_deref(), Some("{GUID}"));
        assert_eq!(base.uninstall_command.as_deref(), Some("unins000.exe"));
    }
}
