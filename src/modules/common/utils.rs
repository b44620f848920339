use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;
use std::path::Path;

/// 规范化路径，作为跨快照比较的键
///
/// 统一斜杠方向、折叠连续分隔符、去掉结尾分隔符并转为小写。
pub fn normalize_path(path: &str) -> String {
    let mut path = path.trim().replace('/', "\\");

    while path.contains("\\\\") {
        path = path.replace("\\\\", "\\");
    }

    // 保留盘符根 (如 "C:\")，其余去掉结尾分隔符
    while path.len() > 3 && path.ends_with('\\') {
        path.pop();
    }

    path.to_lowercase()
}

/// 判断 `child` 是否等于 `parent` 或位于其之下 (输入须已规范化)
pub fn path_is_under(child: &str, parent: &str) -> bool {
    if child == parent {
        return true;
    }
    let prefix = if parent.ends_with('\\') {
        parent.to_string()
    } else {
        format!("{}\\", parent)
    };
    child.starts_with(&prefix)
}

/// 规范化程序名：小写并去掉结尾的版本号 (如 "Demo App 3.2.1" -> "demo app")
pub fn normalize_name(name: &str) -> String {
    let re = regex::Regex::new(r"\s+\d+(\.\d+)*\s*$").unwrap();
    re.replace(&name.to_lowercase(), "").trim().to_string()
}

/// 展开路径中的 %VAR% 环境变量引用
pub fn expand_env_vars(path: &str) -> String {
    let re = regex::Regex::new(r"%([A-Za-z0-9_()\s]+)%").unwrap();
    re.replace_all(path, |caps: &regex::Captures<'_>| {
        std::env::var(&caps[1]).unwrap_or_else(|_| caps[0].to_string())
    })
    .into_owned()
}

/// 计算目录大小
pub fn calculate_dir_size(path: &Path) -> std::io::Result<u64> {
    let mut size = 0u64;

    if path.is_file() {
        return path.metadata().map(|m| m.len());
    }

    for entry in walkdir::WalkDir::new(path)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        if entry.file_type().is_file() {
            if let Ok(metadata) = entry.metadata() {
                size = size.saturating_add(metadata.len());
            }
        }
    }

    Ok(size)
}

/// 获取模糊匹配分数
pub fn fuzzy_score(text: &str, pattern: &str) -> i64 {
    let matcher = SkimMatcherV2::default();
    matcher.fuzzy_match(text, pattern).unwrap_or(0)
}

/// 格式化文件大小
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// 生成唯一 ID
pub fn generate_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
