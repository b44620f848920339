use super::models::FileEntry;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use std::path::Path;
use tracing::debug;
use walkdir::WalkDir;

/// 文件哈希上限，超过则跳过内容哈希
const HASH_SIZE_LIMIT: u64 = 16 * 1024 * 1024;

/// 遍历单个根目录，收集文件与目录条目
///
/// 无法访问的子树记入 warnings，不中断整体采集
pub fn collect_root(root: &Path, max_depth: usize, hash_files: bool) -> (Vec<FileEntry>, Vec<String>) {
    let mut entries = Vec::new();
    let mut warnings = Vec::new();

    if !root.exists() {
        warnings.push(format!("路径不存在，已跳过: {}", root.display()));
        return (entries, warnings);
    }

    for item in WalkDir::new(root).max_depth(max_depth).into_iter() {
        let item = match item {
            Ok(i) => i,
            Err(e) => {
                warnings.push(format!("无法访问: {}", e));
                continue;
            }
        };

        // 根目录自身不算变化来源
        if item.depth() == 0 {
            continue;
        }

        let path = item.path();
        let is_dir = item.file_type().is_dir();

        let metadata = match item.metadata() {
            Ok(m) => m,
            Err(e) => {
                warnings.push(format!("无法读取元数据 {}: {}", path.display(), e));
                continue;
            }
        };

        let size = if is_dir { None } else { Some(metadata.len()) };
        let modified = metadata
            .modified()
            .ok()
            .map(|t| DateTime::<Utc>::from(t));

        let content_hash = if hash_files && !is_dir && metadata.len() <= HASH_SIZE_LIMIT {
            match hash_file(path) {
                Ok(h) => Some(h),
                Err(e) => {
                    debug!("哈希失败 {}: {}", path.display(), e);
                    None
                }
            }
        } else {
            None
        };

        entries.push(FileEntry {
            path: path.to_string_lossy().to_string(),
            is_dir,
            size,
            modified,
            content_hash,
        });
    }

    (entries, warnings)
}

fn hash_file(path: &Path) -> std::io::Result<String> {
    let mut file = std::fs::File::open(path)?;
    let mut hasher = Sha256::new();
    std::io::copy(&mut file, &mut hasher)?;
    Ok(format!("{:x}", hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn temp_root() -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("sweep-fs-{}", Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn collects_files_and_directories() {
        let root = temp_root();
        std::fs::create_dir(root.join("sub")).unwrap();
        std::fs::write(root.join("a.txt"), b"hello").unwrap();
        std::fs::write(root.join("sub").join("b.txt"), b"world").unwrap();

        let (entries, warnings) = collect_root(&root, 5, false);
        assert!(warnings.is_empty());
        assert_eq!(entries.len(), 3);
        assert_eq!(entries.iter().filter(|e| e.is_dir).count(), 1);
        let file = entries
            .iter()
            .find(|e| e.path.ends_with("a.txt"))
            .unwrap();
        assert_eq!(file.size, Some(5));

        std::fs::remove_dir_all(&root).ok();
    }

    #[test]
    fn respects_max_depth() {
        let root = temp_root();
        let deep = root.join("l1").join("l2").join("l3");
        std::fs::create_dir_all(&deep).unwrap();
        std::fs::write(deep.join("deep.txt"), b"x").unwrap();

        let (entries, _) = collect_root(&root, 2, false);
        assert!(entries.iter().all(|e| !e.path.ends_with("deep.txt")));

        std::fs::remove_dir_all(&root).ok();
    }

    #[test]
    fn missing_root_produces_warning() {
        let root = std::env::temp_dir().join(format!("sweep-missing-{}", Uuid::new_v4()));
        let (entries, warnings) = collect_root(&root, 5, false);
        assert!(entries.is_empty());
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn hashes_file_content_when_enabled() {
        let root = temp_root();
        std::fs::write(root.join("c.txt"), b"content").unwrap();

        let (entries, _) = collect_root(&root, 5, true);
        let file = entries.iter().find(|e| !e.is_dir).unwrap();
        assert!(file.content_hash.is_some());
        assert_eq!(file.content_hash.as_ref().unwrap().len(), 64);

        std::fs::remove_dir_all(&root).ok();
    }
}
