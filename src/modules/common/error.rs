use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SweeperError {
    #[error("文件系统错误: {0}")]
    FileSystem(#[from] std::io::Error),

    #[error("注册表错误: {0}")]
    Registry(String),

    #[error("服务控制错误: {0}")]
    Service(String),

    #[error("计划任务错误: {0}")]
    Task(String),

    #[error("资源被占用: {0}")]
    ResourceBusy(String),

    #[error("权限不足: {0}")]
    PermissionDenied(String),

    #[error("未找到: {0}")]
    NotFound(String),

    #[error("备份失败: {0}")]
    Backup(String),

    #[error("备份仓库不可用: {0}")]
    VaultUnavailable(String),

    #[error("恢复冲突: {0}")]
    RestoreConflict(String),

    #[error("超时: {0}")]
    Timeout(String),

    #[error("规则库错误: {0}")]
    RuleDatabase(String),

    #[error("序列化错误: {0}")]
    Serde(String),

    #[error("不支持的平台操作: {0}")]
    Unsupported(String),

    #[error("其他错误: {0}")]
    Other(String),
}

/// 错误分类，驱动执行器的重试与回退策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorClass {
    /// 访问被拒绝，可带退避重试
    AccessDenied,
    /// 共享冲突/文件被占用，可带退避重试
    ResourceBusy,
    /// 目标已不存在，视为幂等成功
    NotFound,
    /// 备份失败，跳过该步骤的破坏性操作
    BackupFailure,
    /// 不可重试的失败
    Fatal,
}

impl ErrorClass {
    pub fn retryable(self) -> bool {
        matches!(self, ErrorClass::AccessDenied | ErrorClass::ResourceBusy)
    }
}

impl std::fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorClass::AccessDenied => write!(f, "AccessDenied"),
            ErrorClass::ResourceBusy => write!(f, "ResourceBusy"),
            ErrorClass::NotFound => write!(f, "NotFound"),
            ErrorClass::BackupFailure => write!(f, "BackupFailure"),
            ErrorClass::Fatal => write!(f, "Fatal"),
        }
    }
}

// Windows 共享冲突/锁冲突错误码
const ERROR_SHARING_VIOLATION: i32 = 32;
const ERROR_LOCK_VIOLATION: i32 = 33;

impl SweeperError {
    /// 将错误归入执行器的重试分类
    pub fn class(&self) -> ErrorClass {
        match self {
            SweeperError::FileSystem(e) => classify_io(e),
            SweeperError::ResourceBusy(_) => ErrorClass::ResourceBusy,
            SweeperError::PermissionDenied(_) => ErrorClass::AccessDenied,
            SweeperError::NotFound(_) => ErrorClass::NotFound,
            SweeperError::Backup(_) | SweeperError::VaultUnavailable(_) => {
                ErrorClass::BackupFailure
            }
            _ => ErrorClass::Fatal,
        }
    }
}

fn classify_io(e: &std::io::Error) -> ErrorClass {
    if let Some(code) = e.raw_os_error() {
        if code == ERROR_SHARING_VIOLATION || code == ERROR_LOCK_VIOLATION {
            return ErrorClass::ResourceBusy;
        }
    }
    match e.kind() {
        std::io::ErrorKind::NotFound => ErrorClass::NotFound,
        std::io::ErrorKind::PermissionDenied => ErrorClass::AccessDenied,
        _ => ErrorClass::Fatal,
    }
}

impl From<serde_json::Error> for SweeperError {
    fn from(e: serde_json::Error) -> Self {
        SweeperError::Serde(e.to_string())
    }
}

impl serde::Serialize for SweeperError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_not_found_maps_to_idempotent_class() {
        let err = SweeperError::FileSystem(std::io::Error::from(std::io::ErrorKind::NotFound));
        assert_eq!(err.class(), ErrorClass::NotFound);
        assert!(!err.class().retryable());
    }

    #[test]
    fn io_permission_denied_is_retryable() {
        let err =
            SweeperError::FileSystem(std::io::Error::from(std::io::ErrorKind::PermissionDenied));
        assert_eq!(err.class(), ErrorClass::AccessDenied);
        assert!(err.class().retryable());
    }

    #[test]
    fn sharing_violation_code_maps_to_resource_busy() {
        let err = SweeperError::FileSystem(std::io::Error::from_raw_os_error(32));
        assert_eq!(err.class(), ErrorClass::ResourceBusy);
    }

    #[test]
    fn backup_errors_are_not_retryable() {
        let err = SweeperError::Backup("拷贝失败".to_string());
        assert_eq!(err.class(), ErrorClass::BackupFailure);
        assert!(!err.class().retryable());
    }
}
