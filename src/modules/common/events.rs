//! 结构化操作事件
//!
//! 事件通道作为依赖注入给各组件，避免全局状态；默认排空到 tracing。

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::mpsc;

#[derive(Debug, Clone, Serialize)]
pub struct OperationEvent {
    pub timestamp: DateTime<Utc>,
    pub component: &'static str,
    pub action: String,
    pub target: String,
    pub result: String,
}

/// 事件发送端，可克隆后传给并发任务
#[derive(Clone)]
pub struct EventLog {
    tx: Option<mpsc::UnboundedSender<OperationEvent>>,
}

impl EventLog {
    /// 不收集事件，仅写 tracing
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    /// 建立事件通道，返回发送端和接收端
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<OperationEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }

    pub fn emit(&self, component: &'static str, action: &str, target: &str, result: &str) {
        tracing::debug!("[{}] {} {} -> {}", component, action, target, result);

        if let Some(tx) = &self.tx {
            let _ = tx.send(OperationEvent {
                timestamp: Utc::now(),
                component,
                action: action.to_string(),
                target: target.to_string(),
                result: result.to_string(),
            });
        }
    }
}

/// 将事件排空到 tracing，通道关闭后任务退出
pub fn drain_to_tracing(
    mut rx: mpsc::UnboundedReceiver<OperationEvent>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            tracing::info!(
                component = event.component,
                action = %event.action,
                target = %event.target,
                result = %event.result,
                "操作事件"
            );
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn emitted_events_arrive_in_order() {
        let (log, mut rx) = EventLog::channel();
        log.emit("remover", "delete_file", r"c:\tmp\a.txt", "succeeded");
        log.emit("remover", "delete_file", r"c:\tmp\b.txt", "failed_locked");
        drop(log);

        let first = rx.recv().await.unwrap();
        assert_eq!(first.component, "remover");
        assert_eq!(first.result, "succeeded");

        let second = rx.recv().await.unwrap();
        assert_eq!(second.target, r"c:\tmp\b.txt");
        assert!(rx.recv().await.is_none());
    }

    #[test]
    fn disabled_log_does_not_panic() {
        EventLog::disabled().emit("snapshot", "capture", "c:\\", "partial");
    }
}
