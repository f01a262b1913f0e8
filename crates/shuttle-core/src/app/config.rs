//! Worker configuration.

/// デフォルトキュー名の環境変数
pub const TASK_QUEUE_ENV: &str = "SHUTTLE_TASK_QUEUE";
/// キュー選択ヘッダー名の環境変数
pub const TASK_QUEUE_HEADER_ENV: &str = "SHUTTLE_TASK_QUEUE_HEADER";
/// ログフィルタの環境変数
pub const LOG_FILTER_ENV: &str = "RUST_LOG";

/// ワーカー設定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerConfig {
    /// Queue used when a command carries no task-queue header.
    pub default_task_queue: String,
    /// Header that selects the task queue of a command.
    pub task_queue_header: String,
    /// `tracing-subscriber` filter directive for binaries.
    pub log_filter: String,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            default_task_queue: "default".to_owned(),
            task_queue_header: "taskQueue".to_owned(),
            log_filter: "info".to_owned(),
        }
    }
}

impl WorkerConfig {
    /// プロセス環境変数から読み込む
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Unset or blank values keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let defaults = Self::default();

        Self {
            default_task_queue: get(TASK_QUEUE_ENV).unwrap_or(defaults.default_task_queue),
            task_queue_header: get(TASK_QUEUE_HEADER_ENV).unwrap_or(defaults.task_queue_header),
            log_filter: get(LOG_FILTER_ENV).unwrap_or(defaults.log_filter),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_lookup_overrides_defaults() {
        let vars: HashMap<&str, &str> = [
            (TASK_QUEUE_ENV, "billing"),
            (TASK_QUEUE_HEADER_ENV, "   "),
            (LOG_FILTER_ENV, "shuttle_core=debug"),
        ]
        .into_iter()
        .collect();

        let config = WorkerConfig::from_lookup(|key| vars.get(key).map(|v| (*v).to_owned()));
        assert_eq!(config.default_task_queue, "billing");
        assert_eq!(config.task_queue_header, "taskQueue");
        assert_eq!(config.log_filter, "shuttle_core=debug");
    }

    #[test]
    fn test_empty_lookup_is_default() {
        assert_eq!(WorkerConfig::from_lookup(|_| None), WorkerConfig::default());
    }
}
