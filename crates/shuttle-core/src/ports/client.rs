//! WorkflowClient port - orchestration service へのリクエスト送信側
//!
//! ルーターから見えるのは「run に紐づく保留中リクエストを捨てる」操作だけです。

/// 実行中ランに紐づくクライアント要求を扱うポート
pub trait WorkflowClient: Send + Sync {
    /// Drops every pending request issued by `run_id` and returns how many
    /// were released.
    fn release(&self, run_id: &str) -> usize;
}
