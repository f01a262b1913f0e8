//! Workflow port - 実行エンジン（replay engine）とのインターフェース
//!
//! ルーターはワークフローの中身を知りません。`WorkflowHandler` がインスタンスを作り、
//! 以降のシグナル・クエリ・破棄は `WorkflowInstance` 経由で行います。

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::{CommandResult, Failure, Payloads, WorkflowInfo};

/// Creates running instances of one declared workflow type.
pub trait WorkflowHandler: Send + Sync {
    fn instantiate(
        &self,
        info: WorkflowInfo,
        args: Payloads,
    ) -> Result<Arc<dyn WorkflowInstance>, Failure>;
}

/// One running workflow.
///
/// `start` resolves when the workflow body completes; it may suspend for a long
/// time while other commands for the same instance are served.
#[async_trait]
pub trait WorkflowInstance: Send + Sync {
    fn info(&self) -> &WorkflowInfo;

    async fn start(&self) -> CommandResult;

    async fn signal(&self, name: &str, args: Payloads) -> Result<(), Failure>;

    fn query(&self, name: &str, args: Payloads) -> CommandResult;

    fn stack_trace(&self) -> String;

    /// Stops the instance and releases what it holds. Must be idempotent.
    fn destroy(&self);
}
