//! Impls - ポートのインプロセス実装
//!
//! 開発・テスト・デモ用。本番の replay engine / client はこのクレートの外で実装します。

pub mod client;
pub mod local_workflow;

pub use self::client::NoopClient;
pub use self::local_workflow::{LocalWorkflow, WorkflowContext};
