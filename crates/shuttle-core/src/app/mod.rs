//! App - アプリケーション層
//!
//! ports と dispatch を組み合わせてワーカーを組み立てます。
//!
//! # 主要コンポーネント
//! - **WorkerBuilder**: ワーカーの構築とワイヤリング（fail-fast）
//! - **Worker**: 複数の TaskQueue を束ね、コマンドを振り分けて serve する
//! - **TaskQueue**: ルーターと宣言済みワークフロー / アクティビティのレジストリ
//! - **Environment**: tickTime / replay などの ambient 状態
//! - **Repository**: 名前 → 宣言の登録簿（衝突検出つき）

pub mod builder;
pub mod config;
pub mod env;
pub mod repository;
pub mod running;
pub mod services;
pub mod task_queue;
pub mod worker;

/// app 層の tracing target
pub(crate) const APP_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::app");

// 主要な型を再エクスポート
pub use self::builder::{BuildError, WorkerBuilder};
pub use self::config::WorkerConfig;
pub use self::env::Environment;
pub use self::repository::{RegistryError, Repository};
pub use self::running::RunningWorkflows;
pub use self::services::{ActivityRepository, Services, WorkflowRepository};
pub use self::task_queue::TaskQueue;
pub use self::worker::Worker;
