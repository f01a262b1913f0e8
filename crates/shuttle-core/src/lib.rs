//! shuttle-core
//!
//! Request-handling core of a workflow worker: a reflective marshaller between
//! keyed wire data and typed objects, and a command router that hands every
//! command to exactly one route and returns a deferred result.
//!
//! # モジュール構成
//! - **domain**: リクエスト・コマンド種別・オプション型・Failure・入出力フレーム
//! - **marshal**: Reflect 記述、型コンバータ、Mapper キャッシュ、Marshaller
//! - **ports**: 抽象化レイヤー（ActivityHandler, WorkflowHandler, WorkflowClient, Clock）
//! - **dispatch**: Deferred, Route, Router, 組み込みルート
//! - **app**: Environment, Repository, TaskQueue, Worker, WorkerBuilder, 設定
//! - **typed**: 型付きアクティビティ API
//! - **impls**: 実装（LocalWorkflow, NoopClient など開発用）

pub mod app;
pub mod dispatch;
pub mod domain;
pub mod impls;
pub mod marshal;
pub mod ports;
pub mod typed;

pub use self::app::{BuildError, TaskQueue, Worker, WorkerBuilder, WorkerConfig};
pub use self::dispatch::{Deferred, DispatchError, Route, Router};
pub use self::domain::{CommandKind, Envelope, Failure, FailureKind, Request, Response};
pub use self::marshal::{FieldType, MarshalError, Marshaller, Reflect, TypeDescriptor};
