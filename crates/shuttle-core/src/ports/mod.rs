//! Ports - 外部コラボレーターとの境界
//!
//! このモジュールは Hexagonal Architecture の「ポート」を定義します。
//! 実行エンジン・クライアント・宣言読み取りはこのクレートの外にあり、
//! ここではインターフェースだけを持ちます（開発用の実装は `impls`）。

pub mod activity;
pub mod client;
pub mod clock;
pub mod declaration;
pub mod workflow;

pub use self::activity::{ActivityContext, ActivityHandler};
pub use self::client::WorkflowClient;
pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::declaration::{
    ActivityPrototype, DeclaresActivities, DeclaresWorkflows, Prototype, WorkflowPrototype,
};
pub use self::workflow::{WorkflowHandler, WorkflowInstance};
