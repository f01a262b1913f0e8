//! Dispatch - コマンドのルーティングと遅延結果
//!
//! # 構成
//! - **deferred**: `Deferred`（dispatch が即座に返す結果ハンドル、キャンセル可能）
//! - **route**: `Route` trait（predicate + handler）
//! - **router**: `Router`（登録順に走査し、最初にマッチしたルートへ委譲）
//! - **routes**: コマンド種別ごとの組み込みルート

pub mod deferred;
pub mod errors;
pub mod route;
pub mod router;
pub mod routes;

pub use self::deferred::Deferred;
pub use self::errors::DispatchError;
pub use self::route::Route;
pub use self::router::Router;
pub use self::routes::default_router;
