//! Typed - 型付きアクティビティ API
//!
//! アクティビティの入出力を `Reflect` 型で書けるようにし、
//! payload との変換は `Marshaller` に任せます。

pub mod activity;

pub use self::activity::{Activity, TypedActivity, typed_activity};
