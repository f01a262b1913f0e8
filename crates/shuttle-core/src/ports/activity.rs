//! Activity port - 登録済みアクティビティの実行
//!
//! `InvokeActivity` ルートは `ActivityContext` を組み立てて `ActivityHandler` を呼びます。
//! 型付きの入出力が欲しい場合は `typed::Activity` を使います。

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{ActivityInfo, CommandResult, Headers, Payloads};
use crate::marshal::Marshaller;

/// Everything an activity may read about its invocation.
///
/// `now` is a snapshot of the environment taken when the command was routed.
#[derive(Debug, Clone)]
pub struct ActivityContext {
    info: ActivityInfo,
    headers: Headers,
    now: DateTime<Utc>,
    marshaller: Arc<Marshaller>,
}

impl ActivityContext {
    /// ActivityContext を作成
    pub fn new(
        info: ActivityInfo,
        headers: Headers,
        now: DateTime<Utc>,
        marshaller: Arc<Marshaller>,
    ) -> Self {
        Self {
            info,
            headers,
            now,
            marshaller,
        }
    }

    /// アクティビティ情報
    pub fn info(&self) -> &ActivityInfo {
        &self.info
    }

    /// ヘッダー値
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers.get(key).map(String::as_str)
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// ambient な現在時刻
    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    /// 共有 Marshaller
    pub fn marshaller(&self) -> &Marshaller {
        &self.marshaller
    }
}

/// アクティビティを実行するハンドラ（object-safe）
#[async_trait]
pub trait ActivityHandler: Send + Sync {
    async fn execute(&self, ctx: ActivityContext, args: Payloads) -> CommandResult;
}
