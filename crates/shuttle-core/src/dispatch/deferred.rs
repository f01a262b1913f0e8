//! Deferred - dispatch が返す「あとで解決する結果」
//!
//! # 設計
//! - 同期的に決まる結果（失敗を含む）は `Ready` のまま返す
//! - 非同期ハンドラは tokio タスクとして spawn し、`JoinHandle` を保持する
//! - `cancel()` / drop でタスクを abort する。ハンドラの future ごと drop されるので、
//!   シグナル待ちなどのサスペンド地点もそこで解放される

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::task::JoinHandle;

use crate::domain::{CommandResult, Failure, Payloads};

enum State {
    Ready(Option<CommandResult>),
    Spawned(JoinHandle<CommandResult>),
}

/// dispatch が返す遅延結果。drop / cancel でハンドラのタスクを中断する
#[must_use = "a deferred result does nothing unless awaited or kept alive"]
pub struct Deferred {
    state: State,
}

impl Deferred {
    /// すでに結果がある Deferred
    pub fn ready(result: CommandResult) -> Self {
        Self {
            state: State::Ready(Some(result)),
        }
    }

    /// 成功で解決済み
    pub fn resolved(payloads: Payloads) -> Self {
        Self::ready(Ok(payloads))
    }

    /// 失敗で解決済み
    pub fn failed(failure: impl Into<Failure>) -> Self {
        Self::ready(Err(failure.into()))
    }

    /// Runs `future` as its own task. Must be called inside a tokio runtime.
    pub fn spawn<F>(future: F) -> Self
    where
        F: Future<Output = CommandResult> + Send + 'static,
    {
        Self {
            state: State::Spawned(tokio::spawn(future)),
        }
    }

    /// Aborts the underlying task; awaiting afterwards yields a `CANCELED` failure.
    pub fn cancel(&self) {
        if let State::Spawned(handle) = &self.state {
            handle.abort();
        }
    }

    /// 結果が確定しているか
    pub fn is_resolved(&self) -> bool {
        match &self.state {
            State::Ready(_) => true,
            State::Spawned(handle) => handle.is_finished(),
        }
    }
}

impl Future for Deferred {
    type Output = CommandResult;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match &mut self.get_mut().state {
            State::Ready(result) => Poll::Ready(
                result
                    .take()
                    .unwrap_or_else(|| Err(Failure::internal("deferred result polled twice"))),
            ),
            State::Spawned(handle) => Pin::new(handle).poll(cx).map(|joined| match joined {
                Ok(result) => result,
                Err(err) if err.is_cancelled() => Err(Failure::canceled("command was canceled")),
                Err(err) => Err(Failure::internal(format!("handler panicked: {err}"))),
            }),
        }
    }
}

impl Drop for Deferred {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl std::fmt::Debug for Deferred {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match &self.state {
            State::Ready(_) => "ready",
            State::Spawned(_) => "spawned",
        };
        f.debug_struct("Deferred")
            .field("state", &state)
            .field("resolved", &self.is_resolved())
            .finish()
    }
}
