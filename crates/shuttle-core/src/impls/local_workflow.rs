//! LocalWorkflow - closure で書くインプロセスのワークフローエンジン
//!
//! 本番では replay engine がワークフローを実行しますが、テストとデモでは
//! async closure をそのまま 1 インスタンス = 1 tokio タスクとして走らせます。
//!
//! # 使用例
//! ```ignore
//! struct Greeting;
//!
//! impl DeclaresWorkflows for Greeting {
//!     fn workflows() -> Vec<WorkflowPrototype> {
//!         let body = LocalWorkflow::new(|ctx, _args| async move {
//!             ctx.expose("status", json!("waiting"));
//!             let name = ctx.signal("name").await;
//!             Ok(name)
//!         });
//!         vec![body.prototype("Greeting")]
//!     }
//! }
//!
//! queue.add_workflow::<Greeting>(false)?;
//! ```

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::Notify;
use tokio::task::AbortHandle;

use crate::domain::{CommandResult, Failure, Payloads, WorkflowInfo};
use crate::ports::{WorkflowHandler, WorkflowInstance, WorkflowPrototype};

type BodyFuture = Pin<Box<dyn Future<Output = CommandResult> + Send>>;
type BoxedBody = Arc<dyn Fn(WorkflowContext, Payloads) -> BodyFuture + Send + Sync>;

/// closure をワークフロー本体にする WorkflowHandler
#[derive(Clone)]
pub struct LocalWorkflow {
    body: BoxedBody,
}

impl LocalWorkflow {
    /// async closure から作成
    pub fn new<F, Fut>(body: F) -> Self
    where
        F: Fn(WorkflowContext, Payloads) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = CommandResult> + Send + 'static,
    {
        Self {
            body: Arc::new(move |ctx: WorkflowContext, args: Payloads| -> BodyFuture {
                Box::pin(body(ctx, args))
            }),
        }
    }

    /// 名前を付けて WorkflowPrototype にする
    pub fn prototype(self, name: impl Into<String>) -> WorkflowPrototype {
        WorkflowPrototype::new(name, Arc::new(self))
    }
}

impl WorkflowHandler for LocalWorkflow {
    fn instantiate(
        &self,
        info: WorkflowInfo,
        args: Payloads,
    ) -> Result<Arc<dyn WorkflowInstance>, Failure> {
        Ok(Arc::new(LocalInstance {
            shared: Arc::new(Shared {
                info,
                signals: Mutex::new(HashMap::new()),
                queries: Mutex::new(HashMap::new()),
                trace: Mutex::new(String::from("created")),
                notify: Notify::new(),
                destroyed: AtomicBool::new(false),
            }),
            body: Arc::clone(&self.body),
            args: Mutex::new(Some(args)),
            task: Mutex::new(None),
        }))
    }
}

struct Shared {
    info: WorkflowInfo,
    signals: Mutex<HashMap<String, VecDeque<Payloads>>>,
    queries: Mutex<HashMap<String, Value>>,
    trace: Mutex<String>,
    notify: Notify,
    destroyed: AtomicBool,
}

impl Shared {
    fn take_signal(&self, name: &str) -> Option<Payloads> {
        self.signals.lock().get_mut(name).and_then(VecDeque::pop_front)
    }
}

/// Handle the workflow body uses to talk to its instance.
#[derive(Clone)]
pub struct WorkflowContext {
    shared: Arc<Shared>,
}

impl WorkflowContext {
    pub fn info(&self) -> &WorkflowInfo {
        &self.shared.info
    }

    /// Waits for the next signal named `name`. Signals that arrived earlier are
    /// buffered and returned in arrival order.
    pub async fn signal(&self, name: &str) -> Payloads {
        loop {
            let notified = self.shared.notify.notified();
            if let Some(args) = self.shared.take_signal(name) {
                return args;
            }
            notified.await;
        }
    }

    /// Publishes `value` as the answer to query `name`.
    pub fn expose(&self, name: impl Into<String>, value: Value) {
        self.shared.queries.lock().insert(name.into(), value);
    }

    /// Sets the label reported by stack-trace requests.
    pub fn trace(&self, label: impl Into<String>) {
        *self.shared.trace.lock() = label.into();
    }
}

struct LocalInstance {
    shared: Arc<Shared>,
    body: BoxedBody,
    args: Mutex<Option<Payloads>>,
    task: Mutex<Option<AbortHandle>>,
}

#[async_trait]
impl WorkflowInstance for LocalInstance {
    fn info(&self) -> &WorkflowInfo {
        &self.shared.info
    }

    async fn start(&self) -> CommandResult {
        let args = self
            .args
            .lock()
            .take()
            .ok_or_else(|| Failure::internal("workflow was already started"))?;

        let ctx = WorkflowContext {
            shared: Arc::clone(&self.shared),
        };
        let handle = tokio::spawn((self.body)(ctx, args));
        *self.task.lock() = Some(handle.abort_handle());
        // Dropping the start future (a canceled command) stops the body as well.
        let _body = AbortOnDrop(handle.abort_handle());

        // destroy() may have run before the abort handle was stored.
        if self.shared.destroyed.load(Ordering::SeqCst) {
            handle.abort();
        }

        match handle.await {
            Ok(result) => result,
            Err(err) if err.is_cancelled() => Err(Failure::canceled("workflow was destroyed")),
            Err(err) => Err(Failure::internal(format!("workflow panicked: {err}"))),
        }
    }

    async fn signal(&self, name: &str, args: Payloads) -> Result<(), Failure> {
        if self.shared.destroyed.load(Ordering::SeqCst) {
            return Err(Failure::canceled("workflow was destroyed"));
        }
        self.shared
            .signals
            .lock()
            .entry(name.to_owned())
            .or_default()
            .push_back(args);
        self.shared.notify.notify_waiters();
        Ok(())
    }

    fn query(&self, name: &str, _args: Payloads) -> CommandResult {
        self.shared
            .queries
            .lock()
            .get(name)
            .map(|value| vec![value.clone()])
            .ok_or_else(|| Failure::not_found(format!("query `{name}` is not exposed")))
    }

    fn stack_trace(&self) -> String {
        self.shared.trace.lock().clone()
    }

    fn destroy(&self) {
        self.shared.destroyed.store(true, Ordering::SeqCst);
        if let Some(task) = self.task.lock().take() {
            task.abort();
        }
    }
}

struct AbortOnDrop(AbortHandle);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

impl Drop for LocalInstance {
    fn drop(&mut self) {
        self.destroy();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::FailureKind;
    use serde_json::json;

    /// Lets spawned tasks run up to their next suspension point.
    async fn settle() {
        for _ in 0..5 {
            tokio::task::yield_now().await;
        }
    }

    fn instance(workflow: &LocalWorkflow) -> Arc<dyn WorkflowInstance> {
        workflow
            .instantiate(WorkflowInfo::default(), vec![json!("hi")])
            .unwrap()
    }

    #[tokio::test]
    async fn test_body_receives_args_and_buffered_signals() {
        let workflow = LocalWorkflow::new(|ctx, args| async move {
            let first = ctx.signal("go").await;
            Ok(vec![args[0].clone(), first[0].clone()])
        });
        let instance = instance(&workflow);

        // Delivered before the body waits; must not be lost.
        instance.signal("go", vec![json!(1)]).await.unwrap();
        let result = instance.start().await.unwrap();
        assert_eq!(result, vec![json!("hi"), json!(1)]);
    }

    #[tokio::test]
    async fn test_queries_and_trace_reflect_body_state() {
        let workflow = LocalWorkflow::new(|ctx, _| async move {
            ctx.expose("status", json!("waiting"));
            ctx.trace("awaiting signal `done`");
            ctx.signal("done").await;
            Ok(Vec::new())
        });
        let instance = instance(&workflow);
        let running = Arc::clone(&instance);
        let task = tokio::spawn(async move { running.start().await });

        settle().await;
        assert_eq!(instance.query("status", Vec::new()).unwrap(), vec![json!("waiting")]);
        assert_eq!(instance.stack_trace(), "awaiting signal `done`");
        assert_eq!(
            instance.query("other", Vec::new()).unwrap_err().kind,
            FailureKind::NotFound
        );

        instance.signal("done", Vec::new()).await.unwrap();
        assert!(task.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_destroy_cancels_a_waiting_body() {
        let workflow = LocalWorkflow::new(|ctx, _| async move {
            ctx.signal("never").await;
            Ok(Vec::new())
        });
        let instance = instance(&workflow);
        let running = Arc::clone(&instance);
        let task = tokio::spawn(async move { running.start().await });
        settle().await;

        instance.destroy();
        let err = task.await.unwrap().unwrap_err();
        assert_eq!(err.kind, FailureKind::Canceled);
        assert!(instance.signal("never", Vec::new()).await.is_err());
    }

    #[tokio::test]
    async fn test_dropping_start_stops_the_body() {
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let tx = Arc::new(Mutex::new(Some(tx)));
        let workflow = LocalWorkflow::new(move |ctx, _| {
            let held = tx.lock().take();
            async move {
                let _held = held;
                ctx.signal("never").await;
                Ok(Vec::new())
            }
        });
        let instance = instance(&workflow);
        let running = Arc::clone(&instance);
        let task = tokio::spawn(async move { running.start().await });
        settle().await;

        task.abort();
        assert!(rx.await.is_err());
    }

    #[tokio::test]
    async fn test_start_runs_once() {
        let workflow = LocalWorkflow::new(|_, _| async { Ok(Vec::new()) });
        let instance = instance(&workflow);
        instance.start().await.unwrap();
        assert_eq!(
            instance.start().await.unwrap_err().kind,
            FailureKind::Internal
        );
    }
}
