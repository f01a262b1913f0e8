use std::sync::Arc;

use indexmap::IndexMap;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use super::APP_TARGET;
use super::config::WorkerConfig;
use super::env::Environment;
use super::services::Services;
use super::task_queue::TaskQueue;
use crate::dispatch::{Deferred, DispatchError};
use crate::domain::{Envelope, Failure, Headers, Request, Response};
use crate::marshal::Marshaller;
use crate::ports::WorkflowClient;

/// A worker process: several task queues sharing one marshaller, environment
/// and client.
///
/// - Commands are routed to the queue named by the configured header, or to the
///   default queue when the header is absent
/// - `dispatch` never fails; errors become resolved failures
pub struct Worker {
    config: WorkerConfig,
    env: Environment,
    marshaller: Arc<Marshaller>,
    client: Arc<dyn WorkflowClient>,
    queues: IndexMap<String, TaskQueue>,
}

impl Worker {
    /// キューを持たない Worker を作成
    pub fn new(
        config: WorkerConfig,
        env: Environment,
        marshaller: Arc<Marshaller>,
        client: Arc<dyn WorkflowClient>,
    ) -> Self {
        Self {
            config,
            env,
            marshaller,
            client,
            queues: IndexMap::new(),
        }
    }

    /// ワーカー設定
    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    /// 全キュー共有の Environment
    pub fn environment(&self) -> &Environment {
        &self.env
    }

    /// 全キュー共有の Marshaller
    pub fn marshaller(&self) -> &Arc<Marshaller> {
        &self.marshaller
    }

    /// Returns the queue named `name`, creating it with the built-in routes if needed.
    pub fn add_task_queue(&mut self, name: impl Into<String>) -> &TaskQueue {
        let name = name.into();
        let services = Services::new(
            Arc::clone(&self.marshaller),
            self.env.clone(),
            Arc::clone(&self.client),
        );
        self.queues
            .entry(name.clone())
            .or_insert_with(|| TaskQueue::new(name, services))
    }

    /// 名前でキューを検索
    pub fn task_queue(&self, name: &str) -> Option<&TaskQueue> {
        self.queues.get(name)
    }

    /// 登録順のキュー一覧
    pub fn task_queues(&self) -> impl Iterator<Item = &TaskQueue> {
        self.queues.values()
    }

    /// Selects the queue for `headers` and dispatches to it.
    ///
    /// # Errors
    ///
    /// `UnknownTaskQueue` when the selected queue does not exist, or whatever
    /// the queue's router reports.
    pub fn route(&self, request: Request, headers: &Headers) -> Result<Deferred, DispatchError> {
        let name = headers
            .get(&self.config.task_queue_header)
            .map(String::as_str)
            .unwrap_or(&self.config.default_task_queue);

        let queue = self
            .queues
            .get(name)
            .ok_or_else(|| DispatchError::UnknownTaskQueue(name.to_owned()))?;
        queue.dispatch(request, headers)
    }

    /// `route` のエラーを解決済みの Failure に変換する（失敗しない）
    pub fn dispatch(&self, request: Request, headers: &Headers) -> Deferred {
        let id = request.id();
        self.route(request, headers).unwrap_or_else(|err| {
            warn!(target: APP_TARGET, %id, error = %err, "command rejected");
            Deferred::failed(Failure::from(err))
        })
    }

    /// Serves commands until `commands` closes or `shutdown` flips to `true`.
    ///
    /// - One response per command, in completion order
    /// - On close, in-flight commands are drained
    /// - On shutdown, in-flight commands are canceled without a response, also
    ///   while draining
    pub async fn serve(
        self: Arc<Self>,
        mut commands: mpsc::Receiver<Envelope>,
        responses: mpsc::Sender<Response>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        info!(target: APP_TARGET, queues = self.queues.len(), "worker serving");
        let mut in_flight = JoinSet::new();

        loop {
            if *shutdown.borrow() {
                in_flight.abort_all();
                break;
            }

            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        // Sender gone: nobody can ask for a graceful stop any more.
                        in_flight.abort_all();
                        break;
                    }
                }
                Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                    if let Err(err) = joined {
                        if err.is_panic() {
                            warn!(target: APP_TARGET, error = %err, "response task panicked");
                        }
                    }
                }
                received = commands.recv() => {
                    let Some(Envelope { request, headers }) = received else {
                        debug!(
                            target: APP_TARGET,
                            pending = in_flight.len(),
                            "command stream closed"
                        );
                        break;
                    };
                    let id = request.id();
                    let deferred = self.dispatch(request, &headers);
                    let tx = responses.clone();
                    in_flight.spawn(async move {
                        let response = Response::from_result(id, deferred.await);
                        if tx.send(response).await.is_err() {
                            debug!(target: APP_TARGET, %id, "response receiver dropped");
                        }
                    });
                }
            }
        }

        // Drain, still honouring shutdown.
        while !in_flight.is_empty() {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        in_flight.abort_all();
                        while in_flight.join_next().await.is_some() {}
                    }
                }
                _ = in_flight.join_next() => {}
            }
        }
        info!(target: APP_TARGET, "worker stopped");
    }
}

impl std::fmt::Debug for Worker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Worker")
            .field("config", &self.config)
            .field("queues", &self.queues.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}
