//! WorkerBuilder - ワーカーの構築とワイヤリング
//!
//! # Fail-fast 設計
//! - `expect_workflows()` / `expect_activities()` で期待される名前を登録
//! - `build()` 時に「期待集合 ⊆ いずれかのキューの登録済み集合」をチェック
//! - 登録時の衝突（RegistrationConflict）も `build()` で `BuildError` として返す

use std::sync::Arc;

use super::config::WorkerConfig;
use super::env::Environment;
use super::repository::RegistryError;
use super::task_queue::TaskQueue;
use super::worker::Worker;
use crate::impls::NoopClient;
use crate::marshal::{Marshaller, TypeMatcher};
use crate::ports::{Clock, SystemClock, WorkflowClient};

type Configure = Box<dyn FnOnce(&TaskQueue) -> Result<(), RegistryError>>;

/// # 使用例
/// ```ignore
/// let worker = WorkerBuilder::new()
///     .task_queue("default", |queue| {
///         queue.add_workflow::<Greeting>(false)?;
///         queue.add_activity::<Hello>(false)?;
///         Ok(())
///     })
///     .expect_workflows(&["Greeting"])
///     .build()?;
/// ```
pub struct WorkerBuilder {
    config: WorkerConfig,
    matchers: Vec<Arc<dyn TypeMatcher>>,
    clock: Arc<dyn Clock>,
    client: Arc<dyn WorkflowClient>,
    queues: Vec<(String, Configure)>,
    expected_workflows: Option<Vec<String>>,
    expected_activities: Option<Vec<String>>,
}

/// build() 時に検出される構成エラー
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error(transparent)]
    Registration(#[from] RegistryError),

    #[error("Missing workflows: {0:?}. These workflows were expected but not registered.")]
    MissingWorkflows(Vec<String>),

    #[error("Missing activities: {0:?}. These activities were expected but not registered.")]
    MissingActivities(Vec<String>),
}

impl WorkerBuilder {
    /// 新しい WorkerBuilder を作成（SystemClock / NoopClient / デフォルト設定）
    pub fn new() -> Self {
        Self {
            config: WorkerConfig::default(),
            matchers: Vec::new(),
            clock: Arc::new(SystemClock),
            client: Arc::new(NoopClient),
            queues: Vec::new(),
            expected_workflows: None,
            expected_activities: None,
        }
    }

    /// ワーカー設定を差し替える
    pub fn config(mut self, config: WorkerConfig) -> Self {
        self.config = config;
        self
    }

    /// Adds a converter matcher. Matchers are consulted in the order added,
    /// before the built-in converters.
    pub fn matcher(mut self, matcher: Arc<dyn TypeMatcher>) -> Self {
        self.matchers.push(matcher);
        self
    }

    /// Environment が使う Clock を差し替える
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// DestroyWorkflow で使う WorkflowClient を差し替える
    pub fn client(mut self, client: Arc<dyn WorkflowClient>) -> Self {
        self.client = client;
        self
    }

    /// Declares a queue and how to populate its registries.
    pub fn task_queue<F>(mut self, name: impl Into<String>, configure: F) -> Self
    where
        F: FnOnce(&TaskQueue) -> Result<(), RegistryError> + 'static,
    {
        self.queues.push((name.into(), Box::new(configure)));
        self
    }

    /// build() 時に登録済みであるべきワークフロー名
    pub fn expect_workflows(mut self, names: &[&str]) -> Self {
        self.expected_workflows = Some(names.iter().map(|&name| name.to_owned()).collect());
        self
    }

    /// build() 時に登録済みであるべきアクティビティ名
    pub fn expect_activities(mut self, names: &[&str]) -> Self {
        self.expected_activities = Some(names.iter().map(|&name| name.to_owned()).collect());
        self
    }

    /// The default queue always exists, even when never configured.
    pub fn build(self) -> Result<Worker, BuildError> {
        let mut worker = Worker::new(
            self.config,
            Environment::new(self.clock),
            Arc::new(Marshaller::new(self.matchers)),
            self.client,
        );

        let default_queue = worker.config().default_task_queue.clone();
        worker.add_task_queue(default_queue);

        for (name, configure) in self.queues {
            configure(worker.add_task_queue(name))?;
        }

        if let Some(expected) = &self.expected_workflows {
            let missing = missing(expected, |name| {
                worker.task_queues().any(|q| q.workflows().contains(name))
            });
            if !missing.is_empty() {
                return Err(BuildError::MissingWorkflows(missing));
            }
        }

        if let Some(expected) = &self.expected_activities {
            let missing = missing(expected, |name| {
                worker.task_queues().any(|q| q.activities().contains(name))
            });
            if !missing.is_empty() {
                return Err(BuildError::MissingActivities(missing));
            }
        }

        Ok(worker)
    }
}

impl Default for WorkerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn missing(expected: &[String], registered: impl Fn(&str) -> bool) -> Vec<String> {
    expected
        .iter()
        .filter(|name| !registered(name))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::{Value, json};

    use crate::domain::{CommandResult, Headers, Payloads, Request, RequestId};
    use crate::impls::LocalWorkflow;
    use crate::marshal::{ConversionError, FieldType, TypeConverter, TypeRegistry};
    use crate::ports::{
        ActivityContext, ActivityHandler, ActivityPrototype, DeclaresActivities,
        DeclaresWorkflows, WorkflowPrototype,
    };

    struct Ping;

    #[async_trait]
    impl ActivityHandler for Ping {
        async fn execute(&self, _ctx: ActivityContext, _args: Payloads) -> CommandResult {
            Ok(vec![json!("pong")])
        }
    }

    struct Pinger;

    impl DeclaresActivities for Pinger {
        fn activities() -> Vec<ActivityPrototype> {
            vec![ActivityPrototype::new("Ping", Arc::new(Ping))]
        }
    }

    struct Waiter;

    impl DeclaresWorkflows for Waiter {
        fn workflows() -> Vec<WorkflowPrototype> {
            vec![LocalWorkflow::new(|_, _| async { Ok(Vec::new()) }).prototype("Wait")]
        }
    }

    #[test]
    fn test_build_success() {
        let worker = WorkerBuilder::new()
            .task_queue("default", |q| {
                q.add_activity::<Pinger>(false)?;
                Ok(())
            })
            .task_queue("slow", |q| {
                q.add_workflow::<Waiter>(false)?;
                Ok(())
            })
            .expect_workflows(&["Wait"])
            .expect_activities(&["Ping"])
            .build();
        let worker = worker.unwrap();
        assert_eq!(worker.task_queues().count(), 2);
    }

    #[test]
    fn test_build_always_creates_the_default_queue() {
        let worker = WorkerBuilder::new().build().unwrap();
        assert!(worker.task_queue("default").is_some());
    }

    #[test]
    fn test_build_missing_workflows() {
        let worker = WorkerBuilder::new()
            .task_queue("default", |q| {
                q.add_workflow::<Waiter>(false)?;
                Ok(())
            })
            .expect_workflows(&["Wait", "Refund"])
            .build();
        assert!(matches!(
            worker,
            Err(BuildError::MissingWorkflows(missing)) if missing == vec!["Refund".to_owned()]
        ));
    }

    #[test]
    fn test_build_missing_activities() {
        let worker = WorkerBuilder::new().expect_activities(&["Ping"]).build();
        assert!(matches!(worker, Err(BuildError::MissingActivities(_))));
    }

    #[test]
    fn test_build_surfaces_registration_conflicts() {
        let worker = WorkerBuilder::new()
            .task_queue("default", |q| {
                q.add_activity::<Pinger>(false)?;
                q.add_activity::<Pinger>(false)?;
                Ok(())
            })
            .build();
        assert!(matches!(worker, Err(BuildError::Registration(_))));
    }

    #[derive(Debug)]
    struct Upper;

    impl TypeConverter for Upper {
        fn serialize(&self, value: Value) -> Result<Value, ConversionError> {
            Ok(json!(value.as_str().unwrap_or_default().to_uppercase()))
        }

        fn parse(&self, raw: Value) -> Result<Value, ConversionError> {
            Ok(json!(raw.as_str().unwrap_or_default().to_uppercase()))
        }
    }

    #[tokio::test]
    async fn test_matchers_reach_the_marshaller_used_by_routes() {
        let upper: Arc<dyn TypeMatcher> =
            Arc::new(|ty: &FieldType, _: &TypeRegistry| -> Option<Arc<dyn TypeConverter>> {
                match ty {
                    FieldType::String => Some(Arc::new(Upper)),
                    _ => None,
                }
            });
        let worker = WorkerBuilder::new()
            .matcher(upper)
            .task_queue("default", |q| {
                q.register_activity(ActivityPrototype::new("PING", Arc::new(Ping)), false)?;
                Ok(())
            })
            .build()
            .unwrap();

        // `name` is upper-cased on the way in, so "ping" finds "PING".
        let mut options = crate::marshal::KeyedData::new();
        options.insert("name".to_owned(), json!("ping"));
        let request = Request::new(RequestId::new(1), "InvokeActivity").with_options(options);
        let result = worker.dispatch(request, &Headers::new()).await.unwrap();
        assert_eq!(result, vec![json!("pong")]);
    }
}
