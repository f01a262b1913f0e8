//! Services - ルートが共有するコラボレーター一式
//!
//! `Services` はタスクキューごとに 1 つ作られます。marshaller・environment・client は
//! ワーカー全体で共有、repository と running テーブルはキュー専有です。

use std::sync::Arc;

use parking_lot::RwLock;

use super::env::Environment;
use super::repository::Repository;
use super::running::RunningWorkflows;
use crate::marshal::Marshaller;
use crate::ports::{ActivityPrototype, WorkflowClient, WorkflowPrototype};

/// ワークフロー宣言のレジストリ（共有）
pub type WorkflowRepository = Arc<RwLock<Repository<WorkflowPrototype>>>;
/// アクティビティ宣言のレジストリ（共有）
pub type ActivityRepository = Arc<RwLock<Repository<ActivityPrototype>>>;

/// ルートが共有するハンドルの束
#[derive(Clone)]
pub struct Services {
    pub marshaller: Arc<Marshaller>,
    pub env: Environment,
    pub workflows: WorkflowRepository,
    pub activities: ActivityRepository,
    pub running: Arc<RunningWorkflows>,
    pub client: Arc<dyn WorkflowClient>,
}

impl Services {
    /// Fresh per-queue registries around the worker-wide collaborators.
    pub fn new(
        marshaller: Arc<Marshaller>,
        env: Environment,
        client: Arc<dyn WorkflowClient>,
    ) -> Self {
        Self {
            marshaller,
            env,
            workflows: Arc::new(RwLock::new(Repository::new("workflow"))),
            activities: Arc::new(RwLock::new(Repository::new("activity"))),
            running: Arc::new(RunningWorkflows::new()),
            client,
        }
    }
}

impl std::fmt::Debug for Services {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Services")
            .field("workflows", &self.workflows.read().names())
            .field("activities", &self.activities.read().names())
            .field("running", &self.running.len())
            .finish_non_exhaustive()
    }
}
