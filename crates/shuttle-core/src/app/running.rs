//! Running-instance table, shared by the workflow routes of one task queue.
//!
//! Mutations are synchronous and never held across an await.

use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::Mutex;

use crate::ports::WorkflowInstance;

/// 実行中のワークフローインスタンス表（run id → instance）
#[derive(Default)]
pub struct RunningWorkflows {
    instances: Mutex<IndexMap<String, Arc<dyn WorkflowInstance>>>,
}

impl RunningWorkflows {
    /// 空の表を作成
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` and leaves the table unchanged if `run_id` is taken.
    pub fn insert(&self, run_id: impl Into<String>, instance: Arc<dyn WorkflowInstance>) -> bool {
        let mut instances = self.instances.lock();
        let run_id = run_id.into();
        if instances.contains_key(&run_id) {
            return false;
        }
        instances.insert(run_id, instance);
        true
    }

    /// run id で検索
    pub fn find(&self, run_id: &str) -> Option<Arc<dyn WorkflowInstance>> {
        self.instances.lock().get(run_id).cloned()
    }

    /// run id が実行中か
    pub fn contains(&self, run_id: &str) -> bool {
        self.instances.lock().contains_key(run_id)
    }

    /// 取り除いて返す
    pub fn remove(&self, run_id: &str) -> Option<Arc<dyn WorkflowInstance>> {
        self.instances.lock().shift_remove(run_id)
    }

    /// 登録順の run id 一覧
    pub fn run_ids(&self) -> Vec<String> {
        self.instances.lock().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.instances.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.lock().is_empty()
    }
}

impl std::fmt::Debug for RunningWorkflows {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunningWorkflows")
            .field("run_ids", &self.run_ids())
            .finish()
    }
}
