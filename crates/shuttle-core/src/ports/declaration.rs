//! Declaration port - ユーザー型が宣言するワークフロー/アクティビティ
//!
//! 1 つの型が複数のユニット（名前付きのワークフロー/アクティビティ）を宣言できます。
//! `TaskQueue::add_workflow::<D>()` は `D::workflows()` の結果を全部登録します。

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use super::activity::ActivityHandler;
use super::workflow::WorkflowHandler;

/// Something registered under a unique name in a repository.
pub trait Prototype {
    fn name(&self) -> &str;
}

/// ワークフロー宣言（名前・ハンドラ・メタデータ）
#[derive(Clone)]
pub struct WorkflowPrototype {
    name: String,
    handler: Arc<dyn WorkflowHandler>,
    metadata: Value,
}

impl WorkflowPrototype {
    /// 宣言を作成
    pub fn new(name: impl Into<String>, handler: Arc<dyn WorkflowHandler>) -> Self {
        Self {
            name: name.into(),
            handler,
            metadata: Value::Null,
        }
    }

    /// メタデータを付ける
    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = metadata;
        self
    }

    /// ハンドラ
    pub fn handler(&self) -> &Arc<dyn WorkflowHandler> {
        &self.handler
    }

    pub fn metadata(&self) -> &Value {
        &self.metadata
    }
}

impl Prototype for WorkflowPrototype {
    fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for WorkflowPrototype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkflowPrototype")
            .field("name", &self.name)
            .field("metadata", &self.metadata)
            .finish_non_exhaustive()
    }
}

/// アクティビティ宣言（名前・ハンドラ・メタデータ）
#[derive(Clone)]
pub struct ActivityPrototype {
    name: String,
    handler: Arc<dyn ActivityHandler>,
    metadata: Value,
}

impl ActivityPrototype {
    /// 宣言を作成
    pub fn new(name: impl Into<String>, handler: Arc<dyn ActivityHandler>) -> Self {
        Self {
            name: name.into(),
            handler,
            metadata: Value::Null,
        }
    }

    /// メタデータを付ける
    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = metadata;
        self
    }

    /// ハンドラ
    pub fn handler(&self) -> &Arc<dyn ActivityHandler> {
        &self.handler
    }

    pub fn metadata(&self) -> &Value {
        &self.metadata
    }
}

impl Prototype for ActivityPrototype {
    fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for ActivityPrototype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActivityPrototype")
            .field("name", &self.name)
            .field("metadata", &self.metadata)
            .finish_non_exhaustive()
    }
}

/// A user type that declares one or more workflows.
pub trait DeclaresWorkflows {
    fn workflows() -> Vec<WorkflowPrototype>;
}

/// A user type that declares one or more activities.
pub trait DeclaresActivities {
    fn activities() -> Vec<ActivityPrototype>;
}
