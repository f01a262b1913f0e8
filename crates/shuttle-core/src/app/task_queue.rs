//! TaskQueue - キュー名・ルーター・宣言済み型レジストリの束
//!
//! # dispatch の順序
//! 1. `Environment::update(headers)`（ハンドラが最新の ambient 状態を読めるように）
//! 2. `Router::dispatch`
//!
//! ルートの集合は構築後に変わりません。レジストリは `add_workflow` / `add_activity`
//! でいつでも追加・上書きできます（同期的に完了し、途中で await しない）。

use parking_lot::RwLockReadGuard;

use super::repository::{RegistryError, Repository};
use super::running::RunningWorkflows;
use super::services::Services;
use crate::dispatch::{Deferred, DispatchError, Router, default_router};
use crate::domain::{Headers, Request};
use crate::ports::{ActivityPrototype, DeclaresActivities, DeclaresWorkflows, WorkflowPrototype};

/// キュー名・ルーター・宣言済み型レジストリ
#[derive(Debug)]
pub struct TaskQueue {
    name: String,
    services: Services,
    router: Router,
}

impl TaskQueue {
    /// Queue with the built-in routes.
    pub fn new(name: impl Into<String>, services: Services) -> Self {
        let router = default_router(&services);
        Self::with_router(name, services, router)
    }

    /// 任意のルーターでキューを作成
    pub fn with_router(name: impl Into<String>, services: Services, router: Router) -> Self {
        Self {
            name: name.into(),
            services,
            router,
        }
    }

    /// キュー名
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Registers every workflow `D` declares. Nothing is registered on conflict.
    pub fn add_workflow<D: DeclaresWorkflows>(
        &self,
        overwrite: bool,
    ) -> Result<&Self, RegistryError> {
        self.services.workflows.write().add_all(D::workflows(), overwrite)?;
        Ok(self)
    }

    /// Registers every activity `D` declares. Nothing is registered on conflict.
    pub fn add_activity<D: DeclaresActivities>(
        &self,
        overwrite: bool,
    ) -> Result<&Self, RegistryError> {
        self.services.activities.write().add_all(D::activities(), overwrite)?;
        Ok(self)
    }

    /// ワークフロー宣言を 1 件登録
    pub fn register_workflow(
        &self,
        prototype: WorkflowPrototype,
        overwrite: bool,
    ) -> Result<&Self, RegistryError> {
        self.services.workflows.write().add(prototype, overwrite)?;
        Ok(self)
    }

    /// アクティビティ宣言を 1 件登録
    pub fn register_activity(
        &self,
        prototype: ActivityPrototype,
        overwrite: bool,
    ) -> Result<&Self, RegistryError> {
        self.services.activities.write().add(prototype, overwrite)?;
        Ok(self)
    }

    /// Read-only view; do not hold it across an await.
    pub fn workflows(&self) -> RwLockReadGuard<'_, Repository<WorkflowPrototype>> {
        self.services.workflows.read()
    }

    /// Read-only view; do not hold it across an await.
    pub fn activities(&self) -> RwLockReadGuard<'_, Repository<ActivityPrototype>> {
        self.services.activities.read()
    }

    /// 実行中インスタンス表
    pub fn running(&self) -> &RunningWorkflows {
        &self.services.running
    }

    /// 共有ハンドル
    pub fn services(&self) -> &Services {
        &self.services
    }

    /// Environment を更新してからルーターへ委譲
    pub fn dispatch(&self, request: Request, headers: &Headers) -> Result<Deferred, DispatchError> {
        self.services.env.update(headers);
        self.router.dispatch(request, headers)
    }
}
