use std::sync::Arc;

use tracing::debug;

use super::decode_options;
use crate::app::Services;
use crate::dispatch::router::DISPATCH_TARGET;
use crate::dispatch::{Deferred, Route};
use crate::domain::{CommandKind, Failure, FailureKind, Headers, Request, StartWorkflowOptions};

/// Instantiates a registered workflow and runs it until completion.
///
/// Registration in the running table happens before the deferred result is
/// returned, so signals and queries dispatched right after are served.
pub struct StartWorkflow {
    services: Services,
}

impl StartWorkflow {
    /// 共有ハンドルからルートを作成
    pub fn new(services: Services) -> Self {
        Self { services }
    }

    fn start(&self, request: Request) -> Result<Deferred, Failure> {
        let options: StartWorkflowOptions = decode_options(&self.services, &request)?;
        let info = options.info;
        let workflow_type = info.workflow_type.name.clone();
        let run_id = info.execution.run_id.clone();

        let handler = self
            .services
            .workflows
            .read()
            .find(&workflow_type)
            .map(|prototype| Arc::clone(prototype.handler()))
            .ok_or_else(|| {
                Failure::not_found(format!("workflow `{workflow_type}` is not registered"))
            })?;

        if self.services.running.contains(&run_id) {
            return Err(already_running(&run_id));
        }

        let instance = handler.instantiate(info, request.into_payloads())?;
        if !self.services.running.insert(run_id.clone(), Arc::clone(&instance)) {
            instance.destroy();
            return Err(already_running(&run_id));
        }

        debug!(
            target: DISPATCH_TARGET,
            workflow_type = %workflow_type,
            run_id = %run_id,
            "workflow started"
        );
        Ok(Deferred::spawn(async move { instance.start().await }))
    }
}

fn already_running(run_id: &str) -> Failure {
    Failure::new(
        FailureKind::AlreadyRunning,
        format!("workflow run `{run_id}` is already running"),
    )
}

impl Route for StartWorkflow {
    fn matches(&self, request: &Request) -> bool {
        request.kind() == Some(CommandKind::StartWorkflow)
    }

    fn handle(&self, request: Request, _headers: &Headers) -> Deferred {
        self.start(request).unwrap_or_else(Deferred::failed)
    }
}
