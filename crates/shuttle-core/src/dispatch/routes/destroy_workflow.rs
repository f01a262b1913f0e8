use tracing::debug;

use super::decode_options;
use crate::app::Services;
use crate::dispatch::router::DISPATCH_TARGET;
use crate::dispatch::{Deferred, Route};
use crate::domain::{CommandKind, DestroyWorkflowOptions, Failure, Headers, Request};

/// Tears down a running instance and drops the client requests it left behind.
pub struct DestroyWorkflow {
    services: Services,
}

impl DestroyWorkflow {
    /// 共有ハンドルからルートを作成
    pub fn new(services: Services) -> Self {
        Self { services }
    }

    fn destroy(&self, request: &Request) -> Result<Deferred, Failure> {
        let options: DestroyWorkflowOptions = decode_options(&self.services, request)?;
        let run_id = options.run_id;

        let instance = self.services.running.remove(&run_id).ok_or_else(|| {
            Failure::not_found(format!("workflow run `{run_id}` is not running"))
        })?;
        instance.destroy();
        let released = self.services.client.release(&run_id);

        debug!(target: DISPATCH_TARGET, run_id = %run_id, released, "workflow destroyed");
        Ok(Deferred::resolved(Vec::new()))
    }
}

impl Route for DestroyWorkflow {
    fn matches(&self, request: &Request) -> bool {
        request.kind() == Some(CommandKind::DestroyWorkflow)
    }

    fn handle(&self, request: Request, _headers: &Headers) -> Deferred {
        self.destroy(&request).unwrap_or_else(Deferred::failed)
    }
}
