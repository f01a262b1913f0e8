//! Built-in routes, one per command kind.

mod destroy_workflow;
mod invoke_activity;
mod invoke_query;
mod invoke_signal;
mod stack_trace;
mod start_workflow;

use std::sync::Arc;

pub use self::destroy_workflow::DestroyWorkflow;
pub use self::invoke_activity::InvokeActivity;
pub use self::invoke_query::InvokeQuery;
pub use self::invoke_signal::InvokeSignal;
pub use self::stack_trace::StackTrace;
pub use self::start_workflow::StartWorkflow;

use super::Router;
use crate::app::Services;
use crate::domain::{Failure, Request};
use crate::marshal::Reflect;
use crate::ports::WorkflowInstance;

/// Router with every built-in route, activities first.
pub fn default_router(services: &Services) -> Router {
    Router::new()
        .with(InvokeActivity::new(services.clone()))
        .with(StartWorkflow::new(services.clone()))
        .with(InvokeQuery::new(services.clone()))
        .with(InvokeSignal::new(services.clone()))
        .with(DestroyWorkflow::new(services.clone()))
        .with(StackTrace::new(services.clone()))
}

fn decode_options<T: Reflect + Default>(
    services: &Services,
    request: &Request,
) -> Result<T, Failure> {
    Ok(services.marshaller.decode(request.options())?)
}

fn find_running(services: &Services, run_id: &str) -> Result<Arc<dyn WorkflowInstance>, Failure> {
    services
        .running
        .find(run_id)
        .ok_or_else(|| Failure::not_found(format!("workflow run `{run_id}` is not running")))
}
