//! Domain model (requests, command kinds, options, failures, frames).

pub mod envelope;
pub mod failure;
pub mod options;
pub mod request;

pub use self::envelope::{Envelope, Response};
pub use self::failure::{CommandResult, Failure, FailureKind};
pub use self::options::{
    ActivityInfo, ActivityType, DestroyWorkflowOptions, InvokeActivityOptions,
    InvokeQueryOptions, InvokeSignalOptions, StackTraceOptions, StartWorkflowOptions,
    WorkflowExecution, WorkflowInfo, WorkflowType,
};
pub use self::request::{CommandKind, Headers, Payloads, Request, RequestId};
