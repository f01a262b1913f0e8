use serde_json::Value;

use super::{decode_options, find_running};
use crate::app::Services;
use crate::dispatch::{Deferred, Route};
use crate::domain::{CommandKind, Failure, Headers, Request, StackTraceOptions};

/// 実行中インスタンスのスタックトレースを返す
pub struct StackTrace {
    services: Services,
}

impl StackTrace {
    /// 共有ハンドルからルートを作成
    pub fn new(services: Services) -> Self {
        Self { services }
    }

    fn trace(&self, request: &Request) -> Result<Deferred, Failure> {
        let options: StackTraceOptions = decode_options(&self.services, request)?;
        let instance = find_running(&self.services, &options.run_id)?;
        Ok(Deferred::resolved(vec![Value::String(instance.stack_trace())]))
    }
}

impl Route for StackTrace {
    fn matches(&self, request: &Request) -> bool {
        request.kind() == Some(CommandKind::StackTrace)
    }

    fn handle(&self, request: Request, _headers: &Headers) -> Deferred {
        self.trace(&request).unwrap_or_else(Deferred::failed)
    }
}
