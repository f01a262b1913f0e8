use super::{decode_options, find_running};
use crate::app::Services;
use crate::dispatch::{Deferred, Route};
use crate::domain::{CommandKind, Failure, Headers, InvokeQueryOptions, Request};

/// Queries are answered synchronously from the instance's current state.
pub struct InvokeQuery {
    services: Services,
}

impl InvokeQuery {
    /// 共有ハンドルからルートを作成
    pub fn new(services: Services) -> Self {
        Self { services }
    }

    fn query(&self, request: Request) -> Result<Deferred, Failure> {
        let options: InvokeQueryOptions = decode_options(&self.services, &request)?;
        let instance = find_running(&self.services, &options.run_id)?;
        Ok(Deferred::ready(
            instance.query(&options.name, request.into_payloads()),
        ))
    }
}

impl Route for InvokeQuery {
    fn matches(&self, request: &Request) -> bool {
        request.kind() == Some(CommandKind::InvokeQuery)
    }

    fn handle(&self, request: Request, _headers: &Headers) -> Deferred {
        self.query(request).unwrap_or_else(Deferred::failed)
    }
}
