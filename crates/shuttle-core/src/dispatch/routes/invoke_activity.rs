use std::sync::Arc;

use super::decode_options;
use crate::app::Services;
use crate::dispatch::{Deferred, Route};
use crate::domain::{CommandKind, Failure, Headers, InvokeActivityOptions, Request};
use crate::ports::ActivityContext;

/// 登録済みアクティビティを実行する
pub struct InvokeActivity {
    services: Services,
}

impl InvokeActivity {
    /// 共有ハンドルからルートを作成
    pub fn new(services: Services) -> Self {
        Self { services }
    }

    fn invoke(&self, request: Request, headers: &Headers) -> Result<Deferred, Failure> {
        let options: InvokeActivityOptions = decode_options(&self.services, &request)?;

        let handler = self
            .services
            .activities
            .read()
            .find(&options.name)
            .map(|prototype| Arc::clone(prototype.handler()))
            .ok_or_else(|| {
                Failure::not_found(format!("activity `{}` is not registered", options.name))
            })?;

        let ctx = ActivityContext::new(
            options.info,
            headers.clone(),
            self.services.env.now(),
            Arc::clone(&self.services.marshaller),
        );
        let args = request.into_payloads();
        Ok(Deferred::spawn(async move { handler.execute(ctx, args).await }))
    }
}

impl Route for InvokeActivity {
    fn matches(&self, request: &Request) -> bool {
        request.kind() == Some(CommandKind::InvokeActivity)
    }

    fn handle(&self, request: Request, headers: &Headers) -> Deferred {
        self.invoke(request, headers).unwrap_or_else(Deferred::failed)
    }
}
