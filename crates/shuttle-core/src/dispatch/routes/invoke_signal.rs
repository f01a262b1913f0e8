use super::{decode_options, find_running};
use crate::app::Services;
use crate::dispatch::{Deferred, Route};
use crate::domain::{CommandKind, Failure, Headers, InvokeSignalOptions, Request};

/// 実行中インスタンスにシグナルを配送する
pub struct InvokeSignal {
    services: Services,
}

impl InvokeSignal {
    /// 共有ハンドルからルートを作成
    pub fn new(services: Services) -> Self {
        Self { services }
    }

    fn signal(&self, request: Request) -> Result<Deferred, Failure> {
        let options: InvokeSignalOptions = decode_options(&self.services, &request)?;
        let instance = find_running(&self.services, &options.run_id)?;
        let args = request.into_payloads();

        Ok(Deferred::spawn(async move {
            instance.signal(&options.name, args).await?;
            Ok(Vec::new())
        }))
    }
}

impl Route for InvokeSignal {
    fn matches(&self, request: &Request) -> bool {
        request.kind() == Some(CommandKind::InvokeSignal)
    }

    fn handle(&self, request: Request, _headers: &Headers) -> Deferred {
        self.signal(request).unwrap_or_else(Deferred::failed)
    }
}
