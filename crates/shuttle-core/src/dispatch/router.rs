//! Command routing.
//!
//! The router scans its routes in registration order and hands the command to
//! the first one whose predicate matches. It never awaits or transforms the
//! deferred result the route returns.

use tracing::{debug, warn};

use super::deferred::Deferred;
use super::errors::DispatchError;
use super::route::Route;
use crate::domain::{Headers, Request};

/// Tracing target for dispatch operations.
pub(crate) const DISPATCH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::dispatch");

/// 登録順に走査し、最初にマッチした Route へ委譲するルーター
#[derive(Default)]
pub struct Router {
    routes: Vec<Box<dyn Route>>,
}

impl Router {
    /// 空のルーターを作成
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a route. Earlier routes win when predicates overlap.
    pub fn add(&mut self, route: impl Route + 'static) -> &mut Self {
        self.routes.push(Box::new(route));
        self
    }

    /// Route を追加（builder 形式）
    pub fn with(mut self, route: impl Route + 'static) -> Self {
        self.add(route);
        self
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Routes `request` to the first matching route.
    ///
    /// # Errors
    ///
    /// Returns `DispatchError::UnhandledCommand` naming the command when no
    /// route matches.
    pub fn dispatch(&self, request: Request, headers: &Headers) -> Result<Deferred, DispatchError> {
        let Some((index, route)) = self
            .routes
            .iter()
            .enumerate()
            .find(|(_, route)| route.matches(&request))
        else {
            warn!(
                target: DISPATCH_TARGET,
                id = %request.id(),
                command = request.name(),
                "no route matches command"
            );
            return Err(DispatchError::UnhandledCommand(request.name().to_owned()));
        };

        debug!(
            target: DISPATCH_TARGET,
            id = %request.id(),
            command = request.name(),
            route = index,
            "routing command"
        );
        Ok(route.handle(request, headers))
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("routes", &self.routes.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FailureKind, RequestId};
    use serde_json::json;

    /// Matches a fixed command name and answers with its tag.
    struct Tagged {
        command: &'static str,
        tag: &'static str,
    }

    impl Route for Tagged {
        fn matches(&self, request: &Request) -> bool {
            request.name() == self.command
        }

        fn handle(&self, _request: Request, _headers: &Headers) -> Deferred {
            Deferred::resolved(vec![json!(self.tag)])
        }
    }

    struct CatchAll;

    impl Route for CatchAll {
        fn matches(&self, _request: &Request) -> bool {
            true
        }

        fn handle(&self, _request: Request, _headers: &Headers) -> Deferred {
            Deferred::resolved(vec![json!("catch-all")])
        }
    }

    fn request(name: &str) -> Request {
        Request::new(RequestId::new(1), name)
    }

    #[tokio::test]
    async fn test_first_registered_route_wins() {
        let router = Router::new()
            .with(Tagged {
                command: "InvokeQuery",
                tag: "specific",
            })
            .with(CatchAll);

        let result = router
            .dispatch(request("InvokeQuery"), &Headers::new())
            .unwrap()
            .await
            .unwrap();
        assert_eq!(result, vec![json!("specific")]);

        let reversed = Router::new().with(CatchAll).with(Tagged {
            command: "InvokeQuery",
            tag: "specific",
        });
        let result = reversed
            .dispatch(request("InvokeQuery"), &Headers::new())
            .unwrap()
            .await
            .unwrap();
        assert_eq!(result, vec![json!("catch-all")]);
    }

    #[test]
    fn test_unmatched_command_is_reported_by_name() {
        let router = Router::new().with(Tagged {
            command: "StackTrace",
            tag: "trace",
        });

        let err = router.dispatch(request("Unknown"), &Headers::new()).unwrap_err();
        assert_eq!(err, DispatchError::UnhandledCommand("Unknown".to_owned()));
        assert_eq!(
            crate::domain::Failure::from(err).kind,
            FailureKind::UnhandledCommand
        );
    }

    #[test]
    fn test_empty_router_handles_nothing() {
        let router = Router::new();
        assert!(router.is_empty());
        assert!(router.dispatch(request("StartWorkflow"), &Headers::new()).is_err());
    }
}
