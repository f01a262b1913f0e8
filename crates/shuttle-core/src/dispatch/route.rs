use crate::domain::{Headers, Request};

use super::deferred::Deferred;

/// One predicate-and-handler pair.
///
/// `handle` must not block: synchronous work (lookups, registry mutation) runs
/// inline, anything that suspends goes into the returned `Deferred`.
pub trait Route: Send + Sync {
    fn matches(&self, request: &Request) -> bool;

    fn handle(&self, request: Request, headers: &Headers) -> Deferred;
}
