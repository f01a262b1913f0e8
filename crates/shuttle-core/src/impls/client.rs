use crate::ports::WorkflowClient;

/// Client for workers that never issue outbound requests.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopClient;

impl WorkflowClient for NoopClient {
    fn release(&self, _run_id: &str) -> usize {
        0
    }
}
