use thiserror::Error;

/// ルーティングのエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// No registered route matched the command.
    #[error("unhandled command `{0}`")]
    UnhandledCommand(String),

    #[error("unknown task queue `{0}`")]
    UnknownTaskQueue(String),
}
