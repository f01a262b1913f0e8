//! Failure model: the command-level error description sent back to the
//! orchestration service.
//!
//! Every layer error (marshal, dispatch, registry) converts into a `Failure`,
//! so a deferred result always resolves to either payloads or a `Failure`.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::request::Payloads;
use crate::app::RegistryError;
use crate::dispatch::DispatchError;
use crate::marshal::MarshalError;

/// Classification of a failed command.
///
/// Serialized as SCREAMING_SNAKE_CASE, e.g. `UNHANDLED_COMMAND`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureKind {
    Reflection,
    TypeConversion,
    UnhandledCommand,
    RegistrationConflict,
    NotFound,
    AlreadyRunning,
    /// Raised by user workflow or activity code.
    Application,
    Canceled,
    Internal,
}

impl FailureKind {
    /// ワイヤ上の表記
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Reflection => "REFLECTION",
            Self::TypeConversion => "TYPE_CONVERSION",
            Self::UnhandledCommand => "UNHANDLED_COMMAND",
            Self::RegistrationConflict => "REGISTRATION_CONFLICT",
            Self::NotFound => "NOT_FOUND",
            Self::AlreadyRunning => "ALREADY_RUNNING",
            Self::Application => "APPLICATION",
            Self::Canceled => "CANCELED",
            Self::Internal => "INTERNAL",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// コマンド単位の失敗（種別 + メッセージ）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct Failure {
    pub kind: FailureKind,
    pub message: String,
}

impl Failure {
    /// Failure を作成
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// ユーザーコード由来の失敗
    pub fn application(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Application, message)
    }

    /// 対象が見つからない
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(FailureKind::NotFound, message)
    }

    /// キャンセルされた
    pub fn canceled(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Canceled, message)
    }

    /// 内部エラー
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Internal, message)
    }
}

impl From<MarshalError> for Failure {
    fn from(err: MarshalError) -> Self {
        let kind = match err {
            MarshalError::Reflection { .. } => FailureKind::Reflection,
            MarshalError::TypeConversion { .. } => FailureKind::TypeConversion,
        };
        Self::new(kind, err.to_string())
    }
}

impl From<DispatchError> for Failure {
    fn from(err: DispatchError) -> Self {
        let kind = match err {
            DispatchError::UnhandledCommand(_) => FailureKind::UnhandledCommand,
            DispatchError::UnknownTaskQueue(_) => FailureKind::NotFound,
        };
        Self::new(kind, err.to_string())
    }
}

impl From<RegistryError> for Failure {
    fn from(err: RegistryError) -> Self {
        Self::new(FailureKind::RegistrationConflict, err.to_string())
    }
}

/// What a deferred result resolves to.
pub type CommandResult = Result<Payloads, Failure>;
