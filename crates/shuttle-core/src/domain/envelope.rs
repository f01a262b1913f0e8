//! Transport-facing frames: an inbound `Envelope` (request + headers) and the
//! outbound `Response` that answers it.

use serde::{Deserialize, Serialize};

use super::failure::{CommandResult, Failure};
use super::request::{Headers, Payloads, Request, RequestId};

/// 受信フレーム（リクエスト + ヘッダー）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(flatten)]
    pub request: Request,
    #[serde(default)]
    pub headers: Headers,
}

impl Envelope {
    /// Envelope を作成
    pub fn new(request: Request, headers: Headers) -> Self {
        Self { request, headers }
    }
}

/// Exactly one of `payloads` / `error` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub id: RequestId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payloads: Option<Payloads>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Failure>,
}

impl Response {
    /// CommandResult から Response を作成
    pub fn from_result(id: RequestId, result: CommandResult) -> Self {
        match result {
            Ok(payloads) => Self {
                id,
                payloads: Some(payloads),
                error: None,
            },
            Err(failure) => Self {
                id,
                payloads: None,
                error: Some(failure),
            },
        }
    }

    /// CommandResult に戻す
    pub fn into_result(self) -> CommandResult {
        match self.error {
            Some(failure) => Err(failure),
            None => Ok(self.payloads.unwrap_or_default()),
        }
    }
}
