use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::marshal::KeyedData;

/// Opaque arguments / results carried by a command.
pub type Payloads = Vec<Value>;

/// String-keyed context propagated by the transport layer.
pub type Headers = HashMap<String, String>;

/// サービスが採番するリクエスト ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(u64);

impl RequestId {
    /// RequestId を作成
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Command kinds understood by the built-in routes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CommandKind {
    StartWorkflow,
    InvokeActivity,
    InvokeSignal,
    InvokeQuery,
    StackTrace,
    DestroyWorkflow,
}

impl CommandKind {
    /// 全コマンド種別
    pub const ALL: [CommandKind; 6] = [
        Self::StartWorkflow,
        Self::InvokeActivity,
        Self::InvokeSignal,
        Self::InvokeQuery,
        Self::StackTrace,
        Self::DestroyWorkflow,
    ];

    /// ワイヤ上のコマンド名
    pub fn as_str(self) -> &'static str {
        match self {
            Self::StartWorkflow => "StartWorkflow",
            Self::InvokeActivity => "InvokeActivity",
            Self::InvokeSignal => "InvokeSignal",
            Self::InvokeQuery => "InvokeQuery",
            Self::StackTrace => "StackTrace",
            Self::DestroyWorkflow => "DestroyWorkflow",
        }
    }

    /// Exact, case-sensitive match on the wire name.
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == name)
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A decoded command: what must happen, with its options and payloads.
///
/// The command name is kept as a string so that unknown kinds survive decoding
/// and can be reported by the router.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    id: RequestId,
    #[serde(rename = "command")]
    name: String,
    #[serde(default)]
    options: KeyedData,
    #[serde(default)]
    payloads: Payloads,
}

impl Request {
    /// Request を作成
    pub fn new(id: RequestId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            options: KeyedData::new(),
            payloads: Payloads::new(),
        }
    }

    /// オプションを設定
    pub fn with_options(mut self, options: KeyedData) -> Self {
        self.options = options;
        self
    }

    /// payload を設定
    pub fn with_payloads(mut self, payloads: Payloads) -> Self {
        self.payloads = payloads;
        self
    }

    pub fn id(&self) -> RequestId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// 既知のコマンド種別なら Some
    pub fn kind(&self) -> Option<CommandKind> {
        CommandKind::parse(&self.name)
    }

    pub fn options(&self) -> &KeyedData {
        &self.options
    }

    pub fn payloads(&self) -> &Payloads {
        &self.payloads
    }

    pub fn into_payloads(self) -> Payloads {
        self.payloads
    }
}
