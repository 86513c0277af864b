//! Minimal WAMP v2 message codec (JSON serialization)
//!
//! Only the messages a caller needs are modelled: session open/close and a
//! single CALL/RESULT exchange.

use serde_json::{json, Value};

use super::RpcError;

/// WebSocket subprotocol for JSON-serialized WAMP v2
pub const WAMP_SUBPROTOCOL: &str = "wamp.2.json";

pub const HELLO: u64 = 1;
pub const WELCOME: u64 = 2;
pub const ABORT: u64 = 3;
pub const GOODBYE: u64 = 6;
pub const ERROR: u64 = 8;
pub const CALL: u64 = 48;
pub const RESULT: u64 = 50;

/// Close reason sent when the caller leaves the realm
pub const CLOSE_REALM: &str = "wamp.close.close_realm";
pub const GOODBYE_AND_OUT: &str = "wamp.close.goodbye_and_out";

#[derive(Debug, Clone, PartialEq)]
pub enum WampMessage {
    Hello {
        realm: String,
        details: Value,
    },
    Welcome {
        session: u64,
        details: Value,
    },
    Abort {
        details: Value,
        reason: String,
    },
    Goodbye {
        details: Value,
        reason: String,
    },
    Error {
        request_type: u64,
        request_id: u64,
        details: Value,
        error: String,
        args: Vec<Value>,
    },
    Call {
        request_id: u64,
        options: Value,
        procedure: String,
        args: Vec<Value>,
    },
    Result {
        request_id: u64,
        details: Value,
        args: Vec<Value>,
    },
}

impl WampMessage {
    /// HELLO announcing the caller role only
    pub fn hello(realm: &str) -> Self {
        Self::Hello {
            realm: realm.to_string(),
            details: json!({ "roles": { "caller": { "features": {} } } }),
        }
    }

    pub fn call(request_id: u64, procedure: &str, args: Vec<Value>) -> Self {
        Self::Call {
            request_id,
            options: json!({}),
            procedure: procedure.to_string(),
            args,
        }
    }

    pub fn goodbye(reason: &str) -> Self {
        Self::Goodbye {
            details: json!({}),
            reason: reason.to_string(),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Self::Hello { realm, details } => json!([HELLO, realm, details]),
            Self::Welcome { session, details } => json!([WELCOME, session, details]),
            Self::Abort { details, reason } => json!([ABORT, details, reason]),
            Self::Goodbye { details, reason } => json!([GOODBYE, details, reason]),
            Self::Error {
                request_type,
                request_id,
                details,
                error,
                args,
            } => json!([ERROR, request_type, request_id, details, error, args]),
            Self::Call {
                request_id,
                options,
                procedure,
                args,
            } => json!([CALL, request_id, options, procedure, args]),
            Self::Result {
                request_id,
                details,
                args,
            } => json!([RESULT, request_id, details, args]),
        }
    }

    pub fn parse(text: &str) -> Result<Self, RpcError> {
        let value: Value = serde_json::from_str(text)?;
        Self::from_json(value)
    }

    pub fn from_json(value: Value) -> Result<Self, RpcError> {
        let items = match value {
            Value::Array(items) => items,
            other => return Err(RpcError::protocol(format!("message is not a list: {other}"))),
        };
        let kind = items
            .first()
            .and_then(Value::as_u64)
            .ok_or_else(|| RpcError::protocol("message type is missing"))?;

        let message = match kind {
            HELLO => Self::Hello {
                realm: string_at(&items, 1)?,
                details: dict_at(&items, 2)?,
            },
            WELCOME => Self::Welcome {
                session: id_at(&items, 1)?,
                details: dict_at(&items, 2)?,
            },
            ABORT => Self::Abort {
                details: dict_at(&items, 1)?,
                reason: string_at(&items, 2)?,
            },
            GOODBYE => Self::Goodbye {
                details: dict_at(&items, 1)?,
                reason: string_at(&items, 2)?,
            },
            ERROR => Self::Error {
                request_type: id_at(&items, 1)?,
                request_id: id_at(&items, 2)?,
                details: dict_at(&items, 3)?,
                error: string_at(&items, 4)?,
                args: list_at(&items, 5),
            },
            CALL => Self::Call {
                request_id: id_at(&items, 1)?,
                options: dict_at(&items, 2)?,
                procedure: string_at(&items, 3)?,
                args: list_at(&items, 4),
            },
            RESULT => Self::Result {
                request_id: id_at(&items, 1)?,
                details: dict_at(&items, 2)?,
                args: list_at(&items, 3),
            },
            other => {
                return Err(RpcError::protocol(format!(
                    "unsupported message type {other}"
                )))
            }
        };
        Ok(message)
    }
}

fn id_at(items: &[Value], index: usize) -> Result<u64, RpcError> {
    items
        .get(index)
        .and_then(Value::as_u64)
        .ok_or_else(|| RpcError::protocol(format!("expected an id at position {index}")))
}

fn string_at(items: &[Value], index: usize) -> Result<String, RpcError> {
    items
        .get(index)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| RpcError::protocol(format!("expected a string at position {index}")))
}

fn dict_at(items: &[Value], index: usize) -> Result<Value, RpcError> {
    match items.get(index) {
        Some(Value::Object(map)) => Ok(Value::Object(map.clone())),
        _ => Err(RpcError::protocol(format!(
            "expected a dict at position {index}"
        ))),
    }
}

/// Positional arguments are optional trailing elements
fn list_at(items: &[Value], index: usize) -> Vec<Value> {
    match items.get(index) {
        Some(Value::Array(args)) => args.clone(),
        _ => Vec::new(),
    }
}
