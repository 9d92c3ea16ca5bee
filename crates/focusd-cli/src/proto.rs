//! Request/reply wire protocol: one JSON document per line.
//!
//! Requests carry no arguments, so each one is just a method token. Every
//! reply is either a status report or an error message.

use serde::{Deserialize, Serialize};

use focusd_core::StatusReport;

/// A client request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Request {
    Status,
    Play,
    Pause,
    Skip,
    Stop,
}

/// A daemon reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "lowercase")]
pub enum Response {
    Ok { status: StatusReport },
    Error { message: String },
}
