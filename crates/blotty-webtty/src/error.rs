//! Terminal causes of a bridge session.

use std::fmt;

use crate::protocol::RequestType;

/// Which initialization frame failed to go out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeStep {
    WindowTitle,
    Reconnect,
    Preferences,
}

impl fmt::Display for HandshakeStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let step = match self {
            Self::WindowTitle => "send window title",
            Self::Reconnect => "set reconnect",
            Self::Preferences => "set preferences",
        };
        f.write_str(step)
    }
}

/// The side a failed pump write was aimed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteTarget {
    Upstream,
    Downstream,
}

impl fmt::Display for WriteTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Upstream => f.write_str("upstream"),
            Self::Downstream => f.write_str("downstream"),
        }
    }
}

/// Why [`WebTty::run`](crate::WebTty::run) returned.
///
/// Every variant is terminal; the bridge never recovers locally.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("upstream closed")]
    UpstreamClosed,

    #[error("downstream closed")]
    DownstreamClosed,

    #[error("failed to send initializing message: failed to {step}")]
    HandshakeWriteFailed {
        step: HandshakeStep,
        #[source]
        source: std::io::Error,
    },

    #[error("received malformed data for terminal resize")]
    MalformedResizePayload(#[source] serde_json::Error),

    #[error("unrecognized request type {0:?}")]
    UnrecognizedRequestType(RequestType),

    #[error("failed to write to {target}")]
    WriteFailed {
        target: WriteTarget,
        #[source]
        source: std::io::Error,
    },

    #[error("session cancelled")]
    Cancelled,
}

impl BridgeError {
    /// True when one of the peers simply went away.
    pub fn is_disconnect(&self) -> bool {
        matches!(self, Self::UpstreamClosed | Self::DownstreamClosed)
    }
}
