//! Wire protocol: frame tags and the tag/payload split rule.
//!
//! A frame is a single tag byte followed by the payload. There is no length
//! prefix and no escaping; message boundaries belong to the transport.

use serde_json::{Map, Value};

/// Websocket subprotocol names this bridge answers to.
pub const PROTOCOLS: &[&str] = &["webtty"];

/// Tag of a frame sent by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestType {
    /// Unknown message type, usually a client bug.
    Unrecognized,
    /// Keyboard input for the terminal.
    Input,
    /// Keep-alive.
    Ping,
    /// The client viewport changed size.
    ResizeTerminal,
}

impl RequestType {
    pub fn from_byte(byte: u8) -> Self {
        match byte {
            b'1' => Self::Input,
            b'2' => Self::Ping,
            b'3' => Self::ResizeTerminal,
            _ => Self::Unrecognized,
        }
    }

    pub fn as_byte(self) -> u8 {
        match self {
            Self::Unrecognized => b'0',
            Self::Input => b'1',
            Self::Ping => b'2',
            Self::ResizeTerminal => b'3',
        }
    }
}

/// Tag of a frame sent by the bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponseType {
    Unrecognized,
    /// Base64 terminal output.
    Output,
    Pong,
    SetWindowTitle,
    /// Opaque JSON preferences for the client terminal.
    SetPreferences,
    /// Seconds the client should wait before reconnecting.
    SetReconnect,
}

impl ResponseType {
    pub fn from_byte(byte: u8) -> Self {
        match byte {
            b'1' => Self::Output,
            b'2' => Self::Pong,
            b'3' => Self::SetWindowTitle,
            b'4' => Self::SetPreferences,
            b'5' => Self::SetReconnect,
            _ => Self::Unrecognized,
        }
    }

    pub fn as_byte(self) -> u8 {
        match self {
            Self::Unrecognized => b'0',
            Self::Output => b'1',
            Self::Pong => b'2',
            Self::SetWindowTitle => b'3',
            Self::SetPreferences => b'4',
            Self::SetReconnect => b'5',
        }
    }
}

/// Payload of a `ResizeTerminal` request.
///
/// Browsers send fractional sizes; they are truncated when applied.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ResizeRequest {
    pub columns: f64,
    pub rows: f64,
}

impl ResizeRequest {
    /// Parse a JSON object with `columns` and `rows` numbers.
    ///
    /// Keys match case-insensitively and unknown keys are ignored. `null`,
    /// either as the whole payload or as a value, leaves the field at 0.
    pub fn parse(payload: &[u8]) -> Result<Self, serde_json::Error> {
        let fields: Option<Map<String, Value>> = serde_json::from_slice(payload)?;
        let mut request = Self::default();
        for (key, value) in fields.into_iter().flatten() {
            let field = if key.eq_ignore_ascii_case("columns") {
                &mut request.columns
            } else if key.eq_ignore_ascii_case("rows") {
                &mut request.rows
            } else {
                continue;
            };
            if let Some(number) = serde_json::from_value::<Option<f64>>(value)? {
                *field = number;
            }
        }
        Ok(request)
    }
}

/// Build a frame: the tag byte followed by the payload.
pub fn encode(tag: u8, payload: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(payload.len() + 1);
    frame.push(tag);
    frame.extend_from_slice(payload);
    frame
}

/// Split a raw client frame into its tag and payload.
///
/// Returns `None` for an empty buffer; that is a closed transport, not a
/// frame. `Ping` never carries a payload and a lone tag byte has none.
pub fn decode(raw: &[u8]) -> Option<(RequestType, &[u8])> {
    let (&tag, rest) = raw.split_first()?;
    let kind = RequestType::from_byte(tag);
    if kind == RequestType::Unrecognized {
        tracing::debug!(tag, "unrecognized request tag");
    }
    if kind == RequestType::Ping || raw.len() < 2 {
        return Some((kind, &[]));
    }
    Some((kind, rest))
}
