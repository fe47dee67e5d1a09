//! Bridge configuration, fixed for the lifetime of a session.

use serde::Serialize;

/// Bytes read from the upstream per `Output` frame.
pub const DEFAULT_BUFFER_SIZE: usize = 1024;

/// Settings for one [`WebTty`](crate::WebTty) session.
///
/// Every field is independent of the others; the `with_*` methods can be
/// chained in any order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeConfig {
    /// Forward client input to the upstream. Off by default.
    pub permit_write: bool,
    /// Fixed terminal width; 0 lets the client decide.
    pub fixed_columns: u16,
    /// Fixed terminal height; 0 lets the client decide.
    pub fixed_rows: u16,
    /// Client reconnect delay in seconds; 0 disables reconnecting.
    pub reconnect_seconds: u32,
    /// Title sent on connect, even when empty.
    pub window_title: Vec<u8>,
    /// Pre-serialized JSON handed to the client verbatim.
    pub master_preferences: Option<Vec<u8>>,
    pub buffer_size: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            permit_write: false,
            fixed_columns: 0,
            fixed_rows: 0,
            reconnect_seconds: 0,
            window_title: Vec::new(),
            master_preferences: None,
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }
}

impl BridgeConfig {
    pub fn with_permit_write(mut self, permit: bool) -> Self {
        self.permit_write = permit;
        self
    }

    pub fn with_fixed_columns(mut self, columns: u16) -> Self {
        self.fixed_columns = columns;
        self
    }

    pub fn with_fixed_rows(mut self, rows: u16) -> Self {
        self.fixed_rows = rows;
        self
    }

    pub fn with_reconnect(mut self, seconds: u32) -> Self {
        self.reconnect_seconds = seconds;
        self
    }

    pub fn with_window_title(mut self, title: impl Into<Vec<u8>>) -> Self {
        self.window_title = title.into();
        self
    }

    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size.max(1);
        self
    }

    /// Serialize `preferences` as JSON for the `SetPreferences` frame.
    pub fn with_master_preferences<T: Serialize + ?Sized>(
        mut self,
        preferences: &T,
    ) -> Result<Self, serde_json::Error> {
        self.master_preferences = Some(serde_json::to_vec(preferences)?);
        Ok(self)
    }

    /// Resolve the terminal size for a client resize request.
    pub(crate) fn effective_size(&self, columns: f64, rows: f64) -> (u16, u16) {
        let columns = if self.fixed_columns == 0 {
            columns as u16
        } else {
            self.fixed_columns
        };
        let rows = if self.fixed_rows == 0 {
            rows as u16
        } else {
            self.fixed_rows
        };
        (columns, rows)
    }
}
