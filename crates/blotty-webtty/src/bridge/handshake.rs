//! Initialization frames sent before any pump starts.

use super::Session;
use crate::error::{BridgeError, HandshakeStep};
use crate::protocol::ResponseType;

impl Session {
    /// Send title, then reconnect delay, then preferences, in that order.
    pub(super) async fn send_initialize_message(&self) -> Result<(), BridgeError> {
        let fail = |step: HandshakeStep| {
            move |source: std::io::Error| BridgeError::HandshakeWriteFailed { step, source }
        };

        self.writer
            .write(ResponseType::SetWindowTitle, &self.config.window_title)
            .await
            .map_err(fail(HandshakeStep::WindowTitle))?;

        if self.config.reconnect_seconds > 0 {
            // A JSON integer is its decimal text.
            let reconnect = self.config.reconnect_seconds.to_string();
            self.writer
                .write(ResponseType::SetReconnect, reconnect.as_bytes())
                .await
                .map_err(fail(HandshakeStep::Reconnect))?;
        }

        if let Some(prefs) = &self.config.master_preferences {
            self.writer
                .write(ResponseType::SetPreferences, prefs)
                .await
                .map_err(fail(HandshakeStep::Preferences))?;
        }

        tracing::debug!(
            reconnect = self.config.reconnect_seconds,
            preferences = self.config.master_preferences.is_some(),
            "handshake sent"
        );
        Ok(())
    }
}
