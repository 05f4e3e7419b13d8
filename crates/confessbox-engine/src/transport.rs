use std::future::Future;

use confessbox_types::keyboard::Keyboard;
use confessbox_types::models::{ChatId, MessageId};

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("request failed: {0}")]
    Http(String),

    #[error("api error {code}: {description}")]
    Api { code: i64, description: String },

    #[error("malformed response: {0}")]
    Decode(String),
}

/// Outbound half of the messaging platform. Message bodies are HTML.
pub trait Transport: Send + Sync + 'static {
    fn send(
        &self,
        chat: ChatId,
        text: &str,
        keyboard: Option<&Keyboard>,
    ) -> impl Future<Output = Result<MessageId, TransportError>> + Send;

    /// Edit a sent message in place. `None` leaves that part untouched.
    fn edit(
        &self,
        chat: ChatId,
        message_id: MessageId,
        text: Option<&str>,
        keyboard: Option<&Keyboard>,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Stop the client-side spinner on a pressed inline button.
    fn answer_callback(
        &self,
        callback_id: &str,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;
}
