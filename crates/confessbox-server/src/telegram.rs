use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::debug;

use confessbox_engine::{Transport, TransportError};
use confessbox_types::keyboard::{ButtonAction, Keyboard};
use confessbox_types::models::{ActorId, ChatId, MessageId};
use confessbox_types::updates::{Inbound, PageRequest, Update};

const API_BASE: &str = "https://api.telegram.org";

/// Bot API client. Doubles as the engine's outbound transport.
#[derive(Clone)]
pub struct TelegramClient {
    http: reqwest::Client,
    base: String,
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
    error_code: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct BotUser {
    pub id: i64,
    pub username: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SentMessage {
    message_id: i64,
}

impl TelegramClient {
    pub fn new(token: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base: format!("{}/bot{}", API_BASE, token),
        }
    }

    async fn call<P, R>(&self, method: &str, params: &P) -> Result<R, TransportError>
    where
        P: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let response = self
            .http
            .post(format!("{}/{}", self.base, method))
            .json(params)
            .send()
            .await
            .map_err(|e| TransportError::Http(e.without_url().to_string()))?;

        let body: ApiResponse<R> = response
            .json()
            .await
            .map_err(|e| TransportError::Decode(e.without_url().to_string()))?;

        match body {
            ApiResponse { ok: true, result: Some(result), .. } => Ok(result),
            ApiResponse { ok: true, result: None, .. } => {
                Err(TransportError::Decode(format!("{} returned no result", method)))
            }
            ApiResponse { description, error_code, .. } => Err(TransportError::Api {
                code: error_code.unwrap_or_default(),
                description: description.unwrap_or_default(),
            }),
        }
    }

    pub async fn get_me(&self) -> Result<BotUser, TransportError> {
        self.call("getMe", &json!({})).await
    }

    pub async fn set_webhook(&self, url: &str, secret: Option<&str>) -> Result<(), TransportError> {
        let mut params = json!({
            "url": url,
            "allowed_updates": ["message", "callback_query"],
        });
        if let Some(secret) = secret {
            params["secret_token"] = json!(secret);
        }
        let _: bool = self.call("setWebhook", &params).await?;
        Ok(())
    }

    pub async fn delete_webhook(&self, drop_pending_updates: bool) -> Result<(), TransportError> {
        let _: bool = self
            .call("deleteWebhook", &json!({ "drop_pending_updates": drop_pending_updates }))
            .await?;
        Ok(())
    }
}

impl Transport for TelegramClient {
    async fn send(&self, chat: ChatId, text: &str, keyboard: Option<&Keyboard>) -> Result<MessageId, TransportError> {
        let mut params = json!({
            "chat_id": chat.0,
            "text": text,
            "parse_mode": "HTML",
            "disable_web_page_preview": true,
        });
        if let Some(keyboard) = keyboard {
            params["reply_markup"] = reply_markup(keyboard);
        }
        let sent: SentMessage = self.call("sendMessage", &params).await?;
        Ok(MessageId(sent.message_id))
    }

    async fn edit(
        &self,
        chat: ChatId,
        message_id: MessageId,
        text: Option<&str>,
        keyboard: Option<&Keyboard>,
    ) -> Result<(), TransportError> {
        let mut params = json!({ "chat_id": chat.0, "message_id": message_id.0 });
        if let Some(keyboard) = keyboard {
            params["reply_markup"] = reply_markup(keyboard);
        }

        let method = match text {
            Some(text) => {
                params["text"] = json!(text);
                params["parse_mode"] = json!("HTML");
                "editMessageText"
            }
            None => "editMessageReplyMarkup",
        };
        // Returns the edited Message, or `true` for inline messages.
        let _: Value = self.call(method, &params).await?;
        Ok(())
    }

    async fn answer_callback(&self, callback_id: &str) -> Result<(), TransportError> {
        let _: bool = self
            .call("answerCallbackQuery", &json!({ "callback_query_id": callback_id }))
            .await?;
        Ok(())
    }
}

/// Encode a keyboard as a Bot API `reply_markup` object.
pub fn reply_markup(keyboard: &Keyboard) -> Value {
    match keyboard {
        Keyboard::Inline(rows) => {
            let rows: Vec<Vec<Value>> = rows
                .iter()
                .map(|row| {
                    row.iter()
                        .map(|button| match &button.action {
                            ButtonAction::Url(url) => json!({ "text": button.label, "url": url }),
                            ButtonAction::Callback(data) => {
                                json!({ "text": button.label, "callback_data": data })
                            }
                        })
                        .collect()
                })
                .collect();
            json!({ "inline_keyboard": rows })
        }
        Keyboard::Menu(rows) => {
            let rows: Vec<Vec<Value>> = rows
                .iter()
                .map(|row| row.iter().map(|label| json!({ "text": label })).collect())
                .collect();
            json!({ "keyboard": rows, "resize_keyboard": true })
        }
        Keyboard::RemoveMenu => json!({ "remove_keyboard": true }),
    }
}

// -- Incoming updates --

#[derive(Debug, Deserialize)]
pub struct TgUpdate {
    pub update_id: i64,
    pub message: Option<TgMessage>,
    pub callback_query: Option<TgCallbackQuery>,
}

#[derive(Debug, Deserialize)]
pub struct TgMessage {
    pub message_id: i64,
    pub from: Option<TgUser>,
    pub chat: TgChat,
    pub text: Option<String>,
    pub caption: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TgUser {
    pub id: i64,
}

#[derive(Debug, Deserialize)]
pub struct TgChat {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Deserialize)]
pub struct TgCallbackQuery {
    pub id: String,
    pub from: TgUser,
    /// Absent when the message is too old to be delivered with the callback.
    pub message: Option<TgMessage>,
    pub data: Option<String>,
}

impl TgUpdate {
    /// Map a raw update to the engine's closed update type. Updates the bot
    /// has nothing to do with (edits, stickers, channel posts) yield `None`.
    pub fn into_inbound(self) -> Option<Inbound> {
        if let Some(query) = self.callback_query {
            let chat = query
                .message
                .as_ref()
                .map(|m| ChatId(m.chat.id))
                .unwrap_or(ChatId(query.from.id));
            return Some(Inbound {
                actor: ActorId(query.from.id),
                chat,
                private: true,
                update: Update::PaginationCallback {
                    callback_id: query.id,
                    message_id: query.message.map(|m| MessageId(m.message_id)),
                    target: query.data.as_deref().and_then(PageRequest::parse),
                },
            });
        }

        let message = self.message?;
        let from = message.from?;
        let update = match (message.text, message.caption) {
            (Some(text), _) => Update::from_text(&text),
            (None, Some(caption)) => Update::PlainMessage { text: caption },
            (None, None) => {
                debug!(update = self.update_id, "Ignoring message without text");
                return None;
            }
        };

        Some(Inbound {
            actor: ActorId(from.id),
            chat: ChatId(message.chat.id),
            private: message.chat.kind == "private",
            update,
        })
    }
}
