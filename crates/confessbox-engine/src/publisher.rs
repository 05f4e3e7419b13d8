use std::sync::Arc;

use tracing::{debug, warn};

use confessbox_types::keyboard::{Button, Keyboard};
use confessbox_types::models::{ChatId, CommentPage, Confession, ConfessionId, MessageId};
use confessbox_types::updates::{DeepLink, PageRequest};

use crate::transport::{Transport, TransportError};

/// Comment bodies longer than this are cut in listings.
pub const SNIPPET_MAX_CHARS: usize = 250;

/// Body text plus the keyboard that goes with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    pub text: String,
    pub keyboard: Keyboard,
}

#[derive(Debug, thiserror::Error)]
#[error("channel post failed: {0}")]
pub struct PublishFailure(#[from] pub TransportError);

/// What happened to the channel post after a new comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    Updated,
    /// The confession never made it to the channel; nothing to update.
    Unlinked,
    /// The edit was refused (post deleted, unchanged markup, ...). Not an error.
    Ignored,
}

/// Renders confessions and keeps their channel posts in step.
pub struct Publisher<T> {
    transport: Arc<T>,
    channel: ChatId,
    bot_username: String,
    label: String,
    topic_tag: String,
}

impl<T: Transport> Publisher<T> {
    pub fn new(
        transport: Arc<T>,
        channel: ChatId,
        bot_username: impl Into<String>,
        label: impl Into<String>,
        topic_tag: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            channel,
            bot_username: bot_username.into(),
            label: label.into(),
            topic_tag: topic_tag.into(),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    fn deep_link(&self, link: DeepLink) -> String {
        format!("https://t.me/{}?start={}", self.bot_username, link.payload())
    }

    fn header(&self, id: ConfessionId, text: &str) -> String {
        format!(
            "👀 <b>{} #{}</b>\n\n{}",
            escape_html(&self.label),
            id,
            escape_html(text)
        )
    }

    /// Buttons under a channel post.
    pub fn channel_keyboard(&self, id: ConfessionId, comment_count: u64) -> Keyboard {
        Keyboard::Inline(vec![
            vec![Button::url(
                format!("👀 Browse Comments ({})", comment_count),
                self.deep_link(DeepLink::View(id)),
            )],
            vec![Button::url("➕ Add Comment", self.deep_link(DeepLink::Add(id)))],
        ])
    }

    pub fn format_confession_post(&self, id: ConfessionId, text: &str, comment_count: u64) -> Rendered {
        Rendered {
            text: format!("{}\n\n{}", self.header(id, text), escape_html(&self.topic_tag)),
            keyboard: self.channel_keyboard(id, comment_count),
        }
    }

    pub fn format_comments_view(&self, confession: &Confession, page: &CommentPage) -> Rendered {
        let mut text = self.header(confession.id, &confession.text);
        text.push_str(&format!(
            "\n\n💬 Comments (page {}/{}):\n\n",
            page.page, page.total_pages
        ));

        for comment in &page.items {
            text.push_str(&format!(
                "{} <b>Comment #{}</b>\n{}\n\n",
                comment.avatar,
                comment.id,
                escape_html(&truncate(&comment.text, SNIPPET_MAX_CHARS))
            ));
        }

        let mut nav = Vec::new();
        if let Some(prev) = page.prev() {
            nav.push(Button::callback(
                "⬅️ Prev",
                PageRequest { confession_id: confession.id, page: prev }.data(),
            ));
        }
        if let Some(next) = page.next() {
            nav.push(Button::callback(
                "Next ➡️",
                PageRequest { confession_id: confession.id, page: next }.data(),
            ));
        }

        let mut rows = Vec::new();
        if !nav.is_empty() {
            rows.push(nav);
        }
        rows.push(vec![Button::url(
            "➕ Add Comment",
            self.deep_link(DeepLink::Add(confession.id)),
        )]);

        Rendered {
            text: text.trim_end().to_string(),
            keyboard: Keyboard::Inline(rows),
        }
    }

    /// Post a fresh confession to the channel. The caller links the returned
    /// message id to the stored row; on failure the row stays unlinked.
    pub async fn publish(&self, id: ConfessionId, text: &str) -> Result<MessageId, PublishFailure> {
        let post = self.format_confession_post(id, text, 0);
        let message_id = self
            .transport
            .send(self.channel, &post.text, Some(&post.keyboard))
            .await?;
        debug!(confession = %id, message = message_id.0, "Published to channel");
        Ok(message_id)
    }

    /// Refresh the comment counter on the channel post.
    pub async fn sync_comment_count(&self, confession: &Confession, count: u64) -> SyncOutcome {
        let Some(message_id) = confession.channel_message_id else {
            return SyncOutcome::Unlinked;
        };

        let keyboard = self.channel_keyboard(confession.id, count);
        match self
            .transport
            .edit(self.channel, message_id, None, Some(&keyboard))
            .await
        {
            Ok(()) => SyncOutcome::Updated,
            Err(e) => {
                warn!(confession = %confession.id, "Comment count sync ignored: {}", e);
                SyncOutcome::Ignored
            }
        }
    }
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

/// Cut to at most `max` characters, ending in "..." when shortened.
pub fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max.saturating_sub(3)).collect();
    out.push_str("...");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use confessbox_types::keyboard::ButtonAction;
    use confessbox_types::models::{ActorId, Comment};
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        sent: Mutex<Vec<(ChatId, String, Option<Keyboard>)>>,
        edits: Mutex<Vec<(ChatId, MessageId, Option<Keyboard>)>>,
        fail: bool,
    }

    impl Transport for Recorder {
        async fn send(&self, chat: ChatId, text: &str, keyboard: Option<&Keyboard>) -> Result<MessageId, TransportError> {
            if self.fail {
                return Err(TransportError::Api { code: 403, description: "Forbidden".into() });
            }
            let mut sent = self.sent.lock().unwrap();
            sent.push((chat, text.to_string(), keyboard.cloned()));
            Ok(MessageId(100 + sent.len() as i64))
        }

        async fn edit(
            &self,
            chat: ChatId,
            message_id: MessageId,
            _text: Option<&str>,
            keyboard: Option<&Keyboard>,
        ) -> Result<(), TransportError> {
            if self.fail {
                return Err(TransportError::Api { code: 400, description: "message to edit not found".into() });
            }
            self.edits.lock().unwrap().push((chat, message_id, keyboard.cloned()));
            Ok(())
        }

        async fn answer_callback(&self, _callback_id: &str) -> Result<(), TransportError> {
            Ok(())
        }
    }

    fn publisher(fail: bool) -> (Arc<Recorder>, Publisher<Recorder>) {
        let transport = Arc::new(Recorder { fail, ..Default::default() });
        let publisher = Publisher::new(transport.clone(), ChatId(-100), "confess_bot", "EAU Confession", "#Other");
        (transport, publisher)
    }

    fn confession(id: i64, linked: Option<i64>) -> Confession {
        Confession {
            id: ConfessionId(id),
            text: "hello".into(),
            created_at: Utc::now(),
            author_id: ActorId(1),
            channel_message_id: linked.map(MessageId),
        }
    }

    fn comment(id: i64, text: &str) -> Comment {
        Comment {
            id,
            confession_id: ConfessionId(1),
            text: text.into(),
            avatar: "🦊".into(),
            created_at: Utc::now(),
        }
    }

    fn labels(keyboard: &Keyboard) -> Vec<String> {
        keyboard.buttons().iter().map(|b| b.label.clone()).collect()
    }

    #[test]
    fn post_layout_and_buttons() {
        let (_, p) = publisher(false);
        let post = p.format_confession_post(ConfessionId(1), "I <3 Rust & tea", 0);

        assert_eq!(post.text, "👀 <b>EAU Confession #1</b>\n\nI &lt;3 Rust &amp; tea\n\n#Other");
        assert_eq!(labels(&post.keyboard), vec!["👀 Browse Comments (0)", "➕ Add Comment"]);

        let buttons = post.keyboard.buttons();
        assert_eq!(buttons[0].action, ButtonAction::Url("https://t.me/confess_bot?start=view_1".into()));
        assert_eq!(buttons[1].action, ButtonAction::Url("https://t.me/confess_bot?start=add_1".into()));
    }

    #[test]
    fn comments_view_layout() {
        let (_, p) = publisher(false);
        let page = CommentPage {
            page: 1,
            total_pages: 1,
            total: 1,
            items: vec![comment(3, "nice one")],
        };
        let view = p.format_comments_view(&confession(1, None), &page);

        assert_eq!(
            view.text,
            "👀 <b>EAU Confession #1</b>\n\nhello\n\n💬 Comments (page 1/1):\n\n🦊 <b>Comment #3</b>\nnice one"
        );
        assert_eq!(labels(&view.keyboard), vec!["➕ Add Comment"]);
    }

    #[test]
    fn nav_buttons_follow_bounds() {
        let (_, p) = publisher(false);
        let c = confession(2, None);
        let page = |n| CommentPage { page: n, total_pages: 3, total: 9, items: vec![] };

        assert_eq!(labels(&p.format_comments_view(&c, &page(1)).keyboard), vec!["Next ➡️", "➕ Add Comment"]);
        assert_eq!(
            labels(&p.format_comments_view(&c, &page(2)).keyboard),
            vec!["⬅️ Prev", "Next ➡️", "➕ Add Comment"]
        );
        let last = p.format_comments_view(&c, &page(3));
        assert_eq!(labels(&last.keyboard), vec!["⬅️ Prev", "➕ Add Comment"]);
        assert_eq!(last.keyboard.buttons()[0].action, ButtonAction::Callback("page:2:2".into()));
    }

    #[test]
    fn long_comments_are_truncated() {
        let long = "x".repeat(300);
        let cut = truncate(&long, SNIPPET_MAX_CHARS);
        assert_eq!(cut.chars().count(), 250);
        assert!(cut.ends_with("..."));

        let exact = "é".repeat(250);
        assert_eq!(truncate(&exact, SNIPPET_MAX_CHARS), exact);
    }

    #[tokio::test]
    async fn publish_sends_to_channel() {
        let (t, p) = publisher(false);
        let id = p.publish(ConfessionId(1), "hello there").await.unwrap();
        assert_eq!(id, MessageId(101));

        let sent = t.sent.lock().unwrap();
        assert_eq!(sent[0].0, ChatId(-100));
        assert_eq!(labels(sent[0].2.as_ref().unwrap())[0], "👀 Browse Comments (0)");
    }

    #[tokio::test]
    async fn publish_failure_is_reported() {
        let (_, p) = publisher(true);
        assert!(p.publish(ConfessionId(1), "hello").await.is_err());
    }

    #[tokio::test]
    async fn sync_edits_linked_posts_only() {
        let (t, p) = publisher(false);
        assert_eq!(p.sync_comment_count(&confession(1, None), 1).await, SyncOutcome::Unlinked);
        assert!(t.edits.lock().unwrap().is_empty());

        assert_eq!(p.sync_comment_count(&confession(1, Some(55)), 2).await, SyncOutcome::Updated);
        let edits = t.edits.lock().unwrap();
        assert_eq!(edits[0].1, MessageId(55));
        assert_eq!(labels(edits[0].2.as_ref().unwrap())[0], "👀 Browse Comments (2)");
    }

    #[tokio::test]
    async fn sync_failure_is_ignored() {
        let (_, p) = publisher(true);
        assert_eq!(p.sync_comment_count(&confession(1, Some(55)), 2).await, SyncOutcome::Ignored);
    }
}
