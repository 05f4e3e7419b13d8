use std::sync::{Arc, Mutex};

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{debug, error, info, warn};

use confessbox_db::Database;
use confessbox_types::keyboard::Keyboard;
use confessbox_types::models::{ActorId, ChatId, ConfessionId, MessageId};
use confessbox_types::updates::{DeepLink, Inbound, MENU_BROWSE, MENU_CONFESS, PageRequest, Update};

use crate::avatar::pick_avatar;
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::locks::ActorLocks;
use crate::moderation::{ModerationFilter, Verdict};
use crate::publisher::{Publisher, SyncOutcome};
use crate::rate_limit::{ActionKind, RateDecision, RateKey, RateLimiter};
use crate::state::{MemoryStore, StateStore};
use crate::transport::Transport;

/// What a plain message from an actor means right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Idle,
    AwaitingComment(ConfessionId),
}

/// Turns inbound updates into confessions, comments and comment views.
///
/// Owns the per-actor `Mode`; nothing else reads or writes it.
pub struct SessionRouter<T> {
    db: Arc<Database>,
    transport: Arc<T>,
    publisher: Publisher<T>,
    limiter: RateLimiter,
    filter: ModerationFilter,
    sessions: Arc<dyn StateStore<ActorId, Mode>>,
    locks: ActorLocks,
    rng: Mutex<StdRng>,
    config: EngineConfig,
}

impl<T: Transport> SessionRouter<T> {
    pub fn new(
        db: Arc<Database>,
        transport: Arc<T>,
        channel: ChatId,
        bot_username: impl Into<String>,
        config: EngineConfig,
    ) -> Self {
        let publisher = Publisher::new(
            transport.clone(),
            channel,
            bot_username,
            config.label.clone(),
            config.topic_tag.clone(),
        );
        let limiter = RateLimiter::new(
            Arc::new(MemoryStore::<RateKey, DateTime<Utc>>::new()),
            config.confession_cooldown,
            config.comment_cooldown,
        );

        Self {
            db,
            transport,
            publisher,
            limiter,
            filter: ModerationFilter::new(&config.blocklist),
            sessions: Arc::new(MemoryStore::<ActorId, Mode>::new()),
            locks: ActorLocks::new(),
            rng: Mutex::new(StdRng::from_os_rng()),
            config,
        }
    }

    /// Swap the session store, e.g. for one shared between instances.
    pub fn with_session_store(mut self, store: Arc<dyn StateStore<ActorId, Mode>>) -> Self {
        self.sessions = store;
        self
    }

    /// Swap the store behind the rate limiter.
    pub fn with_rate_store(mut self, store: Arc<dyn StateStore<RateKey, DateTime<Utc>>>) -> Self {
        self.limiter = RateLimiter::new(
            store,
            self.config.confession_cooldown,
            self.config.comment_cooldown,
        );
        self
    }

    /// Fix the avatar sequence. Tests use a seeded generator.
    pub fn with_avatar_rng(mut self, rng: StdRng) -> Self {
        self.rng = Mutex::new(rng);
        self
    }

    pub fn mode(&self, actor: ActorId) -> Mode {
        self.sessions.get(&actor).unwrap_or_default()
    }

    pub async fn handle(&self, inbound: Inbound) {
        self.handle_at(inbound, Utc::now()).await
    }

    /// Handle one update as if it arrived at `now`.
    pub async fn handle_at(&self, inbound: Inbound, now: DateTime<Utc>) {
        let _guard = self.locks.acquire(inbound.actor).await;
        let Inbound { actor, chat, private, update } = inbound;

        match update {
            Update::PaginationCallback { callback_id, message_id, target } => {
                if let Err(e) = self.transport.answer_callback(&callback_id).await {
                    debug!("Callback answer failed: {}", e);
                }
                match target {
                    Some(req) => self.browse(actor, chat, req, message_id).await,
                    None => debug!(%actor, "Ignoring unknown callback data"),
                }
            }
            _ if !private => debug!(%actor, "Ignoring update outside a private chat"),
            Update::Command { name, .. } => self.command(chat, &name).await,
            Update::DeepLinkStart { payload } => self.deep_link(actor, chat, &payload, now).await,
            Update::PlainMessage { text } => self.plain_message(actor, chat, &text, now).await,
        }
    }

    async fn command(&self, chat: ChatId, name: &str) {
        match name {
            "start" => self.welcome(chat).await,
            "confess" => {
                self.reply(chat, "Send your confession now.", Some(&Keyboard::RemoveMenu)).await
            }
            "browse" => {
                self.reply(chat, "Browse confessions:", Some(&Keyboard::RemoveMenu)).await;
                self.reply(chat, &self.config.browse_url, None).await;
            }
            _ => {
                self.reply(chat, "Use the buttons in the channel to interact with confessions.", None)
                    .await
            }
        }
    }

    async fn welcome(&self, chat: ChatId) {
        let text = format!(
            "Welcome to {}s! Send an anonymous confession and I'll post it.",
            self.publisher.label()
        );
        let menu = Keyboard::Menu(vec![vec![MENU_CONFESS.into()], vec![MENU_BROWSE.into()]]);
        self.reply(chat, &text, Some(&menu)).await;
    }

    async fn deep_link(&self, actor: ActorId, chat: ChatId, payload: &str, now: DateTime<Utc>) {
        self.welcome(chat).await;

        match DeepLink::parse(payload) {
            Some(DeepLink::View(id)) => {
                self.browse(actor, chat, PageRequest { confession_id: id, page: 1 }, None).await
            }
            Some(DeepLink::Add(id)) => match self.open_comment(actor, id, now).await {
                Ok(()) => self.reply(chat, "Send your comment:", None).await,
                Err(e) => self.fail(chat, actor, e).await,
            },
            None => debug!(%actor, payload, "Malformed start payload"),
        }
    }

    async fn open_comment(&self, actor: ActorId, id: ConfessionId, now: DateTime<Utc>) -> Result<(), EngineError> {
        self.blocking(move |db| db.get_confession(id))
            .await?
            .ok_or(EngineError::NotFound(id))?;
        self.sessions.set(actor, Mode::AwaitingComment(id), now);
        debug!(%actor, confession = %id, "Awaiting comment");
        Ok(())
    }

    async fn plain_message(&self, actor: ActorId, chat: ChatId, text: &str, now: DateTime<Utc>) {
        match self.mode(actor) {
            Mode::Idle => match self.submit_confession(actor, text, now).await {
                Ok(id) => {
                    let text = format!("Posted as {} #{}", self.publisher.label(), id);
                    self.reply(chat, &text, None).await
                }
                Err(e) => self.fail(chat, actor, e).await,
            },
            Mode::AwaitingComment(id) => {
                // One attempt per session, whatever the outcome.
                self.sessions.delete(&actor);
                match self.submit_comment(actor, id, text, now).await {
                    Ok(_) => self.reply(chat, "Comment added!", None).await,
                    Err(e) => self.fail(chat, actor, e).await,
                }
            }
        }
    }

    /// Gate, store and publish a new confession.
    pub async fn submit_confession(
        &self,
        actor: ActorId,
        text: &str,
        now: DateTime<Utc>,
    ) -> Result<ConfessionId, EngineError> {
        let text = self.screen(actor, ActionKind::Confession, text, now)?;

        let body = text.clone();
        let id = self
            .blocking(move |db| db.create_confession(&body, actor, now))
            .await?;
        info!(confession = %id, "Confession stored");

        let message_id = match self.publisher.publish(id, &text).await {
            Ok(message_id) => message_id,
            Err(e) => {
                warn!(confession = %id, "Left unpublished: {}", e);
                return Err(EngineError::PublishFailed { confession_id: id });
            }
        };

        self.blocking(move |db| db.attach_channel_message(id, message_id))
            .await?;
        Ok(id)
    }

    /// Gate and store a comment, then refresh the channel counter.
    pub async fn submit_comment(
        &self,
        actor: ActorId,
        confession_id: ConfessionId,
        text: &str,
        now: DateTime<Utc>,
    ) -> Result<i64, EngineError> {
        let confession = self
            .blocking(move |db| db.get_confession(confession_id))
            .await?
            .ok_or(EngineError::SessionExpired)?;

        let text = self.screen(actor, ActionKind::Comment, text, now)?;
        let avatar = {
            let mut rng = self.rng.lock().map_err(|e| anyhow!("RNG lock poisoned: {}", e))?;
            pick_avatar(&mut *rng)
        };

        let added = self
            .blocking(move |db| db.add_comment(confession_id, &text, avatar, now))
            .await?
            .ok_or(EngineError::SessionExpired)?;
        info!(confession = %confession_id, comment = added.id, "Comment stored");

        if self.publisher.sync_comment_count(&confession, added.count).await == SyncOutcome::Unlinked {
            debug!(confession = %confession_id, "No channel post to update");
        }
        Ok(added.id)
    }

    /// Rate gate then content filter. Once the text has been judged the
    /// cooldown is spent, accepted or not, for both action kinds.
    fn screen(&self, actor: ActorId, kind: ActionKind, text: &str, now: DateTime<Utc>) -> Result<String, EngineError> {
        if let RateDecision::Denied { remaining_secs } = self.limiter.check(actor, kind, now) {
            return Err(EngineError::RateLimited { kind, remaining_secs });
        }

        let verdict = self.filter.classify(text);
        self.limiter.record(actor, kind, now);

        match verdict {
            Verdict::Accepted => Ok(text.trim().to_string()),
            Verdict::Rejected(reason) => Err(EngineError::Validation { kind, reason }),
        }
    }

    /// Render a comments page, editing `edit` in place when given.
    async fn browse(&self, actor: ActorId, chat: ChatId, req: PageRequest, edit: Option<MessageId>) {
        let page_size = self.config.page_size;
        let id = req.confession_id;

        let loaded = self
            .blocking(move |db| {
                let Some(confession) = db.get_confession(id)? else {
                    return Ok(None);
                };
                let page = db.list_comments_page(id, req.page, page_size)?;
                Ok(Some((confession, page)))
            })
            .await;

        let (confession, page) = match loaded {
            Ok(Some(found)) => found,
            Ok(None) => return self.fail(chat, actor, EngineError::NotFound(id)).await,
            Err(e) => return self.fail(chat, actor, e).await,
        };

        let view = self.publisher.format_comments_view(&confession, &page);
        if let Some(message_id) = edit {
            match self
                .transport
                .edit(chat, message_id, Some(&view.text), Some(&view.keyboard))
                .await
            {
                Ok(()) => return,
                Err(e) => debug!("Edit of comments view failed, sending fresh: {}", e),
            }
        }
        self.reply(chat, &view.text, Some(&view.keyboard)).await;
    }

    /// Drop rate entries idle past `rate_retention`, sessions idle past
    /// `session_ttl`, and any per-actor locks nobody holds.
    pub fn evict_idle(&self, now: DateTime<Utc>) -> usize {
        let rate_cutoff = cutoff(now, self.config.rate_retention());
        let session_cutoff = cutoff(now, self.config.session_ttl);

        let evicted = self.sessions.evict_idle(session_cutoff) + self.limiter.evict_idle(rate_cutoff);
        self.locks.prune();
        evicted
    }

    async fn fail(&self, chat: ChatId, actor: ActorId, err: EngineError) {
        match &err {
            EngineError::Storage(e) => error!(%actor, "Storage failure: {:#}", e),
            other => debug!(%actor, "Refused: {}", other),
        }
        self.reply(chat, &err.reply(), None).await;
    }

    async fn reply(&self, chat: ChatId, text: &str, keyboard: Option<&Keyboard>) {
        if let Err(e) = self.transport.send(chat, text, keyboard).await {
            warn!(chat = chat.0, "Reply failed: {}", e);
        }
    }

    /// Run a store call off the async runtime.
    async fn blocking<F, R>(&self, f: F) -> Result<R, EngineError>
    where
        F: FnOnce(&Database) -> anyhow::Result<R> + Send + 'static,
        R: Send + 'static,
    {
        let db = self.db.clone();
        let out = tokio::task::spawn_blocking(move || f(&db))
            .await
            .map_err(|e| anyhow!("spawn_blocking join error: {}", e))??;
        Ok(out)
    }
}

fn cutoff(now: DateTime<Utc>, retention: std::time::Duration) -> DateTime<Utc> {
    let retention = chrono::Duration::from_std(retention).unwrap_or(chrono::Duration::MAX);
    now.checked_sub_signed(retention).unwrap_or(DateTime::<Utc>::MIN_UTC)
}
