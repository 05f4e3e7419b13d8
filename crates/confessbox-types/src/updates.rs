use crate::models::{ActorId, ChatId, ConfessionId, MessageId};

/// Top menu button labels. Pressing one sends its label as plain text.
pub const MENU_CONFESS: &str = "📝 Confess";
pub const MENU_BROWSE: &str = "👀 Browse Confessions";

/// An update addressed to the bot, already stripped of transport details.
#[derive(Debug, Clone, PartialEq)]
pub struct Inbound {
    pub actor: ActorId,
    /// Chat the reply goes to.
    pub chat: ChatId,
    /// Only direct conversations with the bot are handled.
    pub private: bool,
    pub update: Update,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Update {
    /// `/name args`, or a top menu button mapped to its command.
    Command { name: String, args: Option<String> },

    /// Free text. The router decides whether it is a confession or a comment.
    PlainMessage { text: String },

    /// `/start <payload>` coming from a deep link.
    DeepLinkStart { payload: String },

    /// A Prev/Next press under a comments view.
    PaginationCallback {
        callback_id: String,
        /// Message the pressed button belongs to, if still accessible.
        message_id: Option<MessageId>,
        /// `None` when the callback data is not a page request.
        target: Option<PageRequest>,
    },
}

impl Update {
    /// Classify the body of a private message.
    pub fn from_text(text: &str) -> Self {
        let trimmed = text.trim();

        match trimmed {
            MENU_CONFESS => return Self::command("confess", None),
            MENU_BROWSE => return Self::command("browse", None),
            _ => {}
        }

        let Some(rest) = trimmed.strip_prefix('/') else {
            return Self::PlainMessage { text: text.to_string() };
        };

        let (head, args) = match rest.split_once(char::is_whitespace) {
            Some((head, args)) => (head, Some(args.trim()).filter(|a| !a.is_empty())),
            None => (rest, None),
        };
        // `/start@my_bot` addresses this bot explicitly.
        let name = head.split('@').next().unwrap_or(head).to_lowercase();

        match (name.as_str(), args) {
            ("start", Some(payload)) => Self::DeepLinkStart { payload: payload.to_string() },
            (_, args) => Self::command(&name, args),
        }
    }

    fn command(name: &str, args: Option<&str>) -> Self {
        Self::Command {
            name: name.to_string(),
            args: args.map(str::to_string),
        }
    }
}

/// Parsed deep-link start payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeepLink {
    View(ConfessionId),
    Add(ConfessionId),
}

impl DeepLink {
    /// Parse `view_<id>` or `add_<id>`. Anything else is `None`.
    pub fn parse(payload: &str) -> Option<Self> {
        let (action, id) = payload.trim().split_once('_')?;
        let id = ConfessionId(digits(id)?);
        match action {
            "view" => Some(Self::View(id)),
            "add" => Some(Self::Add(id)),
            _ => None,
        }
    }

    pub fn payload(&self) -> String {
        match self {
            Self::View(id) => format!("view_{}", id),
            Self::Add(id) => format!("add_{}", id),
        }
    }
}

/// Callback data carried by pagination buttons: `page:<confession>:<page>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub confession_id: ConfessionId,
    pub page: u32,
}

impl PageRequest {
    pub fn parse(data: &str) -> Option<Self> {
        let mut parts = data.split(':');
        if parts.next()? != "page" {
            return None;
        }
        let confession_id = ConfessionId(digits(parts.next()?)?);
        let page = digits(parts.next()?)?;
        if parts.next().is_some() {
            return None;
        }
        Some(Self { confession_id, page })
    }

    pub fn data(&self) -> String {
        format!("page:{}:{}", self.confession_id, self.page)
    }
}

/// Plain decimal digits only; `str::parse` would also take a leading sign.
fn digits<N: std::str::FromStr>(s: &str) -> Option<N> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}
