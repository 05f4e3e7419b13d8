use confessbox_types::models::ConfessionId;

use crate::moderation::RejectReason;
use crate::rate_limit::ActionKind;

/// Everything that can stop an update short of its happy path.
/// Each variant maps to exactly one reply to the actor.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("{kind:?} rejected: {reason:?}")]
    Validation { kind: ActionKind, reason: RejectReason },

    #[error("{kind:?} rate limited for {remaining_secs}s")]
    RateLimited { kind: ActionKind, remaining_secs: u64 },

    /// Stored, but the channel post could not be made.
    #[error("confession {confession_id} could not be published")]
    PublishFailed { confession_id: ConfessionId },

    #[error("comment session expired")]
    SessionExpired,

    #[error("confession {0} not found")]
    NotFound(ConfessionId),

    #[error("storage error: {0}")]
    Storage(#[from] anyhow::Error),
}

impl EngineError {
    /// Text shown to the actor.
    pub fn reply(&self) -> String {
        match self {
            Self::Validation { kind: ActionKind::Confession, reason: RejectReason::Empty } => {
                "Empty confession.".into()
            }
            Self::Validation { kind: ActionKind::Comment, reason: RejectReason::Empty } => {
                "Comment canceled.".into()
            }
            Self::Validation { kind: ActionKind::Confession, reason: RejectReason::Profane } => {
                "Your confession contains banned words.".into()
            }
            Self::Validation { kind: ActionKind::Comment, reason: RejectReason::Profane } => {
                "Your comment contains banned words.".into()
            }
            Self::RateLimited { kind: ActionKind::Confession, remaining_secs } => {
                format!("Wait {}s before sending another confession.", remaining_secs)
            }
            Self::RateLimited { kind: ActionKind::Comment, remaining_secs } => {
                format!("Wait {}s before commenting again.", remaining_secs)
            }
            Self::PublishFailed { .. } => "Bot cannot post in channel.".into(),
            Self::SessionExpired => "Session expired.".into(),
            Self::NotFound(_) => "Confession not found.".into(),
            Self::Storage(_) => "Something went wrong. Please try again later.".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replies_name_the_reason() {
        let err = EngineError::RateLimited { kind: ActionKind::Comment, remaining_secs: 4 };
        assert_eq!(err.reply(), "Wait 4s before commenting again.");

        let err = EngineError::Validation {
            kind: ActionKind::Confession,
            reason: RejectReason::Profane,
        };
        assert_eq!(err.reply(), "Your confession contains banned words.");
    }

    #[test]
    fn storage_errors_stay_generic() {
        let err = EngineError::from(anyhow::anyhow!("disk I/O error at /var/db"));
        assert!(!err.reply().contains("/var/db"));
    }
}
