use std::time::Duration;

/// Blocklist used when none is configured.
pub const DEFAULT_BLOCKLIST: &[&str] = &["badword1", "badword2", "fuck", "shit", "bitch", "asshole"];

/// Tunables for the engine. Transport credentials live with the server.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Title label, rendered as `<label> #<id>`.
    pub label: String,
    /// Trailing tag on every channel post.
    pub topic_tag: String,
    /// Where the "Browse Confessions" menu button points.
    pub browse_url: String,
    pub confession_cooldown: Duration,
    pub comment_cooldown: Duration,
    pub page_size: u32,
    pub blocklist: Vec<String>,
    /// How long an opened comment session survives without a reply.
    pub session_ttl: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            label: "EAU Confession".into(),
            topic_tag: "#Other".into(),
            browse_url: "https://t.me/eauvents".into(),
            confession_cooldown: Duration::from_secs(30),
            comment_cooldown: Duration::from_secs(10),
            page_size: 4,
            blocklist: DEFAULT_BLOCKLIST.iter().map(|w| w.to_string()).collect(),
            session_ttl: Duration::from_secs(24 * 60 * 60),
        }
    }
}

impl EngineConfig {
    /// Rate-limit entries untouched for this long are evicted. Sessions use
    /// `session_ttl` instead, so a slow commenter keeps their session.
    pub fn rate_retention(&self) -> Duration {
        self.confession_cooldown.max(self.comment_cooldown) * 10
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sessions_outlive_rate_entries() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.rate_retention(), Duration::from_secs(300));
        assert!(cfg.session_ttl > cfg.rate_retention() * 100);
    }
}
