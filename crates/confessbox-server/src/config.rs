use std::path::PathBuf;
use std::time::Duration;

use confessbox_engine::EngineConfig;
use confessbox_types::models::ChatId;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),

    #[error("{var} has an invalid value: {value:?}")]
    Invalid { var: &'static str, value: String },
}

/// Everything the binary reads from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub bot_token: String,
    pub channel_id: ChatId,
    pub webhook_base: String,
    pub webhook_path: String,
    /// Compared against `X-Telegram-Bot-Api-Secret-Token` when set.
    pub webhook_secret: Option<String>,
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub evict_interval: Duration,
    pub engine: EngineConfig,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &'static str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let require = |key: &'static str| get(key).ok_or(ConfigError::Missing(key));
        let parsed = |key: &'static str, default: u64| -> Result<u64, ConfigError> {
            match get(key) {
                Some(value) => value.parse().map_err(|_| ConfigError::Invalid { var: key, value }),
                None => Ok(default),
            }
        };

        let channel_raw = require("CONFESSBOX_CHANNEL_ID")?;
        let channel_id = channel_raw.parse().map(ChatId).map_err(|_| ConfigError::Invalid {
            var: "CONFESSBOX_CHANNEL_ID",
            value: channel_raw.clone(),
        })?;

        let mut webhook_path = get("CONFESSBOX_WEBHOOK_PATH").unwrap_or_else(|| "/webhook".into());
        if !webhook_path.starts_with('/') {
            webhook_path.insert(0, '/');
        }

        let port = parsed("PORT", 10000)?;
        let port = u16::try_from(port).map_err(|_| ConfigError::Invalid {
            var: "PORT",
            value: port.to_string(),
        })?;

        let defaults = EngineConfig::default();
        let page_size = parsed("CONFESSBOX_PAGE_SIZE", u64::from(defaults.page_size))?;
        let page_size = u32::try_from(page_size)
            .ok()
            .filter(|n| *n > 0)
            .ok_or(ConfigError::Invalid {
                var: "CONFESSBOX_PAGE_SIZE",
                value: page_size.to_string(),
            })?;

        let engine = EngineConfig {
            label: get("CONFESSBOX_LABEL").unwrap_or(defaults.label),
            topic_tag: get("CONFESSBOX_TOPIC_TAG").unwrap_or(defaults.topic_tag),
            browse_url: get("CONFESSBOX_BROWSE_URL").unwrap_or(defaults.browse_url),
            confession_cooldown: Duration::from_secs(parsed(
                "CONFESSBOX_CONFESSION_COOLDOWN_SECS",
                defaults.confession_cooldown.as_secs(),
            )?),
            comment_cooldown: Duration::from_secs(parsed(
                "CONFESSBOX_COMMENT_COOLDOWN_SECS",
                defaults.comment_cooldown.as_secs(),
            )?),
            page_size,
            blocklist: get("CONFESSBOX_BLOCKLIST")
                .map(|list| list.split(',').map(|w| w.trim().to_string()).filter(|w| !w.is_empty()).collect())
                .unwrap_or(defaults.blocklist),
            session_ttl: Duration::from_secs(parsed(
                "CONFESSBOX_SESSION_TTL_SECS",
                defaults.session_ttl.as_secs(),
            )?),
        };

        Ok(Self {
            bot_token: require("CONFESSBOX_BOT_TOKEN")?,
            channel_id,
            webhook_base: require("CONFESSBOX_WEBHOOK_BASE")?,
            webhook_path,
            webhook_secret: get("CONFESSBOX_WEBHOOK_SECRET"),
            host: get("CONFESSBOX_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port,
            db_path: get("CONFESSBOX_DB_PATH").unwrap_or_else(|| "confessbox.db".into()).into(),
            evict_interval: Duration::from_secs(parsed("CONFESSBOX_EVICT_INTERVAL_SECS", 300)?.max(1)),
            engine,
        })
    }

    pub fn webhook_url(&self) -> String {
        format!("{}{}", self.webhook_base.trim_end_matches('/'), self.webhook_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let map: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    const REQUIRED: [(&str, &str); 3] = [
        ("CONFESSBOX_BOT_TOKEN", "123:abc"),
        ("CONFESSBOX_CHANNEL_ID", "-1003234117416"),
        ("CONFESSBOX_WEBHOOK_BASE", "https://bot.example.org/"),
    ];

    #[test]
    fn defaults_apply() {
        let cfg = load(&REQUIRED).unwrap();
        assert_eq!(cfg.channel_id, ChatId(-1003234117416));
        assert_eq!(cfg.port, 10000);
        assert_eq!(cfg.webhook_url(), "https://bot.example.org/webhook");
        assert_eq!(cfg.engine.page_size, 4);
        assert_eq!(cfg.engine.confession_cooldown, Duration::from_secs(30));
        assert_eq!(cfg.engine.comment_cooldown, Duration::from_secs(10));
        assert!(cfg.webhook_secret.is_none());
        assert_eq!(cfg.engine.session_ttl, Duration::from_secs(86400));
    }

    #[test]
    fn overrides_are_read() {
        let mut vars = REQUIRED.to_vec();
        vars.extend([
            ("PORT", "8080"),
            ("CONFESSBOX_WEBHOOK_PATH", "hook"),
            ("CONFESSBOX_BLOCKLIST", "foo, bar ,,"),
            ("CONFESSBOX_COMMENT_COOLDOWN_SECS", "3"),
        ]);
        let cfg = load(&vars).unwrap();
        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.webhook_url(), "https://bot.example.org/hook");
        assert_eq!(cfg.engine.blocklist, vec!["foo", "bar"]);
        assert_eq!(cfg.engine.comment_cooldown, Duration::from_secs(3));
    }

    #[test]
    fn missing_token_is_an_error() {
        let err = load(&REQUIRED[1..]).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("CONFESSBOX_BOT_TOKEN")));
    }

    #[test]
    fn bad_numbers_are_rejected() {
        let mut vars = REQUIRED.to_vec();
        vars.push(("PORT", "99999"));
        assert!(matches!(load(&vars), Err(ConfigError::Invalid { var: "PORT", .. })));

        let mut vars = REQUIRED.to_vec();
        vars.push(("CONFESSBOX_PAGE_SIZE", "0"));
        assert!(matches!(load(&vars), Err(ConfigError::Invalid { var: "CONFESSBOX_PAGE_SIZE", .. })));
    }
}
