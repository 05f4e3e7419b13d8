use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use confessbox_types::models::ActorId;

use crate::state::StateStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    Confession,
    Comment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Allowed,
    /// Whole seconds left, rounded up so a denial never says "0s".
    Denied { remaining_secs: u64 },
}

pub type RateKey = (ActorId, ActionKind);

/// Per-actor, per-kind cooldown gate.
///
/// `check` never mutates; callers `record` once the action counts as taken.
pub struct RateLimiter {
    store: Arc<dyn StateStore<RateKey, DateTime<Utc>>>,
    confession_cooldown: Duration,
    comment_cooldown: Duration,
}

impl RateLimiter {
    pub fn new(
        store: Arc<dyn StateStore<RateKey, DateTime<Utc>>>,
        confession_cooldown: Duration,
        comment_cooldown: Duration,
    ) -> Self {
        Self {
            store,
            confession_cooldown,
            comment_cooldown,
        }
    }

    pub fn cooldown(&self, kind: ActionKind) -> Duration {
        match kind {
            ActionKind::Confession => self.confession_cooldown,
            ActionKind::Comment => self.comment_cooldown,
        }
    }

    pub fn check(&self, actor: ActorId, kind: ActionKind, now: DateTime<Utc>) -> RateDecision {
        let Some(last) = self.store.get(&(actor, kind)) else {
            return RateDecision::Allowed;
        };

        let cooldown_ms = self.cooldown(kind).as_millis() as i64;
        // A clock step backwards counts as "just now".
        let elapsed_ms = (now - last).num_milliseconds().max(0);
        if elapsed_ms >= cooldown_ms {
            return RateDecision::Allowed;
        }

        let remaining_ms = (cooldown_ms - elapsed_ms) as u64;
        RateDecision::Denied {
            remaining_secs: remaining_ms.div_ceil(1000),
        }
    }

    pub fn record(&self, actor: ActorId, kind: ActionKind, now: DateTime<Utc>) {
        self.store.set((actor, kind), now, now);
    }

    pub fn evict_idle(&self, cutoff: DateTime<Utc>) -> usize {
        self.store.evict_idle(cutoff)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::MemoryStore;
    use chrono::Duration as ChronoDuration;

    fn limiter() -> RateLimiter {
        RateLimiter::new(
            Arc::new(MemoryStore::<RateKey, DateTime<Utc>>::new()),
            Duration::from_secs(30),
            Duration::from_secs(10),
        )
    }

    #[test]
    fn first_action_is_allowed() {
        let rl = limiter();
        assert_eq!(rl.check(ActorId(1), ActionKind::Confession, Utc::now()), RateDecision::Allowed);
    }

    #[test]
    fn second_action_within_cooldown_is_denied() {
        let rl = limiter();
        let t0 = Utc::now();
        rl.record(ActorId(1), ActionKind::Confession, t0);

        let decision = rl.check(ActorId(1), ActionKind::Confession, t0 + ChronoDuration::seconds(12));
        assert_eq!(decision, RateDecision::Denied { remaining_secs: 18 });

        let decision = rl.check(ActorId(1), ActionKind::Confession, t0 + ChronoDuration::milliseconds(12_500));
        assert_eq!(decision, RateDecision::Denied { remaining_secs: 18 });
    }

    #[test]
    fn cooldown_boundary_is_allowed() {
        let rl = limiter();
        let t0 = Utc::now();
        rl.record(ActorId(1), ActionKind::Comment, t0);
        assert_eq!(
            rl.check(ActorId(1), ActionKind::Comment, t0 + ChronoDuration::seconds(10)),
            RateDecision::Allowed
        );
    }

    #[test]
    fn kinds_and_actors_are_independent() {
        let rl = limiter();
        let t0 = Utc::now();
        rl.record(ActorId(1), ActionKind::Confession, t0);

        assert_eq!(rl.check(ActorId(1), ActionKind::Comment, t0), RateDecision::Allowed);
        assert_eq!(rl.check(ActorId(2), ActionKind::Confession, t0), RateDecision::Allowed);
    }

    #[test]
    fn check_does_not_consume_the_window() {
        let rl = limiter();
        let t0 = Utc::now();
        rl.check(ActorId(1), ActionKind::Comment, t0);
        assert_eq!(
            rl.check(ActorId(1), ActionKind::Comment, t0 + ChronoDuration::seconds(1)),
            RateDecision::Allowed
        );
    }

    #[test]
    fn clock_skew_reports_full_cooldown() {
        let rl = limiter();
        let t0 = Utc::now();
        rl.record(ActorId(1), ActionKind::Comment, t0);
        assert_eq!(
            rl.check(ActorId(1), ActionKind::Comment, t0 - ChronoDuration::seconds(3)),
            RateDecision::Denied { remaining_secs: 10 }
        );
    }
}
