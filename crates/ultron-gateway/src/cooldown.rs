use std::time::{Duration, Instant};

use dashmap::DashMap;
use ultron_common::UserId;

/// Per-user minimum interval between accepted requests.
///
/// Expired records are dropped when they are next looked up; nothing sweeps
/// the map in the background.
pub struct CooldownTracker {
    window: Duration,
    last_accepted: DashMap<UserId, Instant>,
}

impl CooldownTracker {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_accepted: DashMap::new(),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn is_on_cooldown(&self, user_id: &UserId) -> bool {
        self.is_on_cooldown_at(user_id, Instant::now())
    }

    /// Cooldown check against an explicit clock reading.
    pub fn is_on_cooldown_at(&self, user_id: &UserId, now: Instant) -> bool {
        let active = match self.last_accepted.get(user_id) {
            None => return false,
            Some(last) => now.saturating_duration_since(*last) < self.window,
        };

        if !active {
            self.last_accepted
                .remove_if(user_id, |_, last| now.saturating_duration_since(*last) >= self.window);
        }
        active
    }

    pub fn set_cooldown(&self, user_id: &UserId) {
        self.set_cooldown_at(user_id, Instant::now());
    }

    pub fn set_cooldown_at(&self, user_id: &UserId, now: Instant) {
        self.last_accepted.insert(user_id.clone(), now);
    }

    /// Number of records currently held, expired or not.
    pub fn tracked_users(&self) -> usize {
        self.last_accepted.len()
    }
}
