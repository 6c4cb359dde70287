//! Rate and concurrency policy (spec §4.G): three independent per-identity
//! buckets plus the process-wide limits everything else cites by name.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::error::CoreError;

/// Process-wide constants, gathered in one place so tests and DESIGN.md's
/// grounding ledger can cite them directly (spec §4.G, last paragraph).
pub mod limits {
    use std::time::Duration;

    pub const MAX_ASSET_BYTES: u64 = 5 * 1024 * 1024;
    pub const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(120);
    pub const MAX_BINDINGS_PER_IDENTITY: usize = 100;
    pub const MAX_CONCURRENT_DOWNLOADS: usize = 4;
    pub const SHARE_GC_INTERVAL: Duration = Duration::from_secs(300);
    pub const ADD_COOLDOWN: Duration = Duration::from_secs(10);
    pub const PLAY_BURST_LIMIT: u32 = 5;
    pub const PLAY_BURST_WINDOW: Duration = Duration::from_secs(5);
    pub const PLAY_BURST_COOLDOWN: Duration = Duration::from_secs(5);
    pub const PENDING_SHARE_TTL: Duration = Duration::from_secs(300);
    pub const PENDING_SHARE_CACHE_CAP: usize = 256;
}

/// Minimum 10s between `add` requests per identity.
#[derive(Default)]
pub struct AddCooldown {
    last_add: HashMap<String, Instant>,
}

impl AddCooldown {
    pub fn check_and_record(&mut self, identity: &str) -> Result<(), CoreError> {
        let now = Instant::now();
        if let Some(last) = self.last_add.get(identity) {
            let elapsed = now.duration_since(*last);
            if elapsed < limits::ADD_COOLDOWN {
                let remaining = (limits::ADD_COOLDOWN - elapsed).as_secs().max(1);
                return Err(CoreError::CooldownActive(remaining));
            }
        }
        self.last_add.insert(identity.to_string(), now);
        Ok(())
    }
}

struct BurstState {
    window_start: Instant,
    count: u32,
    cooldown_until: Option<Instant>,
}

/// ≤5 play requests per rolling 5s bucket; the 5th arms a 5s cooldown.
#[derive(Default)]
pub struct PlayBurst {
    state: HashMap<String, BurstState>,
}

impl PlayBurst {
    pub fn check_and_record(&mut self, identity: &str) -> Result<(), CoreError> {
        let now = Instant::now();
        let entry = self.state.entry(identity.to_string()).or_insert_with(|| BurstState {
            window_start: now,
            count: 0,
            cooldown_until: None,
        });

        if let Some(until) = entry.cooldown_until {
            if now < until {
                let remaining = (until - now).as_secs().max(1).min(limits::PLAY_BURST_COOLDOWN.as_secs());
                return Err(CoreError::RateLimited(remaining));
            }
            entry.cooldown_until = None;
            entry.window_start = now;
            entry.count = 0;
        }

        if now.duration_since(entry.window_start) > limits::PLAY_BURST_WINDOW {
            entry.window_start = now;
            entry.count = 0;
        }

        entry.count += 1;
        if entry.count >= limits::PLAY_BURST_LIMIT {
            entry.cooldown_until = Some(now + limits::PLAY_BURST_COOLDOWN);
        }
        Ok(())
    }
}

pub struct PendingShareEntry {
    pub share_id: i64,
    pub cached_at: Instant,
}

/// LRU-bounded, TTL-expiring cache of (slot → ordered pending shares) so a
/// client may accept/reject by 1-based ordinal instead of database id.
#[derive(Default)]
pub struct PendingShareCache {
    by_slot: HashMap<u32, (Vec<PendingShareEntry>, Instant)>,
    order: Vec<u32>,
}

impl PendingShareCache {
    pub fn store(&mut self, slot: u32, shares: Vec<PendingShareEntry>) {
        let now = Instant::now();
        if !self.by_slot.contains_key(&slot) {
            if self.order.len() >= limits::PENDING_SHARE_CACHE_CAP
                && let Some(oldest) = self.order.first().copied()
            {
                self.order.remove(0);
                self.by_slot.remove(&oldest);
            }
            self.order.push(slot);
        } else {
            self.order.retain(|s| *s != slot);
            self.order.push(slot);
        }
        self.by_slot.insert(slot, (shares, now));
    }

    pub fn lookup(&self, slot: u32, ordinal: u8) -> Option<i64> {
        let (shares, cached_at) = self.by_slot.get(&slot)?;
        if cached_at.elapsed() > limits::PENDING_SHARE_TTL {
            return None;
        }
        let idx = ordinal.checked_sub(1)? as usize;
        shares.get(idx).map(|e| e.share_id)
    }

    /// Drops entries older than 5 minutes. Called once per tick.
    pub fn gc(&mut self) {
        let stale: Vec<u32> = self
            .by_slot
            .iter()
            .filter(|(_, (_, t))| t.elapsed() > limits::PENDING_SHARE_TTL)
            .map(|(slot, _)| *slot)
            .collect();
        for slot in stale {
            self.by_slot.remove(&slot);
            self.order.retain(|s| *s != slot);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_cooldown_blocks_immediate_repeat() {
        let mut c = AddCooldown::default();
        c.check_and_record("X").unwrap();
        assert!(matches!(c.check_and_record("X"), Err(CoreError::CooldownActive(_))));
    }

    /// Spec §8 boundary: the 6th play request within a burst window fails
    /// with RateLimited in [1,5].
    #[test]
    fn sixth_play_in_burst_is_rate_limited() {
        let mut b = PlayBurst::default();
        for _ in 0..5 {
            b.check_and_record("X").unwrap();
        }
        match b.check_and_record("X") {
            Err(CoreError::RateLimited(secs)) => assert!((1..=5).contains(&secs)),
            other => panic!("expected RateLimited, got {other:?}"),
        }
    }

    #[test]
    fn pending_share_lookup_by_ordinal() {
        let mut cache = PendingShareCache::default();
        cache.store(3, vec![PendingShareEntry { share_id: 77, cached_at: Instant::now() }]);
        assert_eq!(cache.lookup(3, 1), Some(77));
        assert_eq!(cache.lookup(3, 2), None);
    }
}
