//! Per-slot identity cache (spec §4.C). The cache is the *only* authority
//! handlers may trust for "who is this"; the identity field carried inside
//! a packet's payload is parsed for wire compatibility but never used to
//! make a decision, because multiple clients on one host can report the
//! same in-game identity while holding distinct slots.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

pub type TeamId = u8;

#[derive(Debug, Clone)]
pub struct SessionEntry {
    pub identity: String,
    pub addr: SocketAddr,
    pub team: Option<TeamId>,
    last_seen: Instant,
}

pub struct IdentityCache {
    slots: HashMap<u32, SessionEntry>,
    idle_timeout: Duration,
}

impl IdentityCache {
    pub fn new(idle_timeout: Duration) -> IdentityCache {
        IdentityCache { slots: HashMap::new(), idle_timeout }
    }

    /// Registers or refreshes the session for `slot` on the handshake path
    /// (spec §5: "written only by the handshake path and the team-update
    /// path").
    pub fn register(&mut self, slot: u32, identity: String, addr: SocketAddr) {
        let entry = self.slots.entry(slot).or_insert_with(|| SessionEntry {
            identity: identity.clone(),
            addr,
            team: None,
            last_seen: Instant::now(),
        });
        entry.identity = identity;
        entry.addr = addr;
        entry.last_seen = Instant::now();
    }

    pub fn update_team(&mut self, slot: u32, team: TeamId) {
        if let Some(entry) = self.slots.get_mut(&slot) {
            entry.team = Some(team);
        }
    }

    pub fn touch(&mut self, slot: u32) {
        if let Some(entry) = self.slots.get_mut(&slot) {
            entry.last_seen = Instant::now();
        }
    }

    /// The only identity lookup handlers are allowed to use.
    pub fn lookup(&self, slot: u32) -> Option<&str> {
        self.slots.get(&slot).map(|e| e.identity.as_str())
    }

    pub fn entry(&self, slot: u32) -> Option<&SessionEntry> {
        self.slots.get(&slot)
    }

    pub fn roster(&self) -> impl Iterator<Item = (u32, &SessionEntry)> {
        self.slots.iter().map(|(slot, e)| (*slot, e))
    }

    /// Drops sessions idle past the configured timeout. Called once per
    /// tick from the main loop.
    pub fn sweep_expired(&mut self) {
        let timeout = self.idle_timeout;
        self.slots.retain(|_, e| e.last_seen.elapsed() < timeout);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};

    fn addr() -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 9000)
    }

    #[test]
    fn lookup_requires_registration() {
        let cache = IdentityCache::new(Duration::from_secs(300));
        assert_eq!(cache.lookup(3), None);
    }

    #[test]
    fn payload_identity_is_never_the_source_of_truth() {
        let mut cache = IdentityCache::new(Duration::from_secs(300));
        cache.register(3, "REAL-IDENTITY".into(), addr());
        // A handler must resolve via lookup(slot), never trust a payload
        // identity directly, even if it differs.
        assert_eq!(cache.lookup(3), Some("REAL-IDENTITY"));
    }

    #[test]
    fn idle_entries_expire() {
        let mut cache = IdentityCache::new(Duration::from_millis(1));
        cache.register(3, "X".into(), addr());
        std::thread::sleep(Duration::from_millis(5));
        cache.sweep_expired();
        assert_eq!(cache.lookup(3), None);
    }

    #[test]
    fn update_team_is_a_noop_for_an_unregistered_slot() {
        let mut cache = IdentityCache::new(Duration::from_secs(300));
        cache.update_team(3, 7);
        assert!(cache.entry(3).is_none());
    }

    #[test]
    fn update_team_sets_the_registered_slots_team() {
        let mut cache = IdentityCache::new(Duration::from_secs(300));
        cache.register(3, "X".into(), addr());
        cache.update_team(3, 7);
        assert_eq!(cache.entry(3).unwrap().team, Some(7));
    }
}
