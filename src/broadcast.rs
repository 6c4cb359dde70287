//! Broadcast fabric (spec §4.F): given a ready Opus frame tagged with its
//! source and channel, build the outbound `audio-relay` packet and fan it
//! out to the current roster. The fabric never buffers — a frame submitted
//! is a frame sent.

use crate::identity::IdentityCache;
use crate::transport::{Session, Transport};
use crate::wire::response::AudioRelay;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Team(u8),
    Global,
}

pub struct Fabric {
    /// Whether a relayed frame echoes back to its own source slot. Spec §9
    /// flags this as an unresolved contradiction in the source; resolved
    /// here as "no echo" (see DESIGN.md).
    pub echo_to_source: bool,
}

impl Fabric {
    pub fn new() -> Fabric {
        Fabric { echo_to_source: false }
    }

    /// Builds the roster entitled to hear `channel`, per the team/global
    /// membership the game server reports through the identity cache
    /// (spec §9: "the core only tracks what the game server reports").
    pub fn roster_for(&self, identities: &IdentityCache, channel: Channel) -> Vec<Session> {
        identities
            .roster()
            .filter(|(_, entry)| match channel {
                Channel::Global => true,
                Channel::Team(team) => entry.team == Some(team),
            })
            .map(|(slot, entry)| Session { slot, addr: entry.addr })
            .collect()
    }

    pub async fn relay(
        &self,
        transport: &Transport,
        roster: &[Session],
        from_slot: u8,
        sequence: u32,
        channel: Channel,
        opus: Vec<u8>,
    ) {
        let channel_byte = match channel {
            Channel::Global => 0,
            Channel::Team(id) => id,
        };
        let packet = AudioRelay { from_slot, sequence, channel: channel_byte, opus }.encode();
        let exclude = if self.echo_to_source { None } else { Some(from_slot as u32) };
        transport.broadcast(roster, &packet, exclude).await;
    }
}

impl Default for Fabric {
    fn default() -> Self {
        Fabric::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::IdentityCache;
    use std::net::{IpAddr, Ipv4Addr, SocketAddr};
    use std::time::Duration;

    fn addr() -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 9000)
    }

    #[test]
    fn global_roster_includes_everyone() {
        let mut identities = IdentityCache::new(Duration::from_secs(300));
        identities.register(1, "A".into(), addr());
        identities.register(2, "B".into(), addr());
        let fabric = Fabric::new();
        let roster = fabric.roster_for(&identities, Channel::Global);
        assert_eq!(roster.len(), 2);
    }

    #[test]
    fn team_roster_filters_by_team() {
        let mut identities = IdentityCache::new(Duration::from_secs(300));
        identities.register(1, "A".into(), addr());
        identities.register(2, "B".into(), addr());
        identities.update_team(1, 5);
        let fabric = Fabric::new();
        let roster = fabric.roster_for(&identities, Channel::Team(5));
        assert_eq!(roster.len(), 1);
        assert_eq!(roster[0].slot, 1);
    }
}
