//! Hierarchical menu pagination and the playlist-snapshot fallback rule
//! (spec §4.H). This module is pure: it has no database handle of its own,
//! only the data types the wire codec and the dispatcher pass through it.

use crate::error::CoreError;
use crate::wire::codec::{Reader, Writer};

pub const PAGE_SIZE: usize = 9;

/// `menu navigate`'s signed integer identifier, re-expressed as a sum type
/// per spec §9 rather than carried as a bare `i32` past the wire boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuTarget {
    SubMenu(i32),
    PlaylistExpansion(u32),
}

impl MenuTarget {
    pub fn from_wire(id: i32) -> MenuTarget {
        if id < 0 {
            MenuTarget::PlaylistExpansion(id.unsigned_abs())
        } else {
            MenuTarget::SubMenu(id)
        }
    }

    pub fn to_wire(self) -> i32 {
        match self {
            MenuTarget::SubMenu(id) => id,
            MenuTarget::PlaylistExpansion(id) => -(id as i32),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuScope {
    Personal,
    ServerDefault,
}

impl MenuScope {
    pub fn from_byte(b: u8) -> Result<MenuScope, CoreError> {
        match b {
            0 => Ok(MenuScope::Personal),
            1 => Ok(MenuScope::ServerDefault),
            _ => Err(CoreError::MalformedPacket(format!("unknown menu scope byte {b}"))),
        }
    }

    pub fn to_byte(self) -> u8 {
        match self {
            MenuScope::Personal => 0,
            MenuScope::ServerDefault => 1,
        }
    }
}

/// Wire-level item kind. A playlist link is carried as `Menu` with a
/// negative `MenuTarget`, per spec §6's menu-data layout; the richer
/// three-way kind (sound/menu/playlist) lives in the database layer and
/// collapses to this pair only at the codec boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireItemKind {
    Sound,
    Menu,
}

impl WireItemKind {
    fn byte(self) -> u8 {
        match self {
            WireItemKind::Sound => 0,
            WireItemKind::Menu => 1,
        }
    }

    fn from_byte(b: u8) -> Result<WireItemKind, CoreError> {
        match b {
            0 => Ok(WireItemKind::Sound),
            1 => Ok(WireItemKind::Menu),
            _ => Err(CoreError::MalformedPacket(format!("unknown menu item kind {b}"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuItemData {
    /// Sound item: the bound asset's alias.
    Alias(String),
    /// Sub-menu or playlist-expansion link.
    Target(MenuTarget),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuItemRecord {
    pub position: u8,
    pub name: String,
    pub data: MenuItemData,
}

impl MenuItemRecord {
    fn encode(&self, w: &mut Writer) {
        let kind = match &self.data {
            MenuItemData::Alias(_) => WireItemKind::Sound,
            MenuItemData::Target(_) => WireItemKind::Menu,
        };
        w.u8(self.position).u8(kind.byte());
        w.short_str(&self.name);
        match &self.data {
            MenuItemData::Alias(alias) => {
                w.short_str(alias);
            }
            MenuItemData::Target(target) => {
                w.u8(4);
                w.i32(target.to_wire());
            }
        }
    }

    fn decode(r: &mut Reader) -> Result<MenuItemRecord, CoreError> {
        let position = r.u8()?;
        let kind = WireItemKind::from_byte(r.u8()?)?;
        let name = r.short_str()?;
        let data = match kind {
            WireItemKind::Sound => MenuItemData::Alias(r.short_str()?),
            WireItemKind::Menu => {
                let len = r.u8()?;
                if len != 4 {
                    return Err(CoreError::MalformedPacket(format!(
                        "menu-link data length must be 4, got {len}"
                    )));
                }
                MenuItemData::Target(MenuTarget::from_wire(r.i32()?))
            }
        };
        Ok(MenuItemRecord { position, name, data })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuPage {
    pub menu_id: i32,
    pub total_items: u16,
    pub page_offset: u16,
    pub items: Vec<MenuItemRecord>,
}

impl MenuPage {
    pub fn empty(menu_id: i32, page_offset: u16) -> MenuPage {
        MenuPage { menu_id, total_items: 0, page_offset, items: Vec::new() }
    }

    pub(crate) fn encode(&self, w: &mut Writer) {
        w.i32(self.menu_id);
        w.u16(self.total_items);
        w.u16(self.page_offset);
        w.u8(self.items.len() as u8);
        for item in &self.items {
            item.encode(w);
        }
    }

    pub fn decode(body: &[u8]) -> Result<MenuPage, CoreError> {
        let mut r = Reader::new(body);
        let menu_id = r.i32()?;
        let total_items = r.u16()?;
        let page_offset = r.u16()?;
        let count = r.u8()?;
        let mut items = Vec::with_capacity(count as usize);
        for _ in 0..count {
            items.push(MenuItemRecord::decode(&mut r)?);
        }
        Ok(MenuPage { menu_id, total_items, page_offset, items })
    }

    /// One page of up to `PAGE_SIZE` items starting at `page_offset`
    /// (spec §4.H pagination convention).
    pub fn paginate(menu_id: i32, all: &[MenuItemRecord], page_offset: u16) -> MenuPage {
        let start = page_offset as usize * PAGE_SIZE;
        let items = all.iter().skip(start).take(PAGE_SIZE).cloned().collect();
        MenuPage { menu_id, total_items: all.len() as u16, page_offset, items }
    }
}

/// One row of a playlist's *live* current contents, ordered by position.
pub struct LivePlaylistRow {
    pub position: u16,
    pub alias: String,
    pub sound_file_id: i64,
    pub file_path: String,
}

/// One row of a playlist's frozen snapshot, captured at link time.
pub struct SnapshotRow {
    pub position: u16,
    pub original_alias: String,
    pub display_name: Option<String>,
    pub file_path: String,
}

/// Result of expanding a playlist-kind menu item into a page: which source
/// won, plus the rows to render with playback always resolved against
/// `file_path` (never re-queried by alias).
pub struct ExpandedPlaylist {
    pub rows: Vec<SnapshotRow>,
}

/// Implements the five-step fallback rule verbatim from spec §4.H.
pub fn expand_playlist(live: Vec<LivePlaylistRow>, snapshot: Vec<SnapshotRow>) -> ExpandedPlaylist {
    if !live.is_empty() {
        // Step 3: live content wins, but snapshot display-name overrides
        // apply where the captured alias matches.
        let overrides: std::collections::HashMap<&str, &str> = snapshot
            .iter()
            .filter_map(|s| s.display_name.as_deref().map(|d| (s.original_alias.as_str(), d)))
            .collect();
        let rows = live
            .into_iter()
            .map(|row| {
                let display = overrides.get(row.alias.as_str()).map(|s| s.to_string());
                SnapshotRow {
                    position: row.position,
                    original_alias: row.alias,
                    display_name: display,
                    file_path: row.file_path,
                }
            })
            .collect();
        ExpandedPlaylist { rows }
    } else if !snapshot.is_empty() {
        // Step 4: the live query came back empty (playlist deleted,
        // privatized, or drained); fall back to the frozen snapshot.
        ExpandedPlaylist { rows: snapshot }
    } else {
        // Step 5: neither source has anything.
        ExpandedPlaylist { rows: Vec::new() }
    }
}

impl ExpandedPlaylist {
    pub fn to_menu_items(&self, page_offset: u16) -> Vec<MenuItemRecord> {
        self.rows
            .iter()
            .skip(page_offset as usize * PAGE_SIZE)
            .take(PAGE_SIZE)
            .map(|row| MenuItemRecord {
                position: row.position as u8,
                name: row.display_name.clone().unwrap_or_else(|| row.original_alias.clone()),
                data: MenuItemData::Alias(row.original_alias.clone()),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_target_is_playlist_expansion() {
        assert_eq!(MenuTarget::from_wire(-42), MenuTarget::PlaylistExpansion(42));
        assert_eq!(MenuTarget::from_wire(7), MenuTarget::SubMenu(7));
        assert_eq!(MenuTarget::PlaylistExpansion(42).to_wire(), -42);
    }

    #[test]
    fn menu_page_round_trips() {
        let page = MenuPage {
            menu_id: 42,
            total_items: 2,
            page_offset: 0,
            items: vec![
                MenuItemRecord { position: 1, name: "A".into(), data: MenuItemData::Alias("a".into()) },
                MenuItemRecord {
                    position: 2,
                    name: "sub".into(),
                    data: MenuItemData::Target(MenuTarget::PlaylistExpansion(42)),
                },
            ],
        };
        let mut w = Writer::new();
        page.encode(&mut w);
        let decoded = MenuPage::decode(&w.0).unwrap();
        pretty_assertions::assert_eq!(decoded, page);
    }

    /// Spec §8 scenario S5: snapshot display-name override applies over
    /// live content; live content wins when present.
    #[test]
    fn live_content_wins_with_snapshot_overrides() {
        let live = vec![
            LivePlaylistRow { position: 1, alias: "a".into(), sound_file_id: 1, file_path: "a.mp3".into() },
            LivePlaylistRow { position: 2, alias: "b".into(), sound_file_id: 2, file_path: "b.mp3".into() },
            LivePlaylistRow { position: 3, alias: "c".into(), sound_file_id: 3, file_path: "c.mp3".into() },
        ];
        let snapshot = vec![SnapshotRow {
            position: 2,
            original_alias: "b".into(),
            display_name: Some("Boom".into()),
            file_path: "b-snap.mp3".into(),
        }];
        let expanded = expand_playlist(live, snapshot);
        let items = expanded.to_menu_items(0);
        assert_eq!(items[1].name, "Boom");
        assert_eq!(items[0].name, "a");
    }

    #[test]
    fn snapshot_fallback_when_live_is_empty() {
        let snapshot = vec![SnapshotRow {
            position: 1,
            original_alias: "a".into(),
            display_name: None,
            file_path: "a.mp3".into(),
        }];
        let expanded = expand_playlist(Vec::new(), snapshot);
        assert_eq!(expanded.rows.len(), 1);
    }

    #[test]
    fn empty_when_both_sources_are_empty() {
        let expanded = expand_playlist(Vec::new(), Vec::new());
        assert!(expanded.rows.is_empty());
    }
}
