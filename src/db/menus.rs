//! Menu page retrieval and playlist-snapshot capture (spec §4.H, §6).

use rusqlite::{OptionalExtension, params};
use serde::{Deserialize, Serialize};

use super::{unix_now, Catalog};
use crate::error::{CoreError, CoreResult};
use crate::menu::{self, MenuItemData, MenuPage, MenuScope, MenuTarget, SnapshotRow};

/// Shape of the `playlist_snapshot` JSON column, spec §6.
#[derive(Debug, Serialize, Deserialize)]
pub struct PlaylistSnapshot {
    pub captured_at: i64,
    pub original_playlist_id: i64,
    pub original_playlist_name: String,
    pub items: Vec<SnapshotItem>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SnapshotItem {
    pub position: u16,
    pub sound_file_id: i64,
    pub original_alias: String,
    pub display_name: Option<String>,
    pub file_path: String,
}

impl Catalog {
    fn root_menu_id(&self, identity: &str, scope: MenuScope) -> CoreResult<i64> {
        let conn = self.conn()?;
        let existing: Option<i64> = match scope {
            MenuScope::ServerDefault => conn
                .query_row("SELECT id FROM user_sound_menus WHERE is_server_default = 1 LIMIT 1", [], |r| r.get(0))
                .optional()?,
            MenuScope::Personal => conn
                .query_row(
                    "SELECT id FROM user_sound_menus WHERE identity = ?1 AND is_server_default = 0 LIMIT 1",
                    params![identity],
                    |r| r.get(0),
                )
                .optional()?,
        };
        if let Some(id) = existing {
            return Ok(id);
        }
        match scope {
            MenuScope::ServerDefault => {
                conn.execute(
                    "INSERT INTO user_sound_menus (identity, is_server_default, name) VALUES (NULL, 1, 'root')",
                    [],
                )?;
            }
            MenuScope::Personal => {
                conn.execute(
                    "INSERT INTO user_sound_menus (identity, is_server_default, name) VALUES (?1, 0, 'root')",
                    params![identity],
                )?;
            }
        }
        Ok(conn.last_insert_rowid())
    }

    fn items_for_menu(&self, menu_id: i64) -> CoreResult<Vec<menu::MenuItemRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT mi.position, COALESCE(mi.display_name, COALESCE(u.alias, pl.name, sm.name)) AS name,
                    mi.item_kind, u.alias, mi.sub_menu_id, mi.playlist_id
             FROM user_sound_menu_items mi
             LEFT JOIN user_sounds u ON u.id = mi.binding_id
             LEFT JOIN sound_playlists pl ON pl.id = mi.playlist_id
             LEFT JOIN user_sound_menus sm ON sm.id = mi.sub_menu_id
             WHERE mi.menu_id = ?1 ORDER BY mi.position",
        )?;
        let rows = stmt.query_map(params![menu_id], |row| {
            let position: i64 = row.get(0)?;
            let name: String = row.get(1)?;
            let kind: String = row.get(2)?;
            let alias: Option<String> = row.get(3)?;
            let sub_menu_id: Option<i64> = row.get(4)?;
            let playlist_id: Option<i64> = row.get(5)?;
            let data = match kind.as_str() {
                "sound" => MenuItemData::Alias(alias.unwrap_or_default()),
                "playlist" => MenuItemData::Target(MenuTarget::PlaylistExpansion(playlist_id.unwrap_or(0) as u32)),
                _ => MenuItemData::Target(MenuTarget::SubMenu(sub_menu_id.unwrap_or(0) as i32)),
            };
            Ok(menu::MenuItemRecord { position: position as u8, name, data })
        })?;
        Ok(rows.collect::<Result<_, _>>()?)
    }

    pub fn menu_root_page(&self, identity: &str, scope: MenuScope, page_offset: u16) -> CoreResult<MenuPage> {
        let menu_id = self.root_menu_id(identity, scope)?;
        let items = self.items_for_menu(menu_id)?;
        Ok(MenuPage::paginate(menu_id as i32, &items, page_offset))
    }

    /// Navigating to a non-existent menu-id returns an empty page, never
    /// an error (spec §8 boundary behavior).
    pub fn menu_sub_page(&self, menu_id: i32, page_offset: u16) -> CoreResult<MenuPage> {
        match self.items_for_menu(menu_id as i64) {
            Ok(items) if !items.is_empty() => Ok(MenuPage::paginate(menu_id, &items, page_offset)),
            _ => Ok(MenuPage::empty(menu_id, page_offset)),
        }
    }

    pub fn menu_playlist_page(&self, playlist_id: i32, page_offset: u16) -> CoreResult<MenuPage> {
        let live = self.live_playlist_rows(playlist_id as i64).unwrap_or_default();
        // Refresh the frozen snapshot on every successful live read, so the
        // most recent live state is what survives the playlist's eventual
        // deletion or privatization (spec §4.H step 2).
        if !live.is_empty() {
            self.capture_playlist_snapshot(playlist_id as i64)?;
        }
        let snapshot = self.load_snapshot(playlist_id as i64)?;
        let expanded = menu::expand_playlist(live, snapshot);
        let items = expanded.to_menu_items(page_offset);
        Ok(MenuPage { menu_id: -playlist_id, total_items: expanded.rows.len() as u16, page_offset, items })
    }

    /// Captures (or refreshes) the frozen snapshot for a playlist onto the
    /// menu item(s) that link to it, the mechanism that keeps a menu link
    /// working after the playlist is deleted, privatized, or loses items
    /// (spec §4.H, spec §6 "the latter carrying a JSON playlist_snapshot
    /// column"). Display-name overrides already captured on a prior
    /// snapshot are preserved across the refresh rather than wiped.
    pub fn capture_playlist_snapshot(&self, playlist_id: i64) -> CoreResult<()> {
        let (name,): (String,) =
            self.conn()?.query_row("SELECT name FROM sound_playlists WHERE id = ?1", params![playlist_id], |r| {
                Ok((r.get(0)?,))
            })?;
        let live = self.live_playlist_rows(playlist_id)?;
        let overrides: std::collections::HashMap<String, String> = self
            .load_snapshot(playlist_id)?
            .into_iter()
            .filter_map(|row| row.display_name.map(|d| (row.original_alias, d)))
            .collect();
        let snapshot = PlaylistSnapshot {
            captured_at: unix_now(),
            original_playlist_id: playlist_id,
            original_playlist_name: name,
            items: live
                .into_iter()
                .map(|row| SnapshotItem {
                    position: row.position,
                    sound_file_id: row.sound_file_id,
                    display_name: overrides.get(&row.alias).cloned(),
                    original_alias: row.alias,
                    file_path: row.file_path,
                })
                .collect(),
        };
        let json = serde_json::to_string(&snapshot)
            .map_err(|e| CoreError::Fatal(format!("serializing playlist snapshot: {e}")))?;
        self.conn()?.execute(
            "UPDATE user_sound_menu_items SET playlist_snapshot = ?2 WHERE playlist_id = ?1",
            params![playlist_id, json],
        )?;
        Ok(())
    }

    fn load_snapshot(&self, playlist_id: i64) -> CoreResult<Vec<SnapshotRow>> {
        let raw: Option<String> = self
            .conn()?
            .query_row(
                "SELECT playlist_snapshot FROM user_sound_menu_items
                 WHERE playlist_id = ?1 AND playlist_snapshot IS NOT NULL LIMIT 1",
                params![playlist_id],
                |r| r.get(0),
            )
            .optional()?;
        let Some(raw) = raw else { return Ok(Vec::new()) };
        let snapshot: PlaylistSnapshot =
            serde_json::from_str(&raw).map_err(|e| CoreError::Fatal(format!("corrupt playlist snapshot: {e}")))?;
        Ok(snapshot
            .items
            .into_iter()
            .map(|i| SnapshotRow {
                position: i.position,
                original_alias: i.original_alias,
                display_name: i.display_name,
                file_path: i.file_path,
            })
            .collect())
    }
}
