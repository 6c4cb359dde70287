//! Playlist CRUD, item ordering, position cursor, and public visibility
//! (spec §3 "Playlist", §4.J "Playlist playback cursor").

use rusqlite::{OptionalExtension, params};

use super::Catalog;
use crate::error::{CoreError, CoreResult};
use crate::menu::LivePlaylistRow;

impl Catalog {
    pub fn create_playlist(&self, identity: &str, name: &str) -> CoreResult<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO sound_playlists (identity, name) VALUES (?1, ?2)",
            params![identity, name],
        )
        .map_err(|e| match e {
            rusqlite::Error::SqliteFailure(_, Some(msg)) if msg.contains("UNIQUE") => {
                CoreError::AlreadyExists(format!("playlist {name} already exists"))
            }
            other => other.into(),
        })?;
        Ok(())
    }

    fn playlist_id(&self, identity: &str, name: &str) -> CoreResult<i64> {
        self.conn()?
            .query_row(
                "SELECT id FROM sound_playlists WHERE identity = ?1 AND name = ?2",
                params![identity, name],
                |r| r.get(0),
            )
            .optional()?
            .ok_or_else(|| CoreError::NotFound(format!("no playlist named {name}")))
    }

    pub fn delete_playlist(&self, identity: &str, name: &str) -> CoreResult<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let id: i64 = tx
            .query_row(
                "SELECT id FROM sound_playlists WHERE identity = ?1 AND name = ?2",
                params![identity, name],
                |r| r.get(0),
            )
            .optional()?
            .ok_or_else(|| CoreError::NotFound(format!("no playlist named {name}")))?;
        tx.execute("DELETE FROM sound_playlist_items WHERE playlist_id = ?1", params![id])?;
        tx.execute("DELETE FROM sound_playlists WHERE id = ?1", params![id])?;
        tx.commit()?;
        Ok(())
    }

    pub fn list_playlists(&self, identity: &str) -> CoreResult<Vec<String>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT name FROM sound_playlists WHERE identity = ?1 ORDER BY id")?;
        Ok(stmt.query_map(params![identity], |r| r.get(0))?.collect::<Result<_, _>>()?)
    }

    pub fn add_playlist_item(&self, identity: &str, playlist: &str, binding_alias: &str) -> CoreResult<()> {
        let playlist_id = self.playlist_id(identity, playlist)?;
        let conn = self.conn()?;
        let binding_id: i64 = conn
            .query_row(
                "SELECT id FROM user_sounds WHERE identity = ?1 AND alias = ?2",
                params![identity, binding_alias],
                |r| r.get(0),
            )
            .optional()?
            .ok_or_else(|| CoreError::NotFound(format!("no binding named {binding_alias}")))?;
        let next_order: i64 = conn.query_row(
            "SELECT COALESCE(MAX(order_number), 0) + 1 FROM sound_playlist_items WHERE playlist_id = ?1",
            params![playlist_id],
            |r| r.get(0),
        )?;
        conn.execute(
            "INSERT INTO sound_playlist_items (playlist_id, binding_id, order_number) VALUES (?1, ?2, ?3)",
            params![playlist_id, binding_id, next_order],
        )
        .map_err(|e| match e {
            rusqlite::Error::SqliteFailure(_, Some(msg)) if msg.contains("UNIQUE") => {
                CoreError::AlreadyExists("binding already in this playlist".into())
            }
            other => other.into(),
        })?;
        Ok(())
    }

    pub fn remove_playlist_item(&self, identity: &str, playlist: &str, order_number: u16) -> CoreResult<()> {
        let playlist_id = self.playlist_id(identity, playlist)?;
        let conn = self.conn()?;
        let removed = conn.execute(
            "DELETE FROM sound_playlist_items WHERE playlist_id = ?1 AND order_number = ?2",
            params![playlist_id, order_number],
        )?;
        if removed == 0 {
            return Err(CoreError::NotFound(format!("no item at position {order_number}")));
        }
        Ok(())
    }

    pub fn reorder_playlist_item(
        &self,
        identity: &str,
        playlist: &str,
        order_number: u16,
        new_order: u16,
    ) -> CoreResult<()> {
        let playlist_id = self.playlist_id(identity, playlist)?;
        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE sound_playlist_items SET order_number = ?3 WHERE playlist_id = ?1 AND order_number = ?2",
            params![playlist_id, order_number, new_order],
        )?;
        if updated == 0 {
            return Err(CoreError::NotFound(format!("no item at position {order_number}")));
        }
        Ok(())
    }

    /// Live playlist contents ordered by position, for the menu-expansion
    /// fallback rule.
    pub fn live_playlist_rows(&self, playlist_id: i64) -> CoreResult<Vec<LivePlaylistRow>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT i.order_number, u.alias, f.id, f.file_path
             FROM sound_playlist_items i
             JOIN user_sounds u ON u.id = i.binding_id
             JOIN sound_files f ON f.id = u.file_id
             WHERE i.playlist_id = ?1 ORDER BY i.order_number",
        )?;
        let rows = stmt
            .query_map(params![playlist_id], |r| {
                Ok(LivePlaylistRow {
                    position: r.get::<_, i64>(0)? as u16,
                    alias: r.get(1)?,
                    sound_file_id: r.get(2)?,
                    file_path: r.get(3)?,
                })
            })?
            .collect::<Result<_, _>>()?;
        Ok(rows)
    }

    /// Resolves a `PlaylistPlay` position per spec §4.J's sentinel rules
    /// (0 = stored cursor then advance-with-wrap, 254 = next, 255 =
    /// random without advancing the cursor) and returns the file path to
    /// play plus whether the cursor should advance.
    pub fn resolve_playback_position(&self, identity: &str, playlist: &str, position: u8) -> CoreResult<String> {
        let playlist_id = self.playlist_id(identity, playlist)?;
        let items = self.live_playlist_rows(playlist_id)?;
        if items.is_empty() {
            return Err(CoreError::NotFound("playlist has no items".into()));
        }
        let n = items.len();
        let conn = self.conn()?;
        let cursor: i64 =
            conn.query_row("SELECT cursor_pos FROM sound_playlists WHERE id = ?1", params![playlist_id], |r| r.get(0))?;

        let (index, advance) = match position {
            0 | 254 => (cursor as usize % n, true),
            255 => (rand::random_range(0..n), false),
            pos => ((pos as usize).saturating_sub(1).min(n - 1), false),
        };
        let path = items[index].file_path.clone();
        if advance {
            let next = (cursor + 1) % n as i64;
            conn.execute("UPDATE sound_playlists SET cursor_pos = ?2 WHERE id = ?1", params![playlist_id, next])?;
        }
        Ok(path)
    }

    pub fn set_playlist_visibility(&self, identity: &str, playlist: &str, is_public: bool) -> CoreResult<()> {
        let playlist_id = self.playlist_id(identity, playlist)?;
        self.conn()?.execute(
            "UPDATE sound_playlists SET is_public = ?2 WHERE id = ?1",
            params![playlist_id, is_public],
        )?;
        Ok(())
    }

    pub fn list_public_playlists(&self) -> CoreResult<Vec<String>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT name FROM sound_playlists WHERE is_public = 1 ORDER BY id")?;
        Ok(stmt.query_map([], |r| r.get(0))?.collect::<Result<_, _>>()?)
    }

    /// Track names of a public playlist, by name, for any identity to browse.
    pub fn public_playlist_items(&self, name: &str) -> CoreResult<Vec<String>> {
        let conn = self.conn()?;
        let playlist_id: i64 = conn
            .query_row("SELECT id FROM sound_playlists WHERE name = ?1 AND is_public = 1", params![name], |r| r.get(0))
            .optional()?
            .ok_or_else(|| CoreError::NotFound(format!("no public playlist named {name}")))?;
        let mut stmt = conn.prepare(
            "SELECT u.alias FROM sound_playlist_items i
             JOIN user_sounds u ON u.id = i.binding_id
             WHERE i.playlist_id = ?1 ORDER BY i.order_number",
        )?;
        Ok(stmt.query_map(params![playlist_id], |r| r.get(0))?.collect::<Result<_, _>>()?)
    }
}
