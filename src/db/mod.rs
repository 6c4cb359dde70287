//! Database layer (spec §4.D): connection-pooled, auto-reconnect, typed
//! query surface, grouped into per-entity submodules. Falls back to a
//! narrow filesystem-only catalog when no connection string is configured
//! (spec §6 "Configuration", spec §9 "keep the abstraction").

pub mod assets;
pub mod filesystem;
pub mod menus;
pub mod playlists;
pub mod quick_commands;
pub mod schema;
pub mod shares;
pub mod verification;

use std::path::PathBuf;

use color_eyre::Result;
use color_eyre::eyre::Context;
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

pub use filesystem::FilesystemCatalog;

pub type SqlitePool = Pool<SqliteConnectionManager>;

/// Seconds since the Unix epoch, for expiry and capture timestamps across
/// the submodules.
pub(crate) fn unix_now() -> i64 {
    jiff::Timestamp::now().as_second()
}

pub enum Catalog {
    Sqlite { pool: SqlitePool, asset_dir: PathBuf },
    Filesystem(FilesystemCatalog),
}

impl Catalog {
    /// Lazily opens the pool from the connection-string env var, running
    /// schema migration on the first connection. Absence of the variable
    /// falls back to `Catalog::Filesystem` (spec §6).
    pub fn connect(database_url: Option<String>, asset_dir: PathBuf) -> Result<Catalog> {
        match database_url {
            Some(url) => {
                let manager = SqliteConnectionManager::file(&url);
                let pool = Pool::builder()
                    .build(manager)
                    .wrap_err_with(|| format!("opening catalog database at {url}"))?;
                {
                    let conn = pool.get().wrap_err("acquiring initial connection")?;
                    schema::migrate(&conn).wrap_err("running schema migration")?;
                }
                Ok(Catalog::Sqlite { pool, asset_dir })
            }
            None => Ok(Catalog::Filesystem(FilesystemCatalog::open(asset_dir)?)),
        }
    }

    pub fn asset_dir(&self) -> &std::path::Path {
        match self {
            Catalog::Sqlite { asset_dir, .. } => asset_dir,
            Catalog::Filesystem(fs) => fs.base_dir(),
        }
    }

    /// Diagnostic-only startup sweep (spec.md's distillation has no such
    /// operation; supplemented per SPEC_FULL.md §D, modelled on
    /// `mpdhaj::System::rescan`'s generation bookkeeping): logs rows whose
    /// `file_path` no longer exists on disk, without deleting anything.
    pub fn log_orphaned_files(&self) -> Result<()> {
        let Catalog::Sqlite { pool, .. } = self else { return Ok(()) };
        let conn = pool.get().wrap_err("acquiring connection for startup sweep")?;
        let mut stmt = conn.prepare("SELECT unique_name, file_path FROM sound_files")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;
        for row in rows {
            let (name, path) = row?;
            if !std::path::Path::new(&path).exists() {
                tracing::warn!(asset = %name, %path, "asset row has no backing file on disk");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_catalog() -> (Catalog, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("test.db").to_string_lossy().into_owned();
        let catalog = Catalog::connect(Some(db_path), dir.path().join("assets")).unwrap();
        (catalog, dir)
    }

    /// Comment (b): a public sound's quick/fuzzy lookup key is the human
    /// `display_name`, not the opaque on-disk `unique_name`.
    #[test]
    fn public_library_is_keyed_by_display_name() {
        let (catalog, _dir) = test_catalog();
        catalog.add_binding("owner", "uniq1.bin", "/tmp/uniq1.bin", "Good Game", 10, 0, "gg").unwrap();
        catalog.set_visibility("owner", "gg", "public").unwrap();

        let found = catalog.find_public_by_name("Good Game").unwrap();
        assert_eq!(found.alias, "Good Game");

        let listed = catalog.list_public().unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].alias, "Good Game");
    }

    /// Comment (c), scenario S5: the snapshot lives on the menu-item row, so
    /// a menu link to a playlist still resolves after the playlist itself
    /// (and its items) are deleted.
    #[test]
    fn playlist_snapshot_survives_playlist_deletion() {
        let (catalog, _dir) = test_catalog();
        catalog.add_binding("p1", "uniq1.bin", "/tmp/uniq1.bin", "Boom", 10, 0, "boom").unwrap();
        catalog.create_playlist("p1", "party").unwrap();
        catalog.add_playlist_item("p1", "party", "boom").unwrap();

        let conn = catalog.conn().unwrap();
        let playlist_id: i64 =
            conn.query_row("SELECT id FROM sound_playlists WHERE name = 'party'", [], |r| r.get(0)).unwrap();
        conn.execute(
            "INSERT INTO user_sound_menus (identity, is_server_default, name) VALUES (NULL, 1, 'root')",
            [],
        )
        .unwrap();
        let menu_id = conn.last_insert_rowid();
        conn.execute(
            "INSERT INTO user_sound_menu_items (menu_id, position, item_kind, playlist_id) VALUES (?1, 1, 'playlist', ?2)",
            rusqlite::params![menu_id, playlist_id],
        )
        .unwrap();
        drop(conn);

        let before = catalog.menu_playlist_page(playlist_id as i32, 0).unwrap();
        assert_eq!(before.items.len(), 1);
        assert_eq!(before.items[0].name, "boom");

        catalog.delete_playlist("p1", "party").unwrap();

        let after = catalog.menu_playlist_page(playlist_id as i32, 0).unwrap();
        assert_eq!(after.items.len(), 1);
        assert_eq!(after.items[0].name, "boom");
    }

    /// Comment (a): the filesystem fallback supports add/list/delete/rename
    /// and play-by-name without touching a database.
    #[test]
    fn filesystem_mode_supports_core_operations() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = Catalog::connect(None, dir.path().to_path_buf()).unwrap();

        catalog.add_binding("id1", "uniq1.bin", "ignored", "ignored", 1024, 0, "laugh").unwrap();
        assert_eq!(catalog.list_bindings("id1").unwrap().len(), 1);

        let found = catalog.find_binding_by_name("id1", "laugh").unwrap();
        assert_eq!(found.unique_name, "uniq1.bin");

        catalog.rename_binding("id1", "laugh", "chuckle").unwrap();
        assert!(catalog.find_binding_by_name("id1", "chuckle").is_ok());

        let deleted_path = catalog.delete_binding("id1", "chuckle").unwrap();
        assert!(deleted_path.is_some());
        assert_eq!(catalog.list_bindings("id1").unwrap().len(), 0);
    }
}
