//! Embedded schema migration for the nine tables spec §6 names. Run once
//! per pooled connection the first time it is checked out, mirroring
//! `mpdhaj::system::System::new`'s "open, then ensure schema" sequence.

use rusqlite::Connection;

pub fn migrate(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS sound_files (
            id              INTEGER PRIMARY KEY,
            unique_name     TEXT NOT NULL UNIQUE,
            file_path       TEXT NOT NULL,
            display_name    TEXT NOT NULL,
            byte_size       INTEGER NOT NULL,
            duration_ms     INTEGER NOT NULL,
            introduced_by   TEXT NOT NULL,
            reference_count INTEGER NOT NULL DEFAULT 0,
            is_public       INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS user_sounds (
            id          INTEGER PRIMARY KEY,
            identity    TEXT NOT NULL,
            file_id     INTEGER NOT NULL REFERENCES sound_files(id),
            alias       TEXT NOT NULL,
            visibility  TEXT NOT NULL DEFAULT 'private',
            UNIQUE(identity, alias),
            UNIQUE(identity, file_id)
        );

        CREATE TABLE IF NOT EXISTS sound_playlists (
            id          INTEGER PRIMARY KEY,
            identity    TEXT NOT NULL,
            name        TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            is_public   INTEGER NOT NULL DEFAULT 0,
            cursor_pos  INTEGER NOT NULL DEFAULT 0,
            UNIQUE(identity, name)
        );

        CREATE TABLE IF NOT EXISTS sound_playlist_items (
            id           INTEGER PRIMARY KEY,
            playlist_id  INTEGER NOT NULL REFERENCES sound_playlists(id),
            binding_id   INTEGER NOT NULL REFERENCES user_sounds(id),
            order_number INTEGER NOT NULL,
            UNIQUE(playlist_id, order_number),
            UNIQUE(playlist_id, binding_id)
        );

        CREATE TABLE IF NOT EXISTS sound_shares (
            id               INTEGER PRIMARY KEY,
            file_id          INTEGER NOT NULL REFERENCES sound_files(id),
            source_identity  TEXT NOT NULL,
            target_identity  TEXT NOT NULL,
            suggested_alias  TEXT NOT NULL,
            status           TEXT NOT NULL DEFAULT 'pending',
            created_at       INTEGER NOT NULL,
            responded_at     INTEGER,
            UNIQUE(file_id, source_identity, target_identity)
        );

        CREATE TABLE IF NOT EXISTS verification_codes (
            id           INTEGER PRIMARY KEY,
            identity     TEXT NOT NULL,
            code         TEXT NOT NULL,
            display_name TEXT NOT NULL,
            created_at   INTEGER NOT NULL,
            expires_at   INTEGER NOT NULL,
            used         INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS user_sound_menus (
            id        INTEGER PRIMARY KEY,
            identity  TEXT,
            is_server_default INTEGER NOT NULL DEFAULT 0,
            name      TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS user_sound_menu_items (
            id                 INTEGER PRIMARY KEY,
            menu_id            INTEGER NOT NULL REFERENCES user_sound_menus(id),
            position            INTEGER NOT NULL,
            item_kind          TEXT NOT NULL,
            display_name       TEXT,
            binding_id         INTEGER REFERENCES user_sounds(id),
            sub_menu_id        INTEGER REFERENCES user_sound_menus(id),
            -- Deliberately not a foreign key: this id must still resolve to
            -- a playlist_snapshot after the playlist row it once named is
            -- deleted (spec §4.H step 4, spec §6).
            playlist_id        INTEGER,
            playlist_snapshot  TEXT,
            UNIQUE(menu_id, position)
        );

        CREATE TABLE IF NOT EXISTS quick_command_aliases (
            id            INTEGER PRIMARY KEY,
            identity      TEXT NOT NULL,
            short_alias   TEXT NOT NULL,
            binding_id    INTEGER REFERENCES user_sounds(id),
            public_file_id INTEGER REFERENCES sound_files(id),
            chat_text     TEXT,
            UNIQUE(identity, short_alias)
        );

        CREATE TABLE IF NOT EXISTS player_settings (
            identity      TEXT PRIMARY KEY,
            quick_prefix  TEXT NOT NULL DEFAULT '@'
        );
        ",
    )
}
