//! Asset CRUD, public-library listing/adoption, and fuzzy name lookup
//! (spec §4.D).

use rusqlite::{Connection, OptionalExtension, params};

use super::filesystem::{FilesystemCatalog, FsBinding};
use super::Catalog;
use crate::error::{CoreError, CoreResult};
use crate::policy::limits;

pub struct BindingRow {
    pub alias: String,
    pub file_path: String,
    pub byte_size: i64,
    pub unique_name: String,
}

impl Catalog {
    pub(super) fn conn(&self) -> CoreResult<r2d2::PooledConnection<r2d2_sqlite::SqliteConnectionManager>> {
        match self {
            Catalog::Sqlite { pool, .. } => Ok(pool.get()?),
            Catalog::Filesystem(_) => Err(CoreError::Unsupported),
        }
    }

    /// Inserts the file row (or reuses one matching `unique_name`) and the
    /// binding in one transaction (spec §4.D: "file + binding insert").
    pub fn add_binding(
        &self,
        identity: &str,
        unique_name: &str,
        file_path: &str,
        display_name: &str,
        byte_size: i64,
        duration_ms: i64,
        alias: &str,
    ) -> CoreResult<()> {
        if let Catalog::Filesystem(fs) = self {
            return fs.add(identity, alias, unique_name, byte_size.max(0) as u64);
        }
        let mut conn = self.conn()?;
        let existing: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM user_sounds WHERE identity = ?1",
                params![identity],
                |r| r.get(0),
            )?;
        if existing as usize >= limits::MAX_BINDINGS_PER_IDENTITY {
            return Err(CoreError::ValidationError("binding limit reached".into()));
        }

        let tx = conn.transaction()?;
        let file_id: i64 = match tx
            .query_row("SELECT id FROM sound_files WHERE unique_name = ?1", params![unique_name], |r| {
                r.get(0)
            })
            .optional()?
        {
            Some(id) => id,
            None => {
                tx.execute(
                    "INSERT INTO sound_files (unique_name, file_path, display_name, byte_size, duration_ms, introduced_by, reference_count, is_public)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, 0)",
                    params![unique_name, file_path, display_name, byte_size, duration_ms, identity],
                )?;
                tx.last_insert_rowid()
            }
        };

        if tx
            .query_row(
                "SELECT 1 FROM user_sounds WHERE identity = ?1 AND alias = ?2",
                params![identity, alias],
                |r| r.get::<_, i64>(0),
            )
            .optional()?
            .is_some()
        {
            return Err(CoreError::AlreadyExists(format!("alias {alias} already in use")));
        }

        tx.execute(
            "INSERT INTO user_sounds (identity, file_id, alias) VALUES (?1, ?2, ?3)",
            params![identity, file_id, alias],
        )?;
        tx.execute("UPDATE sound_files SET reference_count = reference_count + 1 WHERE id = ?1", params![file_id])?;
        tx.commit()?;
        Ok(())
    }

    pub fn list_bindings(&self, identity: &str) -> CoreResult<Vec<BindingRow>> {
        if let Catalog::Filesystem(fs) = self {
            return Ok(fs.list(identity).into_iter().map(|b| fs_binding_row(fs, b)).collect());
        }
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT u.alias, f.file_path, f.byte_size, f.unique_name
             FROM user_sounds u JOIN sound_files f ON f.id = u.file_id
             WHERE u.identity = ?1 ORDER BY u.id",
        )?;
        let rows = stmt
            .query_map(params![identity], |row| {
                Ok(BindingRow {
                    alias: row.get(0)?,
                    file_path: row.get(1)?,
                    byte_size: row.get(2)?,
                    unique_name: row.get(3)?,
                })
            })?
            .collect::<Result<_, _>>()?;
        Ok(rows)
    }

    /// Removes a binding; if the file's reference count drops to zero and
    /// it is private, deletes the file row too and reports the on-disk
    /// path the caller should unlink (spec §3 "Lifecycles").
    pub fn delete_binding(&self, identity: &str, alias: &str) -> CoreResult<Option<String>> {
        if let Catalog::Filesystem(fs) = self {
            let binding = fs.find_by_name(identity, alias)?;
            let path = fs.asset_path(&binding).to_string_lossy().into_owned();
            fs.delete(identity, alias)?;
            return Ok(Some(path));
        }
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let (binding_id, file_id): (i64, i64) = tx
            .query_row(
                "SELECT id, file_id FROM user_sounds WHERE identity = ?1 AND alias = ?2",
                params![identity, alias],
                |r| Ok((r.get(0)?, r.get(1)?)),
            )
            .optional()?
            .ok_or_else(|| CoreError::NotFound(format!("no binding named {alias}")))?;

        tx.execute("DELETE FROM user_sounds WHERE id = ?1", params![binding_id])?;
        tx.execute("UPDATE sound_files SET reference_count = reference_count - 1 WHERE id = ?1", params![file_id])?;

        let (ref_count, is_public, file_path): (i64, bool, String) = tx.query_row(
            "SELECT reference_count, is_public, file_path FROM sound_files WHERE id = ?1",
            params![file_id],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
        )?;

        let deleted_path = if ref_count <= 0 && !is_public {
            tx.execute("DELETE FROM sound_files WHERE id = ?1", params![file_id])?;
            Some(file_path)
        } else {
            None
        };
        tx.commit()?;
        Ok(deleted_path)
    }

    pub fn rename_binding(&self, identity: &str, old_alias: &str, new_alias: &str) -> CoreResult<()> {
        if let Catalog::Filesystem(fs) = self {
            return fs.rename(identity, old_alias, new_alias);
        }
        let conn = self.conn()?;
        if conn
            .query_row(
                "SELECT 1 FROM user_sounds WHERE identity = ?1 AND alias = ?2",
                params![identity, new_alias],
                |r| r.get::<_, i64>(0),
            )
            .optional()?
            .is_some()
        {
            return Err(CoreError::AlreadyExists(format!("alias {new_alias} already in use")));
        }
        let updated = conn.execute(
            "UPDATE user_sounds SET alias = ?3 WHERE identity = ?1 AND alias = ?2",
            params![identity, old_alias, new_alias],
        )?;
        if updated == 0 {
            return Err(CoreError::NotFound(format!("no binding named {old_alias}")));
        }
        Ok(())
    }

    /// Exact match first, then prefix match ordered by shortest result
    /// name (spec §4.D "name-by-fuzzy-search variant").
    pub fn find_binding_by_name(&self, identity: &str, name: &str) -> CoreResult<BindingRow> {
        if let Catalog::Filesystem(fs) = self {
            return Ok(fs_binding_row(fs, fs.find_by_name(identity, name)?));
        }
        let conn = self.conn()?;
        find_fuzzy(
            &conn,
            "SELECT u.alias, f.file_path, f.byte_size, f.unique_name
             FROM user_sounds u JOIN sound_files f ON f.id = u.file_id
             WHERE u.identity = ?1",
            identity,
            name,
        )
    }

    pub fn find_public_by_name(&self, name: &str) -> CoreResult<BindingRow> {
        let conn = self.conn()?;
        find_fuzzy(
            &conn,
            "SELECT f.display_name, f.file_path, f.byte_size, f.unique_name
             FROM sound_files f WHERE f.is_public = 1",
            "",
            name,
        )
    }

    pub fn list_public(&self) -> CoreResult<Vec<BindingRow>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare("SELECT display_name, file_path, byte_size, unique_name FROM sound_files WHERE is_public = 1")?;
        let rows = stmt
            .query_map([], |row| {
                Ok(BindingRow {
                    alias: row.get(0)?,
                    file_path: row.get(1)?,
                    byte_size: row.get(2)?,
                    unique_name: row.get(3)?,
                })
            })?
            .collect::<Result<_, _>>()?;
        Ok(rows)
    }

    /// Direct id lookup, used by `play-by-id` (spec §6 opcode 0x2f) which
    /// carries a binding id rather than a name.
    pub fn find_binding_by_id(&self, identity: &str, id: u32) -> CoreResult<BindingRow> {
        self.conn()?
            .query_row(
                "SELECT u.alias, f.file_path, f.byte_size, f.unique_name
                 FROM user_sounds u JOIN sound_files f ON f.id = u.file_id
                 WHERE u.identity = ?1 AND u.id = ?2",
                params![identity, id],
                row_to_binding,
            )
            .optional()?
            .ok_or_else(|| CoreError::NotFound(format!("no binding with id {id}")))
    }

    pub fn set_visibility(&self, identity: &str, alias: &str, visibility: &str) -> CoreResult<()> {
        let conn = self.conn()?;
        let file_id: i64 = conn.query_row(
            "SELECT file_id FROM user_sounds WHERE identity = ?1 AND alias = ?2",
            params![identity, alias],
            |r| r.get(0),
        )?;
        conn.execute("UPDATE user_sounds SET visibility = ?1 WHERE identity = ?2 AND alias = ?3", params![visibility, identity, alias])?;
        conn.execute(
            "UPDATE sound_files SET is_public = ?1 WHERE id = ?2",
            params![visibility == "public", file_id],
        )?;
        Ok(())
    }
}

fn find_fuzzy(conn: &Connection, select: &str, identity: &str, name: &str) -> CoreResult<BindingRow> {
    // exact match first
    let exact_sql = if identity.is_empty() {
        format!("{select} AND f.display_name = ?1")
    } else {
        format!("{select} AND u.alias = ?2")
    };
    let row = if identity.is_empty() {
        conn.query_row(&exact_sql, params![name], row_to_binding).optional()?
    } else {
        conn.query_row(&exact_sql, params![identity, name], row_to_binding).optional()?
    };
    if let Some(row) = row {
        return Ok(row);
    }

    let prefix = format!("{name}%");
    let prefix_sql = if identity.is_empty() {
        format!("{select} AND f.display_name LIKE ?1 ORDER BY length(f.display_name) ASC LIMIT 1")
    } else {
        format!("{select} AND u.alias LIKE ?2 ORDER BY length(u.alias) ASC LIMIT 1")
    };
    let row = if identity.is_empty() {
        conn.query_row(&prefix_sql, params![prefix], row_to_binding).optional()?
    } else {
        conn.query_row(&prefix_sql, params![identity, prefix], row_to_binding).optional()?
    };
    row.ok_or_else(|| CoreError::NotFound(format!("no asset matching {name}")))
}

fn fs_binding_row(fs: &FilesystemCatalog, binding: FsBinding) -> BindingRow {
    let file_path = fs.asset_path(&binding).to_string_lossy().into_owned();
    BindingRow { alias: binding.alias, file_path, byte_size: binding.byte_size as i64, unique_name: binding.unique_name }
}

fn row_to_binding(row: &rusqlite::Row) -> rusqlite::Result<BindingRow> {
    Ok(BindingRow {
        alias: row.get(0)?,
        file_path: row.get(1)?,
        byte_size: row.get(2)?,
        unique_name: row.get(3)?,
    })
}

