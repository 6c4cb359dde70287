//! Share lifecycle (spec §3 "Share request", §4.J "Share lifecycle"):
//! pending → accepted | rejected, with re-arming of a stale row on re-share.

use rusqlite::{OptionalExtension, params};

use super::{unix_now, Catalog};
use crate::error::{CoreError, CoreResult};

pub struct PendingShare {
    pub id: i64,
    pub file_path: String,
    pub source_identity: String,
    pub suggested_alias: String,
}

impl Catalog {
    pub fn create_share(
        &self,
        source_identity: &str,
        target_identity: &str,
        binding_alias: &str,
        suggested_alias: &str,
    ) -> CoreResult<()> {
        if source_identity == target_identity {
            return Err(CoreError::ValidationError("cannot share with yourself".into()));
        }
        let now = unix_now();
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let file_id: i64 = tx
            .query_row(
                "SELECT file_id FROM user_sounds WHERE identity = ?1 AND alias = ?2",
                params![source_identity, binding_alias],
                |r| r.get(0),
            )
            .optional()?
            .ok_or_else(|| CoreError::NotFound(format!("you do not own a binding named {binding_alias}")))?;

        let existing: Option<i64> = tx
            .query_row(
                "SELECT id FROM sound_shares WHERE file_id = ?1 AND source_identity = ?2 AND target_identity = ?3",
                params![file_id, source_identity, target_identity],
                |r| r.get(0),
            )
            .optional()?;

        match existing {
            Some(id) => {
                tx.execute(
                    "UPDATE sound_shares SET status = 'pending', suggested_alias = ?2, created_at = ?3, responded_at = NULL WHERE id = ?1",
                    params![id, suggested_alias, now],
                )?;
            }
            None => {
                tx.execute(
                    "INSERT INTO sound_shares (file_id, source_identity, target_identity, suggested_alias, status, created_at)
                     VALUES (?1, ?2, ?3, ?4, 'pending', ?5)",
                    params![file_id, source_identity, target_identity, suggested_alias, now],
                )?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    pub fn list_pending_shares(&self, target_identity: &str) -> CoreResult<Vec<PendingShare>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT s.id, f.file_path, s.source_identity, s.suggested_alias
             FROM sound_shares s JOIN sound_files f ON f.id = s.file_id
             WHERE s.target_identity = ?1 AND s.status = 'pending' ORDER BY s.created_at",
        )?;
        let rows = stmt
            .query_map(params![target_identity], |row| {
                Ok(PendingShare {
                    id: row.get(0)?,
                    file_path: row.get(1)?,
                    source_identity: row.get(2)?,
                    suggested_alias: row.get(3)?,
                })
            })?
            .collect::<Result<_, _>>()?;
        Ok(rows)
    }

    /// Atomic triplet: status update, new binding insert, refcount
    /// increment (spec §4.J).
    pub fn accept_share(&self, share_id: i64, target_identity: &str, alias: &str) -> CoreResult<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let file_id: i64 = tx
            .query_row(
                "SELECT file_id FROM sound_shares WHERE id = ?1 AND target_identity = ?2 AND status = 'pending'",
                params![share_id, target_identity],
                |r| r.get(0),
            )
            .optional()?
            .ok_or_else(|| CoreError::NotFound("share not found or already resolved".into()))?;

        tx.execute(
            "UPDATE sound_shares SET status = 'accepted', responded_at = ?2 WHERE id = ?1",
            params![share_id, unix_now()],
        )?;
        tx.execute(
            "INSERT INTO user_sounds (identity, file_id, alias) VALUES (?1, ?2, ?3)",
            params![target_identity, file_id, alias],
        )
        .map_err(|e| match e {
            rusqlite::Error::SqliteFailure(_, Some(msg)) if msg.contains("UNIQUE") => {
                CoreError::AlreadyExists(format!("alias {alias} already in use"))
            }
            other => other.into(),
        })?;
        tx.execute("UPDATE sound_files SET reference_count = reference_count + 1 WHERE id = ?1", params![file_id])?;
        tx.commit()?;
        Ok(())
    }

    pub fn reject_share(&self, share_id: i64, target_identity: &str) -> CoreResult<()> {
        let updated = self.conn()?.execute(
            "UPDATE sound_shares SET status = 'rejected', responded_at = ?3
             WHERE id = ?1 AND target_identity = ?2 AND status = 'pending'",
            params![share_id, target_identity, unix_now()],
        )?;
        if updated == 0 {
            return Err(CoreError::NotFound("share not found or already resolved".into()));
        }
        Ok(())
    }
}
