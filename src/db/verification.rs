//! Verification-code issue/verify/consume (spec §3 "Verification code"):
//! at most one live code per identity, 10 minute expiry.

use rand::Rng;
use rusqlite::{OptionalExtension, params};

use super::{unix_now, Catalog};
use crate::error::{CoreError, CoreResult};

const CODE_TTL_SECS: i64 = 600;

impl Catalog {
    pub fn issue_verification_code(&self, identity: &str, display_name: &str) -> CoreResult<String> {
        let code: String = {
            let mut rng = rand::rng();
            (0..6).map(|_| char::from(b'0' + rng.random_range(0..10))).collect()
        };
        let now = unix_now();
        let conn = self.conn()?;
        conn.execute("DELETE FROM verification_codes WHERE identity = ?1 AND used = 0", params![identity])?;
        conn.execute(
            "INSERT INTO verification_codes (identity, code, display_name, created_at, expires_at, used)
             VALUES (?1, ?2, ?3, ?4, ?5, 0)",
            params![identity, code, display_name, now, now + CODE_TTL_SECS],
        )?;
        Ok(code)
    }

    pub fn consume_verification_code(&self, identity: &str, code: &str) -> CoreResult<()> {
        let conn = self.conn()?;
        let row: Option<(i64, i64)> = conn
            .query_row(
                "SELECT id, expires_at FROM verification_codes WHERE identity = ?1 AND code = ?2 AND used = 0",
                params![identity, code],
                |r| Ok((r.get(0)?, r.get(1)?)),
            )
            .optional()?;
        let (id, expires_at) = row.ok_or_else(|| CoreError::NotFound("no such verification code".into()))?;
        if unix_now() > expires_at {
            return Err(CoreError::ValidationError("verification code expired".into()));
        }
        conn.execute("UPDATE verification_codes SET used = 1 WHERE id = ?1", params![id])?;
        Ok(())
    }
}
