//! Quick-command prefix/alias storage and lookup (spec §4.I, §3).

use rusqlite::{OptionalExtension, params};

use super::Catalog;
use crate::error::{CoreError, CoreResult};

const BLOCKED_PREFIXES: [&str; 3] = ["!", "/", "\\"];
const DEFAULT_PREFIX: &str = "@";

pub struct QuickMatch {
    pub file_path: String,
    pub chat_text: String,
}

impl Catalog {
    pub fn quick_prefix(&self, identity: &str) -> CoreResult<String> {
        Ok(self
            .conn()?
            .query_row("SELECT quick_prefix FROM player_settings WHERE identity = ?1", params![identity], |r| r.get(0))
            .optional()?
            .unwrap_or_else(|| DEFAULT_PREFIX.to_string()))
    }

    /// Rejects blocked sentinels at the point a prefix is stored (spec
    /// §4.I's closing sentence).
    pub fn set_quick_prefix(&self, identity: &str, prefix: &str) -> CoreResult<()> {
        validate_prefix(prefix)?;
        self.conn()?.execute(
            "INSERT INTO player_settings (identity, quick_prefix) VALUES (?1, ?2)
             ON CONFLICT(identity) DO UPDATE SET quick_prefix = excluded.quick_prefix",
            params![identity, prefix],
        )?;
        Ok(())
    }

    pub fn set_quick_command(&self, identity: &str, short_alias: &str, binding_alias: &str, chat_text: Option<&str>) -> CoreResult<()> {
        let binding_id: i64 = self
            .conn()?
            .query_row(
                "SELECT id FROM user_sounds WHERE identity = ?1 AND alias = ?2",
                params![identity, binding_alias],
                |r| r.get(0),
            )
            .optional()?
            .ok_or_else(|| CoreError::NotFound(format!("no binding named {binding_alias}")))?;
        self.conn()?.execute(
            "INSERT INTO quick_command_aliases (identity, short_alias, binding_id, chat_text) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(identity, short_alias) DO UPDATE SET binding_id = excluded.binding_id, chat_text = excluded.chat_text",
            params![identity, short_alias, binding_id, chat_text],
        )?;
        Ok(())
    }

    /// Steps 3-4 of spec §4.I: exact alias match against the identity's
    /// own bindings, then public-asset fuzzy search.
    pub fn quick_lookup(&self, identity: &str, alias: &str) -> CoreResult<Option<QuickMatch>> {
        let conn = self.conn()?;
        let own: Option<(String, Option<String>)> = conn
            .query_row(
                "SELECT f.file_path, q.chat_text
                 FROM quick_command_aliases q
                 JOIN user_sounds u ON u.id = q.binding_id
                 JOIN sound_files f ON f.id = u.file_id
                 WHERE q.identity = ?1 AND LOWER(q.short_alias) = LOWER(?2)",
                params![identity, alias],
                |r| Ok((r.get(0)?, r.get(1)?)),
            )
            .optional()?;
        if let Some((file_path, chat_text)) = own {
            return Ok(Some(QuickMatch { file_path, chat_text: chat_text.unwrap_or_default() }));
        }

        match self.find_public_by_name(alias) {
            Ok(binding) => Ok(Some(QuickMatch { file_path: binding.file_path, chat_text: String::new() })),
            Err(CoreError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

fn validate_prefix(prefix: &str) -> CoreResult<()> {
    if prefix.is_empty() || prefix.chars().count() > 4 {
        return Err(CoreError::ValidationError("prefix must be 1-4 characters".into()));
    }
    if BLOCKED_PREFIXES.iter().any(|blocked| prefix.starts_with(blocked)) {
        return Err(CoreError::ValidationError(format!("prefix {prefix} starts with a blocked sentinel")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocked_prefixes_rejected() {
        assert!(validate_prefix("!admin").is_err());
        assert!(validate_prefix("/cmd").is_err());
        assert!(validate_prefix("\\x").is_err());
        assert!(validate_prefix("@").is_ok());
    }
}
