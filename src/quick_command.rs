//! Quick-command dispatch, the five-step algorithm of spec §4.I. Pure
//! orchestration glue between `db::quick_commands` and the audio pipeline;
//! kept separate from `dispatch` because it is reused from both the
//! `quick-lookup` opcode and, per spec, any chat message the game server
//! forwards.

use crate::db::Catalog;
use crate::error::CoreResult;

pub enum QuickOutcome {
    NotQuickCommand,
    Found { file_path: String, chat_text: String },
    NotFound,
}

pub fn dispatch(catalog: &Catalog, identity: &str, message: &str) -> CoreResult<QuickOutcome> {
    let prefix = catalog.quick_prefix(identity)?;
    let Some(candidate) = message.strip_prefix(prefix.as_str()) else {
        return Ok(QuickOutcome::NotQuickCommand);
    };
    match catalog.quick_lookup(identity, candidate)? {
        Some(m) => Ok(QuickOutcome::Found { file_path: m.file_path, chat_text: m.chat_text }),
        None => Ok(QuickOutcome::NotFound),
    }
}
