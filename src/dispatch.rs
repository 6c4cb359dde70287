//! Command dispatcher (spec §4.J): one handler per opcode, orchestrating
//! the identity cache, database, audio pipeline, broadcast fabric and
//! policy buckets. Every branch returns a `Response`; no branch is ever
//! silently dropped (spec §4.J "Failure semantics").

use std::net::SocketAddr;
use std::path::PathBuf;

use tracing::instrument;
use uuid::Uuid;

use crate::broadcast::{Channel, Fabric};
use crate::db::Catalog;
use crate::download::{self, DownloadRequest, DownloadWorkers};
use crate::error::{CoreError, CoreResult};
use crate::identity::IdentityCache;
use crate::menu::{MenuPage, MenuScope, MenuTarget};
use crate::policy::{AddCooldown, PendingShareCache, PendingShareEntry, PlayBurst};
use crate::quick_command;
use crate::wire::{Request, Response};

pub struct State {
    pub catalog: Catalog,
    pub identities: IdentityCache,
    pub pipeline: crate::audio::Pipeline,
    pub fabric: Fabric,
    pub add_cooldown: AddCooldown,
    pub play_burst: PlayBurst,
    pub pending_shares: PendingShareCache,
    pub downloads: DownloadWorkers,
    pub asset_dir: PathBuf,
}

impl State {
    fn channel_for(&self, identity_slot: u32) -> Channel {
        self.identities
            .entry(identity_slot)
            .and_then(|e| e.team)
            .map(Channel::Team)
            .unwrap_or(Channel::Global)
    }

    fn play_path(&mut self, slot: u32, identity: String, path: PathBuf) -> CoreResult<()> {
        self.play_burst.check_and_record(&identity)?;
        let channel = self.channel_for(slot);
        self.pipeline.play(&path, slot, identity, channel)
    }
}

#[instrument(skip(state, req))]
pub async fn handle(state: &mut State, slot: u32, addr: SocketAddr, req: Request) -> Response {
    match try_handle(state, slot, addr, req).await {
        Ok(resp) => resp,
        Err(err) => Response::Error(err),
    }
}

async fn try_handle(state: &mut State, slot: u32, addr: SocketAddr, req: Request) -> CoreResult<Response> {
    // Per spec §4.C: Register is the one opcode allowed before a session
    // exists; everything else resolves identity from the cache, never
    // from the payload.
    if let Request::Register { identity, display_name } = req {
        state.identities.register(slot, identity.clone(), addr);
        let code = state.catalog.issue_verification_code(&identity, &display_name)?;
        return Ok(Response::RegisterCode(code));
    }

    // Team-channel membership is reported by the external game server against
    // a slot, not claimed by a player payload, so it bypasses the identity
    // gate the same way Register does (spec §4.C/§4.F).
    if let Request::TeamUpdate { team } = req {
        state.identities.update_team(slot, team);
        return Ok(Response::Success("Team updated".into()));
    }

    let identity = state.identities.lookup(slot).ok_or(CoreError::NotAuthenticated)?.to_string();

    match req {
        Request::SoundAdd { url, name, .. } => {
            state.add_cooldown.check_and_record(&identity)?;
            download::validate_url(&url).map_err(CoreError::ValidationError)?;
            let name = validate_name(&name)?;
            let unique_name = format!("{}.bin", Uuid::new_v4());
            let dest = state.asset_dir.join(&unique_name);
            state.downloads.spawn(DownloadRequest { queue_slot: slot, identity, url, name, dest });
            Ok(Response::Progress("Download queued".into()))
        }
        Request::SoundPlay { name, .. } => {
            let binding = state.catalog.find_binding_by_name(&identity, &name)?;
            state.play_path(slot, identity, PathBuf::from(binding.file_path))?;
            Ok(Response::Success(format!("Playing {name}")))
        }
        Request::PlayById { id, .. } => {
            let binding = state.catalog.find_binding_by_id(&identity, id)?;
            state.play_path(slot, identity, PathBuf::from(binding.file_path))?;
            Ok(Response::Success("Playing".into()))
        }
        Request::SoundList { .. } => {
            let bindings = state.catalog.list_bindings(&identity)?;
            Ok(Response::List(bindings.into_iter().map(|b| b.alias).collect()))
        }
        Request::SoundDelete { name, .. } => {
            let deleted_path = state.catalog.delete_binding(&identity, &name)?;
            if let Some(path) = deleted_path {
                let _ = std::fs::remove_file(path);
            }
            Ok(Response::Success(format!("Deleted {name}")))
        }
        Request::SoundRename { old_name, new_name, .. } => {
            let new_name = validate_name(&new_name)?;
            state.catalog.rename_binding(&identity, &old_name, &new_name)?;
            Ok(Response::Success(format!("Renamed to {new_name}")))
        }
        Request::SoundStop { .. } => {
            state.pipeline.interrupt();
            Ok(Response::Success("Stopped".into()))
        }
        Request::SoundShare { name, target_identity, alias, .. } => {
            state.catalog.create_share(&identity, &target_identity, &name, &alias)?;
            Ok(Response::Success(format!("Shared {name}")))
        }
        Request::Pending { .. } => {
            let shares = state.catalog.list_pending_shares(&identity)?;
            let listing = shares
                .iter()
                .enumerate()
                .map(|(i, s)| format!("#{}: '{}' from {}", i + 1, s.suggested_alias, s.source_identity))
                .collect();
            state.pending_shares.store(
                slot,
                shares.iter().map(|s| PendingShareEntry { share_id: s.id, cached_at: std::time::Instant::now() }).collect(),
            );
            Ok(Response::List(listing))
        }
        Request::SoundAccept { ordinal, alias, .. } => {
            let share_id = state.pending_shares.lookup(slot, ordinal).ok_or_else(|| {
                CoreError::NotFound(format!("no pending share at position {ordinal}"))
            })?;
            state.catalog.accept_share(share_id, &identity, &alias)?;
            Ok(Response::Success(format!("Accepted, saved as {alias}")))
        }
        Request::SoundReject { ordinal, .. } => {
            let share_id = state
                .pending_shares
                .lookup(slot, ordinal)
                .ok_or_else(|| CoreError::NotFound(format!("no pending share at position {ordinal}")))?;
            state.catalog.reject_share(share_id, &identity)?;
            Ok(Response::Success("Rejected".into()))
        }
        Request::SetVisibility { name, visibility, .. } => {
            let visibility = match visibility {
                0 => "private",
                1 => "shared",
                2 => "public",
                other => return Err(CoreError::ValidationError(format!("unknown visibility {other}"))),
            };
            state.catalog.set_visibility(&identity, &name, visibility)?;
            Ok(Response::Success("Visibility updated".into()))
        }
        Request::PublicList { .. } => {
            let files = state.catalog.list_public()?;
            Ok(Response::List(files.into_iter().map(|f| f.alias).collect()))
        }
        Request::PublicAdd { name, .. } => {
            let binding = state.catalog.find_public_by_name(&name)?;
            state.catalog.add_binding(
                &identity,
                &binding.unique_name,
                &binding.file_path,
                &name,
                binding.byte_size,
                0,
                &name,
            )?;
            Ok(Response::Success(format!("Added {name} from the public library")))
        }
        Request::PlaylistCreate { name, .. } => {
            state.catalog.create_playlist(&identity, &name)?;
            Ok(Response::Success(format!("Created playlist {name}")))
        }
        Request::PlaylistDelete { name, .. } => {
            state.catalog.delete_playlist(&identity, &name)?;
            Ok(Response::Success(format!("Deleted playlist {name}")))
        }
        Request::PlaylistList { .. } => Ok(Response::List(state.catalog.list_playlists(&identity)?)),
        Request::PlaylistAdd { playlist, binding_name, .. } => {
            state.catalog.add_playlist_item(&identity, &playlist, &binding_name)?;
            Ok(Response::Success(format!("Added {binding_name} to {playlist}")))
        }
        Request::PlaylistRemove { playlist, order_number, .. } => {
            state.catalog.remove_playlist_item(&identity, &playlist, order_number)?;
            Ok(Response::Success("Removed".into()))
        }
        Request::PlaylistReorder { playlist, order_number, new_order, .. } => {
            state.catalog.reorder_playlist_item(&identity, &playlist, order_number, new_order)?;
            Ok(Response::Success("Reordered".into()))
        }
        Request::PlaylistPlay { playlist, position, .. } => {
            let path = state.catalog.resolve_playback_position(&identity, &playlist, position)?;
            state.play_path(slot, identity, PathBuf::from(path))?;
            Ok(Response::Success("Playing playlist item".into()))
        }
        Request::PlaylistSetVisibility { playlist, visibility, .. } => {
            state.catalog.set_playlist_visibility(&identity, &playlist, visibility != 0)?;
            Ok(Response::Success("Playlist visibility updated".into()))
        }
        Request::PlaylistPublicList { .. } => Ok(Response::List(state.catalog.list_public_playlists()?)),
        Request::PlaylistPublicShow { playlist, .. } => {
            Ok(Response::List(state.catalog.public_playlist_items(&playlist)?))
        }
        Request::CategoriesAlias { category, alias, .. } => {
            state.catalog.set_quick_prefix(&identity, &alias).map_err(|_| {
                CoreError::ValidationError(format!("invalid category alias for {category}"))
            })?;
            Ok(Response::Success("Alias set".into()))
        }
        Request::MenuGet { scope, page_offset, .. } => {
            let page = state.catalog.menu_root_page(&identity, scope, page_offset)?;
            Ok(Response::MenuData(page))
        }
        Request::MenuPlay { item_position, .. } => {
            let page = state.catalog.menu_root_page(&identity, MenuScope::Personal, 0)?;
            play_menu_item(state, slot, &identity, &page, item_position).await
        }
        Request::MenuNavigate { target, page_offset, .. } => {
            let page = match target {
                MenuTarget::SubMenu(id) => state.catalog.menu_sub_page(id, page_offset)?,
                MenuTarget::PlaylistExpansion(id) => state.catalog.menu_playlist_page(id as i32, page_offset)?,
            };
            Ok(Response::MenuData(page))
        }
        Request::QuickLookup { slot: chat_slot, message, .. } => {
            match quick_command::dispatch(&state.catalog, &identity, &message)? {
                quick_command::QuickOutcome::NotQuickCommand | quick_command::QuickOutcome::NotFound => {
                    Ok(Response::QuickNotFound { slot: chat_slot })
                }
                quick_command::QuickOutcome::Found { file_path, chat_text } => {
                    state.play_path(slot, identity, PathBuf::from(file_path))?;
                    Ok(Response::QuickFound { slot: chat_slot, chat_text })
                }
            }
        }
        Request::Register { .. } => unreachable!("handled above"),
        Request::TeamUpdate { .. } => unreachable!("handled above"),
    }
}

async fn play_menu_item(
    state: &mut State,
    slot: u32,
    identity: &str,
    page: &MenuPage,
    position: u8,
) -> CoreResult<Response> {
    use crate::menu::MenuItemData;
    let item = page
        .items
        .iter()
        .find(|i| i.position == position)
        .ok_or_else(|| CoreError::NotFound(format!("no menu item at position {position}")))?;
    match &item.data {
        MenuItemData::Alias(alias) => {
            let binding = state.catalog.find_binding_by_name(identity, alias)?;
            state.play_path(slot, identity.to_string(), PathBuf::from(binding.file_path))?;
            Ok(Response::Success(format!("Playing {alias}")))
        }
        MenuItemData::Target(_) => Err(CoreError::ValidationError("menu item is a sub-menu, not a sound".into())),
    }
}

/// Name validation per spec §7: ASCII alphanumeric plus underscore,
/// lowercased.
fn validate_name(name: &str) -> CoreResult<String> {
    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(CoreError::ValidationError(format!("invalid name: {name}")));
    }
    Ok(name.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr, SocketAddr};

    use super::*;

    #[test]
    fn validate_name_lowercases_and_rejects_punctuation() {
        assert_eq!(validate_name("Laugh_1").unwrap(), "laugh_1");
        assert!(validate_name("bad name!").is_err());
    }

    fn test_state() -> (State, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let catalog = Catalog::connect(None, dir.path().to_path_buf()).unwrap();
        let state = State {
            catalog,
            identities: IdentityCache::new(std::time::Duration::from_secs(300)),
            pipeline: crate::audio::Pipeline::new(),
            fabric: Fabric::new(),
            add_cooldown: AddCooldown::default(),
            play_burst: PlayBurst::default(),
            pending_shares: PendingShareCache::default(),
            downloads: DownloadWorkers::new(),
            asset_dir: dir.path().to_path_buf(),
        };
        (state, dir)
    }

    fn addr() -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 9001)
    }

    /// Comment (e): a wired `TeamUpdate` opcode is the only way
    /// `channel_for` ever returns anything but `Channel::Global`.
    #[tokio::test]
    async fn team_update_bypasses_the_identity_gate_and_sets_the_channel() {
        let (mut state, _dir) = test_state();
        state.identities.register(3, "player-1".into(), addr());
        assert_eq!(state.channel_for(3), Channel::Global);

        let resp = try_handle(&mut state, 3, addr(), Request::TeamUpdate { team: 5 }).await.unwrap();
        assert!(matches!(resp, Response::Success(_)));
        assert_eq!(state.channel_for(3), Channel::Team(5));
    }
}
