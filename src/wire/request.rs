//! Typed request payloads, one variant per client→server opcode (spec §6).
//! The handful spec.md gives an exact byte layout for (add, play-by-name,
//! menu navigate, quick-lookup) are decoded exactly as documented; the
//! remainder follow the same conventions (identity block first, then
//! length-prefixed strings, then fixed-width fields) applied consistently,
//! since the source spec only calls these out as "representative".

use super::codec::Reader;
use super::opcode::RequestOp;
use crate::error::CoreError;
use crate::menu::{MenuTarget, MenuScope};

#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    SoundAdd { identity: String, url: String, name: String },
    SoundPlay { identity: String, name: String },
    SoundList { identity: String },
    SoundDelete { identity: String, name: String },
    SoundRename { identity: String, old_name: String, new_name: String },
    SoundShare { identity: String, name: String, target_identity: String, alias: String },
    SoundAccept { identity: String, ordinal: u8, alias: String },
    SoundReject { identity: String, ordinal: u8 },
    SoundStop { identity: String },
    PlaylistCreate { identity: String, name: String },
    PlaylistDelete { identity: String, name: String },
    PlaylistList { identity: String },
    PlaylistAdd { identity: String, playlist: String, binding_name: String },
    PlaylistRemove { identity: String, playlist: String, order_number: u16 },
    PlaylistReorder { identity: String, playlist: String, order_number: u16, new_order: u16 },
    PlaylistPlay { identity: String, playlist: String, position: u8 },
    CategoriesAlias { identity: String, category: String, alias: String },
    SetVisibility { identity: String, name: String, visibility: u8 },
    PublicList { identity: String },
    PublicAdd { identity: String, name: String },
    Pending { identity: String },
    PlaylistPublicList { identity: String },
    PlaylistSetVisibility { identity: String, playlist: String, visibility: u8 },
    PlaylistPublicShow { identity: String, playlist: String },
    Register { identity: String, display_name: String },
    TeamUpdate { team: u8 },
    MenuGet { identity: String, scope: MenuScope, page_offset: u16 },
    MenuPlay { identity: String, item_position: u8 },
    PlayById { identity: String, id: u32 },
    MenuNavigate { identity: String, target: MenuTarget, page_offset: u16, scope: MenuScope },
    QuickLookup { slot: u8, identity: String, message: String },
}

impl Request {
    pub fn decode(op: RequestOp, body: &[u8]) -> Result<Request, CoreError> {
        let mut r = Reader::new(body);
        let req = match op {
            RequestOp::SoundAdd => {
                let identity = r.identity()?;
                let url = r.long_str()?;
                let name = r.rest_str()?;
                Request::SoundAdd { identity, url, name }
            }
            RequestOp::SoundPlay => {
                let identity = r.identity()?;
                let name = r.rest_str()?;
                Request::SoundPlay { identity, name }
            }
            RequestOp::SoundList => Request::SoundList { identity: r.identity()? },
            RequestOp::SoundDelete => {
                let identity = r.identity()?;
                let name = r.rest_str()?;
                Request::SoundDelete { identity, name }
            }
            RequestOp::SoundRename => {
                let identity = r.identity()?;
                let old_name = r.short_str()?;
                let new_name = r.rest_str()?;
                Request::SoundRename { identity, old_name, new_name }
            }
            RequestOp::SoundShare => {
                let identity = r.identity()?;
                let name = r.short_str()?;
                let target_identity = r.identity()?;
                let alias = r.rest_str()?;
                Request::SoundShare { identity, name, target_identity, alias }
            }
            RequestOp::SoundAccept => {
                let identity = r.identity()?;
                let ordinal = r.u8()?;
                let alias = r.rest_str()?;
                Request::SoundAccept { identity, ordinal, alias }
            }
            RequestOp::SoundReject => {
                let identity = r.identity()?;
                let ordinal = r.u8()?;
                Request::SoundReject { identity, ordinal }
            }
            RequestOp::SoundStop => Request::SoundStop { identity: r.identity()? },
            RequestOp::PlaylistCreate => {
                let identity = r.identity()?;
                let name = r.rest_str()?;
                Request::PlaylistCreate { identity, name }
            }
            RequestOp::PlaylistDelete => {
                let identity = r.identity()?;
                let name = r.rest_str()?;
                Request::PlaylistDelete { identity, name }
            }
            RequestOp::PlaylistList => Request::PlaylistList { identity: r.identity()? },
            RequestOp::PlaylistAdd => {
                let identity = r.identity()?;
                let playlist = r.short_str()?;
                let binding_name = r.rest_str()?;
                Request::PlaylistAdd { identity, playlist, binding_name }
            }
            RequestOp::PlaylistRemove => {
                let identity = r.identity()?;
                let playlist = r.short_str()?;
                let order_number = r.u16()?;
                Request::PlaylistRemove { identity, playlist, order_number }
            }
            RequestOp::PlaylistReorder => {
                let identity = r.identity()?;
                let playlist = r.short_str()?;
                let order_number = r.u16()?;
                let new_order = r.u16()?;
                Request::PlaylistReorder { identity, playlist, order_number, new_order }
            }
            RequestOp::PlaylistPlay => {
                let identity = r.identity()?;
                let playlist = r.short_str()?;
                let position = r.u8()?;
                Request::PlaylistPlay { identity, playlist, position }
            }
            RequestOp::CategoriesAlias => {
                let identity = r.identity()?;
                let category = r.short_str()?;
                let alias = r.rest_str()?;
                Request::CategoriesAlias { identity, category, alias }
            }
            RequestOp::SetVisibility => {
                let identity = r.identity()?;
                let visibility = r.u8()?;
                let name = r.rest_str()?;
                Request::SetVisibility { identity, name, visibility }
            }
            RequestOp::PublicList => Request::PublicList { identity: r.identity()? },
            RequestOp::PublicAdd => {
                let identity = r.identity()?;
                let name = r.rest_str()?;
                Request::PublicAdd { identity, name }
            }
            RequestOp::Pending => Request::Pending { identity: r.identity()? },
            RequestOp::PlaylistPublicList => {
                Request::PlaylistPublicList { identity: r.identity()? }
            }
            RequestOp::PlaylistSetVisibility => {
                let identity = r.identity()?;
                let visibility = r.u8()?;
                let playlist = r.rest_str()?;
                Request::PlaylistSetVisibility { identity, playlist, visibility }
            }
            RequestOp::PlaylistPublicShow => {
                let identity = r.identity()?;
                let playlist = r.rest_str()?;
                Request::PlaylistPublicShow { identity, playlist }
            }
            RequestOp::Register => {
                let identity = r.identity()?;
                let display_name = r.rest_str()?;
                Request::Register { identity, display_name }
            }
            RequestOp::TeamUpdate => Request::TeamUpdate { team: r.u8()? },
            RequestOp::MenuGet => {
                let identity = r.identity()?;
                let scope = MenuScope::from_byte(r.u8()?)?;
                let page_offset = r.u16()?;
                Request::MenuGet { identity, scope, page_offset }
            }
            RequestOp::MenuPlay => {
                let identity = r.identity()?;
                let item_position = r.u8()?;
                Request::MenuPlay { identity, item_position }
            }
            RequestOp::PlayById => {
                let identity = r.identity()?;
                let id = r.u32()?;
                Request::PlayById { identity, id }
            }
            RequestOp::MenuNavigate => {
                let identity = r.identity()?;
                let menu_id = r.i32()?;
                let page_offset = r.u16()?;
                let scope = MenuScope::from_byte(r.u8()?)?;
                Request::MenuNavigate { identity, target: MenuTarget::from_wire(menu_id), page_offset, scope }
            }
            RequestOp::QuickLookup => {
                let slot = r.u8()?;
                let identity = r.identity()?;
                let message = r.short_str()?;
                Request::QuickLookup { slot, identity, message }
            }
            RequestOp::MenuData => {
                return Err(CoreError::MalformedPacket("menu-data is a response opcode".into()));
            }
        };
        if !r.eof() {
            return Err(CoreError::MalformedPacket(format!(
                "{} trailing byte(s) after decoding {op:?}",
                r.remaining()
            )));
        }
        Ok(req)
    }

    /// The identity field the payload itself carries — untrusted, per spec
    /// §4.C; handlers must resolve the real identity through the identity
    /// cache keyed by slot instead of reading this directly.
    pub fn claimed_identity(&self) -> &str {
        match self {
            Request::SoundAdd { identity, .. }
            | Request::SoundPlay { identity, .. }
            | Request::SoundList { identity }
            | Request::SoundDelete { identity, .. }
            | Request::SoundRename { identity, .. }
            | Request::SoundShare { identity, .. }
            | Request::SoundAccept { identity, .. }
            | Request::SoundReject { identity, .. }
            | Request::SoundStop { identity }
            | Request::PlaylistCreate { identity, .. }
            | Request::PlaylistDelete { identity, .. }
            | Request::PlaylistList { identity }
            | Request::PlaylistAdd { identity, .. }
            | Request::PlaylistRemove { identity, .. }
            | Request::PlaylistReorder { identity, .. }
            | Request::PlaylistPlay { identity, .. }
            | Request::CategoriesAlias { identity, .. }
            | Request::SetVisibility { identity, .. }
            | Request::PublicList { identity }
            | Request::PublicAdd { identity, .. }
            | Request::Pending { identity }
            | Request::PlaylistPublicList { identity }
            | Request::PlaylistSetVisibility { identity, .. }
            | Request::PlaylistPublicShow { identity, .. }
            | Request::Register { identity, .. }
            | Request::MenuGet { identity, .. }
            | Request::MenuPlay { identity, .. }
            | Request::PlayById { identity, .. }
            | Request::MenuNavigate { identity, .. }
            | Request::QuickLookup { identity, .. } => identity,
            Request::TeamUpdate { .. } => "",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_add() {
        let identity = "A".repeat(32);
        let mut w = super::super::codec::Writer::new();
        w.identity(&identity);
        w.long_str("https://example.com/x.mp3");
        w.bytes(b"laugh");
        let req = Request::decode(RequestOp::SoundAdd, &w.0).unwrap();
        assert_eq!(
            req,
            Request::SoundAdd {
                identity,
                url: "https://example.com/x.mp3".into(),
                name: "laugh".into(),
            }
        );
    }

    #[test]
    fn rejects_trailing_bytes() {
        let mut w = super::super::codec::Writer::new();
        w.identity("A");
        w.bytes(&[1, 2, 3]);
        w.bytes(b"extra");
        assert!(Request::decode(RequestOp::SoundStop, &w.0).is_err());
    }

    #[test]
    fn decodes_team_update() {
        let mut w = super::super::codec::Writer::new();
        w.u8(7);
        let req = Request::decode(RequestOp::TeamUpdate, &w.0).unwrap();
        assert_eq!(req, Request::TeamUpdate { team: 7 });
    }

    #[test]
    fn decodes_quick_lookup() {
        let mut w = super::super::codec::Writer::new();
        w.u8(3);
        w.identity("AAAA");
        w.short_str("@gg");
        let req = Request::decode(RequestOp::QuickLookup, &w.0).unwrap();
        assert_eq!(
            req,
            Request::QuickLookup { slot: 3, identity: "AAAA".into(), message: "@gg".into() }
        );
    }
}
