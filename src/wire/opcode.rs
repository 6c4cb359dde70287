//! Opcode table, spec §6. Two ranges share the datagram socket with other
//! subsystems (admin commands, etc): 0x10-0x3F and 0x50-0x52. Anything
//! outside those, or a byte inside them we don't recognize, is `Unknown`
//! and is silently ignored by the demultiplexer (spec §4.A/§4.B).

/// Client → server command codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestOp {
    SoundAdd,
    SoundPlay,
    SoundList,
    SoundDelete,
    SoundRename,
    SoundShare,
    SoundAccept,
    SoundReject,
    SoundStop,
    PlaylistCreate,
    PlaylistDelete,
    PlaylistList,
    PlaylistAdd,
    PlaylistRemove,
    PlaylistReorder,
    PlaylistPlay,
    CategoriesAlias,
    SetVisibility,
    PublicList,
    PublicAdd,
    Pending,
    PlaylistPublicList,
    PlaylistSetVisibility,
    PlaylistPublicShow,
    Register,
    TeamUpdate,
    MenuGet,
    MenuPlay,
    MenuData,
    MenuNavigate,
    PlayById,
    QuickLookup,
}

impl RequestOp {
    pub const fn byte(self) -> u8 {
        use RequestOp::*;
        match self {
            SoundAdd => 0x10,
            SoundPlay => 0x11,
            SoundList => 0x12,
            SoundDelete => 0x13,
            SoundRename => 0x14,
            SoundShare => 0x15,
            SoundAccept => 0x16,
            SoundReject => 0x17,
            SoundStop => 0x18,
            PlaylistCreate => 0x19,
            PlaylistDelete => 0x1A,
            PlaylistList => 0x1B,
            PlaylistAdd => 0x1C,
            PlaylistRemove => 0x1D,
            PlaylistReorder => 0x1E,
            PlaylistPlay => 0x1F,
            CategoriesAlias => 0x20,
            SetVisibility => 0x21,
            PublicList => 0x22,
            PublicAdd => 0x23,
            Pending => 0x24,
            PlaylistPublicList => 0x25,
            PlaylistSetVisibility => 0x26,
            PlaylistPublicShow => 0x27,
            Register => 0x30,
            TeamUpdate => 0x31,
            MenuGet => 0x32,
            MenuPlay => 0x33,
            MenuData => 0x34,
            MenuNavigate => 0x35,
            PlayById => 0x36,
            QuickLookup => 0x50,
        }
    }

    pub fn from_byte(b: u8) -> Option<Self> {
        use RequestOp::*;
        Some(match b {
            0x10 => SoundAdd,
            0x11 => SoundPlay,
            0x12 => SoundList,
            0x13 => SoundDelete,
            0x14 => SoundRename,
            0x15 => SoundShare,
            0x16 => SoundAccept,
            0x17 => SoundReject,
            0x18 => SoundStop,
            0x19 => PlaylistCreate,
            0x1A => PlaylistDelete,
            0x1B => PlaylistList,
            0x1C => PlaylistAdd,
            0x1D => PlaylistRemove,
            0x1E => PlaylistReorder,
            0x1F => PlaylistPlay,
            0x20 => CategoriesAlias,
            0x21 => SetVisibility,
            0x22 => PublicList,
            0x23 => PublicAdd,
            0x24 => Pending,
            0x25 => PlaylistPublicList,
            0x26 => PlaylistSetVisibility,
            0x27 => PlaylistPublicShow,
            0x30 => Register,
            0x31 => TeamUpdate,
            0x32 => MenuGet,
            0x33 => MenuPlay,
            0x34 => MenuData,
            0x35 => MenuNavigate,
            0x36 => PlayById,
            0x50 => QuickLookup,
            _ => return None,
        })
    }
}

/// Server → client response codes, plus the outbound-only audio relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponseOp {
    Success,
    Error,
    List,
    ShareRequest,
    Progress,
    RegisterCode,
    MenuData,
    QuickFound,
    QuickNotFound,
    AudioRelay,
}

impl ResponseOp {
    pub const fn byte(self) -> u8 {
        use ResponseOp::*;
        match self {
            Success => 0x20,
            Error => 0x21,
            List => 0x22,
            ShareRequest => 0x23,
            Progress => 0x24,
            RegisterCode => 0x31,
            MenuData => 0x34,
            QuickFound => 0x51,
            QuickNotFound => 0x52,
            // shares the voice range; not one of this core's own request codes.
            AudioRelay => 0x40,
        }
    }
}
