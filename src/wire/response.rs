//! Server→client response payloads and their wire encoding (spec §6).

use super::codec::Writer;
use super::opcode::ResponseOp;
use crate::error::CoreError;
use crate::menu::MenuPage;

#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    Success(String),
    Error(CoreError),
    List(Vec<String>),
    ShareRequest(String),
    Progress(String),
    RegisterCode(String),
    MenuData(MenuPage),
    QuickFound { slot: u8, chat_text: String },
    QuickNotFound { slot: u8 },
}

impl Response {
    fn op(&self) -> ResponseOp {
        match self {
            Response::Success(_) => ResponseOp::Success,
            Response::Error(_) => ResponseOp::Error,
            Response::List(_) => ResponseOp::List,
            Response::ShareRequest(_) => ResponseOp::ShareRequest,
            Response::Progress(_) => ResponseOp::Progress,
            Response::RegisterCode(_) => ResponseOp::RegisterCode,
            Response::MenuData(_) => ResponseOp::MenuData,
            Response::QuickFound { .. } => ResponseOp::QuickFound,
            Response::QuickNotFound { .. } => ResponseOp::QuickNotFound,
        }
    }

    /// Encodes the full `<op><slot><body>` frame ready for the transport.
    pub fn encode(&self, slot: u32) -> Vec<u8> {
        let mut w = Writer::new();
        match self {
            Response::Success(msg) => {
                w.bytes(msg.as_bytes());
            }
            Response::Error(err) => {
                w.bytes(err.diagnostic().as_bytes());
            }
            Response::List(items) => {
                w.u16(items.len() as u16);
                for item in items {
                    w.short_str(item);
                }
            }
            Response::ShareRequest(msg) => {
                w.bytes(msg.as_bytes());
            }
            Response::Progress(msg) => {
                w.bytes(msg.as_bytes());
            }
            Response::RegisterCode(code) => {
                w.bytes(code.as_bytes());
            }
            Response::MenuData(page) => page.encode(&mut w),
            Response::QuickFound { slot, chat_text } => {
                w.u8(*slot);
                w.short_str(chat_text);
            }
            Response::QuickNotFound { slot } => {
                w.u8(*slot);
            }
        }
        super::packet::frame(self.op().byte(), slot, &w.into_vec())
    }
}

/// Outbound-only: a relayed Opus frame, spec §4.F / §6.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioRelay {
    pub from_slot: u8,
    pub sequence: u32,
    pub channel: u8,
    pub opus: Vec<u8>,
}

impl AudioRelay {
    pub fn encode(&self) -> Vec<u8> {
        let mut w = Writer::new();
        w.u8(self.from_slot);
        w.u32(self.sequence);
        w.u8(self.channel);
        w.u16(self.opus.len() as u16);
        w.bytes(&self.opus);
        let mut out = vec![super::opcode::ResponseOp::AudioRelay.byte()];
        out.extend(w.into_vec());
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quick_found_silent_has_zero_length_chat() {
        let r = Response::QuickFound { slot: 3, chat_text: String::new() };
        let bytes = r.encode(7);
        // op(1) + envelope-slot(4) + inner-slot(1) + len(1)
        assert_eq!(bytes[5], 3);
        assert_eq!(bytes[6], 0);
    }

    #[test]
    fn audio_relay_round_trips_opus_length() {
        let relay = AudioRelay { from_slot: 3, sequence: 0, channel: 1, opus: vec![9, 9, 9] };
        let bytes = relay.encode();
        assert_eq!(bytes[0], super::super::opcode::ResponseOp::AudioRelay.byte());
        let opus_len = u16::from_be_bytes([bytes[7], bytes[8]]);
        assert_eq!(opus_len, 3);
    }
}
