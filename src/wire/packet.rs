use super::opcode::RequestOp;
use crate::error::CoreError;

/// The op+slot envelope every inbound datagram shares (spec §4.A). `slot` is
/// present on every packet of every direction for this subsystem but, per
/// spec §4.C, is never trusted as an identity on its own — it only selects
/// which session's cache entry a handler consults.
pub struct Envelope<'a> {
    pub op: RequestOp,
    pub slot: u32,
    pub body: &'a [u8],
}

/// Splits a raw datagram into its envelope, or `None` when the opcode is
/// outside this core's two ranges (shared demux, spec §4.B) — never an
/// error, just not ours to handle.
pub fn split(datagram: &[u8]) -> Result<Option<Envelope<'_>>, CoreError> {
    if datagram.len() < 5 {
        return Err(CoreError::MalformedPacket("datagram shorter than op+slot header".into()));
    }
    let Some(op) = RequestOp::from_byte(datagram[0]) else {
        return Ok(None);
    };
    let slot = u32::from_be_bytes([datagram[1], datagram[2], datagram[3], datagram[4]]);
    Ok(Some(Envelope { op, slot, body: &datagram[5..] }))
}

/// Prefixes an encoded response body with its opcode and slot, ready to
/// hand to the transport.
pub fn frame(op_byte: u8, slot: u32, body: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(5 + body.len());
    out.push(op_byte);
    out.extend_from_slice(&slot.to_be_bytes());
    out.extend_from_slice(body);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_opcode_is_none_not_error() {
        let datagram = [0x99, 0, 0, 0, 1, 0xAA];
        assert!(split(&datagram).unwrap().is_none());
    }

    #[test]
    fn short_datagram_is_malformed() {
        let datagram = [0x10, 0, 0, 0];
        assert!(split(&datagram).is_err());
    }

    #[test]
    fn known_opcode_splits_slot_and_body() {
        let datagram = [0x11, 0, 0, 0, 3, 1, 2, 3];
        let env = split(&datagram).unwrap().unwrap();
        assert_eq!(env.slot, 3);
        assert_eq!(env.body, &[1, 2, 3]);
    }
}
