//! Opus encoder configuration (spec §4.E): 48 kHz mono, VOIP-adjacent
//! profile, 64 kbps, complexity 5, 20 ms frames. Grounded in `audiopus`'s
//! use for voice coding in `serenity`'s voice pipeline.

use audiopus::coder::Encoder;
use audiopus::{Application, Bitrate, Channels, SampleRate};

use crate::error::{CoreError, CoreResult};

pub const FRAME_SAMPLES: usize = 960; // 20ms @ 48kHz mono
pub const BITRATE_BPS: i32 = 64_000;
pub const COMPLEXITY: u8 = 5;

pub struct OpusEncoder {
    inner: Encoder,
}

impl OpusEncoder {
    /// A fresh encoder per asset — spec §4.E: "the encoder's state is
    /// reset to avoid inter-stream corruption" between plays.
    pub fn new() -> CoreResult<OpusEncoder> {
        let mut inner = Encoder::new(SampleRate::Hz48000, Channels::Mono, Application::Voip)
            .map_err(|e| CoreError::Fatal(format!("opus encoder init: {e}")))?;
        inner
            .set_bitrate(Bitrate::BitsPerSecond(BITRATE_BPS))
            .map_err(|e| CoreError::Fatal(format!("opus set_bitrate: {e}")))?;
        inner
            .set_complexity(COMPLEXITY)
            .map_err(|e| CoreError::Fatal(format!("opus set_complexity: {e}")))?;
        Ok(OpusEncoder { inner })
    }

    /// Encodes exactly one 960-sample (20ms) frame. Callers zero-pad the
    /// final, short frame before calling this (spec §4.E pacing rule).
    pub fn encode_frame(&mut self, frame: &[i16; FRAME_SAMPLES]) -> CoreResult<Vec<u8>> {
        let mut out = [0u8; 4000];
        let n = self
            .inner
            .encode(frame, &mut out)
            .map_err(|e| CoreError::Transient(format!("opus encode failed: {e}")))?;
        Ok(out[..n].to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_a_silent_frame() {
        let mut enc = OpusEncoder::new().unwrap();
        let frame = [0i16; FRAME_SAMPLES];
        let bytes = enc.encode_frame(&frame).unwrap();
        assert!(!bytes.is_empty());
    }
}
