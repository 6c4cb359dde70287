//! The single in-flight playback context (spec §3 "Playback context", §4.E
//! pacing and single-stream invariant).

use std::path::Path;
use std::time::Instant;

use tracing::{info, warn};

use super::opus::{FRAME_SAMPLES, OpusEncoder};
use super::{decode, resample};
use crate::broadcast::Channel;
use crate::error::CoreResult;

const MAX_DURATION_SECS: usize = 30;
const MAX_SAMPLES: usize = MAX_DURATION_SECS * resample::TARGET_HZ as usize;
const FRAME_PERIOD: std::time::Duration = std::time::Duration::from_millis(20);

pub enum PipelineState {
    Idle,
    Playing(Stream),
}

pub struct Stream {
    pub initiator_slot: u32,
    pub source_identity: String,
    pub channel: Channel,
    pcm: Vec<i16>,
    cursor: usize,
    encoder: OpusEncoder,
    sequence: u32,
    anchor: Instant,
}

/// One frame ready to hand to the broadcast fabric.
pub struct EncodedFrame {
    pub sequence: u32,
    pub opus: Vec<u8>,
}

pub struct Pipeline {
    state: PipelineState,
}

impl Default for Pipeline {
    fn default() -> Self {
        Pipeline { state: PipelineState::Idle }
    }
}

impl Pipeline {
    pub fn new() -> Pipeline {
        Pipeline::default()
    }

    pub fn is_playing(&self) -> bool {
        matches!(self.state, PipelineState::Playing(_))
    }

    /// Decodes, resamples and truncates an asset, then installs it as the
    /// active stream — interrupting whatever was playing first (spec §4.E
    /// single-stream invariant).
    pub fn play(
        &mut self,
        path: &Path,
        initiator_slot: u32,
        source_identity: String,
        channel: Channel,
    ) -> CoreResult<()> {
        self.interrupt();
        let decoded = decode::decode_asset(path)?;
        let mut pcm = resample::to_48k(&decoded.samples, decoded.sample_rate)?;
        if pcm.len() > MAX_SAMPLES {
            pcm.truncate(MAX_SAMPLES);
        }
        let encoder = OpusEncoder::new()?;
        self.state = PipelineState::Playing(Stream {
            initiator_slot,
            source_identity,
            channel,
            pcm,
            cursor: 0,
            encoder,
            sequence: 0,
            anchor: Instant::now(),
        });
        info!(slot = initiator_slot, "stream installed");
        Ok(())
    }

    /// Stops whatever is active and releases its resources (spec §4.E:
    /// "the previous stream is stopped and its resources released before
    /// the new one is installed").
    pub fn interrupt(&mut self) {
        if matches!(self.state, PipelineState::Playing(_)) {
            self.state = PipelineState::Idle;
        }
    }

    /// Called once per 20ms tick. Produces the next due frame if the
    /// stream has one pending, zero-padding the tail, and returns to idle
    /// once the cursor reaches the end of the decoded buffer.
    pub fn tick(&mut self) -> Option<EncodedFrame> {
        let PipelineState::Playing(stream) = &mut self.state else { return None };
        if stream.cursor >= stream.pcm.len() {
            self.state = PipelineState::Idle;
            return None;
        }

        let due_frames = (stream.anchor.elapsed().as_millis() / FRAME_PERIOD.as_millis()) as u32;
        if due_frames <= stream.sequence {
            return None;
        }

        let mut frame = [0i16; FRAME_SAMPLES];
        let remaining = stream.pcm.len() - stream.cursor;
        let take = remaining.min(FRAME_SAMPLES);
        frame[..take].copy_from_slice(&stream.pcm[stream.cursor..stream.cursor + take]);
        stream.cursor += take;

        let opus = match stream.encoder.encode_frame(&frame) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(error = %e, "opus encode failed, stopping stream");
                self.state = PipelineState::Idle;
                return None;
            }
        };
        let PipelineState::Playing(stream) = &mut self.state else { unreachable!() };
        let sequence = stream.sequence;
        stream.sequence += 1;
        if stream.cursor >= stream.pcm.len() {
            self.state = PipelineState::Idle;
        }
        Some(EncodedFrame { sequence, opus })
    }

    pub fn active_stream(&self) -> Option<(u32, &str, Channel)> {
        match &self.state {
            PipelineState::Playing(s) => Some((s.initiator_slot, s.source_identity.as_str(), s.channel)),
            PipelineState::Idle => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thirty_one_second_asset_truncates_to_thirty() {
        let samples = vec![0i16; 31 * resample::TARGET_HZ as usize];
        assert!(samples.len() > MAX_SAMPLES);
        let mut truncated = samples;
        truncated.truncate(MAX_SAMPLES);
        assert_eq!(truncated.len(), MAX_SAMPLES);
    }

    #[test]
    fn idle_pipeline_produces_no_frame() {
        let mut p = Pipeline::new();
        assert!(p.tick().is_none());
    }
}
