//! Full decode of a stored asset into mono PCM (spec §4.E). Streaming
//! decode across the lifetime of playback is permitted by the spec but not
//! required; this core decodes fully on start, matching `mpdhaj::scan`'s
//! "do the expensive work once, up front" posture.

use std::path::Path;

use crate::error::{CoreError, CoreResult};

pub struct DecodedPcm {
    pub sample_rate: u32,
    /// Mono, interleaved-free samples.
    pub samples: Vec<i16>,
}

pub fn decode_asset(path: &Path) -> CoreResult<DecodedPcm> {
    match path.extension().and_then(|e| e.to_str()).map(|e| e.to_ascii_lowercase()) {
        Some(ext) if ext == "wav" => decode_wav(path),
        _ => decode_mp3(path),
    }
}

fn decode_wav(path: &Path) -> CoreResult<DecodedPcm> {
    let mut reader = hound::WavReader::open(path)
        .map_err(|e| CoreError::ValidationError(format!("not a valid WAV file: {e}")))?;
    let spec = reader.spec();
    if spec.sample_format != hound::SampleFormat::Int {
        return Err(CoreError::ValidationError("WAV must be PCM, not float".into()));
    }
    let channels = spec.channels as usize;
    let mono: Vec<i16> = match spec.bits_per_sample {
        16 => {
            let samples: Vec<i16> =
                reader.samples::<i16>().collect::<Result<_, _>>().map_err(|e| {
                    CoreError::ValidationError(format!("corrupt 16-bit WAV samples: {e}"))
                })?;
            downmix(&samples, channels)
        }
        8 => {
            // hound yields unsigned 8-bit samples centered at 128.
            let samples: Vec<i16> = reader
                .samples::<i16>()
                .collect::<Result<Vec<i16>, _>>()
                .map_err(|e| CoreError::ValidationError(format!("corrupt 8-bit WAV samples: {e}")))?
                .into_iter()
                .map(|s| ((s - 128) << 8))
                .collect();
            downmix(&samples, channels)
        }
        other => {
            return Err(CoreError::ValidationError(format!(
                "unsupported WAV bit depth {other}"
            )));
        }
    };
    Ok(DecodedPcm { sample_rate: spec.sample_rate, samples: mono })
}

fn decode_mp3(path: &Path) -> CoreResult<DecodedPcm> {
    use symphonia::core::codecs::audio::AudioDecoderOptions;
    use symphonia::core::codecs::CodecParameters;
    use symphonia::core::formats::probe::Hint;
    use symphonia::core::formats::{FormatOptions, TrackType};
    use symphonia::core::io::MediaSourceStream;
    use symphonia::core::meta::MetadataOptions;

    let file = std::fs::File::open(path)
        .map_err(|e| CoreError::Transient(format!("opening asset file: {e}")))?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());
    let mut hint = Hint::new();
    hint.with_extension("mp3");

    let mut format = symphonia::default::get_probe()
        .probe(&hint, mss, FormatOptions::default(), MetadataOptions::default())
        .map_err(|e| CoreError::ValidationError(format!("not a valid MP3 file: {e}")))?;

    let track = format
        .default_track(TrackType::Audio)
        .ok_or_else(|| CoreError::ValidationError("no MP3 audio track found".into()))?
        .clone();
    let track_id = track.id;
    let Some(CodecParameters::Audio(audio_params)) = track.codec_params else {
        return Err(CoreError::ValidationError("MP3 track has no codec parameters".into()));
    };
    let sample_rate = audio_params.sample_rate.unwrap_or(44_100);

    let mut decoder = symphonia::default::get_codecs()
        .make_audio_decoder(&audio_params, &AudioDecoderOptions::default())
        .map_err(|e| CoreError::ValidationError(format!("no MP3 decoder available: {e}")))?;

    let mut samples: Vec<i16> = Vec::new();
    let mut channels = 1usize;
    while let Some(packet) = format
        .next_packet()
        .map_err(|e| CoreError::ValidationError(format!("MP3 demux error: {e}")))?
    {
        if packet.track_id != track_id {
            continue;
        }
        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            Err(symphonia::core::errors::Error::DecodeError(_)) => continue,
            Err(e) => return Err(CoreError::ValidationError(format!("MP3 decode error: {e}"))),
        };
        channels = decoded.spec().channels().count();
        let mut frame: Vec<i16> = Vec::new();
        decoded.copy_to_vec_interleaved(&mut frame);
        samples.extend(frame);
    }

    let mono = downmix(&samples, channels.max(1));
    Ok(DecodedPcm { sample_rate, samples: mono })
}

/// Combines interleaved stereo channels by arithmetic mean; mono input
/// passes through unchanged (spec §4.E).
fn downmix(interleaved: &[i16], channels: usize) -> Vec<i16> {
    if channels <= 1 {
        return interleaved.to_vec();
    }
    interleaved
        .chunks_exact(channels)
        .map(|frame| {
            let sum: i32 = frame.iter().map(|&s| s as i32).sum();
            (sum / channels as i32) as i16
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn downmix_stereo_averages_channels() {
        let interleaved = [10i16, 20, 30, 40];
        let mono = downmix(&interleaved, 2);
        assert_eq!(mono, vec![15, 35]);
    }

    #[test]
    fn downmix_mono_passes_through() {
        let samples = [1i16, 2, 3];
        assert_eq!(downmix(&samples, 1), vec![1, 2, 3]);
    }
}
