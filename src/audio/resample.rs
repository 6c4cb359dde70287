//! Resampling to the 48 kHz the Opus encoder requires. The source notes
//! describe a linear-interpolation resampler; spec §9 explicitly permits a
//! higher-order substitute without changing the external contract, so this
//! uses `rubato`'s sinc resampler (see DESIGN.md).

use audioadapter_buffers::direct::SequentialSlice;
use rubato::{Async, FixedAsync, Resampler, SincInterpolationParameters, SincInterpolationType, WindowFunction};

use crate::error::{CoreError, CoreResult};

pub const TARGET_HZ: u32 = 48_000;

pub fn to_48k(samples: &[i16], source_hz: u32) -> CoreResult<Vec<i16>> {
    if source_hz == TARGET_HZ || samples.is_empty() {
        return Ok(samples.to_vec());
    }

    let ratio = TARGET_HZ as f64 / source_hz as f64;
    let input: Vec<f64> = samples.iter().map(|&s| s as f64 / i16::MAX as f64).collect();

    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };
    let chunk_size = input.len();
    let mut resampler = Async::<f64>::new_sinc(ratio, 2.0, &params, chunk_size, 1, FixedAsync::Input)
        .map_err(|e| CoreError::Fatal(format!("building resampler: {e}")))?;

    let buffer_in = SequentialSlice::new(&input, 1, input.len())
        .map_err(|e| CoreError::Fatal(format!("wrapping resample input: {e}")))?;
    let waves_out = resampler
        .process(&buffer_in, 0, None)
        .map_err(|e| CoreError::Fatal(format!("resampling asset: {e}")))?;

    Ok(waves_out
        .take_data()
        .iter()
        .map(|&s| (s * i16::MAX as f64).clamp(i16::MIN as f64, i16::MAX as f64) as i16)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passthrough_when_already_48k() {
        let samples = vec![1i16, 2, 3];
        assert_eq!(to_48k(&samples, 48_000).unwrap(), samples);
    }

    #[test]
    fn upsampling_roughly_doubles_length() {
        let samples: Vec<i16> = (0..480).map(|i| (i % 100) as i16).collect();
        let out = to_48k(&samples, 24_000).unwrap();
        assert!(out.len() > samples.len());
    }
}
