//! Sample encoding helpers shared by capture sources

/// Append `value` (clamped to -1.0..=1.0) as one little-endian sample
pub fn encode_sample(value: f32, bits_per_sample: u16, out: &mut Vec<u8>) {
    let v = value.clamp(-1.0, 1.0) as f64;
    match bits_per_sample {
        8 => out.push((v * 127.0 + 128.0).round() as u8),
        16 => out.extend_from_slice(&((v * i16::MAX as f64) as i16).to_le_bytes()),
        24 => {
            let s = ((v * 8_388_607.0) as i32).to_le_bytes();
            out.extend_from_slice(&s[0..3]);
        }
        _ => out.extend_from_slice(&((v * i32::MAX as f64) as i32).to_le_bytes()),
    }
}

/// Remap a frame of `source_channels` samples onto `target_channels`
///
/// Extra target channels repeat the last source channel; surplus source
/// channels are dropped.
pub fn remap_frame(frame: &[f32], target_channels: u16, out: &mut Vec<f32>) {
    if frame.is_empty() {
        return;
    }
    for c in 0..target_channels as usize {
        out.push(frame[c.min(frame.len() - 1)]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recorder::level::rms;

    #[test]
    fn test_encode_widths() {
        for bits in [8u16, 16, 24, 32] {
            let mut out = Vec::new();
            encode_sample(0.5, bits, &mut out);
            assert_eq!(out.len(), (bits / 8) as usize);
            assert!((rms(&out, bits) - 0.5).abs() < 0.01, "bits={bits}");
        }
    }

    #[test]
    fn test_remap_mono_to_stereo() {
        let mut out = Vec::new();
        remap_frame(&[0.25], 2, &mut out);
        assert_eq!(out, vec![0.25, 0.25]);

        out.clear();
        remap_frame(&[0.1, 0.2, 0.3], 2, &mut out);
        assert_eq!(out, vec![0.1, 0.2]);
    }
}
