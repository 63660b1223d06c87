//! Signal level metering
//!
//! RMS of normalized sample magnitudes, for log output only.

const METER_WIDTH: usize = 50;
const SILENCE_DB: f32 = -60.0;

/// Root-mean-square level of little-endian PCM bytes, normalized to 0.0-1.0
///
/// 8-bit samples are unsigned; wider samples are signed. A trailing partial
/// sample is ignored.
pub fn rms(bytes: &[u8], bits_per_sample: u16) -> f32 {
    let width = (bits_per_sample / 8) as usize;
    if width == 0 {
        return 0.0;
    }

    let mut sum_squares = 0.0f64;
    let mut count = 0usize;
    for sample in bytes.chunks_exact(width) {
        let normalized = match width {
            1 => (sample[0] as f64 - 128.0) / 128.0,
            2 => i16::from_le_bytes([sample[0], sample[1]]) as f64 / i16::MAX as f64,
            3 => {
                // Sign-extend through the top byte of an i32.
                let v = i32::from_le_bytes([0, sample[0], sample[1], sample[2]]) >> 8;
                v as f64 / 8_388_607.0
            }
            4 => {
                i32::from_le_bytes([sample[0], sample[1], sample[2], sample[3]]) as f64
                    / i32::MAX as f64
            }
            _ => return 0.0,
        };
        sum_squares += normalized * normalized;
        count += 1;
    }

    if count == 0 {
        return 0.0;
    }
    (sum_squares / count as f64).sqrt() as f32
}

/// Level in dBFS, floored at -60
pub fn to_db(rms: f32) -> f32 {
    if rms > 0.0 {
        (20.0 * rms.log10()).max(SILENCE_DB)
    } else {
        SILENCE_DB
    }
}

/// Text meter, e.g. `[#####-----...] -12.0 dB`
pub fn level_meter(rms: f32) -> String {
    let filled = ((rms * METER_WIDTH as f32) as usize).min(METER_WIDTH);
    format!(
        "[{}{}] {:.1} dB",
        "#".repeat(filled),
        "-".repeat(METER_WIDTH - filled),
        to_db(rms)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_silence() {
        assert_eq!(rms(&[0u8; 64], 16), 0.0);
        assert_eq!(rms(&[128u8; 64], 8), 0.0);
        assert_eq!(to_db(0.0), -60.0);
    }

    #[test]
    fn test_full_scale_32bit() {
        let bytes: Vec<u8> = (0..32).flat_map(|_| i32::MAX.to_le_bytes()).collect();
        assert!((rms(&bytes, 32) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_24bit_negative_samples() {
        // -4194304 is half of negative full scale.
        let sample = (-4_194_304i32).to_le_bytes();
        let bytes: Vec<u8> = (0..16).flat_map(|_| [sample[0], sample[1], sample[2]]).collect();
        assert!((rms(&bytes, 24) - 0.5).abs() < 1e-3);
    }

    #[test]
    fn test_meter_is_clamped() {
        let meter = level_meter(3.0);
        assert!(meter.starts_with(&format!("[{}]", "#".repeat(50))));
        assert!(level_meter(0.0).contains("-60.0 dB"));
    }
}
