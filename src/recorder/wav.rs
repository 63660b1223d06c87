//! Canonical PCM WAV header
//!
//! 44 bytes: `RIFF` chunk, a 16-byte `fmt ` chunk and the `data` chunk
//! header. Sample data follows immediately. All integers little-endian.

use super::state::AudioFormat;
use thiserror::Error;

/// Size of the header in bytes
pub const HEADER_LEN: usize = 44;

const PCM_FORMAT_TAG: u16 = 1;
const FMT_CHUNK_LEN: u32 = 16;

/// Header decoding errors
#[derive(Error, Debug, PartialEq, Eq)]
pub enum WavError {
    #[error("Header too short: {0} bytes")]
    Truncated(usize),

    #[error("Missing {0} tag")]
    MissingTag(&'static str),

    #[error("Unsupported format tag {0}")]
    UnsupportedFormat(u16),

    #[error("Inconsistent header: {0}")]
    Inconsistent(String),
}

/// Decoded WAV header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavHeader {
    pub format: AudioFormat,

    /// Size of the `data` chunk
    pub data_len: u32,
}

impl WavHeader {
    pub fn new(format: AudioFormat, data_len: u32) -> Self {
        Self { format, data_len }
    }

    /// Value of the RIFF size field (file length minus 8)
    pub fn riff_len(&self) -> u32 {
        self.data_len.saturating_add(HEADER_LEN as u32 - 8)
    }

    /// Total file length the header declares
    pub fn file_len(&self) -> u64 {
        HEADER_LEN as u64 + self.data_len as u64
    }

    pub fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let mut out = [0u8; HEADER_LEN];
        out[0..4].copy_from_slice(b"RIFF");
        out[4..8].copy_from_slice(&self.riff_len().to_le_bytes());
        out[8..12].copy_from_slice(b"WAVE");
        out[12..16].copy_from_slice(b"fmt ");
        out[16..20].copy_from_slice(&FMT_CHUNK_LEN.to_le_bytes());
        out[20..22].copy_from_slice(&PCM_FORMAT_TAG.to_le_bytes());
        out[22..24].copy_from_slice(&self.format.channels.to_le_bytes());
        out[24..28].copy_from_slice(&self.format.sample_rate.to_le_bytes());
        out[28..32].copy_from_slice(&self.format.byte_rate().to_le_bytes());
        out[32..34].copy_from_slice(&self.format.block_align().to_le_bytes());
        out[34..36].copy_from_slice(&self.format.bits_per_sample.to_le_bytes());
        out[36..40].copy_from_slice(b"data");
        out[40..44].copy_from_slice(&self.data_len.to_le_bytes());
        out
    }

    /// Decode and cross-check a header
    pub fn parse(bytes: &[u8]) -> Result<Self, WavError> {
        if bytes.len() < HEADER_LEN {
            return Err(WavError::Truncated(bytes.len()));
        }
        let u16_at = |at: usize| u16::from_le_bytes([bytes[at], bytes[at + 1]]);
        let u32_at = |at: usize| {
            u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
        };

        if &bytes[0..4] != b"RIFF" {
            return Err(WavError::MissingTag("RIFF"));
        }
        if &bytes[8..12] != b"WAVE" {
            return Err(WavError::MissingTag("WAVE"));
        }
        if &bytes[12..16] != b"fmt " {
            return Err(WavError::MissingTag("fmt "));
        }
        if &bytes[36..40] != b"data" {
            return Err(WavError::MissingTag("data"));
        }
        let format_tag = u16_at(20);
        if format_tag != PCM_FORMAT_TAG {
            return Err(WavError::UnsupportedFormat(format_tag));
        }
        if u32_at(16) != FMT_CHUNK_LEN {
            return Err(WavError::Inconsistent(format!(
                "fmt chunk length {}",
                u32_at(16)
            )));
        }

        let header = Self {
            format: AudioFormat {
                channels: u16_at(22),
                sample_rate: u32_at(24),
                bits_per_sample: u16_at(34),
            },
            data_len: u32_at(40),
        };

        let riff_len = header
            .data_len
            .checked_add(HEADER_LEN as u32 - 8)
            .ok_or_else(|| {
                WavError::Inconsistent(format!("data size {} too large", header.data_len))
            })?;
        if u32_at(4) != riff_len {
            return Err(WavError::Inconsistent(format!(
                "RIFF size {} does not match data size {}",
                u32_at(4),
                header.data_len
            )));
        }
        if Some(u16_at(32)) != header.format.checked_block_align() {
            return Err(WavError::Inconsistent("block align".to_string()));
        }
        if Some(u32_at(28)) != header.format.checked_byte_rate() {
            return Err(WavError::Inconsistent("byte rate".to_string()));
        }

        Ok(header)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn format() -> AudioFormat {
        AudioFormat {
            sample_rate: 16_000,
            channels: 2,
            bits_per_sample: 32,
        }
    }

    #[test]
    fn test_header_layout() {
        let bytes = WavHeader::new(format(), 1000).to_bytes();
        assert_eq!(&bytes[0..4], b"RIFF");
        assert_eq!(u32::from_le_bytes(bytes[4..8].try_into().unwrap()), 1036);
        assert_eq!(u16::from_le_bytes(bytes[22..24].try_into().unwrap()), 2);
        assert_eq!(u32::from_le_bytes(bytes[28..32].try_into().unwrap()), 128_000);
        assert_eq!(u16::from_le_bytes(bytes[32..34].try_into().unwrap()), 8);
        assert_eq!(&bytes[36..40], b"data");
        assert_eq!(u32::from_le_bytes(bytes[40..44].try_into().unwrap()), 1000);
    }

    #[test]
    fn test_parse_written_header() {
        let header = WavHeader::new(format(), 4096);
        let parsed = WavHeader::parse(&header.to_bytes()).unwrap();
        assert_eq!(parsed, header);
        assert_eq!(parsed.file_len(), 44 + 4096);
    }

    #[test]
    fn test_parse_rejects_mismatched_sizes() {
        let mut bytes = WavHeader::new(format(), 4096).to_bytes();
        bytes[40..44].copy_from_slice(&10u32.to_le_bytes());
        assert!(matches!(
            WavHeader::parse(&bytes),
            Err(WavError::Inconsistent(_))
        ));
    }

    #[test]
    fn test_parse_rejects_oversized_data_len() {
        let mut bytes = WavHeader::new(format(), 0).to_bytes();
        bytes[40..44].copy_from_slice(&u32::MAX.to_le_bytes());
        assert!(matches!(
            WavHeader::parse(&bytes),
            Err(WavError::Inconsistent(_))
        ));
    }

    #[test]
    fn test_parse_rejects_overflowing_format() {
        let mut bytes = WavHeader::new(format(), 0).to_bytes();
        // 20000 channels of 32-bit samples overflows the block align field.
        bytes[22..24].copy_from_slice(&20_000u16.to_le_bytes());
        assert!(matches!(
            WavHeader::parse(&bytes),
            Err(WavError::Inconsistent(_))
        ));
    }

    #[test]
    fn test_parse_rejects_short_input() {
        assert_eq!(WavHeader::parse(&[0u8; 12]), Err(WavError::Truncated(12)));
    }
}
