//! PCM sample conversion and base64 framing for the live audio paths.
//!
//! Outbound audio leaves the microphone as f32 samples in [-1.0, 1.0] and is
//! sent to the Live API as base64-encoded little-endian i16 PCM at 16kHz.
//! Inbound audio arrives as base64 i16 PCM at 24kHz and is renormalized to
//! f32 for playback. The two rates are fixed for the life of a session and
//! are never renegotiated.

use anyhow::{bail, Context, Result};
use base64::Engine;

/// Sample rate for captured microphone audio sent to the Live API.
pub const CAPTURE_SAMPLE_RATE: u32 = 16_000;

/// Sample rate of synthesized audio received from the Live API.
pub const PLAYBACK_SAMPLE_RATE: u32 = 24_000;

/// Samples per capture buffer (256ms at 16kHz).
pub const CAPTURE_BUFFER_SAMPLES: usize = 4096;

/// MIME type tag attached to each outbound realtime media chunk.
pub const CAPTURE_MIME_TYPE: &str = "audio/pcm;rate=16000";

/// Convert a float sample to i16 by scaling with 32768.
///
/// The narrowing wraps rather than saturates: a sample at exactly +1.0 maps
/// to -32768. This matches the observed behavior of the system this protocol
/// was built against, so it is kept wrapping here instead of being clamped.
#[inline]
pub fn f32_to_i16(sample: f32) -> i16 {
    (sample * 32768.0) as i32 as i16
}

/// Renormalize an i16 PCM sample to f32 in [-1.0, 1.0).
#[inline]
pub fn i16_to_f32(sample: i16) -> f32 {
    sample as f32 / 32768.0
}

/// Pack float samples into little-endian i16 PCM bytes.
pub fn samples_to_pcm_bytes(samples: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(samples.len() * 2);
    for &sample in samples {
        bytes.extend_from_slice(&f32_to_i16(sample).to_le_bytes());
    }
    bytes
}

/// Unpack little-endian i16 PCM bytes into float samples.
///
/// Fails on odd-length input: every sample is exactly two bytes.
pub fn pcm_bytes_to_samples(bytes: &[u8]) -> Result<Vec<f32>> {
    if bytes.len() % 2 != 0 {
        bail!("PCM payload has odd length ({} bytes)", bytes.len());
    }

    let samples = bytes
        .chunks_exact(2)
        .map(|pair| i16_to_f32(i16::from_le_bytes([pair[0], pair[1]])))
        .collect();

    Ok(samples)
}

/// Encode a capture buffer as a base64 PCM chunk ready for transmission.
pub fn encode_chunk(samples: &[f32]) -> String {
    let bytes = samples_to_pcm_bytes(samples);
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

/// Decode a base64 PCM payload from an inbound message into float samples.
pub fn decode_payload(data: &str) -> Result<Vec<f32>> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(data)
        .context("Failed to base64-decode audio payload")?;

    pcm_bytes_to_samples(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_samples_encode_to_zero_bytes() {
        let bytes = samples_to_pcm_bytes(&[0.0, 0.0, 0.0]);
        assert_eq!(bytes, vec![0u8; 6]);
    }

    #[test]
    fn test_negative_full_scale() {
        assert_eq!(f32_to_i16(-1.0), i16::MIN);
    }

    #[test]
    fn test_decode_rejects_odd_length() {
        assert!(pcm_bytes_to_samples(&[1, 2, 3]).is_err());
    }
}
