// Unit tests for PCM conversion and base64 framing
//
// These pin down the exact numeric behavior of the outbound (f32 → i16 ×32768)
// and inbound (i16 → f32 ÷32768) conversions.

use base64::Engine;
use live_voice::audio::pcm;

#[test]
fn test_round_trip_within_one_quantization_step() {
    // Encoding then decoding any |s| <= 1.0 recovers s within ~1/32768
    let step = 1.0 / 32768.0;
    let values = [-1.0f32, -0.75, -0.5, -0.1, -step, 0.0, step, 0.1, 0.5, 0.9, 0.999];

    for &s in &values {
        let decoded = pcm::i16_to_f32(pcm::f32_to_i16(s));
        assert!(
            (decoded - s).abs() <= step,
            "round trip of {} gave {} (off by {})",
            s,
            decoded,
            (decoded - s).abs()
        );
    }
}

#[test]
fn test_converting_full_scale_sample_wraps() {
    // The outbound conversion does not clamp before narrowing: +1.0 scales
    // to 32768, one past i16::MAX, and wraps to -32768. This mirrors the
    // behavior observed in the system this protocol was built against and
    // is intentionally not "fixed" to saturation.
    assert_eq!(pcm::f32_to_i16(1.0), i16::MIN);

    // Just under full scale stays in range
    assert_eq!(pcm::f32_to_i16(32767.0 / 32768.0), i16::MAX);

    // Negative full scale is exactly representable
    assert_eq!(pcm::f32_to_i16(-1.0), i16::MIN);
}

#[test]
fn test_samples_pack_as_little_endian_i16() {
    let bytes = pcm::samples_to_pcm_bytes(&[0.5]);
    assert_eq!(bytes.len(), 2);
    assert_eq!(i16::from_le_bytes([bytes[0], bytes[1]]), 16384);
}

#[test]
fn test_encode_chunk_length() {
    // 4096 samples -> 8192 bytes -> base64 of 8192 bytes
    let samples = vec![0.0f32; 4096];
    let encoded = pcm::encode_chunk(&samples);

    let decoded = base64::engine::general_purpose::STANDARD
        .decode(&encoded)
        .expect("chunk should be valid base64");
    assert_eq!(decoded.len(), 4096 * 2);
    assert!(decoded.iter().all(|&b| b == 0));
}

#[test]
fn test_decode_payload_recovers_sample_count() {
    let samples: Vec<f32> = (0..100).map(|i| (i as f32 / 100.0) - 0.5).collect();
    let encoded = pcm::encode_chunk(&samples);

    let decoded = pcm::decode_payload(&encoded).expect("payload should decode");
    assert_eq!(decoded.len(), samples.len());
}

#[test]
fn test_decode_payload_rejects_invalid_base64() {
    assert!(pcm::decode_payload("!!not base64!!").is_err());
}

#[test]
fn test_decode_payload_rejects_odd_byte_count() {
    // Three raw bytes is not a whole number of i16 samples
    let encoded = base64::engine::general_purpose::STANDARD.encode([1u8, 2, 3]);
    assert!(pcm::decode_payload(&encoded).is_err());
}

#[test]
fn test_decode_empty_payload() {
    let decoded = pcm::decode_payload("").expect("empty payload is valid");
    assert!(decoded.is_empty());
}

#[test]
fn test_fixed_session_rates() {
    // Outbound 16kHz and inbound 24kHz are independent constants
    assert_eq!(pcm::CAPTURE_SAMPLE_RATE, 16_000);
    assert_eq!(pcm::PLAYBACK_SAMPLE_RATE, 24_000);
    assert_eq!(pcm::CAPTURE_MIME_TYPE, "audio/pcm;rate=16000");
}
