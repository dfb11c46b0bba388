// Tests for the bounded playback sample queue
//
// Inbound audio can arrive faster than real time; the queue absorbs bursts
// up to its capacity and then drops the oldest samples.

use live_voice::audio::{PlaybackConfig, SampleQueue};

#[test]
fn test_push_and_drain() {
    let queue = SampleQueue::new(100);

    assert_eq!(queue.push(&[0.1, 0.2, 0.3]), 0);
    assert_eq!(queue.len(), 3);

    let mut out = [0.0f32; 3];
    queue.drain_into(&mut out);
    assert_eq!(out, [0.1, 0.2, 0.3]);
    assert!(queue.is_empty());
}

#[test]
fn test_underrun_zero_fills() {
    let queue = SampleQueue::new(100);
    queue.push(&[0.5]);

    let mut out = [1.0f32; 4];
    queue.drain_into(&mut out);
    assert_eq!(out, [0.5, 0.0, 0.0, 0.0]);
}

#[test]
fn test_overflow_drops_oldest() {
    let queue = SampleQueue::new(4);

    queue.push(&[1.0, 2.0, 3.0, 4.0]);
    let dropped = queue.push(&[5.0, 6.0]);

    assert_eq!(dropped, 2);
    assert_eq!(queue.len(), 4);

    // The oldest samples (1.0, 2.0) are gone; playback stays near-live
    let mut out = [0.0f32; 4];
    queue.drain_into(&mut out);
    assert_eq!(out, [3.0, 4.0, 5.0, 6.0]);
}

#[test]
fn test_single_push_larger_than_capacity() {
    let queue = SampleQueue::new(3);

    let dropped = queue.push(&[1.0, 2.0, 3.0, 4.0, 5.0]);
    assert_eq!(dropped, 2);

    let mut out = [0.0f32; 3];
    queue.drain_into(&mut out);
    assert_eq!(out, [3.0, 4.0, 5.0]);
}

#[test]
fn test_headroom_follows_sample_rate() {
    // 10 seconds of headroom at whatever rate the config asks for
    assert_eq!(
        PlaybackConfig::for_sample_rate(48_000).max_buffered_samples,
        48_000 * 10
    );
    assert_eq!(
        PlaybackConfig::default().max_buffered_samples,
        24_000 * 10
    );
}

#[test]
fn test_clear() {
    let queue = SampleQueue::new(10);
    queue.push(&[1.0; 8]);
    queue.clear();
    assert!(queue.is_empty());
}
