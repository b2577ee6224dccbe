//! Cross-checks the gated meter against BS.1770 reference behavior
//!
//! - Known reference values (full-scale 1 kHz sine = -3.01 LUFS)
//! - Agreement with the `ebur128` crate on the same signals
//! - Multichannel weighting and gating edge cases

use ebur128::{EbuR128, Mode};
use soul_core::AudioBuffer;
use soul_loudness::{measure, sample_peak};

// ========== Helper Functions ==========

/// Generate a mono sine wave
fn generate_sine(sample_rate: u32, frequency: f64, amplitude: f64, duration_secs: f64) -> Vec<f32> {
    let num_samples = (f64::from(sample_rate) * duration_secs) as usize;
    (0..num_samples)
        .map(|i| {
            let t = i as f64 / f64::from(sample_rate);
            (amplitude * (2.0 * std::f64::consts::PI * frequency * t).sin()) as f32
        })
        .collect()
}

/// Deterministic pseudo-noise (LCG), uniform in [-amplitude, amplitude]
fn generate_noise(frames: usize, amplitude: f32, seed: u64) -> Vec<f32> {
    let mut state = seed;
    (0..frames)
        .map(|_| {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            let unit = (state >> 40) as f32 / (1u64 << 24) as f32;
            (unit * 2.0 - 1.0) * amplitude
        })
        .collect()
}

/// Integrated loudness from the ebur128 reference meter
fn reference_lufs(buffer: &AudioBuffer) -> f64 {
    let channels = buffer.channel_count() as u32;
    let mut meter = EbuR128::new(channels, buffer.sample_rate(), Mode::I).unwrap();

    let mut interleaved = Vec::with_capacity(buffer.frames() * buffer.channel_count());
    for frame in 0..buffer.frames() {
        for channel in buffer.channels() {
            interleaved.push(channel[frame]);
        }
    }
    meter.add_frames_f32(&interleaved).unwrap();
    meter.loudness_global().unwrap()
}

// ========== Reference values ==========

#[test]
fn full_scale_1khz_sine_at_48k_is_minus_3_01() {
    let buffer = AudioBuffer::new(48_000, vec![generate_sine(48_000, 1000.0, 1.0, 5.0)]).unwrap();
    let m = measure(&buffer);
    assert!(
        (m.lufs - -3.01).abs() < 0.1,
        "Full-scale sine should be -3.01 LUFS, got {:.3}",
        m.lufs
    );
}

#[test]
fn full_scale_997hz_sine_at_44k1_is_minus_3_01() {
    let buffer = AudioBuffer::new(44_100, vec![generate_sine(44_100, 997.0, 1.0, 5.0)]).unwrap();
    let m = measure(&buffer);
    assert!((m.lufs - -3.01).abs() < 0.1, "got {:.3}", m.lufs);
}

#[test]
fn minus_20_dbfs_stereo_sine_is_minus_20_lufs() {
    let tone = generate_sine(48_000, 1000.0, 0.1, 5.0);
    let buffer = AudioBuffer::new(48_000, vec![tone.clone(), tone]).unwrap();
    let m = measure(&buffer);
    assert!((m.lufs - -20.0).abs() < 0.1, "got {:.3}", m.lufs);
    assert!((m.peak - 0.1).abs() < 1e-3);
}

// ========== Agreement with ebur128 ==========

#[test]
fn matches_reference_meter_on_sines() {
    for (rate, freq, amp) in [
        (48_000, 1000.0, 0.5),
        (48_000, 100.0, 0.3),
        (48_000, 5000.0, 0.2),
        (44_100, 1000.0, 0.5),
        (44_100, 8000.0, 0.1),
    ] {
        let tone = generate_sine(rate, freq, amp, 4.0);
        let buffer = AudioBuffer::new(rate, vec![tone.clone(), tone]).unwrap();
        let ours = measure(&buffer).lufs;
        let reference = reference_lufs(&buffer);
        assert!(
            (ours - reference).abs() < 0.1,
            "{} Hz @ {} Hz: ours {:.3}, reference {:.3}",
            freq,
            rate,
            ours,
            reference
        );
    }
}

#[test]
fn matches_reference_meter_on_noise() {
    let left = generate_noise(48_000 * 4, 0.3, 1);
    let right = generate_noise(48_000 * 4, 0.3, 2);
    let buffer = AudioBuffer::new(48_000, vec![left, right]).unwrap();

    let ours = measure(&buffer).lufs;
    let reference = reference_lufs(&buffer);
    assert!((ours - reference).abs() < 0.1, "ours {:.3}, reference {:.3}", ours, reference);
}

#[test]
fn matches_reference_meter_with_quiet_passage() {
    // Loud section followed by a much quieter one: the relative gate matters
    let mut tone = generate_sine(48_000, 1000.0, 0.5, 3.0);
    tone.extend(generate_sine(48_000, 1000.0, 0.005, 3.0));
    let buffer = AudioBuffer::new(48_000, vec![tone.clone(), tone]).unwrap();

    let ours = measure(&buffer).lufs;
    let reference = reference_lufs(&buffer);
    assert!((ours - reference).abs() < 0.1, "ours {:.3}, reference {:.3}", ours, reference);
}

// ========== Multichannel and edge cases ==========

#[test]
fn surround_channels_are_weighted() {
    let tone = generate_sine(48_000, 1000.0, 0.1, 3.0);
    let silent = vec![0.0_f32; tone.len()];

    // Same tone on the left front vs. the left surround channel
    let front = AudioBuffer::new(
        48_000,
        vec![tone.clone(), silent.clone(), silent.clone(), silent.clone(), silent.clone()],
    )
    .unwrap();
    let surround = AudioBuffer::new(
        48_000,
        vec![silent.clone(), silent.clone(), silent.clone(), tone, silent],
    )
    .unwrap();

    let difference = measure(&surround).lufs - measure(&front).lufs;
    // 10 log10(1.41) = 1.49 dB
    assert!((difference - 1.49).abs() < 0.02, "difference {:.3}", difference);
}

#[test]
fn silence_below_gate_reports_real_peak() {
    let whisper = generate_sine(48_000, 1000.0, 0.00005, 2.0);
    let buffer = AudioBuffer::new(48_000, vec![whisper]).unwrap();
    let m = measure(&buffer);

    assert_eq!(m.lufs, f64::NEG_INFINITY);
    assert!((m.peak - sample_peak(&buffer)).abs() < f64::EPSILON);
    assert!(m.peak > 0.0);
}

#[test]
fn unsupported_rate_still_measures() {
    // 96 kHz falls back to the 48 kHz coefficients; a 1 kHz tone lands close
    let buffer = AudioBuffer::new(96_000, vec![generate_sine(96_000, 1000.0, 1.0, 3.0)]).unwrap();
    let m = measure(&buffer);
    assert!(m.lufs.is_finite());
    assert!((m.lufs - -3.01).abs() < 1.0, "got {:.3}", m.lufs);
}

#[test]
fn measurement_is_deterministic() {
    let buffer = AudioBuffer::new(44_100, vec![generate_noise(44_100 * 2, 0.5, 7)]).unwrap();
    assert_eq!(measure(&buffer), measure(&buffer));
}
