//! Fake host collaborators shared by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use soul_core::{AudioBuffer, AudioDecoder, AudioFetcher, SoulError};
use std::collections::HashMap;
use std::f32::consts::PI;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

pub const SAMPLE_RATE: u32 = 48000;

/// Encoded "file" for a 1 kHz mono sine of the given amplitude
///
/// Measures -3.01 + 20*log10(amplitude) LUFS.
pub fn tone(amplitude: f32) -> Vec<u8> {
    amplitude.to_le_bytes().to_vec()
}

/// Fetcher serving in-memory payloads and counting requests
#[derive(Default)]
pub struct FakeFetcher {
    payloads: Mutex<HashMap<String, Vec<u8>>>,
    requests: Mutex<HashMap<String, usize>>,
    failures_left: AtomicUsize,
    delay: Duration,
}

impl FakeFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    pub fn serve(&self, source: &str, payload: Vec<u8>) {
        self.payloads
            .lock()
            .unwrap()
            .insert(source.to_string(), payload);
    }

    /// Make the next `count` fetches fail
    pub fn fail_next(&self, count: usize) {
        self.failures_left.store(count, Ordering::SeqCst);
    }

    pub fn requests(&self, source: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .get(source)
            .copied()
            .unwrap_or(0)
    }

    pub fn total_requests(&self) -> usize {
        self.requests.lock().unwrap().values().sum()
    }
}

#[async_trait]
impl AudioFetcher for FakeFetcher {
    async fn fetch(&self, source: &str) -> soul_core::Result<Vec<u8>> {
        *self
            .requests
            .lock()
            .unwrap()
            .entry(source.to_string())
            .or_default() += 1;

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let failing = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(SoulError::fetch(format!("{source}: connection reset")));
        }

        self.payloads
            .lock()
            .unwrap()
            .get(source)
            .cloned()
            .ok_or_else(|| SoulError::fetch(format!("{source}: HTTP 404")))
    }
}

/// Decodes `tone()` payloads into two seconds of 1 kHz sine
pub struct ToneDecoder;

impl AudioDecoder for ToneDecoder {
    fn decode(&self, bytes: Vec<u8>) -> soul_core::Result<AudioBuffer> {
        let amplitude: [u8; 4] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| SoulError::decode("not a tone payload"))?;
        let amplitude = f32::from_le_bytes(amplitude);

        // 1 kHz at 48 kHz repeats every 48 samples
        let period = (SAMPLE_RATE / 1000) as usize;
        let frames = SAMPLE_RATE as usize * 2;
        let samples = (0..frames)
            .map(|i| amplitude * (2.0 * PI * (i % period) as f32 / period as f32).sin())
            .collect();
        AudioBuffer::new(SAMPLE_RATE, vec![samples])
    }
}

pub fn db_to_linear(db: f64) -> f32 {
    10f64.powf(db / 20.0) as f32
}
