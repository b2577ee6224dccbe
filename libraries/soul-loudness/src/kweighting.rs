//! K-weighting filter bank
//!
//! ITU-R BS.1770 weights audio with two biquads in series before measuring
//! power: a high-frequency shelf (~+4 dB above ~1.7 kHz, modelling the head)
//! followed by the RLB high-pass (~38 Hz).
//!
//! Coefficients are precomputed for 44.1 kHz and 48 kHz. Every other rate
//! uses the 48 kHz set. That skews the filter corners for other rates and is
//! accepted as an approximation rather than re-deriving coefficients.

/// Coefficients for a two-pole/two-zero section, `a0` normalized to 1
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BiquadCoefficients {
    pub b0: f64,
    pub b1: f64,
    pub b2: f64,
    pub a1: f64,
    pub a2: f64,
}

impl BiquadCoefficients {
    /// Stage 1 high shelf at 48 kHz (BS.1770-4 Table 1)
    pub const SHELF_48K: Self = Self {
        b0: 1.53512485958697,
        b1: -2.69169618940638,
        b2: 1.19839281085285,
        a1: -1.69065929318241,
        a2: 0.73248077421585,
    };

    /// Stage 2 RLB high-pass at 48 kHz (BS.1770-4 Table 2)
    pub const HIGH_PASS_48K: Self = Self {
        b0: 1.0,
        b1: -2.0,
        b2: 1.0,
        a1: -1.99004745483398,
        a2: 0.99007225036621,
    };

    /// Stage 1 high shelf at 44.1 kHz (same analog prototype, bilinear transform)
    pub const SHELF_44K1: Self = Self {
        b0: 1.53084123005035,
        b1: -2.65097999515473,
        b2: 1.16907907992159,
        a1: -1.66365511325602,
        a2: 0.71259542807323,
    };

    /// Stage 2 RLB high-pass at 44.1 kHz
    pub const HIGH_PASS_44K1: Self = Self {
        b0: 1.0,
        b1: -2.0,
        b2: 1.0,
        a1: -1.98916967362980,
        a2: 0.98919903578704,
    };

    /// Run the section over `samples` in place (Direct Form II transposed)
    ///
    /// State starts at zero on every call.
    pub fn process_in_place(&self, samples: &mut [f64]) {
        let mut z1 = 0.0;
        let mut z2 = 0.0;

        for sample in samples.iter_mut() {
            let x = *sample;
            let y = self.b0 * x + z1;
            z1 = self.b1 * x - self.a1 * y + z2;
            z2 = self.b2 * x - self.a2 * y;
            *sample = y;
        }
    }
}

/// The two-stage K-weighting filter for one sample rate
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KWeighting {
    shelf: BiquadCoefficients,
    high_pass: BiquadCoefficients,
}

impl KWeighting {
    /// Pick the coefficient set for `sample_rate`
    pub fn for_sample_rate(sample_rate: u32) -> Self {
        match sample_rate {
            44_100 => Self {
                shelf: BiquadCoefficients::SHELF_44K1,
                high_pass: BiquadCoefficients::HIGH_PASS_44K1,
            },
            _ => Self {
                shelf: BiquadCoefficients::SHELF_48K,
                high_pass: BiquadCoefficients::HIGH_PASS_48K,
            },
        }
    }

    /// Whether `sample_rate` has a native coefficient set
    pub fn is_native_rate(sample_rate: u32) -> bool {
        matches!(sample_rate, 44_100 | 48_000)
    }

    /// Shelf stage coefficients
    pub fn shelf(&self) -> &BiquadCoefficients {
        &self.shelf
    }

    /// High-pass stage coefficients
    pub fn high_pass(&self) -> &BiquadCoefficients {
        &self.high_pass
    }

    /// K-weight one channel
    ///
    /// Works on a private f64 copy; `samples` is never touched.
    pub fn apply(&self, samples: &[f32]) -> Vec<f64> {
        let mut weighted: Vec<f64> = samples.iter().map(|&s| f64::from(s)).collect();
        self.shelf.process_in_place(&mut weighted);
        self.high_pass.process_in_place(&mut weighted);
        weighted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f64, rate: u32, seconds: f64) -> Vec<f32> {
        let n = (f64::from(rate) * seconds) as usize;
        (0..n)
            .map(|i| (2.0 * std::f64::consts::PI * freq * i as f64 / f64::from(rate)).sin() as f32)
            .collect()
    }

    /// RMS over the second half, after the filter has settled
    fn settled_rms(samples: &[f64]) -> f64 {
        let tail = &samples[samples.len() / 2..];
        (tail.iter().map(|s| s * s).sum::<f64>() / tail.len() as f64).sqrt()
    }

    #[test]
    fn output_has_same_length_and_input_is_untouched() {
        let input = sine(1000.0, 48_000, 0.1);
        let original = input.clone();
        let output = KWeighting::for_sample_rate(48_000).apply(&input);

        assert_eq!(output.len(), input.len());
        assert_eq!(input, original);
    }

    #[test]
    fn empty_input_gives_empty_output() {
        assert!(KWeighting::for_sample_rate(48_000).apply(&[]).is_empty());
    }

    #[test]
    fn removes_dc() {
        let input = vec![0.5_f32; 48_000];
        let output = KWeighting::for_sample_rate(48_000).apply(&input);
        assert!(output.last().unwrap().abs() < 1e-3);
    }

    #[test]
    fn boosts_high_frequencies() {
        let k = KWeighting::for_sample_rate(48_000);
        let input = sine(10_000.0, 48_000, 0.5);
        let gain_db = 20.0 * (settled_rms(&k.apply(&input)) / (0.5_f64).sqrt()).log10();
        // The shelf adds close to +4 dB well above its corner
        assert!(gain_db > 3.5 && gain_db < 4.5, "10 kHz gain was {:.2} dB", gain_db);
    }

    #[test]
    fn attenuates_sub_bass() {
        let k = KWeighting::for_sample_rate(48_000);
        let input = sine(20.0, 48_000, 2.0);
        let gain_db = 20.0 * (settled_rms(&k.apply(&input)) / (0.5_f64).sqrt()).log10();
        assert!(gain_db < -3.0, "20 Hz gain was {:.2} dB", gain_db);
    }

    #[test]
    fn native_rates_agree_at_1khz() {
        let at_48 = settled_rms(&KWeighting::for_sample_rate(48_000).apply(&sine(1000.0, 48_000, 0.5)));
        let at_44 = settled_rms(&KWeighting::for_sample_rate(44_100).apply(&sine(1000.0, 44_100, 0.5)));
        assert!((at_48 - at_44).abs() < 0.01);
    }

    #[test]
    fn other_rates_fall_back_to_48k() {
        assert_eq!(KWeighting::for_sample_rate(96_000), KWeighting::for_sample_rate(48_000));
        assert_eq!(KWeighting::for_sample_rate(22_050), KWeighting::for_sample_rate(48_000));
        assert_ne!(KWeighting::for_sample_rate(44_100), KWeighting::for_sample_rate(48_000));
        assert!(!KWeighting::is_native_rate(96_000));
    }
}
