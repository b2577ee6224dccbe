//! Block power accumulation
//!
//! K-weighted audio is cut into 400 ms gating blocks that overlap by 75%
//! (a new block starts every 100 ms). Each block yields one scalar: the sum
//! over channels of the channel's mean square, scaled by its BS.1770 weight.

/// Gating block length in milliseconds
pub const BLOCK_DURATION_MS: usize = 400;

/// Channel weight for surround channels (index 3 and up), about +1.5 dB
pub const SURROUND_CHANNEL_WEIGHT: f64 = 1.41;

/// BS.1770 weight for the channel at `index`
///
/// Front left, front right and center count at unity. Everything after them
/// is treated as a surround channel.
pub fn channel_weight(index: usize) -> f64 {
    if index < 3 {
        1.0
    } else {
        SURROUND_CHANNEL_WEIGHT
    }
}

/// Number of samples in one gating block at `sample_rate`
pub fn block_length(sample_rate: u32) -> usize {
    sample_rate as usize * BLOCK_DURATION_MS / 1000
}

/// Distance between consecutive block starts (25% of a block)
pub fn block_step(sample_rate: u32) -> usize {
    (block_length(sample_rate) / 4).max(1)
}

/// Compute the weighted power of every full block
///
/// `channels` must be K-weighted and of equal length. Blocks that would run
/// past the end of the signal are not emitted, so anything shorter than one
/// block produces an empty vector.
pub fn block_powers(channels: &[Vec<f64>], sample_rate: u32) -> Vec<f64> {
    let block_len = block_length(sample_rate);
    let step = block_step(sample_rate);
    let frames = channels.first().map_or(0, Vec::len);

    if block_len == 0 || frames < block_len {
        return Vec::new();
    }

    let block_count = (frames - block_len) / step + 1;
    let mut powers = vec![0.0; block_count];

    for (index, channel) in channels.iter().enumerate() {
        let weight = channel_weight(index);
        for (block, power) in powers.iter_mut().enumerate() {
            let start = block * step;
            let window = &channel[start..start + block_len];
            let mean_square = window.iter().map(|s| s * s).sum::<f64>() / block_len as f64;
            *power += weight * mean_square;
        }
    }

    powers
}
