//! Slaney-style mel scale and filterbank.

const F_SP: f64 = 200.0 / 3.0;
const MIN_LOG_HZ: f64 = 1_000.0;
const MIN_LOG_MEL: f64 = MIN_LOG_HZ / F_SP;

fn log_step() -> f64 {
    6.4_f64.ln() / 27.0
}

pub fn hz_to_mel(hz: f64) -> f64 {
    if hz >= MIN_LOG_HZ {
        MIN_LOG_MEL + (hz / MIN_LOG_HZ).ln() / log_step()
    } else {
        hz / F_SP
    }
}

pub fn mel_to_hz(mel: f64) -> f64 {
    if mel >= MIN_LOG_MEL {
        MIN_LOG_HZ * (log_step() * (mel - MIN_LOG_MEL)).exp()
    } else {
        F_SP * mel
    }
}

/// One triangular filter, stored as the contiguous run of non-zero FFT bins.
#[derive(Debug, Clone)]
pub struct MelFilter {
    pub start_bin: usize,
    pub weights: Vec<f32>,
}

impl MelFilter {
    pub fn apply(&self, power: &[f32]) -> f32 {
        power[self.start_bin..]
            .iter()
            .zip(&self.weights)
            .map(|(p, w)| p * w)
            .sum()
    }
}

/// Builds `n_mels` area-normalized triangular filters spanning 0..sr/2.
pub fn mel_filterbank(sample_rate_hz: u32, n_fft: usize, n_mels: usize) -> Vec<MelFilter> {
    let n_bins = n_fft / 2 + 1;
    let fmax = f64::from(sample_rate_hz) / 2.0;
    let max_mel = hz_to_mel(fmax);

    let mel_points: Vec<f64> = (0..n_mels + 2)
        .map(|i| mel_to_hz(max_mel * i as f64 / (n_mels + 1) as f64))
        .collect();
    let fft_freqs: Vec<f64> = (0..n_bins)
        .map(|k| k as f64 * f64::from(sample_rate_hz) / n_fft as f64)
        .collect();

    (0..n_mels)
        .map(|m| {
            let (left, center, right) = (mel_points[m], mel_points[m + 1], mel_points[m + 2]);
            let enorm = 2.0 / (right - left);
            let weights: Vec<f64> = fft_freqs
                .iter()
                .map(|&freq| {
                    let lower = (freq - left) / (center - left);
                    let upper = (right - freq) / (right - center);
                    lower.min(upper).max(0.0) * enorm
                })
                .collect();

            let first = weights.iter().position(|w| *w > 0.0);
            let last = weights.iter().rposition(|w| *w > 0.0);
            match (first, last) {
                (Some(first), Some(last)) => MelFilter {
                    start_bin: first,
                    weights: weights[first..=last].iter().map(|w| *w as f32).collect(),
                },
                // Filters narrower than one FFT bin stay empty.
                _ => MelFilter {
                    start_bin: 0,
                    weights: Vec::new(),
                },
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::{hz_to_mel, mel_filterbank, mel_to_hz};

    #[test]
    fn mel_scale_is_linear_below_one_khz() {
        assert_abs_diff_eq!(hz_to_mel(200.0), 3.0, epsilon = 1e-9);
        assert_abs_diff_eq!(hz_to_mel(1_000.0), 15.0, epsilon = 1e-9);
    }

    #[test]
    fn mel_conversion_round_trips_above_break() {
        let hz = 4_321.0;
        assert_abs_diff_eq!(mel_to_hz(hz_to_mel(hz)), hz, epsilon = 1e-6);
    }

    #[test]
    fn filterbank_has_requested_band_count() {
        let bank = mel_filterbank(22_050, 2048, 128);
        assert_eq!(bank.len(), 128);
        assert!(bank.iter().all(|filter| filter.start_bin + filter.weights.len() <= 1025));
        assert!(bank.iter().filter(|filter| !filter.weights.is_empty()).count() > 100);
    }
}
