use std::f64::consts::PI;

use rustfft::{num_complex::Complex, FftPlanner};
use serde::{Deserialize, Serialize};

use crate::mel::mel_filterbank;
use crate::FeatureError;

const POWER_FLOOR: f32 = 1e-10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MfccConfig {
    pub n_mfcc: usize,
    pub n_fft: usize,
    pub hop_length: usize,
    pub n_mels: usize,
    pub top_db: Option<f32>,
}

impl Default for MfccConfig {
    fn default() -> Self {
        Self {
            n_mfcc: 13,
            n_fft: 2048,
            hop_length: 512,
            n_mels: 128,
            top_db: Some(80.0),
        }
    }
}

impl MfccConfig {
    pub fn validate(&self) -> Result<(), FeatureError> {
        if self.n_fft < 2 || self.n_fft % 2 != 0 {
            return Err(FeatureError::InvalidConfig(format!(
                "n_fft must be an even number >= 2, got {}",
                self.n_fft
            )));
        }
        if self.hop_length == 0 {
            return Err(FeatureError::InvalidConfig(
                "hop_length must be greater than zero".to_string(),
            ));
        }
        if self.n_mels == 0 || self.n_mfcc == 0 || self.n_mfcc > self.n_mels {
            return Err(FeatureError::InvalidConfig(format!(
                "need 0 < n_mfcc <= n_mels, got n_mfcc={} n_mels={}",
                self.n_mfcc, self.n_mels
            )));
        }
        Ok(())
    }
}

/// Computes time-averaged MFCC profiles.
#[derive(Debug, Clone)]
pub struct MfccExtractor {
    config: MfccConfig,
    window: Vec<f32>,
    dct: Vec<Vec<f32>>,
}

impl MfccExtractor {
    pub fn new(config: MfccConfig) -> Result<Self, FeatureError> {
        config.validate()?;
        let window = periodic_hann(config.n_fft);
        let dct = dct_ii_ortho(config.n_mfcc, config.n_mels);
        Ok(Self {
            config,
            window,
            dct,
        })
    }

    pub fn config(&self) -> &MfccConfig {
        &self.config
    }

    /// Log-mel spectrogram in dB, one row per analysis frame.
    pub fn log_mel_spectrogram(
        &self,
        samples: &[f32],
        sample_rate_hz: u32,
    ) -> Result<Vec<Vec<f32>>, FeatureError> {
        if samples.is_empty() {
            return Err(FeatureError::EmptySignal);
        }
        if sample_rate_hz == 0 {
            return Err(FeatureError::InvalidSampleRate(sample_rate_hz));
        }

        let n_fft = self.config.n_fft;
        let hop = self.config.hop_length;
        let pad = n_fft / 2;
        let mut padded = vec![0.0_f32; samples.len() + 2 * pad];
        padded[pad..pad + samples.len()].copy_from_slice(samples);
        let n_frames = 1 + (padded.len() - n_fft) / hop;

        let filterbank = mel_filterbank(sample_rate_hz, n_fft, self.config.n_mels);
        let fft = FftPlanner::<f32>::new().plan_fft_forward(n_fft);
        let mut buffer = vec![Complex::new(0.0_f32, 0.0); n_fft];
        let mut power = vec![0.0_f32; n_fft / 2 + 1];
        let mut spectrogram = Vec::with_capacity(n_frames);

        for frame in 0..n_frames {
            let offset = frame * hop;
            for (slot, (sample, weight)) in buffer
                .iter_mut()
                .zip(padded[offset..offset + n_fft].iter().zip(&self.window))
            {
                *slot = Complex::new(sample * weight, 0.0);
            }
            fft.process(&mut buffer);
            for (bin, value) in power.iter_mut().zip(&buffer) {
                *bin = value.norm_sqr();
            }

            let mel_db: Vec<f32> = filterbank
                .iter()
                .map(|filter| 10.0 * filter.apply(&power).max(POWER_FLOOR).log10())
                .collect();
            spectrogram.push(mel_db);
        }

        if let Some(top_db) = self.config.top_db {
            let peak = spectrogram
                .iter()
                .flatten()
                .copied()
                .fold(f32::NEG_INFINITY, f32::max);
            let floor = peak - top_db;
            for value in spectrogram.iter_mut().flatten() {
                *value = value.max(floor);
            }
        }

        Ok(spectrogram)
    }

    /// Mean over time of the per-frame MFCCs; always `n_mfcc` long.
    pub fn mean_mfcc(&self, samples: &[f32], sample_rate_hz: u32) -> Result<Vec<f32>, FeatureError> {
        let spectrogram = self.log_mel_spectrogram(samples, sample_rate_hz)?;

        // The DCT is linear, so averaging log-mel rows first gives the same result.
        let mut mean_mel = vec![0.0_f64; self.config.n_mels];
        for row in &spectrogram {
            for (acc, value) in mean_mel.iter_mut().zip(row) {
                *acc += f64::from(*value);
            }
        }
        let frames = spectrogram.len() as f64;

        Ok(self
            .dct
            .iter()
            .map(|basis| {
                basis
                    .iter()
                    .zip(&mean_mel)
                    .map(|(b, m)| f64::from(*b) * (m / frames))
                    .sum::<f64>() as f32
            })
            .collect())
    }
}

fn periodic_hann(n: usize) -> Vec<f32> {
    (0..n)
        .map(|i| (0.5 - 0.5 * (2.0 * PI * i as f64 / n as f64).cos()) as f32)
        .collect()
}

fn dct_ii_ortho(n_out: usize, n_in: usize) -> Vec<Vec<f32>> {
    let n = n_in as f64;
    (0..n_out)
        .map(|k| {
            let scale = if k == 0 {
                (1.0 / n).sqrt()
            } else {
                (2.0 / n).sqrt()
            };
            (0..n_in)
                .map(|i| (scale * (PI * k as f64 * (2.0 * i as f64 + 1.0) / (2.0 * n)).cos()) as f32)
                .collect()
        })
        .collect()
}
