// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Sample buffers reused across DM trials: time series, Fourier series,
//! power spectra and harmonic-sum stacks. Each worker owns one of each for
//! the lifetime of its thread.

use num_complex::Complex32;

use crate::stats;

/// A single-precision time series of fixed transform length.
#[derive(Debug, Clone)]
pub struct TimeSeries {
    pub data: Vec<f32>,
    /// Sample period [s].
    pub tsamp: f64,
}

impl TimeSeries {
    pub fn new(size: usize, tsamp: f64) -> TimeSeries {
        TimeSeries {
            data: vec![0.0; size],
            tsamp,
        }
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Copy byte-quantized samples into the head of the buffer, converting
    /// to f32. Returns the number of samples copied.
    pub fn fill_from_bytes(&mut self, bytes: &[u8]) -> usize {
        let n = bytes.len().min(self.data.len());
        for (dst, &src) in self.data[..n].iter_mut().zip(bytes) {
            *dst = f32::from(src);
        }
        n
    }

    /// Fill the tail `[valid, size)` with the mean of `[0, valid)`. The
    /// mean is taken over the pre-padded region only.
    pub fn pad_from_mean(&mut self, valid: usize) {
        let mean = stats::mean(&self.data[..valid]);
        self.data[valid..].fill(mean);
    }
}

/// The one-sided spectrum of a real time series.
#[derive(Debug, Clone)]
pub struct FourierSeries {
    pub data: Vec<Complex32>,
    /// Width of one Fourier bin [Hz].
    pub bin_width: f64,
}

impl FourierSeries {
    pub fn new(nbins: usize, bin_width: f64) -> FourierSeries {
        FourierSeries {
            data: vec![Complex32::default(); nbins],
            bin_width,
        }
    }

    pub fn nbins(&self) -> usize {
        self.data.len()
    }
}

/// A detection-statistic spectrum, raw or Fourier-interpolated.
#[derive(Debug, Clone)]
pub struct PowerSpectrum {
    pub data: Vec<f32>,
    /// Width of one Fourier bin [Hz].
    pub bin_width: f64,
}

impl PowerSpectrum {
    pub fn new(nbins: usize, bin_width: f64) -> PowerSpectrum {
        PowerSpectrum {
            data: vec![0.0; nbins],
            bin_width,
        }
    }

    pub fn nbins(&self) -> usize {
        self.data.len()
    }
}

/// Incoherently summed harmonic spectra. Level `h` sums `2^(h+1)`
/// sub-harmonic bins, so a signal with that many harmonics in band gains
/// `≈ √(2^(h+1))` in S/N there.
#[derive(Debug, Clone)]
pub struct HarmonicStack {
    sums: Vec<Vec<f32>>,
    /// Width of one Fourier bin [Hz].
    pub bin_width: f64,
}

impl HarmonicStack {
    pub fn new(nbins: usize, nsums: usize, bin_width: f64) -> HarmonicStack {
        HarmonicStack {
            sums: vec![vec![0.0; nbins]; nsums],
            bin_width,
        }
    }

    pub fn nsums(&self) -> usize {
        self.sums.len()
    }

    /// Number of harmonics summed in level `h`.
    pub fn fold_count(h: usize) -> u32 {
        1 << (h + 1)
    }

    pub fn level(&self, h: usize) -> &[f32] {
        &self.sums[h]
    }

    pub fn level_mut(&mut self, h: usize) -> &mut [f32] {
        &mut self.sums[h]
    }

    /// Iterate over `(fold count, summed spectrum)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &[f32])> {
        self.sums
            .iter()
            .enumerate()
            .map(|(h, s)| (Self::fold_count(h), s.as_slice()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fill_from_bytes_converts() {
        let mut tim = TimeSeries::new(4, 1e-3);
        assert_eq!(tim.fill_from_bytes(&[0, 128, 255]), 3);
        assert_eq!(tim.data, [0.0, 128.0, 255.0, 0.0]);
    }

    #[test]
    fn test_padding_uses_prefix_mean_only() {
        let mut tim = TimeSeries::new(8, 1e-3);
        tim.fill_from_bytes(&[10, 20, 30, 40]);
        tim.pad_from_mean(4);
        // Were the mean taken over the whole buffer the tail would be
        // polluted by the zeros it is about to replace.
        for &x in &tim.data[4..] {
            assert_eq!(x, 25.0);
        }
    }

    #[test]
    fn test_fold_counts_double() {
        assert_eq!(HarmonicStack::fold_count(0), 2);
        assert_eq!(HarmonicStack::fold_count(1), 4);
        assert_eq!(HarmonicStack::fold_count(3), 16);
    }
}
