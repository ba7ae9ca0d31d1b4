// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Red-noise removal: estimate a piecewise median baseline of the power
//! spectrum and divide it out of the Fourier series so the spectrum is
//! locally white.
//!
//! The baseline is a median-of-five cascade: block medians of width 5,
//! then medians of five of those (width 25), then again (width 125). Red
//! noise has 1/f structure at low frequency, so the tighter estimators are
//! used below the configured frequency boundaries.

use num_complex::Complex32;

use crate::data::series::{FourierSeries, PowerSpectrum};

pub struct Dereddener {
    /// Below this frequency [Hz] the width-5 medians are used.
    boundary_5: f64,
    /// Below this frequency [Hz] (and above `boundary_5`) the width-25
    /// medians are used; width 125 above.
    boundary_25: f64,
    median: Vec<f32>,
}

fn median_of(chunk: &[f32]) -> f32 {
    let mut buf = chunk.to_vec();
    buf.sort_unstable_by(f32::total_cmp);
    buf[buf.len() / 2]
}

fn block_medians(data: &[f32], width: usize) -> Vec<f32> {
    data.chunks(width).map(median_of).collect()
}

impl Dereddener {
    pub fn new(nbins: usize, boundary_5: f64, boundary_25: f64) -> Dereddener {
        Dereddener {
            boundary_5,
            boundary_25,
            median: vec![0.0; nbins],
        }
    }

    /// Estimate the noise baseline of `pspec`.
    pub fn calculate_median(&mut self, pspec: &PowerSpectrum) {
        let p = &pspec.data;
        assert_eq!(p.len(), self.median.len());
        let med5 = block_medians(p, 5);
        let med25 = block_medians(&med5, 5);
        let med125 = block_medians(&med25, 5);

        let bw = pspec.bin_width;
        for (k, m) in self.median.iter_mut().enumerate() {
            let freq = k as f64 * bw;
            *m = if freq < self.boundary_5 {
                med5[k / 5]
            } else if freq < self.boundary_25 {
                med25[k / 25]
            } else {
                med125[k / 125]
            };
        }
    }

    /// The baseline from the last [`Dereddener::calculate_median`] call.
    pub fn median(&self) -> &[f32] {
        &self.median
    }

    /// Divide each complex bin by the square root of its baseline so the
    /// power spectrum of the result is locally white.
    pub fn deredden(&self, fseries: &mut FourierSeries) {
        assert_eq!(fseries.data.len(), self.median.len());
        // The DC bin carries the baseline level, not signal.
        fseries.data[0] = Complex32::default();
        for (bin, &m) in fseries.data.iter_mut().zip(&self.median).skip(1) {
            if m > 0.0 {
                *bin *= 1.0 / m.sqrt();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    use super::*;
    use crate::transforms::spectrum;

    #[test]
    fn test_median_of_block() {
        assert_eq!(median_of(&[5.0, 1.0, 3.0]), 3.0);
        assert_eq!(median_of(&[2.0, 9.0, 4.0, 7.0, 1.0]), 4.0);
    }

    #[test]
    fn test_flat_spectrum_has_flat_baseline() {
        let mut pspec = PowerSpectrum::new(250, 1.0);
        pspec.data.fill(7.0);
        let mut red = Dereddener::new(250, 0.05, 0.5);
        red.calculate_median(&pspec);
        assert!(red.median().iter().all(|&m| m == 7.0));
    }

    #[test]
    fn test_deredden_whitens_white_noise() {
        // On white noise, dividing the spectrum by its own window medians
        // makes the median of any aligned window equal to 1.
        let nbins = 1000;
        let mut rng = StdRng::seed_from_u64(99);
        let mut fseries = FourierSeries::new(nbins, 1.0);
        for bin in fseries.data.iter_mut() {
            *bin = Complex32::new(rng.gen_range(-1.0f32..1.0), rng.gen_range(-1.0f32..1.0));
        }

        let mut pspec = PowerSpectrum::new(nbins, 1.0);
        spectrum::form(&fseries, &mut pspec);
        // Boundaries far above the band: the width-5 medians apply
        // everywhere.
        let mut red = Dereddener::new(nbins, 2000.0, 3000.0);
        red.calculate_median(&pspec);
        red.deredden(&mut fseries);
        spectrum::form(&fseries, &mut pspec);

        // Skip the first window; it holds the zeroed DC bin.
        for window in pspec.data.chunks(5).skip(1) {
            assert_abs_diff_eq!(f64::from(median_of(window)), 1.0, epsilon = 1e-3);
        }
    }

    #[test]
    fn test_cascade_baseline_tracks_the_wide_windows() {
        // With the boundaries at zero, everything uses the width-125
        // medians; a strong narrow line must not drag the baseline up.
        let nbins = 500;
        let mut pspec = PowerSpectrum::new(nbins, 1.0);
        pspec.data.fill(1.0);
        pspec.data[250] = 1e6;
        let mut red = Dereddener::new(nbins, 0.0, 0.0);
        red.calculate_median(&pspec);
        assert!(red.median().iter().all(|&m| m == 1.0));
    }
}
