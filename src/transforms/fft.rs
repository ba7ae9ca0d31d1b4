// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Real-to-complex and complex-to-real FFTs for one transform length.
//! Every worker owns a plan pair for the lifetime of its thread.

use std::sync::Arc;

use num_complex::Complex32;
use realfft::{ComplexToReal, RealFftPlanner, RealToComplex};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FftError {
    #[error("FFT execution failed: {0}")]
    Fft(#[from] realfft::FftError),
}

/// Forward and inverse plans plus their scratch space.
pub struct FftPair {
    len: usize,
    forward: Arc<dyn RealToComplex<f32>>,
    inverse: Arc<dyn ComplexToReal<f32>>,
    scratch_fwd: Vec<Complex32>,
    scratch_inv: Vec<Complex32>,
}

impl FftPair {
    pub fn new(len: usize) -> FftPair {
        let mut planner = RealFftPlanner::new();
        let forward = planner.plan_fft_forward(len);
        let inverse = planner.plan_fft_inverse(len);
        let scratch_fwd = forward.make_scratch_vec();
        let scratch_inv = inverse.make_scratch_vec();
        FftPair {
            len,
            forward,
            inverse,
            scratch_fwd,
            scratch_inv,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Forward transform of `tim` (length `len`) into `fseries` (length
    /// `len/2 + 1`). `tim` is consumed as scratch.
    pub fn forward(
        &mut self,
        tim: &mut [f32],
        fseries: &mut [Complex32],
    ) -> Result<(), FftError> {
        self.forward
            .process_with_scratch(tim, fseries, &mut self.scratch_fwd)?;
        Ok(())
    }

    /// Inverse transform of `fseries` into `tim`, scaled by `1/len` so
    /// that forward ∘ inverse is the identity. `fseries` is consumed as
    /// scratch.
    pub fn inverse(
        &mut self,
        fseries: &mut [Complex32],
        tim: &mut [f32],
    ) -> Result<(), FftError> {
        // The inverse plan requires purely real DC and Nyquist bins.
        if let Some(first) = fseries.first_mut() {
            first.im = 0.0;
        }
        if self.len % 2 == 0 {
            if let Some(last) = fseries.last_mut() {
                last.im = 0.0;
            }
        }
        self.inverse
            .process_with_scratch(fseries, tim, &mut self.scratch_inv)?;
        let scale = 1.0 / self.len as f32;
        for x in tim.iter_mut() {
            *x *= scale;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, Rng, SeedableRng};

    use super::*;

    #[test]
    fn test_round_trip_rms() {
        // forward → inverse on a normalized time series returns the
        // original within 1e-4 RMS.
        let len = 1 << 14;
        let mut rng = StdRng::seed_from_u64(17);
        let original: Vec<f32> = (0..len).map(|_| rng.gen_range(-1.0f32..1.0)).collect();

        let mut fft = FftPair::new(len);
        let mut tim = original.clone();
        let mut fseries = vec![Complex32::default(); len / 2 + 1];
        fft.forward(&mut tim, &mut fseries).unwrap();
        fft.inverse(&mut fseries, &mut tim).unwrap();

        let rms = (original
            .iter()
            .zip(&tim)
            .map(|(&a, &b)| {
                let d = f64::from(a - b);
                d * d
            })
            .sum::<f64>()
            / len as f64)
            .sqrt();
        assert!(rms < 1e-4, "round-trip RMS {rms} too large");
    }

    #[test]
    fn test_forward_dc_bin_is_the_sum() {
        let len = 8;
        let mut fft = FftPair::new(len);
        let mut tim = vec![1.0f32; len];
        let mut fseries = vec![Complex32::default(); len / 2 + 1];
        fft.forward(&mut tim, &mut fseries).unwrap();
        assert!((fseries[0].re - len as f32).abs() < 1e-4);
        assert!(fseries[0].im.abs() < 1e-6);
        // A constant series has no power off DC.
        for bin in &fseries[1..] {
            assert!(bin.norm() < 1e-3);
        }
    }
}
