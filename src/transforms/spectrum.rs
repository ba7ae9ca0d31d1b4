// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Power spectrum formation.

use crate::data::series::{FourierSeries, PowerSpectrum};

/// Raw detection statistic: `out[k] = re² + im²`.
pub fn form(fseries: &FourierSeries, pspec: &mut PowerSpectrum) {
    for (out, bin) in pspec.data.iter_mut().zip(&fseries.data) {
        *out = bin.norm_sqr();
    }
}

/// Fourier-interbinned detection statistic:
/// `out[k] = max(|X[k]|², (|X[k]| + |X[k+1]|)² / 2)`, partially recovering
/// signals placed between bins. Intended to be called after dereddening so
/// that neighbour magnitudes are comparable.
pub fn form_interpolated(fseries: &FourierSeries, pspec: &mut PowerSpectrum) {
    let n = fseries.data.len();
    for k in 0..n {
        let raw = fseries.data[k].norm_sqr();
        pspec.data[k] = if k + 1 < n {
            let s = fseries.data[k].norm() + fseries.data[k + 1].norm();
            raw.max(s * s * 0.5)
        } else {
            raw
        };
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use num_complex::Complex32;

    use super::*;

    fn fseries(bins: &[Complex32]) -> FourierSeries {
        let mut f = FourierSeries::new(bins.len(), 1.0);
        f.data.copy_from_slice(bins);
        f
    }

    #[test]
    fn test_form_is_squared_magnitude() {
        let f = fseries(&[
            Complex32::new(3.0, 4.0),
            Complex32::new(0.0, 2.0),
            Complex32::new(-1.0, 0.0),
        ]);
        let mut p = PowerSpectrum::new(3, 1.0);
        form(&f, &mut p);
        assert_abs_diff_eq!(p.data[0], 25.0);
        assert_abs_diff_eq!(p.data[1], 4.0);
        assert_abs_diff_eq!(p.data[2], 1.0);
    }

    #[test]
    fn test_interbin_recovers_split_power() {
        // Equal magnitude in adjacent bins: the interbin estimate
        // (|a| + |b|)²/2 = 2|a|² beats either raw bin.
        let f = fseries(&[
            Complex32::new(0.0, 0.0),
            Complex32::new(1.0, 0.0),
            Complex32::new(0.0, 1.0),
            Complex32::new(0.0, 0.0),
        ]);
        let mut p = PowerSpectrum::new(4, 1.0);
        form_interpolated(&f, &mut p);
        assert_abs_diff_eq!(p.data[1], 2.0);
        assert_abs_diff_eq!(p.data[2], 1.0, epsilon = 1e-6);
        // The last bin has no neighbour; raw only.
        assert_abs_diff_eq!(p.data[3], 0.0);
    }
}
