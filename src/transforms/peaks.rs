// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Peak finding: extract candidates above the S/N threshold from a
//! normalized spectrum or harmonic sum.

use crate::data::candidates::Candidate;

/// The trial a spectrum belongs to; stamped onto every emitted candidate.
#[derive(Debug, Clone, Copy)]
pub struct TrialInfo {
    pub dm: f64,
    pub dm_idx: usize,
    pub acc: f64,
}

pub struct PeakFinder {
    min_snr: f32,
    min_freq: f64,
    max_freq: f64,
}

impl PeakFinder {
    pub fn new(min_snr: f32, min_freq: f64, max_freq: f64) -> PeakFinder {
        PeakFinder {
            min_snr,
            min_freq,
            max_freq,
        }
    }

    /// Emit every strict local maximum above the threshold within the
    /// allowed band. `spec` must be normalized to zero mean and unit
    /// deviation at fold 1; a sum of `nh` such bins deviates by `√nh`, so
    /// the local S/N at fold `nh` is `value/√nh`.
    pub fn find_candidates(
        &self,
        spec: &[f32],
        bin_width: f64,
        nh: u32,
        trial: TrialInfo,
        out: &mut Vec<Candidate>,
    ) {
        let n = spec.len();
        if n < 3 {
            return;
        }
        let lo = ((self.min_freq / bin_width).ceil() as usize).max(1);
        let hi = ((self.max_freq / bin_width).floor() as usize).min(n - 2);
        let sigma = (nh as f32).sqrt();
        let threshold = self.min_snr * sigma;
        for k in lo..=hi {
            let v = spec[k];
            if v > threshold && v > spec[k - 1] && v > spec[k + 1] {
                out.push(Candidate::new(
                    trial.dm,
                    trial.dm_idx,
                    trial.acc,
                    k as f64 * bin_width,
                    k,
                    v / sigma,
                    nh,
                ));
            }
        }
    }
}
