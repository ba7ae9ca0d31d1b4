// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The dispersion-trial store: one byte-quantized time series per trial
//! DM, produced once by the dedisperser and shared read-only across all
//! workers.

use ndarray::{Array2, ArrayView1};
use vec1::Vec1;

/// `N_dm` dedispersed time series of identical length and sample period.
#[derive(Debug)]
pub struct DispersionTrials {
    /// Shape `(N_dm, N_t)`.
    data: Array2<u8>,
    /// Strictly increasing trial DMs [pc cm⁻³].
    dms: Vec1<f64>,
    /// Sample period [s].
    tsamp: f64,
}

impl DispersionTrials {
    pub fn new(data: Array2<u8>, dms: Vec1<f64>, tsamp: f64) -> DispersionTrials {
        assert_eq!(data.nrows(), dms.len());
        assert!(
            dms.as_slice().windows(2).all(|w| w[0] < w[1]),
            "trial DMs must be strictly increasing"
        );
        DispersionTrials { data, dms, tsamp }
    }

    pub fn count(&self) -> usize {
        self.dms.len()
    }

    pub fn nsamps(&self) -> usize {
        self.data.ncols()
    }

    pub fn tsamp(&self) -> f64 {
        self.tsamp
    }

    pub fn dm(&self, idx: usize) -> f64 {
        self.dms[idx]
    }

    pub fn trial(&self, idx: usize) -> ArrayView1<u8> {
        self.data.row(idx)
    }

    /// Copy the `idx`-th trial's samples into `out`, returning its DM.
    pub fn read_into(&self, idx: usize, out: &mut Vec<u8>) -> f64 {
        let row = self.data.row(idx);
        out.clear();
        out.extend(row.iter());
        self.dms[idx]
    }
}
