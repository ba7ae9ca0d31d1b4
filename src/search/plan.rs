// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The acceleration plan: which trial accelerations to search at each DM.

use vec1::{vec1, Vec1};

use crate::constants::{SMEAR_CONST, VEL_C};

/// Generates, per DM, the sorted inclusive list of trial accelerations
/// whose spacing keeps the S/N loss of a pulse of the reference width
/// within the configured tolerance.
#[derive(Debug, Clone)]
pub struct AccelerationPlan {
    acc_start: f64,
    acc_end: f64,
    acc_tol: f64,
    /// Reference pulse width [s].
    wref: f64,
    /// Transform length [samples].
    size: usize,
    /// Sample period [s].
    tsamp: f64,
    /// Band centre [MHz].
    cfreq: f64,
    /// Channel spacing [MHz].
    foff: f64,
}

impl AccelerationPlan {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        acc_start: f64,
        acc_end: f64,
        acc_tol: f64,
        wref: f64,
        size: usize,
        tsamp: f64,
        cfreq: f64,
        foff: f64,
    ) -> AccelerationPlan {
        assert!(acc_end >= acc_start);
        assert!(acc_tol > 1.0);
        AccelerationPlan {
            acc_start,
            acc_end,
            acc_tol,
            wref,
            size,
            tsamp,
            cfreq,
            foff,
        }
    }

    /// The acceleration step at DM `dm`.
    ///
    /// An acceleration error `δa` drifts a signal by `δa·T²/(2c)` seconds
    /// over the observation. The step tolerates a drift matching the
    /// excess smearing `sqrt(tol² − 1)` of the effective pulse width,
    /// which grows with DM through the per-channel dispersion smearing.
    fn step(&self, dm: f64) -> f64 {
        let tobs = self.size as f64 * self.tsamp;
        let tdm = *SMEAR_CONST * dm * self.foff.abs() / self.cfreq.powi(3);
        let weff = (self.wref * self.wref + self.tsamp * self.tsamp + tdm * tdm).sqrt();
        2.0 * *VEL_C * (self.acc_tol * self.acc_tol - 1.0).sqrt() * weff / (tobs * tobs)
    }

    /// The trial accelerations for DM `dm`, inclusive of both sweep
    /// endpoints; a singleton when the sweep is degenerate.
    pub fn generate(&self, dm: f64) -> Vec1<f64> {
        let mut accs = vec1![self.acc_start];
        if self.acc_end == self.acc_start {
            return accs;
        }
        let step = self.step(dm);
        loop {
            let next = accs.last() + step;
            if next >= self.acc_end {
                break;
            }
            accs.push(next);
        }
        accs.push(self.acc_end);
        accs
    }
}
