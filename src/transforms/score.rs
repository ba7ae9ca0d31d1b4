// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Candidate scoring: attach the physical parameters implied by the
//! observation metadata to every surviving candidate.

use crate::constants::{SMEAR_CONST, VEL_C};
use crate::data::candidates::Candidate;
use crate::io::sigproc::FilterbankMetadata;

pub struct CandidateScorer {
    /// Band centre [MHz].
    cfreq: f64,
    /// Channel spacing [MHz].
    foff: f64,
}

impl CandidateScorer {
    pub fn new(metadata: &FilterbankMetadata) -> CandidateScorer {
        CandidateScorer {
            cfreq: metadata.cfreq(),
            foff: metadata.foff,
        }
    }

    /// Attach the topocentric period, the period derivative implied by
    /// the candidate's acceleration, and the per-channel dispersion
    /// smearing at its DM.
    pub fn score_all(&self, cands: &mut [Candidate]) {
        for c in cands.iter_mut() {
            c.period = 1.0 / c.freq;
            c.pdot = c.period * c.acc / *VEL_C;
            c.smear = *SMEAR_CONST * c.dm * self.foff.abs() / self.cfreq.powi(3);
        }
    }
}
