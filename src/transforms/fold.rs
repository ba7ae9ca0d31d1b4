// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Phase-folding of the top candidates against their own DM trials. The
//! folded-profile S/N is a time-domain check on the ranking; rendering of
//! the profiles is left to downstream tooling.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use rayon::prelude::*;

use crate::constants::FOLD_PHASE_BINS;
use crate::data::candidates::{Candidate, CandidateCollection};
use crate::data::trials::DispersionTrials;
use crate::{stats, PROGRESS_BARS};

pub struct MultiFolder<'a> {
    trials: &'a DispersionTrials,
    nbins: usize,
}

impl<'a> MultiFolder<'a> {
    pub fn new(trials: &'a DispersionTrials) -> MultiFolder<'a> {
        MultiFolder {
            trials,
            nbins: FOLD_PHASE_BINS,
        }
    }

    /// Fold the `top` strongest candidates, attaching a folded-profile
    /// S/N to each. Candidates must already carry a period (the scorer
    /// runs first).
    pub fn fold_n(&self, collection: &mut CandidateCollection, top: usize) {
        collection.sort_by_snr();
        let n = collection.len().min(top);
        let pb = ProgressBar::with_draw_target(
            Some(n as u64),
            if PROGRESS_BARS.load() {
                ProgressDrawTarget::stdout()
            } else {
                ProgressDrawTarget::hidden()
            },
        )
        .with_style(
            ProgressStyle::default_bar()
                .template("{msg:16}: [{wide_bar:.blue}] {pos}/{len} candidates ({elapsed_precise}<{eta_precise})")
                .unwrap()
                .progress_chars("=> "),
        )
        .with_message("Folding");

        collection.cands[..n].par_iter_mut().for_each(|c| {
            c.folded_snr = Some(self.fold_one(c));
            pb.inc(1);
        });
        pb.abandon();
    }

    fn fold_one(&self, c: &Candidate) -> f32 {
        let series = self.trials.trial(c.dm_idx);
        let tsamp = self.trials.tsamp();
        let mut sums = vec![0.0f64; self.nbins];
        let mut counts = vec![0u32; self.nbins];
        for (t, &s) in series.iter().enumerate() {
            let phase = (t as f64 * tsamp / c.period).fract();
            let b = ((phase * self.nbins as f64) as usize).min(self.nbins - 1);
            sums[b] += f64::from(s);
            counts[b] += 1;
        }

        let filled_mean = {
            let total: f64 = sums.iter().sum();
            let hits: u32 = counts.iter().sum();
            total / f64::from(hits.max(1))
        };
        let profile: Vec<f32> = sums
            .iter()
            .zip(&counts)
            .map(|(&s, &c)| {
                // Phase bins a short trial never visits take the average
                // level so they don't fake a pulse.
                if c > 0 {
                    (s / f64::from(c)) as f32
                } else {
                    filled_mean as f32
                }
            })
            .collect();

        let (mean, std) = stats::mean_and_std(&profile);
        if std > 0.0 {
            let max = profile.iter().copied().fold(f32::MIN, f32::max);
            (max - mean) / std
        } else {
            0.0
        }
    }
}
