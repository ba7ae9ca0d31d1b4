// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Incoherent harmonic summing: stretch-and-add the power spectrum so
//! that a signal spreading its power over many harmonics concentrates it
//! in one bin of some summed spectrum.

use crate::data::series::{HarmonicStack, PowerSpectrum};

/// Fill every level of `sums` from `pspec`. Level `h` at bin `k` is
/// `Σ_{j=1..=2^(h+1)} P[round(k·j/2^(h+1))]`: at `k = N·k₀` the sum
/// collects all `N = 2^(h+1)` harmonics of a fundamental at bin `k₀`.
pub fn fold(pspec: &PowerSpectrum, sums: &mut HarmonicStack) {
    let p = &pspec.data;
    let nbins = p.len();
    for h in 0..sums.nsums() {
        let nh = HarmonicStack::fold_count(h) as usize;
        let out = sums.level_mut(h);
        for (k, o) in out.iter_mut().enumerate() {
            let mut acc = 0.0f32;
            for j in 1..=nh {
                acc += p[(k * j + nh / 2) / nh];
            }
            *o = acc;
        }
    }
}
