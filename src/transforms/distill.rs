// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Candidate distillation: collapse candidates that describe the same
//! signal, whether as harmonics of one fundamental, across acceleration
//! trials, or across DM trials.
//!
//! All three distillers are greedy equivalence-classing over a frequency
//! relation. Peak frequencies are bin-quantized, so every relation allows
//! the relative `freq_tol` plus the quantization slack of the peaks being
//! compared.

use std::cmp::Ordering;

use crate::data::candidates::Candidate;

fn by_freq(a: &Candidate, b: &Candidate) -> Ordering {
    a.freq.partial_cmp(&b.freq).unwrap_or(Ordering::Equal)
}

fn by_snr_desc(a: &Candidate, b: &Candidate) -> Ordering {
    b.snr.partial_cmp(&a.snr).unwrap_or(Ordering::Equal)
}

/// Strongest-first greedy merge of candidates whose frequencies agree
/// within `freq_tol` (plus one bin). Each survivor absorbs everything
/// within tolerance of it, so the output contains no two candidates
/// within tolerance of each other.
fn distill_by_frequency(
    mut cands: Vec<Candidate>,
    freq_tol: f64,
    bin_width: f64,
) -> Vec<Candidate> {
    cands.sort_unstable_by(by_snr_desc);
    let mut out: Vec<Candidate> = vec![];
    'cands: for c in cands {
        for rep in out.iter_mut() {
            if (c.freq - rep.freq).abs() <= freq_tol * rep.freq + bin_width {
                // `rep` is the stronger of the two by construction.
                continue 'cands;
            }
        }
        out.push(c);
    }
    out
}

/// Collapses harmonically related candidates onto their fundamental.
pub struct HarmonicDistiller {
    freq_tol: f64,
    max_harm: u32,
}

impl HarmonicDistiller {
    pub fn new(freq_tol: f64, max_harm: u32) -> HarmonicDistiller {
        HarmonicDistiller { freq_tol, max_harm }
    }

    /// Which harmonic of `fund` is `freq`, if any.
    fn harmonic_number(&self, fund: f64, freq: f64, bin_width: f64) -> Option<u32> {
        for n in 1..=self.max_harm {
            let target = fund * f64::from(n);
            let slack = self.freq_tol * target + 0.5 * (f64::from(n) + 1.0) * bin_width;
            if (freq - target).abs() <= slack {
                return Some(n);
            }
            if target > freq + slack {
                break;
            }
        }
        None
    }

    /// Merge candidates related by `|f_i − n·f_j| ≲ freq_tol·n·f_j`. The
    /// lowest-frequency member of a family (the fundamental) is retained;
    /// it takes on the S/N, fold count, acceleration and DM of its
    /// strongest member and records each absorbed harmonic number.
    pub fn distill(&self, mut cands: Vec<Candidate>, bin_width: f64) -> Vec<Candidate> {
        cands.sort_unstable_by(by_freq);
        let mut out: Vec<Candidate> = vec![];
        'cands: for c in cands {
            for rep in out.iter_mut() {
                if let Some(n) = self.harmonic_number(rep.freq, c.freq, bin_width) {
                    if c.snr > rep.snr {
                        rep.snr = c.snr;
                        rep.nh = c.nh;
                        rep.acc = c.acc;
                        rep.dm = c.dm;
                        rep.dm_idx = c.dm_idx;
                    }
                    rep.folds.push(n);
                    continue 'cands;
                }
            }
            out.push(c);
        }
        out
    }
}

/// Collapses candidates found at different trial accelerations of one DM.
/// The highest-S/N member survives, carrying its best-fit acceleration.
pub struct AccelerationDistiller {
    freq_tol: f64,
}

impl AccelerationDistiller {
    pub fn new(freq_tol: f64) -> AccelerationDistiller {
        AccelerationDistiller { freq_tol }
    }

    pub fn distill(&self, cands: Vec<Candidate>, bin_width: f64) -> Vec<Candidate> {
        distill_by_frequency(cands, self.freq_tol, bin_width)
    }
}

/// Collapses candidates found at different trial DMs. The highest-S/N
/// member survives, carrying its best-fit DM.
pub struct DmDistiller {
    freq_tol: f64,
}

impl DmDistiller {
    pub fn new(freq_tol: f64) -> DmDistiller {
        DmDistiller { freq_tol }
    }

    pub fn distill(&self, cands: Vec<Candidate>, bin_width: f64) -> Vec<Candidate> {
        distill_by_frequency(cands, self.freq_tol, bin_width)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    fn cand(freq: f64, snr: f32, nh: u32) -> Candidate {
        Candidate::new(0.0, 0, 0.0, freq, (freq / 0.01) as usize, snr, nh)
    }

    #[test]
    fn test_harmonics_collapse_to_the_fundamental() {
        // A 10 Hz fundamental with 8 harmonics above threshold, the
        // strongest seen in the 8-fold sum at 80 Hz.
        let mut cands: Vec<Candidate> =
            (1..=8).map(|n| cand(10.0 * f64::from(n), 15.0, 1)).collect();
        cands.push(cand(80.0, 35.0, 8));

        let distiller = HarmonicDistiller::new(1e-4, 16);
        let out = distiller.distill(cands, 0.01);
        assert_eq!(out.len(), 1);
        let survivor = &out[0];
        assert_abs_diff_eq!(survivor.freq, 10.0);
        assert_abs_diff_eq!(survivor.snr, 35.0);
        assert!(survivor.nh >= 8);
        assert_eq!(survivor.folds.len(), 8);
    }

    #[test]
    fn test_unrelated_frequencies_survive() {
        let cands = vec![cand(10.0, 15.0, 1), cand(10.7, 12.0, 1), cand(23.0, 11.0, 1)];
        let distiller = HarmonicDistiller::new(1e-4, 16);
        let out = distiller.distill(cands, 0.01);
        assert_eq!(out.len(), 3);
    }

    #[test]
    fn test_bin_quantized_harmonic_still_matches() {
        // The 3rd harmonic of 10.004 Hz quantized onto a 0.01 Hz grid
        // lands at 30.01, not 30.012; the slack must absorb that.
        let cands = vec![cand(10.0, 15.0, 1), cand(30.01, 12.0, 1)];
        let distiller = HarmonicDistiller::new(1e-4, 16);
        let out = distiller.distill(cands, 0.01);
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn test_acceleration_distiller_keeps_the_strongest() {
        let mut a = cand(50.0, 12.0, 1);
        a.acc = 0.0;
        let mut b = cand(50.001, 20.0, 2);
        b.acc = 10.0;
        let mut c = cand(50.002, 15.0, 1);
        c.acc = 20.0;

        let distiller = AccelerationDistiller::new(1e-4);
        let out = distiller.distill(vec![a, b, c], 0.001);
        assert_eq!(out.len(), 1);
        assert_abs_diff_eq!(out[0].acc, 10.0);
        assert_abs_diff_eq!(out[0].snr, 20.0);
    }

    #[test]
    fn test_distilled_output_is_separated() {
        // No two survivors may sit within tolerance of each other.
        let cands: Vec<Candidate> = (0..100)
            .map(|i| cand(50.0 + 0.0004 * f64::from(i), 10.0 + i as f32, 1))
            .collect();
        let distiller = DmDistiller::new(1e-4);
        let out = distiller.distill(cands, 0.001);
        for (i, a) in out.iter().enumerate() {
            for b in &out[i + 1..] {
                assert!(
                    (a.freq - b.freq).abs() > 1e-4 * a.freq.min(b.freq),
                    "{} and {} are within tolerance",
                    a.freq,
                    b.freq
                );
            }
        }
    }
}
