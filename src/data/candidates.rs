// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Spectrum candidates and their collections.

use std::cmp::Ordering;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// A spectrum peak surviving the detection threshold. Immutable once
/// emitted by the peak finder; only the distillers merge duplicates into
/// it afterwards.
#[derive(Debug, Clone)]
pub struct Candidate {
    /// Trial dispersion measure [pc cm⁻³].
    pub dm: f64,
    /// Index of the DM trial the peak was found in.
    pub dm_idx: usize,
    /// Trial acceleration [m/s²].
    pub acc: f64,
    /// Topocentric spin frequency [Hz].
    pub freq: f64,
    /// Raw bin index in the spectrum the peak was found in.
    pub bin: usize,
    /// Detection significance.
    pub snr: f32,
    /// Harmonic fold count of the spectrum the peak was found in.
    pub nh: u32,
    /// Harmonic multiples absorbed during distillation.
    pub folds: Vec<u32>,
    /// Spin period [s]; attached by the scorer.
    pub period: f64,
    /// Period derivative implied by the acceleration [s/s]; attached by
    /// the scorer.
    pub pdot: f64,
    /// Per-channel dispersion smearing at this DM [s]; attached by the
    /// scorer.
    pub smear: f64,
    /// Folded-profile S/N; attached by the folder.
    pub folded_snr: Option<f32>,
}

impl Candidate {
    pub fn new(
        dm: f64,
        dm_idx: usize,
        acc: f64,
        freq: f64,
        bin: usize,
        snr: f32,
        nh: u32,
    ) -> Candidate {
        Candidate {
            dm,
            dm_idx,
            acc,
            freq,
            bin,
            snr,
            nh,
            folds: vec![],
            period: 0.0,
            pdot: 0.0,
            smear: 0.0,
            folded_snr: None,
        }
    }
}

/// An unordered multiset of candidates; append-only within a worker,
/// merged across workers at join.
#[derive(Debug, Default)]
pub struct CandidateCollection {
    pub cands: Vec<Candidate>,
}

impl CandidateCollection {
    pub fn append(&mut self, cands: Vec<Candidate>) {
        self.cands.extend(cands);
    }

    pub fn extend(&mut self, other: CandidateCollection) {
        self.cands.extend(other.cands);
    }

    pub fn len(&self) -> usize {
        self.cands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cands.is_empty()
    }

    /// Sort by descending S/N.
    pub fn sort_by_snr(&mut self) {
        self.cands.sort_unstable_by(|a, b| {
            b.snr.partial_cmp(&a.snr).unwrap_or(Ordering::Equal)
        });
    }

    /// Write the candidate file `<out_dir>/<stem>.cands`, one candidate
    /// per line sorted by descending S/N: DM, acceleration, frequency,
    /// period, S/N, number of harmonics, raw bin index. An empty
    /// collection writes an empty file.
    pub fn write_candidate_file(
        &mut self,
        out_dir: &Path,
        stem: &str,
    ) -> Result<PathBuf, std::io::Error> {
        self.sort_by_snr();
        let path = out_dir.join(format!("{stem}.cands"));
        let mut w = BufWriter::new(File::create(&path)?);
        for c in &self.cands {
            writeln!(
                w,
                "{:.3}\t{:.5}\t{:.9}\t{:.9}\t{:.2}\t{}\t{}",
                c.dm, c.acc, c.freq, c.period, c.snr, c.nh, c.bin
            )?;
        }
        w.flush()?;
        Ok(path)
    }
}
