// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Validated search parameters and the orchestrator that runs them.

use std::path::PathBuf;
use std::thread::{self, ScopedJoinHandle};
use std::time::Instant;

use crossbeam_utils::atomic::AtomicCell;
use itertools::Itertools;
use log::{debug, info, log_enabled, Level::Trace};
use scopeguard::defer_on_unwind;
use thiserror::Error;

use crate::constants::DEFAULT_FOLD_TOP;
use crate::data::candidates::CandidateCollection;
use crate::dedisperse::{generate_dm_list, Dedisperser};
use crate::io::masks::{read_kill_mask, KillfileError, ZapfileError};
use crate::io::sigproc::{self, FilterbankReadError};
use crate::search::dispenser::TrialDispenser;
use crate::search::plan::AccelerationPlan;
use crate::search::worker::{PipelineError, SearchOpts, Worker};
use crate::stats;
use crate::transforms::distill::{DmDistiller, HarmonicDistiller};
use crate::transforms::fold::MultiFolder;
use crate::transforms::score::CandidateScorer;
use crate::transforms::zapper::BirdieZapper;

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("{0}")]
    Filterbank(#[from] FilterbankReadError),

    #[error("{0}")]
    Killfile(#[from] KillfileError),

    #[error("{0}")]
    Zapfile(#[from] ZapfileError),

    #[error("The DM sweep delays the lowest channel by {delay} samples but the observation has only {nsamps}")]
    SweepTooLong { delay: usize, nsamps: usize },

    #[error("{0}")]
    Pipeline(#[from] PipelineError),

    #[error(transparent)]
    IO(#[from] std::io::Error),
}

/// One searched dimension: a trial range and the smearing tolerance that
/// bounds its stepping.
#[derive(Debug, Clone, Copy)]
pub struct Sweep {
    pub start: f64,
    pub end: f64,
    /// Smearing tolerance (> 1; 1.1 = 10%).
    pub tol: f64,
    /// Reference pulse width for which the tolerance holds [s].
    pub pulse_width: f64,
}

/// Everything a search run needs, validated by the CLI layer.
#[derive(Debug)]
pub struct SearchParams {
    pub input: PathBuf,
    pub output_dir: PathBuf,
    pub killfile: Option<PathBuf>,
    pub zapfile: Option<PathBuf>,
    /// Upper bound on worker threads; the floor is always one worker.
    pub max_threads: usize,
    /// Explicit transform length; the default is the largest power of two
    /// not exceeding the observation.
    pub fft_size: Option<usize>,
    pub dm: Sweep,
    pub acc: Sweep,
    pub opts: SearchOpts,
    /// How many top candidates to fold.
    pub fold_top: usize,
}

/// The transform length actually used. Requests beyond the observation
/// are clamped; shorter requests are honoured as-is.
fn transform_length(requested: Option<usize>, nsamps: usize) -> usize {
    match requested {
        None => stats::prev_power_of_two(nsamps),
        Some(s) => s.clamp(2, nsamps),
    }
}

impl SearchParams {
    /// Run the whole search: read, dedisperse, spawn workers, distill,
    /// score, fold, and write the candidate file. Returns the final
    /// collection.
    pub fn run(&self) -> Result<CandidateCollection, SearchError> {
        let timer = Instant::now();
        info!("Reading filterbank {}", self.input.display());
        let fb = sigproc::read(&self.input)?;
        let meta = fb.metadata.clone();
        info!(
            "{} channels × {} samples; centre {:.3} MHz, sampling {:.1} µs",
            meta.nchans,
            meta.nsamps,
            meta.cfreq(),
            meta.tsamp * 1e6
        );
        debug!("Read complete in {:.2?}", timer.elapsed());

        let dm_list = generate_dm_list(
            self.dm.start,
            self.dm.end,
            self.dm.tol,
            self.dm.pulse_width * 1e6,
            meta.tsamp,
            meta.cfreq(),
            meta.foff,
            meta.nchans,
        );
        info!(
            "{} DM trials from {} to {} pc cm⁻³",
            dm_list.len(),
            dm_list.first(),
            dm_list.last()
        );
        if log_enabled!(Trace) {
            log::trace!(
                "DM trials: {}",
                dm_list.iter().map(|dm| format!("{dm:.4}")).join(", ")
            );
        }

        let mut dedisperser = Dedisperser::new(&fb, dm_list);
        if let Some(killfile) = &self.killfile {
            info!("Using kill file {}", killfile.display());
            dedisperser.set_kill_mask(read_kill_mask(killfile, meta.nchans)?);
        }
        let max_delay = dedisperser.max_delay(*dedisperser.dm_list().last());
        if max_delay >= meta.nsamps {
            return Err(SearchError::SweepTooLong {
                delay: max_delay,
                nsamps: meta.nsamps,
            });
        }

        let timer = Instant::now();
        info!("Dedispersing {} trials", dedisperser.dm_list().len());
        let trials = dedisperser.dedisperse();
        info!("Dedispersion complete in {:.2?}", timer.elapsed());

        let size = transform_length(self.fft_size, meta.nsamps);
        info!("Transform length: {size} points");

        let acc_plan = AccelerationPlan::new(
            self.acc.start,
            self.acc.end,
            self.acc.tol,
            self.acc.pulse_width,
            size,
            meta.tsamp,
            meta.cfreq(),
            meta.foff,
        );

        let zapper = match &self.zapfile {
            Some(zapfile) => {
                info!("Using zap file {}", zapfile.display());
                let zapper = BirdieZapper::from_file(zapfile)?;
                debug!("{} birdies to zap", zapper.len());
                Some(zapper)
            }
            None => None,
        };

        let nthreads = thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
            .min(self.max_threads)
            .max(1);
        info!("Searching with {nthreads} worker thread(s)");

        let dispenser = TrialDispenser::new(trials.count());
        let abort = AtomicCell::new(false);
        let mut dm_cands = CandidateCollection::default();
        let timer = Instant::now();
        thread::scope(|scope| -> Result<(), SearchError> {
            let handles: Vec<ScopedJoinHandle<Result<CandidateCollection, PipelineError>>> =
                (0..nthreads)
                    .map(|id| {
                        let worker = Worker {
                            trials: &trials,
                            dispenser: &dispenser,
                            acc_plan: &acc_plan,
                            zapper: zapper.as_ref(),
                            opts: &self.opts,
                            abort: &abort,
                            size,
                            id,
                        };
                        let abort = &abort;
                        thread::Builder::new()
                            .name(format!("search-{id}"))
                            .spawn_scoped(scope, move || {
                                defer_on_unwind! { abort.store(true); }
                                worker.run()
                            })
                            .expect("OS can create threads")
                    })
                    .collect();

            // Join all workers. This propagates any pipeline error and
            // surfaces panics; there is no per-DM recovery, because
            // partial candidate sets are not meaningful.
            for handle in handles {
                dm_cands.extend(handle.join().expect("worker thread did not panic")?);
            }
            Ok(())
        })?;
        info!(
            "Search complete in {:.2?}; {} candidates from {} DM trials",
            timer.elapsed(),
            dm_cands.len(),
            trials.count()
        );

        let bin_width = 1.0 / (size as f64 * meta.tsamp);
        let dm_still = DmDistiller::new(self.opts.freq_tol);
        let harm_still = HarmonicDistiller::new(self.opts.freq_tol, self.opts.max_harm);
        debug!("Distilling DMs");
        dm_cands.cands = dm_still.distill(std::mem::take(&mut dm_cands.cands), bin_width);
        debug!("Distilling harmonics");
        dm_cands.cands = harm_still.distill(std::mem::take(&mut dm_cands.cands), bin_width);
        info!("{} candidates after distillation", dm_cands.len());

        CandidateScorer::new(&meta).score_all(&mut dm_cands.cands);

        let folder = MultiFolder::new(&trials);
        info!(
            "Folding top {} candidates",
            dm_cands.len().min(self.fold_top)
        );
        folder.fold_n(&mut dm_cands, self.fold_top);

        let stem = self
            .input
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("candidates");
        let path = dm_cands.write_candidate_file(&self.output_dir, stem)?;
        info!(
            "Wrote {} candidates to {}",
            dm_cands.len(),
            path.display()
        );

        Ok(dm_cands)
    }
}

impl Default for SearchOpts {
    fn default() -> SearchOpts {
        SearchOpts {
            nharmonics: 4,
            min_snr: 9.0,
            min_freq: 0.1,
            max_freq: 1100.0,
            freq_tol: 1e-4,
            max_harm: 16,
            boundary_5_freq: 0.05,
            boundary_25_freq: 0.5,
        }
    }
}

impl SearchParams {
    /// Parameters with every knob at its CLI default, for the given input.
    pub fn with_defaults(input: PathBuf) -> SearchParams {
        SearchParams {
            input,
            output_dir: PathBuf::from("./"),
            killfile: None,
            zapfile: None,
            max_threads: 14,
            fft_size: None,
            dm: Sweep {
                start: 0.0,
                end: 100.0,
                tol: 1.10,
                pulse_width: 64e-6,
            },
            acc: Sweep {
                start: 0.0,
                end: 0.0,
                tol: 1.10,
                pulse_width: 64e-3,
            },
            opts: SearchOpts::default(),
            fold_top: DEFAULT_FOLD_TOP,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transform_length_default_is_prev_pow2() {
        // prev_pow2(nsamps) ≤ size ≤ nsamps when no override is given.
        for nsamps in [1 << 14, (1 << 14) + 1, (1 << 15) - 1] {
            let size = transform_length(None, nsamps);
            assert!(size <= nsamps);
            assert!(size >= stats::prev_power_of_two(nsamps));
            assert!(size.is_power_of_two());
        }
    }

    #[test]
    fn test_transform_length_clamps_oversized_requests() {
        assert_eq!(transform_length(Some(1 << 20), 10_000), 10_000);
        assert_eq!(transform_length(Some(4096), 10_000), 4096);
    }
}
