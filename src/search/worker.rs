// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The per-thread search worker: owns one set of transform plans and
//! sample buffers, and drains DM trials from the dispenser until none are
//! left.

use crossbeam_utils::atomic::AtomicCell;
use log::{debug, trace};
use thiserror::Error;

use crate::data::candidates::CandidateCollection;
use crate::data::series::{FourierSeries, HarmonicStack, PowerSpectrum, TimeSeries};
use crate::data::trials::DispersionTrials;
use crate::search::dispenser::TrialDispenser;
use crate::search::plan::AccelerationPlan;
use crate::stats;
use crate::transforms::distill::{AccelerationDistiller, HarmonicDistiller};
use crate::transforms::fft::{FftError, FftPair};
use crate::transforms::harmonics;
use crate::transforms::peaks::{PeakFinder, TrialInfo};
use crate::transforms::rednoise::Dereddener;
use crate::transforms::resampler;
use crate::transforms::spectrum;
use crate::transforms::zapper::BirdieZapper;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("{0}")]
    Fft(#[from] FftError),
}

/// Detection thresholds and pipeline knobs shared by all workers.
#[derive(Debug, Clone)]
pub struct SearchOpts {
    /// Number of harmonic-sum levels.
    pub nharmonics: usize,
    pub min_snr: f32,
    /// Lowest Fourier frequency to consider [Hz].
    pub min_freq: f64,
    /// Highest Fourier frequency to consider [Hz].
    pub max_freq: f64,
    /// Relative tolerance for distilling frequencies.
    pub freq_tol: f64,
    /// Maximum harmonic number for relating candidates.
    pub max_harm: u32,
    /// Below this frequency [Hz] the width-5 median estimates the noise.
    pub boundary_5_freq: f64,
    /// Below this frequency [Hz] the width-25 median estimates the noise.
    pub boundary_25_freq: f64,
}

pub struct Worker<'a> {
    pub trials: &'a DispersionTrials,
    pub dispenser: &'a TrialDispenser,
    pub acc_plan: &'a AccelerationPlan,
    /// Wired only when a zap list was supplied.
    pub zapper: Option<&'a BirdieZapper>,
    pub opts: &'a SearchOpts,
    /// Raised when a sibling worker dies; drains this worker early.
    pub abort: &'a AtomicCell<bool>,
    /// Transform length.
    pub size: usize,
    pub id: usize,
}

impl Worker<'_> {
    /// Drain the dispenser, running the full per-trial pipeline on every
    /// acquired DM index. Returns this worker's candidates.
    pub fn run(&self) -> Result<CandidateCollection, PipelineError> {
        let size = self.size;
        let nbins = size / 2 + 1;
        let tsamp = self.trials.tsamp();
        let bin_width = 1.0 / (size as f64 * tsamp);

        // Buffers and plans live for the whole thread; every trial reuses
        // them.
        let mut fft = FftPair::new(size);
        let mut tim = TimeSeries::new(size, tsamp);
        let mut tim_r = TimeSeries::new(size, tsamp);
        let mut fseries = FourierSeries::new(nbins, bin_width);
        let mut pspec = PowerSpectrum::new(nbins, bin_width);
        let mut sums = HarmonicStack::new(nbins, self.opts.nharmonics, bin_width);
        let mut rednoise =
            Dereddener::new(nbins, self.opts.boundary_5_freq, self.opts.boundary_25_freq);
        let peak_finder =
            PeakFinder::new(self.opts.min_snr, self.opts.min_freq, self.opts.max_freq);
        let harm_distiller = HarmonicDistiller::new(self.opts.freq_tol, self.opts.max_harm);
        let acc_distiller = AccelerationDistiller::new(self.opts.freq_tol);

        let mut bytes: Vec<u8> = vec![];
        let mut collection = CandidateCollection::default();

        while let Some(idx) = self.dispenser.acquire() {
            if self.abort.load() {
                break;
            }
            let dm = self.trials.read_into(idx, &mut bytes);
            debug!("Worker {}: DM trial {idx} (DM {dm:.3})", self.id);

            let copied = tim.fill_from_bytes(&bytes);
            if copied < size {
                trace!("Worker {}: padding {} samples", self.id, size - copied);
                tim.pad_from_mean(copied);
            }

            let acc_list = self.acc_plan.generate(dm);
            trace!(
                "Worker {}: {} acceleration trials at DM {dm:.3}",
                self.id,
                acc_list.len()
            );

            fft.forward(&mut tim.data, &mut fseries.data)?;
            spectrum::form(&fseries, &mut pspec);
            rednoise.calculate_median(&pspec);
            rednoise.deredden(&mut fseries);
            if let Some(zapper) = self.zapper {
                zapper.zap(&mut fseries);
            }
            spectrum::form_interpolated(&fseries, &mut pspec);

            // Frozen for the DM: zapping and dereddening have already
            // happened, and resampling preserves the norm.
            let (mean, std) = stats::mean_and_std(&pspec.data);

            // Cache the cleaned time series; every acceleration trial
            // resamples from it.
            fft.inverse(&mut fseries.data, &mut tim.data)?;

            let mut accel_trial_cands = vec![];
            for &acc in acc_list.iter() {
                trace!("Worker {}: resampling to {acc} m/s²", self.id);
                resampler::resample(&tim.data, &mut tim_r.data, acc, tsamp);
                fft.forward(&mut tim_r.data, &mut fseries.data)?;
                spectrum::form_interpolated(&fseries, &mut pspec);
                stats::normalise(&mut pspec.data, mean, std);
                harmonics::fold(&pspec, &mut sums);

                let trial = TrialInfo { dm, dm_idx: idx, acc };
                let mut trial_cands = vec![];
                peak_finder.find_candidates(&pspec.data, bin_width, 1, trial, &mut trial_cands);
                for (nh, level) in sums.iter() {
                    peak_finder.find_candidates(level, bin_width, nh, trial, &mut trial_cands);
                }
                accel_trial_cands.extend(harm_distiller.distill(trial_cands, bin_width));
            }
            collection.append(acc_distiller.distill(accel_trial_cands, bin_width));
        }

        debug!(
            "Worker {}: finished with {} candidates",
            self.id,
            collection.len()
        );
        Ok(collection)
    }
}

#[cfg(test)]
mod tests {
    use ndarray::Array2;
    use rand::{rngs::StdRng, Rng, SeedableRng};
    use vec1::vec1;

    use super::*;

    fn gaussian(rng: &mut StdRng) -> f64 {
        // Box-Muller is plenty for test noise.
        let u1: f64 = rng.gen_range(f64::EPSILON..1.0);
        let u2: f64 = rng.gen_range(0.0..1.0);
        (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos()
    }

    fn synthetic_trials(nsamps: usize, tsamp: f64, f0: f64, amp: f64) -> DispersionTrials {
        let mut rng = StdRng::seed_from_u64(5);
        let mut data = Array2::zeros((1, nsamps));
        for (t, x) in data.row_mut(0).iter_mut().enumerate() {
            let signal = amp * (std::f64::consts::TAU * f0 * t as f64 * tsamp).sin();
            *x = (128.5 + signal + 5.0 * gaussian(&mut rng)).clamp(0.0, 255.0) as u8;
        }
        DispersionTrials::new(data, vec1![0.0], tsamp)
    }

    fn opts() -> SearchOpts {
        SearchOpts {
            nharmonics: 4,
            min_snr: 13.0,
            min_freq: 1.0,
            max_freq: 499.0,
            freq_tol: 1e-4,
            max_harm: 16,
            boundary_5_freq: 0.05,
            boundary_25_freq: 0.5,
        }
    }

    #[test]
    fn test_worker_recovers_an_injected_tone() {
        let size = 8192;
        let tsamp = 1e-3;
        let bin_width = 1.0 / (size as f64 * tsamp);
        // Put the tone exactly on a bin so there is no leakage to worry
        // about.
        let f0 = 700.0 * bin_width;

        let trials = synthetic_trials(size, tsamp, f0, 20.0);
        let dispenser = TrialDispenser::new(trials.count());
        let acc_plan = AccelerationPlan::new(0.0, 0.0, 1.10, 64e-3, size, tsamp, 1400.0, -10.0);
        let opts = opts();
        let abort = AtomicCell::new(false);
        let worker = Worker {
            trials: &trials,
            dispenser: &dispenser,
            acc_plan: &acc_plan,
            zapper: None,
            opts: &opts,
            abort: &abort,
            size,
            id: 0,
        };

        let collection = worker.run().unwrap();
        assert!(!collection.is_empty(), "the tone was not detected");

        // The strongest candidate is the distilled fundamental.
        let best = collection
            .cands
            .iter()
            .max_by(|a, b| a.snr.partial_cmp(&b.snr).unwrap())
            .unwrap();
        assert!(
            (best.freq - f0).abs() <= bin_width,
            "best candidate at {} Hz, expected {} Hz",
            best.freq,
            f0
        );
        assert!(best.snr > 13.0);
        assert_eq!(best.dm_idx, 0);
    }

    #[test]
    fn test_worker_recovers_an_accelerating_tone() {
        let size = 8192;
        let tsamp = 1e-3;
        let bin_width = 1.0 / (size as f64 * tsamp);
        let f0 = 700.0 * bin_width;
        // Chosen so the tone drifts ~10 bins over the buffer: invisible
        // to a zero-acceleration search, sharp when resampled correctly.
        let accel = 5.2e5;
        let fact = accel * tsamp / (2.0 * 299_792_458.0);

        let mut rng = StdRng::seed_from_u64(11);
        let mut data = Array2::zeros((1, size));
        for (j, x) in data.row_mut(0).iter_mut().enumerate() {
            // The resampler reads source position i + fact·i²; emit the
            // tone at the inverse warp so that resampling at `accel`
            // makes it stationary.
            let i = (-1.0 + (1.0 + 4.0 * fact * j as f64).sqrt()) / (2.0 * fact);
            let signal = 20.0 * (std::f64::consts::TAU * f0 * i * tsamp).sin();
            *x = (128.5 + signal + 5.0 * gaussian(&mut rng)).clamp(0.0, 255.0) as u8;
        }
        let trials = DispersionTrials::new(data, vec1![0.0], tsamp);

        let dispenser = TrialDispenser::new(trials.count());
        let acc_plan =
            AccelerationPlan::new(0.0, 6.5e5, 1.10, 64e-3, size, tsamp, 1400.0, -10.0);
        let plan_step = acc_plan.generate(0.0)[1] - acc_plan.generate(0.0)[0];
        let opts = opts();
        let abort = AtomicCell::new(false);
        let worker = Worker {
            trials: &trials,
            dispenser: &dispenser,
            acc_plan: &acc_plan,
            zapper: None,
            opts: &opts,
            abort: &abort,
            size,
            id: 0,
        };

        let collection = worker.run().unwrap();
        assert!(!collection.is_empty(), "the accelerating tone was lost");
        let best = collection
            .cands
            .iter()
            .max_by(|a, b| a.snr.partial_cmp(&b.snr).unwrap())
            .unwrap();
        assert!(
            (best.freq - f0).abs() <= 2.0 * bin_width,
            "best candidate at {} Hz, expected {} Hz",
            best.freq,
            f0
        );
        assert!(
            (best.acc - accel).abs() <= plan_step,
            "best acceleration {} more than one plan step from {}",
            best.acc,
            accel
        );
    }

    #[test]
    fn test_worker_handles_pure_noise() {
        let size = 8192;
        let tsamp = 1e-3;
        let trials = synthetic_trials(size, tsamp, 0.0, 0.0);
        let dispenser = TrialDispenser::new(trials.count());
        let acc_plan = AccelerationPlan::new(0.0, 0.0, 1.10, 64e-3, size, tsamp, 1400.0, -10.0);
        let opts = opts();
        let abort = AtomicCell::new(false);
        let worker = Worker {
            trials: &trials,
            dispenser: &dispenser,
            acc_plan: &acc_plan,
            zapper: None,
            opts: &opts,
            abort: &abort,
            size,
            id: 0,
        };

        let collection = worker.run().unwrap();
        // At a 13 sigma threshold nothing in 8k bins of noise survives.
        assert!(collection.is_empty());
    }
}
