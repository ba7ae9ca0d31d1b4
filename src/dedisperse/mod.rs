// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Incoherent dedispersion: the prior stage that turns a filterbank into
//! the byte-quantized DM trials the search consumes.

use log::debug;
use ndarray::Array2;
use rayon::prelude::*;
use vec1::{vec1, Vec1};

use crate::constants::DM_CONST;
use crate::data::trials::DispersionTrials;
use crate::io::sigproc::Filterbank;

/// Generate a trial DM list from `dm_start` to `dm_end` whose geometric
/// step keeps the smearing from the DM mismatch within `tol` at a pulse of
/// `pulse_width_us`. This is Lina Levin's stepping scheme; the working
/// units are microseconds.
pub fn generate_dm_list(
    dm_start: f64,
    dm_end: f64,
    tol: f64,
    pulse_width_us: f64,
    tsamp: f64,
    cfreq: f64,
    foff: f64,
    nchans: usize,
) -> Vec1<f64> {
    let mut dms = vec1![dm_start];
    if dm_end <= dm_start {
        return dms;
    }
    // A single channel (or zero spacing) contributes no differential
    // delay; any DM looks the same, so only the endpoints are searched.
    if foff == 0.0 || nchans < 2 {
        dms.push(dm_end);
        return dms;
    }

    let f_ghz = cfreq * 1e-3;
    let dt = tsamp * 1e6;
    let tol2 = tol * tol;
    // Smearing per unit DM across one channel [µs].
    let a = 8.3 * foff.abs() / (f_ghz * f_ghz * f_ghz);
    let a2 = a * a;
    let b2 = a2 * (nchans * nchans) as f64 / 16.0;
    let c = (dt * dt + pulse_width_us * pulse_width_us) * (tol2 - 1.0);

    loop {
        let dm = *dms.last();
        if dm >= dm_end {
            break;
        }
        let k = c + tol2 * a2 * dm * dm;
        let next = (b2 * dm + ((a2 + b2) * k - a2 * b2 * dm * dm).sqrt()) / (a2 + b2);
        dms.push(next.min(dm_end));
    }
    dms
}

/// Shift-and-sum dedisperser over an in-memory filterbank.
pub struct Dedisperser<'a> {
    filterbank: &'a Filterbank,
    dm_list: Vec1<f64>,
    /// `true` marks a channel excluded from the sum.
    kill_mask: Vec<bool>,
}

impl<'a> Dedisperser<'a> {
    pub fn new(filterbank: &'a Filterbank, dm_list: Vec1<f64>) -> Dedisperser<'a> {
        Dedisperser {
            filterbank,
            dm_list,
            kill_mask: vec![false; filterbank.metadata.nchans],
        }
    }

    pub fn dm_list(&self) -> &Vec1<f64> {
        &self.dm_list
    }

    pub fn set_kill_mask(&mut self, mask: Vec<bool>) {
        assert_eq!(mask.len(), self.filterbank.metadata.nchans);
        self.kill_mask = mask;
    }

    /// Dispersion delay of channel `ch` relative to the highest-frequency
    /// channel, in whole samples.
    fn delay_samples(&self, dm: f64, ch: usize) -> usize {
        let meta = &self.filterbank.metadata;
        let f_ch = meta.channel_freq(ch);
        let f_ref = if meta.foff < 0.0 {
            meta.channel_freq(0)
        } else {
            meta.channel_freq(meta.nchans - 1)
        };
        let delay = *DM_CONST * dm * (f_ch.powi(-2) - f_ref.powi(-2));
        (delay / meta.tsamp).round() as usize
    }

    /// Largest delay over all channels at DM `dm`.
    pub fn max_delay(&self, dm: f64) -> usize {
        (0..self.filterbank.metadata.nchans)
            .map(|ch| self.delay_samples(dm, ch))
            .max()
            .unwrap_or(0)
    }

    /// Dedisperse every trial DM, parallel over trials. Trial time series
    /// are truncated to a common length `nsamps - max_delay(dm_end)` and
    /// byte-quantized as the mean over unmasked channels.
    pub fn dedisperse(&self) -> DispersionTrials {
        let meta = &self.filterbank.metadata;
        let max_delay = self.max_delay(*self.dm_list.last());
        let nt = meta.nsamps.saturating_sub(max_delay).max(1);
        debug!(
            "Dedispersing {} trials; max delay {} samples, trial length {}",
            self.dm_list.len(),
            max_delay,
            nt
        );

        let live: Vec<usize> = (0..meta.nchans)
            .filter(|&ch| !self.kill_mask[ch])
            .collect();
        let norm = 1.0 / live.len() as f64;

        let mut out = Array2::zeros((self.dm_list.len(), nt));
        out.outer_iter_mut()
            .into_par_iter()
            .zip(self.dm_list.as_slice().par_iter())
            .for_each(|(mut row, &dm)| {
                let mut acc = vec![0u32; nt];
                for &ch in &live {
                    let delay = self.delay_samples(dm, ch);
                    let chan = self.filterbank.data.row(ch);
                    let chan = chan.as_slice().expect("channel rows are contiguous");
                    for (a, &s) in acc.iter_mut().zip(&chan[delay..delay + nt]) {
                        *a += u32::from(s);
                    }
                }
                for (r, &a) in row.iter_mut().zip(&acc) {
                    *r = (f64::from(a) * norm).round() as u8;
                }
            });

        DispersionTrials::new(out, self.dm_list.clone(), meta.tsamp)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use ndarray::Array2;

    use super::*;
    use crate::io::sigproc::FilterbankMetadata;

    fn metadata(nchans: usize, nsamps: usize) -> FilterbankMetadata {
        FilterbankMetadata {
            source_name: None,
            machine_id: None,
            telescope_id: None,
            data_type: None,
            tstart: None,
            tsamp: 64e-6,
            fch1: 1500.0,
            foff: -10.0,
            nchans,
            nbits: 8,
            nifs: 1,
            nsamps,
        }
    }

    #[test]
    fn test_dm_list_is_strictly_increasing_and_inclusive() {
        let dms = generate_dm_list(0.0, 100.0, 1.10, 64.0, 64e-6, 1400.0, -10.0, 16);
        assert_abs_diff_eq!(*dms.first(), 0.0);
        assert_abs_diff_eq!(*dms.last(), 100.0);
        assert!(dms.as_slice().windows(2).all(|w| w[0] < w[1]));
        // The step grows with DM.
        let first_step = dms[1] - dms[0];
        let last_step = *dms.last() - dms[dms.len() - 2];
        assert!(last_step >= first_step);
    }

    #[test]
    fn test_dm_list_degenerate_sweep() {
        let dms = generate_dm_list(5.0, 5.0, 1.10, 64.0, 64e-6, 1400.0, -10.0, 16);
        assert_eq!(dms.len(), 1);
        assert_abs_diff_eq!(*dms.first(), 5.0);
    }

    #[test]
    fn test_zero_dm_passthrough() {
        // At DM 0 every channel is aligned; the trial is the channel mean.
        let nchans = 4;
        let nsamps = 16;
        let mut data = Array2::zeros((nchans, nsamps));
        for ch in 0..nchans {
            for t in 0..nsamps {
                data[(ch, t)] = (t * 10 + ch) as u8;
            }
        }
        let fb = Filterbank {
            metadata: metadata(nchans, nsamps),
            data,
        };
        let dd = Dedisperser::new(&fb, vec1![0.0]);
        let trials = dd.dedisperse();
        assert_eq!(trials.count(), 1);
        assert_eq!(trials.nsamps(), nsamps);
        let row = trials.trial(0);
        for t in 0..nsamps {
            // Mean of t*10 + {0,1,2,3} rounds to t*10 + 2.
            assert_eq!(row[t], (t * 10 + 2) as u8);
        }
    }

    #[test]
    fn test_delay_shifts_align_a_dispersed_pulse() {
        // A pulse injected with the dispersion delays of DM 50 should line
        // up exactly when dedispersed at DM 50.
        let nchans = 8;
        let nsamps = 4096;
        let meta = metadata(nchans, nsamps);
        let dm = 50.0;

        let mut data = Array2::from_elem((nchans, nsamps), 10u8);
        let f_ref = meta.channel_freq(0);
        let pulse_t = 100;
        for ch in 0..nchans {
            let f_ch = meta.channel_freq(ch);
            let delay = *DM_CONST * dm * (f_ch.powi(-2) - f_ref.powi(-2));
            let shift = (delay / meta.tsamp).round() as usize;
            data[(ch, pulse_t + shift)] = 250;
        }
        let fb = Filterbank {
            metadata: meta,
            data,
        };

        let dd = Dedisperser::new(&fb, vec1![0.0, dm]);
        let trials = dd.dedisperse();

        // At the right DM the pulse sums coherently...
        let aligned = trials.trial(1);
        assert_eq!(aligned[pulse_t], 250);
        // ...while at DM 0 it is spread across channels.
        let spread = trials.trial(0);
        assert!(spread[pulse_t] < 60);
    }

    #[test]
    fn test_kill_mask_excludes_channels() {
        let nchans = 2;
        let nsamps = 8;
        let mut data = Array2::zeros((nchans, nsamps));
        data.row_mut(0).fill(100);
        data.row_mut(1).fill(200);
        let fb = Filterbank {
            metadata: metadata(nchans, nsamps),
            data,
        };
        let mut dd = Dedisperser::new(&fb, vec1![0.0]);
        dd.set_kill_mask(vec![false, true]);
        let trials = dd.dedisperse();
        assert!(trials.trial(0).iter().all(|&x| x == 100));
    }
}
