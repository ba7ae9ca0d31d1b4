// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Birdie zapping: zero the complex bins covering known narrow-band
//! interference so both amplitude and phase are suppressed.

use std::path::Path;

use num_complex::Complex32;

use crate::data::series::FourierSeries;
use crate::io::masks::{read_zap_list, Birdie, ZapfileError};

pub struct BirdieZapper {
    birdies: Vec<Birdie>,
}

impl BirdieZapper {
    pub fn new(birdies: Vec<Birdie>) -> BirdieZapper {
        BirdieZapper { birdies }
    }

    pub fn from_file(path: &Path) -> Result<BirdieZapper, ZapfileError> {
        Ok(BirdieZapper::new(read_zap_list(path)?))
    }

    pub fn len(&self) -> usize {
        self.birdies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.birdies.is_empty()
    }

    /// Zero every bin within `[freq - width/2, freq + width/2]` of each
    /// birdie.
    pub fn zap(&self, fseries: &mut FourierSeries) {
        let bw = fseries.bin_width;
        let n = fseries.data.len();
        for b in &self.birdies {
            let lo = (((b.freq - b.width / 2.0) / bw).ceil().max(0.0)) as usize;
            let hi = (((b.freq + b.width / 2.0) / bw).floor().max(0.0)) as usize;
            // A width narrower than one bin still kills the nearest bin.
            let (lo, hi) = if lo > hi {
                let k = (b.freq / bw).round() as usize;
                (k, k)
            } else {
                (lo, hi)
            };
            if lo >= n {
                continue;
            }
            for bin in fseries.data[lo..=hi.min(n - 1)].iter_mut() {
                *bin = Complex32::default();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_series(nbins: usize, bin_width: f64) -> FourierSeries {
        let mut f = FourierSeries::new(nbins, bin_width);
        f.data.fill(Complex32::new(1.0, 1.0));
        f
    }

    #[test]
    fn test_zap_window() {
        let mut f = unit_series(100, 1.0);
        let zapper = BirdieZapper::new(vec![Birdie {
            freq: 50.0,
            width: 4.0,
        }]);
        zapper.zap(&mut f);
        for (k, bin) in f.data.iter().enumerate() {
            if (48..=52).contains(&k) {
                assert_eq!(bin.norm_sqr(), 0.0, "bin {k} should be zapped");
            } else {
                assert!(bin.norm_sqr() > 0.0, "bin {k} should survive");
            }
        }
    }

    #[test]
    fn test_narrow_birdie_kills_nearest_bin() {
        let mut f = unit_series(100, 1.0);
        let zapper = BirdieZapper::new(vec![Birdie {
            freq: 60.2,
            width: 0.1,
        }]);
        zapper.zap(&mut f);
        assert_eq!(f.data[60].norm_sqr(), 0.0);
        assert!(f.data[59].norm_sqr() > 0.0);
        assert!(f.data[61].norm_sqr() > 0.0);
    }

    #[test]
    fn test_birdie_beyond_nyquist_is_ignored() {
        let mut f = unit_series(100, 1.0);
        let zapper = BirdieZapper::new(vec![Birdie {
            freq: 500.0,
            width: 10.0,
        }]);
        zapper.zap(&mut f);
        assert!(f.data.iter().all(|b| b.norm_sqr() > 0.0));
    }
}
