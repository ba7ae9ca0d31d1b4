// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Channel kill masks and birdie zap lists.
//!
//! Both are plain text, one entry per line; blank lines and `#` comments
//! are ignored.

use std::fs::read_to_string;
use std::path::Path;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum KillfileError {
    #[error("{file} line {line}: '{text}' is not a channel index")]
    NotAChannel {
        file: String,
        line: usize,
        text: String,
    },

    #[error("{file} line {line}: channel {chan} is out of range (nchans {nchans})")]
    OutOfRange {
        file: String,
        line: usize,
        chan: usize,
        nchans: usize,
    },

    #[error("{file} kills all {nchans} channels; nothing left to search")]
    AllKilled { file: String, nchans: usize },

    #[error(transparent)]
    IO(#[from] std::io::Error),
}

/// Read a kill file into a per-channel mask; `true` means the channel is
/// excluded from dedispersion.
pub fn read_kill_mask(path: &Path, nchans: usize) -> Result<Vec<bool>, KillfileError> {
    let file_str = path.display().to_string();
    let mut mask = vec![false; nchans];
    for (i, line) in read_to_string(path)?.lines().enumerate() {
        let text = line.split('#').next().unwrap_or("").trim();
        if text.is_empty() {
            continue;
        }
        let chan: usize = text.parse().map_err(|_| KillfileError::NotAChannel {
            file: file_str.clone(),
            line: i + 1,
            text: text.to_string(),
        })?;
        if chan >= nchans {
            return Err(KillfileError::OutOfRange {
                file: file_str,
                line: i + 1,
                chan,
                nchans,
            });
        }
        mask[chan] = true;
    }
    if mask.iter().all(|&k| k) {
        return Err(KillfileError::AllKilled {
            file: file_str,
            nchans,
        });
    }
    Ok(mask)
}

/// A narrow-band interference line to be excised from the spectrum.
#[derive(Debug, Clone, Copy)]
pub struct Birdie {
    /// Centre frequency [Hz].
    pub freq: f64,
    /// Full width [Hz].
    pub width: f64,
}

#[derive(Error, Debug)]
pub enum ZapfileError {
    #[error("{file} line {line}: expected '<freq_hz> <width_hz>', got '{text}'")]
    Malformed {
        file: String,
        line: usize,
        text: String,
    },

    #[error(transparent)]
    IO(#[from] std::io::Error),
}

/// Read a zap file into a birdie list.
pub fn read_zap_list(path: &Path) -> Result<Vec<Birdie>, ZapfileError> {
    let file_str = path.display().to_string();
    let mut birdies = vec![];
    for (i, line) in read_to_string(path)?.lines().enumerate() {
        let text = line.split('#').next().unwrap_or("").trim();
        if text.is_empty() {
            continue;
        }
        let malformed = || ZapfileError::Malformed {
            file: file_str.clone(),
            line: i + 1,
            text: text.to_string(),
        };
        let mut fields = text.split_whitespace();
        let freq: f64 = fields
            .next()
            .and_then(|f| f.parse().ok())
            .ok_or_else(malformed)?;
        let width: f64 = fields
            .next()
            .and_then(|f| f.parse().ok())
            .ok_or_else(malformed)?;
        if fields.next().is_some() || freq < 0.0 || width < 0.0 {
            return Err(malformed());
        }
        birdies.push(Birdie { freq, width });
    }
    Ok(birdies)
}
