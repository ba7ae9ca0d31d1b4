// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Search filterbank observations for accelerated periodic signals.

The pipeline dedisperses a filterbank into a set of DM trials, then a pool
of worker threads searches each trial in the Fourier domain over a plan of
trial accelerations, distilling the surviving spectrum peaks into a ranked
candidate list.
 */

pub mod cli;
pub mod constants;
pub mod data;
pub mod dedisperse;
pub mod io;
pub mod params;
pub mod search;
pub mod stats;
pub mod transforms;

mod error;

pub use error::SpindriftError;

use crossbeam_utils::atomic::AtomicCell;

/// Are progress bars being drawn? Set once by the CLI before any work
/// starts; read by anything that makes a [`indicatif::ProgressBar`].
pub(crate) static PROGRESS_BARS: AtomicCell<bool> = AtomicCell::new(false);
