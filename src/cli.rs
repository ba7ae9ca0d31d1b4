// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Command-line interface code. Arguments are validated and converted
//! into [`SearchParams`] before any work starts.

use std::path::PathBuf;

use clap::{AppSettings, Parser};
use log::info;
use thiserror::Error;

use crate::constants::DEFAULT_FOLD_TOP;
use crate::params::{SearchParams, Sweep};
use crate::search::worker::SearchOpts;
use crate::{SpindriftError, PROGRESS_BARS};

#[derive(Debug, Parser)]
#[clap(
    name = "spindrift",
    version,
    author,
    about = "A multi-threaded acceleration search for periodic signals in filterbank data"
)]
#[clap(global_setting(AppSettings::DeriveDisplayOrder))]
#[clap(infer_long_args = true)]
pub struct Spindrift {
    /// The filterbank file to process.
    #[clap(short = 'i', long = "inputfile")]
    input: PathBuf,

    /// The directory the candidate file is written into.
    #[clap(short = 'o', long = "outputdir", default_value = "./")]
    output_dir: PathBuf,

    /// Channel mask file: one channel index per line to exclude from
    /// dedispersion.
    #[clap(short = 'k', long = "killfile")]
    killfile: Option<PathBuf>,

    /// Birdie list file: one "<freq_hz> <width_hz>" pair per line to zap
    /// from every spectrum.
    #[clap(short = 'z', long = "zapfile")]
    zapfile: Option<PathBuf>,

    /// The maximum number of worker threads to use.
    #[clap(short = 't', long = "num_threads", default_value = "14")]
    num_threads: usize,

    /// Transform length to use (defaults to the largest power of two not
    /// exceeding the observation; larger requests are clamped).
    #[clap(long)]
    fft_size: Option<usize>,

    /// First DM to dedisperse to [pc cm⁻³].
    #[clap(long = "dm_start", default_value = "0.0")]
    dm_start: f64,

    /// Last DM to dedisperse to [pc cm⁻³].
    #[clap(long = "dm_end", default_value = "100.0")]
    dm_end: f64,

    /// DM smearing tolerance (1.11 = 11%).
    #[clap(long = "dm_tol", default_value = "1.10")]
    dm_tol: f64,

    /// Minimum pulse width for which dm_tol is valid [µs].
    #[clap(long = "dm_pulse_width", default_value = "64.0")]
    dm_pulse_width: f64,

    /// First acceleration to resample to [m/s²].
    #[clap(long = "acc_start", default_value = "0.0", allow_hyphen_values = true)]
    acc_start: f64,

    /// Last acceleration to resample to [m/s²].
    #[clap(long = "acc_end", default_value = "0.0", allow_hyphen_values = true)]
    acc_end: f64,

    /// Acceleration smearing tolerance (1.11 = 11%).
    #[clap(long = "acc_tol", default_value = "1.10")]
    acc_tol: f64,

    /// Minimum pulse width for which acc_tol is valid [ms].
    #[clap(long = "acc_pulse_width", default_value = "64.0")]
    acc_pulse_width: f64,

    /// Frequency at which to switch from the width-5 to the width-25
    /// running median [Hz].
    #[clap(long = "boundary_5_freq", default_value = "0.05")]
    boundary_5_freq: f64,

    /// Frequency at which to switch from the width-25 to the width-125
    /// running median [Hz].
    #[clap(long = "boundary_25_freq", default_value = "0.5")]
    boundary_25_freq: f64,

    /// Number of harmonic sums to perform.
    #[clap(short = 'n', long = "nharmonics", default_value = "4")]
    nharmonics: usize,

    /// The minimum S/N for a candidate.
    #[clap(short = 'm', long = "min_snr", default_value = "9.0")]
    min_snr: f32,

    /// Lowest Fourier frequency to consider [Hz].
    #[clap(long = "min_freq", default_value = "0.1")]
    min_freq: f64,

    /// Highest Fourier frequency to consider [Hz].
    #[clap(long = "max_freq", default_value = "1100.0")]
    max_freq: f64,

    /// Maximum harmonic number when matching related candidates.
    #[clap(long = "max_harm_match", default_value = "16")]
    max_harm: u32,

    /// Tolerance for distilling frequencies (0.0001 = 0.01%).
    #[clap(long = "freq_tol", default_value = "0.0001")]
    freq_tol: f64,

    /// The verbosity of the program. Increase by specifying multiple
    /// times (e.g. -vv).
    #[clap(short, long, parse(from_occurrences))]
    verbose: u8,

    /// Draw progress bars for the long stages.
    #[clap(short = 'p', long = "progress_bar")]
    progress_bar: bool,
}

#[derive(Error, Debug)]
pub enum InvalidArgsError {
    #[error("dm_end ({end}) must not be less than dm_start ({start})")]
    DmRange { start: f64, end: f64 },

    #[error("acc_end ({end}) must not be less than acc_start ({start})")]
    AccRange { start: f64, end: f64 },

    #[error("dm_tol must be greater than 1 (got {0})")]
    DmTol(f64),

    #[error("acc_tol must be greater than 1 (got {0})")]
    AccTol(f64),

    #[error("min_freq ({min}) must be positive and below max_freq ({max})")]
    FreqBand { min: f64, max: f64 },

    #[error("nharmonics must be between 1 and 8 (got {0})")]
    Harmonics(usize),

    #[error("max_harm_match must be nonzero")]
    ZeroMaxHarm,

    #[error("fft_size must be nonzero")]
    ZeroFftSize,
}

impl Spindrift {
    pub fn run(self) -> Result<(), SpindriftError> {
        setup_logging(self.verbose).expect("Failed to initialise logging.");
        if self.progress_bar {
            PROGRESS_BARS.store(true);
        }

        info!("spindrift {}", env!("CARGO_PKG_VERSION"));
        let params = self.into_params()?;
        params.run()?;
        info!("spindrift complete.");
        Ok(())
    }

    fn into_params(self) -> Result<SearchParams, InvalidArgsError> {
        if self.dm_end < self.dm_start {
            return Err(InvalidArgsError::DmRange {
                start: self.dm_start,
                end: self.dm_end,
            });
        }
        if self.acc_end < self.acc_start {
            return Err(InvalidArgsError::AccRange {
                start: self.acc_start,
                end: self.acc_end,
            });
        }
        if self.dm_tol <= 1.0 {
            return Err(InvalidArgsError::DmTol(self.dm_tol));
        }
        if self.acc_tol <= 1.0 {
            return Err(InvalidArgsError::AccTol(self.acc_tol));
        }
        if self.min_freq <= 0.0 || self.min_freq >= self.max_freq {
            return Err(InvalidArgsError::FreqBand {
                min: self.min_freq,
                max: self.max_freq,
            });
        }
        if self.nharmonics == 0 || self.nharmonics > 8 {
            return Err(InvalidArgsError::Harmonics(self.nharmonics));
        }
        if self.max_harm == 0 {
            return Err(InvalidArgsError::ZeroMaxHarm);
        }
        if self.fft_size == Some(0) {
            return Err(InvalidArgsError::ZeroFftSize);
        }

        Ok(SearchParams {
            input: self.input,
            output_dir: self.output_dir,
            killfile: self.killfile,
            zapfile: self.zapfile,
            max_threads: self.num_threads.max(1),
            fft_size: self.fft_size,
            dm: Sweep {
                start: self.dm_start,
                end: self.dm_end,
                tol: self.dm_tol,
                // Given in µs.
                pulse_width: self.dm_pulse_width * 1e-6,
            },
            acc: Sweep {
                start: self.acc_start,
                end: self.acc_end,
                tol: self.acc_tol,
                // Given in ms.
                pulse_width: self.acc_pulse_width * 1e-3,
            },
            opts: SearchOpts {
                nharmonics: self.nharmonics,
                min_snr: self.min_snr,
                min_freq: self.min_freq,
                max_freq: self.max_freq,
                freq_tol: self.freq_tol,
                max_harm: self.max_harm,
                boundary_5_freq: self.boundary_5_freq,
                boundary_25_freq: self.boundary_25_freq,
            },
            fold_top: DEFAULT_FOLD_TOP,
        })
    }
}

/// Activate a logger. All log messages are put onto `stdout`. `env_logger`
/// automatically only uses colours and fancy symbols if we're on a tty;
/// piped output will be formatted sensibly. Source code lines are
/// displayed in log messages when verbosity >= 3.
fn setup_logging(verbosity: u8) -> Result<(), log::SetLoggerError> {
    let mut builder = env_logger::Builder::from_default_env();
    builder.target(env_logger::Target::Stdout);
    builder.format_target(false);
    match verbosity {
        0 => builder.filter_level(log::LevelFilter::Info),
        1 => builder.filter_level(log::LevelFilter::Debug),
        2 => builder.filter_level(log::LevelFilter::Trace),
        _ => {
            builder.filter_level(log::LevelFilter::Trace);
            builder.format(|buf, record| {
                use std::io::Write;

                let timestamp = buf.timestamp();
                let level = record.level();
                let target = record.target();
                let line = record.line().unwrap_or(0);
                let message = record.args();

                writeln!(buf, "[{timestamp} {level} {target}:{line}] {message}")
            })
        }
    };
    builder.try_init()?;

    Ok(())
}
