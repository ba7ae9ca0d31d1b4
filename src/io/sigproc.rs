// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Reading and writing filterbank files.
//!
//! A filterbank is a tagged header followed by a block of byte-quantized
//! samples, one byte per channel per sample time, time-major. Header tags
//! are length-prefixed ASCII strings; values are big-endian and their types
//! are fixed per tag. Only 8-bit, single-IF data is supported.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Seek, Write};
use std::path::Path;

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use ndarray::{Array2, ArrayView2};
use thiserror::Error;

/// Longest tag or string value we are prepared to believe.
const MAX_HEADER_STRING: u32 = 128;

/// Observation metadata from a filterbank header. Immutable after load.
#[derive(Debug, Clone)]
pub struct FilterbankMetadata {
    pub source_name: Option<String>,
    pub machine_id: Option<i32>,
    pub telescope_id: Option<i32>,
    pub data_type: Option<i32>,
    /// MJD of the first sample.
    pub tstart: Option<f64>,
    /// Sample period [s].
    pub tsamp: f64,
    /// Frequency of the first channel [MHz].
    pub fch1: f64,
    /// Channel spacing [MHz]; negative when the first channel is the
    /// highest.
    pub foff: f64,
    pub nchans: usize,
    pub nbits: u32,
    pub nifs: usize,
    /// Number of sample times, derived from the data block length.
    pub nsamps: usize,
}

impl FilterbankMetadata {
    /// Centre frequency of the band [MHz].
    pub fn cfreq(&self) -> f64 {
        self.fch1 + self.foff * (self.nchans as f64 - 1.0) / 2.0
    }

    /// Total bandwidth [MHz].
    pub fn bandwidth(&self) -> f64 {
        self.foff.abs() * self.nchans as f64
    }

    /// Centre frequency of channel `i` [MHz].
    pub fn channel_freq(&self, i: usize) -> f64 {
        self.fch1 + i as f64 * self.foff
    }
}

/// A filterbank observation held in memory.
#[derive(Debug)]
pub struct Filterbank {
    pub metadata: FilterbankMetadata,
    /// Sample block, shape `(nchans, nsamps)`.
    pub data: Array2<u8>,
}

#[derive(Error, Debug)]
pub enum FilterbankReadError {
    #[error("When reading {file}, expected the header to open with HEADER_START, got '{got}' instead")]
    Magic { file: String, got: String },

    #[error("When reading {file}, found an unsupported header tag '{key}'")]
    UnknownKey { file: String, key: String },

    #[error("When reading {file}, found a header string of implausible length {len}")]
    BadStringLength { file: String, len: u32 },

    #[error("When reading {file}, found a header string that wasn't UTF-8")]
    NotUtf8 { file: String },

    #[error("{file} is missing the required header tag '{key}'")]
    MissingKey { file: String, key: &'static str },

    #[error("{file} has {nbits}-bit samples; only 8-bit data is supported")]
    UnsupportedNbits { file: String, nbits: u32 },

    #[error("{file} has {nifs} IFs; only single-IF data is supported")]
    UnsupportedNifs { file: String, nifs: usize },

    #[error("{file} reports zero channels")]
    NoChannels { file: String },

    #[error("{file} holds no complete samples after the header")]
    Empty { file: String },

    #[error(transparent)]
    IO(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum FilterbankWriteError {
    #[error("Sample block shape {rows}x{cols} does not match nchans {nchans}")]
    ShapeMismatch {
        rows: usize,
        cols: usize,
        nchans: usize,
    },

    #[error(transparent)]
    IO(#[from] std::io::Error),
}

fn read_string(
    r: &mut impl Read,
    file: &str,
) -> Result<String, FilterbankReadError> {
    let len = r.read_u32::<BigEndian>()?;
    if len == 0 || len > MAX_HEADER_STRING {
        return Err(FilterbankReadError::BadStringLength {
            file: file.to_string(),
            len,
        });
    }
    let mut buf = vec![0; len as usize];
    r.read_exact(&mut buf)?;
    String::from_utf8(buf).map_err(|_| FilterbankReadError::NotUtf8 {
        file: file.to_string(),
    })
}

/// Read a filterbank file into memory.
pub fn read(path: &Path) -> Result<Filterbank, FilterbankReadError> {
    let file_str = path.display().to_string();
    let mut rdr = BufReader::new(File::open(path)?);

    let magic = read_string(&mut rdr, &file_str)?;
    if magic != "HEADER_START" {
        return Err(FilterbankReadError::Magic {
            file: file_str,
            got: magic,
        });
    }

    let mut source_name = None;
    let mut machine_id = None;
    let mut telescope_id = None;
    let mut data_type = None;
    let mut tstart = None;
    let mut tsamp = None;
    let mut fch1 = None;
    let mut foff = None;
    let mut nchans = None;
    let mut nbits = None;
    let mut nifs = None;

    loop {
        let key = read_string(&mut rdr, &file_str)?;
        match key.as_str() {
            "HEADER_END" => break,
            "source_name" => source_name = Some(read_string(&mut rdr, &file_str)?),
            "machine_id" => machine_id = Some(rdr.read_i32::<BigEndian>()?),
            "telescope_id" => telescope_id = Some(rdr.read_i32::<BigEndian>()?),
            "data_type" => data_type = Some(rdr.read_i32::<BigEndian>()?),
            "tstart" => tstart = Some(rdr.read_f64::<BigEndian>()?),
            "tsamp" => tsamp = Some(rdr.read_f64::<BigEndian>()?),
            "fch1" => fch1 = Some(rdr.read_f64::<BigEndian>()?),
            "foff" => foff = Some(rdr.read_f64::<BigEndian>()?),
            "nchans" => nchans = Some(rdr.read_i32::<BigEndian>()? as usize),
            "nbits" => nbits = Some(rdr.read_i32::<BigEndian>()? as u32),
            "nifs" => nifs = Some(rdr.read_i32::<BigEndian>()? as usize),
            // The payload length of an unrecognised tag is unknowable, so
            // nothing after it can be trusted.
            _ => {
                return Err(FilterbankReadError::UnknownKey {
                    file: file_str,
                    key,
                })
            }
        }
    }

    let missing = |key| FilterbankReadError::MissingKey {
        file: file_str.clone(),
        key,
    };
    let tsamp = tsamp.ok_or_else(|| missing("tsamp"))?;
    let fch1 = fch1.ok_or_else(|| missing("fch1"))?;
    let foff = foff.ok_or_else(|| missing("foff"))?;
    let nchans = nchans.ok_or_else(|| missing("nchans"))?;
    if nchans == 0 {
        return Err(FilterbankReadError::NoChannels { file: file_str });
    }
    let nbits = nbits.unwrap_or(8);
    let nifs = nifs.unwrap_or(1);
    if nbits != 8 {
        return Err(FilterbankReadError::UnsupportedNbits {
            file: file_str,
            nbits,
        });
    }
    if nifs != 1 {
        return Err(FilterbankReadError::UnsupportedNifs {
            file: file_str,
            nifs,
        });
    }

    // The sample count isn't in the header; it's whatever is left in the
    // file.
    let header_len = rdr.stream_position()?;
    let file_len = rdr.get_ref().metadata()?.len();
    let nsamps = ((file_len - header_len) / nchans as u64) as usize;
    if nsamps == 0 {
        return Err(FilterbankReadError::Empty { file: file_str });
    }

    let mut raw = vec![0; nsamps * nchans];
    rdr.read_exact(&mut raw)?;

    // On disk the block is time-major; in memory we want channel-major so
    // that dedispersion walks contiguous rows.
    let data = Array2::from_shape_vec((nsamps, nchans), raw)
        .expect("vec length matches shape")
        .reversed_axes()
        .as_standard_layout()
        .to_owned();

    Ok(Filterbank {
        metadata: FilterbankMetadata {
            source_name,
            machine_id,
            telescope_id,
            data_type,
            tstart,
            tsamp,
            fch1,
            foff,
            nchans,
            nbits,
            nifs,
            nsamps,
        },
        data,
    })
}

fn write_string(w: &mut impl Write, s: &str) -> Result<(), std::io::Error> {
    w.write_u32::<BigEndian>(s.len() as u32)?;
    w.write_all(s.as_bytes())
}

/// Write a filterbank file. `data` has shape `(nchans, nsamps)`.
pub fn write(
    path: &Path,
    metadata: &FilterbankMetadata,
    data: ArrayView2<u8>,
) -> Result<(), FilterbankWriteError> {
    let (rows, cols) = data.dim();
    if rows != metadata.nchans {
        return Err(FilterbankWriteError::ShapeMismatch {
            rows,
            cols,
            nchans: metadata.nchans,
        });
    }

    let mut w = BufWriter::new(File::create(path)?);
    write_string(&mut w, "HEADER_START")?;
    if let Some(name) = &metadata.source_name {
        write_string(&mut w, "source_name")?;
        write_string(&mut w, name)?;
    }
    if let Some(id) = metadata.machine_id {
        write_string(&mut w, "machine_id")?;
        w.write_i32::<BigEndian>(id)?;
    }
    if let Some(id) = metadata.telescope_id {
        write_string(&mut w, "telescope_id")?;
        w.write_i32::<BigEndian>(id)?;
    }
    if let Some(dt) = metadata.data_type {
        write_string(&mut w, "data_type")?;
        w.write_i32::<BigEndian>(dt)?;
    }
    if let Some(t) = metadata.tstart {
        write_string(&mut w, "tstart")?;
        w.write_f64::<BigEndian>(t)?;
    }
    write_string(&mut w, "tsamp")?;
    w.write_f64::<BigEndian>(metadata.tsamp)?;
    write_string(&mut w, "fch1")?;
    w.write_f64::<BigEndian>(metadata.fch1)?;
    write_string(&mut w, "foff")?;
    w.write_f64::<BigEndian>(metadata.foff)?;
    write_string(&mut w, "nchans")?;
    w.write_i32::<BigEndian>(metadata.nchans as i32)?;
    write_string(&mut w, "nbits")?;
    w.write_i32::<BigEndian>(8)?;
    write_string(&mut w, "nifs")?;
    w.write_i32::<BigEndian>(1)?;
    write_string(&mut w, "HEADER_END")?;

    for t in 0..cols {
        for ch in 0..rows {
            w.write_u8(data[(ch, t)])?;
        }
    }
    w.flush()?;
    Ok(())
}
