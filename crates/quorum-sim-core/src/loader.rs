//! Ingestion of externally computed scalar fields.
//!
//! A field file is plain text with one `x,y,z,value` record per line. Coordinates are
//! multiplied by a length scale before the nearest-voxel lookup and the value
//! overwrites one channel of that voxel; later records win over earlier ones.
//!
//! Loads are all-or-nothing: every record is parsed before the grid is written, so a
//! malformed line leaves the grid exactly as it was.

use crate::field::{ChannelIndex, VoxelGrid};
use std::collections::HashSet;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

pub(crate) const RECORD_FIELDS: usize = 4;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RecordError {
    #[error("expected 4 fields, found {0}")]
    FieldCount(usize),
    #[error("field {index} ({text:?}) is not a number")]
    NotNumeric { index: usize, text: String },
    #[error("field {index} is not finite")]
    NotFinite { index: usize },
}

#[derive(Debug, Error)]
pub enum FieldLoadError {
    #[error("failed to open field file {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to read field data at line {line}: {source}")]
    Read {
        line: usize,
        #[source]
        source: io::Error,
    },
    #[error("malformed field record at line {line}: {reason}")]
    Malformed { line: usize, reason: RecordError },
    #[error("length scale must be positive and finite, got {0}")]
    InvalidLengthScale(f64),
    #[error("channel slot {channel} is out of range for a grid with {channels} channels")]
    ChannelOutOfRange { channel: usize, channels: usize },
}

/// One parsed line, coordinates still in file units.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FieldRecord {
    pub position: [f64; 3],
    pub value: f64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LoadSummary {
    /// Records applied, including ones overwritten by later records.
    pub records: usize,
    /// Distinct voxels written.
    pub voxels_written: usize,
}

/// Split one line into exactly four fields. Blank lines yield `Ok(None)`.
///
/// Fields are comma separated; a line without commas may separate them with whitespace.
pub(crate) fn split_record(line: &str) -> Result<Option<[&str; RECORD_FIELDS]>, RecordError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let fields: Vec<&str> = if line.contains(',') {
        line.split(',').map(str::trim).collect()
    } else {
        line.split_whitespace().collect()
    };
    <[&str; RECORD_FIELDS]>::try_from(fields.as_slice())
        .map(Some)
        .map_err(|_| RecordError::FieldCount(fields.len()))
}

/// Parse field `index` of a record as a finite number.
pub(crate) fn parse_number(index: usize, text: &str) -> Result<f64, RecordError> {
    let value: f64 = text.parse().map_err(|_| RecordError::NotNumeric {
        index,
        text: text.to_string(),
    })?;
    if !value.is_finite() {
        return Err(RecordError::NotFinite { index });
    }
    Ok(value)
}

/// Parse one line. Blank lines yield `Ok(None)`.
pub fn parse_record(line: &str) -> Result<Option<FieldRecord>, RecordError> {
    let Some(fields) = split_record(line)? else {
        return Ok(None);
    };
    let mut numbers = [0.0f64; RECORD_FIELDS];
    for (index, (text, slot)) in fields.iter().zip(numbers.iter_mut()).enumerate() {
        *slot = parse_number(index, text)?;
    }
    let [x, y, z, value] = numbers;
    Ok(Some(FieldRecord {
        position: [x, y, z],
        value,
    }))
}

/// Load records from `reader` into `channel` of `grid`.
///
/// `channel` must have been resolved against a grid with the same channel layout.
pub fn load_field_records<R: BufRead>(
    grid: &mut VoxelGrid,
    channel: ChannelIndex,
    reader: R,
    length_scale: f64,
) -> Result<LoadSummary, FieldLoadError> {
    if !(length_scale.is_finite() && length_scale > 0.0) {
        return Err(FieldLoadError::InvalidLengthScale(length_scale));
    }
    if channel.get() >= grid.channel_count() {
        return Err(FieldLoadError::ChannelOutOfRange {
            channel: channel.get(),
            channels: grid.channel_count(),
        });
    }

    let mut writes = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line_no = idx + 1;
        let line = line.map_err(|source| FieldLoadError::Read {
            line: line_no,
            source,
        })?;
        let record = parse_record(&line).map_err(|reason| FieldLoadError::Malformed {
            line: line_no,
            reason,
        })?;
        if let Some(record) = record {
            let scaled = record.position.map(|v| v * length_scale);
            writes.push((grid.nearest_voxel_index(scaled), record.value));
        }
    }

    let mut touched = HashSet::with_capacity(writes.len());
    for &(voxel, value) in &writes {
        grid.set_value(voxel, channel, value);
        touched.insert(voxel);
    }
    Ok(LoadSummary {
        records: writes.len(),
        voxels_written: touched.len(),
    })
}

/// Open `path` and load it into `channel` of `grid`.
pub fn load_field_file(
    grid: &mut VoxelGrid,
    channel: ChannelIndex,
    path: impl AsRef<Path>,
    length_scale: f64,
) -> Result<LoadSummary, FieldLoadError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| FieldLoadError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let summary = load_field_records(grid, channel, BufReader::new(file), length_scale)?;
    info!(
        path = %path.display(),
        channel = grid.channel_names().get(channel.get()).map(String::as_str),
        records = summary.records,
        voxels = summary.voxels_written,
        "loaded external field"
    );
    Ok(summary)
}
