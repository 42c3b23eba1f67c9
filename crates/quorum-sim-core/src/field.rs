//! Cartesian voxel grid holding one value per named channel in every voxel.
//!
//! Voxels are stored x-fastest (`i + nx * (j + ny * k)`), each voxel owning a
//! contiguous slice of `channel_count` values in channel order.

use crate::config::{ChannelConfig, DomainConfig};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldError {
    #[error("unknown field channel {0:?}")]
    UnknownChannel(String),
}

/// Stable slot of a channel inside every voxel's value vector.
///
/// Only obtainable by resolving a name against a grid, so an index is in range for the
/// grid it came from. It is not tied to that grid; writers taking an index from callers
/// check the range themselves.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChannelIndex(usize);

impl ChannelIndex {
    pub fn get(self) -> usize {
        self.0
    }
}

#[derive(Clone, Debug)]
pub struct VoxelGrid {
    lower: [f64; 3],
    spacing: [f64; 3],
    dims: [usize; 3],
    channels: Vec<String>,
    data: Vec<f64>,
}

impl VoxelGrid {
    /// Build a grid covering `domain`, every voxel initialized from `channels`.
    ///
    /// `domain` is expected to have passed [`crate::config::SimConfig::validate`].
    pub fn new(domain: &DomainConfig, channels: &[ChannelConfig]) -> Self {
        let dims = domain.dimensions();
        let spacing = domain.spacing();
        assert!(
            spacing.iter().all(|d| d.is_finite() && *d > 0.0),
            "voxel spacing must be positive"
        );
        assert!(!channels.is_empty(), "grid needs at least one channel");
        let voxel_count = dims[0] * dims[1] * dims[2];
        let initial: Vec<f64> = channels.iter().map(|c| c.initial_value).collect();
        let mut data = Vec::with_capacity(voxel_count * initial.len());
        for _ in 0..voxel_count {
            data.extend_from_slice(&initial);
        }
        Self {
            lower: domain.lower(),
            spacing,
            dims,
            channels: channels.iter().map(|c| c.name.clone()).collect(),
            data,
        }
    }

    /// Resolve a channel name to its slot.
    pub fn find_channel(&self, name: &str) -> Result<ChannelIndex, FieldError> {
        self.channels
            .iter()
            .position(|c| c == name)
            .map(ChannelIndex)
            .ok_or_else(|| FieldError::UnknownChannel(name.to_string()))
    }

    pub fn channel_names(&self) -> &[String] {
        &self.channels
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn dims(&self) -> [usize; 3] {
        self.dims
    }

    pub fn voxel_count(&self) -> usize {
        self.dims[0] * self.dims[1] * self.dims[2]
    }

    /// Index of the voxel whose cell contains `position`.
    ///
    /// Positions outside the grid map to the nearest boundary voxel.
    pub fn nearest_voxel_index(&self, position: [f64; 3]) -> usize {
        let [i, j, k] = self.nearest_cartesian(position);
        i + self.dims[0] * (j + self.dims[1] * k)
    }

    pub fn voxel_center(&self, voxel: usize) -> [f64; 3] {
        let i = voxel % self.dims[0];
        let j = (voxel / self.dims[0]) % self.dims[1];
        let k = voxel / (self.dims[0] * self.dims[1]);
        let ijk = [i, j, k];
        std::array::from_fn(|axis| {
            self.lower[axis] + (ijk[axis] as f64 + 0.5) * self.spacing[axis]
        })
    }

    /// All channel values of one voxel, in channel order.
    pub fn voxel_values(&self, voxel: usize) -> &[f64] {
        let n = self.channels.len();
        &self.data[voxel * n..(voxel + 1) * n]
    }

    pub fn value(&self, voxel: usize, channel: ChannelIndex) -> f64 {
        self.data[voxel * self.channels.len() + channel.0]
    }

    /// Overwrite one channel slot of one voxel; other channels are untouched.
    pub fn set_value(&mut self, voxel: usize, channel: ChannelIndex, value: f64) {
        let n = self.channels.len();
        self.data[voxel * n + channel.0] = value;
    }

    pub fn fill_channel(&mut self, channel: ChannelIndex, value: f64) {
        let n = self.channels.len();
        for slot in self.data.iter_mut().skip(channel.0).step_by(n) {
            *slot = value;
        }
    }

    pub fn channel_values(&self, channel: ChannelIndex) -> impl Iterator<Item = f64> + '_ {
        self.data
            .iter()
            .skip(channel.0)
            .step_by(self.channels.len())
            .copied()
    }

    pub fn channel_mean(&self, channel: ChannelIndex) -> f64 {
        let voxels = self.voxel_count();
        if voxels == 0 {
            return 0.0;
        }
        self.channel_values(channel).sum::<f64>() / voxels as f64
    }

    fn nearest_cartesian(&self, position: [f64; 3]) -> [usize; 3] {
        std::array::from_fn(|axis| {
            let cell = ((position[axis] - self.lower[axis]) / self.spacing[axis]).floor();
            // Saturating casts send NaN to 0 and out-of-range values to the edges.
            (cell.max(0.0) as usize).min(self.dims[axis] - 1)
        })
    }
}
