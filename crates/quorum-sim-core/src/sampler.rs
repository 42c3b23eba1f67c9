//! Read-side view of the voxel grid used by the phenotype phase.

use crate::field::{ChannelIndex, FieldError, VoxelGrid};
use tracing::debug;

/// Resolves channel names and samples the nearest voxel for an agent position.
///
/// Holds only a shared borrow of the grid, so one sampler can be handed to every
/// worker of a parallel phase.
#[derive(Clone, Copy, Debug)]
pub struct FieldSampler<'g> {
    grid: &'g VoxelGrid,
}

impl<'g> FieldSampler<'g> {
    pub fn new(grid: &'g VoxelGrid) -> Self {
        Self { grid }
    }

    /// Resolve a channel name. Unknown names are an error, never slot 0.
    pub fn resolve(&self, name: &str) -> Result<ChannelIndex, FieldError> {
        let index = self.grid.find_channel(name)?;
        debug!(channel = name, index = index.get(), "resolved field channel");
        Ok(index)
    }

    /// Field values of the voxel nearest to `position`. No interpolation.
    pub fn sample(&self, position: [f64; 3]) -> FieldSample<'g> {
        let voxel = self.grid.nearest_voxel_index(position);
        FieldSample {
            voxel,
            values: self.grid.voxel_values(voxel),
        }
    }

    pub fn grid(&self) -> &'g VoxelGrid {
        self.grid
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FieldSample<'g> {
    voxel: usize,
    values: &'g [f64],
}

impl<'g> FieldSample<'g> {
    pub fn voxel(&self) -> usize {
        self.voxel
    }

    pub fn values(&self) -> &'g [f64] {
        self.values
    }

    pub fn get(&self, channel: ChannelIndex) -> f64 {
        self.values[channel.get()]
    }
}
