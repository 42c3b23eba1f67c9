/// Saturation level of the Hill response: `E -> HILL_RESPONSE_CEILING` as concentration grows.
pub const HILL_RESPONSE_CEILING: f64 = 0.5;

/// Field files store coordinates in a unit 1000x smaller than the simulation's.
pub const DEFAULT_FIELD_LENGTH_SCALE: f64 = 1000.0;

/// Secretion multiplier applied inside the potential gate band.
pub const DEFAULT_POTENTIAL_DAMPING: f64 = 0.6;

/// Largest supported voxel count. Bounds the flat field buffer allocation.
pub const MAX_VOXELS: usize = 16_000_000;

pub const MAX_TOTAL_AGENTS: usize = 1_000_000;

/// Species ids are stored as `u16`.
pub const MAX_SPECIES: usize = u16::MAX as usize;
