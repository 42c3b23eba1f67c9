pub mod agent;
pub mod config;
pub mod constants;
pub mod controller;
pub mod field;
pub mod kinetics;
pub mod loader;
pub mod metrics;
pub mod rng;
pub mod sampler;
pub mod species;
pub mod tissue;
pub mod world;

pub use config::{SimConfig, SimConfigError};
pub use controller::{DoseResponseController, PhenotypeUpdate};
pub use field::{ChannelIndex, VoxelGrid};
pub use loader::{FieldLoadError, LoadSummary};
pub use metrics::{RunSummary, SpeciesMetrics, StepMetrics};
pub use world::{ExperimentError, StepTimings, World, WorldInitError};
