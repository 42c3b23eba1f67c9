use crate::agent::Agent;
use crate::config::{SimConfig, SimConfigError};
use crate::constants::MAX_TOTAL_AGENTS;
use crate::controller::DoseResponseController;
use crate::field::VoxelGrid;
use crate::kinetics::KineticsError;
use crate::loader::{self, FieldLoadError, LoadSummary};
use crate::metrics::{collect_step_metrics, RunSummary, StepMetrics};
use crate::rng::create_rng;
use crate::sampler::FieldSampler;
use crate::species::{RegistryError, SpeciesRegistry};
use crate::tissue::{load_cells_file, place_tissue, CellLoadError, TissueError};
use std::io::BufRead;
use std::path::Path;
use std::time::Instant;
use thiserror::Error;
use tracing::info;

#[derive(Clone, Debug)]
pub struct StepTimings {
    pub phenotype_us: u64,
    /// Agents whose phenotype the controller rewrote this step.
    pub agents_updated: usize,
    pub total_us: u64,
}

pub struct World {
    pub agents: Vec<Agent>,
    grid: VoxelGrid,
    controller: DoseResponseController,
    config: SimConfig,
    step_index: usize,
}

#[derive(Debug, Error)]
pub enum WorldInitError {
    #[error(transparent)]
    Config(#[from] SimConfigError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Tissue(#[from] TissueError),
    #[error(transparent)]
    FieldLoad(#[from] FieldLoadError),
    #[error(transparent)]
    CellLoad(#[from] CellLoadError),
    #[error("too many agents: {actual} exceeds supported maximum ({max})")]
    TooManyAgents { max: usize, actual: usize },
    #[error("agent {id} references unregistered species index {species}")]
    UnknownSpecies { id: u32, species: usize },
    #[error("agent {id} carries {actual} secretion rates but the grid has {expected} channels")]
    SecretionChannelMismatch {
        id: u32,
        expected: usize,
        actual: usize,
    },
    #[error("agent {id} has invalid kinetics: {reason}")]
    InvalidKinetics { id: u32, reason: KineticsError },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExperimentError {
    #[error("sample_every must be positive")]
    InvalidSampleEvery,
    #[error("steps ({actual}) exceed supported maximum ({max})")]
    TooManySteps { max: usize, actual: usize },
    #[error("sample count ({actual}) exceeds supported maximum ({max})")]
    TooManySamples { max: usize, actual: usize },
}

impl World {
    pub const MAX_EXPERIMENT_STEPS: usize = 1_000_000;
    pub const MAX_EXPERIMENT_SAMPLES: usize = 50_000;

    /// Build a world from `config`: grid, species rules, seeded tissue placement, then the
    /// cells of `cells_file` and the potential of `potential_file` when those are set.
    pub fn new(config: SimConfig) -> Result<Self, WorldInitError> {
        config.validate()?;
        let grid = VoxelGrid::new(&config.domain, &config.channels);
        let controller = DoseResponseController::from_config(&config, &FieldSampler::new(&grid))?;
        let mut rng = create_rng(config.seed);
        let mut agents = place_tissue(
            controller.registry(),
            &config.domain,
            config.cells_per_species,
            &mut rng,
        )?;
        if let Some(path) = &config.cells_file {
            let loaded = load_cells_file(controller.registry(), path, agents.len())?;
            agents.extend(loaded);
            if agents.len() > MAX_TOTAL_AGENTS {
                return Err(WorldInitError::TooManyAgents {
                    max: MAX_TOTAL_AGENTS,
                    actual: agents.len(),
                });
            }
        }
        Self::assemble(config, grid, controller, agents)
    }

    /// Build a world around agents placed by the caller. `cells_per_species` is ignored.
    pub fn with_agents(config: SimConfig, agents: Vec<Agent>) -> Result<Self, WorldInitError> {
        config.validate()?;
        if agents.len() > MAX_TOTAL_AGENTS {
            return Err(WorldInitError::TooManyAgents {
                max: MAX_TOTAL_AGENTS,
                actual: agents.len(),
            });
        }
        let grid = VoxelGrid::new(&config.domain, &config.channels);
        let controller = DoseResponseController::from_config(&config, &FieldSampler::new(&grid))?;
        for agent in &agents {
            if controller.registry().get(agent.species).is_none() {
                return Err(WorldInitError::UnknownSpecies {
                    id: agent.id,
                    species: agent.species.index(),
                });
            }
            if agent.phenotype.secretion_rates.len() != grid.channel_count() {
                return Err(WorldInitError::SecretionChannelMismatch {
                    id: agent.id,
                    expected: grid.channel_count(),
                    actual: agent.phenotype.secretion_rates.len(),
                });
            }
            agent
                .kinetics
                .validate()
                .map_err(|reason| WorldInitError::InvalidKinetics {
                    id: agent.id,
                    reason,
                })?;
        }
        Self::assemble(config, grid, controller, agents)
    }

    fn assemble(
        config: SimConfig,
        grid: VoxelGrid,
        controller: DoseResponseController,
        agents: Vec<Agent>,
    ) -> Result<Self, WorldInitError> {
        let mut world = Self {
            agents,
            grid,
            controller,
            config,
            step_index: 0,
        };
        if let Some(path) = world.config.potential_file.clone() {
            world.load_field_file(path)?;
        }
        info!(
            agents = world.agents.len(),
            species = world.registry().len(),
            voxels = world.grid.voxel_count(),
            "world initialized"
        );
        Ok(world)
    }

    /// Overwrite the potential channel from an `x,y,z,value` file.
    ///
    /// On error the grid is left exactly as it was.
    pub fn load_field_file(
        &mut self,
        path: impl AsRef<Path>,
    ) -> Result<LoadSummary, FieldLoadError> {
        loader::load_field_file(
            &mut self.grid,
            self.controller.potential_channel(),
            path,
            self.config.field_length_scale,
        )
    }

    /// Same as [`World::load_field_file`] for an already opened source.
    pub fn load_field_records<R: BufRead>(
        &mut self,
        reader: R,
    ) -> Result<LoadSummary, FieldLoadError> {
        loader::load_field_records(
            &mut self.grid,
            self.controller.potential_channel(),
            reader,
            self.config.field_length_scale,
        )
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn grid(&self) -> &VoxelGrid {
        &self.grid
    }

    /// Mutable grid access for hosts that compute fields themselves between steps.
    pub fn grid_mut(&mut self) -> &mut VoxelGrid {
        &mut self.grid
    }

    pub fn controller(&self) -> &DoseResponseController {
        &self.controller
    }

    pub fn registry(&self) -> &SpeciesRegistry {
        self.controller.registry()
    }

    pub fn step_index(&self) -> usize {
        self.step_index
    }

    pub fn step_metrics(&self) -> StepMetrics {
        collect_step_metrics(
            self.step_index,
            self.controller.registry(),
            &self.agents,
            &self.grid,
            self.controller.potential_channel(),
        )
    }

    pub fn step(&mut self) -> StepTimings {
        let total_start = Instant::now();
        self.step_index = self.step_index.saturating_add(1);

        let t0 = Instant::now();
        let agents_updated = self.step_phenotype_phase();
        let phenotype_us = t0.elapsed().as_micros() as u64;

        StepTimings {
            phenotype_us,
            agents_updated,
            total_us: total_start.elapsed().as_micros() as u64,
        }
    }

    /// Run `steps` steps, sampling metrics every `sample_every` steps and after the last.
    pub fn try_run_experiment(
        &mut self,
        steps: usize,
        sample_every: usize,
    ) -> Result<RunSummary, ExperimentError> {
        if sample_every == 0 {
            return Err(ExperimentError::InvalidSampleEvery);
        }
        if steps > Self::MAX_EXPERIMENT_STEPS {
            return Err(ExperimentError::TooManySteps {
                max: Self::MAX_EXPERIMENT_STEPS,
                actual: steps,
            });
        }
        let estimated_samples = if steps == 0 {
            0
        } else {
            ((steps - 1) / sample_every) + 1
        };
        if estimated_samples > Self::MAX_EXPERIMENT_SAMPLES {
            return Err(ExperimentError::TooManySamples {
                max: Self::MAX_EXPERIMENT_SAMPLES,
                actual: estimated_samples,
            });
        }

        let mut samples = Vec::with_capacity(estimated_samples);
        for step in 1..=steps {
            self.step();
            if step % sample_every == 0 || step == steps {
                samples.push(self.step_metrics());
            }
        }

        Ok(RunSummary {
            schema_version: 1,
            steps,
            sample_every,
            total_agents: self.agents.len(),
            samples,
        })
    }
}

mod phases;
