use crate::agent::Agent;
use crate::field::{ChannelIndex, VoxelGrid};
use crate::species::SpeciesRegistry;
use serde::{Deserialize, Serialize};

/// Phenotype statistics of one species at one step.
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct SpeciesMetrics {
    pub species: String,
    pub count: usize,
    pub death_rate_mean: f64,
    pub death_rate_min: f64,
    pub death_rate_max: f64,
    /// Mean secretion rate per channel, in channel order.
    pub secretion_rate_means: Vec<f64>,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct StepMetrics {
    pub step: usize,
    pub potential_mean: f64,
    pub species: Vec<SpeciesMetrics>,
}

fn default_schema_version() -> u32 {
    1
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunSummary {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub steps: usize,
    pub sample_every: usize,
    pub total_agents: usize,
    pub samples: Vec<StepMetrics>,
}

/// Per-species phenotype statistics, species in registration order.
pub fn collect_step_metrics(
    step: usize,
    registry: &SpeciesRegistry,
    agents: &[Agent],
    grid: &VoxelGrid,
    potential: ChannelIndex,
) -> StepMetrics {
    let channels = grid.channel_count();
    let mut species: Vec<SpeciesMetrics> = registry
        .iter()
        .map(|profile| SpeciesMetrics {
            species: profile.name().to_string(),
            death_rate_min: f64::INFINITY,
            death_rate_max: f64::NEG_INFINITY,
            secretion_rate_means: vec![0.0; channels],
            ..SpeciesMetrics::default()
        })
        .collect();

    for agent in agents {
        let Some(entry) = species.get_mut(agent.species.index()) else {
            continue;
        };
        entry.count += 1;
        entry.death_rate_mean += agent.phenotype.death_rate;
        entry.death_rate_min = entry.death_rate_min.min(agent.phenotype.death_rate);
        entry.death_rate_max = entry.death_rate_max.max(agent.phenotype.death_rate);
        for (sum, rate) in entry
            .secretion_rate_means
            .iter_mut()
            .zip(&agent.phenotype.secretion_rates)
        {
            *sum += rate;
        }
    }

    for entry in &mut species {
        if entry.count == 0 {
            entry.death_rate_min = 0.0;
            entry.death_rate_max = 0.0;
            continue;
        }
        let n = entry.count as f64;
        entry.death_rate_mean /= n;
        for mean in &mut entry.secretion_rate_means {
            *mean /= n;
        }
    }

    StepMetrics {
        step,
        potential_mean: grid.channel_mean(potential),
        species,
    }
}
