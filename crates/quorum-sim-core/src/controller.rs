//! Dose-response phenotype controller.
//!
//! Each update reads the agent's signal channel and the potential channel at the
//! nearest voxel, then
//!
//! 1. computes the Hill response `E` of the signal,
//! 2. sets `death = min(baseline / (E / divisor), cap)` from the species baseline,
//! 3. scales the rule's secretion slot by `E`,
//! 4. damps that already-scaled secretion when the potential is strictly inside
//!    `(-threshold, threshold)`.
//!
//! Nothing else in the phenotype is touched.

use crate::agent::Agent;
use crate::config::SimConfig;
use crate::field::ChannelIndex;
use crate::kinetics::KineticParams;
use crate::sampler::FieldSampler;
use crate::species::{RegistryError, ResponseRule, SpeciesRegistry};

/// Field values seen by one agent.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LocalField {
    pub signal: f64,
    pub potential: f64,
}

/// New phenotype values produced by one controller evaluation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PhenotypeUpdate {
    pub death_rate: f64,
    pub secretion_channel: ChannelIndex,
    pub secretion_rate: f64,
}

/// Evaluate a response rule. Pure: the result depends only on the arguments.
pub fn respond(
    rule: &ResponseRule,
    kinetics: &KineticParams,
    baseline_death_rate: f64,
    field: LocalField,
    current_secretion: f64,
    potential_damping: f64,
) -> PhenotypeUpdate {
    let effect = kinetics.response(field.signal);

    // `min` also maps an undefined 0/0 ratio onto the cap.
    let death_rate =
        (baseline_death_rate / (effect / rule.signal_divisor)).min(rule.death_cap_for(kinetics));

    let mut secretion_rate = current_secretion * effect;
    if kinetics.in_potential_band(field.potential) {
        secretion_rate *= potential_damping;
    }

    PhenotypeUpdate {
        death_rate,
        secretion_channel: rule.secretion,
        secretion_rate,
    }
}

/// Immutable, shareable controller: species rules plus the resolved potential channel.
#[derive(Clone, Debug)]
pub struct DoseResponseController {
    registry: SpeciesRegistry,
    potential: ChannelIndex,
    potential_damping: f64,
}

impl DoseResponseController {
    pub fn new(registry: SpeciesRegistry, potential: ChannelIndex, potential_damping: f64) -> Self {
        Self {
            registry,
            potential,
            potential_damping,
        }
    }

    /// Build the registry and resolve every channel the controller reads, once.
    pub fn from_config(
        config: &SimConfig,
        sampler: &FieldSampler<'_>,
    ) -> Result<Self, RegistryError> {
        let registry = SpeciesRegistry::from_config(config, sampler)?;
        let potential = sampler.resolve(&config.potential_channel)?;
        Ok(Self::new(registry, potential, config.potential_damping))
    }

    pub fn registry(&self) -> &SpeciesRegistry {
        &self.registry
    }

    pub fn potential_channel(&self) -> ChannelIndex {
        self.potential
    }

    pub fn potential_damping(&self) -> f64 {
        self.potential_damping
    }

    /// Compute the update for `agent` without applying it.
    ///
    /// `None` when the agent's species has no rule, is unregistered, or the agent lacks
    /// the rule's secretion slot.
    pub fn evaluate(&self, agent: &Agent, sampler: &FieldSampler<'_>) -> Option<PhenotypeUpdate> {
        let profile = self.registry.get(agent.species)?;
        let rule = profile.rule()?;
        let current_secretion = agent.phenotype.secretion_rate(rule.secretion)?;
        let sample = sampler.sample(agent.position);
        let field = LocalField {
            signal: sample.get(rule.signal),
            potential: sample.get(self.potential),
        };
        Some(respond(
            rule,
            &agent.kinetics,
            profile.baseline_death_rate(),
            field,
            current_secretion,
            self.potential_damping,
        ))
    }

    /// Evaluate and write back into the agent's own phenotype. Returns whether it changed.
    pub fn update(&self, agent: &mut Agent, sampler: &FieldSampler<'_>) -> bool {
        match self.evaluate(agent, sampler) {
            Some(update) => {
                agent.phenotype.apply(&update);
                true
            }
            None => false,
        }
    }
}
