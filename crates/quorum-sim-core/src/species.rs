//! Species registry: type names are mapped to [`SpeciesId`]s once, at setup, and each
//! species carries its dose-response rule as data with channel names already resolved.

use crate::agent::Phenotype;
use crate::config::{DeathCap, SimConfig, SpeciesConfig};
use crate::constants::MAX_SPECIES;
use crate::field::{ChannelIndex, FieldError};
use crate::kinetics::KineticParams;
use crate::sampler::FieldSampler;
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SpeciesId(u16);

impl SpeciesId {
    /// Registration-order index.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error(transparent)]
    Field(#[from] FieldError),
    #[error("species {0:?} is registered more than once")]
    DuplicateSpecies(String),
    #[error("too many species: max {max}")]
    TooManySpecies { max: usize },
}

/// Resolved dose-response rule of one species.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ResponseRule {
    pub signal: ChannelIndex,
    pub signal_divisor: f64,
    pub death_cap: DeathCap,
    pub secretion: ChannelIndex,
}

impl ResponseRule {
    /// Death-rate ceiling for an agent with `kinetics`.
    pub fn death_cap_for(&self, kinetics: &KineticParams) -> f64 {
        match self.death_cap {
            DeathCap::Fixed(cap) => cap,
            DeathCap::AgentMaximum => kinetics.max_apoptosis,
        }
    }
}

#[derive(Clone, Debug)]
pub struct SpeciesProfile {
    id: SpeciesId,
    name: String,
    baseline_death_rate: f64,
    secretion_rates: Vec<f64>,
    kinetics: KineticParams,
    rule: Option<ResponseRule>,
}

impl SpeciesProfile {
    pub fn id(&self) -> SpeciesId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Death rate before any modulation, as configured. Agents' current rates are never
    /// fed back into this value.
    pub fn baseline_death_rate(&self) -> f64 {
        self.baseline_death_rate
    }

    pub fn kinetics(&self) -> KineticParams {
        self.kinetics
    }

    pub fn rule(&self) -> Option<&ResponseRule> {
        self.rule.as_ref()
    }

    pub fn default_phenotype(&self) -> Phenotype {
        Phenotype {
            death_rate: self.baseline_death_rate,
            secretion_rates: self.secretion_rates.clone(),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct SpeciesRegistry {
    profiles: Vec<SpeciesProfile>,
    by_name: HashMap<String, SpeciesId>,
}

impl SpeciesRegistry {
    /// Register every configured species in order, resolving rule channels against the grid.
    pub fn from_config(
        config: &SimConfig,
        sampler: &FieldSampler<'_>,
    ) -> Result<Self, RegistryError> {
        let mut registry = Self::default();
        for species in &config.species {
            registry.register(species, sampler)?;
        }
        Ok(registry)
    }

    pub fn register(
        &mut self,
        species: &SpeciesConfig,
        sampler: &FieldSampler<'_>,
    ) -> Result<SpeciesId, RegistryError> {
        if self.by_name.contains_key(&species.name) {
            return Err(RegistryError::DuplicateSpecies(species.name.clone()));
        }
        let raw_id = u16::try_from(self.profiles.len())
            .ok()
            .filter(|id| (*id as usize) < MAX_SPECIES)
            .ok_or(RegistryError::TooManySpecies { max: MAX_SPECIES })?;
        let id = SpeciesId(raw_id);

        let rule = match &species.response {
            Some(rule) => Some(ResponseRule {
                signal: sampler.resolve(&rule.signal_channel)?,
                signal_divisor: rule.signal_divisor,
                death_cap: rule.death_cap,
                secretion: sampler.resolve(&rule.secretion_channel)?,
            }),
            None => {
                warn!(
                    species = %species.name,
                    "species has no dose-response rule; phenotype stays fixed"
                );
                None
            }
        };

        debug!(species = %species.name, id = raw_id, "registered species");
        self.profiles.push(SpeciesProfile {
            id,
            name: species.name.clone(),
            baseline_death_rate: species.baseline_death_rate,
            secretion_rates: species.secretion_rates.clone(),
            kinetics: species.kinetics,
            rule,
        });
        self.by_name.insert(species.name.clone(), id);
        Ok(id)
    }

    pub fn id_of(&self, name: &str) -> Option<SpeciesId> {
        self.by_name.get(name).copied()
    }

    pub fn get(&self, id: SpeciesId) -> Option<&SpeciesProfile> {
        self.profiles.get(id.index())
    }

    /// Profiles in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &SpeciesProfile> {
        self.profiles.iter()
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{
        ResponseRuleConfig, PSEUDOMONAS_AERUGINOSA, QUORUM_FACTOR_1, QUORUM_FACTOR_2,
        STAPHYLOCOCCUS_AUREUS,
    };
    use crate::field::VoxelGrid;

    fn default_grid(config: &SimConfig) -> VoxelGrid {
        VoxelGrid::new(&config.domain, &config.channels)
    }

    #[test]
    fn registers_default_species_in_order_with_resolved_channels() {
        let config = SimConfig::default();
        let grid = default_grid(&config);
        let registry = SpeciesRegistry::from_config(&config, &FieldSampler::new(&grid)).unwrap();

        let names: Vec<&str> = registry.iter().map(SpeciesProfile::name).collect();
        assert_eq!(names, [PSEUDOMONAS_AERUGINOSA, STAPHYLOCOCCUS_AUREUS]);

        let pa = registry.get(registry.id_of(PSEUDOMONAS_AERUGINOSA).unwrap()).unwrap();
        let sa = registry.get(registry.id_of(STAPHYLOCOCCUS_AUREUS).unwrap()).unwrap();
        let q1 = grid.find_channel(QUORUM_FACTOR_1).unwrap();
        let q2 = grid.find_channel(QUORUM_FACTOR_2).unwrap();

        let pa_rule = pa.rule().unwrap();
        assert_eq!(pa_rule.signal, q1);
        assert_eq!(pa_rule.secretion, q1);
        assert_eq!(pa_rule.signal_divisor, 1.0);
        assert_eq!(pa_rule.death_cap, DeathCap::Fixed(0.1));

        let sa_rule = sa.rule().unwrap();
        assert_eq!(sa_rule.signal, q2);
        assert_eq!(sa_rule.secretion, q1);
        assert_eq!(sa_rule.signal_divisor, 5.0);
        assert_eq!(sa_rule.death_cap, DeathCap::Fixed(0.5));
    }

    #[test]
    fn registry_is_open_to_more_species() {
        let mut config = SimConfig::default();
        config.species.push(SpeciesConfig {
            name: "Escherichia coli".to_string(),
            baseline_death_rate: 0.03,
            secretion_rates: vec![0.0, 0.0, 2.0],
            response: Some(ResponseRuleConfig {
                signal_channel: QUORUM_FACTOR_2.to_string(),
                secretion_channel: QUORUM_FACTOR_2.to_string(),
                ..ResponseRuleConfig::default()
            }),
            ..SpeciesConfig::default()
        });
        config.species.push(SpeciesConfig {
            name: "bystander".to_string(),
            secretion_rates: vec![0.0; 3],
            ..SpeciesConfig::default()
        });
        let grid = default_grid(&config);
        let registry = SpeciesRegistry::from_config(&config, &FieldSampler::new(&grid)).unwrap();
        assert_eq!(registry.len(), 4);
        let ecoli = registry.get(registry.id_of("Escherichia coli").unwrap()).unwrap();
        assert_eq!(ecoli.id().index(), 2);
        assert_eq!(ecoli.rule().unwrap().death_cap, DeathCap::AgentMaximum);
        let bystander = registry.get(registry.id_of("bystander").unwrap()).unwrap();
        assert!(bystander.rule().is_none());
    }

    #[test]
    fn unknown_rule_channel_fails_registration() {
        let mut config = SimConfig::default();
        if let Some(rule) = config.species[1].response.as_mut() {
            rule.secretion_channel = "autoinducer".to_string();
        }
        let grid = default_grid(&config);
        let result = SpeciesRegistry::from_config(&config, &FieldSampler::new(&grid));
        assert_eq!(
            result.map(|r| r.len()),
            Err(RegistryError::Field(FieldError::UnknownChannel(
                "autoinducer".to_string()
            )))
        );
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let config = SimConfig::default();
        let grid = default_grid(&config);
        let sampler = FieldSampler::new(&grid);
        let mut registry = SpeciesRegistry::from_config(&config, &sampler).unwrap();
        assert_eq!(
            registry.register(&config.species[0], &sampler),
            Err(RegistryError::DuplicateSpecies(
                PSEUDOMONAS_AERUGINOSA.to_string()
            ))
        );
    }

    #[test]
    fn agent_maximum_cap_reads_agent_kinetics() {
        let config = SimConfig::default();
        let grid = default_grid(&config);
        let q1 = grid.find_channel(QUORUM_FACTOR_1).unwrap();
        let rule = ResponseRule {
            signal: q1,
            signal_divisor: 1.0,
            death_cap: DeathCap::AgentMaximum,
            secretion: q1,
        };
        let kinetics = KineticParams {
            max_apoptosis: 0.07,
            ..KineticParams::default()
        };
        assert_eq!(rule.death_cap_for(&kinetics), 0.07);
        let fixed = ResponseRule {
            death_cap: DeathCap::Fixed(0.5),
            ..rule
        };
        assert_eq!(fixed.death_cap_for(&kinetics), 0.5);
    }

    #[test]
    fn default_phenotype_starts_from_baseline() {
        let config = SimConfig::default();
        let grid = default_grid(&config);
        let registry = SpeciesRegistry::from_config(&config, &FieldSampler::new(&grid)).unwrap();
        let pa = registry.iter().next().unwrap();
        let phenotype = pa.default_phenotype();
        assert_eq!(phenotype.death_rate, 0.02);
        assert_eq!(phenotype.secretion_rates, vec![0.0, 1.0, 0.0]);
    }
}
