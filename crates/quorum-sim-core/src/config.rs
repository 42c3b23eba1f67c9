use crate::constants::{
    DEFAULT_FIELD_LENGTH_SCALE, DEFAULT_POTENTIAL_DAMPING, MAX_SPECIES, MAX_TOTAL_AGENTS,
    MAX_VOXELS,
};
use crate::kinetics::{KineticParams, KineticsError};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;

pub const POTENTIAL_CHANNEL: &str = "electrical_potential";
pub const QUORUM_FACTOR_1: &str = "quorum factor 1";
pub const QUORUM_FACTOR_2: &str = "quorum factor 2";
pub const PSEUDOMONAS_AERUGINOSA: &str = "Pseudomonas Aeruginosa";
pub const STAPHYLOCOCCUS_AUREUS: &str = "Staphylococcus Aureus";

/// Upper bound applied to a dose-response death rate.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum DeathCap {
    /// Species-wide constant.
    Fixed(f64),
    /// The agent's own `max_apoptosis` kinetic parameter.
    #[default]
    AgentMaximum,
}

/// Axis-aligned simulation domain and its voxelization.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DomainConfig {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
    /// Ignored when `simulate_2d` is set; the domain collapses to the z = 0 plane.
    pub z_min: f64,
    pub z_max: f64,
    pub dx: f64,
    pub dy: f64,
    pub dz: f64,
    pub simulate_2d: bool,
}

impl Default for DomainConfig {
    fn default() -> Self {
        Self {
            x_min: -500.0,
            x_max: 500.0,
            y_min: -500.0,
            y_max: 500.0,
            z_min: -10.0,
            z_max: 10.0,
            dx: 20.0,
            dy: 20.0,
            dz: 20.0,
            simulate_2d: true,
        }
    }
}

impl DomainConfig {
    /// Lower corner of the voxelized region.
    pub fn lower(&self) -> [f64; 3] {
        if self.simulate_2d {
            [self.x_min, self.y_min, -0.5 * self.dz]
        } else {
            [self.x_min, self.y_min, self.z_min]
        }
    }

    pub fn spacing(&self) -> [f64; 3] {
        [self.dx, self.dy, self.dz]
    }

    /// Voxel counts per axis. A 2-D domain is a single voxel thick.
    pub fn dimensions(&self) -> [usize; 3] {
        let axis = |min: f64, max: f64, step: f64| ((max - min) / step).ceil().max(1.0) as usize;
        let nz = if self.simulate_2d {
            1
        } else {
            axis(self.z_min, self.z_max, self.dz)
        };
        [
            axis(self.x_min, self.x_max, self.dx),
            axis(self.y_min, self.y_max, self.dy),
            nz,
        ]
    }

    /// Box used for random agent placement: `(min, max)` per axis.
    pub fn placement_bounds(&self) -> ([f64; 3], [f64; 3]) {
        let (z_min, z_max) = if self.simulate_2d {
            (0.0, 0.0)
        } else {
            (self.z_min, self.z_max)
        };
        (
            [self.x_min, self.y_min, z_min],
            [self.x_max, self.y_max, z_max],
        )
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ChannelConfig {
    pub name: String,
    /// Value every voxel starts with.
    pub initial_value: f64,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            initial_value: 0.0,
        }
    }
}

impl ChannelConfig {
    fn named(name: &str, initial_value: f64) -> Self {
        Self {
            name: name.to_string(),
            initial_value,
        }
    }
}

/// How a species converts a quorum signal into death and secretion changes.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ResponseRuleConfig {
    /// Channel whose concentration drives the Hill response.
    pub signal_channel: String,
    /// Death rate is `baseline / (E / signal_divisor)`.
    pub signal_divisor: f64,
    pub death_cap: DeathCap,
    /// Channel whose secretion rate is scaled by the response.
    pub secretion_channel: String,
}

impl Default for ResponseRuleConfig {
    fn default() -> Self {
        Self {
            signal_channel: QUORUM_FACTOR_1.to_string(),
            signal_divisor: 1.0,
            death_cap: DeathCap::default(),
            secretion_channel: QUORUM_FACTOR_1.to_string(),
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SpeciesConfig {
    pub name: String,
    /// Unmodulated apoptosis rate; the controller always starts from this value.
    pub baseline_death_rate: f64,
    /// Initial secretion rate per channel, in channel order.
    pub secretion_rates: Vec<f64>,
    /// Kinetic parameters copied into every agent of this species.
    pub kinetics: KineticParams,
    /// Species without a rule keep their phenotype unchanged.
    pub response: Option<ResponseRuleConfig>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Deterministic seed for tissue placement.
    pub seed: u64,
    /// Agents created per registered species.
    pub cells_per_species: usize,
    pub domain: DomainConfig,
    /// Field channels in voxel-slot order.
    pub channels: Vec<ChannelConfig>,
    /// Channel sampled by the potential gate and written by the field loader.
    pub potential_channel: String,
    /// Multiplier applied to secretion while the local potential is inside the gate band.
    pub potential_damping: f64,
    /// Factor converting field-file coordinates into simulation length units.
    pub field_length_scale: f64,
    /// Optional potential table loaded once during world construction.
    pub potential_file: Option<PathBuf>,
    /// Optional `x,y,z,species` table of cells added after random placement.
    pub cells_file: Option<PathBuf>,
    /// Registered species in registration order.
    pub species: Vec<SpeciesConfig>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            cells_per_species: 100,
            domain: DomainConfig::default(),
            channels: vec![
                ChannelConfig::named(POTENTIAL_CHANNEL, 0.0),
                ChannelConfig::named(QUORUM_FACTOR_1, 1.0),
                ChannelConfig::named(QUORUM_FACTOR_2, 1.0),
            ],
            potential_channel: POTENTIAL_CHANNEL.to_string(),
            potential_damping: DEFAULT_POTENTIAL_DAMPING,
            field_length_scale: DEFAULT_FIELD_LENGTH_SCALE,
            potential_file: None,
            cells_file: None,
            species: vec![
                SpeciesConfig {
                    name: PSEUDOMONAS_AERUGINOSA.to_string(),
                    baseline_death_rate: 0.02,
                    secretion_rates: vec![0.0, 1.0, 0.0],
                    kinetics: KineticParams {
                        max_apoptosis: 0.1,
                        ..KineticParams::default()
                    },
                    response: Some(ResponseRuleConfig {
                        signal_channel: QUORUM_FACTOR_1.to_string(),
                        signal_divisor: 1.0,
                        death_cap: DeathCap::Fixed(0.1),
                        secretion_channel: QUORUM_FACTOR_1.to_string(),
                    }),
                },
                SpeciesConfig {
                    name: STAPHYLOCOCCUS_AUREUS.to_string(),
                    baseline_death_rate: 0.01,
                    secretion_rates: vec![0.0, 1.0, 0.0],
                    kinetics: KineticParams {
                        max_apoptosis: 0.5,
                        ..KineticParams::default()
                    },
                    response: Some(ResponseRuleConfig {
                        signal_channel: QUORUM_FACTOR_2.to_string(),
                        signal_divisor: 5.0,
                        death_cap: DeathCap::Fixed(0.5),
                        secretion_channel: QUORUM_FACTOR_1.to_string(),
                    }),
                },
            ],
        }
    }
}

macro_rules! define_sim_config_error {
    (
        $(
            $variant:ident $( { $($field:ident : $type:ty),* } )? => $fmt:literal $(, $arg:expr)*
        );* $(;)?
    ) => {
        #[derive(Debug, Clone, PartialEq)]
        pub enum SimConfigError {
            $(
                $variant $( { $($field : $type),* } )?,
            )*
        }

        impl std::fmt::Display for SimConfigError {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(
                        Self::$variant $( { $($field),* } )? => write!(f, $fmt $(, $arg)*),
                    )*
                }
            }
        }
    };
}

define_sim_config_error! {
    AgentCountOverflow => "Total agent count overflow";
    TooManyAgents { max: usize, actual: usize } => "Too many agents: {} > max {}", actual, max;
    InvalidDomainBounds { axis: &'static str } => "domain {axis}_min/{axis}_max must be finite with min < max";
    InvalidVoxelSize { axis: &'static str } => "voxel size d{axis} must be positive and finite";
    TooManyVoxels { max: usize, actual: usize } => "voxel count ({actual}) exceeds supported maximum ({max})";
    NoChannels => "at least one field channel must be configured";
    EmptyChannelName => "field channel names must be non-empty";
    DuplicateChannel { name: String } => "field channel {name:?} is configured more than once";
    InvalidChannelInitialValue { name: String } => "initial value of channel {name:?} must be finite";
    UnknownChannel { name: String } => "unknown field channel {name:?}";
    InvalidPotentialDamping => "potential_damping must be finite and non-negative";
    InvalidFieldLengthScale => "field_length_scale must be positive and finite";
    NoSpecies => "at least one species must be registered";
    EmptySpeciesName => "species names must be non-empty";
    DuplicateSpecies { name: String } => "species {name:?} is registered more than once";
    TooManySpecies { max: usize, actual: usize } => "Too many species: {} > max {}", actual, max;
    InvalidBaselineDeathRate { species: String } => "baseline_death_rate of {species:?} must be finite and non-negative";
    SecretionChannelMismatch { species: String, expected: usize, actual: usize } => "{species:?} lists {actual} secretion rates but {expected} channels are configured";
    InvalidSecretionRate { species: String } => "secretion rates of {species:?} must be finite and non-negative";
    InvalidKinetics { species: String, reason: KineticsError } => "kinetic parameters of {species:?} are invalid: {reason}";
    InvalidSignalDivisor { species: String } => "signal_divisor of {species:?} must be positive and finite";
    InvalidDeathCap { species: String } => "fixed death cap of {species:?} must be finite and non-negative";
}

impl std::error::Error for SimConfigError {}

impl SimConfig {
    pub const MAX_TOTAL_AGENTS: usize = MAX_TOTAL_AGENTS;

    pub const MAX_VOXELS: usize = MAX_VOXELS;

    pub const MAX_SPECIES: usize = MAX_SPECIES;

    pub fn validate(&self) -> Result<(), SimConfigError> {
        self.validate_domain()?;
        self.validate_channels()?;
        self.validate_potential()?;
        self.validate_species()?;
        self.validate_agents()?;
        Ok(())
    }

    /// Total agents the tissue initializer will create.
    pub fn total_agents(&self) -> Option<usize> {
        self.species.len().checked_mul(self.cells_per_species)
    }

    pub fn has_channel(&self, name: &str) -> bool {
        self.channels.iter().any(|c| c.name == name)
    }

    fn validate_domain(&self) -> Result<(), SimConfigError> {
        let d = &self.domain;
        let bounds_ok = |min: f64, max: f64| min.is_finite() && max.is_finite() && min < max;
        let step_ok = |step: f64| step.is_finite() && step > 0.0;
        if !bounds_ok(d.x_min, d.x_max) {
            return Err(SimConfigError::InvalidDomainBounds { axis: "x" });
        }
        if !bounds_ok(d.y_min, d.y_max) {
            return Err(SimConfigError::InvalidDomainBounds { axis: "y" });
        }
        if !d.simulate_2d && !bounds_ok(d.z_min, d.z_max) {
            return Err(SimConfigError::InvalidDomainBounds { axis: "z" });
        }
        if !step_ok(d.dx) {
            return Err(SimConfigError::InvalidVoxelSize { axis: "x" });
        }
        if !step_ok(d.dy) {
            return Err(SimConfigError::InvalidVoxelSize { axis: "y" });
        }
        if !step_ok(d.dz) {
            return Err(SimConfigError::InvalidVoxelSize { axis: "z" });
        }
        let [nx, ny, nz] = d.dimensions();
        let voxels = nx
            .checked_mul(ny)
            .and_then(|n| n.checked_mul(nz))
            .unwrap_or(usize::MAX);
        if voxels > Self::MAX_VOXELS {
            return Err(SimConfigError::TooManyVoxels {
                max: Self::MAX_VOXELS,
                actual: voxels,
            });
        }
        Ok(())
    }

    fn validate_channels(&self) -> Result<(), SimConfigError> {
        if self.channels.is_empty() {
            return Err(SimConfigError::NoChannels);
        }
        let mut seen = HashSet::new();
        for channel in &self.channels {
            if channel.name.is_empty() {
                return Err(SimConfigError::EmptyChannelName);
            }
            if !seen.insert(channel.name.as_str()) {
                return Err(SimConfigError::DuplicateChannel {
                    name: channel.name.clone(),
                });
            }
            if !channel.initial_value.is_finite() {
                return Err(SimConfigError::InvalidChannelInitialValue {
                    name: channel.name.clone(),
                });
            }
        }
        Ok(())
    }

    fn validate_potential(&self) -> Result<(), SimConfigError> {
        self.require_channel(&self.potential_channel)?;
        if !(self.potential_damping.is_finite() && self.potential_damping >= 0.0) {
            return Err(SimConfigError::InvalidPotentialDamping);
        }
        if !(self.field_length_scale.is_finite() && self.field_length_scale > 0.0) {
            return Err(SimConfigError::InvalidFieldLengthScale);
        }
        Ok(())
    }

    fn validate_species(&self) -> Result<(), SimConfigError> {
        if self.species.is_empty() {
            return Err(SimConfigError::NoSpecies);
        }
        if self.species.len() > Self::MAX_SPECIES {
            return Err(SimConfigError::TooManySpecies {
                max: Self::MAX_SPECIES,
                actual: self.species.len(),
            });
        }
        let mut seen = HashSet::new();
        for species in &self.species {
            if species.name.is_empty() {
                return Err(SimConfigError::EmptySpeciesName);
            }
            if !seen.insert(species.name.as_str()) {
                return Err(SimConfigError::DuplicateSpecies {
                    name: species.name.clone(),
                });
            }
            self.validate_one_species(species)?;
        }
        Ok(())
    }

    fn validate_one_species(&self, species: &SpeciesConfig) -> Result<(), SimConfigError> {
        let name = || species.name.clone();
        if !(species.baseline_death_rate.is_finite() && species.baseline_death_rate >= 0.0) {
            return Err(SimConfigError::InvalidBaselineDeathRate { species: name() });
        }
        if species.secretion_rates.len() != self.channels.len() {
            return Err(SimConfigError::SecretionChannelMismatch {
                species: name(),
                expected: self.channels.len(),
                actual: species.secretion_rates.len(),
            });
        }
        if !species
            .secretion_rates
            .iter()
            .all(|r| r.is_finite() && *r >= 0.0)
        {
            return Err(SimConfigError::InvalidSecretionRate { species: name() });
        }
        species
            .kinetics
            .validate()
            .map_err(|reason| SimConfigError::InvalidKinetics {
                species: name(),
                reason,
            })?;

        let Some(rule) = &species.response else {
            return Ok(());
        };
        self.require_channel(&rule.signal_channel)?;
        self.require_channel(&rule.secretion_channel)?;
        if !(rule.signal_divisor.is_finite() && rule.signal_divisor > 0.0) {
            return Err(SimConfigError::InvalidSignalDivisor { species: name() });
        }
        if let DeathCap::Fixed(cap) = rule.death_cap {
            if !(cap.is_finite() && cap >= 0.0) {
                return Err(SimConfigError::InvalidDeathCap { species: name() });
            }
        }
        Ok(())
    }

    fn validate_agents(&self) -> Result<(), SimConfigError> {
        let total_agents = self
            .total_agents()
            .ok_or(SimConfigError::AgentCountOverflow)?;
        if total_agents > Self::MAX_TOTAL_AGENTS {
            return Err(SimConfigError::TooManyAgents {
                max: Self::MAX_TOTAL_AGENTS,
                actual: total_agents,
            });
        }
        Ok(())
    }

    fn require_channel(&self, name: &str) -> Result<(), SimConfigError> {
        if self.has_channel(name) {
            Ok(())
        } else {
            Err(SimConfigError::UnknownChannel {
                name: name.to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_accepts_default() {
        let config = SimConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn default_channel_order_puts_potential_in_first_slot() {
        let config = SimConfig::default();
        assert_eq!(config.channels[0].name, POTENTIAL_CHANNEL);
        assert_eq!(config.channels[1].name, QUORUM_FACTOR_1);
        assert_eq!(config.channels[2].name, QUORUM_FACTOR_2);
    }

    #[test]
    fn validate_rejects_unknown_signal_channel() {
        let mut config = SimConfig::default();
        if let Some(rule) = config.species[0].response.as_mut() {
            rule.signal_channel = "quorum factor 9".to_string();
        }
        assert_eq!(
            config.validate(),
            Err(SimConfigError::UnknownChannel {
                name: "quorum factor 9".to_string()
            })
        );
    }

    #[test]
    fn validate_rejects_unknown_potential_channel() {
        let config = SimConfig {
            potential_channel: "voltage".to_string(),
            ..SimConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(SimConfigError::UnknownChannel { .. })
        ));
    }

    #[test]
    fn validate_rejects_degenerate_half_max() {
        let mut config = SimConfig::default();
        config.species[1].kinetics.half_max = 0.0;
        assert_eq!(
            config.validate(),
            Err(SimConfigError::InvalidKinetics {
                species: STAPHYLOCOCCUS_AUREUS.to_string(),
                reason: KineticsError::DegenerateHalfMax,
            })
        );
    }

    #[test]
    fn validate_rejects_inverted_domain() {
        let config = SimConfig {
            domain: DomainConfig {
                x_min: 10.0,
                x_max: -10.0,
                ..DomainConfig::default()
            },
            ..SimConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(SimConfigError::InvalidDomainBounds { axis: "x" })
        );
    }

    #[test]
    fn validate_ignores_z_bounds_in_2d() {
        let config = SimConfig {
            domain: DomainConfig {
                z_min: 0.0,
                z_max: 0.0,
                simulate_2d: true,
                ..DomainConfig::default()
            },
            ..SimConfig::default()
        };
        assert!(config.validate().is_ok());
        assert_eq!(config.domain.dimensions(), [50, 50, 1]);
    }

    #[test]
    fn validate_rejects_secretion_length_mismatch() {
        let mut config = SimConfig::default();
        config.species[0].secretion_rates = vec![0.0, 1.0];
        assert_eq!(
            config.validate(),
            Err(SimConfigError::SecretionChannelMismatch {
                species: PSEUDOMONAS_AERUGINOSA.to_string(),
                expected: 3,
                actual: 2,
            })
        );
    }

    #[test]
    fn validate_rejects_duplicate_names() {
        let mut config = SimConfig::default();
        config.species[1].name = PSEUDOMONAS_AERUGINOSA.to_string();
        assert!(matches!(
            config.validate(),
            Err(SimConfigError::DuplicateSpecies { .. })
        ));

        let mut config = SimConfig::default();
        config.channels[2].name = QUORUM_FACTOR_1.to_string();
        assert!(matches!(
            config.validate(),
            Err(SimConfigError::DuplicateChannel { .. })
        ));
    }

    #[test]
    fn validate_rejects_too_many_agents() {
        let config = SimConfig {
            cells_per_species: SimConfig::MAX_TOTAL_AGENTS,
            ..SimConfig::default()
        };
        match config.validate() {
            Err(SimConfigError::TooManyAgents { .. }) => (),
            other => panic!("Expected TooManyAgents error, got {other:?}"),
        }
    }

    #[test]
    fn deserialize_rejects_unknown_death_cap() {
        let invalid_json = r#"{
            "species": [{ "name": "x", "response": { "death_cap": "unbounded" } }]
        }"#;
        let result = serde_json::from_str::<SimConfig>(invalid_json);
        assert!(result.is_err(), "unknown death cap should fail to parse");
    }

    #[test]
    fn partial_config_json_deserializes_with_defaults() {
        let json = r#"{
            "seed": 7,
            "cells_per_species": 3,
            "species": [{
                "name": "Pseudomonas Aeruginosa",
                "baseline_death_rate": 0.02,
                "secretion_rates": [0.0, 1.0, 0.0],
                "kinetics": { "Hill_coefficient": 3.0, "PD_half_max": 0.2 },
                "response": { "death_cap": { "fixed": 0.1 } }
            }]
        }"#;
        let cfg: SimConfig = serde_json::from_str(json).expect("partial config should parse");
        assert_eq!(cfg.seed, 7);
        assert_eq!(cfg.channels.len(), 3);
        assert_eq!(cfg.potential_channel, POTENTIAL_CHANNEL);
        assert_eq!(cfg.potential_damping, DEFAULT_POTENTIAL_DAMPING);
        assert_eq!(cfg.field_length_scale, DEFAULT_FIELD_LENGTH_SCALE);
        let species = &cfg.species[0];
        assert_eq!(species.kinetics.hill_coefficient, 3.0);
        assert_eq!(species.kinetics.half_max, 0.2);
        let rule = species.response.as_ref().expect("rule should parse");
        assert_eq!(rule.signal_channel, QUORUM_FACTOR_1);
        assert_eq!(rule.death_cap, DeathCap::Fixed(0.1));
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn error_display_messages_are_preserved() {
        let cases = vec![
            (
                SimConfigError::TooManyAgents {
                    max: 100,
                    actual: 200,
                },
                "Too many agents: 200 > max 100".to_string(),
            ),
            (
                SimConfigError::InvalidDomainBounds { axis: "y" },
                "domain y_min/y_max must be finite with min < max".to_string(),
            ),
            (
                SimConfigError::UnknownChannel {
                    name: "oxygen".to_string(),
                },
                "unknown field channel \"oxygen\"".to_string(),
            ),
            (
                SimConfigError::InvalidKinetics {
                    species: "a".to_string(),
                    reason: KineticsError::DegenerateHalfMax,
                },
                format!(
                    "kinetic parameters of \"a\" are invalid: {}",
                    KineticsError::DegenerateHalfMax
                ),
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(err.to_string(), expected);
        }
    }
}
