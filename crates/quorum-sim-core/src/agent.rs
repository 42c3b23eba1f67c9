use crate::controller::PhenotypeUpdate;
use crate::field::ChannelIndex;
use crate::kinetics::KineticParams;
use crate::species::{SpeciesId, SpeciesProfile};

/// Behavioral state of an agent, owned by the agent and changed only through
/// [`Phenotype::apply`].
#[derive(Clone, Debug, PartialEq)]
pub struct Phenotype {
    /// Apoptosis rate.
    pub death_rate: f64,
    /// One secretion rate per field channel, in channel order.
    pub secretion_rates: Vec<f64>,
}

impl Phenotype {
    pub fn secretion_rate(&self, channel: ChannelIndex) -> Option<f64> {
        self.secretion_rates.get(channel.get()).copied()
    }

    /// Write a controller result back. Only the death rate and one secretion slot change.
    pub fn apply(&mut self, update: &PhenotypeUpdate) {
        self.death_rate = update.death_rate;
        if let Some(slot) = self.secretion_rates.get_mut(update.secretion_channel.get()) {
            *slot = update.secretion_rate;
        }
    }
}

#[derive(Clone, Debug)]
pub struct Agent {
    pub id: u32,
    pub species: SpeciesId,
    pub position: [f64; 3],
    pub phenotype: Phenotype,
    /// Copied from the species defaults at creation; never modified afterwards.
    pub kinetics: KineticParams,
}

impl Agent {
    /// Create an agent carrying the default phenotype and kinetics of `profile`.
    pub fn new(id: u32, profile: &SpeciesProfile, position: [f64; 3]) -> Self {
        Self {
            id,
            species: profile.id(),
            position,
            phenotype: profile.default_phenotype(),
            kinetics: profile.kinetics(),
        }
    }
}
