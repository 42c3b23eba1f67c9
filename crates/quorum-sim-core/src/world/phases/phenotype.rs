use crate::sampler::FieldSampler;
use rayon::prelude::*;

use super::super::World;

impl World {
    /// Run the dose-response controller once for every agent.
    ///
    /// Each worker writes only its own agent; the grid is shared read-only. Returns the
    /// number of agents whose phenotype was rewritten.
    pub(in crate::world) fn step_phenotype_phase(&mut self) -> usize {
        let sampler = FieldSampler::new(&self.grid);
        let controller = &self.controller;
        self.agents
            .par_iter_mut()
            .map(|agent| usize::from(controller.update(agent, &sampler)))
            .sum()
    }
}
