use crate::agent::Agent;
use crate::config::DomainConfig;
use crate::loader::{parse_number, split_record, RecordError};
use crate::rng::uniform_point;
use crate::species::{SpeciesId, SpeciesRegistry};
use rand::Rng;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TissueError {
    #[error("agent id space exhausted after {0} agents")]
    AgentIdOverflow(usize),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CellRecordError {
    #[error(transparent)]
    Record(#[from] RecordError),
    #[error("unknown species {0:?}")]
    UnknownSpecies(String),
}

#[derive(Debug, Error)]
pub enum CellLoadError {
    #[error("failed to open cells file {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to read cell data at line {line}: {source}")]
    Read {
        line: usize,
        #[source]
        source: io::Error,
    },
    #[error("malformed cell record at line {line}: {reason}")]
    Malformed { line: usize, reason: CellRecordError },
    #[error(transparent)]
    Tissue(#[from] TissueError),
}

/// One parsed `x,y,z,species` line.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CellRecord {
    pub position: [f64; 3],
    pub species: SpeciesId,
}

/// Create `cells_per_species` agents of every registered species, in registration
/// order, at independent uniform positions inside the domain box.
///
/// No overlap checking is done. Ids are assigned sequentially from zero.
pub fn place_tissue<R: Rng + ?Sized>(
    registry: &SpeciesRegistry,
    domain: &DomainConfig,
    cells_per_species: usize,
    rng: &mut R,
) -> Result<Vec<Agent>, TissueError> {
    let (lower, upper) = domain.placement_bounds();
    let mut agents = Vec::with_capacity(registry.len().saturating_mul(cells_per_species));
    for profile in registry.iter() {
        info!(
            species = profile.name(),
            count = cells_per_species,
            "placing cells"
        );
        for _ in 0..cells_per_species {
            let id = u32::try_from(agents.len())
                .map_err(|_| TissueError::AgentIdOverflow(agents.len()))?;
            agents.push(Agent::new(id, profile, uniform_point(rng, lower, upper)));
        }
    }
    Ok(agents)
}

/// Parse one `x,y,z,species` line. Blank lines yield `Ok(None)`.
///
/// The species column holds a registered name, or a registration index when no species
/// carries that name. Positions are in simulation units and are not scaled.
pub fn parse_cell_record(
    line: &str,
    registry: &SpeciesRegistry,
) -> Result<Option<CellRecord>, CellRecordError> {
    let Some([x, y, z, species]) = split_record(line)? else {
        return Ok(None);
    };
    let position = [parse_number(0, x)?, parse_number(1, y)?, parse_number(2, z)?];
    let species = registry
        .id_of(species)
        .or_else(|| {
            let index: usize = species.parse().ok()?;
            registry.iter().nth(index).map(|p| p.id())
        })
        .ok_or_else(|| CellRecordError::UnknownSpecies(species.to_string()))?;
    Ok(Some(CellRecord { position, species }))
}

/// Create one agent per record of `reader`, ids counting up from `first_id`.
///
/// Nothing is returned unless every line parses.
pub fn load_cell_records<R: BufRead>(
    registry: &SpeciesRegistry,
    reader: R,
    first_id: usize,
) -> Result<Vec<Agent>, CellLoadError> {
    let mut agents = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line_no = idx + 1;
        let line = line.map_err(|source| CellLoadError::Read {
            line: line_no,
            source,
        })?;
        let record = parse_cell_record(&line, registry).map_err(|reason| {
            CellLoadError::Malformed {
                line: line_no,
                reason,
            }
        })?;
        let Some(record) = record else {
            continue;
        };
        let next = first_id.saturating_add(agents.len());
        let id = u32::try_from(next).map_err(|_| TissueError::AgentIdOverflow(next))?;
        let Some(profile) = registry.get(record.species) else {
            continue;
        };
        agents.push(Agent::new(id, profile, record.position));
    }
    Ok(agents)
}

/// Open `path` and create its agents.
pub fn load_cells_file(
    registry: &SpeciesRegistry,
    path: impl AsRef<Path>,
    first_id: usize,
) -> Result<Vec<Agent>, CellLoadError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| CellLoadError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let agents = load_cell_records(registry, BufReader::new(file), first_id)?;
    info!(path = %path.display(), cells = agents.len(), "loaded initial cells");
    Ok(agents)
}
