use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use quorum_sim_core::config::SimConfig;
use quorum_sim_core::world::World;
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "quorum-sim")]
#[command(about = "Quorum-sensing dose-response tissue simulation")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a simulation from a config file
    Run {
        /// Path to config file (JSON); defaults are used when omitted
        #[arg(long)]
        config: Option<PathBuf>,

        /// Potential field file (x,y,z,value per line), overrides `potential_file`
        #[arg(long)]
        potential: Option<PathBuf>,

        /// Initial cells file (x,y,z,species per line), overrides `cells_file`
        #[arg(long)]
        cells: Option<PathBuf>,

        /// Number of phenotype steps to run
        #[arg(long, default_value_t = 100)]
        steps: usize,

        /// Collect metrics every N steps
        #[arg(long, default_value_t = 10)]
        sample_every: usize,

        /// Output directory for summary.json (optional)
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Dump the default configuration to stdout
    DumpDefaultConfig,
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&PathBuf>) -> Result<SimConfig> {
    let Some(path) = path else {
        return Ok(SimConfig::default());
    };
    let file = File::open(path)
        .with_context(|| format!("failed to open config file {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file)).context("failed to parse config")
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::DumpDefaultConfig => {
            let config = SimConfig::default();
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        Commands::Run {
            config,
            potential,
            cells,
            steps,
            sample_every,
            out,
        } => {
            let mut sim_config = load_config(config.as_ref())?;
            if potential.is_some() {
                sim_config.potential_file = potential;
            }
            if cells.is_some() {
                sim_config.cells_file = cells;
            }

            let mut world = World::new(sim_config).context("failed to initialize world")?;
            info!(steps, sample_every, "simulating");
            let summary = world
                .try_run_experiment(steps, sample_every)
                .context("invalid experiment parameters")?;

            if let Some(out_dir) = out {
                std::fs::create_dir_all(&out_dir).context("failed to create output directory")?;
                let summary_path = out_dir.join("summary.json");
                let file = File::create(&summary_path).context("failed to create summary file")?;
                serde_json::to_writer_pretty(file, &summary).context("failed to write summary")?;
                println!("Run complete. Results saved to {}", summary_path.display());
            } else if let Some(last) = summary.samples.last() {
                println!("Run complete after {} steps", last.step);
                for species in &last.species {
                    println!(
                        "  {:<24} n={:<6} death mean={:.4} max={:.4}",
                        species.species,
                        species.count,
                        species.death_rate_mean,
                        species.death_rate_max
                    );
                }
            } else {
                println!("Run complete. No steps simulated.");
            }
        }
    }
    Ok(())
}
