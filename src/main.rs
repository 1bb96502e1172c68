mod config;
mod lattice;
mod output;
mod simulation;

use anyhow::{Context, Result};
use clap::Parser;
use config::{read_setup_file, BatchConfig, ConfigError, RunConfig};
use log::{error, info, warn};
use simulation::DlaSimulation;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "dla-lattice")]
#[command(about = "Batch lattice Diffusion-Limited Aggregation simulator")]
struct Args {
    /// Setup file, one run per line: seed,probability,particles,policy.
    /// A .json extension selects the JSON batch format instead.
    #[arg(default_value = "setup.csv")]
    setup: PathBuf,

    /// Directory for per-run cluster log files
    #[arg(short, long, default_value = "data")]
    out_dir: PathBuf,

    /// Abandon a run after this many engine steps (0 = unlimited).
    /// Guards against configurations that can never halt, e.g. a
    /// stick probability of zero.
    #[arg(long, default_value = "0")]
    max_steps: u64,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let runs: Vec<Result<RunConfig, ConfigError>> =
        if args.setup.extension().is_some_and(|ext| ext == "json") {
            BatchConfig::load_from_file(&args.setup)
                .with_context(|| format!("loading JSON batch {}", args.setup.display()))?
                .runs
                .into_iter()
                .map(Ok)
                .collect()
        } else {
            read_setup_file(&args.setup)
                .with_context(|| format!("loading setup file {}", args.setup.display()))?
        };

    let mut completed = 0usize;
    let mut skipped = 0usize;
    for entry in runs {
        match entry {
            Ok(run) => match run_to_completion(&run, &args.out_dir, args.max_steps) {
                Ok(path) => {
                    completed += 1;
                    info!("wrote {}", path.display());
                }
                Err(err) => {
                    skipped += 1;
                    error!("run with seed {} failed: {err:#}", run.seed);
                }
            },
            Err(err) => {
                skipped += 1;
                error!("skipping setup line: {err}");
            }
        }
    }

    info!("batch finished: {completed} completed, {skipped} skipped");
    Ok(())
}

/// Drive one engine from construction to halt (or the step cap) and write
/// its cluster log.
fn run_to_completion(run: &RunConfig, out_dir: &Path, max_steps: u64) -> Result<PathBuf> {
    info!(
        "starting run: seed {}, probability {}, {} particles, {} policy",
        run.seed,
        run.stick_probability,
        run.target_particles,
        run.policy.name()
    );

    let mut sim = DlaSimulation::new(run.target_particles, run.stick_probability, run.policy)?;
    sim.set_seed(run.seed);

    let mut steps: u64 = 0;
    while !sim.is_halted() {
        sim.step()
            .with_context(|| format!("engine failed at step {steps}"))?;
        steps += 1;
        if max_steps != 0 && steps >= max_steps {
            warn!(
                "abandoning run with seed {} after {} steps ({} of {} particles stuck)",
                run.seed,
                steps,
                sim.stuck_particles(),
                run.target_particles
            );
            break;
        }
    }

    info!(
        "run with seed {} recorded {} stick events in {} steps (cluster radius {:.2})",
        run.seed,
        sim.cluster_log().count(),
        steps,
        sim.geometry().cluster_radius
    );
    let path = output::write_cluster_log(out_dir, run, sim.cluster_log())
        .with_context(|| format!("writing cluster log to {}", out_dir.display()))?;
    Ok(path)
}
