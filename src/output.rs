//! Per-run cluster-log files.
//!
//! Each completed run is serialized to `<out-dir>/<seed>-<probability>-
//! <particles>-<policy>.csv`, one `x,y,clusterRadius` record per stick
//! event, in stick order.

use crate::config::RunConfig;
use crate::simulation::StickEvent;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

/// File stem derived from the run parameters.
pub fn file_stem(cfg: &RunConfig) -> String {
    format!(
        "{}-{}-{}-{}",
        cfg.seed,
        cfg.stick_probability,
        cfg.target_particles,
        cfg.policy.name()
    )
}

/// Write the stick events to the run's output file, creating the output
/// directory if needed. Returns the path written.
pub fn write_cluster_log<'a, I>(out_dir: &Path, cfg: &RunConfig, events: I) -> io::Result<PathBuf>
where
    I: IntoIterator<Item = &'a StickEvent>,
{
    fs::create_dir_all(out_dir)?;
    let path = out_dir.join(format!("{}.csv", file_stem(cfg)));
    let mut writer = BufWriter::new(File::create(&path)?);
    for event in events {
        writeln!(writer, "{},{},{}", event.x, event.y, event.cluster_radius)?;
    }
    writer.flush()?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::CollisionPolicy;
    use tempfile::tempdir;

    fn sample_config() -> RunConfig {
        RunConfig {
            seed: 42,
            stick_probability: 0.5,
            target_particles: 3,
            policy: CollisionPolicy::Bump,
        }
    }

    #[test]
    fn file_stem_encodes_all_run_parameters() {
        assert_eq!(file_stem(&sample_config()), "42-0.5-3-bump");
    }

    #[test]
    fn writes_one_record_per_stick_event() {
        let events = vec![
            StickEvent {
                x: 1.0,
                y: 0.0,
                cluster_radius: 1.0,
            },
            StickEvent {
                x: -1.0,
                y: 1.0,
                cluster_radius: 1.4142135623730951,
            },
        ];

        let dir = tempdir().unwrap();
        let path = write_cluster_log(dir.path(), &sample_config(), &events).unwrap();
        assert_eq!(path, dir.path().join("42-0.5-3-bump.csv"));

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content, "1,0,1\n-1,1,1.4142135623730951\n");
    }

    #[test]
    fn empty_log_produces_an_empty_file() {
        let dir = tempdir().unwrap();
        let path = write_cluster_log(dir.path(), &sample_config(), std::iter::empty()).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "");
    }
}
