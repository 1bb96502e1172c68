//! Run-configuration parsing for batch simulations.
//!
//! The classic setup file has one run per line, `seed,probability,
//! particles,policy`, with the policy as a `0`/`1` flag. A JSON batch
//! format carries the same runs with named fields for tooling.

use crate::simulation::CollisionPolicy;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Problems reading or parsing run configurations. Line-level errors carry
/// the 1-based line number so a bad line can be reported and skipped
/// without aborting the batch.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("line {line}: expected 4 comma-separated fields, found {found}")]
    FieldCount { line: usize, found: usize },
    #[error("line {line}: invalid {field} `{value}`")]
    InvalidField {
        line: usize,
        field: &'static str,
        value: String,
    },
    #[error("line {line}: stick probability {value} outside [0, 1]")]
    ProbabilityRange { line: usize, value: f64 },
    #[error("failed to parse JSON batch file")]
    Json(#[from] serde_json::Error),
}

/// Immutable parameters of a single run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    pub seed: u64,
    pub stick_probability: f64,
    pub target_particles: usize,
    pub policy: CollisionPolicy,
}

impl RunConfig {
    /// Parse one `seed,probability,particles,policy` setup line.
    pub fn parse_line(line: &str, line_no: usize) -> Result<Self, ConfigError> {
        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        if fields.len() != 4 {
            return Err(ConfigError::FieldCount {
                line: line_no,
                found: fields.len(),
            });
        }

        let seed = fields[0]
            .parse::<u64>()
            .map_err(|_| ConfigError::InvalidField {
                line: line_no,
                field: "seed",
                value: fields[0].to_string(),
            })?;
        let stick_probability =
            fields[1]
                .parse::<f64>()
                .map_err(|_| ConfigError::InvalidField {
                    line: line_no,
                    field: "stick probability",
                    value: fields[1].to_string(),
                })?;
        if !(0.0..=1.0).contains(&stick_probability) {
            return Err(ConfigError::ProbabilityRange {
                line: line_no,
                value: stick_probability,
            });
        }
        let target_particles =
            fields[2]
                .parse::<usize>()
                .map_err(|_| ConfigError::InvalidField {
                    line: line_no,
                    field: "particle count",
                    value: fields[2].to_string(),
                })?;
        let policy =
            CollisionPolicy::from_token(fields[3]).ok_or_else(|| ConfigError::InvalidField {
                line: line_no,
                field: "collision policy",
                value: fields[3].to_string(),
            })?;

        Ok(Self {
            seed,
            stick_probability,
            target_particles,
            policy,
        })
    }
}

/// Read a CSV setup file. Blank lines are ignored; each remaining line
/// yields either a run or a line-level error for the caller to report.
pub fn read_setup_file(path: &Path) -> Result<Vec<Result<RunConfig, ConfigError>>, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;

    Ok(content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(idx, line)| RunConfig::parse_line(line, idx + 1))
        .collect())
}

/// A whole batch of runs in JSON form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Version field for future compatibility
    pub version: u32,
    pub runs: Vec<RunConfig>,
}

impl BatchConfig {
    pub fn new(runs: Vec<RunConfig>) -> Self {
        Self { version: 1, runs }
    }

    /// Export the batch to a JSON file.
    pub fn save_to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Ok(())
    }

    /// Import a batch from a JSON file.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Ok(serde_json::from_str(&content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_classic_setup_line() {
        let cfg = RunConfig::parse_line("42,0.8,1000,1", 1).unwrap();
        assert_eq!(
            cfg,
            RunConfig {
                seed: 42,
                stick_probability: 0.8,
                target_particles: 1000,
                policy: CollisionPolicy::Bump,
            }
        );
    }

    #[test]
    fn test_parse_tolerates_whitespace_and_named_policy() {
        let cfg = RunConfig::parse_line(" 7 , 0.25 , 500 , roll ", 3).unwrap();
        assert_eq!(cfg.seed, 7);
        assert_eq!(cfg.policy, CollisionPolicy::Roll);
    }

    #[test]
    fn test_wrong_field_count_is_rejected() {
        let err = RunConfig::parse_line("1,0.5,100", 2).unwrap_err();
        assert!(matches!(err, ConfigError::FieldCount { line: 2, found: 3 }));
    }

    #[test]
    fn test_non_numeric_fields_are_rejected() {
        assert!(RunConfig::parse_line("abc,0.5,100,0", 1).is_err());
        assert!(RunConfig::parse_line("1,high,100,0", 1).is_err());
        assert!(RunConfig::parse_line("1,0.5,many,0", 1).is_err());
        assert!(RunConfig::parse_line("1,0.5,100,sideways", 1).is_err());
    }

    #[test]
    fn test_probability_must_lie_in_unit_interval() {
        let err = RunConfig::parse_line("1,1.5,100,0", 4).unwrap_err();
        assert!(matches!(err, ConfigError::ProbabilityRange { line: 4, .. }));
        assert!(RunConfig::parse_line("1,-0.1,100,0", 4).is_err());
    }

    #[test]
    fn test_setup_file_reports_bad_lines_without_dropping_good_ones() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "1,1.0,100,0").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "not,a,valid,line").unwrap();
        writeln!(file, "2,0.5,200,bump").unwrap();
        file.flush().unwrap();

        let entries = read_setup_file(file.path()).unwrap();
        assert_eq!(entries.len(), 3);
        assert!(entries[0].is_ok());
        assert!(entries[1].is_err());
        let last = entries[2].as_ref().unwrap();
        assert_eq!(last.seed, 2);
        assert_eq!(last.policy, CollisionPolicy::Bump);
    }

    #[test]
    fn test_missing_setup_file() {
        let result = read_setup_file(Path::new("/nonexistent/setup.csv"));
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }

    #[test]
    fn test_json_batch_save_and_load() {
        let batch = BatchConfig::new(vec![
            RunConfig {
                seed: 11,
                stick_probability: 1.0,
                target_particles: 300,
                policy: CollisionPolicy::Roll,
            },
            RunConfig {
                seed: 12,
                stick_probability: 0.3,
                target_particles: 50,
                policy: CollisionPolicy::Bump,
            },
        ]);

        let file = NamedTempFile::new().unwrap();
        batch.save_to_file(file.path()).unwrap();
        let loaded = BatchConfig::load_from_file(file.path()).unwrap();

        assert_eq!(loaded.version, batch.version);
        assert_eq!(loaded.runs, batch.runs);
    }

    #[test]
    fn test_invalid_json_batch_file() {
        let file = NamedTempFile::new().unwrap();
        fs::write(file.path(), "not valid json").unwrap();
        assert!(matches!(
            BatchConfig::load_from_file(file.path()),
            Err(ConfigError::Json(_))
        ));
    }
}
