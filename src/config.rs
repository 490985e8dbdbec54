//! Configuration for an index build.

use crate::quadkey;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Parameters of one bucket-index build.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Series name: output file prefix and the first tile path segment.
    pub series: String,

    /// Maximum represented quadtree depth.
    pub max_level: usize,

    /// Depth span materialized as one bucket's flat array.
    pub idx_step: usize,

    /// Size records file; read from stdin when unset.
    #[serde(default)]
    pub input: Option<PathBuf>,

    /// Directory the index files are written to.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

impl Config {
    /// Load configuration from a YAML or JSON file.
    /// Format is auto-detected from file extension (.yaml, .yml, or .json).
    pub fn from_file(path: &PathBuf) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

        let config: Config = match ext {
            "yaml" | "yml" => serde_yaml::from_str(&contents)?,
            "json" => serde_json::from_str(&contents)?,
            _ => {
                // Try YAML first (it's a superset of JSON)
                serde_yaml::from_str(&contents)?
            }
        };
        Ok(config)
    }

    /// Load configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> anyhow::Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.series.is_empty() {
            anyhow::bail!("Series name must not be empty");
        }
        if self.series.contains(['/', '\\']) {
            anyhow::bail!("Series name must not contain path separators");
        }
        if self.idx_step == 0 {
            anyhow::bail!("Index step must be > 0");
        }
        if self.idx_step > self.max_level {
            anyhow::bail!(
                "Index step ({}) must not exceed max level ({})",
                self.idx_step,
                self.max_level
            );
        }
        if self.max_level > quadkey::MAX_DEPTH {
            anyhow::bail!("Max level must be <= {}", quadkey::MAX_DEPTH);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> Config {
        Config {
            series: "sat".to_string(),
            max_level: 14,
            idx_step: 7,
            input: None,
            output_dir: default_output_dir(),
        }
    }

    #[test]
    fn test_validation_ok() {
        assert!(base_config().validate().is_ok());
    }

    #[test]
    fn test_validation_equal_step_and_level_ok() {
        let mut config = base_config();
        config.idx_step = 14;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_empty_series() {
        let mut config = base_config();
        config.series = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_series_with_slash() {
        let mut config = base_config();
        config.series = "out/sat".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_zero_step() {
        let mut config = base_config();
        config.idx_step = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_step_exceeds_level() {
        let mut config = base_config();
        config.idx_step = 15;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_level_exceeds_codec_depth() {
        let mut config = base_config();
        config.max_level = quadkey::MAX_DEPTH + 1;
        config.idx_step = 7;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_yaml() {
        let config = Config::from_yaml(
            "series: sat\nmax_level: 14\nidx_step: 7\noutput_dir: /tmp/out\n",
        )
        .unwrap();
        assert_eq!(config.series, "sat");
        assert_eq!(config.max_level, 14);
        assert_eq!(config.idx_step, 7);
        assert_eq!(config.output_dir, PathBuf::from("/tmp/out"));
        assert!(config.input.is_none());
    }

    #[test]
    fn test_from_yaml_defaults() {
        let config = Config::from_yaml("series: sat\nmax_level: 4\nidx_step: 2\n").unwrap();
        assert_eq!(config.output_dir, PathBuf::from("."));
    }

    #[test]
    fn test_from_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("job.json");
        std::fs::write(&path, r#"{"series":"topo","max_level":8,"idx_step":4}"#).unwrap();
        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.series, "topo");
        assert!(config.validate().is_ok());
    }
}
