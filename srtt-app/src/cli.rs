use anyhow::{Context, Result};
use clap::Parser;
use srtt_core::KeyMap;
use srtt_experiment::{SessionConfig, TimeoutPolicy};
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "srtt", version, about = "Serial reaction-time task")]
pub struct Cli {
    /// Participant identifier (prompted for when omitted)
    #[arg(short, long)]
    pub participant: Option<String>,

    /// TOML file with session settings
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Number of stimulus positions
    #[arg(long)]
    pub positions: Option<usize>,

    #[arg(long)]
    pub blocks: Option<usize>,

    #[arg(long)]
    pub trials: Option<usize>,

    /// Response window in milliseconds
    #[arg(long)]
    pub timeout_ms: Option<f64>,

    /// Abandon a trial after this many timeouts instead of waiting forever
    /// (5 when given without a value)
    #[arg(long, value_name = "TIMEOUTS", num_args = 0..=1)]
    pub give_up_after: Option<Option<u32>>,

    /// Response keys, one per position from left to right
    #[arg(long)]
    pub keys: Option<String>,

    /// Respond with the bottom letter row (z x c v ...)
    #[arg(long, conflicts_with = "keys")]
    pub bottom_row: bool,

    /// Two blocks of ten trials
    #[arg(long)]
    pub test_mode: bool,

    /// Run a synthetic participant instead of reading the keyboard
    #[arg(long)]
    pub simulate: bool,

    /// Seed for sequence generation and the simulated participant
    #[arg(long)]
    pub seed: Option<u64>,

    /// Directory the result files are written to
    #[arg(short, long, default_value = "results")]
    pub output: PathBuf,
}

impl Cli {
    /// Defaults, then the config file, then command-line overrides.
    pub fn session_config(&self) -> Result<SessionConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let text = fs::read_to_string(path)
                    .with_context(|| format!("reading {}", path.display()))?;
                toml::from_str::<SessionConfig>(&text)
                    .with_context(|| format!("parsing {}", path.display()))?
            }
            None => SessionConfig::default(),
        };

        if self.test_mode {
            let reduced = SessionConfig::test_mode();
            config.block_count = reduced.block_count;
            config.trials_per_block = reduced.trials_per_block;
        }
        if let Some(positions) = self.positions {
            config.position_count = positions;
        }
        if let Some(blocks) = self.blocks {
            config.block_count = blocks;
        }
        if let Some(trials) = self.trials {
            config.trials_per_block = trials;
        }
        if let Some(timeout_ms) = self.timeout_ms {
            config.timeout_ms = timeout_ms;
        }
        match self.give_up_after {
            Some(Some(cap)) => config.timeout_policy = TimeoutPolicy::GiveUpAfter(cap),
            Some(None) => config.timeout_policy = TimeoutPolicy::bounded(),
            None => {}
        }
        if let Some(keys) = &self.keys {
            config.keys = KeyMap::new(keys)?;
        } else if self.bottom_row {
            config.keys = KeyMap::bottom_row();
        }

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use srtt_core::{ConfigError, Position};
    use std::io::Write;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("srtt").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn defaults_without_flags() {
        let config = parse(&[]).session_config().unwrap();
        assert_eq!(config, SessionConfig::default());
    }

    #[test]
    fn flags_override_test_mode() {
        let config = parse(&["--test-mode", "--trials", "15", "--give-up-after", "3"])
            .session_config()
            .unwrap();
        assert_eq!(config.block_count, 2);
        assert_eq!(config.trials_per_block, 15);
        assert_eq!(config.timeout_policy, TimeoutPolicy::GiveUpAfter(3));
    }

    #[test]
    fn bare_give_up_uses_default_cap() {
        let config = parse(&["--give-up-after"]).session_config().unwrap();
        assert_eq!(config.timeout_policy, TimeoutPolicy::GiveUpAfter(5));
        let config = parse(&[]).session_config().unwrap();
        assert_eq!(config.timeout_policy, TimeoutPolicy::Unbounded);
    }

    #[test]
    fn bottom_row_keys() {
        let config = parse(&["--bottom-row"]).session_config().unwrap();
        assert_eq!(config.keys.lookup('x'), Some(Position::new(1)));
    }

    #[test]
    fn keys_conflict_with_bottom_row() {
        let result = Cli::try_parse_from(["srtt", "--keys", "asdf", "--bottom-row"]);
        assert!(result.is_err());
    }

    #[test]
    fn invalid_override_is_rejected() {
        let err = parse(&["--positions", "6", "--keys", "asdf"])
            .session_config()
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConfigError>(),
            Some(ConfigError::KeyMapTooSmall { .. })
        ));
    }

    #[test]
    fn config_file_is_layered_under_flags() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "position_count = 6\ntimeout_ms = 2000.0").unwrap();
        let path = file.path().to_str().unwrap();

        let config = parse(&["--config", path, "--timeout-ms", "1500"])
            .session_config()
            .unwrap();
        assert_eq!(config.position_count, 6);
        assert_eq!(config.timeout_ms, 1500.0);
        assert_eq!(config.block_count, 8);
    }
}
