use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while loading or validating a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(&'static str),
}

/// Every tunable the simulator reads.
///
/// Keys use the PascalCase names of the screensaver's settings file. Keys
/// missing from a file take their type default (0 or false), exactly like
/// `Config::default()`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct Config {
    /// Length of one simulation cycle in milliseconds. Must be positive.
    pub ms_per_cycle: u32,
    /// Capacity of each thread's stack.
    pub max_stack_size: u32,
    /// Population ceiling enforced at the end of every cycle.
    pub max_thread_count: u32,
    /// Cells overwritten with a random operation per cycle.
    pub random_noise_per_cycle: u32,
    /// Threads started at random cells per cycle.
    pub new_threads_per_cycle: u32,
    /// Executions a fresh SPAWN cell survives before turning into HALT.
    pub spawn_life_span: u32,
    /// Relative weight of COPY in random noise.
    pub copy_slice: u32,
    /// Relative weight of HALT in random noise.
    pub halt_slice: u32,
    /// Relative weight of PUSH in random noise.
    pub push_slice: u32,
    /// Relative weight of SPAWN in random noise.
    pub spawn_slice: u32,
    /// Allow new threads to run backwards.
    pub reverse_enabled: bool,
    /// Fill memory with noise at construction instead of HALT.
    pub randomize_memory_on_initialize: bool,
    /// Emit a zoom effect on every cell written by COPY.
    pub use_copy_effect: bool,
    /// Emit fall and pulse effects where a thread dies.
    pub use_thread_death_effect: bool,
    /// Emit a zoom effect where a SPAWN cell expires.
    pub use_spawn_expire_effect: bool,
    /// Trim the population by killing random threads instead of the oldest.
    pub thread_reduction_enabled: bool,
}

impl Config {
    /// The settings the screensaver shipped with.
    pub fn screensaver() -> Self {
        Self {
            ms_per_cycle: 50,
            max_stack_size: 16,
            max_thread_count: 64,
            random_noise_per_cycle: 4,
            new_threads_per_cycle: 1,
            spawn_life_span: 8,
            copy_slice: 10,
            halt_slice: 2,
            push_slice: 40,
            spawn_slice: 4,
            reverse_enabled: true,
            randomize_memory_on_initialize: true,
            use_copy_effect: true,
            use_thread_death_effect: true,
            use_spawn_expire_effect: true,
            thread_reduction_enabled: false,
        }
    }

    /// Parse a TOML document and validate it.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ms_per_cycle == 0 {
            return Err(ConfigError::Invalid("MsPerCycle must be positive"));
        }
        Ok(())
    }

    /// Sum of the four noise weights. Widened so that no combination of
    /// `u32` weights can overflow.
    pub fn total_slice(&self) -> u64 {
        self.copy_slice as u64
            + self.halt_slice as u64
            + self.push_slice as u64
            + self.spawn_slice as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_type_defaults() {
        let config = Config::default();
        assert_eq!(config.ms_per_cycle, 0);
        assert_eq!(config.total_slice(), 0);
        assert!(!config.reverse_enabled);
        assert!(!config.use_copy_effect);
    }

    #[test]
    fn test_total_slice_of_extreme_weights() {
        let config = Config::from_toml_str(
            "MsPerCycle = 10\nCopySlice = 4294967295\nHaltSlice = 1\nSpawnSlice = 4294967295",
        )
        .unwrap();
        assert_eq!(config.total_slice(), 2 * u32::MAX as u64 + 1);
    }

    #[test]
    fn test_screensaver_preset_is_valid() {
        assert!(Config::screensaver().validate().is_ok());
    }

    #[test]
    fn test_parse_pascal_case_keys() {
        let config = Config::from_toml_str(
            r#"
            MsPerCycle = 20
            MaxStackSize = 8
            CopySlice = 3
            ReverseEnabled = true
            UseThreadDeathEffect = true
            "#,
        )
        .unwrap();
        assert_eq!(config.ms_per_cycle, 20);
        assert_eq!(config.max_stack_size, 8);
        assert_eq!(config.copy_slice, 3);
        assert!(config.reverse_enabled);
        assert!(config.use_thread_death_effect);
    }

    #[test]
    fn test_missing_keys_fall_back_to_defaults() {
        let config = Config::from_toml_str("MsPerCycle = 10").unwrap();
        assert_eq!(
            config,
            Config {
                ms_per_cycle: 10,
                ..Config::default()
            }
        );
    }

    #[test]
    fn test_zero_cycle_length_rejected() {
        let err = Config::from_toml_str("MaxStackSize = 4").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_negative_value_is_parse_error() {
        let err = Config::from_toml_str("MsPerCycle = -5").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_serialized_preset_parses_back() {
        let text = toml::to_string(&Config::screensaver()).unwrap();
        assert!(text.contains("MsPerCycle"));
        assert_eq!(Config::from_toml_str(&text).unwrap(), Config::screensaver());
    }

    #[test]
    fn test_shipped_settings_match_preset() {
        let config = Config::from_toml_str(include_str!("../vmlife.toml")).unwrap();
        assert_eq!(config, Config::screensaver());
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let err = Config::load("/nonexistent/vmlife.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
