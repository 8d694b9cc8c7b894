//! Configuration management

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::{Deserialize, Serialize};

use crate::policy::WarningTrigger;
use crate::{Error, Result};

/// Default number of consecutive failed jobs before a connection is disabled
pub const DEFAULT_MAX_FAILED_JOBS_IN_A_ROW: u32 = 100;

/// Default number of days of only failed jobs before a connection is disabled
pub const DEFAULT_MAX_DAYS_OF_ONLY_FAILED_JOBS: u32 = 14;

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Environment files to load before processing config.
    /// Paths support ~ expansion. Loaded in order, later files override earlier.
    pub env_files: Vec<String>,
    /// Feature flags
    pub feature_flags: FeatureFlagsConfig,
    /// Policy thresholds
    pub thresholds: PolicyThresholds,
}

/// Feature flags evaluated once per invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureFlagsConfig {
    /// Allow the policy to disable failing connections
    pub auto_disables_failing_connections: bool,
}

impl Default for FeatureFlagsConfig {
    fn default() -> Self {
        Self {
            auto_disables_failing_connections: true,
        }
    }
}

/// Thresholds driving the disable and warning decisions.
///
/// Read-only for the duration of a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyThresholds {
    /// Consecutive failed jobs that disable a connection (M)
    pub max_failed_jobs_in_a_row: u32,
    /// Days of nothing but failed jobs that disable a connection (N)
    pub max_days_of_only_failed_jobs: u32,
    /// When the streak warning fires relative to the half threshold
    pub warning_trigger: WarningTrigger,
}

impl Default for PolicyThresholds {
    fn default() -> Self {
        Self {
            max_failed_jobs_in_a_row: DEFAULT_MAX_FAILED_JOBS_IN_A_ROW,
            max_days_of_only_failed_jobs: DEFAULT_MAX_DAYS_OF_ONLY_FAILED_JOBS,
            warning_trigger: WarningTrigger::default(),
        }
    }
}

impl PolicyThresholds {
    /// Create thresholds with the default warning trigger
    #[must_use]
    pub fn new(max_failed_jobs_in_a_row: u32, max_days_of_only_failed_jobs: u32) -> Self {
        Self {
            max_failed_jobs_in_a_row,
            max_days_of_only_failed_jobs,
            warning_trigger: WarningTrigger::default(),
        }
    }

    /// Streak length at which a warning is sent (M / 2)
    #[must_use]
    pub fn warning_failed_jobs_in_a_row(&self) -> u32 {
        self.max_failed_jobs_in_a_row / 2
    }

    /// Failure-only days after which a warning is sent (N / 2)
    #[must_use]
    pub fn warning_days_of_only_failed_jobs(&self) -> u32 {
        self.max_days_of_only_failed_jobs / 2
    }

    /// Reject thresholds the policy cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.max_failed_jobs_in_a_row < 1 {
            return Err(Error::Config(
                "thresholds.max_failed_jobs_in_a_row must be at least 1".to_string(),
            ));
        }
        if self.max_days_of_only_failed_jobs < 1 {
            return Err(Error::Config(
                "thresholds.max_days_of_only_failed_jobs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// The part of the configuration needed before the environment is read
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct EnvFilesSection {
    env_files: Vec<String>,
}

impl Config {
    /// Load configuration from file and environment
    ///
    /// # Errors
    ///
    /// Returns an error if the config file does not exist, cannot be parsed,
    /// or holds invalid thresholds.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::new();

        if let Some(p) = path {
            if !p.exists() {
                return Err(Error::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            figment = figment.merge(Yaml::file(p));
        }

        // Env files must be in the process environment before CONN_HEALTH_ is read
        let EnvFilesSection { env_files } = figment
            .clone()
            .merge(Env::prefixed("CONN_HEALTH_").split("__"))
            .extract()
            .map_err(|e| Error::Config(e.to_string()))?;
        load_env_files(&env_files);

        // CONN_HEALTH_THRESHOLDS__MAX_FAILED_JOBS_IN_A_ROW=50 etc.
        figment = figment.merge(Env::prefixed("CONN_HEALTH_").split("__"));

        let config: Self = figment
            .extract()
            .map_err(|e| Error::Config(e.to_string()))?;

        config.thresholds.validate()?;

        Ok(config)
    }
}

/// Load environment files into the process environment.
/// Files that don't exist are silently skipped; variables already set win.
fn load_env_files(env_files: &[String]) {
    for path_str in env_files {
        let expanded = match (path_str.strip_prefix('~'), dirs::home_dir()) {
            (Some(rest), Some(home)) => format!("{}{rest}", home.display()),
            _ => path_str.clone(),
        };

        let path = Path::new(&expanded);
        if !path.exists() {
            tracing::debug!("Env file not found (skipped): {expanded}");
            continue;
        }
        match dotenvy::from_path(path) {
            Ok(()) => tracing::info!("Loaded env file: {expanded}"),
            Err(e) => tracing::warn!("Failed to load env file {expanded}: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert!(config.feature_flags.auto_disables_failing_connections);
        assert_eq!(config.thresholds.max_failed_jobs_in_a_row, 100);
        assert_eq!(config.thresholds.max_days_of_only_failed_jobs, 14);
        assert_eq!(config.thresholds.warning_trigger, WarningTrigger::ExactMidpoint);
    }

    #[test]
    fn test_half_thresholds_use_integer_division() {
        let thresholds = PolicyThresholds::new(5, 7);
        assert_eq!(thresholds.warning_failed_jobs_in_a_row(), 2);
        assert_eq!(thresholds.warning_days_of_only_failed_jobs(), 3);
    }

    #[test]
    fn test_validate_rejects_zero() {
        assert!(PolicyThresholds::new(0, 14).validate().is_err());
        assert!(PolicyThresholds::new(10, 0).validate().is_err());
        assert!(PolicyThresholds::new(1, 1).validate().is_ok());
    }

    #[test]
    fn test_thresholds_deserialized_from_yaml() {
        let yaml = r"
feature_flags:
  auto_disables_failing_connections: false
thresholds:
  max_failed_jobs_in_a_row: 20
  warning_trigger: from_midpoint
";
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert!(!config.feature_flags.auto_disables_failing_connections);
        assert_eq!(config.thresholds.max_failed_jobs_in_a_row, 20);
        // Unset fields fall back to defaults
        assert_eq!(config.thresholds.max_days_of_only_failed_jobs, 14);
        assert_eq!(config.thresholds.warning_trigger, WarningTrigger::FromMidpoint);
    }

    #[test]
    fn test_load_missing_file() {
        let err = Config::load(Some(Path::new("/nonexistent/policy.yaml"))).unwrap_err();
        assert!(err.to_string().contains("Config file not found"));
    }

    #[test]
    fn test_load_env_files_sets_env_vars() {
        let dir = tempfile::tempdir().unwrap();
        let env_path = dir.path().join("test.env");
        let mut f = std::fs::File::create(&env_path).unwrap();
        writeln!(f, "CHP_TEST_ENV_FILE_KEY=loaded").unwrap();
        drop(f);

        load_env_files(&[env_path.to_string_lossy().to_string()]);

        assert_eq!(
            std::env::var("CHP_TEST_ENV_FILE_KEY").unwrap(),
            "loaded"
        );
    }

    #[test]
    fn test_load_env_files_skips_missing() {
        load_env_files(&["/nonexistent/path/.env".to_string()]);
    }

    #[test]
    fn test_env_file_overrides_thresholds() {
        let dir = tempfile::tempdir().unwrap();
        let env_path = dir.path().join("policy.env");
        std::fs::write(
            &env_path,
            "CONN_HEALTH_THRESHOLDS__MAX_DAYS_OF_ONLY_FAILED_JOBS=7\n",
        )
        .unwrap();
        let config_path = dir.path().join("policy.yaml");
        std::fs::write(
            &config_path,
            format!("env_files:\n  - {}\n", env_path.display()),
        )
        .unwrap();

        let config = Config::load(Some(&config_path)).unwrap();

        assert_eq!(config.thresholds.max_days_of_only_failed_jobs, 7);
        assert_eq!(config.thresholds.max_failed_jobs_in_a_row, 100);
    }
}
