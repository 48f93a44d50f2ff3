//! Experiment configuration and credentials
//!
//! Precedence, lowest first: built-in defaults, the optional TOML file, CLI
//! flags. The file may set any subset of fields.

use crate::catalog::{DEFAULT_GRAPHQL_URL, DEFAULT_REST_URL};
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable holding the API token
pub const TOKEN_VAR: &str = "GITHUB_TOKEN";

/// Trial design and pacing
///
/// # Example
/// ```
/// use apiduel::config::ExperimentConfig;
///
/// let config = ExperimentConfig::default();
/// assert_eq!(config.num_trials, 30);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExperimentConfig {
    /// Measured trials; every trial runs all 6 conditions once
    pub num_trials: u32,

    /// Unmeasured `simple` queries per API before trial 1
    pub warmup_runs: u32,

    /// Pause after every measured request (rate-limit courtesy)
    pub request_delay_ms: u64,

    /// Fixes the per-trial order shuffles; None seeds from the OS
    pub seed: Option<u64>,

    pub rest_url: String,

    pub graphql_url: String,

    pub output: OutputPaths,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            num_trials: 30,
            warmup_runs: 5,
            request_delay_ms: 500,
            seed: None,
            rest_url: DEFAULT_REST_URL.to_string(),
            graphql_url: DEFAULT_GRAPHQL_URL.to_string(),
            output: OutputPaths::default(),
        }
    }
}

impl ExperimentConfig {
    /// Load a TOML file; missing fields keep their defaults
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.num_trials == 0 {
            return Err(ConfigError::Invalid("num_trials must be at least 1".into()));
        }
        if self.num_trials < 3 {
            tracing::warn!(
                "num_trials = {}: the analysis needs at least 3 trials per condition",
                self.num_trials
            );
        }

        for (name, url) in [("rest_url", &self.rest_url), ("graphql_url", &self.graphql_url)] {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ConfigError::Invalid(format!(
                    "{} must be an http(s) URL, got '{}'",
                    name, url
                )));
            }
        }

        Ok(())
    }
}

/// Where the tables are written (and the raw table is read back from)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputPaths {
    pub observations: PathBuf,
    pub summary: PathBuf,
    pub normality: PathBuf,
    pub rq1: PathBuf,
    pub rq2: PathBuf,
}

impl Default for OutputPaths {
    fn default() -> Self {
        Self {
            observations: PathBuf::from("resultados_experimento.csv"),
            summary: PathBuf::from("estatisticas_descritivas.csv"),
            normality: PathBuf::from("normalidade.csv"),
            rq1: PathBuf::from("rq1_resultados_tempo.csv"),
            rq2: PathBuf::from("rq2_resultados_tamanho.csv"),
        }
    }
}

impl OutputPaths {
    /// Same file names under `dir`
    pub fn in_dir(dir: &Path) -> Self {
        let defaults = Self::default();
        Self {
            observations: dir.join(defaults.observations),
            summary: dir.join(defaults.summary),
            normality: dir.join(defaults.normality),
            rq1: dir.join(defaults.rq1),
            rq2: dir.join(defaults.rq2),
        }
    }
}

/// API token, never logged
#[derive(Clone)]
pub struct Credentials {
    token: String,
}

impl Credentials {
    pub fn new(token: impl Into<String>) -> Result<Self, ConfigError> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(ConfigError::MissingCredential(TOKEN_VAR));
        }
        Ok(Self { token })
    }

    /// Read `GITHUB_TOKEN` after loading `.env` from the working directory
    pub fn from_env() -> Result<Self, ConfigError> {
        if dotenv::dotenv().is_ok() {
            tracing::debug!("Loaded .env");
        }
        let token =
            std::env::var(TOKEN_VAR).map_err(|_| ConfigError::MissingCredential(TOKEN_VAR))?;
        Self::new(token)
    }

    pub fn token(&self) -> &str {
        &self.token
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials").field("token", &"***").finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = ExperimentConfig::default();
        assert_eq!(config.num_trials, 30);
        assert_eq!(config.warmup_runs, 5);
        assert_eq!(config.request_delay(), Duration::from_millis(500));
        assert_eq!(config.seed, None);
        assert_eq!(config.rest_url, "https://api.github.com");
        assert_eq!(
            config.output.rq1,
            PathBuf::from("rq1_resultados_tempo.csv")
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    #[allow(clippy::field_reassign_with_default)]
    fn test_zero_trials_invalid() {
        let mut config = ExperimentConfig::default();
        config.num_trials = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    #[allow(clippy::field_reassign_with_default)]
    fn test_non_http_url_invalid() {
        let mut config = ExperimentConfig::default();
        config.graphql_url = "ftp://example.com".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("graphql_url"));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "num_trials = 10\nseed = 42\n\n[output]\nrq2 = \"out/rq2.csv\"").unwrap();

        let config = ExperimentConfig::from_toml_file(file.path()).unwrap();
        assert_eq!(config.num_trials, 10);
        assert_eq!(config.seed, Some(42));
        assert_eq!(config.warmup_runs, 5);
        assert_eq!(config.output.rq2, PathBuf::from("out/rq2.csv"));
        assert_eq!(config.output.rq1, PathBuf::from("rq1_resultados_tempo.csv"));
    }

    #[test]
    fn test_unknown_toml_key_is_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "trials = 10").unwrap();
        assert!(matches!(
            ExperimentConfig::from_toml_file(file.path()),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_missing_config_file_is_io_error() {
        let err = ExperimentConfig::from_toml_file(Path::new("/nonexistent/apiduel.toml"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
        assert!(err.to_string().contains("/nonexistent/apiduel.toml"));
    }

    #[test]
    fn test_output_paths_in_dir() {
        let paths = OutputPaths::in_dir(Path::new("/tmp/run1"));
        assert_eq!(
            paths.observations,
            PathBuf::from("/tmp/run1/resultados_experimento.csv")
        );
    }

    #[test]
    fn test_blank_token_is_missing() {
        assert!(matches!(
            Credentials::new("  "),
            Err(ConfigError::MissingCredential("GITHUB_TOKEN"))
        ));
    }

    #[test]
    fn test_credentials_debug_hides_token() {
        let creds = Credentials::new("ghp_secret").unwrap();
        assert_eq!(creds.token(), "ghp_secret");
        assert!(!format!("{:?}", creds).contains("ghp_secret"));
    }

    #[test]
    #[serial_test::serial]
    fn test_from_env_reads_token() {
        std::env::set_var(TOKEN_VAR, "ghp_from_env");
        let creds = Credentials::from_env().unwrap();
        assert_eq!(creds.token(), "ghp_from_env");
        std::env::remove_var(TOKEN_VAR);
    }
}
