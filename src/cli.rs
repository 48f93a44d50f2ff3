//! CLI argument parsing for apiduel

use crate::config::{Credentials, ExperimentConfig, OutputPaths, TOKEN_VAR};
use crate::error::ConfigError;
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "apiduel")]
#[command(version)]
#[command(
    about = "Paired REST vs GraphQL benchmark with normality-gated hypothesis testing",
    long_about = None
)]
pub struct Cli {
    /// Enable debug tracing on stderr
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the trials and write the raw observation table
    Run(RunArgs),
    /// Analyze a raw observation table
    Analyze(AnalyzeArgs),
    /// Run the trials, then analyze them
    All(AllArgs),
}

/// Trial design overrides
#[derive(Args, Debug, Clone, Default)]
pub struct ExperimentArgs {
    /// TOML config file (CLI flags take precedence)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Number of measured trials
    #[arg(short = 'n', long = "trials", value_name = "N")]
    pub trials: Option<u32>,

    /// Unmeasured warm-up runs per API
    #[arg(long = "warmup", value_name = "N")]
    pub warmup: Option<u32>,

    /// Pause after every request, in milliseconds
    #[arg(long = "delay-ms", value_name = "MS")]
    pub delay_ms: Option<u64>,

    /// Seed for the per-trial order shuffles
    #[arg(long, value_name = "SEED")]
    pub seed: Option<u64>,

    /// REST base URL
    #[arg(long = "rest-url", value_name = "URL")]
    pub rest_url: Option<String>,

    /// GraphQL endpoint
    #[arg(long = "graphql-url", value_name = "URL")]
    pub graphql_url: Option<String>,

    /// API token (falls back to .env)
    #[arg(long, env = TOKEN_VAR, hide_env_values = true, value_name = "TOKEN")]
    pub token: Option<String>,
}

impl ExperimentArgs {
    pub fn apply(&self, config: &mut ExperimentConfig) {
        if let Some(n) = self.trials {
            config.num_trials = n;
        }
        if let Some(n) = self.warmup {
            config.warmup_runs = n;
        }
        if let Some(ms) = self.delay_ms {
            config.request_delay_ms = ms;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        if let Some(ref url) = self.rest_url {
            config.rest_url = url.clone();
        }
        if let Some(ref url) = self.graphql_url {
            config.graphql_url = url.clone();
        }
    }

    pub fn credentials(&self) -> Result<Credentials, ConfigError> {
        match &self.token {
            Some(token) => Credentials::new(token.clone()),
            None => Credentials::from_env(),
        }
    }
}

/// Table locations
#[derive(Args, Debug, Clone, Default)]
pub struct TableArgs {
    /// Directory for every table (default names)
    #[arg(long = "output-dir", value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Raw observation table
    #[arg(short = 'o', long = "observations", value_name = "FILE")]
    pub observations: Option<PathBuf>,

    /// Descriptive summary table
    #[arg(long, value_name = "FILE")]
    pub summary: Option<PathBuf>,

    /// Normality table
    #[arg(long, value_name = "FILE")]
    pub normality: Option<PathBuf>,

    /// RQ1 (response time) result table
    #[arg(long, value_name = "FILE")]
    pub rq1: Option<PathBuf>,

    /// RQ2 (payload size) result table
    #[arg(long, value_name = "FILE")]
    pub rq2: Option<PathBuf>,
}

impl TableArgs {
    pub fn apply(&self, paths: &mut OutputPaths) {
        if let Some(ref dir) = self.output_dir {
            *paths = OutputPaths::in_dir(dir);
        }
        let overrides = [
            (&self.observations, &mut paths.observations),
            (&self.summary, &mut paths.summary),
            (&self.normality, &mut paths.normality),
            (&self.rq1, &mut paths.rq1),
            (&self.rq2, &mut paths.rq2),
        ];
        for (flag, path) in overrides {
            if let Some(p) = flag {
                *path = p.clone();
            }
        }
    }
}

#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub experiment: ExperimentArgs,

    #[command(flatten)]
    pub tables: TableArgs,
}

#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// TOML config file (only its [output] table is used)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub tables: TableArgs,

    /// Also write the full report as JSON
    #[arg(long, value_name = "FILE")]
    pub json: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct AllArgs {
    #[command(flatten)]
    pub experiment: ExperimentArgs,

    #[command(flatten)]
    pub tables: TableArgs,

    /// Also write the full report as JSON
    #[arg(long, value_name = "FILE")]
    pub json: Option<PathBuf>,
}

/// Defaults, overlaid by the TOML file when given
pub fn load_config(path: Option<&Path>) -> Result<ExperimentConfig, ConfigError> {
    match path {
        Some(path) => {
            tracing::info!("Loading config from {}", path.display());
            ExperimentConfig::from_toml_file(path)
        }
        None => Ok(ExperimentConfig::default()),
    }
}

fn resolve(
    experiment: Option<&ExperimentArgs>,
    config_path: Option<&Path>,
    tables: &TableArgs,
) -> Result<ExperimentConfig, ConfigError> {
    let mut config = load_config(config_path)?;
    if let Some(args) = experiment {
        args.apply(&mut config);
    }
    tables.apply(&mut config.output);
    config.validate()?;
    Ok(config)
}

impl RunArgs {
    pub fn resolve_config(&self) -> Result<ExperimentConfig, ConfigError> {
        resolve(
            Some(&self.experiment),
            self.experiment.config.as_deref(),
            &self.tables,
        )
    }
}

impl AnalyzeArgs {
    pub fn resolve_config(&self) -> Result<ExperimentConfig, ConfigError> {
        resolve(None, self.config.as_deref(), &self.tables)
    }
}

impl AllArgs {
    pub fn resolve_config(&self) -> Result<ExperimentConfig, ConfigError> {
        resolve(
            Some(&self.experiment),
            self.experiment.config.as_deref(),
            &self.tables,
        )
    }
}
