use anyhow::{Context, Result};
use apiduel::analysis::{analyze, AnalysisReport};
use apiduel::catalog::{GraphqlCatalog, RestCatalog};
use apiduel::cli::{Cli, Command};
use apiduel::config::{Credentials, ExperimentConfig, OutputPaths};
use apiduel::csv_output;
use apiduel::executor::{build_client, GraphqlExecutor, RestExecutor};
use apiduel::json_output::JsonOutput;
use apiduel::observation::{Metric, ObservationSet};
use apiduel::report;
use apiduel::runner::{RunOutcome, TrialRunner};
use apiduel::stats::summarize;
use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::Path;
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber: progress by default, everything with --debug
fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::from_default_env().add_directive(tracing::Level::TRACE.into())
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("apiduel=info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn save(path: &Path, contents: &str) -> Result<()> {
    csv_output::write_table(path, contents)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    println!("💾 Saved: {}", path.display());
    Ok(())
}

/// Collect observations and persist the raw table
fn run_experiment(config: &ExperimentConfig, credentials: &Credentials) -> Result<RunOutcome> {
    let client = build_client(credentials.token())?;
    let mut rest = RestExecutor::new(client.clone(), RestCatalog::github(&config.rest_url));
    let mut graphql = GraphqlExecutor::new(client, GraphqlCatalog::github(&config.graphql_url));

    let rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    println!("🔬 Starting REST vs GraphQL experiment");
    println!(
        "   {} trials, {} warm-up runs, {}ms between requests",
        config.num_trials, config.warmup_runs, config.request_delay_ms
    );

    let outcome = TrialRunner::new(config, rng).run(&mut rest, &mut graphql);
    if outcome.observations.is_empty() {
        tracing::warn!("Every request failed; the observation table has no rows");
    }

    save(
        &config.output.observations,
        &csv_output::observations_to_csv(&outcome.observations),
    )?;
    print!("{}", report::render_run_preview(&outcome));

    Ok(outcome)
}

fn load_observations(path: &Path) -> Result<ObservationSet> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read observations from {}", path.display()))?;
    let set = csv_output::parse_observations(&text)
        .with_context(|| format!("Malformed observation table {}", path.display()))?;
    println!("📂 Loaded {} observations from {}", set.len(), path.display());
    Ok(set)
}

fn save_analysis(analysis: &AnalysisReport, paths: &OutputPaths) -> Result<()> {
    save(&paths.normality, &csv_output::normality_to_csv(&analysis.normality))?;
    save(
        &paths.rq1,
        &csv_output::results_to_csv(Metric::ResponseTimeMs, &analysis.rq1),
    )?;
    save(
        &paths.rq2,
        &csv_output::results_to_csv(Metric::PayloadSizeBytes, &analysis.rq2),
    )?;
    Ok(())
}

fn analyze_and_report(
    set: &ObservationSet,
    paths: &OutputPaths,
    json: Option<&Path>,
    outcome: Option<&RunOutcome>,
) -> Result<()> {
    // The descriptive table needs no pairing, so it is written even when analysis fails
    save(&paths.summary, &csv_output::summary_to_csv(&summarize(set)))?;
    let analysis = analyze(set).context("Analysis failed")?;
    print!("{}", report::render_analysis(&analysis));
    println!();
    save_analysis(&analysis, paths)?;

    if let Some(path) = json {
        let mut output = JsonOutput::new(analysis);
        if let Some(outcome) = outcome {
            output = output.with_run(outcome);
        }
        save(path, &output.to_json()?)?;
    }

    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.debug);

    match cli.command {
        Command::Run(args) => {
            let config = args.resolve_config()?;
            let credentials = args.experiment.credentials()?;
            run_experiment(&config, &credentials)?;
        }
        Command::Analyze(args) => {
            let config = args.resolve_config()?;
            let set = load_observations(&config.output.observations)?;
            analyze_and_report(&set, &config.output, args.json.as_deref(), None)?;
        }
        Command::All(args) => {
            let config = args.resolve_config()?;
            let credentials = args.experiment.credentials()?;
            let outcome = run_experiment(&config, &credentials)?;
            // analyze what was persisted, exactly as `analyze` would
            let set = load_observations(&config.output.observations)?;
            analyze_and_report(&set, &config.output, args.json.as_deref(), Some(&outcome))?;
        }
    }

    Ok(())
}
