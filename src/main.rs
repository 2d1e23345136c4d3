use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use simscore::config::Config;
use simscore::embed::openai::OpenAiEmbedder;
use simscore::{BatchRunner, EmbeddingCache, Metric, ModelConfig, TestCases, report};

#[derive(Parser)]
#[command(name = "simscore", version, about = "Score text similarity across embedding models and metrics")]
struct Cli {
    /// Directory holding simscore.toml and the relative paths it names
    #[arg(long, global = true, default_value = ".")]
    root: PathBuf,
    /// Log cache hits and misses
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score every case in the test-case file and write the CSV report
    Run {
        /// Test-case file (default from config)
        #[arg(long)]
        cases: Option<PathBuf>,
        /// Report destination (default from config)
        #[arg(long)]
        output: Option<PathBuf>,
        /// Also print every result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Compare two texts directly
    Compare {
        first: String,
        second: String,
        /// Embedding model (default from config)
        #[arg(long)]
        model: Option<String>,
        /// Requested output dimensionality
        #[arg(long)]
        dimensions: Option<usize>,
        /// euclidean, manhattan, cosine, or negative-inner-product
        #[arg(long)]
        metric: Option<Metric>,
    },
    /// Write simscore.toml and an example test-case file
    Init,
    /// Show what the embedding cache holds
    Cache,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    dotenvy::dotenv().ok();

    let config = Config::load(&cli.root)?;

    match cli.command {
        Commands::Run { cases, output, json } => {
            let cases_path = Config::resolve(
                &cli.root,
                cases.as_deref().unwrap_or(&config.files.test_cases),
            );
            let output_path =
                Config::resolve(&cli.root, output.as_deref().unwrap_or(&config.files.output));
            let cases = TestCases::load_or_init(&cases_path)?;

            let mut cache = open_cache(&cli.root, &config);
            let report = BatchRunner::new(&mut cache, config.defaults()).run(&cases)?;
            report::write_csv(&report, &output_path)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&report.results)?);
            }
            println!(
                "{} scores ({} shape, {} new embeddings) saved to {}",
                report.results.len(),
                cases.shape(),
                cache.misses(),
                output_path.display()
            );
        }
        Commands::Compare {
            first,
            second,
            model,
            dimensions,
            metric,
        } => {
            let defaults = config.defaults();
            let model = match model {
                Some(name) => ModelConfig::new(name, dimensions),
                None => ModelConfig {
                    dimensions: dimensions.or(defaults.model.dimensions),
                    ..defaults.model.clone()
                },
            };
            let cases = TestCases::DirectPair {
                first,
                second,
                name: None,
                model: Some(model),
                metric,
            };

            let mut cache = open_cache(&cli.root, &config);
            let report = BatchRunner::new(&mut cache, defaults).run(&cases)?;
            for result in &report.results {
                println!("{} {} = {}", result.model, result.metric, result.percent);
            }
        }
        Commands::Init => {
            let config_path = cli.root.join(simscore::config::CONFIG_FILE);
            if config_path.exists() {
                println!("{} already exists", config_path.display());
            } else {
                config.save(&cli.root)?;
                println!("Wrote {}", config_path.display());
            }
            let cases_path = Config::resolve(&cli.root, &config.files.test_cases);
            let cases = TestCases::load_or_init(&cases_path)?;
            println!("Test cases: {} ({} shape)", cases_path.display(), cases.shape());
        }
        Commands::Cache => {
            let cache = open_cache(&cli.root, &config);
            let stats = cache.stats();
            println!("{}: {} embeddings", stats.path.display(), stats.entries);
            for (namespace, count) in &stats.namespaces {
                println!("  {namespace}: {count}");
            }
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "simscore=debug" } else { "simscore=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn open_cache(root: &Path, config: &Config) -> EmbeddingCache {
    let provider = OpenAiEmbedder::new(
        &config.provider.base_url,
        config.api_key(),
        config.provider.timeout_secs,
    );
    EmbeddingCache::load(Config::resolve(root, &config.files.cache), Box::new(provider))
}
