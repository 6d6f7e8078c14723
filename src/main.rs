use anyhow::Context;
use clap::Parser;
use llm_groupgen::{Config, DEFAULT_CONFIG_FILE, Generator, OpenAiClient, Offline, Pipeline};
use std::path::PathBuf;
use tracing::warn;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser, Debug)]
#[command(
    name = "llm-groupgen",
    version,
    about = "Generate LLM answers for groups of source files",
    long_about = "Generate LLM answers for groups of source files.\n\n\
    Reads group definitions from a YAML file, concatenates each group's files \
    into the prompt template, and writes one answer per group to the output \
    directory. Groups whose answer file already exists are skipped, so an \
    interrupted run can simply be started again.\n\n\
    The API key is read from the environment variable named by `api_key_env` \
    (OPENAI_API_KEY by default).\n\n\
    USAGE EXAMPLES:\n  \
      # Run with ./generate_qa_config.yaml\n  \
      llm-groupgen\n\n  \
      # Use another configuration file\n  \
      llm-groupgen --config ./qa.yaml\n\n  \
      # Check file lookup and prompts without calling the API\n  \
      llm-groupgen --dry-run -v\n\n  \
      # Machine-readable summary\n  \
      llm-groupgen --json"
)]
struct Cli {
    /// YAML configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE, value_name = "FILE")]
    config: PathBuf,

    /// Dry run (no API calls, no files written)
    #[arg(long)]
    dry_run: bool,

    /// Print the run summary as JSON instead of the text box
    #[arg(long)]
    json: bool,

    /// Verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_tracing(cli.verbose)?;

    let mut config = Config::from_file(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;

    if cli.dry_run {
        config.dry_run = true;
    }

    if config.dry_run {
        warn!("Dry run mode enabled - no generation calls will be made");
        return execute(config, Offline, cli.json);
    }

    let client = OpenAiClient::from_config(&config).context("Failed to create API client")?;
    execute(config, client, cli.json)
}

fn execute<G: Generator>(config: Config, generator: G, json: bool) -> anyhow::Result<()> {
    let stats = Pipeline::new(config, generator)
        .context("Failed to create pipeline")?
        .run()
        .context("Generation run failed")?;

    if json {
        println!("{}", stats.to_json().context("Failed to serialize run summary")?);
    } else {
        stats.print_summary();
    }
    Ok(())
}

fn setup_tracing(verbosity: u8) -> anyhow::Result<()> {
    let filter = match verbosity {
        0 => EnvFilter::new("llm_groupgen=info"),
        1 => EnvFilter::new("llm_groupgen=debug"),
        _ => EnvFilter::new("llm_groupgen=trace"),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_thread_ids(false))
        .init();

    Ok(())
}
