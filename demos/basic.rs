//! Basic example of using llm-groupgen as a library
//!
//! Generates answers for two groups of files under `./src`. The API key is
//! read from `OPENAI_API_KEY`.

use llm_groupgen::{Config, OpenAiClient, Pipeline};

fn main() -> anyhow::Result<()> {
    let config = Config::builder()
        .base_dir("./src")
        .output_dir("./output")
        .prompt_template("Write three questions and answers about this code:\n{files_content}")
        .group("config", ["config.rs", "error.rs"], 1)
        .group("pipeline", ["pipeline.rs", "processor.rs"], 2)
        .build()?;

    let client = OpenAiClient::from_config(&config)?;
    let stats = Pipeline::new(config, client)?.run()?;

    stats.print_summary();

    println!(
        "✓ Generated {} answers ({} already existed)",
        stats.generated, stats.skipped_existing
    );
    println!("✓ Output written to: {}", stats.output_directory);

    Ok(())
}
