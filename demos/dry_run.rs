//! Dry run example
//!
//! Shows which groups would be sent without calling the API or writing any
//! files. No API key is needed.

use llm_groupgen::{Config, Offline, Pipeline};

fn main() -> anyhow::Result<()> {
    let config = Config::builder()
        .base_dir("./src")
        .output_dir("./output")
        .prompt_template("Summarize:\n{files_content}")
        .group("core", ["lib.rs", "pipeline.rs"], 2)
        .group("missing", ["does_not_exist.rs"], 1)
        .dry_run(true)
        .build()?;

    println!("Running in DRY RUN mode - nothing will be sent or written\n");

    let pipeline = Pipeline::new(config, Offline)?;
    for group in pipeline.groups() {
        println!("  {} -> {:?}", group.key, group.files);
    }

    let stats = pipeline.run()?;

    println!("\nWould have generated: {} answers", stats.dry_run);
    println!("Groups without readable files: {}", stats.skipped_no_files);
    println!("Groups already answered: {}", stats.skipped_existing);

    Ok(())
}
