use crate::{
    client::Generator,
    config::Config,
    error::Result,
    expand::{expand_groups, ExpandedGroup},
    processor::{GroupOutcome, GroupProcessor},
    template::PromptTemplate,
};
use serde::Serialize;
use std::time::{Duration, Instant};
use tracing::{error, info, instrument, warn};

/// Statistics collected during a run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunStats {
    /// Number of expanded groups
    pub total_groups: usize,

    /// Groups with a freshly generated answer
    pub generated: usize,

    /// Groups skipped because their answer already existed
    pub skipped_existing: usize,

    /// Groups skipped because none of their files were readable
    pub skipped_no_files: usize,

    /// Groups rendered in dry run mode
    pub dry_run: usize,

    /// Groups that failed (endpoint error or write error)
    pub failed: usize,

    /// Total execution time
    #[serde(serialize_with = "serialize_secs")]
    pub duration: Duration,

    /// Output directory path
    pub output_directory: String,
}

impl RunStats {
    fn record(&mut self, outcome: &GroupOutcome) {
        match outcome {
            GroupOutcome::SkippedNoFiles => self.skipped_no_files += 1,
            GroupOutcome::SkippedExists { .. } => self.skipped_existing += 1,
            GroupOutcome::DryRun { .. } => self.dry_run += 1,
            GroupOutcome::ApiFailed { .. } => self.failed += 1,
            GroupOutcome::Generated { .. } => self.generated += 1,
        }
    }

    /// Renders the statistics as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Prints a human-readable summary to stdout.
    pub fn print_summary(&self) {
        println!("\n╔═══════════════════════════════════════════════════════╗");
        println!("║              Generation Run Summary                   ║");
        println!("╠═══════════════════════════════════════════════════════╣");
        println!(
            "║ Groups:               {:>8}                        ║",
            self.total_groups
        );
        println!(
            "║   - Generated:        {:>8}                        ║",
            self.generated
        );
        println!(
            "║   - Already existed:  {:>8}                        ║",
            self.skipped_existing
        );
        println!(
            "║   - No files found:   {:>8}                        ║",
            self.skipped_no_files
        );
        if self.dry_run > 0 {
            println!(
                "║   - Dry run:          {:>8}                        ║",
                self.dry_run
            );
        }
        println!(
            "║   - Failed:           {:>8}                        ║",
            self.failed
        );
        println!("║                                                       ║");
        println!("║ Output Directory:                                     ║");
        println!(
            "║   {}                                              ║",
            self.output_directory
        );
        println!(
            "║ Total time:           {:>8.2}s                     ║",
            self.duration.as_secs_f64()
        );
        println!("╚═══════════════════════════════════════════════════════╝\n");
    }
}

fn serialize_secs<S>(duration: &Duration, serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_f64(duration.as_secs_f64())
}

/// Drives every expanded group through generation, one at a time.
pub struct Pipeline<G: Generator> {
    config: Config,
    template: PromptTemplate,
    generator: G,
}

impl<G: Generator> Pipeline<G> {
    /// Creates a new pipeline with the given configuration and generator.
    ///
    /// The configuration is expected to be validated already, which
    /// [`Config::from_file`] and [`ConfigBuilder::build`](crate::ConfigBuilder::build)
    /// do. Only the prompt template is compiled here.
    ///
    /// # Errors
    ///
    /// Returns an error if the prompt template does not compile.
    pub fn new(config: Config, generator: G) -> Result<Self> {
        let template = config.compile_template()?;
        Ok(Self {
            config,
            template,
            generator,
        })
    }

    /// Returns the expanded groups this pipeline will process, in order.
    #[must_use]
    pub fn groups(&self) -> Vec<ExpandedGroup> {
        expand_groups(&self.config.file_groups)
    }

    /// Executes the run and returns statistics.
    ///
    /// Groups are independent: a failed group is logged and counted and the
    /// run moves on to the next one.
    ///
    /// # Errors
    ///
    /// Returns an error if the output directory cannot be created.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use llm_groupgen::{Config, OpenAiClient, Pipeline};
    ///
    /// # fn main() -> anyhow::Result<()> {
    /// let config = Config::from_file("generate_qa_config.yaml")?;
    /// let client = OpenAiClient::from_config(&config)?;
    ///
    /// let stats = Pipeline::new(config, client)?.run()?;
    /// stats.print_summary();
    /// # Ok(())
    /// # }
    /// ```
    #[instrument(skip(self), fields(output_dir = %self.config.output_dir.display()))]
    pub fn run(self) -> Result<RunStats> {
        let start_time = Instant::now();

        let groups = self.groups();
        let processor = GroupProcessor::new(&self.config, &self.template, &self.generator);

        if !self.config.dry_run {
            processor.writer().prepare()?;
        }

        let keys: Vec<&str> = groups.iter().map(|g| g.key.as_str()).collect();
        info!("Expanded {} groups: {:?}", groups.len(), keys);

        let mut stats = RunStats {
            total_groups: groups.len(),
            output_directory: self.config.output_dir.display().to_string(),
            ..RunStats::default()
        };

        for group in &groups {
            info!("Processing group: {}", group.key);
            match processor.process(group) {
                Ok(outcome) => stats.record(&outcome),
                Err(e) => {
                    error!("Group {} failed: {}", group.key, e);
                    stats.failed += 1;
                }
            }
        }

        stats.duration = start_time.elapsed();

        if stats.failed > 0 {
            warn!("{} of {} groups failed", stats.failed, stats.total_groups);
        }
        info!(
            "✓ Run finished in {:.2}s ({} generated)",
            stats.duration.as_secs_f64(),
            stats.generated
        );

        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{GenerationError, Offline};
    use crate::processor::tests::FakeGenerator;
    use assert_fs::prelude::*;

    fn config_for(temp: &assert_fs::TempDir) -> Config {
        Config::builder()
            .base_dir(temp.path().join("src"))
            .output_dir(temp.path().join("out"))
            .prompt_template("Q&A:\n{files_content}")
            .group("core", ["a.py"], 2)
            .build()
            .unwrap()
    }

    #[test]
    fn test_each_iteration_generates_once() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("src/lib/a.py").write_str("print(1)").unwrap();
        let generator = FakeGenerator::answering("answer");

        let stats = Pipeline::new(config_for(&temp), &generator)
            .unwrap()
            .run()
            .unwrap();

        assert_eq!(stats.total_groups, 2);
        assert_eq!(stats.generated, 2);
        assert_eq!(generator.call_count(), 2);
        temp.child("out/group_core1.txt").assert("answer");
        temp.child("out/group_core2.txt").assert("answer");
        assert!(temp.path().join("out/debug/debug_group_core1.txt").exists());
        assert!(temp.path().join("out/debug/debug_group_core2.txt").exists());
    }

    #[test]
    fn test_rerun_makes_no_calls() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("src/a.py").write_str("print(1)").unwrap();

        let first = FakeGenerator::answering("first");
        Pipeline::new(config_for(&temp), &first)
            .unwrap()
            .run()
            .unwrap();

        let second = FakeGenerator::answering("second");
        let stats = Pipeline::new(config_for(&temp), &second)
            .unwrap()
            .run()
            .unwrap();

        assert_eq!(second.call_count(), 0);
        assert_eq!(stats.skipped_existing, 2);
        temp.child("out/group_core1.txt").assert("first");
    }

    #[test]
    fn test_failures_do_not_stop_run() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("src/a.py").write_str("print(1)").unwrap();
        let generator = FakeGenerator::failing(GenerationError::Status {
            status: 429,
            message: "Rate limited".to_string(),
        });

        let stats = Pipeline::new(config_for(&temp), &generator)
            .unwrap()
            .run()
            .unwrap();

        assert_eq!(generator.call_count(), 2);
        assert_eq!(stats.failed, 2);
        assert!(temp.path().join("out").is_dir());
    }

    #[test]
    fn test_missing_group_files_are_counted() {
        let temp = assert_fs::TempDir::new().unwrap();
        let config = Config::builder()
            .base_dir(temp.path())
            .output_dir(temp.path().join("out"))
            .prompt_template("{files_content}")
            .group("ghost", ["nothing.py"], 1)
            .build()
            .unwrap();

        let stats = Pipeline::new(config, Offline).unwrap().run().unwrap();

        assert_eq!(stats.skipped_no_files, 1);
        assert_eq!(stats.generated, 0);
    }

    #[test]
    fn test_dry_run_writes_nothing() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("src/a.py").write_str("print(1)").unwrap();
        let mut config = config_for(&temp);
        config.dry_run = true;

        let stats = Pipeline::new(config, Offline).unwrap().run().unwrap();

        assert_eq!(stats.dry_run, 2);
        assert!(!temp.path().join("out").exists());
    }

    #[test]
    fn test_template_compiled_at_construction() {
        let temp = assert_fs::TempDir::new().unwrap();
        let mut config = config_for(&temp);
        config.prompt_template = "{files_content} {extra}".to_string();

        let result = Pipeline::new(config, Offline);

        assert!(matches!(result, Err(crate::Error::Template { .. })));
    }

    #[test]
    fn test_stats_as_json() {
        let stats = RunStats {
            total_groups: 3,
            generated: 1,
            skipped_existing: 2,
            duration: Duration::from_millis(1500),
            output_directory: "out".to_string(),
            ..RunStats::default()
        };

        let json: serde_json::Value = serde_json::from_str(&stats.to_json().unwrap()).unwrap();

        assert_eq!(json["total_groups"], 3);
        assert_eq!(json["generated"], 1);
        assert_eq!(json["skipped_existing"], 2);
        assert_eq!(json["duration"], 1.5);
        assert_eq!(json["output_directory"], "out");
    }

    #[test]
    fn test_groups_are_expanded_in_order() {
        let temp = assert_fs::TempDir::new().unwrap();
        let config = Config::builder()
            .base_dir(temp.path())
            .group("b", ["x"], 1)
            .group("a", ["y"], 2)
            .build()
            .unwrap();

        let pipeline = Pipeline::new(config, Offline).unwrap();
        let keys: Vec<_> = pipeline.groups().into_iter().map(|g| g.key).collect();

        assert_eq!(keys, ["b1", "a1", "a2"]);
    }
}
