use crate::{
    client::{GenerationError, Generator},
    config::Config,
    error::Result,
    expand::ExpandedGroup,
    file::LocatedFile,
    locator::FileLocator,
    template::PromptTemplate,
    writer::OutputWriter,
};
use std::path::PathBuf;
use tracing::{error, info, warn};

/// Terminal state reached by one expanded group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupOutcome {
    /// None of the group's files could be read.
    SkippedNoFiles,

    /// An answer from an earlier run already exists.
    SkippedExists {
        /// Existing output file
        output: PathBuf,
    },

    /// Prompt rendered, but dry run mode suppressed the call.
    DryRun {
        /// Output file that would have been written
        output: PathBuf,
    },

    /// The generation call failed; nothing was written.
    ApiFailed {
        /// Why the call failed
        error: GenerationError,
    },

    /// Answer and prompt were written.
    Generated {
        /// Answer file
        output: PathBuf,
        /// Prompt copy
        debug: PathBuf,
    },
}

/// Runs one expanded group from file collection to persisted answer.
pub(crate) struct GroupProcessor<'a, G: Generator> {
    locator: FileLocator,
    writer: OutputWriter,
    template: &'a PromptTemplate,
    generator: &'a G,
    model: &'a str,
    dry_run: bool,
}

impl<'a, G: Generator> GroupProcessor<'a, G> {
    pub(crate) fn new(config: &'a Config, template: &'a PromptTemplate, generator: &'a G) -> Self {
        Self {
            locator: FileLocator::new(&config.base_dir),
            writer: OutputWriter::new(&config.output_dir),
            template,
            generator,
            model: &config.model,
            dry_run: config.dry_run,
        }
    }

    pub(crate) fn writer(&self) -> &OutputWriter {
        &self.writer
    }

    /// Processes `group`.
    ///
    /// Missing files, an existing answer and endpoint failures end the group
    /// with an `Ok` outcome. Only template rendering and filesystem writes
    /// return `Err`.
    pub(crate) fn process(&self, group: &ExpandedGroup) -> Result<GroupOutcome> {
        let combined = self.collect(group);
        if combined.is_empty() {
            info!("No valid files found for group {}. Skipping.", group.key);
            return Ok(GroupOutcome::SkippedNoFiles);
        }

        let output = self.writer.output_path(&group.key);
        if output.exists() {
            info!(
                "Output file {} already exists for group {}. Skipping generation.",
                output.display(),
                group.key
            );
            return Ok(GroupOutcome::SkippedExists { output });
        }

        let prompt = self.template.render(&combined, &group.key)?;

        if self.dry_run {
            info!(
                "Dry run: would send {} bytes for group {} -> {}",
                prompt.len(),
                group.key,
                output.display()
            );
            return Ok(GroupOutcome::DryRun { output });
        }

        let response = match self.generator.generate(self.model, &prompt) {
            Ok(text) => text,
            Err(e) => {
                error!("Error during generation call for group {}: {}", group.key, e);
                return Ok(GroupOutcome::ApiFailed { error: e });
            }
        };

        self.writer.write_output(&output, response.trim())?;
        let debug_path = self.writer.write_debug(&group.key, &prompt)?;

        info!("Processed group {} -> {}", group.key, output.display());
        info!("Debug info saved to {}", debug_path.display());

        Ok(GroupOutcome::Generated {
            output,
            debug: debug_path,
        })
    }

    /// Builds the combined content, skipping files that are missing or unreadable.
    fn collect(&self, group: &ExpandedGroup) -> String {
        let mut combined = String::new();

        for relative in &group.files {
            let Some(found) = self.locator.locate(relative) else {
                warn!(
                    "{} not found in {} or its subdirectories.",
                    relative,
                    self.locator.base_dir().display()
                );
                continue;
            };

            match LocatedFile::load(relative.as_str(), found) {
                Ok(file) => file.append_to(&mut combined),
                Err(e) => warn!("Skipping {}: {}", relative, e),
            }
        }

        combined
    }
}
