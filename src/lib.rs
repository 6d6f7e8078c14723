//! # llm-groupgen
//!
//! Batches source files into named groups, sends each group's contents to a
//! chat-completion model through a prompt template, and stores the answers.
//!
//! ## Features
//!
//! - Groups defined in YAML, each repeatable `iterations` times
//! - Files found by exact relative path or by name anywhere under the base directory
//! - Reruns are cheap: a group whose answer file exists is never sent again
//! - The exact prompt of every generated group is kept under `debug/`
//!
//! ## Quick Start
//!
//! ```no_run
//! use llm_groupgen::{Config, OpenAiClient, Pipeline};
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = Config::builder()
//!     .base_dir("./project")
//!     .output_dir("./output")
//!     .prompt_template("Write five questions and answers about:\n{files_content}")
//!     .group("parser", ["lexer.rs", "parser.rs"], 3)
//!     .build()?;
//!
//! let client = OpenAiClient::from_config(&config)?;
//! Pipeline::new(config, client)?.run()?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! 1. **Expand**: every group becomes `<name>1..=<name>N`
//! 2. **Locate**: member files are resolved under the base directory
//! 3. **Render**: located files are concatenated into the prompt template
//! 4. **Generate**: one blocking chat-completion call per group
//! 5. **Write**: the trimmed answer and the prompt are persisted

#![warn(
    missing_docs,
    rust_2018_idioms,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery
)]
#![allow(clippy::module_name_repetitions)]

mod client;
mod config;
mod error;
mod expand;
mod file;
mod locator;
mod pipeline;
mod processor;
mod template;
mod writer;

pub use client::{GenerationError, Generator, OpenAiClient, Offline};
pub use config::{Config, ConfigBuilder, DEFAULT_CONFIG_FILE, FileGroup, TemplateSyntax};
pub use error::{Error, Result};
pub use expand::{expand_groups, ExpandedGroup};
pub use file::{combine, LocatedFile};
pub use locator::FileLocator;
pub use pipeline::{Pipeline, RunStats};
pub use processor::GroupOutcome;
pub use template::{PromptTemplate, FILES_CONTENT};
pub use writer::safe_group_name;

/// Runs every configured group through `generator`.
///
/// # Errors
///
/// Returns an error if:
/// - The prompt template does not compile
/// - Output directory cannot be created
///
/// Failures of individual groups are counted in [`RunStats::failed`] and do
/// not produce an error.
///
/// # Examples
///
/// ```no_run
/// use llm_groupgen::{run, Config, OpenAiClient};
///
/// # fn main() -> anyhow::Result<()> {
/// let config = Config::from_file("generate_qa_config.yaml")?;
/// let client = OpenAiClient::from_config(&config)?;
///
/// run(config, client)?;
/// # Ok(())
/// # }
/// ```
pub fn run<G: Generator>(config: Config, generator: G) -> Result<RunStats> {
    Pipeline::new(config, generator)?.run()
}
