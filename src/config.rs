use crate::error::{Error, Result};
use crate::template::PromptTemplate;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use url::Url;

/// Configuration file read when no path is given on the command line.
pub const DEFAULT_CONFIG_FILE: &str = "generate_qa_config.yaml";

const DEFAULT_OUTPUT_DIR: &str = "output";
const DEFAULT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";
const DEFAULT_API_KEY_ENV: &str = "OPENAI_API_KEY";
const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Syntax used by the prompt template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateSyntax {
    /// `{files_content}` is the only field, `{{` and `}}` are literal braces
    #[default]
    Placeholder,
    /// Full Tera syntax, e.g. `{{ files_content }}`
    Tera,
}

/// A named set of files sent together in one prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileGroup {
    /// Group name as written in the configuration
    pub name: String,

    /// Relative paths of the member files, in prompt order
    pub files: Vec<String>,

    /// Number of independent generations requested for this group
    pub iterations: u32,
}

impl FileGroup {
    /// Creates a group with the given files and iteration count.
    #[must_use]
    pub fn new<I, S>(name: impl Into<String>, files: I, iterations: u32) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            files: files.into_iter().map(Into::into).collect(),
            iterations,
        }
    }
}

/// Configuration for a generation run.
///
/// Loaded once by the entry point with [`Config::from_file`] and handed to the
/// [`Pipeline`](crate::Pipeline); nothing mutates it afterwards.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct Config {
    /// Directory searched for group member files
    pub base_dir: PathBuf,

    /// Directory receiving generated answers and the `debug/` prompt copies
    pub output_dir: PathBuf,

    /// Prompt template with a single `files_content` slot
    pub prompt_template: String,

    /// Syntax of `prompt_template`
    pub template_syntax: TemplateSyntax,

    /// Configured groups in file order
    pub file_groups: Vec<FileGroup>,

    /// Model identifier sent to the generation endpoint
    pub model: String,

    /// Base URL of the chat-completion API
    pub api_base: Url,

    /// Environment variable holding the API key
    pub api_key_env: String,

    /// Request timeout for a single generation call
    pub timeout_secs: u64,

    /// Dry run mode (no generation calls, no file writes)
    pub dry_run: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawConfig {
    base_dir: Option<PathBuf>,
    output_dir: Option<PathBuf>,
    qa_prompt_template: Option<String>,
    template_syntax: Option<TemplateSyntax>,
    file_groups: Option<serde_yaml::Mapping>,
    model: Option<String>,
    api_base: Option<Url>,
    api_key_env: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct RawGroup {
    #[serde(default)]
    files: Vec<String>,
    #[serde(default = "default_iterations")]
    iterations: u32,
}

const fn default_iterations() -> u32 {
    1
}

impl Config {
    /// Creates a new configuration builder.
    ///
    /// # Examples
    ///
    /// ```
    /// use llm_groupgen::Config;
    ///
    /// let config = Config::builder()
    ///     .base_dir("./src")
    ///     .prompt_template("Write questions about:\n{files_content}")
    ///     .group("core", ["main.rs"], 2)
    ///     .build()
    ///     .expect("valid configuration");
    /// ```
    #[must_use]
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Loads and validates a YAML configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not valid YAML, or
    /// fails validation.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        Self::from_yaml_str(&content, path)
    }

    /// Parses a YAML configuration document. `origin` is only used in errors.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is malformed or fails validation.
    pub fn from_yaml_str(content: &str, origin: impl AsRef<Path>) -> Result<Self> {
        let origin = origin.as_ref();
        let raw: RawConfig =
            serde_yaml::from_str(content).map_err(|e| Error::parse(origin, &e))?;

        let mut builder = Self::builder();
        if let Some(dir) = raw.base_dir {
            builder = builder.base_dir(dir);
        }
        if let Some(dir) = raw.output_dir {
            builder = builder.output_dir(dir);
        }
        if let Some(template) = raw.qa_prompt_template {
            builder = builder.prompt_template(template);
        }
        if let Some(syntax) = raw.template_syntax {
            builder = builder.template_syntax(syntax);
        }
        if let Some(model) = raw.model {
            builder = builder.model(model);
        }
        if let Some(url) = raw.api_base {
            builder = builder.api_base(url);
        }
        if let Some(var) = raw.api_key_env {
            builder = builder.api_key_env(var);
        }
        if let Some(secs) = raw.timeout_secs {
            builder = builder.timeout_secs(secs);
        }

        for (key, value) in raw.file_groups.unwrap_or_default() {
            let name = group_name(&key).ok_or_else(|| {
                Error::config(format!("file_groups key must be a string, got {key:?}"))
            })?;
            let group: RawGroup = serde_yaml::from_value(value).map_err(|e| {
                Error::config(format!("file group '{name}' is malformed: {e}"))
            })?;
            builder = builder.group(name, group.files, group.iterations);
        }

        builder.build()
    }

    /// Compiles the prompt template.
    ///
    /// # Errors
    ///
    /// Returns a template error if the template does not compile.
    pub fn compile_template(&self) -> Result<PromptTemplate> {
        PromptTemplate::parse(&self.prompt_template, self.template_syntax)
    }

    /// Validates the configuration and logs every warning once.
    ///
    /// [`ConfigBuilder::build`] and [`Config::from_file`] already call this.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The prompt template does not compile
    /// - The model name is empty
    /// - The request timeout is zero
    pub fn validate(&self) -> Result<()> {
        let template = self.compile_template()?;

        if self.model.trim().is_empty() {
            return Err(Error::config("model must not be empty"));
        }

        if self.timeout_secs == 0 {
            return Err(Error::config("timeout_secs must be greater than 0"));
        }

        if self.api_key_env.trim().is_empty() {
            return Err(Error::config("api_key_env must not be empty"));
        }

        for warning in self.warnings(&template) {
            tracing::warn!("{}", warning);
        }

        Ok(())
    }

    /// Problems that do not stop a run but usually mean a mistake.
    fn warnings(&self, template: &PromptTemplate) -> Vec<String> {
        let mut warnings = Vec::new();

        if !template.uses_files_content() {
            warnings.push(format!(
                "Prompt template never references {}; group files will not reach the model",
                crate::template::FILES_CONTENT
            ));
        }

        if !self.base_dir.as_os_str().is_empty() && !self.base_dir.is_dir() {
            warnings.push(format!(
                "Base directory {} does not exist; every file lookup will fail",
                self.base_dir.display()
            ));
        }

        for group in &self.file_groups {
            if group.iterations == 0 {
                warnings.push(format!(
                    "Group '{}' has iterations: 0 and will not run",
                    group.name
                ));
            }
            if group.files.is_empty() {
                warnings.push(format!("Group '{}' lists no files", group.name));
            }
        }

        warnings
    }
}

fn group_name(key: &serde_yaml::Value) -> Option<String> {
    match key {
        serde_yaml::Value::String(s) => Some(s.clone()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::new(),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            prompt_template: String::new(),
            template_syntax: TemplateSyntax::Placeholder,
            file_groups: Vec::new(),
            model: DEFAULT_MODEL.to_string(),
            api_base: default_api_base(),
            api_key_env: DEFAULT_API_KEY_ENV.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            dry_run: false,
        }
    }
}

fn default_api_base() -> Url {
    Url::parse(DEFAULT_API_BASE).expect("default API base is a valid URL")
}

/// Builder for creating a [`Config`].
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    base_dir: Option<PathBuf>,
    output_dir: Option<PathBuf>,
    prompt_template: Option<String>,
    template_syntax: Option<TemplateSyntax>,
    file_groups: Vec<FileGroup>,
    model: Option<String>,
    api_base: Option<Url>,
    api_key_env: Option<String>,
    timeout_secs: Option<u64>,
    dry_run: bool,
}

impl ConfigBuilder {
    /// Sets the directory searched for group files.
    #[must_use]
    pub fn base_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(path.into());
        self
    }

    /// Sets the output directory for generated files.
    #[must_use]
    pub fn output_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(path.into());
        self
    }

    /// Sets the prompt template text.
    #[must_use]
    pub fn prompt_template(mut self, template: impl Into<String>) -> Self {
        self.prompt_template = Some(template.into());
        self
    }

    /// Sets the prompt template syntax.
    #[must_use]
    pub fn template_syntax(mut self, syntax: TemplateSyntax) -> Self {
        self.template_syntax = Some(syntax);
        self
    }

    /// Appends a file group.
    #[must_use]
    pub fn group<I, S>(mut self, name: impl Into<String>, files: I, iterations: u32) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.file_groups.push(FileGroup::new(name, files, iterations));
        self
    }

    /// Sets the model identifier.
    #[must_use]
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Sets the chat-completion API base URL.
    #[must_use]
    pub fn api_base(mut self, url: Url) -> Self {
        self.api_base = Some(url);
        self
    }

    /// Sets the environment variable that holds the API key.
    #[must_use]
    pub fn api_key_env(mut self, var: impl Into<String>) -> Self {
        self.api_key_env = Some(var.into());
        self
    }

    /// Sets the per-request timeout in seconds.
    #[must_use]
    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    /// Enables dry run mode.
    #[must_use]
    pub fn dry_run(mut self, enabled: bool) -> Self {
        self.dry_run = enabled;
        self
    }

    /// Builds the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if validation fails.
    pub fn build(self) -> Result<Config> {
        let defaults = Config::default();
        let config = Config {
            base_dir: self.base_dir.unwrap_or(defaults.base_dir),
            output_dir: self.output_dir.unwrap_or(defaults.output_dir),
            prompt_template: self.prompt_template.unwrap_or(defaults.prompt_template),
            template_syntax: self.template_syntax.unwrap_or(defaults.template_syntax),
            file_groups: self.file_groups,
            model: self.model.unwrap_or(defaults.model),
            api_base: self.api_base.unwrap_or(defaults.api_base),
            api_key_env: self.api_key_env.unwrap_or(defaults.api_key_env),
            timeout_secs: self.timeout_secs.unwrap_or(defaults.timeout_secs),
            dry_run: self.dry_run,
        };

        config.validate()?;
        Ok(config)
    }
}
