//! Chat-completion client used to generate group answers.

use crate::config::Config;
use crate::error::Result as CrateResult;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use url::Url;

const CHAT_COMPLETIONS_PATH: &str = "chat/completions";
const DEFAULT_STATUS_MESSAGE: &str = "Generation request failed";

/// Categorized failure of a single generation call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum GenerationError {
    /// The environment variable with the API key is unset or empty.
    #[error("API key environment variable '{0}' is not set")]
    MissingCredential(String),

    /// The request never produced an HTTP response.
    #[error("HTTP request failed: {0}")]
    Transport(String),

    /// The endpoint answered with a non-success status.
    #[error("Generation endpoint returned HTTP {status}: {message}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Error message reported by the endpoint
        message: String,
    },

    /// The response body was not a chat-completion object.
    #[error("Failed to parse generation response: {0}")]
    InvalidResponse(String),

    /// The response had no choices or no message content.
    #[error("Generation response contained no message content")]
    EmptyResponse,

    /// Generation is disabled for this run.
    #[error("Generation is disabled for this run")]
    Disabled,
}

/// Produces text for a prompt.
pub trait Generator {
    /// Sends `prompt` as the only user message and returns the generated text.
    ///
    /// # Errors
    ///
    /// Returns a [`GenerationError`] describing why no text was produced.
    fn generate(&self, model: &str, prompt: &str) -> Result<String, GenerationError>;
}

impl<G: Generator + ?Sized> Generator for &G {
    fn generate(&self, model: &str, prompt: &str) -> Result<String, GenerationError> {
        (**self).generate(model, prompt)
    }
}

/// Generator for runs that must not contact the endpoint; every call fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct Offline;

impl Generator for Offline {
    fn generate(&self, _model: &str, _prompt: &str) -> Result<String, GenerationError> {
        Err(GenerationError::Disabled)
    }
}

/// Blocking client for an OpenAI-compatible chat-completion endpoint.
///
/// Each call performs exactly one request; there are no retries.
#[derive(Clone)]
pub struct OpenAiClient {
    api_key: String,
    endpoint: Url,
    client: Client,
}

impl std::fmt::Debug for OpenAiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiClient")
            .field("endpoint", &self.endpoint)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

impl OpenAiClient {
    /// Creates a client for the API rooted at `api_base`.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint URL cannot be built or the HTTP client
    /// fails to initialize.
    pub fn new(
        api_key: impl Into<String>,
        api_base: &Url,
        timeout: Duration,
    ) -> Result<Self, GenerationError> {
        let endpoint = format!(
            "{}/{}",
            api_base.as_str().trim_end_matches('/'),
            CHAT_COMPLETIONS_PATH
        );
        let endpoint = Url::parse(&endpoint)
            .map_err(|e| GenerationError::Transport(format!("Invalid endpoint URL: {e}")))?;

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                GenerationError::Transport(format!("Failed to create HTTP client: {e}"))
            })?;

        Ok(Self {
            api_key: api_key.into(),
            endpoint,
            client,
        })
    }

    /// Creates a client from the configuration, reading the API key from the
    /// environment variable named by `config.api_key_env`.
    ///
    /// # Errors
    ///
    /// Returns [`GenerationError::MissingCredential`], wrapped in
    /// [`Error::Generation`](crate::Error::Generation), if the variable is
    /// unset or empty.
    pub fn from_config(config: &Config) -> CrateResult<Self> {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| GenerationError::MissingCredential(config.api_key_env.clone()))?;

        let client = Self::new(
            api_key,
            &config.api_base,
            Duration::from_secs(config.timeout_secs),
        )?;
        Ok(client)
    }

    /// Returns the full chat-completion URL.
    #[must_use]
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

impl Generator for OpenAiClient {
    fn generate(&self, model: &str, prompt: &str) -> Result<String, GenerationError> {
        let request = ChatRequest {
            model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .map_err(|e| GenerationError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .map_err(|e| GenerationError::Transport(e.to_string()))?;

        if !status.is_success() {
            let message = extract_error_message(&body).unwrap_or_else(|| {
                if body.trim().is_empty() {
                    DEFAULT_STATUS_MESSAGE.to_string()
                } else {
                    body.clone()
                }
            });
            return Err(GenerationError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: ChatResponse = serde_json::from_str(&body)
            .map_err(|e| GenerationError::InvalidResponse(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or(GenerationError::EmptyResponse)
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

fn extract_error_message(body: &str) -> Option<String> {
    if body.trim().is_empty() {
        return None;
    }

    let parsed = serde_json::from_str::<serde_json::Value>(body).ok()?;

    if let Some(msg) = parsed
        .get("error")
        .and_then(|error| error.get("message"))
        .and_then(|message| message.as_str())
    {
        return Some(msg.to_string());
    }

    parsed
        .get("message")
        .and_then(|message| message.as_str())
        .map(ToOwned::to_owned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn client_for(server: &mockito::Server) -> OpenAiClient {
        let base = Url::parse(&server.url()).unwrap();
        OpenAiClient::new("test-key", &base, Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_endpoint_appends_chat_completions() {
        let base = Url::parse("https://api.openai.com/v1").unwrap();
        let client = OpenAiClient::new("k", &base, Duration::from_secs(1)).unwrap();
        assert_eq!(
            client.endpoint().as_str(),
            "https://api.openai.com/v1/chat/completions"
        );

        let base = Url::parse("https://example.com/api/v1/").unwrap();
        let client = OpenAiClient::new("k", &base, Duration::from_secs(1)).unwrap();
        assert_eq!(
            client.endpoint().as_str(),
            "https://example.com/api/v1/chat/completions"
        );
    }

    #[test]
    fn test_generate_sends_single_user_message() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer test-key")
            .match_body(Matcher::Json(serde_json::json!({
                "model": "gpt-4o-mini",
                "messages": [{"role": "user", "content": "the prompt"}]
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"choices":[{"message":{"role":"assistant","content":"  answer \n"}}]}"#)
            .expect(1)
            .create();

        let text = client_for(&server)
            .generate("gpt-4o-mini", "the prompt")
            .unwrap();

        assert_eq!(text, "  answer \n");
        mock.assert();
    }

    #[test]
    fn test_generate_reports_status_with_nested_message() {
        let mut server = mockito::Server::new();
        let _mock = server
            .mock("POST", "/chat/completions")
            .with_status(401)
            .with_header("content-type", "application/json")
            .with_body(r#"{"error":{"message":"Incorrect API key provided"}}"#)
            .create();

        let err = client_for(&server).generate("m", "p").unwrap_err();

        assert_eq!(
            err,
            GenerationError::Status {
                status: 401,
                message: "Incorrect API key provided".to_string()
            }
        );
    }

    #[test]
    fn test_generate_reports_status_with_empty_body() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("POST", "/chat/completions")
            .with_status(500)
            .expect(1)
            .create();

        let err = client_for(&server).generate("m", "p").unwrap_err();

        assert!(matches!(err, GenerationError::Status { status: 500, .. }));
        mock.assert();
    }

    #[test]
    fn test_generate_rejects_malformed_body() {
        let mut server = mockito::Server::new();
        let _mock = server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body("not json")
            .create();

        let err = client_for(&server).generate("m", "p").unwrap_err();

        assert!(matches!(err, GenerationError::InvalidResponse(_)));
    }

    #[test]
    fn test_generate_rejects_empty_choices() {
        let mut server = mockito::Server::new();
        let _mock = server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body(r#"{"choices":[]}"#)
            .create();

        let err = client_for(&server).generate("m", "p").unwrap_err();

        assert_eq!(err, GenerationError::EmptyResponse);
    }

    #[test]
    fn test_from_config_requires_credential() {
        let config = Config::builder()
            .api_key_env("LLM_GROUPGEN_TEST_UNSET_KEY")
            .build()
            .unwrap();

        let err = OpenAiClient::from_config(&config).unwrap_err();

        assert!(matches!(
            err,
            crate::Error::Generation(GenerationError::MissingCredential(ref var))
                if var == "LLM_GROUPGEN_TEST_UNSET_KEY"
        ));
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let base = Url::parse("https://api.openai.com/v1").unwrap();
        let client = OpenAiClient::new("sk-secret", &base, Duration::from_secs(1)).unwrap();

        let debug = format!("{client:?}");
        assert!(!debug.contains("sk-secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn test_offline_generator_always_fails() {
        assert_eq!(Offline.generate("m", "p"), Err(GenerationError::Disabled));
    }
}
