use std::time::Duration;

use reqwest::blocking::{Client, Response};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::{
   config::Settings,
   error::{CommitGenError, Result},
   prompt::Prompt,
   types::ProviderKind,
};

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Placeholder bearer token for local OpenAI-compatible servers.
const LOCAL_API_KEY: &str = "ollama";

/// Characters of an error body kept in the reported message.
const ERROR_BODY_LIMIT: usize = 300;

/// A backend that turns a prompt into completion text.
///
/// One call per prompt, no retries. Failures surface as
/// [`CommitGenError::Provider`].
pub trait Provider {
   fn name(&self) -> &str;

   fn complete(
      &self,
      prompt: &Prompt,
      model: &str,
      temperature: f32,
      max_tokens: u32,
   ) -> Result<String>;
}

/// Build HTTP client with the configured request timeout
fn build_client(provider: &str, timeout_secs: u64) -> Result<Client> {
   Client::builder()
      .timeout(Duration::from_secs(timeout_secs))
      .connect_timeout(Duration::from_secs(timeout_secs))
      .build()
      .map_err(|e| CommitGenError::provider(provider, format!("failed to build HTTP client: {e}")))
}

#[derive(Debug, Serialize)]
struct Message<'a> {
   role:    &'static str,
   content: &'a str,
}

fn user_message(prompt: &Prompt) -> Vec<Message<'_>> {
   vec![Message { role: "user", content: prompt.as_str() }]
}

fn send_error(provider: &str, url: &str, err: &reqwest::Error) -> CommitGenError {
   log::debug!("{provider} request to {url} failed: {err:?}");
   let message = if err.is_timeout() {
      "request timed out".to_string()
   } else if err.is_connect() {
      format!("could not connect to {url}")
   } else {
      err.to_string()
   };
   CommitGenError::provider(provider, message)
}

/// Check the status and decode the JSON body.
fn read_json<T: DeserializeOwned>(provider: &str, response: Response) -> Result<T> {
   let status = response.status();
   let body = response
      .text()
      .map_err(|e| CommitGenError::provider(provider, format!("failed to read response: {e}")))?;
   log::trace!("{provider} response ({status}): {body}");

   if !status.is_success() {
      log::warn!("{provider} returned HTTP {status}");
      let excerpt: String = body.chars().take(ERROR_BODY_LIMIT).collect();
      return Err(CommitGenError::provider(provider, format!("HTTP {status}: {excerpt}")));
   }

   serde_json::from_str(&body)
      .map_err(|e| CommitGenError::provider(provider, format!("malformed response: {e}")))
}

fn non_empty(provider: &str, text: Option<&str>) -> Result<String> {
   match text.map(str::trim) {
      Some(text) if !text.is_empty() => Ok(text.to_string()),
      _ => Err(CommitGenError::provider(provider, "response contained no completion")),
   }
}

// === Anthropic ===

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
   model:       &'a str,
   max_tokens:  u32,
   temperature: f32,
   messages:    Vec<Message<'a>>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
   #[serde(rename = "type")]
   block_type: String,
   #[serde(default)]
   text:       Option<String>,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
   #[serde(default)]
   content: Vec<ContentBlock>,
}

/// Anthropic Messages API.
pub struct AnthropicProvider {
   client:   Client,
   base_url: String,
   api_key:  String,
}

impl AnthropicProvider {
   pub fn new(base_url: impl Into<String>, api_key: impl Into<String>, timeout_secs: u64) -> Result<Self> {
      Ok(Self {
         client:   build_client(ProviderKind::Anthropic.as_str(), timeout_secs)?,
         base_url: base_url.into().trim_end_matches('/').to_string(),
         api_key:  api_key.into(),
      })
   }
}

impl Provider for AnthropicProvider {
   fn name(&self) -> &str {
      ProviderKind::Anthropic.as_str()
   }

   fn complete(
      &self,
      prompt: &Prompt,
      model: &str,
      temperature: f32,
      max_tokens: u32,
   ) -> Result<String> {
      let url = format!("{}/v1/messages", self.base_url);
      log::debug!("POST {url} (model {model}, temperature {temperature})");

      let request = MessagesRequest { model, max_tokens, temperature, messages: user_message(prompt) };
      let response = self
         .client
         .post(&url)
         .header("x-api-key", &self.api_key)
         .header("anthropic-version", ANTHROPIC_VERSION)
         .header("content-type", "application/json")
         .json(&request)
         .send()
         .map_err(|e| send_error(self.name(), &url, &e))?;

      let parsed: MessagesResponse = read_json(self.name(), response)?;
      let text = parsed
         .content
         .iter()
         .find(|block| block.block_type == "text")
         .and_then(|block| block.text.as_deref());
      non_empty(self.name(), text)
   }
}

// === OpenAI-compatible (OpenAI, Ollama) ===

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
   model:       &'a str,
   messages:    Vec<Message<'a>>,
   max_tokens:  u32,
   temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
   #[serde(default)]
   content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Choice {
   message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
   #[serde(default)]
   choices: Vec<Choice>,
}

/// Chat-completions endpoint shared by OpenAI and local servers.
pub struct OpenAiCompatProvider {
   kind:     ProviderKind,
   client:   Client,
   base_url: String,
   api_key:  String,
}

impl OpenAiCompatProvider {
   pub fn new(
      kind: ProviderKind,
      base_url: impl Into<String>,
      api_key: impl Into<String>,
      timeout_secs: u64,
   ) -> Result<Self> {
      Ok(Self {
         kind,
         client:   build_client(kind.as_str(), timeout_secs)?,
         base_url: base_url.into().trim_end_matches('/').to_string(),
         api_key:  api_key.into(),
      })
   }
}

impl Provider for OpenAiCompatProvider {
   fn name(&self) -> &str {
      self.kind.as_str()
   }

   fn complete(
      &self,
      prompt: &Prompt,
      model: &str,
      temperature: f32,
      max_tokens: u32,
   ) -> Result<String> {
      let url = format!("{}/chat/completions", self.base_url);
      log::debug!("POST {url} (model {model}, temperature {temperature})");

      let request = ChatRequest { model, messages: user_message(prompt), max_tokens, temperature };
      let response = self
         .client
         .post(&url)
         .header("content-type", "application/json")
         .header("Authorization", format!("Bearer {}", self.api_key))
         .json(&request)
         .send()
         .map_err(|e| send_error(self.name(), &url, &e))?;

      let parsed: ChatResponse = read_json(self.name(), response)?;
      let Some(choice) = parsed.choices.first() else {
         return Err(CommitGenError::provider(self.name(), "response contained no choices"));
      };
      non_empty(self.name(), choice.message.content.as_deref())
   }
}

// === Selection ===

/// API key for `kind`, looked up through `lookup` (normally the process
/// environment). Local providers get a placeholder.
pub fn resolve_credential(
   kind: ProviderKind,
   lookup: impl Fn(&str) -> Option<String>,
) -> Result<String> {
   let Some(env_var) = kind.env_var() else {
      return Ok(LOCAL_API_KEY.to_string());
   };
   lookup(env_var)
      .map(|key| key.trim().to_string())
      .filter(|key| !key.is_empty())
      .ok_or_else(|| CommitGenError::MissingCredential {
         provider: kind.as_str().to_string(),
         env_var:  env_var.to_string(),
      })
}

/// Construct the provider for `kind`. Credentials are checked here, before
/// any request is made.
pub fn build_provider(
   settings: &Settings,
   kind: ProviderKind,
   lookup: impl Fn(&str) -> Option<String>,
) -> Result<Box<dyn Provider>> {
   let api_key = resolve_credential(kind, lookup)?;
   // A configured base_url belongs to the configured provider only.
   let base_url = settings
      .base_url
      .as_deref()
      .filter(|_| kind == settings.provider)
      .unwrap_or_else(|| kind.default_base_url());
   log::debug!("Using provider {kind} at {base_url}");

   let timeout = settings.request_timeout_secs;
   Ok(match kind {
      ProviderKind::Anthropic => Box::new(AnthropicProvider::new(base_url, api_key, timeout)?),
      ProviderKind::OpenAi | ProviderKind::Ollama => {
         Box::new(OpenAiCompatProvider::new(kind, base_url, api_key, timeout)?)
      },
   })
}

#[cfg(test)]
mod tests {
   use serde_json::json;
   use wiremock::{
      Mock, MockServer, ResponseTemplate,
      matchers::{body_partial_json, header, method, path},
   };

   use super::*;
   use crate::prompt::build_refine_prompt;

   fn prompt() -> Prompt {
      build_refine_prompt("feat: add x", "shorter")
   }

   fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
      let pairs: Vec<(String, String)> =
         pairs.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect();
      move |name| pairs.iter().find(|(k, _)| k.as_str() == name).map(|(_, v)| v.clone())
   }

   #[test]
   fn test_missing_credential_before_network() {
      let settings = Settings::default();
      let err = build_provider(&settings, ProviderKind::Anthropic, env(&[])).err().unwrap();
      match err {
         CommitGenError::MissingCredential { provider, env_var } => {
            assert_eq!(provider, "anthropic");
            assert_eq!(env_var, "ANTHROPIC_API_KEY");
         },
         other => panic!("unexpected error: {other}"),
      }

      let err = resolve_credential(ProviderKind::OpenAi, env(&[("OPENAI_API_KEY", "  ")])).unwrap_err();
      assert!(matches!(err, CommitGenError::MissingCredential { .. }));
   }

   #[test]
   fn test_local_provider_needs_no_credential() {
      assert_eq!(resolve_credential(ProviderKind::Ollama, env(&[])).unwrap(), LOCAL_API_KEY);
      let provider = build_provider(&Settings::default(), ProviderKind::Ollama, env(&[])).unwrap();
      assert_eq!(provider.name(), "ollama");
   }

   #[tokio::test]
   async fn test_anthropic_returns_trimmed_text() {
      let server = MockServer::start().await;
      Mock::given(method("POST"))
         .and(path("/v1/messages"))
         .and(header("x-api-key", "test-key"))
         .and(header("anthropic-version", ANTHROPIC_VERSION))
         .and(body_partial_json(json!({
            "model": "claude-test",
            "max_tokens": 500,
            "temperature": 0.5,
            "messages": [{"role": "user"}]
         })))
         .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "content": [{"type": "text", "text": "\n  feat: add login  \n"}]
         })))
         .expect(1)
         .mount(&server)
         .await;

      let uri = server.uri();
      let result = tokio::task::spawn_blocking(move || -> Result<String> {
         let provider = AnthropicProvider::new(uri, "test-key", 5)?;
         provider.complete(&prompt(), "claude-test", 0.5, 500)
      })
      .await
      .unwrap();
      assert_eq!(result.unwrap(), "feat: add login");
   }

   #[tokio::test]
   async fn test_openai_compatible_returns_first_choice() {
      let server = MockServer::start().await;
      Mock::given(method("POST"))
         .and(path("/chat/completions"))
         .and(header("authorization", "Bearer test-key"))
         .and(body_partial_json(json!({"model": "gpt-test", "temperature": 0.5})))
         .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [
               {"message": {"role": "assistant", "content": " fix: handle empty input\n"}},
               {"message": {"role": "assistant", "content": "ignored"}}
            ]
         })))
         .mount(&server)
         .await;

      let uri = server.uri();
      let result = tokio::task::spawn_blocking(move || -> Result<String> {
         let provider = OpenAiCompatProvider::new(ProviderKind::OpenAi, uri, "test-key", 5)?;
         provider.complete(&prompt(), "gpt-test", 0.5, 500)
      })
      .await
      .unwrap();
      assert_eq!(result.unwrap(), "fix: handle empty input");
   }

   #[tokio::test]
   async fn test_empty_choices_is_provider_error() {
      let server = MockServer::start().await;
      Mock::given(method("POST"))
         .and(path("/chat/completions"))
         .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
         .mount(&server)
         .await;

      let uri = server.uri();
      let result = tokio::task::spawn_blocking(move || -> Result<String> {
         let provider = OpenAiCompatProvider::new(ProviderKind::Ollama, uri, LOCAL_API_KEY, 5)?;
         provider.complete(&prompt(), "llama2", 0.3, 500)
      })
      .await
      .unwrap();
      match result.unwrap_err() {
         CommitGenError::Provider { provider, message } => {
            assert_eq!(provider, "ollama");
            assert!(message.contains("no choices"));
         },
         other => panic!("unexpected error: {other}"),
      }
   }

   #[tokio::test]
   async fn test_http_error_carries_status() {
      let server = MockServer::start().await;
      Mock::given(method("POST"))
         .and(path("/v1/messages"))
         .respond_with(ResponseTemplate::new(401).set_body_string("invalid x-api-key"))
         .mount(&server)
         .await;

      let uri = server.uri();
      let result = tokio::task::spawn_blocking(move || -> Result<String> {
         let provider = AnthropicProvider::new(uri, "bad-key", 5)?;
         provider.complete(&prompt(), "claude-test", 0.3, 500)
      })
      .await
      .unwrap();
      let err = result.unwrap_err();
      assert_eq!(err.label(), "Provider Error");
      assert!(err.to_string().contains("401"));
      assert!(err.to_string().contains("invalid x-api-key"));
   }

   #[tokio::test]
   async fn test_malformed_body_is_provider_error() {
      let server = MockServer::start().await;
      Mock::given(method("POST"))
         .and(path("/chat/completions"))
         .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
         .mount(&server)
         .await;

      let uri = server.uri();
      let result = tokio::task::spawn_blocking(move || -> Result<String> {
         let provider = OpenAiCompatProvider::new(ProviderKind::OpenAi, uri, "k", 5)?;
         provider.complete(&prompt(), "gpt-test", 0.3, 500)
      })
      .await
      .unwrap();
      assert!(result.unwrap_err().to_string().contains("malformed response"));
   }

   #[tokio::test]
   async fn test_configured_base_url_used_for_configured_provider() {
      let server = MockServer::start().await;
      Mock::given(method("POST"))
         .and(path("/chat/completions"))
         .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"content": "docs: update readme"}}]
         })))
         .mount(&server)
         .await;

      let settings = Settings {
         provider: ProviderKind::Ollama,
         base_url: Some(format!("{}/", server.uri())),
         ..Settings::default()
      };
      let result = tokio::task::spawn_blocking(move || -> Result<String> {
         let provider = build_provider(&settings, ProviderKind::Ollama, |_| None)?;
         provider.complete(&prompt(), "llama2", 0.3, 500)
      })
      .await
      .unwrap();
      assert_eq!(result.unwrap(), "docs: update readme");
   }

   #[tokio::test]
   async fn test_configured_timeout_bounds_request() {
      let server = MockServer::start().await;
      Mock::given(method("POST"))
         .and(path("/chat/completions"))
         .respond_with(
            ResponseTemplate::new(200)
               .set_body_json(json!({"choices": [{"message": {"content": "late"}}]}))
               .set_delay(Duration::from_secs(3)),
         )
         .mount(&server)
         .await;

      let settings = Settings {
         provider: ProviderKind::Ollama,
         base_url: Some(server.uri()),
         request_timeout_secs: 1,
         ..Settings::default()
      };
      let result = tokio::task::spawn_blocking(move || -> Result<String> {
         let provider = build_provider(&settings, ProviderKind::Ollama, |_| None)?;
         provider.complete(&prompt(), "llama2", 0.3, 500)
      })
      .await
      .unwrap();
      assert!(result.unwrap_err().to_string().contains("request timed out"));
   }
}
