use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::Deserialize;
use toml::{Table, Value};

use crate::{
   error::{CommitGenError, Result},
   types::{ProviderKind, Style},
};

pub const DEFAULT_COMMIT_TYPES: &[&str] =
   &["feat", "fix", "docs", "style", "refactor", "perf", "test", "chore", "ci", "build"];

const DEFAULT_MAX_DIFF_LENGTH: i64 = 4000; // characters
const DEFAULT_TEMPERATURE: f64 = 0.3;
const DEFAULT_MAX_TOKENS: i64 = 500;
const DEFAULT_REQUEST_TIMEOUT_SECS: i64 = 120;

/// Environment variable naming an alternate config file.
pub const CONFIG_ENV_VAR: &str = "GIT_AI_CONFIG";

/// Built-in values every load starts from. Order here is the order keys are
/// written back to disk.
fn default_values() -> IndexMap<String, Value> {
   let models: Table = ProviderKind::ALL
      .into_iter()
      .map(|kind| (kind.as_str().to_string(), Value::String(kind.default_model().to_string())))
      .collect();

   IndexMap::from([
      ("provider".to_string(), Value::String(ProviderKind::Anthropic.as_str().to_string())),
      ("model".to_string(), Value::Table(models)),
      (
         "commit_types".to_string(),
         Value::Array(
            DEFAULT_COMMIT_TYPES
               .iter()
               .map(|t| Value::String((*t).to_string()))
               .collect(),
         ),
      ),
      ("max_diff_length".to_string(), Value::Integer(DEFAULT_MAX_DIFF_LENGTH)),
      ("temperature".to_string(), Value::Float(DEFAULT_TEMPERATURE)),
      ("default_style".to_string(), Value::String(Style::Conventional.as_str().to_string())),
      ("max_tokens".to_string(), Value::Integer(DEFAULT_MAX_TOKENS)),
      ("request_timeout_secs".to_string(), Value::Integer(DEFAULT_REQUEST_TIMEOUT_SECS)),
   ])
}

/// Persisted key/value configuration: built-in defaults with the user's file
/// layered on top, key by key at the top level.
#[derive(Debug, Clone)]
pub struct ConfigStore {
   path:   PathBuf,
   values: IndexMap<String, Value>,
}

impl ConfigStore {
   /// Load from `path`, else `GIT_AI_CONFIG`, else the per-user default
   /// location. A missing file yields the defaults.
   pub fn load(path: Option<&Path>) -> Result<Self> {
      let path = resolve_config_path(path, std::env::var_os(CONFIG_ENV_VAR).map(PathBuf::from));
      log::debug!("Using config file {}", path.display());

      if path.is_file() {
         Self::from_file(&path)
      } else {
         Ok(Self::with_defaults(path))
      }
   }

   /// Defaults only, to be saved at `path`.
   pub fn with_defaults(path: impl Into<PathBuf>) -> Self {
      Self { path: path.into(), values: default_values() }
   }

   pub fn from_file(path: &Path) -> Result<Self> {
      let contents = std::fs::read_to_string(path).map_err(|e| {
         CommitGenError::Config(format!("Failed to read config {}: {e}", path.display()))
      })?;
      let user: Table = toml::from_str(&contents).map_err(|e| {
         CommitGenError::Config(format!("Failed to parse config {}: {e}", path.display()))
      })?;

      let mut store = Self::with_defaults(path);
      for (key, value) in user {
         store.values.insert(key, value);
      }
      Ok(store)
   }

   pub fn path(&self) -> &Path {
      &self.path
   }

   pub const fn values(&self) -> &IndexMap<String, Value> {
      &self.values
   }

   /// Look up a value by dot-path (`model.openai`).
   pub fn get(&self, key: &str) -> Option<&Value> {
      let mut parts = key.split('.');
      let mut current = self.values.get(parts.next()?)?;
      for part in parts {
         current = current.get(part)?;
      }
      Some(current)
   }

   /// Set a value by dot-path, creating intermediate tables as needed.
   pub fn set(&mut self, key: &str, value: Value) -> Result<()> {
      let parts: Vec<&str> = key.split('.').collect();
      if parts.iter().any(|p| p.trim().is_empty()) {
         return Err(CommitGenError::Config(format!("Invalid key '{key}'")));
      }

      let Some((last, parents)) = parts.split_last() else {
         return Err(CommitGenError::Config(format!("Invalid key '{key}'")));
      };
      let Some((first, rest)) = parents.split_first() else {
         self.values.insert((*last).to_string(), value);
         return Ok(());
      };

      let mut current = self
         .values
         .entry((*first).to_string())
         .or_insert_with(|| Value::Table(Table::new()));
      for part in rest {
         current = match current {
            Value::Table(table) => table.entry(*part).or_insert(Value::Table(Table::new())),
            _ => return Err(not_a_table(key, part)),
         };
      }

      match current {
         Value::Table(table) => {
            table.insert((*last).to_string(), value);
            Ok(())
         },
         _ => Err(not_a_table(key, parents.last().unwrap_or(first))),
      }
   }

   /// Every key with its display value, one level of nesting flattened into
   /// `parent.child`.
   pub fn entries(&self) -> Vec<(String, String)> {
      let mut rows = Vec::new();
      for (key, value) in &self.values {
         match value {
            Value::Table(table) => {
               for (sub_key, sub_value) in table {
                  rows.push((format!("{key}.{sub_key}"), display_value(sub_value)));
               }
            },
            other => rows.push((key.clone(), display_value(other))),
         }
      }
      rows
   }

   /// Typed, validated view of the current values.
   pub fn settings(&self) -> Result<Settings> {
      let table: Table = self
         .values
         .iter()
         .map(|(k, v)| (k.clone(), v.clone()))
         .collect();
      let settings: Settings = Value::Table(table)
         .try_into()
         .map_err(|e| CommitGenError::Config(format!("Invalid configuration: {e}")))?;
      settings.validate()?;
      Ok(settings)
   }

   /// Write the in-memory map back to disk as-is.
   pub fn save(&self) -> Result<()> {
      if self.path.as_os_str().is_empty() {
         return Err(CommitGenError::Config(
            "No config path available (tried HOME and USERPROFILE)".to_string(),
         ));
      }
      if let Some(parent) = self.path.parent() {
         std::fs::create_dir_all(parent)?;
      }
      let contents = toml::to_string_pretty(&self.values)
         .map_err(|e| CommitGenError::Config(format!("Failed to serialize config: {e}")))?;
      std::fs::write(&self.path, contents)?;
      Ok(())
   }
}

fn not_a_table(key: &str, segment: &str) -> CommitGenError {
   CommitGenError::Config(format!("Cannot set '{key}': '{segment}' is not a table"))
}

/// Interpret a command-line value as a TOML literal, falling back to a plain
/// string.
pub fn parse_value(raw: &str) -> Value {
   toml::from_str::<Table>(&format!("value = {raw}"))
      .ok()
      .and_then(|mut table| table.remove("value"))
      .unwrap_or_else(|| Value::String(raw.to_string()))
}

/// Render a value for display: strings bare, everything else as TOML.
pub fn display_value(value: &Value) -> String {
   match value {
      Value::String(s) => s.clone(),
      other => other.to_string(),
   }
}

/// Pick the config file: an explicit path wins, then the value of
/// [`CONFIG_ENV_VAR`], then the per-user default.
pub fn resolve_config_path(explicit: Option<&Path>, from_env: Option<PathBuf>) -> PathBuf {
   if let Some(path) = explicit {
      return path.to_path_buf();
   }
   from_env
      .filter(|p| !p.as_os_str().is_empty())
      .unwrap_or_else(|| default_config_path().unwrap_or_default())
}

/// Get default config path (platform-safe)
/// Tries HOME (Unix/Linux/macOS) then USERPROFILE (Windows)
pub fn default_config_path() -> Result<PathBuf> {
   std::env::var("HOME")
      .or_else(|_| std::env::var("USERPROFILE"))
      .map(|home| PathBuf::from(home).join(".config/git-ai/config.toml"))
      .map_err(|_| {
         CommitGenError::Config("No home directory found (tried HOME and USERPROFILE)".to_string())
      })
}

/// Resolved configuration handed to each component at construction.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
   pub provider:             ProviderKind,
   #[serde(default)]
   pub model:                IndexMap<String, String>,
   pub commit_types:         Vec<String>,
   pub max_diff_length:      usize,
   pub temperature:          f32,
   pub default_style:        Style,
   pub max_tokens:           u32,
   pub request_timeout_secs: u64,
   /// Overrides the active provider's endpoint
   #[serde(default)]
   pub base_url:             Option<String>,
}

impl Default for Settings {
   fn default() -> Self {
      Self {
         provider:             ProviderKind::Anthropic,
         model:                ProviderKind::ALL
            .into_iter()
            .map(|kind| (kind.as_str().to_string(), kind.default_model().to_string()))
            .collect(),
         commit_types:         DEFAULT_COMMIT_TYPES.iter().map(|t| (*t).to_string()).collect(),
         max_diff_length:      DEFAULT_MAX_DIFF_LENGTH as usize,
         temperature:          DEFAULT_TEMPERATURE as f32,
         default_style:        Style::Conventional,
         max_tokens:           DEFAULT_MAX_TOKENS as u32,
         request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS as u64,
         base_url:             None,
      }
   }
}

impl Settings {
   fn validate(&self) -> Result<()> {
      if !(0.0..=1.0).contains(&self.temperature) {
         return Err(CommitGenError::Config(format!(
            "temperature must be between 0.0 and 1.0, got {}",
            self.temperature
         )));
      }
      if self.max_diff_length == 0 {
         return Err(CommitGenError::Config("max_diff_length must be positive".to_string()));
      }
      if self.max_tokens == 0 {
         return Err(CommitGenError::Config("max_tokens must be positive".to_string()));
      }
      Ok(())
   }

   /// Model id configured for `provider`, or its built-in default.
   pub fn model_for(&self, provider: ProviderKind) -> String {
      self.model.get(provider.as_str()).cloned().unwrap_or_else(|| {
         log::warn!(
            "No model configured for {provider}, using {}",
            provider.default_model()
         );
         provider.default_model().to_string()
      })
   }
}
