use std::{fmt, path::PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};

// === Staged change model ===

/// How a staged path differs from HEAD.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeKind {
   Added,
   Modified,
   Deleted,
   Renamed,
}

impl ChangeKind {
   /// Single-letter code used in prompts (`A`, `M`, `D`, `R`).
   pub const fn code(self) -> char {
      match self {
         Self::Added => 'A',
         Self::Modified => 'M',
         Self::Deleted => 'D',
         Self::Renamed => 'R',
      }
   }

   pub const fn as_str(self) -> &'static str {
      match self {
         Self::Added => "Added",
         Self::Modified => "Modified",
         Self::Deleted => "Deleted",
         Self::Renamed => "Renamed",
      }
   }
}

impl fmt::Display for ChangeKind {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      f.write_str(self.as_str())
   }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChange {
   pub path: String,
   pub kind: ChangeKind,
}

impl FileChange {
   pub fn new(path: impl Into<String>, kind: ChangeKind) -> Self {
      Self { path: path.into(), kind }
   }
}

/// Classification of the staged changes by file.
///
/// Counts are derived from `files_changed` at construction, so
/// `additions + deletions + modifications == files_changed.len()` always
/// holds. Renames count as modifications.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DiffSummary {
   files_changed: Vec<FileChange>,
   additions:     usize,
   deletions:     usize,
   modifications: usize,
}

impl DiffSummary {
   pub fn from_changes(files_changed: Vec<FileChange>) -> Self {
      let mut summary =
         Self { files_changed: Vec::new(), additions: 0, deletions: 0, modifications: 0 };
      for change in &files_changed {
         match change.kind {
            ChangeKind::Added => summary.additions += 1,
            ChangeKind::Deleted => summary.deletions += 1,
            ChangeKind::Modified | ChangeKind::Renamed => summary.modifications += 1,
         }
      }
      summary.files_changed = files_changed;
      summary
   }

   pub fn files_changed(&self) -> &[FileChange] {
      &self.files_changed
   }

   pub const fn additions(&self) -> usize {
      self.additions
   }

   pub const fn deletions(&self) -> usize {
      self.deletions
   }

   pub const fn modifications(&self) -> usize {
      self.modifications
   }

   pub const fn is_empty(&self) -> bool {
      self.files_changed.is_empty()
   }
}

/// Snapshot of one commit from history, used as prompt context only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitRecord {
   pub short_hash: String,
   pub message:    String,
   pub author:     String,
}

// === Message styles ===

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Style {
   /// type(scope): subject, with a body
   #[default]
   Conventional,
   /// emoji + type: subject
   Semantic,
   /// Plain subject and body
   Simple,
}

impl Style {
   pub const ALL: [Self; 3] = [Self::Conventional, Self::Semantic, Self::Simple];

   pub const fn as_str(self) -> &'static str {
      match self {
         Self::Conventional => "conventional",
         Self::Semantic => "semantic",
         Self::Simple => "simple",
      }
   }

   pub fn parse(s: &str) -> Option<Self> {
      Self::ALL.into_iter().find(|style| style.as_str() == s.trim().to_lowercase())
   }
}

impl fmt::Display for Style {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      f.write_str(self.as_str())
   }
}

// === Providers ===

/// Named LLM backends. `Ollama` speaks the OpenAI-compatible wire format on
/// localhost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
   /// Claude models (recommended)
   Anthropic,
   /// GPT models
   #[value(name = "openai")]
   #[serde(rename = "openai")]
   OpenAi,
   /// Local models
   Ollama,
}

impl ProviderKind {
   pub const ALL: [Self; 3] = [Self::Anthropic, Self::OpenAi, Self::Ollama];

   pub const fn as_str(self) -> &'static str {
      match self {
         Self::Anthropic => "anthropic",
         Self::OpenAi => "openai",
         Self::Ollama => "ollama",
      }
   }

   pub fn parse(s: &str) -> Option<Self> {
      Self::ALL.into_iter().find(|kind| kind.as_str() == s.trim().to_lowercase())
   }

   pub const fn display_name(self) -> &'static str {
      match self {
         Self::Anthropic => "Anthropic",
         Self::OpenAi => "OpenAI",
         Self::Ollama => "Ollama",
      }
   }

   pub const fn description(self) -> &'static str {
      match self {
         Self::Anthropic => "Claude (recommended)",
         Self::OpenAi => "GPT models",
         Self::Ollama => "Local models",
      }
   }

   /// Environment variable holding the API key; `None` for local providers.
   pub const fn env_var(self) -> Option<&'static str> {
      match self {
         Self::Anthropic => Some("ANTHROPIC_API_KEY"),
         Self::OpenAi => Some("OPENAI_API_KEY"),
         Self::Ollama => None,
      }
   }

   pub const fn default_model(self) -> &'static str {
      match self {
         Self::Anthropic => "claude-sonnet-4-20250514",
         Self::OpenAi => "gpt-4-turbo-preview",
         Self::Ollama => "llama2",
      }
   }

   pub const fn default_base_url(self) -> &'static str {
      match self {
         Self::Anthropic => "https://api.anthropic.com",
         Self::OpenAi => "https://api.openai.com/v1",
         Self::Ollama => "http://localhost:11434/v1",
      }
   }

   /// Where users obtain a key for this provider.
   pub const fn console_url(self) -> Option<&'static str> {
      match self {
         Self::Anthropic => Some("https://console.anthropic.com"),
         Self::OpenAi => Some("https://platform.openai.com"),
         Self::Ollama => None,
      }
   }
}

impl fmt::Display for ProviderKind {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      f.write_str(self.as_str())
   }
}

// === CLI ===

#[derive(Parser, Debug)]
#[command(name = "git-ai", version, about = "AI-powered git commit message generator")]
pub struct Args {
   /// Increase log verbosity (-v info, -vv debug, -vvv trace)
   #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
   pub verbose: u8,

   /// Path to config file (default: ~/.config/git-ai/config.toml)
   #[arg(long, global = true)]
   pub config: Option<PathBuf>,

   #[command(subcommand)]
   pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
   /// Generate and create a commit with an AI-generated message
   Commit(CommitArgs),

   /// Show staged changes
   Status,

   /// Set a configuration value (nested keys use dots, e.g. model.openai)
   ConfigSet {
      key:   String,
      value: String,
   },

   /// Show one configuration value, or all of them
   ConfigGet { key: Option<String> },

   /// Interactive setup wizard
   Setup,
}

#[derive(clap::Args, Debug, Default)]
pub struct CommitArgs {
   /// Commit message style (default: `default_style` from config)
   #[arg(long, value_enum)]
   pub style: Option<Style>,

   /// Generate the message without committing
   #[arg(long)]
   pub dry_run: bool,

   /// Skip interactive editing
   #[arg(long)]
   pub no_edit: bool,

   /// LLM provider to use for this run
   #[arg(long, value_enum)]
   pub provider: Option<ProviderKind>,

   /// Model to use for this run
   #[arg(long, short = 'm')]
   pub model: Option<String>,
}
