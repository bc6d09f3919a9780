use thiserror::Error;

#[derive(Debug, Error)]
pub enum CommitGenError {
   #[error("{0}")]
   Repository(String),

   #[error("No staged changes found. Use 'git add' to stage changes.")]
   NoStagedChanges,

   #[error("{provider} requires an API key in ${env_var}")]
   MissingCredential { provider: String, env_var: String },

   #[error("{provider} request failed: {message}")]
   Provider { provider: String, message: String },

   #[error("{0}")]
   Config(String),

   #[error("IO error: {0}")]
   IoError(#[from] std::io::Error),

   #[error("Clipboard error: {0}")]
   ClipboardError(#[from] arboard::Error),

   #[error("{0}")]
   Other(String),
}

impl CommitGenError {
   pub(crate) fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
      Self::Provider { provider: provider.into(), message: message.into() }
   }

   /// Short label shown in front of the message when reporting to the user.
   pub const fn label(&self) -> &'static str {
      match self {
         Self::Repository(_) => "Git Error",
         Self::NoStagedChanges => "No staged changes",
         Self::MissingCredential { .. } => "Missing credential",
         Self::Provider { .. } => "Provider Error",
         Self::Config(_) => "Config Error",
         Self::IoError(_) | Self::ClipboardError(_) | Self::Other(_) => "Error",
      }
   }

   /// What the user can do about it, when there is something to do.
   pub fn hint(&self) -> Option<String> {
      match self {
         Self::NoStagedChanges => Some("Use `git add` to stage your changes first.".to_string()),
         Self::MissingCredential { env_var, .. } => {
            Some(format!("Set it in your environment: export {env_var}=your-key-here"))
         },
         Self::Config(_) => Some("Inspect the current values with `git-ai config-get`.".to_string()),
         _ => None,
      }
   }
}

impl From<git2::Error> for CommitGenError {
   fn from(err: git2::Error) -> Self {
      Self::Repository(err.message().to_string())
   }
}

pub type Result<T> = std::result::Result<T, CommitGenError>;

#[cfg(test)]
mod tests {
   use super::*;

   #[test]
   fn test_labels_match_taxonomy() {
      assert_eq!(CommitGenError::Repository("x".into()).label(), "Git Error");
      assert_eq!(CommitGenError::NoStagedChanges.label(), "No staged changes");
      assert_eq!(CommitGenError::provider("openai", "boom").label(), "Provider Error");
      assert_eq!(CommitGenError::Config("bad".into()).label(), "Config Error");
      assert_eq!(CommitGenError::Other("x".into()).label(), "Error");
   }

   #[test]
   fn test_missing_credential_hint_names_variable() {
      let err = CommitGenError::MissingCredential {
         provider: "anthropic".into(),
         env_var:  "ANTHROPIC_API_KEY".into(),
      };
      assert_eq!(err.to_string(), "anthropic requires an API key in $ANTHROPIC_API_KEY");
      assert!(err.hint().unwrap().contains("export ANTHROPIC_API_KEY="));
   }

   #[test]
   fn test_provider_error_carries_provider_and_message() {
      let err = CommitGenError::provider("ollama", "connection refused");
      assert_eq!(err.to_string(), "ollama request failed: connection refused");
      assert!(err.hint().is_none());
   }
}
