//! Prompt construction from staged changes.
//!
//! [`build_prompt`] is total: every input combination renders. Invalid styles
//! are rejected when the configuration is loaded, not here.

use std::{borrow::Cow, fmt, fmt::Write as _};

use crate::{
   prompts,
   types::{CommitRecord, DiffSummary, Style},
};

/// Rendered request text, built once and handed to a provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt(String);

impl Prompt {
   pub fn as_str(&self) -> &str {
      &self.0
   }

   pub fn into_string(self) -> String {
      self.0
   }

   /// Length in characters.
   pub fn char_len(&self) -> usize {
      self.0.chars().count()
   }
}

impl fmt::Display for Prompt {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      f.write_str(&self.0)
   }
}

impl AsRef<str> for Prompt {
   fn as_ref(&self) -> &str {
      &self.0
   }
}

/// Keep at most `max_chars` characters of `diff`, marking the cut.
pub fn truncate_diff(diff: &str, max_chars: usize) -> Cow<'_, str> {
   match diff.char_indices().nth(max_chars) {
      Some((byte_idx, _)) => {
         log::info!(
            "Diff truncated from {} to {max_chars} characters",
            diff.chars().count()
         );
         Cow::Owned(format!("{}{}", &diff[..byte_idx], prompts::TRUNCATION_MARKER))
      },
      None => Cow::Borrowed(diff),
   }
}

/// Backtick fence that cannot be closed early by anything inside `body`.
pub fn fence_for(body: &str) -> String {
   let mut longest = 0;
   let mut run = 0;
   for c in body.chars() {
      if c == '`' {
         run += 1;
         longest = longest.max(run);
      } else {
         run = 0;
      }
   }
   "`".repeat((longest + 1).max(3))
}

/// Render the generation prompt.
///
/// Sections, in order: header, file list, summary counts, format guide,
/// fenced diff, recent history (only when non-empty), closing instruction.
pub fn build_prompt(
   diff: &str,
   summary: &DiffSummary,
   history: &[CommitRecord],
   style: Style,
   commit_types: &[String],
   max_diff_length: usize,
) -> Prompt {
   let diff = truncate_diff(diff, max_diff_length);
   let fence = fence_for(&diff);

   let mut out = String::with_capacity(diff.len() + 1024);
   out.push_str(prompts::HEADER);
   out.push_str("\n\n");

   out.push_str(prompts::FILES_HEADER);
   out.push('\n');
   for change in summary.files_changed() {
      writeln!(out, "- {} ({})", change.path, change.kind.code()).ok();
   }
   out.push('\n');

   out.push_str(prompts::SUMMARY_HEADER);
   out.push('\n');
   writeln!(out, "- {} file(s) added", summary.additions()).ok();
   writeln!(out, "- {} file(s) modified", summary.modifications()).ok();
   writeln!(out, "- {} file(s) deleted", summary.deletions()).ok();
   out.push('\n');

   out.push_str(&prompts::format_guide(style, commit_types));
   out.push_str("\n\n");

   out.push_str(prompts::DIFF_HEADER);
   out.push('\n');
   writeln!(out, "{fence}\n{diff}\n{fence}").ok();

   if !history.is_empty() {
      out.push('\n');
      out.push_str(prompts::HISTORY_HEADER);
      out.push('\n');
      for commit in history.iter().take(prompts::HISTORY_LIMIT) {
         writeln!(out, "- {}: {}", commit.short_hash, commit.message).ok();
      }
   }

   out.push('\n');
   out.push_str(prompts::CLOSING);

   let prompt = Prompt(out);
   log::debug!("Built {style} prompt ({} chars)", prompt.char_len());
   log::trace!("Prompt:\n{prompt}");
   prompt
}

/// Render the refinement prompt for `original` and the user's `feedback`.
pub fn build_refine_prompt(original: &str, feedback: &str) -> Prompt {
   Prompt(prompts::refine(original, feedback))
}
