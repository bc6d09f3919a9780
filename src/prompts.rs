//! Static prompt text. Only the conventional guide has a placeholder
//! (`{commit_types}`); everything else is used verbatim.

use crate::types::Style;

pub const HEADER: &str = "Generate a git commit message for the following changes.";

pub const FILES_HEADER: &str = "Files changed:";

pub const SUMMARY_HEADER: &str = "Summary:";

pub const DIFF_HEADER: &str = "Git diff:";

pub const HISTORY_HEADER: &str = "Recent commits for context:";

pub const CLOSING: &str =
   "Generate a clear, concise commit message. Return ONLY the commit message, no explanations.";

pub const TRUNCATION_MARKER: &str = "... (diff truncated)";

/// Most recent commits shown as context.
pub const HISTORY_LIMIT: usize = 3;

const CONVENTIONAL_GUIDE: &str = "Format: <type>(<scope>): <subject>

<body>

Types: {commit_types}
- Use feat: for new features
- Use fix: for bug fixes
- Use docs: for documentation
- Use refactor: for code refactoring
- Use test: for test changes
- Use chore: for maintenance tasks

Rules:
1. Subject line max 50 chars, lowercase, no period
2. Body wraps at 72 chars
3. Explain WHAT and WHY, not HOW
4. Use imperative mood (\"add\" not \"added\")";

const SEMANTIC_GUIDE: &str = "Format: <emoji> <type>: <subject>

Examples:
\u{2728} feat: add user authentication
\u{1F41B} fix: resolve memory leak in worker
\u{1F4DD} docs: update API documentation
\u{267B}\u{FE0F} refactor: simplify database queries";

const SIMPLE_GUIDE: &str = "Format: <subject>

<body>

Keep it simple and clear. Focus on what changed and why.";

/// Format guide for `style`, with the commit-type vocabulary filled in.
pub fn format_guide(style: Style, commit_types: &[String]) -> String {
   match style {
      Style::Conventional => CONVENTIONAL_GUIDE.replace("{commit_types}", &commit_types.join(", ")),
      Style::Semantic => SEMANTIC_GUIDE.to_string(),
      Style::Simple => SIMPLE_GUIDE.to_string(),
   }
}

/// Refinement request embedding the current message and feedback verbatim.
pub fn refine(original: &str, feedback: &str) -> String {
   format!(
      "Refine this commit message based on the feedback.

Original message:
{original}

Feedback:
{feedback}

Generate the refined commit message. Return ONLY the commit message, no explanations."
   )
}
