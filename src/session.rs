//! Interactive message lifecycle.
//!
//! A [`Session`] exists only after the first message has been generated. From
//! then on every step is driven by one [`Action`]:
//!
//! ```text
//! Generating -> Proposed -> { Generating, Editing, Refining } -> Proposed
//!                        -> Committed | Cancelled
//! ```
//!
//! The session never commits anything itself; [`Outcome::Committed`] hands the
//! final text back to the caller.

use std::{fmt, str::FromStr};

use crate::{
   api::Provider,
   error::{CommitGenError, Result},
   prompt::{build_prompt, build_refine_prompt},
   types::{CommitRecord, DiffSummary, Style},
};

/// Added to the base temperature for one regenerate call.
pub const REGENERATE_TEMPERATURE_STEP: f32 = 0.2;

/// Temperature used for a single regenerate call.
pub fn regenerate_temperature(base: f32) -> f32 {
   (base + REGENERATE_TEMPERATURE_STEP).min(1.0)
}

/// User decision at the proposal point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
   Accept,
   Regenerate,
   Edit,
   Feedback,
   Cancel,
}

impl Action {
   pub const ALL: [Self; 5] = [Self::Accept, Self::Regenerate, Self::Edit, Self::Feedback, Self::Cancel];

   pub const fn key(self) -> char {
      match self {
         Self::Accept => 'a',
         Self::Regenerate => 'r',
         Self::Edit => 'e',
         Self::Feedback => 'f',
         Self::Cancel => 'c',
      }
   }

   pub const fn word(self) -> &'static str {
      match self {
         Self::Accept => "accept",
         Self::Regenerate => "regenerate",
         Self::Edit => "edit",
         Self::Feedback => "feedback",
         Self::Cancel => "cancel",
      }
   }

   pub const fn description(self) -> &'static str {
      match self {
         Self::Accept => "Accept and commit",
         Self::Regenerate => "Regenerate",
         Self::Edit => "Edit manually",
         Self::Feedback => "Provide feedback for refinement",
         Self::Cancel => "Cancel",
      }
   }
}

impl fmt::Display for Action {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      f.write_str(self.word())
   }
}

impl FromStr for Action {
   type Err = CommitGenError;

   fn from_str(s: &str) -> Result<Self> {
      let token = s.trim().to_lowercase();
      Self::ALL
         .into_iter()
         .find(|action| (token.len() == 1 && token.starts_with(action.key())) || token == action.word())
         .ok_or_else(|| {
            CommitGenError::Other(format!(
               "Invalid choice '{}'. Choose one of a, r, e, f, c.",
               s.trim()
            ))
         })
   }
}

/// Where the session is after an action has been taken.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum State {
   /// Calling the provider at this temperature
   Generating { temperature: f32 },
   Proposed,
   Editing,
   Refining,
   Committed,
   Cancelled,
}

impl State {
   pub const fn is_terminal(self) -> bool {
      matches!(self, Self::Committed | Self::Cancelled)
   }
}

/// Transition table for the proposal point.
pub fn transition(action: Action, base_temperature: f32) -> State {
   match action {
      Action::Accept => State::Committed,
      Action::Regenerate => State::Generating {
         temperature: regenerate_temperature(base_temperature),
      },
      Action::Edit => State::Editing,
      Action::Feedback => State::Refining,
      Action::Cancel => State::Cancelled,
   }
}

/// How a session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
   Committed(String),
   Cancelled,
}

/// Everything the user sees or types during a session.
pub trait Interaction {
   /// Present the current proposal.
   fn show_message(&mut self, title: &str, message: &str);

   /// Next action token; `None` when input is exhausted.
   fn read_action(&mut self) -> Result<Option<String>>;

   /// Replacement message, read until end of input.
   fn read_multiline(&mut self) -> Result<String>;

   /// One line of refinement instructions; `None` when input is exhausted.
   fn read_feedback(&mut self) -> Result<Option<String>>;

   fn report_error(&mut self, error: &CommitGenError);

   fn notice(&mut self, text: &str);

   /// Run a provider call, optionally with a progress indicator.
   fn progress<T>(&mut self, label: &str, f: impl FnOnce() -> Result<T>) -> Result<T> {
      let _ = label;
      f()
   }
}

/// Diff, summary and history a message is generated from.
#[derive(Debug, Clone)]
pub struct DiffContext {
   pub diff:    String,
   pub summary: DiffSummary,
   pub history: Vec<CommitRecord>,
}

/// Provider call parameters, fixed for the life of a session.
#[derive(Debug, Clone)]
pub struct Generation {
   pub model:           String,
   pub temperature:     f32,
   pub max_tokens:      u32,
   pub commit_types:    Vec<String>,
   pub max_diff_length: usize,
}

pub struct Session<'p, P: Provider + ?Sized> {
   provider:        &'p P,
   context:         DiffContext,
   style:           Style,
   generation:      Generation,
   current_message: String,
}

impl<'p, P: Provider + ?Sized> Session<'p, P> {
   /// Generate the first proposal. Provider failures here are fatal.
   pub fn start(
      provider: &'p P,
      context: DiffContext,
      style: Style,
      generation: Generation,
      ui: &mut impl Interaction,
   ) -> Result<Self> {
      let mut session =
         Self { provider, context, style, generation, current_message: String::new() };
      let temperature = session.generation.temperature;
      session.current_message =
         ui.progress("Generating commit message...", || session.generate(temperature))?;
      Ok(session)
   }

   fn generate(&self, temperature: f32) -> Result<String> {
      let prompt = build_prompt(
         &self.context.diff,
         &self.context.summary,
         &self.context.history,
         self.style,
         &self.generation.commit_types,
         self.generation.max_diff_length,
      );
      self.provider.complete(
         &prompt,
         &self.generation.model,
         temperature,
         self.generation.max_tokens,
      )
   }

   pub fn message(&self) -> &str {
      &self.current_message
   }

   /// Base temperature. Regenerate never changes it.
   pub const fn temperature(&self) -> f32 {
      self.generation.temperature
   }

   pub const fn style(&self) -> Style {
      self.style
   }

   /// The current message, unchanged.
   pub fn accept(&self) -> String {
      self.current_message.clone()
   }

   /// Generate a fresh proposal at a raised temperature. On failure the
   /// current message is kept.
   pub fn regenerate(&mut self, ui: &mut impl Interaction) -> Result<()> {
      let temperature = regenerate_temperature(self.temperature());
      log::debug!("Regenerating at temperature {temperature}");
      let message = ui.progress("Regenerating...", || self.generate(temperature))?;
      self.current_message = message;
      Ok(())
   }

   /// Replace the message verbatim.
   pub fn edit(&mut self, text: String) {
      self.current_message = text;
   }

   /// Ask the provider to rework the message. On failure the current message
   /// is kept.
   pub fn refine(&mut self, feedback: &str, ui: &mut impl Interaction) -> Result<()> {
      let prompt = build_refine_prompt(&self.current_message, feedback);
      let message = ui.progress("Refining message...", || {
         self.provider.complete(
            &prompt,
            &self.generation.model,
            self.generation.temperature,
            self.generation.max_tokens,
         )
      })?;
      self.current_message = message.trim().to_string();
      Ok(())
   }

   /// Drive the proposal loop until the user accepts or cancels.
   pub fn run(mut self, ui: &mut impl Interaction) -> Result<Outcome> {
      let mut title = "Generated commit message";
      loop {
         ui.show_message(title, &self.current_message);

         let action = loop {
            match ui.read_action()? {
               None => break Action::Cancel,
               Some(raw) => match raw.parse::<Action>() {
                  Ok(action) => break action,
                  Err(e) => ui.report_error(&e),
               },
            }
         };
         log::debug!("Action: {action}");

         let result = match transition(action, self.temperature()) {
            State::Committed => return Ok(Outcome::Committed(self.accept())),
            State::Cancelled => return Ok(Outcome::Cancelled),
            State::Generating { .. } => {
               title = "Regenerated message";
               self.regenerate(ui)
            },
            State::Editing => {
               let text = ui.read_multiline()?;
               self.edit(text);
               title = "Updated message";
               Ok(())
            },
            State::Refining => match ui.read_feedback()? {
               Some(feedback) if !feedback.trim().is_empty() => {
                  title = "Refined message";
                  self.refine(&feedback, ui)
               },
               _ => {
                  ui.notice("No feedback given; message unchanged.");
                  Ok(())
               },
            },
            State::Proposed => unreachable!("every action leaves the proposal point"),
         };

         match result {
            Ok(()) => {},
            Err(e @ CommitGenError::Provider { .. }) => {
               ui.report_error(&e);
               title = "Current message";
            },
            Err(e) => return Err(e),
         }
      }
   }
}
