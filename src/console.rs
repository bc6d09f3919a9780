//! Terminal front end for the message session and the setup wizard.

use std::io::{self, BufRead, Write};

use crate::{
   error::{CommitGenError, Result},
   session::{Action, Interaction},
   style,
};

/// Reads answers from `input`, writes prompts and panels to stdout.
pub struct Console<R> {
   input: R,
}

impl Console<io::StdinLock<'static>> {
   pub fn stdin() -> Self {
      Self { input: io::stdin().lock() }
   }
}

impl<R: BufRead> Console<R> {
   pub const fn new(input: R) -> Self {
      Self { input }
   }

   /// One line without its terminator; `None` at end of input.
   fn read_line(&mut self) -> Result<Option<String>> {
      let mut line = String::new();
      if self.input.read_line(&mut line)? == 0 {
         return Ok(None);
      }
      let trimmed_len = line.trim_end_matches(['\n', '\r']).len();
      line.truncate(trimmed_len);
      Ok(Some(line))
   }

   fn prompt(text: &str) {
      print!("{text}");
      io::stdout().flush().ok();
   }

   /// Yes/no question. An empty answer takes `default`; end of input is "no".
   pub fn confirm(&mut self, question: &str, default: bool) -> Result<bool> {
      let hint = if default { "[Y/n]" } else { "[y/N]" };
      loop {
         Self::prompt(&format!("{} {hint} ", style::bold(question)));
         let Some(answer) = self.read_line()? else {
            println!();
            return Ok(false);
         };
         match answer.trim().to_lowercase().as_str() {
            "" => return Ok(default),
            "y" | "yes" => return Ok(true),
            "n" | "no" => return Ok(false),
            other => style::warn(&format!("Please answer y or n (got '{other}')")),
         }
      }
   }

   /// Ask until the answer is one of `choices`. An empty answer or end of
   /// input takes `default`.
   pub fn choose(&mut self, label: &str, choices: &[&str], default: &str) -> Result<String> {
      loop {
         Self::prompt(&format!(
            "{} [{}] ({}): ",
            style::bold(label),
            choices.join("/"),
            style::info(default)
         ));
         let Some(answer) = self.read_line()? else {
            println!();
            return Ok(default.to_string());
         };
         let answer = answer.trim().to_lowercase();
         if answer.is_empty() {
            return Ok(default.to_string());
         }
         if choices.contains(&answer.as_str()) {
            return Ok(answer);
         }
         style::warn(&format!("Please select one of the available options: {}", choices.join(", ")));
      }
   }
}

impl<R: BufRead> Interaction for Console<R> {
   fn show_message(&mut self, title: &str, message: &str) {
      println!();
      println!("{}", style::boxed_message(title, message, style::term_width()));
   }

   fn read_action(&mut self) -> Result<Option<String>> {
      println!();
      println!("{}", style::bold("Options:"));
      for action in Action::ALL {
         println!("  {} - {}", style::info(&action.key().to_string()), action.description());
      }
      loop {
         Self::prompt("Choose [a/r/e/f/c]: ");
         match self.read_line()? {
            Some(answer) if answer.trim().is_empty() => {
               style::warn("Please choose one of a, r, e, f, c.");
            },
            answer => return Ok(answer),
         }
      }
   }

   fn read_multiline(&mut self) -> Result<String> {
      println!();
      println!("{}", style::dim("Enter your commit message (Ctrl+D when done):"));
      let mut lines = Vec::new();
      while let Some(line) = self.read_line()? {
         lines.push(line);
      }
      Ok(lines.join("\n"))
   }

   fn read_feedback(&mut self) -> Result<Option<String>> {
      println!();
      Self::prompt(&format!("{} ", style::bold("What would you like to change?")));
      self.read_line()
   }

   fn report_error(&mut self, error: &CommitGenError) {
      style::print_error(error.label(), &error.to_string(), error.hint().as_deref());
   }

   fn notice(&mut self, text: &str) {
      style::warn(text);
   }

   fn progress<T>(&mut self, label: &str, f: impl FnOnce() -> Result<T>) -> Result<T> {
      style::with_spinner_result(label, f)
   }
}
