use std::{path::Path, process::ExitCode};

use arboard::Clipboard;
use clap::Parser;
use git_ai::{
   api,
   config::{self, ConfigStore},
   console::Console,
   error::{CommitGenError, Result},
   git::{self, GitRepo},
   logging,
   session::{DiffContext, Generation, Interaction, Outcome, Session},
   style::{self, icons},
   types::{Args, Command, CommitArgs, ProviderKind, Style},
};
use toml::Value;

/// Copy text to clipboard
fn copy_to_clipboard(text: &str) -> Result<()> {
   let mut clipboard = Clipboard::new()?;
   clipboard.set_text(text)?;
   Ok(())
}

fn open_repo() -> Result<GitRepo> {
   GitRepo::open(Path::new("."))
}

/// Staged file table plus the line-count summary.
fn show_staged_changes(repo: &GitRepo) -> Result<()> {
   let summary = repo.get_diff_summary()?;
   let (files_changed, total_changes) = repo.get_commit_stats()?;

   let rows: Vec<Vec<String>> = summary
      .files_changed()
      .iter()
      .map(|change| vec![change.path.clone(), change.kind.to_string()])
      .collect();

   println!("\n{}", style::bold("Staged Changes:"));
   println!("{}", style::table(&["File", "Status"], &rows));
   println!("\n{}", style::dim(&format!("{files_changed} file(s), {total_changes} change(s)")));
   Ok(())
}

fn run_commit(store: &ConfigStore, args: &CommitArgs) -> Result<()> {
   let settings = store.settings()?;
   let repo = open_repo()?;

   let kind = args.provider.unwrap_or(settings.provider);
   let model = args.model.clone().unwrap_or_else(|| settings.model_for(kind));
   let message_style = args.style.unwrap_or(settings.default_style);
   let provider = api::build_provider(&settings, kind, |name| std::env::var(name).ok())?;

   if !repo.has_staged_changes()? {
      return Err(CommitGenError::NoStagedChanges);
   }
   show_staged_changes(&repo)?;

   let context = style::with_spinner_result("Analyzing changes...", || -> Result<DiffContext> {
      Ok(DiffContext {
         diff:    repo.get_staged_diff()?,
         summary: repo.get_diff_summary()?,
         history: repo.get_recent_commits(git::DEFAULT_HISTORY_COUNT)?,
      })
   })?;
   println!("{}", style::dim(&format!("Using {kind} model {model}, {message_style} style")));

   let generation = Generation {
      model,
      temperature:     settings.temperature,
      max_tokens:      settings.max_tokens,
      commit_types:    settings.commit_types.clone(),
      max_diff_length: settings.max_diff_length,
   };

   let mut ui = Console::stdin();
   let session = Session::start(provider.as_ref(), context, message_style, generation, &mut ui)?;

   let message = if args.no_edit {
      ui.show_message("Generated commit message", session.message());
      session.accept()
   } else {
      match session.run(&mut ui)? {
         Outcome::Committed(message) => message,
         Outcome::Cancelled => {
            println!("{}", style::warning("Commit cancelled."));
            return Ok(());
         },
      }
   };

   if args.dry_run {
      println!("\n{}", style::warning("Dry run - no commit created."));
      println!("{message}");
      match copy_to_clipboard(&message) {
         Ok(()) => println!("{} Message copied to clipboard", icons::CLIPBOARD),
         Err(e) => style::print_info(&format!("Clipboard unavailable: {e}")),
      }
      return Ok(());
   }

   println!();
   if ui.confirm("Create commit with this message?", true)? {
      let id = repo.commit(&message)?;
      let short = id.get(..7).unwrap_or(&id);
      println!("\n{} {short}", style::success(&format!("{} Commit created:", icons::SUCCESS)));
   } else {
      println!("{}", style::warning("Commit cancelled."));
   }
   Ok(())
}

fn run_status() -> Result<()> {
   show_staged_changes(&open_repo()?)
}

fn run_config_set(store: &mut ConfigStore, key: &str, raw: &str) -> Result<()> {
   let value = config::parse_value(raw);
   store.set(key, value.clone())?;
   // Refuse to persist anything the next run could not load.
   store.settings()?;
   store.save()?;
   println!(
      "{} {key} = {}",
      style::success(&format!("{} Configuration updated:", icons::SUCCESS)),
      config::display_value(&value)
   );
   Ok(())
}

fn run_config_get(store: &ConfigStore, key: Option<&str>) -> Result<()> {
   if let Some(key) = key {
      let value = store
         .get(key)
         .ok_or_else(|| CommitGenError::Config(format!("Unknown configuration key '{key}'")))?;
      println!("{key}: {}", config::display_value(value));
      return Ok(());
   }

   let rows: Vec<Vec<String>> = store.entries().into_iter().map(|(k, v)| vec![k, v]).collect();
   println!("{}", style::bold("git-ai Configuration"));
   println!("{}", style::table(&["Key", "Value"], &rows));
   println!("\n{}", style::dim(&format!("Config file: {}", store.path().display())));
   Ok(())
}

fn run_setup(store: &mut ConfigStore) -> Result<()> {
   let width = style::term_width();
   let mut ui = Console::stdin();
   let current = store.settings().ok();

   println!(
      "{}",
      style::boxed_message(
         "git-ai Setup Wizard",
         "Let's configure your AI commit message generator!",
         width.min(60)
      )
   );

   println!("\n{}", style::section_header("1. Choose LLM Provider", width));
   for kind in ProviderKind::ALL {
      println!("  {} - {}", style::info(kind.as_str()), kind.description());
   }
   let providers = ProviderKind::ALL.map(ProviderKind::as_str);
   let default_provider = current.as_ref().map_or(ProviderKind::Anthropic, |s| s.provider);
   let answer = ui.choose("Provider", &providers, default_provider.as_str())?;
   let kind = ProviderKind::parse(&answer).unwrap_or(default_provider);
   store.set("provider", Value::String(kind.as_str().to_string()))?;

   if let (Some(env_var), Some(console_url)) = (kind.env_var(), kind.console_url()) {
      println!("\n{}", style::section_header(&format!("2. {} API Key", kind.display_name()), width));
      println!("Get your key from: {}", style::info(console_url));
      println!("Set it in your environment:");
      println!("  {}", style::info(&format!("export {env_var}=your-key-here")));
   }

   println!("\n{}", style::section_header("3. Default Commit Style", width));
   let styles = Style::ALL.map(Style::as_str);
   let default_style = current.as_ref().map_or(Style::Conventional, |s| s.default_style);
   let answer = ui.choose("Style", &styles, default_style.as_str())?;
   let chosen = Style::parse(&answer).unwrap_or(default_style);
   store.set("default_style", Value::String(chosen.as_str().to_string()))?;

   store.settings()?;
   store.save()?;
   println!("\n{}", style::success(&format!("{} Setup complete!", icons::SUCCESS)));
   println!("{} Config saved to: {}", icons::SAVE, store.path().display());
   Ok(())
}

fn run(args: Args) -> Result<()> {
   let mut store = ConfigStore::load(args.config.as_deref())?;

   match args.command {
      Command::Commit(ref commit) => run_commit(&store, commit),
      Command::Status => run_status(),
      Command::ConfigSet { ref key, ref value } => run_config_set(&mut store, key, value),
      Command::ConfigGet { ref key } => run_config_get(&store, key.as_deref()),
      Command::Setup => run_setup(&mut store),
   }
}

fn main() -> ExitCode {
   dotenvy::dotenv().ok();
   let args = Args::parse();
   logging::init_logger(args.verbose);

   match run(args) {
      Ok(()) => ExitCode::SUCCESS,
      Err(e) => {
         style::print_error(e.label(), &e.to_string(), e.hint().as_deref());
         ExitCode::FAILURE
      },
   }
}
