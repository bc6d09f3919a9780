use std::io::Write;

use env_logger::{Builder, Env};
use log::{Level, LevelFilter};
use owo_colors::OwoColorize;

use crate::style;

/// Log level for a `-v` count: warnings by default, then info, debug, trace.
pub const fn level_for(verbosity: u8) -> LevelFilter {
   match verbosity {
      0 => LevelFilter::Warn,
      1 => LevelFilter::Info,
      2 => LevelFilter::Debug,
      _ => LevelFilter::Trace,
   }
}

fn label(level: Level) -> String {
   let text = match level {
      Level::Error => "ERROR",
      Level::Warn => "WARN ",
      Level::Info => "INFO ",
      Level::Debug => "DEBUG",
      Level::Trace => "TRACE",
   };
   if !style::colors_enabled() {
      return text.to_string();
   }
   match level {
      Level::Error => text.red().bold().to_string(),
      Level::Warn => text.yellow().bold().to_string(),
      Level::Info => text.white().bold().to_string(),
      Level::Debug | Level::Trace => text.bright_black().to_string(),
   }
}

/// Install the global logger. `RUST_LOG`, when set, refines the level chosen
/// by `verbosity`. Calling this twice is harmless.
pub fn init_logger(verbosity: u8) {
   let mut builder = Builder::new();
   builder.filter_level(level_for(verbosity));
   builder.parse_env(Env::new().filter("RUST_LOG"));

   builder.format(|buf, record| writeln!(buf, "{} {}", label(record.level()), record.args()));

   builder.try_init().ok();
}

#[cfg(test)]
mod tests {
   use super::*;

   #[test]
   fn test_verbosity_levels() {
      assert_eq!(level_for(0), LevelFilter::Warn);
      assert_eq!(level_for(1), LevelFilter::Info);
      assert_eq!(level_for(2), LevelFilter::Debug);
      assert_eq!(level_for(3), LevelFilter::Trace);
      assert_eq!(level_for(9), LevelFilter::Trace);
   }

   #[test]
   fn test_init_twice_is_harmless() {
      init_logger(0);
      init_logger(2);
   }
}
