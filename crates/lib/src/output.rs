//! Console output for build scripts.
//!
//! [`log_out`] prints leveled, colored messages for the person running the
//! script. Internal diagnostics go through `tracing` instead; [`init_tracing`]
//! installs the subscriber for them.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

use owo_colors::{OwoColorize, Stream};
use tracing_subscriber::EnvFilter;

/// Message severity, in increasing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum LogLevel {
  Debug = 0,
  Info = 1,
  Message = 2,
  Warn = 3,
  Error = 4,
  Fatal = 5,
}

impl LogLevel {
  fn from_u8(value: u8) -> Self {
    match value {
      0 => LogLevel::Debug,
      1 => LogLevel::Info,
      2 => LogLevel::Message,
      3 => LogLevel::Warn,
      4 => LogLevel::Error,
      _ => LogLevel::Fatal,
    }
  }
}

impl fmt::Display for LogLevel {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      LogLevel::Debug => "debug",
      LogLevel::Info => "info",
      LogLevel::Message => "message",
      LogLevel::Warn => "warn",
      LogLevel::Error => "error",
      LogLevel::Fatal => "fatal",
    };
    f.write_str(name)
  }
}

static MIN_LEVEL: AtomicU8 = AtomicU8::new(LogLevel::Info as u8);

/// Set the minimum level printed by [`log_out`].
pub fn set_log_level(level: LogLevel) {
  MIN_LEVEL.store(level as u8, Ordering::Relaxed);
}

pub fn log_level() -> LogLevel {
  LogLevel::from_u8(MIN_LEVEL.load(Ordering::Relaxed))
}

/// Whether a message at `level` would be printed.
pub fn enabled(level: LogLevel) -> bool {
  level >= log_level()
}

/// Print `content` at `level`.
///
/// Warnings and errors go to stderr, everything else to stdout.
pub fn log_out(level: LogLevel, content: &str) {
  if !enabled(level) {
    return;
  }

  match level {
    LogLevel::Debug => println!("{}", content.if_supports_color(Stream::Stdout, |s| s.bright_black())),
    LogLevel::Info => println!("{content}"),
    LogLevel::Message => println!("{}", content.if_supports_color(Stream::Stdout, |s| s.bright_white())),
    LogLevel::Warn => eprintln!("{}", content.if_supports_color(Stream::Stderr, |s| s.yellow())),
    LogLevel::Error | LogLevel::Fatal => eprintln!("{}", content.if_supports_color(Stream::Stderr, |s| s.red())),
  }
}

/// Install the `tracing` subscriber used for internal diagnostics.
///
/// `RUST_LOG` takes precedence; otherwise only warnings are shown, or debug
/// events with `verbose`. Installing twice is a no-op.
pub fn init_tracing(verbose: bool) {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "warn" }));

  let _ = tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .without_time()
    .try_init();
}
