//! The build script runner.
//!
//! A build script registers its variables, options and actions on a
//! [`BuildScript`] and hands control to [`BuildScript::main`]:
//!
//! ```no_run
//! use std::process::ExitCode;
//!
//! use ninjagen_lib::action::Action;
//! use ninjagen_lib::script::BuildScript;
//!
//! fn declare(script: &mut BuildScript) -> ninjagen_lib::Result<()> {
//!   script.variable("src", "src")?;
//!   script.action(Action::new("ninja", |_ctx| Ok(())).default_run(true))?;
//!   Ok(())
//! }
//!
//! fn main() -> ExitCode {
//!   ninjagen_lib::script::run("Build my project", declare)
//! }
//! ```

pub mod cli;

use std::ffi::OsString;
use std::process::ExitCode;

use tracing::debug;

pub use cli::Invocation;

use crate::action::{Action, ActionError, ActionGraph, OptionSet, UserOption};
use crate::consts::NINJA_ACTION;
use crate::error::{Error, Result};
use crate::output::{self, LogLevel, log_out};
use crate::tools::builtin_actions;
use crate::util::hash::hash_options;
use crate::vars::{VariableError, VariableStore};

/// Name of the built-in option selecting the release profile.
pub const RELEASE_OPTION: &str = "release";

/// What a run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
  /// Printed the version.
  Version,
  /// Printed the action and option lists.
  Listed,
  /// No action was requested and none is marked `default_run`.
  NothingToRun,
  /// Ran these actions, in order.
  Ran(Vec<String>),
}

/// A build script: its declarations plus the process-wide variable store.
pub struct BuildScript {
  about: String,
  version: String,
  store: VariableStore,
  variables: Vec<(String, String)>,
  options: OptionSet,
  actions: ActionGraph,
}

impl BuildScript {
  /// Create a script with the `release` option and the built-in actions, and
  /// initialize the variable store from the current process.
  pub fn new(about: impl Into<String>) -> Result<Self> {
    Self::with_store(about, VariableStore::init()?)
  }

  /// Create a script over an already initialized store.
  pub fn with_store(about: impl Into<String>, store: VariableStore) -> Result<Self> {
    let mut script = Self {
      about: about.into(),
      version: env!("CARGO_PKG_VERSION").to_string(),
      store,
      variables: Vec::new(),
      options: OptionSet::new(),
      actions: ActionGraph::new(),
    };

    script.option(
      UserOption::new(RELEASE_OPTION, "0")
        .description("Use the release build?")
        .choice(["0", "1"]),
    )?;
    for action in builtin_actions() {
      script.action(action)?;
    }
    Ok(script)
  }

  /// The version printed by `--version`.
  pub fn set_version(&mut self, version: impl Into<String>) {
    self.version = version.into();
  }

  /// Declare a script variable.
  ///
  /// Collisions with built-in and environment variables are reported when the
  /// script runs.
  pub fn variable(&mut self, name: impl Into<String>, value: impl Into<String>) -> Result<(), VariableError> {
    let name = name.into();
    if self.variables.iter().any(|(n, _)| *n == name) {
      return Err(VariableError::Redefined(name));
    }
    self.variables.push((name, value.into()));
    Ok(())
  }

  pub fn option(&mut self, option: UserOption) -> Result<(), ActionError> {
    self.options.register(option)
  }

  pub fn action(&mut self, action: Action) -> Result<(), ActionError> {
    self.actions.register(action)
  }

  pub fn actions(&self) -> &ActionGraph {
    &self.actions
  }

  pub fn options(&self) -> &OptionSet {
    &self.options
  }

  fn name(&self) -> String {
    self.store.get("script_exe").unwrap_or("build-script").to_string()
  }

  /// Parse `args` (including the program name) and run.
  ///
  /// # Errors
  ///
  /// Any error aborts the run; actions that already ran are not undone.
  pub fn run_with<I, T>(mut self, args: I) -> Result<Outcome>
  where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
  {
    let command = cli::command(&self.name(), &self.about, &self.actions);
    let inv = cli::parse(command, &self.actions, args)?;

    output::set_log_level(if inv.verbose { LogLevel::Debug } else { LogLevel::Info });
    output::init_tracing(inv.verbose);

    if !self.actions.contains(NINJA_ACTION) {
      return Err(ActionError::MissingNinjaAction.into());
    }

    if inv.version {
      log_out(LogLevel::Message, &format!("Build script version {}", self.version));
      return Ok(Outcome::Version);
    }

    if inv.list {
      self.print_list();
      return Ok(Outcome::Listed);
    }

    let requested = if inv.tools.is_empty() {
      self.actions.defaults()
    } else {
      inv.tools.clone()
    };
    if requested.is_empty() {
      log_out(LogLevel::Warn, "! No action was run");
      return Ok(Outcome::NothingToRun);
    }

    let mut raw_options = Vec::new();
    if inv.release {
      raw_options.push(format!("{RELEASE_OPTION}=1"));
    }
    raw_options.extend(inv.options.iter().cloned());
    let options = self.options.merge(self.options.parse(&raw_options)?);

    self.store.update(std::mem::take(&mut self.variables))?;

    let hash = hash_options(options.as_map());
    debug!(option_hash = %hash, "computed option hash");
    self.store.set_option_hash(hash.0);

    let vars = self.store.snapshot();
    let ran = self
      .actions
      .run(&requested, &options, &vars, |action| inv.args_for(action))?;
    Ok(Outcome::Ran(ran))
  }

  /// Run with the process arguments, reporting failure as exit status 1.
  pub fn main(self) -> ExitCode {
    report(self.run_with(std::env::args_os()))
  }

  fn print_list(&self) {
    log_out(LogLevel::Message, "Action list: ");
    for action in self.actions.iter() {
      log_out(LogLevel::Info, &format!("- {:<12} {}", action.name, action.description));
    }
    if self.actions.is_empty() {
      log_out(LogLevel::Info, "- (no action was found)");
    }

    log_out(LogLevel::Message, "Option list: ");
    for option in self.options.iter() {
      log_out(LogLevel::Info, &format!("- {:<12} {}", option.name, option.description));
    }
    if self.options.is_empty() {
      log_out(LogLevel::Info, "- (no option was found)");
    }
  }
}

/// Create a script, let `declare` register its contents and run it with the
/// process arguments.
pub fn run(about: &str, declare: impl FnOnce(&mut BuildScript) -> Result<()>) -> ExitCode {
  let script = BuildScript::new(about).and_then(|mut script| {
    declare(&mut script)?;
    Ok(script)
  });

  match script {
    Ok(script) => script.main(),
    Err(err) => report(Err(err)),
  }
}

fn report(result: Result<Outcome>) -> ExitCode {
  match result {
    Ok(_) => ExitCode::SUCCESS,
    Err(Error::Cli(err)) => {
      let _ = err.print();
      if err.use_stderr() {
        ExitCode::from(2)
      } else {
        ExitCode::SUCCESS
      }
    }
    Err(err) => {
      log_out(LogLevel::Fatal, &format!("x {err}"));
      ExitCode::FAILURE
    }
  }
}
