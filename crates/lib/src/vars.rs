//! Variable store and immutable variable snapshots.
//!
//! The store is created once per run. It starts with the built-in variables and
//! one `env_<name>` entry per environment variable, then receives the script's
//! declared variables and finally the computed `option_hash`. Evaluation never
//! reads the store directly: callers take a [`Variables`] snapshot and evaluate
//! against that.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use chrono::{DateTime, Local};
use thiserror::Error;
use tracing::debug;

use crate::consts::{ENV_VAR_PREFIX, REVISION_LEN, UNKNOWN_VALUE};
use crate::expr::{self, ExprError, Resolver};

/// Name of the built-in variable holding the option table hash.
pub const OPTION_HASH_VAR: &str = "option_hash";

/// Errors raised while populating the variable store.
#[derive(Debug, Error)]
pub enum VariableError {
  /// A script variable reuses the name of an existing variable.
  #[error("variable `{0}` was redefined")]
  Redefined(String),

  /// Two environment variables (or an environment variable and a built-in)
  /// map to the same key.
  #[error("environment variable `{0}` was re-defined")]
  DuplicateEnvironment(String),

  #[error("failed to determine the invocation root: {0}")]
  Root(#[source] std::io::Error),
}

/// Inputs for the built-in variables.
///
/// [`BuiltinSources::detect`] reads them from the running process; tests build
/// them by hand.
#[derive(Debug, Clone)]
pub struct BuiltinSources {
  /// Absolute directory the script was invoked from.
  pub root: PathBuf,
  /// Time of the run.
  pub now: DateTime<Local>,
  /// Short id of the checked-out revision, if any.
  pub revision: Option<String>,
  /// File name of the running executable.
  pub script_exe: String,
  /// The program name the script was invoked as.
  pub script_name: String,
}

impl BuiltinSources {
  /// Gather the built-in inputs from the current process.
  pub fn detect() -> Result<Self, VariableError> {
    let cwd = std::env::current_dir().map_err(VariableError::Root)?;
    let root = dunce::canonicalize(&cwd).map_err(VariableError::Root)?;
    let revision = detect_revision(&root);

    let script_exe = std::env::current_exe()
      .ok()
      .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
      .unwrap_or_else(|| UNKNOWN_VALUE.to_string());
    let script_name = std::env::args_os()
      .next()
      .map(|arg| arg.to_string_lossy().into_owned())
      .unwrap_or_else(|| script_exe.clone());

    Ok(Self {
      root,
      now: Local::now(),
      revision,
      script_exe,
      script_name,
    })
  }
}

/// Read the short id of `HEAD` from the git repository containing `root`.
///
/// Returns `None` when there is no repository or `HEAD` is unborn; the
/// `revision` variable then holds [`UNKNOWN_VALUE`].
fn detect_revision(root: &Path) -> Option<String> {
  let repo = match gix::discover(root) {
    Ok(repo) => repo,
    Err(err) => {
      debug!(error = %err, "no git repository, revision is unknown");
      return None;
    }
  };

  match repo.head_id() {
    Ok(id) => Some(id.to_hex_with_len(REVISION_LEN).to_string()),
    Err(err) => {
      debug!(error = %err, "cannot read HEAD, revision is unknown");
      None
    }
  }
}

/// The mutable, process-wide variable table.
#[derive(Debug, Clone, Default)]
pub struct VariableStore {
  values: BTreeMap<String, String>,
}

impl VariableStore {
  /// Create the store for the current process: built-ins plus environment.
  pub fn init() -> Result<Self, VariableError> {
    let sources = BuiltinSources::detect()?;
    let env = std::env::vars_os().map(|(k, v)| (k.to_string_lossy().into_owned(), v.to_string_lossy().into_owned()));
    Self::from_sources(&sources, env)
  }

  /// Create a store from explicit built-in inputs and environment pairs.
  ///
  /// # Errors
  ///
  /// Returns `DuplicateEnvironment` if two environment names lower-case to the
  /// same key or an environment key shadows a built-in.
  pub fn from_sources<I>(sources: &BuiltinSources, env: I) -> Result<Self, VariableError>
  where
    I: IntoIterator<Item = (String, String)>,
  {
    let mut values = builtin_variables(sources);

    for (name, value) in env {
      let key = format!("{ENV_VAR_PREFIX}{name}").to_lowercase();
      if values.contains_key(&key) {
        return Err(VariableError::DuplicateEnvironment(key));
      }
      values.insert(key, value);
    }

    Ok(Self { values })
  }

  /// Merge script-declared variables.
  ///
  /// Nothing is merged if any name already exists or appears twice in `values`.
  pub fn update<I, K, V>(&mut self, values: I) -> Result<(), VariableError>
  where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
  {
    let pending: Vec<(String, String)> = values.into_iter().map(|(k, v)| (k.into(), v.into())).collect();

    let mut seen: HashSet<&str> = HashSet::new();
    for (name, _) in &pending {
      if self.values.contains_key(name) || !seen.insert(name) {
        return Err(VariableError::Redefined(name.clone()));
      }
    }

    self.values.extend(pending);
    Ok(())
  }

  /// Replace the `option_hash` built-in with the run's computed hash.
  pub fn set_option_hash(&mut self, hash: impl Into<String>) {
    self.values.insert(OPTION_HASH_VAR.to_string(), hash.into());
  }

  pub fn get(&self, name: &str) -> Option<&str> {
    self.values.get(name).map(String::as_str)
  }

  /// Take an immutable copy of the current table.
  pub fn snapshot(&self) -> Variables {
    Variables {
      values: Rc::new(self.values.clone()),
    }
  }
}

fn builtin_variables(sources: &BuiltinSources) -> BTreeMap<String, String> {
  let revision = sources.revision.as_deref().unwrap_or(UNKNOWN_VALUE);

  [
    ("root", sources.root.to_string_lossy().into_owned()),
    ("target", "target".to_string()),
    ("build", "target/build".to_string()),
    ("package", "target/pkgs".to_string()),
    (OPTION_HASH_VAR, UNKNOWN_VALUE.to_string()),
    ("date", sources.now.format("%Y-%m-%d").to_string()),
    ("time", sources.now.format("%H:%M:%S").to_string()),
    ("timestamp", sources.now.timestamp().to_string()),
    ("revision", revision.to_string()),
    ("script_exe", sources.script_exe.clone()),
    ("script_name", sources.script_name.clone()),
  ]
  .into_iter()
  .map(|(k, v)| (k.to_string(), v))
  .collect()
}

/// An immutable snapshot of the variable table.
///
/// Cloning is cheap; every clone shares the same table.
#[derive(Debug, Clone, Default)]
pub struct Variables {
  values: Rc<BTreeMap<String, String>>,
}

impl Variables {
  /// Build a snapshot directly from pairs.
  pub fn from_pairs<I, K, V>(pairs: I) -> Self
  where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
  {
    Self {
      values: Rc::new(pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect()),
    }
  }

  pub fn get(&self, name: &str) -> Option<&str> {
    self.values.get(name).map(String::as_str)
  }

  pub fn contains(&self, name: &str) -> bool {
    self.values.contains_key(name)
  }

  pub fn len(&self) -> usize {
    self.values.len()
  }

  pub fn is_empty(&self) -> bool {
    self.values.is_empty()
  }

  /// Iterate over `(name, raw value)` pairs in name order.
  pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
    self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
  }

  /// A new snapshot with call-site values layered over this one.
  pub fn with_overrides<I, K, V>(&self, overrides: I) -> Variables
  where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
  {
    let mut values = (*self.values).clone();
    values.extend(overrides.into_iter().map(|(k, v)| (k.into(), v.into())));
    Variables { values: Rc::new(values) }
  }

  /// Evaluate an expression against this snapshot.
  pub fn eval(&self, expr: &str) -> Result<String, ExprError> {
    expr::eval_expr(expr, self)
  }

  /// Evaluate an expression and normalize the result as a path.
  pub fn eval_path(&self, expr: &str) -> Result<String, ExprError> {
    expr::eval_path(expr, self)
  }
}

impl Resolver for Variables {
  fn resolve(&self, name: &str) -> Option<&str> {
    self.get(name)
  }
}
