use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use thiserror::Error;

use crate::consts::OPTION_ENABLED;
use crate::vars::Variables;

/// Description used when a descriptor was declared without one.
pub const NO_DESCRIPTION: &str = "No description";

/// Errors raised while registering, resolving or configuring actions.
#[derive(Debug, Error)]
pub enum ActionError {
  #[error("action `{0}` was already registered")]
  DuplicateAction(String),

  #[error("option `{0}` was already registered")]
  DuplicateOption(String),

  /// Two declared arguments map to the same command-line flag.
  #[error("argument `{arg}` of action `{action}` conflicts with flag `--{flag}`, already used by action `{owner}`")]
  DuplicateArgument {
    action: String,
    arg: String,
    flag: String,
    owner: String,
  },

  /// `chain` is the dependency path that reached the missing name, starting
  /// at the requested action. It is empty when the name was requested directly.
  #[error("action `{name}` was not found{}", format_chain(.chain))]
  ActionNotFound { name: String, chain: Vec<String> },

  /// `path` starts and ends with the same action.
  #[error("cycle reference: {}", .path.join(" -> "))]
  CycleDetected { path: Vec<String> },

  #[error("undefined option `{0}`")]
  UnknownOption(String),

  #[error("{name} = `{value}` is invalid")]
  InvalidOptionValue { name: String, value: String },

  #[error("cannot parse option `{0}`")]
  MalformedOption(String),

  #[error("missing `ninja` action")]
  MissingNinjaAction,
}

fn format_chain(chain: &[String]) -> String {
  if chain.is_empty() {
    String::new()
  } else {
    format!(", deps: {}", chain.join(" -> "))
  }
}

// ============================================================================
// Arguments
// ============================================================================

/// How a per-action argument is given on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgKind {
  /// `--<action>-<arg> VALUE`
  Value,
  /// `--<action>-<arg>`
  Flag,
  /// `--<action>-<arg> A B ...`, repeatable
  List,
}

/// An argument an action accepts from the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionArgument {
  pub name: String,
  pub kind: ArgKind,
  pub description: String,
}

impl ActionArgument {
  pub fn new(name: impl Into<String>, kind: ArgKind) -> Self {
    Self {
      name: name.into(),
      kind,
      description: NO_DESCRIPTION.to_string(),
    }
  }

  pub fn value(name: impl Into<String>) -> Self {
    Self::new(name, ArgKind::Value)
  }

  pub fn flag(name: impl Into<String>) -> Self {
    Self::new(name, ArgKind::Flag)
  }

  pub fn list(name: impl Into<String>) -> Self {
    Self::new(name, ArgKind::List)
  }

  /// Parse the shorthand form: `?name` is a flag, `+name` a list and a bare
  /// name a value.
  pub fn parse(spec: &str) -> Self {
    if let Some(name) = spec.strip_prefix('?') {
      Self::flag(name)
    } else if let Some(name) = spec.strip_prefix('+') {
      Self::list(name)
    } else {
      Self::value(spec)
    }
  }

  pub fn describe(mut self, description: impl Into<String>) -> Self {
    self.description = description.into();
    self
  }

  /// Command-line flag for this argument of `action`: `<action>-<arg>` with
  /// `_` written as `-`.
  pub fn flag_name(&self, action: &str) -> String {
    format!("{action}-{}", self.name).replace('_', "-")
  }
}

impl From<&str> for ActionArgument {
  fn from(spec: &str) -> Self {
    Self::parse(spec)
  }
}

/// The value given for one action argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgValue {
  Value(String),
  Flag(bool),
  List(Vec<String>),
}

/// The arguments passed to one action, keyed by argument name.
///
/// Only the arguments the action declared are present.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionArgs {
  values: BTreeMap<String, ArgValue>,
}

impl ActionArgs {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn insert(&mut self, name: impl Into<String>, value: ArgValue) {
    self.values.insert(name.into(), value);
  }

  pub fn get(&self, name: &str) -> Option<&ArgValue> {
    self.values.get(name)
  }

  /// The string given for a value argument, or `""`.
  pub fn value(&self, name: &str) -> &str {
    match self.values.get(name) {
      Some(ArgValue::Value(value)) => value,
      _ => "",
    }
  }

  /// Whether a flag argument was given.
  pub fn flag(&self, name: &str) -> bool {
    matches!(self.values.get(name), Some(ArgValue::Flag(true)))
  }

  /// The items given for a list argument.
  pub fn list(&self, name: &str) -> &[String] {
    match self.values.get(name) {
      Some(ArgValue::List(items)) => items,
      _ => &[],
    }
  }

  pub fn len(&self) -> usize {
    self.values.len()
  }

  pub fn is_empty(&self) -> bool {
    self.values.is_empty()
  }
}

// ============================================================================
// Options
// ============================================================================

type Validator = Rc<dyn Fn(&str) -> bool>;

/// A run-wide configuration value set with `-D name=value`.
#[derive(Clone)]
pub struct UserOption {
  pub name: String,
  pub default: String,
  pub description: String,
  validator: Validator,
}

impl UserOption {
  /// An option accepting any value.
  pub fn new(name: impl Into<String>, default: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      default: default.into(),
      description: NO_DESCRIPTION.to_string(),
      validator: Rc::new(|_| true),
    }
  }

  pub fn description(mut self, description: impl Into<String>) -> Self {
    self.description = description.into();
    self
  }

  /// Accept only values for which `validator` returns true.
  pub fn validator(mut self, validator: impl Fn(&str) -> bool + 'static) -> Self {
    self.validator = Rc::new(validator);
    self
  }

  /// Accept only the listed values.
  pub fn choice<I, S>(self, choices: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    let choices: Vec<String> = choices.into_iter().map(Into::into).collect();
    self.validator(move |value| choices.iter().any(|c| c == value))
  }

  pub fn validate(&self, value: &str) -> bool {
    (self.validator)(value)
  }
}

impl fmt::Debug for UserOption {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("UserOption")
      .field("name", &self.name)
      .field("default", &self.default)
      .field("description", &self.description)
      .finish_non_exhaustive()
  }
}

/// The merged option table of a run: declared defaults overlaid with values
/// from the command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Options {
  values: BTreeMap<String, String>,
}

impl Options {
  pub fn get(&self, name: &str) -> Option<&str> {
    self.values.get(name).map(String::as_str)
  }

  /// Whether the option is set to the enabled value `1`.
  pub fn is_enabled(&self, name: &str) -> bool {
    self.get(name) == Some(OPTION_ENABLED)
  }

  pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
    self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
  }

  pub fn as_map(&self) -> &BTreeMap<String, String> {
    &self.values
  }
}

impl From<BTreeMap<String, String>> for Options {
  fn from(values: BTreeMap<String, String>) -> Self {
    Self { values }
  }
}

// ============================================================================
// Actions
// ============================================================================

/// What an action callback receives.
pub struct ActionContext<'a> {
  pub options: &'a Options,
  pub args: &'a ActionArgs,
  pub vars: &'a Variables,
}

impl ActionContext<'_> {
  pub fn options(&self) -> &Options {
    self.options
  }

  pub fn args(&self) -> &ActionArgs {
    self.args
  }

  pub fn vars(&self) -> &Variables {
    self.vars
  }
}

pub type ActionFn = Box<dyn Fn(&ActionContext<'_>) -> crate::Result<()>>;

/// A named unit of build script work.
pub struct Action {
  pub name: String,
  pub description: String,
  pub deps: Vec<String>,
  /// Run when no action is requested.
  pub default_run: bool,
  pub args: Vec<ActionArgument>,
  callback: ActionFn,
}

impl Action {
  pub fn new(name: impl Into<String>, callback: impl Fn(&ActionContext<'_>) -> crate::Result<()> + 'static) -> Self {
    Self {
      name: name.into(),
      description: NO_DESCRIPTION.to_string(),
      deps: Vec::new(),
      default_run: false,
      args: Vec::new(),
      callback: Box::new(callback),
    }
  }

  pub fn description(mut self, description: impl Into<String>) -> Self {
    self.description = description.into();
    self
  }

  pub fn dep(mut self, dep: impl Into<String>) -> Self {
    self.deps.push(dep.into());
    self
  }

  pub fn deps<I, S>(mut self, deps: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.deps.extend(deps.into_iter().map(Into::into));
    self
  }

  pub fn default_run(mut self, default_run: bool) -> Self {
    self.default_run = default_run;
    self
  }

  /// Declare a command-line argument, e.g. `.arg("+exclude")` or
  /// `.arg(ActionArgument::flag("env").describe("..."))`.
  pub fn arg(mut self, arg: impl Into<ActionArgument>) -> Self {
    self.args.push(arg.into());
    self
  }

  pub fn run(&self, ctx: &ActionContext<'_>) -> crate::Result<()> {
    (self.callback)(ctx)
  }
}

impl fmt::Debug for Action {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Action")
      .field("name", &self.name)
      .field("deps", &self.deps)
      .field("default_run", &self.default_run)
      .field("args", &self.args)
      .finish_non_exhaustive()
  }
}
