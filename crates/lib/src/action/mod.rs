//! Actions, options and the dependency graph that orders them.
//!
//! Actions are registered once, by unique name. A run requests a list of
//! names (or falls back to the actions marked `default_run`); the graph expands
//! each requested action's dependencies depth first and runs every action at
//! most once. The complete run order is resolved before the first action runs,
//! so unknown names and cycles abort the run without side effects.

mod types;

use std::collections::{BTreeMap, HashMap, HashSet};

use tracing::debug;

pub use types::{
  Action, ActionArgs, ActionArgument, ActionContext, ActionError, ActionFn, ArgKind, ArgValue, NO_DESCRIPTION, Options,
  UserOption,
};

use crate::consts::OPTION_ENABLED;
use crate::output::{LogLevel, log_out};
use crate::vars::Variables;

/// Registered actions, in declaration order.
#[derive(Debug, Default)]
pub struct ActionGraph {
  actions: Vec<Action>,
  index: HashMap<String, usize>,
  /// Argument flag -> owning action.
  flags: HashMap<String, String>,
}

impl ActionGraph {
  pub fn new() -> Self {
    Self::default()
  }

  /// Register an action.
  ///
  /// # Errors
  ///
  /// Returns `DuplicateAction` if an action with the same name exists and
  /// `DuplicateArgument` if one of its arguments maps to a flag that is
  /// already taken, by another action or by the action itself.
  pub fn register(&mut self, action: Action) -> Result<(), ActionError> {
    if self.index.contains_key(&action.name) {
      return Err(ActionError::DuplicateAction(action.name));
    }

    let mut flags = Vec::with_capacity(action.args.len());
    for arg in &action.args {
      let flag = arg.flag_name(&action.name);
      let owner = self
        .flags
        .get(&flag)
        .or_else(|| flags.contains(&flag).then_some(&action.name));
      if let Some(owner) = owner {
        return Err(ActionError::DuplicateArgument {
          action: action.name.clone(),
          arg: arg.name.clone(),
          flag,
          owner: owner.clone(),
        });
      }
      flags.push(flag);
    }

    self
      .flags
      .extend(flags.into_iter().map(|flag| (flag, action.name.clone())));
    debug!(action = %action.name, deps = ?action.deps, "registered action");
    self.index.insert(action.name.clone(), self.actions.len());
    self.actions.push(action);
    Ok(())
  }

  pub fn get(&self, name: &str) -> Option<&Action> {
    self.index.get(name).map(|&i| &self.actions[i])
  }

  pub fn contains(&self, name: &str) -> bool {
    self.index.contains_key(name)
  }

  pub fn iter(&self) -> impl Iterator<Item = &Action> {
    self.actions.iter()
  }

  pub fn len(&self) -> usize {
    self.actions.len()
  }

  pub fn is_empty(&self) -> bool {
    self.actions.is_empty()
  }

  /// Names of the actions marked `default_run`, in declaration order.
  pub fn defaults(&self) -> Vec<String> {
    self
      .actions
      .iter()
      .filter(|a| a.default_run)
      .map(|a| a.name.clone())
      .collect()
  }

  /// Compute the order in which `requested` and their dependencies run.
  ///
  /// Dependencies come before their dependents and every action appears once,
  /// even when several requested actions share it.
  ///
  /// # Errors
  ///
  /// - `ActionNotFound` for an unknown requested action or dependency
  /// - `CycleDetected` when an action depends on itself, directly or not
  pub fn resolve<S: AsRef<str>>(&self, requested: &[S]) -> Result<Vec<&Action>, ActionError> {
    let mut order = Vec::new();
    let mut done = HashSet::new();
    let mut chain = Vec::new();

    for name in requested {
      self.visit(name.as_ref(), &mut chain, &mut done, &mut order)?;
    }

    Ok(order.into_iter().map(|i| &self.actions[i]).collect())
  }

  fn visit(
    &self,
    name: &str,
    chain: &mut Vec<String>,
    done: &mut HashSet<usize>,
    order: &mut Vec<usize>,
  ) -> Result<(), ActionError> {
    let Some(&index) = self.index.get(name) else {
      return Err(ActionError::ActionNotFound {
        name: name.to_string(),
        chain: chain.clone(),
      });
    };

    if done.contains(&index) {
      return Ok(());
    }

    if let Some(start) = chain.iter().position(|n| n == name) {
      let mut path = chain[start..].to_vec();
      path.push(name.to_string());
      return Err(ActionError::CycleDetected { path });
    }

    chain.push(name.to_string());
    for dep in &self.actions[index].deps {
      self.visit(dep, chain, done, order)?;
    }
    chain.pop();

    done.insert(index);
    order.push(index);
    Ok(())
  }

  /// Resolve `requested` and run each action once, in order.
  ///
  /// `args_for` builds each action's argument table. Returns the names of the
  /// actions that ran.
  pub fn run<S, F>(&self, requested: &[S], options: &Options, vars: &Variables, mut args_for: F) -> crate::Result<Vec<String>>
  where
    S: AsRef<str>,
    F: FnMut(&Action) -> ActionArgs,
  {
    let order = self.resolve(requested)?;
    debug!(order = ?order.iter().map(|a| a.name.as_str()).collect::<Vec<_>>(), "resolved run order");

    let mut ran = Vec::with_capacity(order.len());
    for action in order {
      let args = args_for(action);
      let ctx = ActionContext {
        options,
        args: &args,
        vars,
      };

      log_out(LogLevel::Message, &format!("> run {}", action.name));
      action.run(&ctx)?;
      ran.push(action.name.clone());
    }

    Ok(ran)
  }
}

/// Declared options, in declaration order.
#[derive(Debug, Default)]
pub struct OptionSet {
  options: Vec<UserOption>,
}

impl OptionSet {
  pub fn new() -> Self {
    Self::default()
  }

  /// # Errors
  ///
  /// Returns `DuplicateOption` if an option with the same name exists.
  pub fn register(&mut self, option: UserOption) -> Result<(), ActionError> {
    if self.get(&option.name).is_some() {
      return Err(ActionError::DuplicateOption(option.name));
    }
    self.options.push(option);
    Ok(())
  }

  pub fn get(&self, name: &str) -> Option<&UserOption> {
    self.options.iter().find(|o| o.name == name)
  }

  pub fn iter(&self) -> impl Iterator<Item = &UserOption> {
    self.options.iter()
  }

  pub fn len(&self) -> usize {
    self.options.len()
  }

  pub fn is_empty(&self) -> bool {
    self.options.is_empty()
  }

  /// Parse raw `name` / `name=value` strings from the command line.
  ///
  /// A bare name sets the option to `1`. Later strings override earlier ones.
  ///
  /// # Errors
  ///
  /// - `MalformedOption` if a string contains more than one `=`
  /// - `UnknownOption` if the name was not declared
  /// - `InvalidOptionValue` if the option's validator rejects the value
  pub fn parse<S: AsRef<str>>(&self, raw: &[S]) -> Result<BTreeMap<String, String>, ActionError> {
    let mut parsed = BTreeMap::new();

    for item in raw {
      let item = item.as_ref();
      let parts: Vec<&str> = item.split('=').collect();
      let (name, value) = match parts.as_slice() {
        [name] => (*name, OPTION_ENABLED),
        [name, value] => (*name, *value),
        _ => return Err(ActionError::MalformedOption(item.to_string())),
      };

      let option = self
        .get(name)
        .ok_or_else(|| ActionError::UnknownOption(name.to_string()))?;
      if !option.validate(value) {
        return Err(ActionError::InvalidOptionValue {
          name: name.to_string(),
          value: value.to_string(),
        });
      }

      parsed.insert(name.to_string(), value.to_string());
    }

    Ok(parsed)
  }

  /// Merge parsed values over the declared defaults.
  pub fn merge(&self, parsed: BTreeMap<String, String>) -> Options {
    let mut table: BTreeMap<String, String> = self
      .options
      .iter()
      .map(|o| (o.name.clone(), o.default.clone()))
      .collect();
    table.extend(parsed);
    Options::from(table)
  }
}
