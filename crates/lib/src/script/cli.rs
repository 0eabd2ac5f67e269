//! Command-line surface of a build script.
//!
//! The fixed flags are the same for every script; each registered action adds
//! one `--<action>-<arg>` flag per declared argument under its own help group.

use std::collections::HashMap;
use std::ffi::OsString;

use clap::{Arg, ArgAction, ArgMatches, Command};

use crate::action::{Action, ActionArgs, ActionGraph, ArgKind, ArgValue};

/// A parsed command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Invocation {
  pub version: bool,
  pub list: bool,
  pub verbose: bool,
  pub release: bool,
  /// Requested actions, in command-line order.
  pub tools: Vec<String>,
  /// Raw `name` / `name=value` option strings.
  pub options: Vec<String>,
  args: HashMap<String, ActionArgs>,
}

impl Invocation {
  /// The arguments given for `action`, with defaults for those not given.
  pub fn args_for(&self, action: &Action) -> ActionArgs {
    self.args.get(&action.name).cloned().unwrap_or_default()
  }
}

pub(crate) fn command(name: &str, about: &str, actions: &ActionGraph) -> Command {
  let mut cmd = Command::new(name.to_string())
    .about(about.to_string())
    .disable_version_flag(true)
    .arg(
      Arg::new("version")
        .short('V')
        .long("version")
        .action(ArgAction::SetTrue)
        .help("Print version info and exit"),
    )
    .arg(
      Arg::new("release")
        .short('r')
        .long("release")
        .action(ArgAction::SetTrue)
        .help("Use the `release` profile (same as -D release=1)"),
    )
    .arg(
      Arg::new("list")
        .short('l')
        .long("list")
        .action(ArgAction::SetTrue)
        .help("Display all available actions and options"),
    )
    .arg(
      Arg::new("tool")
        .short('t')
        .long("tool")
        .value_name("ACTION")
        .num_args(1..)
        .action(ArgAction::Append)
        .help("Run the action"),
    )
    .arg(
      Arg::new("option")
        .short('D')
        .long("option")
        .value_name("OPTION")
        .num_args(1..)
        .action(ArgAction::Append)
        .help("Set the option, as `name` or `name=value`"),
    )
    .arg(
      Arg::new("verbose")
        .short('v')
        .long("verbose")
        .action(ArgAction::SetTrue)
        .help("Use verbose output"),
    );

  for action in actions.iter() {
    let heading = format!("{} options", action.name);

    for arg in &action.args {
      let flag = arg.flag_name(&action.name);
      let spec = Arg::new(flag.clone())
        .long(flag)
        .help(arg.description.clone())
        .help_heading(heading.clone());

      let spec = match arg.kind {
        ArgKind::Value => spec.num_args(1).action(ArgAction::Set).default_value(""),
        ArgKind::Flag => spec.action(ArgAction::SetTrue),
        ArgKind::List => spec.num_args(1..).action(ArgAction::Append),
      };
      cmd = cmd.arg(spec);
    }
  }

  cmd
}

/// Parse `args` (including the program name) against `command`.
pub(crate) fn parse<I, T>(command: Command, actions: &ActionGraph, args: I) -> Result<Invocation, clap::Error>
where
  I: IntoIterator<Item = T>,
  T: Into<OsString> + Clone,
{
  let matches = command.try_get_matches_from(args)?;

  let args = actions
    .iter()
    .filter(|action| !action.args.is_empty())
    .map(|action| (action.name.clone(), action_args(&matches, action)))
    .collect();

  Ok(Invocation {
    version: matches.get_flag("version"),
    list: matches.get_flag("list"),
    verbose: matches.get_flag("verbose"),
    release: matches.get_flag("release"),
    tools: strings(&matches, "tool"),
    options: strings(&matches, "option"),
    args,
  })
}

fn action_args(matches: &ArgMatches, action: &Action) -> ActionArgs {
  let mut args = ActionArgs::new();

  for arg in &action.args {
    let id = arg.flag_name(&action.name);
    let value = match arg.kind {
      ArgKind::Value => ArgValue::Value(matches.get_one::<String>(&id).cloned().unwrap_or_default()),
      ArgKind::Flag => ArgValue::Flag(matches.get_flag(&id)),
      ArgKind::List => ArgValue::List(strings(matches, &id)),
    };
    args.insert(arg.name.clone(), value);
  }

  args
}

fn strings(matches: &ArgMatches, id: &str) -> Vec<String> {
  matches
    .get_many::<String>(id)
    .map(|values| values.cloned().collect())
    .unwrap_or_default()
}
