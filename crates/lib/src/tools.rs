//! Built-in actions wrapping the `ninja` tool.
//!
//! Every build script gets `build`, `clean` and `compdb`. Each depends on the
//! script's own `ninja` action, so `build.ninja` is regenerated before ninja
//! reads it.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::action::Action;
use crate::consts::{COMPDB_FILE, NINJA_ACTION};
use crate::expr::normalize_path;
use crate::output::{LogLevel, log_out};
use crate::shell::{execute, execute_with_stdout, join_command, save_content, split_command};

const NINJA_PROGRAM: &str = "ninja";

/// Source extensions kept in the compilation database.
const SOURCE_EXTENSIONS: &[&str] = &["c", "h", "s", "asm", "cc", "hpp", "cpp", "ixx", "cxx"];

/// Object extensions kept in the compilation database.
const OBJECT_EXTENSIONS: &[&str] = &["o", "obj"];

/// `-fno-*` flags language servers understand.
const KEPT_FNO_FLAGS: &[&str] = &["-fno-exceptions", "-fno-rtti"];

/// The built-in actions, in registration order.
pub fn builtin_actions() -> Vec<Action> {
  vec![build(), clean(), compdb()]
}

/// Run `ninja`.
pub fn build() -> Action {
  Action::new("build", |ctx| Ok(execute(ctx.vars(), [NINJA_PROGRAM])?))
    .description("Run `ninja` command")
    .dep(NINJA_ACTION)
}

/// Run `ninja -t clean`.
pub fn clean() -> Action {
  Action::new("clean", |ctx| Ok(execute(ctx.vars(), [NINJA_PROGRAM, "-t", "clean"])?))
    .description("Run `ninja -t clean` command")
    .dep(NINJA_ACTION)
}

/// Run `ninja -t compdb` and save a simplified database to `compile_commands.json`.
pub fn compdb() -> Action {
  Action::new("compdb", |ctx| {
    let raw = execute_with_stdout(ctx.vars(), [NINJA_PROGRAM, "-t", "compdb"])?;
    let simplified = simplify_compdb(&raw)?;
    let path = save_content(ctx.vars(), COMPDB_FILE, &simplified)?;

    log_out(LogLevel::Info, &format!("Save to `{}` completed.", path.display()));
    Ok(())
  })
  .description(format!("Run `ninja -t compdb` and save it to `{COMPDB_FILE}`"))
  .dep(NINJA_ACTION)
}

#[derive(Debug, Deserialize)]
struct RawEntry {
  directory: String,
  command: String,
  file: String,
  #[serde(default)]
  output: String,
}

#[derive(Debug, Serialize)]
struct CompdbEntry {
  file: String,
  output: String,
  directory: String,
  command: String,
}

/// Reduce a `ninja -t compdb` database to compile commands for source files.
///
/// Entries are kept when the file is a C, C++ or assembly source and the
/// output is an object file. Paths are normalized and `-fno-*` flags other
/// than `-fno-exceptions` and `-fno-rtti` are dropped from the command.
pub fn simplify_compdb(json: &str) -> Result<String, serde_json::Error> {
  let entries: Vec<RawEntry> = serde_json::from_str(json)?;

  let kept: Vec<CompdbEntry> = entries
    .into_iter()
    .filter(|e| has_extension(&e.file, SOURCE_EXTENSIONS) && has_extension(&e.output, OBJECT_EXTENSIONS))
    .map(|e| CompdbEntry {
      file: normalize_path(&e.file),
      output: normalize_path(&e.output),
      directory: e.directory,
      command: filter_command(&e.command),
    })
    .collect();

  serde_json::to_string_pretty(&kept)
}

fn has_extension(path: &str, extensions: &[&str]) -> bool {
  Path::new(path)
    .extension()
    .and_then(|ext| ext.to_str())
    .is_some_and(|ext| extensions.contains(&ext))
}

fn filter_command(command: &str) -> String {
  let args: Vec<String> = split_command(command)
    .into_iter()
    .filter(|arg| !arg.starts_with("-fno-") || KEPT_FNO_FLAGS.contains(&arg.as_str()))
    .collect();
  join_command(&args)
}
