//! External command execution.
//!
//! Commands are argument lists, not shell strings: every argument is evaluated
//! against a variable snapshot and passed to the program verbatim, so no shell
//! quoting rules apply. A non-zero exit status is an error.

use std::path::PathBuf;
use std::process::{Command, Stdio};

use thiserror::Error;
use tracing::debug;

use crate::expr::ExprError;
use crate::output::{LogLevel, log_out};
use crate::vars::Variables;

#[derive(Debug, Error)]
pub enum ShellError {
  #[error("command `{cmd}` exited with {}", exit_status(.code))]
  Failed { cmd: String, code: Option<i32> },

  #[error("failed to spawn `{cmd}`: {source}")]
  Spawn {
    cmd: String,
    #[source]
    source: std::io::Error,
  },

  #[error("empty command")]
  Empty,

  #[error(transparent)]
  Io(#[from] std::io::Error),

  #[error(transparent)]
  Expr(#[from] ExprError),
}

/// Run a command with inherited standard streams.
///
/// # Errors
///
/// Returns `Failed` if the command exits with a non-zero status.
pub fn execute<I, S>(vars: &Variables, args: I) -> Result<(), ShellError>
where
  I: IntoIterator<Item = S>,
  S: AsRef<str>,
{
  let (mut command, cmd) = prepare(vars, args)?;

  let status = command.status().map_err(|source| ShellError::Spawn {
    cmd: cmd.clone(),
    source,
  })?;

  if !status.success() {
    return Err(ShellError::Failed {
      cmd,
      code: status.code(),
    });
  }
  Ok(())
}

/// Run a command and return its standard output with trailing whitespace removed.
pub fn execute_with_stdout<I, S>(vars: &Variables, args: I) -> Result<String, ShellError>
where
  I: IntoIterator<Item = S>,
  S: AsRef<str>,
{
  let (mut command, cmd) = prepare(vars, args)?;

  let output = command
    .stdin(Stdio::null())
    .output()
    .map_err(|source| ShellError::Spawn {
      cmd: cmd.clone(),
      source,
    })?;

  if !output.status.success() {
    let stderr = String::from_utf8_lossy(&output.stderr);
    if !stderr.is_empty() {
      debug!(stderr = %stderr, "command stderr");
    }
    return Err(ShellError::Failed {
      cmd,
      code: output.status.code(),
    });
  }

  Ok(String::from_utf8_lossy(&output.stdout).trim_end().to_string())
}

/// Write `content` to the path-evaluated `path` and return the written path.
pub fn save_content(vars: &Variables, path: &str, content: &str) -> Result<PathBuf, ShellError> {
  let path = PathBuf::from(vars.eval_path(path)?);
  std::fs::write(&path, content)?;
  debug!(path = %path.display(), bytes = content.len(), "saved content");
  Ok(path)
}

/// Join arguments into one command line, quoting arguments that contain spaces.
pub fn join_command<S: AsRef<str>>(args: &[S]) -> String {
  args
    .iter()
    .map(|arg| {
      let arg = arg.as_ref();
      if arg.contains(' ') {
        format!("\"{arg}\"")
      } else {
        arg.to_string()
      }
    })
    .collect::<Vec<_>>()
    .join(" ")
}

/// Split a command line on whitespace, keeping double-quoted runs together.
///
/// The quotes themselves are removed: `cc "-IC:/Program Files" -c` splits into
/// `cc`, `-IC:/Program Files`, `-c`.
pub fn split_command(line: &str) -> Vec<String> {
  let mut args = Vec::new();
  let mut current = String::new();
  let mut in_arg = false;
  let mut quoted = false;

  for c in line.chars() {
    match c {
      '"' => {
        quoted = !quoted;
        in_arg = true;
      }
      c if c.is_whitespace() && !quoted => {
        if in_arg {
          args.push(std::mem::take(&mut current));
          in_arg = false;
        }
      }
      c => {
        current.push(c);
        in_arg = true;
      }
    }
  }

  if in_arg {
    args.push(current);
  }
  args
}

fn exit_status(code: &Option<i32>) -> String {
  match code {
    Some(code) => format!("code {code}"),
    None => "a signal".to_string(),
  }
}

fn prepare<I, S>(vars: &Variables, args: I) -> Result<(Command, String), ShellError>
where
  I: IntoIterator<Item = S>,
  S: AsRef<str>,
{
  let args = args
    .into_iter()
    .map(|arg| vars.eval(arg.as_ref()))
    .collect::<Result<Vec<_>, _>>()?;
  let (program, rest) = args.split_first().ok_or(ShellError::Empty)?;

  let cmd = join_command(&args);
  log_out(LogLevel::Debug, &format!("> run `{cmd}`"));

  let mut command = Command::new(program);
  command.args(rest);
  Ok((command, cmd))
}
