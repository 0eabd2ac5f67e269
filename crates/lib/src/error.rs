//! Crate-level error type.
//!
//! Each module reports failures through its own error enum; this type unifies
//! them so action callbacks can use `?` over every layer.

use thiserror::Error;

use crate::action::ActionError;
use crate::expr::ExprError;
use crate::ninja::NinjaError;
use crate::query::QueryError;
use crate::shell::ShellError;
use crate::vars::VariableError;

#[derive(Debug, Error)]
pub enum Error {
  #[error("expression error: {0}")]
  Expr(#[from] ExprError),

  #[error("query failed: {0}")]
  Query(#[from] QueryError),

  #[error("build script error: {0}")]
  Action(#[from] ActionError),

  #[error("variable error: {0}")]
  Variable(#[from] VariableError),

  #[error("run command failed: {0}")]
  Shell(#[from] ShellError),

  #[error("ninja file error: {0}")]
  Ninja(#[from] NinjaError),

  /// Command-line parse failure, including `--help`.
  #[error("{0}")]
  Cli(#[from] clap::Error),

  #[error("io error: {0}")]
  Io(#[from] std::io::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  /// Failure reported by script code.
  #[error("{0}")]
  Message(String),
}

impl Error {
  /// Build a script-defined error from any message.
  pub fn msg(message: impl Into<String>) -> Self {
    Error::Message(message.into())
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
