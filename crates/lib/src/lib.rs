//! ninjagen-lib: Core engine for ninjagen build scripts
//!
//! A build script is an ordinary Rust binary that registers variables,
//! options and actions on a [`BuildScript`](script::BuildScript) and hands
//! control to [`BuildScript::main`](script::BuildScript::main). The crate provides:
//! - `expr`: bounded `$name` expression evaluation against variable snapshots
//! - `vars`: the variable store (built-ins, environment, script variables)
//! - `query`: typed, lazy file pipelines and the stages that emit ninja rules
//! - `ninja`: the `build.ninja` statement emitter
//! - `action`: the action dependency graph and option handling
//! - `script`: the runner and its command-line surface

pub mod action;
pub mod consts;
pub mod error;
pub mod expr;
pub mod ninja;
pub mod output;
pub mod query;
pub mod script;
pub mod shell;
pub mod tools;
pub mod util;
pub mod vars;

pub use error::{Error, Result};
