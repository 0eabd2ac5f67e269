//! Expression evaluation against variable snapshots.
//!
//! Expressions are plain strings that reference variables by name. Evaluation
//! repeats single substitution passes until no reference is left, so a variable
//! may itself refer to other variables.
//!
//! # Syntax
//!
//! - `$name` / `${name}` - the value of variable `name`
//!   (`name` matches `[A-Za-z_][A-Za-z0-9_]*`)
//! - `$$` - a literal `$`, kept through every pass
//!
//! Ninja's own variables therefore have to be escaped: `$$in` evaluates to `$in`.
//!
//! # Example
//!
//! ```
//! use std::collections::BTreeMap;
//! use ninjagen_lib::expr::eval_expr;
//!
//! let mut vars = BTreeMap::new();
//! vars.insert("target".to_string(), "target".to_string());
//! vars.insert("build".to_string(), "$target/build".to_string());
//!
//! assert_eq!(eval_expr("${build}/obj", &vars).unwrap(), "target/build/obj");
//! assert_eq!(eval_expr("cc $$in -o $$out", &vars).unwrap(), "cc $in -o $out");
//! ```

use std::collections::{BTreeMap, HashMap};
use std::path::{Component, Path, PathBuf};

use thiserror::Error;

use crate::consts::MAX_EVAL_STEPS;

/// Stand-in for an escaped `$$` while substitution passes run.
const ESCAPED_DOLLAR: char = '\u{E000}';

/// Errors that can occur while evaluating an expression.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExprError {
  #[error("variable `{name}` was not found, it was used in `{expr}`")]
  UndefinedVariable { name: String, expr: String },

  #[error("cannot eval expression `{expr}`: still unresolved after {MAX_EVAL_STEPS} passes")]
  RecursionLimitExceeded { expr: String },

  #[error("invalid placeholder at position {position} in `{expr}`")]
  InvalidPlaceholder { position: usize, expr: String },
}

/// Lookup of variable values by name.
pub trait Resolver {
  /// Return the raw (unevaluated) value of `name`, if defined.
  fn resolve(&self, name: &str) -> Option<&str>;
}

impl Resolver for BTreeMap<String, String> {
  fn resolve(&self, name: &str) -> Option<&str> {
    self.get(name).map(String::as_str)
  }
}

impl Resolver for HashMap<String, String> {
  fn resolve(&self, name: &str) -> Option<&str> {
    self.get(name).map(String::as_str)
  }
}

/// Evaluate `expr`, substituting every variable reference.
///
/// # Errors
///
/// - `UndefinedVariable` if a referenced name is not defined
/// - `RecursionLimitExceeded` if references remain after [`MAX_EVAL_STEPS`] passes
/// - `InvalidPlaceholder` if a `$` is not followed by a name, `{name}` or `$`
pub fn eval_expr(expr: &str, resolver: &impl Resolver) -> Result<String, ExprError> {
  let mut text = expr.replace("$$", &ESCAPED_DOLLAR.to_string());
  let mut steps = 0;

  while text.contains('$') {
    if steps == MAX_EVAL_STEPS {
      return Err(ExprError::RecursionLimitExceeded { expr: expr.to_string() });
    }
    text = substitute_once(&text, expr, resolver)?;
    steps += 1;
  }

  Ok(text.replace(ESCAPED_DOLLAR, "$"))
}

/// Evaluate `expr` and normalize the result as a path.
pub fn eval_path(expr: &str, resolver: &impl Resolver) -> Result<String, ExprError> {
  let value = eval_expr(expr, resolver)?;
  Ok(normalize_path(&value))
}

/// Lexically normalize a path: drop `.` segments, fold `name/..` pairs and
/// use the platform separator. Nothing is resolved against the filesystem.
pub fn normalize_path(path: &str) -> String {
  let mut parts: Vec<Component<'_>> = Vec::new();

  for component in Path::new(path).components() {
    match component {
      Component::CurDir => {}
      Component::ParentDir => match parts.last() {
        Some(Component::Normal(_)) => {
          parts.pop();
        }
        // `/..` is `/`
        Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
        _ => parts.push(component),
      },
      other => parts.push(other),
    }
  }

  if parts.is_empty() {
    return ".".to_string();
  }

  let normalized: PathBuf = parts.iter().collect();
  normalized.to_string_lossy().into_owned()
}

/// Run one substitution pass over `text`.
///
/// `expr` is the caller's original expression, used for error reporting.
fn substitute_once(text: &str, expr: &str, resolver: &impl Resolver) -> Result<String, ExprError> {
  let mut result = String::with_capacity(text.len());
  let mut chars = text.char_indices().peekable();

  let invalid = |position: usize| ExprError::InvalidPlaceholder {
    position,
    expr: expr.to_string(),
  };

  while let Some((pos, ch)) = chars.next() {
    if ch != '$' {
      result.push(ch);
      continue;
    }

    match chars.peek() {
      Some((_, '$')) => {
        // "$$" produced by a substituted value
        chars.next();
        result.push('$');
      }
      Some((_, '{')) => {
        chars.next();

        let mut name = String::new();
        let mut found_close = false;
        for (_, c) in chars.by_ref() {
          if c == '}' {
            found_close = true;
            break;
          }
          name.push(c);
        }

        if !found_close || !is_identifier(&name) {
          return Err(invalid(pos));
        }
        result.push_str(lookup(&name, expr, resolver)?);
      }
      Some(&(_, c)) if is_identifier_start(c) => {
        let mut name = String::new();
        while let Some(&(_, c)) = chars.peek() {
          if !is_identifier_char(c) {
            break;
          }
          name.push(c);
          chars.next();
        }
        result.push_str(lookup(&name, expr, resolver)?);
      }
      _ => return Err(invalid(pos)),
    }
  }

  Ok(result)
}

fn lookup<'a>(name: &str, expr: &str, resolver: &'a impl Resolver) -> Result<&'a str, ExprError> {
  resolver.resolve(name).ok_or_else(|| ExprError::UndefinedVariable {
    name: name.to_string(),
    expr: expr.to_string(),
  })
}

fn is_identifier_start(c: char) -> bool {
  c.is_ascii_alphabetic() || c == '_'
}

fn is_identifier_char(c: char) -> bool {
  c.is_ascii_alphanumeric() || c == '_'
}

fn is_identifier(name: &str) -> bool {
  let mut chars = name.chars();
  chars.next().is_some_and(is_identifier_start) && chars.all(is_identifier_char)
}
