//! Element and type tag definitions for queries.

use std::fmt;
use std::path::Path;

use thiserror::Error;

use crate::expr::ExprError;
use crate::ninja::NinjaError;

/// The file type carried by an [`Element`].
///
/// Displayed as `type_<ext>` for a file extension, or as the reserved tags
/// `:any` (accepted by stages that take every type) and `:undefined` (the type
/// of an empty fold).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeTag {
  Any,
  Undefined,
  Ext(String),
}

impl TypeTag {
  /// Tag for a file extension, without the leading dot.
  pub fn ext(ext: &str) -> Self {
    TypeTag::Ext(ext.trim_start_matches('.').to_lowercase())
  }

  /// Tag derived from a path's extension.
  ///
  /// Paths without an extension get the empty extension tag (`type_`).
  pub fn of_path(path: &str) -> Self {
    TypeTag::Ext(file_extension(path).unwrap_or_default())
  }

  /// The extension this tag stands for, if it is not a reserved tag.
  pub fn extension(&self) -> Option<&str> {
    match self {
      TypeTag::Ext(ext) => Some(ext),
      TypeTag::Any | TypeTag::Undefined => None,
    }
  }
}

impl fmt::Display for TypeTag {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      TypeTag::Any => write!(f, ":any"),
      TypeTag::Undefined => write!(f, ":undefined"),
      TypeTag::Ext(ext) => write!(f, "type_{ext}"),
    }
  }
}

/// Lower-cased extension of `path` without the dot, e.g. `src/Main.C` -> `c`.
///
/// Dot files such as `.clang-format` have no extension.
pub fn file_extension(path: &str) -> Option<String> {
  Path::new(path)
    .extension()
    .map(|ext| ext.to_string_lossy().to_lowercase())
    .filter(|ext| !ext.is_empty())
}

/// File name of `path` without its extension, e.g. `src/net/tcp.c` -> `tcp`.
pub fn file_stem(path: &str) -> String {
  Path::new(path)
    .file_stem()
    .map(|stem| stem.to_string_lossy().into_owned())
    .unwrap_or_default()
}

/// A group of files that share one type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
  pub paths: Vec<String>,
  pub tag: TypeTag,
}

impl Element {
  pub fn new(paths: Vec<String>, tag: TypeTag) -> Self {
    Self { paths, tag }
  }

  /// A single file, typed by its extension.
  pub fn single(path: impl Into<String>) -> Self {
    let path = path.into();
    let tag = TypeTag::of_path(&path);
    Self { paths: vec![path], tag }
  }
}

/// Errors raised while a query is drained.
#[derive(Debug, Error)]
pub enum QueryError {
  /// A stage was applied to an element type it does not accept.
  #[error("`apply` type error: input `{found}` -> stage `{stage}` accepts {}", format_tags(.accepted))]
  TypeMismatch {
    stage: String,
    found: TypeTag,
    accepted: Vec<TypeTag>,
  },

  /// `fold` met elements of different types.
  #[error("`fold` type error: `{found}` fold to `{expected}`")]
  FoldTypeMismatch { found: TypeTag, expected: TypeTag },

  /// A stage produced an output whose type cannot be derived.
  #[error("`apply` type error: unknown type name for file `{path}` produced by stage `{stage}`")]
  UnknownOutputType { stage: String, path: String },

  /// The identity stage received more or less than one file.
  #[error("unit stage `{stage}` takes exactly one input, got {}", .inputs.len())]
  UnitArity { stage: String, inputs: Vec<String> },

  #[error("invalid glob pattern `{pattern}`: {source}")]
  Pattern {
    pattern: String,
    #[source]
    source: glob::PatternError,
  },

  #[error("glob failed: {0}")]
  Glob(#[from] glob::GlobError),

  #[error(transparent)]
  Expr(#[from] ExprError),

  #[error(transparent)]
  Ninja(#[from] NinjaError),
}

fn format_tags(tags: &[TypeTag]) -> String {
  let names: Vec<String> = tags.iter().map(ToString::to_string).collect();
  format!("[{}]", names.join(", "))
}
