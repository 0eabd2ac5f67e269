//! Lazy, typed file pipelines.
//!
//! A [`Query`] is a single-pass sequence of [`Element`]s. Nothing happens until
//! the query is drained with [`Query::collect`] or [`Query::elements`]: glob
//! expansion, type checks and build statement emission all run as elements are
//! pulled through the pipeline, and the first error stops the drain.
//!
//! ```no_run
//! use ninjagen_lib::ninja::NinjaGenerator;
//! use ninjagen_lib::query::{CommandStage, Query, file_stem};
//! use ninjagen_lib::vars::Variables;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let vars = Variables::from_pairs([("src", "src"), ("obj", "target/obj")]);
//! let ninja = NinjaGenerator::create("build.ninja")?;
//!
//! let cc = ninja.bind(
//!   CommandStage::new(&vars, "cc", |inputs| format!("$obj/{}.o", file_stem(&inputs[0])))
//!     .accepts(["c"])
//!     .args(["cc", "-c", "$$in", "-o", "$$out"]),
//! );
//! let ld = ninja.bind(
//!   CommandStage::new(&vars, "ld", |_| "target/app.elf".to_string())
//!     .accepts(["o"])
//!     .args(["cc", "$$in", "-o", "$$out"]),
//! );
//!
//! let app = Query::source(&vars, ["$src/**/*.c"], Vec::<String>::new())
//!   .apply([&cc])
//!   .fold()
//!   .apply([&ld])
//!   .collect()?;
//! ninja.add_default(app)?;
//! ninja.finish()?;
//! # Ok(())
//! # }
//! ```

mod stage;
mod types;

use std::collections::HashMap;
use std::rc::Rc;

use tracing::debug;

pub use stage::{CommandStage, Stage, StageRef, UnitStage};
pub use types::{Element, QueryError, TypeTag, file_extension, file_stem};

use crate::vars::Variables;

type QueryItem = Result<Element, QueryError>;

/// A lazy, single-pass pipeline of elements.
///
/// Combinators consume the query and return a new one.
pub struct Query {
  iter: Box<dyn Iterator<Item = QueryItem>>,
}

impl Query {
  pub fn new(iter: impl Iterator<Item = QueryItem> + 'static) -> Self {
    Self { iter: Box::new(iter) }
  }

  /// A query over already-known elements.
  pub fn from_elements(elements: impl IntoIterator<Item = Element, IntoIter: 'static>) -> Self {
    Self::new(elements.into_iter().map(Ok))
  }

  pub fn empty() -> Self {
    Self::new(std::iter::empty())
  }

  /// Files matching `patterns`, one element per file.
  ///
  /// Each pattern is path-evaluated against `vars` and glob-expanded. A file is
  /// dropped if any of `excludes` is a substring of its path.
  pub fn source<P, E>(vars: &Variables, patterns: P, excludes: E) -> Self
  where
    P: IntoIterator,
    P::Item: Into<String>,
    E: IntoIterator,
    E::Item: Into<String>,
  {
    let vars = vars.clone();
    let patterns: Vec<String> = patterns.into_iter().map(Into::into).collect();
    let excludes: Rc<[String]> = excludes.into_iter().map(Into::into).collect();

    let iter = patterns.into_iter().flat_map(move |pattern| {
      let excludes = Rc::clone(&excludes);
      match expand_pattern(&vars, &pattern) {
        Ok(paths) => Box::new(
          paths
            .filter(move |item| match item {
              Ok(path) => !excludes.iter().any(|ex| path.contains(ex.as_str())),
              Err(_) => true,
            })
            .map(|item| item.map(Element::single)),
        ) as Box<dyn Iterator<Item = QueryItem>>,
        Err(err) => Box::new(std::iter::once(Err(err))),
      }
    });

    Self::new(iter)
  }

  /// Files matching a single pattern.
  pub fn select(vars: &Variables, pattern: &str) -> Self {
    Self::source(vars, [pattern], Vec::<String>::new())
  }

  /// Feed every element to each of `stages`, in order.
  ///
  /// Yields one element per (element, stage) pair, typed by the extension of
  /// the stage's output.
  ///
  /// # Errors
  ///
  /// Draining fails with `TypeMismatch` when a stage does not accept an
  /// element's type (the stage is not run) and with `UnknownOutputType` when
  /// the stage's output has no extension.
  pub fn apply<'a>(self, stages: impl IntoIterator<Item = &'a StageRef>) -> Self {
    let stages: Rc<[StageRef]> = stages.into_iter().cloned().collect();

    let iter = self.iter.flat_map(move |item| {
      let stages = Rc::clone(&stages);
      let element = match item {
        Ok(element) => Rc::new(element),
        Err(err) => return Box::new(std::iter::once(Err(err))) as Box<dyn Iterator<Item = QueryItem>>,
      };

      Box::new((0..stages.len()).map(move |i| apply_stage(&stages[i], &element)))
    });

    Self::new(iter)
  }

  /// Merge every element into one.
  ///
  /// An empty query folds to a single empty element of type `:undefined`.
  ///
  /// # Errors
  ///
  /// Draining fails with `FoldTypeMismatch` when elements differ in type.
  pub fn fold(self) -> Self {
    let upstream = self.iter;

    Self::new(std::iter::once_with(move || -> QueryItem {
      let mut paths = Vec::new();
      let mut tag = TypeTag::Undefined;

      for item in upstream {
        let element = item?;
        if tag == TypeTag::Undefined {
          tag = element.tag;
        } else if tag != element.tag {
          return Err(QueryError::FoldTypeMismatch {
            found: element.tag,
            expected: tag,
          });
        }
        paths.extend(element.paths);
      }

      Ok(Element::new(paths, tag))
    }))
  }

  /// Group elements by type, one element per distinct type.
  ///
  /// Groups appear in order of each type's first occurrence; paths keep their
  /// encounter order within a group.
  pub fn flat(self) -> Self {
    let mut upstream = self.iter;
    let mut grouped: Option<std::vec::IntoIter<Element>> = None;
    let mut failed = false;

    Self::new(std::iter::from_fn(move || {
      if failed {
        return None;
      }
      if grouped.is_none() {
        match group_by_tag(upstream.by_ref()) {
          Ok(groups) => grouped = Some(groups.into_iter()),
          Err(err) => {
            failed = true;
            return Some(Err(err));
          }
        }
      }
      grouped.as_mut().and_then(Iterator::next).map(Ok)
    }))
  }

  /// This query's elements followed by `other`'s.
  pub fn concat(self, other: Query) -> Self {
    Self::new(self.iter.chain(other.iter))
  }

  /// Drain the query and return every path, in emission order.
  pub fn collect(self) -> Result<Vec<String>, QueryError> {
    let mut paths = Vec::new();
    for item in self.iter {
      paths.extend(item?.paths);
    }
    Ok(paths)
  }

  /// Drain the query and return its elements.
  pub fn elements(self) -> Result<Vec<Element>, QueryError> {
    self.iter.collect()
  }
}

fn expand_pattern(
  vars: &Variables,
  pattern: &str,
) -> Result<impl Iterator<Item = Result<String, QueryError>> + 'static, QueryError> {
  let evaluated = vars.eval_path(pattern)?;
  debug!(pattern = %pattern, evaluated = %evaluated, "expanding glob");

  let paths = glob::glob(&evaluated).map_err(|source| QueryError::Pattern {
    pattern: evaluated.clone(),
    source,
  })?;

  Ok(paths.map(|entry| {
    entry
      .map(|path| path.to_string_lossy().into_owned())
      .map_err(QueryError::from)
  }))
}

fn apply_stage(stage: &StageRef, element: &Element) -> QueryItem {
  if !stage.accepts(&element.tag) {
    return Err(QueryError::TypeMismatch {
      stage: stage.name().to_string(),
      found: element.tag.clone(),
      accepted: stage.input_types(),
    });
  }

  let output = stage.apply(&element.paths)?;
  let Some(ext) = file_extension(&output) else {
    return Err(QueryError::UnknownOutputType {
      stage: stage.name().to_string(),
      path: output,
    });
  };

  Ok(Element::new(vec![output], TypeTag::Ext(ext)))
}

fn group_by_tag(items: impl Iterator<Item = QueryItem>) -> Result<Vec<Element>, QueryError> {
  let mut groups: Vec<Element> = Vec::new();
  let mut index: HashMap<TypeTag, usize> = HashMap::new();

  for item in items {
    let element = item?;
    match index.get(&element.tag) {
      Some(&i) => groups[i].paths.extend(element.paths),
      None => {
        index.insert(element.tag.clone(), groups.len());
        groups.push(element);
      }
    }
  }

  Ok(groups)
}
