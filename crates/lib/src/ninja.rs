//! `build.ninja` statement emitter.
//!
//! The file is written in three parts:
//! - the header, as soon as the generator is created
//! - rule blocks, immediately when a stage first needs its rule
//! - build statements, the statement count and the `default` line, buffered
//!   until the generator is closed
//!
//! This keeps every rule ahead of the build statements that use it and the
//! `default` line last. Closing happens exactly once: explicitly through
//! [`NinjaGenerator::finish`], or when the generator is dropped, including
//! while an error propagates out of the scope that owns it.

use std::borrow::Cow;
use std::cell::RefCell;
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::rc::Rc;

use chrono::Local;
use thiserror::Error;
use tracing::{debug, warn};

use crate::query::{Stage, StageRef};

#[derive(Debug, Error)]
pub enum NinjaError {
  #[error("failed to write ninja file: {0}")]
  Io(#[from] std::io::Error),

  #[error("ninja file was already closed")]
  Closed,
}

struct Emitter {
  sink: Option<Box<dyn Write>>,
  builds: Vec<String>,
  outputs: HashSet<String>,
  defaults: Vec<String>,
}

impl Emitter {
  fn sink(&mut self) -> Result<&mut Box<dyn Write>, NinjaError> {
    self.sink.as_mut().ok_or(NinjaError::Closed)
  }
}

/// Owner of a ninja file being generated.
///
/// Stages do not borrow the generator; they hold a [`NinjaWriter`] handle to
/// the same emitter. Statements sent through a handle after the generator was
/// closed fail with [`NinjaError::Closed`].
pub struct NinjaGenerator {
  writer: NinjaWriter,
}

impl NinjaGenerator {
  /// Create (or truncate) the file at `path` and write the header.
  pub fn create(path: impl AsRef<Path>) -> Result<Self, NinjaError> {
    let path = path.as_ref();
    debug!(path = %path.display(), "creating ninja file");
    let file = File::create(path)?;
    Self::from_writer(BufWriter::new(file))
  }

  /// Generate into an arbitrary sink.
  pub fn from_writer(sink: impl Write + 'static) -> Result<Self, NinjaError> {
    let mut sink: Box<dyn Write> = Box::new(sink);

    let generated_at = Local::now().format("%Y-%m-%d %H:%M:%S %:z");
    write!(
      sink,
      "# <autogen>\n\
       # This file is generated automatically, do not edit it by hand\n\
       # Generated at {generated_at}\n\
       # </autogen>\n\n"
    )?;

    Ok(Self {
      writer: NinjaWriter {
        inner: Rc::new(RefCell::new(Emitter {
          sink: Some(sink),
          builds: Vec::new(),
          outputs: HashSet::new(),
          defaults: Vec::new(),
        })),
      },
    })
  }

  /// A handle for emitting statements into this file.
  pub fn writer(&self) -> NinjaWriter {
    self.writer.clone()
  }

  /// Bind a stage to this file so its rule is emitted here.
  pub fn bind<S: Stage + 'static>(&self, stage: S) -> StageRef {
    StageRef::new(stage, self.writer())
  }

  pub fn add_rule(
    &self,
    name: &str,
    command: &str,
    description: Option<&str>,
    depfile: Option<&str>,
  ) -> Result<(), NinjaError> {
    self.writer.add_rule(name, command, description, depfile)
  }

  pub fn add_build(&self, rule: &str, output: &str, inputs: &[String], order_only: &[String]) -> Result<(), NinjaError> {
    self.writer.add_build(rule, output, inputs, order_only)
  }

  pub fn add_default<I, S>(&self, targets: I) -> Result<(), NinjaError>
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.writer.add_default(targets)
  }

  /// Write the buffered statements and the footer, then close the file.
  pub fn finish(self) -> Result<(), NinjaError> {
    self.writer.close()
  }
}

impl Drop for NinjaGenerator {
  fn drop(&mut self) {
    if let Err(err) = self.writer.close() {
      warn!(error = %err, "failed to finish ninja file");
    }
  }
}

/// Shared handle to a generator's emitter.
#[derive(Clone)]
pub struct NinjaWriter {
  inner: Rc<RefCell<Emitter>>,
}

impl NinjaWriter {
  /// Write a rule block.
  ///
  /// Rules are not de-duplicated here; [`StageRef`] emits each stage's rule once.
  pub fn add_rule(
    &self,
    name: &str,
    command: &str,
    description: Option<&str>,
    depfile: Option<&str>,
  ) -> Result<(), NinjaError> {
    let mut emitter = self.inner.borrow_mut();
    let sink = emitter.sink()?;

    debug!(rule = %name, "emitting rule");
    writeln!(sink, "rule {name}")?;
    writeln!(sink, "    command = {command}")?;
    if let Some(description) = description.filter(|d| !d.is_empty()) {
      writeln!(sink, "    description = {description}")?;
    }
    if let Some(depfile) = depfile.filter(|d| !d.is_empty()) {
      writeln!(sink, "    depfile = {depfile}")?;
    }
    writeln!(sink)?;
    Ok(())
  }

  /// Buffer a build statement binding `inputs` to `output` through `rule`.
  pub fn add_build(&self, rule: &str, output: &str, inputs: &[String], order_only: &[String]) -> Result<(), NinjaError> {
    let mut emitter = self.inner.borrow_mut();
    emitter.sink()?;

    let mut statement = format!("build {}: {rule}", escape_path(output));
    for input in inputs {
      statement.push(' ');
      statement.push_str(&escape_path(input));
    }
    if !order_only.is_empty() {
      statement.push_str(" ||");
      for dep in order_only {
        statement.push(' ');
        statement.push_str(&escape_path(dep));
      }
    }

    emitter.outputs.insert(output.to_string());
    emitter.builds.push(statement);
    Ok(())
  }

  /// Add targets to the `default` line.
  pub fn add_default<I, S>(&self, targets: I) -> Result<(), NinjaError>
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    let mut emitter = self.inner.borrow_mut();
    emitter.sink()?;

    for target in targets {
      let target = target.into();
      if !emitter.outputs.contains(&target) {
        warn!(target = %target, "default target is not the output of any build statement");
      }
      emitter.defaults.push(escape_path(&target).into_owned());
    }
    Ok(())
  }

  /// Number of build statements buffered so far.
  pub fn build_count(&self) -> usize {
    self.inner.borrow().builds.len()
  }

  pub fn is_closed(&self) -> bool {
    self.inner.borrow().sink.is_none()
  }

  /// Flush buffered statements and footer. Closing twice is a no-op.
  fn close(&self) -> Result<(), NinjaError> {
    let mut emitter = self.inner.borrow_mut();
    let Some(mut sink) = emitter.sink.take() else {
      return Ok(());
    };
    let builds = std::mem::take(&mut emitter.builds);
    let defaults = std::mem::take(&mut emitter.defaults);
    drop(emitter);

    for statement in &builds {
      writeln!(sink, "{statement}")?;
    }

    writeln!(sink)?;
    writeln!(sink, "# {} build statements were generated", builds.len())?;
    writeln!(sink, "# default target:")?;
    if defaults.is_empty() {
      // ninja rejects a bare `default`; with no default statement it builds every output
      writeln!(sink, "# (none)")?;
    } else {
      writeln!(sink, "default {}", defaults.join(" "))?;
    }
    sink.flush()?;

    debug!(builds = builds.len(), defaults = defaults.len(), "ninja file closed");
    Ok(())
  }
}

/// Escape a path for a `build` or `default` line.
///
/// `$`, space and `:` are significant in path lists; they are written as
/// `$$`, `$ ` and `$:`.
pub fn escape_path(path: &str) -> Cow<'_, str> {
  if !path.contains(['$', ' ', ':']) {
    return Cow::Borrowed(path);
  }

  let mut escaped = String::with_capacity(path.len() + 4);
  for ch in path.chars() {
    if matches!(ch, '$' | ' ' | ':') {
      escaped.push('$');
    }
    escaped.push(ch);
  }
  Cow::Owned(escaped)
}
