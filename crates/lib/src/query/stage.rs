//! Stages: ninja rules plus the build statements that apply them.
//!
//! A stage turns the paths of one [`Element`](super::Element) into exactly one
//! output path, emitting a build statement on the way. Its rule is emitted the
//! first time the stage is applied and never again for the lifetime of the
//! [`StageRef`] it is bound through.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use tracing::debug;

use super::types::{QueryError, TypeTag};
use crate::ninja::NinjaWriter;
use crate::shell::join_command;
use crate::vars::Variables;

/// A build rule and its per-input build statement generator.
pub trait Stage {
  /// The ninja rule name.
  fn name(&self) -> &str;

  /// Element types this stage accepts; [`TypeTag::Any`] accepts every type.
  fn input_types(&self) -> Vec<TypeTag>;

  /// Emit the rule statement.
  fn generate_rule(&self, ninja: &NinjaWriter) -> Result<(), QueryError>;

  /// Emit the build statement for `inputs` and return the output path.
  fn generate_build(&self, ninja: &NinjaWriter, inputs: &[String]) -> Result<String, QueryError>;
}

struct BoundStage {
  stage: Box<dyn Stage>,
  ninja: NinjaWriter,
  rule_emitted: Cell<bool>,
}

/// A stage bound to a ninja file.
///
/// Clones share the stage and its "rule emitted" state, so a stage used by
/// several queries still emits its rule once.
#[derive(Clone)]
pub struct StageRef {
  inner: Rc<BoundStage>,
}

impl StageRef {
  pub(crate) fn new<S: Stage + 'static>(stage: S, ninja: NinjaWriter) -> Self {
    Self {
      inner: Rc::new(BoundStage {
        stage: Box::new(stage),
        ninja,
        rule_emitted: Cell::new(false),
      }),
    }
  }

  pub fn name(&self) -> &str {
    self.inner.stage.name()
  }

  pub fn input_types(&self) -> Vec<TypeTag> {
    self.inner.stage.input_types()
  }

  /// Whether elements tagged `tag` may be fed to this stage.
  pub fn accepts(&self, tag: &TypeTag) -> bool {
    let accepted = self.input_types();
    accepted.contains(&TypeTag::Any) || accepted.contains(tag)
  }

  /// Whether the rule has been written yet.
  pub fn rule_emitted(&self) -> bool {
    self.inner.rule_emitted.get()
  }

  /// Apply the stage to `inputs`, emitting the rule on first use.
  pub fn apply(&self, inputs: &[String]) -> Result<String, QueryError> {
    let bound = &self.inner;
    if !bound.rule_emitted.get() {
      bound.stage.generate_rule(&bound.ninja)?;
      bound.rule_emitted.set(true);
    }
    bound.stage.generate_build(&bound.ninja, inputs)
  }
}

impl fmt::Debug for StageRef {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("StageRef")
      .field("name", &self.name())
      .field("rule_emitted", &self.rule_emitted())
      .finish()
  }
}

/// The identity stage: its output is its single input.
///
/// Emits no rule and no build statement.
#[derive(Debug, Clone)]
pub struct UnitStage {
  name: String,
}

impl UnitStage {
  pub fn new(name: impl Into<String>) -> Self {
    Self { name: name.into() }
  }
}

impl Stage for UnitStage {
  fn name(&self) -> &str {
    &self.name
  }

  fn input_types(&self) -> Vec<TypeTag> {
    vec![TypeTag::Any]
  }

  fn generate_rule(&self, _ninja: &NinjaWriter) -> Result<(), QueryError> {
    Ok(())
  }

  fn generate_build(&self, _ninja: &NinjaWriter, inputs: &[String]) -> Result<String, QueryError> {
    match inputs {
      [single] => Ok(single.clone()),
      _ => Err(QueryError::UnitArity {
        stage: self.name.clone(),
        inputs: inputs.to_vec(),
      }),
    }
  }
}

type OutputFn = Box<dyn Fn(&[String]) -> String>;

/// A stage backed by one command line.
///
/// Command arguments, description, depfile, order-only dependencies and the
/// output path are expressions evaluated against the stage's variables. Ninja
/// variables must be escaped: write `$$in` and `$$out`.
///
/// # Example
///
/// ```
/// use ninjagen_lib::ninja::NinjaGenerator;
/// use ninjagen_lib::query::{CommandStage, file_stem};
/// use ninjagen_lib::vars::Variables;
///
/// let vars = Variables::from_pairs([("cc", "cc"), ("obj", "target/obj")]);
/// let ninja = NinjaGenerator::from_writer(std::io::sink()).unwrap();
/// let cc = ninja.bind(
///   CommandStage::new(&vars, "cc", |inputs| format!("$obj/{}.o", file_stem(&inputs[0])))
///     .accepts(["c"])
///     .args(["$cc", "-c", "$$in", "-o", "$$out"])
///     .description("CC $$out"),
/// );
///
/// let out = cc.apply(&["src/main.c".to_string()]).unwrap();
/// assert_eq!(out, std::path::Path::new("target/obj/main.o").to_string_lossy());
/// ```
pub struct CommandStage {
  name: String,
  vars: Variables,
  accepted: Vec<TypeTag>,
  command: Vec<String>,
  description: Option<String>,
  depfile: Option<String>,
  order_only: Vec<String>,
  output: OutputFn,
}

impl CommandStage {
  /// Create a stage named `name` whose output path is computed by `output`
  /// from the element's input paths.
  pub fn new(vars: &Variables, name: impl Into<String>, output: impl Fn(&[String]) -> String + 'static) -> Self {
    Self {
      name: name.into(),
      vars: vars.clone(),
      accepted: Vec::new(),
      command: Vec::new(),
      description: None,
      depfile: None,
      order_only: Vec::new(),
      output: Box::new(output),
    }
  }

  /// Accept elements with these file extensions.
  pub fn accepts<I, S>(mut self, extensions: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
  {
    self
      .accepted
      .extend(extensions.into_iter().map(|ext| TypeTag::ext(ext.as_ref())));
    self
  }

  /// Accept elements of every type.
  pub fn accepts_any(mut self) -> Self {
    self.accepted.push(TypeTag::Any);
    self
  }

  pub fn arg(mut self, arg: impl Into<String>) -> Self {
    self.command.push(arg.into());
    self
  }

  pub fn args<I, S>(mut self, args: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.command.extend(args.into_iter().map(Into::into));
    self
  }

  pub fn description(mut self, description: impl Into<String>) -> Self {
    self.description = Some(description.into());
    self
  }

  pub fn depfile(mut self, depfile: impl Into<String>) -> Self {
    self.depfile = Some(depfile.into());
    self
  }

  /// Targets that must exist before any output of this stage is built.
  pub fn order_only<I, S>(mut self, deps: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.order_only.extend(deps.into_iter().map(Into::into));
    self
  }

  fn eval_optional(&self, expr: Option<&str>) -> Result<Option<String>, QueryError> {
    Ok(expr.map(|e| self.vars.eval(e)).transpose()?)
  }
}

impl Stage for CommandStage {
  fn name(&self) -> &str {
    &self.name
  }

  fn input_types(&self) -> Vec<TypeTag> {
    self.accepted.clone()
  }

  fn generate_rule(&self, ninja: &NinjaWriter) -> Result<(), QueryError> {
    let args = self
      .command
      .iter()
      .map(|arg| self.vars.eval(arg))
      .collect::<Result<Vec<_>, _>>()?;
    let description = self.eval_optional(self.description.as_deref())?;
    let depfile = self.eval_optional(self.depfile.as_deref())?;

    ninja.add_rule(&self.name, &join_command(&args), description.as_deref(), depfile.as_deref())?;
    Ok(())
  }

  fn generate_build(&self, ninja: &NinjaWriter, inputs: &[String]) -> Result<String, QueryError> {
    let output = self.vars.eval_path(&(self.output)(inputs))?;
    let order_only = self
      .order_only
      .iter()
      .map(|dep| self.vars.eval_path(dep))
      .collect::<Result<Vec<_>, _>>()?;

    debug!(stage = %self.name, output = %output, inputs = inputs.len(), "build statement");
    ninja.add_build(&self.name, &output, inputs, &order_only)?;
    Ok(output)
  }
}
