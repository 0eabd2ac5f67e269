//! Build script for a conventional C project.
//!
//! Every `src/**/*.c` file is compiled to `$obj/<path under src>.o` and the
//! objects are linked into `$bin/$name`. Run without arguments to regenerate
//! `build.ninja`, or with `-t build` to regenerate and build.

use std::path::Path;
use std::process::ExitCode;

use ninjagen_lib::action::{Action, ActionArgument, ActionContext, UserOption};
use ninjagen_lib::consts::{ENV_VAR_PREFIX, NINJA_ACTION, NINJA_FILE};
use ninjagen_lib::ninja::NinjaGenerator;
use ninjagen_lib::output::{LogLevel, log_out};
use ninjagen_lib::query::{CommandStage, Query};
use ninjagen_lib::script::{self, BuildScript, RELEASE_OPTION};
use ninjagen_lib::shell::{join_command, split_command};

const ABOUT: &str = "Build script for a C project

Compiles every `src/**/*.c` file and links the objects into one executable.";

fn main() -> ExitCode {
  script::run(ABOUT, declare)
}

fn declare(script: &mut BuildScript) -> ninjagen_lib::Result<()> {
  script.set_version(env!("CARGO_PKG_VERSION"));

  script.variable("src", "src")?;
  script.variable("obj", "$build/$option_hash/obj")?;
  script.variable("bin", "$target/bin")?;

  script.option(
    UserOption::new("cc", "cc")
      .description("C compiler")
      .validator(|value| !value.is_empty()),
  )?;
  script.option(
    UserOption::new("name", "app")
      .description("Executable name")
      .validator(is_file_name),
  )?;
  script.option(UserOption::new("cflags", "").description("Extra compiler flags"))?;

  script.action(
    Action::new(NINJA_ACTION, generate)
      .description("Generate `build.ninja`")
      .default_run(true)
      .arg(ActionArgument::list("exclude").describe("Skip sources whose path contains this text")),
  )?;
  script.action(
    Action::new("vars", print_variables)
      .description("Print the variables")
      .arg(ActionArgument::flag("env").describe("Include environment variables")),
  )?;

  Ok(())
}

fn is_file_name(value: &str) -> bool {
  !value.is_empty()
    && value
      .chars()
      .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Output expression for `source`: its path under `src_dir` with a `.o`
/// extension, placed in `$obj`. Sources outside `src_dir` keep only their
/// file name.
fn object_path(src_dir: &Path, source: &str) -> String {
  let source = Path::new(source);
  let relative = source
    .strip_prefix(src_dir)
    .ok()
    .map(Path::to_path_buf)
    .or_else(|| source.file_name().map(Into::into))
    .unwrap_or_default();
  // the result is evaluated again, so literal `$` must stay escaped
  let object = relative.with_extension("o").to_string_lossy().replace('$', "$$");
  format!("$obj/{object}")
}

fn generate(ctx: &ActionContext<'_>) -> ninjagen_lib::Result<()> {
  let options = ctx.options();
  let vars = ctx.vars().with_overrides(options.iter());

  let profile: &[&str] = if options.is_enabled(RELEASE_OPTION) {
    &["-O2", "-DNDEBUG"]
  } else {
    &["-O0", "-g"]
  };
  // user flags are literal text, not expressions
  let cflags: Vec<String> = split_command(options.get("cflags").unwrap_or_default())
    .into_iter()
    .map(|flag| flag.replace('$', "$$"))
    .collect();

  let src = vars.eval_path("$src")?;
  let ninja = NinjaGenerator::create(NINJA_FILE)?;

  let cc = ninja.bind(
    CommandStage::new(&vars, "cc", move |inputs| object_path(Path::new(&src), &inputs[0]))
      .accepts(["c"])
      .arg("$cc")
      .args(profile.iter().copied())
      .args(cflags)
      .args(["-MD", "-MF", "$$out.d", "-c", "$$in", "-o", "$$out"])
      .description("CC $$out")
      .depfile("$$out.d"),
  );

  let objects = Query::source(&vars, ["$src/**/*.c"], ctx.args().list("exclude").to_vec())
    .apply([&cc])
    .fold()
    .collect()?;

  if objects.is_empty() {
    log_out(LogLevel::Warn, "! no source file was found");
  } else {
    let exe = vars.eval_path("$bin/$name")?;
    let link = join_command(&[vars.eval("$cc")?.as_str(), "$in", "-o", "$out"]);
    ninja.add_rule("ld", &link, Some("LD $out"), None)?;
    ninja.add_build("ld", &exe, &objects, &[])?;
    ninja.add_default([exe])?;
  }

  ninja.finish()?;
  log_out(LogLevel::Info, &format!("Generated `{NINJA_FILE}` from {} source files", objects.len()));
  Ok(())
}

fn print_variables(ctx: &ActionContext<'_>) -> ninjagen_lib::Result<()> {
  let include_env = ctx.args().flag("env");

  for (name, value) in ctx.vars().iter() {
    if name.starts_with(ENV_VAR_PREFIX) {
      // environment values are not expressions
      if include_env {
        log_out(LogLevel::Info, &format!("{name:<16} = {value}"));
      }
      continue;
    }
    let value = ctx.vars().eval(&format!("${{{name}}}"))?;
    log_out(LogLevel::Info, &format!("{name:<16} = {value}"));
  }

  Ok(())
}
