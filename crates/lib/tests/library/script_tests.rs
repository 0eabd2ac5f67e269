use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;

use ninjagen_lib::Error;
use ninjagen_lib::action::{Action, ActionArgument, ActionError, UserOption};
use ninjagen_lib::consts::NINJA_ACTION;
use ninjagen_lib::ninja::NinjaGenerator;
use ninjagen_lib::query::{CommandStage, Query, file_stem};
use ninjagen_lib::script::{BuildScript, Outcome, RELEASE_OPTION};
use serial_test::serial;
use tempfile::TempDir;

use super::common::{argv, build_lines, read, store, touch};

/// A script whose `ninja` action compiles `$src/*.c` into `$obj`.
fn c_script(temp: &TempDir) -> BuildScript {
  let root = temp.path().to_string_lossy().into_owned();
  let ninja_path: PathBuf = temp.path().join("build.ninja");

  let mut script = BuildScript::with_store("test build script", store(temp.path())).unwrap();
  script.variable("src", format!("{root}/src")).unwrap();
  script.variable("obj", format!("{root}/$build/$option_hash")).unwrap();
  script.option(UserOption::new("cc", "cc").description("C compiler")).unwrap();
  script
    .action(
      Action::new(NINJA_ACTION, move |ctx| {
        let vars = ctx.vars().with_overrides(ctx.options().iter());
        let ninja = NinjaGenerator::create(&ninja_path)?;
        let cc = ninja.bind(
          CommandStage::new(&vars, "cc", |inputs| format!("$obj/{}.o", file_stem(&inputs[0])))
            .accepts(["c"])
            .args(["$cc", "-c", "$$in", "-o", "$$out"]),
        );
        Query::source(&vars, ["$src/*.c"], ctx.args().list("exclude").to_vec())
          .apply([&cc])
          .collect()?;
        ninja.finish()?;
        Ok(())
      })
      .default_run(true)
      .arg(ActionArgument::list("exclude")),
    )
    .unwrap();
  script
}

#[test]
#[serial]
fn default_run_generates_into_hashed_dir() {
  let temp = TempDir::new().unwrap();
  touch(temp.path(), "src/main.c");
  touch(temp.path(), "src/lexer.c");

  let outcome = c_script(&temp).run_with(argv(&[])).unwrap();
  assert_eq!(outcome, Outcome::Ran(vec![NINJA_ACTION.to_string()]));

  let text = read(&temp.path().join("build.ninja"));
  let builds = build_lines(&text);
  assert_eq!(builds.len(), 2);
  assert!(builds.iter().all(|line| line.contains(&format!("target{}build", std::path::MAIN_SEPARATOR))));
  assert!(!text.contains("unknown"));
}

#[test]
#[serial]
fn options_and_action_args_reach_the_action() {
  let temp = TempDir::new().unwrap();
  touch(temp.path(), "src/main.c");
  touch(temp.path(), "src/test_main.c");

  c_script(&temp)
    .run_with(argv(&["-D", "cc=clang", "--ninja-exclude", "test_"]))
    .unwrap();

  let text = read(&temp.path().join("build.ninja"));
  assert!(text.contains("    command = clang -c $in -o $out\n"));
  assert_eq!(build_lines(&text).len(), 1);
}

#[test]
#[serial]
fn release_run_uses_its_own_object_dir() {
  let temp = TempDir::new().unwrap();
  touch(temp.path(), "src/main.c");
  let ninja_path = temp.path().join("build.ninja");

  c_script(&temp).run_with(argv(&[])).unwrap();
  let debug = read(&ninja_path);
  c_script(&temp).run_with(argv(&["-r"])).unwrap();
  let release = read(&ninja_path);
  c_script(&temp)
    .run_with(argv(&["-D", &format!("{RELEASE_OPTION}=1")]))
    .unwrap();
  let explicit = read(&ninja_path);

  assert_ne!(build_lines(&debug), build_lines(&release));
  assert_eq!(build_lines(&release), build_lines(&explicit));
}

#[test]
#[serial]
fn dependencies_run_first_and_once() {
  let temp = TempDir::new().unwrap();
  let seen = Rc::new(RefCell::new(Vec::new()));

  let mut script = BuildScript::with_store("order", store(temp.path())).unwrap();
  for (name, deps) in [(NINJA_ACTION, vec![]), ("docs", vec![NINJA_ACTION]), ("package", vec!["docs", NINJA_ACTION])] {
    let log = Rc::clone(&seen);
    script
      .action(Action::new(name, move |_| {
        log.borrow_mut().push(name.to_string());
        Ok(())
      })
      .deps(deps))
      .unwrap();
  }

  let outcome = script.run_with(argv(&["-t", "package"])).unwrap();
  assert_eq!(*seen.borrow(), [NINJA_ACTION, "docs", "package"]);
  assert_eq!(outcome, Outcome::Ran(seen.borrow().clone()));
}

#[test]
#[serial]
fn error_cycle_runs_nothing() {
  let temp = TempDir::new().unwrap();
  let ran = Rc::new(RefCell::new(false));

  let mut script = BuildScript::with_store("cycle", store(temp.path())).unwrap();
  let flag = Rc::clone(&ran);
  script
    .action(Action::new(NINJA_ACTION, move |_| {
      *flag.borrow_mut() = true;
      Ok(())
    }))
    .unwrap();
  script.action(Action::new("a", |_| Ok(())).deps([NINJA_ACTION, "b"])).unwrap();
  script.action(Action::new("b", |_| Ok(())).dep("a")).unwrap();

  let err = script.run_with(argv(&["-t", "a"])).unwrap_err();
  assert!(matches!(err, Error::Action(ActionError::CycleDetected { .. })));
  assert_eq!(err.to_string(), "build script error: cycle reference: a -> b -> a");
  assert!(!*ran.borrow());
}

#[test]
#[serial]
fn error_action_failure_propagates() {
  let temp = TempDir::new().unwrap();
  let mut script = BuildScript::with_store("failing", store(temp.path())).unwrap();
  script
    .action(Action::new(NINJA_ACTION, |_| Err(Error::msg("generator exploded"))).default_run(true))
    .unwrap();

  let err = script.run_with(argv(&[])).unwrap_err();
  assert_eq!(err.to_string(), "generator exploded");
}
