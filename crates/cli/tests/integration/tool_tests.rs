//! Built-in `ninja` tool actions.
//!
//! `ninja` itself is hidden from these tests, so only the paths that do not
//! need it to succeed are exercised.

use predicates::prelude::*;

use super::common::TestEnv;

#[test]
fn build_regenerates_before_running_ninja() {
  let env = TestEnv::with_sources(&["src/main.c"]);
  let empty_path = env.path("no-tools");
  std::fs::create_dir_all(&empty_path).unwrap();

  env
    .ninjagen_cmd()
    .env("PATH", &empty_path)
    .args(["-t", "build"])
    .assert()
    .code(1)
    .stdout(predicate::str::contains("> run ninja"))
    .stdout(predicate::str::contains("> run build"))
    .stderr(predicate::str::contains("failed to spawn `ninja`"));

  // the generator ran first
  assert!(env.ninja_file().contains("rule cc"));
}

#[test]
fn compdb_depends_on_ninja_action() {
  let env = TestEnv::with_sources(&["src/main.c"]);
  let empty_path = env.path("no-tools");
  std::fs::create_dir_all(&empty_path).unwrap();

  env
    .ninjagen_cmd()
    .env("PATH", &empty_path)
    .args(["-t", "compdb", "clean"])
    .assert()
    .code(1)
    .stdout(predicate::str::contains("> run compdb"))
    .stdout(predicate::str::contains("> run clean").not());

  assert!(!env.path("compile_commands.json").exists());
}
