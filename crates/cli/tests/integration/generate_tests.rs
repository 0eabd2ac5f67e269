//! `build.ninja` generation tests.

use predicates::prelude::*;

use super::common::{TestEnv, build_lines, native, object_dir};

#[test]
fn generate_is_the_default_action() {
  let env = TestEnv::with_sources(&["src/main.c", "src/util/strings.c"]);

  env
    .ninjagen_cmd()
    .assert()
    .success()
    .stdout(predicate::str::contains("> run ninja"))
    .stdout(predicate::str::contains("from 2 source files"));

  let text = env.ninja_file();
  assert!(text.starts_with("# <autogen>\n"));
  assert_eq!(text.matches("rule cc\n").count(), 1);
  assert_eq!(text.matches("rule ld\n").count(), 1);
  assert!(text.contains("    depfile = $out.d\n"));
  assert_eq!(build_lines(&text).len(), 3);
  assert!(text.contains(&format!("build {}: ld ", native("target/bin/app"))));
  assert!(text.ends_with(&format!("# default target:\ndefault {}\n", native("target/bin/app"))));
}

#[test]
fn statements_are_ordered() {
  let env = TestEnv::with_sources(&["src/a.c", "src/b.c"]);
  env.ninjagen_cmd().assert().success();

  let text = env.ninja_file();
  let last_rule = text.rfind("\nrule ").unwrap();
  let first_build = text.find("\nbuild ").unwrap();
  let default = text.find("\ndefault ").unwrap();
  assert!(last_rule < first_build);
  assert!(first_build < default);
  assert!(text.contains("# 3 build statements were generated\n"));
}

#[test]
fn objects_live_under_the_option_hash() {
  let env = TestEnv::with_sources(&["src/main.c"]);
  env.ninjagen_cmd().assert().success();

  let dir = object_dir(&env.ninja_file());
  let hash = std::path::Path::new(&dir).parent().unwrap().file_name().unwrap().to_string_lossy().into_owned();
  assert!(dir.starts_with(&native("target/build/")));
  assert_eq!(hash.len(), 8);
  assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
}

#[test]
fn release_changes_flags_and_object_dir() {
  let env = TestEnv::with_sources(&["src/main.c"]);

  env.ninjagen_cmd().assert().success();
  let debug = env.ninja_file();
  env.ninjagen_cmd().arg("-r").assert().success();
  let release = env.ninja_file();

  assert!(debug.contains(" -O0 -g "));
  assert!(release.contains(" -O2 -DNDEBUG "));
  assert_ne!(object_dir(&debug), object_dir(&release));
}

#[test]
fn options_reach_the_commands() {
  let env = TestEnv::with_sources(&["src/main.c"]);

  env
    .ninjagen_cmd()
    .args(["-D", "name=tool", "cc=clang", "cflags=-Wall -Wextra"])
    .assert()
    .success();

  let text = env.ninja_file();
  assert!(text.contains("    command = clang -O0 -g -Wall -Wextra -MD -MF $out.d -c $in -o $out\n"));
  assert!(text.contains("    command = clang $in -o $out\n"));
  assert!(text.contains(&format!("default {}\n", native("target/bin/tool"))));
}

#[test]
fn exclude_drops_matching_sources() {
  let env = TestEnv::with_sources(&["src/main.c", "src/test/mock.c", "src/net/tcp.c"]);

  env.ninjagen_cmd().args(["--ninja-exclude", "test"]).assert().success();

  let text = env.ninja_file();
  assert_eq!(build_lines(&text).len(), 3);
  assert!(!text.contains("mock"));
}

#[test]
fn non_c_files_are_ignored() {
  let env = TestEnv::with_sources(&["src/main.c"]);
  env.write_file("src/main.h", "#pragma once\n");
  env.write_file("src/notes.txt", "notes\n");

  env.ninjagen_cmd().assert().success();

  assert_eq!(build_lines(&env.ninja_file()).len(), 2);
}

#[test]
fn empty_project_still_closes_the_file() {
  let env = TestEnv::empty();

  env
    .ninjagen_cmd()
    .assert()
    .success()
    .stderr(predicate::str::contains("no source file was found"));

  let text = env.ninja_file();
  assert!(text.contains("# 0 build statements were generated\n"));
  assert!(text.ends_with("# default target:\n# (none)\n"));
}

#[test]
fn explicit_tool_skips_defaults() {
  let env = TestEnv::with_sources(&["src/main.c"]);

  env
    .ninjagen_cmd()
    .args(["-t", "vars"])
    .assert()
    .success()
    .stdout(predicate::str::contains("> run vars"))
    .stdout(predicate::str::contains("> run ninja").not());

  assert!(!env.path("build.ninja").exists());
}

#[test]
fn same_stem_in_different_directories_gets_distinct_objects() {
  let env = TestEnv::with_sources(&["src/a/util.c", "src/b/util.c", "src/main.c"]);

  env.ninjagen_cmd().assert().success();

  let text = env.ninja_file();
  let mut outputs: Vec<&str> = build_lines(&text)
    .into_iter()
    .filter(|line| line.contains(": cc "))
    .filter_map(|line| line.trim_start_matches("build ").split(':').next())
    .collect();
  assert_eq!(outputs.len(), 3);
  outputs.sort_unstable();
  outputs.dedup();
  assert_eq!(outputs.len(), 3);

  let dir = object_dir(&text);
  assert!(outputs.iter().any(|out| out.ends_with(&native("a/util.o"))));
  assert!(outputs.iter().any(|out| out.ends_with(&native("b/util.o"))));
  assert!(outputs.iter().all(|out| out.starts_with(&dir)));
}
