//! Shared helpers for library integration tests.

use std::path::{Path, PathBuf};

use chrono::Local;
use ninjagen_lib::vars::{BuiltinSources, VariableStore, Variables};
use tempfile::TempDir;

/// Create `relative` under `root` with a one-line body.
pub fn touch(root: &Path, relative: &str) -> PathBuf {
  let path = root.join(relative);
  if let Some(parent) = path.parent() {
    std::fs::create_dir_all(parent).unwrap();
  }
  std::fs::write(&path, format!("// {relative}\n")).unwrap();
  path
}

/// A project tree with the given files and a snapshot pointing `src`,
/// `obj` and `lib` into it.
pub fn project(files: &[&str]) -> (TempDir, Variables) {
  let temp = TempDir::new().unwrap();
  for file in files {
    touch(temp.path(), file);
  }
  let root = temp.path().to_string_lossy().into_owned();
  let vars = Variables::from_pairs([
    ("root", root.clone()),
    ("src", format!("{root}/src")),
    ("obj", format!("{root}/obj")),
    ("lib", format!("{root}/lib")),
    ("cc", "cc".to_string()),
  ]);
  (temp, vars)
}

/// A store over fixed built-in inputs and no environment.
pub fn store(root: &Path) -> VariableStore {
  let sources = BuiltinSources {
    root: root.to_path_buf(),
    now: Local::now(),
    revision: Some("abcdef0123".to_string()),
    script_exe: "make".to_string(),
    script_name: "./make".to_string(),
  };
  VariableStore::from_sources(&sources, Vec::new()).unwrap()
}

/// Program arguments with the program name prepended.
pub fn argv(args: &[&str]) -> Vec<String> {
  std::iter::once("make").chain(args.iter().copied()).map(String::from).collect()
}

pub fn read(path: &Path) -> String {
  std::fs::read_to_string(path).unwrap_or_else(|e| panic!("Failed to read {}: {}", path.display(), e))
}

pub fn build_lines(text: &str) -> Vec<&str> {
  text.lines().filter(|line| line.starts_with("build ")).collect()
}
