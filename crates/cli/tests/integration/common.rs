//! Shared test helpers for CLI integration tests.

use std::path::{MAIN_SEPARATOR_STR, Path, PathBuf};

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use tempfile::TempDir;

/// Minimal C source file.
pub const MAIN_C: &str = "int main(void) { return 0; }\n";

/// Isolated project directory.
///
/// Each test gets its own temporary directory that the script runs in.
pub struct TestEnv {
  pub temp: TempDir,
}

impl TestEnv {
  /// Create an empty project.
  pub fn empty() -> Self {
    Self {
      temp: TempDir::new().unwrap(),
    }
  }

  /// Create a project with the given C sources (paths relative to the root).
  pub fn with_sources(paths: &[&str]) -> Self {
    let env = Self::empty();
    for path in paths {
      env.write_file(path, MAIN_C);
    }
    env
  }

  /// Write a file relative to the project root.
  pub fn write_file(&self, relative_path: &str, content: &str) {
    let path = self.temp.path().join(relative_path);
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, content).unwrap();
  }

  pub fn path(&self, relative_path: &str) -> PathBuf {
    self.temp.path().join(relative_path)
  }

  /// Contents of the generated `build.ninja`.
  pub fn ninja_file(&self) -> String {
    std::fs::read_to_string(self.path("build.ninja")).unwrap_or_else(|e| panic!("Failed to read build.ninja: {}", e))
  }

  /// Get a Command for the ninjagen binary running in the project root.
  pub fn ninjagen_cmd(&self) -> Command {
    let mut cmd: Command = cargo_bin_cmd!("ninjagen");
    cmd.current_dir(self.temp.path());
    cmd.env_remove("RUST_LOG");
    cmd
  }
}

/// `path` with `/` replaced by the platform separator.
pub fn native(path: &str) -> String {
  path.replace('/', MAIN_SEPARATOR_STR)
}

/// Lines of `text` that are build statements.
pub fn build_lines(text: &str) -> Vec<&str> {
  text.lines().filter(|line| line.starts_with("build ")).collect()
}

/// The per-configuration object directory used by the build statements.
pub fn object_dir(text: &str) -> String {
  let line = build_lines(text)
    .into_iter()
    .find(|line| line.contains(": cc "))
    .expect("no compile statement");
  let output = line.trim_start_matches("build ").split(':').next().unwrap();
  let dir = Path::new(output)
    .ancestors()
    .find(|dir| dir.file_name().is_some_and(|name| name == "obj"))
    .expect("object outside of `obj`");
  dir.to_string_lossy().into_owned()
}
