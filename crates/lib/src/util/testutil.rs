//! Test utilities for ninjagen-lib.

use std::cell::RefCell;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// An in-memory sink whose contents stay readable after the writer is moved
/// into a generator.
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer(Rc<RefCell<Vec<u8>>>);

impl SharedBuffer {
  pub fn contents(&self) -> String {
    String::from_utf8_lossy(&self.0.borrow()).into_owned()
  }
}

impl Write for SharedBuffer {
  fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
    self.0.borrow_mut().extend_from_slice(buf);
    Ok(buf.len())
  }

  fn flush(&mut self) -> io::Result<()> {
    Ok(())
  }
}

/// Create an empty file at `root/relative`, with parent directories.
pub fn touch(root: &Path, relative: &str) -> PathBuf {
  let path = root.join(relative);
  if let Some(parent) = path.parent() {
    std::fs::create_dir_all(parent).unwrap();
  }
  std::fs::write(&path, "").unwrap();
  path
}

/// Returns the command line that prints `msg` followed by a newline.
#[cfg(unix)]
pub fn echo_msg(msg: &str) -> Vec<String> {
  vec!["/bin/echo".to_string(), msg.to_string()]
}

#[cfg(windows)]
pub fn echo_msg(msg: &str) -> Vec<String> {
  vec!["cmd.exe".to_string(), "/C".to_string(), format!("echo {msg}")]
}

/// Returns a command line that exits with status `code`.
#[cfg(unix)]
pub fn exit_with(code: i32) -> Vec<String> {
  vec!["/bin/sh".to_string(), "-c".to_string(), format!("exit {code}")]
}

#[cfg(windows)]
pub fn exit_with(code: i32) -> Vec<String> {
  vec!["cmd.exe".to_string(), "/C".to_string(), format!("exit {code}")]
}
