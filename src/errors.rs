use std::io;

use thiserror::Error;

use crate::{
  docs_config::ConfPyError,
  note::NoteError,
  notebook::NotebookError,
  notebook_config::ConfigError,
  templates::TemplateError
};

/// Every failure a zk command can end with.
#[derive(Error, Debug)]
pub enum ZkError {
  #[error(transparent)]
  DocsConfig(#[from] ConfPyError),

  #[error(transparent)]
  Config(#[from] ConfigError),

  #[error(transparent)]
  Note(#[from] NoteError),

  #[error(transparent)]
  Notebook(#[from] NotebookError),

  #[error(transparent)]
  Template(#[from] TemplateError),

  #[error("Invalid arguments: {0}")]
  InvalidArguments(String),

  /// The docs record failed one or more checks. Details were already printed.
  #[error("{0} docs configuration {1} found")]
  FailedChecks(usize, &'static str),

  #[error("Failed to serialize output: {0}")]
  Serialize(String),

  #[error("Command `{command}` failed: {reason}")]
  ExternalCommand {
    command: String,
    reason: String
  },

  #[error(transparent)]
  Io(#[from] io::Error)
}

impl From<serde_json::Error> for ZkError {
  fn from(err: serde_json::Error) -> Self {
    return ZkError::Serialize(err.to_string());
  }
}

impl From<serde_yaml::Error> for ZkError {
  fn from(err: serde_yaml::Error) -> Self {
    return ZkError::Serialize(err.to_string());
  }
}

pub type ZkResult<T> = Result<T, ZkError>;

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn invalid_arguments_display() {
    let error = ZkError::InvalidArguments("--limit must be a number".to_string());
    assert_eq!(error.to_string(), "Invalid arguments: --limit must be a number");
  }

  #[test]
  fn io_errors_convert_transparently() {
    let io_err = io::Error::new(io::ErrorKind::NotFound, "missing.md");
    let error: ZkError = io_err.into();
    assert_eq!(error.to_string(), "missing.md");
  }

  #[test]
  fn error_is_send_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<ZkError>();
  }
}
