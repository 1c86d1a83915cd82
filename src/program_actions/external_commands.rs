use std::{
  env,
  path::{Path, PathBuf},
  process::{Command, ExitStatus}
};

use crate::{
  common::shell_quote,
  errors::{ZkError, ZkResult},
  logger,
  notebook::NOTEBOOK_DIR_ENV,
  notebook_config::Config
};

fn non_empty_env(name: &str) -> Option<String> {
  return env::var(name).ok().filter(|value| !value.trim().is_empty());
}

/// The shell running editors and aliases: `tool.shell`, then `$SHELL`, then `sh`.
pub fn shell_of(config: &Config) -> String {
  return config.tool.shell
    .clone()
    .or_else(|| non_empty_env("SHELL"))
    .unwrap_or_else(|| "sh".to_owned());
}

/// `tool.editor`, then `$ZK_EDITOR`, `$VISUAL` and `$EDITOR`.
pub fn editor_of(config: &Config) -> Option<String> {
  return config.tool.editor
    .clone()
    .filter(|editor| !editor.trim().is_empty())
    .or_else(|| non_empty_env("ZK_EDITOR"))
    .or_else(|| non_empty_env("VISUAL"))
    .or_else(|| non_empty_env("EDITOR"));
}

fn check_status(command_line: &str, status: ExitStatus) -> ZkResult<()> {
  if status.success() {
    return Ok(());
  }

  return Err(ZkError::ExternalCommand {
    command: command_line.to_owned(),
    reason: match status.code() {
      Some(code) => format!("exited with status {}", code),
      None => "terminated by a signal".to_owned()
    }
  });
}

/// Opens the files with the configured editor, from the notebook root.
pub fn open_in_editor(config: &Config, notebook_root: &Path, files: &[PathBuf]) -> ZkResult<()> {
  let editor: String = editor_of(config)
    .ok_or_else(|| ZkError::InvalidArguments(
      "no editor set: use tool.editor in the config, or ZK_EDITOR, VISUAL or EDITOR".to_owned()
    ))?;

  let quoted_files: Vec<String> = files
    .iter()
    .map(|file| shell_quote(&file.to_string_lossy()))
    .collect();
  let command_line: String = format!("{} {}", editor, quoted_files.join(" "));
  logger::verbose(format!("Running {}", command_line));

  let status: ExitStatus = Command::new(shell_of(config))
    .arg("-c")
    .arg(&command_line)
    .current_dir(notebook_root)
    .env(NOTEBOOK_DIR_ENV, notebook_root)
    .status()
    .map_err(|io_err| ZkError::ExternalCommand { command: command_line.clone(), reason: io_err.to_string() })?;

  return check_status(&command_line, status);
}

/*
  Runs an `[alias]` command line through the shell. The remaining CLI arguments are
  available to it as "$@", and ZK_NOTEBOOK_DIR points at the notebook when there is one.
*/
pub fn run_alias(
  config: &Config,
  alias_name: &str,
  args: &[String],
  notebook_root: Option<&Path>,
  working_dir: &Path
) -> ZkResult<()> {
  let command_line: &String = config.aliases
    .get(alias_name)
    .ok_or_else(|| ZkError::InvalidArguments(format!("unknown command '{}'", alias_name)))?;

  logger::verbose(format!("Running alias {}: {}", alias_name, command_line));

  let mut command: Command = Command::new(shell_of(config));
  command
    .arg("-c")
    .arg(command_line)
    .arg(alias_name)
    .args(args)
    .current_dir(working_dir);

  if let Some(root) = notebook_root {
    command.env(NOTEBOOK_DIR_ENV, root);
  }

  let status: ExitStatus = command
    .status()
    .map_err(|io_err| ZkError::ExternalCommand { command: command_line.clone(), reason: io_err.to_string() })?;

  return check_status(command_line, status);
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn configured_tools_win_over_the_environment() {
    let mut config: Config = Config::default();
    config.tool.editor = Some("nvim".to_owned());
    config.tool.shell = Some("/bin/bash".to_owned());

    assert_eq!(editor_of(&config).as_deref(), Some("nvim"));
    assert_eq!(shell_of(&config), "/bin/bash");
  }

  #[cfg(unix)]
  #[test]
  fn aliases_receive_their_arguments() {
    let dir = tempfile::tempdir().unwrap();
    let mut config: Config = Config::default();
    config.tool.shell = Some("sh".to_owned());
    config.aliases.insert("touchall".to_owned(), "touch \"$@\"".to_owned());

    run_alias(&config, "touchall", &["a.md".to_owned(), "b c.md".to_owned()], None, dir.path()).unwrap();

    assert!(dir.path().join("a.md").is_file());
    assert!(dir.path().join("b c.md").is_file());
  }

  #[cfg(unix)]
  #[test]
  fn failing_aliases_are_errors() {
    let dir = tempfile::tempdir().unwrap();
    let mut config: Config = Config::default();
    config.tool.shell = Some("sh".to_owned());
    config.aliases.insert("fail".to_owned(), "exit 3".to_owned());

    let result = run_alias(&config, "fail", &[], None, dir.path());
    assert!(matches!(result, Err(ZkError::ExternalCommand { reason, .. }) if reason.contains('3')));
    assert!(run_alias(&config, "missing", &[], None, dir.path()).is_err());
  }
}
