use std::path::{Path, PathBuf};

use colored::Colorize;

use crate::{
  cli_config::clap_cli_config::{DocsCheckCommand, DocsDiffCommand, DocsFormatIn, DocsGenCommand, DocsShowCommand},
  errors::{ZkError, ZkResult},
  logger,
  docs_config::{
    builtin_revision,
    check_record,
    diff_records,
    latest_revision,
    load_conf_py,
    render_conf_py,
    write_conf_py_file,
    ConfPyLoad,
    ConfigIssue,
    DocsConfigRecord,
    DocsOptionKey,
    DriftEntry,
    IssueSeverity,
    BUILTIN_REVISION_NAMES
  }
};

fn load_record_at(path: &Path) -> ZkResult<DocsConfigRecord> {
  let loaded: ConfPyLoad = load_conf_py(path)?;

  for notice in &loaded.notices {
    logger::verbose(format!("{}: {}", path.to_string_lossy(), notice));
  }

  return Ok(loaded.record);
}

/// A built-in revision name, or else a path to a conf.py.
fn load_record_named(name_or_path: &str, working_dir: &Path) -> ZkResult<DocsConfigRecord> {
  if BUILTIN_REVISION_NAMES.contains(&name_or_path) {
    return Ok(builtin_revision(name_or_path)?);
  }

  return load_record_at(&working_dir.join(name_or_path));
}

fn print_issue(issue: &ConfigIssue) {
  let label = match issue.severity {
    IssueSeverity::Error => "error".red(),
    IssueSeverity::Warning => "warning".yellow()
  };

  println!("{}: {}", label, issue);
}

pub fn check(working_dir: &Path, command: &DocsCheckCommand) -> ZkResult<()> {
  let path: PathBuf = working_dir.join(&command.path);
  let record: DocsConfigRecord = load_record_at(&path)?;
  let issues: Vec<ConfigIssue> = check_record(&record);

  issues.iter().for_each(print_issue);

  let error_count: usize = issues.iter().filter(|issue| issue.is_error()).count();
  if error_count > 0 {
    return Err(ZkError::FailedChecks(error_count, if error_count == 1 { "error" } else { "errors" }));
  }

  println!("{} {}", path.to_string_lossy().green(), "is a valid docs configuration");
  return Ok(());
}

pub fn show(working_dir: &Path, command: &DocsShowCommand) -> ZkResult<()> {
  let record: DocsConfigRecord = match &command.revision {
    Some(revision) => builtin_revision(revision)?,
    None => load_record_at(&working_dir.join(&command.path))?
  };

  let rendered: String = match command.format {
    DocsFormatIn::Yaml => serde_yaml::to_string(&record)?,
    DocsFormatIn::Json => serde_json::to_string_pretty(&record)? + "\n",
    DocsFormatIn::ConfPy => render_conf_py(&record)
  };

  print!("{}", rendered);
  return Ok(());
}

pub fn diff(working_dir: &Path, command: &DocsDiffCommand) -> ZkResult<()> {
  let before: DocsConfigRecord = load_record_named(&command.before, working_dir)?;
  let after: DocsConfigRecord = load_record_named(&command.after, working_dir)?;
  let entries: Vec<DriftEntry> = diff_records(&before, &after);

  if entries.is_empty() {
    println!("No differences between {} and {}", command.before, command.after);
  }

  for entry in &entries {
    println!("{}", entry.colored_line());
  }

  return Ok(());
}

pub fn generate(working_dir: &Path, command: &DocsGenCommand) -> ZkResult<()> {
  let record: DocsConfigRecord = match &command.revision {
    Some(revision) => builtin_revision(revision)?,
    None => latest_revision()?
  };

  match write_conf_py_file(&working_dir.join(&command.directory), &record, command.yes)? {
    Some(written_path) => println!("Wrote {}", written_path.to_string_lossy().green()),
    None => println!("Left the existing conf.py untouched")
  }

  return Ok(());
}

pub fn keys() -> ZkResult<()> {
  for key in DocsOptionKey::all() {
    let requirement: &str = if key.is_core() { "core" } else { "optional" };

    println!(
      "{} {:<27} {:<9} {}",
      format!("{:<24}", key.name()).cyan(),
      key.value_kind().to_string(),
      requirement,
      key.description()
    );
  }

  return Ok(());
}
