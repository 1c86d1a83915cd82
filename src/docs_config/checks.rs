use std::fmt;

use serde::Serialize;

use super::{DocsConfigRecord, DocsOptionKey, DocsValue, NOTEBOOK_DIR_PATTERN, REQUIRED_EXTENSION};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum IssueSeverity {
  Warning,
  Error
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfigIssue {
  pub severity: IssueSeverity,
  pub key: DocsOptionKey,
  pub message: String
}

impl ConfigIssue {
  fn error(key: DocsOptionKey, message: impl Into<String>) -> Self {
    return ConfigIssue { severity: IssueSeverity::Error, key, message: message.into() };
  }

  fn warning(key: DocsOptionKey, message: impl Into<String>) -> Self {
    return ConfigIssue { severity: IssueSeverity::Warning, key, message: message.into() };
  }

  pub fn is_error(&self) -> bool {
    return self.severity == IssueSeverity::Error;
  }
}

impl fmt::Display for ConfigIssue {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}: {}", self.key, self.message)
  }
}

fn check_value_kinds(record: &DocsConfigRecord, issues: &mut Vec<ConfigIssue>) {
  for key in record.present_keys() {
    if let Some(value) = record.value_of(key) {
      if value.kind() != key.value_kind() {
        issues.push(ConfigIssue::error(
          key,
          format!("must be {}, found {}", key.value_kind(), value.kind())
        ));
      }
    }
  }
}

fn check_core_keys_present(record: &DocsConfigRecord, issues: &mut Vec<ConfigIssue>) {
  for key in DocsOptionKey::all().filter(|key| key.is_core()) {
    if record.value_of(key).is_none() {
      issues.push(ConfigIssue::warning(key, "is not set"));
    }
  }
}

fn check_exclude_patterns(record: &DocsConfigRecord, issues: &mut Vec<ConfigIssue>) {
  let key: DocsOptionKey = DocsOptionKey::ExcludePatterns;

  match &record.exclude_patterns {
    None => issues.push(ConfigIssue::error(
      key,
      format!("must be set and contain \"{}\" so the notebook directory is not documented", NOTEBOOK_DIR_PATTERN)
    )),
    Some(patterns) if !patterns.contains(NOTEBOOK_DIR_PATTERN) => issues.push(ConfigIssue::error(
      key,
      format!("must contain \"{}\"", NOTEBOOK_DIR_PATTERN)
    )),
    Some(patterns) if patterns.len() > 1 => issues.push(ConfigIssue::warning(
      key,
      format!("excludes more than \"{}\": {}", NOTEBOOK_DIR_PATTERN, DocsValue::Set(patterns.clone()))
    )),
    Some(_) => ()
  }
}

fn check_extensions(record: &DocsConfigRecord, issues: &mut Vec<ConfigIssue>) {
  let key: DocsOptionKey = DocsOptionKey::Extensions;

  match &record.extensions {
    Some(extensions) if extensions.is_empty() => {
      issues.push(ConfigIssue::error(key, "must not be empty"));
    },
    Some(extensions) if !extensions.iter().any(|extension| extension == REQUIRED_EXTENSION) => {
      issues.push(ConfigIssue::error(
        key,
        format!("must activate \"{}\" to read the Markdown pages", REQUIRED_EXTENSION)
      ));
    },
    Some(extensions) => {
      let mut seen: Vec<&String> = Vec::new();

      for extension in extensions {
        if seen.contains(&extension) {
          issues.push(ConfigIssue::warning(key, format!("activates \"{}\" more than once", extension)));
        }
        seen.push(extension);
      }
    },
    // Reported with the other missing core keys.
    None => ()
  }
}

fn check_myst_features(record: &DocsConfigRecord, issues: &mut Vec<ConfigIssue>) {
  let has_myst: bool = record.extensions
    .as_ref()
    .map_or(false, |extensions| extensions.iter().any(|extension| extension == REQUIRED_EXTENSION));

  if record.myst_enable_extensions.is_some() && !has_myst {
    issues.push(ConfigIssue::warning(
      DocsOptionKey::MystEnableExtensions,
      format!("has no effect unless \"{}\" is in extensions", REQUIRED_EXTENSION)
    ));
  }
}

/// Runs every check on the record. Errors come first, then warnings, each in key order.
pub fn check_record(record: &DocsConfigRecord) -> Vec<ConfigIssue> {
  let mut issues: Vec<ConfigIssue> = Vec::new();

  check_value_kinds(record, &mut issues);
  check_core_keys_present(record, &mut issues);
  check_exclude_patterns(record, &mut issues);
  check_extensions(record, &mut issues);
  check_myst_features(record, &mut issues);

  issues.sort_by(|a, b| b.severity.cmp(&a.severity).then(a.key.cmp(&b.key)));
  return issues;
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::docs_config::{builtin_revision, BUILTIN_REVISION_NAMES};
  use std::collections::BTreeSet;

  #[test]
  fn builtin_revisions_pass_every_check() {
    for revision_name in BUILTIN_REVISION_NAMES {
      let issues: Vec<ConfigIssue> = check_record(&builtin_revision(revision_name).unwrap());
      assert!(issues.is_empty(), "{}: {:?}", revision_name, issues);
    }
  }

  #[test]
  fn missing_notebook_exclusion_is_an_error() {
    let mut record: DocsConfigRecord = builtin_revision("0.14.1").unwrap();
    record.exclude_patterns = Some(BTreeSet::from(["_build".to_owned()]));

    let issues: Vec<ConfigIssue> = check_record(&record);
    assert_eq!(issues.len(), 1);
    assert!(issues[0].is_error());
    assert_eq!(issues[0].key, DocsOptionKey::ExcludePatterns);
  }

  #[test]
  fn extensions_without_myst_parser_are_rejected() {
    let mut record: DocsConfigRecord = builtin_revision("0.14.1").unwrap();
    record.extensions = Some(vec!["breathe".to_owned()]);

    let issues: Vec<ConfigIssue> = check_record(&record);
    assert!(issues.iter().any(|issue| issue.is_error() && issue.key == DocsOptionKey::Extensions));
    assert!(issues.iter().any(|issue| !issue.is_error() && issue.key == DocsOptionKey::MystEnableExtensions));
  }

  #[test]
  fn empty_extensions_are_rejected() {
    let mut record: DocsConfigRecord = builtin_revision("0.14.0").unwrap();
    record.extensions = Some(Vec::new());

    let issues: Vec<ConfigIssue> = check_record(&record);
    assert_eq!(issues[0].message, "must not be empty");
  }

  #[test]
  fn empty_record_reports_errors_before_warnings() {
    let issues: Vec<ConfigIssue> = check_record(&DocsConfigRecord::default());

    assert!(issues[0].is_error());
    assert_eq!(issues[0].key, DocsOptionKey::ExcludePatterns);
    assert_eq!(issues.iter().filter(|issue| !issue.is_error()).count(), 7);
  }

  #[test]
  fn removing_optional_keys_keeps_the_record_valid() {
    let record: DocsConfigRecord = builtin_revision("0.14.1").unwrap()
      .without(DocsOptionKey::HtmlStaticPath)
      .without(DocsOptionKey::HtmlTitle);

    assert!(check_record(&record).is_empty());
  }
}
