//! The documentation-builder configuration record (`docs/conf.py`).
//!
//! The record is declarative data consumed by Sphinx. This module reads it from a
//! `conf.py`, types it against the closed set of recognized options, checks it,
//! compares revisions and writes it back out. Nothing here renders documentation.

mod general_parser;
mod conf_py_parser;
mod checks;
mod drift;
mod writer;

use std::{collections::BTreeSet, fmt, fs, path::Path};

use enum_iterator::Sequence;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use conf_py_parser::{parse_conf_py, ConfPyLoad};
pub use checks::{check_record, ConfigIssue, IssueSeverity};
pub use drift::{diff_records, DriftEntry};
pub use writer::{render_conf_py, write_conf_py_file};

pub const DEFAULT_CONF_PY_PATH: &str = "docs/conf.py";
pub const NOTEBOOK_DIR_PATTERN: &str = ".zk";
pub const REQUIRED_EXTENSION: &str = "myst_parser";

#[derive(Error, Debug, PartialEq)]
pub enum ConfPyError {
  #[error("Syntax error on line {line}: {message}\n{pointer}")]
  Syntax {
    line: usize,
    message: String,
    pointer: String
  },

  #[error("'{key}' on line {line} must be {expected}, but a {found} was given")]
  WrongValueKind {
    key: DocsOptionKey,
    expected: ValueKind,
    found: &'static str,
    line: usize
  },

  #[error("'{key}' on line {line} is not a literal value. Only literal assignments are supported for recognized options")]
  UnsupportedValue {
    key: DocsOptionKey,
    line: usize
  },

  #[error("Failed to read '{path}': {reason}")]
  Read {
    path: String,
    reason: String
  },

  #[error("Unknown docs configuration revision '{0}'. Known revisions: {1}")]
  UnknownRevision(String, String)
}

/// Semantic type of a recognized option, fixed by the consumer's contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ValueKind {
  Text,
  OrderedList,
  UnorderedSet
}

impl fmt::Display for ValueKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let description: &str = match self {
      ValueKind::Text => "a string",
      ValueKind::OrderedList => "an ordered list of strings",
      ValueKind::UnorderedSet => "a set of strings"
    };
    write!(f, "{}", description)
  }
}

/// The closed set of options recognized in the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Sequence, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DocsOptionKey {
  Project,
  Copyright,
  Author,
  Release,
  Extensions,
  MystEnableExtensions,
  SuppressWarnings,
  TemplatesPath,
  ExcludePatterns,
  HtmlTheme,
  HtmlStaticPath,
  MasterDoc,
  HtmlTitle
}

impl DocsOptionKey {
  pub fn all() -> impl Iterator<Item=DocsOptionKey> {
    return enum_iterator::all::<DocsOptionKey>();
  }

  pub fn name(&self) -> &'static str {
    return match self {
      Self::Project => "project",
      Self::Copyright => "copyright",
      Self::Author => "author",
      Self::Release => "release",
      Self::Extensions => "extensions",
      Self::MystEnableExtensions => "myst_enable_extensions",
      Self::SuppressWarnings => "suppress_warnings",
      Self::TemplatesPath => "templates_path",
      Self::ExcludePatterns => "exclude_patterns",
      Self::HtmlTheme => "html_theme",
      Self::HtmlStaticPath => "html_static_path",
      Self::MasterDoc => "master_doc",
      Self::HtmlTitle => "html_title"
    }
  }

  pub fn from_name(name: &str) -> Option<DocsOptionKey> {
    return Self::all().find(|key| key.name() == name);
  }

  pub fn value_kind(&self) -> ValueKind {
    return match self {
      Self::Project
        | Self::Copyright
        | Self::Author
        | Self::Release
        | Self::HtmlTheme
        | Self::MasterDoc
        | Self::HtmlTitle => ValueKind::Text,
      Self::Extensions
        | Self::TemplatesPath
        | Self::HtmlStaticPath => ValueKind::OrderedList,
      Self::MystEnableExtensions
        | Self::SuppressWarnings
        | Self::ExcludePatterns => ValueKind::UnorderedSet
    }
  }

  // Keys every zk docs revision is expected to set.
  pub fn is_core(&self) -> bool {
    return matches!(
      self,
      Self::Project
        | Self::Copyright
        | Self::Author
        | Self::Release
        | Self::Extensions
        | Self::HtmlTheme
        | Self::MasterDoc
    );
  }

  pub fn description(&self) -> &'static str {
    return match self {
      Self::Project => "Display name of the documented project",
      Self::Copyright => "Copyright notice shown in generated output",
      Self::Author => "Author attribution",
      Self::Release => "Version shown in generated output",
      Self::Extensions => "Generator plugins to activate, in activation order",
      Self::MystEnableExtensions => "Sub-features enabled within the MyST plugin",
      Self::SuppressWarnings => "Warning categories silenced during generation",
      Self::TemplatesPath => "Locations searched for template overrides",
      Self::ExcludePatterns => "Glob patterns excluded from the input corpus",
      Self::HtmlTheme => "Visual theme applied to generated HTML",
      Self::HtmlStaticPath => "Locations of static assets copied into the output",
      Self::MasterDoc => "Root document of the generated tree",
      Self::HtmlTitle => "Override title shown in generated HTML"
    }
  }
}

impl fmt::Display for DocsOptionKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.name())
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum DocsValue {
  Text(String),
  List(Vec<String>),
  Set(BTreeSet<String>)
}

impl DocsValue {
  pub fn kind(&self) -> ValueKind {
    return match self {
      DocsValue::Text(_) => ValueKind::Text,
      DocsValue::List(_) => ValueKind::OrderedList,
      DocsValue::Set(_) => ValueKind::UnorderedSet
    }
  }
}

impl fmt::Display for DocsValue {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      DocsValue::Text(text) => write!(f, "{:?}", text),
      DocsValue::List(items) => write!(f, "[{}]", quoted_join(items.iter())),
      DocsValue::Set(items) => write!(f, "{{{}}}", quoted_join(items.iter()))
    }
  }
}

fn quoted_join<'a>(items: impl Iterator<Item=&'a String>) -> String {
  return items
    .map(|item| format!("{:?}", item))
    .collect::<Vec<String>>()
    .join(", ");
}

/// One revision of the docs configuration. Absent keys are `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocsConfigRecord {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub project: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub copyright: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub author: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub release: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub extensions: Option<Vec<String>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub myst_enable_extensions: Option<BTreeSet<String>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub suppress_warnings: Option<BTreeSet<String>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub templates_path: Option<Vec<String>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub exclude_patterns: Option<BTreeSet<String>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub html_theme: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub html_static_path: Option<Vec<String>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub master_doc: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub html_title: Option<String>
}

impl DocsConfigRecord {
  pub fn value_of(&self, key: DocsOptionKey) -> Option<DocsValue> {
    let text = |value: &Option<String>| value.clone().map(DocsValue::Text);
    let list = |value: &Option<Vec<String>>| value.clone().map(DocsValue::List);
    let set = |value: &Option<BTreeSet<String>>| value.clone().map(DocsValue::Set);

    return match key {
      DocsOptionKey::Project => text(&self.project),
      DocsOptionKey::Copyright => text(&self.copyright),
      DocsOptionKey::Author => text(&self.author),
      DocsOptionKey::Release => text(&self.release),
      DocsOptionKey::Extensions => list(&self.extensions),
      DocsOptionKey::MystEnableExtensions => set(&self.myst_enable_extensions),
      DocsOptionKey::SuppressWarnings => set(&self.suppress_warnings),
      DocsOptionKey::TemplatesPath => list(&self.templates_path),
      DocsOptionKey::ExcludePatterns => set(&self.exclude_patterns),
      DocsOptionKey::HtmlTheme => text(&self.html_theme),
      DocsOptionKey::HtmlStaticPath => list(&self.html_static_path),
      DocsOptionKey::MasterDoc => text(&self.master_doc),
      DocsOptionKey::HtmlTitle => text(&self.html_title)
    }
  }

  pub fn present_keys(&self) -> Vec<DocsOptionKey> {
    return DocsOptionKey::all()
      .filter(|key| self.value_of(*key).is_some())
      .collect();
  }

  /*
    Only used while a record is being built. The kind of the value must match the
    key's kind, otherwise the assignment is ignored.
  */
  pub(crate) fn assign(&mut self, key: DocsOptionKey, value: Option<DocsValue>) {
    fn as_text(value: Option<DocsValue>) -> Option<String> {
      return match value { Some(DocsValue::Text(text)) => Some(text), _ => None }
    }
    fn as_list(value: Option<DocsValue>) -> Option<Vec<String>> {
      return match value { Some(DocsValue::List(items)) => Some(items), _ => None }
    }
    fn as_set(value: Option<DocsValue>) -> Option<BTreeSet<String>> {
      return match value { Some(DocsValue::Set(items)) => Some(items), _ => None }
    }

    match key {
      DocsOptionKey::Project => self.project = as_text(value),
      DocsOptionKey::Copyright => self.copyright = as_text(value),
      DocsOptionKey::Author => self.author = as_text(value),
      DocsOptionKey::Release => self.release = as_text(value),
      DocsOptionKey::Extensions => self.extensions = as_list(value),
      DocsOptionKey::MystEnableExtensions => self.myst_enable_extensions = as_set(value),
      DocsOptionKey::SuppressWarnings => self.suppress_warnings = as_set(value),
      DocsOptionKey::TemplatesPath => self.templates_path = as_list(value),
      DocsOptionKey::ExcludePatterns => self.exclude_patterns = as_set(value),
      DocsOptionKey::HtmlTheme => self.html_theme = as_text(value),
      DocsOptionKey::HtmlStaticPath => self.html_static_path = as_list(value),
      DocsOptionKey::MasterDoc => self.master_doc = as_text(value),
      DocsOptionKey::HtmlTitle => self.html_title = as_text(value)
    }
  }
}

pub fn load_conf_py(path: impl AsRef<Path>) -> Result<ConfPyLoad, ConfPyError> {
  let path: &Path = path.as_ref();
  let source: String = fs::read_to_string(path)
    .map_err(|io_err| ConfPyError::Read {
      path: path.to_string_lossy().to_string(),
      reason: io_err.to_string()
    })?;

  return parse_conf_py(&source);
}

pub const BUILTIN_REVISION_NAMES: [&str; 2] = ["0.14.0", "0.14.1"];

fn string_set(items: &[&str]) -> BTreeSet<String> {
  return items.iter().map(|item| item.to_string()).collect();
}

fn string_list(items: &[&str]) -> Vec<String> {
  return items.iter().map(|item| item.to_string()).collect();
}

/*
  The two published revisions of the zk documentation record. They differ in the
  release string, and 0.14.0 sets html_title where 0.14.1 sets html_static_path.
*/
pub fn builtin_revision(name: &str) -> Result<DocsConfigRecord, ConfPyError> {
  let mut record = DocsConfigRecord {
    project: Some("zk".to_owned()),
    copyright: Some("2024, zk-org".to_owned()),
    author: Some("zk-org".to_owned()),
    release: None,
    extensions: Some(string_list(&["myst_parser"])),
    myst_enable_extensions: Some(string_set(&["colon_fence", "html_image"])),
    suppress_warnings: Some(string_set(&["myst.xref_missing", "myst.iref_ambiguous"])),
    templates_path: Some(string_list(&["_templates"])),
    exclude_patterns: Some(string_set(&[NOTEBOOK_DIR_PATTERN])),
    html_theme: Some("furo".to_owned()),
    html_static_path: None,
    master_doc: Some("index".to_owned()),
    html_title: None
  };

  match name {
    "0.14.0" => {
      record.release = Some("0.14.0".to_owned());
      record.html_title = Some("zk".to_owned());
    },
    "0.14.1" => {
      record.release = Some("0.14.1".to_owned());
      record.html_static_path = Some(string_list(&["_static"]));
    },
    unknown => return Err(ConfPyError::UnknownRevision(
      unknown.to_owned(),
      BUILTIN_REVISION_NAMES.join(", ")
    ))
  }

  return Ok(record);
}

pub fn latest_revision() -> Result<DocsConfigRecord, ConfPyError> {
  return builtin_revision(BUILTIN_REVISION_NAMES[BUILTIN_REVISION_NAMES.len() - 1]);
}

#[cfg(test)]
impl DocsConfigRecord {
  pub fn is_empty(&self) -> bool {
    return self.present_keys().is_empty();
  }

  /// A copy of the record with the given key left unset.
  pub fn without(&self, key: DocsOptionKey) -> DocsConfigRecord {
    let mut copy: DocsConfigRecord = self.clone();
    copy.assign(key, None);
    return copy;
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn every_key_round_trips_through_its_name() {
    for key in DocsOptionKey::all() {
      assert_eq!(DocsOptionKey::from_name(key.name()), Some(key));
    }
    assert_eq!(DocsOptionKey::all().count(), 13);
    assert_eq!(DocsOptionKey::from_name("html_theme_options"), None);
  }

  #[test]
  fn values_have_the_declared_kind_in_both_revisions() {
    for revision_name in BUILTIN_REVISION_NAMES {
      let record: DocsConfigRecord = builtin_revision(revision_name).unwrap();

      for key in record.present_keys() {
        let value: DocsValue = record.value_of(key).unwrap();
        assert_eq!(value.kind(), key.value_kind(), "{} in {}", key, revision_name);
      }
    }
  }

  #[test]
  fn exclude_patterns_is_exactly_the_notebook_dir_in_both_revisions() {
    for revision_name in BUILTIN_REVISION_NAMES {
      let record: DocsConfigRecord = builtin_revision(revision_name).unwrap();
      assert_eq!(record.exclude_patterns, Some(string_set(&[".zk"])));
    }
  }

  #[test]
  fn extensions_contain_myst_parser_in_both_revisions() {
    for revision_name in BUILTIN_REVISION_NAMES {
      let extensions: Vec<String> = builtin_revision(revision_name).unwrap().extensions.unwrap();
      assert!(!extensions.is_empty());
      assert!(extensions.iter().any(|extension| extension == REQUIRED_EXTENSION));
    }
  }

  #[test]
  fn removing_an_optional_key_leaves_the_others_untouched() {
    let record: DocsConfigRecord = latest_revision().unwrap();

    for removed in [DocsOptionKey::HtmlStaticPath, DocsOptionKey::HtmlTitle] {
      let trimmed: DocsConfigRecord = record.without(removed);
      assert!(trimmed.value_of(removed).is_none());

      for key in DocsOptionKey::all().filter(|key| *key != removed) {
        assert_eq!(trimmed.value_of(key), record.value_of(key), "{} changed", key);
      }
    }
  }

  #[test]
  fn unknown_revisions_are_rejected() {
    let err: ConfPyError = builtin_revision("9.9.9").unwrap_err();
    assert!(err.to_string().contains("0.14.0, 0.14.1"));
  }

  #[test]
  fn assign_ignores_values_of_the_wrong_kind() {
    let mut record: DocsConfigRecord = DocsConfigRecord::default();
    record.assign(DocsOptionKey::Project, Some(DocsValue::List(vec!["zk".to_owned()])));
    assert!(record.project.is_none());
    assert!(record.is_empty());
  }
}
