use std::fmt;

use colored::Colorize;
use serde::Serialize;

use super::{DocsConfigRecord, DocsOptionKey, DocsValue};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "change", rename_all = "lowercase")]
pub enum DriftKind {
  Added { value: DocsValue },
  Removed { value: DocsValue },
  Changed { before: DocsValue, after: DocsValue }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DriftEntry {
  pub key: DocsOptionKey,
  #[serde(flatten)]
  pub kind: DriftKind
}

impl DriftEntry {
  pub fn marker(&self) -> char {
    return match self.kind {
      DriftKind::Added { .. } => '+',
      DriftKind::Removed { .. } => '-',
      DriftKind::Changed { .. } => '~'
    }
  }

  pub fn colored_line(&self) -> String {
    let line: String = self.to_string();

    return match self.kind {
      DriftKind::Added { .. } => line.green().to_string(),
      DriftKind::Removed { .. } => line.red().to_string(),
      DriftKind::Changed { .. } => line.yellow().to_string()
    }
  }
}

impl fmt::Display for DriftEntry {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match &self.kind {
      DriftKind::Added { value } | DriftKind::Removed { value } =>
        write!(f, "{} {} = {}", self.marker(), self.key, value),
      DriftKind::Changed { before, after } =>
        write!(f, "{} {}: {} -> {}", self.marker(), self.key, before, after)
    }
  }
}

/// Key-by-key differences going from `before` to `after`, in key order.
pub fn diff_records(before: &DocsConfigRecord, after: &DocsConfigRecord) -> Vec<DriftEntry> {
  let mut entries: Vec<DriftEntry> = Vec::new();

  for key in DocsOptionKey::all() {
    let kind: Option<DriftKind> = match (before.value_of(key), after.value_of(key)) {
      (None, None) => None,
      (None, Some(value)) => Some(DriftKind::Added { value }),
      (Some(value), None) => Some(DriftKind::Removed { value }),
      (Some(old_value), Some(new_value)) if old_value != new_value =>
        Some(DriftKind::Changed { before: old_value, after: new_value }),
      (Some(_), Some(_)) => None
    };

    if let Some(kind) = kind {
      entries.push(DriftEntry { key, kind });
    }
  }

  return entries;
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::docs_config::builtin_revision;

  #[test]
  fn published_revisions_differ_in_three_keys() {
    let before: DocsConfigRecord = builtin_revision("0.14.0").unwrap();
    let after: DocsConfigRecord = builtin_revision("0.14.1").unwrap();

    let drift: Vec<DriftEntry> = diff_records(&before, &after);
    let keys: Vec<DocsOptionKey> = drift.iter().map(|entry| entry.key).collect();

    assert_eq!(keys, vec![DocsOptionKey::Release, DocsOptionKey::HtmlStaticPath, DocsOptionKey::HtmlTitle]);
    assert_eq!(drift[0].to_string(), "~ release: \"0.14.0\" -> \"0.14.1\"");
    assert_eq!(drift[1].to_string(), "+ html_static_path = [\"_static\"]");
    assert_eq!(drift[2].to_string(), "- html_title = \"zk\"");
  }

  #[test]
  fn identical_records_have_no_drift() {
    let record: DocsConfigRecord = builtin_revision("0.14.1").unwrap();
    assert!(diff_records(&record, &record.clone()).is_empty());
  }

  #[test]
  fn drift_serializes_with_a_change_tag() {
    let entry = DriftEntry {
      key: DocsOptionKey::HtmlTitle,
      kind: DriftKind::Removed { value: DocsValue::Text("zk".to_owned()) }
    };

    let json: serde_json::Value = serde_json::to_value(&entry).unwrap();
    assert_eq!(json["change"], "removed");
    assert_eq!(json["key"], "html_title");
    assert_eq!(json["value"], "zk");
  }
}
