//! Markdown notes: parsing, links, tags and ID generation.

mod tags;
mod links;
mod markdown_parser;
pub mod id_generator;
pub mod link_format;

use std::{
  collections::BTreeMap,
  fmt,
  fs,
  path::{Component, Path, PathBuf},
  time::SystemTime
};

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::{common::is_url, notebook_config::MarkdownConfig};

pub use markdown_parser::{parse_note_content, NoteContent};

#[derive(Error, Debug, PartialEq)]
pub enum NoteError {
  #[error("Invalid YAML frontmatter: {0}")]
  Frontmatter(String),

  #[error("Failed to read note '{path}': {reason}")]
  Read {
    path: String,
    reason: String
  },

  #[error("Invalid note ID options: {0}")]
  InvalidIdOptions(String)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LinkType {
  #[default]
  Markdown,
  WikiLink,
  Implicit
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkRelation {
  Up,
  Down
}

impl LinkRelation {
  pub fn from_name(name: &str) -> Option<LinkRelation> {
    return match name {
      "up" => Some(LinkRelation::Up),
      "down" => Some(LinkRelation::Down),
      _ => None
    }
  }
}

impl fmt::Display for LinkRelation {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      LinkRelation::Up => write!(f, "up"),
      LinkRelation::Down => write!(f, "down")
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Link {
  pub title: String,
  pub href: String,
  #[serde(rename = "type")]
  pub link_type: LinkType,
  pub is_external: bool,
  pub rels: Vec<LinkRelation>,
  pub snippet: String,
  pub snippet_start: usize,
  pub snippet_end: usize
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
  /// Relative to the notebook root, with `/` separators.
  pub path: String,
  pub title: String,
  pub lead: String,
  pub body: String,
  pub raw_content: String,
  pub word_count: usize,
  pub links: Vec<Link>,
  pub tags: Vec<String>,
  pub metadata: BTreeMap<String, JsonValue>,
  pub created: DateTime<Utc>,
  pub modified: DateTime<Utc>,
  pub checksum: String
}

impl Note {
  pub fn filename(&self) -> &str {
    return self.path.rsplit('/').next().unwrap_or(&self.path);
  }

  pub fn filename_stem(&self) -> &str {
    let filename: &str = self.filename();

    return match filename.rfind('.') {
      Some(dot_index) if dot_index > 0 => &filename[..dot_index],
      _ => filename
    }
  }

  pub fn absolute_path(&self, notebook_root: &Path) -> PathBuf {
    return notebook_root.join(&self.path);
  }
}

pub fn checksum_of(content: &[u8]) -> String {
  return Sha256::digest(content)
    .iter()
    .map(|byte| format!("{:02x}", byte))
    .collect();
}

/*
  Reads the `date` frontmatter value: RFC 3339, or "YYYY-MM-DD HH:MM:SS",
  "YYYY-MM-DD HH:MM" and "YYYY-MM-DD", taken as UTC.
*/
pub fn parse_date_value(date: &str) -> Option<DateTime<Utc>> {
  let date: &str = date.trim();

  if let Ok(with_offset) = DateTime::parse_from_rfc3339(date) {
    return Some(with_offset.with_timezone(&Utc));
  }

  for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"] {
    if let Ok(naive) = NaiveDateTime::parse_from_str(date, format) {
      return Some(naive.and_utc());
    }
  }

  return NaiveDate::parse_from_str(date, "%Y-%m-%d")
    .ok()
    .and_then(|day| day.and_hms_opt(0, 0, 0))
    .map(|naive| naive.and_utc());
}

fn creation_date_from(metadata: &BTreeMap<String, JsonValue>, file_metadata: Option<&fs::Metadata>) -> DateTime<Utc> {
  if let Some(JsonValue::String(date)) = metadata.get("date") {
    if let Some(created) = parse_date_value(date) {
      return created;
    }
  }

  return file_metadata
    .and_then(|file_metadata| file_metadata.created().ok())
    .map(DateTime::<Utc>::from)
    .unwrap_or_else(Utc::now);
}

/*
  Joins a relative href to the directory holding the note and normalizes it. The result
  is relative to the notebook root. Leading ".." components are kept.
*/
pub fn resolve_relative_href(note_dir: &str, href: &str) -> String {
  let mut components: Vec<String> = Vec::new();
  let joined: PathBuf = Path::new(note_dir).join(href);

  for component in joined.components() {
    match component {
      Component::CurDir => (),
      Component::ParentDir => {
        match components.last() {
          Some(last) if last != ".." => { components.pop(); },
          _ => components.push("..".to_owned())
        }
      },
      Component::Normal(part) => components.push(part.to_string_lossy().to_string()),
      Component::RootDir | Component::Prefix(_) => components.clear()
    }
  }

  return components.join("/");
}

pub fn note_dir_of(note_path: &str) -> &str {
  return match note_path.rfind('/') {
    Some(slash_index) => &note_path[..slash_index],
    None => ""
  }
}

/// Builds a note from its raw content. `path` is relative to the notebook root.
pub fn note_from_content(
  path: &str,
  raw_content: &str,
  file_metadata: Option<&fs::Metadata>,
  markdown_config: &MarkdownConfig
) -> Result<Note, NoteError> {
  let content: NoteContent = parse_note_content(raw_content, markdown_config)?;
  let note_dir: &str = note_dir_of(path);

  let links: Vec<Link> = content.links
    .into_iter()
    .map(|mut link| {
      if link.link_type == LinkType::Markdown && !is_url(&link.href) && !link.href.starts_with('#') {
        link.href = resolve_relative_href(note_dir, &link.href);
      }
      link
    })
    .collect();

  let modified: DateTime<Utc> = file_metadata
    .and_then(|file_metadata| file_metadata.modified().ok())
    .map(DateTime::<Utc>::from)
    .unwrap_or_else(|| DateTime::<Utc>::from(SystemTime::now()));

  return Ok(Note {
    path: path.to_owned(),
    title: content.title,
    lead: content.lead,
    body: content.body,
    raw_content: raw_content.to_owned(),
    word_count: raw_content.split_whitespace().count(),
    links,
    tags: content.tags,
    created: creation_date_from(&content.metadata, file_metadata),
    metadata: content.metadata,
    modified,
    checksum: checksum_of(raw_content.as_bytes())
  });
}

pub fn parse_note_file(
  notebook_root: &Path,
  path: &str,
  markdown_config: &MarkdownConfig
) -> Result<Note, NoteError> {
  let absolute_path: PathBuf = notebook_root.join(path);
  let read_error = |reason: String| NoteError::Read {
    path: absolute_path.to_string_lossy().to_string(),
    reason
  };

  let raw_content: String = fs::read_to_string(&absolute_path)
    .map_err(|io_err| read_error(io_err.to_string()))?;
  let file_metadata: Option<fs::Metadata> = fs::metadata(&absolute_path).ok();

  return note_from_content(path, &raw_content, file_metadata.as_ref(), markdown_config);
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::{Datelike, Timelike};

  #[test]
  fn dates_accept_the_common_formats() {
    let rfc3339: DateTime<Utc> = parse_date_value("2024-03-01T10:20:30+02:00").unwrap();
    assert_eq!(rfc3339.hour(), 8);

    let spaced: DateTime<Utc> = parse_date_value("2024-03-01 10:20:30").unwrap();
    assert_eq!((spaced.hour(), spaced.minute(), spaced.second()), (10, 20, 30));

    let short: DateTime<Utc> = parse_date_value("2024-03-01 10:20").unwrap();
    assert_eq!(short.minute(), 20);

    let day: DateTime<Utc> = parse_date_value("2024-03-01").unwrap();
    assert_eq!((day.year(), day.month(), day.day(), day.hour()), (2024, 3, 1, 0));

    assert!(parse_date_value("first of march").is_none());
  }

  #[test]
  fn checksum_is_sha256_hex() {
    assert_eq!(
      checksum_of(b"abc"),
      "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
    );
  }

  #[test]
  fn relative_hrefs_are_resolved_from_the_note_dir() {
    assert_eq!(resolve_relative_href("journal/2024", "../ideas/a.md"), "journal/ideas/a.md");
    assert_eq!(resolve_relative_href("", "./a.md"), "a.md");
    assert_eq!(resolve_relative_href("", "../outside.md"), "../outside.md");
  }

  #[test]
  fn note_from_content_fills_every_field() {
    let note: Note = note_from_content(
      "journal/today.md",
      "---\ndate: 2020-11-22 16:27:45\n---\n# Today\n\nSee [idea](../ideas/one.md) #daily",
      None,
      &MarkdownConfig::default()
    ).unwrap();

    assert_eq!(note.title, "Today");
    assert_eq!(note.filename(), "today.md");
    assert_eq!(note.filename_stem(), "today");
    assert_eq!(note.links[0].href, "ideas/one.md");
    assert_eq!(note.tags, vec!["daily"]);
    assert_eq!(note.word_count, 10);
    assert_eq!(note.created, parse_date_value("2020-11-22 16:27:45").unwrap());
    assert_eq!(note.checksum.len(), 64);
  }

  #[test]
  fn missing_files_are_read_errors() {
    let dir = tempfile::tempdir().unwrap();
    let result = parse_note_file(dir.path(), "missing.md", &MarkdownConfig::default());
    assert!(matches!(result, Err(NoteError::Read { .. })));
  }

  #[test]
  fn note_serializes_in_camel_case() {
    let note: Note = note_from_content("a.md", "# A", None, &MarkdownConfig::default()).unwrap();
    let json: JsonValue = serde_json::to_value(&note).unwrap();

    assert_eq!(json["wordCount"], 2);
    assert!(json.get("rawContent").is_some());
  }
}
