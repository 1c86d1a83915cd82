use std::{
  collections::BTreeMap,
  env,
  path::{Component, Path, PathBuf}
};

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::{
  note::{link_format::{format_link, LinkTarget}, Note},
  templates::{TemplateError, TemplateRenderer}
};

use super::{note_find::MatchedNote, Notebook};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoteFormat {
  Path,
  Link,
  Oneline,
  Short,
  Medium,
  Long,
  Full,
  Json,
  Jsonl,
  /// Handlebars template. Literal `\n` and `\t` are expanded.
  Custom(String)
}

const NOTE_TEMPLATE: &str = "note";

const ONELINE_TEMPLATE: &str = "{{style \"title\" title}} {{style \"path\" path}} ({{format-date created \"elapsed\"}})";

const SHORT_TEMPLATE: &str = "{{style \"title\" title}} {{style \"path\" path}} ({{format-date created \"elapsed\"}})

{{list snippets}}";

const MEDIUM_TEMPLATE: &str = "{{style \"title\" title}} {{style \"path\" path}}
Created: {{format-date created \"short\"}}

{{list snippets}}";

const LONG_TEMPLATE: &str = "{{style \"title\" title}} {{style \"path\" path}}
Created: {{format-date created \"short\"}}
Modified: {{format-date modified \"short\"}}

{{list snippets}}";

const FULL_TEMPLATE: &str = "{{style \"title\" title}} {{style \"path\" path}}
Created: {{format-date created \"short\"}}
Modified: {{format-date modified \"short\"}}
Tags: {{join tags \", \"}}

{{prepend \"  \" body}}
";

impl NoteFormat {
  pub fn from_name(name: &str) -> NoteFormat {
    return match name {
      "path" => NoteFormat::Path,
      "link" => NoteFormat::Link,
      "oneline" => NoteFormat::Oneline,
      "short" | "" => NoteFormat::Short,
      "medium" => NoteFormat::Medium,
      "long" => NoteFormat::Long,
      "full" => NoteFormat::Full,
      "json" => NoteFormat::Json,
      "jsonl" => NoteFormat::Jsonl,
      template => NoteFormat::Custom(template.replace("\\n", "\n").replace("\\t", "\t"))
    }
  }

  /// The template of the text formats. JSON formats have none.
  fn template(&self) -> Option<&str> {
    return match self {
      NoteFormat::Path => Some("{{path}}"),
      NoteFormat::Link => Some("{{link}}"),
      NoteFormat::Oneline => Some(ONELINE_TEMPLATE),
      NoteFormat::Short => Some(SHORT_TEMPLATE),
      NoteFormat::Medium => Some(MEDIUM_TEMPLATE),
      NoteFormat::Long => Some(LONG_TEMPLATE),
      NoteFormat::Full => Some(FULL_TEMPLATE),
      NoteFormat::Json | NoteFormat::Jsonl => None,
      NoteFormat::Custom(template) => Some(template)
    }
  }
}

/// A note as printed by `list --format json`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteJson<'a> {
  pub filename: &'a str,
  pub filename_stem: &'a str,
  pub path: &'a str,
  pub abs_path: String,
  pub title: &'a str,
  pub link: String,
  pub lead: &'a str,
  pub body: &'a str,
  pub snippets: &'a [String],
  pub raw_content: &'a str,
  pub word_count: usize,
  pub tags: &'a [String],
  pub metadata: &'a std::collections::BTreeMap<String, JsonValue>,
  pub created: DateTime<Utc>,
  pub modified: DateTime<Utc>,
  pub checksum: &'a str
}

/// Path of `target` as seen from `base`. Both are absolute.
pub fn relative_to(target: &Path, base: &Path) -> PathBuf {
  let target_parts: Vec<Component> = target.components().collect();
  let base_parts: Vec<Component> = base.components().collect();
  let common: usize = target_parts
    .iter()
    .zip(base_parts.iter())
    .take_while(|(a, b)| a == b)
    .count();

  let mut relative: PathBuf = PathBuf::new();
  for _ in common..base_parts.len() {
    relative.push("..");
  }
  for part in &target_parts[common..] {
    relative.push(part.as_os_str());
  }

  return relative;
}

/// Variables available to the text format templates.
#[derive(Serialize)]
#[serde(rename_all = "kebab-case")]
struct NoteTemplateContext<'a> {
  filename: &'a str,
  filename_stem: &'a str,
  /// Relative to the working directory.
  path: String,
  /// Relative to the notebook root.
  rel_path: &'a str,
  abs_path: String,
  title: &'a str,
  link: String,
  lead: &'a str,
  body: &'a str,
  snippets: &'a [String],
  raw_content: &'a str,
  word_count: usize,
  tags: &'a [String],
  metadata: &'a BTreeMap<String, JsonValue>,
  created: DateTime<Utc>,
  modified: DateTime<Utc>,
  checksum: &'a str,
  env: &'a BTreeMap<String, String>
}

pub struct NoteFormatter<'a> {
  pub format: NoteFormat,
  pub notebook: &'a Notebook,
  pub working_dir: PathBuf,
  renderer: TemplateRenderer,
  env: BTreeMap<String, String>
}

impl<'a> NoteFormatter<'a> {
  pub fn new(format: NoteFormat, notebook: &'a Notebook, working_dir: &Path) -> Result<Self, TemplateError> {
    let mut renderer: TemplateRenderer = TemplateRenderer::new();
    if let Some(template) = format.template() {
      renderer.register(NOTE_TEMPLATE, template)?;
    }

    return Ok(NoteFormatter {
      format,
      notebook,
      working_dir: working_dir.to_path_buf(),
      renderer,
      env: env::vars().collect()
    });
  }

  /// Path of the note relative to the working directory.
  fn display_path(&self, note: &Note) -> String {
    return relative_to(&note.absolute_path(&self.notebook.root), &self.working_dir)
      .to_string_lossy()
      .to_string();
  }

  pub fn link_to(&self, note: &Note) -> Result<String, TemplateError> {
    let abs_path: String = note.absolute_path(&self.notebook.root).to_string_lossy().to_string();
    let rel_path: String = self.display_path(note);

    return format_link(
      &LinkTarget { path: &note.path, rel_path: &rel_path, abs_path: &abs_path, title: &note.title },
      &self.notebook.config.markdown
    );
  }

  pub fn json_of<'n>(&self, matched: &'n MatchedNote<'n>) -> Result<NoteJson<'n>, TemplateError> {
    let note: &Note = matched.note;

    return Ok(NoteJson {
      filename: note.filename(),
      filename_stem: note.filename_stem(),
      path: &note.path,
      abs_path: note.absolute_path(&self.notebook.root).to_string_lossy().to_string(),
      title: &note.title,
      link: self.link_to(note)?,
      lead: &note.lead,
      body: &note.body,
      snippets: &matched.snippets,
      raw_content: &note.raw_content,
      word_count: note.word_count,
      tags: &note.tags,
      metadata: &note.metadata,
      created: note.created,
      modified: note.modified,
      checksum: &note.checksum
    });
  }

  fn template_context<'n>(&'n self, matched: &'n MatchedNote<'n>) -> Result<NoteTemplateContext<'n>, TemplateError> {
    let note: &Note = matched.note;

    return Ok(NoteTemplateContext {
      filename: note.filename(),
      filename_stem: note.filename_stem(),
      path: self.display_path(note),
      rel_path: &note.path,
      abs_path: note.absolute_path(&self.notebook.root).to_string_lossy().to_string(),
      title: &note.title,
      link: self.link_to(note)?,
      lead: &note.lead,
      body: &note.body,
      snippets: &matched.snippets,
      raw_content: &note.raw_content,
      word_count: note.word_count,
      tags: &note.tags,
      metadata: &note.metadata,
      created: note.created,
      modified: note.modified,
      checksum: &note.checksum,
      env: &self.env
    });
  }

  /// One note in the text formats, or as a single JSON line.
  pub fn format(&self, matched: &MatchedNote<'_>) -> Result<String, TemplateError> {
    return match &self.format {
      NoteFormat::Json | NoteFormat::Jsonl => serde_json::to_string(&self.json_of(matched)?)
        .map_err(|json_err| TemplateError::Render(json_err.to_string())),
      _ => self.renderer.render(NOTE_TEMPLATE, &self.template_context(matched)?)
    }
  }
}
