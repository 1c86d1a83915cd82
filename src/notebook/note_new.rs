use std::{
  collections::BTreeMap,
  env,
  fs::{self, OpenOptions},
  io::Write,
  path::PathBuf
};

use chrono::{DateTime, Utc};

use serde::Serialize;

use crate::{
  note::id_generator::IdGenerator,
  notebook_config::GroupConfig,
  templates::{render_template, TemplateRenderer}
};

use super::{Notebook, NotebookError};

const MAX_ID_ATTEMPTS: usize = 50;
const FILENAME_TEMPLATE: &str = "filename";

#[derive(Debug, Clone)]
pub struct NewNoteOpts {
  /// Directory of the note, relative to the notebook root. Empty for the root.
  pub directory: String,
  /// Overrides the group matched from the directory.
  pub group: Option<String>,
  pub title: Option<String>,
  pub content: String,
  pub extra: BTreeMap<String, String>,
  pub date: DateTime<Utc>,
  pub dry_run: bool
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNote {
  /// Relative to the notebook root.
  pub path: String,
  pub absolute_path: PathBuf,
  pub content: String
}

/// Values available to the filename and body templates.
#[derive(Serialize)]
#[serde(rename_all = "kebab-case")]
struct NoteTemplateContext {
  id: String,
  title: String,
  content: String,
  dir: String,
  filename: String,
  filename_stem: String,
  extra: BTreeMap<String, String>,
  now: DateTime<Utc>,
  env: BTreeMap<String, String>
}

fn group_for(notebook: &Notebook, opts: &NewNoteOpts) -> Result<GroupConfig, NotebookError> {
  return match &opts.group {
    Some(group_name) => Ok(notebook.config.group_config_named(group_name)?),
    None => {
      let sample_path: String = match opts.directory.is_empty() {
        true => "_".to_owned(),
        false => format!("{}/_", opts.directory)
      };
      Ok(notebook.config.group_config_for_path(&sample_path)?)
    }
  }
}

fn join_relative(directory: &str, filename: &str) -> String {
  return match directory.is_empty() {
    true => filename.to_owned(),
    false => format!("{}/{}", directory.trim_end_matches('/'), filename)
  }
}

/*
  Creates a note from the group's templates. IDs are drawn until the rendered filename
  does not exist yet, up to MAX_ID_ATTEMPTS times. Nothing is written on a dry run.
*/
pub fn new_note(notebook: &Notebook, opts: &NewNoteOpts) -> Result<NewNote, NotebookError> {
  let group: GroupConfig = group_for(notebook, opts)?;
  let id_generator: IdGenerator = IdGenerator::new(&group.note.id_options)?;

  let mut extra: BTreeMap<String, String> = group.extra.clone();
  extra.extend(opts.extra.clone());

  let title: String = opts.title
    .clone()
    .filter(|title| !title.trim().is_empty())
    .unwrap_or_else(|| group.note.default_title.clone());

  let mut context = NoteTemplateContext {
    id: String::new(),
    title,
    content: opts.content.clone(),
    dir: opts.directory.clone(),
    filename: String::new(),
    filename_stem: String::new(),
    extra,
    now: opts.date,
    env: env::vars().collect()
  };

  let mut renderer: TemplateRenderer = TemplateRenderer::new();
  renderer.register(FILENAME_TEMPLATE, &group.note.filename_template)?;

  let mut relative_path: Option<String> = None;
  let mut last_attempt: String = String::new();

  for _ in 0..MAX_ID_ATTEMPTS {
    context.id = id_generator.generate();
    let filename_stem: String = renderer.render(FILENAME_TEMPLATE, &context)?;
    let filename: String = format!("{}.{}", filename_stem, group.note.extension);
    let candidate: String = join_relative(&opts.directory, &filename);

    if !notebook.root.join(&candidate).exists() {
      context.filename = filename;
      context.filename_stem = filename_stem;
      relative_path = Some(candidate);
      break;
    }
    last_attempt = candidate;
  }

  let path: String = relative_path.ok_or(NotebookError::NoteExists(last_attempt))?;

  let content: String = match &group.note.body_template_path {
    Some(template_name) => {
      let template_path: PathBuf = notebook.find_template(template_name)?;
      let template: String = fs::read_to_string(&template_path)
        .map_err(|io_err| NotebookError::io("Failed to read", &template_path, io_err))?;
      render_template(&template, &context)?
    },
    None => context.content.clone()
  };

  let absolute_path: PathBuf = notebook.root.join(&path);

  if !opts.dry_run {
    if let Some(parent) = absolute_path.parent() {
      fs::create_dir_all(parent)
        .map_err(|io_err| NotebookError::io("Failed to create directory", parent, io_err))?;
    }

    let mut file = OpenOptions::new()
      .write(true)
      .create_new(true)
      .open(&absolute_path)
      .map_err(|io_err| NotebookError::io("Failed to create", &absolute_path, io_err))?;
    file.write_all(content.as_bytes())
      .map_err(|io_err| NotebookError::io("Failed to write", &absolute_path, io_err))?;
  }

  return Ok(NewNote { path, absolute_path, content });
}
