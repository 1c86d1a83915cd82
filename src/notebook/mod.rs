//! A directory of notes with a `.zk/` directory at its root.

pub mod file_walk;
pub mod note_index;
pub mod note_find;
pub mod note_new;
pub mod note_format;

use std::{
  env,
  fs,
  io,
  path::{Component, Path, PathBuf}
};

use thiserror::Error;

use crate::{
  logger,
  note::NoteError,
  notebook_config::{
    default_config_toml,
    expand_tilde,
    global_config_dir,
    open_config,
    open_global_config,
    Config,
    ConfigError,
    InitConfigOptions,
    DEFAULT_NOTE_TEMPLATE_CONTENTS,
    DEFAULT_NOTE_TEMPLATE_NAME
  },
  templates::TemplateError
};

use self::file_walk::ExcludeMatcher;

pub const NOTEBOOK_DIR_NAME: &str = ".zk";
pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const TEMPLATES_DIR_NAME: &str = "templates";
pub const NOTEBOOK_DIR_ENV: &str = "ZK_NOTEBOOK_DIR";

#[derive(Error, Debug)]
pub enum NotebookError {
  #[error("failed to find a notebook in '{0}'")]
  NotFound(String),

  #[error("a notebook already exists in '{0}'")]
  AlreadyExists(String),

  #[error("'{0}' is outside of the notebook")]
  OutsideNotebook(String),

  #[error("{action} '{path}': {reason}")]
  Io {
    action: &'static str,
    path: String,
    reason: String
  },

  #[error("Corrupted note index '{path}': {reason}")]
  Index {
    path: String,
    reason: String
  },

  #[error("Cannot find the note template '{0}'")]
  TemplateNotFound(String),

  #[error("{0}: note already exists")]
  NoteExists(String),

  #[error("{0}: unknown sorting term, try created, modified, path, title, random or word-count")]
  UnknownSorter(String),

  #[error("Invalid filter: {0}")]
  InvalidFilter(String),

  #[error(transparent)]
  Config(#[from] ConfigError),

  #[error(transparent)]
  Note(#[from] NoteError),

  #[error(transparent)]
  Template(#[from] TemplateError)
}

impl NotebookError {
  pub(crate) fn io(action: &'static str, path: &Path, io_err: io::Error) -> NotebookError {
    return NotebookError::Io {
      action,
      path: path.to_string_lossy().to_string(),
      reason: io_err.to_string()
    };
  }
}

#[derive(Debug, Clone)]
pub struct Notebook {
  /// Absolute path of the directory holding `.zk/`.
  pub root: PathBuf,
  pub config: Config
}

impl Notebook {
  pub fn dot_dir(&self) -> PathBuf {
    return self.root.join(NOTEBOOK_DIR_NAME);
  }

  pub fn exclude_matcher(&self) -> ExcludeMatcher {
    return ExcludeMatcher::new(&self.config.all_exclude_globs());
  }

  /*
    Path of the given file relative to the notebook root, with `/` separators.
    Relative inputs are taken from the working directory.
  */
  pub fn relative_path_of(&self, path: &Path, working_dir: &Path) -> Result<String, NotebookError> {
    let absolute: PathBuf = normalize_path(&working_dir.join(path));
    let outside = || NotebookError::OutsideNotebook(path.to_string_lossy().to_string());

    let relative: &Path = absolute.strip_prefix(&self.root).map_err(|_| outside())?;
    let parts: Vec<String> = relative
      .components()
      .map(|component| component.as_os_str().to_string_lossy().to_string())
      .collect();

    return Ok(parts.join("/"));
  }

  /*
    Finds a body template by name. Absolute paths are used as they are. Other names
    are looked up in the notebook's `.zk/templates/`, then in the global config
    directory's `templates/`.
  */
  pub fn find_template(&self, name: &str) -> Result<PathBuf, NotebookError> {
    let as_given: &Path = Path::new(name);
    if as_given.is_absolute() {
      return match as_given.is_file() {
        true => Ok(as_given.to_path_buf()),
        false => Err(NotebookError::TemplateNotFound(name.to_owned()))
      }
    }

    let mut candidates: Vec<PathBuf> = vec![self.dot_dir().join(TEMPLATES_DIR_NAME).join(name)];
    if let Some(global_dir) = global_config_dir() {
      candidates.push(global_dir.join(TEMPLATES_DIR_NAME).join(name));
    }

    return candidates
      .into_iter()
      .find(|candidate| candidate.is_file())
      .ok_or_else(|| NotebookError::TemplateNotFound(name.to_owned()));
  }
}

/// Lexically resolves `.` and `..` without touching the filesystem.
fn normalize_path(path: &Path) -> PathBuf {
  let mut normalized: PathBuf = PathBuf::new();

  for component in path.components() {
    match component {
      Component::CurDir => (),
      Component::ParentDir => { normalized.pop(); },
      other => normalized.push(other.as_os_str())
    }
  }

  return normalized;
}

fn absolute_dir(path: &Path) -> Result<PathBuf, NotebookError> {
  return fs::canonicalize(path)
    .map_err(|io_err| NotebookError::io("Failed to resolve", path, io_err));
}

/// The nearest directory at or above `path` containing `.zk/`.
pub fn locate_notebook(path: &Path) -> Option<PathBuf> {
  return path
    .ancestors()
    .find(|ancestor| ancestor.join(NOTEBOOK_DIR_NAME).is_dir())
    .map(Path::to_path_buf);
}

/*
  Opens the notebook holding the first candidate directory which resolves: the
  --notebook-dir flag, ZK_NOTEBOOK_DIR, the working directory, then the global
  notebook.dir setting. The notebook's own config is read over the global one.
*/
pub fn open_notebook(notebook_dir_flag: Option<&Path>, working_dir: &Path) -> Result<Notebook, NotebookError> {
  let global_config: Config = open_global_config()?;

  let mut candidates: Vec<PathBuf> = Vec::new();

  if let Some(flag_dir) = notebook_dir_flag {
    candidates.push(working_dir.join(flag_dir));
  }
  if let Some(env_dir) = env::var_os(NOTEBOOK_DIR_ENV).filter(|dir| !dir.is_empty()) {
    candidates.push(PathBuf::from(expand_tilde(&env_dir.to_string_lossy())));
  }
  candidates.push(working_dir.to_path_buf());
  if let Some(global_dir) = &global_config.notebook_dir {
    candidates.push(PathBuf::from(expand_tilde(global_dir)));
  }

  for candidate in &candidates {
    let resolved: PathBuf = match fs::canonicalize(candidate) {
      Ok(resolved) => resolved,
      Err(_) => {
        logger::verbose(format!("Skipping missing notebook candidate {}", candidate.display()));
        continue;
      }
    };

    if let Some(root) = locate_notebook(&resolved) {
      logger::verbose(format!("Using notebook at {}", root.display()));
      return open_notebook_at(root, &global_config);
    }
  }

  return Err(NotebookError::NotFound(working_dir.to_string_lossy().to_string()));
}

fn open_notebook_at(root: PathBuf, global_config: &Config) -> Result<Notebook, NotebookError> {
  let config_path: PathBuf = root.join(NOTEBOOK_DIR_NAME).join(CONFIG_FILE_NAME);
  let config: Config = open_config(&config_path, global_config, false)?;

  return Ok(Notebook { root, config });
}

fn write_new_file(path: &Path, contents: &str) -> Result<(), NotebookError> {
  if let Some(parent) = path.parent() {
    fs::create_dir_all(parent)
      .map_err(|io_err| NotebookError::io("Failed to create directory", parent, io_err))?;
  }

  return fs::write(path, contents)
    .map_err(|io_err| NotebookError::io("Failed to write", path, io_err));
}

/// Creates `.zk/config.toml` and the default note template in `path`.
pub fn init_notebook(path: &Path, options: &InitConfigOptions) -> Result<Notebook, NotebookError> {
  fs::create_dir_all(path)
    .map_err(|io_err| NotebookError::io("Failed to create directory", path, io_err))?;

  let root: PathBuf = absolute_dir(path)?;

  if let Some(existing) = locate_notebook(&root) {
    return Err(NotebookError::AlreadyExists(existing.to_string_lossy().to_string()));
  }

  let dot_dir: PathBuf = root.join(NOTEBOOK_DIR_NAME);
  write_new_file(&dot_dir.join(CONFIG_FILE_NAME), &default_config_toml(options))?;
  write_new_file(
    &dot_dir.join(TEMPLATES_DIR_NAME).join(DEFAULT_NOTE_TEMPLATE_NAME),
    DEFAULT_NOTE_TEMPLATE_CONTENTS
  )?;

  return open_notebook_at(root, &Config::default());
}
