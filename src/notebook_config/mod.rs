//! Notebook settings, read from the global `config.toml` and the notebook's `.zk/config.toml`.

mod raw_config;
mod default_config;

use std::{
  collections::BTreeMap,
  env,
  fs,
  path::{Path, PathBuf}
};

use glob::Pattern;
use thiserror::Error;

use self::raw_config::{RawConfig, RawGroupConfig, RawNoteConfig};

pub use default_config::{default_config_toml, DEFAULT_NOTE_TEMPLATE_CONTENTS, DEFAULT_NOTE_TEMPLATE_NAME};

pub const CHARSET_ALPHANUM: &str = "0123456789abcdefghijklmnopqrstuvwxyz";
pub const CHARSET_HEX: &str = "0123456789abcdef";
pub const CHARSET_LETTERS: &str = "abcdefghijklmnopqrstuvwxyz";
pub const CHARSET_NUMBERS: &str = "0123456789";

#[derive(Error, Debug)]
pub enum ConfigError {
  #[error("Failed to read config '{path}': {reason}")]
  Read {
    path: String,
    reason: String
  },

  #[error("Failed to parse config '{path}': {reason}")]
  Toml {
    path: String,
    reason: String
  },

  #[error("notebook.dir should not be set on local configuration ('{0}')")]
  NotebookDirInLocalConfig(String),

  #[error("no group named `{0}` found in the config")]
  UnknownGroup(String),

  #[error("failed to match group {group} to {path}: {reason}")]
  InvalidGroupPath {
    group: String,
    path: String,
    reason: String
  },

  #[error("id-length must be at least 1 in '{0}'")]
  InvalidIdLength(String)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdCase {
  Lower,
  Upper,
  Mixed
}

impl IdCase {
  // Unknown values fall back to lowercase.
  pub fn from_name(name: &str) -> IdCase {
    return match name {
      "upper" => IdCase::Upper,
      "mixed" => IdCase::Mixed,
      _ => IdCase::Lower
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdOptions {
  pub length: usize,
  pub charset: Vec<char>,
  pub case: IdCase
}

impl IdOptions {
  // Named charsets, otherwise the given characters are the charset.
  pub fn charset_from_name(name: &str) -> Vec<char> {
    let charset: &str = match name {
      "alphanum" => CHARSET_ALPHANUM,
      "hex" => CHARSET_HEX,
      "letters" => CHARSET_LETTERS,
      "numbers" => CHARSET_NUMBERS,
      custom => custom
    };

    return charset.chars().collect();
  }
}

impl Default for IdOptions {
  fn default() -> Self {
    return IdOptions {
      length: 4,
      charset: CHARSET_ALPHANUM.chars().collect(),
      case: IdCase::Lower
    };
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteConfig {
  pub filename_template: String,
  pub extension: String,
  pub body_template_path: Option<String>,
  pub lang: String,
  pub default_title: String,
  pub id_options: IdOptions,
  pub exclude: Vec<String>
}

impl Default for NoteConfig {
  fn default() -> Self {
    return NoteConfig {
      filename_template: "{{id}}".to_owned(),
      extension: "md".to_owned(),
      body_template_path: None,
      lang: "en".to_owned(),
      default_title: "Untitled".to_owned(),
      id_options: IdOptions::default(),
      exclude: Vec::new()
    };
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkdownConfig {
  pub hashtags: bool,
  pub colon_tags: bool,
  pub multiword_tags: bool,
  pub link_format: String,
  pub link_encode_path: bool,
  pub link_drop_extension: bool
}

impl Default for MarkdownConfig {
  fn default() -> Self {
    return MarkdownConfig {
      hashtags: true,
      colon_tags: false,
      multiword_tags: false,
      link_format: "markdown".to_owned(),
      link_encode_path: true,
      link_drop_extension: true
    };
  }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolConfig {
  pub editor: Option<String>,
  pub shell: Option<String>
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupConfig {
  pub paths: Vec<String>,
  pub note: NoteConfig,
  pub extra: BTreeMap<String, String>
}

impl GroupConfig {
  /// The note exclude globs, joined to each of the group paths.
  pub fn exclude_globs(&self) -> Vec<String> {
    if self.paths.is_empty() {
      return self.note.exclude.clone();
    }

    return self.paths
      .iter()
      .flat_map(|group_path| self.note.exclude
        .iter()
        .map(move |glob| Path::new(group_path).join(glob).to_string_lossy().to_string())
      )
      .collect();
  }

  fn merged(&self, raw_group: &RawGroupConfig, name: &str) -> GroupConfig {
    let mut merged: GroupConfig = self.clone();

    match &raw_group.paths {
      Some(paths) => merged.paths.extend(paths.iter().cloned()),
      // A group without paths applies to the directory of the same name.
      None => merged.paths.push(name.to_owned())
    }

    merge_note_config(&mut merged.note, &raw_group.note);

    if let Some(extra) = &raw_group.extra {
      merged.extra.extend(extra.clone());
    }

    return merged;
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
  pub notebook_dir: Option<String>,
  pub note: NoteConfig,
  pub groups: BTreeMap<String, GroupConfig>,
  pub markdown: MarkdownConfig,
  pub tool: ToolConfig,
  pub filters: BTreeMap<String, String>,
  pub aliases: BTreeMap<String, String>,
  pub extra: BTreeMap<String, String>
}

impl Default for Config {
  fn default() -> Self {
    return Config {
      notebook_dir: None,
      note: NoteConfig::default(),
      groups: BTreeMap::new(),
      markdown: MarkdownConfig::default(),
      tool: ToolConfig::default(),
      filters: BTreeMap::new(),
      aliases: BTreeMap::new(),
      extra: BTreeMap::new()
    };
  }
}

impl Config {
  /// Settings for notes outside of every group.
  pub fn root_group_config(&self) -> GroupConfig {
    return GroupConfig {
      paths: Vec::new(),
      note: self.note.clone(),
      extra: self.extra.clone()
    };
  }

  pub fn group_config_named(&self, name: &str) -> Result<GroupConfig, ConfigError> {
    if name.is_empty() {
      return Ok(self.root_group_config());
    }

    return self.groups
      .get(name)
      .cloned()
      .ok_or_else(|| ConfigError::UnknownGroup(name.to_owned()));
  }

  /*
    Name of the group owning the path, relative to the notebook root. A group path
    matches as a glob or as a parent directory. The root group has the empty name.
  */
  pub fn group_name_for_path(&self, path: &str) -> Result<String, ConfigError> {
    for (name, group) in &self.groups {
      for group_path in &group.paths {
        let pattern: Pattern = Pattern::new(group_path)
          .map_err(|pattern_err| ConfigError::InvalidGroupPath {
            group: name.clone(),
            path: path.to_owned(),
            reason: pattern_err.to_string()
          })?;

        if pattern.matches(path) || path.starts_with(&format!("{}/", group_path)) {
          return Ok(name.clone());
        }
      }
    }

    return Ok(String::new());
  }

  pub fn group_config_for_path(&self, path: &str) -> Result<GroupConfig, ConfigError> {
    let name: String = self.group_name_for_path(path)?;
    return self.group_config_named(&name);
  }

  /// Exclude globs of the root notes and of every group.
  pub fn all_exclude_globs(&self) -> Vec<String> {
    let mut globs: Vec<String> = self.root_group_config().exclude_globs();

    for group in self.groups.values() {
      globs.extend(group.exclude_globs());
    }

    return globs;
  }
}

pub(crate) fn expand_tilde(path: &str) -> String {
  if let Some(after_home) = path.strip_prefix("~/") {
    if let Some(home_dir) = dirs::home_dir() {
      return home_dir.join(after_home).to_string_lossy().to_string();
    }
  }

  return path.to_owned();
}

fn merge_note_config(note: &mut NoteConfig, raw_note: &RawNoteConfig) {
  let non_empty = |value: &Option<String>| value.clone().filter(|text| !text.is_empty());

  if let Some(filename) = non_empty(&raw_note.filename) {
    note.filename_template = filename;
  }
  if let Some(extension) = non_empty(&raw_note.extension) {
    note.extension = extension;
  }
  if let Some(template) = non_empty(&raw_note.template) {
    note.body_template_path = Some(expand_tilde(&template));
  }
  if let Some(id_length) = raw_note.id_length.filter(|length| *length > 0) {
    note.id_options.length = id_length;
  }
  if let Some(id_charset) = non_empty(&raw_note.id_charset) {
    note.id_options.charset = IdOptions::charset_from_name(&id_charset);
  }
  if let Some(id_case) = non_empty(&raw_note.id_case) {
    note.id_options.case = IdCase::from_name(&id_case);
  }
  if let Some(lang) = non_empty(&raw_note.lang) {
    note.lang = lang;
  }
  if let Some(default_title) = non_empty(&raw_note.default_title) {
    note.default_title = default_title;
  }

  note.exclude.extend(raw_note.exclude.iter().cloned());
  note.exclude.extend(raw_note.ignore.iter().cloned());
}

/*
  Reads a TOML config over the given parent config. Settings absent from the TOML keep
  the parent's value. notebook.dir is only accepted in the global config.
*/
pub fn parse_config(
  content: &str,
  config_path: &Path,
  parent_config: &Config,
  is_global: bool
) -> Result<Config, ConfigError> {
  let path_string: String = config_path.to_string_lossy().to_string();
  let raw_config: RawConfig = toml::from_str(content)
    .map_err(|toml_err| ConfigError::Toml {
      path: path_string.clone(),
      reason: toml_err.to_string()
    })?;

  let mut config: Config = parent_config.clone();

  if let Some(notebook_dir) = raw_config.notebook.dir.filter(|dir| !dir.is_empty()) {
    if !is_global {
      return Err(ConfigError::NotebookDirInLocalConfig(path_string));
    }
    config.notebook_dir = Some(notebook_dir);
  }

  if raw_config.note.id_length == Some(0) {
    return Err(ConfigError::InvalidIdLength(path_string));
  }

  merge_note_config(&mut config.note, &raw_config.note);

  if let Some(extra) = raw_config.extra {
    config.extra.extend(extra);
  }

  for (name, raw_group) in &raw_config.groups {
    let parent_group: GroupConfig = match config.groups.get(name) {
      Some(existing) => existing.clone(),
      None => config.root_group_config()
    };

    config.groups.insert(name.clone(), parent_group.merged(raw_group, name));
  }

  let raw_markdown = raw_config.format.markdown;
  if let Some(hashtags) = raw_markdown.hashtags {
    config.markdown.hashtags = hashtags;
  }
  if let Some(colon_tags) = raw_markdown.colon_tags {
    config.markdown.colon_tags = colon_tags;
  }
  if let Some(multiword_tags) = raw_markdown.multiword_tags {
    config.markdown.multiword_tags = multiword_tags;
  }

  let link_format: Option<String> = raw_markdown.link_format
    .map(|format| if format.is_empty() { "markdown".to_owned() } else { format });

  if let Some(format) = &link_format {
    config.markdown.link_format = format.clone();
  }

  match (raw_markdown.link_encode_path, &link_format) {
    (Some(encode_path), _) => config.markdown.link_encode_path = encode_path,
    (None, Some(format)) => config.markdown.link_encode_path = format == "markdown",
    (None, None) => ()
  }

  if let Some(drop_extension) = raw_markdown.link_drop_extension {
    config.markdown.link_drop_extension = drop_extension;
  }

  if let Some(editor) = raw_config.tool.editor.filter(|editor| !editor.is_empty()) {
    config.tool.editor = Some(editor);
  }
  if let Some(shell) = raw_config.tool.shell.filter(|shell| !shell.is_empty()) {
    config.tool.shell = Some(shell);
  }

  if let Some(filters) = raw_config.filters {
    config.filters.extend(filters);
  }
  if let Some(aliases) = raw_config.aliases {
    config.aliases.extend(aliases);
  }

  return Ok(config);
}

/// Like `parse_config`, but a missing file leaves the parent config untouched.
pub fn open_config(config_path: &Path, parent_config: &Config, is_global: bool) -> Result<Config, ConfigError> {
  if !config_path.is_file() {
    return Ok(parent_config.clone());
  }

  let content: String = fs::read_to_string(config_path)
    .map_err(|io_err| ConfigError::Read {
      path: config_path.to_string_lossy().to_string(),
      reason: io_err.to_string()
    })?;

  return parse_config(&content, config_path, parent_config, is_global);
}

pub fn global_config_dir() -> Option<PathBuf> {
  let config_home: Option<PathBuf> = env::var_os("XDG_CONFIG_HOME")
    .filter(|dir| !dir.is_empty())
    .map(PathBuf::from)
    .or_else(dirs::config_dir);

  return config_home.map(|dir| dir.join("zk"));
}

pub fn global_config_path() -> Option<PathBuf> {
  return global_config_dir().map(|dir| dir.join("config.toml"));
}

pub fn open_global_config() -> Result<Config, ConfigError> {
  return match global_config_path() {
    Some(config_path) => open_config(&config_path, &Config::default(), true),
    None => Ok(Config::default())
  }
}

/// Flags given to `zk init`, baked into the generated config.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InitConfigOptions {
  pub wiki_links: bool,
  pub hashtags: bool,
  pub colon_tags: bool,
  pub multiword_tags: bool
}

impl Default for InitConfigOptions {
  fn default() -> Self {
    return InitConfigOptions {
      wiki_links: false,
      hashtags: true,
      colon_tags: false,
      multiword_tags: false
    };
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn parse(content: &str) -> Config {
    return parse_config(content, Path::new("config.toml"), &Config::default(), false).unwrap();
  }

  #[test]
  fn empty_config_keeps_the_defaults() {
    let config: Config = parse("");

    assert_eq!(config, Config::default());
    assert_eq!(config.note.filename_template, "{{id}}");
    assert_eq!(config.note.id_options.length, 4);
    assert!(config.markdown.hashtags);
    assert!(config.markdown.link_encode_path);
  }

  #[test]
  fn note_settings_override_the_parent() {
    let config: Config = parse(r#"
      [note]
      filename = "{{slug title}}"
      extension = "markdown"
      language = "fr"
      default-title = "Sans titre"
      id-charset = "hex"
      id-length = 8
      id-case = "upper"
      exclude = ["drafts/*"]
      ignore = ["log.md"]
    "#);

    assert_eq!(config.note.filename_template, "{{slug title}}");
    assert_eq!(config.note.extension, "markdown");
    assert_eq!(config.note.lang, "fr");
    assert_eq!(config.note.default_title, "Sans titre");
    assert_eq!(config.note.id_options.charset, CHARSET_HEX.chars().collect::<Vec<char>>());
    assert_eq!(config.note.id_options.length, 8);
    assert_eq!(config.note.id_options.case, IdCase::Upper);
    assert_eq!(config.note.exclude, vec!["drafts/*", "log.md"]);
  }

  #[test]
  fn notebook_dir_is_rejected_in_local_config() {
    let result = parse_config("[notebook]\ndir = \"~/notes\"", Path::new(".zk/config.toml"), &Config::default(), false);
    assert!(matches!(result, Err(ConfigError::NotebookDirInLocalConfig(_))));

    let global: Config = parse_config("[notebook]\ndir = \"~/notes\"", Path::new("config.toml"), &Config::default(), true).unwrap();
    assert_eq!(global.notebook_dir.as_deref(), Some("~/notes"));
  }

  #[test]
  fn link_format_drives_encoding_unless_given() {
    let wiki: Config = parse("[format.markdown]\nlink-format = \"wiki\"");
    assert_eq!(wiki.markdown.link_format, "wiki");
    assert!(!wiki.markdown.link_encode_path);

    let explicit: Config = parse("[format.markdown]\nlink-format = \"wiki\"\nlink-encode-path = true");
    assert!(explicit.markdown.link_encode_path);

    let empty: Config = parse("[format.markdown]\nlink-format = \"\"");
    assert_eq!(empty.markdown.link_format, "markdown");
    assert!(empty.markdown.link_encode_path);
  }

  #[test]
  fn groups_inherit_the_root_and_default_to_their_name() {
    let config: Config = parse(r#"
      [note]
      extension = "txt"

      [extra]
      author = "Mickaël"

      [group.journal]
      paths = ["journal/weekly", "journal/daily"]
      [group.journal.note]
      filename = "{{format-date now}}"
      [group.journal.extra]
      log = "a log"

      [group.ideas]
    "#);

    let journal: &GroupConfig = &config.groups["journal"];
    assert_eq!(journal.paths, vec!["journal/weekly", "journal/daily"]);
    assert_eq!(journal.note.filename_template, "{{format-date now}}");
    assert_eq!(journal.note.extension, "txt");
    assert_eq!(journal.extra.get("author").map(String::as_str), Some("Mickaël"));
    assert_eq!(journal.extra.get("log").map(String::as_str), Some("a log"));

    assert_eq!(config.groups["ideas"].paths, vec!["ideas"]);
  }

  #[test]
  fn group_names_match_globs_and_prefixes() {
    let config: Config = parse(r#"
      [group.journal]
      paths = ["journal/*"]
      [group.ideas]
    "#);

    assert_eq!(config.group_name_for_path("journal/2024-01-01.md").unwrap(), "journal");
    assert_eq!(config.group_name_for_path("ideas/sub/note.md").unwrap(), "ideas");
    assert_eq!(config.group_name_for_path("ideas.md").unwrap(), "");
    assert_eq!(config.group_name_for_path("other/note.md").unwrap(), "");
  }

  #[test]
  fn unknown_group_is_an_error() {
    let config: Config = Config::default();
    assert!(matches!(config.group_config_named("nope"), Err(ConfigError::UnknownGroup(_))));
    assert_eq!(config.group_config_named("").unwrap(), config.root_group_config());
  }

  #[test]
  fn exclude_globs_are_joined_to_group_paths() {
    let group = GroupConfig {
      paths: vec!["log".to_owned(), "journal".to_owned()],
      note: NoteConfig { exclude: vec!["*.tmp".to_owned()], ..NoteConfig::default() },
      extra: BTreeMap::new()
    };

    assert_eq!(group.exclude_globs(), vec!["log/*.tmp", "journal/*.tmp"]);
  }

  #[test]
  fn filters_and_aliases_merge_over_the_parent() {
    let global: Config = parse_config(
      "[filter]\nrecents = \"--sort created-\"\n[alias]\nls = \"zk list $@\"",
      Path::new("config.toml"),
      &Config::default(),
      true
    ).unwrap();
    let local: Config = parse_config("[alias]\ned = \"zk edit $@\"", Path::new(".zk/config.toml"), &global, false).unwrap();

    assert_eq!(local.filters.get("recents").map(String::as_str), Some("--sort created-"));
    assert_eq!(local.aliases.len(), 2);
  }

  #[test]
  fn unknown_tables_are_ignored() {
    let config: Config = parse("[lsp.diagnostics]\ndead-link = \"error\"\n[tool]\npager = \"less\"\neditor = \"nvim\"");
    assert_eq!(config.tool.editor.as_deref(), Some("nvim"));
  }

  #[test]
  fn zero_id_length_is_rejected() {
    let result = parse_config("[note]\nid-length = 0", Path::new("config.toml"), &Config::default(), false);
    assert!(matches!(result, Err(ConfigError::InvalidIdLength(_))));
  }

  #[test]
  fn generated_default_config_parses() {
    let options = InitConfigOptions { wiki_links: true, hashtags: false, colon_tags: true, multiword_tags: false };
    let config: Config = parse(&default_config_toml(&options));

    assert_eq!(config.note.body_template_path.as_deref(), Some("default.md"));
    assert_eq!(config.markdown.link_format, "wiki");
    assert!(!config.markdown.link_encode_path);
    assert!(!config.markdown.hashtags);
    assert!(config.markdown.colon_tags);
    assert!(config.filters.is_empty());
  }

  #[test]
  fn missing_config_file_keeps_the_parent() {
    let dir = tempfile::tempdir().unwrap();
    let config: Config = open_config(&dir.path().join("config.toml"), &Config::default(), false).unwrap();
    assert_eq!(config, Config::default());
  }
}
