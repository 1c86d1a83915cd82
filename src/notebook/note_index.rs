use std::{
  collections::{BTreeMap, BTreeSet},
  fmt,
  fs,
  io::ErrorKind,
  path::{Path, PathBuf},
  time::{Duration, Instant}
};

use serde::{Deserialize, Serialize};

use crate::{
  common::pluralize,
  logger,
  note::{parse_note_file, Note}
};

use super::{
  file_walk::{diff_files, walk_note_files, DiffChange, DiffKind, FileMetadata},
  Notebook,
  NotebookError
};

/// Bumped whenever the parsed note layout changes, forcing a full reindex.
pub const INDEX_FORMAT_VERSION: u32 = 1;
pub const INDEX_FILE_NAME: &str = "notebook.json";

/// The parsed notes persisted in `.zk/notebook.json`, keyed by path.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct NoteIndex {
  pub version: u32,
  pub notes: BTreeMap<String, Note>
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoteIndexingStats {
  pub source_count: usize,
  pub added_count: usize,
  pub modified_count: usize,
  pub removed_count: usize,
  pub duration: Duration
}

fn rounded_duration(duration: Duration) -> String {
  let half_seconds: u128 = (duration.as_millis() + 250) / 500;

  return match half_seconds {
    0 => "0s".to_owned(),
    1 => "500ms".to_owned(),
    _ if half_seconds % 2 == 0 => format!("{}s", half_seconds / 2),
    _ => format!("{}.5s", half_seconds / 2)
  }
}

impl fmt::Display for NoteIndexingStats {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "Indexed {} {} in {}\n  + {} added\n  ~ {} modified\n  - {} removed",
      self.source_count,
      pluralize("note", self.source_count),
      rounded_duration(self.duration),
      self.added_count,
      self.modified_count,
      self.removed_count
    )
  }
}

/// Outgoing and incoming links between indexed notes, by note path.
#[derive(Debug, Default)]
pub struct LinkGraph {
  pub outgoing: BTreeMap<String, BTreeSet<String>>,
  pub incoming: BTreeMap<String, BTreeSet<String>>
}

impl LinkGraph {
  pub fn targets_of(&self, path: &str) -> impl Iterator<Item=&String> {
    return self.outgoing.get(path).into_iter().flatten();
  }

  pub fn sources_of(&self, path: &str) -> impl Iterator<Item=&String> {
    return self.incoming.get(path).into_iter().flatten();
  }
}

impl NoteIndex {
  pub fn path_in(notebook: &Notebook) -> PathBuf {
    return notebook.dot_dir().join(INDEX_FILE_NAME);
  }

  /*
    Reads the index. A missing file is an empty index. The flag is true when the
    stored index was written with another format version and must be rebuilt.
  */
  pub fn load(path: &Path) -> Result<(NoteIndex, bool), NotebookError> {
    let content: String = match fs::read_to_string(path) {
      Ok(content) => content,
      Err(io_err) if io_err.kind() == ErrorKind::NotFound => return Ok((NoteIndex::default(), true)),
      Err(io_err) => return Err(NotebookError::io("Failed to read", path, io_err))
    };

    let index: NoteIndex = match serde_json::from_str(&content) {
      Ok(index) => index,
      Err(json_err) => {
        logger::warn(format!("Rebuilding the note index: {}", json_err));
        return Ok((NoteIndex::default(), true));
      }
    };

    if index.version != INDEX_FORMAT_VERSION {
      logger::verbose(format!("Note index version {} is outdated, reindexing", index.version));
      return Ok((NoteIndex::default(), true));
    }

    return Ok((index, false));
  }

  pub fn save(&self, path: &Path) -> Result<(), NotebookError> {
    let json: String = serde_json::to_string(self)
      .map_err(|json_err| NotebookError::Index {
        path: path.to_string_lossy().to_string(),
        reason: json_err.to_string()
      })?;

    // Written next to the index first so an interrupted save keeps the old one.
    let temp_path: PathBuf = path.with_extension("json.tmp");
    fs::write(&temp_path, json)
      .map_err(|io_err| NotebookError::io("Failed to write", &temp_path, io_err))?;

    return fs::rename(&temp_path, path)
      .map_err(|io_err| NotebookError::io("Failed to write", path, io_err));
  }

  pub fn indexed_files(&self) -> Vec<FileMetadata> {
    return self.notes
      .values()
      .map(|note| FileMetadata { path: note.path.clone(), modified: note.modified })
      .collect();
  }

  /*
    The note an href points to: the exact path, the path with the note extension, or
    a note whose filename or filename stem equals the href. An anchor is ignored.
  */
  pub fn resolve_href(&self, href: &str, extension: &str) -> Option<&Note> {
    let without_anchor: &str = href.split('#').next().unwrap_or(href);
    let href: &str = without_anchor.trim_start_matches("./").trim_end_matches('/');

    if href.is_empty() {
      return None;
    }

    if let Some(note) = self.notes.get(href) {
      return Some(note);
    }

    if let Some(note) = self.notes.get(&format!("{}.{}", href, extension)) {
      return Some(note);
    }

    return self.notes
      .values()
      .find(|note| note.filename_stem() == href || note.filename() == href);
  }

  pub fn link_graph(&self, extension: &str) -> LinkGraph {
    let mut graph: LinkGraph = LinkGraph::default();

    for note in self.notes.values() {
      for link in note.links.iter().filter(|link| !link.is_external) {
        let target: &Note = match self.resolve_href(&link.href, extension) {
          Some(target) => target,
          None => continue
        };

        if target.path == note.path {
          continue;
        }

        graph.outgoing.entry(note.path.clone()).or_default().insert(target.path.clone());
        graph.incoming.entry(target.path.clone()).or_default().insert(note.path.clone());
      }
    }

    return graph;
  }

  /// Every tag with the number of notes carrying it.
  pub fn tag_counts(&self) -> BTreeMap<String, usize> {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();

    for note in self.notes.values() {
      for tag in &note.tags {
        *counts.entry(tag.clone()).or_insert(0) += 1;
      }
    }

    return counts;
  }
}

/*
  Brings the index up to date with the notes on disk and saves it. Each change is
  reported to the callback before being applied. A note failing to parse is logged and
  not counted. Its previous entry, if any, stays in the index until it parses again.
*/
pub fn index_notebook<F>(notebook: &Notebook, force: bool, mut on_change: F) -> Result<(NoteIndex, NoteIndexingStats), NotebookError>
  where F: FnMut(&DiffChange)
{
  let start_time: Instant = Instant::now();
  let index_path: PathBuf = NoteIndex::path_in(notebook);
  let (mut index, needs_reindexing) = NoteIndex::load(&index_path)?;
  let mut stats: NoteIndexingStats = NoteIndexingStats::default();

  let source: Vec<FileMetadata> = walk_note_files(
    &notebook.root,
    &notebook.config.note.extension,
    &notebook.exclude_matcher()
  );
  let target: Vec<FileMetadata> = index.indexed_files();

  for change in diff_files(&source, &target, force || needs_reindexing) {
    on_change(&change);

    match change.kind {
      DiffKind::Added | DiffKind::Modified => {
        match parse_note_file(&notebook.root, &change.path, &notebook.config.markdown) {
          Ok(note) => {
            index.notes.insert(change.path.clone(), note);

            if change.kind == DiffKind::Added {
              stats.added_count += 1;
            }
            else {
              stats.modified_count += 1;
            }
          },
          Err(note_err) => logger::error(note_err.to_string())
        }
      },
      DiffKind::Removed => {
        stats.removed_count += 1;
        index.notes.remove(&change.path);
      }
    }
  }

  index.version = INDEX_FORMAT_VERSION;
  index.save(&index_path)?;

  stats.source_count = source.len();
  stats.duration = start_time.elapsed();

  return Ok((index, stats));
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{notebook::init_notebook, notebook_config::InitConfigOptions};

  fn notebook_with(files: &[(&str, &str)]) -> (tempfile::TempDir, Notebook) {
    let dir = tempfile::tempdir().unwrap();
    let notebook: Notebook = init_notebook(dir.path(), &InitConfigOptions::default()).unwrap();

    for (path, content) in files {
      let full_path = notebook.root.join(path);
      fs::create_dir_all(full_path.parent().unwrap()).unwrap();
      fs::write(full_path, content).unwrap();
    }

    return (dir, notebook);
  }

  #[test]
  fn stats_display_like_the_index_command() {
    let stats = NoteIndexingStats {
      source_count: 1,
      added_count: 1,
      modified_count: 0,
      removed_count: 0,
      duration: Duration::from_millis(1300)
    };

    assert_eq!(stats.to_string(), "Indexed 1 note in 1.5s\n  + 1 added\n  ~ 0 modified\n  - 0 removed");
  }

  #[test]
  fn indexing_twice_only_applies_changes() {
    let (_dir, notebook) = notebook_with(&[("a.md", "# A"), ("journal/b.md", "# B")]);

    let (_, first) = index_notebook(&notebook, false, |_| ()).unwrap();
    assert_eq!((first.source_count, first.added_count), (2, 2));

    fs::remove_file(notebook.root.join("a.md")).unwrap();
    let mut changes: Vec<String> = Vec::new();
    let (index, second) = index_notebook(&notebook, false, |change| changes.push(change.to_string())).unwrap();

    assert_eq!(changes, vec!["- a.md"]);
    assert_eq!((second.source_count, second.added_count, second.removed_count), (1, 0, 1));
    assert_eq!(index.notes.keys().collect::<Vec<_>>(), vec!["journal/b.md"]);
  }

  #[test]
  fn forced_indexing_reparses_everything() {
    let (_dir, notebook) = notebook_with(&[("a.md", "# A")]);
    index_notebook(&notebook, false, |_| ()).unwrap();

    let (_, stats) = index_notebook(&notebook, true, |_| ()).unwrap();
    assert_eq!(stats.modified_count, 1);
  }

  #[test]
  fn notes_failing_to_parse_are_not_counted() {
    let (_dir, notebook) = notebook_with(&[("a.md", "# A")]);
    index_notebook(&notebook, false, |_| ()).unwrap();

    let broken: &str = "---\ntitle: [unclosed\n---\n";
    fs::write(notebook.root.join("a.md"), broken).unwrap();
    fs::write(notebook.root.join("b.md"), broken).unwrap();

    let (index, stats) = index_notebook(&notebook, true, |_| ()).unwrap();

    assert_eq!((stats.source_count, stats.added_count, stats.modified_count), (2, 0, 0));
    assert_eq!(index.notes.keys().collect::<Vec<_>>(), vec!["a.md"]);
    assert_eq!(index.notes["a.md"].title, "A");
  }

  #[test]
  fn outdated_index_versions_are_rebuilt() {
    let (_dir, notebook) = notebook_with(&[("a.md", "# A")]);
    let index_path: PathBuf = NoteIndex::path_in(&notebook);
    fs::write(&index_path, r#"{"version": 0, "notes": {}}"#).unwrap();

    let (_, needs_reindexing) = NoteIndex::load(&index_path).unwrap();
    assert!(needs_reindexing);
  }

  #[test]
  fn hrefs_resolve_by_path_extension_or_stem() {
    let (_dir, notebook) = notebook_with(&[
      ("ideas/one.md", "# One\n\n[[two]] and [three](three) and [web](https://example.com)"),
      ("two.md", "# Two"),
      ("ideas/three.md", "# Three")
    ]);
    let (index, _) = index_notebook(&notebook, false, |_| ()).unwrap();

    assert_eq!(index.resolve_href("two.md", "md").unwrap().title, "Two");
    assert_eq!(index.resolve_href("ideas/three", "md").unwrap().title, "Three");
    assert_eq!(index.resolve_href("one#section", "md").unwrap().title, "One");
    assert!(index.resolve_href("missing", "md").is_none());

    let graph: LinkGraph = index.link_graph("md");
    let targets: Vec<&String> = graph.targets_of("ideas/one.md").collect();
    assert_eq!(targets, vec!["ideas/three.md", "two.md"]);
    assert_eq!(graph.sources_of("two.md").collect::<Vec<_>>(), vec!["ideas/one.md"]);
  }

  #[test]
  fn tags_are_counted_per_note() {
    let (_dir, notebook) = notebook_with(&[("a.md", "#x #y"), ("b.md", "#x")]);
    let (index, _) = index_notebook(&notebook, false, |_| ()).unwrap();
    let counts: BTreeMap<String, usize> = index.tag_counts();

    assert_eq!(counts.get("x"), Some(&2));
    assert_eq!(counts.get("y"), Some(&1));
  }
}
