use std::{fmt, path::Path};

use chrono::{DateTime, Utc};
use glob::Pattern;
use walkdir::{DirEntry, WalkDir};

use crate::logger;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMetadata {
  pub path: String,
  pub modified: DateTime<Utc>
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffKind {
  Added,
  Modified,
  Removed
}

impl fmt::Display for DiffKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let marker: &str = match self {
      DiffKind::Added => "+",
      DiffKind::Modified => "~",
      DiffKind::Removed => "-"
    };
    write!(f, "{}", marker)
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffChange {
  pub path: String,
  pub kind: DiffKind
}

impl fmt::Display for DiffChange {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{} {}", self.kind, self.path)
  }
}

fn is_hidden(entry: &DirEntry) -> bool {
  return entry.file_name()
    .to_str()
    .map_or(false, |name| name.starts_with('.'));
}

fn relative_path_string(root: &Path, path: &Path) -> Option<String> {
  let relative: &Path = path.strip_prefix(root).ok()?;
  let parts: Vec<String> = relative
    .components()
    .map(|component| component.as_os_str().to_string_lossy().to_string())
    .collect();

  return Some(parts.join("/"));
}

/// Compiled exclude globs. Invalid globs are reported once and skipped.
pub struct ExcludeMatcher {
  patterns: Vec<Pattern>
}

impl ExcludeMatcher {
  pub fn new(globs: &[String]) -> Self {
    let mut patterns: Vec<Pattern> = Vec::new();

    for glob in globs {
      match Pattern::new(glob) {
        Ok(pattern) => patterns.push(pattern),
        Err(pattern_err) => logger::warn(format!("Ignoring invalid exclude glob '{}': {}", glob, pattern_err))
      }
    }

    return ExcludeMatcher { patterns };
  }

  pub fn is_excluded(&self, path: &str) -> bool {
    return self.patterns.iter().any(|pattern| pattern.matches(path));
  }
}

/*
  Every note file under the notebook root, sorted by path. Hidden files and directories
  are skipped, as are files without the note extension and paths matching an exclude glob.
*/
pub fn walk_note_files(root: &Path, extension: &str, exclude: &ExcludeMatcher) -> Vec<FileMetadata> {
  let mut files: Vec<FileMetadata> = Vec::new();
  let walker = WalkDir::new(root)
    .into_iter()
    .filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry));

  for entry_result in walker {
    let entry: DirEntry = match entry_result {
      Ok(entry) => entry,
      Err(walk_err) => {
        logger::warn(walk_err.to_string());
        continue;
      }
    };

    if !entry.file_type().is_file() {
      continue;
    }

    let has_extension: bool = entry.path()
      .extension()
      .map_or(false, |file_extension| file_extension == extension);

    if !has_extension {
      continue;
    }

    let path: String = match relative_path_string(root, entry.path()) {
      Some(path) => path,
      None => continue
    };

    if exclude.is_excluded(&path) {
      logger::verbose(format!("Excluded {}", path));
      continue;
    }

    let modified: DateTime<Utc> = match entry.metadata().ok().and_then(|metadata| metadata.modified().ok()) {
      Some(modified) => DateTime::<Utc>::from(modified),
      None => continue
    };

    files.push(FileMetadata { path, modified });
  }

  files.sort_by(|a, b| a.path.cmp(&b.path));
  return files;
}

/*
  Changes going from target (what is indexed) to source (what is on disk). Both lists
  are sorted by path. With force_modified, every file present on both sides is modified.
*/
pub fn diff_files(source: &[FileMetadata], target: &[FileMetadata], force_modified: bool) -> Vec<DiffChange> {
  let mut changes: Vec<DiffChange> = Vec::new();
  let mut source_index: usize = 0;
  let mut target_index: usize = 0;

  loop {
    let (kind, path) = match (source.get(source_index), target.get(target_index)) {
      (None, None) => break,
      (Some(source_file), None) => {
        source_index += 1;
        (DiffKind::Added, &source_file.path)
      },
      (None, Some(target_file)) => {
        target_index += 1;
        (DiffKind::Removed, &target_file.path)
      },
      (Some(source_file), Some(target_file)) if source_file.path == target_file.path => {
        source_index += 1;
        target_index += 1;

        if !force_modified && source_file.modified == target_file.modified {
          continue;
        }
        (DiffKind::Modified, &source_file.path)
      },
      (Some(source_file), Some(target_file)) => {
        if source_file.path < target_file.path {
          source_index += 1;
          (DiffKind::Added, &source_file.path)
        }
        else {
          target_index += 1;
          (DiffKind::Removed, &target_file.path)
        }
      }
    };

    changes.push(DiffChange { path: path.clone(), kind });
  }

  return changes;
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::TimeZone;
  use std::fs;

  fn file(path: &str, second: u32) -> FileMetadata {
    return FileMetadata {
      path: path.to_owned(),
      modified: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, second).unwrap()
    };
  }

  #[test]
  fn diff_reports_added_modified_and_removed() {
    let source = vec![file("a.md", 1), file("b.md", 2), file("d.md", 4)];
    let target = vec![file("a.md", 1), file("b.md", 9), file("c.md", 3)];

    let changes: Vec<String> = diff_files(&source, &target, false)
      .iter()
      .map(|change| change.to_string())
      .collect();

    assert_eq!(changes, vec!["~ b.md", "- c.md", "+ d.md"]);
  }

  #[test]
  fn forced_diff_marks_every_common_file() {
    let files = vec![file("a.md", 1), file("b.md", 2)];
    let changes: Vec<DiffChange> = diff_files(&files, &files, true);

    assert_eq!(changes.len(), 2);
    assert!(changes.iter().all(|change| change.kind == DiffKind::Modified));
  }

  #[test]
  fn empty_sides_are_all_added_or_removed() {
    let files = vec![file("a.md", 1)];
    assert_eq!(diff_files(&files, &[], false)[0].kind, DiffKind::Added);
    assert_eq!(diff_files(&[], &files, false)[0].kind, DiffKind::Removed);
  }

  #[test]
  fn walk_skips_hidden_excluded_and_foreign_files() {
    let root = tempfile::tempdir().unwrap();
    let write = |path: &str| {
      let full_path = root.path().join(path);
      fs::create_dir_all(full_path.parent().unwrap()).unwrap();
      fs::write(full_path, "# Note").unwrap();
    };

    write("index.md");
    write("a-b.md");
    write("a/b.md");
    write(".hidden.md");
    write(".zk/templates/default.md");
    write("drafts/wip.md");
    write("image.png");

    let exclude = ExcludeMatcher::new(&["drafts/*".to_owned()]);
    let paths: Vec<String> = walk_note_files(root.path(), "md", &exclude)
      .into_iter()
      .map(|file| file.path)
      .collect();

    assert_eq!(paths, vec!["a-b.md", "a/b.md", "index.md"]);
  }
}
