use std::{
  fmt::Write as FmtWrite,
  fs::{self, File},
  io::{self, Write},
  path::{Path, PathBuf}
};

use colored::Colorize;

use crate::common::prompt::prompt_until_boolean;

use super::{DocsConfigRecord, DocsOptionKey, DocsValue, ValueKind};

const CONF_PY_HEADER: &str =
"# Configuration file for the Sphinx documentation builder.
#
# For the full list of built-in configuration values, see the documentation:
# https://www.sphinx-doc.org/en/master/usage/configuration.html";

struct Section {
  title: &'static str,
  anchor: &'static str,
  keys: &'static [DocsOptionKey]
}

const SECTIONS: [Section; 3] = [
  Section {
    title: "Project information",
    anchor: "project-information",
    keys: &[
      DocsOptionKey::Project,
      DocsOptionKey::Copyright,
      DocsOptionKey::Author,
      DocsOptionKey::Release
    ]
  },
  Section {
    title: "General configuration",
    anchor: "general-configuration",
    keys: &[
      DocsOptionKey::Extensions,
      DocsOptionKey::MystEnableExtensions,
      DocsOptionKey::SuppressWarnings,
      DocsOptionKey::TemplatesPath,
      DocsOptionKey::ExcludePatterns
    ]
  },
  Section {
    title: "Options for HTML output",
    anchor: "options-for-html-output",
    keys: &[
      DocsOptionKey::HtmlTheme,
      DocsOptionKey::HtmlStaticPath,
      DocsOptionKey::MasterDoc,
      DocsOptionKey::HtmlTitle
    ]
  }
];

fn python_string(text: &str) -> String {
  let mut quoted: String = String::with_capacity(text.len() + 2);
  quoted.push('"');

  for some_char in text.chars() {
    match some_char {
      '\\' => quoted.push_str("\\\\"),
      '"' => quoted.push_str("\\\""),
      '\n' => quoted.push_str("\\n"),
      '\r' => quoted.push_str("\\r"),
      '\t' => quoted.push_str("\\t"),
      other => quoted.push(other)
    }
  }

  quoted.push('"');
  return quoted;
}

fn python_list<'a>(items: impl Iterator<Item=&'a String>) -> String {
  let quoted: Vec<String> = items.map(|item| python_string(item)).collect();
  return format!("[{}]", quoted.join(", "));
}

// Sets are written as sorted lists, which is how conf.py files spell them.
fn python_literal(value: &DocsValue) -> String {
  return match value {
    DocsValue::Text(text) => python_string(text),
    DocsValue::List(items) => python_list(items.iter()),
    DocsValue::Set(items) => python_list(items.iter())
  }
}

fn placeholder_literal(key: DocsOptionKey) -> &'static str {
  return match key.value_kind() {
    ValueKind::Text => "\"\"",
    ValueKind::OrderedList | ValueKind::UnorderedSet => "[]"
  }
}

/// Writes the record as a Sphinx `conf.py`. Unset keys are written commented out.
pub fn render_conf_py(record: &DocsConfigRecord) -> String {
  let mut contents: String = String::from(CONF_PY_HEADER);

  for section in &SECTIONS {
    let _ = write!(
      contents,
      "\n\n# -- {} {}\n# https://www.sphinx-doc.org/en/master/usage/configuration.html#{}\n\n",
      section.title,
      "-".repeat(74usize.saturating_sub(section.title.len() + 6)),
      section.anchor
    );

    for key in section.keys {
      let _ = match record.value_of(*key) {
        Some(value) => writeln!(contents, "{} = {}", key, python_literal(&value)),
        None => writeln!(contents, "# {} = {}", key, placeholder_literal(*key))
      };
    }
  }

  return contents;
}

/*
  Writes <docs_dir>/conf.py. An existing file is only overwritten after the user agrees,
  or when assume_yes is given. Returns the written path, or None when skipped.
*/
pub fn write_conf_py_file(
  docs_dir: &Path,
  record: &DocsConfigRecord,
  assume_yes: bool
) -> io::Result<Option<PathBuf>> {
  let full_file_path: PathBuf = docs_dir.join("conf.py");
  let should_write_file: bool;

  if full_file_path.exists() && !assume_yes {
    should_write_file = prompt_until_boolean(
      &format!(
        "{} already exists. Do you want to overwrite it?",
        full_file_path.to_string_lossy().yellow()
      ),
      false
    )?;
  }
  else {
    should_write_file = true;
  }

  if !should_write_file {
    return Ok(None);
  }

  if !docs_dir.exists() {
    fs::create_dir_all(docs_dir)?;
  }

  let mut new_file: File = File::create(&full_file_path)?;
  write!(new_file, "{}", render_conf_py(record))?;
  return Ok(Some(full_file_path));
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::docs_config::{builtin_revision, parse_conf_py, BUILTIN_REVISION_NAMES};

  #[test]
  fn rendered_revisions_parse_back_to_the_same_record() {
    for revision_name in BUILTIN_REVISION_NAMES {
      let record: DocsConfigRecord = builtin_revision(revision_name).unwrap();
      let reparsed = parse_conf_py(&render_conf_py(&record)).unwrap();

      assert_eq!(reparsed.record, record, "{}", revision_name);
      assert!(reparsed.notices.is_empty());
    }
  }

  #[test]
  fn unset_keys_are_commented_out() {
    let rendered: String = render_conf_py(&builtin_revision("0.14.1").unwrap());

    assert!(rendered.contains("\n# html_title = \"\"\n"));
    assert!(rendered.contains("\nhtml_static_path = [\"_static\"]\n"));
    assert!(rendered.contains("\nexclude_patterns = [\".zk\"]\n"));
  }

  #[test]
  fn sets_are_written_sorted() {
    let rendered: String = render_conf_py(&builtin_revision("0.14.0").unwrap());
    assert!(rendered.contains("suppress_warnings = [\"myst.iref_ambiguous\", \"myst.xref_missing\"]"));
  }

  #[test]
  fn strings_are_escaped() {
    let mut record: DocsConfigRecord = DocsConfigRecord::default();
    record.project = Some("say \"hi\" \\ bye".to_owned());

    let rendered: String = render_conf_py(&record);
    assert!(rendered.contains(r#"project = "say \"hi\" \\ bye""#));
    assert_eq!(parse_conf_py(&rendered).unwrap().record, record);
  }

  #[test]
  fn existing_files_are_overwritten_with_assume_yes() {
    let docs_dir = tempfile::tempdir().unwrap();
    fs::write(docs_dir.path().join("conf.py"), "project = \"old\"\n").unwrap();

    let record: DocsConfigRecord = builtin_revision("0.14.1").unwrap();
    let written: Option<PathBuf> = write_conf_py_file(docs_dir.path(), &record, true).unwrap();

    assert_eq!(written, Some(docs_dir.path().join("conf.py")));
    let contents: String = fs::read_to_string(docs_dir.path().join("conf.py")).unwrap();
    assert_eq!(parse_conf_py(&contents).unwrap().record, record);
  }

  #[test]
  fn missing_docs_dir_is_created() {
    let root = tempfile::tempdir().unwrap();
    let docs_dir: PathBuf = root.path().join("docs");

    write_conf_py_file(&docs_dir, &DocsConfigRecord::default(), false).unwrap();
    assert!(docs_dir.join("conf.py").is_file());
  }
}
