use std::{collections::BTreeMap, path::Path};

use chrono::{DateTime, Utc};
use clap::Parser;

use crate::{
  common::split_shell_words,
  errors::{ZkError, ZkResult},
  logger,
  notebook::{
    note_find::{parse_date_filter, parse_day_range, LinkFilter, NoteFindOpts, NoteSorter},
    note_format::NoteFormat,
    Notebook
  },
  notebook_config::InitConfigOptions
};

use self::clap_cli_config::{
  FilterArgs,
  InitCommand,
  ListCommand,
  NamedFilterArgs,
  TagFormatIn,
  TagListCommand,
  TagSortIn
};

pub mod clap_cli_config;

impl From<&InitCommand> for InitConfigOptions {
  fn from(command: &InitCommand) -> Self {
    return InitConfigOptions {
      wiki_links: command.wiki_links,
      hashtags: !command.no_hashtags,
      colon_tags: command.colon_tags,
      multiword_tags: command.multiword_tags
    };
  }
}

pub struct ListOptions {
  pub format: NoteFormat,
  pub delimiter: String,
  pub quiet: bool
}

impl From<&ListCommand> for ListOptions {
  fn from(command: &ListCommand) -> Self {
    let format: NoteFormat = NoteFormat::from_name(&command.format);

    // JSON arrays and NUL delimited output bring their own separators.
    let delimiter: String =
      if command.delimiter0                 { "\0".to_owned() }
      else if format == NoteFormat::Json    { ",".to_owned() }
      else                                  { command.delimiter.clone() };

    return ListOptions {
      format,
      delimiter,
      quiet: command.quiet
    };
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagSort {
  Name,
  NoteCount
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagFormat {
  Name,
  Count,
  Json
}

pub struct TagListOptions {
  pub sort: TagSort,
  pub format: TagFormat,
  pub quiet: bool
}

impl From<&TagListCommand> for TagListOptions {
  fn from(command: &TagListCommand) -> Self {
    return TagListOptions {
      sort: match command.sort {
        TagSortIn::Name => TagSort::Name,
        TagSortIn::NoteCount => TagSort::NoteCount
      },
      format: match command.format {
        TagFormatIn::Name => TagFormat::Name,
        TagFormatIn::Count => TagFormat::Count,
        TagFormatIn::Json => TagFormat::Json
      },
      quiet: command.quiet
    };
  }
}

/// Parses repeated `key=value` flags.
pub fn parse_extra_values(pairs: &[String]) -> ZkResult<BTreeMap<String, String>> {
  let mut extra: BTreeMap<String, String> = BTreeMap::new();

  for pair in pairs {
    match pair.split_once('=') {
      Some((key, value)) if !key.trim().is_empty() => {
        extra.insert(key.trim().to_owned(), value.to_owned());
      },
      _ => return Err(ZkError::InvalidArguments(format!("expected key=value, got '{}'", pair)))
    }
  }

  return Ok(extra);
}

/*
  Replaces path arguments naming a `[filter]` entry with that entry's flags. Flags
  given on the command line win over single-valued flags of the named filter.
*/
pub fn expand_named_filters(args: FilterArgs, notebook: &Notebook) -> ZkResult<FilterArgs> {
  let mut expanded: FilterArgs = FilterArgs { paths: Vec::new(), ..args.clone() };

  for path in &args.paths {
    let filter_line: &String = match notebook.config.filters.get(path) {
      Some(filter_line) => filter_line,
      None => {
        expanded.paths.push(path.clone());
        continue;
      }
    };

    logger::verbose(format!("Expanding the named filter '{}': {}", path, filter_line));

    let words: Vec<String> = split_shell_words(filter_line)
      .map_err(|reason| ZkError::InvalidArguments(format!("filter '{}': {}", path, reason)))?;
    let named: FilterArgs = NamedFilterArgs::try_parse_from(words)
      .map_err(|clap_err| ZkError::InvalidArguments(format!("filter '{}': {}", path, clap_err)))?
      .filter;

    expanded.paths.extend(named.paths);
    expanded.match_strings.extend(named.match_strings);
    expanded.exclude.extend(named.exclude);
    expanded.tag.extend(named.tag);
    expanded.link_to.extend(named.link_to);
    expanded.linked_by.extend(named.linked_by);
    expanded.no_link_to.extend(named.no_link_to);
    expanded.no_linked_by.extend(named.no_linked_by);
    expanded.related.extend(named.related);
    expanded.mention.extend(named.mention);
    expanded.mentioned_by.extend(named.mentioned_by);
    expanded.sort.extend(named.sort);
    expanded.exact_match |= named.exact_match;
    expanded.path_regex |= named.path_regex;
    expanded.recursive |= named.recursive;
    expanded.orphan |= named.orphan;
    expanded.max_distance = expanded.max_distance.or(named.max_distance);
    expanded.created = expanded.created.or(named.created);
    expanded.modified = expanded.modified.or(named.modified);
    expanded.created_before = expanded.created_before.or(named.created_before);
    expanded.created_after = expanded.created_after.or(named.created_after);
    expanded.modified_before = expanded.modified_before.or(named.modified_before);
    expanded.modified_after = expanded.modified_after.or(named.modified_after);
    expanded.limit = expanded.limit.or(named.limit);
  }

  return Ok(expanded);
}

/// The negated paths are used when no plain path is given. Negated filters are never recursive.
fn link_filter_of(paths: Vec<String>, negated_paths: Vec<String>, args: &FilterArgs) -> Option<LinkFilter> {
  if !paths.is_empty() {
    return Some(LinkFilter {
      paths,
      recursive: args.recursive,
      max_distance: args.max_distance,
      negate: false
    });
  }

  if negated_paths.is_empty() {
    return None;
  }

  return Some(LinkFilter { paths: negated_paths, negate: true, ..LinkFilter::default() });
}

/// Turns the filtering flags into search options. Paths are taken from the working directory.
pub fn find_opts_from_args(
  args: FilterArgs,
  notebook: &Notebook,
  working_dir: &Path,
  now: DateTime<Utc>
) -> ZkResult<NoteFindOpts> {
  let args: FilterArgs = expand_named_filters(args, notebook)?;

  let to_notebook_paths = |paths: &[String]| -> ZkResult<Vec<String>> {
    if args.path_regex {
      return Ok(paths.to_vec());
    }

    return paths
      .iter()
      .map(|path| -> ZkResult<String> { Ok(notebook.relative_path_of(Path::new(path), working_dir)?) })
      .collect();
  };

  let include_paths: Vec<String> = to_notebook_paths(&args.paths)?;
  let exclude_paths: Vec<String> = to_notebook_paths(&args.exclude)?;
  let link_to_paths: Vec<String> = to_link_paths(&args.link_to, notebook, working_dir)?;
  let linked_by_paths: Vec<String> = to_link_paths(&args.linked_by, notebook, working_dir)?;
  let no_link_to_paths: Vec<String> = to_link_paths(&args.no_link_to, notebook, working_dir)?;
  let no_linked_by_paths: Vec<String> = to_link_paths(&args.no_linked_by, notebook, working_dir)?;

  if args.exact_match && !args.mention.is_empty() {
    return Err(ZkError::InvalidArguments("--exact-match and --mention cannot be used together".to_owned()));
  }

  let date_of = |date: &Option<String>| -> ZkResult<Option<DateTime<Utc>>> {
    return match date {
      Some(text) => Ok(Some(parse_date_filter(text, now)?)),
      None => Ok(None)
    }
  };

  // A whole day replaces the before and after bounds.
  let day_bounds = |day: &Option<String>, before: &Option<String>, after: &Option<String>|
    -> ZkResult<(Option<DateTime<Utc>>, Option<DateTime<Utc>>)>
  {
    return match day {
      Some(text) => {
        let (start, end) = parse_day_range(text, now)?;
        Ok((Some(end), Some(start)))
      },
      None => Ok((date_of(before)?, date_of(after)?))
    }
  };
  let (created_before, created_after) = day_bounds(&args.created, &args.created_before, &args.created_after)?;
  let (modified_before, modified_after) = day_bounds(&args.modified, &args.modified_before, &args.modified_after)?;

  let sorters: Vec<NoteSorter> = args.sort
    .iter()
    .map(|name| NoteSorter::from_name(name))
    .collect::<Result<_, _>>()?;

  return Ok(NoteFindOpts {
    match_strings: args.match_strings.clone(),
    exact_match: args.exact_match,
    include_paths,
    exclude_paths,
    path_regex: args.path_regex,
    tags: args.tag.clone(),
    link_to: link_filter_of(link_to_paths, no_link_to_paths, &args),
    linked_by: link_filter_of(linked_by_paths, no_linked_by_paths, &args),
    related: to_link_paths(&args.related, notebook, working_dir)?,
    mention: to_link_paths(&args.mention, notebook, working_dir)?,
    mentioned_by: to_link_paths(&args.mentioned_by, notebook, working_dir)?,
    orphan: args.orphan,
    created_before,
    created_after,
    modified_before,
    modified_after,
    sorters,
    limit: args.limit
  });
}

/// Link targets may also be bare note names, which are kept as written.
fn to_link_paths(paths: &[String], notebook: &Notebook, working_dir: &Path) -> ZkResult<Vec<String>> {
  return paths
    .iter()
    .map(|path| -> ZkResult<String> {
      if !path.contains('/') && !working_dir.join(path).exists() {
        return Ok(path.clone());
      }
      Ok(notebook.relative_path_of(Path::new(path), working_dir)?)
    })
    .collect();
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::notebook::init_notebook;

  fn notebook_with_filters(filters: &[(&str, &str)]) -> (tempfile::TempDir, Notebook) {
    let dir = tempfile::tempdir().unwrap();
    let mut notebook: Notebook = init_notebook(dir.path(), &InitConfigOptions::default()).unwrap();
    for (name, line) in filters {
      notebook.config.filters.insert(name.to_string(), line.to_string());
    }
    return (dir, notebook);
  }

  #[test]
  fn extra_values_need_an_equal_sign() {
    let extra = parse_extra_values(&["mood=calm".to_owned(), "empty=".to_owned()]).unwrap();
    assert_eq!(extra.get("mood").map(String::as_str), Some("calm"));
    assert_eq!(extra.get("empty").map(String::as_str), Some(""));

    assert!(parse_extra_values(&["nokey".to_owned()]).is_err());
  }

  #[test]
  fn named_filters_expand_into_flags() {
    let (_dir, notebook) = notebook_with_filters(&[("recents", "--sort created- --created-after 'last week' journal")]);
    let args = FilterArgs { paths: vec!["recents".to_owned()], limit: Some(3), ..FilterArgs::default() };

    let expanded: FilterArgs = expand_named_filters(args, &notebook).unwrap();

    assert_eq!(expanded.paths, vec!["journal"]);
    assert_eq!(expanded.sort, vec!["created-"]);
    assert_eq!(expanded.created_after.as_deref(), Some("last week"));
    assert_eq!(expanded.limit, Some(3));
  }

  #[test]
  fn find_opts_use_notebook_relative_paths() {
    let (_dir, notebook) = notebook_with_filters(&[]);
    let args = FilterArgs {
      paths: vec!["ideas".to_owned()],
      link_to: vec!["cargo".to_owned()],
      recursive: true,
      sort: vec!["title".to_owned()],
      created_after: Some("2024-01-01".to_owned()),
      ..FilterArgs::default()
    };

    let opts: NoteFindOpts = find_opts_from_args(args, &notebook, &notebook.root.join("journal"), Utc::now()).unwrap();

    assert_eq!(opts.include_paths, vec!["journal/ideas"]);
    assert_eq!(opts.link_to.unwrap().paths, vec!["cargo"]);
    assert!(opts.created_after.is_some());
    assert_eq!(opts.sorters.len(), 1);
  }

  #[test]
  fn negated_links_and_whole_days() {
    let (_dir, notebook) = notebook_with_filters(&[]);
    let now: DateTime<Utc> = Utc::now();
    let args = FilterArgs {
      no_link_to: vec!["cargo".to_owned()],
      created: Some("2024-03-10".to_owned()),
      mention: vec!["cargo".to_owned()],
      ..FilterArgs::default()
    };

    let opts: NoteFindOpts = find_opts_from_args(args, &notebook, &notebook.root, now).unwrap();
    let link_to: LinkFilter = opts.link_to.unwrap();

    assert!(link_to.negate);
    assert_eq!(link_to.paths, vec!["cargo"]);
    assert_eq!(opts.created_after, Some(parse_day_range("2024-03-10", now).unwrap().0));
    assert_eq!(opts.created_before, Some(parse_day_range("2024-03-11", now).unwrap().0));
    assert_eq!(opts.mention, vec!["cargo"]);

    let exact_mention = FilterArgs { mention: vec!["cargo".to_owned()], exact_match: true, ..FilterArgs::default() };
    assert!(find_opts_from_args(exact_mention, &notebook, &notebook.root, now).is_err());
  }

  #[test]
  fn bad_sorters_and_dates_are_rejected() {
    let (_dir, notebook) = notebook_with_filters(&[]);
    let bad_sort = FilterArgs { sort: vec!["size".to_owned()], ..FilterArgs::default() };
    let bad_date = FilterArgs { modified_before: Some("soon".to_owned()), ..FilterArgs::default() };

    assert!(find_opts_from_args(bad_sort, &notebook, &notebook.root, Utc::now()).is_err());
    assert!(find_opts_from_args(bad_date, &notebook, &notebook.root, Utc::now()).is_err());
  }
}
