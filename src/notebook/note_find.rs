use std::{
  cmp::Ordering,
  collections::{BTreeSet, VecDeque}
};

use chrono::{DateTime, Duration, Utc};
use rand::seq::SliceRandom;
use regex::Regex;
use serde_json::Value as JsonValue;

use crate::note::{parse_date_value, Note};

use super::{
  note_index::{LinkGraph, NoteIndex},
  NotebookError
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteSortField {
  Created,
  Modified,
  Path,
  Title,
  Random,
  WordCount
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoteSorter {
  pub field: NoteSortField,
  pub ascending: bool
}

impl NoteSorter {
  /// Parses `created`, `c+`, `word-count-` and the like.
  pub fn from_name(name: &str) -> Result<NoteSorter, NotebookError> {
    let field_name: &str = name.trim_end_matches(|c| c == '+' || c == '-');

    let (field, default_ascending) = match field_name {
      "created" | "c" => (NoteSortField::Created, false),
      "modified" | "m" => (NoteSortField::Modified, false),
      "path" | "p" => (NoteSortField::Path, true),
      "title" | "t" => (NoteSortField::Title, true),
      "random" | "r" => (NoteSortField::Random, true),
      "word-count" | "wc" => (NoteSortField::WordCount, true),
      _ => return Err(NotebookError::UnknownSorter(field_name.to_owned()))
    };

    let ascending: bool = match name.chars().last() {
      Some('+') => true,
      Some('-') => false,
      _ => default_ascending
    };

    return Ok(NoteSorter { field, ascending });
  }

  fn compare(&self, a: &Note, b: &Note) -> Ordering {
    let ordering: Ordering = match self.field {
      NoteSortField::Created => a.created.cmp(&b.created),
      NoteSortField::Modified => a.modified.cmp(&b.modified),
      NoteSortField::Path => a.path.cmp(&b.path),
      NoteSortField::Title => a.title.to_lowercase().cmp(&b.title.to_lowercase()),
      NoteSortField::WordCount => a.word_count.cmp(&b.word_count),
      NoteSortField::Random => Ordering::Equal
    };

    return if self.ascending { ordering } else { ordering.reverse() };
  }
}

/// Notes linked to or from the given paths, optionally following links transitively.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkFilter {
  pub paths: Vec<String>,
  pub recursive: bool,
  /// Only meaningful when recursive. None means no limit.
  pub max_distance: Option<usize>,
  /// Keep the notes which are not linked instead.
  pub negate: bool
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct TagClause {
  alternatives: Vec<String>,
  negated: bool
}

impl TagClause {
  fn alternative_matches(alternative: &str, tag: &str) -> bool {
    return match alternative.strip_suffix('*') {
      Some(prefix) => tag.to_lowercase().starts_with(&prefix.to_lowercase()),
      None => tag.to_lowercase() == alternative.to_lowercase()
    }
  }

  fn accepts(&self, tags: &[String]) -> bool {
    let has_any: bool = self.alternatives
      .iter()
      .any(|alternative| tags.iter().any(|tag| TagClause::alternative_matches(alternative, tag)));

    return has_any != self.negated;
  }
}

lazy_static! {
  static ref TAG_OR_REGEX: Regex = Regex::new(r"\s+OR\s+|\|").unwrap();
}

/*
  A tag filter entry holds clauses separated by commas, all required. A clause accepts
  any of its alternatives, separated by `OR` or `|`. A leading `-` or `NOT ` negates it.
*/
fn parse_tag_clauses(expression: &str) -> Vec<TagClause> {
  let mut clauses: Vec<TagClause> = Vec::new();

  for raw_clause in expression.split(',') {
    let mut clause: &str = raw_clause.trim();
    let mut negated: bool = false;

    if let Some(rest) = clause.strip_prefix("NOT ") {
      negated = true;
      clause = rest.trim();
    }
    else if let Some(rest) = clause.strip_prefix('-') {
      negated = true;
      clause = rest.trim();
    }

    let alternatives: Vec<String> = TAG_OR_REGEX
      .split(clause)
      .map(|alternative| alternative.trim().trim_start_matches('#').to_owned())
      .filter(|alternative| !alternative.is_empty())
      .collect();

    if !alternatives.is_empty() {
      clauses.push(TagClause { alternatives, negated });
    }
  }

  return clauses;
}

/*
  Reads a date filter. Accepts `today`, `yesterday`, `now` and the formats of the
  `date` frontmatter. Named days start at midnight UTC.
*/
pub fn parse_date_filter(text: &str, now: DateTime<Utc>) -> Result<DateTime<Utc>, NotebookError> {
  let start_of_today = || now
    .date_naive()
    .and_hms_opt(0, 0, 0)
    .map(|naive| naive.and_utc());

  let parsed: Option<DateTime<Utc>> = match text.trim().to_lowercase().as_str() {
    "now" => Some(now),
    "today" => start_of_today(),
    "yesterday" => start_of_today().map(|today| today - Duration::days(1)),
    _ => parse_date_value(text)
  };

  return parsed.ok_or_else(|| NotebookError::InvalidFilter(format!("'{}' is not a valid date", text)));
}

/// The whole day of a date filter, from its midnight to the next one.
pub fn parse_day_range(text: &str, now: DateTime<Utc>) -> Result<(DateTime<Utc>, DateTime<Utc>), NotebookError> {
  let date: DateTime<Utc> = parse_date_filter(text, now)?;
  let start: DateTime<Utc> = date
    .date_naive()
    .and_hms_opt(0, 0, 0)
    .map(|naive| naive.and_utc())
    .unwrap_or(date);

  return Ok((start, start + Duration::days(1)));
}

#[derive(Debug, Clone, Default)]
pub struct NoteFindOpts {
  /// Every term must appear in the title or body, ignoring case.
  pub match_strings: Vec<String>,
  /// Match each string as a whole phrase instead of separate words.
  pub exact_match: bool,
  pub include_paths: Vec<String>,
  pub exclude_paths: Vec<String>,
  /// Include and exclude paths are regexes instead of path prefixes.
  pub path_regex: bool,
  pub tags: Vec<String>,
  pub link_to: Option<LinkFilter>,
  pub linked_by: Option<LinkFilter>,
  /// Notes two links away from these ones, in either direction, without a direct link.
  pub related: Vec<String>,
  /// Notes whose content mentions the title or aliases of these ones.
  pub mention: Vec<String>,
  /// Notes whose title or aliases are mentioned in these ones.
  pub mentioned_by: Vec<String>,
  pub orphan: bool,
  pub created_before: Option<DateTime<Utc>>,
  pub created_after: Option<DateTime<Utc>>,
  pub modified_before: Option<DateTime<Utc>>,
  pub modified_after: Option<DateTime<Utc>>,
  /// Later sorters take priority over earlier ones.
  pub sorters: Vec<NoteSorter>,
  pub limit: Option<usize>
}

/// A note selected by a search, with the lines that matched its terms.
#[derive(Debug, Clone)]
pub struct MatchedNote<'a> {
  pub note: &'a Note,
  pub snippets: Vec<String>
}

enum PathMatcher {
  Prefixes(Vec<String>),
  Regexes(Vec<Regex>)
}

impl PathMatcher {
  fn new(paths: &[String], use_regex: bool) -> Result<PathMatcher, NotebookError> {
    if !use_regex {
      let prefixes: Vec<String> = paths
        .iter()
        .map(|path| path.trim_end_matches('/').to_owned())
        .collect();
      return Ok(PathMatcher::Prefixes(prefixes));
    }

    let regexes: Vec<Regex> = paths
      .iter()
      .map(|pattern| Regex::new(pattern)
        .map_err(|regex_err| NotebookError::InvalidFilter(regex_err.to_string()))
      )
      .collect::<Result<_, _>>()?;

    return Ok(PathMatcher::Regexes(regexes));
  }

  fn matches(&self, path: &str) -> bool {
    return match self {
      // An empty prefix is the notebook root.
      PathMatcher::Prefixes(prefixes) => prefixes.iter().any(|prefix| {
        prefix.is_empty() || path == prefix || path.starts_with(&format!("{}/", prefix))
      }),
      PathMatcher::Regexes(regexes) => regexes.iter().any(|regex| regex.is_match(path))
    }
  }
}

fn search_terms(opts: &NoteFindOpts) -> Vec<String> {
  if opts.exact_match {
    return opts.match_strings
      .iter()
      .map(|phrase| phrase.trim().to_lowercase())
      .filter(|phrase| !phrase.is_empty())
      .collect();
  }

  return opts.match_strings
    .iter()
    .flat_map(|string| string.split_whitespace())
    .map(|term| term.trim_matches('"').to_lowercase())
    .filter(|term| !term.is_empty())
    .collect();
}

/*
  Breadth-first walk of the link graph from the given notes. The starting notes are
  not part of the result unless reached again through another path.
*/
fn linked_notes<'g, F>(start: &[String], filter: &LinkFilter, neighbours: F) -> BTreeSet<String>
  where F: Fn(&str) -> Vec<&'g String>
{
  let max_distance: usize = match (filter.recursive, filter.max_distance) {
    (false, _) => 1,
    (true, Some(max_distance)) => max_distance.max(1),
    (true, None) => usize::MAX
  };

  let mut found: BTreeSet<String> = BTreeSet::new();
  let mut queue: VecDeque<(String, usize)> = start.iter().map(|path| (path.clone(), 0)).collect();
  let mut visited: BTreeSet<String> = start.iter().cloned().collect();

  while let Some((path, distance)) = queue.pop_front() {
    if distance >= max_distance {
      continue;
    }

    for neighbour in neighbours(&path) {
      if visited.insert(neighbour.clone()) {
        found.insert(neighbour.clone());
        queue.push_back((neighbour.clone(), distance + 1));
      }
    }
  }

  return found;
}

fn resolve_link_paths(index: &NoteIndex, filter: &LinkFilter, extension: &str) -> Result<Vec<String>, NotebookError> {
  return filter.paths
    .iter()
    .map(|path| index
      .resolve_href(path, extension)
      .map(|note| note.path.clone())
      .ok_or_else(|| NotebookError::InvalidFilter(format!("could not find a note at: {}", path)))
    )
    .collect();
}

/*
  Notes at exactly two links from the given ones, following links both ways. Notes
  directly linked to or from them are not related.
*/
fn related_notes(start: &[String], graph: &LinkGraph) -> BTreeSet<String> {
  let both_ways = |path: &str| -> Vec<String> {
    return graph.sources_of(path)
      .chain(graph.targets_of(path))
      .cloned()
      .collect();
  };

  let direct: BTreeSet<String> = start.iter().flat_map(|path| both_ways(path)).collect();

  return direct
    .iter()
    .flat_map(|path| both_ways(path))
    .filter(|path| !direct.contains(path) && !start.contains(path))
    .collect();
}

// The title of a note and the `aliases` of its frontmatter, lowercased.
fn mention_names_of(note: &Note) -> Vec<String> {
  let mut names: Vec<String> = vec![note.title.clone()];

  match note.metadata.get("aliases") {
    Some(JsonValue::Array(aliases)) => names.extend(aliases.iter().map(|alias| match alias {
      JsonValue::String(text) => text.clone(),
      other => other.to_string()
    })),
    Some(JsonValue::String(alias)) => names.push(alias.clone()),
    _ => ()
  }

  return names
    .into_iter()
    .map(|name| name.trim().to_lowercase())
    .filter(|name| !name.is_empty())
    .collect();
}

fn mentions_any(note: &Note, names: &[String]) -> bool {
  let body: String = note.body.to_lowercase();
  return names.iter().any(|name| body.contains(name.as_str()));
}

fn sort_notes(notes: &mut Vec<MatchedNote<'_>>, sorters: &[NoteSorter]) {
  if sorters.is_empty() {
    notes.sort_by(|a, b| a.note.path.cmp(&b.note.path));
    return;
  }

  // Stable sorts applied in order leave the last sorter as the primary key.
  for sorter in sorters {
    if sorter.field == NoteSortField::Random {
      notes.shuffle(&mut rand::thread_rng());
    }
    else {
      notes.sort_by(|a, b| sorter.compare(a.note, b.note));
    }
  }
}

/// Notes of the index passing every filter of the options, sorted and limited.
pub fn find_notes<'a>(index: &'a NoteIndex, opts: &NoteFindOpts, extension: &str) -> Result<Vec<MatchedNote<'a>>, NotebookError> {
  let terms: Vec<String> = search_terms(opts);
  let include: Option<PathMatcher> = match opts.include_paths.is_empty() {
    true => None,
    false => Some(PathMatcher::new(&opts.include_paths, opts.path_regex)?)
  };
  let exclude: Option<PathMatcher> = match opts.exclude_paths.is_empty() {
    true => None,
    false => Some(PathMatcher::new(&opts.exclude_paths, opts.path_regex)?)
  };
  let tag_clauses: Vec<TagClause> = opts.tags
    .iter()
    .flat_map(|expression| parse_tag_clauses(expression))
    .collect();

  let needs_graph: bool = opts.link_to.is_some() || opts.linked_by.is_some() || opts.orphan || !opts.related.is_empty();
  let graph: LinkGraph = match needs_graph {
    true => index.link_graph(extension),
    false => LinkGraph::default()
  };

  let link_to_set: Option<BTreeSet<String>> = match &opts.link_to {
    Some(filter) => {
      let targets: Vec<String> = resolve_link_paths(index, filter, extension)?;
      Some(linked_notes(&targets, filter, |path| graph.sources_of(path).collect()))
    },
    None => None
  };
  let linked_by_set: Option<BTreeSet<String>> = match &opts.linked_by {
    Some(filter) => {
      let sources: Vec<String> = resolve_link_paths(index, filter, extension)?;
      Some(linked_notes(&sources, filter, |path| graph.targets_of(path).collect()))
    },
    None => None
  };

  let related_set: Option<BTreeSet<String>> = match opts.related.is_empty() {
    true => None,
    false => {
      let related_filter = LinkFilter { paths: opts.related.clone(), ..LinkFilter::default() };
      Some(related_notes(&resolve_link_paths(index, &related_filter, extension)?, &graph))
    }
  };

  let resolve_notes = |paths: &[String]| -> Result<Vec<&'a Note>, NotebookError> {
    let filter = LinkFilter { paths: paths.to_vec(), ..LinkFilter::default() };
    return resolve_link_paths(index, &filter, extension)?
      .iter()
      .map(|path| index.notes.get(path).ok_or_else(|| NotebookError::InvalidFilter(format!("could not find a note at: {}", path))))
      .collect();
  };
  let mentioned: Vec<&'a Note> = resolve_notes(&opts.mention)?;
  let mentioning: Vec<&'a Note> = resolve_notes(&opts.mentioned_by)?;
  let mentioned_names: Vec<String> = mentioned.iter().flat_map(|note| mention_names_of(note)).collect();

  let mut found: Vec<MatchedNote<'a>> = Vec::new();

  for note in index.notes.values() {
    if let Some(include) = &include {
      if !include.matches(&note.path) {
        continue;
      }
    }
    if let Some(exclude) = &exclude {
      if exclude.matches(&note.path) {
        continue;
      }
    }

    if !tag_clauses.iter().all(|clause| clause.accepts(&note.tags)) {
      continue;
    }

    let date_filters = [
      (opts.created_after, note.created, true),
      (opts.created_before, note.created, false),
      (opts.modified_after, note.modified, true),
      (opts.modified_before, note.modified, false)
    ];
    let passes_dates: bool = date_filters.iter().all(|(bound, date, is_after)| match bound {
      Some(bound) if *is_after => date >= bound,
      Some(bound) => date < bound,
      None => true
    });
    if !passes_dates {
      continue;
    }

    let is_excluded_by_links = |set: &Option<BTreeSet<String>>, filter: &Option<LinkFilter>| match (set, filter) {
      (Some(set), Some(filter)) => set.contains(&note.path) == filter.negate,
      _ => false
    };
    if is_excluded_by_links(&link_to_set, &opts.link_to) || is_excluded_by_links(&linked_by_set, &opts.linked_by) {
      continue;
    }
    if related_set.as_ref().map_or(false, |set| !set.contains(&note.path)) {
      continue;
    }

    // Mentioning and mentioned notes are never part of their own results.
    if !mentioned.is_empty() {
      if mentioned.iter().any(|other| other.path == note.path) || !mentions_any(note, &mentioned_names) {
        continue;
      }
    }
    if !mentioning.is_empty() {
      let names: Vec<String> = mention_names_of(note);
      if mentioning.iter().any(|other| other.path == note.path) || !mentioning.iter().any(|other| mentions_any(other, &names)) {
        continue;
      }
    }
    if opts.orphan && graph.sources_of(&note.path).next().is_some() {
      continue;
    }

    let searchable: String = format!("{}\n{}", note.title, note.body).to_lowercase();
    if !terms.iter().all(|term| searchable.contains(term.as_str())) {
      continue;
    }

    let snippets: Vec<String> = match terms.is_empty() {
      true => Vec::new(),
      false => note.body
        .lines()
        .filter(|line| {
          let lowercase_line: String = line.to_lowercase();
          terms.iter().any(|term| lowercase_line.contains(term.as_str()))
        })
        .map(|line| line.trim().to_owned())
        .collect()
    };

    found.push(MatchedNote { note, snippets });
  }

  sort_notes(&mut found, &opts.sorters);

  if let Some(limit) = opts.limit {
    found.truncate(limit);
  }

  return Ok(found);
}
