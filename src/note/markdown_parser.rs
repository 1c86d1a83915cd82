use std::{collections::BTreeMap, ops::Range};

use pulldown_cmark::{Event, LinkType as MarkdownLinkType, Options, Parser, Tag, TagEnd};
use regex::Regex;
use serde_json::Value as JsonValue;
use serde_yaml::Value as YamlValue;

use crate::notebook_config::MarkdownConfig;

use super::{
  links::{markdown_link, paragraph_around, parse_autolinks, parse_wiki_links, FoundLink},
  tags::parse_inline_tags,
  Link,
  LinkType,
  NoteError
};

lazy_static! {
  static ref FRONTMATTER_REGEX: Regex = Regex::new(r"(?s)\A\s*-{3,}[ \t]*\r?\n(.*?)(?m:^)-{3,}[ \t]*(?:\r?\n|\z)").unwrap();
  static ref ATX_HEADING_REGEX: Regex = Regex::new(r"^ {0,3}(#{1,6})(?:[ \t]+(.*?))?(?:[ \t]+#+)?[ \t]*$").unwrap();
  static ref SETEXT_UNDERLINE_REGEX: Regex = Regex::new(r"^ {0,3}(=+|-+)[ \t]*$").unwrap();
}

const FRONTMATTER_TAG_KEYS: [&str; 4] = ["tag", "tags", "keyword", "keywords"];

/// Everything read from the Markdown content of a note.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NoteContent {
  pub title: String,
  pub body: String,
  pub lead: String,
  pub links: Vec<Link>,
  pub tags: Vec<String>,
  pub metadata: BTreeMap<String, JsonValue>
}

struct Frontmatter {
  values: BTreeMap<String, JsonValue>,
  range: Range<usize>
}

impl Frontmatter {
  fn string_of(&self, key: &str) -> Option<String> {
    return match self.values.get(key) {
      Some(JsonValue::String(text)) if !text.trim().is_empty() => Some(text.clone()),
      _ => None
    }
  }

  // A YAML list, or a space separated string.
  fn strings_of(&self, key: &str) -> Vec<String> {
    let scalar_text = |value: &JsonValue| match value {
      JsonValue::String(text) => text.trim().to_owned(),
      JsonValue::Null => String::new(),
      other => other.to_string()
    };

    return match self.values.get(key) {
      Some(JsonValue::Array(items)) => items
        .iter()
        .map(scalar_text)
        .filter(|text| !text.is_empty())
        .collect(),
      Some(JsonValue::String(text)) => text
        .split_whitespace()
        .map(str::to_owned)
        .collect(),
      _ => Vec::new()
    }
  }
}

fn blank_out(masked: &mut String, range: Range<usize>) {
  let replacement: String = masked[range.clone()]
    .chars()
    .map(|c| if c == '\n' { "\n".to_owned() } else { " ".repeat(c.len_utf8()) })
    .collect();

  masked.replace_range(range, &replacement);
}

fn parse_frontmatter(content: &str) -> Result<Option<Frontmatter>, NoteError> {
  let captures = match FRONTMATTER_REGEX.captures(content) {
    Some(captures) => captures,
    None => return Ok(None)
  };

  let range: Range<usize> = match captures.get(0) {
    Some(whole) => whole.range(),
    None => return Ok(None)
  };

  let yaml: YamlValue = serde_yaml::from_str(&captures[1])
    .map_err(|yaml_err| NoteError::Frontmatter(yaml_err.to_string()))?;

  let mut values: BTreeMap<String, JsonValue> = BTreeMap::new();

  if let YamlValue::Mapping(mapping) = yaml {
    for (key, value) in mapping {
      let key: String = match key {
        YamlValue::String(text) => text,
        YamlValue::Number(number) => number.to_string(),
        YamlValue::Bool(flag) => flag.to_string(),
        _ => continue
      };

      let json_value: JsonValue = serde_json::to_value(&value)
        .map_err(|json_err| NoteError::Frontmatter(json_err.to_string()))?;

      values.insert(key.to_lowercase(), json_value);
    }
  }

  return Ok(Some(Frontmatter { values, range }));
}

struct Heading {
  level: usize,
  text: String,
  end: usize
}

// A Markdown link whose label is still being read.
struct OpenLink {
  kind: MarkdownLinkType,
  destination: String,
  rel_title: String,
  label: String,
  range: Range<usize>
}

impl OpenLink {
  fn into_found(self) -> Option<FoundLink> {
    let link_type: LinkType = match self.kind {
      MarkdownLinkType::Email => return None,
      MarkdownLinkType::Autolink => LinkType::Implicit,
      _ => LinkType::Markdown
    };

    return markdown_link(&self.label, &self.destination, &self.rel_title, link_type)
      .map(|link| FoundLink { link, range: self.range });
  }
}

/// What the Markdown parser found in the masked content.
struct MarkdownScan {
  headings: Vec<Heading>,
  links: Vec<FoundLink>,
  /// Code, raw HTML, images and link reference definitions.
  hidden: Vec<Range<usize>>
}

// End of the source lines of a heading: its ATX line, or its setext underline.
fn heading_end(masked: &str, range: &Range<usize>) -> usize {
  let mut line_start: usize = range.start;

  for (index, line) in masked[range.start..].split_inclusive('\n').enumerate() {
    // The underline may sit just past the end of the parsed range.
    if index > 0 && line_start > range.end + 2 {
      break;
    }

    let trimmed_line: &str = line.trim_end_matches(|c| c == '\n' || c == '\r');
    let is_atx: bool = index == 0 && ATX_HEADING_REGEX.is_match(trimmed_line);

    if is_atx || (index > 0 && SETEXT_UNDERLINE_REGEX.is_match(trimmed_line)) {
      return line_start + trimmed_line.len();
    }
    line_start += line.len();
  }

  return range.end;
}

fn push_text(open_heading: &mut Option<Heading>, open_link: &mut Option<OpenLink>, text: &str) {
  if let Some(heading) = open_heading {
    heading.text.push_str(text);
  }
  if let Some(link) = open_link {
    link.label.push_str(text);
  }
}

fn scan_markdown(masked: &str) -> MarkdownScan {
  let mut options: Options = Options::empty();
  options.insert(Options::ENABLE_STRIKETHROUGH);
  options.insert(Options::ENABLE_TABLES);

  let parser = Parser::new_ext(masked, options);
  let mut hidden: Vec<Range<usize>> = parser
    .reference_definitions()
    .iter()
    .map(|(_, definition)| definition.span.clone())
    .collect();

  let mut headings: Vec<Heading> = Vec::new();
  let mut links: Vec<FoundLink> = Vec::new();
  let mut open_heading: Option<Heading> = None;
  let mut open_link: Option<OpenLink> = None;

  for (event, range) in parser.into_offset_iter() {
    match event {
      Event::Start(Tag::Heading { level, .. }) => {
        open_heading = Some(Heading { level: level as usize, text: String::new(), end: heading_end(masked, &range) });
      },
      Event::End(TagEnd::Heading(_)) => {
        if let Some(mut heading) = open_heading.take() {
          heading.text = heading.text.trim().to_owned();
          headings.push(heading);
        }
      },
      Event::Start(Tag::Link { link_type, dest_url, title, .. }) => {
        open_link = Some(OpenLink {
          kind: link_type,
          destination: dest_url.to_string(),
          rel_title: title.to_string(),
          label: String::new(),
          range
        });
      },
      Event::End(TagEnd::Link) => {
        if let Some(link) = open_link.take() {
          hidden.push(link.range.clone());
          links.extend(link.into_found());
        }
      },
      Event::Start(Tag::CodeBlock(_)) | Event::Start(Tag::HtmlBlock) | Event::Start(Tag::Image { .. }) => {
        hidden.push(range);
      },
      Event::Code(code) => {
        push_text(&mut open_heading, &mut open_link, &code);
        hidden.push(range);
      },
      Event::Html(_) | Event::InlineHtml(_) => hidden.push(range),
      Event::Text(text) => push_text(&mut open_heading, &mut open_link, &text),
      Event::SoftBreak | Event::HardBreak => push_text(&mut open_heading, &mut open_link, " "),
      _ => ()
    }
  }

  return MarkdownScan { headings, links, hidden };
}

/*
  The heading giving the note its title. The first level-1 heading wins, otherwise the
  first heading of the smallest level.
*/
fn title_heading(headings: Vec<Heading>) -> Option<Heading> {
  let mut best: Option<Heading> = None;

  for heading in headings.into_iter().filter(|heading| !heading.text.is_empty()) {
    if heading.level == 1 {
      return Some(heading);
    }
    if best.as_ref().map_or(true, |current| heading.level < current.level) {
      best = Some(heading);
    }
  }

  return best;
}

fn lead_of(body: &str) -> String {
  return body
    .lines()
    .take_while(|line| !line.trim().is_empty())
    .collect::<Vec<&str>>()
    .join("\n")
    .trim()
    .to_owned();
}

fn remove_duplicates(items: Vec<String>) -> Vec<String> {
  let mut unique: Vec<String> = Vec::with_capacity(items.len());

  for item in items {
    if !unique.contains(&item) {
      unique.push(item);
    }
  }

  return unique;
}

// Markdown links are already blanked out of the masked content.
fn collect_links(content: &str, masked: &mut String, markdown_links: Vec<FoundLink>) -> Vec<Link> {
  let mut found: Vec<FoundLink> = markdown_links;

  // Wiki links first, so their URLs are not read as autolinks.
  for link_finder in [parse_wiki_links, parse_autolinks] {
    let new_links: Vec<FoundLink> = link_finder(masked.as_str());

    for found_link in &new_links {
      blank_out(masked, found_link.range.clone());
    }
    found.extend(new_links);
  }

  found.sort_by_key(|found_link| found_link.range.start);

  return found
    .into_iter()
    .map(|FoundLink { mut link, range }| {
      let (snippet, snippet_start, snippet_end) = paragraph_around(content, &range);
      link.snippet = snippet;
      link.snippet_start = snippet_start;
      link.snippet_end = snippet_end;
      link
    })
    .collect();
}

/// Reads the title, body, lead, tags, links and frontmatter metadata of a Markdown note.
pub fn parse_note_content(content: &str, markdown_config: &MarkdownConfig) -> Result<NoteContent, NoteError> {
  let frontmatter: Option<Frontmatter> = parse_frontmatter(content)?;
  let mut masked: String = content.to_owned();

  if let Some(frontmatter) = &frontmatter {
    blank_out(&mut masked, frontmatter.range.clone());
  }

  let scan: MarkdownScan = scan_markdown(&masked);
  for hidden_range in scan.hidden {
    blank_out(&mut masked, hidden_range);
  }

  let frontmatter_end: usize = frontmatter.as_ref().map_or(0, |frontmatter| frontmatter.range.end);
  let frontmatter_title: Option<String> = frontmatter.as_ref().and_then(|frontmatter| frontmatter.string_of("title"));

  let (title, body_start) = match frontmatter_title {
    Some(title) => (title, frontmatter_end),
    None => match title_heading(scan.headings) {
      Some(heading) => (heading.text, heading.end),
      None => (String::new(), frontmatter_end)
    }
  };

  let body: String = content[body_start..].trim().to_owned();
  let lead: String = lead_of(&body);
  let links: Vec<Link> = collect_links(content, &mut masked, scan.links);

  let mut tags: Vec<String> = Vec::new();
  if let Some(frontmatter) = &frontmatter {
    for key in FRONTMATTER_TAG_KEYS {
      tags.extend(
        frontmatter.strings_of(key)
          .into_iter()
          .map(|tag| tag.trim_start_matches('#').to_owned())
          .filter(|tag| !tag.is_empty())
      );
    }
  }
  tags.extend(parse_inline_tags(&masked, markdown_config));

  return Ok(NoteContent {
    title,
    body,
    lead,
    links,
    tags: remove_duplicates(tags),
    metadata: frontmatter.map(|frontmatter| frontmatter.values).unwrap_or_default()
  });
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::note::{LinkRelation, LinkType};

  fn parse(content: &str) -> NoteContent {
    return parse_note_content(content, &MarkdownConfig::default()).unwrap();
  }

  #[test]
  fn title_comes_from_the_first_top_level_heading() {
    let content: NoteContent = parse("## Intro\n\n# Real title\n\nBody text\nsecond line\n\nMore.");

    assert_eq!(content.title, "Real title");
    assert_eq!(content.body, "Body text\nsecond line\n\nMore.");
    assert_eq!(content.lead, "Body text\nsecond line");
  }

  #[test]
  fn smallest_level_wins_without_h1() {
    let content: NoteContent = parse("### Deep\n## Shallow\ntext");
    assert_eq!(content.title, "Shallow");
    assert_eq!(content.body, "text");
  }

  #[test]
  fn setext_headings_are_titles() {
    let content: NoteContent = parse("Heading\n=======\n\nBody");
    assert_eq!(content.title, "Heading");
    assert_eq!(content.body, "Body");
  }

  #[test]
  fn frontmatter_title_tags_and_metadata() {
    let content: NoteContent = parse(
      "---\nTitle: From YAML\ntags: [\"#one\", two]\nkeywords: three four\nAuthor: Mickaël\n---\n\n# Heading\n\nBody #two #five"
    );

    assert_eq!(content.title, "From YAML");
    assert_eq!(content.body, "# Heading\n\nBody #two #five");
    assert_eq!(content.tags, vec!["one", "two", "three", "four", "five"]);
    assert_eq!(content.metadata["author"], JsonValue::String("Mickaël".to_owned()));
    assert!(content.metadata.contains_key("title"));
  }

  #[test]
  fn note_without_title_keeps_everything_as_body() {
    let content: NoteContent = parse("---\ndate: 2024-01-01\n---\nJust text.");
    assert_eq!(content.title, "");
    assert_eq!(content.body, "Just text.");
  }

  #[test]
  fn code_is_ignored_for_tags_links_and_titles() {
    let content: NoteContent = parse(
      "```md\n# Not a title\n#nottag [[nolink]]\n```\n\nText `#inline [[nope]]` #yes [[yes-link]]"
    );

    assert_eq!(content.title, "");
    assert_eq!(content.tags, vec!["yes"]);
    assert_eq!(content.links.len(), 1);
    assert_eq!(content.links[0].href, "yes-link");
  }

  #[test]
  fn links_are_returned_in_document_order_with_snippets() {
    let content: NoteContent = parse(
      "# Links\n\nSee https://zk-org.github.io and [doc](docs/a%20b.md \"down\").\n\n#[[parent]]"
    );

    let kinds: Vec<(LinkType, &str)> = content.links
      .iter()
      .map(|link| (link.link_type, link.href.as_str()))
      .collect();

    assert_eq!(kinds, vec![
      (LinkType::Implicit, "https://zk-org.github.io"),
      (LinkType::Markdown, "docs/a b.md"),
      (LinkType::WikiLink, "parent")
    ]);
    assert_eq!(content.links[1].rels, vec![LinkRelation::Down]);
    assert_eq!(content.links[1].snippet, "See https://zk-org.github.io and [doc](docs/a%20b.md \"down\").");
    assert_eq!(content.links[2].rels, vec![LinkRelation::Up]);
  }

  #[test]
  fn indented_code_and_reference_links() {
    let content: NoteContent = parse(
      "# T\n\nPara.\n\n    #indentedcode [[codelink]]\n\nSee [ref link][r].\n\n[r]: other.md\n"
    );

    assert!(content.tags.is_empty());
    let hrefs: Vec<&str> = content.links.iter().map(|link| link.href.as_str()).collect();
    assert_eq!(hrefs, vec!["other.md"]);
    assert_eq!(content.links[0].title, "ref link");
    assert_eq!(content.links[0].link_type, LinkType::Markdown);
    assert_eq!(content.links[0].snippet, "See [ref link][r].");
  }

  #[test]
  fn html_is_ignored() {
    let content: NoteContent = parse("<!-- #htmlcomment [[hidden]] -->");
    assert!(content.tags.is_empty());
    assert!(content.links.is_empty());

    let content: NoteContent = parse("Text <span title=\"#attr\">[[shown]]</span> #kept");
    assert_eq!(content.tags, vec!["kept"]);
    assert_eq!(content.links[0].href, "shown");
  }

  #[test]
  fn images_are_skipped_and_angle_autolinks_are_implicit() {
    let content: NoteContent = parse(
      "![img](pic.png) [A note](a%20note.md \"up\") <https://zk-org.github.io> [empty]() [mail](<a@b.c>)"
    );

    let kinds: Vec<(LinkType, &str)> = content.links
      .iter()
      .map(|link| (link.link_type, link.href.as_str()))
      .collect();

    assert_eq!(kinds, vec![
      (LinkType::Markdown, "a note.md"),
      (LinkType::Implicit, "https://zk-org.github.io"),
      (LinkType::Markdown, "a@b.c")
    ]);
    assert_eq!(content.links[0].rels, vec![LinkRelation::Up]);
    assert!(content.links[1].is_external);
  }

  #[test]
  fn headings_inside_lists_and_quotes() {
    let content: NoteContent = parse("> ## Quoted\n\n- item\n\nBody");
    assert_eq!(content.title, "Quoted");
    assert_eq!(content.body, "- item\n\nBody");
  }

  #[test]
  fn links_are_not_tags() {
    let content: NoteContent = parse("[anchor](#section) #tag");
    assert_eq!(content.tags, vec!["tag"]);
  }

  #[test]
  fn invalid_frontmatter_is_an_error() {
    let result = parse_note_content("---\ntitle: [unclosed\n---\n", &MarkdownConfig::default());
    assert!(matches!(result, Err(NoteError::Frontmatter(_))));
  }
}
