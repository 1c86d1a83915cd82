use std::ops::Range;

use regex::Regex;

use crate::common::is_url;

use super::{link_format::percent_decode, Link, LinkRelation, LinkType};

lazy_static! {
  static ref AUTOLINK_REGEX: Regex = Regex::new(r#"https?://[^\s<>()\[\]"'`]+"#).unwrap();
}

/// A link found in the content, with the byte range of its syntax.
pub struct FoundLink {
  pub link: Link,
  pub range: Range<usize>
}

fn relations_of(title: &str) -> Vec<LinkRelation> {
  return title
    .split_whitespace()
    .filter_map(LinkRelation::from_name)
    .collect();
}

struct WikiLinkSyntax {
  href: String,
  label: String,
  relation: Option<LinkRelation>,
  consumed: usize
}

/*
  text starts at a '#' or '[' trigger. Accepts [[href]], [[href | label]], the legacy
  [[[href]]] down link, #[[href]] for an up link and [[href]]# for a down link.
*/
fn parse_wiki_link(text: &str) -> Option<WikiLinkSyntax> {
  let mut href: String = String::new();
  let mut label: String = String::new();
  let mut relation: Option<LinkRelation> = None;
  let mut opened: bool = false;
  let mut closed: bool = false;
  let mut escaping: bool = false;
  let mut parsing_label: bool = false;
  let mut opener_count: usize = 0;
  let mut closer_count: usize = 0;
  let mut consumed: usize = text.len();

  for (index, c) in text.char_indices() {
    if closed {
      if c == '#' {
        relation = Some(LinkRelation::Down);
        consumed = index + 1;
      }
      else {
        consumed = index;
      }
      break;
    }

    if c == '\n' {
      return None;
    }

    if !opened {
      match c {
        '#' if opener_count == 0 && index == 0 => {
          relation = Some(LinkRelation::Up);
          continue;
        },
        '[' => {
          opener_count += 1;
          continue;
        },
        _ => ()
      }

      if opener_count < 2 || opener_count > 3 {
        return None;
      }
    }
    opened = true;

    let target: &mut String = if parsing_label { &mut label } else { &mut href };

    if !escaping {
      match c {
        '|' => {
          parsing_label = true;
          continue;
        },
        '\\' => {
          escaping = true;
          continue;
        },
        ']' => {
          closer_count += 1;
          if closer_count == opener_count {
            closed = true;
            if closer_count == 3 {
              relation = Some(LinkRelation::Down);
            }
          }
          continue;
        },
        _ => ()
      }
    }
    escaping = false;

    // Fewer closing brackets than opening ones are part of the href.
    for _ in 0..closer_count {
      target.push(']');
    }
    closer_count = 0;
    target.push(c);
  }

  let href: String = href.trim().to_owned();
  if !closed || href.is_empty() {
    return None;
  }

  let label: String = label.trim().to_owned();
  return Some(WikiLinkSyntax {
    label: if label.is_empty() { href.clone() } else { label },
    href,
    relation,
    consumed
  });
}

pub fn parse_wiki_links(masked_content: &str) -> Vec<FoundLink> {
  let mut found: Vec<FoundLink> = Vec::new();
  let mut index: usize = 0;

  while index < masked_content.len() {
    let rest: &str = &masked_content[index..];
    let c: char = match rest.chars().next() {
      Some(c) => c,
      None => break
    };

    let is_trigger: bool = c == '[' || (c == '#' && rest[1..].starts_with("[["));

    if let Some(syntax) = is_trigger.then(|| parse_wiki_link(rest)).flatten() {
      found.push(FoundLink {
        link: Link {
          title: syntax.label,
          is_external: is_url(&syntax.href),
          href: syntax.href,
          link_type: LinkType::WikiLink,
          rels: syntax.relation.into_iter().collect(),
          ..Link::default()
        },
        range: index..index + syntax.consumed
      });
      index += syntax.consumed;
    }
    else {
      index += c.len_utf8();
    }
  }

  return found;
}

/// A link read by the Markdown parser. The destination is percent-decoded.
pub fn markdown_link(label: &str, destination: &str, rel_title: &str, link_type: LinkType) -> Option<Link> {
  let href: String = percent_decode(destination).unwrap_or_else(|| destination.to_owned());

  if href.is_empty() {
    return None;
  }

  return Some(Link {
    title: label.trim().to_owned(),
    is_external: is_url(&href),
    href,
    link_type,
    rels: relations_of(rel_title),
    ..Link::default()
  });
}

pub fn parse_autolinks(masked_content: &str) -> Vec<FoundLink> {
  return AUTOLINK_REGEX
    .find_iter(masked_content)
    .map(|url_match| {
      let url: &str = url_match.as_str().trim_end_matches(|c| matches!(c, '.' | ',' | ':' | ';' | '!' | '?' | '*' | '_' | '~'));

      FoundLink {
        link: Link {
          title: url.to_owned(),
          href: url.to_owned(),
          link_type: LinkType::Implicit,
          is_external: true,
          ..Link::default()
        },
        range: url_match.start()..url_match.start() + url.len()
      }
    })
    .collect();
}

/*
  The paragraph around a byte range: the surrounding lines up to the nearest blank
  lines. Returns the trimmed text with its byte offsets in the content.
*/
pub fn paragraph_around(content: &str, range: &Range<usize>) -> (String, usize, usize) {
  let is_blank = |line: &str| line.trim().is_empty();
  let mut start: usize = content[..range.start].rfind('\n').map_or(0, |index| index + 1);
  let mut end: usize = content[range.end..].find('\n').map_or(content.len(), |index| range.end + index);

  while start > 0 {
    let previous_line_start: usize = content[..start - 1].rfind('\n').map_or(0, |index| index + 1);
    if is_blank(&content[previous_line_start..start - 1]) {
      break;
    }
    start = previous_line_start;
  }

  while end < content.len() {
    let next_line_end: usize = content[end + 1..].find('\n').map_or(content.len(), |index| end + 1 + index);
    if is_blank(&content[end + 1..next_line_end]) {
      break;
    }
    end = next_line_end;
  }

  let snippet: &str = &content[start..end];
  let leading: usize = snippet.len() - snippet.trim_start().len();
  let trimmed: &str = snippet.trim();

  return (trimmed.to_owned(), start + leading, start + leading + trimmed.len());
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn wiki_links_with_labels_and_relations() {
    let links: Vec<FoundLink> = parse_wiki_links(
      "See [[dir/note | The note]], #[[parent]] and [[child]]# or [[[legacy]]]. [not] [[ ]]"
    );
    let summary: Vec<(&str, &str, Vec<LinkRelation>)> = links
      .iter()
      .map(|found| (found.link.href.as_str(), found.link.title.as_str(), found.link.rels.clone()))
      .collect();

    assert_eq!(summary, vec![
      ("dir/note", "The note", vec![]),
      ("parent", "parent", vec![LinkRelation::Up]),
      ("child", "child", vec![LinkRelation::Down]),
      ("legacy", "legacy", vec![LinkRelation::Down])
    ]);
  }

  #[test]
  fn wiki_link_ranges_cover_the_syntax() {
    let content: &str = "a [[b]]# c";
    let links: Vec<FoundLink> = parse_wiki_links(content);
    assert_eq!(&content[links[0].range.clone()], "[[b]]#");
  }

  #[test]
  fn wiki_links_do_not_span_lines() {
    assert!(parse_wiki_links("[[open\nclose]]").is_empty());
  }

  #[test]
  fn markdown_links_are_decoded() {
    let link: Link = markdown_link(" A note ", "a%20note.md", "up down", LinkType::Markdown).unwrap();

    assert_eq!(link.href, "a note.md");
    assert_eq!(link.title, "A note");
    assert_eq!(link.rels, vec![LinkRelation::Up, LinkRelation::Down]);
    assert!(!link.is_external);
    assert!(markdown_link("empty", "", "", LinkType::Markdown).is_none());
    assert!(markdown_link("site", "https://zk-org.github.io", "", LinkType::Markdown).unwrap().is_external);
  }

  #[test]
  fn autolinks_drop_trailing_punctuation() {
    let links: Vec<FoundLink> = parse_autolinks("Visit https://github.com/zk-org/zk. Or not.");
    assert_eq!(links.len(), 1);
    assert_eq!(links[0].link.href, "https://github.com/zk-org/zk");
    assert_eq!(links[0].link.link_type, LinkType::Implicit);
  }

  #[test]
  fn snippets_are_the_enclosing_paragraph() {
    let content: &str = "# Title\n\nFirst line\n  with [[link]] here\nlast line\n\nOther paragraph";
    let start: usize = content.find("[[link]]").unwrap();
    let (snippet, snippet_start, snippet_end) = paragraph_around(content, &(start..start + 8));

    assert_eq!(snippet, "First line\n  with [[link]] here\nlast line");
    assert_eq!(&content[snippet_start..snippet_end], snippet);
  }
}
