use crate::notebook_config::MarkdownConfig;

fn is_valid_tag_char(c: char, excluded: char) -> bool {
  return c != excluded && (
    c.is_alphanumeric()
      || matches!(c, '/' | '@' | '\'' | '~' | '-' | '_' | '$' | '%' | '&' | '+' | '=' | ':' | '#')
  );
}

// A hashtag made only of digits is an issue number, not a tag.
fn is_valid_hashtag(tag: &str) -> bool {
  return tag.chars().any(|c| !c.is_numeric());
}

fn is_valid_colon_tag(tag: &str) -> bool {
  return tag.chars().any(|c| c != '-');
}

struct ParsedTags {
  tags: Vec<String>,
  consumed: usize
}

/*
  line starts with the '#' trigger. With multi-word tags on, "#multi word tag#" is read
  as a single tag when the closing '#' directly follows a word.
*/
fn parse_hashtag(line: &str, multiword_enabled: bool) -> Option<ParsedTags> {
  let mut tag: String = String::new();
  let mut multiword_candidate: String = String::new();
  let mut escaping: bool = false;
  let mut parsing_multiword: bool = false;
  let mut previous_char: char = '#';
  let mut end_pos: usize = line.len();

  for (index, c) in line.char_indices().skip(1) {
    let target: &mut String = if parsing_multiword { &mut multiword_candidate } else { &mut tag };

    if escaping {
      target.push(c);
      escaping = false;
    }
    else if c == '\\' {
      escaping = true;
    }
    else if parsing_multiword {
      if is_valid_tag_char(c, '#') || c.is_whitespace() {
        target.push(c);
      }
      else {
        if c == '#' && !previous_char.is_whitespace() {
          tag = multiword_candidate.clone();
          end_pos = index + c.len_utf8();
        }
        break;
      }
    }
    else if !multiword_enabled && c == '#' {
      return None;
    }
    else if multiword_enabled && c.is_whitespace() {
      end_pos = index;
      multiword_candidate = tag.clone();
      multiword_candidate.push(c);
      parsing_multiword = true;
    }
    else if !is_valid_tag_char(c, '#') {
      end_pos = index;
      break;
    }
    else {
      target.push(c);
    }

    previous_char = c;
  }

  let trimmed: &str = tag.trim();

  if trimmed.is_empty() || !is_valid_hashtag(trimmed) {
    return None;
  }

  return Some(ParsedTags { tags: vec![trimmed.to_owned()], consumed: end_pos });
}

// line starts with the ':' trigger. ":one:two:" gives both tags.
fn parse_colon_tags(line: &str) -> Option<ParsedTags> {
  let mut tag: String = String::new();
  let mut tags: Vec<String> = Vec::new();
  let mut escaping: bool = false;
  let mut end_pos: usize = 1;

  for (index, c) in line.char_indices().skip(1) {
    if escaping {
      tag.push(c);
      escaping = false;
    }
    else if c == '\\' {
      escaping = true;
    }
    else if c == ':' {
      let trimmed: &str = tag.trim();
      if !is_valid_colon_tag(trimmed) {
        break;
      }
      tags.push(trimmed.to_owned());
      tag.clear();
      end_pos = index + 1;
    }
    else if !is_valid_tag_char(c, ':') {
      break;
    }
    else {
      tag.push(c);
    }
  }

  if tags.is_empty() {
    return None;
  }

  return Some(ParsedTags { tags, consumed: end_pos });
}

/// Inline tags of a Markdown text whose code spans and links were blanked out.
pub fn parse_inline_tags(masked_content: &str, markdown_config: &MarkdownConfig) -> Vec<String> {
  let mut tags: Vec<String> = Vec::new();

  if !markdown_config.hashtags && !markdown_config.colon_tags {
    return tags;
  }

  for line in masked_content.lines() {
    let mut previous_char: char = '\0';
    let mut index: usize = 0;

    while index < line.len() {
      let c: char = match line[index..].chars().next() {
        Some(c) => c,
        None => break
      };

      let rest: &str = &line[index..];
      let escaped: bool = previous_char == '\\';
      let parsed: Option<ParsedTags> = if escaped || is_valid_tag_char(previous_char, '\0') {
        None
      }
      else if c == '#' && markdown_config.hashtags {
        parse_hashtag(rest, markdown_config.multiword_tags)
      }
      else if c == ':' && markdown_config.colon_tags {
        parse_colon_tags(rest)
      }
      else {
        None
      };

      match parsed {
        Some(ParsedTags { tags: found, consumed }) if consumed > 0 => {
          tags.extend(found);
          index += consumed;
          previous_char = line[..index].chars().next_back().unwrap_or('\0');
        },
        _ => {
          previous_char = c;
          index += c.len_utf8();
        }
      }
    }
  }

  return tags;
}

#[cfg(test)]
mod tests {
  use super::*;

  fn config(hashtags: bool, colon_tags: bool, multiword_tags: bool) -> MarkdownConfig {
    return MarkdownConfig { hashtags, colon_tags, multiword_tags, ..MarkdownConfig::default() };
  }

  #[test]
  fn hashtags_are_found_in_text() {
    let tags: Vec<String> = parse_inline_tags(
      "Some #tag and #nested/tag, not#this, #123 nor # spaced. Ok #end",
      &config(true, false, false)
    );
    assert_eq!(tags, vec!["tag", "nested/tag", "end"]);
  }

  #[test]
  fn headings_are_not_hashtags() {
    let tags: Vec<String> = parse_inline_tags("# Title\n## Sub #real", &config(true, false, false));
    assert_eq!(tags, vec!["real"]);
  }

  #[test]
  fn escaped_characters_are_part_of_the_tag() {
    let tags: Vec<String> = parse_inline_tags(r"#foo\ bar \#not", &config(true, false, false));
    assert_eq!(tags, vec!["foo bar"]);
  }

  #[test]
  fn multiword_tags_need_a_closing_hash() {
    let tags: Vec<String> = parse_inline_tags(
      "A #multi word tag# and #single word",
      &config(true, false, true)
    );
    assert_eq!(tags, vec!["multi word tag", "single"]);
  }

  #[test]
  fn closing_hash_after_a_space_is_not_multiword() {
    let tags: Vec<String> = parse_inline_tags("#foo bar #", &config(true, false, true));
    assert_eq!(tags, vec!["foo"]);
  }

  #[test]
  fn hash_inside_a_tag_rejects_it_without_multiword() {
    let tags: Vec<String> = parse_inline_tags("#foo#bar", &config(true, false, false));
    assert!(tags.is_empty());
  }

  #[test]
  fn colon_tags_are_split() {
    let tags: Vec<String> = parse_inline_tags(
      ":one:two-words:three: at 10:30 and https://example.com",
      &config(false, true, false)
    );
    assert_eq!(tags, vec!["one", "two-words", "three"]);
  }

  #[test]
  fn disabled_kinds_are_not_parsed() {
    let tags: Vec<String> = parse_inline_tags("#hash :colon:", &config(false, false, false));
    assert!(tags.is_empty());
  }
}
