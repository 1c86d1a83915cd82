use std::fmt::Write;

pub struct ParseSuccess<'a, T> {
  pub value: T,
  pub rest: &'a str
}

pub type ParseResult<'a, T, E> = Result<Option<ParseSuccess<'a, T>>, E>;

pub fn success<'a, T, E>(value: T, rest: &'a str) -> ParseResult<'a, T, E> {
  return Ok(Some(ParseSuccess { value, rest }));
}

// Spaces and tabs only. A backslash at the end of a line continues the line.
pub fn parse_inline_whitespace<'a, E>(s: &'a str) -> ParseResult<'a, (), E> {
  let mut rest: &str = s.trim_start_matches(|c| c == ' ' || c == '\t');

  while let Some(after_continuation) = rest.strip_prefix("\\\n")
    .or_else(|| rest.strip_prefix("\\\r\n"))
  {
    rest = after_continuation.trim_start_matches(|c| c == ' ' || c == '\t');
  }

  return success((), rest);
}

// Any whitespace including newlines, and '#' comments. Used inside brackets.
pub fn parse_whitespace_and_comments<'a, E>(s: &'a str) -> ParseResult<'a, (), E> {
  let mut rest: &str = s;

  loop {
    rest = rest.trim_start();

    if rest.starts_with('#') {
      rest = match rest.find('\n') {
        Some(newline_index) => &rest[newline_index..],
        None => ""
      };
    }
    else {
      return success((), rest);
    }
  }
}

pub fn parse_given_str<'a, E>(
  str_parsing_for: &str,
  s: &'a str
) -> ParseResult<'a, (), E> {
  return match s.strip_prefix(str_parsing_for) {
    Some(rest) => success((), rest),
    None => Ok(None)
  }
}

pub fn parse_identifier<'a, E>(s: &'a str) -> ParseResult<'a, &'a str, E> {
  for (index, some_char) in s.char_indices() {
    let is_valid: bool = match some_char {
      'a'..='z' | 'A'..='Z' | '_' => true,
      '0'..='9' => index > 0,
      _ => false
    };

    if !is_valid {
      return if index == 0
        { Ok(None) }
        else { success(&s[..index], &s[index..]) };
    }
  }

  return if s.is_empty()
    { Ok(None) }
    else { success(s, "") };
}

/*
  Returns the 1-based line number at which rest starts, given that rest is a
  suffix of full_str.
*/
pub fn line_number_of(full_str: &str, rest: &str) -> usize {
  let consumed: usize = full_str.len().saturating_sub(rest.len());
  return full_str[..consumed].matches('\n').count() + 1;
}

pub fn point_to_position(full_str: &str, rest: &str) -> String {
  let line_number: usize = line_number_of(full_str, rest);
  let line: &str = full_str.lines().nth(line_number - 1).unwrap_or("");
  let consumed: usize = full_str.len().saturating_sub(rest.len());
  let line_start: usize = full_str[..consumed].rfind('\n').map_or(0, |index| index + 1);
  let column: usize = full_str[line_start..consumed].chars().count();
  let mut resulting_string: String = String::new();

  let _ = writeln!(resulting_string, "\t{}", line);
  let _ = write!(resulting_string, "\t");
  for _ in 0..column {
    let _ = write!(resulting_string, " ");
  }
  let _ = writeln!(resulting_string, "^-- Error occurs here");
  return resulting_string;
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn identifiers_stop_at_first_invalid_char() {
    let parsed = parse_identifier::<()>("html_theme = 'furo'").unwrap().unwrap();
    assert_eq!(parsed.value, "html_theme");
    assert_eq!(parsed.rest, " = 'furo'");
    assert!(parse_identifier::<()>("1abc").unwrap().is_none());
  }

  #[test]
  fn comments_are_skipped_inside_brackets() {
    let parsed = parse_whitespace_and_comments::<()>("  # pip install breathe\n  \"breathe\"").unwrap().unwrap();
    assert_eq!(parsed.rest, "\"breathe\"");
  }

  #[test]
  fn line_continuations_count_as_inline_whitespace() {
    let parsed = parse_inline_whitespace::<()>(" \\\n   = 1").unwrap().unwrap();
    assert_eq!(parsed.rest, "= 1");
  }

  #[test]
  fn line_numbers_are_one_based() {
    let source: &str = "a = 1\nb = 2\nc = 3";
    assert_eq!(line_number_of(source, &source[6..]), 2);
    assert_eq!(line_number_of(source, source), 1);
  }

  #[test]
  fn position_pointer_marks_the_column() {
    let source: &str = "project = zk\n";
    let pointer: String = point_to_position(source, &source[10..]);
    assert!(pointer.contains("project = zk"));
    assert!(pointer.contains("          ^-- Error occurs here"));
  }
}
