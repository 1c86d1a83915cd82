pub mod prompt;

use chrono::{DateTime, Utc};
use regex::Regex;

lazy_static! {
  static ref URL_REGEX: Regex = Regex::new(r"^[a-zA-Z][a-zA-Z0-9+.-]*://\S+$").unwrap();
  static ref SLUG_SEPARATOR_REGEX: Regex = Regex::new(r"[^\p{L}\p{N}]+").unwrap();
}

pub fn pluralize(word: &str, count: usize) -> String {
  return if count == 1
    { word.to_owned() }
    else { format!("{}s", word) };
}

/// Human readable age of a date, like "3 days ago".
pub fn elapsed_since(date: DateTime<Utc>, now: DateTime<Utc>) -> String {
  let seconds: i64 = (now - date).num_seconds();

  if seconds < 0 {
    return "in the future".to_owned();
  }

  let (count, unit) = match seconds {
    0..=9 => return "now".to_owned(),
    10..=59 => (seconds, "second"),
    60..=3599 => (seconds / 60, "minute"),
    3600..=86_399 => (seconds / 3600, "hour"),
    86_400..=604_799 => (seconds / 86_400, "day"),
    604_800..=2_591_999 => (seconds / 604_800, "week"),
    2_592_000..=31_535_999 => (seconds / 2_592_000, "month"),
    _ => (seconds / 31_536_000, "year")
  };

  return match count {
    1 => format!("1 {} ago", unit),
    _ => format!("{} {}s ago", count, unit)
  }
}

pub fn is_url(maybe_url: &str) -> bool {
  return URL_REGEX.is_match(maybe_url.trim());
}

pub fn slugify(text: impl AsRef<str>) -> String {
  return SLUG_SEPARATOR_REGEX
    .replace_all(&text.as_ref().to_lowercase(), "-")
    .trim_matches('-')
    .to_string();
}

/*
  Splits a command line the way a POSIX shell would for the common cases:
  whitespace separated words, single quotes, double quotes and backslash escapes.
*/
pub fn split_shell_words(line: &str) -> Result<Vec<String>, String> {
  let mut words: Vec<String> = Vec::new();
  let mut current: String = String::new();
  let mut has_word: bool = false;
  let mut chars = line.chars();

  while let Some(c) = chars.next() {
    match c {
      '\'' => {
        has_word = true;
        loop {
          match chars.next() {
            Some('\'') => break,
            Some(quoted) => current.push(quoted),
            None => return Err(format!("Unterminated single quote in \"{}\"", line))
          }
        }
      },
      '"' => {
        has_word = true;
        loop {
          match chars.next() {
            Some('"') => break,
            Some('\\') => match chars.next() {
              Some(escaped) => current.push(escaped),
              None => return Err(format!("Unterminated double quote in \"{}\"", line))
            },
            Some(quoted) => current.push(quoted),
            None => return Err(format!("Unterminated double quote in \"{}\"", line))
          }
        }
      },
      '\\' => {
        has_word = true;
        if let Some(escaped) = chars.next() {
          current.push(escaped);
        }
      },
      c if c.is_whitespace() => {
        if has_word {
          words.push(std::mem::take(&mut current));
          has_word = false;
        }
      },
      c => {
        has_word = true;
        current.push(c);
      }
    }
  }

  if has_word {
    words.push(current);
  }

  return Ok(words);
}

/// Quotes a word for a POSIX shell command line.
pub fn shell_quote(word: &str) -> String {
  let is_plain: bool = !word.is_empty() && word
    .chars()
    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '/' | '.' | '-' | '_' | '+' | ',' | ':' | '@' | '%'));

  return if is_plain
    { word.to_owned() }
    else { format!("'{}'", word.replace('\'', "'\\''")) };
}
