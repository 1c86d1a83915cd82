use std::{collections::{BTreeSet, HashSet}, fmt};

use regex::Regex;

use super::{
  general_parser::{
    line_number_of,
    parse_given_str,
    parse_identifier,
    parse_inline_whitespace,
    parse_whitespace_and_comments,
    point_to_position,
    success,
    ParseResult,
    ParseSuccess
  },
  ConfPyError,
  DocsConfigRecord,
  DocsOptionKey,
  DocsValue,
  ValueKind
};

lazy_static! {
  static ref STRING_START_REGEX: Regex = Regex::new(r#"^([rRbBuUfF]{0,2})('''|"""|'|")"#).unwrap();
  static ref NUMBER_REGEX: Regex = Regex::new(r"^[-+]?(\d[\d_]*(\.[\d_]*)?|\.\d[\d_]*)([eE][-+]?\d+)?[jJ]?").unwrap();
}

const NON_STRING_ITEM: &str = "sequence containing non-string items";

/// A Python literal, as far as `conf.py` assignments need them.
#[derive(Debug, Clone, PartialEq)]
enum PyValue {
  Str(String),
  Number(String),
  Bool(bool),
  None,
  List(Vec<PyValue>),
  Tuple(Vec<PyValue>),
  Set(Vec<PyValue>),
  Dict(Vec<(PyValue, PyValue)>)
}

impl PyValue {
  fn type_name(&self) -> &'static str {
    return match self {
      PyValue::Str(_) => "string",
      PyValue::Number(_) => "number",
      PyValue::Bool(_) => "boolean",
      PyValue::None => "None",
      PyValue::List(_) => "list",
      PyValue::Tuple(_) => "tuple",
      PyValue::Set(_) => "set",
      PyValue::Dict(_) => "dict"
    }
  }
}

/// Something worth telling the user about that did not prevent the load.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadNotice {
  IgnoredKey {
    name: String,
    line: usize
  },
  IgnoredStatement {
    line: usize
  },
  DuplicateSetEntry {
    key: DocsOptionKey,
    entry: String,
    line: usize
  },
  Reassigned {
    key: DocsOptionKey,
    line: usize
  },
  UnsetByNone {
    key: DocsOptionKey,
    line: usize
  }
}

impl fmt::Display for LoadNotice {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      LoadNotice::IgnoredKey { name, line } =>
        write!(f, "line {}: '{}' is not a recognized option and was ignored", line, name),
      LoadNotice::IgnoredStatement { line } =>
        write!(f, "line {}: statement is not an assignment and was ignored", line),
      LoadNotice::DuplicateSetEntry { key, entry, line } =>
        write!(f, "line {}: '{}' lists \"{}\" more than once", line, key, entry),
      LoadNotice::Reassigned { key, line } =>
        write!(f, "line {}: '{}' is assigned again and replaces the earlier value", line, key),
      LoadNotice::UnsetByNone { key, line } =>
        write!(f, "line {}: '{}' is set to None and treated as absent", line, key)
    }
  }
}

#[derive(Debug, Default)]
pub struct ConfPyLoad {
  pub record: DocsConfigRecord,
  pub notices: Vec<LoadNotice>
}

enum AssignOperator {
  Assign,
  Extend
}

struct ConfPyParser<'a> {
  source: &'a str
}

impl<'a> ConfPyParser<'a> {
  fn line_of(&self, at: &str) -> usize {
    return line_number_of(self.source, at);
  }

  fn syntax_error(&self, at: &str, message: impl Into<String>) -> ConfPyError {
    return ConfPyError::Syntax {
      line: self.line_of(at),
      message: message.into(),
      pointer: point_to_position(self.source, at)
    };
  }

  /*
    Returns Ok(None) when the text is a valid Python expression this parser does not
    evaluate, such as a function call or an f-string.
  */
  fn parse_value(&self, s: &'a str, in_brackets: bool) -> ParseResult<'a, PyValue, ConfPyError> {
    let ParseSuccess { value: first, mut rest } = match self.parse_atom(s)? {
      Some(parsed) => parsed,
      None => return Ok(None)
    };

    let mut concatenated: String = match first {
      PyValue::Str(text) => text,
      other => return success(other, rest)
    };

    // Adjacent string literals concatenate: "a" "b" == "ab"
    loop {
      let after_space: &'a str = self.skip_space(rest, in_brackets);

      match self.parse_string_literal(after_space)? {
        Some(ParseSuccess { value: next_part, rest: after_part }) => {
          concatenated.push_str(&next_part);
          rest = after_part;
        },
        None => break
      }
    }

    return success(PyValue::Str(concatenated), rest);
  }

  fn skip_space(&self, s: &'a str, in_brackets: bool) -> &'a str {
    let skipped: Result<Option<ParseSuccess<'a, ()>>, ()> = if in_brackets
      { parse_whitespace_and_comments(s) }
      else { parse_inline_whitespace(s) };

    return match skipped {
      Ok(Some(parsed)) => parsed.rest,
      _ => s
    };
  }

  fn parse_atom(&self, s: &'a str) -> ParseResult<'a, PyValue, ConfPyError> {
    if STRING_START_REGEX.is_match(s) {
      return Ok(self.parse_string_literal(s)?
        .map(|parsed| ParseSuccess { value: PyValue::Str(parsed.value), rest: parsed.rest }));
    }

    if let Some(number_match) = NUMBER_REGEX.find(s) {
      return success(
        PyValue::Number(number_match.as_str().to_owned()),
        &s[number_match.end()..]
      );
    }

    if let Some(parsed_word) = parse_identifier::<()>(s).ok().flatten() {
      let keyword_value: Option<PyValue> = match parsed_word.value {
        "True" => Some(PyValue::Bool(true)),
        "False" => Some(PyValue::Bool(false)),
        "None" => Some(PyValue::None),
        _ => None
      };

      return match keyword_value {
        Some(value) => success(value, parsed_word.rest),
        // A name, attribute access or call. Not a literal.
        None => Ok(None)
      };
    }

    return match s.chars().next() {
      Some('[') => Ok(self.parse_bracketed(s, '[', ']')?
        .map(|parsed| ParseSuccess { value: PyValue::List(parsed.value.0), rest: parsed.rest })),
      Some('(') => Ok(self.parse_bracketed(s, '(', ')')?
        .map(|parsed| {
          let (mut items, saw_comma) = parsed.value;

          let value: PyValue = if items.len() == 1 && !saw_comma
            { items.remove(0) }
            else { PyValue::Tuple(items) };

          ParseSuccess { value, rest: parsed.rest }
        })),
      Some('{') => self.parse_braced(s),
      _ => Ok(None)
    };
  }

  // Parses [a, b] or (a, b). The flag tells whether any comma was seen.
  fn parse_bracketed(
    &self,
    s: &'a str,
    opener: char,
    closer: char
  ) -> ParseResult<'a, (Vec<PyValue>, bool), ConfPyError> {
    let mut rest: &'a str = &s[opener.len_utf8()..];
    let mut items: Vec<PyValue> = Vec::new();
    let mut saw_comma: bool = false;

    loop {
      rest = self.skip_space(rest, true);

      if rest.is_empty() {
        return Err(self.syntax_error(s, format!("'{}' is never closed", opener)));
      }

      if let Some(after_closer) = rest.strip_prefix(closer) {
        return success((items, saw_comma), after_closer);
      }

      match self.parse_value(rest, true)? {
        Some(parsed) => {
          items.push(parsed.value);
          rest = self.skip_space(parsed.rest, true);
        },
        None => return Ok(None)
      }

      if let Some(after_comma) = rest.strip_prefix(',') {
        saw_comma = true;
        rest = after_comma;
      }
      else if !rest.starts_with(closer) {
        if rest.is_empty() {
          return Err(self.syntax_error(s, format!("'{}' is never closed", opener)));
        }
        return Err(self.syntax_error(rest, format!("expected ',' or '{}'", closer)));
      }
    }
  }

  // Parses {k: v, ...} dicts and {a, b} sets.
  fn parse_braced(&self, s: &'a str) -> ParseResult<'a, PyValue, ConfPyError> {
    let mut rest: &'a str = &s[1..];
    let mut dict_entries: Vec<(PyValue, PyValue)> = Vec::new();
    let mut set_items: Vec<PyValue> = Vec::new();
    let mut is_dict: Option<bool> = None;

    loop {
      rest = self.skip_space(rest, true);

      if rest.is_empty() {
        return Err(self.syntax_error(s, "'{' is never closed"));
      }

      if let Some(after_closer) = rest.strip_prefix('}') {
        let value: PyValue = match is_dict {
          Some(false) => PyValue::Set(set_items),
          _ => PyValue::Dict(dict_entries)
        };
        return success(value, after_closer);
      }

      let parsed_key = match self.parse_value(rest, true)? {
        Some(parsed) => parsed,
        None => return Ok(None)
      };
      rest = self.skip_space(parsed_key.rest, true);

      match parse_given_str::<()>(":", rest).ok().flatten() {
        Some(after_colon) if is_dict != Some(false) => {
          is_dict = Some(true);

          let parsed_value = match self.parse_value(self.skip_space(after_colon.rest, true), true)? {
            Some(parsed) => parsed,
            None => return Ok(None)
          };
          dict_entries.push((parsed_key.value, parsed_value.value));
          rest = self.skip_space(parsed_value.rest, true);
        },
        Some(_) => return Err(self.syntax_error(rest, "':' is not allowed in a set")),
        None => {
          if is_dict == Some(true) {
            return Err(self.syntax_error(rest, "expected ':' after a dict key"));
          }
          is_dict = Some(false);
          set_items.push(parsed_key.value);
        }
      }

      if let Some(after_comma) = rest.strip_prefix(',') {
        rest = after_comma;
      }
      else if !rest.starts_with('}') {
        if rest.is_empty() {
          return Err(self.syntax_error(s, "'{' is never closed"));
        }
        return Err(self.syntax_error(rest, "expected ',' or '}'"));
      }
    }
  }

  fn parse_string_literal(&self, s: &'a str) -> ParseResult<'a, String, ConfPyError> {
    let captures = match STRING_START_REGEX.captures(s) {
      Some(captures) => captures,
      None => return Ok(None)
    };

    let prefix: &str = captures.get(1).map_or("", |m| m.as_str());
    let quote: &str = captures.get(2).map_or("\"", |m| m.as_str());

    if prefix.contains(['f', 'F']) {
      return Ok(None);
    }

    let is_raw: bool = prefix.contains(['r', 'R']);
    let is_triple: bool = quote.len() == 3;
    let body: &'a str = &s[prefix.len() + quote.len()..];
    let mut value: String = String::new();
    let mut chars = body.char_indices().peekable();

    while let Some((index, c)) = chars.next() {
      if body[index..].starts_with(quote) {
        return success(value, &body[index + quote.len()..]);
      }

      match c {
        '\n' if !is_triple => {
          return Err(self.syntax_error(s, "string literal is not terminated before the end of the line"));
        },
        '\\' => {
          let escaped: char = match chars.next() {
            Some((_, escaped)) => escaped,
            None => break
          };

          if is_raw {
            value.push('\\');
            value.push(escaped);
            continue;
          }

          match escaped {
            '\n' => (),
            'n' => value.push('\n'),
            't' => value.push('\t'),
            'r' => value.push('\r'),
            '0' => value.push('\0'),
            'a' => value.push('\u{7}'),
            'b' => value.push('\u{8}'),
            'f' => value.push('\u{c}'),
            'v' => value.push('\u{b}'),
            '\\' | '\'' | '"' => value.push(escaped),
            'x' | 'u' | 'U' => {
              let digit_count: usize = match escaped { 'x' => 2, 'u' => 4, _ => 8 };
              let digits: String = (0..digit_count)
                .filter_map(|_| chars.next().map(|(_, digit)| digit))
                .collect();

              match u32::from_str_radix(&digits, 16).ok().and_then(char::from_u32) {
                Some(decoded) if digits.len() == digit_count => value.push(decoded),
                _ => return Err(self.syntax_error(
                  &body[index..],
                  format!("invalid \\{} escape", escaped)
                ))
              }
            },
            other => {
              value.push('\\');
              value.push(other);
            }
          }
        },
        other => value.push(other)
      }
    }

    return Err(self.syntax_error(s, "string literal is never closed"));
  }

  /*
    Skips one logical line: up to the first newline outside of brackets and strings.
  */
  fn skip_statement(&self, s: &'a str) -> Result<&'a str, ConfPyError> {
    let mut depth: usize = 0;
    let mut index: usize = 0;
    let bytes: &[u8] = s.as_bytes();

    while index < bytes.len() {
      match bytes[index] {
        b'\'' | b'"' => {
          let rest: &'a str = &s[index..];

          match self.parse_string_literal(rest)? {
            Some(parsed) => {
              index = s.len() - parsed.rest.len();
              continue;
            },
            None => {
              return Err(self.syntax_error(rest, "string literal is never closed"));
            }
          }
        },
        b'#' => {
          index = match s[index..].find('\n') {
            Some(newline_offset) => index + newline_offset,
            None => s.len()
          };
          continue;
        },
        b'\\' if bytes.get(index + 1) == Some(&b'\n') => {
          index += 2;
          continue;
        },
        b'[' | b'(' | b'{' => depth += 1,
        b']' | b')' | b'}' => depth = depth.saturating_sub(1),
        b'\n' if depth == 0 => return Ok(&s[index + 1..]),
        _ => ()
      }

      index += 1;
    }

    if depth > 0 {
      return Err(self.syntax_error(s, "bracket is never closed"));
    }

    return Ok("");
  }

  // After a value only a comment, a ';' or the end of the line may follow.
  fn end_of_statement(&self, s: &'a str) -> Option<&'a str> {
    let rest: &'a str = self.skip_space(s, false);

    if rest.is_empty() {
      return Some(rest);
    }

    if let Some(after_semicolon) = rest.strip_prefix(';') {
      return Some(after_semicolon);
    }

    if rest.starts_with('#') {
      return Some(match rest.find('\n') {
        Some(newline_index) => &rest[newline_index + 1..],
        None => ""
      });
    }

    return rest.strip_prefix("\r\n").or_else(|| rest.strip_prefix('\n'));
  }

  fn parse_operator(&self, s: &'a str) -> Option<(AssignOperator, &'a str)> {
    let rest: &'a str = self.skip_space(s, false);

    if let Some(after_operator) = rest.strip_prefix("+=") {
      return Some((AssignOperator::Extend, after_operator));
    }

    if rest.starts_with("==") {
      return None;
    }

    return rest.strip_prefix('=').map(|after_operator| (AssignOperator::Assign, after_operator));
  }
}

fn strings_of(
  key: DocsOptionKey,
  items: Vec<PyValue>,
  line: usize
) -> Result<Vec<String>, ConfPyError> {
  return items
    .into_iter()
    .map(|item| match item {
      PyValue::Str(text) => Ok(text),
      _ => Err(ConfPyError::WrongValueKind {
        key,
        expected: key.value_kind(),
        found: NON_STRING_ITEM,
        line
      })
    })
    .collect();
}

fn to_docs_value(
  key: DocsOptionKey,
  value: PyValue,
  line: usize,
  notices: &mut Vec<LoadNotice>
) -> Result<Option<DocsValue>, ConfPyError> {
  let wrong_kind = |found: &'static str| ConfPyError::WrongValueKind {
    key,
    expected: key.value_kind(),
    found,
    line
  };

  return match (key.value_kind(), value) {
    (_, PyValue::None) => {
      notices.push(LoadNotice::UnsetByNone { key, line });
      Ok(None)
    },
    (ValueKind::Text, PyValue::Str(text)) => Ok(Some(DocsValue::Text(text))),
    (ValueKind::OrderedList, PyValue::List(items) | PyValue::Tuple(items)) => {
      Ok(Some(DocsValue::List(strings_of(key, items, line)?)))
    },
    (ValueKind::UnorderedSet, PyValue::List(items) | PyValue::Tuple(items) | PyValue::Set(items)) => {
      let mut entries: BTreeSet<String> = BTreeSet::new();

      for entry in strings_of(key, items, line)? {
        if entries.contains(&entry) {
          notices.push(LoadNotice::DuplicateSetEntry { key, entry, line });
        }
        else {
          entries.insert(entry);
        }
      }

      Ok(Some(DocsValue::Set(entries)))
    },
    (_, other) => Err(wrong_kind(other.type_name()))
  };
}

fn extended(existing: Option<DocsValue>, addition: Option<DocsValue>) -> Option<DocsValue> {
  return match (existing, addition) {
    (Some(DocsValue::Text(mut text)), Some(DocsValue::Text(more))) => {
      text.push_str(&more);
      Some(DocsValue::Text(text))
    },
    (Some(DocsValue::List(mut items)), Some(DocsValue::List(more))) => {
      items.extend(more);
      Some(DocsValue::List(items))
    },
    (Some(DocsValue::Set(mut items)), Some(DocsValue::Set(more))) => {
      items.extend(more);
      Some(DocsValue::Set(items))
    },
    (_, addition) => addition
  };
}

fn is_import_statement(s: &str) -> bool {
  return ["import ", "from "].iter().any(|keyword| s.starts_with(keyword));
}

/*
  Reads a conf.py made of literal assignments into a typed record. Recognized options
  must hold literals of their declared kind. Everything else is skipped and reported
  as a notice.
*/
pub fn parse_conf_py(source: &str) -> Result<ConfPyLoad, ConfPyError> {
  let parser = ConfPyParser { source };
  let mut load: ConfPyLoad = ConfPyLoad::default();
  let mut assigned_keys: HashSet<DocsOptionKey> = HashSet::new();
  let mut rest: &str = source;

  loop {
    rest = parse_whitespace_and_comments::<()>(rest)
      .ok()
      .flatten()
      .map_or(rest, |parsed| parsed.rest);

    if rest.is_empty() {
      break;
    }

    let statement_start: &str = rest;
    let line: usize = parser.line_of(statement_start);

    if is_import_statement(statement_start) {
      rest = parser.skip_statement(statement_start)?;
      continue;
    }

    let parsed_name = match parse_identifier::<()>(statement_start).ok().flatten() {
      Some(parsed) => parsed,
      None => {
        load.notices.push(LoadNotice::IgnoredStatement { line });
        rest = parser.skip_statement(statement_start)?;
        continue;
      }
    };

    let (operator, after_operator) = match parser.parse_operator(parsed_name.rest) {
      Some(found) => found,
      None => {
        load.notices.push(LoadNotice::IgnoredStatement { line });
        rest = parser.skip_statement(statement_start)?;
        continue;
      }
    };

    let key: DocsOptionKey = match DocsOptionKey::from_name(parsed_name.value) {
      Some(key) => key,
      None => {
        load.notices.push(LoadNotice::IgnoredKey {
          name: parsed_name.value.to_owned(),
          line
        });
        rest = parser.skip_statement(statement_start)?;
        continue;
      }
    };

    let value_start: &str = parser.skip_space(after_operator, false);
    let parsed_value = match parser.parse_value(value_start, false)? {
      Some(parsed) => parsed,
      None => return Err(ConfPyError::UnsupportedValue { key, line })
    };

    rest = match parser.end_of_statement(parsed_value.rest) {
      Some(after_statement) => after_statement,
      None => return Err(ConfPyError::UnsupportedValue { key, line })
    };

    // `+= None` fails in Python too.
    if matches!(operator, AssignOperator::Extend) && matches!(parsed_value.value, PyValue::None) {
      return Err(ConfPyError::WrongValueKind {
        key,
        expected: key.value_kind(),
        found: PyValue::None.type_name(),
        line
      });
    }

    let docs_value: Option<DocsValue> = to_docs_value(key, parsed_value.value, line, &mut load.notices)?;
    let final_value: Option<DocsValue> = match operator {
      AssignOperator::Extend => extended(load.record.value_of(key), docs_value),
      AssignOperator::Assign => {
        if assigned_keys.contains(&key) {
          load.notices.push(LoadNotice::Reassigned { key, line });
        }
        docs_value
      }
    };

    assigned_keys.insert(key);
    load.record.assign(key, final_value);
  }

  return Ok(load);
}
