use std::io::{self, stdin, IsTerminal, Write};

#[derive(Debug, PartialEq)]
pub enum PromptResult {
  Yes,
  No,
  Custom(String),
  Empty
}

impl PromptResult {
  pub fn is_yes_or_no(&self) -> bool {
    return match *self {
      Self::Yes | Self::No => true,
      _ => false
    }
  }

  pub fn from_str(string: &str) -> PromptResult {
    match string.trim() {
      "" => PromptResult::Empty,
      "y" | "Y" | "yes" => PromptResult::Yes,
      "n" | "N" | "no" => PromptResult::No,
      custom_value => PromptResult::Custom(custom_value.to_string())
    }
  }
}

pub fn can_prompt() -> bool {
  return stdin().is_terminal();
}

fn read_answer(prompt: &str) -> io::Result<Option<PromptResult>> {
  let mut buffer = String::new();

  print!("{}", prompt);
  io::stdout().flush()?;

  // EOF means nobody is going to answer.
  if stdin().read_line(&mut buffer)? == 0 {
    return Ok(None);
  }

  return Ok(Some(PromptResult::from_str(buffer.trim())));
}

pub fn prompt_until<T>(prompt: &str, predicate: T) -> io::Result<Option<PromptResult>>
  where T: Fn(&PromptResult) -> bool
{
  loop {
    match read_answer(prompt)? {
      None => return Ok(None),
      Some(result) if predicate(&result) => return Ok(Some(result)),
      Some(_) => continue
    }
  }
}

/*
  Asks a y/n question until it gets a valid answer. Without an interactive stdin,
  the default answer is used.
*/
pub fn prompt_until_boolean(prompt: &str, default_answer: bool) -> io::Result<bool> {
  if !can_prompt() {
    return Ok(default_answer);
  }

  let answer: Option<PromptResult> = prompt_until(
    &format!("{} [y/n] ", prompt),
    |result| result.is_yes_or_no()
  )?;

  return Ok(match answer {
    Some(PromptResult::Yes) => true,
    Some(PromptResult::No) => false,
    _ => default_answer
  });
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn answers_are_classified() {
    assert_eq!(PromptResult::from_str(" y "), PromptResult::Yes);
    assert_eq!(PromptResult::from_str("no"), PromptResult::No);
    assert_eq!(PromptResult::from_str(""), PromptResult::Empty);
    assert_eq!(PromptResult::from_str("maybe"), PromptResult::Custom("maybe".to_owned()));
    assert!(!PromptResult::Empty.is_yes_or_no());
  }
}
