use rand::{seq::SliceRandom, Rng};

use crate::notebook_config::{IdCase, IdOptions};

use super::NoteError;

/// Random note IDs, drawn from the charset adjusted to the configured letter case.
pub struct IdGenerator {
  charset: Vec<char>,
  length: usize
}

impl IdGenerator {
  pub fn new(options: &IdOptions) -> Result<Self, NoteError> {
    if options.length < 1 {
      return Err(NoteError::InvalidIdOptions("the ID length must be at least 1".to_owned()));
    }

    let mut charset: Vec<char> = Vec::new();

    for c in &options.charset {
      match options.case {
        IdCase::Lower => charset.extend(c.to_lowercase()),
        IdCase::Upper => charset.extend(c.to_uppercase()),
        IdCase::Mixed => {
          charset.extend(c.to_lowercase());
          charset.extend(c.to_uppercase());
        }
      }
    }

    if charset.is_empty() {
      return Err(NoteError::InvalidIdOptions("the ID charset is empty".to_owned()));
    }

    return Ok(IdGenerator { charset, length: options.length });
  }

  pub fn generate_with<R: Rng>(&self, rng: &mut R) -> String {
    return (0..self.length)
      .filter_map(|_| self.charset.choose(rng))
      .collect();
  }

  pub fn generate(&self) -> String {
    return self.generate_with(&mut rand::thread_rng());
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::notebook_config::CHARSET_HEX;
  use rand::{rngs::StdRng, SeedableRng};

  #[test]
  fn ids_have_the_configured_length_and_charset() {
    let options = IdOptions { length: 12, charset: CHARSET_HEX.chars().collect(), case: IdCase::Upper };
    let generator: IdGenerator = IdGenerator::new(&options).unwrap();

    for _ in 0..20 {
      let id: String = generator.generate();
      assert_eq!(id.chars().count(), 12);
      assert!(id.chars().all(|c| "0123456789ABCDEF".contains(c)), "{}", id);
    }
  }

  #[test]
  fn mixed_case_draws_both_cases() {
    let options = IdOptions { length: 200, charset: vec!['a'], case: IdCase::Mixed };
    let id: String = IdGenerator::new(&options).unwrap().generate_with(&mut StdRng::seed_from_u64(7));

    assert!(id.contains('a'));
    assert!(id.contains('A'));
  }

  #[test]
  fn zero_length_and_empty_charset_are_rejected() {
    assert!(IdGenerator::new(&IdOptions { length: 0, ..IdOptions::default() }).is_err());
    assert!(IdGenerator::new(&IdOptions { charset: Vec::new(), ..IdOptions::default() }).is_err());
  }
}
